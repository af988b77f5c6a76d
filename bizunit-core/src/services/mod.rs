//! Collaborators injected into a plan execution. The core only knows them by these traits.

mod access;
mod resource;
mod transport;

use std::sync::Arc;

use crate::config::RuntimeConfig;

pub use access::{AccessController, AccessError, AccessToken, AuthorizationCode, AuthorizeRequest, TokenRequest};
pub use resource::{NoResources, RdbResource, RedisResource, ResourceError, ResourceProvider};
pub use transport::{HttpClient, HttpError, HttpRequestParts, HttpResponseParts};

/// Everything a `PlanStorage` borrows from the process. Cheap to clone.
#[derive(Clone)]
pub struct PlanServices {
    pub config: Arc<RuntimeConfig>,
    pub http: Arc<dyn HttpClient>,
    pub resources: Arc<dyn ResourceProvider>,
    pub access: Option<Arc<dyn AccessController>>,
}

impl PlanServices {
    pub fn new(config: Arc<RuntimeConfig>, http: Arc<dyn HttpClient>) -> Self {
        Self {
            config,
            http,
            resources: Arc::new(NoResources),
            access: None,
        }
    }

    pub fn with_resources(mut self, resources: Arc<dyn ResourceProvider>) -> Self {
        self.resources = resources;
        self
    }

    pub fn with_access(mut self, access: Arc<dyn AccessController>) -> Self {
        self.access = Some(access);
        self
    }
}

impl std::fmt::Debug for PlanServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanServices")
            .field("config", &self.config)
            .field("access", &self.access.is_some())
            .finish_non_exhaustive()
    }
}
