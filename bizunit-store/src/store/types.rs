use bizunit_core::PlanDocument;
use chrono::{DateTime, Utc};
use serde_json::Value as JsonValue;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::StoreError;

/// A plan document ready to be published.
#[derive(Debug, Clone)]
pub struct NewPlan {
    pub name: String,
    pub description: Option<String>,
    pub doc_hash: String,
    pub document: JsonValue,
}

impl NewPlan {
    pub fn from_document(document: &PlanDocument) -> Result<Self, StoreError> {
        let json = serde_json::to_value(document)?;
        let mut hasher = Sha256::new();
        hasher.update(serde_json::to_vec(&json)?);
        Ok(Self {
            name: document.name.clone(),
            description: document.description.clone(),
            doc_hash: hex::encode(hasher.finalize()),
            document: json,
        })
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlanRecord {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub doc_hash: String,
    pub document: JsonValue,
    /// Bumped each time a different document is published under the same name.
    pub version: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PlanRecord {
    pub fn document(&self) -> Result<PlanDocument, StoreError> {
        Ok(serde_json::from_value(self.document.clone())?)
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PlanSummary {
    pub name: String,
    pub description: Option<String>,
    pub version: i32,
    pub updated_at: DateTime<Utc>,
}
