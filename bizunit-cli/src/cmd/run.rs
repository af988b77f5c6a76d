use std::path::{Path, PathBuf};
use std::sync::Arc;

use bizunit_core::services::PlanServices;
use bizunit_core::{validate_plan, AccountManager, AppEnv, OriginRequest, Plan, RuntimeConfig};
use bizunit_exec::secrets::{resolve_config, CompositeProvider};
use bizunit_exec::{default_factory, init_tracing, PlanOutcome, PlanRunner, ReqwestHttpClient, StaticAccessController};
use bizunit_store::PostgresResources;
use serde::Serialize;
use serde_json::Value as JsonValue;

use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::utils::read_plan;
use crate::{OutputArgs, RuntimeArgs};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RunResult {
    run_id: String,
    outcome: &'static str,
    response: JsonValue,
}

pub async fn run_cmd(
    path: &Path,
    request: Option<&Path>,
    account: Option<String>,
    runtime: RuntimeArgs,
    output: OutputArgs,
) -> i32 {
    let parsed = match read_plan(path, &output) {
        Ok(p) => p,
        Err(code) => return code,
    };
    let factory = default_factory();
    if let Err(err) = validate_plan(&parsed.document, &factory) {
        for v in &err.violations {
            print_error(output.format, output.quiet, &format!("{}: {}", v.path, v.message));
        }
        return exit_codes::VALIDATION_FAILED;
    }
    let plan = match Plan::load(&parsed.document, &factory) {
        Ok(plan) => plan,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::VALIDATION_FAILED;
        }
    };

    let config = match load_config(&runtime).await {
        Ok(config) => config,
        Err(message) => {
            print_error(output.format, output.quiet, &message);
            return exit_codes::RUNTIME_ERROR;
        }
    };
    init_tracing(&config.log);
    tracing::debug!(plan = plan.name(), env = %config.app_env, "plan loaded");

    let origin = match request {
        Some(path) => match load_request(path) {
            Ok(origin) => origin,
            Err(message) => {
                print_error(output.format, output.quiet, &message);
                return exit_codes::RUNTIME_ERROR;
            }
        },
        None => OriginRequest::default(),
    };
    let account = match account {
        Some(id) => AccountManager {
            account_id: Some(id),
            ..AccountManager::default()
        },
        None => AccountManager::anonymous(),
    };

    let services = match build_services(config) {
        Ok(services) => services,
        Err(message) => {
            print_error(output.format, output.quiet, &message);
            return exit_codes::RUNTIME_ERROR;
        }
    };
    let run = PlanRunner::new(services).run(&plan, origin, account).await;

    let outcome = match &run.outcome {
        PlanOutcome::Responded(_) => "responded",
        PlanOutcome::Completed(_) => "completed",
        PlanOutcome::Failed(_) => "failed",
    };
    let failed = run.outcome.is_failure();
    let result = RunResult {
        run_id: run.run_id.to_string(),
        outcome,
        response: run.outcome.into_response().to_json(),
    };
    print_result(output.format, output.quiet, &result);

    if failed {
        exit_codes::RUN_FAILED
    } else {
        exit_codes::SUCCESS
    }
}

async fn load_config(runtime: &RuntimeArgs) -> Result<RuntimeConfig, String> {
    let mut config = RuntimeConfig::load(runtime.config.as_deref()).map_err(|e| e.to_string())?;
    if let Some(env) = &runtime.env {
        config.app_env = env.parse::<AppEnv>()?;
    }
    let secrets_dir = runtime
        .secrets_dir
        .clone()
        .or_else(|| {
            runtime
                .config
                .as_deref()
                .and_then(Path::parent)
                .map(Path::to_path_buf)
        })
        .unwrap_or_else(|| PathBuf::from("."));
    let provider = CompositeProvider::standard(secrets_dir);
    resolve_config(&provider, &mut config)
        .await
        .map_err(|e| format!("failed to resolve secrets: {e}"))?;
    Ok(config)
}

fn load_request(path: &Path) -> Result<OriginRequest, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read {}: {e}", path.display()))?;
    // YAML is a superset of JSON.
    let json: JsonValue = serde_yaml::from_str(&content)
        .map_err(|e| format!("invalid request file {}: {e}", path.display()))?;
    Ok(OriginRequest::from_json(&json))
}

fn build_services(config: RuntimeConfig) -> Result<PlanServices, String> {
    let http = ReqwestHttpClient::new(&config.transport)
        .map_err(|e| format!("failed to build http client: {e}"))?;
    let resources = PostgresResources::from_config(&config.resources);
    let access = (!config.access.clients.is_empty())
        .then(|| StaticAccessController::new(&config.access));

    let mut services = PlanServices::new(Arc::new(config), Arc::new(http))
        .with_resources(Arc::new(resources));
    if let Some(access) = access {
        services = services.with_access(Arc::new(access));
    }
    Ok(services)
}
