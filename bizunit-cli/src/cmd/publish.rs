use std::path::Path;

use bizunit_core::validate_plan;
use bizunit_exec::default_factory;
use bizunit_store::{NewPlan, PlanStore, PostgresPlanStore};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::{get_database_url, read_plan, redact_url_password};
use crate::{OutputArgs, StoreArgs};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PublishResult {
    id: String,
    name: String,
    version: i32,
    doc_hash: String,
}

pub async fn publish_cmd(path: &Path, store: StoreArgs, output: OutputArgs) -> i32 {
    let parsed = match read_plan(path, &output) {
        Ok(p) => p,
        Err(code) => return code,
    };
    if let Err(err) = validate_plan(&parsed.document, &default_factory()) {
        for v in &err.violations {
            print_error(output.format, output.quiet, &format!("{}: {}", v.path, v.message));
        }
        return exit_codes::VALIDATION_FAILED;
    }

    let database_url = match get_database_url(store, &output) {
        Some(u) => u,
        None => return exit_codes::RUNTIME_ERROR,
    };
    let pg = match PostgresPlanStore::connect(&database_url, 2).await {
        Ok(s) => s,
        Err(e) => {
            let safe_url = redact_url_password(&database_url);
            print_error(
                output.format,
                output.quiet,
                &format!("database connection failed to {safe_url}: {e}"),
            );
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let new_plan = match NewPlan::from_document(&parsed.document) {
        Ok(p) => p,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };
    let record = match pg.upsert_plan(new_plan).await {
        Ok(r) => r,
        Err(e) => {
            print_error(output.format, output.quiet, &format!("failed to store plan: {e}"));
            return exit_codes::RUNTIME_ERROR;
        }
    };

    let result = PublishResult {
        id: record.id.to_string(),
        name: record.name,
        version: record.version,
        doc_hash: record.doc_hash,
    };
    if output.format == OutputFormat::Text && !output.quiet {
        println!("ok: published `{}` version {}", result.name, result.version);
    } else {
        print_result(output.format, output.quiet, &result);
    }
    exit_codes::SUCCESS
}
