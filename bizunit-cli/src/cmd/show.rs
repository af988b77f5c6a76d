use bizunit_store::{PlanStore, PostgresPlanStore};
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::{get_database_url, redact_url_password};
use crate::{OutputArgs, StoreArgs};

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PlanListing {
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    version: i32,
    updated_at: String,
}

pub async fn show_cmd(name: Option<&str>, store: StoreArgs, output: OutputArgs) -> i32 {
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

    let Some(name) = name else {
        return list(&pg, &output).await;
    };
    let record = match pg.get_plan(name).await {
        Ok(Some(r)) => r,
        Ok(None) => {
            print_error(output.format, output.quiet, &format!("no plan named `{name}`"));
            return exit_codes::RUNTIME_ERROR;
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };
    match record.document() {
        Ok(document) => {
            print_result(output.format, output.quiet, &document);
            exit_codes::SUCCESS
        }
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            exit_codes::RUNTIME_ERROR
        }
    }
}

async fn list(pg: &PostgresPlanStore, output: &OutputArgs) -> i32 {
    let plans = match pg.list_plans().await {
        Ok(p) => p,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::RUNTIME_ERROR;
        }
    };
    if output.format == OutputFormat::Text && !output.quiet {
        for p in &plans {
            println!("{}\tv{}\t{}", p.name, p.version, p.updated_at.to_rfc3339());
        }
        return exit_codes::SUCCESS;
    }
    let listing: Vec<PlanListing> = plans
        .into_iter()
        .map(|p| PlanListing {
            name: p.name,
            description: p.description,
            version: p.version,
            updated_at: p.updated_at.to_rfc3339(),
        })
        .collect();
    print_result(output.format, output.quiet, &listing);
    exit_codes::SUCCESS
}
