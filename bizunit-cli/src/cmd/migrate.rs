use serde::Serialize;

use bizunit_store::{run_migrations, PostgresPlanStore};

use crate::exit_codes;
use crate::output::{print_error, print_result, OutputFormat};
use crate::utils::{get_database_url, redact_url_password};
use crate::{OutputArgs, StoreArgs};

#[derive(Serialize)]
struct MigrateResult {
    success: bool,
    message: String,
}

pub async fn migrate_cmd(store: StoreArgs, max_connections: u32, output: OutputArgs) -> i32 {
    let database_url = match get_database_url(store, &output) {
        Some(v) => v,
        None => return exit_codes::RUNTIME_ERROR,
    };

    let pg = match PostgresPlanStore::connect(&database_url, max_connections).await {
        Ok(s) => s,
        Err(e) => {
            let safe_url = redact_url_password(&database_url);
            print_error(output.format, output.quiet, &format!("failed to connect to postgres at {safe_url}: {e}"));
            return exit_codes::RUNTIME_ERROR;
        }
    };

    match run_migrations(pg.pool()).await {
        Ok(()) => {
            let result = MigrateResult {
                success: true,
                message: "migrations applied".to_string(),
            };
            if output.format == OutputFormat::Text && !output.quiet {
                println!("ok: plan store migrations applied");
            } else {
                print_result(output.format, output.quiet, &result);
            }
            exit_codes::SUCCESS
        }
        Err(e) => {
            print_error(output.format, output.quiet, &format!("migration failed: {e}"));
            exit_codes::RUNTIME_ERROR
        }
    }
}
