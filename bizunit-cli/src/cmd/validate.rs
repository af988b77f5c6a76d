use std::path::Path;

use bizunit_core::validate_plan;
use bizunit_exec::default_factory;
use serde::Serialize;

use crate::exit_codes;
use crate::output::{print_result, OutputFormat};
use crate::utils::read_plan;
use crate::OutputArgs;

#[derive(Serialize)]
struct ValidateResult {
    valid: bool,
    name: String,
    format: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

pub async fn validate_cmd(path: &Path, output: OutputArgs) -> i32 {
    let parsed = match read_plan(path, &output) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let factory = default_factory();
    match validate_plan(&parsed.document, &factory) {
        Ok(()) => {
            let result = ValidateResult {
                valid: true,
                name: parsed.document.name.clone(),
                format: format!("{:?}", parsed.format),
                errors: vec![],
            };
            if output.format == OutputFormat::Text && !output.quiet {
                println!(
                    "ok: valid plan `{}` ({} root blocks, {:?})",
                    parsed.document.name,
                    parsed.document.blocks.len(),
                    parsed.format
                );
            } else {
                print_result(output.format, output.quiet, &result);
            }
            exit_codes::SUCCESS
        }
        Err(err) => {
            let errors: Vec<String> = err
                .violations
                .iter()
                .map(|v| format!("{}: {}", v.path, v.message))
                .collect();
            let result = ValidateResult {
                valid: false,
                name: parsed.document.name.clone(),
                format: format!("{:?}", parsed.format),
                errors: errors.clone(),
            };
            if output.format == OutputFormat::Text && !output.quiet {
                eprintln!("error: validation failed");
                for e in &errors {
                    eprintln!("- {e}");
                }
            } else {
                print_result(output.format, output.quiet, &result);
            }
            exit_codes::VALIDATION_FAILED
        }
    }
}
