use std::path::Path;

use bizunit_core::Plan;
use bizunit_exec::default_factory;

use crate::exit_codes;
use crate::output::{print_error, print_result};
use crate::utils::read_plan;
use crate::OutputArgs;

/// Prints the document as the built tree serializes it, which normalizes omitted `extra` and
/// `template` members.
pub async fn template_cmd(path: &Path, output: OutputArgs) -> i32 {
    let parsed = match read_plan(path, &output) {
        Ok(p) => p,
        Err(code) => return code,
    };

    let plan = match Plan::load(&parsed.document, &default_factory()) {
        Ok(plan) => plan,
        Err(e) => {
            print_error(output.format, output.quiet, &e.to_string());
            return exit_codes::VALIDATION_FAILED;
        }
    };

    print_result(output.format, output.quiet, &plan.document());
    exit_codes::SUCCESS
}
