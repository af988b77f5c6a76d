use crate::error::ParseError;
use crate::plan::PlanDocument;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanFormat {
    Json,
    Yaml,
    Auto,
}

#[derive(Debug, Clone)]
pub struct ParsedPlan {
    pub document: PlanDocument,
    pub format: PlanFormat,
}

pub fn parse_plan_str(input: &str, format: PlanFormat) -> Result<ParsedPlan, ParseError> {
    match format {
        PlanFormat::Json => Ok(ParsedPlan {
            document: serde_json::from_str::<PlanDocument>(input)?,
            format,
        }),
        PlanFormat::Yaml => Ok(ParsedPlan {
            document: serde_yaml::from_str::<PlanDocument>(input)?,
            format,
        }),
        PlanFormat::Auto => parse_plan_auto(input),
    }
}

fn parse_plan_auto(input: &str) -> Result<ParsedPlan, ParseError> {
    // JSON always starts with `{` or `[` after trimming.
    let trimmed = input.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        return match serde_json::from_str::<PlanDocument>(input) {
            Ok(document) => Ok(ParsedPlan {
                document,
                format: PlanFormat::Json,
            }),
            // Flow-style YAML also starts with `{`; report the JSON error if both fail.
            Err(e) => serde_yaml::from_str::<PlanDocument>(input)
                .map(|document| ParsedPlan {
                    document,
                    format: PlanFormat::Yaml,
                })
                .map_err(|_| ParseError::Json(e)),
        };
    }

    match serde_yaml::from_str::<PlanDocument>(input) {
        Ok(document) => Ok(ParsedPlan {
            document,
            format: PlanFormat::Yaml,
        }),
        Err(e) => serde_json::from_str::<PlanDocument>(input)
            .map(|document| ParsedPlan {
                document,
                format: PlanFormat::Json,
            })
            .map_err(|_| ParseError::Yaml(e)),
    }
}
