use std::{fs, path::Path, process::ExitCode};

use model::{SubmissionContract, TemplateField};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::cli::CheckArgs;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct TemplateFile {
    template_fields: Vec<TemplateField>,
}

/// The payload file may hold the bare values map or a whole submission body.
#[derive(Deserialize)]
#[serde(untagged)]
enum PayloadFile {
    Submission { values: Map<String, Value> },
    Values(Map<String, Value>),
}

fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, String> {
    let content =
        fs::read_to_string(path).map_err(|err| format!("{}: {err}", path.display()))?;
    serde_json::from_str(&content).map_err(|err| format!("{}: {err}", path.display()))
}

pub fn check(args: CheckArgs) -> ExitCode {
    let template: TemplateFile = match read_json(&args.template) {
        Ok(template) => template,
        Err(err) => {
            eprintln!("Failed to read template {err}");
            return ExitCode::FAILURE;
        }
    };
    let values = match read_json(&args.payload) {
        Ok(PayloadFile::Submission { values } | PayloadFile::Values(values)) => values,
        Err(err) => {
            eprintln!("Failed to read payload {err}");
            return ExitCode::FAILURE;
        }
    };
    run(&template.template_fields, &values)
}

fn run(fields: &[TemplateField], values: &Map<String, Value>) -> ExitCode {
    let contract = SubmissionContract::from_fields(fields);
    let unknown = contract.unknown_keys(values);
    if !unknown.is_empty() {
        eprintln!("Unknown field ids: {}", unknown.join(", "));
        return ExitCode::FAILURE;
    }
    match contract.apply(values) {
        Ok(normalized) => {
            println!("{}", serde_json::to_string_pretty(&normalized).unwrap_or_default());
            ExitCode::SUCCESS
        }
        Err(failure) => {
            for error in &failure.errors {
                let title = fields
                    .iter()
                    .find(|field| field.id == error.field_id)
                    .map_or("?", |field| field.title.as_str());
                eprintln!("{title} ({}): {}", error.field_id, error.message);
            }
            ExitCode::FAILURE
        }
    }
}
