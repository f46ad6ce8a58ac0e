use std::fs;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use component_form::{compute_visibility, validate_step};
use flow_spec::FormSchema;
use serde_json::{Map, Value, json};

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Conditional form visibility and step-flow helper",
    long_about = "Inspects form schemas, simulates conditional visibility, and computes step decisions backed by the form component"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print a summary of a form schema: fields, rules, steps.
    Inspect {
        /// Path to the FormSchema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
    },
    /// Apply a values file and print the resulting visibility output.
    Visibility {
        /// Path to the FormSchema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// JSON file of field values to apply.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
    },
    /// Compute the next step for a current step and submitted values.
    Step {
        /// Path to the FormSchema JSON.
        #[arg(long, value_name = "SCHEMA")]
        schema: PathBuf,
        /// Id of the step being validated.
        #[arg(long, value_name = "STEP")]
        current: String,
        /// JSON file of submitted field values.
        #[arg(long, value_name = "VALUES")]
        values: PathBuf,
    },
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Inspect { schema } => run_inspect(schema),
        Command::Visibility { schema, values } => run_visibility(schema, values),
        Command::Step {
            schema,
            current,
            values,
        } => run_step(schema, current, values),
    }
}

fn load_schema(path: &PathBuf) -> CliResult<(FormSchema, String)> {
    let text = fs::read_to_string(path)?;
    let schema: FormSchema = serde_json::from_str(&text)?;
    Ok((schema, text))
}

fn load_values(path: &PathBuf) -> CliResult<Map<String, Value>> {
    let text = fs::read_to_string(path)?;
    let value: Value = serde_json::from_str(&text)?;
    Ok(value.as_object().cloned().unwrap_or_default())
}

fn component_config(schema_text: &str) -> String {
    json!({ "form_schema_json": schema_text }).to_string()
}

fn run_inspect(schema_path: PathBuf) -> CliResult<()> {
    let (schema, _) = load_schema(&schema_path)?;
    println!("Form: {} ({})", schema.title, schema.id);
    println!("Version: {}", schema.version);
    if let Some(description) = &schema.description {
        println!("Description: {}", description);
    }

    println!("Fields:");
    for field in &schema.fields {
        let mut entry = format!(" - {} ({:?})", field.name, field.kind);
        if field.required {
            entry.push_str(" [required]");
        }
        if field.rules.as_ref().is_some_and(|rules| !rules.is_empty()) {
            entry.push_str(" [conditional]");
        }
        if !field.inner_rules.is_empty() {
            entry.push_str(&format!(" [{} option rules]", field.inner_rules.len()));
        }
        println!("{}", entry);
    }

    if !schema.steps.is_empty() {
        println!("Steps:");
        for step in &schema.steps {
            println!(" - {}: {}", step.id, step.field_names.join(", "));
        }
    }
    if schema.is_multiflow() {
        println!("Multiflow entries:");
        for entry in &schema.multiflow {
            println!(
                " - {} -> {} ({} condition groups)",
                entry.current_step_id,
                entry.next_step_id,
                entry.condition_groups.len()
            );
        }
    }
    Ok(())
}

fn run_visibility(schema_path: PathBuf, values_path: PathBuf) -> CliResult<()> {
    let (schema, schema_text) = load_schema(&schema_path)?;
    let values = load_values(&values_path)?;
    let payload = compute_visibility(
        &schema.id,
        &component_config(&schema_text),
        &Value::Object(values).to_string(),
    );
    let parsed: Value = serde_json::from_str(&payload)?;
    if let Some(error) = parsed.get("error") {
        return Err(format!("visibility failed: {}", error).into());
    }
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}

fn run_step(schema_path: PathBuf, current: String, values_path: PathBuf) -> CliResult<()> {
    let (schema, schema_text) = load_schema(&schema_path)?;
    let values = load_values(&values_path)?;
    let request = json!({
        "formId": schema.id,
        "currentStepId": current,
        "submittedFieldValues": values,
        "stepsSetup": schema.steps_setup(),
    });
    let payload = validate_step(&schema.id, &component_config(&schema_text), &request.to_string());
    let parsed: Value = serde_json::from_str(&payload)?;
    if let Some(error) = parsed.get("error") {
        return Err(format!("step validation failed: {}", error).into());
    }
    println!("{}", serde_json::to_string_pretty(&parsed)?);
    Ok(())
}
