mod watch;

use clap::{Parser, Subcommand, ValueEnum};
use component_fields::{operators as component_operators, refresh as component_refresh};
use fields_spec::{
    FormSpec, FormState, RuleReport, Severity, SubmissionCheck, VisibilityPolicy,
    build_render_payload, check_submission, form_schema, refresh, render_text, validate,
};
use serde_json::{Map, Value, json};
use std::fs;
use std::path::{Path, PathBuf};
use watch::WatchPresenter;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Conditional form fields CLI",
    long_about = "Evaluates field visibility rules, checks rule definitions and replays live input against a form spec"
)]
struct Cli {
    /// Log rule traces and per-field outcomes (overridden by RUST_LOG).
    #[arg(long, global = true, alias = "debug")]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum RenderMode {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// Run one visibility pass over a form and print every field.
    Refresh {
        /// Path to the FormSpec JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Optional JSON file with the current input values.
        #[arg(long, value_name = "STATE")]
        state: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Read `{"field": ..., "value": ...}` lines from stdin and refresh after each quiet period.
    Watch {
        /// Path to the FormSpec JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Quiet period in milliseconds (defaults to the form's policy).
        #[arg(long, value_name = "MS")]
        debounce_ms: Option<u64>,
        #[arg(long, value_enum, default_value_t = RenderMode::Text)]
        format: RenderMode,
    },
    /// Check the rules of a FormSpec for unknown targets, operators and ordering problems.
    Check {
        /// Path to the FormSpec JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
    },
    /// Check submitted answers, requiring only the fields their rules enable.
    Submit {
        /// Path to the FormSpec JSON.
        #[arg(long, value_name = "SPEC")]
        spec: PathBuf,
        /// Path to the answers JSON file.
        #[arg(long, value_name = "ANSWERS")]
        answers: PathBuf,
    },
    /// List the comparison operators, optionally for one value kind.
    Operators {
        /// Value kind such as `numeric`, `date` or `multi_choice`.
        #[arg(long)]
        kind: Option<String>,
    },
    /// Print the JSON schema of FormSpec documents.
    Schema,
}

fn main() -> CliResult<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Refresh {
            spec,
            state,
            format,
        } => run_refresh(spec, state, format),
        Command::Watch {
            spec,
            debounce_ms,
            format,
        } => run_watch(spec, debounce_ms, format),
        Command::Check { spec } => run_check(spec),
        Command::Submit { spec, answers } => run_submit(spec, answers),
        Command::Operators { kind } => run_operators(kind),
        Command::Schema => {
            println!("{}", serde_json::to_string_pretty(&form_schema())?);
            Ok(())
        }
    }
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp(None)
        .init();
}

fn read_spec(path: &Path) -> CliResult<(String, FormSpec)> {
    let spec_json = fs::read_to_string(path)?;
    let spec: FormSpec = serde_json::from_str(&spec_json)?;
    Ok((spec_json, spec))
}

fn read_answers(path: Option<&Path>) -> CliResult<Value> {
    match path {
        Some(path) => Ok(serde_json::from_str(&fs::read_to_string(path)?)?),
        None => Ok(Value::Object(Map::new())),
    }
}

/// Turns a component response into a value, surfacing its `error` field.
fn parse_component_result(response: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(response)?;
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(error.to_string().into());
    }
    Ok(value)
}

fn run_refresh(spec_path: PathBuf, state_path: Option<PathBuf>, mode: RenderMode) -> CliResult<()> {
    let (spec_json, spec) = read_spec(&spec_path)?;
    let answers = read_answers(state_path.as_deref())?;

    match mode {
        RenderMode::Text => {
            let mut state = FormState::from_answers(&spec, &answers)?;
            let report = refresh(&mut state);
            let payload = build_render_payload(&spec, &state, &report);
            println!("{}", render_text(&payload));
        }
        RenderMode::Json => {
            let config = json!({ "form_spec_json": spec_json }).to_string();
            let response = component_refresh(&spec.id, &config, &answers.to_string());
            let view = parse_component_result(&response)?;
            println!("{}", serde_json::to_string_pretty(&view)?);
        }
    }
    Ok(())
}

fn run_watch(spec_path: PathBuf, debounce_ms: Option<u64>, mode: RenderMode) -> CliResult<()> {
    let (_, mut spec) = read_spec(&spec_path)?;
    if let Some(debounce_ms) = debounce_ms {
        spec.visibility_policy = Some(VisibilityPolicy {
            debounce_ms,
            ..spec.policy()
        });
    }

    let presenter = WatchPresenter::new(mode);
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let passes = runtime.block_on(async {
        let stdin = tokio::io::BufReader::new(tokio::io::stdin());
        watch::run(&spec, stdin, &presenter).await
    })?;
    log::info!("ran {} refresh passes", passes);
    Ok(())
}

fn run_check(spec_path: PathBuf) -> CliResult<()> {
    let (_, spec) = read_spec(&spec_path)?;
    let report = validate(&spec);
    println!(
        "Rule check: {}",
        if report.valid { "valid" } else { "invalid" }
    );
    describe_rule_report(&report);

    if report.valid {
        Ok(())
    } else {
        Err("rule check failed".into())
    }
}

fn describe_rule_report(report: &RuleReport) {
    for issue in &report.issues {
        let severity = match issue.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        println!(
            "  {} {} [{}] {}",
            severity, issue.path, issue.code, issue.message
        );
    }
}

fn run_submit(spec_path: PathBuf, answers_path: PathBuf) -> CliResult<()> {
    let (_, spec) = read_spec(&spec_path)?;
    let answers = read_answers(Some(&answers_path))?;

    let check = check_submission(&spec, &answers)?;
    println!(
        "Submission: {}",
        if check.valid { "valid" } else { "invalid" }
    );
    describe_submission(&check);

    if check.valid {
        Ok(())
    } else {
        Err("submission check failed".into())
    }
}

fn describe_submission(check: &SubmissionCheck) {
    println!("Enabled fields: {}", check.enabled.join(", "));
    if !check.disabled.is_empty() {
        println!("Disabled fields: {}", check.disabled.join(", "));
    }
    if !check.errors.is_empty() {
        println!("Errors:");
        for error in &check.errors {
            println!("  {} - {}", error.field_id, error.message);
        }
    }
    if !check.missing_required.is_empty() {
        println!(
            "Missing required answers: {}",
            check.missing_required.join(", ")
        );
    }
    if !check.unknown_fields.is_empty() {
        println!(
            "Unknown answer fields: {}",
            check.unknown_fields.join(", ")
        );
    }
}

fn run_operators(kind: Option<String>) -> CliResult<()> {
    let response = component_operators(kind.as_deref().unwrap_or(""));
    let operators = parse_component_result(&response)?;
    for operator in operators.as_array().into_iter().flatten() {
        let kinds = operator["kinds"]
            .as_array()
            .map(|kinds| {
                kinds
                    .iter()
                    .filter_map(Value::as_str)
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .unwrap_or_default();
        println!(
            "{:<4} {}  {} ({})",
            operator["id"].as_str().unwrap_or_default(),
            operator["symbol"].as_str().unwrap_or_default(),
            operator["label"].as_str().unwrap_or_default(),
            kinds
        );
    }
    Ok(())
}
