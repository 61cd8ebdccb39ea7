// SPDX-License-Identifier: MIT OR Apache-2.0

#![forbid(unsafe_code)]

use gpnd_cli::{ExperimentOutcome, ExperimentSpec, run_experiment};
use gpnd_core::{ExecutionContext, GpndError, PipelineConfig};
use serde::Serialize;
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::process;

struct Cli {
    command: Command,
}

enum Command {
    Run(RunArgs),
}

#[derive(Debug)]
struct RunArgs {
    models: PathBuf,
    data: PathBuf,
    folding_id: usize,
    inlier_classes: Vec<u32>,
    checkpoint_class: Option<u32>,
    total_classes: u32,
    fold_count: usize,
    multiplier: usize,
    config: Option<PathBuf>,
    sample_grid: Option<PathBuf>,
    output: Option<PathBuf>,
}

impl Default for RunArgs {
    fn default() -> Self {
        Self {
            models: PathBuf::new(),
            data: PathBuf::new(),
            folding_id: 0,
            inlier_classes: Vec::new(),
            checkpoint_class: None,
            total_classes: 10,
            fold_count: 5,
            multiplier: 1,
            config: None,
            sample_grid: None,
            output: None,
        }
    }
}

#[derive(Debug)]
enum CliError {
    Gpnd(GpndError),
    Io {
        context: String,
        source: std::io::Error,
    },
    Json {
        context: String,
        source: serde_json::Error,
    },
    InvalidInput(String),
}

impl CliError {
    fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    fn json(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Json {
            context: context.into(),
            source,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Gpnd(err) => err.code(),
            Self::Io { .. } => "io_error",
            Self::Json { .. } => "json_error",
            Self::InvalidInput(_) => "invalid_input",
        }
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Gpnd(err) => write!(f, "{err}"),
            Self::Io { context, source } => write!(f, "{context}: {source}"),
            Self::Json { context, source } => write!(f, "{context}: {source}"),
            Self::InvalidInput(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Gpnd(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Json { source, .. } => Some(source),
            Self::InvalidInput(_) => None,
        }
    }
}

impl From<GpndError> for CliError {
    fn from(value: GpndError) -> Self {
        Self::Gpnd(value)
    }
}

#[derive(Serialize)]
struct RunOutput {
    command: &'static str,
    folding_id: usize,
    inlier_classes: Vec<u32>,
    checkpoint_class: u32,
    outcome: ExperimentOutcome,
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorPayload,
}

#[derive(Serialize)]
struct ErrorPayload {
    code: String,
    message: String,
}

fn main() {
    if let Err(err) = run() {
        emit_structured_error(&err);
        process::exit(1);
    }
}

fn run() -> Result<(), CliError> {
    let Some(cli) = parse_cli_from_env()? else {
        return Ok(());
    };

    match cli.command {
        Command::Run(args) => handle_run(args),
    }
}

fn parse_cli_from_env() -> Result<Option<Cli>, CliError> {
    let args = env::args().skip(1).collect::<Vec<_>>();
    if args.is_empty() {
        print_root_help();
        return Ok(None);
    }

    if matches!(args[0].as_str(), "-h" | "--help") {
        print_root_help();
        return Ok(None);
    }
    if matches!(args[0].as_str(), "-V" | "--version") {
        print_version();
        return Ok(None);
    }

    let command_name = args[0].clone();
    let rest = &args[1..];

    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-h" | "--help"))
    {
        print_command_help(command_name.as_str())?;
        return Ok(None);
    }
    if rest
        .iter()
        .any(|arg| matches!(arg.as_str(), "-V" | "--version"))
    {
        print_version();
        return Ok(None);
    }

    let command = match command_name.as_str() {
        "run" => Command::Run(parse_run_args(rest)?),
        _ => {
            return Err(CliError::invalid_input(format!(
                "unknown command '{command_name}'; expected: run"
            )));
        }
    };

    Ok(Some(Cli { command }))
}

fn parse_run_args(tokens: &[String]) -> Result<RunArgs, CliError> {
    let mut args = RunArgs::default();
    let mut idx = 0usize;
    while idx < tokens.len() {
        let (flag, inline_value) = split_flag(tokens[idx].as_str())?;
        match flag {
            "--models" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.models = PathBuf::from(raw);
            }
            "--data" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.data = PathBuf::from(raw);
            }
            "--folding-id" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.folding_id = parse_usize_arg(raw.as_str(), flag)?;
            }
            "--inlier-classes" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.inlier_classes = parse_class_list(raw.as_str(), flag)?;
            }
            "--checkpoint-class" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.checkpoint_class = Some(parse_u32_arg(raw.as_str(), flag)?);
            }
            "--total-classes" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.total_classes = parse_u32_arg(raw.as_str(), flag)?;
            }
            "--fold-count" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.fold_count = parse_usize_arg(raw.as_str(), flag)?;
            }
            "--multiplier" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.multiplier = parse_usize_arg(raw.as_str(), flag)?;
            }
            "--config" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.config = Some(PathBuf::from(raw));
            }
            "--sample-grid" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.sample_grid = Some(PathBuf::from(raw));
            }
            "--output" => {
                let raw = take_flag_value(flag, inline_value, tokens, &mut idx)?;
                args.output = Some(PathBuf::from(raw));
            }
            other => {
                return Err(CliError::invalid_input(format!(
                    "unknown run option '{other}'"
                )));
            }
        }
        idx += 1;
    }

    if args.models.as_os_str().is_empty() {
        return Err(CliError::invalid_input("run requires --models <dir>"));
    }
    if args.data.as_os_str().is_empty() {
        return Err(CliError::invalid_input("run requires --data <dir>"));
    }
    if args.inlier_classes.is_empty() {
        return Err(CliError::invalid_input(
            "run requires --inlier-classes <c0,c1,...>",
        ));
    }

    Ok(args)
}

/// Comma-separated class labels, e.g. `0,1,4`.
fn parse_class_list(raw: &str, flag: &str) -> Result<Vec<u32>, CliError> {
    let mut classes = Vec::new();
    for part in raw.split(',') {
        let trimmed = part.trim();
        if trimmed.is_empty() {
            return Err(CliError::invalid_input(format!(
                "{flag} expects comma-separated class labels, got '{raw}'"
            )));
        }
        classes.push(parse_u32_arg(trimmed, flag)?);
    }
    Ok(classes)
}

fn split_flag(token: &str) -> Result<(&str, Option<String>), CliError> {
    if !token.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "unexpected positional argument '{token}'; expected --flag value"
        )));
    }
    if let Some((flag, value)) = token.split_once('=') {
        return Ok((flag, Some(value.to_string())));
    }
    Ok((token, None))
}

fn take_flag_value(
    flag: &str,
    inline_value: Option<String>,
    tokens: &[String],
    idx: &mut usize,
) -> Result<String, CliError> {
    if let Some(value) = inline_value {
        return Ok(value);
    }

    *idx += 1;
    let value = tokens
        .get(*idx)
        .ok_or_else(|| CliError::invalid_input(format!("{flag} requires a value")))?;
    if value.starts_with("--") {
        return Err(CliError::invalid_input(format!(
            "{flag} requires a value, but got option '{value}'"
        )));
    }
    Ok(value.clone())
}

fn parse_usize_arg(raw: &str, flag: &str) -> Result<usize, CliError> {
    raw.parse::<usize>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn parse_u32_arg(raw: &str, flag: &str) -> Result<u32, CliError> {
    raw.parse::<u32>().map_err(|_| {
        CliError::invalid_input(format!(
            "{flag} expects a non-negative integer, got '{raw}'"
        ))
    })
}

fn print_version() {
    println!("gpnd {}", env!("CARGO_PKG_VERSION"));
}

fn print_root_help() {
    println!(
        "gpnd {}\n\nUSAGE:\n  gpnd <COMMAND> [OPTIONS]\n\nCOMMANDS:\n  run   Run one novelty-detection experiment from trained checkpoints\n\nGLOBAL OPTIONS:\n  -h, --help      Show help\n  -V, --version   Show version\n\nRun 'gpnd <COMMAND> --help' for subcommand options.",
        env!("CARGO_PKG_VERSION")
    );
}

fn print_command_help(command: &str) -> Result<(), CliError> {
    match command {
        "run" => {
            println!(
                "USAGE:\n  gpnd run --models <dir> --data <dir> --inlier-classes <c0,c1,...> [OPTIONS]\n\nOPTIONS:\n  --models <dir>                 Required checkpoint directory (Gmodel_*/Emodel_*.npy)\n  --data <dir>                   Required fold directory (data_fold_<i>.npy)\n  --folding-id <usize>           Test fold index. Default: 0\n  --inlier-classes <c0,c1,...>   Required comma-separated inlier labels\n  --checkpoint-class <u32>       Class baked into checkpoint names. Default: first inlier class\n  --total-classes <u32>          Default: 10\n  --fold-count <usize>           Default: 5\n  --multiplier <usize>           Scoring batch-size multiplier. Default: 1\n  --config <path>                Optional config JSON patch\n  --sample-grid <path>           Write an 8x8 generator sample sheet (PGM)\n  --output <path>                Write JSON output to file"
            );
            Ok(())
        }
        _ => Err(CliError::invalid_input(format!(
            "unknown command '{command}'; expected: run"
        ))),
    }
}

fn handle_run(args: RunArgs) -> Result<(), CliError> {
    let mut config = PipelineConfig::default();
    if let Some(path) = args.config.as_deref() {
        config = config.merged_from_file(path)?;
    }

    let checkpoint_class = match args.checkpoint_class {
        Some(class) => class,
        // Single-inlier-class runs name their checkpoints after that class.
        None => args.inlier_classes[0],
    };

    let spec = ExperimentSpec {
        folding_id: args.folding_id,
        inlier_classes: args.inlier_classes.clone(),
        checkpoint_class,
        total_classes: args.total_classes,
        batch_multiplier: args.multiplier,
        fold_count: args.fold_count,
        model_dir: args.models,
        dataset_dir: args.data,
        sample_grid_path: args.sample_grid,
    };

    let ctx = ExecutionContext::new();
    let outcome = run_experiment(&ctx, &spec, &config)?;

    write_json_output(
        &RunOutput {
            command: "run",
            folding_id: spec.folding_id,
            inlier_classes: spec.inlier_classes,
            checkpoint_class,
            outcome,
        },
        args.output.as_deref(),
    )
}

fn write_json_output<T: Serialize>(
    payload: &T,
    output_path: Option<&Path>,
) -> Result<(), CliError> {
    let encoded = serde_json::to_string_pretty(payload)
        .map_err(|source| CliError::json("failed to serialize JSON output", source))?;

    if let Some(path) = output_path {
        fs::write(path, format!("{encoded}\n"))
            .map_err(|source| CliError::io(format!("failed to write '{}'", path.display()), source))
    } else {
        println!("{encoded}");
        Ok(())
    }
}

fn emit_structured_error(err: &CliError) {
    let envelope = ErrorEnvelope {
        error: ErrorPayload {
            code: err.code().to_string(),
            message: err.to_string(),
        },
    };

    match serde_json::to_string_pretty(&envelope) {
        Ok(json) => eprintln!("{json}"),
        Err(_) => eprintln!(
            "{{\"error\":{{\"code\":\"{}\",\"message\":\"{}\"}}}}",
            err.code(),
            err
        ),
    }
}
