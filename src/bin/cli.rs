use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use fluxcheck::check::Check;
use fluxcheck::error::CheckError;
use fluxcheck::flux::{format_package, parse_source};
use fluxcheck::settings::{self, ScriptSettings};
use fluxcheck::storage::{atomic_write, read_json};

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(
    name = "fluxcheck",
    about = "Compile alert check definitions into Flux scripts",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Script settings JSON file
    #[arg(long, global = true)]
    settings: Option<PathBuf>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile check JSON files into Flux scripts
    Compile {
        #[arg(required = true)]
        files: Vec<PathBuf>,
        /// Write `<stem>.flux` files here instead of printing the scripts
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Validate check JSON files without compiling
    Validate {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
    /// Print a Flux file in canonical form
    Fmt { file: PathBuf },
    /// Print the JSON Schema of a check document
    Schema,
}

// ── Per-file results ─────────────────────────────────────────────

#[derive(Serialize)]
struct FileReport {
    file: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    script: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    written: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<CheckError>,
}

impl FileReport {
    fn new(path: &Path, result: Result<Outcome, CheckError>) -> Self {
        let mut report = Self {
            file: path.display().to_string(),
            script: None,
            written: None,
            error: None,
        };
        match result {
            Ok(Outcome::Script(script)) => report.script = Some(script),
            Ok(Outcome::Written(out)) => report.written = Some(out.display().to_string()),
            Ok(Outcome::Valid) => {}
            Err(e) => report.error = Some(e),
        }
        report
    }
}

enum Outcome {
    Script(String),
    Written(PathBuf),
    Valid,
}

fn load_check(path: &Path) -> Result<Check, CheckError> {
    let check: Check = read_json(path)?;
    debug!(file = %path.display(), kind = check.kind(), "loaded check");
    Ok(check)
}

fn compile_file(
    path: &Path,
    settings: &ScriptSettings,
    out_dir: Option<&Path>,
) -> Result<Outcome, CheckError> {
    let script = load_check(path)?.generate_flux(settings)?;
    let Some(dir) = out_dir else {
        return Ok(Outcome::Script(script));
    };
    let mut name = path.file_stem().unwrap_or(path.as_os_str()).to_os_string();
    name.push(".flux");
    let out = dir.join(name);
    atomic_write(&out, script.as_bytes())?;
    info!(file = %path.display(), out = %out.display(), "wrote script");
    Ok(Outcome::Written(out))
}

fn validate_file(path: &Path) -> Result<Outcome, CheckError> {
    load_check(path)?.valid()?;
    Ok(Outcome::Valid)
}

// ── Output ───────────────────────────────────────────────────────

/// Prints every report and returns whether all of them succeeded.
fn print_reports(reports: &[FileReport], raw_json: bool) -> bool {
    if raw_json {
        println!("{}", serde_json::to_string_pretty(reports).unwrap_or_default());
    } else {
        let many = reports.len() > 1;
        for report in reports {
            match (&report.error, &report.script, &report.written) {
                (Some(e), _, _) => eprintln!("Error: {}: {e}", report.file),
                (None, Some(script), _) => {
                    if many {
                        println!("// {}", report.file);
                    }
                    println!("{script}");
                }
                (None, None, Some(out)) => println!("{} -> {out}", report.file),
                (None, None, None) => println!("{}: ok", report.file),
            }
        }
    }
    reports.iter().all(|r| r.error.is_none())
}

fn run_fmt(path: &Path, raw_json: bool) -> Result<bool, CheckError> {
    let source = std::fs::read_to_string(path)?;
    let (package, errors) = parse_source(&source);
    let file = path.display().to_string();

    if errors.is_empty() {
        let script = format_package(&package);
        if raw_json {
            let json = serde_json::json!({ "file": file, "script": script });
            println!("{}", serde_json::to_string_pretty(&json)?);
        } else {
            println!("{script}");
        }
        return Ok(true);
    }

    if raw_json {
        let json = serde_json::json!({ "file": file, "errors": errors });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        for err in &errors {
            eprintln!("{file}: {err}");
        }
    }
    Ok(false)
}

fn run(cli: Cli) -> Result<bool, CheckError> {
    let settings = match &cli.settings {
        Some(path) => settings::load_settings(path)?,
        None => ScriptSettings::default(),
    };

    match cli.command {
        Commands::Compile { files, out_dir } => {
            if let Some(dir) = &out_dir {
                std::fs::create_dir_all(dir)?;
            }
            let reports: Vec<FileReport> = files
                .par_iter()
                .map(|path| FileReport::new(path, compile_file(path, &settings, out_dir.as_deref())))
                .collect();
            Ok(print_reports(&reports, cli.json))
        }
        Commands::Validate { files } => {
            let reports: Vec<FileReport> = files
                .par_iter()
                .map(|path| FileReport::new(path, validate_file(path)))
                .collect();
            Ok(print_reports(&reports, cli.json))
        }
        Commands::Fmt { file } => run_fmt(&file, cli.json),
        Commands::Schema => {
            let schema = schemars::schema_for!(Check);
            println!("{}", serde_json::to_string_pretty(&schema)?);
            Ok(true)
        }
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("fluxcheck=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let raw = cli.json;

    match run(cli) {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            if raw {
                let json = serde_json::json!({ "error": e });
                println!("{}", serde_json::to_string_pretty(&json).unwrap_or_default());
            } else {
                eprintln!("Error: {e}");
            }
            process::exit(1);
        }
    }
}
