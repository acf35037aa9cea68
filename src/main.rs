//! Policy Drift CLI
//!
//! Entry point for the `drift` command-line tool.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use policy_drift::cancel::CancellationToken;
use policy_drift::config::EffectiveConfig;
use policy_drift::orchestrator::{run_compare, CompareRequest};
use policy_drift::report::ReportSink;
use policy_drift::source::MockLivePolicySource;

#[derive(Parser)]
#[command(name = "drift")]
#[command(about = "Detect drift between a reference policy set and a live tenant", version)]
struct Cli {
    /// Path to repo-level config (default: .driftconfig.toml)
    #[arg(long, global = true)]
    repo_config: Option<PathBuf>,

    /// Path to host-level config (default: ~/.config/drift/config.toml)
    #[arg(long, global = true)]
    host_config: Option<PathBuf>,

    /// Override the worker-pool size (clamped to [2, 16])
    #[arg(long, global = true)]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare a reference policy set against the live tenant
    Compare {
        /// Directory of reference policy files (JSON or HCL)
        #[arg(long)]
        reference_dir: PathBuf,

        /// Pre-fetched live export document; if omitted, the live source is used
        #[arg(long)]
        entra_file: Option<PathBuf>,

        /// Matching strategy
        #[arg(long, value_parser = ["byName", "byId", "customMapping"])]
        matching: Option<String>,

        /// Case-sensitive name matching
        #[arg(long)]
        case_sensitive: bool,

        /// Non-zero exit code when differences are found
        #[arg(long)]
        exit_on_differences: bool,

        /// Maximum allowed non-ignored differences before treating the run as a threshold breach
        #[arg(long)]
        max_differences: Option<usize>,

        /// Change-type prefixes to force-classify critical (comma-separated, repeatable)
        #[arg(long, value_delimiter = ',')]
        fail_on: Vec<String>,

        /// Change-type prefixes to ignore (comma-separated, repeatable)
        #[arg(long, value_delimiter = ',')]
        ignore: Vec<String>,

        /// Suppress informational output; errors still print
        #[arg(long)]
        quiet: bool,

        /// Report formats to emit (comma-separated)
        #[arg(long, value_delimiter = ',', default_value = "console")]
        formats: Vec<String>,
    },

    /// Inspect the merged configuration
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Print the merged configuration with provenance
    Show,
}

fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Compare {
            reference_dir,
            entra_file,
            matching,
            case_sensitive,
            exit_on_differences,
            max_differences,
            fail_on,
            ignore,
            quiet,
            formats,
        } => run_compare_command(
            &cli.repo_config,
            &cli.host_config,
            cli.jobs,
            reference_dir,
            entra_file,
            matching,
            case_sensitive,
            exit_on_differences,
            max_differences,
            fail_on,
            ignore,
            quiet,
            formats,
        ),
        Commands::Config { action } => match action {
            ConfigCommands::Show => run_config_show(&cli.repo_config, &cli.host_config),
        },
    }
}

fn default_repo_config_path() -> PathBuf {
    PathBuf::from(".driftconfig.toml")
}

fn default_host_config_path() -> PathBuf {
    dirs_home()
        .map(|home| home.join(".config/drift/config.toml"))
        .unwrap_or_else(|| PathBuf::from(".config/drift/config.toml"))
}

fn dirs_home() -> Option<PathBuf> {
    std::env::var_os("HOME").map(PathBuf::from)
}

fn cli_overrides_value(
    matching: &Option<String>,
    case_sensitive: bool,
    exit_on_differences: bool,
    max_differences: Option<usize>,
    fail_on: &[String],
    ignore: &[String],
    jobs: Option<usize>,
) -> serde_json::Value {
    let mut overrides = serde_json::Map::new();

    if matching.is_some() || case_sensitive {
        let mut matching_obj = serde_json::Map::new();
        if let Some(strategy) = matching {
            matching_obj.insert("strategy".to_string(), serde_json::Value::String(strategy.clone()));
        }
        if case_sensitive {
            matching_obj.insert("caseSensitive".to_string(), serde_json::Value::Bool(true));
        }
        overrides.insert("matching".to_string(), serde_json::Value::Object(matching_obj));
    }
    if exit_on_differences {
        overrides.insert("exitOnDifferences".to_string(), serde_json::Value::Bool(true));
    }
    if let Some(max) = max_differences {
        overrides.insert("maxDifferences".to_string(), serde_json::Value::from(max));
    }
    if !fail_on.is_empty() {
        overrides.insert(
            "failOnChangeTypes".to_string(),
            serde_json::Value::from(fail_on.to_vec()),
        );
    }
    if !ignore.is_empty() {
        overrides.insert(
            "ignoreChangeTypes".to_string(),
            serde_json::Value::from(ignore.to_vec()),
        );
    }
    if let Some(jobs) = jobs {
        overrides.insert("jobs".to_string(), serde_json::Value::from(jobs));
    }

    serde_json::Value::Object(overrides)
}

#[allow(clippy::too_many_arguments)]
fn run_compare_command(
    repo_config: &Option<PathBuf>,
    host_config: &Option<PathBuf>,
    jobs: Option<usize>,
    reference_dir: PathBuf,
    entra_file: Option<PathBuf>,
    matching: Option<String>,
    case_sensitive: bool,
    exit_on_differences: bool,
    max_differences: Option<usize>,
    fail_on: Vec<String>,
    ignore: Vec<String>,
    quiet: bool,
    formats: Vec<String>,
) {
    let report_sink = ReportSink::new(quiet);

    let repo_path = repo_config.clone().unwrap_or_else(default_repo_config_path);
    let host_path = host_config.clone().unwrap_or_else(default_host_config_path);

    let overrides = cli_overrides_value(
        &matching,
        case_sensitive,
        exit_on_differences,
        max_differences,
        &fail_on,
        &ignore,
        jobs,
    );

    let config = match EffectiveConfig::build(Some(&host_path), Some(&repo_path), Some(overrides)) {
        Ok(c) => c,
        Err(e) => {
            report_sink.error(&format!("invalid configuration: {e}"));
            process::exit(3);
        }
    };

    let cancellation = CancellationToken::new();
    if let Err(e) = cancellation.install_signal_handler() {
        report_sink.error(&format!("could not install signal handler: {e}"));
    }

    // No live directory-service client ships with this core; an
    // `--entra-file` is required until a real `LivePolicySource` is
    // wired in by the caller's integration layer.
    let live_source = MockLivePolicySource::new(serde_json::json!({"policies": []}));

    let request = CompareRequest {
        reference_dir,
        entra_file,
        live_source: &live_source,
        config: &config,
        cancellation,
        report_sink: &report_sink,
    };

    match run_compare(request) {
        Ok(result) => {
            report_sink.emit_reports(&result, &formats);
            process::exit(result.exit_code);
        }
        Err(e) => {
            report_sink.error(&format!("{e}"));
            process::exit(e.exit_code());
        }
    }
}

fn run_config_show(repo_config: &Option<PathBuf>, host_config: &Option<PathBuf>) {
    let repo_path = repo_config.clone().unwrap_or_else(default_repo_config_path);
    let host_path = host_config.clone().unwrap_or_else(default_host_config_path);

    match EffectiveConfig::build(Some(&host_path), Some(&repo_path), None) {
        Ok(config) => match config.to_json() {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing configuration: {e}");
                process::exit(1);
            }
        },
        Err(e) => {
            eprintln!("Configuration error: {e}");
            process::exit(3);
        }
    }
}
