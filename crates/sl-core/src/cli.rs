//! Command-line interface for the `sightline` binary.
//!
//! `serve` runs the ingestion endpoint; `check` and `init-store` are
//! operator commands that print JSON to stdout.

use crate::audit::FileAuditLog;
use crate::dispatch::Dispatcher;
use crate::exit_codes::ExitCode;
use crate::logging::{LogFormat, Verbosity};
use crate::server::IngestServer;
use clap::{Args, Parser, Subcommand};
use serde_json::{json, Value};
use sl_common::PROTOCOL_VERSION;
use sl_config::{resolve_config, ConfigError, ConfigPaths, IngestConfig};
use sl_store::{SchemaManager, StoreConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};

/// Sightline: client-sighting telemetry ingestion.
#[derive(Parser, Debug)]
#[command(name = "sightline", version, about)]
pub struct Cli {
    /// Settings file (default: $XDG_CONFIG_HOME/sightline/settings.json)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Secrets file holding the validator token and shared secret
    #[arg(long, global = true, value_name = "PATH")]
    pub secrets: Option<PathBuf>,

    /// Directory for the store and audit log when their paths are unset
    #[arg(long, global = true, value_name = "PATH")]
    pub data_dir: Option<PathBuf>,

    /// Debug-level logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Errors only
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.verbose, self.quiet)
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the HTTP ingestion server
    Serve(ServeArgs),
    /// Validate configuration and secrets, report store status
    Check,
    /// Create the store table if it is absent
    InitStore,
}

#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Listen address, overriding server.bind
    #[arg(long, value_name = "ADDR")]
    pub bind: Option<String>,

    /// Worker threads, overriding server.workers
    #[arg(long, value_name = "N")]
    pub workers: Option<usize>,
}

/// Dispatch a parsed command line.
pub fn run(cli: Cli) -> ExitCode {
    match &cli.command {
        Commands::Serve(args) => run_serve(&cli, args),
        Commands::Check => run_check(&cli),
        Commands::InitStore => run_init_store(&cli),
    }
}

fn load_config(cli: &Cli) -> Result<IngestConfig, ConfigError> {
    let paths = ConfigPaths::resolve(
        cli.config.as_deref(),
        cli.secrets.as_deref(),
        cli.data_dir.as_deref(),
    )?;
    resolve_config(&paths)
}

fn store_config(config: &IngestConfig) -> StoreConfig {
    StoreConfig::new(&config.store_path).with_busy_timeout(Duration::from_millis(
        config.settings.store.busy_timeout_ms,
    ))
}

fn print_json(value: &Value) {
    match serde_json::to_string_pretty(value) {
        Ok(text) => println!("{}", text),
        Err(e) => error!(error = %e, "failed to render output"),
    }
}

fn report_config_error(err: &ConfigError) -> ExitCode {
    error!(error = %err, "configuration error");
    eprintln!("sightline: {}", err);
    ExitCode::ConfigError
}

/// Run the ingestion server until the process is terminated.
pub fn run_serve(cli: &Cli, args: &ServeArgs) -> ExitCode {
    let config = match load_config(cli)
        .and_then(|c| c.with_server_overrides(args.bind.clone(), args.workers))
    {
        Ok(config) => config,
        Err(e) => return report_config_error(&e),
    };
    let addr = match config.settings.bind_addr() {
        Ok(addr) => addr,
        Err(e) => return report_config_error(&e),
    };

    let audit = match FileAuditLog::open(&config.audit_path) {
        Ok(audit) => audit,
        Err(e) => {
            error!(error = %e, "failed to open audit log");
            eprintln!("sightline: {}", e);
            return ExitCode::ServeError;
        }
    };

    if config.using_defaults {
        warn!("no settings file found; running with defaults");
    }
    info!(
        store = %config.store_path.display(),
        audit = %audit.path().display(),
        secret_fingerprint = %config.secrets.fingerprint(),
        "starting ingestion"
    );

    let dispatcher = Arc::new(Dispatcher::new(&config, Arc::new(audit)));
    match IngestServer::start(addr, config.settings.server.workers, dispatcher) {
        Ok(server) => {
            server.wait();
            ExitCode::Clean
        }
        Err(e) => {
            error!(error = %e, "failed to start server");
            eprintln!("sightline: {}", e);
            ExitCode::ServeError
        }
    }
}

/// Validate configuration and print a JSON status report.
pub fn run_check(cli: &Cli) -> ExitCode {
    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => {
            print_json(&json!({
                "status": "invalid",
                "error": e.to_string(),
            }));
            return report_config_error(&e);
        }
    };

    let schema = SchemaManager::new(store_config(&config));
    let store_exists = config.store_path.is_file();
    let (table_present, store_error) = match schema.table_exists() {
        Ok(present) => (Some(present), None),
        Err(e) => {
            warn!(error = %e, "store is not readable");
            (None, Some(e.to_string()))
        }
    };

    print_json(&json!({
        "status": "ok",
        "using_defaults": config.using_defaults,
        "store_path": config.store_path,
        "store_exists": store_exists,
        "table_present": table_present,
        "store_error": store_error,
        "audit_path": config.audit_path,
        "bind": config.settings.server.bind,
        "protocol_version": PROTOCOL_VERSION,
        "secret_fingerprint": config.secrets.fingerprint(),
    }));
    ExitCode::Clean
}

/// Create the store table ahead of the first request.
pub fn run_init_store(cli: &Cli) -> ExitCode {
    let config = match load_config(cli) {
        Ok(config) => config,
        Err(e) => return report_config_error(&e),
    };

    match SchemaManager::new(store_config(&config)).ensure_schema() {
        Ok(status) => {
            print_json(&json!({
                "status": status.to_string(),
                "store_path": config.store_path,
            }));
            ExitCode::Clean
        }
        Err(e) => {
            error!(error = %e, kind = %e.kind(), "store initialization failed");
            eprintln!("sightline: {}", e);
            ExitCode::StorageError
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "sightline",
            "serve",
            "--bind",
            "0.0.0.0:9000",
            "--secrets",
            "/tmp/secrets.json",
            "-v",
            "--log-format",
            "json",
        ])
        .unwrap();

        assert_eq!(cli.secrets, Some(PathBuf::from("/tmp/secrets.json")));
        assert_eq!(cli.verbosity(), Verbosity::Verbose);
        assert_eq!(cli.log_format, LogFormat::Json);
        match cli.command {
            Commands::Serve(args) => {
                assert_eq!(args.bind.as_deref(), Some("0.0.0.0:9000"));
                assert_eq!(args.workers, None);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_init_store_parses() {
        let cli = Cli::try_parse_from(["sightline", "-q", "init-store"]).unwrap();
        assert!(matches!(cli.command, Commands::InitStore));
        assert_eq!(cli.verbosity(), Verbosity::Quiet);
    }
}
