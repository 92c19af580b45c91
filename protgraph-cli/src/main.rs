use std::path::PathBuf;

use clap::Parser;

use protgraph_core::error::{ConfigError, NormalizeError, ProtGraphError, StoreError};

mod commands;

#[derive(Parser, Debug)]
#[command(
    name = "protgraph",
    version,
    about = "Build protein similarity graphs and propagate EC number annotations"
)]
struct Cli {
    #[command(subcommand)]
    command: commands::Command,

    /// Config file (default: ./protgraph.toml if present)
    #[arg(long, global = true, env = "PROTGRAPH_CONFIG")]
    config: Option<PathBuf>,

    /// Database file, overriding `[store] path`
    #[arg(long, global = true, env = "PROTGRAPH_DB")]
    db: Option<PathBuf>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,
}

/// Classify an error into a process exit code.
///
///   0 — success
///   1 — general/unknown error
///   2 — configuration error
///   3 — input table missing or unreadable
///   4 — database error
fn classify_exit_code(err: &anyhow::Error) -> i32 {
    for cause in err.chain() {
        if let Some(e) = cause.downcast_ref::<ProtGraphError>() {
            return match e {
                ProtGraphError::Config(_) => 2,
                ProtGraphError::Normalize(_) => 3,
                ProtGraphError::Store(_) => 4,
                ProtGraphError::Build(_) | ProtGraphError::Annotate(_) => 1,
            };
        }
        if cause.downcast_ref::<ConfigError>().is_some() {
            return 2;
        }
        if cause.downcast_ref::<NormalizeError>().is_some() {
            return 3;
        }
        if cause.downcast_ref::<StoreError>().is_some() {
            return 4;
        }
    }

    let lower = format!("{err:#}").to_lowercase();
    if lower.contains("config") {
        2
    } else if lower.contains("input table") {
        3
    } else if lower.contains("database") || lower.contains("sqlite") {
        4
    } else {
        1
    }
}

fn main() {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    let filter = match (cli.quiet, cli.verbose) {
        (true, _) => "error",
        (_, 0) => "warn",
        (_, 1) => "info",
        (_, 2) => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .init();

    let opts = commands::GlobalOpts {
        config: cli.config,
        db: cli.db,
        quiet: cli.quiet,
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: Failed to create runtime: {e}");
            std::process::exit(1);
        }
    };

    match runtime.block_on(commands::run(cli.command, &opts)) {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            eprintln!("Error: {e:#}");
            std::process::exit(classify_exit_code(&e));
        }
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Context;

    use super::*;

    #[test]
    fn exit_code_config() {
        let err = anyhow::anyhow!("Cannot load config: bad toml");
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_typed_config_error() {
        let err: anyhow::Error = ConfigError::Invalid("top_n".into()).into();
        assert_eq!(classify_exit_code(&err), 2);
    }

    #[test]
    fn exit_code_missing_table() {
        let err = anyhow::anyhow!("Input table not found: /nope.tsv");
        assert_eq!(classify_exit_code(&err), 3);
    }

    #[test]
    fn exit_code_typed_normalize_error_under_context() {
        let err = Err::<(), _>(ProtGraphError::from(NormalizeError::EmptyHeader))
            .context("Cannot load input table: t.tsv")
            .unwrap_err();
        assert_eq!(classify_exit_code(&err), 3);
    }

    #[test]
    fn exit_code_store_unavailable() {
        let err = Err::<(), _>(ProtGraphError::from(StoreError::Unavailable(
            "database not found".into(),
        )))
        .context("Cannot open database: graph.db")
        .unwrap_err();
        assert_eq!(classify_exit_code(&err), 4);
    }

    #[test]
    fn exit_code_database_message() {
        let err = anyhow::anyhow!("Cannot open database: /tmp/protgraph.db");
        assert_eq!(classify_exit_code(&err), 4);
    }

    #[test]
    fn exit_code_general() {
        let err = anyhow::anyhow!("Something unexpected happened");
        assert_eq!(classify_exit_code(&err), 1);
    }
}
