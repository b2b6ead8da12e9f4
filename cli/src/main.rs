//! Coffy CLI: run Cypher queries against an embedded graph database
//!
//! Results are printed as JSON, one outcome per statement.

use anyhow::Context;
use clap::{Parser, Subcommand};
use coffy_graph::{CypherExecutor, DatabaseConfig, GraphDatabase, StatementOutcome};
use std::io::BufRead;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "coffy", version, about = "Coffy embedded graph database")]
struct Cli {
    /// Directory holding persisted databases (omit for in-memory)
    #[arg(long, global = true, env = "COFFY_DATA")]
    data_path: Option<PathBuf>,

    /// Database to open (default: the config's `default_database`)
    #[arg(long, global = true, env = "COFFY_DB")]
    db: Option<String>,

    /// YAML configuration file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Compact instead of indented JSON output
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Execute a Cypher query
    Query {
        /// The Cypher query string
        cypher: String,
    },
    /// Read queries from stdin, one per line, sharing session state
    Shell,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli) {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    let mut db = GraphDatabase::open(&config).context("opening database")?;
    let mut executor = db.executor();

    match &cli.command {
        Commands::Query { cypher } => run_query(&mut executor, cypher, cli.compact),
        Commands::Shell => run_shell(&mut executor, cli.compact),
    }
}

/// Config file values with command-line flags applied on top
fn resolve_config(cli: &Cli) -> anyhow::Result<DatabaseConfig> {
    let mut config = match &cli.config {
        Some(path) => DatabaseConfig::from_yaml_file(path)
            .with_context(|| format!("reading config {}", path.display()))?,
        None => DatabaseConfig::default(),
    };
    if let Some(data_path) = &cli.data_path {
        config.data_path = Some(data_path.clone());
    }
    if let Some(db) = &cli.db {
        config.default_database = db.clone();
    }
    Ok(config)
}

fn run_query(executor: &mut CypherExecutor<'_>, cypher: &str, compact: bool) -> anyhow::Result<()> {
    let outcomes = executor.execute(cypher)?;
    print_outcomes(&outcomes, compact)
}

fn print_outcomes(outcomes: &[StatementOutcome], compact: bool) -> anyhow::Result<()> {
    let json = serde_json::Value::Array(outcomes.iter().map(StatementOutcome::to_json).collect());
    if compact {
        println!("{}", serde_json::to_string(&json)?);
    } else {
        println!("{}", serde_json::to_string_pretty(&json)?);
    }
    Ok(())
}

fn run_shell(executor: &mut CypherExecutor<'_>, compact: bool) -> anyhow::Result<()> {
    eprintln!("Coffy shell. Type Cypher queries, or :help for commands. :quit to exit.");

    let stdin = std::io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        match trimmed.split_once(' ').unwrap_or((trimmed, "")) {
            (":quit" | ":exit" | ":q", _) => break,
            (":help" | ":h", _) => {
                eprintln!("Commands:");
                eprintln!("  :use <name>  Switch database");
                eprintln!("  :dbs         List resident databases");
                eprintln!("  :save        Save the current database");
                eprintln!("  :quit        Exit shell");
                eprintln!("  <cypher>     Execute a Cypher query");
            }
            (":use", name) => {
                match executor.database_mut().switch_database(name.trim()) {
                    Ok(()) => eprintln!("Using database '{}'", name.trim()),
                    Err(e) => eprintln!("Error: {}", e),
                }
            }
            (":dbs", _) => {
                let db = executor.database();
                for name in db.database_names() {
                    let marker = if name == db.current_name() { "*" } else { " " };
                    println!("{} {}", marker, name);
                }
            }
            (":save", _) => {
                if let Err(e) = executor.database().save() {
                    eprintln!("Error: {}", e);
                }
            }
            _ => {
                if let Err(e) = run_query(executor, trimmed, compact) {
                    eprintln!("Error: {:#}", e);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn config_file(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("coffy.yaml");
        fs::write(&path, "default_database: fromyaml\npretty: false\n").unwrap();
        path
    }

    #[test]
    fn test_config_database_used_without_flag() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_file(&temp_dir);
        let cli = Cli::try_parse_from([
            "coffy",
            "--config",
            path.to_str().unwrap(),
            "query",
            "CREATE (n)",
        ])
        .unwrap();

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.default_database, "fromyaml");
        assert!(!config.pretty);
    }

    #[test]
    fn test_flags_override_config() {
        let temp_dir = TempDir::new().unwrap();
        let path = config_file(&temp_dir);
        let cli = Cli::try_parse_from([
            "coffy",
            "--config",
            path.to_str().unwrap(),
            "--db",
            "other",
            "--data-path",
            temp_dir.path().to_str().unwrap(),
            "query",
            "CREATE (n)",
        ])
        .unwrap();

        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.default_database, "other");
        assert_eq!(config.data_path.as_deref(), Some(temp_dir.path()));
    }

    #[test]
    fn test_database_defaults_without_config() {
        let cli = Cli::try_parse_from(["coffy", "shell"]).unwrap();
        let config = resolve_config(&cli).unwrap();
        assert_eq!(config.default_database, DatabaseConfig::default().default_database);
    }
}
