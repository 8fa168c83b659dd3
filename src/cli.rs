//! Command-line argument parsing for the SQL connector.

use crate::config::{Config, ConnectionConfig};
use crate::error::{ConnectorError, Result};
use crate::model::Pagination;
use clap::Parser;
use std::io::Read;
use std::path::PathBuf;

/// Output format for result rows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Aligned plain-text table.
    #[default]
    Text,
    /// One JSON object per row, keyed by column header.
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            _ => Err(format!("Invalid output format: {s}. Expected: text or json")),
        }
    }
}

/// Run a SQL statement against SQLite or PostgreSQL and page through the result.
#[derive(Parser, Debug)]
#[command(name = "sql-connector")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// SQL statement to execute (read from stdin when omitted)
    #[arg(value_name = "SQL")]
    pub statement: Option<String>,

    /// Read the SQL statement from a file
    #[arg(short = 'f', long = "file", value_name = "FILE", conflicts_with = "statement")]
    pub file: Option<PathBuf>,

    /// Database backend: sqlite or postgres
    #[arg(short = 'b', long, value_name = "BACKEND")]
    pub backend: Option<String>,

    /// Database locator: a SQLite file path, ":memory:", or a PostgreSQL DSN
    #[arg(short = 'l', long, value_name = "LOCATOR")]
    pub locator: Option<String>,

    /// Use named connection from config
    #[arg(short = 'c', long, value_name = "NAME")]
    pub connection: Option<String>,

    /// Config file path
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Directory that relative SQLite paths are resolved against
    #[arg(long, value_name = "DIR")]
    pub base_dir: Option<PathBuf>,

    /// Rows pulled from the database per round trip
    #[arg(long, value_name = "N")]
    pub fetch_batch: Option<usize>,

    /// Rows revealed per growth step
    #[arg(long, value_name = "N")]
    pub display_batch: Option<usize>,

    /// Stop after this many rows have been shown
    #[arg(long, value_name = "N")]
    pub max_rows: Option<usize>,

    /// Output format for result rows
    #[arg(long, value_name = "FORMAT", default_value = "text")]
    pub format: String,

    /// Write logs to stderr instead of the log file
    #[arg(long)]
    pub log_stderr: bool,
}

impl Cli {
    /// Parses command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Returns the config file path to use.
    ///
    /// Uses the --config argument if provided, otherwise the default path.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(Config::default_path)
    }

    /// Returns the named connection to use, if specified.
    pub fn connection_name(&self) -> Option<&str> {
        self.connection.as_deref()
    }

    /// Returns the connection fields given on the command line.
    pub fn connection_overrides(&self) -> ConnectionConfig {
        ConnectionConfig::new(self.backend.clone(), self.locator.clone())
    }

    /// Returns the base directory, preferring the command line over config.
    pub fn base_dir(&self, config: &Config) -> PathBuf {
        self.base_dir.clone().unwrap_or_else(|| config.base_dir())
    }

    /// Applies --fetch-batch and --display-batch over configured values.
    pub fn pagination(&self, configured: Pagination) -> Result<Pagination> {
        Pagination::new(
            self.fetch_batch.unwrap_or(configured.fetch_batch),
            self.display_batch.unwrap_or(configured.display_batch),
        )
    }

    /// Parses the output format from the --format argument.
    pub fn parse_output_format(&self) -> std::result::Result<OutputFormat, String> {
        self.format.parse()
    }

    /// Returns the statement from the argument, the --file, or stdin.
    pub fn read_statement(&self) -> Result<String> {
        self.read_statement_from(std::io::stdin())
    }

    /// Like [`read_statement`](Self::read_statement), reading `input`
    /// instead of stdin.
    pub fn read_statement_from(&self, mut input: impl Read) -> Result<String> {
        let statement = if let Some(statement) = &self.statement {
            statement.clone()
        } else if let Some(path) = &self.file {
            std::fs::read_to_string(path).map_err(|e| {
                ConnectorError::config(format!("Failed to read {}: {e}", path.display()))
            })?
        } else {
            let mut buf = String::new();
            input
                .read_to_string(&mut buf)
                .map_err(|e| ConnectorError::config(format!("Failed to read stdin: {e}")))?;
            buf
        };

        let statement = statement.trim();
        if statement.is_empty() {
            return Err(ConnectorError::config("No SQL statement given"));
        }
        Ok(statement.to_string())
    }
}
