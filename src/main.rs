//! sql-connector - run one SQL statement and page through its result.

use sql_connector::cli::{Cli, OutputFormat};
use sql_connector::config::Config;
use sql_connector::logging::{init_file_logging, init_stderr_logging};
use sql_connector::output::RowWriter;
use sql_connector::{
    Connector, ConnectorError, ErrorKind, ExecuteOutcome, Pagination, ResultModel, SpecResolver,
};
use std::process::ExitCode;
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    // A missing .env file is fine.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    if cli.log_stderr {
        init_stderr_logging();
    } else {
        init_file_logging();
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            report(&e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let format = cli.parse_output_format().map_err(ConnectorError::config)?;

    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let config = Config::load_from_file(&config_path)?;
    let pagination = cli.pagination(config.pagination)?;

    let mut connection =
        config.resolve_connection(cli.connection_name(), &cli.connection_overrides())?;
    connection.apply_database_url(std::env::var("DATABASE_URL").ok());

    let resolver = SpecResolver::new(cli.base_dir(&config));
    let spec = resolver.resolve(
        &connection.backend_or_default(),
        &connection.locator_or_default(),
    )?;
    info!("Connection: {} {}", spec.backend(), spec.display_locator());

    let statement = cli.read_statement()?;

    let mut connector = Connector::open(spec)?;
    let result = run_statement(&mut connector, &statement, pagination, format, cli.max_rows).await;
    let closed = connector.close().await;

    result?;
    closed?;
    Ok(())
}

/// Executes the statement and prints the result as the model grows.
async fn run_statement(
    connector: &mut Connector,
    statement: &str,
    pagination: Pagination,
    format: OutputFormat,
    max_rows: Option<usize>,
) -> anyhow::Result<()> {
    let outcome = connector.execute(statement).await?;
    if let ExecuteOutcome::NoResultSet { rows_affected } = outcome {
        println!("{}", ErrorKind::NoResultSet.user_hint());
        println!("{rows_affected} row(s) affected.");
        return Ok(());
    }

    let Some(mut model) = ResultModel::load(connector, pagination).await? else {
        println!("{}", ErrorKind::NoResultSet.user_hint());
        return Ok(());
    };

    let limit = max_rows.unwrap_or(usize::MAX);
    let mut writer = RowWriter::new(format, model.headers());
    let mut out = std::io::stdout();
    let mut shown = 0;

    loop {
        let end = model.row_count().min(limit);
        writer.write_rows(&mut out, &model.revealed_rows()[shown..end])?;
        shown = end;

        if shown >= limit || !model.can_grow().await? {
            break;
        }
        model.grow_by();
    }

    writer.finish(&mut out, !model.is_exhausted())?;
    Ok(())
}

/// Prints an error the way users expect: hint first, then the message.
fn report(err: &anyhow::Error) {
    match err.downcast_ref::<ConnectorError>() {
        Some(e) => {
            error!("{}: {}", e.category(), e);
            eprintln!("{}", e.user_hint());
            eprintln!("{}", e.message());
        }
        None => {
            error!("{err:#}");
            eprintln!("Error: {err:#}");
        }
    }
}
