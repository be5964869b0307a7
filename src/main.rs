//! dbcheck CLI Entry Point
//!
//! Runs a single database health check and reports it the way monitoring
//! schedulers expect:
//! - the plugin output on stdout: `<status text>|<name>=<value>;...`
//! - exit code 0 (OK), 1 (WARNING), 2 (CRITICAL) or 3 (UNKNOWN)
//!
//! Every failure, including bad command-line arguments, exits UNKNOWN with a
//! one-line diagnostic on stdout. Logs go to stderr.

use std::path::PathBuf;
use std::process;

use anyhow::Context;
use clap::error::ErrorKind;
use clap::Parser;

use dbcheck::check::{run_check, CheckRequest};
use dbcheck::config::{resolve_connection, ConnectionOverrides};
use dbcheck::engine::DatabaseType;
use dbcheck::error::CheckError;
use dbcheck::logging;
use dbcheck::report::{Report, Severity};

/// dbcheck - run a SQL script and report the result as a monitoring check
#[derive(Parser)]
#[command(name = "dbcheck")]
#[command(about = "Run a SQL health-check script and report the result as a monitoring plugin")]
#[command(version)]
struct Cli {
    /// Database engine (postgres, mysql, sqlite)
    #[arg(short = 'e', long)]
    engine: Option<DatabaseType>,

    /// Named connection from the connection registry
    #[arg(short = 'c', long)]
    connection: Option<String>,

    /// Database host (postgres/mysql, defaults to localhost)
    #[arg(short = 'H', long)]
    host: Option<String>,

    /// Database port (defaults to the engine's standard port)
    #[arg(short = 'p', long)]
    port: Option<u16>,

    /// Database user
    #[arg(short = 'U', long)]
    user: Option<String>,

    /// Database password; omit to rely on passwordless server authentication
    #[arg(short = 'P', long, env = "DBCHECK_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Database name
    #[arg(short = 'd', long)]
    database: Option<String>,

    /// Database file (sqlite)
    #[arg(short = 'f', long)]
    file: Option<PathBuf>,

    /// SQL script template to run
    #[arg(short = 's', long, default_value = "test.sql")]
    script: PathBuf,

    /// Placeholder overrides as comma-separated key:value pairs
    #[arg(short = 'a', long = "args", default_value = "")]
    arguments: String,

    /// Report only the script's response time
    #[arg(short = 't', long)]
    timing: bool,

    /// Accept scripts that return no Metric or no ExitCode result set
    #[arg(long)]
    allow_missing_channels: bool,

    /// Log debug information to stderr
    #[arg(short = 'v', long)]
    verbose: bool,
}

impl Cli {
    fn overrides(&self) -> ConnectionOverrides {
        ConnectionOverrides {
            engine: self.engine,
            host: self.host.clone(),
            port: self.port,
            user: self.user.clone(),
            password: self.password.clone(),
            database: self.database.clone(),
            file: self.file.clone(),
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            let rendered = e.to_string();
            println!("{}", rendered.lines().next().unwrap_or("Invalid arguments"));
            process::exit(Severity::Unknown.code());
        }
    };

    logging::init_stderr_logging(cli.verbose);

    let code = match run(cli).await {
        Ok(report) => {
            println!("{}", report.render_line());
            report.exit_code.code()
        }
        Err(e) => {
            tracing::debug!(error = ?e, "check aborted");
            println!("{}", format!("{e:#}").replace('\n', " "));
            e.downcast_ref::<CheckError>().map_or(Severity::Unknown, CheckError::severity).code()
        }
    };

    process::exit(code);
}

async fn run(cli: Cli) -> anyhow::Result<Report> {
    let connection = resolve_connection(cli.connection.as_deref(), &cli.overrides())
        .context("Cannot resolve connection")?;

    let request = CheckRequest {
        connection,
        script_path: cli.script,
        arguments: cli.arguments,
        timing: cli.timing,
        require_channels: !cli.allow_missing_channels,
    };

    Ok(run_check(&request).await?)
}
