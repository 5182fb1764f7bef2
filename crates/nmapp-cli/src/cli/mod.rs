//! CLI entry and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use nmapp_core::api::{CumulativeQuery, Registration};
use nmapp_core::config::{self, Config};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

mod commands;

/// Environment variable holding the log filter.
const LOG_ENV: &str = "NMAPP_LOG";

#[derive(Parser)]
#[command(name = "nmapp")]
#[command(version)]
#[command(about = "Fleet telemetry client for GFRID devices")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Log in with username or email
    Login {
        /// Username or email
        #[arg(short, long)]
        user: String,

        /// Password (prompted on stdin when omitted)
        #[arg(short, long, env = "NMAPP_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },

    /// Create an account and log in
    Register(RegisterArgs),

    /// Clear the stored session
    Logout,

    /// Show who is logged in
    Status,

    /// Download history
    History {
        #[command(subcommand)]
        command: HistoryCommands,
    },

    /// List machines, optionally filtered by GFRID
    Machines {
        /// Substring of the GFRID to match
        #[arg(long)]
        gfrid: Option<String>,
    },

    /// Past-week ON share per GFRID
    Priority,

    /// Cumulative ON/OFF analysis
    Analysis {
        #[arg(long)]
        gfrid: Option<String>,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: Option<String>,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: Option<String>,
        /// Preset range understood by the server (e.g. week, month)
        #[arg(long)]
        range: Option<String>,
    },

    /// Record a downloaded report in the history
    Report {
        /// Report format (e.g. pdf, csv)
        #[arg(long)]
        kind: String,
        /// Start date (YYYY-MM-DD)
        #[arg(long)]
        from: String,
        /// End date (YYYY-MM-DD)
        #[arg(long)]
        to: String,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Args)]
struct RegisterArgs {
    #[arg(long)]
    first_name: String,
    #[arg(long)]
    last_name: String,
    #[arg(long)]
    username: String,
    #[arg(long)]
    email: String,
    #[arg(long, env = "NMAPP_PASSWORD", hide_env_values = true)]
    password: String,
    /// Defaults to the password
    #[arg(long)]
    confirm_password: Option<String>,
}

impl From<RegisterArgs> for Registration {
    fn from(args: RegisterArgs) -> Self {
        let confirm_password = args
            .confirm_password
            .unwrap_or_else(|| args.password.clone());
        Registration {
            first_name: args.first_name,
            last_name: args.last_name,
            username: args.username,
            email: args.email,
            password: args.password,
            confirm_password,
        }
    }
}

#[derive(clap::Subcommand)]
enum HistoryCommands {
    /// Print the history, optionally only entries strictly inside a range
    List {
        /// Lower bound (YYYY-MM-DD or RFC 3339)
        #[arg(long, requires = "to")]
        from: Option<String>,
        /// Upper bound (YYYY-MM-DD or RFC 3339)
        #[arg(long, requires = "from")]
        to: Option<String>,
    },
    /// Interactive list with delete and undo
    Manage,
    /// Delete every history record on the server (all users)
    Clear {
        /// Confirm the irreversible clear
        #[arg(long)]
        yes: bool,
    },
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Show the path to the config file
    Path,
    /// Initialize a default config file (if not present)
    Init,
    /// Set the backend base URL
    SetUrl {
        #[arg(value_name = "URL")]
        url: String,
    },
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let config = Config::load().context("load config")?;
    let _log_guard = init_logging(cli.verbose, &config);
    tracing::debug!(home = %config::paths::nmapp_home().display(), "config loaded");

    // one tokio runtime for everything
    let rt = tokio::runtime::Runtime::new().context("create tokio runtime")?;

    rt.block_on(async move { dispatch(cli.command, &config).await })
}

/// Installs the stderr subscriber, plus a daily log file when enabled.
///
/// The returned guard flushes the file writer on drop.
fn init_logging(verbose: bool, config: &Config) -> Option<WorkerGuard> {
    let filter = || {
        if verbose {
            EnvFilter::new("warn,nmapp=debug,nmapp_core=debug")
        } else {
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"))
        }
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter());

    if config.log_to_file {
        let appender = tracing_appender::rolling::daily(config::paths::logs_dir(), "nmapp.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(writer)
            .with_ansi(false)
            .with_filter(filter());
        tracing_subscriber::registry()
            .with(stderr_layer)
            .with(file_layer)
            .init();
        Some(guard)
    } else {
        tracing_subscriber::registry().with(stderr_layer).init();
        None
    }
}

async fn dispatch(command: Commands, config: &Config) -> Result<()> {
    match command {
        Commands::Login { user, password } => commands::auth::login(config, &user, password).await,
        Commands::Register(args) => commands::auth::register(config, &args.into()).await,
        Commands::Logout => commands::auth::logout(config),
        Commands::Status => commands::auth::status(config),

        Commands::History { command } => match command {
            HistoryCommands::List { from, to } => {
                commands::history::list(config, from.as_deref().zip(to.as_deref())).await
            }
            HistoryCommands::Manage => commands::history::manage(config).await,
            HistoryCommands::Clear { yes } => commands::history::clear(config, yes).await,
        },

        Commands::Machines { gfrid } => commands::telemetry::machines(config, gfrid.as_deref()).await,
        Commands::Priority => commands::telemetry::priority(config).await,
        Commands::Analysis {
            gfrid,
            from,
            to,
            range,
        } => {
            let query = CumulativeQuery {
                gfrid,
                from_date: from,
                to_date: to,
                range,
            };
            commands::telemetry::analysis(config, &query).await
        }

        Commands::Report { kind, from, to } => {
            commands::report::record(config, &kind, &from, &to).await
        }

        Commands::Config { command } => match command {
            ConfigCommands::Path => {
                commands::config::path();
                Ok(())
            }
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::SetUrl { url } => commands::config::set_url(&url),
        },
    }
}
