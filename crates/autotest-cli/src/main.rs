mod cmd_watch;

use clap::{Parser, ValueEnum};

#[derive(Parser)]
#[command(
    name = "autotest",
    version,
    about = "Continuously run unit tests when changes detected"
)]
struct Cli {
    /// Set logger level
    #[arg(
        short = 'l',
        long = "log-level",
        value_name = "L",
        value_enum,
        ignore_case = true,
        default_value = "info"
    )]
    log_level: LogLevel,
    /// Extension of the source files that trigger a run
    #[arg(short, long, default_value = "py")]
    extension: String,
    /// Do not show desktop notifications
    #[arg(long)]
    no_notify: bool,
    /// Print each run summary as a JSON line on stdout
    #[arg(long)]
    json: bool,
    /// Test command and arguments (after --), default `python -m unittest discover --buffer`
    #[arg(last = true)]
    command: Vec<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    #[value(alias = "warning")]
    Warn,
    #[value(alias = "critical")]
    Error,
}

impl LogLevel {
    fn as_filter(self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// `RUST_LOG` wins over `--log-level` when set.
fn init_logging(level: LogLevel) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_filter()));
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_level);
    let repo_root = std::env::current_dir()?;

    cmd_watch::execute(cmd_watch::WatchParams {
        repo_root: &repo_root,
        extension: &cli.extension,
        command: cli.command,
        notify: !cli.no_notify,
        json: cli.json,
    })
}
