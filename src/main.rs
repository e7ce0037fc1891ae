use alarmview::{AlarmviewConfig, AlarmviewOrchestrator};
use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Alarm snapshot viewer: NVR webhooks, panel buttons and a radar sensor
/// drive one shared display.
#[derive(Parser, Debug)]
#[command(name = "alarmview", version, about)]
struct Cli {
    /// TOML configuration file; missing files fall back to defaults
    #[arg(short, long, default_value = "alarmview.toml")]
    config: PathBuf,

    /// Log at debug level
    #[arg(short, long, conflicts_with = "quiet")]
    debug: bool,

    /// Log at info level
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    quiet: bool,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,

    /// Additionally write daily rotated log files into this directory
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Check the configuration and exit
    #[arg(long)]
    validate_config: bool,

    /// Print the default configuration as TOML and exit
    #[arg(long)]
    print_config: bool,

    /// Build the pipeline without starting any task
    #[arg(long)]
    dry_run: bool,

    /// Treat the terminal as the button panel (digits press, q quits)
    #[arg(long)]
    keyboard: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl Cli {
    fn level(&self) -> &'static str {
        match (self.debug, self.verbose, self.quiet) {
            (true, _, _) => "debug",
            (_, true, _) => "info",
            (_, _, true) => "error",
            _ => "warn",
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.print_config {
        let rendered = toml::to_string_pretty(&AlarmviewConfig::default())
            .context("rendering default configuration")?;
        println!("# alarmview defaults; ALARMVIEW_<SECTION>__<KEY> variables override the file");
        println!("{}", rendered);
        return Ok(());
    }

    let log_guard = init_tracing(&cli);
    let exit_code = run(&cli).await?;

    // Flush buffered file output before the process ends
    drop(log_guard);
    std::process::exit(exit_code);
}

async fn run(cli: &Cli) -> Result<i32> {
    info!("alarmview v{} starting", env!("CARGO_PKG_VERSION"));

    let config = AlarmviewConfig::load_from_file(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Err(e) = config.validate() {
        eprintln!("invalid configuration in {}: {}", cli.config.display(), e);
        return Ok(2);
    }
    if cli.validate_config {
        println!("{}: configuration is valid", cli.config.display());
        return Ok(0);
    }

    let mut orchestrator = AlarmviewOrchestrator::new(config)
        .await
        .context("building pipeline")?;
    orchestrator.set_keyboard_enabled(cli.keyboard);
    orchestrator.initialize().await?;

    if cli.dry_run {
        println!("dry run: pipeline built, nothing started");
        return Ok(0);
    }

    orchestrator.start().await.context("starting pipeline")?;
    let exit_code = orchestrator.run().await?;
    info!(exit_code, "alarmview stopped");
    Ok(exit_code)
}

/// Console output plus an optional rolling file. `RUST_LOG` wins over the
/// level flags when set.
fn init_tracing(cli: &Cli) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("alarmview={}", cli.level())));

    let console = match cli.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Compact => fmt::layer().compact().with_target(false).boxed(),
        LogFormat::Pretty => fmt::layer()
            .pretty()
            .with_file(cli.debug)
            .with_line_number(cli.debug)
            .boxed(),
    };

    let (file, guard) = match &cli.log_dir {
        Some(dir) => {
            let (writer, guard) =
                tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "alarmview.log"));
            let layer = fmt::layer().with_ansi(false).with_writer(writer).boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console)
        .with(file)
        .with(filter)
        .init();

    guard
}
