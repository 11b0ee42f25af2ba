// slasher-cli/src/main.rs
use clap::{Args, Parser, Subcommand};
use downtime_slasher::{partition, DowntimeWindow, WindowResolver};
use slasher_cli::{CliConfig, Scenario};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "slasher")]
#[command(about = "Downtime slashing client", version, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Configuration file path; built-in defaults when omitted
    #[arg(short, long, global = true)]
    config: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "./slasher.toml")]
        output: String,
    },

    /// Resolve a downtime window without touching a chain
    Window(WindowArgs),

    /// Split a downtime window into slots
    Partition {
        #[command(flatten)]
        window: WindowArgs,

        /// Blocks per slot; the configured default when omitted
        #[arg(short, long)]
        slot_size: Option<u64>,
    },

    /// Run a scenario file against the in-memory chain
    Simulate {
        /// Scenario file path
        #[arg(short, long)]
        scenario: String,
    },
}

#[derive(Args)]
struct WindowArgs {
    /// First block of the window
    #[arg(long)]
    start: Option<u64>,

    /// Last block of the window
    #[arg(long)]
    end: Option<u64>,

    /// Chain head, required when neither bound is given
    #[arg(long)]
    head: Option<u64>,

    /// Override the configured slashable downtime
    #[arg(long)]
    length: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!(
                    "slasher_cli={0},downtime_slasher={0},chain_sim={0}",
                    log_level
                )
                .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Init { output } => {
            init_config(&output)?;
        }
        Commands::Window(args) => {
            let config = CliConfig::load(cli.config.as_deref())?;
            let window = resolve_window(&config, &args)?;
            print_window(&config, &window)?;
        }
        Commands::Partition { window, slot_size } => {
            let config = CliConfig::load(cli.config.as_deref())?;
            let window = resolve_window(&config, &window)?;
            let slot_size = slot_size.unwrap_or(config.slasher.default_slot_size);
            let slots = partition(&window, slot_size)?;
            tracing::info!("Window {} splits into {} slots of up to {} blocks", window, slots.len(), slot_size);
            println!("{}", serde_json::to_string_pretty(&slots)?);
        }
        Commands::Simulate { scenario } => {
            let config = CliConfig::load(cli.config.as_deref())?;
            simulate(&scenario, config).await?;
        }
    }

    Ok(())
}

fn init_config(output: &str) -> anyhow::Result<()> {
    if std::path::Path::new(output).exists() {
        anyhow::bail!("{} already exists", output);
    }
    CliConfig::default().to_file(output)?;
    tracing::info!("Default configuration written to {}", output);
    Ok(())
}

fn resolve_window(config: &CliConfig, args: &WindowArgs) -> anyhow::Result<DowntimeWindow> {
    let length = args.length.unwrap_or(config.chain.slashable_downtime);
    if WindowResolver::needs_head(args.start, args.end) && args.head.is_none() {
        anyhow::bail!("--head is required when neither --start nor --end is given");
    }
    let window = WindowResolver::new(length)
        .with_head_lag(config.slasher.head_lag)
        .resolve(args.start, args.end, args.head)?;
    Ok(window)
}

fn print_window(config: &CliConfig, window: &DowntimeWindow) -> anyhow::Result<()> {
    let epoch_size = config.chain.epoch_size;
    let (first_epoch, last_epoch) = window.epochs(epoch_size);
    let summary = serde_json::json!({
        "start": window.start(),
        "end": window.end(),
        "length": window.length(),
        "first_epoch": first_epoch,
        "last_epoch": last_epoch,
        "crosses_epoch_boundary": window.crosses_epoch_boundary(epoch_size),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

async fn simulate(path: &str, config: CliConfig) -> anyhow::Result<()> {
    tracing::info!("Loading scenario from {}", path);
    let scenario = Scenario::from_file(path)?;

    let outcome = scenario.run(config.slasher).await?;
    tracing::info!(
        "Slashed {} for window {} in tx {}",
        outcome.validator,
        outcome.window,
        outcome.receipt.tx_hash
    );
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
