use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use optika_cart::api::{ApiConfig, ApiError, CartApi};
use optika_cart::cart::CartStore;
use optika_cart::input::{EditOutcome, QuantityEditor};
use optika_cart::model::{CartLine, ItemKey, LineStatus};
use optika_cart::sync::{QuantityCommitter, QuantitySyncManager, SyncConfig};
use optika_cart::telemetry::logging::{self as logctl, LogConfig, LogLevel};
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), CliError> {
    let cli = Cli::parse();
    let log_config = cli.logging.to_config();
    logctl::init(&log_config).map_err(|err| CliError::Logging(err.to_string()))?;
    debug!(log_level = ?log_config.level, log_file = ?log_config.file, "logging configured");

    let config = ApiConfig::new(&cli.cart_service)?;
    let store = Arc::new(CartStore::new());
    let api = CartApi::new(config, store)?;

    match cli.command {
        Some(Command::Show) => handle_show(api).await,
        Some(Command::Console) | None => {
            run_surface(api, "console", SyncConfig::cart_page()).await
        }
        Some(Command::Drawer) => run_surface(api, "drawer", SyncConfig::drawer()).await,
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "optika-cart",
    about = "🕶️  Optika storefront cart client",
    author,
    version
)]
struct Cli {
    #[arg(
        long,
        global = true,
        env = "OPTIKA_CART_SERVICE",
        default_value = "http://127.0.0.1:8080",
        help = "Base URL for the cart service"
    )]
    cart_service: String,

    #[command(flatten)]
    logging: LoggingArgs,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
struct LoggingArgs {
    #[arg(
        long = "log-level",
        value_enum,
        env = "OPTIKA_LOG_LEVEL",
        default_value_t = LogLevel::Warn,
        help = "Minimum log level (error, warn, info, debug, trace)"
    )]
    level: LogLevel,

    #[arg(
        long = "log-file",
        value_name = "PATH",
        env = "OPTIKA_LOG_FILE",
        help = "Write structured logs to the specified file"
    )]
    file: Option<PathBuf>,
}

impl LoggingArgs {
    fn to_config(&self) -> LogConfig {
        LogConfig {
            level: self.level,
            file: self.file.clone(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch the cart once and print it
    Show,
    /// Interactive full cart view (default when no subcommand given)
    Console,
    /// Interactive mini-cart with the drawer's slower commit cadence
    Drawer,
}

#[derive(Debug, Error)]
enum CliError {
    #[error("{0}")]
    Api(#[from] ApiError),
    #[error("io error: {0}")]
    Io(#[from] io::Error),
    #[error("logging initialization failed: {0}")]
    Logging(String),
}

async fn handle_show(api: CartApi) -> Result<(), CliError> {
    api.fetch_cart().await?;
    print_cart(api.store().lines(), None);
    Ok(())
}

async fn run_surface(api: CartApi, name: &str, config: SyncConfig) -> Result<(), CliError> {
    api.fetch_cart().await?;
    info!(surface = name, window_ms = config.debounce_window.as_millis() as u64, "surface ready");
    println!(
        "🕶️  Optika cart {name} @ {} ({}ms commit window). Type 'help' for commands.",
        api.config().base_url(),
        config.debounce_window.as_millis()
    );

    let committer: Arc<dyn QuantityCommitter> = Arc::new(api.clone());
    let manager = Arc::new(QuantitySyncManager::new(committer, config));
    let editor = QuantityEditor::new(manager.clone());

    print_cart(api.store().lines(), Some(&manager));

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while let Some(raw) = input.next_line().await? {
        let command = match parse_command(&raw) {
            Ok(Some(command)) => command,
            Ok(None) => continue,
            Err(err) => {
                println!("{err:#}");
                continue;
            }
        };
        match command {
            ConsoleCommand::Show => print_cart(api.store().lines(), Some(&manager)),
            ConsoleCommand::Refresh => {
                api.fetch_cart().await?;
                print_cart(api.store().lines(), Some(&manager));
            }
            ConsoleCommand::Increment(index) => {
                with_line(&api, index, |line| report(editor.increment(line)));
            }
            ConsoleCommand::Decrement(index) => {
                with_line(&api, index, |line| report(editor.decrement(line)));
            }
            ConsoleCommand::Set(index, text) => {
                with_line(&api, index, |line| {
                    editor.input_changed(line, &text);
                    report(editor.blur(line));
                });
            }
            ConsoleCommand::Help => print_help(),
            ConsoleCommand::Quit => break,
        }
    }

    // Pending commits that have not fired yet are dropped, not flushed.
    manager.cancel_all();
    Ok(())
}

enum ConsoleCommand {
    Show,
    Refresh,
    Increment(usize),
    Decrement(usize),
    Set(usize, String),
    Help,
    Quit,
}

fn parse_command(raw: &str) -> anyhow::Result<Option<ConsoleCommand>> {
    let mut parts = raw.split_whitespace();
    let Some(head) = parts.next() else {
        return Ok(None);
    };
    let command = match head {
        "show" => ConsoleCommand::Show,
        "refresh" => ConsoleCommand::Refresh,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "q" | "exit" => ConsoleCommand::Quit,
        "+" => ConsoleCommand::Increment(parse_index(parts.next())?),
        "-" => ConsoleCommand::Decrement(parse_index(parts.next())?),
        "set" => {
            let index = parse_index(parts.next())?;
            let value = parts.next().unwrap_or("").to_string();
            ConsoleCommand::Set(index, value)
        }
        other => bail!("unknown command '{other}' (try 'help')"),
    };
    Ok(Some(command))
}

fn parse_index(raw: Option<&str>) -> anyhow::Result<usize> {
    let raw = raw.context("expected a line number (see 'show')")?;
    let index: usize = raw
        .parse()
        .with_context(|| format!("'{raw}' is not a line number"))?;
    if index == 0 {
        bail!("line numbers start at 1");
    }
    Ok(index)
}

fn with_line(api: &CartApi, index: usize, apply: impl FnOnce(&CartLine)) {
    let lines = api.store().lines();
    match lines.get(index - 1) {
        Some(line) => apply(line),
        None => println!("no line #{index} (cart has {})", lines.len()),
    }
}

fn report(outcome: EditOutcome) {
    match outcome {
        EditOutcome::Scheduled(quantity) => println!("→ quantity {quantity} queued"),
        EditOutcome::EditingOnly => {}
        EditOutcome::RejectedUnavailable => println!("line is out of stock or unavailable"),
        EditOutcome::NoOp => println!("nothing to commit"),
    }
}

fn print_cart(lines: Vec<CartLine>, manager: Option<&QuantitySyncManager>) {
    if lines.is_empty() {
        println!("(cart is empty)");
        return;
    }
    for (position, line) in lines.iter().enumerate() {
        let key = ItemKey::for_line(line);
        let effective = manager
            .map(|m| m.effective_quantity(&key, line.quantity))
            .unwrap_or(line.quantity);
        let marker = if manager.is_some_and(|m| m.is_syncing(&key)) {
            "~"
        } else {
            " "
        };
        let status = match line.status {
            LineStatus::Available => "",
            LineStatus::OutOfStock => "  [out of stock]",
            LineStatus::Unavailable => "  [unavailable]",
            LineStatus::Unknown => "  [?]",
        };
        println!(
            "{:>2}. {} ×{}{}{} (limit {})",
            position + 1,
            line.product_slug,
            effective,
            marker,
            status,
            line.purchase_limit()
        );
    }
}

fn print_help() {
    println!("commands:");
    println!("  show           print the cart with pending edits");
    println!("  refresh        re-fetch the cart from the service");
    println!("  + <n>          increment line n");
    println!("  - <n>          decrement line n");
    println!("  set <n> <qty>  type a quantity into line n and blur");
    println!("  quit           drop pending edits and exit");
}
