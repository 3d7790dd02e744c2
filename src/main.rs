//! Binary entrypoint for the tradeledger CLI.
//!
//! Commands:
//! - `init [--force]` - write a starter `tradeledger.toml`
//! - `show [ID]` - print a balance (the global balance when ID is omitted)
//! - `list` - print every stored balance
//! - `add ID AMOUNT` / `take ID AMOUNT` - credit or (guarded) debit a balance
//! - `transfer FROM TO [AMOUNT]` - move AMOUNT, or everything, between balances
//! - `multiply ID FACTOR` - scale a balance
//! - `settle` - move the stored level balance into the global balance
//! - `reset ID` - delete a stored balance
//!
//! Amounts are read and printed in the configured currency system.
use std::path::Path;

use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use log::{debug, info, warn};

use tradeledger::config::Config;
use tradeledger::{format_amount, parse_amount, Balance, KeyValueStore, TradeContext};

#[derive(Parser)]
#[command(name = "tradeledger")]
#[command(about = "Inspect and adjust in-game currency balances")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (can be used before or after subcommand)
    #[arg(short, long, default_value = "tradeledger.toml", global = true)]
    config: String,

    /// Verbose logging (-v, -vv for more; may appear before or after subcommand)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
    #[command(flatten)]
    Ledger(LedgerCommand),
}

#[derive(Subcommand)]
enum LedgerCommand {
    /// Show one balance (defaults to the global balance)
    Show { id: Option<String> },
    /// List every stored balance
    List,
    /// Credit a balance
    Add {
        id: String,
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
    /// Debit a balance if it holds enough
    Take {
        id: String,
        #[arg(allow_hyphen_values = true)]
        amount: String,
    },
    /// Move money between balances; without AMOUNT everything moves
    Transfer {
        from: String,
        to: String,
        #[arg(allow_hyphen_values = true)]
        amount: Option<String>,
    },
    /// Multiply a balance by FACTOR (rounded half to even)
    Multiply {
        id: String,
        #[arg(allow_hyphen_values = true)]
        factor: f64,
    },
    /// Move the level balance (ledger.level_key) into the global balance
    Settle,
    /// Delete a stored balance
    Reset { id: String },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Init { force } => init_config(&cli.config, force, cli.verbose),
        Commands::Ledger(command) => run(&cli.config, cli.verbose, command),
    }
}

fn init_config(path: &str, force: bool, verbosity: u8) -> Result<()> {
    init_logging(None, verbosity);
    if Path::new(path).exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path);
    }
    Config::create_default(path)?;
    info!("Configuration file created at {}", path);
    Ok(())
}

fn run(config_path: &str, verbosity: u8, command: LedgerCommand) -> Result<()> {
    let config = if Path::new(config_path).exists() {
        Some(Config::load(config_path)?)
    } else {
        None
    };
    init_logging(config.as_ref(), verbosity);
    let config = config.unwrap_or_else(|| {
        warn!("{} not found; using default configuration", config_path);
        Config::default()
    });
    debug!(
        "storage backend {:?} at {}",
        config.storage.backend, config.storage.path
    );

    let mut ctx = TradeContext::from_config(&config)?;
    let currency = config.currency.clone();
    let show = |balance: &Balance| {
        println!(
            "{}: {} ({})",
            balance.identifier(),
            format_amount(balance.amount(), &currency),
            balance.amount()
        );
    };

    match command {
        LedgerCommand::Show { id } => match id {
            Some(id) => show(&ctx.open_balance(id, 0)?),
            None => show(ctx.global()?),
        },
        LedgerCommand::List => {
            let keys = ctx.store().keys()?;
            if keys.is_empty() {
                println!("no balances stored");
            }
            for key in keys {
                show(&ctx.open_balance(key, 0)?);
            }
        }
        LedgerCommand::Add { id, amount } => {
            let amount = parse_amount(&amount, &currency)?;
            let mut balance = ctx.open_balance(id, 0)?;
            balance.add(amount);
            balance.save()?;
            show(&balance);
        }
        LedgerCommand::Take { id, amount } => {
            let amount = parse_amount(&amount, &currency)?;
            let mut balance = ctx.open_balance(id, 0)?;
            if !balance.try_remove(amount) {
                bail!(
                    "insufficient funds: {} holds {}, needs {}",
                    balance.identifier(),
                    format_amount(balance.amount(), &currency),
                    format_amount(amount, &currency)
                );
            }
            balance.save()?;
            show(&balance);
        }
        LedgerCommand::Transfer { from, to, amount } => {
            if from == to {
                bail!("cannot transfer a balance into itself");
            }
            let mut source = ctx.open_balance(from, 0)?;
            let mut target = ctx.open_balance(to, 0)?;
            match amount {
                Some(amount) => {
                    let amount = parse_amount(&amount, &currency)?;
                    if !target.try_add_from(&mut source, amount) {
                        bail!(
                            "insufficient funds: {} holds {}",
                            source.identifier(),
                            format_amount(source.amount(), &currency)
                        );
                    }
                }
                None => target.add_from(&mut source),
            }
            source.save()?;
            target.save()?;
            show(&source);
            show(&target);
        }
        LedgerCommand::Multiply { id, factor } => {
            let mut balance = ctx.open_balance(id, 0)?;
            balance.multiply(factor)?;
            balance.save()?;
            show(&balance);
        }
        LedgerCommand::Settle => {
            ctx.open_level()?;
            let moved = ctx.settle_current()?;
            ctx.save_all()?;
            println!(
                "settled {} from {}",
                format_amount(moved, &currency),
                ctx.level_key()
            );
            show(ctx.global()?);
        }
        LedgerCommand::Reset { id } => {
            let store = ctx.store();
            match store.remove_key(&id)? {
                Some(old) => {
                    store.commit()?;
                    println!("{}: removed ({})", id, format_amount(old, &currency));
                }
                None => println!("{}: nothing stored", id),
            }
        }
    }

    Ok(())
}

fn init_logging(config: Option<&Config>, verbosity: u8) {
    use std::io::Write;
    let mut builder = env_logger::Builder::new();
    // CLI verbosity overrides the configured level
    let base_level = match verbosity {
        0 => config
            .map(|c| c.logging.level_filter())
            .unwrap_or(log::LevelFilter::Info),
        1 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    builder.filter_level(base_level);

    let log_file = config
        .and_then(|c| c.logging.file.as_ref())
        .and_then(|path| {
            std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .ok()
        });

    match log_file {
        Some(f) => {
            let file = std::sync::Mutex::new(f);
            // Mirror to the console only when someone is watching
            let is_tty = atty::is(atty::Stream::Stderr);
            builder.format(move |fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                let line = format!("{} [{}] {}", ts, record.level(), record.args());
                if let Ok(mut guard) = file.lock() {
                    let _ = writeln!(guard, "{}", line);
                }
                if is_tty {
                    writeln!(fmt, "{}", line)
                } else {
                    Ok(())
                }
            });
        }
        None => {
            builder.format(|fmt, record| {
                let ts = chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ");
                writeln!(fmt, "{} [{}] {}", ts, record.level(), record.args())
            });
        }
    }
    let _ = builder.try_init();
}
