//! # Tradeledger - In-Game Currency Ledger
//!
//! Tradeledger keeps track of in-game money: named integer balances that notify
//! observers whenever they change and persist themselves to a local key-value
//! store.
//!
//! ## Features
//!
//! - **Observable Balances**: increased / decreased / changed notifications, delivered inline
//! - **Guarded Transfers**: `try_remove` and `try_add_from` never overdraw; `add_from` drains everything
//! - **Pluggable Storage**: sled, atomic JSON file, or in-memory backends behind one trait
//! - **Trade Context**: a lazily loaded global balance plus a per-level slot
//! - **Currency Display**: decimal ("¤12.34") or multi-tier ("5g 3s 7c") formatting and parsing
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tradeledger::config::Config;
//! use tradeledger::{Balance, TradeContext};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load("tradeledger.toml")?;
//!     let mut ctx = TradeContext::from_config(&config)?;
//!
//!     // A level starts: give it a fresh purse
//!     let level = Balance::new("level.money.sum", ctx.store().clone());
//!     ctx.set_current(level);
//!     ctx.current_mut()?.add(250);
//!
//!     // Level complete: bank the earnings
//!     let banked = ctx.settle_current()?;
//!     println!("banked {banked}, total {}", ctx.global()?.amount());
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! - [`balance`] - the observable balance and its operations
//! - [`registry`] - the trade context holding global and level balances
//! - [`storage`] - key-value persistence contract and backends
//! - [`currency`] - amount formatting and parsing
//! - [`config`] - TOML configuration
//! - [`errors`] - the crate error type

pub mod balance;
pub mod config;
pub mod currency;
pub mod errors;
pub mod registry;
pub mod storage;

pub use balance::{Balance, BalanceEvent, Observer, ObserverId};
pub use currency::{format_amount, parse_amount, CurrencySystem};
pub use errors::LedgerError;
pub use registry::TradeContext;
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, SharedStore, SledStore};
