//! Trade context: the global balance and the current level balance.
//!
//! A [`TradeContext`] is constructed explicitly and passed to whatever needs it.
//! It owns the store handle, creates the global balance on first use (loading
//! it from storage) and holds the level balance the game assigns when a level
//! starts.

use log::{debug, info};

use crate::balance::Balance;
use crate::config::{Config, DEFAULT_GLOBAL_KEY, DEFAULT_LEVEL_KEY};
use crate::errors::LedgerError;
use crate::storage::SharedStore;

pub struct TradeContext {
    store: SharedStore,
    global_key: String,
    level_key: String,
    global: Option<Balance>,
    current: Option<Balance>,
}

impl TradeContext {
    pub fn new(store: SharedStore) -> Self {
        Self::with_global_key(store, DEFAULT_GLOBAL_KEY)
    }

    pub fn with_global_key(store: SharedStore, global_key: impl Into<String>) -> Self {
        Self::with_keys(store, global_key, DEFAULT_LEVEL_KEY)
    }

    pub fn with_keys(
        store: SharedStore,
        global_key: impl Into<String>,
        level_key: impl Into<String>,
    ) -> Self {
        Self {
            store,
            global_key: global_key.into(),
            level_key: level_key.into(),
            global: None,
            current: None,
        }
    }

    /// Build a context over the configured store and keys.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let store = config.open_store()?;
        Ok(Self::with_keys(
            store,
            config.ledger.global_key.clone(),
            config.ledger.level_key.clone(),
        ))
    }

    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    pub fn global_key(&self) -> &str {
        &self.global_key
    }

    /// Identifier [`open_level`](Self::open_level) loads the level balance from.
    pub fn level_key(&self) -> &str {
        &self.level_key
    }

    /// Open a balance on this context's store, loading it or starting at `start_amount`.
    pub fn open_balance(
        &self,
        identifier: impl Into<String>,
        start_amount: i64,
    ) -> Result<Balance, LedgerError> {
        Balance::create(identifier, self.store.clone(), true, start_amount)
    }

    /// Whether the global balance has been created yet.
    pub fn global_loaded(&self) -> bool {
        self.global.is_some()
    }

    /// The global balance, created and loaded from storage on first access.
    pub fn global(&mut self) -> Result<&Balance, LedgerError> {
        Ok(self.global_mut()?)
    }

    pub fn global_mut(&mut self) -> Result<&mut Balance, LedgerError> {
        let balance = match self.global.take() {
            Some(balance) => balance,
            None => {
                let balance = self.open_balance(self.global_key.clone(), 0)?;
                info!(
                    "global balance {} loaded with {}",
                    balance.identifier(),
                    balance.amount()
                );
                balance
            }
        };
        Ok(self.global.insert(balance))
    }

    /// Assign the level balance, returning the one it replaces.
    pub fn set_current(&mut self, balance: Balance) -> Option<Balance> {
        debug!("current balance set to {}", balance.identifier());
        self.current.replace(balance)
    }

    /// Load the stored level balance (zero if absent) into the level slot.
    ///
    /// Whatever the slot held before is dropped unsaved.
    pub fn open_level(&mut self) -> Result<&mut Balance, LedgerError> {
        let balance = self.open_balance(self.level_key.clone(), 0)?;
        debug!(
            "level balance {} opened with {}",
            balance.identifier(),
            balance.amount()
        );
        Ok(self.current.insert(balance))
    }

    /// Clear the level slot.
    pub fn take_current(&mut self) -> Option<Balance> {
        self.current.take()
    }

    pub fn has_current(&self) -> bool {
        self.current.is_some()
    }

    pub fn current(&self) -> Result<&Balance, LedgerError> {
        self.current
            .as_ref()
            .ok_or(LedgerError::NotConfigured("current"))
    }

    pub fn current_mut(&mut self) -> Result<&mut Balance, LedgerError> {
        self.current
            .as_mut()
            .ok_or(LedgerError::NotConfigured("current"))
    }

    /// Borrow both balances mutably, e.g. to transfer between them.
    pub fn global_and_current(&mut self) -> Result<(&mut Balance, &mut Balance), LedgerError> {
        if self.current.is_none() {
            return Err(LedgerError::NotConfigured("current"));
        }
        self.global_mut()?;
        match (self.global.as_mut(), self.current.as_mut()) {
            (Some(global), Some(current)) => Ok((global, current)),
            _ => Err(LedgerError::Internal(
                "global balance missing after load".to_string(),
            )),
        }
    }

    /// Move everything in the level balance into the global balance and save the latter.
    ///
    /// Returns the amount moved. The level balance is left at zero but not saved.
    pub fn settle_current(&mut self) -> Result<i64, LedgerError> {
        let (global, current) = self.global_and_current()?;
        let moved = current.amount();
        global.add_from(current);
        global.save()?;
        info!("settled {} into {}", moved, global.identifier());
        Ok(moved)
    }

    /// Save every balance the context holds.
    pub fn save_all(&self) -> Result<(), LedgerError> {
        for balance in self.global.iter().chain(self.current.iter()) {
            balance.save()?;
        }
        Ok(())
    }
}
