//! Observable currency balance.
//!
//! A [`Balance`] is a named integer amount. Every mutation notifies observers
//! synchronously, on the caller's thread, before the mutating call returns.
//! Three channels exist (see [`BalanceEvent`]):
//!
//! - `Increased` receives the amount added
//! - `Decreased` receives the amount removed
//! - `Changed` receives the new total
//!
//! Within a channel, observers run in registration order.
//!
//! ```rust
//! use std::cell::Cell;
//! use std::rc::Rc;
//! use std::sync::Arc;
//! use tradeledger::{Balance, MemoryStore};
//!
//! let mut purse = Balance::with_amount("purse", Arc::new(MemoryStore::new()), 10);
//! let seen = Rc::new(Cell::new(0));
//! let sink = seen.clone();
//! purse.on_changed(move |_, total| sink.set(total));
//!
//! assert!(purse.try_remove(4));
//! assert!(!purse.try_remove(100));
//! assert_eq!(seen.get(), 6);
//! ```
//!
//! Zero-delta policy: `add`, `try_remove` and transfers always notify, even for
//! zero amounts. `multiply` notifies only when the rounded amount actually
//! changed, and reports decreases as a *negative* delta on the `Decreased`
//! channel.

use std::fmt;

use log::{debug, trace, warn};

use crate::errors::LedgerError;
use crate::storage::SharedStore;

/// Observer callback: receives the balance and the channel's value.
pub type Observer = Box<dyn Fn(&Balance, i64)>;

/// Notification channel of a [`Balance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BalanceEvent {
    Increased,
    Decreased,
    Changed,
}

/// Handle returned by [`Balance::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId {
    event: BalanceEvent,
    seq: u64,
}

impl ObserverId {
    pub fn event(&self) -> BalanceEvent {
        self.event
    }
}

/// A named amount of in-game money.
pub struct Balance {
    identifier: String,
    amount: i64,
    store: SharedStore,
    increased: Vec<(u64, Observer)>,
    decreased: Vec<(u64, Observer)>,
    changed: Vec<(u64, Observer)>,
    next_observer: u64,
}

impl Balance {
    /// Create a balance persisting through `store`.
    ///
    /// When `load_from_storage` is true the amount is read from the store,
    /// falling back to `start_amount` if nothing is stored under `identifier`.
    /// Store failures other than absence are returned.
    pub fn create(
        identifier: impl Into<String>,
        store: SharedStore,
        load_from_storage: bool,
        start_amount: i64,
    ) -> Result<Self, LedgerError> {
        let identifier = identifier.into();
        let amount = if load_from_storage {
            store.get_int_or(&identifier, start_amount)?
        } else {
            start_amount
        };
        debug!("balance {} created with {}", identifier, amount);
        Ok(Self::from_parts(identifier, store, amount))
    }

    /// Create an empty balance without touching storage.
    pub fn new(identifier: impl Into<String>, store: SharedStore) -> Self {
        Self::from_parts(identifier.into(), store, 0)
    }

    /// Create a balance holding `amount` without touching storage.
    pub fn with_amount(identifier: impl Into<String>, store: SharedStore, amount: i64) -> Self {
        Self::from_parts(identifier.into(), store, amount)
    }

    fn from_parts(identifier: String, store: SharedStore, amount: i64) -> Self {
        Self {
            identifier,
            amount,
            store,
            increased: Vec::new(),
            decreased: Vec::new(),
            changed: Vec::new(),
            next_observer: 0,
        }
    }

    /// Storage key of this balance.
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn amount(&self) -> i64 {
        self.amount
    }

    pub fn has_at_least(&self, amount: i64) -> bool {
        self.amount >= amount
    }

    // ------------------------------------------------------------------
    // Observers
    // ------------------------------------------------------------------

    /// Register `observer` on `event`'s channel.
    pub fn subscribe<F>(&mut self, event: BalanceEvent, observer: F) -> ObserverId
    where
        F: Fn(&Balance, i64) + 'static,
    {
        let seq = self.next_observer;
        self.next_observer += 1;
        self.channel_mut(event).push((seq, Box::new(observer)));
        ObserverId { event, seq }
    }

    pub fn on_increased<F>(&mut self, observer: F) -> ObserverId
    where
        F: Fn(&Balance, i64) + 'static,
    {
        self.subscribe(BalanceEvent::Increased, observer)
    }

    pub fn on_decreased<F>(&mut self, observer: F) -> ObserverId
    where
        F: Fn(&Balance, i64) + 'static,
    {
        self.subscribe(BalanceEvent::Decreased, observer)
    }

    pub fn on_changed<F>(&mut self, observer: F) -> ObserverId
    where
        F: Fn(&Balance, i64) + 'static,
    {
        self.subscribe(BalanceEvent::Changed, observer)
    }

    /// Remove a previously registered observer. Returns false if it was already gone.
    pub fn unsubscribe(&mut self, id: ObserverId) -> bool {
        let channel = self.channel_mut(id.event);
        let before = channel.len();
        channel.retain(|(seq, _)| *seq != id.seq);
        channel.len() != before
    }

    pub fn observer_count(&self, event: BalanceEvent) -> usize {
        self.channel(event).len()
    }

    fn channel(&self, event: BalanceEvent) -> &[(u64, Observer)] {
        match event {
            BalanceEvent::Increased => &self.increased,
            BalanceEvent::Decreased => &self.decreased,
            BalanceEvent::Changed => &self.changed,
        }
    }

    fn channel_mut(&mut self, event: BalanceEvent) -> &mut Vec<(u64, Observer)> {
        match event {
            BalanceEvent::Increased => &mut self.increased,
            BalanceEvent::Decreased => &mut self.decreased,
            BalanceEvent::Changed => &mut self.changed,
        }
    }

    fn notify(&self, event: BalanceEvent, value: i64) {
        for (_, observer) in self.channel(event) {
            observer(self, value);
        }
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Add `amount`. Negative amounts are accepted and act as an unchecked removal.
    ///
    /// The total saturates at the `i64` bounds. Observers receive the amount
    /// actually applied, which is smaller than `amount` only when saturated.
    pub fn add(&mut self, amount: i64) {
        if amount < 0 {
            warn!(
                "balance {}: add called with negative amount {}",
                self.identifier, amount
            );
        }
        self.credit(amount);
    }

    // Returns the applied amount; differs from `amount` only at the i64 bounds.
    fn credit(&mut self, amount: i64) -> i64 {
        let old = self.amount;
        self.amount = old.saturating_add(amount);
        let applied = self.amount - old;
        if applied != amount {
            warn!(
                "balance {} saturated: {} of {} applied",
                self.identifier, applied, amount
            );
        }
        trace!("balance {} +{} = {}", self.identifier, applied, self.amount);
        self.notify(BalanceEvent::Increased, applied);
        self.notify(BalanceEvent::Changed, self.amount);
        applied
    }

    // Unchecked; every public path either guards it or is a full drain.
    fn remove(&mut self, amount: i64) -> i64 {
        let old = self.amount;
        self.amount = old.saturating_sub(amount);
        let applied = old - self.amount;
        trace!("balance {} -{} = {}", self.identifier, applied, self.amount);
        self.notify(BalanceEvent::Decreased, applied);
        self.notify(BalanceEvent::Changed, self.amount);
        applied
    }

    /// Scale the amount by `factor`, rounding half to even.
    ///
    /// Fires nothing when the rounded amount is unchanged. A decrease is reported
    /// on the `Decreased` channel as the negative difference `new - old`. Fails
    /// only when the product itself is not representable; a difference too wide
    /// for `i64` is reported clamped.
    pub fn multiply(&mut self, factor: f64) -> Result<(), LedgerError> {
        let old = self.amount;
        let scaled = (old as f64 * factor).round_ties_even();
        // i64::MAX as f64 rounds up to 2^63, which is already out of range
        if !scaled.is_finite() || scaled < i64::MIN as f64 || scaled >= i64::MAX as f64 {
            return Err(self.overflow(factor));
        }
        let new = scaled as i64;
        // e.g. -2^62 * -1.5: both ends fit, their distance does not
        let distance = i128::from(new) - i128::from(old);
        let difference = i64::try_from(distance).unwrap_or(if distance > 0 {
            i64::MAX
        } else {
            i64::MIN
        });

        self.amount = new;
        trace!(
            "balance {} x{} = {} ({:+})",
            self.identifier,
            factor,
            new,
            difference
        );
        if difference > 0 {
            self.notify(BalanceEvent::Increased, difference);
            self.notify(BalanceEvent::Changed, self.amount);
        } else if difference < 0 {
            self.notify(BalanceEvent::Decreased, difference);
            self.notify(BalanceEvent::Changed, self.amount);
        }
        Ok(())
    }

    fn overflow(&self, factor: f64) -> LedgerError {
        LedgerError::Overflow {
            identifier: self.identifier.clone(),
            factor,
        }
    }

    /// Move everything `other` holds into this balance, whatever its sign.
    ///
    /// This balance is credited (and its observers run) before `other` is drained.
    /// If the credit saturates, `other` gives up only what was absorbed and keeps
    /// the rest, so the pair's total never changes.
    pub fn add_from(&mut self, other: &mut Balance) {
        let moved = other.amount;
        debug!(
            "moving all {} from {} to {}",
            moved, other.identifier, self.identifier
        );
        let absorbed = self.credit(moved);
        other.remove(absorbed);
    }

    /// Move `amount` from `other` if it holds at least that much.
    ///
    /// Refused, with neither side touched, when either total would leave the
    /// `i64` range.
    pub fn try_add_from(&mut self, other: &mut Balance, amount: i64) -> bool {
        if !other.has_at_least(amount) {
            return false;
        }
        let in_range =
            self.amount.checked_add(amount).is_some() && other.amount.checked_sub(amount).is_some();
        if !in_range {
            debug!(
                "refusing to move {} from {} to {}: out of range",
                amount, other.identifier, self.identifier
            );
            return false;
        }
        self.credit(amount);
        other.remove(amount);
        true
    }

    /// Remove `amount` if this balance holds at least that much.
    pub fn try_remove(&mut self, amount: i64) -> bool {
        if !self.has_at_least(amount) {
            return false;
        }
        self.remove(amount);
        true
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Write the amount under this balance's identifier and commit the store.
    pub fn save(&self) -> Result<(), LedgerError> {
        self.store.set_int(&self.identifier, self.amount)?;
        self.store.commit()?;
        debug!("balance {} saved ({})", self.identifier, self.amount);
        Ok(())
    }

    /// Replace the amount with the stored value. Fails if nothing is stored.
    ///
    /// Observers are not notified.
    pub fn load(&mut self) -> Result<(), LedgerError> {
        self.amount = self.store.require_int(&self.identifier)?;
        debug!("balance {} loaded ({})", self.identifier, self.amount);
        Ok(())
    }
}

impl fmt::Debug for Balance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Balance")
            .field("identifier", &self.identifier)
            .field("amount", &self.amount)
            .field("increased_observers", &self.increased.len())
            .field("decreased_observers", &self.decreased.len())
            .field("changed_observers", &self.changed.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::sync::Arc;

    type Log = Rc<RefCell<Vec<(BalanceEvent, i64)>>>;

    fn record_all(balance: &mut Balance) -> Log {
        let log: Log = Rc::new(RefCell::new(Vec::new()));
        for event in [
            BalanceEvent::Increased,
            BalanceEvent::Decreased,
            BalanceEvent::Changed,
        ] {
            let sink = log.clone();
            balance.subscribe(event, move |_, value| sink.borrow_mut().push((event, value)));
        }
        log
    }

    fn purse(amount: i64) -> Balance {
        Balance::with_amount("purse", Arc::new(MemoryStore::new()), amount)
    }

    #[test]
    fn add_fires_increased_then_changed() {
        let mut balance = purse(5);
        let log = record_all(&mut balance);
        balance.add(3);
        balance.add(2);
        assert_eq!(balance.amount(), 10);
        assert_eq!(
            *log.borrow(),
            vec![
                (BalanceEvent::Increased, 3),
                (BalanceEvent::Changed, 8),
                (BalanceEvent::Increased, 2),
                (BalanceEvent::Changed, 10),
            ]
        );
    }

    #[test]
    fn negative_add_bypasses_funds_check() {
        let mut balance = purse(1);
        let log = record_all(&mut balance);
        balance.add(-5);
        assert_eq!(balance.amount(), -4);
        assert_eq!(log.borrow()[0], (BalanceEvent::Increased, -5));
    }

    #[test]
    fn multiply_rounds_half_to_even() {
        let mut balance = purse(5);
        balance.multiply(0.5).unwrap();
        assert_eq!(balance.amount(), 2);

        let mut balance = purse(7);
        balance.multiply(0.5).unwrap();
        assert_eq!(balance.amount(), 4);
    }

    #[test]
    fn multiply_decrease_reports_negative_delta() {
        let mut balance = purse(10);
        let log = record_all(&mut balance);
        balance.multiply(0.25).unwrap();
        assert_eq!(balance.amount(), 2);
        assert_eq!(
            *log.borrow(),
            vec![(BalanceEvent::Decreased, -8), (BalanceEvent::Changed, 2)]
        );
    }

    #[test]
    fn multiply_overflow_leaves_amount() {
        let mut balance = purse(i64::MAX / 2);
        let log = record_all(&mut balance);
        assert!(matches!(
            balance.multiply(4.0),
            Err(LedgerError::Overflow { .. })
        ));
        assert!(balance.multiply(f64::NAN).is_err());
        assert_eq!(balance.amount(), i64::MAX / 2);
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn observers_run_in_registration_order() {
        let mut balance = purse(0);
        let order = Rc::new(RefCell::new(Vec::new()));
        for tag in 1..=3 {
            let sink = order.clone();
            balance.on_changed(move |_, _| sink.borrow_mut().push(tag));
        }
        balance.add(1);
        assert_eq!(*order.borrow(), vec![1, 2, 3]);
    }

    #[test]
    fn unsubscribe_removes_only_that_observer() {
        let mut balance = purse(0);
        let hits = Rc::new(RefCell::new(0));
        let a = hits.clone();
        let first = balance.on_increased(move |_, _| *a.borrow_mut() += 1);
        let b = hits.clone();
        balance.on_increased(move |_, _| *b.borrow_mut() += 10);

        assert_eq!(first.event(), BalanceEvent::Increased);
        assert!(balance.unsubscribe(first));
        assert!(!balance.unsubscribe(first));
        assert_eq!(balance.observer_count(BalanceEvent::Increased), 1);

        balance.add(1);
        assert_eq!(*hits.borrow(), 10);
    }

    #[test]
    fn saturated_add_reports_applied_amount() {
        let mut balance = purse(i64::MAX - 1);
        let log = record_all(&mut balance);
        balance.add(5);
        assert_eq!(balance.amount(), i64::MAX);
        assert_eq!(
            *log.borrow(),
            vec![(BalanceEvent::Increased, 1), (BalanceEvent::Changed, i64::MAX)]
        );
    }

    #[test]
    fn try_add_from_refuses_out_of_range_credit() {
        let mut wallet = purse(i64::MAX - 1);
        let mut chest = purse(10);
        let wallet_log = record_all(&mut wallet);
        let chest_log = record_all(&mut chest);

        assert!(!wallet.try_add_from(&mut chest, 10));
        assert_eq!(wallet.amount(), i64::MAX - 1);
        assert_eq!(chest.amount(), 10);
        assert!(wallet_log.borrow().is_empty());
        assert!(chest_log.borrow().is_empty());

        assert!(wallet.try_add_from(&mut chest, 1));
        assert_eq!((wallet.amount(), chest.amount()), (i64::MAX, 9));
    }

    #[test]
    fn add_from_keeps_what_cannot_be_absorbed() {
        let mut wallet = purse(i64::MAX - 1);
        let mut chest = purse(10);
        let chest_log = record_all(&mut chest);

        wallet.add_from(&mut chest);
        assert_eq!(wallet.amount(), i64::MAX);
        assert_eq!(chest.amount(), 9);
        assert_eq!(
            *chest_log.borrow(),
            vec![(BalanceEvent::Decreased, 1), (BalanceEvent::Changed, 9)]
        );
    }

    #[test]
    fn multiply_accepts_result_further_than_i64_from_start() {
        let mut balance = purse(-(1i64 << 62));
        let log = record_all(&mut balance);
        balance.multiply(-1.5).unwrap();
        assert_eq!(balance.amount(), 6_917_529_027_641_081_856);
        assert_eq!(
            *log.borrow(),
            vec![
                (BalanceEvent::Increased, i64::MAX),
                (BalanceEvent::Changed, 6_917_529_027_641_081_856)
            ]
        );
    }

    #[test]
    fn observer_sees_balance_state() {
        let mut balance = purse(0);
        let seen = Rc::new(RefCell::new(None));
        let sink = seen.clone();
        balance.on_increased(move |b, _| {
            *sink.borrow_mut() = Some((b.identifier().to_string(), b.amount()))
        });
        balance.add(4);
        assert_eq!(*seen.borrow(), Some(("purse".to_string(), 4)));
    }
}
