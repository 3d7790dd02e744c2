//! Behavioural tests for balance arithmetic, guards and notifications.
use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;

use tradeledger::{Balance, BalanceEvent, MemoryStore, SharedStore};

type EventLog = Rc<RefCell<Vec<(String, BalanceEvent, i64)>>>;

fn store() -> SharedStore {
    Arc::new(MemoryStore::new())
}

/// Record every notification from `balance` into `log`, tagged with the balance id.
fn watch(balance: &mut Balance, log: &EventLog) {
    for event in [
        BalanceEvent::Increased,
        BalanceEvent::Decreased,
        BalanceEvent::Changed,
    ] {
        let sink = log.clone();
        balance.subscribe(event, move |b, value| {
            sink.borrow_mut()
                .push((b.identifier().to_string(), event, value))
        });
    }
}

fn new_log() -> EventLog {
    Rc::new(RefCell::new(Vec::new()))
}

fn events(log: &EventLog) -> Vec<(BalanceEvent, i64)> {
    log.borrow().iter().map(|(_, e, v)| (*e, *v)).collect()
}

#[test]
fn test_sequential_adds_accumulate_and_notify_in_order() {
    for (start, a, b) in [(0, 0, 0), (10, 5, 7), (3, 0, 100)] {
        let mut balance = Balance::with_amount("coins", store(), start);
        let log = new_log();
        watch(&mut balance, &log);

        balance.add(a);
        balance.add(b);

        assert_eq!(balance.amount(), start + a + b);
        assert_eq!(
            events(&log),
            vec![
                (BalanceEvent::Increased, a),
                (BalanceEvent::Changed, start + a),
                (BalanceEvent::Increased, b),
                (BalanceEvent::Changed, start + a + b),
            ]
        );
    }
}

#[test]
fn test_try_remove_guards_funds() {
    let mut balance = Balance::with_amount("coins", store(), 10);
    let log = new_log();
    watch(&mut balance, &log);

    assert!(!balance.try_remove(11));
    assert_eq!(balance.amount(), 10);
    assert!(log.borrow().is_empty());

    assert!(balance.try_remove(10));
    assert_eq!(balance.amount(), 0);
    assert_eq!(
        events(&log),
        vec![(BalanceEvent::Decreased, 10), (BalanceEvent::Changed, 0)]
    );
}

#[test]
fn test_try_add_from_moves_both_or_neither() {
    let mut wallet = Balance::with_amount("wallet", store(), 5);
    let mut chest = Balance::with_amount("chest", store(), 20);
    let log = new_log();
    watch(&mut wallet, &log);
    watch(&mut chest, &log);

    assert!(!wallet.try_add_from(&mut chest, 21));
    assert_eq!((wallet.amount(), chest.amount()), (5, 20));
    assert!(log.borrow().is_empty());

    assert!(wallet.try_add_from(&mut chest, 15));
    assert_eq!((wallet.amount(), chest.amount()), (20, 5));

    // Destination is credited before the source is debited
    let order: Vec<String> = log.borrow().iter().map(|(id, _, _)| id.clone()).collect();
    assert_eq!(order, vec!["wallet", "wallet", "chest", "chest"]);
}

#[test]
fn test_add_from_drains_everything_even_negative() {
    let mut wallet = Balance::with_amount("wallet", store(), 1);
    let mut debt = Balance::with_amount("debt", store(), -30);

    wallet.add_from(&mut debt);

    assert_eq!(wallet.amount(), -29);
    assert_eq!(debt.amount(), 0);
}

#[test]
fn test_zero_transfer_notifies_but_unit_multiply_does_not() {
    let mut wallet = Balance::with_amount("wallet", store(), 8);
    let mut empty = Balance::new("empty", store());
    let log = new_log();
    watch(&mut wallet, &log);
    watch(&mut empty, &log);

    wallet.add_from(&mut empty);
    assert_eq!(
        *log.borrow(),
        vec![
            ("wallet".to_string(), BalanceEvent::Increased, 0),
            ("wallet".to_string(), BalanceEvent::Changed, 8),
            ("empty".to_string(), BalanceEvent::Decreased, 0),
            ("empty".to_string(), BalanceEvent::Changed, 0),
        ]
    );

    log.borrow_mut().clear();
    wallet.multiply(1.0).unwrap();
    empty.multiply(3.5).unwrap();
    assert!(log.borrow().is_empty());
}

#[test]
fn test_multiply_directions() {
    let mut balance = Balance::with_amount("coins", store(), 10);
    let log = new_log();
    watch(&mut balance, &log);

    balance.multiply(1.5).unwrap();
    assert_eq!(balance.amount(), 15);
    balance.multiply(0.9).unwrap(); // 13.5 rounds to 14
    assert_eq!(balance.amount(), 14);

    assert_eq!(
        events(&log),
        vec![
            (BalanceEvent::Increased, 5),
            (BalanceEvent::Changed, 15),
            (BalanceEvent::Decreased, -1),
            (BalanceEvent::Changed, 14),
        ]
    );
}

#[test]
fn test_multiply_negative_factor_flips_sign() {
    let mut balance = Balance::with_amount("coins", store(), 4);
    balance.multiply(-1.0).unwrap();
    assert_eq!(balance.amount(), -4);
    assert!(!balance.has_at_least(0));
    assert!(balance.has_at_least(-4));
}
