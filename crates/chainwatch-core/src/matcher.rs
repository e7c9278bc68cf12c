//! Address matcher.

use std::collections::HashSet;

use crate::types::{Address, Transaction};

/// Returns the subscribed addresses `tx` should be recorded against.
///
/// An address is selected iff it is the sender or the recipient of `tx`.
/// Each address is checked against the transaction on its own, so one
/// subscriber's match never spills over to another.
pub fn match_subscribers(tx: &Transaction, subscribers: &HashSet<Address>) -> HashSet<Address> {
    let mut matched = HashSet::with_capacity(2);
    if subscribers.contains(&tx.from) {
        matched.insert(tx.from.clone());
    }
    if let Some(to) = &tx.to {
        if subscribers.contains(to) {
            matched.insert(to.clone());
        }
    }
    matched
}
