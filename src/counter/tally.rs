//! Address tally for a single invocation.

use std::collections::HashMap;
use std::num::NonZeroU64;

/// Count of observations per remote address.
///
/// Keys borrow from the batch being processed, so a tally can never outlive
/// the invocation that built it.
#[derive(Debug, Default)]
pub struct AddressTally<'a> {
    counts: HashMap<&'a str, u64>,
}

impl<'a> AddressTally<'a> {
    /// Creates an empty tally.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a tally from a sequence of addresses.
    pub fn from_addresses<I>(addresses: I) -> Self
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut tally = Self::new();
        for address in addresses {
            tally.record(address);
        }
        tally
    }

    /// Records one observation for `address`.
    pub fn record(&mut self, address: &'a str) {
        *self.counts.entry(address).or_insert(0) += 1;
    }

    /// Current count for `address` without draining it.
    #[allow(dead_code)] // Inspection helper
    pub fn get(&self, address: &str) -> u64 {
        self.counts.get(address).copied().unwrap_or(0)
    }

    /// Takes the whole count for `address`, leaving zero behind.
    ///
    /// Returns `None` if the address was never recorded or has already
    /// been drained.
    pub fn take(&mut self, address: &str) -> Option<NonZeroU64> {
        self.counts
            .get_mut(address)
            .map(std::mem::take)
            .and_then(NonZeroU64::new)
    }

    /// Number of distinct addresses seen.
    pub fn len(&self) -> usize {
        self.counts.len()
    }

    /// Returns true if nothing has been recorded.
    #[allow(dead_code)] // Pairs with len()
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}
