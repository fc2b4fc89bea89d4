// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Per-key gates that serialize concurrent misses.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{Mutex as Gate, OwnedMutexGuard};

/// Registry of in-flight producers, keyed by full cache key.
///
/// A gate exists only while at least one caller holds or awaits it.
#[derive(Debug, Default)]
pub(crate) struct Flights {
    gates: Mutex<HashMap<String, Flight>>,
}

#[derive(Debug, Default)]
struct Flight {
    gate: Arc<Gate<()>>,
    /// Callers holding or awaiting `gate`.
    users: usize,
}

impl Flights {
    /// Waits until no other caller holds the gate for `key`, then holds it.
    ///
    /// Waiters are admitted in arrival order. A caller dropped while waiting gives up its place
    /// and its share of the gate.
    pub(crate) async fn enter<'a>(&'a self, key: &str) -> FlightPermit<'a> {
        let gate = {
            let mut gates = self.gates.lock();
            let flight = gates.entry(key.to_owned()).or_default();
            flight.users += 1;
            Arc::clone(&flight.gate)
        };

        let mut permit = FlightPermit {
            flights: self,
            key: key.to_owned(),
            guard: None,
        };
        permit.guard = Some(gate.lock_owned().await);
        permit
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.gates.lock().len()
    }
}

/// A caller's share of one key's gate, held exclusively once [`Flights::enter`] returns.
///
/// Dropping it admits the next waiter.
#[derive(Debug)]
pub(crate) struct FlightPermit<'a> {
    flights: &'a Flights,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for FlightPermit<'_> {
    fn drop(&mut self) {
        let mut gates = self.flights.gates.lock();
        drop(self.guard.take());

        if let Entry::Occupied(mut flight) = gates.entry(std::mem::take(&mut self.key)) {
            flight.get_mut().users -= 1;
            if flight.get().users == 0 {
                flight.remove();
            }
        }
    }
}
