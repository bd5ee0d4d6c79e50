//! Per-proxy in-flight tracking
//!
//! At most one pipeline may run for a given proxy at a time. A tick that
//! finds a proxy in flight skips it instead of starting an overlapping run.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;

/// Pipeline state of a proxy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlightState {
    Idle,
    InFlight,
}

/// Registry of proxies with a running pipeline
#[derive(Debug, Clone, Default)]
pub struct InFlightRegistry {
    states: Arc<DashMap<String, FlightState>>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a proxy in flight. Returns None if it already is.
    pub fn try_acquire(&self, proxy: &str) -> Option<FlightPermit> {
        match self.states.entry(proxy.to_string()) {
            Entry::Occupied(mut occupied) => {
                if *occupied.get() == FlightState::InFlight {
                    return None;
                }
                occupied.insert(FlightState::InFlight);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(FlightState::InFlight);
            }
        }

        Some(FlightPermit {
            states: Arc::clone(&self.states),
            proxy: proxy.to_string(),
        })
    }

    /// Current state of a proxy; unknown proxies are idle
    pub fn state(&self, proxy: &str) -> FlightState {
        self.states
            .get(proxy)
            .map(|s| *s)
            .unwrap_or(FlightState::Idle)
    }

    /// Number of proxies currently in flight
    pub fn in_flight_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| *s.value() == FlightState::InFlight)
            .count()
    }
}

/// Marks a proxy in flight until dropped
#[derive(Debug)]
pub struct FlightPermit {
    states: Arc<DashMap<String, FlightState>>,
    proxy: String,
}

impl FlightPermit {
    pub fn proxy(&self) -> &str {
        &self.proxy
    }
}

impl Drop for FlightPermit {
    fn drop(&mut self) {
        if let Some(mut state) = self.states.get_mut(&self.proxy) {
            *state = FlightState::Idle;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_acquire_is_refused() {
        let registry = InFlightRegistry::new();

        let permit = registry.try_acquire("orders-api").unwrap();
        assert_eq!(permit.proxy(), "orders-api");
        assert_eq!(registry.state("orders-api"), FlightState::InFlight);
        assert!(registry.try_acquire("orders-api").is_none());
    }

    #[test]
    fn test_drop_releases_proxy() {
        let registry = InFlightRegistry::new();

        {
            let _permit = registry.try_acquire("orders-api").unwrap();
            assert_eq!(registry.in_flight_count(), 1);
        }

        assert_eq!(registry.state("orders-api"), FlightState::Idle);
        assert_eq!(registry.in_flight_count(), 0);
        assert!(registry.try_acquire("orders-api").is_some());
    }

    #[test]
    fn test_proxies_are_independent() {
        let registry = InFlightRegistry::new();

        let _a = registry.try_acquire("a").unwrap();
        let _b = registry.try_acquire("b").unwrap();

        assert_eq!(registry.in_flight_count(), 2);
        assert_eq!(registry.state("c"), FlightState::Idle);
    }
}
