//! Admission control for outbound upstream calls
//!
//! Each upstream has a minimum interval between two granted calls, which keeps
//! the gateway inside provider API quotas. A denied call is not an error: the
//! upstream simply contributes nothing to the current request.

use crate::config::Settings;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

/// Per-upstream gate state
#[derive(Debug)]
struct Gate {
    /// Minimum milliseconds between two granted calls
    wait_interval_ms: u64,
    /// Timestamp (ms since epoch) of the last granted call
    last_call_ms: AtomicU64,
}

/// Per-upstream minimum-interval gate.
///
/// The set of upstreams is fixed at construction, so lookups never lock; the
/// grant itself is a compare-and-swap on the upstream's timestamp.
#[derive(Debug, Default)]
pub struct AdmissionMonitor {
    gates: HashMap<String, Gate>,
}

impl AdmissionMonitor {
    /// Create a monitor from (upstream name, wait interval in ms) pairs
    pub fn new<I, S>(intervals: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let gates = intervals
            .into_iter()
            .map(|(name, wait_interval_ms)| {
                (
                    name.into(),
                    Gate {
                        wait_interval_ms,
                        last_call_ms: AtomicU64::new(0),
                    },
                )
            })
            .collect();
        Self { gates }
    }

    /// Create a monitor for every enabled provider in settings
    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(
            settings
                .enabled_providers()
                .into_iter()
                .map(|p| (p.name.clone(), p.wait_interval_ms)),
        )
    }

    /// Try to acquire a call slot for an upstream now
    pub fn is_available(&self, name: &str) -> bool {
        self.is_available_at(name, now_millis())
    }

    /// Try to acquire a call slot for an upstream at the given time.
    ///
    /// Grants (and records `now_ms`) iff at least the wait interval has passed
    /// since the last granted call. Unknown upstreams are always denied.
    pub fn is_available_at(&self, name: &str, now_ms: u64) -> bool {
        let Some(gate) = self.gates.get(name) else {
            debug!("Admission denied for unknown upstream {}", name);
            return false;
        };

        let mut last = gate.last_call_ms.load(Ordering::Acquire);
        loop {
            if now_ms.saturating_sub(last) < gate.wait_interval_ms {
                debug!("Admission denied for {} ({}ms since last call)", name, now_ms.saturating_sub(last));
                return false;
            }
            match gate.last_call_ms.compare_exchange_weak(
                last,
                now_ms,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => last = actual,
            }
        }
    }

    /// Number of gated upstreams
    pub fn len(&self) -> usize {
        self.gates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.gates.is_empty()
    }
}

fn now_millis() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
}
