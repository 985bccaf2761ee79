//! Outbound request pacing.
//!
//! Every request to the upstream goes through one [`RequestGate`]. The gate
//! holds a global floor (at most one request per `global_interval`, no matter
//! what is being fetched) and one floor per polled entity, so a single thread
//! is not re-fetched more often than its configured interval.
//!
//! The gate never rejects. It only delays: the caller is told when its slot
//! is, and [`RequestGate::acquire`] sleeps until then. Slots are charged when
//! they are handed out, whether or not the request that follows succeeds.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::thread;
use std::time::{Duration, Instant};

/// At most one request per second across the whole process.
pub const GLOBAL_INTERVAL: Duration = Duration::from_secs(1);

/// Default minimum time between two fetches of the same thread.
pub const DEFAULT_KEY_INTERVAL: Duration = Duration::from_secs(15);

/// Per-key intervals below this are raised to it.
pub const KEY_FLOOR: Duration = Duration::from_secs(10);

/// Expired per-key entries are dropped once the map grows past this.
const PRUNE_THRESHOLD: usize = 256;

/// Stand-in for "never" when an interval does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Configuration for the request gate.
#[derive(Debug, Clone)]
pub struct GateConfig {
    /// Minimum spacing between any two requests.
    pub global_interval: Duration,

    /// Interval used for keys when the caller has no preference.
    pub default_key_interval: Duration,

    /// Lowest per-key interval the gate will honour.
    pub key_floor: Duration,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            global_interval: GLOBAL_INTERVAL,
            default_key_interval: DEFAULT_KEY_INTERVAL,
            key_floor: KEY_FLOOR,
        }
    }
}

/// Shared pacing state. Wrap in an `Arc` and hand a clone to every call path
/// that talks to the same upstream.
///
/// Thread-safe: all internal state is protected by a mutex, which is only
/// held while a slot is computed, never while sleeping.
#[derive(Debug)]
pub struct RequestGate {
    config: GateConfig,
    state: Mutex<GateState>,
}

/// Earliest instants at which the next request may go out.
#[derive(Debug, Default)]
struct GateState {
    global_next: Option<Instant>,
    per_key: HashMap<String, Instant>,
}

impl Default for RequestGate {
    fn default() -> Self {
        Self::new(GateConfig::default())
    }
}

impl RequestGate {
    pub fn new(config: GateConfig) -> Self {
        Self {
            config,
            state: Mutex::new(GateState::default()),
        }
    }

    pub fn config(&self) -> &GateConfig {
        &self.config
    }

    /// The interval actually applied for a requested per-key interval.
    pub fn effective_interval(&self, requested: Duration) -> Duration {
        requested.max(self.config.key_floor)
    }

    /// Block until both the global floor and the floor for `key` have
    /// passed, then return the granted instant.
    pub fn acquire(&self, key: &str, interval: Duration) -> Instant {
        let at = self.reserve(key, interval);
        Self::wait_until(at, Some(key));
        at
    }

    /// Like [`acquire`](Self::acquire) but only the global floor applies.
    /// Used for board lists, catalogs and index pages.
    pub fn acquire_global(&self) -> Instant {
        let at = self.reserve_global();
        Self::wait_until(at, None);
        at
    }

    /// Claim the next slot for `key` without sleeping.
    ///
    /// Both floors are advanced before this returns, so a concurrent caller
    /// always sees the new floor.
    pub fn reserve(&self, key: &str, interval: Duration) -> Instant {
        let interval = self.effective_interval(interval);
        self.reserve_slot(Some((key, interval)))
    }

    /// Claim the next global slot without sleeping.
    pub fn reserve_global(&self) -> Instant {
        self.reserve_slot(None)
    }

    /// When the next request for `key` may go out, if it has been used.
    pub fn next_allowed(&self, key: &str) -> Option<Instant> {
        self.lock().per_key.get(key).copied()
    }

    /// When the next request of any kind may go out.
    pub fn next_allowed_global(&self) -> Option<Instant> {
        self.lock().global_next
    }

    fn reserve_slot(&self, key: Option<(&str, Duration)>) -> Instant {
        let mut state = self.lock();
        let now = Instant::now();

        let mut at = now;
        if let Some(global_next) = state.global_next {
            at = at.max(global_next);
        }
        if let Some((key, _)) = key {
            if let Some(key_next) = state.per_key.get(key) {
                at = at.max(*key_next);
            }
        }

        // `at` is never earlier than either floor it read, so both only move forward.
        state.global_next = Some(later(at, self.config.global_interval));
        if let Some((key, interval)) = key {
            state.per_key.insert(key.to_string(), later(at, interval));
        }

        if state.per_key.len() > PRUNE_THRESHOLD {
            state.per_key.retain(|_, next| *next > now);
        }

        at
    }

    fn wait_until(at: Instant, key: Option<&str>) {
        let wait = at.saturating_duration_since(Instant::now());
        if wait.is_zero() {
            return;
        }
        tracing::debug!(
            key = key.unwrap_or("<global>"),
            wait_ms = wait.as_millis() as u64,
            "waiting for request slot"
        );
        thread::sleep(wait);
    }

    fn lock(&self) -> MutexGuard<'_, GateState> {
        // The state is written in one step under the lock, so a poisoned
        // guard still holds consistent floors.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// `at + interval`, saturating instead of overflowing.
pub(crate) fn later(at: Instant, interval: Duration) -> Instant {
    at.checked_add(interval)
        .or_else(|| at.checked_add(FAR_FUTURE))
        .unwrap_or(at)
}
