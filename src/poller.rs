use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::debug;
use tokio::sync::watch;
use tokio::time::{interval, Interval, MissedTickBehavior};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    Running,
    Paused,
    Stopped,
}

struct RegistryInner {
    state: watch::Sender<PollState>,
    active: Mutex<BTreeMap<u64, String>>,
    next_id: AtomicU64,
}

/// Shared handle controlling every poller created from it.
///
/// Components that need to hold all polling (for example while a prompt is
/// open) get a clone of the registry instead of reaching for a global.
#[derive(Clone)]
pub struct PollerRegistry {
    inner: Arc<RegistryInner>,
}

impl Default for PollerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PollerRegistry {
    pub fn new() -> Self {
        let (state, _) = watch::channel(PollState::Running);
        Self {
            inner: Arc::new(RegistryInner {
                state,
                active: Mutex::new(BTreeMap::new()),
                next_id: AtomicU64::new(0),
            }),
        }
    }

    /// Creates a poller ticking every `period`. It deregisters when dropped.
    pub fn register(&self, name: impl Into<String>, period: Duration) -> Poller {
        let name = name.into();
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.lock_active().insert(id, name.clone());
        debug!("Registered poller '{name}' every {period:?}");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        Poller {
            id,
            name,
            ticker,
            state: self.inner.state.subscribe(),
            registry: self.clone(),
        }
    }

    pub fn pause_all(&self) {
        self.set_state(PollState::Paused);
    }

    pub fn resume_all(&self) {
        self.set_state(PollState::Running);
    }

    /// Stops every poller for good; `next_tick` returns `false` afterwards.
    pub fn stop_all(&self) {
        self.set_state(PollState::Stopped);
    }

    fn set_state(&self, next: PollState) {
        self.inner.state.send_if_modified(|state| {
            // A stopped registry stays stopped.
            if *state == next || *state == PollState::Stopped {
                return false;
            }
            debug!("Poller registry {state:?} -> {next:?}");
            *state = next;
            true
        });
    }

    pub fn state(&self) -> PollState {
        *self.inner.state.borrow()
    }

    pub fn is_paused(&self) -> bool {
        self.state() == PollState::Paused
    }

    /// Names of the pollers currently registered.
    pub fn active(&self) -> Vec<String> {
        self.lock_active().values().cloned().collect()
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, BTreeMap<u64, String>> {
        self.inner
            .active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// A periodic timer that honours its registry's pause and stop requests.
pub struct Poller {
    id: u64,
    name: String,
    ticker: Interval,
    state: watch::Receiver<PollState>,
    registry: PollerRegistry,
}

impl Poller {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Waits for the next tick.
    ///
    /// The first tick completes immediately. While the registry is paused the
    /// call keeps waiting; returns `false` once the registry is stopped.
    pub async fn next_tick(&mut self) -> bool {
        if self.current_state() == PollState::Stopped {
            return false;
        }

        let mut stop = self.state.clone();
        tokio::select! {
            _ = self.ticker.tick() => {}
            stopped = async { stop.wait_for(|state| *state == PollState::Stopped).await.is_ok() } => {
                if stopped {
                    return false;
                }
            }
        }

        loop {
            match self.current_state() {
                PollState::Running => return true,
                PollState::Stopped => return false,
                PollState::Paused => {
                    debug!("Poller '{}' paused", self.name);
                    if self.state.changed().await.is_err() {
                        return false;
                    }
                }
            }
        }
    }

    fn current_state(&mut self) -> PollState {
        *self.state.borrow_and_update()
    }
}

impl Drop for Poller {
    fn drop(&mut self) {
        self.registry.lock_active().remove(&self.id);
        debug!("Deregistered poller '{}'", self.name);
    }
}
