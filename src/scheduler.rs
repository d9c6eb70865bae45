//! Search and auto-refresh control
//!
//! [`SessionController`] owns the current target city and serializes refresh
//! cycles. Every search bumps a generation counter; a cycle that finishes after
//! a newer search started is dropped instead of overwriting newer data.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::geocoding::Geocoder;
use crate::insights::{Insight, error_insights};
use crate::models::Location;
use crate::session::{DashboardSession, DashboardSnapshot};

/// Progress reported to whoever renders the dashboard
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Loading { city: String },
    Updated(Box<DashboardSnapshot>),
    /// Search failed; the previous snapshot stays on screen next to the
    /// error panel
    Failed {
        message: String,
        panel: Vec<Insight>,
    },
}

#[derive(Debug, Default)]
struct SessionState {
    target: Option<Location>,
    generation: u64,
    auto_refresh: bool,
}

struct Inner {
    session: DashboardSession,
    geocoder: Arc<dyn Geocoder>,
    state: Mutex<SessionState>,
    cycle_lock: tokio::sync::Mutex<()>,
    timer: Mutex<Option<CancellationToken>>,
    events: UnboundedSender<SessionEvent>,
}

#[derive(Clone)]
pub struct SessionController {
    inner: Arc<Inner>,
}

impl SessionController {
    /// Create a controller and the receiving end of its event stream
    #[must_use]
    pub fn new(
        session: DashboardSession,
        geocoder: Arc<dyn Geocoder>,
        auto_refresh: bool,
    ) -> (Self, UnboundedReceiver<SessionEvent>) {
        let (events, receiver) = mpsc::unbounded_channel();
        let controller = Self {
            inner: Arc::new(Inner {
                session,
                geocoder,
                state: Mutex::new(SessionState {
                    auto_refresh,
                    ..SessionState::default()
                }),
                cycle_lock: tokio::sync::Mutex::new(()),
                timer: Mutex::new(None),
                events,
            }),
        };
        (controller, receiver)
    }

    #[must_use]
    pub fn target(&self) -> Option<Location> {
        self.state().target.clone()
    }

    #[must_use]
    pub fn auto_refresh(&self) -> bool {
        self.state().auto_refresh
    }

    /// Resolve `city` and load its dashboard.
    ///
    /// A failed lookup keeps the previous target.
    #[instrument(skip(self))]
    pub async fn search(&self, city: &str) {
        let generation = {
            let mut state = self.state();
            state.generation += 1;
            state.generation
        };
        self.stop_timer();

        {
            let _cycle = self.inner.cycle_lock.lock().await;
            if self.is_stale(generation) {
                debug!("Search for {} superseded before it started", city);
                return;
            }
            self.emit(SessionEvent::Loading {
                city: city.to_string(),
            });

            let location = match self.inner.geocoder.geocode(city).await {
                Ok(location) => location,
                Err(e) => {
                    if self.is_stale(generation) {
                        return;
                    }
                    warn!("Search for {} failed: {}", city, e);
                    self.emit(SessionEvent::Failed {
                        message: e.user_message(),
                        panel: error_insights(&e),
                    });
                    self.restart_timer_if_enabled(generation);
                    return;
                }
            };

            let auto_refresh = {
                let mut state = self.state();
                if state.generation != generation {
                    debug!("Search for {} superseded after geocoding", city);
                    return;
                }
                state.target = Some(location.clone());
                state.auto_refresh
            };

            let snapshot = self.inner.session.run_cycle(&location, auto_refresh).await;
            self.publish(generation, snapshot);
        }

        self.restart_timer_if_enabled(generation);
    }

    /// Reload the current target.
    ///
    /// Returns `false` when skipped because a cycle is already running or no
    /// city has been resolved yet.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> bool {
        let Ok(_cycle) = self.inner.cycle_lock.try_lock() else {
            debug!("Refresh skipped, a cycle is in flight");
            return false;
        };

        let (target, generation, auto_refresh) = {
            let state = self.state();
            (state.target.clone(), state.generation, state.auto_refresh)
        };
        let Some(location) = target else {
            debug!("Refresh skipped, no target city");
            return false;
        };

        self.emit(SessionEvent::Loading {
            city: location.name.clone(),
        });
        let snapshot = self.inner.session.run_cycle(&location, auto_refresh).await;
        self.publish(generation, snapshot);
        true
    }

    /// Turn the periodic refresh on or off
    pub fn set_auto_refresh(&self, enabled: bool) {
        let (generation, has_target) = {
            let mut state = self.state();
            state.auto_refresh = enabled;
            (state.generation, state.target.is_some())
        };
        info!("Auto-refresh {}", if enabled { "enabled" } else { "disabled" });

        if enabled && has_target {
            self.restart_timer_if_enabled(generation);
        } else {
            self.stop_timer();
        }
    }

    /// Cancel the refresh timer
    pub fn shutdown(&self) {
        self.stop_timer();
    }

    fn publish(&self, generation: u64, snapshot: DashboardSnapshot) {
        if self.is_stale(generation) {
            debug!(
                "Discarding stale cycle for {} (generation {})",
                snapshot.location.name, generation
            );
            return;
        }
        self.emit(SessionEvent::Updated(Box::new(snapshot)));
    }

    fn emit(&self, event: SessionEvent) {
        if self.inner.events.send(event).is_err() {
            debug!("Event receiver dropped");
        }
    }

    fn is_stale(&self, generation: u64) -> bool {
        self.state().generation != generation
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn stop_timer(&self) {
        let token = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(token) = token {
            token.cancel();
        }
    }

    fn restart_timer_if_enabled(&self, generation: u64) {
        {
            let state = self.state();
            if !state.auto_refresh || state.generation != generation {
                return;
            }
        }

        let token = CancellationToken::new();
        let previous = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(token.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        let period = self.inner.session.refresh_interval();
        let inner: Weak<Inner> = Arc::downgrade(&self.inner);
        debug!("Starting refresh timer every {:?}", period);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    () = token.cancelled() => break,
                    _ = ticker.tick() => {
                        let Some(inner) = inner.upgrade() else {
                            break;
                        };
                        SessionController { inner }.refresh().await;
                    }
                }
            }
            debug!("Refresh timer stopped");
        });
    }
}
