//! Background dispatch of orchestration runs.
//!
//! Runs are fire-and-forget tasks on a [`TaskTracker`] so shutdown can wait
//! for them. An id with a run already in flight in this process is not
//! dispatched again.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::task::TaskTracker;
use tracing::{debug, info};

use crate::orchestrator::Orchestrator;

/// Spawns orchestration runs in the background.
#[derive(Clone)]
pub struct Dispatcher {
    orchestrator: Arc<Orchestrator>,
    tracker: TaskTracker,
    in_flight: Arc<Mutex<HashSet<String>>>,
}

/// Removes an id from the in-flight set when its task ends.
struct InFlight {
    id: String,
    set: Arc<Mutex<HashSet<String>>>,
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}

impl Dispatcher {
    #[must_use]
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self {
            orchestrator,
            tracker: TaskTracker::new(),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    /// Start a background run for `id`.
    ///
    /// Returns `false` when a run for the same id is still in flight.
    pub fn dispatch(&self, id: impl Into<String>) -> bool {
        let id = id.into();
        {
            let mut in_flight = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
            if !in_flight.insert(id.clone()) {
                debug!(request_id = %id, "Run already in flight, skipping");
                return false;
            }
        }

        let guard = InFlight {
            id: id.clone(),
            set: Arc::clone(&self.in_flight),
        };
        let orchestrator = Arc::clone(&self.orchestrator);
        self.tracker.spawn(async move {
            let _guard = guard;
            orchestrator.run_by_id(&id).await;
        });
        true
    }

    /// Number of runs currently in flight.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Wait for every dispatched run to finish.
    pub async fn wait_idle(&self) {
        self.tracker.close();
        self.tracker.wait().await;
        self.tracker.reopen();
    }

    /// Stop tracking new work and drain in-flight runs.
    pub async fn shutdown(&self) {
        let pending = self.tracker.len();
        if pending > 0 {
            info!(pending, "Waiting for in-flight provisioning runs");
        }
        self.tracker.close();
        self.tracker.wait().await;
    }
}
