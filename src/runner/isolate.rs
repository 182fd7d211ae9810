//! Failure isolation for independent work items.
//!
//! A product build is a chain of units that share one [`FailureMarker`].
//! Wrapping each of them with [`isolate`] turns a failure into a recorded
//! marker plus a successful completion, so a parallel group of products keeps
//! going when one of them breaks. Once a marker is set, the remaining isolated
//! units of that item are skipped.

use std::sync::{Arc, Mutex};

use tracing::{debug, error};

use super::entry::RunnableUnit;

/// Shared record of the first failure of a work item.
#[derive(Debug, Clone, Default)]
pub struct FailureMarker {
    failure: Arc<Mutex<Option<String>>>,
}

impl FailureMarker {
    /// Create an unset marker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a failure. The first recorded failure wins.
    pub fn record(&self, message: impl Into<String>) {
        let mut slot = self.lock();
        if slot.is_none() {
            *slot = Some(message.into());
        }
    }

    /// Check whether a failure was recorded.
    pub fn is_failed(&self) -> bool {
        self.lock().is_some()
    }

    /// The recorded failure message, if any.
    pub fn failure(&self) -> Option<String> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<String>> {
        // A poisoned lock still holds a valid Option.
        self.failure.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Wrap `unit` so its failure is recorded on `marker` instead of propagated.
///
/// `item` names the work item in log output.
pub fn isolate(item: &str, unit: RunnableUnit, marker: &FailureMarker) -> RunnableUnit {
    let item = item.to_string();
    let marker = marker.clone();
    let label = unit.label().to_string();

    RunnableUnit::new(label.clone(), move || {
        let item = item.clone();
        let marker = marker.clone();
        let label = label.clone();
        let unit = unit.clone();
        async move {
            if marker.is_failed() {
                debug!("skip {} of failed {}", label, item);
                return Ok(());
            }
            if let Err(err) = unit.invoke().await {
                error!("ERROR building {}: {}", item, err);
                marker.record(format!("{}: {}", label, err));
            }
            Ok(())
        }
    })
}
