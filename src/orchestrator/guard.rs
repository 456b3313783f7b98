//! Process-local "saving" flags.
//!
//! A flag is held for the duration of one operation and released when its
//! guard drops, including when the caller abandons the future mid-flight.
//! This only stops double submission from one process; it is not a lock
//! across sessions or devices.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Observable state of an operation for the caller to render.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Idle,
    Pending,
}

/// Independent field groups of a profile. Different lanes may be in flight at
/// the same time; the same lane may not.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Lane {
    DisplayName,
    Avatar,
}

#[derive(Debug, Default)]
pub(crate) struct InFlight {
    held: Mutex<HashSet<(String, Lane)>>,
}

impl InFlight {
    fn held(&self) -> MutexGuard<'_, HashSet<(String, Lane)>> {
        self.held.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// `None` if the lane is already held for `identity_id`.
    pub(crate) fn try_acquire(&self, identity_id: &str, lane: Lane) -> Option<InFlightGuard<'_>> {
        let key = (identity_id.to_string(), lane);
        if self.held().insert(key.clone()) {
            Some(InFlightGuard { owner: self, key })
        } else {
            None
        }
    }

    pub(crate) fn status(&self, identity_id: &str, lane: Lane) -> Status {
        if self.held().contains(&(identity_id.to_string(), lane)) {
            Status::Pending
        } else {
            Status::Idle
        }
    }
}

pub(crate) struct InFlightGuard<'a> {
    owner: &'a InFlight,
    key: (String, Lane),
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.held().remove(&self.key);
    }
}
