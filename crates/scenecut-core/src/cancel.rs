//! Stopping an analysis or extraction run that is already under way.
//!
//! A run is either stopped by its caller, whose partial results are still
//! wanted, or because its session was removed, which leaves nothing to
//! store results into.

use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

/// Why a run was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// The caller asked for the run to stop. Work done so far is kept.
    Requested,
    /// The session was removed while the run was in flight.
    SessionRemoved,
}

impl CancelReason {
    fn code(self) -> u8 {
        match self {
            Self::Requested => 1,
            Self::SessionRemoved => 2,
        }
    }

    fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Self::Requested),
            2 => Some(Self::SessionRemoved),
            _ => None,
        }
    }
}

impl fmt::Display for CancelReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Requested => "requested by caller",
            Self::SessionRemoved => "session removed",
        })
    }
}

/// Shared stop flag for one run.
///
/// Clones observe the same state. Frame and segment loops poll
/// [`CancelToken::is_cancelled`]; the first reason recorded sticks.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicU8>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stop the run at the caller's request.
    pub fn cancel(&self) {
        self.cancel_for(CancelReason::Requested);
    }

    /// Stop the run for `reason` unless it was already stopped.
    pub fn cancel_for(&self, reason: CancelReason) {
        let _ = self
            .0
            .compare_exchange(0, reason.code(), Ordering::AcqRel, Ordering::Acquire);
    }

    pub fn is_cancelled(&self) -> bool {
        self.reason().is_some()
    }

    pub fn reason(&self) -> Option<CancelReason> {
        CancelReason::from_code(self.0.load(Ordering::Acquire))
    }
}
