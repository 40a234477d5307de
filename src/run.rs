//! Shared cancellation for fan-out runs.
//!
//! Both harvesters fan work out across many tasks that share one stop
//! signal. The first task to cancel records the cause; later causes are
//! dropped, so the surfaced outcome is deterministic. Workers already in
//! flight are never pre-empted.

use std::sync::Mutex;

use tokio_util::sync::CancellationToken;

use crate::error::Error;

/// Why a run stopped before draining its work list.
#[derive(Debug)]
pub enum StopCause {
    /// Normal early exit, e.g. the scraper hit an already-known app.
    Finished,
    /// A worker hit a fatal error.
    Failed(Error),
}

pub struct RunToken {
    token: CancellationToken,
    cause: Mutex<Option<StopCause>>,
}

impl RunToken {
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
            cause: Mutex::new(None),
        }
    }

    /// Record `cause` if none has been recorded yet, then signal the token.
    pub fn cancel(&self, cause: StopCause) {
        let mut slot = self.cause.lock().unwrap();
        if slot.is_none() {
            *slot = Some(cause);
        }
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolve the run outcome. Call once, after every worker has been
    /// joined.
    pub fn result(&self) -> Result<(), Error> {
        match self.cause.lock().unwrap().take() {
            None | Some(StopCause::Finished) => Ok(()),
            Some(StopCause::Failed(err)) => Err(err),
        }
    }
}
