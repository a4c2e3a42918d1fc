//! Pending/confirmed/failed state for a single contract write.

use thiserror::Error;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("a transaction is already pending")]
    AlreadyPending,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TxState {
    #[default]
    Idle,
    /// Dispatched; the hash is known once the wallet has accepted the call.
    Pending { tx_hash: Option<String> },
    Confirmed { tx_hash: String },
    Failed { reason: String },
}

/// Lifecycle of one logical write request.
///
/// Idle → Pending → Confirmed | Failed. While Pending, `begin` refuses —
/// that refusal is the duplicate-submission guard. Failed holds the reason
/// until `reset` returns the workflow to Idle for a manual retry.
#[derive(Debug, Default)]
pub struct TxWorkflow {
    state: TxState,
}

impl TxWorkflow {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &TxState {
        &self.state
    }

    /// Whether a new dispatch would be accepted.
    pub fn can_dispatch(&self) -> bool {
        !matches!(self.state, TxState::Pending { .. })
    }

    /// Move to Pending. Terminal states are implicitly reset; a live Pending
    /// is not.
    pub fn begin(&mut self) -> Result<(), WorkflowError> {
        if !self.can_dispatch() {
            return Err(WorkflowError::AlreadyPending);
        }
        self.state = TxState::Pending { tx_hash: None };
        Ok(())
    }

    /// Record the wallet-assigned hash for the in-flight call.
    pub fn dispatched(&mut self, tx_hash: &str) {
        if let TxState::Pending { tx_hash: slot } = &mut self.state {
            *slot = Some(tx_hash.to_string());
        }
    }

    pub fn confirm(&mut self, tx_hash: String) {
        self.state = TxState::Confirmed { tx_hash };
    }

    pub fn fail(&mut self, reason: impl Into<String>) {
        self.state = TxState::Failed {
            reason: reason.into(),
        };
    }

    /// Back to Idle; the caller decides whether to retry.
    pub fn reset(&mut self) {
        self.state = TxState::Idle;
    }

    /// A confirmed write means the views are stale and should be re-fetched.
    pub fn needs_refresh(&self) -> bool {
        matches!(self.state, TxState::Confirmed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_confirmed() {
        let mut w = TxWorkflow::new();
        assert_eq!(*w.state(), TxState::Idle);
        w.begin().unwrap();
        w.dispatched("0xhash");
        assert_eq!(
            *w.state(),
            TxState::Pending {
                tx_hash: Some("0xhash".to_string())
            }
        );
        w.confirm("0xhash".to_string());
        assert!(w.needs_refresh());
    }

    #[test]
    fn pending_refuses_second_dispatch() {
        let mut w = TxWorkflow::new();
        w.begin().unwrap();
        assert!(!w.can_dispatch());
        assert_eq!(w.begin(), Err(WorkflowError::AlreadyPending));
    }

    #[test]
    fn failure_keeps_reason_and_never_confirms() {
        let mut w = TxWorkflow::new();
        w.begin().unwrap();
        w.fail("buy policy: user declined the request");
        match w.state() {
            TxState::Failed { reason } => assert!(reason.contains("user declined")),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(!w.needs_refresh());
    }

    #[test]
    fn reset_allows_manual_retry() {
        let mut w = TxWorkflow::new();
        w.begin().unwrap();
        w.fail("transport: connection refused");
        w.reset();
        assert_eq!(*w.state(), TxState::Idle);
        assert!(w.begin().is_ok());
    }

    #[test]
    fn terminal_states_accept_a_fresh_begin() {
        let mut w = TxWorkflow::new();
        w.begin().unwrap();
        w.confirm("0x1".to_string());
        // A new logical request may start without an explicit reset.
        assert!(w.begin().is_ok());
    }
}
