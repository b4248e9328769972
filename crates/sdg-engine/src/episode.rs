//! Bounded rejection-sampling episodes.
//!
//! Rejection loops are modelled as an explicit ATTEMPT -> {ACCEPT, REJECT}
//! machine with a hard per-episode ceiling; exceeding it is a budget error,
//! never a silent unbounded loop.

use sdg_core::errors::ErrorInfo;
use sdg_core::SdgError;

/// Outcome of one sampling attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// The proposal was accepted.
    Accept,
    /// The proposal was rejected; the loop may attempt again.
    Reject,
}

/// Hard attempt ceiling for one rejection-sampling episode.
#[derive(Debug, Clone)]
pub struct AttemptBudget {
    ceiling: u64,
    attempts: u64,
    accepted: u64,
    rejected: u64,
}

impl AttemptBudget {
    /// Creates a budget with the given per-episode ceiling.
    pub fn new(ceiling: u64) -> Self {
        Self {
            ceiling,
            attempts: 0,
            accepted: 0,
            rejected: 0,
        }
    }

    /// Registers the start of an attempt, failing once the ceiling is hit.
    pub fn begin_attempt(&mut self) -> Result<(), SdgError> {
        if self.attempts >= self.ceiling {
            return Err(SdgError::Budget(
                ErrorInfo::new("attempt-ceiling", "episode exceeded its attempt ceiling")
                    .with_context("ceiling", self.ceiling.to_string())
                    .with_hint("raise the ceiling or inspect the proposal distribution"),
            ));
        }
        self.attempts += 1;
        Ok(())
    }

    /// Records the outcome of the attempt started last.
    pub fn record(&mut self, outcome: AttemptOutcome) {
        match outcome {
            AttemptOutcome::Accept => self.accepted += 1,
            AttemptOutcome::Reject => self.rejected += 1,
        }
    }

    /// Attempts started so far.
    pub fn attempts(&self) -> u64 {
        self.attempts
    }

    /// Accepted attempts so far.
    pub fn accepted(&self) -> u64 {
        self.accepted
    }

    /// Rejected attempts so far.
    pub fn rejected(&self) -> u64 {
        self.rejected
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ceiling_is_enforced() {
        let mut budget = AttemptBudget::new(2);
        budget.begin_attempt().unwrap();
        budget.record(AttemptOutcome::Reject);
        budget.begin_attempt().unwrap();
        budget.record(AttemptOutcome::Accept);
        let err = budget.begin_attempt().unwrap_err();
        assert_eq!(err.info().code, "attempt-ceiling");
        assert_eq!(budget.attempts(), 2);
        assert_eq!(budget.accepted(), 1);
        assert_eq!(budget.rejected(), 1);
    }
}
