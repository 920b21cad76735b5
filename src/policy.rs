//! Single-retry policy for idempotent GET requests.
//!
//! A call makes at most two transport attempts. The second attempt happens
//! only when the first one faults with a kind in the retryable set; status
//! codes never trigger a retry.

use std::collections::BTreeSet;

use crate::{FaultKind, RequestOutcome};

/// Transport attempt within one logical call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
    First,
    Second,
}

impl Attempt {
    /// 1-based attempt number.
    pub fn number(self) -> usize {
        match self {
            Self::First => 1,
            Self::Second => 2,
        }
    }

    pub fn next(self) -> Option<Self> {
        match self {
            Self::First => Some(Self::Second),
            Self::Second => None,
        }
    }
}

/// What to do after an attempt completes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RetryDecision {
    /// Issue the request again.
    Retry,
    /// The outcome is terminal.
    Finish,
}

/// Explicit set of fault kinds that earn one retry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RetryPolicy {
    retryable: BTreeSet<FaultKind>,
}

impl Default for RetryPolicy {
    /// Retries faults where no response byte was observed.
    fn default() -> Self {
        Self::none()
            .retry_on(FaultKind::ConnectionReset)
            .retry_on(FaultKind::EmptyResponse)
    }
}

impl RetryPolicy {
    /// Never retries.
    pub fn none() -> Self {
        Self {
            retryable: BTreeSet::new(),
        }
    }

    /// Retries every fault kind, including `Other`.
    pub fn all() -> Self {
        Self {
            retryable: FaultKind::ALL.into_iter().collect(),
        }
    }

    pub fn retry_on(mut self, kind: FaultKind) -> Self {
        self.retryable.insert(kind);
        self
    }

    pub fn never_on(mut self, kind: FaultKind) -> Self {
        self.retryable.remove(&kind);
        self
    }

    pub fn is_retryable(&self, kind: FaultKind) -> bool {
        self.retryable.contains(&kind)
    }

    /// Retryable kinds in declaration order.
    pub fn retryable_kinds(&self) -> impl Iterator<Item = FaultKind> + '_ {
        self.retryable.iter().copied()
    }

    pub fn decide(&self, attempt: Attempt, outcome: &RequestOutcome) -> RetryDecision {
        match outcome {
            RequestOutcome::Success { .. } => RetryDecision::Finish,
            RequestOutcome::TransportFault { kind, .. } => {
                if attempt.next().is_some() && self.is_retryable(*kind) {
                    RetryDecision::Retry
                } else {
                    RetryDecision::Finish
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Attempt, RetryDecision, RetryPolicy};
    use crate::{FaultKind, RequestOutcome};

    #[test]
    fn default_set_is_reset_and_empty_response() {
        let policy = RetryPolicy::default();
        let kinds: Vec<_> = policy.retryable_kinds().collect();
        assert_eq!(
            kinds,
            vec![FaultKind::ConnectionReset, FaultKind::EmptyResponse]
        );
        assert!(!policy.is_retryable(FaultKind::RandomDataThenClose));
        assert!(!policy.is_retryable(FaultKind::MalformedChunk));
        assert!(!policy.is_retryable(FaultKind::Other));
    }

    #[test]
    fn success_is_terminal_for_any_status() {
        let policy = RetryPolicy::all();
        for status in [200, 404, 500, 503] {
            let outcome = RequestOutcome::success(status, Vec::new());
            assert_eq!(
                policy.decide(Attempt::First, &outcome),
                RetryDecision::Finish
            );
        }
    }

    #[test]
    fn retryable_fault_on_first_attempt_retries() {
        let policy = RetryPolicy::default();
        let outcome = RequestOutcome::fault(FaultKind::ConnectionReset, "reset");
        assert_eq!(
            policy.decide(Attempt::First, &outcome),
            RetryDecision::Retry
        );
    }

    #[test]
    fn second_attempt_fault_is_always_terminal() {
        let policy = RetryPolicy::all();
        for kind in FaultKind::ALL {
            let outcome = RequestOutcome::fault(kind, "boom");
            assert_eq!(
                policy.decide(Attempt::Second, &outcome),
                RetryDecision::Finish
            );
        }
    }

    #[test]
    fn non_retryable_fault_is_terminal() {
        let policy = RetryPolicy::default();
        let outcome = RequestOutcome::fault(FaultKind::MalformedChunk, "bad chunk");
        assert_eq!(
            policy.decide(Attempt::First, &outcome),
            RetryDecision::Finish
        );
    }

    #[test]
    fn builders_adjust_membership() {
        let policy = RetryPolicy::default()
            .retry_on(FaultKind::RandomDataThenClose)
            .never_on(FaultKind::EmptyResponse);
        assert!(policy.is_retryable(FaultKind::RandomDataThenClose));
        assert!(!policy.is_retryable(FaultKind::EmptyResponse));
        assert!(RetryPolicy::none().retryable_kinds().next().is_none());
        assert_eq!(RetryPolicy::all().retryable_kinds().count(), 5);
    }

    #[test]
    fn attempt_sequence_has_two_steps() {
        assert_eq!(Attempt::First.number(), 1);
        assert_eq!(Attempt::First.next(), Some(Attempt::Second));
        assert_eq!(Attempt::Second.number(), 2);
        assert_eq!(Attempt::Second.next(), None);
    }
}
