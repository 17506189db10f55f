use tracing::{info, warn};

use crate::chain::{SubmitError, SubmitTransaction};
use crate::request::SignableTransaction;

/// One submit-and-confirm unit of a multi-step flow.
#[derive(Debug, Clone)]
pub struct SequenceStep {
    pub label: String,
    pub transaction: SignableTransaction,
}

/// Terminal states of a sequence run.
///
/// Steps before a failing one are already final on chain; nothing is rolled
/// back and nothing is retried automatically. Retry decisions stay with the
/// caller, at the granularity of the reported step, never the whole
/// sequence; retrying the sequence would double-submit the steps that
/// already took effect.
#[derive(Debug)]
pub enum SequenceOutcome {
    /// Every step confirmed final.
    Completed { steps: usize },
    /// Step `step` (zero-based) failed; later steps were never submitted.
    FailedAt { step: usize, cause: SubmitError },
    /// Step `step` was broadcast but its outcome was never observed.
    /// Distinct from failure: retrying it may double-submit a financial
    /// action.
    Unresolved { step: usize },
}

/// Runs ordered, dependent steps one at a time, waiting for each step's
/// final outcome before starting the next. Step `i + 1` assumes step `i`
/// succeeded; the run stops and reports at the first step that did not.
pub struct Sequencer<S> {
    submitter: S,
}

impl<S: SubmitTransaction> Sequencer<S> {
    pub fn new(submitter: S) -> Self {
        Self { submitter }
    }

    pub async fn run(&self, steps: &[SequenceStep]) -> SequenceOutcome {
        for (index, step) in steps.iter().enumerate() {
            info!(step = index, label = %step.label, "submitting sequence step");
            match self.submitter.submit(&step.transaction).await {
                Ok(outcome) => {
                    info!(step = index, tx = %outcome.transaction_hash, "step final");
                }
                Err(SubmitError::OutcomeUnknown) => {
                    warn!(step = index, label = %step.label, "step broadcast, outcome unknown");
                    return SequenceOutcome::Unresolved { step: index };
                }
                Err(cause) => {
                    warn!(step = index, label = %step.label, %cause, "step failed");
                    return SequenceOutcome::FailedAt { step: index, cause };
                }
            }
        }
        SequenceOutcome::Completed { steps: steps.len() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{ExecutionOutcome, MockSubmitTransaction};
    use mockall::Sequence;
    use serde_json::json;

    fn step(label: &str) -> SequenceStep {
        SequenceStep {
            label: label.to_owned(),
            transaction: SignableTransaction {
                signer_id: "dao.near".to_owned(),
                receiver_id: "dao.near".to_owned(),
                method_name: "add_request".to_owned(),
                args: json!({}),
                deposit: 0,
                gas: 100,
            },
        }
    }

    fn ok_outcome() -> Result<ExecutionOutcome, SubmitError> {
        Ok(ExecutionOutcome {
            transaction_hash: "9wpRhk".to_owned(),
        })
    }

    #[tokio::test]
    async fn completes_all_steps_in_order() {
        let mut submitter = MockSubmitTransaction::new();
        submitter.expect_submit().times(3).returning(|_| ok_outcome());

        let outcome = Sequencer::new(submitter)
            .run(&[step("a"), step("b"), step("c")])
            .await;
        assert!(matches!(outcome, SequenceOutcome::Completed { steps: 3 }));
    }

    #[tokio::test]
    async fn stops_at_first_failure_and_never_submits_later_steps() {
        let mut submitter = MockSubmitTransaction::new();
        let mut order = Sequence::new();
        submitter
            .expect_submit()
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| ok_outcome());
        // The mock panics on a third call, so a failing run proves the last
        // step was never submitted.
        submitter
            .expect_submit()
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| Err(SubmitError::Network("timeout".to_owned())));

        let outcome = Sequencer::new(submitter)
            .run(&[step("a"), step("b"), step("c")])
            .await;
        assert!(matches!(
            outcome,
            SequenceOutcome::FailedAt {
                step: 1,
                cause: SubmitError::Network(_),
            }
        ));
    }

    #[tokio::test]
    async fn unknown_outcome_is_a_distinct_terminal_state() {
        let mut submitter = MockSubmitTransaction::new();
        let mut order = Sequence::new();
        submitter
            .expect_submit()
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| ok_outcome());
        submitter
            .expect_submit()
            .times(1)
            .in_sequence(&mut order)
            .returning(|_| Err(SubmitError::OutcomeUnknown));

        let outcome = Sequencer::new(submitter)
            .run(&[step("a"), step("b"), step("c")])
            .await;
        assert!(matches!(outcome, SequenceOutcome::Unresolved { step: 1 }));
    }

    #[tokio::test]
    async fn empty_sequence_completes_immediately() {
        let submitter = MockSubmitTransaction::new();
        let outcome = Sequencer::new(submitter).run(&[]).await;
        assert!(matches!(outcome, SequenceOutcome::Completed { steps: 0 }));
    }
}
