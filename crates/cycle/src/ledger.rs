// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{AuthorityPolicy, CallContext, Cycle, CycleError, CycleState, Phase, MAX_METRIC};
use cc_events::{SubmissionRecorded, UniquenessToken};
use cc_fhe::{CiphertextHandleService, Handle, Principal};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub value: Handle<u64>,
    pub metric: Handle<u32>,
    pub submitted: bool,
    pub submitted_at: u64,
    pub token: UniquenessToken,
}

impl<S, A> Cycle<S, A>
where
    S: CiphertextHandleService,
    A: AuthorityPolicy,
{
    /// Record the caller's confidential contribution to the current round.
    pub fn submit(
        &self,
        state: &mut CycleState,
        ctx: &CallContext,
        value: u64,
        metric: u32,
        token: UniquenessToken,
    ) -> Result<SubmissionRecorded, CycleError> {
        let identity = ctx.caller;
        self.ensure_verified(state, &identity)?;

        let round_id = state.current_round().ok_or(CycleError::NoActiveRound)?;
        let round = state
            .round(round_id)
            .ok_or(CycleError::RoundNotFound(round_id))?;
        let phase = self.timing.phase(ctx.now, round.started_at, round.closed);
        if phase != Phase::Submission {
            return Err(CycleError::WindowClosed {
                round: round_id,
                phase,
            });
        }

        if state.submission(round_id, &identity).is_some() {
            return Err(CycleError::AlreadySubmitted {
                round: round_id,
                identity,
            });
        }
        let capacity = self.round_capacity();
        if round.participant_count() >= capacity {
            return Err(CycleError::RoundFull {
                round: round_id,
                capacity,
            });
        }

        if metric > MAX_METRIC {
            return Err(CycleError::InvalidMetric(metric));
        }
        if value > self.max_value {
            return Err(CycleError::ValueOutOfRange {
                value,
                max: self.max_value,
            });
        }
        if token.is_zero() {
            return Err(CycleError::ZeroToken);
        }
        if state.is_token_consumed(&token) {
            return Err(CycleError::DuplicateToken(token));
        }

        let value = self.service.encrypt(value)?;
        let metric = self.service.encrypt(metric)?;
        for principal in [Principal::System, Principal::Identity(identity)] {
            self.service.grant(&value, principal)?;
            self.service.grant(&metric, principal)?;
        }

        state.submissions.insert(
            (round_id, identity),
            Submission {
                value,
                metric,
                submitted: true,
                submitted_at: ctx.now,
                token,
            },
        );
        state.consumed_tokens.insert(token);
        state.current_mut()?.participants.push(identity);

        let profile = state.profiles.entry(identity).or_default();
        profile.submissions += 1;
        profile.last_submission_at = ctx.now;

        info!(round = %round_id, identity = %identity, "submission recorded");

        Ok(SubmissionRecorded {
            round_id,
            identity,
            token,
            at: ctx.now,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::*;
    use crate::{CycleError, ErrorKind};
    use cc_events::{RoundId, UniquenessToken};
    use cc_fhe::{CiphertextHandleService, Principal};

    #[test]
    fn submission_is_recorded_and_private() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;
        verify_all(&cycle, &mut state, &[alice(), bob()])?;
        cycle.start_round(&mut state, &authority_at(0))?;

        let recorded = cycle.submit(&mut state, &at(alice(), HOUR), 1000, 85, token(1))?;
        assert_eq!(recorded.round_id, RoundId(1));

        assert!(state.has_submitted(&alice()));
        assert!(!state.has_submitted(&bob()));
        assert!(state.is_token_consumed(&token(1)));

        let profile = state.profile(&alice());
        assert_eq!(profile.submissions, 1);
        assert_eq!(profile.last_submission_at, HOUR);

        let submission = state
            .submission(RoundId(1), &alice())
            .expect("submission stored");
        let svc = cycle.service();
        assert!(svc.is_granted(&submission.value, &Principal::System));
        assert!(svc.is_granted(&submission.value, &Principal::Identity(alice())));
        assert!(!svc.is_granted(&submission.value, &Principal::Identity(bob())));
        assert!(!svc.is_granted(&submission.metric, &Principal::Identity(bob())));
        Ok(())
    }

    #[test]
    fn one_submission_per_round() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;
        verify_all(&cycle, &mut state, &[alice()])?;
        cycle.start_round(&mut state, &authority_at(0))?;

        cycle.submit(&mut state, &at(alice(), HOUR), 1000, 85, token(1))?;
        let before = state.clone();
        let err = cycle
            .submit(&mut state, &at(alice(), 2 * HOUR), 10, 10, token(2))
            .expect_err("second submission");
        assert_eq!(err.kind(), ErrorKind::AlreadyDone);
        assert_eq!(state, before);
        assert!(!state.is_token_consumed(&token(2)));
        Ok(())
    }

    #[test]
    fn resubmitting_with_the_same_token_is_already_done() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;
        verify_all(&cycle, &mut state, &[alice()])?;
        cycle.start_round(&mut state, &authority_at(0))?;

        cycle.submit(&mut state, &at(alice(), HOUR), 1000, 85, token(1))?;
        let err = cycle
            .submit(&mut state, &at(alice(), 2 * HOUR), 1000, 85, token(1))
            .expect_err("second submission");
        assert_eq!(err.kind(), ErrorKind::AlreadyDone);
        Ok(())
    }

    #[test]
    fn values_are_bounded() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;
        verify_all(&cycle, &mut state, &[alice(), bob()])?;
        cycle.start_round(&mut state, &authority_at(0))?;
        let max = cycle.max_value();

        let err = cycle
            .submit(&mut state, &at(alice(), HOUR), max + 1, 1, token(1))
            .expect_err("above the limit");
        assert_eq!(
            err,
            CycleError::ValueOutOfRange {
                value: max + 1,
                max
            }
        );
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        assert!(!state.is_token_consumed(&token(1)));

        cycle.submit(&mut state, &at(alice(), HOUR), max, 100, token(1))?;
        Ok(())
    }

    #[test]
    fn rounds_stop_accepting_before_sums_wrap() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;
        let modulus = cycle.service().plaintext_modulus();
        // two of these fit below the modulus, three would wrap
        let max = (modulus - 1) / 2;
        let cycle = cycle.with_max_value(max)?;
        assert_eq!(cycle.round_capacity(), 2);

        let carol = identity(0x0C);
        verify_all(&cycle, &mut state, &[alice(), bob(), carol])?;
        cycle.start_round(&mut state, &authority_at(0))?;
        cycle.submit(&mut state, &at(alice(), HOUR), max, 100, token(1))?;
        cycle.submit(&mut state, &at(bob(), HOUR), max, 100, token(2))?;

        let err = cycle
            .submit(&mut state, &at(carol, HOUR), 1, 1, token(3))
            .expect_err("round is full");
        assert_eq!(
            err,
            CycleError::RoundFull {
                round: RoundId(1),
                capacity: 2
            }
        );
        assert_eq!(err.kind(), ErrorKind::PhaseViolation);

        cycle.perform_analysis(&mut state, &authority_at(8 * HOUR))?;
        let aggregate = cycle.aggregate(&state, RoundId(1))?;
        assert_eq!(
            cycle.service().decrypt_for(&Principal::System, &aggregate)?,
            2 * max
        );
        Ok(())
    }

    #[test]
    fn limits_must_fit_the_modulus() -> anyhow::Result<()> {
        let (cycle, _) = setup()?;
        let modulus = cycle.service().plaintext_modulus();
        assert!(setup()?.0.with_max_value(0).is_err());
        assert!(cycle.with_max_value(modulus).is_err());
        Ok(())
    }

    #[test]
    fn tokens_are_single_use_across_rounds() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;
        verify_all(&cycle, &mut state, &[alice(), bob()])?;
        cycle.start_round(&mut state, &authority_at(0))?;
        cycle.submit(&mut state, &at(alice(), HOUR), 1, 1, token(7))?;

        let err = cycle
            .submit(&mut state, &at(bob(), HOUR), 1, 1, token(7))
            .expect_err("token reuse");
        assert_eq!(err, CycleError::DuplicateToken(token(7)));

        cycle.start_round(&mut state, &authority_at(24 * HOUR))?;
        let err = cycle
            .submit(&mut state, &at(alice(), 25 * HOUR), 1, 1, token(7))
            .expect_err("token reuse in a later round");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);
        Ok(())
    }

    #[test]
    fn preconditions_in_order() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;

        let err = cycle
            .submit(&mut state, &at(alice(), 0), 1, 1, token(1))
            .expect_err("unverified");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);

        verify_all(&cycle, &mut state, &[alice()])?;
        let err = cycle
            .submit(&mut state, &at(alice(), 0), 1, 1, token(1))
            .expect_err("no round yet");
        assert_eq!(err, CycleError::NoActiveRound);

        cycle.start_round(&mut state, &authority_at(0))?;
        let err = cycle
            .submit(&mut state, &at(alice(), 7 * HOUR), 1, 101, UniquenessToken::from([0u8; 32]))
            .expect_err("window closed");
        assert_eq!(err.kind(), ErrorKind::PhaseViolation);

        let err = cycle
            .submit(&mut state, &at(alice(), HOUR), 1, 101, UniquenessToken::from([0u8; 32]))
            .expect_err("metric out of range");
        assert_eq!(err, CycleError::InvalidMetric(101));

        let err = cycle
            .submit(&mut state, &at(alice(), HOUR), 1, 100, UniquenessToken::from([0u8; 32]))
            .expect_err("zero token");
        assert_eq!(err, CycleError::ZeroToken);
        Ok(())
    }
}
