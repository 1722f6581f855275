// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{AuthorityPolicy, CallContext, Cycle, CycleError, CycleState, Verified};
use alloy_primitives::Address;
use cc_events::{IdentityVerified, ReputationUpdated, RoundId, SubmissionResolved};
use cc_fhe::{CiphertextHandleService, Handle, Principal};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityProfile {
    pub submissions: u64,
    pub accurate: u64,
    pub verified: bool,
    pub reputation: Option<Handle<u32>>,
    pub last_submission_at: u64,
}

impl<S, A> Cycle<S, A>
where
    S: CiphertextHandleService,
    A: AuthorityPolicy,
{
    /// Mark `identity` verified and reset its reputation to the default score.
    pub fn verify(
        &self,
        state: &mut CycleState,
        ctx: &CallContext,
        identity: Address,
    ) -> Result<Verified, CycleError> {
        self.ensure_authority(ctx)?;

        let reputation = self.encrypt_reputation(identity, self.default_reputation)?;
        let profile = state.profiles.entry(identity).or_default();
        profile.verified = true;
        profile.reputation = Some(reputation);
        info!(identity = %identity, "identity verified");

        Ok(Verified {
            verified: IdentityVerified {
                identity,
                at: ctx.now,
            },
            reputation: ReputationUpdated {
                identity,
                at: ctx.now,
            },
        })
    }

    pub fn set_reputation(
        &self,
        state: &mut CycleState,
        ctx: &CallContext,
        identity: Address,
        score: u32,
    ) -> Result<ReputationUpdated, CycleError> {
        self.ensure_authority(ctx)?;
        if score > 100 {
            return Err(CycleError::InvalidScore(score));
        }
        self.ensure_verified(state, &identity)?;

        let reputation = self.encrypt_reputation(identity, score)?;
        state.profiles.entry(identity).or_default().reputation = Some(reputation);

        Ok(ReputationUpdated {
            identity,
            at: ctx.now,
        })
    }

    /// Record the outcome of a submission once its round has been analysed.
    pub fn resolve_submission(
        &self,
        state: &mut CycleState,
        ctx: &CallContext,
        round: RoundId,
        identity: Address,
        accurate: bool,
    ) -> Result<SubmissionResolved, CycleError> {
        self.ensure_authority(ctx)?;
        let r = state.round(round).ok_or(CycleError::RoundNotFound(round))?;
        if !r.analysis_completed {
            return Err(CycleError::AnalysisIncomplete(round));
        }
        if state.submission(round, &identity).is_none() {
            return Err(CycleError::SubmissionNotFound { round, identity });
        }
        if state.is_resolved(round, &identity) {
            return Err(CycleError::AlreadyResolved { round, identity });
        }

        state.resolved.insert((round, identity));
        if accurate {
            state.profiles.entry(identity).or_default().accurate += 1;
        }

        Ok(SubmissionResolved {
            round_id: round,
            identity,
            accurate,
        })
    }

    fn encrypt_reputation(&self, identity: Address, score: u32) -> Result<Handle<u32>, CycleError> {
        let handle = self.service.encrypt(score)?;
        self.service.grant(&handle, Principal::System)?;
        self.service.grant(&handle, Principal::Identity(identity))?;
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::*;
    use crate::{CycleError, ErrorKind};
    use cc_fhe::{CiphertextHandleService, Principal};

    #[test]
    fn verify_sets_default_reputation() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;
        assert_eq!(state.profile(&alice()), Default::default());

        cycle.verify(&mut state, &authority_at(0), alice())?;
        let profile = state.profile(&alice());
        assert!(profile.verified);
        let reputation = profile.reputation.expect("reputation set");
        assert!(cycle.service().is_granted(&reputation, &Principal::Identity(alice())));
        assert_eq!(
            cycle
                .service()
                .decrypt_for(&Principal::Identity(alice()), &reputation)?,
            50
        );

        cycle.set_reputation(&mut state, &authority_at(1), alice(), 90)?;
        cycle.verify(&mut state, &authority_at(2), alice())?;
        let reputation = state.profile(&alice()).reputation.expect("reputation set");
        assert_eq!(
            cycle.service().decrypt_for(&Principal::System, &reputation)?,
            50
        );
        Ok(())
    }

    #[test]
    fn set_reputation_rules() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;

        let err = cycle
            .set_reputation(&mut state, &authority_at(0), alice(), 10)
            .expect_err("alice is unverified");
        assert_eq!(err, CycleError::NotVerified(alice()));

        cycle.verify(&mut state, &authority_at(0), alice())?;
        let err = cycle
            .set_reputation(&mut state, &authority_at(0), alice(), 101)
            .expect_err("score out of range");
        assert_eq!(err.kind(), ErrorKind::InvalidInput);

        let err = cycle
            .set_reputation(&mut state, &at(bob(), 0), alice(), 10)
            .expect_err("bob is not an authority");
        assert_eq!(err.kind(), ErrorKind::Unauthorized);
        Ok(())
    }

    #[test]
    fn resolution_counts_accurate_submissions_once() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;
        let round = analysed_round_with(&cycle, &mut state, &[(alice(), 1000, 85)])?;

        let err = cycle
            .resolve_submission(&mut state, &authority_at(9 * HOUR), round, bob(), true)
            .expect_err("bob never submitted");
        assert_eq!(err.kind(), ErrorKind::NotFound);

        cycle.resolve_submission(&mut state, &authority_at(9 * HOUR), round, alice(), true)?;
        assert_eq!(state.profile(&alice()).accurate, 1);

        let err = cycle
            .resolve_submission(&mut state, &authority_at(9 * HOUR), round, alice(), true)
            .expect_err("already resolved");
        assert_eq!(err.kind(), ErrorKind::AlreadyDone);
        assert_eq!(state.profile(&alice()).accurate, 1);
        Ok(())
    }
}
