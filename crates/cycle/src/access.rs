// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{AuthorityPolicy, Cycle, CycleError, CycleState};
use alloy_primitives::Address;
use cc_events::{ResultAccessGranted, RoundId};
use cc_fhe::{CiphertextHandleService, Principal};
use tracing::info;

impl<S, A> Cycle<S, A>
where
    S: CiphertextHandleService,
    A: AuthorityPolicy,
{
    /// Give `identity` read access to the round's aggregate, and to the derived statistic once
    /// it exists. Asking before the reveal lands queues the identity for a late grant.
    pub fn request_result(
        &self,
        state: &mut CycleState,
        round: RoundId,
        identity: Address,
    ) -> Result<ResultAccessGranted, CycleError> {
        let r = state.round(round).ok_or(CycleError::RoundNotFound(round))?;
        if !r.analysis_completed {
            return Err(CycleError::AnalysisIncomplete(round));
        }
        self.ensure_verified(state, &identity)?;

        let aggregate = r.aggregate.ok_or(CycleError::AnalysisIncomplete(round))?;
        let statistic = r.statistic;

        self.service
            .grant(&aggregate, Principal::Identity(identity))?;
        if let Some(statistic) = statistic {
            self.service
                .grant(&statistic, Principal::Identity(identity))?;
        }
        state
            .result_grants
            .entry(round)
            .or_default()
            .insert(identity);

        info!(round = %round, identity = %identity, "result access granted");
        Ok(ResultAccessGranted {
            round_id: round,
            identity,
            statistic_included: statistic.is_some(),
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::tests::*;
    use crate::{CycleError, ErrorKind};
    use cc_events::RoundId;
    use cc_fhe::{CiphertextHandleService, Principal, RevealFulfiller};

    #[test]
    fn access_requires_completed_analysis() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;
        verify_all(&cycle, &mut state, &[alice()])?;
        assert_eq!(
            cycle.request_result(&mut state, RoundId(1), alice()),
            Err(CycleError::RoundNotFound(RoundId(1)))
        );

        cycle.start_round(&mut state, &authority_at(0))?;
        let err = cycle
            .request_result(&mut state, RoundId(1), alice())
            .expect_err("not analysed");
        assert_eq!(err.kind(), ErrorKind::PhaseViolation);
        Ok(())
    }

    #[test]
    fn unverified_identities_are_refused() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;
        let round = analysed_round_with(&cycle, &mut state, &[(alice(), 3, 3)])?;
        assert_eq!(
            cycle.request_result(&mut state, round, identity(0x42)),
            Err(CycleError::NotVerified(identity(0x42)))
        );
        Ok(())
    }

    #[test]
    fn statistic_is_granted_late() -> anyhow::Result<()> {
        let (cycle, mut state) = setup()?;
        let round = analysed_round_with(&cycle, &mut state, &[(alice(), 7, 20), (bob(), 9, 40)])?;
        let svc = cycle.service();
        let reader = Principal::Identity(bob());

        let granted = cycle.request_result(&mut state, round, bob())?;
        assert!(!granted.statistic_included);
        let aggregate = cycle.aggregate(&state, round)?;
        assert!(svc.is_granted(&aggregate, &reader));
        assert_eq!(svc.decrypt_for(&reader, &aggregate)?, 16);

        let request = state
            .round(round)
            .and_then(|r| r.reveal_request)
            .expect("reveal requested");
        let (total, proof) = svc.fulfil(request)?;
        let outcome = cycle.on_auxiliary_revealed(&mut state, request, total, &proof)?;
        assert_eq!(outcome.grants.len(), 1);
        assert_eq!(outcome.grants[0].identity, bob());

        let statistic = cycle.derived_statistic(&state, round)?;
        assert_eq!(svc.decrypt_for(&reader, &statistic)?, 30);
        assert!(!svc.is_granted(&statistic, &Principal::Identity(alice())));

        let granted = cycle.request_result(&mut state, round, alice())?;
        assert!(granted.statistic_included);
        assert!(svc.is_granted(&statistic, &Principal::Identity(alice())));
        Ok(())
    }
}
