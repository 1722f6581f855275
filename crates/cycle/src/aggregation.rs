// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::round::open_next_round;
use crate::{AnalysisOutcome, AuthorityPolicy, CallContext, Cycle, CycleError, CycleState};
use crate::{Phase, StatisticOutcome};
use cc_events::{
    AnalysisCompleted, RequestId, ResultAccessGranted, ResultFingerprint, RevealProof,
    RevealRequested, RoundId, StatisticDerived,
};
use cc_fhe::{CiphertextHandleService, Handle, Principal};
use tracing::info;

impl<S, A> Cycle<S, A>
where
    S: CiphertextHandleService,
    A: AuthorityPolicy,
{
    /// Analyse the current round.
    pub fn perform_analysis(
        &self,
        state: &mut CycleState,
        ctx: &CallContext,
    ) -> Result<AnalysisOutcome, CycleError> {
        self.ensure_authority(ctx)?;
        let round = state.current_round().ok_or(CycleError::NoActiveRound)?;
        self.analyse_round(state, ctx, round)
    }

    /// Fold the round's contributions into opaque totals, ask for the metric total to be
    /// revealed, then close the round and open the next one at `ctx.now`.
    pub fn analyse_round(
        &self,
        state: &mut CycleState,
        ctx: &CallContext,
        round_id: RoundId,
    ) -> Result<AnalysisOutcome, CycleError> {
        self.ensure_authority(ctx)?;

        let round = state
            .round(round_id)
            .ok_or(CycleError::RoundNotFound(round_id))?;
        if round.analysis_completed {
            return Err(CycleError::AlreadyAnalyzed(round_id));
        }
        let phase = self.timing.phase(ctx.now, round.started_at, round.closed);
        if phase != Phase::Analysis {
            return Err(CycleError::NotInAnalysis {
                round: round_id,
                phase,
            });
        }
        if round.participants.is_empty() {
            return Err(CycleError::NoSubmissions(round_id));
        }

        let mut values: Handle<u64> = self.service.zero()?;
        let mut metrics: Handle<u32> = self.service.zero()?;
        for identity in &round.participants {
            let submission = state.submission(round_id, identity).ok_or_else(|| {
                CycleError::Internal(format!("{} listed without a submission", identity))
            })?;
            values = self.service.add(&values, &submission.value)?;
            metrics = self.service.add(&metrics, &submission.metric)?;
        }
        self.service.grant(&values, Principal::System)?;
        self.service.grant(&metrics, Principal::System)?;
        let request_id = self.service.request_reveal(&metrics)?;

        let participant_count = round.participant_count();
        let fingerprint = ResultFingerprint::derive(round_id, ctx.now, participant_count);

        let round = state.round_mut(round_id)?;
        round.aggregate = Some(values);
        round.metric_total = Some(metrics);
        round.analysis_completed = true;
        round.ended_at = Some(ctx.now);
        round.fingerprint = Some(fingerprint);
        round.reveal_request = Some(request_id);
        state.reveals.insert(request_id, round_id);

        info!(
            round = %round_id,
            participants = participant_count,
            request = %request_id,
            "analysis completed"
        );

        let next_round = open_next_round(state, ctx.now);

        Ok(AnalysisOutcome {
            completed: AnalysisCompleted {
                round_id,
                participant_count,
                fingerprint,
                ended_at: ctx.now,
            },
            reveal: RevealRequested {
                round_id,
                request_id,
            },
            next_round,
        })
    }

    /// Callback of the reveal protocol. Derives the average metric of the round the request
    /// was issued for and stores it re-encrypted.
    pub fn on_auxiliary_revealed(
        &self,
        state: &mut CycleState,
        request_id: RequestId,
        total: u64,
        proof: &RevealProof,
    ) -> Result<StatisticOutcome, CycleError> {
        let round_id = state
            .reveals
            .get(&request_id)
            .copied()
            .ok_or(CycleError::UnknownRevealRequest(request_id))?;
        if !self.service.verify_reveal(request_id, total, proof) {
            return Err(CycleError::InvalidRevealProof(request_id));
        }

        let round = state
            .round(round_id)
            .ok_or(CycleError::RoundNotFound(round_id))?;
        if round.statistic.is_some() {
            return Err(CycleError::AlreadyRevealed(request_id));
        }
        let count = round.participant_count().max(1);
        let average = u32::try_from(total / count).map_err(|_| {
            CycleError::Internal(format!("average {} does not fit u32", total / count))
        })?;

        let statistic = self.service.encrypt(average)?;
        self.service.grant(&statistic, Principal::System)?;

        let mut grants = vec![];
        if let Some(waiting) = state.result_grants.get(&round_id) {
            for identity in waiting {
                self.service
                    .grant(&statistic, Principal::Identity(*identity))?;
                grants.push(ResultAccessGranted {
                    round_id,
                    identity: *identity,
                    statistic_included: true,
                });
            }
        }

        state.round_mut(round_id)?.statistic = Some(statistic);
        info!(round = %round_id, request = %request_id, "statistic derived");

        Ok(StatisticOutcome {
            derived: StatisticDerived {
                round_id,
                request_id,
            },
            grants,
        })
    }
}
