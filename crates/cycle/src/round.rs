// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{AuthorityPolicy, CallContext, Cycle, CycleError, CycleState, Phase};
use alloy_primitives::Address;
use cc_events::{RequestId, ResultFingerprint, RoundId, RoundStarted};
use cc_fhe::{CiphertextHandleService, Handle};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub started_at: u64,
    /// In arrival order, no duplicates
    pub participants: Vec<Address>,
    pub aggregate: Option<Handle<u64>>,
    pub metric_total: Option<Handle<u32>>,
    pub statistic: Option<Handle<u32>>,
    pub analysis_completed: bool,
    pub closed: bool,
    pub ended_at: Option<u64>,
    pub fingerprint: Option<ResultFingerprint>,
    pub reveal_request: Option<RequestId>,
}

impl Round {
    pub fn new(id: RoundId, started_at: u64) -> Self {
        Self {
            id,
            started_at,
            participants: vec![],
            aggregate: None,
            metric_total: None,
            statistic: None,
            analysis_completed: false,
            closed: false,
            ended_at: None,
            fingerprint: None,
            reveal_request: None,
        }
    }

    pub fn participant_count(&self) -> u64 {
        self.participants.len() as u64
    }

    pub fn summary(&self, phase: Phase) -> RoundSummary {
        RoundSummary {
            round_id: self.id,
            phase,
            started_at: self.started_at,
            ended_at: self.ended_at,
            participant_count: self.participant_count(),
            analysis_completed: self.analysis_completed,
            closed: self.closed,
            fingerprint: self.fingerprint,
            statistic_available: self.statistic.is_some(),
        }
    }
}

/// Public view of a round.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round_id: RoundId,
    pub phase: Phase,
    pub started_at: u64,
    pub ended_at: Option<u64>,
    pub participant_count: u64,
    pub analysis_completed: bool,
    pub closed: bool,
    pub fingerprint: Option<ResultFingerprint>,
    pub statistic_available: bool,
}

impl<S, A> Cycle<S, A>
where
    S: CiphertextHandleService,
    A: AuthorityPolicy,
{
    /// Close the current round and open the next one. Allowed before any round exists or once
    /// the full cycle of the current round has elapsed.
    pub fn start_round(
        &self,
        state: &mut CycleState,
        ctx: &CallContext,
    ) -> Result<RoundStarted, CycleError> {
        self.ensure_authority(ctx)?;

        if let Some(current) = state.current {
            let round = state
                .round(current)
                .ok_or(CycleError::RoundNotFound(current))?;
            let until = self.timing.cycle_end(round.started_at);
            if ctx.now < until {
                return Err(CycleError::RoundStillActive {
                    round: current,
                    until,
                });
            }
        }

        Ok(open_next_round(state, ctx.now))
    }
}

/// Close whatever round is current and open its successor at `now`.
pub(crate) fn open_next_round(state: &mut CycleState, now: u64) -> RoundStarted {
    let previous = state.current;
    if let Some(round) = previous.and_then(|id| state.rounds.get_mut(&id)) {
        round.closed = true;
    }

    let id = previous.map(|id| id.next()).unwrap_or(RoundId::FIRST);
    state.rounds.insert(id, Round::new(id, now));
    state.current = Some(id);
    info!(round = %id, started_at = now, "round opened");

    RoundStarted {
        round_id: id,
        started_at: now,
        previous,
    }
}
