// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{
    AuthorityPolicy, CallContext, Cycle, CycleError, CycleState, Emits, IdentityProfile, Phase,
    RoundSummary, Verified,
};
use crate::{AnalysisOutcome, StatisticOutcome};
use actix::prelude::*;
use alloy_primitives::Address;
use anyhow::Result;
use cc_data::{AutoPersist, Persistable, Repository};
use cc_events::{
    CycleEvent, ErrorEvent, EventBus, FailureType, ReputationUpdated, RequestId,
    ResultAccessGranted, RevealFulfilled, RevealProof, RoundId, RoundStarted,
    SubmissionRecorded, SubmissionResolved, Subscribe, UniquenessToken,
};
use cc_fhe::{CiphertextHandleService, Handle};
use tracing::{error, info, warn};

/// Serialises every operation on one cycle instance. State is checkpointed to the repository
/// after each accepted operation and left untouched by rejected ones.
pub struct CycleActor<S, A>
where
    S: CiphertextHandleService + Unpin,
    A: AuthorityPolicy + Unpin,
{
    cycle: Cycle<S, A>,
    state: Persistable<CycleState>,
    bus: Addr<EventBus<CycleEvent>>,
}

impl<S, A> Actor for CycleActor<S, A>
where
    S: CiphertextHandleService + Unpin,
    A: AuthorityPolicy + Unpin,
{
    type Context = Context<Self>;
}

impl<S, A> CycleActor<S, A>
where
    S: CiphertextHandleService + Unpin,
    A: AuthorityPolicy + Unpin,
{
    pub fn new(
        bus: &Addr<EventBus<CycleEvent>>,
        cycle: Cycle<S, A>,
        state: Persistable<CycleState>,
    ) -> Self {
        Self {
            cycle,
            state,
            bus: bus.clone(),
        }
    }

    /// Load any stored state from `repo`, start the actor and subscribe it to reveal callbacks.
    pub async fn attach(
        bus: &Addr<EventBus<CycleEvent>>,
        cycle: Cycle<S, A>,
        repo: &Repository<CycleState>,
    ) -> Result<Addr<Self>> {
        let state = repo.load_or_default(CycleState::default()).await?;
        let round = state.try_with(|s| Ok(s.current_round()))?;
        info!(round = ?round, "cycle loaded");

        let addr = Self::new(bus, cycle, state).start();
        bus.do_send(Subscribe::new("RevealFulfilled", addr.clone().recipient()));
        bus.do_send(Subscribe::new("Shutdown", addr.clone().recipient()));
        Ok(addr)
    }

    fn apply<F, O>(&mut self, op: &'static str, f: F) -> Result<O, CycleError>
    where
        F: FnOnce(&Cycle<S, A>, &mut CycleState) -> Result<O, CycleError>,
        O: Emits,
    {
        let cycle = &self.cycle;
        match self.state.try_mutate_with(|state| f(cycle, state)) {
            Ok(outcome) => {
                for event in outcome.events() {
                    self.bus.do_send(event);
                }
                Ok(outcome)
            }
            Err(err) => {
                warn!(op, kind = ?err.kind(), "rejected: {}", err);
                Err(err)
            }
        }
    }

    fn read<F, R>(&self, f: F) -> Result<R, CycleError>
    where
        F: FnOnce(&Cycle<S, A>, &CycleState) -> Result<R, CycleError>,
    {
        self.state.try_with(|state| Ok(f(&self.cycle, state)))?
    }
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<RoundStarted, CycleError>")]
pub struct StartRound {
    pub ctx: CallContext,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Verified, CycleError>")]
pub struct VerifyIdentity {
    pub ctx: CallContext,
    pub identity: Address,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<ReputationUpdated, CycleError>")]
pub struct SetReputation {
    pub ctx: CallContext,
    pub identity: Address,
    pub score: u32,
}

/// A submission by `ctx.caller`.
#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<SubmissionRecorded, CycleError>")]
pub struct Submit {
    pub ctx: CallContext,
    pub value: u64,
    pub metric: u32,
    pub token: UniquenessToken,
}

/// Analyse `round`, or the current round when `None`.
#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<AnalysisOutcome, CycleError>")]
pub struct PerformAnalysis {
    pub ctx: CallContext,
    pub round: Option<RoundId>,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<ResultAccessGranted, CycleError>")]
pub struct RequestResult {
    pub round: RoundId,
    pub identity: Address,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<SubmissionResolved, CycleError>")]
pub struct ResolveSubmission {
    pub ctx: CallContext,
    pub round: RoundId,
    pub identity: Address,
    pub accurate: bool,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<StatisticOutcome, CycleError>")]
pub struct DeliverReveal {
    pub request_id: RequestId,
    pub plaintext: u64,
    pub proof: RevealProof,
}

impl From<RevealFulfilled> for DeliverReveal {
    fn from(value: RevealFulfilled) -> Self {
        Self {
            request_id: value.request_id,
            plaintext: value.plaintext,
            proof: value.proof,
        }
    }
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<IdentityProfile, CycleError>")]
pub struct GetProfile(pub Address);

/// Whether `identity` submitted in `round`, or in the current round when `None`.
#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<bool, CycleError>")]
pub struct HasSubmitted {
    pub identity: Address,
    pub round: Option<RoundId>,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<bool, CycleError>")]
pub struct IsTokenConsumed(pub UniquenessToken);

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<RoundSummary, CycleError>")]
pub struct CycleHistory {
    pub round: RoundId,
    pub now: u64,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Option<Phase>, CycleError>")]
pub struct CurrentPhase {
    pub now: u64,
}

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Option<RoundId>, CycleError>")]
pub struct CurrentRound;

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Handle<u64>, CycleError>")]
pub struct GetAggregate(pub RoundId);

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Handle<u32>, CycleError>")]
pub struct GetStatistic(pub RoundId);

#[derive(Message, Clone, Debug)]
#[rtype(result = "Result<Vec<(RequestId, RoundId)>, CycleError>")]
pub struct GetPendingReveals;

impl<S, A> Handler<CycleEvent> for CycleActor<S, A>
where
    S: CiphertextHandleService + Unpin,
    A: AuthorityPolicy + Unpin,
{
    type Result = ();

    fn handle(&mut self, msg: CycleEvent, ctx: &mut Self::Context) -> Self::Result {
        match msg {
            CycleEvent::RevealFulfilled { data, .. } => {
                let msg = DeliverReveal::from(data);
                let request_id = msg.request_id;
                if let Err(err) = self.apply("deliver_reveal", |cycle, state| {
                    cycle.on_auxiliary_revealed(state, msg.request_id, msg.plaintext, &msg.proof)
                }) {
                    error!(request = %request_id, "reveal callback rejected: {}", err);
                    self.bus.do_send(CycleEvent::from_error(
                        FailureType::Reveal,
                        anyhow::Error::from(err),
                    ));
                }
            }
            CycleEvent::Shutdown { .. } => {
                info!("Killing CycleActor");
                ctx.stop();
            }
            _ => (),
        }
    }
}

macro_rules! impl_write_handler {
    ($msg:ty, $op:literal, |$m:ident, $cycle:ident, $state:ident| $body:expr) => {
        impl<S, A> Handler<$msg> for CycleActor<S, A>
        where
            S: CiphertextHandleService + Unpin,
            A: AuthorityPolicy + Unpin,
        {
            type Result = <$msg as Message>::Result;

            fn handle(&mut self, $m: $msg, _: &mut Self::Context) -> Self::Result {
                self.apply($op, |$cycle, $state| $body)
            }
        }
    };
}

macro_rules! impl_read_handler {
    ($msg:ty, |$m:ident, $cycle:ident, $state:ident| $body:expr) => {
        impl<S, A> Handler<$msg> for CycleActor<S, A>
        where
            S: CiphertextHandleService + Unpin,
            A: AuthorityPolicy + Unpin,
        {
            type Result = <$msg as Message>::Result;

            fn handle(&mut self, $m: $msg, _: &mut Self::Context) -> Self::Result {
                self.read(|$cycle, $state| $body)
            }
        }
    };
}

impl_write_handler!(StartRound, "start_round", |msg, cycle, state| {
    cycle.start_round(state, &msg.ctx)
});
impl_write_handler!(VerifyIdentity, "verify", |msg, cycle, state| {
    cycle.verify(state, &msg.ctx, msg.identity)
});
impl_write_handler!(SetReputation, "set_reputation", |msg, cycle, state| {
    cycle.set_reputation(state, &msg.ctx, msg.identity, msg.score)
});
impl_write_handler!(Submit, "submit", |msg, cycle, state| {
    cycle.submit(state, &msg.ctx, msg.value, msg.metric, msg.token)
});
impl_write_handler!(PerformAnalysis, "perform_analysis", |msg, cycle, state| {
    match msg.round {
        Some(round) => cycle.analyse_round(state, &msg.ctx, round),
        None => cycle.perform_analysis(state, &msg.ctx),
    }
});
impl_write_handler!(RequestResult, "request_result", |msg, cycle, state| {
    cycle.request_result(state, msg.round, msg.identity)
});
impl_write_handler!(ResolveSubmission, "resolve_submission", |msg, cycle, state| {
    cycle.resolve_submission(state, &msg.ctx, msg.round, msg.identity, msg.accurate)
});
impl_write_handler!(DeliverReveal, "deliver_reveal", |msg, cycle, state| {
    cycle.on_auxiliary_revealed(state, msg.request_id, msg.plaintext, &msg.proof)
});

impl_read_handler!(GetProfile, |msg, _cycle, state| Ok(state.profile(&msg.0)));
impl_read_handler!(HasSubmitted, |msg, _cycle, state| {
    Ok(match msg.round {
        Some(round) => state.has_submitted_in(round, &msg.identity),
        None => state.has_submitted(&msg.identity),
    })
});
impl_read_handler!(IsTokenConsumed, |msg, _cycle, state| {
    Ok(state.is_token_consumed(&msg.0))
});
impl_read_handler!(CycleHistory, |msg, cycle, state| {
    cycle.cycle_history(state, msg.round, msg.now)
});
impl_read_handler!(CurrentPhase, |msg, cycle, state| {
    Ok(cycle.current_phase(state, msg.now))
});
impl_read_handler!(CurrentRound, |_msg, _cycle, state| Ok(state.current_round()));
impl_read_handler!(GetAggregate, |msg, cycle, state| cycle.aggregate(state, msg.0));
impl_read_handler!(GetStatistic, |msg, cycle, state| {
    cycle.derived_statistic(state, msg.0)
});
impl_read_handler!(GetPendingReveals, |_msg, _cycle, state| {
    Ok(state.pending_reveals())
});
