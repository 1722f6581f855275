// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{AuthorityPolicy, AuthoritySet, CallContext, CycleError, CycleState, CycleTiming};
use crate::{Phase, RoundSummary};
use anyhow::Result;
use cc_config::CycleConfig;
use cc_events::{
    AnalysisCompleted, CycleEvent, IdentityVerified, ReputationUpdated, ResultAccessGranted,
    RevealRequested, RoundId, RoundStarted, StatisticDerived, SubmissionRecorded,
    SubmissionResolved,
};
use cc_fhe::{CiphertextHandleService, Handle};
use tracing::warn;

/// Largest accepted submission value unless configured otherwise.
pub const DEFAULT_MAX_SUBMISSION_VALUE: u64 = 10_000;

/// Largest accepted auxiliary metric.
pub const MAX_METRIC: u32 = 100;

/// The confidential cycle engine. Holds only collaborators and fixed parameters; all mutable
/// data lives in the [`CycleState`] handed to each operation.
pub struct Cycle<S, A> {
    pub(crate) service: S,
    pub(crate) authority: A,
    pub(crate) timing: CycleTiming,
    pub(crate) default_reputation: u32,
    pub(crate) max_value: u64,
}

impl<S, A> Cycle<S, A>
where
    S: CiphertextHandleService,
    A: AuthorityPolicy,
{
    pub fn new(
        service: S,
        authority: A,
        timing: CycleTiming,
        default_reputation: u32,
    ) -> Result<Self> {
        if default_reputation > 100 {
            anyhow::bail!("default reputation {} is outside 0..=100", default_reputation);
        }
        Self {
            service,
            authority,
            timing,
            default_reputation,
            max_value: DEFAULT_MAX_SUBMISSION_VALUE,
        }
        .with_max_value(DEFAULT_MAX_SUBMISSION_VALUE)
    }

    /// Set the largest accepted submission value. Together with the service's plaintext
    /// modulus it fixes how many submissions a round can hold before its sums would wrap.
    pub fn with_max_value(mut self, max_value: u64) -> Result<Self> {
        let modulus = self.service.plaintext_modulus();
        if max_value == 0 || max_value >= modulus {
            anyhow::bail!(
                "max submission value {} must be within 1..{}",
                max_value,
                modulus
            );
        }
        if u64::from(MAX_METRIC) >= modulus {
            anyhow::bail!("plaintext modulus {} cannot hold a single metric", modulus);
        }
        self.max_value = max_value;
        Ok(self)
    }

    pub fn max_value(&self) -> u64 {
        self.max_value
    }

    /// Submissions a round accepts while the worst case totals of values and metrics stay
    /// below the plaintext modulus.
    pub fn round_capacity(&self) -> u64 {
        let headroom = self.service.plaintext_modulus().saturating_sub(1);
        (headroom / self.max_value).min(headroom / u64::from(MAX_METRIC))
    }

    pub fn service(&self) -> &S {
        &self.service
    }

    pub fn timing(&self) -> CycleTiming {
        self.timing
    }

    pub(crate) fn ensure_authority(&self, ctx: &CallContext) -> Result<(), CycleError> {
        if !self.authority.is_authority(&ctx.caller) {
            warn!(caller = %ctx.caller, "authority check failed");
            return Err(CycleError::NotAuthority(ctx.caller));
        }
        Ok(())
    }

    pub(crate) fn ensure_verified(
        &self,
        state: &CycleState,
        identity: &alloy_primitives::Address,
    ) -> Result<(), CycleError> {
        if !state.is_verified(identity) {
            return Err(CycleError::NotVerified(*identity));
        }
        Ok(())
    }

    /// Phase of the current round, `None` before the first round.
    pub fn current_phase(&self, state: &CycleState, now: u64) -> Option<Phase> {
        let round = state.round(state.current_round()?)?;
        Some(self.timing.phase(now, round.started_at, round.closed))
    }

    /// Metadata of a round without any handle.
    pub fn cycle_history(
        &self,
        state: &CycleState,
        round: RoundId,
        now: u64,
    ) -> Result<RoundSummary, CycleError> {
        let round = state.round(round).ok_or(CycleError::RoundNotFound(round))?;
        Ok(round.summary(self.timing.phase(now, round.started_at, round.closed)))
    }

    /// Aggregate value handle of an analysed round.
    pub fn aggregate(&self, state: &CycleState, round: RoundId) -> Result<Handle<u64>, CycleError> {
        let r = state.round(round).ok_or(CycleError::RoundNotFound(round))?;
        r.aggregate.ok_or(CycleError::AnalysisIncomplete(round))
    }

    /// Derived statistic handle. Reports `StatisticPending` while the reveal is outstanding.
    pub fn derived_statistic(
        &self,
        state: &CycleState,
        round: RoundId,
    ) -> Result<Handle<u32>, CycleError> {
        let r = state.round(round).ok_or(CycleError::RoundNotFound(round))?;
        if !r.analysis_completed {
            return Err(CycleError::AnalysisIncomplete(round));
        }
        r.statistic.ok_or(CycleError::StatisticPending(round))
    }
}

impl<S: CiphertextHandleService> Cycle<S, AuthoritySet> {
    pub fn from_config(service: S, config: &CycleConfig) -> Result<Self> {
        config.validate()?;
        Self::new(
            service,
            AuthoritySet::new(config.authorities.iter().copied()),
            CycleTiming::new(config.submission_window_secs, config.cycle_duration_secs)?,
            config.default_reputation,
        )?
        .with_max_value(config.max_submission_value)
    }
}

/// Events an operation's outcome publishes.
pub trait Emits {
    fn events(&self) -> Vec<CycleEvent>;
}

macro_rules! impl_emits {
    ($($ty:ident),*) => {
        $(
            impl Emits for $ty {
                fn events(&self) -> Vec<CycleEvent> {
                    vec![CycleEvent::from(self.clone())]
                }
            }
        )*
    };
}

impl_emits!(
    RoundStarted,
    ReputationUpdated,
    SubmissionRecorded,
    ResultAccessGranted,
    SubmissionResolved
);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Verified {
    pub verified: IdentityVerified,
    pub reputation: ReputationUpdated,
}

impl Emits for Verified {
    fn events(&self) -> Vec<CycleEvent> {
        vec![self.verified.clone().into(), self.reputation.clone().into()]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AnalysisOutcome {
    pub completed: AnalysisCompleted,
    pub reveal: RevealRequested,
    pub next_round: RoundStarted,
}

impl Emits for AnalysisOutcome {
    fn events(&self) -> Vec<CycleEvent> {
        vec![
            self.completed.clone().into(),
            self.next_round.clone().into(),
            self.reveal.clone().into(),
        ]
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatisticOutcome {
    pub derived: StatisticDerived,
    /// Late grants for identities that asked for the result while the reveal was pending
    pub grants: Vec<ResultAccessGranted>,
}

impl Emits for StatisticOutcome {
    fn events(&self) -> Vec<CycleEvent> {
        let mut events = vec![CycleEvent::from(self.derived.clone())];
        events.extend(self.grants.iter().cloned().map(CycleEvent::from));
        events
    }
}
