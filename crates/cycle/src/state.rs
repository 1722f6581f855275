// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{CycleError, IdentityProfile, Round, Submission};
use alloy_primitives::Address;
use cc_events::{RequestId, RoundId, UniquenessToken};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Everything the engine knows. Owned by whoever drives the engine and passed into every
/// operation, so independent instances never share anything.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CycleState {
    pub(crate) rounds: BTreeMap<RoundId, Round>,
    pub(crate) current: Option<RoundId>,
    pub(crate) submissions: BTreeMap<(RoundId, Address), Submission>,
    /// Grows forever. Tokens are never released.
    pub(crate) consumed_tokens: BTreeSet<UniquenessToken>,
    pub(crate) profiles: BTreeMap<Address, IdentityProfile>,
    pub(crate) resolved: BTreeSet<(RoundId, Address)>,
    pub(crate) reveals: BTreeMap<RequestId, RoundId>,
    /// Identities that asked for a round's result, used to hand out the statistic late.
    pub(crate) result_grants: BTreeMap<RoundId, BTreeSet<Address>>,
}

impl CycleState {
    pub fn current_round(&self) -> Option<RoundId> {
        self.current
    }

    pub fn round(&self, id: RoundId) -> Option<&Round> {
        self.rounds.get(&id)
    }

    pub fn rounds(&self) -> impl Iterator<Item = &Round> {
        self.rounds.values()
    }

    pub(crate) fn round_mut(&mut self, id: RoundId) -> Result<&mut Round, CycleError> {
        self.rounds
            .get_mut(&id)
            .ok_or(CycleError::RoundNotFound(id))
    }

    pub(crate) fn current_mut(&mut self) -> Result<&mut Round, CycleError> {
        let id = self.current.ok_or(CycleError::NoActiveRound)?;
        self.round_mut(id)
    }

    /// Profile of `identity`, zeroed when it has never been seen.
    pub fn profile(&self, identity: &Address) -> IdentityProfile {
        self.profiles.get(identity).cloned().unwrap_or_default()
    }

    pub fn is_verified(&self, identity: &Address) -> bool {
        self.profiles
            .get(identity)
            .map(|p| p.verified)
            .unwrap_or(false)
    }

    pub fn submission(&self, round: RoundId, identity: &Address) -> Option<&Submission> {
        self.submissions.get(&(round, *identity))
    }

    /// Whether `identity` submitted in the current round.
    pub fn has_submitted(&self, identity: &Address) -> bool {
        self.current
            .map(|round| self.has_submitted_in(round, identity))
            .unwrap_or(false)
    }

    pub fn has_submitted_in(&self, round: RoundId, identity: &Address) -> bool {
        self.submission(round, identity)
            .map(|s| s.submitted)
            .unwrap_or(false)
    }

    pub fn is_token_consumed(&self, token: &UniquenessToken) -> bool {
        self.consumed_tokens.contains(token)
    }

    pub fn is_resolved(&self, round: RoundId, identity: &Address) -> bool {
        self.resolved.contains(&(round, *identity))
    }

    /// Reveal requests whose callback has not landed yet.
    pub fn pending_reveals(&self) -> Vec<(RequestId, RoundId)> {
        self.reveals
            .iter()
            .filter(|(_, round)| {
                self.rounds
                    .get(round)
                    .map(|r| r.statistic.is_none())
                    .unwrap_or(false)
            })
            .map(|(request, round)| (*request, *round))
            .collect()
    }
}
