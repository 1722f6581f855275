// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::Address;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Who is calling and when. Every operation receives one; the engine never reads a clock.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallContext {
    pub caller: Address,
    pub now: u64,
}

impl CallContext {
    pub fn new(caller: Address, now: u64) -> Self {
        Self { caller, now }
    }
}

/// Decides whether an address may run authority operations.
pub trait AuthorityPolicy: Send + Sync + 'static {
    fn is_authority(&self, who: &Address) -> bool;
}

impl AuthorityPolicy for Address {
    fn is_authority(&self, who: &Address) -> bool {
        self == who
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AuthoritySet(BTreeSet<Address>);

impl AuthoritySet {
    pub fn new(members: impl IntoIterator<Item = Address>) -> Self {
        Self(members.into_iter().collect())
    }
}

impl AuthorityPolicy for AuthoritySet {
    fn is_authority(&self, who: &Address) -> bool {
        self.0.contains(who)
    }
}
