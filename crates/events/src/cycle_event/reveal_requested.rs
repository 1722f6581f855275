// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{RequestId, RoundId};
use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Asks the ciphertext service to answer the given request. The round id travels with the
/// request so callbacks never have to be matched by recency.
#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct RevealRequested {
    pub round_id: RoundId,
    pub request_id: RequestId,
}

impl Display for RevealRequested {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "round_id: {}, request_id: {}", self.round_id, self.request_id)
    }
}
