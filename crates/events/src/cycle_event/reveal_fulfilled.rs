// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{RequestId, RevealProof, RoundId};
use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Callback from the ciphertext service carrying a revealed plaintext.
#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct RevealFulfilled {
    pub round_id: RoundId,
    pub request_id: RequestId,
    pub plaintext: u64,
    pub proof: RevealProof,
}

impl Display for RevealFulfilled {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "round_id: {}, request_id: {}, proof: {}",
            self.round_id, self.request_id, self.proof
        )
    }
}
