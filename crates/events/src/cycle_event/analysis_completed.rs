// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{ResultFingerprint, RoundId};
use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct AnalysisCompleted {
    pub round_id: RoundId,
    pub participant_count: u64,
    pub fingerprint: ResultFingerprint,
    pub ended_at: u64,
}

impl Display for AnalysisCompleted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "round_id: {}, participants: {}, fingerprint: {}",
            self.round_id, self.participant_count, self.fingerprint
        )
    }
}
