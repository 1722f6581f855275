// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use actix::Message;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub struct OperationFailed {
    pub err_type: FailureType,
    pub message: String,
}

impl Display for OperationFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.err_type, self.message)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureType {
    Registry,
    Round,
    Submission,
    Analysis,
    Reveal,
    Access,
    Service,
    Data,
}

impl OperationFailed {
    pub fn new(err_type: FailureType, message: &str) -> Self {
        Self {
            err_type,
            message: message.to_string(),
        }
    }

    pub fn from_error(err_type: FailureType, error: anyhow::Error) -> Self {
        Self {
            err_type,
            message: error.to_string(),
        }
    }
}
