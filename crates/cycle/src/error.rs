// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::Phase;
use alloy_primitives::Address;
use cc_events::{RequestId, RoundId, UniquenessToken};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification callers can branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    Unauthorized,
    PhaseViolation,
    AlreadyDone,
    InvalidInput,
    NotFound,
    PendingExternal,
    Internal,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CycleError {
    #[error("{0} is not a cycle authority")]
    NotAuthority(Address),

    #[error("{0} is not a verified identity")]
    NotVerified(Address),

    #[error("No round has been started")]
    NoActiveRound,

    #[error("Round {round} is still active until {until}")]
    RoundStillActive { round: RoundId, until: u64 },

    #[error("Round {round} is not accepting submissions, phase is {phase}")]
    WindowClosed { round: RoundId, phase: Phase },

    #[error("Round {round} is not in analysis, phase is {phase}")]
    NotInAnalysis { round: RoundId, phase: Phase },

    #[error("{identity} already submitted in round {round}")]
    AlreadySubmitted { round: RoundId, identity: Address },

    #[error("Round {0} has already been analysed")]
    AlreadyAnalyzed(RoundId),

    #[error("Round {0} has no submissions")]
    NoSubmissions(RoundId),

    #[error("Analysis of round {0} has not completed")]
    AnalysisIncomplete(RoundId),

    #[error("Metric {0} is outside 0..=100")]
    InvalidMetric(u32),

    #[error("Score {0} is outside 0..=100")]
    InvalidScore(u32),

    #[error("Value {value} exceeds the submission limit {max}")]
    ValueOutOfRange { value: u64, max: u64 },

    #[error("Round {round} is full, it accepts at most {capacity} submissions")]
    RoundFull { round: RoundId, capacity: u64 },

    #[error("Uniqueness token must not be zero")]
    ZeroToken,

    #[error("Uniqueness token {0} has already been used")]
    DuplicateToken(UniquenessToken),

    #[error("Round {0} does not exist")]
    RoundNotFound(RoundId),

    #[error("{identity} has no submission in round {round}")]
    SubmissionNotFound { round: RoundId, identity: Address },

    #[error("Submission of {identity} in round {round} has already been resolved")]
    AlreadyResolved { round: RoundId, identity: Address },

    #[error("No reveal was requested under {0}")]
    UnknownRevealRequest(RequestId),

    #[error("Proof for {0} failed verification")]
    InvalidRevealProof(RequestId),

    #[error("{0} has already been revealed")]
    AlreadyRevealed(RequestId),

    #[error("Derived statistic of round {0} is still pending")]
    StatisticPending(RoundId),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CycleError {
    pub fn kind(&self) -> ErrorKind {
        use CycleError::*;
        match self {
            NotAuthority(_) | NotVerified(_) => ErrorKind::Unauthorized,
            NoActiveRound
            | RoundStillActive { .. }
            | WindowClosed { .. }
            | NotInAnalysis { .. }
            | NoSubmissions(_)
            | AnalysisIncomplete(_)
            | RoundFull { .. } => ErrorKind::PhaseViolation,
            AlreadySubmitted { .. }
            | AlreadyAnalyzed(_)
            | AlreadyResolved { .. }
            | AlreadyRevealed(_) => ErrorKind::AlreadyDone,
            InvalidMetric(_)
            | InvalidScore(_)
            | ValueOutOfRange { .. }
            | ZeroToken
            | DuplicateToken(_)
            | InvalidRevealProof(_) => ErrorKind::InvalidInput,
            RoundNotFound(_) | SubmissionNotFound { .. } | UnknownRevealRequest(_) => {
                ErrorKind::NotFound
            }
            StatisticPending(_) => ErrorKind::PendingExternal,
            Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<anyhow::Error> for CycleError {
    fn from(value: anyhow::Error) -> Self {
        CycleError::Internal(format!("{:#}", value))
    }
}
