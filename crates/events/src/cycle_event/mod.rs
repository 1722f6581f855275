// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod analysis_completed;
mod identity_verified;
mod operation_failed;
mod reputation_updated;
mod result_access_granted;
mod reveal_fulfilled;
mod reveal_requested;
mod round_started;
mod shutdown;
mod statistic_derived;
mod submission_recorded;
mod submission_resolved;

pub use analysis_completed::*;
pub use identity_verified::*;
pub use operation_failed::*;
pub use reputation_updated::*;
pub use result_access_granted::*;
pub use reveal_fulfilled::*;
pub use reveal_requested::*;
pub use round_started::*;
pub use shutdown::*;
pub use statistic_derived::*;
pub use submission_recorded::*;
pub use submission_resolved::*;

use crate::{ErrorEvent, Event, EventId, RoundId};
use actix::Message;
use serde::{Deserialize, Serialize};
use std::{fmt, hash::Hash};

macro_rules! impl_from_event {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for CycleEvent {
                fn from(data: $variant) -> Self {
                    CycleEvent::$variant {
                        id: EventId::hash(data.clone()),
                        data,
                    }
                }
            }
        )*
    };
}

#[derive(Message, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[rtype(result = "()")]
pub enum CycleEvent {
    RoundStarted {
        id: EventId,
        data: RoundStarted,
    },
    IdentityVerified {
        id: EventId,
        data: IdentityVerified,
    },
    ReputationUpdated {
        id: EventId,
        data: ReputationUpdated,
    },
    SubmissionRecorded {
        id: EventId,
        data: SubmissionRecorded,
    },
    AnalysisCompleted {
        id: EventId,
        data: AnalysisCompleted,
    },
    RevealRequested {
        id: EventId,
        data: RevealRequested,
    },
    RevealFulfilled {
        id: EventId,
        data: RevealFulfilled,
    },
    StatisticDerived {
        id: EventId,
        data: StatisticDerived,
    },
    ResultAccessGranted {
        id: EventId,
        data: ResultAccessGranted,
    },
    SubmissionResolved {
        id: EventId,
        data: SubmissionResolved,
    },
    OperationFailed {
        id: EventId,
        data: OperationFailed,
    },
    Shutdown {
        id: EventId,
        data: Shutdown,
    },
}

impl CycleEvent {
    pub fn to_bytes(&self) -> Result<Vec<u8>, bincode::Error> {
        bincode::serialize(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, bincode::Error> {
        bincode::deserialize(bytes)
    }

    pub fn get_id(&self) -> EventId {
        self.clone().into()
    }

    /// Round the event concerns, if any.
    pub fn get_round_id(&self) -> Option<RoundId> {
        match self {
            CycleEvent::RoundStarted { data, .. } => Some(data.round_id),
            CycleEvent::SubmissionRecorded { data, .. } => Some(data.round_id),
            CycleEvent::AnalysisCompleted { data, .. } => Some(data.round_id),
            CycleEvent::RevealRequested { data, .. } => Some(data.round_id),
            CycleEvent::RevealFulfilled { data, .. } => Some(data.round_id),
            CycleEvent::StatisticDerived { data, .. } => Some(data.round_id),
            CycleEvent::ResultAccessGranted { data, .. } => Some(data.round_id),
            CycleEvent::SubmissionResolved { data, .. } => Some(data.round_id),
            _ => None,
        }
    }

    pub fn get_data(&self) -> String {
        match self {
            CycleEvent::RoundStarted { data, .. } => format!("{}", data),
            CycleEvent::IdentityVerified { data, .. } => format!("{}", data),
            CycleEvent::ReputationUpdated { data, .. } => format!("{}", data),
            CycleEvent::SubmissionRecorded { data, .. } => format!("{}", data),
            CycleEvent::AnalysisCompleted { data, .. } => format!("{}", data),
            CycleEvent::RevealRequested { data, .. } => format!("{}", data),
            CycleEvent::RevealFulfilled { data, .. } => format!("{}", data),
            CycleEvent::StatisticDerived { data, .. } => format!("{}", data),
            CycleEvent::ResultAccessGranted { data, .. } => format!("{}", data),
            CycleEvent::SubmissionResolved { data, .. } => format!("{}", data),
            CycleEvent::OperationFailed { data, .. } => format!("{}", data),
            CycleEvent::Shutdown { data, .. } => format!("{}", data),
        }
    }
}

impl Event for CycleEvent {
    type Id = EventId;

    fn event_type(&self) -> String {
        let s = format!("{:?}", self);
        extract_cycle_event_name(&s).to_string()
    }

    fn event_id(&self) -> Self::Id {
        self.get_id()
    }
}

impl ErrorEvent for CycleEvent {
    type Error = OperationFailed;
    type ErrorType = FailureType;

    fn as_error(&self) -> Option<&Self::Error> {
        match self {
            CycleEvent::OperationFailed { data, .. } => Some(data),
            _ => None,
        }
    }

    fn from_error(err_type: Self::ErrorType, error: anyhow::Error) -> Self {
        CycleEvent::from(OperationFailed::from_error(err_type, error))
    }
}

impl From<CycleEvent> for EventId {
    fn from(value: CycleEvent) -> Self {
        match value {
            CycleEvent::RoundStarted { id, .. } => id,
            CycleEvent::IdentityVerified { id, .. } => id,
            CycleEvent::ReputationUpdated { id, .. } => id,
            CycleEvent::SubmissionRecorded { id, .. } => id,
            CycleEvent::AnalysisCompleted { id, .. } => id,
            CycleEvent::RevealRequested { id, .. } => id,
            CycleEvent::RevealFulfilled { id, .. } => id,
            CycleEvent::StatisticDerived { id, .. } => id,
            CycleEvent::ResultAccessGranted { id, .. } => id,
            CycleEvent::SubmissionResolved { id, .. } => id,
            CycleEvent::OperationFailed { id, .. } => id,
            CycleEvent::Shutdown { id, .. } => id,
        }
    }
}

impl_from_event!(
    RoundStarted,
    IdentityVerified,
    ReputationUpdated,
    SubmissionRecorded,
    AnalysisCompleted,
    RevealRequested,
    RevealFulfilled,
    StatisticDerived,
    ResultAccessGranted,
    SubmissionResolved,
    OperationFailed,
    Shutdown
);

impl fmt::Display for CycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.event_type(), self.get_data())
    }
}

fn extract_cycle_event_name(s: &str) -> &str {
    let bytes = s.as_bytes();
    for (i, &item) in bytes.iter().enumerate() {
        if item == b' ' || item == b'(' || item == b'{' {
            return &s[..i];
        }
    }
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::Address;

    #[test]
    fn event_type_is_variant_name() {
        let evt = CycleEvent::from(Shutdown);
        assert_eq!(evt.event_type(), "Shutdown");

        let evt = CycleEvent::from(IdentityVerified {
            identity: Address::ZERO,
            at: 10,
        });
        assert_eq!(evt.event_type(), "IdentityVerified");
    }

    #[test]
    fn error_events_are_recognised() {
        let evt = CycleEvent::from_error(FailureType::Reveal, anyhow::anyhow!("boom"));
        assert_eq!(evt.event_type(), "OperationFailed");
        let err = evt.as_error().expect("should be an error");
        assert_eq!(err.err_type, FailureType::Reveal);
        assert_eq!(err.message, "boom");
        assert!(CycleEvent::from(Shutdown).as_error().is_none());
    }

    #[test]
    fn bytes_roundtrip_keeps_id() -> anyhow::Result<()> {
        let evt = CycleEvent::from(RevealRequested {
            round_id: RoundId(3),
            request_id: crate::RequestId(7),
        });
        let back = CycleEvent::from_bytes(&evt.to_bytes()?)?;
        assert_eq!(back.get_id(), evt.get_id());
        assert_eq!(back.get_round_id(), Some(RoundId(3)));
        Ok(())
    }
}
