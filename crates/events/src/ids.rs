// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::formatters::hexf;
use alloy_primitives::{keccak256, B256, U256};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Monotonic round identifier. The first round is `1`.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RoundId(pub u64);

impl RoundId {
    pub const FIRST: RoundId = RoundId(1);

    pub fn next(&self) -> RoundId {
        RoundId(self.0 + 1)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for RoundId {
    fn from(value: u64) -> Self {
        RoundId(value)
    }
}

impl Display for RoundId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifies an outstanding reveal request issued to the ciphertext service.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct RequestId(pub u64);

impl Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "req:{}", self.0)
    }
}

/// Caller supplied digest used to reject replayed submissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UniquenessToken(pub B256);

impl UniquenessToken {
    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl From<B256> for UniquenessToken {
    fn from(value: B256) -> Self {
        UniquenessToken(value)
    }
}

impl From<[u8; 32]> for UniquenessToken {
    fn from(value: [u8; 32]) -> Self {
        UniquenessToken(B256::from(value))
    }
}

impl Display for UniquenessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// External identifier of an analysed round.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ResultFingerprint(pub B256);

impl ResultFingerprint {
    /// keccak256 over the round id, the analysis timestamp and the participant count, each
    /// encoded as a 32 byte big endian word.
    pub fn derive(round_id: RoundId, timestamp: u64, participant_count: u64) -> Self {
        let mut packed = Vec::with_capacity(96);
        packed.extend_from_slice(&U256::from(round_id.as_u64()).to_be_bytes::<32>());
        packed.extend_from_slice(&U256::from(timestamp).to_be_bytes::<32>());
        packed.extend_from_slice(&U256::from(participant_count).to_be_bytes::<32>());
        ResultFingerprint(keccak256(&packed))
    }
}

impl Display for ResultFingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Authenticity proof attached by the ciphertext service to a revealed plaintext.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RevealProof(pub [u8; 32]);

impl fmt::Debug for RevealProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        hexf(&self.0, f)
    }
}

impl Display for RevealProof {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        hexf(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_binds_every_field() {
        let base = ResultFingerprint::derive(RoundId(1), 28_800, 1);
        assert_eq!(base, ResultFingerprint::derive(RoundId(1), 28_800, 1));
        assert_ne!(base, ResultFingerprint::derive(RoundId(2), 28_800, 1));
        assert_ne!(base, ResultFingerprint::derive(RoundId(1), 28_801, 1));
        assert_ne!(base, ResultFingerprint::derive(RoundId(1), 28_800, 2));
    }

    #[test]
    fn zero_token_is_detected() {
        assert!(UniquenessToken::from([0u8; 32]).is_zero());
        let mut bytes = [0u8; 32];
        bytes[31] = 1;
        assert!(!UniquenessToken::from(bytes).is_zero());
    }

    #[test]
    fn round_ids_advance_by_one() {
        assert_eq!(RoundId::FIRST.next(), RoundId(2));
        assert_eq!(RoundId::default().next(), RoundId::FIRST);
    }
}
