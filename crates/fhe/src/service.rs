// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Handle, Plaintext, Principal};
use anyhow::Result;
use cc_events::{RequestId, RevealProof};

/// Capability surface of the confidential computation service. Implementations own every
/// ciphertext; callers only ever see [`Handle`]s.
pub trait CiphertextHandleService: Clone + Send + Sync + 'static {
    /// Encryption of zero, used as the seed of homomorphic folds.
    fn zero<T: Plaintext>(&self) -> Result<Handle<T>>;

    fn encrypt<T: Plaintext>(&self, value: T) -> Result<Handle<T>>;

    /// Homomorphic addition. Neither input is consumed.
    fn add<T: Plaintext>(&self, a: &Handle<T>, b: &Handle<T>) -> Result<Handle<T>>;

    fn grant<T: Plaintext>(&self, handle: &Handle<T>, principal: Principal) -> Result<()>;

    fn is_granted<T: Plaintext>(&self, handle: &Handle<T>, principal: &Principal) -> bool;

    /// Ask for the plaintext behind `handle` to be revealed to the system. The answer arrives
    /// later as a `RevealFulfilled` event correlated by the returned id.
    fn request_reveal<T: Plaintext>(&self, handle: &Handle<T>) -> Result<RequestId>;

    /// Check that `proof` authenticates `plaintext` as the answer to `request_id`.
    fn verify_reveal(&self, request_id: RequestId, plaintext: u64, proof: &RevealProof) -> bool;

    /// Exclusive upper bound of every plaintext, including the result of a homomorphic sum.
    /// Sums that reach it wrap around.
    fn plaintext_modulus(&self) -> u64;
}

/// Service side of the reveal protocol.
pub trait RevealFulfiller: Send + 'static {
    fn fulfil(&self, request_id: RequestId) -> Result<(u64, RevealProof)>;
}
