// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::Address;
use cc_fhe::SharedRng;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha20Rng;
use std::sync::{Arc, Mutex};

pub fn create_shared_rng_from_u64(value: u64) -> SharedRng {
    Arc::new(Mutex::new(ChaCha20Rng::seed_from_u64(value)))
}

pub fn rand_address(rng: &SharedRng) -> Address {
    let bytes = match rng.lock() {
        Ok(mut rng) => rng.gen::<[u8; 20]>(),
        Err(poisoned) => poisoned.into_inner().gen::<[u8; 20]>(),
    };
    Address::from(bytes)
}
