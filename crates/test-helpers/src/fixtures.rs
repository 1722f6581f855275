// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::create_shared_rng_from_u64;
use alloy_primitives::Address;
use anyhow::Result;
use cc_config::{BfvConfig, CycleConfig};
use cc_events::UniquenessToken;
use cc_fhe::BfvHandleService;

pub const HOUR: u64 = 3600;

/// Handle service with keys derived from `seed`.
pub fn seeded_handle_service(seed: u64) -> Result<BfvHandleService> {
    BfvHandleService::new(&BfvConfig::default(), create_shared_rng_from_u64(seed))
}

/// Address whose last byte is `n`.
pub fn identity(n: u8) -> Address {
    Address::with_last_byte(n)
}

pub fn authority() -> Address {
    Address::repeat_byte(0xAA)
}

pub fn alice() -> Address {
    Address::repeat_byte(0xA1)
}

pub fn bob() -> Address {
    Address::repeat_byte(0xB0)
}

/// Non zero token derived from `n`.
pub fn token(n: u8) -> UniquenessToken {
    let mut bytes = [0u8; 32];
    bytes[0] = 0xC0;
    bytes[31] = n;
    UniquenessToken::from(bytes)
}

/// In memory configuration with a six hour window in a daily cycle and a fixed seed.
pub fn test_config() -> CycleConfig {
    CycleConfig {
        submission_window_secs: 6 * HOUR,
        cycle_duration_secs: 24 * HOUR,
        default_reputation: 50,
        authorities: vec![authority()],
        seed: Some(42),
        in_mem_store: true,
        ..CycleConfig::default()
    }
}
