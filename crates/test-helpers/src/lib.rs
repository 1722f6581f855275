// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod fixtures;
mod rng;

pub use fixtures::*;
pub use rng::*;

use tracing_subscriber::{fmt, EnvFilter};

/// Route `tracing` output of the current test through the test writer. Honors `RUST_LOG` and
/// falls back to `info`.
pub fn init_tracing() -> tracing::subscriber::DefaultGuard {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_test_writer().finish();
    tracing::subscriber::set_default(subscriber)
}
