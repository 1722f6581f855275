// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

//! Round engine of a confidential cycle: identities submit encrypted contributions during a
//! window, an authority folds them into encrypted totals and a reveal callback turns the
//! metric total into a derived statistic.

mod access;
mod actor;
mod aggregation;
mod authority;
mod cycle;
mod error;
mod ledger;
mod phase;
mod registry;
mod repo;
mod round;
mod setup;
mod state;

pub use actor::*;
pub use authority::*;
pub use cycle::*;
pub use error::*;
pub use ledger::*;
pub use phase::*;
pub use registry::*;
pub use repo::*;
pub use round::*;
pub use setup::*;
pub use state::*;
