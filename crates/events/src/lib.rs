// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod cycle_event;
mod event_id;
mod eventbus;
mod formatters;
mod ids;
mod traits;

pub use cycle_event::*;
pub use event_id::*;
pub use eventbus::*;
pub use formatters::*;
pub use ids::*;
pub use traits::*;
