// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod bfv;
mod handle;
mod responder;
mod service;

pub use bfv::*;
pub use handle::*;
pub use responder::*;
pub use service::*;
