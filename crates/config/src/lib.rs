// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod cycle_config;
mod load_config;
mod store_keys;
mod yaml;

pub use cycle_config::*;
pub use load_config::*;
pub use store_keys::*;
pub use yaml::*;
