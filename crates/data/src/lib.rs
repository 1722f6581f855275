// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

mod data_store;
mod in_mem;
mod into_key;
mod messages;
mod persistable;
mod repositories;
mod repository;
mod sled_db;
mod sled_store;

pub use data_store::*;
pub use in_mem::*;
pub use into_key::IntoKey;
pub use messages::*;
pub use persistable::*;
pub use repositories::*;
pub use repository::*;
pub use sled_db::*;
pub use sled_store::*;
