// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::CycleState;
use cc_config::StoreKeys;
use cc_data::{Repositories, Repository};

pub trait CycleRepositoryFactory {
    fn cycle(&self) -> Repository<CycleState>;
}

impl CycleRepositoryFactory for Repositories {
    fn cycle(&self) -> Repository<CycleState> {
        Repository::new(self.store.scope(StoreKeys::cycle()))
    }
}
