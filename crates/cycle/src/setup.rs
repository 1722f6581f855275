// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{AuthoritySet, Cycle, CycleActor, CycleRepositoryFactory};
use actix::{Actor, Addr};
use anyhow::Result;
use cc_config::CycleConfig;
use cc_data::{DataStore, InMemStore, RepositoriesFactory, SledDb, SledStore};
use cc_events::{CycleEvent, EventBus};
use cc_fhe::{BfvHandleService, RevealResponder};
use std::path::Path;
use tracing::info;

pub type BfvCycleActor = CycleActor<BfvHandleService, AuthoritySet>;

pub fn get_sled_store(bus: &Addr<EventBus<CycleEvent>>, db_file: &Path) -> Result<DataStore> {
    Ok((&SledStore::new(bus, db_file)?).into())
}

pub fn get_in_mem_store() -> DataStore {
    (&InMemStore::new(true).start()).into()
}

pub fn setup_datastore(config: &CycleConfig, bus: &Addr<EventBus<CycleEvent>>) -> Result<DataStore> {
    let store: DataStore = if !config.use_in_mem_store() {
        get_sled_store(bus, &config.db_path())?
    } else {
        get_in_mem_store()
    };
    Ok(store)
}

pub fn close_all_connections() {
    SledDb::close_all_connections();
}

/// Wire a complete cycle from `config`: the BFV handle service, the store, the cycle actor and
/// a responder answering reveal requests after `reveal_delay_ms`.
pub async fn setup_cycle(
    config: &CycleConfig,
    bus: &Addr<EventBus<CycleEvent>>,
) -> Result<(Addr<BfvCycleActor>, BfvHandleService)> {
    let service = BfvHandleService::from_config(config)?;
    let store = setup_datastore(config, bus)?;
    let cycle = Cycle::from_config(service.clone(), config)?;

    let addr = CycleActor::attach(bus, cycle, &store.repositories().cycle()).await?;
    RevealResponder::attach(bus, service.clone(), config.reveal_delay());
    info!(
        in_mem = config.use_in_mem_store(),
        authorities = config.authorities.len(),
        "cycle ready"
    );
    Ok((addr, service))
}
