// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Get, Insert, InsertSync, Remove, SledDb};
use actix::{Actor, ActorContext, Addr, Handler};
use anyhow::{anyhow, Result};
use cc_events::{CycleEvent, ErrorEvent, EventBus, FailureType, Subscribe};
use std::path::Path;
use tracing::{error, info};

/// Durable store actor. Failures are reported on the bus as `OperationFailed` events and the
/// underlying db is released when a `Shutdown` event arrives.
pub struct SledStore {
    db: Option<SledDb>,
    bus: Addr<EventBus<CycleEvent>>,
}

impl Actor for SledStore {
    type Context = actix::Context<Self>;
}

impl SledStore {
    pub fn new(bus: &Addr<EventBus<CycleEvent>>, path: &Path) -> Result<Addr<Self>> {
        info!("Starting SledStore with {:?}", path);
        let db = SledDb::new(path, "datastore")?;

        let store = Self {
            db: Some(db),
            bus: bus.clone(),
        }
        .start();

        bus.do_send(Subscribe::new("Shutdown", store.clone().recipient()));

        Ok(store)
    }

    fn report(&self, err: anyhow::Error) {
        self.bus
            .do_send(CycleEvent::from_error(FailureType::Data, err));
    }
}

impl Handler<Insert> for SledStore {
    type Result = ();

    fn handle(&mut self, msg: Insert, _: &mut Self::Context) -> Self::Result {
        let Some(db) = self.db.as_mut() else {
            error!("Attempt to write to dropped db");
            return;
        };
        if let Err(err) = db.insert(msg) {
            self.report(err);
        }
    }
}

impl Handler<InsertSync> for SledStore {
    type Result = Result<()>;

    fn handle(&mut self, msg: InsertSync, _: &mut Self::Context) -> Self::Result {
        let db = self
            .db
            .as_mut()
            .ok_or_else(|| anyhow!("Attempt to write to dropped db"))?;
        db.insert(msg.into())?;
        db.flush()
    }
}

impl Handler<Remove> for SledStore {
    type Result = ();

    fn handle(&mut self, msg: Remove, _: &mut Self::Context) -> Self::Result {
        let Some(db) = self.db.as_mut() else {
            error!("Attempt to remove from dropped db");
            return;
        };
        if let Err(err) = db.remove(msg) {
            self.report(err);
        }
    }
}

impl Handler<Get> for SledStore {
    type Result = Option<Vec<u8>>;

    fn handle(&mut self, msg: Get, _: &mut Self::Context) -> Self::Result {
        let Some(db) = self.db.as_ref() else {
            error!("Attempt to get data from dropped db");
            return None;
        };
        match db.get(msg) {
            Ok(value) => value,
            Err(err) => {
                self.report(err);
                None
            }
        }
    }
}

impl Handler<CycleEvent> for SledStore {
    type Result = ();

    fn handle(&mut self, msg: CycleEvent, ctx: &mut Self::Context) -> Self::Result {
        if let CycleEvent::Shutdown { .. } = msg {
            if let Some(db) = self.db.take() {
                if let Err(err) = db.flush() {
                    error!("Could not flush db on shutdown: {}", err);
                }
            }
            ctx.stop()
        }
    }
}
