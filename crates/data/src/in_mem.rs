// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Get, Insert, InsertSync, Remove};
use actix::{Actor, Handler, Message};
use anyhow::{Context, Result};
use std::collections::BTreeMap;

/// Returns every operation the store has applied when capture is on.
#[derive(Message, Clone, Debug, PartialEq, Eq, Hash)]
#[rtype(result = "Vec<DataOp>")]
pub struct GetLog;

/// Returns the whole keyspace serialized with bincode.
#[derive(Message, Clone, Debug, PartialEq, Eq, Hash)]
#[rtype(result = "anyhow::Result<Vec<u8>>")]
pub struct GetDump;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum DataOp {
    Insert(Insert),
    Remove(Remove),
}

/// Volatile store used by tests and by nodes configured with `in_mem_store: true`.
pub struct InMemStore {
    db: BTreeMap<Vec<u8>, Vec<u8>>,
    log: Vec<DataOp>,
    capture: bool,
}

impl Actor for InMemStore {
    type Context = actix::Context<Self>;
}

impl InMemStore {
    pub fn new(capture: bool) -> Self {
        Self {
            db: BTreeMap::new(),
            log: vec![],
            capture,
        }
    }

    pub fn from_dump(dump: Vec<u8>, capture: bool) -> Result<Self> {
        Ok(Self {
            db: bincode::deserialize(&dump).context("Could not deserialize store dump")?,
            log: vec![],
            capture,
        })
    }

    pub fn get_dump(&self) -> Result<Vec<u8>> {
        bincode::serialize(&self.db).context("Could not serialize store dump")
    }

    fn apply(&mut self, op: DataOp) {
        match &op {
            DataOp::Insert(insert) => {
                self.db.insert(insert.key().to_vec(), insert.value().to_vec());
            }
            DataOp::Remove(remove) => {
                self.db.remove(remove.key());
            }
        }

        if self.capture {
            self.log.push(op);
        }
    }
}

impl Handler<Insert> for InMemStore {
    type Result = ();

    fn handle(&mut self, msg: Insert, _: &mut Self::Context) {
        self.apply(DataOp::Insert(msg));
    }
}

impl Handler<InsertSync> for InMemStore {
    type Result = Result<()>;

    fn handle(&mut self, msg: InsertSync, _: &mut Self::Context) -> Self::Result {
        self.apply(DataOp::Insert(msg.into()));
        Ok(())
    }
}

impl Handler<Remove> for InMemStore {
    type Result = ();

    fn handle(&mut self, msg: Remove, _: &mut Self::Context) {
        self.apply(DataOp::Remove(msg));
    }
}

impl Handler<Get> for InMemStore {
    type Result = Option<Vec<u8>>;

    fn handle(&mut self, msg: Get, _: &mut Self::Context) -> Self::Result {
        self.db.get(msg.key()).cloned()
    }
}

impl Handler<GetLog> for InMemStore {
    type Result = Vec<DataOp>;

    fn handle(&mut self, _: GetLog, _: &mut Self::Context) -> Self::Result {
        self.log.clone()
    }
}

impl Handler<GetDump> for InMemStore {
    type Result = Result<Vec<u8>>;

    fn handle(&mut self, _: GetDump, _: &mut Self::Context) -> Self::Result {
        self.get_dump()
    }
}
