// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Get, InMemStore, Insert, InsertSync, IntoKey, Remove, SledStore};
use actix::{Addr, Recipient};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use tracing::error;

/// Backing actor of a [`DataStore`].
#[derive(Clone, Debug)]
pub enum StoreAddr {
    InMem(Addr<InMemStore>),
    Sled(Addr<SledStore>),
}

impl StoreAddr {
    pub fn to_maybe_in_mem(&self) -> Option<&Addr<InMemStore>> {
        match self {
            StoreAddr::InMem(store) => Some(store),
            StoreAddr::Sled(_) => None,
        }
    }
}

/// Scoped handle onto a key/value store actor. Cloning is cheap and every clone talks to the
/// same actor.
#[derive(Clone, Debug)]
pub struct DataStore {
    scope: Vec<u8>,
    addr: StoreAddr,
    get: Recipient<Get>,
    insert: Recipient<Insert>,
    insert_sync: Recipient<InsertSync>,
    remove: Recipient<Remove>,
}

impl DataStore {
    /// Read and deserialize the value at the current scope.
    pub async fn read<T>(&self) -> Result<Option<T>>
    where
        T: for<'de> Deserialize<'de>,
    {
        let Some(bytes) = self.get.send(Get::new(&self.scope)).await? else {
            return Ok(None);
        };

        let value = bincode::deserialize(&bytes)
            .with_context(|| format!("Could not deserialize value at {}", self.get_scope()))?;
        Ok(Some(value))
    }

    /// Serialize and write a value at the current scope without waiting for the store.
    pub fn write<T: Serialize>(&self, value: T) {
        match bincode::serialize(&value) {
            Ok(bytes) => self.insert.do_send(Insert::new(&self.scope, bytes)),
            Err(err) => error!("Could not serialize value passed to {}: {}", self.get_scope(), err),
        }
    }

    /// Serialize and write a value, resolving once the store has accepted it.
    pub async fn write_sync<T: Serialize>(&self, value: T) -> Result<()> {
        let bytes = bincode::serialize(&value)
            .with_context(|| format!("Could not serialize value passed to {}", self.get_scope()))?;
        self.insert_sync
            .send(InsertSync::new(&self.scope, bytes))
            .await??;
        Ok(())
    }

    pub fn clear(&self) {
        self.remove.do_send(Remove::new(&self.scope))
    }

    pub fn get_scope(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.scope)
    }

    pub fn get_addr(&self) -> &StoreAddr {
        &self.addr
    }

    /// Extends the scope with another segment, inserting a slash separator when the segment
    /// does not start with one.
    ///
    /// ```
    /// use actix::Actor;
    /// use cc_data::{DataStore, InMemStore};
    ///
    /// #[actix::main]
    /// async fn main() {
    ///     let addr = InMemStore::new(false).start();
    ///     let store = DataStore::from(&addr);
    ///     assert_eq!(store.base("//cycle").scope("round").scope("/3").get_scope(), "//cycle/round/3");
    /// }
    /// ```
    pub fn scope<K: IntoKey>(&self, key: K) -> Self {
        let mut scope = self.scope.clone();
        let segment = key.into_key();
        if !segment.starts_with(b"/") {
            scope.push(b'/');
        }
        scope.extend(segment);
        self.with_scope(scope)
    }

    /// Replaces the scope entirely.
    pub fn base<K: IntoKey>(&self, key: K) -> Self {
        self.with_scope(key.into_key())
    }

    fn with_scope(&self, scope: Vec<u8>) -> Self {
        Self {
            scope,
            addr: self.addr.clone(),
            get: self.get.clone(),
            insert: self.insert.clone(),
            insert_sync: self.insert_sync.clone(),
            remove: self.remove.clone(),
        }
    }
}

impl From<&Addr<SledStore>> for DataStore {
    fn from(addr: &Addr<SledStore>) -> Self {
        Self {
            scope: vec![],
            addr: StoreAddr::Sled(addr.clone()),
            get: addr.clone().recipient(),
            insert: addr.clone().recipient(),
            insert_sync: addr.clone().recipient(),
            remove: addr.clone().recipient(),
        }
    }
}

impl From<&Addr<InMemStore>> for DataStore {
    fn from(addr: &Addr<InMemStore>) -> Self {
        Self {
            scope: vec![],
            addr: StoreAddr::InMem(addr.clone()),
            get: addr.clone().recipient(),
            insert: addr.clone().recipient(),
            insert_sync: addr.clone().recipient(),
            remove: addr.clone().recipient(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix::Actor;
    use cc_events::{CycleEvent, EventBus, Shutdown};
    use tempfile::tempdir;

    #[actix::test]
    async fn sled_backed_store_survives_restart() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("db");
        let bus = EventBus::<CycleEvent>::new().start();

        let store = DataStore::from(&SledStore::new(&bus, &path)?).base("//cycle");
        store.write_sync(vec![7u64, 8, 9]).await?;
        bus.send(CycleEvent::from(Shutdown)).await?;

        let reopened = DataStore::from(&SledStore::new(&bus, &path)?).base("//cycle");
        assert_eq!(reopened.read::<Vec<u64>>().await?, Some(vec![7, 8, 9]));
        Ok(())
    }

    #[actix::test]
    async fn clear_removes_value() -> Result<()> {
        let store = DataStore::from(&InMemStore::new(false).start()).base("//k");
        store.write_sync("value".to_string()).await?;
        store.clear();
        assert_eq!(store.read::<String>().await?, None);
        Ok(())
    }
}
