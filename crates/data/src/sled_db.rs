// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{Get, Insert, Remove};
use anyhow::{anyhow, Context, Result};
use once_cell::sync::Lazy;
use sled::{Db, Tree};
use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    sync::Mutex,
};
use tracing::info;

/// Open databases keyed by canonical path. sled holds a file lock per process so every
/// `SledDb` pointing at the same path has to share one handle.
static SLED_CACHE: Lazy<Mutex<HashMap<PathBuf, Db>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn canonical_path(path: &Path) -> PathBuf {
    if let Ok(canonical) = path.canonicalize() {
        return canonical;
    }
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    let base = parent
        .canonicalize()
        .unwrap_or_else(|_| parent.to_path_buf());
    match path.file_name() {
        Some(name) => base.join(name),
        None => base,
    }
}

fn get_or_open_db(path: &Path) -> Result<Db> {
    std::fs::create_dir_all(path)
        .with_context(|| format!("Could not create db directory {:?}", path))?;
    let key = canonical_path(path);
    let mut cache = SLED_CACHE
        .lock()
        .map_err(|_| anyhow!("sled cache lock poisoned"))?;

    if let Some(db) = cache.get(&key) {
        return Ok(db.clone());
    }

    let db = sled::open(path)
        .with_context(|| format!("Could not open database at path {:?}", path))?;
    if db.was_recovered() {
        info!("recovered db at: {:?}", path);
    } else {
        info!("created db at: {:?}", path);
    }
    cache.insert(key, db.clone());
    Ok(db)
}

pub struct SledDb {
    tree: Tree,
}

impl SledDb {
    pub fn new(path: &Path, tree: &str) -> Result<Self> {
        let tree = get_or_open_db(path)?
            .open_tree(tree)
            .with_context(|| format!("Could not open tree {}", tree))?;
        Ok(Self { tree })
    }

    /// Drops every cached handle so the files can be reopened or removed.
    pub fn close_all_connections() {
        if let Ok(mut cache) = SLED_CACHE.lock() {
            cache.clear();
        }
    }

    pub fn insert(&mut self, msg: Insert) -> Result<()> {
        self.tree
            .insert(msg.key(), msg.value())
            .context("Could not insert data into db")?;
        Ok(())
    }

    pub fn remove(&mut self, msg: Remove) -> Result<()> {
        self.tree
            .remove(msg.key())
            .context("Could not remove data from db")?;
        Ok(())
    }

    pub fn get(&self, msg: Get) -> Result<Option<Vec<u8>>> {
        let res = self
            .tree
            .get(msg.key())
            .with_context(|| format!("Failed to fetch {}", String::from_utf8_lossy(msg.key())))?;
        Ok(res.map(|v| v.to_vec()))
    }

    pub fn flush(&self) -> Result<()> {
        self.tree.flush().context("Could not flush db")?;
        Ok(())
    }
}
