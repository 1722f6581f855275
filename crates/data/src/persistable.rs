// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::Repository;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

pub trait PersistableData: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}
impl<T> PersistableData for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

#[async_trait]
pub trait AutoPersist<T>
where
    T: PersistableData,
{
    /// Load the data from the repository into an auto persist container
    async fn load(&self) -> Result<Persistable<T>>;
    /// Create a container holding `data` and write it straight to the repository
    fn send(&self, data: Option<T>) -> Persistable<T>;
    /// Load the data or persist and use `default` when nothing has been stored yet
    async fn load_or_default(&self, default: T) -> Result<Persistable<T>>;
    /// Load the data or persist and use the result of `f` when nothing has been stored yet
    async fn load_or_else<F>(&self, f: F) -> Result<Persistable<T>>
    where
        F: Send + FnOnce() -> Result<T>;
}

#[async_trait]
impl<T> AutoPersist<T> for Repository<T>
where
    T: PersistableData,
{
    async fn load(&self) -> Result<Persistable<T>> {
        Persistable::load(self).await
    }

    fn send(&self, data: Option<T>) -> Persistable<T> {
        Persistable::new(data, self).save()
    }

    async fn load_or_default(&self, default: T) -> Result<Persistable<T>> {
        Persistable::load_or_default(self, default).await
    }

    async fn load_or_else<F>(&self, f: F) -> Result<Persistable<T>>
    where
        F: Send + FnOnce() -> Result<T>,
    {
        Persistable::load_or_else(self, f).await
    }
}

/// In-memory value mirrored to a repository on every change.
#[derive(Debug)]
pub struct Persistable<T> {
    data: Option<T>,
    repo: Repository<T>,
}

impl<T> Persistable<T>
where
    T: PersistableData,
{
    pub fn new(data: Option<T>, repo: &Repository<T>) -> Self {
        Self {
            data,
            repo: repo.clone(),
        }
    }

    pub async fn load(repo: &Repository<T>) -> Result<Self> {
        let data = repo.read().await?;
        Ok(Self::new(data, repo))
    }

    pub async fn load_or_default(repo: &Repository<T>, default: T) -> Result<Self> {
        let data = repo.read().await?.unwrap_or(default);
        Ok(Self::new(Some(data), repo).save())
    }

    pub async fn load_or_else<F>(repo: &Repository<T>, f: F) -> Result<Self>
    where
        F: FnOnce() -> Result<T>,
    {
        let data = match repo.read().await? {
            Some(data) => data,
            None => f()?,
        };
        Ok(Self::new(Some(data), repo).save())
    }

    pub fn save(self) -> Self {
        self.checkpoint();
        self
    }

    /// Replace the content with the output of `mutator`. Nothing changes if the mutator fails
    /// or no data is set.
    pub fn try_mutate<F>(&mut self, mutator: F) -> Result<()>
    where
        F: FnOnce(T) -> Result<T>,
    {
        let content = self.try_get()?;
        self.data = Some(mutator(content)?);
        self.checkpoint();
        Ok(())
    }

    /// Run `mutator` against a working copy and commit the copy only when it succeeds. The
    /// mutator's own error type is kept so callers can match on domain errors.
    pub fn try_mutate_with<F, R, E>(&mut self, mutator: F) -> std::result::Result<R, E>
    where
        F: FnOnce(&mut T) -> std::result::Result<R, E>,
        E: From<anyhow::Error>,
    {
        let mut working = self.try_get()?;
        let out = mutator(&mut working)?;
        self.data = Some(working);
        self.checkpoint();
        Ok(out)
    }

    pub fn set(&mut self, data: T) {
        self.data = Some(data);
        self.checkpoint();
    }

    pub fn clear(&mut self) {
        self.data = None;
        self.repo.clear();
    }

    pub fn get(&self) -> Option<T> {
        self.data.clone()
    }

    pub fn try_get(&self) -> Result<T> {
        self.data
            .clone()
            .ok_or_else(|| anyhow!("Data was not set on container."))
    }

    pub fn has(&self) -> bool {
        self.data.is_some()
    }

    /// Borrow the content without cloning it.
    pub fn try_with<F, U>(&self, f: F) -> Result<U>
    where
        F: FnOnce(&T) -> Result<U>,
    {
        match &self.data {
            Some(data) => f(data),
            None => Err(anyhow!("Data was not set on container.")),
        }
    }

    fn checkpoint(&self) {
        match &self.data {
            Some(data) => self.repo.write(data),
            None => self.repo.clear(),
        }
    }
}
