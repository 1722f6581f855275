// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use alloy_primitives::Address;
use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::{fmt, hash::Hash, marker::PhantomData};

/// Plaintext types a handle may stand for.
pub trait Plaintext: Copy + fmt::Debug + Send + Sync + 'static {
    const WIDTH: &'static str;

    fn to_u64(self) -> u64;
    fn from_u64(value: u64) -> Result<Self>;
}

impl Plaintext for u64 {
    const WIDTH: &'static str = "u64";

    fn to_u64(self) -> u64 {
        self
    }

    fn from_u64(value: u64) -> Result<Self> {
        Ok(value)
    }
}

impl Plaintext for u32 {
    const WIDTH: &'static str = "u32";

    fn to_u64(self) -> u64 {
        self as u64
    }

    fn from_u64(value: u64) -> Result<Self> {
        u32::try_from(value).map_err(|_| anyhow!("{} does not fit in u32", value))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ct:{}", self.0)
    }
}

/// Opaque reference to a ciphertext held by the handle service. The type parameter records
/// the plaintext width so totals of different widths cannot be mixed.
#[derive(Serialize, Deserialize)]
#[serde(transparent, bound = "")]
pub struct Handle<T> {
    id: HandleId,
    #[serde(skip)]
    _p: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    pub fn new(id: HandleId) -> Self {
        Self {
            id,
            _p: PhantomData,
        }
    }

    pub fn id(&self) -> HandleId {
        self.id
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> Hash for Handle<T> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id.hash(state)
    }
}

impl<T: Plaintext> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle<{}>({})", T::WIDTH, self.id)
    }
}

/// Someone who may be allowed to obtain the plaintext behind a handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Principal {
    /// The cycle engine itself
    System,
    Identity(Address),
}

impl From<Address> for Principal {
    fn from(value: Address) -> Self {
        Principal::Identity(value)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Principal::System => write!(f, "system"),
            Principal::Identity(address) => write!(f, "{}", address),
        }
    }
}
