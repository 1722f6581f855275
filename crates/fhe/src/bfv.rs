// SPDX-License-Identifier: LGPL-3.0-only
//
// This file is provided WITHOUT ANY WARRANTY;
// without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE.

use crate::{CiphertextHandleService, Handle, HandleId, Plaintext, Principal, RevealFulfiller};
use anyhow::{anyhow, bail, Context, Result};
use cc_config::{BfvConfig, CycleConfig};
use cc_events::{RequestId, RevealProof};
use fhe::bfv::{
    self, BfvParameters, BfvParametersBuilder, Ciphertext, Encoding, PublicKey, SecretKey,
};
use fhe_traits::{FheDecoder, FheDecrypter, FheEncoder, FheEncrypter};
use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use sha2::{Digest, Sha256};
use std::{
    collections::{BTreeMap, HashMap, HashSet},
    sync::{Arc, Mutex, MutexGuard},
};
use tracing::{info, warn};

pub type SharedRng = Arc<Mutex<ChaCha20Rng>>;

pub fn build_bfv_params_arc(config: &BfvConfig) -> Result<Arc<BfvParameters>> {
    BfvParametersBuilder::new()
        .set_degree(config.degree)
        .set_plaintext_modulus(config.plaintext_modulus)
        .set_moduli(&config.moduli)
        .build_arc()
        .map_err(|e| anyhow!("Failed to build BFV parameters: {e}"))
}

#[derive(Default)]
struct HandleStore {
    next_handle: u64,
    next_request: u64,
    ciphertexts: HashMap<HandleId, Ciphertext>,
    grants: HashSet<(HandleId, Principal)>,
    pending: BTreeMap<RequestId, HandleId>,
}

impl HandleStore {
    fn insert(&mut self, ct: Ciphertext) -> HandleId {
        self.next_handle += 1;
        let id = HandleId(self.next_handle);
        self.ciphertexts.insert(id, ct);
        id
    }

    fn get(&self, id: HandleId) -> Result<&Ciphertext> {
        self.ciphertexts
            .get(&id)
            .ok_or_else(|| anyhow!("Unknown ciphertext handle {}", id))
    }
}

/// Single key BFV implementation of the handle service. Ciphertexts, grants and pending reveals
/// live in memory behind a shared lock so clones of the service see the same handles.
#[derive(Clone)]
pub struct BfvHandleService {
    params: Arc<BfvParameters>,
    pk: PublicKey,
    sk: Arc<SecretKey>,
    proof_key: [u8; 32],
    rng: SharedRng,
    store: Arc<Mutex<HandleStore>>,
}

impl BfvHandleService {
    pub fn new(config: &BfvConfig, rng: SharedRng) -> Result<Self> {
        let params = build_bfv_params_arc(config)?;
        let (sk, pk, proof_key) = {
            let mut rng = rng
                .lock()
                .map_err(|_| anyhow!("rng lock poisoned"))?;
            let sk = SecretKey::random(&params, &mut *rng);
            let pk = PublicKey::new(&sk, &mut *rng);
            let mut proof_key = [0u8; 32];
            rng.fill_bytes(&mut proof_key);
            (sk, pk, proof_key)
        };

        info!(
            degree = config.degree,
            plaintext_modulus = config.plaintext_modulus,
            "BFV handle service ready"
        );

        Ok(Self {
            params,
            pk,
            sk: Arc::new(sk),
            proof_key,
            rng,
            store: Arc::new(Mutex::new(HandleStore::default())),
        })
    }

    /// Build from node configuration, seeding the rng from `seed` when one is set.
    pub fn from_config(config: &CycleConfig) -> Result<Self> {
        let rng = match config.seed {
            Some(seed) => ChaCha20Rng::seed_from_u64(seed),
            None => ChaCha20Rng::from_os_rng(),
        };
        Self::new(&config.bfv, Arc::new(Mutex::new(rng)))
    }

    pub fn params(&self) -> Arc<BfvParameters> {
        self.params.clone()
    }

    /// Downstream decryption path: yields the plaintext only to principals holding a grant.
    pub fn decrypt_for<T: Plaintext>(&self, principal: &Principal, handle: &Handle<T>) -> Result<T> {
        let store = self.lock()?;
        if !store.grants.contains(&(handle.id(), *principal)) {
            bail!("{} is not granted access to {}", principal, handle.id());
        }
        let value = self.decrypt(store.get(handle.id())?)?;
        T::from_u64(value)
    }

    pub fn pending_reveals(&self) -> Result<Vec<RequestId>> {
        Ok(self.lock()?.pending.keys().copied().collect())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HandleStore>> {
        self.store
            .lock()
            .map_err(|_| anyhow!("handle store lock poisoned"))
    }

    fn encrypt_u64(&self, value: u64) -> Result<Ciphertext> {
        if value >= self.params.plaintext() {
            bail!(
                "{} exceeds the plaintext modulus {}",
                value,
                self.params.plaintext()
            );
        }
        let pt = bfv::Plaintext::try_encode(&vec![value], Encoding::poly(), &self.params)
            .map_err(|e| anyhow!("Error encoding plaintext: {e}"))?;
        let mut rng = self.rng.lock().map_err(|_| anyhow!("rng lock poisoned"))?;
        self.pk
            .try_encrypt(&pt, &mut *rng)
            .map_err(|e| anyhow!("Error encrypting data: {e}"))
    }

    fn decrypt(&self, ct: &Ciphertext) -> Result<u64> {
        let pt = self
            .sk
            .try_decrypt(ct)
            .map_err(|e| anyhow!("Error decrypting ciphertext: {e}"))?;
        let decoded = Vec::<u64>::try_decode(&pt, Encoding::poly())
            .map_err(|e| anyhow!("Error decoding plaintext: {e}"))?;
        decoded
            .first()
            .copied()
            .context("Decoded plaintext was empty")
    }

    fn proof_for(&self, request_id: RequestId, plaintext: u64) -> RevealProof {
        let mut hasher = Sha256::new();
        hasher.update(self.proof_key);
        hasher.update(request_id.0.to_be_bytes());
        hasher.update(plaintext.to_be_bytes());
        RevealProof(hasher.finalize().into())
    }
}

impl CiphertextHandleService for BfvHandleService {
    fn zero<T: Plaintext>(&self) -> Result<Handle<T>> {
        let ct = Ciphertext::zero(&self.params);
        Ok(Handle::new(self.lock()?.insert(ct)))
    }

    fn encrypt<T: Plaintext>(&self, value: T) -> Result<Handle<T>> {
        let ct = self.encrypt_u64(value.to_u64())?;
        Ok(Handle::new(self.lock()?.insert(ct)))
    }

    fn add<T: Plaintext>(&self, a: &Handle<T>, b: &Handle<T>) -> Result<Handle<T>> {
        let mut store = self.lock()?;
        let mut sum = store.get(a.id())?.clone();
        sum += store.get(b.id())?;
        Ok(Handle::new(store.insert(sum)))
    }

    fn grant<T: Plaintext>(&self, handle: &Handle<T>, principal: Principal) -> Result<()> {
        let mut store = self.lock()?;
        store.get(handle.id())?;
        store.grants.insert((handle.id(), principal));
        Ok(())
    }

    fn is_granted<T: Plaintext>(&self, handle: &Handle<T>, principal: &Principal) -> bool {
        self.lock()
            .map(|store| store.grants.contains(&(handle.id(), *principal)))
            .unwrap_or(false)
    }

    fn request_reveal<T: Plaintext>(&self, handle: &Handle<T>) -> Result<RequestId> {
        let mut store = self.lock()?;
        store.get(handle.id())?;
        if !store.grants.contains(&(handle.id(), Principal::System)) {
            bail!("System is not granted access to {}", handle.id());
        }
        store.next_request += 1;
        let request_id = RequestId(store.next_request);
        store.pending.insert(request_id, handle.id());
        info!(request = %request_id, handle = %handle.id(), "reveal requested");
        Ok(request_id)
    }

    fn verify_reveal(&self, request_id: RequestId, plaintext: u64, proof: &RevealProof) -> bool {
        self.proof_for(request_id, plaintext) == *proof
    }

    fn plaintext_modulus(&self) -> u64 {
        self.params.plaintext()
    }
}

impl RevealFulfiller for BfvHandleService {
    fn fulfil(&self, request_id: RequestId) -> Result<(u64, RevealProof)> {
        let mut store = self.lock()?;
        let Some(handle) = store.pending.remove(&request_id) else {
            warn!(request = %request_id, "no pending reveal");
            bail!("No pending reveal for {}", request_id);
        };
        let value = self.decrypt(store.get(handle)?)?;
        Ok((value, self.proof_for(request_id, value)))
    }
}
