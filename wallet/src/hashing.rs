//! Hash functions used by addresses, storage keys and signing payloads.

use std::hash::Hasher;

use blake2::digest::consts::U16;
use blake2::{Blake2b, Blake2b512, Digest};
use serde::{Deserialize, Serialize};
use sha3::Keccak256;
use twox_hash::XxHash64;

/// Blake2b-128 hash
pub fn blake2_128(data: &[u8]) -> [u8; 16] {
    type Blake2b128 = Blake2b<U16>;
    let hash = Blake2b128::digest(data);
    let mut result = [0u8; 16];
    result.copy_from_slice(&hash);
    result
}

/// Blake2-256 hash (Blake2b with 256-bit output, matching Substrate)
pub fn blake2_256(data: &[u8]) -> [u8; 32] {
    sp_crypto_hashing::blake2_256(data)
}

pub fn blake2_512(parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = Blake2b512::new();
    for part in parts {
        hasher.update(part);
    }
    let hash = hasher.finalize();
    let mut result = [0u8; 64];
    result.copy_from_slice(&hash);
    result
}

pub fn keccak_256(data: &[u8]) -> [u8; 32] {
    let hash = Keccak256::digest(data);
    let mut result = [0u8; 32];
    result.copy_from_slice(&hash);
    result
}

fn twox(data: &[u8], rounds: u64, out: &mut [u8]) {
    for seed in 0..rounds {
        let mut hasher = XxHash64::with_seed(seed);
        hasher.write(data);
        let start = (seed as usize) * 8;
        out[start..start + 8].copy_from_slice(&hasher.finish().to_le_bytes());
    }
}

pub fn twox_64(data: &[u8]) -> [u8; 8] {
    let mut result = [0u8; 8];
    twox(data, 1, &mut result);
    result
}

/// xxHash 128-bit (two rounds of xxHash64)
pub fn twox_128(data: &[u8]) -> [u8; 16] {
    let mut result = [0u8; 16];
    twox(data, 2, &mut result);
    result
}

pub fn twox_256(data: &[u8]) -> [u8; 32] {
    let mut result = [0u8; 32];
    twox(data, 4, &mut result);
    result
}

/// Hasher applied to a storage map key, as declared per entry by runtime metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageHasher {
    Blake2_128,
    Blake2_256,
    Blake2_128Concat,
    Twox128,
    Twox256,
    Twox64Concat,
    Identity,
}

impl StorageHasher {
    pub fn hash(&self, data: &[u8]) -> Vec<u8> {
        match self {
            StorageHasher::Blake2_128 => blake2_128(data).to_vec(),
            StorageHasher::Blake2_256 => blake2_256(data).to_vec(),
            StorageHasher::Blake2_128Concat => [&blake2_128(data)[..], data].concat(),
            StorageHasher::Twox128 => twox_128(data).to_vec(),
            StorageHasher::Twox256 => twox_256(data).to_vec(),
            StorageHasher::Twox64Concat => [&twox_64(data)[..], data].concat(),
            StorageHasher::Identity => data.to_vec(),
        }
    }
}
