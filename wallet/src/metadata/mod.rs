//! Runtime metadata decoding.
//!
//! A chain describes its callable operations, storage layout and constants in a
//! versioned metadata blob (`state_getMetadata`). [`MetadataRegistry::decode`] reads the
//! `"meta"` magic and the format version, dispatches to the matching parser and flattens
//! the result into name-keyed lookup tables.

pub mod legacy;
pub mod modern;
pub mod storage;

use std::collections::HashMap;

use codec::Decode;
use tracing::debug;

use crate::error::{WalletError, WalletResult};

pub use storage::StorageEntry;

/// `b"meta"` read as a little-endian u32.
pub const METADATA_MAGIC: u32 = 0x6174_656d;

pub const MIN_METADATA_VERSION: u8 = 10;
pub const MAX_METADATA_VERSION: u8 = 16;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CallIndex {
    pub pallet_index: u8,
    pub call_index: u8,
}

impl CallIndex {
    pub fn new(pallet_index: u8, call_index: u8) -> Self {
        Self {
            pallet_index,
            call_index,
        }
    }
}

type Key = (String, String);

fn key(module: &str, name: &str) -> Key {
    (module.to_string(), name.to_string())
}

#[derive(Default)]
pub(crate) struct RegistryBuilder {
    calls: HashMap<Key, CallIndex>,
    storage: HashMap<Key, StorageEntry>,
    constants: HashMap<Key, Vec<u8>>,
    extrinsic_version: Option<u8>,
}

impl RegistryBuilder {
    pub(crate) fn call(&mut self, module: &str, name: &str, index: CallIndex) {
        self.calls.insert(key(module, name), index);
    }

    pub(crate) fn storage(&mut self, module: &str, entry: StorageEntry) {
        self.storage.insert(key(module, entry.name()), entry);
    }

    pub(crate) fn constant(&mut self, module: &str, name: &str, value: Vec<u8>) {
        self.constants.insert(key(module, name), value);
    }

    pub(crate) fn extrinsic_version(&mut self, version: u8) {
        self.extrinsic_version = Some(version);
    }
}

/// Name-keyed view of one runtime's metadata.
#[derive(Clone, Debug)]
pub struct MetadataRegistry {
    version: u8,
    runtime_version: Option<u32>,
    extrinsic_version: Option<u8>,
    calls: HashMap<Key, CallIndex>,
    reverse_calls: HashMap<CallIndex, Key>,
    storage: HashMap<Key, StorageEntry>,
    constants: HashMap<Key, Vec<u8>>,
}

impl MetadataRegistry {
    pub fn decode(bytes: &[u8], runtime_version: Option<u32>) -> WalletResult<Self> {
        let mut input = bytes;
        let magic = u32::decode(&mut input)
            .map_err(|_| WalletError::invalid("metadata too short for magic prefix"))?;
        if magic != METADATA_MAGIC {
            return Err(WalletError::invalid(format!(
                "metadata magic mismatch: 0x{magic:08x}"
            )));
        }
        let version = u8::decode(&mut input)
            .map_err(|_| WalletError::invalid("metadata missing version byte"))?;
        if !(MIN_METADATA_VERSION..=MAX_METADATA_VERSION).contains(&version) {
            return Err(WalletError::unsupported(format!("metadata version {version}")));
        }

        let mut builder = RegistryBuilder::default();
        if version < 14 {
            legacy::decode(version, input, &mut builder)?;
        } else {
            modern::decode(bytes, &mut builder)?;
        }

        let reverse_calls = builder
            .calls
            .iter()
            .map(|(name, index)| (*index, name.clone()))
            .collect();
        debug!(
            version,
            calls = builder.calls.len(),
            storage = builder.storage.len(),
            constants = builder.constants.len(),
            "decoded runtime metadata"
        );
        Ok(Self {
            version,
            runtime_version,
            extrinsic_version: builder.extrinsic_version,
            calls: builder.calls,
            reverse_calls,
            storage: builder.storage,
            constants: builder.constants,
        })
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn runtime_version(&self) -> Option<u32> {
        self.runtime_version
    }

    /// Extrinsic format version declared by the runtime, absent before V11.
    pub fn extrinsic_version(&self) -> Option<u8> {
        self.extrinsic_version
    }

    pub fn call(&self, module: &str, name: &str) -> WalletResult<CallIndex> {
        self.calls
            .get(&key(module, name))
            .copied()
            .ok_or_else(|| WalletError::invalid(format!("call {module}.{name} not found in metadata")))
    }

    pub fn has_call(&self, module: &str, name: &str) -> bool {
        self.calls.contains_key(&key(module, name))
    }

    /// `(module, call)` names for a call index.
    pub fn call_name(&self, index: CallIndex) -> Option<(&str, &str)> {
        self.reverse_calls
            .get(&index)
            .map(|(module, name)| (module.as_str(), name.as_str()))
    }

    pub fn constant(&self, module: &str, name: &str) -> WalletResult<&[u8]> {
        self.constants
            .get(&key(module, name))
            .map(Vec::as_slice)
            .ok_or_else(|| {
                WalletError::invalid(format!("constant {module}.{name} not found in metadata"))
            })
    }

    /// Decodes a constant with its codec type.
    pub fn constant_as<T: Decode>(&self, module: &str, name: &str) -> WalletResult<T> {
        let mut raw = self.constant(module, name)?;
        T::decode(&mut raw).map_err(|e| {
            WalletError::Serialization(format!("failed to decode constant {module}.{name}: {e}"))
        })
    }

    pub fn storage_entry(&self, module: &str, name: &str) -> WalletResult<&StorageEntry> {
        self.storage.get(&key(module, name)).ok_or_else(|| {
            WalletError::invalid(format!("storage entry {module}.{name} not found in metadata"))
        })
    }
}
