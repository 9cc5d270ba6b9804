//! Metadata V10 to V13: types are inline name strings and calls are listed per module.

use codec::{Decode, Encode};

use crate::error::{WalletError, WalletResult};
use crate::hashing::StorageHasher;
use crate::metadata::storage::StorageEntry;
use crate::metadata::{CallIndex, RegistryBuilder};

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct MetadataV10 {
    pub modules: Vec<ModuleMetadataV10>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct MetadataV11 {
    pub modules: Vec<ModuleMetadataV10>,
    pub extrinsic: ExtrinsicMetadata,
}

/// Shared by V12 and V13; V13 only adds the `NMap` storage kind.
#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct MetadataV12 {
    pub modules: Vec<ModuleMetadataV12>,
    pub extrinsic: ExtrinsicMetadata,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct ModuleMetadataV10 {
    pub name: String,
    pub storage: Option<StorageMetadata>,
    pub calls: Option<Vec<FunctionMetadata>>,
    pub events: Option<Vec<EventMetadata>>,
    pub constants: Vec<ModuleConstantMetadata>,
    pub errors: Vec<ErrorMetadata>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct ModuleMetadataV12 {
    pub name: String,
    pub storage: Option<StorageMetadata>,
    pub calls: Option<Vec<FunctionMetadata>>,
    pub events: Option<Vec<EventMetadata>>,
    pub constants: Vec<ModuleConstantMetadata>,
    pub errors: Vec<ErrorMetadata>,
    pub index: u8,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct StorageMetadata {
    pub prefix: String,
    pub entries: Vec<StorageEntryMetadata>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct StorageEntryMetadata {
    pub name: String,
    pub modifier: StorageEntryModifier,
    pub ty: StorageEntryType,
    pub default: Vec<u8>,
    pub documentation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub enum StorageEntryModifier {
    Optional,
    Default,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub enum StorageEntryType {
    Plain(String),
    Map {
        hasher: LegacyHasher,
        key: String,
        value: String,
        // `is_linked` before V11, unused afterwards
        linked: bool,
    },
    DoubleMap {
        hasher: LegacyHasher,
        key1: String,
        key2: String,
        value: String,
        key2_hasher: LegacyHasher,
    },
    NMap {
        keys: String,
        hashers: Vec<LegacyHasher>,
        value: String,
    },
}

/// `Identity` first appears in V11.
#[derive(Debug, Clone, Copy, PartialEq, Encode, Decode)]
pub enum LegacyHasher {
    Blake2_128,
    Blake2_256,
    Blake2_128Concat,
    Twox128,
    Twox256,
    Twox64Concat,
    Identity,
}

impl From<LegacyHasher> for StorageHasher {
    fn from(value: LegacyHasher) -> Self {
        match value {
            LegacyHasher::Blake2_128 => StorageHasher::Blake2_128,
            LegacyHasher::Blake2_256 => StorageHasher::Blake2_256,
            LegacyHasher::Blake2_128Concat => StorageHasher::Blake2_128Concat,
            LegacyHasher::Twox128 => StorageHasher::Twox128,
            LegacyHasher::Twox256 => StorageHasher::Twox256,
            LegacyHasher::Twox64Concat => StorageHasher::Twox64Concat,
            LegacyHasher::Identity => StorageHasher::Identity,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct FunctionMetadata {
    pub name: String,
    pub arguments: Vec<FunctionArgumentMetadata>,
    pub documentation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct FunctionArgumentMetadata {
    pub name: String,
    pub ty: String,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct EventMetadata {
    pub name: String,
    pub arguments: Vec<String>,
    pub documentation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct ModuleConstantMetadata {
    pub name: String,
    pub ty: String,
    pub value: Vec<u8>,
    pub documentation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct ErrorMetadata {
    pub name: String,
    pub documentation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Encode, Decode)]
pub struct ExtrinsicMetadata {
    pub version: u8,
    pub signed_extensions: Vec<String>,
}

/// Module contents common to every legacy version.
struct LegacyModule<'a> {
    name: &'a str,
    index: u8,
    storage: Option<&'a StorageMetadata>,
    calls: Option<&'a [FunctionMetadata]>,
    constants: &'a [ModuleConstantMetadata],
}

/// Decodes the body that follows the magic and version byte.
pub(crate) fn decode(version: u8, body: &[u8], builder: &mut RegistryBuilder) -> WalletResult<()> {
    let mut input = body;
    match version {
        10 => {
            let meta = MetadataV10::decode(&mut input)?;
            collect(version, positional(&meta.modules), builder)?;
        }
        11 => {
            let meta = MetadataV11::decode(&mut input)?;
            collect(version, positional(&meta.modules), builder)?;
            builder.extrinsic_version(meta.extrinsic.version);
        }
        12 | 13 => {
            let meta = MetadataV12::decode(&mut input)?;
            let modules = meta.modules.iter().map(|module| LegacyModule {
                name: &module.name,
                index: module.index,
                storage: module.storage.as_ref(),
                calls: module.calls.as_deref(),
                constants: &module.constants,
            });
            collect(version, modules.collect(), builder)?;
            builder.extrinsic_version(meta.extrinsic.version);
        }
        other => {
            return Err(WalletError::unsupported(format!("legacy metadata version {other}")))
        }
    }
    Ok(())
}

/// Before V12 a module's call index is its position among the modules that have calls.
fn positional(modules: &[ModuleMetadataV10]) -> Vec<LegacyModule<'_>> {
    let mut next_index = 0u8;
    modules
        .iter()
        .map(|module| {
            let index = next_index;
            if module.calls.is_some() {
                next_index = next_index.wrapping_add(1);
            }
            LegacyModule {
                name: &module.name,
                index,
                storage: module.storage.as_ref(),
                calls: module.calls.as_deref(),
                constants: &module.constants,
            }
        })
        .collect()
}

fn collect(version: u8, modules: Vec<LegacyModule<'_>>, builder: &mut RegistryBuilder) -> WalletResult<()> {
    for module in modules {
        if let Some(calls) = module.calls {
            for (call_index, call) in calls.iter().enumerate() {
                let call_index = u8::try_from(call_index).map_err(|_| {
                    WalletError::invalid(format!("module {} declares more than 256 calls", module.name))
                })?;
                builder.call(
                    module.name,
                    &call.name,
                    CallIndex {
                        pallet_index: module.index,
                        call_index,
                    },
                );
            }
        }
        if let Some(storage) = module.storage {
            for entry in &storage.entries {
                let hashers = match &entry.ty {
                    StorageEntryType::Plain(_) => Vec::new(),
                    StorageEntryType::Map { hasher, .. } => vec![(*hasher).into()],
                    StorageEntryType::DoubleMap {
                        hasher, key2_hasher, ..
                    } => vec![(*hasher).into(), (*key2_hasher).into()],
                    StorageEntryType::NMap { hashers, .. } if version >= 13 => {
                        hashers.iter().map(|h| (*h).into()).collect()
                    }
                    StorageEntryType::NMap { .. } => {
                        return Err(WalletError::invalid(format!(
                            "NMap storage entry {}.{} in V{version} metadata",
                            storage.prefix, entry.name
                        )))
                    }
                };
                builder.storage(module.name, StorageEntry::new(&storage.prefix, &entry.name, hashers));
            }
        }
        for constant in module.constants {
            builder.constant(module.name, &constant.name, constant.value.clone());
        }
    }
    Ok(())
}
