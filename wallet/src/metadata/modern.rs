//! Metadata V14 onwards: call and storage types are indices into a portable type registry.

use codec::Decode;
use frame_metadata::{RuntimeMetadata, RuntimeMetadataPrefixed};
use scale_info::{form::PortableForm, PortableRegistry, TypeDef, Variant};

use crate::error::{WalletError, WalletResult};
use crate::hashing::StorageHasher;
use crate::metadata::storage::StorageEntry;
use crate::metadata::{CallIndex, RegistryBuilder};

macro_rules! collect_pallets {
    ($meta:expr, $builder:expr, $version:ident) => {{
        for pallet in &$meta.pallets {
            if let Some(calls) = &pallet.calls {
                for variant in call_variants(&$meta.types, &pallet.name, calls.ty.id)? {
                    $builder.call(
                        &pallet.name,
                        &variant.name,
                        CallIndex {
                            pallet_index: pallet.index,
                            call_index: variant.index,
                        },
                    );
                }
            }
            if let Some(storage) = &pallet.storage {
                for entry in &storage.entries {
                    let hashers = match &entry.ty {
                        frame_metadata::$version::StorageEntryType::Plain(_) => Vec::new(),
                        frame_metadata::$version::StorageEntryType::Map { hashers, .. } => hashers
                            .iter()
                            .map(|hasher| match hasher {
                                frame_metadata::$version::StorageHasher::Blake2_128 => StorageHasher::Blake2_128,
                                frame_metadata::$version::StorageHasher::Blake2_256 => StorageHasher::Blake2_256,
                                frame_metadata::$version::StorageHasher::Blake2_128Concat => StorageHasher::Blake2_128Concat,
                                frame_metadata::$version::StorageHasher::Twox128 => StorageHasher::Twox128,
                                frame_metadata::$version::StorageHasher::Twox256 => StorageHasher::Twox256,
                                frame_metadata::$version::StorageHasher::Twox64Concat => StorageHasher::Twox64Concat,
                                frame_metadata::$version::StorageHasher::Identity => StorageHasher::Identity,
                            })
                            .collect(),
                    };
                    $builder.storage(&pallet.name, StorageEntry::new(&storage.prefix, &entry.name, hashers));
                }
            }
            for constant in &pallet.constants {
                $builder.constant(&pallet.name, &constant.name, constant.value.clone());
            }
        }
    }};
}

pub(crate) fn decode(bytes: &[u8], builder: &mut RegistryBuilder) -> WalletResult<()> {
    let prefixed = RuntimeMetadataPrefixed::decode(&mut &bytes[..]).map_err(|e| {
        WalletError::Serialization(format!("failed to decode runtime metadata: {e}"))
    })?;
    match &prefixed.1 {
        RuntimeMetadata::V14(meta) => {
            collect_pallets!(meta, builder, v14);
            builder.extrinsic_version(meta.extrinsic.version);
        }
        RuntimeMetadata::V15(meta) => {
            collect_pallets!(meta, builder, v15);
            builder.extrinsic_version(meta.extrinsic.version);
        }
        RuntimeMetadata::V16(meta) => {
            collect_pallets!(meta, builder, v16);
            if let Some(version) = meta.extrinsic.versions.iter().copied().max() {
                builder.extrinsic_version(version);
            }
        }
        other => {
            return Err(WalletError::unsupported(format!(
                "runtime metadata version {}",
                other.version()
            )))
        }
    }
    Ok(())
}

/// Resolves a pallet's call enum and returns its variants.
fn call_variants<'a>(
    registry: &'a PortableRegistry,
    pallet_name: &str,
    call_type_id: u32,
) -> WalletResult<&'a [Variant<PortableForm>]> {
    let call_type = registry.resolve(call_type_id).ok_or_else(|| {
        WalletError::Serialization(format!(
            "runtime metadata missing call type {call_type_id} for {pallet_name}"
        ))
    })?;
    let TypeDef::Variant(variant) = &call_type.type_def else {
        return Err(WalletError::Serialization(format!(
            "runtime metadata call enum for {pallet_name} is not a variant"
        )));
    };
    Ok(&variant.variants)
}
