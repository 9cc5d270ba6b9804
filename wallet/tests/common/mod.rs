#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use codec::Encode;
use frame_metadata::v14::{
    ExtrinsicMetadata, PalletCallMetadata, PalletConstantMetadata, PalletMetadata,
    PalletStorageMetadata, RuntimeMetadataV14, StorageEntryMetadata, StorageEntryModifier,
    StorageEntryType, StorageHasher,
};
use frame_metadata::{RuntimeMetadata, RuntimeMetadataPrefixed, META_RESERVED};
use parking_lot::Mutex;
use scale_info::{meta_type, TypeInfo};
use serde_json::Value;
use substrate_wallet::hashing::blake2_256;
use substrate_wallet::{
    AccountInfo, Address, ChainConfig, Hash, MetadataRegistry, NodeClient, RuntimeVersion,
    WalletError, WalletResult,
};

pub const SPEC_VERSION: u32 = 1_000;
pub const HEIGHT: u64 = 1_000;

#[allow(non_camel_case_types)]
#[derive(TypeInfo)]
enum BalancesCall {
    #[codec(index = 0)]
    transfer_allow_death { dest: [u8; 32], value: u128 },
    #[codec(index = 3)]
    transfer_keep_alive { dest: [u8; 32], value: u128 },
}

#[allow(non_camel_case_types)]
#[derive(TypeInfo)]
enum SystemCall {
    #[codec(index = 0)]
    remark { remark: Vec<u8> },
}

#[allow(non_camel_case_types)]
#[derive(TypeInfo)]
enum UtilityCall {
    #[codec(index = 0)]
    batch { calls: Vec<u8> },
    #[codec(index = 2)]
    batch_all { calls: Vec<u8> },
}

#[derive(TypeInfo)]
struct Runtime;

/// V14 metadata of a runtime where `Balances.transfer` was renamed to
/// `transfer_allow_death`.
pub fn metadata_blob() -> Vec<u8> {
    let pallet = |name: &'static str, index: u8, calls: scale_info::MetaType| PalletMetadata {
        name,
        storage: None,
        calls: Some(PalletCallMetadata { ty: calls }),
        event: None,
        constants: vec![],
        error: None,
        index,
    };
    let mut system = pallet("System", 0, meta_type::<SystemCall>());
    system.storage = Some(PalletStorageMetadata {
        prefix: "System",
        entries: vec![StorageEntryMetadata {
            name: "Account",
            modifier: StorageEntryModifier::Default,
            ty: StorageEntryType::Map {
                hashers: vec![StorageHasher::Blake2_128Concat],
                key: meta_type::<[u8; 32]>(),
                value: meta_type::<u128>(),
            },
            default: vec![],
            docs: vec![],
        }],
    });
    let mut balances = pallet("Balances", 4, meta_type::<BalancesCall>());
    balances.constants = vec![PalletConstantMetadata {
        name: "ExistentialDeposit",
        ty: meta_type::<u128>(),
        value: 1_000_000u128.encode(),
        docs: vec![],
    }];
    let pallets = vec![system, balances, pallet("Utility", 26, meta_type::<UtilityCall>())];
    let extrinsic = ExtrinsicMetadata {
        ty: meta_type::<Vec<u8>>(),
        version: 4,
        signed_extensions: vec![],
    };
    let metadata = RuntimeMetadataV14::new(pallets, extrinsic, meta_type::<Runtime>());
    RuntimeMetadataPrefixed(META_RESERVED, RuntimeMetadata::V14(metadata)).encode()
}

/// In-process node: fixed chain state, a constant fee per quote, and a record of every
/// quoted and submitted extrinsic.
pub struct MockNode {
    config: Arc<ChainConfig>,
    metadata: Arc<MetadataRegistry>,
    pub nonce: u32,
    pub fee: u128,
    pub account_queries: AtomicUsize,
    /// When set, fee quotes fail as if `payment_queryInfo` were unavailable.
    pub fail_quotes: AtomicBool,
    pub quoted: Mutex<Vec<Vec<u8>>>,
    pub submitted: Mutex<Vec<Vec<u8>>>,
}

/// Log output for failing tests; filter with `RUST_LOG`.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

impl MockNode {
    pub fn new(config: ChainConfig, nonce: u32, fee: u128) -> Arc<Self> {
        init_tracing();
        let metadata = MetadataRegistry::decode(&metadata_blob(), Some(SPEC_VERSION)).unwrap();
        Arc::new(Self {
            config: Arc::new(config),
            metadata: Arc::new(metadata),
            nonce,
            fee,
            account_queries: AtomicUsize::new(0),
            fail_quotes: AtomicBool::new(false),
            quoted: Mutex::new(Vec::new()),
            submitted: Mutex::new(Vec::new()),
        })
    }

    pub fn quotes(&self) -> usize {
        self.quoted.lock().len()
    }
}

fn block_hash(number: u64) -> Hash {
    Hash::new(blake2_256(&number.to_le_bytes()).to_vec())
}

#[async_trait]
impl NodeClient for MockNode {
    fn config(&self) -> &Arc<ChainConfig> {
        &self.config
    }

    async fn metadata(&self) -> WalletResult<Arc<MetadataRegistry>> {
        Ok(self.metadata.clone())
    }

    async fn get_account_info(&self, _address: &Address) -> WalletResult<AccountInfo> {
        self.account_queries.fetch_add(1, Ordering::SeqCst);
        Ok(AccountInfo {
            nonce: self.nonce,
            providers: 1,
            free: 10_000_000_000,
            ..AccountInfo::default()
        })
    }

    async fn get_existential_deposit(&self) -> WalletResult<u128> {
        self.metadata.constant_as::<u128>("Balances", "ExistentialDeposit")
    }

    async fn get_current_height(&self) -> WalletResult<u64> {
        Ok(HEIGHT)
    }

    async fn get_first_block_hash(&self) -> WalletResult<Hash> {
        Ok(block_hash(0))
    }

    async fn get_last_block_hash(&self) -> WalletResult<Hash> {
        Ok(block_hash(HEIGHT))
    }

    async fn get_block_hash(&self, number: u64) -> WalletResult<Hash> {
        Ok(block_hash(number))
    }

    async fn get_runtime_version(&self) -> WalletResult<RuntimeVersion> {
        Ok(RuntimeVersion {
            spec_version: SPEC_VERSION,
            transaction_version: 26,
        })
    }

    async fn get_transfer_fee_estimate(&self, encoded: &[u8]) -> WalletResult<u128> {
        if self.fail_quotes.load(Ordering::SeqCst) {
            return Err(WalletError::Rpc("payment_queryInfo failed: method unavailable".into()));
        }
        self.quoted.lock().push(encoded.to_vec());
        Ok(self.fee)
    }

    async fn submit_transaction(&self, encoded: &[u8]) -> WalletResult<Hash> {
        self.submitted.lock().push(encoded.to_vec());
        Ok(Hash::new(blake2_256(encoded).to_vec()))
    }

    async fn rpc(&self, method: &str, _params: Vec<Value>) -> WalletResult<Value> {
        Err(WalletError::unsupported(format!("mock node has no {method}")))
    }
}
