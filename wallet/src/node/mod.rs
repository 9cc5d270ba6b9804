//! Node access.
//!
//! [`NodeClient`] is everything the transaction pipeline needs from a chain: account
//! state, block hashes, runtime version and metadata, fee quotes and submission.
//! [`rpc::RpcNodeClient`] implements it over a jsonrpsee WebSocket connection.

pub mod cache;
pub mod rpc;

use std::sync::Arc;

use async_trait::async_trait;
use codec::{Decode, Encode};
use serde::{Deserialize, Serialize};

use crate::address::Address;
use crate::config::ChainConfig;
use crate::error::WalletResult;
use crate::metadata::MetadataRegistry;
use crate::scale::Hash;

pub use cache::TtlCache;
pub use rpc::RpcNodeClient;

/// `frame_system::AccountInfo` with `pallet_balances::AccountData`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Encode, Decode)]
pub struct AccountInfo {
    pub nonce: u32,
    pub consumers: u32,
    pub providers: u32,
    pub sufficients: u32,
    pub free: u128,
    pub reserved: u128,
    pub frozen: u128,
    pub flags: u128,
}

impl AccountInfo {
    /// Free balance not held back by freezes. Frozen funds may overlap reserved ones.
    pub fn transferable(&self) -> u128 {
        self.free
            .saturating_sub(self.frozen.saturating_sub(self.reserved))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuntimeVersion {
    pub spec_version: u32,
    pub transaction_version: u32,
}

#[async_trait]
pub trait NodeClient: Send + Sync {
    fn config(&self) -> &Arc<ChainConfig>;

    /// Decoded runtime metadata; fetched once per client.
    async fn metadata(&self) -> WalletResult<Arc<MetadataRegistry>>;

    /// Account state; a default (all-zero) record for accounts the chain does not know.
    async fn get_account_info(&self, address: &Address) -> WalletResult<AccountInfo>;

    async fn get_existential_deposit(&self) -> WalletResult<u128>;

    async fn get_current_height(&self) -> WalletResult<u64>;

    /// Genesis hash.
    async fn get_first_block_hash(&self) -> WalletResult<Hash>;

    /// Hash of the best block.
    async fn get_last_block_hash(&self) -> WalletResult<Hash>;

    async fn get_block_hash(&self, number: u64) -> WalletResult<Hash>;

    async fn get_runtime_version(&self) -> WalletResult<RuntimeVersion>;

    /// Partial fee quoted by `payment_queryInfo` for an encoded extrinsic.
    async fn get_transfer_fee_estimate(&self, encoded: &[u8]) -> WalletResult<u128>;

    async fn submit_transaction(&self, encoded: &[u8]) -> WalletResult<Hash>;

    /// Raw JSON-RPC passthrough.
    async fn rpc(&self, method: &str, params: Vec<serde_json::Value>) -> WalletResult<serde_json::Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_info_layout() {
        let info = AccountInfo {
            nonce: 3,
            providers: 1,
            free: 1_000,
            reserved: 100,
            frozen: 300,
            ..AccountInfo::default()
        };
        let encoded = info.encode();
        assert_eq!(encoded.len(), 16 + 64);
        assert_eq!(&encoded[..4], &3u32.to_le_bytes());
        assert_eq!(&encoded[16..32], &1_000u128.to_le_bytes());
        assert_eq!(AccountInfo::decode(&mut &encoded[..]).unwrap(), info);
        assert_eq!(info.transferable(), 800);
    }

    #[test]
    fn reserved_covers_frozen() {
        let info = AccountInfo {
            free: 500,
            reserved: 400,
            frozen: 300,
            ..AccountInfo::default()
        };
        assert_eq!(info.transferable(), 500);
    }

    #[test]
    fn runtime_version_from_rpc_json() {
        let json = r#"{"specName":"polkadot","specVersion":1002005,"transactionVersion":26}"#;
        let version: RuntimeVersion = serde_json::from_str(json).unwrap();
        assert_eq!(version.spec_version, 1_002_005);
        assert_eq!(version.transaction_version, 26);
    }
}
