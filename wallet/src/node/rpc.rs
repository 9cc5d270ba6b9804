//! WebSocket JSON-RPC node client.
//!
//! Read-only queries are memoized for a third of the block time. Runtime metadata is
//! fetched at most once per client: concurrent callers wait on the same fetch, and a
//! failed fetch is retried once before the error is returned.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use codec::Decode;
use jsonrpsee::core::client::ClientT;
use jsonrpsee::core::params::ArrayParams;
use jsonrpsee::ws_client::{WsClient, WsClientBuilder};
use serde_json::{json, Value};
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, info, warn};

use crate::address::Address;
use crate::config::{ChainConfig, RpcConfig};
use crate::error::{WalletError, WalletResult};
use crate::metadata::MetadataRegistry;
use crate::node::cache::TtlCache;
use crate::node::{AccountInfo, NodeClient, RuntimeVersion};
use crate::scale::{Hash, ScaleContext, ScaleValue};

const METADATA_ATTEMPTS: u32 = 2;

/// Methods whose responses may be served from the cache.
const CACHEABLE: &[&str] = &[
    "chain_getBlockHash",
    "chain_getHeader",
    "state_getRuntimeVersion",
    "state_getStorage",
];

pub struct RpcNodeClient {
    client: Arc<RwLock<WsClient>>,
    rpc_config: RpcConfig,
    config: Arc<ChainConfig>,
    cache: TtlCache,
    metadata: OnceCell<Arc<MetadataRegistry>>,
}

impl RpcNodeClient {
    pub async fn connect(config: Arc<ChainConfig>, endpoint: &str) -> WalletResult<Self> {
        Self::connect_with_config(config, RpcConfig::with_endpoint(endpoint)).await
    }

    pub async fn connect_with_config(config: Arc<ChainConfig>, rpc_config: RpcConfig) -> WalletResult<Self> {
        let client = Self::build_client(&rpc_config).await?;
        info!(endpoint = %rpc_config.endpoint, chain = %config.name, "connected to node");
        Ok(Self {
            client: Arc::new(RwLock::new(client)),
            cache: TtlCache::new(config.cache_ttl()),
            rpc_config,
            config,
            metadata: OnceCell::new(),
        })
    }

    async fn build_client(config: &RpcConfig) -> WalletResult<WsClient> {
        WsClientBuilder::default()
            .connection_timeout(config.connection_timeout)
            .request_timeout(config.request_timeout)
            .build(&config.endpoint)
            .await
            .map_err(|e| WalletError::Network(format!("failed to connect to {}: {e}", config.endpoint)))
    }

    /// Reconnects with bounded retries if the socket dropped.
    async fn ensure_connected(&self) -> WalletResult<()> {
        let client = self.client.read().await;
        if client.is_connected() {
            return Ok(());
        }
        drop(client);

        let mut attempts = 0;
        loop {
            attempts += 1;
            match Self::build_client(&self.rpc_config).await {
                Ok(new_client) => {
                    *self.client.write().await = new_client;
                    info!(attempts, "reconnected to node");
                    return Ok(());
                }
                Err(e) => {
                    if attempts >= self.rpc_config.max_reconnect_attempts {
                        return Err(e);
                    }
                    warn!(attempts, error = %e, "reconnect failed");
                    tokio::time::sleep(self.rpc_config.reconnect_delay).await;
                }
            }
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.rpc_config.endpoint
    }

    pub async fn is_connected(&self) -> bool {
        self.client.read().await.is_connected()
    }

    async fn request(&self, method: &str, params: Vec<Value>) -> WalletResult<Value> {
        let cacheable = CACHEABLE.contains(&method);
        let key = TtlCache::key(method, &params);
        if cacheable {
            if let Some(hit) = self.cache.get(&key) {
                debug!(method, "rpc cache hit");
                return Ok(hit);
            }
        }

        self.ensure_connected().await?;
        let mut array = ArrayParams::new();
        for param in params {
            array.insert(param)?;
        }
        let client = self.client.read().await;
        let response: Value = client
            .request(method, array)
            .await
            .map_err(|e| WalletError::Rpc(format!("{method} failed: {e}")))?;
        if cacheable {
            self.cache.insert(key, response.clone());
        }
        Ok(response)
    }

    async fn hash_request(&self, params: Vec<Value>) -> WalletResult<Hash> {
        let response = self.request("chain_getBlockHash", params).await?;
        let hash = response
            .as_str()
            .ok_or_else(|| WalletError::Rpc(format!("unexpected block hash response {response}")))?;
        Hash::from_hex(hash)
    }

    async fn fetch_metadata(&self) -> WalletResult<MetadataRegistry> {
        let version = self.get_runtime_version().await?;
        let response = self.request("state_getMetadata", Vec::new()).await?;
        let blob = response
            .as_str()
            .ok_or_else(|| WalletError::Rpc("state_getMetadata returned a non-string".into()))?;
        let bytes = hex::decode(blob.trim_start_matches("0x"))?;
        MetadataRegistry::decode(&bytes, Some(version.spec_version))
    }
}

/// Initializes `cell` with at most `attempts` calls to `fetch`.
///
/// Concurrent callers wait on the same initialization. Once it fails `attempts` times the
/// error is returned and the cell stays empty, so a later call starts over.
async fn load_once<T, F, Fut>(cell: &OnceCell<Arc<T>>, attempts: u32, fetch: F) -> WalletResult<Arc<T>>
where
    F: Fn() -> Fut,
    Fut: Future<Output = WalletResult<T>>,
{
    cell.get_or_try_init(|| async {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match fetch().await {
                Ok(value) => {
                    info!(attempt, "runtime metadata loaded");
                    return Ok(Arc::new(value));
                }
                Err(e) if attempt < attempts => {
                    warn!(attempt, error = %e, "metadata fetch failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    })
    .await
    .cloned()
}

fn parse_number(value: &Value) -> WalletResult<u128> {
    match value {
        Value::Number(n) => n
            .as_u64()
            .map(u128::from)
            .ok_or_else(|| WalletError::Rpc(format!("expected unsigned integer, got {n}"))),
        Value::String(s) if s.starts_with("0x") => u128::from_str_radix(&s[2..], 16)
            .map_err(|e| WalletError::Rpc(format!("invalid hex number {s}: {e}"))),
        Value::String(s) => s
            .parse()
            .map_err(|e| WalletError::Rpc(format!("invalid number {s}: {e}"))),
        other => Err(WalletError::Rpc(format!("expected number, got {other}"))),
    }
}

#[async_trait]
impl NodeClient for RpcNodeClient {
    fn config(&self) -> &Arc<ChainConfig> {
        &self.config
    }

    async fn metadata(&self) -> WalletResult<Arc<MetadataRegistry>> {
        load_once(&self.metadata, METADATA_ATTEMPTS, || self.fetch_metadata()).await
    }

    async fn get_account_info(&self, address: &Address) -> WalletResult<AccountInfo> {
        let metadata = self.metadata().await?;
        let ctx = ScaleContext::new(self.config.clone());
        let key = metadata
            .storage_entry("System", "Account")?
            .key_hex(&ctx, &[ScaleValue::AccountId(address.clone())])?;
        let response = self.request("state_getStorage", vec![json!(key)]).await?;
        let Some(stored) = response.as_str() else {
            return Ok(AccountInfo::default());
        };
        let bytes = hex::decode(stored.trim_start_matches("0x"))?;
        Ok(AccountInfo::decode(&mut &bytes[..])?)
    }

    async fn get_existential_deposit(&self) -> WalletResult<u128> {
        self.metadata()
            .await?
            .constant_as::<u128>("Balances", "ExistentialDeposit")
    }

    async fn get_current_height(&self) -> WalletResult<u64> {
        let header = self.request("chain_getHeader", Vec::new()).await?;
        let number = parse_number(&header["number"])?;
        u64::try_from(number).map_err(|_| WalletError::Rpc(format!("block number {number} out of range")))
    }

    async fn get_first_block_hash(&self) -> WalletResult<Hash> {
        self.hash_request(vec![json!(0)]).await
    }

    async fn get_last_block_hash(&self) -> WalletResult<Hash> {
        self.hash_request(Vec::new()).await
    }

    async fn get_block_hash(&self, number: u64) -> WalletResult<Hash> {
        self.hash_request(vec![json!(number)]).await
    }

    async fn get_runtime_version(&self) -> WalletResult<RuntimeVersion> {
        let response = self.request("state_getRuntimeVersion", Vec::new()).await?;
        Ok(serde_json::from_value(response)?)
    }

    async fn get_transfer_fee_estimate(&self, encoded: &[u8]) -> WalletResult<u128> {
        let response = self
            .request("payment_queryInfo", vec![json!(format!("0x{}", hex::encode(encoded)))])
            .await?;
        let fee = parse_number(&response["partialFee"])?;
        debug!(fee, "fee quote");
        Ok(fee)
    }

    async fn submit_transaction(&self, encoded: &[u8]) -> WalletResult<Hash> {
        let response = self
            .request("author_submitExtrinsic", vec![json!(format!("0x{}", hex::encode(encoded)))])
            .await?;
        let hash = response
            .as_str()
            .ok_or_else(|| WalletError::Rpc(format!("unexpected submission response {response}")))?;
        info!(hash, "extrinsic submitted");
        Hash::from_hex(hash)
    }

    async fn rpc(&self, method: &str, params: Vec<Value>) -> WalletResult<Value> {
        self.request(method, params).await
    }
}
