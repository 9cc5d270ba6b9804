use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::WalletError;

/// Account/address family used by a chain. Chosen once per configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AddressFamily {
    /// SS58 checksummed base58 over a 32-byte account id.
    Ss58 { prefix: u16 },
    /// 20-byte keccak derived account id with EIP-55 checksummed hex.
    Ethereum,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignatureScheme {
    Ed25519,
    Sr25519,
    /// Secp256k1 wrapped in a `MultiSignature::Ecdsa` variant.
    Ecdsa,
    /// Raw 65-byte secp256k1 signature as used by AccountId20 runtimes.
    Ethereum,
}

/// How an account is encoded where the runtime expects a lookup source
/// (the extrinsic signer and address-typed call arguments).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressFormat {
    MultiAddress,
    AccountId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainConfig {
    pub name: String,
    pub address_family: AddressFamily,
    pub signature_scheme: SignatureScheme,
    pub address_format: AddressFormat,
    /// Extrinsic format version carried in the low bits of the version byte.
    pub extrinsic_version: u8,
    /// Minimum mortal era period in blocks.
    pub era_period: u64,
    /// Runtime spec version from which `CheckMetadataHash` is part of the signed extensions.
    #[serde(default)]
    pub metadata_hash_since: Option<u32>,
    /// When set, fee dry-runs carry an all-zero signature of full width instead of no signature.
    /// Some nodes misquote `payment_queryInfo` for short unsigned bodies.
    pub full_width_empty_signature: bool,
    /// Safety margin applied to estimated fees, in percent.
    pub fee_margin_percent: u32,
    /// Expected block production interval.
    pub block_time_ms: u64,
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            name: "substrate".to_string(),
            address_family: AddressFamily::Ss58 { prefix: 42 },
            signature_scheme: SignatureScheme::Sr25519,
            address_format: AddressFormat::MultiAddress,
            extrinsic_version: 4,
            era_period: 64,
            metadata_hash_since: None,
            full_width_empty_signature: true,
            fee_margin_percent: 120,
            block_time_ms: 6_000,
        }
    }
}

impl ChainConfig {
    pub fn polkadot() -> Self {
        Self {
            name: "polkadot".to_string(),
            address_family: AddressFamily::Ss58 { prefix: 0 },
            metadata_hash_since: Some(1_002_005),
            ..Self::default()
        }
    }

    pub fn kusama() -> Self {
        Self {
            name: "kusama".to_string(),
            address_family: AddressFamily::Ss58 { prefix: 2 },
            metadata_hash_since: Some(1_002_005),
            ..Self::default()
        }
    }

    pub fn westend() -> Self {
        Self {
            name: "westend".to_string(),
            metadata_hash_since: Some(1_011_000),
            ..Self::default()
        }
    }

    pub fn moonbeam() -> Self {
        Self {
            name: "moonbeam".to_string(),
            address_family: AddressFamily::Ethereum,
            signature_scheme: SignatureScheme::Ethereum,
            address_format: AddressFormat::AccountId,
            block_time_ms: 12_000,
            ..Self::default()
        }
    }

    pub fn from_json(json: &str) -> Result<Self, WalletError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Rejects combinations the encode pipeline cannot express.
    pub fn validate(&self) -> Result<(), WalletError> {
        match (self.address_family, self.signature_scheme) {
            (AddressFamily::Ethereum, SignatureScheme::Ethereum) => {}
            (AddressFamily::Ethereum, scheme) => {
                return Err(WalletError::invalid(format!(
                    "ethereum address family requires ethereum signatures, got {scheme:?}"
                )))
            }
            (AddressFamily::Ss58 { .. }, SignatureScheme::Ethereum) => {
                return Err(WalletError::invalid(
                    "ethereum signatures require the ethereum address family",
                ))
            }
            (AddressFamily::Ss58 { prefix }, _) if prefix >= 16_384 => {
                return Err(WalletError::invalid(format!("ss58 prefix {prefix} out of range")))
            }
            _ => {}
        }
        if self.extrinsic_version == 0 || self.extrinsic_version > 0x7f {
            return Err(WalletError::invalid("extrinsic version must fit in 7 bits"));
        }
        if self.era_period < 4 {
            return Err(WalletError::invalid("era period must be at least 4 blocks"));
        }
        Ok(())
    }

    /// Byte length of an account id for this chain.
    pub fn account_id_len(&self) -> usize {
        match self.address_family {
            AddressFamily::Ss58 { .. } => 32,
            AddressFamily::Ethereum => 20,
        }
    }

    pub fn signature_len(&self) -> usize {
        match self.signature_scheme {
            SignatureScheme::Ed25519 | SignatureScheme::Sr25519 => 64,
            SignatureScheme::Ecdsa | SignatureScheme::Ethereum => 65,
        }
    }

    pub fn supports_metadata_hash(&self, runtime_version: Option<u32>) -> bool {
        match (self.metadata_hash_since, runtime_version) {
            (Some(since), Some(version)) => version >= since,
            _ => false,
        }
    }

    /// TTL for memoized RPC responses: a third of the block time.
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.block_time_ms / 3)
    }

    pub fn apply_fee_margin(&self, fee: u128) -> u128 {
        fee.saturating_mul(self.fee_margin_percent as u128) / 100
    }
}

/// Configuration for the node RPC connection
#[derive(Clone, Debug)]
pub struct RpcConfig {
    /// WebSocket endpoint URL (e.g., "ws://127.0.0.1:9944")
    pub endpoint: String,
    pub connection_timeout: Duration,
    pub request_timeout: Duration,
    pub max_reconnect_attempts: u32,
    pub reconnect_delay: Duration,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:9944".to_string(),
            connection_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(60),
            max_reconnect_attempts: 5,
            reconnect_delay: Duration::from_secs(2),
        }
    }
}

impl RpcConfig {
    pub fn with_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_validate() {
        for config in [
            ChainConfig::default(),
            ChainConfig::polkadot(),
            ChainConfig::kusama(),
            ChainConfig::westend(),
            ChainConfig::moonbeam(),
        ] {
            config.validate().unwrap();
        }
    }

    #[test]
    fn mismatched_family_rejected() {
        let config = ChainConfig {
            address_family: AddressFamily::Ethereum,
            ..ChainConfig::default()
        };
        assert!(matches!(config.validate(), Err(WalletError::InvalidValue(_))));
    }

    #[test]
    fn json_round_trip() {
        let json = serde_json::to_string(&ChainConfig::moonbeam()).unwrap();
        let parsed = ChainConfig::from_json(&json).unwrap();
        assert_eq!(parsed, ChainConfig::moonbeam());
    }

    #[test]
    fn fee_margin_and_ttl() {
        let config = ChainConfig::default();
        assert_eq!(config.apply_fee_margin(1_000), 1_200);
        assert_eq!(config.cache_ttl(), Duration::from_millis(2_000));
    }

    #[test]
    fn metadata_hash_gate() {
        let config = ChainConfig::polkadot();
        assert!(!config.supports_metadata_hash(None));
        assert!(!config.supports_metadata_hash(Some(1_002_004)));
        assert!(config.supports_metadata_hash(Some(1_002_005)));
        let westend = ChainConfig::westend();
        assert!(!westend.supports_metadata_hash(Some(1_010_000)));
        assert!(westend.supports_metadata_hash(Some(1_011_000)));
        assert!(!ChainConfig::default().supports_metadata_hash(Some(u32::MAX)));
    }

    #[test]
    fn rpc_config_defaults() {
        let config = RpcConfig::with_endpoint("ws://localhost:9955");
        assert_eq!(config.endpoint, "ws://localhost:9955");
        assert_eq!(config.max_reconnect_attempts, 5);
        assert_eq!(config.connection_timeout.as_secs(), 30);
    }
}
