//! Signature schemes.
//!
//! Every scheme signs the payload's signing message (the payload itself, or its blake2-256
//! hash when longer than 256 bytes). Secp256k1 schemes additionally keccak-256 the message
//! and append the one-byte recovery id to the 64-byte `r || s` signature.

use std::sync::Arc;

use k256::ecdsa::{RecoveryId, Signature as EcdsaSignature, SigningKey, VerifyingKey};
use sp_core::crypto::ByteArray;
use sp_core::{ed25519, sr25519, Pair as _};
use tokio::sync::OnceCell;
use tracing::debug;

use crate::address::Address;
use crate::config::{ChainConfig, SignatureScheme};
use crate::error::{WalletError, WalletResult};
use crate::hashing::keccak_256;
use crate::scale::ScaleContext;
use crate::transaction::{Signature, Transaction, TransactionPayload};

pub trait Signer: Send + Sync {
    fn scheme(&self) -> SignatureScheme;

    fn sign(&self, secret: &[u8], message: &[u8]) -> WalletResult<Signature>;

    fn verify(&self, message: &[u8], signature: &Signature, public_key: &[u8]) -> WalletResult<bool>;

    fn public_key(&self, secret: &[u8]) -> WalletResult<Vec<u8>>;
}

pub struct Sr25519Signer;

impl Sr25519Signer {
    fn pair(secret: &[u8]) -> WalletResult<sr25519::Pair> {
        sr25519::Pair::from_seed_slice(secret)
            .map_err(|e| WalletError::invalid(format!("invalid sr25519 secret: {e:?}")))
    }
}

impl Signer for Sr25519Signer {
    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::Sr25519
    }

    fn sign(&self, secret: &[u8], message: &[u8]) -> WalletResult<Signature> {
        let signature = Self::pair(secret)?.sign(message);
        let raw: &[u8] = signature.as_ref();
        Signature::from_bytes(SignatureScheme::Sr25519, raw)
    }

    fn verify(&self, message: &[u8], signature: &Signature, public_key: &[u8]) -> WalletResult<bool> {
        let Signature::Sr25519(raw) = signature else {
            return Ok(false);
        };
        let public = sr25519::Public::try_from(public_key)
            .map_err(|_| WalletError::invalid("sr25519 public key must be 32 bytes"))?;
        Ok(sr25519::Pair::verify(&sr25519::Signature::from_raw(*raw), message, &public))
    }

    fn public_key(&self, secret: &[u8]) -> WalletResult<Vec<u8>> {
        Ok(Self::pair(secret)?.public().to_raw_vec())
    }
}

/// Verification only; signing is not offered for ed25519 accounts.
pub struct Ed25519Signer;

impl Signer for Ed25519Signer {
    fn scheme(&self) -> SignatureScheme {
        SignatureScheme::Ed25519
    }

    fn sign(&self, _secret: &[u8], _message: &[u8]) -> WalletResult<Signature> {
        Err(WalletError::unsupported("ed25519 signing"))
    }

    fn verify(&self, message: &[u8], signature: &Signature, public_key: &[u8]) -> WalletResult<bool> {
        let Signature::Ed25519(raw) = signature else {
            return Ok(false);
        };
        let public = ed25519::Public::try_from(public_key)
            .map_err(|_| WalletError::invalid("ed25519 public key must be 32 bytes"))?;
        Ok(ed25519::Pair::verify(&ed25519::Signature::from_raw(*raw), message, &public))
    }

    fn public_key(&self, secret: &[u8]) -> WalletResult<Vec<u8>> {
        let pair = ed25519::Pair::from_seed_slice(secret)
            .map_err(|e| WalletError::invalid(format!("invalid ed25519 secret: {e:?}")))?;
        Ok(pair.public().to_raw_vec())
    }
}

/// Recoverable secp256k1 over keccak-256, for both `MultiSignature::Ecdsa` and raw
/// Ethereum-style signatures.
pub struct EcdsaSigner {
    scheme: SignatureScheme,
}

impl EcdsaSigner {
    pub fn new(scheme: SignatureScheme) -> WalletResult<Self> {
        match scheme {
            SignatureScheme::Ecdsa | SignatureScheme::Ethereum => Ok(Self { scheme }),
            other => Err(WalletError::invalid(format!("{other:?} is not a secp256k1 scheme"))),
        }
    }

    fn signing_key(secret: &[u8]) -> WalletResult<SigningKey> {
        SigningKey::from_slice(secret).map_err(|e| WalletError::invalid(format!("invalid secp256k1 secret: {e}")))
    }

    /// Compressed public key that produced `signature` over `message`.
    pub fn recover(&self, message: &[u8], signature: &Signature) -> WalletResult<Vec<u8>> {
        let raw = match signature {
            Signature::Ecdsa(raw) | Signature::Ethereum(raw) => raw,
            other => {
                return Err(WalletError::invalid(format!(
                    "cannot recover a key from a {:?} signature",
                    other.scheme()
                )))
            }
        };
        let sig = EcdsaSignature::from_slice(&raw[..64])
            .map_err(|e| WalletError::invalid(format!("malformed secp256k1 signature: {e}")))?;
        let recovery_id = RecoveryId::from_byte(raw[64])
            .ok_or_else(|| WalletError::invalid(format!("invalid recovery id {}", raw[64])))?;
        let key = VerifyingKey::recover_from_prehash(&keccak_256(message), &sig, recovery_id)
            .map_err(|e| WalletError::invalid(format!("public key recovery failed: {e}")))?;
        Ok(key.to_encoded_point(true).as_bytes().to_vec())
    }
}

impl Signer for EcdsaSigner {
    fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    fn sign(&self, secret: &[u8], message: &[u8]) -> WalletResult<Signature> {
        let key = Self::signing_key(secret)?;
        let (signature, recovery_id) = key
            .sign_prehash_recoverable(&keccak_256(message))
            .map_err(|e| WalletError::invalid(format!("secp256k1 signing failed: {e}")))?;
        let mut raw = signature.to_bytes().to_vec();
        raw.push(recovery_id.to_byte());
        Signature::from_bytes(self.scheme, &raw)
    }

    fn verify(&self, message: &[u8], signature: &Signature, public_key: &[u8]) -> WalletResult<bool> {
        let expected = VerifyingKey::from_sec1_bytes(public_key)
            .map_err(|e| WalletError::invalid(format!("invalid secp256k1 public key: {e}")))?;
        match self.recover(message, signature) {
            Ok(recovered) => Ok(recovered == expected.to_encoded_point(true).as_bytes()),
            Err(_) => Ok(false),
        }
    }

    fn public_key(&self, secret: &[u8]) -> WalletResult<Vec<u8>> {
        let key = Self::signing_key(secret)?;
        Ok(key.verifying_key().to_encoded_point(true).as_bytes().to_vec())
    }
}

pub fn signer_for(scheme: SignatureScheme) -> Arc<dyn Signer> {
    match scheme {
        SignatureScheme::Sr25519 => Arc::new(Sr25519Signer),
        SignatureScheme::Ed25519 => Arc::new(Ed25519Signer),
        SignatureScheme::Ecdsa | SignatureScheme::Ethereum => Arc::new(EcdsaSigner { scheme }),
    }
}

/// Signer for the configured scheme behind a one-time readiness check.
pub struct CryptoBackend {
    config: Arc<ChainConfig>,
    signer: Arc<dyn Signer>,
    ready: OnceCell<()>,
}

impl CryptoBackend {
    pub fn new(config: Arc<ChainConfig>) -> Self {
        let signer = signer_for(config.signature_scheme);
        Self {
            config,
            signer,
            ready: OnceCell::new(),
        }
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.signer.scheme()
    }

    /// Resolves once the scheme's primitives have passed a sign/verify self-test.
    /// Only sr25519 is gated; other schemes are ready immediately.
    pub async fn ready(&self) -> WalletResult<()> {
        if self.signer.scheme() != SignatureScheme::Sr25519 {
            return Ok(());
        }
        self.ready
            .get_or_try_init(|| async {
                let seed = [7u8; 32];
                let message = b"substrate-wallet readiness";
                let signature = self.signer.sign(&seed, message)?;
                let public = self.signer.public_key(&seed)?;
                if !self.signer.verify(message, &signature, &public)? {
                    return Err(WalletError::violation("sr25519 self-test failed"));
                }
                debug!("sr25519 backend ready");
                Ok(())
            })
            .await
            .map(|_| ())
    }

    /// Signs a payload's signing message.
    pub async fn sign(&self, secret: &[u8], payload: &TransactionPayload) -> WalletResult<Signature> {
        self.ready().await?;
        self.signer.sign(secret, &payload.signing_message())
    }

    pub fn public_key(&self, secret: &[u8]) -> WalletResult<Vec<u8>> {
        self.signer.public_key(secret)
    }

    /// Account address of the key behind `secret`.
    pub fn address(&self, secret: &[u8]) -> WalletResult<Address> {
        Address::from_public_key(&self.config, &self.public_key(secret)?)
    }

    /// Checks that `signature` over `payload` was produced by the account `address`.
    pub fn verify_for_address(
        &self,
        payload: &TransactionPayload,
        signature: &Signature,
        address: &Address,
    ) -> WalletResult<bool> {
        verify_for_address(&self.config, payload, signature, address)
    }
}

fn verify_for_address(
    config: &ChainConfig,
    payload: &TransactionPayload,
    signature: &Signature,
    address: &Address,
) -> WalletResult<bool> {
    let message = payload.signing_message();
    match signature.scheme() {
        // Account ids of these schemes are the public key.
        SignatureScheme::Sr25519 | SignatureScheme::Ed25519 => {
            signer_for(signature.scheme()).verify(&message, signature, address.raw())
        }
        scheme => {
            let signer = EcdsaSigner { scheme };
            let Ok(public) = signer.recover(&message, signature) else {
                return Ok(false);
            };
            Ok(Address::from_public_key(config, &public)?.raw() == address.raw())
        }
    }
}

impl Transaction {
    /// Whether the carried signature matches the signer and `payload`.
    /// Transactions without a signature do not verify.
    pub fn verify(&self, ctx: &ScaleContext, payload: &TransactionPayload) -> WalletResult<bool> {
        match (self.signer(), self.signature()) {
            (Some(signer), Some(signature)) => verify_for_address(&ctx.config, payload, signature, signer),
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::EthereumAddress;

    const SECRET: [u8; 32] = [0x11; 32];

    #[tokio::test]
    async fn sr25519_sign_and_verify() {
        let backend = CryptoBackend::new(Arc::new(ChainConfig::default()));
        backend.ready().await.unwrap();
        let payload = TransactionPayload::from_hex("0x0102030405").unwrap();
        let signature = backend.sign(&SECRET, &payload).await.unwrap();
        assert_eq!(signature.scheme(), SignatureScheme::Sr25519);
        let address = backend.address(&SECRET).unwrap();
        assert!(backend.verify_for_address(&payload, &signature, &address).unwrap());
        let other = TransactionPayload::from_hex("0x0102030406").unwrap();
        assert!(!backend.verify_for_address(&other, &signature, &address).unwrap());
    }

    #[test]
    fn ecdsa_signature_carries_recovery_id() {
        let signer = EcdsaSigner::new(SignatureScheme::Ecdsa).unwrap();
        let signature = signer.sign(&SECRET, b"payload").unwrap();
        let Signature::Ecdsa(raw) = &signature else {
            panic!("expected ecdsa signature");
        };
        assert!(raw[64] <= 3);
        let public = signer.public_key(&SECRET).unwrap();
        assert_eq!(public.len(), 33);
        assert!(signer.verify(b"payload", &signature, &public).unwrap());
        assert!(!signer.verify(b"other", &signature, &public).unwrap());
        assert_eq!(signer.recover(b"payload", &signature).unwrap(), public);
    }

    #[tokio::test]
    async fn ethereum_addresses_verify_by_recovery() {
        let config = Arc::new(ChainConfig::moonbeam());
        let backend = CryptoBackend::new(config.clone());
        let payload = TransactionPayload::from_hex("0xdeadbeef").unwrap();
        let signature = backend.sign(&SECRET, &payload).await.unwrap();
        assert!(matches!(signature, Signature::Ethereum(_)));
        let address = backend.address(&SECRET).unwrap();
        let expected = EthereumAddress::from_public_key(&backend.public_key(&SECRET).unwrap()).unwrap();
        assert_eq!(address.raw(), expected.as_bytes());
        assert!(backend.verify_for_address(&payload, &signature, &address).unwrap());
        let stranger = Address::from_raw(&config, &[9u8; 20]).unwrap();
        assert!(!backend.verify_for_address(&payload, &signature, &stranger).unwrap());
    }

    #[test]
    fn ed25519_signing_is_unsupported() {
        let signer = signer_for(SignatureScheme::Ed25519);
        assert!(matches!(signer.sign(&SECRET, b"m"), Err(WalletError::Unsupported(_))));
        let pair = ed25519::Pair::from_seed_slice(&SECRET).unwrap();
        let signed = pair.sign(b"m");
        let raw: &[u8] = signed.as_ref();
        let signature = Signature::from_bytes(SignatureScheme::Ed25519, raw).unwrap();
        let public = signer.public_key(&SECRET).unwrap();
        assert!(signer.verify(b"m", &signature, &public).unwrap());
    }

    #[test]
    fn wrong_scheme_does_not_verify() {
        let signer = Sr25519Signer;
        let public = signer.public_key(&SECRET).unwrap();
        assert!(!signer.verify(b"m", &Signature::Ed25519([0u8; 64]), &public).unwrap());
        assert!(EcdsaSigner::new(SignatureScheme::Sr25519).is_err());
    }
}
