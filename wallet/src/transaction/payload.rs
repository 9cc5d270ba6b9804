use crate::error::{WalletError, WalletResult};
use crate::hashing::blake2_256;
use crate::scale::{Hash, Scale, ScaleContext};
use crate::transaction::extrinsic::{metadata_hash_enabled, Transaction};

/// Payloads longer than this are signed through their blake2-256 hash.
pub const MAX_UNHASHED_PAYLOAD: usize = 256;

/// Chain state a transaction is built against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChainState {
    pub genesis_hash: Hash,
    /// Hash of the block the mortal era starts at.
    pub block_hash: Hash,
    pub block_number: u64,
    pub spec_version: u32,
    pub transaction_version: u32,
}

/// The bytes a signer commits to:
/// `(call, extra, additional)` where additional is
/// `(spec_version, tx_version, genesis_hash, era_block_hash[, metadata_hash])`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactionPayload(Vec<u8>);

impl TransactionPayload {
    pub fn new(ctx: &ScaleContext, transaction: &Transaction, chain: &ChainState) -> WalletResult<Self> {
        let extra = transaction
            .extra()
            .ok_or_else(|| WalletError::violation("bare extrinsics have no signing payload"))?;
        let mut payload = Vec::new();
        transaction.method().encode_to(ctx, &mut payload)?;
        extra.encode_to(ctx, transaction.format_version(), &mut payload)?;
        payload.extend_from_slice(&chain.spec_version.to_le_bytes());
        payload.extend_from_slice(&chain.transaction_version.to_le_bytes());
        chain.genesis_hash.encode_to(&mut payload);
        if extra.era.is_immortal() {
            chain.genesis_hash.encode_to(&mut payload);
        } else {
            chain.block_hash.encode_to(&mut payload);
        }
        if metadata_hash_enabled(ctx, transaction.format_version()) {
            // Option<[u8; 32]>::None
            payload.push(0);
        }
        Ok(Self(payload))
    }

    pub fn from_hex(value: &str) -> WalletResult<Self> {
        Ok(Self(hex::decode(value.trim_start_matches("0x"))?))
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.0))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Message handed to the signer.
    pub fn signing_message(&self) -> Vec<u8> {
        signing_message(&self.0)
    }
}

pub(crate) fn signing_message(payload: &[u8]) -> Vec<u8> {
    if payload.len() > MAX_UNHASHED_PAYLOAD {
        blake2_256(payload).to_vec()
    } else {
        payload.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::address::Address;
    use crate::config::ChainConfig;
    use crate::metadata::CallIndex;
    use crate::method::args::{BatchArgs, RemarkArgs};
    use crate::method::{CallArgs, Method};
    use crate::scale::{test_context, Compact};
    use crate::transaction::era::Era;
    use crate::transaction::extrinsic::SignedExtra;

    fn chain() -> ChainState {
        ChainState {
            genesis_hash: Hash::new(vec![0xaa; 32]),
            block_hash: Hash::new(vec![0xbb; 32]),
            block_number: 1000,
            spec_version: 9430,
            transaction_version: 24,
        }
    }

    fn transaction(ctx: &ScaleContext, era: Era) -> Transaction {
        let signer = Address::from_raw(&ctx.config, &[1u8; 32]).unwrap();
        let dest = Address::placeholder(&ctx.config);
        let method = Method::new(CallIndex::new(4, 0), CallArgs::transfer(dest, 500));
        let extra = SignedExtra {
            era,
            nonce: Compact(3),
            tip: Compact(0),
        };
        Transaction::new(4, signer, extra, method)
    }

    #[test]
    fn mortal_payload_layout() {
        let ctx = test_context();
        let payload = TransactionPayload::new(&ctx, &transaction(&ctx, Era::mortal(64, 1000)), &chain()).unwrap();
        let bytes = payload.as_bytes();
        // call + era + nonce + tip + spec + tx + genesis + block hash
        assert_eq!(bytes.len(), 37 + 2 + 1 + 1 + 4 + 4 + 32 + 32);
        assert_eq!(&bytes[37..39], &[0x85, 0x02]);
        assert_eq!(&bytes[41..45], &9430u32.to_le_bytes());
        assert_eq!(&bytes[45..49], &24u32.to_le_bytes());
        assert_eq!(&bytes[49..81], &[0xaa; 32]);
        assert_eq!(&bytes[81..], &[0xbb; 32]);
        assert_eq!(payload.signing_message(), bytes.to_vec());
    }

    #[test]
    fn immortal_payload_repeats_genesis() {
        let ctx = test_context();
        let payload = TransactionPayload::new(&ctx, &transaction(&ctx, Era::Immortal), &chain()).unwrap();
        let bytes = payload.as_bytes();
        assert_eq!(&bytes[bytes.len() - 64..bytes.len() - 32], &[0xaa; 32]);
        assert_eq!(&bytes[bytes.len() - 32..], &[0xaa; 32]);
    }

    #[test]
    fn metadata_hash_fields_follow_runtime_version() {
        let config = ChainConfig {
            metadata_hash_since: Some(9430),
            ..ChainConfig::default()
        };
        let ctx = ScaleContext::new(Arc::new(config)).with_runtime_version(Some(9430));
        let tx = transaction(&ctx, Era::mortal(64, 1000));
        let payload = TransactionPayload::new(&ctx, &tx, &chain()).unwrap();
        let bytes = payload.as_bytes();
        assert_eq!(bytes.len(), 37 + 2 + 1 + 1 + 1 + 4 + 4 + 32 + 32 + 1);
        assert_eq!(bytes[41], 0x00);
        assert_eq!(bytes[bytes.len() - 1], 0x00);
    }

    #[test]
    fn long_payloads_are_hashed() {
        let ctx = test_context();
        let signer = Address::from_raw(&ctx.config, &[1u8; 32]).unwrap();
        let remark = Method::new(
            CallIndex::new(0, 0),
            CallArgs::Remark(RemarkArgs { remark: vec![7u8; 300] }),
        );
        let batch = Method::new(CallIndex::new(26, 0), CallArgs::Batch(BatchArgs { calls: vec![remark] }));
        let extra = SignedExtra {
            era: Era::Immortal,
            nonce: Compact(0),
            tip: Compact(0),
        };
        let tx = Transaction::new(4, signer, extra, batch);
        let payload = TransactionPayload::new(&ctx, &tx, &chain()).unwrap();
        assert!(payload.len() > MAX_UNHASHED_PAYLOAD);
        assert_eq!(payload.signing_message(), blake2_256(payload.as_bytes()).to_vec());
    }

    #[test]
    fn hex_round_trip_and_bare_rejection() {
        let ctx = test_context();
        let payload = TransactionPayload::new(&ctx, &transaction(&ctx, Era::Immortal), &chain()).unwrap();
        assert_eq!(TransactionPayload::from_hex(&payload.to_hex()).unwrap(), payload);
        let bare = Transaction::unsigned(4, Method::new(CallIndex::new(7, 6), CallArgs::Chill));
        assert!(TransactionPayload::new(&ctx, &bare, &chain()).is_err());
    }
}
