//! Extrinsic framing.
//!
//! The wire format matches `UncheckedExtrinsic`:
//! - version byte: format version, high bit set when a signature section follows
//! - signer: lookup source or bare account id per chain config
//! - signature: `MultiSignature` or raw 65 bytes
//! - signed extra: era, compact nonce, compact tip, then the `CheckMetadataHash` mode
//!   byte when the runtime has that extension
//! - call
//!
//! and the whole body is prefixed with its compact length.

use crate::address::Address;
use crate::error::{WalletError, WalletResult};
use crate::hashing::blake2_256;
use crate::method::Method;
use crate::scale::compact::{decode_compact, decode_compact_len, encode_compact, encode_compact_len};
use crate::scale::{discriminant, take, Compact, Hash, Scale, ScaleContext};
use crate::transaction::era::Era;
use crate::transaction::signature::Signature;

const SIGNED_BIT: u8 = 0b1000_0000;
const VERSION_MASK: u8 = 0b0111_1111;

/// Fields covered by the signature and carried alongside it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignedExtra {
    pub era: Era,
    pub nonce: Compact,
    pub tip: Compact,
}

impl SignedExtra {
    /// Encodes era, nonce, tip and, when enabled, the metadata-hash mode byte.
    pub(crate) fn encode_to(&self, ctx: &ScaleContext, format_version: u8, out: &mut Vec<u8>) -> WalletResult<()> {
        self.era.encode_to(ctx, out)?;
        encode_compact(self.nonce.0, out);
        encode_compact(self.tip.0, out);
        if metadata_hash_enabled(ctx, format_version) {
            // CheckMetadataHash mode: disabled
            out.push(0);
        }
        Ok(())
    }

    fn decode(ctx: &ScaleContext, format_version: u8, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let (era, mut offset) = Era::decode(ctx, bytes)?;
        let (nonce, consumed) = decode_compact(&bytes[offset..])?;
        offset += consumed;
        let (tip, consumed) = decode_compact(&bytes[offset..])?;
        offset += consumed;
        if metadata_hash_enabled(ctx, format_version) {
            match discriminant(&bytes[offset..], "metadata hash mode")? {
                0 => offset += 1,
                1 => {
                    return Err(WalletError::unsupported(
                        "extrinsics committing to a metadata hash",
                    ))
                }
                other => return Err(WalletError::invalid(format!("invalid metadata hash mode {other}"))),
            }
        }
        Ok((
            Self {
                era,
                nonce: Compact(nonce),
                tip: Compact(tip),
            },
            offset,
        ))
    }
}

pub(crate) fn metadata_hash_enabled(ctx: &ScaleContext, format_version: u8) -> bool {
    format_version >= 4 && ctx.metadata_hash_enabled()
}

#[derive(Clone, Debug, PartialEq)]
struct Sender {
    address: Address,
    signature: Option<Signature>,
    extra: SignedExtra,
}

/// An extrinsic. Immutable: signing produces a new value.
#[derive(Clone, Debug, PartialEq)]
pub struct Transaction {
    format_version: u8,
    sender: Option<Sender>,
    method: Method,
}

impl Transaction {
    /// A transaction from `signer` awaiting its signature.
    pub fn new(format_version: u8, signer: Address, extra: SignedExtra, method: Method) -> Self {
        Self {
            format_version,
            sender: Some(Sender {
                address: signer,
                signature: None,
                extra,
            }),
            method,
        }
    }

    /// A bare extrinsic with no signer, as used by inherents and unsigned-validated calls.
    pub fn unsigned(format_version: u8, method: Method) -> Self {
        Self {
            format_version,
            sender: None,
            method,
        }
    }

    /// Returns a copy with the signature slot filled.
    pub fn with_signature(&self, signature: Signature) -> WalletResult<Self> {
        let mut sender = self
            .sender
            .clone()
            .ok_or_else(|| WalletError::violation("cannot sign an extrinsic without a signer"))?;
        sender.signature = Some(signature);
        Ok(Self {
            format_version: self.format_version,
            sender: Some(sender),
            method: self.method.clone(),
        })
    }

    pub fn format_version(&self) -> u8 {
        self.format_version
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn signer(&self) -> Option<&Address> {
        self.sender.as_ref().map(|sender| &sender.address)
    }

    pub fn signature(&self) -> Option<&Signature> {
        self.sender.as_ref().and_then(|sender| sender.signature.as_ref())
    }

    pub fn extra(&self) -> Option<&SignedExtra> {
        self.sender.as_ref().map(|sender| &sender.extra)
    }

    pub fn is_signed(&self) -> bool {
        self.signature().is_some()
    }

    pub fn era(&self) -> Option<Era> {
        self.extra().map(|extra| extra.era)
    }

    pub fn nonce(&self) -> Option<u128> {
        self.extra().map(|extra| extra.nonce.0)
    }

    pub fn tip(&self) -> u128 {
        self.extra().map(|extra| extra.tip.0).unwrap_or(0)
    }

    /// Encoded body without the outer length prefix.
    ///
    /// A signer without a signature keeps the signed framing with an all-zero signature of
    /// the scheme's width, so the sender and signed extra survive a decode.
    pub fn encode_body(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        let Some(sender) = &self.sender else {
            out.push(self.format_version);
            return self.method.encode_to(ctx, out);
        };
        let placeholder;
        let signature = match &sender.signature {
            Some(signature) => signature,
            None => {
                placeholder = Signature::placeholder(ctx.config.signature_scheme);
                &placeholder
            }
        };
        out.push(self.format_version | SIGNED_BIT);
        sender.address.encode_to(ctx, out)?;
        signature.encode_to(ctx, out)?;
        sender.extra.encode_to(ctx, self.format_version, out)?;
        self.method.encode_to(ctx, out)
    }

    /// Length-prefixed bytes handed to the node for a fee dry run.
    ///
    /// Without `full_width_empty_signature` a transaction awaiting its signature is quoted
    /// in bare form, `[version][call]`.
    pub fn encode_for_fee(&self, ctx: &ScaleContext) -> WalletResult<Vec<u8>> {
        if self.sender.is_none() || self.is_signed() || ctx.config.full_width_empty_signature {
            return self.encode(ctx);
        }
        let mut body = vec![self.format_version];
        self.method.encode_to(ctx, &mut body)?;
        let mut out = Vec::with_capacity(body.len() + 4);
        encode_compact_len(body.len(), &mut out);
        out.extend_from_slice(&body);
        Ok(out)
    }

    /// Blake2-256 of the length-prefixed encoding, as reported by `author_submitExtrinsic`.
    pub fn hash(&self, ctx: &ScaleContext) -> WalletResult<Hash> {
        Ok(Hash::new(blake2_256(&self.encode(ctx)?).to_vec()))
    }

    pub fn to_hex(&self, ctx: &ScaleContext) -> WalletResult<String> {
        Ok(format!("0x{}", hex::encode(self.encode(ctx)?)))
    }

    /// Decodes a length-prefixed extrinsic whose operation tag is known.
    pub fn decode_as(ctx: &ScaleContext, tag: &str, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        Self::decode_with(ctx, Some(tag), bytes)
    }

    fn decode_with(ctx: &ScaleContext, tag: Option<&str>, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let (len, prefix) = decode_compact_len(bytes)?;
        let body = take(&bytes[prefix..], len, "extrinsic")?;
        let version = discriminant(body, "extrinsic version")?;
        let format_version = version & VERSION_MASK;
        let mut offset = 1;
        let sender = if version & SIGNED_BIT != 0 {
            let (address, consumed) = Address::decode(ctx, &body[offset..])?;
            offset += consumed;
            let (signature, consumed) = Signature::decode(ctx, &body[offset..])?;
            offset += consumed;
            let (extra, consumed) = SignedExtra::decode(ctx, format_version, &body[offset..])?;
            offset += consumed;
            Some(Sender {
                address,
                signature: (!signature.is_placeholder()).then_some(signature),
                extra,
            })
        } else {
            None
        };
        let (method, consumed) = match tag {
            Some(tag) => Method::decode_as(ctx, tag, &body[offset..])?,
            None => Method::decode(ctx, &body[offset..])?,
        };
        offset += consumed;
        if offset != len {
            return Err(WalletError::invalid(format!(
                "extrinsic length prefix {len} does not match decoded body of {offset} bytes"
            )));
        }
        Ok((
            Self {
                format_version,
                sender,
                method,
            },
            prefix + len,
        ))
    }
}

impl Scale for Transaction {
    fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        let mut body = Vec::new();
        self.encode_body(ctx, &mut body)?;
        encode_compact_len(body.len(), out);
        out.extend_from_slice(&body);
        Ok(())
    }

    /// Needs a call registry in the context to identify the call.
    fn decode(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        Self::decode_with(ctx, None, bytes)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ChainConfig;
    use crate::metadata::CallIndex;
    use crate::method::CallArgs;
    use crate::scale::test_context;

    fn transfer(ctx: &ScaleContext) -> Transaction {
        let dest = Address::placeholder(&ctx.config);
        let signer = Address::from_raw(&ctx.config, &[1u8; 32]).unwrap();
        let method = Method::new(CallIndex::new(4, 0), CallArgs::transfer(dest, 500));
        let extra = SignedExtra {
            era: Era::mortal(64, 1000),
            nonce: Compact(7),
            tip: Compact(0),
        };
        Transaction::new(4, signer, extra, method)
    }

    #[test]
    fn signed_layout() {
        let ctx = test_context();
        let tx = transfer(&ctx)
            .with_signature(Signature::Sr25519([9u8; 64]))
            .unwrap();
        let encoded = tx.encode(&ctx).unwrap();
        // version + signer + signature + era + nonce + tip + call
        let body_len = 1 + 33 + 65 + 2 + 1 + 1 + 37;
        assert_eq!(encoded.len(), 2 + body_len);
        assert_eq!(&encoded[..2], &[0x31, 0x02]);
        assert_eq!(encoded[2], 0x84);
        assert_eq!(encoded[3], 0x00);
        assert_eq!(encoded[36], 0x01);
        assert_eq!(&encoded[101..103], &[0x85, 0x02]);
        assert_eq!(encoded[103], 7 << 2);
        assert_eq!(&encoded[105..107], &[0x04, 0x00]);
        let (decoded, consumed) = Transaction::decode_as(&ctx, "transfer", &encoded).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn signing_returns_a_new_value() {
        let ctx = test_context();
        let tx = transfer(&ctx);
        let signed = tx.with_signature(Signature::Sr25519([9u8; 64])).unwrap();
        assert!(!tx.is_signed());
        assert!(signed.is_signed());
        assert_ne!(tx.hash(&ctx).unwrap(), signed.hash(&ctx).unwrap());
    }

    #[test]
    fn unsigned_uses_full_width_placeholder() {
        let ctx = test_context();
        let tx = transfer(&ctx);
        let encoded = tx.encode(&ctx).unwrap();
        assert_eq!(encoded[2], 0x84);
        assert!(encoded[37..101].iter().all(|b| *b == 0));
        let (decoded, _) = Transaction::decode_as(&ctx, "transfer", &encoded).unwrap();
        assert_eq!(decoded, tx);

        assert_eq!(tx.encode_for_fee(&ctx).unwrap(), encoded);
    }

    #[test]
    fn bare_fee_quote_keeps_sender_in_encoding() {
        let ctx = ScaleContext::new(Arc::new(ChainConfig {
            full_width_empty_signature: false,
            ..ChainConfig::default()
        }));
        let tx = transfer(&ctx);
        let quoted = tx.encode_for_fee(&ctx).unwrap();
        assert_eq!(quoted[1], 0x04);
        assert_eq!(quoted.len(), 1 + 1 + 37);

        let encoded = tx.encode(&ctx).unwrap();
        assert_eq!(encoded[2], 0x84);
        let (decoded, consumed) = Transaction::decode_as(&ctx, "transfer", &encoded).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(consumed, encoded.len());
        assert_eq!(decoded.nonce(), Some(7));

        let signed = tx.with_signature(Signature::Sr25519([9u8; 64])).unwrap();
        assert_eq!(signed.encode_for_fee(&ctx).unwrap(), signed.encode(&ctx).unwrap());
    }

    #[test]
    fn bare_account_id_signer_from_older_runtime() {
        let ctx = test_context();
        let dest = Address::placeholder(&ctx.config);
        let signer = Address::from_raw(&ctx.config, &[0xd4u8; 32]).unwrap();
        let method = Method::new(CallIndex::new(4, 0), CallArgs::transfer(dest, 500));
        let extra = SignedExtra {
            era: Era::Immortal,
            nonce: Compact(3),
            tip: Compact(0),
        };
        let tx = Transaction::new(4, signer, extra, method)
            .with_signature(Signature::Sr25519([9u8; 64]))
            .unwrap();
        let encoded = tx.encode(&ctx).unwrap();

        // same extrinsic with the signer written as a bare AccountId
        let mut body = encoded[2..].to_vec();
        assert_eq!(body[1], 0x00);
        body.remove(1);
        let mut older = Vec::new();
        encode_compact_len(body.len(), &mut older);
        older.extend_from_slice(&body);

        let (decoded, consumed) = Transaction::decode_as(&ctx, "transfer", &older).unwrap();
        assert_eq!(decoded, tx);
        assert_eq!(consumed, older.len());
    }

    #[test]
    fn bare_extrinsic() {
        let ctx = test_context();
        let method = Method::new(CallIndex::new(0, 0), CallArgs::Chill);
        let tx = Transaction::unsigned(4, method);
        assert_eq!(tx.encode(&ctx).unwrap(), vec![0x0c, 0x04, 0x00, 0x00]);
        assert!(tx.with_signature(Signature::Sr25519([1u8; 64])).is_err());
        assert_eq!(Transaction::decode_as(&ctx, "chill", &[0x0c, 0x04, 0x00, 0x00]).unwrap().0, tx);
    }

    #[test]
    fn metadata_hash_mode_byte() {
        let config = ChainConfig {
            metadata_hash_since: Some(100),
            ..ChainConfig::default()
        };
        let ctx = ScaleContext::new(Arc::new(config)).with_runtime_version(Some(100));
        let tx = transfer(&ctx).with_signature(Signature::Sr25519([9u8; 64])).unwrap();
        let encoded = tx.encode(&ctx).unwrap();
        // mode byte after tip
        assert_eq!(encoded[105], 0x00);
        assert_eq!(&encoded[106..108], &[0x04, 0x00]);
        assert_eq!(Transaction::decode_as(&ctx, "transfer", &encoded).unwrap().0, tx);

        let older = ctx.clone().with_runtime_version(Some(99));
        assert_eq!(tx.encode(&older).unwrap().len(), encoded.len() - 1);
    }

    #[test]
    fn length_mismatch_rejected() {
        let ctx = test_context();
        let mut encoded = transfer(&ctx).encode(&ctx).unwrap();
        encoded.push(0);
        encoded[0] += 4;
        assert!(Transaction::decode_as(&ctx, "transfer", &encoded).is_err());
    }
}
