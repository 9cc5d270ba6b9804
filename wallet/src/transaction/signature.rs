use crate::config::SignatureScheme;
use crate::error::{WalletError, WalletResult};
use crate::scale::{discriminant, take, unknown_variant, Scale, ScaleContext};

/// A signature tagged with the scheme that produced it.
///
/// On SS58 chains this encodes as `MultiSignature` (Ed25519 = 0, Sr25519 = 1, Ecdsa = 2);
/// Ethereum-style chains carry the raw 65-byte form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signature {
    Ed25519([u8; 64]),
    Sr25519([u8; 64]),
    Ecdsa([u8; 65]),
    Ethereum([u8; 65]),
}

impl Signature {
    pub fn from_bytes(scheme: SignatureScheme, bytes: &[u8]) -> WalletResult<Self> {
        let wrong_length = || {
            WalletError::invalid(format!(
                "{scheme:?} signature of {} bytes",
                bytes.len()
            ))
        };
        Ok(match scheme {
            SignatureScheme::Ed25519 => Signature::Ed25519(bytes.try_into().map_err(|_| wrong_length())?),
            SignatureScheme::Sr25519 => Signature::Sr25519(bytes.try_into().map_err(|_| wrong_length())?),
            SignatureScheme::Ecdsa => Signature::Ecdsa(bytes.try_into().map_err(|_| wrong_length())?),
            SignatureScheme::Ethereum => Signature::Ethereum(bytes.try_into().map_err(|_| wrong_length())?),
        })
    }

    /// All-zero signature of full width, used where a node needs a signed-shaped extrinsic
    /// before the real signature exists.
    pub fn placeholder(scheme: SignatureScheme) -> Self {
        match scheme {
            SignatureScheme::Ed25519 => Signature::Ed25519([0u8; 64]),
            SignatureScheme::Sr25519 => Signature::Sr25519([0u8; 64]),
            SignatureScheme::Ecdsa => Signature::Ecdsa([0u8; 65]),
            SignatureScheme::Ethereum => Signature::Ethereum([0u8; 65]),
        }
    }

    pub fn scheme(&self) -> SignatureScheme {
        match self {
            Signature::Ed25519(_) => SignatureScheme::Ed25519,
            Signature::Sr25519(_) => SignatureScheme::Sr25519,
            Signature::Ecdsa(_) => SignatureScheme::Ecdsa,
            Signature::Ethereum(_) => SignatureScheme::Ethereum,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Signature::Ed25519(raw) | Signature::Sr25519(raw) => raw,
            Signature::Ecdsa(raw) | Signature::Ethereum(raw) => raw,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.as_bytes().iter().all(|b| *b == 0)
    }
}

impl Scale for Signature {
    fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        let ethereum_chain = ctx.config.signature_scheme == SignatureScheme::Ethereum;
        if ethereum_chain != matches!(self, Signature::Ethereum(_)) {
            return Err(WalletError::invalid(format!(
                "{:?} signature on a {:?} chain",
                self.scheme(),
                ctx.config.signature_scheme
            )));
        }
        match self {
            Signature::Ed25519(_) => out.push(0),
            Signature::Sr25519(_) => out.push(1),
            Signature::Ecdsa(_) => out.push(2),
            Signature::Ethereum(_) => {}
        }
        out.extend_from_slice(self.as_bytes());
        Ok(())
    }

    fn decode(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        if ctx.config.signature_scheme == SignatureScheme::Ethereum {
            let raw = take(bytes, 65, "ethereum signature")?;
            return Ok((Signature::from_bytes(SignatureScheme::Ethereum, raw)?, 65));
        }
        let (scheme, len) = match discriminant(bytes, "multi-signature")? {
            0 => (SignatureScheme::Ed25519, 64),
            1 => (SignatureScheme::Sr25519, 64),
            2 => (SignatureScheme::Ecdsa, 65),
            other => return Err(unknown_variant("multi-signature", other)),
        };
        let raw = take(&bytes[1..], len, "signature")?;
        Ok((Signature::from_bytes(scheme, raw)?, 1 + len))
    }
}
