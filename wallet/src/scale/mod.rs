//! SCALE codec primitives.
//!
//! Every value implements [`Scale`]: `encode_to` appends the value's bytes and `decode`
//! returns the value together with the number of bytes it consumed. Both take a
//! [`ScaleContext`], which carries the chain configuration (account width, signature
//! family) and the runtime version that gates newer optional fields.

pub mod compact;
pub mod multi_address;
pub mod primitives;
pub mod value;

use std::sync::Arc;

use crate::config::ChainConfig;
use crate::error::{WalletError, WalletResult};
use crate::method::registry::CallRegistry;

pub use compact::Compact;
pub use multi_address::MultiAddress;
pub use primitives::{Bytes, FixedUint, Hash};
pub use value::ScaleValue;

#[derive(Clone, Debug)]
pub struct ScaleContext {
    pub config: Arc<ChainConfig>,
    pub runtime_version: Option<u32>,
    /// Needed to decode nested calls (`Utility.batch`).
    pub calls: Option<Arc<CallRegistry>>,
}

impl ScaleContext {
    pub fn new(config: Arc<ChainConfig>) -> Self {
        Self {
            config,
            runtime_version: None,
            calls: None,
        }
    }

    pub fn with_runtime_version(mut self, version: Option<u32>) -> Self {
        self.runtime_version = version;
        self
    }

    pub fn with_calls(mut self, calls: Arc<CallRegistry>) -> Self {
        self.calls = Some(calls);
        self
    }

    /// Whether the `CheckMetadataHash` extension fields are present.
    pub fn metadata_hash_enabled(&self) -> bool {
        self.config.supports_metadata_hash(self.runtime_version)
    }

    pub fn calls(&self) -> WalletResult<&CallRegistry> {
        self.calls
            .as_deref()
            .ok_or_else(|| WalletError::violation("call registry required to decode nested calls"))
    }
}

pub trait Scale: Sized {
    fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()>;

    fn decode(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)>;

    fn encode(&self, ctx: &ScaleContext) -> WalletResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_to(ctx, &mut out)?;
        Ok(out)
    }

    /// Decodes and requires that every input byte was consumed.
    fn decode_all(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<Self> {
        let (value, consumed) = Self::decode(ctx, bytes)?;
        if consumed != bytes.len() {
            return Err(WalletError::invalid(format!(
                "{} trailing bytes after decoded value",
                bytes.len() - consumed
            )));
        }
        Ok(value)
    }
}

/// Splits `len` bytes off the front of `bytes`.
pub(crate) fn take<'a>(bytes: &'a [u8], len: usize, what: &str) -> WalletResult<&'a [u8]> {
    bytes
        .get(..len)
        .ok_or_else(|| WalletError::eof(what, len, bytes.len()))
}

/// Reads the one-byte discriminant of an enum.
pub(crate) fn discriminant(bytes: &[u8], what: &str) -> WalletResult<u8> {
    take(bytes, 1, what).map(|b| b[0])
}

pub(crate) fn unknown_variant(what: &str, index: u8) -> WalletError {
    WalletError::invalid(format!("unknown {what} discriminant {index}"))
}

#[cfg(test)]
pub(crate) fn test_context() -> ScaleContext {
    ScaleContext::new(Arc::new(ChainConfig::default()))
}
