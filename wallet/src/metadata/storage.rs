use crate::error::{WalletError, WalletResult};
use crate::hashing::{twox_128, StorageHasher};
use crate::scale::{ScaleContext, ScaleValue};

/// A storage item declared by runtime metadata, able to build its own keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StorageEntry {
    prefix: String,
    name: String,
    /// One hasher per map key; empty for plain values.
    hashers: Vec<StorageHasher>,
}

impl StorageEntry {
    pub fn new(prefix: impl Into<String>, name: impl Into<String>, hashers: Vec<StorageHasher>) -> Self {
        Self {
            prefix: prefix.into(),
            name: name.into(),
            hashers,
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn hashers(&self) -> &[StorageHasher] {
        &self.hashers
    }

    pub fn is_map(&self) -> bool {
        !self.hashers.is_empty()
    }

    /// `twox128(prefix) ++ twox128(name)`, the key of a plain value and the common prefix
    /// of every key in a map.
    pub fn root(&self) -> Vec<u8> {
        let mut key = Vec::with_capacity(32);
        key.extend_from_slice(&twox_128(self.prefix.as_bytes()));
        key.extend_from_slice(&twox_128(self.name.as_bytes()));
        key
    }

    /// Builds the full key for the given map keys, each hashed with its declared hasher.
    pub fn key(&self, ctx: &ScaleContext, keys: &[ScaleValue]) -> WalletResult<Vec<u8>> {
        if keys.len() != self.hashers.len() {
            return Err(WalletError::invalid(format!(
                "storage entry {}.{} takes {} keys, got {}",
                self.prefix,
                self.name,
                self.hashers.len(),
                keys.len()
            )));
        }
        let mut key = self.root();
        for (hasher, value) in self.hashers.iter().zip(keys) {
            key.extend_from_slice(&hasher.hash(&value.encode(ctx)?));
        }
        Ok(key)
    }

    pub fn key_hex(&self, ctx: &ScaleContext, keys: &[ScaleValue]) -> WalletResult<String> {
        Ok(format!("0x{}", hex::encode(self.key(ctx, keys)?)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::Address;
    use crate::scale::test_context;

    #[test]
    fn plain_value_key() {
        let ctx = test_context();
        let entry = StorageEntry::new("System", "Number", Vec::new());
        assert_eq!(
            entry.key_hex(&ctx, &[]).unwrap(),
            "0x26aa394eea5630e07c48ae0c9558cef702a5c1b19ab7a04f536c519aca4983ac"
        );
    }

    #[test]
    fn system_account_key() {
        let ctx = test_context();
        let entry = StorageEntry::new("System", "Account", vec![StorageHasher::Blake2_128Concat]);
        let account = Address::placeholder(&ctx.config);
        let key = entry.key(&ctx, &[ScaleValue::AccountId(account)]).unwrap();
        assert_eq!(
            hex::encode(&key[..32]),
            "26aa394eea5630e07c48ae0c9558cef7b99d880ec681799c0cf30e8886371da9"
        );
        // 32 prefix + 16 hash + 32 raw account id
        assert_eq!(key.len(), 80);
        assert_eq!(&key[48..], &[0u8; 32]);
    }

    #[test]
    fn key_count_must_match() {
        let ctx = test_context();
        let entry = StorageEntry::new("System", "Account", vec![StorageHasher::Blake2_128Concat]);
        assert!(entry.key(&ctx, &[]).is_err());
    }
}
