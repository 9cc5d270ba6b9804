use std::fmt;
use std::sync::Arc;

use crate::error::{WalletError, WalletResult};
use crate::metadata::{CallIndex, MetadataRegistry};
use crate::method::args::{self, CallArgs, CustomArgs};
use crate::method::Method;
use crate::scale::{ScaleContext, ScaleValue};

/// Operation tag to the `(module, call)` names it may resolve to, tried in order.
const BUILTIN_CALLS: &[(&str, &[(&str, &str)])] = &[
    (
        args::TRANSFER,
        &[("Balances", "transfer"), ("Balances", "transfer_allow_death")],
    ),
    (args::TRANSFER_KEEP_ALIVE, &[("Balances", "transfer_keep_alive")]),
    (args::TRANSFER_ALL, &[("Balances", "transfer_all")]),
    (args::BOND, &[("Staking", "bond")]),
    (args::BOND_EXTRA, &[("Staking", "bond_extra")]),
    (args::UNBOND, &[("Staking", "unbond")]),
    (args::WITHDRAW_UNBONDED, &[("Staking", "withdraw_unbonded")]),
    (args::NOMINATE, &[("Staking", "nominate")]),
    (args::CHILL, &[("Staking", "chill")]),
    (args::REMARK, &[("System", "remark")]),
    (args::BATCH, &[("Utility", "batch")]),
    (args::BATCH_ALL, &[("Utility", "batch_all")]),
];

/// Chain-specific operation not covered by the built-in set.
pub trait CallProvider: Send + Sync {
    fn tag(&self) -> &str;

    /// `(module, call)` names this operation may resolve to, tried in order.
    fn candidates(&self) -> Vec<(String, String)>;

    /// Decodes the argument bytes into named values.
    fn decode(
        &self,
        ctx: &ScaleContext,
        bytes: &[u8],
    ) -> WalletResult<(Vec<(String, ScaleValue)>, usize)>;

    fn args(&self, fields: Vec<(String, ScaleValue)>) -> CallArgs {
        CallArgs::Custom(CustomArgs {
            tag: self.tag().to_string(),
            fields,
        })
    }
}

/// Resolves operation tags to call indices through runtime metadata.
pub struct CallRegistry {
    metadata: Arc<MetadataRegistry>,
    /// In registration order; the first provider naming a call wins its reverse lookup.
    providers: Vec<Arc<dyn CallProvider>>,
}

impl fmt::Debug for CallRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tags: Vec<&str> = self.providers.iter().map(|provider| provider.tag()).collect();
        f.debug_struct("CallRegistry")
            .field("metadata_version", &self.metadata.version())
            .field("providers", &tags)
            .finish()
    }
}

impl CallRegistry {
    pub fn new(metadata: Arc<MetadataRegistry>) -> Self {
        Self {
            metadata,
            providers: Vec::new(),
        }
    }

    pub fn with_providers(metadata: Arc<MetadataRegistry>, providers: &[Arc<dyn CallProvider>]) -> Self {
        let mut registry = Self::new(metadata);
        for provider in providers {
            registry.register(provider.clone());
        }
        registry
    }

    /// Registers a provider; a provider with a built-in tag overrides the built-in.
    /// Registering a tag again replaces the earlier provider in its original position.
    pub fn register(&mut self, provider: Arc<dyn CallProvider>) {
        match self.providers.iter_mut().find(|existing| existing.tag() == provider.tag()) {
            Some(existing) => *existing = provider,
            None => self.providers.push(provider),
        }
    }

    fn registered(&self, tag: &str) -> Option<&Arc<dyn CallProvider>> {
        self.providers.iter().find(|provider| provider.tag() == tag)
    }

    pub fn metadata(&self) -> &MetadataRegistry {
        &self.metadata
    }

    pub fn provider(&self, tag: &str) -> WalletResult<&dyn CallProvider> {
        self.registered(tag)
            .map(|provider| provider.as_ref())
            .ok_or_else(|| {
                WalletError::unsupported(format!("no call provider registered for operation {tag}"))
            })
    }

    fn candidates(&self, tag: &str) -> WalletResult<Vec<(String, String)>> {
        if let Some(provider) = self.registered(tag) {
            return Ok(provider.candidates());
        }
        BUILTIN_CALLS
            .iter()
            .find(|(builtin, _)| *builtin == tag)
            .map(|(_, names)| {
                names
                    .iter()
                    .map(|(module, call)| (module.to_string(), call.to_string()))
                    .collect()
            })
            .ok_or_else(|| WalletError::unsupported(format!("unknown operation {tag}")))
    }

    /// Call index for an operation tag.
    pub fn resolve(&self, tag: &str) -> WalletResult<CallIndex> {
        let candidates = self.candidates(tag)?;
        candidates
            .iter()
            .find_map(|(module, call)| self.metadata.call(module, call).ok())
            .ok_or_else(|| {
                let tried: Vec<String> = candidates
                    .iter()
                    .map(|(module, call)| format!("{module}.{call}"))
                    .collect();
                WalletError::invalid(format!(
                    "operation {tag} not found in metadata (tried {})",
                    tried.join(", ")
                ))
            })
    }

    /// Operation tag for a call index, used when decoding nested calls.
    pub fn tag_for(&self, index: CallIndex) -> WalletResult<String> {
        let (module, call) = self.metadata.call_name(index).ok_or_else(|| {
            WalletError::invalid(format!(
                "call index ({}, {}) not found in metadata",
                index.pallet_index, index.call_index
            ))
        })?;
        let matches = |names: &[(String, String)]| names.iter().any(|(m, c)| m == module && c == call);
        for provider in &self.providers {
            if matches(&provider.candidates()) {
                return Ok(provider.tag().to_string());
            }
        }
        BUILTIN_CALLS
            .iter()
            .find(|(_, names)| names.iter().any(|(m, c)| *m == module && *c == call))
            .map(|(tag, _)| tag.to_string())
            .ok_or_else(|| WalletError::unsupported(format!("no operation handles {module}.{call}")))
    }

    pub fn method(&self, args: CallArgs) -> WalletResult<Method> {
        let index = self.resolve(args.tag())?;
        Ok(Method::new(index, args))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::tests::sample_v14;
    use crate::method::args::read_bytes;
    use crate::scale::{test_context, Scale};

    struct RemarkWithEvent;

    impl CallProvider for RemarkWithEvent {
        fn tag(&self) -> &str {
            "remark_with_event"
        }

        fn candidates(&self) -> Vec<(String, String)> {
            vec![("System".to_string(), "remark".to_string())]
        }

        fn decode(
            &self,
            ctx: &ScaleContext,
            bytes: &[u8],
        ) -> WalletResult<(Vec<(String, ScaleValue)>, usize)> {
            let (remark, consumed) = read_bytes(ctx, bytes)?;
            Ok((vec![("remark".to_string(), ScaleValue::Bytes(remark))], consumed))
        }
    }

    fn registry() -> CallRegistry {
        let metadata = MetadataRegistry::decode(&sample_v14(), None).unwrap();
        CallRegistry::new(Arc::new(metadata))
    }

    #[test]
    fn transfer_resolves_to_balances() {
        assert_eq!(registry().resolve("transfer").unwrap(), CallIndex::new(4, 0));
        assert_eq!(registry().resolve("chill").unwrap(), CallIndex::new(7, 6));
    }

    #[test]
    fn unknown_tags_are_rejected() {
        let registry = registry();
        assert!(matches!(registry.resolve("mint"), Err(WalletError::Unsupported(_))));
    }

    #[test]
    fn providers_take_precedence_in_reverse_lookup() {
        let metadata = MetadataRegistry::decode(&sample_v14(), None).unwrap();
        let mut bare = CallRegistry::new(Arc::new(metadata));
        bare.register(Arc::new(RemarkWithEvent));
        assert!(bare.resolve("remark_with_event").is_ok());
        assert_eq!(bare.tag_for(CallIndex::new(0, 0)).unwrap(), "remark_with_event");
        assert_eq!(bare.tag_for(CallIndex::new(4, 3)).unwrap(), "transfer_keep_alive");
        assert!(bare.tag_for(CallIndex::new(99, 0)).is_err());
    }

    struct Tagged(&'static str);

    impl CallProvider for Tagged {
        fn tag(&self) -> &str {
            self.0
        }

        fn candidates(&self) -> Vec<(String, String)> {
            vec![("System".to_string(), "remark".to_string())]
        }

        fn decode(
            &self,
            ctx: &ScaleContext,
            bytes: &[u8],
        ) -> WalletResult<(Vec<(String, ScaleValue)>, usize)> {
            RemarkWithEvent.decode(ctx, bytes)
        }
    }

    #[test]
    fn overlapping_providers_resolve_in_registration_order() {
        let tags = ["note", "memo", "comment", "remark_with_event", "annotate", "log"];
        let mut registry = registry();
        for tag in tags {
            registry.register(Arc::new(Tagged(tag)));
        }
        for _ in 0..16 {
            assert_eq!(registry.tag_for(CallIndex::new(0, 0)).unwrap(), "note");
        }

        registry.register(Arc::new(Tagged("note")));
        assert_eq!(registry.tag_for(CallIndex::new(0, 0)).unwrap(), "note");
        assert_eq!(
            format!("{registry:?}"),
            format!("CallRegistry {{ metadata_version: 14, providers: {tags:?} }}")
        );
    }

    #[test]
    fn provider_methods_round_trip() {
        let mut registry = registry();
        registry.register(Arc::new(RemarkWithEvent));
        let registry = Arc::new(registry);
        let ctx = test_context().with_calls(registry.clone());
        let provider = registry.provider("remark_with_event").unwrap();
        let args = provider.args(vec![("remark".to_string(), ScaleValue::Bytes(b"gm".to_vec()))]);
        let method = registry.method(args).unwrap();
        let encoded = method.encode(&ctx).unwrap();
        assert_eq!(hex::encode(&encoded), "000008676d");
        assert_eq!(Method::decode_all(&ctx, &encoded).unwrap(), method);
    }
}
