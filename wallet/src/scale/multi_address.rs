use crate::error::{WalletError, WalletResult};
use crate::scale::compact::{decode_compact, encode_compact};
use crate::scale::primitives::Bytes;
use crate::scale::{discriminant, take, unknown_variant, Scale, ScaleContext};

/// `sp_runtime::MultiAddress` with the account id width taken from the chain config.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MultiAddress {
    Id(Vec<u8>),
    Index(u128),
    Raw(Vec<u8>),
    Address32([u8; 32]),
    Address20([u8; 20]),
}

impl MultiAddress {
    /// Decodes a lookup source that may predate `MultiAddress`.
    ///
    /// Runtimes before `MultiAddress` wrote a bare `AccountId` here, so an unknown
    /// discriminant reads the next account id's worth of bytes as `Id`.
    pub fn decode_compat(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        match discriminant(bytes, "multi-address")? {
            0..=4 => Self::decode(ctx, bytes),
            _ => {
                let account_len = ctx.config.account_id_len();
                let id = take(bytes, account_len, "account id")?;
                Ok((MultiAddress::Id(id.to_vec()), account_len))
            }
        }
    }

    pub fn account_id(&self) -> Option<&[u8]> {
        match self {
            MultiAddress::Id(id) => Some(id),
            MultiAddress::Address32(raw) => Some(raw),
            MultiAddress::Address20(raw) => Some(raw),
            MultiAddress::Index(_) | MultiAddress::Raw(_) => None,
        }
    }
}

impl Scale for MultiAddress {
    fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        match self {
            MultiAddress::Id(id) => {
                if id.len() != ctx.config.account_id_len() {
                    return Err(WalletError::invalid(format!(
                        "account id of {} bytes on a chain with {}-byte accounts",
                        id.len(),
                        ctx.config.account_id_len()
                    )));
                }
                out.push(0);
                out.extend_from_slice(id);
            }
            MultiAddress::Index(index) => {
                out.push(1);
                encode_compact(*index, out);
            }
            MultiAddress::Raw(raw) => {
                out.push(2);
                Bytes(raw.clone()).encode_to(ctx, out)?;
            }
            MultiAddress::Address32(raw) => {
                out.push(3);
                out.extend_from_slice(raw);
            }
            MultiAddress::Address20(raw) => {
                out.push(4);
                out.extend_from_slice(raw);
            }
        }
        Ok(())
    }

    fn decode(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let tag = discriminant(bytes, "multi-address")?;
        let rest = &bytes[1..];
        match tag {
            0 => {
                let len = ctx.config.account_id_len();
                let id = take(rest, len, "account id")?;
                Ok((MultiAddress::Id(id.to_vec()), 1 + len))
            }
            1 => {
                let (index, consumed) = decode_compact(rest)?;
                Ok((MultiAddress::Index(index), 1 + consumed))
            }
            2 => {
                let (raw, consumed) = Bytes::decode(ctx, rest)?;
                Ok((MultiAddress::Raw(raw.0), 1 + consumed))
            }
            3 => {
                let (raw, consumed) = <[u8; 32]>::decode(ctx, rest)?;
                Ok((MultiAddress::Address32(raw), 1 + consumed))
            }
            4 => {
                let (raw, consumed) = <[u8; 20]>::decode(ctx, rest)?;
                Ok((MultiAddress::Address20(raw), 1 + consumed))
            }
            other => Err(unknown_variant("multi-address", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::test_context;

    #[test]
    fn id_layout() {
        let ctx = test_context();
        let address = MultiAddress::Id(vec![0xab; 32]);
        let encoded = address.encode(&ctx).unwrap();
        assert_eq!(encoded.len(), 33);
        assert_eq!(encoded[0], 0);
        assert_eq!(MultiAddress::decode(&ctx, &encoded).unwrap(), (address, 33));
    }

    #[test]
    fn every_variant_round_trips() {
        let ctx = test_context();
        for address in [
            MultiAddress::Index(70_000),
            MultiAddress::Raw(vec![1, 2, 3]),
            MultiAddress::Address32([9; 32]),
            MultiAddress::Address20([8; 20]),
        ] {
            let encoded = address.encode(&ctx).unwrap();
            let (decoded, consumed) = MultiAddress::decode(&ctx, &encoded).unwrap();
            assert_eq!(decoded, address);
            assert_eq!(consumed, encoded.len());
        }
    }

    #[test]
    fn unknown_discriminant_fails_closed() {
        let ctx = test_context();
        let mut bytes = vec![7u8];
        bytes.extend_from_slice(&[0u8; 40]);
        assert!(MultiAddress::decode(&ctx, &bytes).is_err());
        assert!(MultiAddress::decode_compat(&ctx, &bytes[..20]).is_err());
    }

    #[test]
    fn bare_account_id_compat() {
        let ctx = test_context();
        let mut bytes = vec![0xd4u8; 32];
        bytes.extend_from_slice(&[1, 2, 3]);
        let (decoded, consumed) = MultiAddress::decode_compat(&ctx, &bytes).unwrap();
        assert_eq!(decoded, MultiAddress::Id(vec![0xd4; 32]));
        assert_eq!(consumed, 32);

        let tagged = MultiAddress::Id(vec![0xd4; 32]).encode(&ctx).unwrap();
        assert_eq!(MultiAddress::decode_compat(&ctx, &tagged).unwrap().1, 33);
    }

    #[test]
    fn wrong_id_width_rejected() {
        let ctx = test_context();
        assert!(MultiAddress::Id(vec![0; 20]).encode(&ctx).is_err());
    }
}
