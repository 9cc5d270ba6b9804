use crate::address::Address;
use crate::error::WalletResult;
use crate::method::Method;
use crate::scale::compact::{encode_compact, encode_compact_len};
use crate::scale::{Bytes, Compact, FixedUint, Hash, Scale, ScaleContext};

/// A dynamically typed SCALE value.
///
/// Call arguments and storage keys are carried as ordered lists of these so that one
/// encoder serves every operation regardless of its argument types.
#[derive(Clone, Debug, PartialEq)]
pub enum ScaleValue {
    Compact(Compact),
    UInt(FixedUint),
    Bool(bool),
    Bytes(Vec<u8>),
    Text(String),
    Hash(Hash),
    /// Encoded per the chain's lookup-source format.
    Address(Address),
    /// Encoded as bare account id bytes.
    AccountId(Address),
    Option(Option<Box<ScaleValue>>),
    Array(Vec<ScaleValue>),
    Tuple(Vec<ScaleValue>),
    Enum { index: u8, fields: Vec<ScaleValue> },
    Call(Box<Method>),
}

impl ScaleValue {
    pub fn compact(value: impl Into<Compact>) -> Self {
        ScaleValue::Compact(value.into())
    }

    pub fn u32(value: u32) -> Self {
        ScaleValue::UInt(FixedUint {
            value: value as u128,
            bits: 32,
        })
    }

    pub fn unit_variant(index: u8) -> Self {
        ScaleValue::Enum {
            index,
            fields: Vec::new(),
        }
    }

    pub fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        match self {
            ScaleValue::Compact(value) => encode_compact(value.0, out),
            ScaleValue::UInt(value) => value.encode_to(out),
            ScaleValue::Bool(value) => value.encode_to(ctx, out)?,
            ScaleValue::Bytes(value) => Bytes(value.clone()).encode_to(ctx, out)?,
            ScaleValue::Text(value) => value.encode_to(ctx, out)?,
            ScaleValue::Hash(value) => value.encode_to(out),
            ScaleValue::Address(value) => value.encode_to(ctx, out)?,
            ScaleValue::AccountId(value) => value.encode_account_id(ctx, out)?,
            ScaleValue::Option(None) => out.push(0),
            ScaleValue::Option(Some(value)) => {
                out.push(1);
                value.encode_to(ctx, out)?;
            }
            ScaleValue::Array(items) => {
                encode_compact_len(items.len(), out);
                for item in items {
                    item.encode_to(ctx, out)?;
                }
            }
            ScaleValue::Tuple(items) => {
                for item in items {
                    item.encode_to(ctx, out)?;
                }
            }
            ScaleValue::Enum { index, fields } => {
                out.push(*index);
                for field in fields {
                    field.encode_to(ctx, out)?;
                }
            }
            ScaleValue::Call(method) => method.encode_to(ctx, out)?,
        }
        Ok(())
    }

    pub fn encode(&self, ctx: &ScaleContext) -> WalletResult<Vec<u8>> {
        let mut out = Vec::new();
        self.encode_to(ctx, &mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::test_context;

    #[test]
    fn nested_values_concatenate() {
        let ctx = test_context();
        let value = ScaleValue::Tuple(vec![
            ScaleValue::Bool(true),
            ScaleValue::compact(500u32),
            ScaleValue::Option(None),
            ScaleValue::Option(Some(Box::new(ScaleValue::u32(1)))),
            ScaleValue::Array(vec![ScaleValue::unit_variant(2), ScaleValue::unit_variant(0)]),
            ScaleValue::Text("hi".to_string()),
        ]);
        assert_eq!(
            hex::encode(value.encode(&ctx).unwrap()),
            "01d107000101000000080200086869"
        );
    }

    #[test]
    fn address_forms_differ() {
        let ctx = test_context();
        let address = Address::placeholder(&ctx.config);
        let lookup = ScaleValue::Address(address.clone()).encode(&ctx).unwrap();
        let raw = ScaleValue::AccountId(address).encode(&ctx).unwrap();
        assert_eq!(lookup.len(), 33);
        assert_eq!(raw.len(), 32);
        assert_eq!(&lookup[1..], raw.as_slice());
    }
}
