use crate::error::{WalletError, WalletResult};
use crate::scale::compact::{decode_compact_len, encode_compact_len};
use crate::scale::{discriminant, take, unknown_variant, Scale, ScaleContext};

macro_rules! impl_fixed_int {
    ($($ty:ty),*) => {$(
        impl Scale for $ty {
            fn encode_to(&self, _ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
                out.extend_from_slice(&self.to_le_bytes());
                Ok(())
            }

            fn decode(_ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
                const LEN: usize = std::mem::size_of::<$ty>();
                let raw = take(bytes, LEN, stringify!($ty))?;
                let mut buf = [0u8; LEN];
                buf.copy_from_slice(raw);
                Ok((<$ty>::from_le_bytes(buf), LEN))
            }
        }
    )*};
}

impl_fixed_int!(u8, u16, u32, u64, u128);

/// Unsigned little-endian integer whose bit width is chosen by the caller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FixedUint {
    pub value: u128,
    pub bits: u16,
}

impl FixedUint {
    pub fn new(value: u128, bits: u16) -> WalletResult<Self> {
        if bits == 0 || bits % 8 != 0 || bits > 128 {
            return Err(WalletError::invalid(format!("unsupported integer width {bits}")));
        }
        if bits < 128 && value >> bits != 0 {
            return Err(WalletError::invalid(format!(
                "value {value} does not fit in {bits} bits"
            )));
        }
        Ok(Self { value, bits })
    }

    pub fn byte_len(&self) -> usize {
        self.bits as usize / 8
    }

    pub fn decode_with(bits: u16, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let sized = Self::new(0, bits)?;
        let len = sized.byte_len();
        let raw = take(bytes, len, "fixed-width integer")?;
        let mut buf = [0u8; 16];
        buf[..len].copy_from_slice(raw);
        Ok((
            Self {
                value: u128::from_le_bytes(buf),
                bits,
            },
            len,
        ))
    }

    pub fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.value.to_le_bytes()[..self.byte_len()]);
    }
}

impl Scale for bool {
    fn encode_to(&self, _ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        out.push(*self as u8);
        Ok(())
    }

    fn decode(_ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        match discriminant(bytes, "bool")? {
            0 => Ok((false, 1)),
            1 => Ok((true, 1)),
            other => Err(WalletError::invalid(format!("invalid bool byte {other:#04x}"))),
        }
    }
}

/// Compact-length prefixed byte string.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Bytes(pub Vec<u8>);

impl From<Vec<u8>> for Bytes {
    fn from(value: Vec<u8>) -> Self {
        Self(value)
    }
}

impl From<&[u8]> for Bytes {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl Scale for Bytes {
    fn encode_to(&self, _ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        encode_compact_len(self.0.len(), out);
        out.extend_from_slice(&self.0);
        Ok(())
    }

    fn decode(_ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let (len, prefix) = decode_compact_len(bytes)?;
        let body = take(&bytes[prefix..], len, "byte string")?;
        Ok((Bytes(body.to_vec()), prefix + len))
    }
}

impl Scale for String {
    fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        Bytes(self.as_bytes().to_vec()).encode_to(ctx, out)
    }

    fn decode(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let (raw, consumed) = Bytes::decode(ctx, bytes)?;
        let text = String::from_utf8(raw.0)
            .map_err(|e| WalletError::invalid(format!("invalid utf-8 string: {e}")))?;
        Ok((text, consumed))
    }
}

/// Fixed-length hash without a length prefix.
///
/// An empty hash encodes as zeros of the declared width; emptiness is tracked by flag
/// so that a zero-valued real hash is still distinguishable.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hash {
    bytes: Vec<u8>,
    empty: bool,
}

impl Hash {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
            empty: false,
        }
    }

    pub fn empty(bits: usize) -> Self {
        Self {
            bytes: vec![0u8; bits / 8],
            empty: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    pub fn bit_len(&self) -> usize {
        self.bytes.len() * 8
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(&self.bytes))
    }

    pub fn from_hex(value: &str) -> WalletResult<Self> {
        Ok(Self::new(hex::decode(value.trim_start_matches("0x"))?))
    }

    pub fn decode_with(bits: usize, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let len = bits / 8;
        let raw = take(bytes, len, "hash")?;
        Ok((Self::new(raw.to_vec()), len))
    }

    pub fn encode_to(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.bytes);
    }

    pub fn to_array32(&self) -> WalletResult<[u8; 32]> {
        self.bytes
            .as_slice()
            .try_into()
            .map_err(|_| WalletError::invalid(format!("expected 256-bit hash, got {} bits", self.bit_len())))
    }
}

impl<const N: usize> Scale for [u8; N] {
    fn encode_to(&self, _ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        out.extend_from_slice(self);
        Ok(())
    }

    fn decode(_ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let raw = take(bytes, N, "byte array")?;
        let mut out = [0u8; N];
        out.copy_from_slice(raw);
        Ok((out, N))
    }
}

impl<T: Scale> Scale for Option<T> {
    fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        match self {
            None => {
                out.push(0);
                Ok(())
            }
            Some(value) => {
                out.push(1);
                value.encode_to(ctx, out)
            }
        }
    }

    fn decode(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        match discriminant(bytes, "option")? {
            0 => Ok((None, 1)),
            1 => {
                let (value, consumed) = T::decode(ctx, &bytes[1..])?;
                Ok((Some(value), 1 + consumed))
            }
            other => Err(unknown_variant("option", other)),
        }
    }
}

impl<T: Scale> Scale for Vec<T> {
    fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        encode_compact_len(self.len(), out);
        for item in self {
            item.encode_to(ctx, out)?;
        }
        Ok(())
    }

    fn decode(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let (len, mut offset) = decode_compact_len(bytes)?;
        // Every element takes at least one byte.
        if len > bytes.len() - offset {
            return Err(WalletError::eof("array", len, bytes.len() - offset));
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            let (item, consumed) = T::decode(ctx, &bytes[offset..])?;
            offset += consumed;
            items.push(item);
        }
        Ok((items, offset))
    }
}

macro_rules! impl_tuple {
    ($($name:ident),+) => {
        impl<$($name: Scale),+> Scale for ($($name,)+) {
            #[allow(non_snake_case)]
            fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
                let ($($name,)+) = self;
                $($name.encode_to(ctx, out)?;)+
                Ok(())
            }

            #[allow(non_snake_case)]
            fn decode(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
                let mut offset = 0;
                $(
                    let ($name, consumed) = $name::decode(ctx, &bytes[offset..])?;
                    offset += consumed;
                )+
                Ok((($($name,)+), offset))
            }
        }
    };
}

impl_tuple!(A, B);
impl_tuple!(A, B, C);
impl_tuple!(A, B, C, D);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::{test_context, Compact};

    #[test]
    fn bool_vectors() {
        let ctx = test_context();
        assert_eq!(false.encode(&ctx).unwrap(), vec![0x00]);
        assert_eq!(true.encode(&ctx).unwrap(), vec![0x01]);
        assert_eq!(bool::decode(&ctx, &[0x01]).unwrap(), (true, 1));
        assert!(bool::decode(&ctx, &[0x02]).is_err());
    }

    #[test]
    fn option_vectors() {
        let ctx = test_context();
        assert_eq!(None::<u32>.encode(&ctx).unwrap(), vec![0x00]);
        let some = Some(Compact(500)).encode(&ctx).unwrap();
        assert_eq!(hex::encode(&some), "01d107");
        assert_eq!(
            Option::<Compact>::decode(&ctx, &some).unwrap(),
            (Some(Compact(500)), 3)
        );
        assert!(Option::<u8>::decode(&ctx, &[0x02, 0x00]).is_err());
    }

    #[test]
    fn fixed_ints_are_little_endian() {
        let ctx = test_context();
        assert_eq!(0x0102_0304u32.encode(&ctx).unwrap(), vec![4, 3, 2, 1]);
        let fixed = FixedUint::new(0x0102, 32).unwrap();
        let mut out = Vec::new();
        fixed.encode_to(&mut out);
        assert_eq!(out, vec![2, 1, 0, 0]);
        assert_eq!(FixedUint::decode_with(32, &out).unwrap(), (fixed, 4));
        assert!(FixedUint::new(256, 8).is_err());
        assert!(FixedUint::new(1, 12).is_err());
    }

    #[test]
    fn bytes_and_strings() {
        let ctx = test_context();
        let text = "transfer".to_string();
        let encoded = text.encode(&ctx).unwrap();
        assert_eq!(encoded[0], 8 << 2);
        assert_eq!(String::decode(&ctx, &encoded).unwrap(), (text, 9));
        assert!(Bytes::decode(&ctx, &[0x08, 0x01]).is_err());
    }

    #[test]
    fn hash_emptiness_is_a_flag() {
        let empty = Hash::empty(256);
        let zero = Hash::new(vec![0u8; 32]);
        assert!(empty.is_empty());
        assert!(!zero.is_empty());
        assert_eq!(empty.as_bytes(), zero.as_bytes());
        let (decoded, consumed) = Hash::decode_with(256, &[0u8; 40]).unwrap();
        assert_eq!(consumed, 32);
        assert!(!decoded.is_empty());
    }

    #[test]
    fn arrays_and_tuples() {
        let ctx = test_context();
        let value = vec![(1u8, Compact(64)), (2u8, Compact(0))];
        let encoded = value.encode(&ctx).unwrap();
        assert_eq!(hex::encode(&encoded), "080101010200");
        let (decoded, consumed) = Vec::<(u8, Compact)>::decode(&ctx, &encoded).unwrap();
        assert_eq!(decoded, value);
        assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn array_length_cannot_exceed_input() {
        let ctx = test_context();
        assert!(Vec::<u8>::decode(&ctx, &[0xfc, 0x00]).is_err());
    }
}
