use crate::error::{WalletError, WalletResult};
use crate::scale::{take, Scale, ScaleContext};

const SINGLE_BYTE_MAX: u128 = 0x3f;
const TWO_BYTE_MAX: u128 = 0x3fff;
const FOUR_BYTE_MAX: u128 = 0x3fff_ffff;

/// Variable-length SCALE integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Compact(pub u128);

impl From<u128> for Compact {
    fn from(value: u128) -> Self {
        Self(value)
    }
}

impl From<u64> for Compact {
    fn from(value: u64) -> Self {
        Self(value as u128)
    }
}

impl From<u32> for Compact {
    fn from(value: u32) -> Self {
        Self(value as u128)
    }
}

impl From<usize> for Compact {
    fn from(value: usize) -> Self {
        Self(value as u128)
    }
}

pub fn encode_compact(value: u128, out: &mut Vec<u8>) {
    if value <= SINGLE_BYTE_MAX {
        out.push((value as u8) << 2);
    } else if value <= TWO_BYTE_MAX {
        let v = ((value as u16) << 2) | 0b01;
        out.extend_from_slice(&v.to_le_bytes());
    } else if value <= FOUR_BYTE_MAX {
        let v = ((value as u32) << 2) | 0b10;
        out.extend_from_slice(&v.to_le_bytes());
    } else {
        // Big integer mode, at least 4 magnitude bytes.
        let bytes_needed = (((128 - value.leading_zeros() + 7) / 8) as u8).max(4);
        out.push(((bytes_needed - 4) << 2) | 0b11);
        out.extend_from_slice(&value.to_le_bytes()[..bytes_needed as usize]);
    }
}

pub fn encode_compact_len(len: usize, out: &mut Vec<u8>) {
    encode_compact(len as u128, out);
}

/// Decodes a compact integer, rejecting non-canonical encodings.
pub fn decode_compact(bytes: &[u8]) -> WalletResult<(u128, usize)> {
    let first = take(bytes, 1, "compact integer")?[0];
    match first & 0b11 {
        0b00 => Ok(((first >> 2) as u128, 1)),
        0b01 => {
            let raw = take(bytes, 2, "compact integer")?;
            let value = (u16::from_le_bytes([raw[0], raw[1]]) >> 2) as u128;
            if value <= SINGLE_BYTE_MAX {
                return Err(non_canonical(value));
            }
            Ok((value, 2))
        }
        0b10 => {
            let raw = take(bytes, 4, "compact integer")?;
            let value = (u32::from_le_bytes([raw[0], raw[1], raw[2], raw[3]]) >> 2) as u128;
            if value <= TWO_BYTE_MAX {
                return Err(non_canonical(value));
            }
            Ok((value, 4))
        }
        _ => {
            let len = (first >> 2) as usize + 4;
            if len > 16 {
                return Err(WalletError::invalid(format!(
                    "compact integer of {len} bytes exceeds 128 bits"
                )));
            }
            let raw = take(&bytes[1..], len, "compact integer")?;
            let mut buf = [0u8; 16];
            buf[..len].copy_from_slice(raw);
            let value = u128::from_le_bytes(buf);
            if value <= FOUR_BYTE_MAX || raw[len - 1] == 0 {
                return Err(non_canonical(value));
            }
            Ok((value, 1 + len))
        }
    }
}

/// Decodes a compact length prefix as `usize`.
pub fn decode_compact_len(bytes: &[u8]) -> WalletResult<(usize, usize)> {
    let (len, consumed) = decode_compact(bytes)?;
    let len = usize::try_from(len)
        .map_err(|_| WalletError::invalid(format!("length {len} does not fit in memory")))?;
    Ok((len, consumed))
}

fn non_canonical(value: u128) -> WalletError {
    WalletError::invalid(format!("non-canonical compact encoding of {value}"))
}

impl Scale for Compact {
    fn encode_to(&self, _ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        encode_compact(self.0, out);
        Ok(())
    }

    fn decode(_ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        decode_compact(bytes).map(|(value, consumed)| (Compact(value), consumed))
    }
}
