use crate::error::{WalletError, WalletResult};
use crate::scale::{discriminant, take, Scale, ScaleContext};

const MIN_PERIOD: u64 = 4;
const MAX_PERIOD: u64 = 1 << 16;

/// Era for transaction mortality
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Era {
    /// Transaction is immortal
    Immortal,
    /// Valid for `period` blocks starting at a block whose number is `phase` modulo `period`
    Mortal { period: u64, phase: u64 },
}

impl Era {
    /// Mortal era covering `current_block`, with a period of at least `period` blocks.
    pub fn mortal(period: u64, current_block: u64) -> Self {
        // Period must be power of 2 between 4 and 65536
        let period = period.clamp(MIN_PERIOD, MAX_PERIOD).next_power_of_two();
        let quantize_factor = (period >> 12).max(1);
        let phase = current_block % period / quantize_factor * quantize_factor;
        Era::Mortal { period, phase }
    }

    pub fn is_immortal(&self) -> bool {
        matches!(self, Era::Immortal)
    }

    /// First block at or before `current` from which the era is valid.
    pub fn birth(&self, current: u64) -> u64 {
        match self {
            Era::Immortal => 0,
            Era::Mortal { period, phase } => {
                (current.max(*phase) - phase) / period * period + phase
            }
        }
    }

    /// First block at which the era is no longer valid.
    pub fn death(&self, current: u64) -> u64 {
        match self {
            Era::Immortal => u64::MAX,
            Era::Mortal { period, .. } => self.birth(current) + period,
        }
    }
}

impl Scale for Era {
    fn encode_to(&self, _ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        match self {
            Era::Immortal => out.push(0),
            Era::Mortal { period, phase } => {
                let quantize_factor = (*period >> 12).max(1);
                let encoded_period = (period.trailing_zeros() as u16).saturating_sub(1).clamp(1, 15);
                let quantized_phase = (*phase / quantize_factor) as u16;
                let encoded = encoded_period | (quantized_phase << 4);
                out.extend_from_slice(&encoded.to_le_bytes());
            }
        }
        Ok(())
    }

    fn decode(_ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        if discriminant(bytes, "era")? == 0 {
            return Ok((Era::Immortal, 1));
        }
        let raw = take(bytes, 2, "mortal era")?;
        let encoded = u16::from_le_bytes([raw[0], raw[1]]) as u64;
        let period = 2u64 << (encoded % 16);
        let quantize_factor = (period >> 12).max(1);
        let phase = (encoded >> 4) * quantize_factor;
        if period < MIN_PERIOD || phase >= period {
            return Err(WalletError::invalid(format!(
                "invalid mortal era: period {period}, phase {phase}"
            )));
        }
        Ok((Era::Mortal { period, phase }, 2))
    }
}
