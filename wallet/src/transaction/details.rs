//! Prepared-transaction records.
//!
//! A prepared batch travels between the preparing and the signing side as a SCALE array
//! of length-prefixed records:
//!
//! ```text
//! Vec<Bytes(Option<u32> runtime_version, String tag, Compact fee, Transaction, String payload_hex)>
//! ```
//!
//! Each record is decoded with its own runtime version so that version-gated fields of
//! the inner transaction line up with how it was built.

use crate::error::{WalletError, WalletResult};
use crate::scale::compact::{decode_compact, encode_compact};
use crate::scale::{Bytes, Scale, ScaleContext};
use crate::transaction::extrinsic::Transaction;
use crate::transaction::payload::TransactionPayload;

#[derive(Clone, Debug, PartialEq)]
pub struct TransactionDetails {
    pub runtime_version: Option<u32>,
    pub tag: String,
    pub fee: u128,
    pub transaction: Transaction,
    pub payload: TransactionPayload,
}

impl TransactionDetails {
    /// Context for the inner transaction: `ctx` pinned to this record's runtime version.
    pub fn context(&self, ctx: &ScaleContext) -> ScaleContext {
        ctx.clone().with_runtime_version(self.runtime_version)
    }

    /// Replaces the transaction, keeping fee and payload.
    pub fn with_transaction(&self, transaction: Transaction) -> Self {
        Self {
            transaction,
            ..self.clone()
        }
    }
}

impl Scale for TransactionDetails {
    fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        let record_ctx = self.context(ctx);
        let mut record = Vec::new();
        self.runtime_version.encode_to(&record_ctx, &mut record)?;
        self.tag.encode_to(&record_ctx, &mut record)?;
        encode_compact(self.fee, &mut record);
        self.transaction.encode_to(&record_ctx, &mut record)?;
        self.payload.to_hex().encode_to(&record_ctx, &mut record)?;
        Bytes(record).encode_to(ctx, out)
    }

    fn decode(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let (Bytes(record), consumed) = Bytes::decode(ctx, bytes)?;
        let (runtime_version, mut offset) = Option::<u32>::decode(ctx, &record)?;
        let record_ctx = ctx.clone().with_runtime_version(runtime_version);
        let (tag, read) = String::decode(&record_ctx, &record[offset..])?;
        offset += read;
        let (fee, read) = decode_compact(&record[offset..])?;
        offset += read;
        let (transaction, read) = Transaction::decode_as(&record_ctx, &tag, &record[offset..])?;
        offset += read;
        let (payload_hex, read) = String::decode(&record_ctx, &record[offset..])?;
        offset += read;
        if offset != record.len() {
            return Err(WalletError::invalid(format!(
                "{} trailing bytes in transaction record",
                record.len() - offset
            )));
        }
        Ok((
            Self {
                runtime_version,
                tag,
                fee,
                transaction,
                payload: TransactionPayload::from_hex(&payload_hex)?,
            },
            consumed,
        ))
    }
}

pub fn encode_batch(ctx: &ScaleContext, batch: &[TransactionDetails]) -> WalletResult<Vec<u8>> {
    batch.to_vec().encode(ctx)
}

/// Decodes a prepared batch; the context needs a call registry for nested calls.
pub fn decode_batch(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<Vec<TransactionDetails>> {
    Vec::<TransactionDetails>::decode_all(ctx, bytes)
}

pub fn total_fee(batch: &[TransactionDetails]) -> u128 {
    batch.iter().fold(0u128, |acc, details| acc.saturating_add(details.fee))
}
