//! Extrinsic assembly: era, signature, framing, signing payload, and the prepared-batch
//! record format.

pub mod details;
pub mod era;
pub mod extrinsic;
pub mod payload;
pub mod signature;

pub use details::{decode_batch, encode_batch, total_fee, TransactionDetails};
pub use era::Era;
pub use extrinsic::{SignedExtra, Transaction};
pub use payload::{ChainState, TransactionPayload};
pub use signature::Signature;
