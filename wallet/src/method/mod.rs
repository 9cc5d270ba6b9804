//! Calls and their arguments.
//!
//! A [`Method`] is a resolved call index plus typed [`CallArgs`]. Indices come from
//! runtime metadata through [`CallRegistry`]; the argument layout of each operation is
//! fixed by its `CallArgs` variant or, for chain-specific operations, by a registered
//! [`CallProvider`].

pub mod args;
pub mod registry;

use crate::error::WalletResult;
use crate::metadata::CallIndex;
use crate::scale::{take, Scale, ScaleContext};

pub use args::{CallArgs, CallSummary, RewardDestination};
pub use registry::{CallProvider, CallRegistry};

#[derive(Clone, Debug, PartialEq)]
pub struct Method {
    pub call_index: CallIndex,
    pub args: CallArgs,
}

impl Method {
    pub fn new(call_index: CallIndex, args: CallArgs) -> Self {
        Self { call_index, args }
    }

    pub fn tag(&self) -> &str {
        self.args.tag()
    }

    /// Decodes a call whose operation tag is already known.
    pub fn decode_as(ctx: &ScaleContext, tag: &str, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let (call_index, rest) = read_index(bytes)?;
        let (args, consumed) = CallArgs::decode(ctx, tag, rest)?;
        Ok((Method::new(call_index, args), 2 + consumed))
    }
}

fn read_index(bytes: &[u8]) -> WalletResult<(CallIndex, &[u8])> {
    let raw = take(bytes, 2, "call index")?;
    Ok((CallIndex::new(raw[0], raw[1]), &bytes[2..]))
}

impl Scale for Method {
    fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        out.push(self.call_index.pallet_index);
        out.push(self.call_index.call_index);
        self.args.encode_to(ctx, out)
    }

    /// Looks the operation up by call index; needs a call registry in the context.
    fn decode(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let (call_index, _) = read_index(bytes)?;
        let tag = ctx.calls()?.tag_for(call_index)?;
        Self::decode_as(ctx, &tag, bytes)
    }
}
