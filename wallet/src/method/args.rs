//! Typed arguments for each supported operation.

use std::fmt;

use crate::address::Address;
use crate::error::WalletResult;
use crate::method::Method;
use crate::scale::compact::decode_compact;
use crate::scale::{discriminant, unknown_variant, Bytes, Scale, ScaleContext, ScaleValue};

#[derive(Clone, Debug, PartialEq)]
pub struct TransferArgs {
    pub dest: Address,
    pub value: u128,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TransferAllArgs {
    pub dest: Address,
    pub keep_alive: bool,
}

/// Where staking rewards are paid.
#[derive(Clone, Debug, PartialEq)]
pub enum RewardDestination {
    Staked,
    Stash,
    Controller,
    Account(Address),
    None,
}

impl RewardDestination {
    fn to_value(&self) -> ScaleValue {
        match self {
            RewardDestination::Staked => ScaleValue::unit_variant(0),
            RewardDestination::Stash => ScaleValue::unit_variant(1),
            RewardDestination::Controller => ScaleValue::unit_variant(2),
            RewardDestination::Account(account) => ScaleValue::Enum {
                index: 3,
                fields: vec![ScaleValue::AccountId(account.clone())],
            },
            RewardDestination::None => ScaleValue::unit_variant(4),
        }
    }

    fn decode(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let destination = match discriminant(bytes, "reward destination")? {
            0 => RewardDestination::Staked,
            1 => RewardDestination::Stash,
            2 => RewardDestination::Controller,
            3 => {
                let (account, consumed) = Address::decode_account_id(ctx, &bytes[1..])?;
                return Ok((RewardDestination::Account(account), 1 + consumed));
            }
            4 => RewardDestination::None,
            other => return Err(unknown_variant("reward destination", other)),
        };
        Ok((destination, 1))
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BondArgs {
    pub value: u128,
    pub payee: RewardDestination,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BondExtraArgs {
    pub max_additional: u128,
}

#[derive(Clone, Debug, PartialEq)]
pub struct UnbondArgs {
    pub value: u128,
}

#[derive(Clone, Debug, PartialEq)]
pub struct WithdrawUnbondedArgs {
    pub num_slashing_spans: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NominateArgs {
    pub targets: Vec<Address>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RemarkArgs {
    pub remark: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct BatchArgs {
    pub calls: Vec<Method>,
}

/// Arguments of an operation supplied by a registered [`CallProvider`](super::registry::CallProvider).
#[derive(Clone, Debug, PartialEq)]
pub struct CustomArgs {
    pub tag: String,
    pub fields: Vec<(String, ScaleValue)>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum CallArgs {
    Transfer(TransferArgs),
    TransferKeepAlive(TransferArgs),
    TransferAll(TransferAllArgs),
    Bond(BondArgs),
    BondExtra(BondExtraArgs),
    Unbond(UnbondArgs),
    WithdrawUnbonded(WithdrawUnbondedArgs),
    Nominate(NominateArgs),
    Chill,
    Remark(RemarkArgs),
    Batch(BatchArgs),
    BatchAll(BatchArgs),
    Custom(CustomArgs),
}

pub const TRANSFER: &str = "transfer";
pub const TRANSFER_KEEP_ALIVE: &str = "transfer_keep_alive";
pub const TRANSFER_ALL: &str = "transfer_all";
pub const BOND: &str = "bond";
pub const BOND_EXTRA: &str = "bond_extra";
pub const UNBOND: &str = "unbond";
pub const WITHDRAW_UNBONDED: &str = "withdraw_unbonded";
pub const NOMINATE: &str = "nominate";
pub const CHILL: &str = "chill";
pub const REMARK: &str = "remark";
pub const BATCH: &str = "batch";
pub const BATCH_ALL: &str = "batch_all";

impl CallArgs {
    pub fn transfer(dest: Address, value: u128) -> Self {
        CallArgs::Transfer(TransferArgs { dest, value })
    }

    pub fn tag(&self) -> &str {
        match self {
            CallArgs::Transfer(_) => TRANSFER,
            CallArgs::TransferKeepAlive(_) => TRANSFER_KEEP_ALIVE,
            CallArgs::TransferAll(_) => TRANSFER_ALL,
            CallArgs::Bond(_) => BOND,
            CallArgs::BondExtra(_) => BOND_EXTRA,
            CallArgs::Unbond(_) => UNBOND,
            CallArgs::WithdrawUnbonded(_) => WITHDRAW_UNBONDED,
            CallArgs::Nominate(_) => NOMINATE,
            CallArgs::Chill => CHILL,
            CallArgs::Remark(_) => REMARK,
            CallArgs::Batch(_) => BATCH,
            CallArgs::BatchAll(_) => BATCH_ALL,
            CallArgs::Custom(args) => &args.tag,
        }
    }

    /// Named arguments in call order.
    pub fn fields(&self) -> Vec<(String, ScaleValue)> {
        fn named(fields: Vec<(&str, ScaleValue)>) -> Vec<(String, ScaleValue)> {
            fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect()
        }

        match self {
            CallArgs::Transfer(args) | CallArgs::TransferKeepAlive(args) => named(vec![
                ("dest", ScaleValue::Address(args.dest.clone())),
                ("value", ScaleValue::compact(args.value)),
            ]),
            CallArgs::TransferAll(args) => named(vec![
                ("dest", ScaleValue::Address(args.dest.clone())),
                ("keep_alive", ScaleValue::Bool(args.keep_alive)),
            ]),
            CallArgs::Bond(args) => named(vec![
                ("value", ScaleValue::compact(args.value)),
                ("payee", args.payee.to_value()),
            ]),
            CallArgs::BondExtra(args) => {
                named(vec![("max_additional", ScaleValue::compact(args.max_additional))])
            }
            CallArgs::Unbond(args) => named(vec![("value", ScaleValue::compact(args.value))]),
            CallArgs::WithdrawUnbonded(args) => named(vec![(
                "num_slashing_spans",
                ScaleValue::u32(args.num_slashing_spans),
            )]),
            CallArgs::Nominate(args) => named(vec![(
                "targets",
                ScaleValue::Array(args.targets.iter().cloned().map(ScaleValue::Address).collect()),
            )]),
            CallArgs::Chill => Vec::new(),
            CallArgs::Remark(args) => named(vec![("remark", ScaleValue::Bytes(args.remark.clone()))]),
            CallArgs::Batch(args) | CallArgs::BatchAll(args) => named(vec![(
                "calls",
                ScaleValue::Array(
                    args.calls
                        .iter()
                        .cloned()
                        .map(|call| ScaleValue::Call(Box::new(call)))
                        .collect(),
                ),
            )]),
            CallArgs::Custom(args) => args.fields.clone(),
        }
    }

    pub fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        for (_, value) in self.fields() {
            value.encode_to(ctx, out)?;
        }
        Ok(())
    }

    /// Decodes the arguments of the operation identified by `tag`.
    pub fn decode(ctx: &ScaleContext, tag: &str, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let mut reader = Reader { ctx, bytes, offset: 0 };
        let args = match tag {
            TRANSFER | TRANSFER_KEEP_ALIVE => {
                let args = TransferArgs {
                    dest: reader.read()?,
                    value: reader.compact()?,
                };
                if tag == TRANSFER {
                    CallArgs::Transfer(args)
                } else {
                    CallArgs::TransferKeepAlive(args)
                }
            }
            TRANSFER_ALL => CallArgs::TransferAll(TransferAllArgs {
                dest: reader.read()?,
                keep_alive: reader.read()?,
            }),
            BOND => {
                let value = reader.compact()?;
                let (payee, consumed) = RewardDestination::decode(ctx, reader.rest())?;
                reader.offset += consumed;
                CallArgs::Bond(BondArgs { value, payee })
            }
            BOND_EXTRA => CallArgs::BondExtra(BondExtraArgs {
                max_additional: reader.compact()?,
            }),
            UNBOND => CallArgs::Unbond(UnbondArgs {
                value: reader.compact()?,
            }),
            WITHDRAW_UNBONDED => CallArgs::WithdrawUnbonded(WithdrawUnbondedArgs {
                num_slashing_spans: reader.read()?,
            }),
            NOMINATE => CallArgs::Nominate(NominateArgs {
                targets: reader.read()?,
            }),
            CHILL => CallArgs::Chill,
            REMARK => CallArgs::Remark(RemarkArgs {
                remark: reader.read::<Bytes>()?.0,
            }),
            BATCH => CallArgs::Batch(BatchArgs {
                calls: reader.read()?,
            }),
            BATCH_ALL => CallArgs::BatchAll(BatchArgs {
                calls: reader.read()?,
            }),
            custom => {
                let provider = ctx.calls()?.provider(custom)?;
                let (fields, consumed) = provider.decode(ctx, reader.rest())?;
                reader.offset += consumed;
                CallArgs::Custom(CustomArgs {
                    tag: custom.to_string(),
                    fields,
                })
            }
        };
        Ok((args, reader.offset))
    }

    /// Human-readable view of the operation as sent by `from`.
    pub fn summary(&self, from: &Address) -> CallSummary {
        let (to, amount) = match self {
            CallArgs::Transfer(args) | CallArgs::TransferKeepAlive(args) => {
                (Some(args.dest.clone()), Some(args.value))
            }
            CallArgs::TransferAll(args) => (Some(args.dest.clone()), None),
            CallArgs::Bond(args) => (None, Some(args.value)),
            CallArgs::BondExtra(args) => (None, Some(args.max_additional)),
            CallArgs::Unbond(args) => (None, Some(args.value)),
            CallArgs::Batch(args) | CallArgs::BatchAll(args) => {
                let inner: Vec<CallSummary> =
                    args.calls.iter().map(|call| call.args.summary(from)).collect();
                let amount = inner
                    .iter()
                    .try_fold(0u128, |sum, s| s.amount.map(|a| sum.saturating_add(a)));
                let to = match inner.first().and_then(|s| s.to.clone()) {
                    Some(first) if inner.iter().all(|s| s.to.as_ref() == Some(&first)) => Some(first),
                    _ => None,
                };
                (to, amount.filter(|_| !inner.is_empty()))
            }
            CallArgs::WithdrawUnbonded(_)
            | CallArgs::Nominate(_)
            | CallArgs::Chill
            | CallArgs::Remark(_)
            | CallArgs::Custom(_) => (None, None),
        };
        CallSummary {
            tag: self.tag().to_string(),
            from: from.clone(),
            to,
            amount,
        }
    }
}

/// Sequential reader over call argument bytes.
struct Reader<'a> {
    ctx: &'a ScaleContext,
    bytes: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn rest(&self) -> &'a [u8] {
        &self.bytes[self.offset..]
    }

    fn read<T: Scale>(&mut self) -> WalletResult<T> {
        let (value, consumed) = T::decode(self.ctx, self.rest())?;
        self.offset += consumed;
        Ok(value)
    }

    fn compact(&mut self) -> WalletResult<u128> {
        let (value, consumed) = decode_compact(self.rest())?;
        self.offset += consumed;
        Ok(value)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct CallSummary {
    pub tag: String,
    pub from: Address,
    pub to: Option<Address>,
    pub amount: Option<u128>,
}

impl fmt::Display for CallSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} from {}", self.tag, self.from)?;
        if let Some(to) = &self.to {
            write!(f, " to {to}")?;
        }
        if let Some(amount) = self.amount {
            write!(f, " amount {amount}")?;
        }
        Ok(())
    }
}

/// Reads a `Vec<u8>`-shaped argument for providers.
pub fn read_bytes(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Vec<u8>, usize)> {
    Bytes::decode(ctx, bytes).map(|(b, consumed)| (b.0, consumed))
}
