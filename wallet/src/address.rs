//! Chain account identities.
//!
//! [`Address`] is a closed enum over the two families a chain can use. Which family is
//! in play is fixed by [`ChainConfig::address_family`]; every constructor takes the
//! config so that mixed-family values cannot be built by accident.

use std::fmt;

use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey as Secp256k1PublicKey;

use crate::config::{AddressFamily, AddressFormat, ChainConfig, SignatureScheme};
use crate::error::{WalletError, WalletResult};
use crate::hashing::{blake2_256, blake2_512, keccak_256};
use crate::scale::{take, MultiAddress, Scale, ScaleContext};

const SS58_PREFIX: &[u8] = b"SS58PRE";

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Ss58Address {
    prefix: u16,
    account_id: [u8; 32],
}

impl Ss58Address {
    pub fn new(prefix: u16, account_id: [u8; 32]) -> Self {
        Self { prefix, account_id }
    }

    pub fn prefix(&self) -> u16 {
        self.prefix
    }

    pub fn account_id(&self) -> &[u8; 32] {
        &self.account_id
    }

    pub fn encode(&self) -> String {
        let mut data = encode_ss58_prefix(self.prefix);
        data.extend_from_slice(&self.account_id);
        let checksum = ss58_checksum(&data);
        data.extend_from_slice(&checksum[..2]);
        bs58::encode(data).into_string()
    }

    /// Parses an SS58 string. Returns the prefix found in the string and the account id;
    /// 33-byte (compressed ECDSA) payloads are hashed down to their account id.
    pub fn decode(encoded: &str) -> WalletResult<Self> {
        let data = bs58::decode(encoded)
            .into_vec()
            .map_err(|e| WalletError::invalid(format!("invalid base58 address: {e}")))?;
        let (prefix, prefix_len) = decode_ss58_prefix(&data)?;
        let (payload_len, checksum_len) = match data.len() - prefix_len {
            2 => (1, 1),
            3 => (2, 1),
            5 => (4, 1),
            9 => (8, 1),
            34 => (32, 2),
            35 => (33, 2),
            other => {
                return Err(WalletError::invalid(format!(
                    "invalid ss58 body length {other}"
                )))
            }
        };
        let body_end = prefix_len + payload_len;
        let checksum = ss58_checksum(&data[..body_end]);
        if data[body_end..] != checksum[..checksum_len] {
            return Err(WalletError::invalid("invalid ss58 checksum"));
        }
        let payload = &data[prefix_len..body_end];
        let account_id = match payload_len {
            32 => {
                let mut id = [0u8; 32];
                id.copy_from_slice(payload);
                id
            }
            33 => blake2_256(payload),
            _ => {
                return Err(WalletError::unsupported(format!(
                    "{payload_len}-byte ss58 account indices"
                )))
            }
        };
        Ok(Self { prefix, account_id })
    }
}

fn encode_ss58_prefix(prefix: u16) -> Vec<u8> {
    if prefix < 64 {
        vec![prefix as u8]
    } else {
        let first = ((prefix & 0b0000_0000_1111_1100) >> 2) as u8 | 0b0100_0000;
        let second = ((prefix >> 8) as u8) | (((prefix & 0b0000_0000_0000_0011) as u8) << 6);
        vec![first, second]
    }
}

fn decode_ss58_prefix(data: &[u8]) -> WalletResult<(u16, usize)> {
    let first = *data
        .first()
        .ok_or_else(|| WalletError::invalid("empty ss58 address"))?;
    match first {
        0..=63 => Ok((first as u16, 1)),
        64..=127 => {
            let second = *data
                .get(1)
                .ok_or_else(|| WalletError::invalid("truncated ss58 prefix"))?;
            let lower = ((first & 0b0011_1111) << 2) | (second >> 6);
            let upper = second & 0b0011_1111;
            Ok(((lower as u16) | ((upper as u16) << 8), 2))
        }
        _ => Err(WalletError::invalid(format!("invalid ss58 prefix byte {first}"))),
    }
}

fn ss58_checksum(data: &[u8]) -> [u8; 64] {
    blake2_512(&[SS58_PREFIX, data])
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EthereumAddress([u8; 20]);

impl EthereumAddress {
    pub fn new(raw: [u8; 20]) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Derives the address from a secp256k1 public key in any SEC1 form.
    pub fn from_public_key(public_key: &[u8]) -> WalletResult<Self> {
        let key = match public_key.len() {
            64 => {
                let mut sec1 = Vec::with_capacity(65);
                sec1.push(0x04);
                sec1.extend_from_slice(public_key);
                Secp256k1PublicKey::from_sec1_bytes(&sec1)
            }
            _ => Secp256k1PublicKey::from_sec1_bytes(public_key),
        }
        .map_err(|e| WalletError::invalid(format!("invalid secp256k1 public key: {e}")))?;
        let uncompressed = key.to_encoded_point(false);
        let hash = keccak_256(&uncompressed.as_bytes()[1..]);
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&hash[12..]);
        Ok(Self(raw))
    }

    /// EIP-55 mixed-case checksummed form.
    pub fn encode(&self) -> String {
        let lower = hex::encode(self.0);
        let hash = keccak_256(lower.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in lower.chars().enumerate() {
            let nibble = (hash[i / 2] >> (if i % 2 == 0 { 4 } else { 0 })) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }

    /// Accepts all-lowercase, all-uppercase, or correctly checksummed strings.
    pub fn decode(encoded: &str) -> WalletResult<Self> {
        let body = encoded
            .strip_prefix("0x")
            .or_else(|| encoded.strip_prefix("0X"))
            .unwrap_or(encoded);
        if body.len() != 40 {
            return Err(WalletError::invalid(format!(
                "ethereum address must be 40 hex characters, got {}",
                body.len()
            )));
        }
        let bytes = hex::decode(body)?;
        let mut raw = [0u8; 20];
        raw.copy_from_slice(&bytes);
        let address = Self(raw);
        let mixed_case = body.chars().any(|c| c.is_ascii_lowercase())
            && body.chars().any(|c| c.is_ascii_uppercase());
        if mixed_case && address.encode()[2..] != *body {
            return Err(WalletError::invalid("invalid EIP-55 checksum"));
        }
        Ok(address)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Address {
    Ss58(Ss58Address),
    Ethereum(EthereumAddress),
}

/// Anything callers may hold when asking "is this the same account".
#[derive(Clone, Copy, Debug)]
pub enum AddressRef<'a> {
    Address(&'a Address),
    PublicKey(&'a [u8]),
    Encoded(&'a str),
}

impl<'a> From<&'a Address> for AddressRef<'a> {
    fn from(value: &'a Address) -> Self {
        AddressRef::Address(value)
    }
}

impl<'a> From<&'a str> for AddressRef<'a> {
    fn from(value: &'a str) -> Self {
        AddressRef::Encoded(value)
    }
}

impl<'a> From<&'a [u8]> for AddressRef<'a> {
    fn from(value: &'a [u8]) -> Self {
        AddressRef::PublicKey(value)
    }
}

impl Address {
    /// Builds the address owning `public_key` under the configured signature scheme.
    pub fn from_public_key(config: &ChainConfig, public_key: &[u8]) -> WalletResult<Self> {
        match config.address_family {
            AddressFamily::Ss58 { prefix } => {
                let account_id = match (config.signature_scheme, public_key.len()) {
                    (SignatureScheme::Ecdsa, 33) => blake2_256(public_key),
                    (SignatureScheme::Ecdsa, len) => {
                        return Err(WalletError::invalid(format!(
                            "ecdsa public key must be 33 bytes compressed, got {len}"
                        )))
                    }
                    (_, 32) => {
                        let mut id = [0u8; 32];
                        id.copy_from_slice(public_key);
                        id
                    }
                    (_, len) => {
                        return Err(WalletError::invalid(format!(
                            "public key must be 32 bytes, got {len}"
                        )))
                    }
                };
                Ok(Address::Ss58(Ss58Address::new(prefix, account_id)))
            }
            AddressFamily::Ethereum => Ok(Address::Ethereum(EthereumAddress::from_public_key(
                public_key,
            )?)),
        }
    }

    /// Parses the string form. SS58 strings are re-tagged with the chain's prefix so that
    /// the same account seen through another network's encoding compares equal.
    pub fn from_string(config: &ChainConfig, encoded: &str) -> WalletResult<Self> {
        match config.address_family {
            AddressFamily::Ss58 { prefix } => {
                let decoded = Ss58Address::decode(encoded)?;
                Ok(Address::Ss58(Ss58Address::new(prefix, decoded.account_id)))
            }
            AddressFamily::Ethereum => Ok(Address::Ethereum(EthereumAddress::decode(encoded)?)),
        }
    }

    /// Wraps raw account id bytes.
    pub fn from_raw(config: &ChainConfig, raw: &[u8]) -> WalletResult<Self> {
        match config.address_family {
            AddressFamily::Ss58 { prefix } => {
                let account_id: [u8; 32] = raw.try_into().map_err(|_| {
                    WalletError::invalid(format!("account id must be 32 bytes, got {}", raw.len()))
                })?;
                Ok(Address::Ss58(Ss58Address::new(prefix, account_id)))
            }
            AddressFamily::Ethereum => {
                let raw: [u8; 20] = raw.try_into().map_err(|_| {
                    WalletError::invalid(format!("account id must be 20 bytes, got {}", raw.len()))
                })?;
                Ok(Address::Ethereum(EthereumAddress::new(raw)))
            }
        }
    }

    /// All-zero account used as the signer/destination of fee-only estimates.
    pub fn placeholder(config: &ChainConfig) -> Self {
        match config.address_family {
            AddressFamily::Ss58 { prefix } => Address::Ss58(Ss58Address::new(prefix, [0u8; 32])),
            AddressFamily::Ethereum => Address::Ethereum(EthereumAddress::new([0u8; 20])),
        }
    }

    pub fn raw(&self) -> &[u8] {
        match self {
            Address::Ss58(address) => address.account_id(),
            Address::Ethereum(address) => address.as_bytes(),
        }
    }

    pub fn hex(&self) -> String {
        format!("0x{}", hex::encode(self.raw()))
    }

    pub fn family_matches(&self, config: &ChainConfig) -> bool {
        matches!(
            (self, config.address_family),
            (Address::Ss58(_), AddressFamily::Ss58 { .. })
                | (Address::Ethereum(_), AddressFamily::Ethereum)
        )
    }

    /// Compares against another address, a public key, or a string form.
    ///
    /// Inputs that cannot be normalized under this address's family compare unequal.
    pub fn compare<'a>(&self, config: &ChainConfig, other: impl Into<AddressRef<'a>>) -> bool {
        let normalized = match other.into() {
            AddressRef::Address(address) => return address.raw() == self.raw(),
            AddressRef::PublicKey(key) => Address::from_public_key(config, key),
            AddressRef::Encoded(text) => Address::from_string(config, text),
        };
        normalized
            .map(|address| address.raw() == self.raw())
            .unwrap_or(false)
    }

    fn check_family(&self, ctx: &ScaleContext) -> WalletResult<()> {
        if self.family_matches(&ctx.config) {
            Ok(())
        } else {
            Err(WalletError::invalid(format!(
                "address {self} does not belong to chain {}",
                ctx.config.name
            )))
        }
    }

    /// Encodes as a bare `AccountId`.
    pub fn encode_account_id(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        self.check_family(ctx)?;
        out.extend_from_slice(self.raw());
        Ok(())
    }

    pub fn decode_account_id(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        let len = ctx.config.account_id_len();
        let raw = take(bytes, len, "account id")?;
        Ok((Address::from_raw(&ctx.config, raw)?, len))
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Address::Ss58(address) => f.write_str(&address.encode()),
            Address::Ethereum(address) => f.write_str(&address.encode()),
        }
    }
}

/// Encodes as the chain's lookup source: `MultiAddress::Id` or a bare account id.
/// Decoding a `MultiAddress` lookup source also accepts the bare account id written by
/// older runtimes.
impl Scale for Address {
    fn encode_to(&self, ctx: &ScaleContext, out: &mut Vec<u8>) -> WalletResult<()> {
        self.check_family(ctx)?;
        match ctx.config.address_format {
            AddressFormat::MultiAddress => MultiAddress::Id(self.raw().to_vec()).encode_to(ctx, out),
            AddressFormat::AccountId => self.encode_account_id(ctx, out),
        }
    }

    fn decode(ctx: &ScaleContext, bytes: &[u8]) -> WalletResult<(Self, usize)> {
        match ctx.config.address_format {
            AddressFormat::MultiAddress => {
                let (address, consumed) = MultiAddress::decode_compat(ctx, bytes)?;
                let raw = address.account_id().ok_or_else(|| {
                    WalletError::violation(format!(
                        "lookup source {address:?} does not name an account directly"
                    ))
                })?;
                Ok((Address::from_raw(&ctx.config, raw)?, consumed))
            }
            AddressFormat::AccountId => Address::decode_account_id(ctx, bytes),
        }
    }
}
