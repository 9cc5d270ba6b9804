use std::sync::Arc;

use proptest::prelude::*;
use substrate_wallet::address::{EthereumAddress, Ss58Address};
use substrate_wallet::{ChainConfig, Compact, Era, Scale, ScaleContext};

fn ctx() -> ScaleContext {
    ScaleContext::new(Arc::new(ChainConfig::default()))
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn ss58_roundtrip(prefix in 0u16..16_384, account in prop::array::uniform32(any::<u8>())) {
        let address = Ss58Address::new(prefix, account);
        let decoded = Ss58Address::decode(&address.encode()).expect("decode");
        prop_assert_eq!(decoded, address);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn ss58_tampering_is_detected(account in prop::array::uniform32(any::<u8>()), flip in any::<usize>()) {
        let encoded = Ss58Address::new(42, account).encode();
        let mut bytes = encoded.into_bytes();
        let idx = flip % bytes.len();
        bytes[idx] = if bytes[idx] == b'2' { b'3' } else { b'2' };
        let mutated = String::from_utf8(bytes).expect("utf8");
        prop_assert!(Ss58Address::decode(&mutated).is_err());
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]
    #[test]
    fn ethereum_checksum_roundtrip(raw in prop::array::uniform20(any::<u8>())) {
        let address = EthereumAddress::new(raw);
        prop_assert_eq!(EthereumAddress::decode(&address.encode()).expect("decode"), address);
    }
}

proptest! {
    #[test]
    fn compact_roundtrip(value in any::<u128>()) {
        let ctx = ctx();
        let encoded = Compact(value).encode(&ctx).expect("encode");
        let (decoded, consumed) = Compact::decode(&ctx, &encoded).expect("decode");
        prop_assert_eq!(decoded, Compact(value));
        prop_assert_eq!(consumed, encoded.len());
    }

    #[test]
    fn mortal_era_roundtrip(period in 4u64..=65_536, height in any::<u32>()) {
        let ctx = ctx();
        let era = Era::mortal(period, height as u64);
        let encoded = era.encode(&ctx).expect("encode");
        prop_assert_eq!(encoded.len(), 2);
        prop_assert_eq!(Era::decode(&ctx, &encoded).expect("decode"), (era, 2));
        prop_assert!(era.birth(height as u64) <= height as u64);
    }
}
