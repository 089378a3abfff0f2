//! Bit-level checks for the storage word decoder shared by both engines.

use alloy::primitives::{Address, B256};
use proptest::prelude::*;
use proptest::test_runner::{Config as ProptestConfig, TestCaseError, TestRunner};
use registry_warden::slots::address_from_word;

fn word_with_address(high: [u8; 12], addr: [u8; 20]) -> B256 {
    let mut raw = [0u8; 32];
    raw[..12].copy_from_slice(&high);
    raw[12..].copy_from_slice(&addr);
    B256::from(raw)
}

#[test]
fn test_decode_smoke_known_words() {
    assert_eq!(address_from_word(B256::ZERO), None);

    let clean = word_with_address([0; 12], [0x11; 20]);
    assert_eq!(address_from_word(clean), Some(Address::from([0x11; 20])));

    // Some tooling leaves dirt above the address; the decode must not care.
    let dirty = word_with_address([0xff; 12], [0x11; 20]);
    assert_eq!(address_from_word(dirty), Some(Address::from([0x11; 20])));

    // A nonzero word is a set slot even when its address half is zero.
    let high_only = word_with_address([0x01; 12], [0; 20]);
    assert_eq!(address_from_word(high_only), Some(Address::ZERO));
}

#[test]
fn test_decode_matches_low_160_bits_proptest_4096() {
    let mut runner = TestRunner::new(ProptestConfig {
        cases: 4_096,
        ..ProptestConfig::default()
    });

    let result = runner.run(&any::<[u8; 32]>(), |raw| {
        let word = B256::from(raw);
        let expected = if word == B256::ZERO {
            None
        } else {
            Some(Address::from_slice(&raw[12..]))
        };
        let decoded = address_from_word(word);
        if decoded != expected {
            return Err(TestCaseError::fail(format!(
                "word {word} decoded to {decoded:?}, expected {expected:?}"
            )));
        }
        Ok(())
    });

    if let Err(err) = result {
        panic!("low-160-bit decode proptest failed: {err}");
    }
}

#[test]
fn test_embedded_address_survives_high_bit_dirt_proptest_4096() {
    let mut runner = TestRunner::new(ProptestConfig {
        cases: 4_096,
        ..ProptestConfig::default()
    });

    let strategy = (any::<[u8; 12]>(), any::<[u8; 20]>());
    let result = runner.run(&strategy, |(high, addr)| {
        let decoded = address_from_word(word_with_address(high, addr));
        let expected = if high == [0; 12] && addr == [0; 20] {
            None
        } else {
            Some(Address::from(addr))
        };
        if decoded != expected {
            return Err(TestCaseError::fail(format!(
                "high={high:02x?} addr={addr:02x?} decoded to {decoded:?}"
            )));
        }
        Ok(())
    });

    if let Err(err) = result {
        panic!("embedded address proptest failed: {err}");
    }
}
