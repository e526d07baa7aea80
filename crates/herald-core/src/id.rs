// SPDX-FileCopyrightText: 2026 Herald Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Globally unique, lexicographically sortable 20-character identifiers.
//!
//! Layout of the 12 raw bytes: 4-byte big-endian unix seconds, 3-byte
//! machine id, 2-byte process id, 3-byte counter. The bytes are rendered as
//! base32hex (`0-9a-v`), so string order equals creation order within a
//! process. The counter restarts every second; if it runs out, the id
//! borrows the next second rather than wrapping.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

const ALPHABET: &[u8; 32] = b"0123456789abcdefghijklmnopqrstuv";

/// Length of an encoded id.
pub const ID_LEN: usize = 20;

static MACHINE_ID: LazyLock<[u8; 3]> = LazyLock::new(|| rand::thread_rng().r#gen());

/// Last issued `(seconds << 24) | counter`.
static LAST: AtomicU64 = AtomicU64::new(0);

/// The stamp after `last` at wall-clock second `now_secs`.
fn advance(last: u64, now_secs: u32) -> u64 {
    (u64::from(now_secs) << 24).max(last + 1)
}

/// Next `(seconds, counter)` pair, strictly greater than every earlier one.
fn next_stamp(now_secs: u32) -> (u32, u32) {
    let prev = LAST
        .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
            Some(advance(last, now_secs))
        })
        .unwrap_or_else(|last| last);
    let stamp = advance(prev, now_secs);
    ((stamp >> 24) as u32, (stamp & 0x00ff_ffff) as u32)
}

/// Mint a fresh id.
pub fn new_id() -> String {
    let (secs, count) = next_stamp(chrono::Utc::now().timestamp() as u32);
    let pid = std::process::id() as u16;

    let mut raw = [0u8; 12];
    raw[0..4].copy_from_slice(&secs.to_be_bytes());
    raw[4..7].copy_from_slice(&*MACHINE_ID);
    raw[7..9].copy_from_slice(&pid.to_be_bytes());
    raw[9..12].copy_from_slice(&count.to_be_bytes()[1..4]);
    encode(&raw)
}

fn encode(raw: &[u8; 12]) -> String {
    let mut value: u128 = 0;
    for b in raw {
        value = (value << 8) | u128::from(*b);
    }
    // 96 bits padded to 100 so they split evenly into 5-bit groups.
    value <<= 4;
    (0..ID_LEN)
        .map(|i| {
            let shift = 100 - 5 * (i + 1);
            ALPHABET[((value >> shift) & 0x1f) as usize] as char
        })
        .collect()
}

/// Whether `s` is a well-formed id in the canonical format.
pub fn is_valid_id(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.len() != ID_LEN {
        return false;
    }
    if !bytes
        .iter()
        .all(|b| b.is_ascii_digit() || (b'a'..=b'v').contains(b))
    {
        return false;
    }
    // The four padding bits of the last character are always zero.
    matches!(bytes[ID_LEN - 1], b'0' | b'g')
}

/// Keep a caller-supplied id when it is well formed, otherwise mint one.
pub fn preserve_or_mint(candidate: Option<&str>) -> String {
    match candidate.map(str::trim) {
        Some(id) if is_valid_id(id) => id.to_string(),
        _ => new_id(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn minted_ids_are_valid() {
        for _ in 0..100 {
            let id = new_id();
            assert_eq!(id.len(), ID_LEN);
            assert!(is_valid_id(&id), "{id} should be valid");
        }
    }

    #[test]
    fn minted_ids_sort_in_creation_order() {
        let ids: Vec<String> = (0..1000).map(|_| new_id()).collect();
        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn exhausted_counter_borrows_the_next_second() {
        let secs = 1_700_000_000u32;
        let full = (u64::from(secs) << 24) | 0x00ff_ffff;
        assert_eq!(advance(full - 1, secs), full);
        assert_eq!(advance(full, secs), u64::from(secs + 1) << 24);
        // A new second restarts the counter; a clock step back does not.
        assert_eq!(advance(full, secs + 5), u64::from(secs + 5) << 24);
        assert_eq!(advance(full, secs - 5), full + 1);
    }

    #[test]
    fn known_ids() {
        assert!(is_valid_id("c2f4j7au6s7f91uqnojg"));
        assert!(!is_valid_id("justtestingId"));
        assert!(!is_valid_id("C2F4J7AU6S7F91UQNOJG"));
        assert!(!is_valid_id("c2f4j7au6s7f91uqnojw"));
        assert!(!is_valid_id("c2f4j7au6s7f91uqnojh"));
    }

    #[test]
    fn preserve_or_mint_keeps_well_formed_ids() {
        assert_eq!(
            preserve_or_mint(Some("c2f4j7au6s7f91uqnojg")),
            "c2f4j7au6s7f91uqnojg"
        );
        let minted = preserve_or_mint(Some("justtestingId"));
        assert_ne!(minted, "justtestingId");
        assert!(is_valid_id(&minted));
        assert!(is_valid_id(&preserve_or_mint(None)));
    }

    #[test]
    fn encode_all_zero_and_all_ones() {
        assert_eq!(encode(&[0u8; 12]), "00000000000000000000");
        assert_eq!(encode(&[0xffu8; 12]), "vvvvvvvvvvvvvvvvvvvg");
    }

    proptest! {
        #[test]
        fn encoding_is_valid_and_order_preserving(a in any::<[u8; 12]>(), b in any::<[u8; 12]>()) {
            let ea = encode(&a);
            let eb = encode(&b);
            prop_assert!(is_valid_id(&ea));
            prop_assert_eq!(a.cmp(&b), ea.cmp(&eb));
        }
    }
}
