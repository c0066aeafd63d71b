//! Two-key XOR keystream for XP3 entry data.
//!
//! Protected entries are obfuscated with a pair of single-byte keys:
//! the initial key is XORed into the first byte, then the primary key
//! is XORed into every byte. Applying the keystream twice with the same
//! key pair restores the original data.

use tracing::trace;

use crate::keys::XorKey;

/// Apply the two-key XOR keystream to `data` in place.
///
/// Encoding and decoding are the same operation.
pub fn apply_keystream(data: &mut [u8], key: XorKey) {
    trace!("XOR keystream over {} bytes", data.len());

    if let Some(first) = data.first_mut() {
        *first ^= key.initial;
    }
    for byte in data.iter_mut() {
        *byte ^= key.primary;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keystream_roundtrip() {
        let key = XorKey::new(0xd7, 0x6b);
        let plaintext = b"Hello, XP3 keystream world!";

        let mut data = plaintext.to_vec();
        apply_keystream(&mut data, key);

        // Should be different from original
        assert_ne!(data.as_slice(), plaintext.as_slice());

        apply_keystream(&mut data, key);

        // Should match original
        assert_eq!(data.as_slice(), plaintext.as_slice());
    }

    #[test]
    fn test_keystream_known_vector() {
        let key = XorKey::new(0x03, 0x01);
        let mut data = vec![0x00, 0x10, 0xff];

        apply_keystream(&mut data, key);

        // first byte: 0x00 ^ 0x01 ^ 0x03, rest: byte ^ 0x03
        assert_eq!(data, vec![0x02, 0x13, 0xfc]);
    }

    #[test]
    fn test_keystream_initial_key_only_touches_first_byte() {
        let with_initial = XorKey::new(0x55, 0xaa);
        let without_initial = XorKey::new(0x55, 0x00);
        let plaintext = vec![0x11, 0x22, 0x33, 0x44];

        let mut a = plaintext.clone();
        let mut b = plaintext;
        apply_keystream(&mut a, with_initial);
        apply_keystream(&mut b, without_initial);

        assert_ne!(a[0], b[0]);
        assert_eq!(a[1..], b[1..]);
    }

    #[test]
    fn test_keystream_different_keys_produce_different_output() {
        let plaintext = b"Sensitive data";

        let mut a = plaintext.to_vec();
        let mut b = plaintext.to_vec();
        apply_keystream(&mut a, XorKey::new(0x01, 0x00));
        apply_keystream(&mut b, XorKey::new(0x02, 0x00));

        assert_ne!(a, b);
    }

    #[test]
    fn test_keystream_empty_data() {
        let key = XorKey::new(0xd7, 0x6b);
        let mut data: Vec<u8> = Vec::new();

        apply_keystream(&mut data, key);

        assert!(data.is_empty());
    }

    #[test]
    fn test_keystream_zero_key_is_identity() {
        let key = XorKey::new(0x00, 0x00);
        let plaintext = b"unchanged".to_vec();

        let mut data = plaintext.clone();
        apply_keystream(&mut data, key);

        assert_eq!(data, plaintext);
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Applying the keystream twice restores any input under any key pair.
            #[test]
            fn keystream_is_self_inverse(
                data in prop::collection::vec(any::<u8>(), 0..1024),
                primary in any::<u8>(),
                initial in any::<u8>(),
            ) {
                let key = XorKey::new(primary, initial);
                let mut buf = data.clone();
                apply_keystream(&mut buf, key);
                apply_keystream(&mut buf, key);
                prop_assert_eq!(buf, data);
            }
        }
    }
}
