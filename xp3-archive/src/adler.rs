//! [Adler-32][0] checksums for entry payloads.
//!
//! Not intended for cryptographic purposes; the format uses it to
//! detect corrupt or wrongly-decrypted entry data.
//!
//! [0]: https://www.rfc-editor.org/rfc/rfc1950#section-9

/// Largest prime smaller than 2^16.
const MOD_ADLER: u32 = 65_521;

/// Compute the Adler-32 checksum of `data`.
pub fn adler32(data: &[u8]) -> u32 {
    let mut a: u32 = 1;
    let mut b: u32 = 0;

    for byte in data {
        a = (a + u32::from(*byte)) % MOD_ADLER;
        b = (b + a) % MOD_ADLER;
    }

    (b << 16) | a
}
