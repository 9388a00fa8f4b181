//! # Digest Dispatch
//!
//! Maps a [`HashAlgorithm`] to its implementation and renders the result as
//! lowercase hex.
//!
//! ## Output Conventions
//!
//! - Byte-oriented digests: each output byte as two hex digits, in order.
//! - CRC32 and FNV-1a: the integer value as fixed-width hex.
//! - SipHash-2-4: the 64-bit result as its eight little-endian bytes.
//! - Tiger 128/160: the leading 16/20 bytes of the 192-bit digest.
//!
//! Every supported output fits in [`MAX_KEY_LENGTH`](hashudr_core::MAX_KEY_LENGTH)
//! characters; the widest (512-bit digests) render to exactly 128.

use std::fmt;
use std::hash::Hasher;

use digest::Digest;
use hashudr_core::{hex, HashAlgorithm, UdrConfig, UdrError};

use crate::{fnv, has160};

/// Computes digests for the closed set of [`HashAlgorithm`]s.
///
/// The only state is the SipHash key; every other algorithm is unkeyed.
#[derive(Clone, Default)]
pub struct DigestEngine {
    siphash_key: [u8; 16],
}

impl fmt::Debug for DigestEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DigestEngine")
            .field("siphash_key", &"<redacted>")
            .finish()
    }
}

impl DigestEngine {
    /// Create an engine with an explicit SipHash key.
    pub fn new(siphash_key: [u8; 16]) -> Self {
        Self { siphash_key }
    }

    /// Create an engine from library configuration.
    pub fn from_config(config: &UdrConfig) -> Self {
        if !config.uses_default_siphash_key() {
            tracing::info!("SipHash configured with a non-default key");
        }
        Self::new(config.siphash_key)
    }

    /// Digest `input` with `algorithm` and render it as lowercase hex.
    ///
    /// Returns [`UdrError::UnsupportedAlgorithm`] for algorithms that are
    /// declared but have no implementation.
    pub fn digest(&self, algorithm: HashAlgorithm, input: &[u8]) -> Result<String, UdrError> {
        use HashAlgorithm::*;

        let key = match algorithm {
            Blake1_224 => blake1::<blake_hash::Blake224>(input),
            Blake1_256 => blake1::<blake_hash::Blake256>(input),
            Blake1_384 => blake1::<blake_hash::Blake384>(input),
            Blake1_512 => blake1::<blake_hash::Blake512>(input),
            Blake2 => fixed::<blake2::Blake2b512>(input),
            Blake2s => fixed::<blake2::Blake2s256>(input),
            Crc32 => format!("{:08x}", crc32fast::hash(input)),
            Fnv32_1a => format!("{:08x}", fnv::fnv32_1a(input)),
            Fnv64_1a => format!("{:016x}", fnv::fnv64_1a(input)),
            Has160 => hex::encode(&has160::has160(input)),
            Md2 => fixed::<md2::Md2>(input),
            Md4 => fixed::<md4::Md4>(input),
            Md5 => fixed::<md5::Md5>(input),
            Ripemd128 => fixed::<ripemd::Ripemd128>(input),
            Ripemd160 => fixed::<ripemd::Ripemd160>(input),
            Ripemd256 => fixed::<ripemd::Ripemd256>(input),
            Ripemd320 => fixed::<ripemd::Ripemd320>(input),
            Siphash => self.siphash(input),
            Sha1 => fixed::<sha1::Sha1>(input),
            Sha2_224 => fixed::<sha2::Sha224>(input),
            Sha2_256 => fixed::<sha2::Sha256>(input),
            Sha2_384 => fixed::<sha2::Sha384>(input),
            Sha2_512 => fixed::<sha2::Sha512>(input),
            Sha2_512_224 => fixed::<sha2::Sha512_224>(input),
            Sha2_512_256 => fixed::<sha2::Sha512_256>(input),
            Sha3_224 => fixed::<sha3::Sha3_224>(input),
            Sha3_256 => fixed::<sha3::Sha3_256>(input),
            Sha3_384 => fixed::<sha3::Sha3_384>(input),
            Sha3_512 => fixed::<sha3::Sha3_512>(input),
            Sm3 => fixed::<sm3::Sm3>(input),
            Tiger1_128 => truncated::<tiger::Tiger>(input, 16),
            Tiger1_160 => truncated::<tiger::Tiger>(input, 20),
            Tiger1_192 => fixed::<tiger::Tiger>(input),
            Tiger2_128 => truncated::<tiger::Tiger2>(input, 16),
            Tiger2_160 => truncated::<tiger::Tiger2>(input, 20),
            Tiger2_192 => fixed::<tiger::Tiger2>(input),
            Whirlpool => fixed::<whirlpool::Whirlpool>(input),
            Cshake128 | Cshake256 | Shake128 | Shake256 | TupleHash128 | TupleHash256 => {
                return Err(UdrError::UnsupportedAlgorithm { algorithm });
            }
        };

        tracing::trace!(%algorithm, input_len = input.len(), "digest computed");
        Ok(key)
    }

    /// Resolve a raw host selector and digest `input` with it.
    pub fn digest_selector(&self, selector: Option<i16>, input: &[u8]) -> Result<String, UdrError> {
        self.digest(HashAlgorithm::from_selector(selector)?, input)
    }

    fn siphash(&self, input: &[u8]) -> String {
        let mut hasher = siphasher::sip::SipHasher24::new_with_key(&self.siphash_key);
        hasher.write(input);
        hex::encode(&hasher.finish().to_le_bytes())
    }
}

/// Digest `input` with the default (zero-key) engine.
pub fn digest(algorithm: HashAlgorithm, input: &[u8]) -> Result<String, UdrError> {
    DigestEngine::default().digest(algorithm, input)
}

fn fixed<D: Digest>(input: &[u8]) -> String {
    hex::encode(&D::digest(input))
}

fn truncated<D: Digest>(input: &[u8], len: usize) -> String {
    let full = D::digest(input);
    hex::encode(&full[..len.min(full.len())])
}

// BLAKE (SHA-3 finalist) is only published against the 0.9 digest traits.
fn blake1<D: digest09::Digest>(input: &[u8]) -> String {
    hex::encode(&D::digest(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hashudr_core::MAX_KEY_LENGTH;
    use proptest::prelude::*;

    fn key(algorithm: HashAlgorithm, input: &[u8]) -> String {
        digest(algorithm, input).unwrap()
    }

    fn expected_len(algorithm: HashAlgorithm) -> usize {
        use HashAlgorithm::*;
        match algorithm {
            Crc32 | Fnv32_1a => 8,
            Fnv64_1a | Siphash => 16,
            Md2 | Md4 | Md5 | Ripemd128 | Tiger1_128 | Tiger2_128 => 32,
            Has160 | Ripemd160 | Sha1 | Tiger1_160 | Tiger2_160 => 40,
            Tiger1_192 | Tiger2_192 => 48,
            Blake1_224 | Sha2_224 | Sha2_512_224 | Sha3_224 => 56,
            Blake1_256 | Blake2s | Sha2_256 | Sha2_512_256 | Sha3_256 | Sm3 | Ripemd256 => 64,
            Ripemd320 => 80,
            Blake1_384 | Sha2_384 | Sha3_384 => 96,
            Blake1_512 | Blake2 | Sha2_512 | Sha3_512 | Whirlpool => 128,
            Cshake128 | Cshake256 | Shake128 | Shake256 | TupleHash128 | TupleHash256 => 0,
        }
    }

    // ─── Known Vectors ───────────────────────────────────────────────

    #[test]
    fn md_family_vectors() {
        assert_eq!(key(HashAlgorithm::Md5, b"abc"), "900150983cd24fb0d6963f7d28e17f72");
        assert_eq!(key(HashAlgorithm::Md4, b"abc"), "a448017aaf21d8525fc10ae87aa6729d");
        assert_eq!(key(HashAlgorithm::Md2, b"abc"), "da853b0d3f88d99b30283a69e6ded6bb");
    }

    #[test]
    fn sha_family_vectors() {
        assert_eq!(
            key(HashAlgorithm::Sha1, b"abc"),
            "a9993e364706816aba3e25717850c26c9cd0d89d"
        );
        assert_eq!(
            key(HashAlgorithm::Sha2_256, b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(
            key(HashAlgorithm::Sha3_256, b""),
            "a7ffc6f8bf1ed76651c14756a061d662f580ff4de43b49fa82d80a4b80f8434a"
        );
    }

    #[test]
    fn blake2_vectors() {
        assert_eq!(
            key(HashAlgorithm::Blake2, b"abc"),
            "ba80a53f981c4d0d6a2797b69f12f6e94c212f14685ac4b74b12bb6fdbffa2d1\
             7d87c5392aab792dc252d5de4533cc9518d38aa8dbf1925ab92386edd4009923"
        );
        assert_eq!(
            key(HashAlgorithm::Blake2s, b""),
            "69217a3079908094e11121d042354a7c1f55b6482ca1a51e1b250dfd1ed0eef9"
        );
    }

    #[test]
    fn checksum_vectors() {
        assert_eq!(key(HashAlgorithm::Crc32, b"123456789"), "cbf43926");
        assert_eq!(key(HashAlgorithm::Crc32, b""), "00000000");
        assert_eq!(key(HashAlgorithm::Fnv32_1a, b"a"), "e40c292c");
        assert_eq!(key(HashAlgorithm::Fnv64_1a, b"a"), "af63dc4c8601ec8c");
    }

    #[test]
    fn other_vectors() {
        assert_eq!(
            key(HashAlgorithm::Ripemd160, b"abc"),
            "8eb208f7e05d987a9b044a8e98c6b087f15a0bfc"
        );
        assert_eq!(
            key(HashAlgorithm::Sm3, b"abc"),
            "66c7f0f462eeedd9d1f2d46bdc10e4e24167c4875cf2f7a2297da02b8f4ba8e0"
        );
        assert_eq!(
            key(HashAlgorithm::Tiger1_192, b""),
            "3293ac630c13f0245f92bbb1766e16167a4e58492dde73f3"
        );
        assert_eq!(
            key(HashAlgorithm::Has160, b""),
            "307964ef34151d37c8047adec7ab50f4ff89762d"
        );
    }

    #[test]
    fn siphash_uses_little_endian_rendering() {
        let mut k = [0u8; 16];
        for (i, byte) in k.iter_mut().enumerate() {
            *byte = i as u8;
        }
        let engine = DigestEngine::new(k);
        assert_eq!(
            engine.digest(HashAlgorithm::Siphash, b"").unwrap(),
            "310e0edd47db6f72"
        );
    }

    #[test]
    fn siphash_key_changes_output() {
        let zero = DigestEngine::default().digest(HashAlgorithm::Siphash, b"abc").unwrap();
        let keyed = DigestEngine::new([7u8; 16])
            .digest(HashAlgorithm::Siphash, b"abc")
            .unwrap();
        assert_ne!(zero, keyed);
    }

    // ─── Dispatch Shape ──────────────────────────────────────────────

    #[test]
    fn tiger_short_variants_are_prefixes() {
        let full = key(HashAlgorithm::Tiger1_192, b"abc");
        assert!(full.starts_with(&key(HashAlgorithm::Tiger1_128, b"abc")));
        assert!(full.starts_with(&key(HashAlgorithm::Tiger1_160, b"abc")));
        let full2 = key(HashAlgorithm::Tiger2_192, b"abc");
        assert!(full2.starts_with(&key(HashAlgorithm::Tiger2_160, b"abc")));
        assert_ne!(full, full2);
    }

    #[test]
    fn every_supported_algorithm_has_expected_width() {
        for algorithm in HashAlgorithm::ALL.into_iter().filter(|a| a.is_supported()) {
            let out = key(algorithm, b"hashudr");
            assert_eq!(out.len(), expected_len(algorithm), "{algorithm}");
            assert!(out.len() <= MAX_KEY_LENGTH);
            assert!(
                out.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)),
                "{algorithm}: {out}"
            );
        }
    }

    #[test]
    fn declared_only_algorithms_are_unsupported() {
        for algorithm in HashAlgorithm::ALL.into_iter().filter(|a| !a.is_supported()) {
            match digest(algorithm, b"abc") {
                Err(UdrError::UnsupportedAlgorithm { algorithm: got }) => assert_eq!(got, algorithm),
                other => panic!("{algorithm}: expected UnsupportedAlgorithm, got {other:?}"),
            }
        }
    }

    #[test]
    fn selector_resolution() {
        let engine = DigestEngine::default();
        assert_eq!(
            engine.digest_selector(Some(15), b"abc").unwrap(),
            "900150983cd24fb0d6963f7d28e17f72"
        );
        assert!(matches!(
            engine.digest_selector(None, b"abc"),
            Err(UdrError::InvalidAlgorithm(_))
        ));
        assert!(matches!(
            engine.digest_selector(Some(0), b"abc"),
            Err(UdrError::InvalidAlgorithm(_))
        ));
    }

    #[test]
    fn debug_hides_siphash_key() {
        let rendered = format!("{:?}", DigestEngine::new([0xab; 16]));
        assert!(!rendered.contains("171"));
        assert!(rendered.contains("redacted"));
    }

    // ─── Property Tests ──────────────────────────────────────────────

    proptest! {
        #[test]
        fn digest_is_deterministic(input in proptest::collection::vec(any::<u8>(), 0..512), idx in 0usize..43) {
            let algorithm = HashAlgorithm::ALL[idx];
            prop_assume!(algorithm.is_supported());
            let first = digest(algorithm, &input).unwrap();
            let second = digest(algorithm, &input).unwrap();
            prop_assert_eq!(first.len(), expected_len(algorithm));
            prop_assert_eq!(first, second);
        }
    }
}
