//! # Hash Algorithm Selector
//!
//! Defines [`HashAlgorithm`], the closed set of digest algorithms the host
//! can request by numeric selector.
//!
//! ## Selector Contract
//!
//! The host passes a `SMALLINT`. Selector `0` ([`SELECTOR_NONE`]) means "no
//! algorithm selected"; `1..=43` map to the variants below in declaration
//! order. The numbering is part of the external contract and must never be
//! reordered: new algorithms are appended.
//!
//! Six variants (cSHAKE, SHAKE, TupleHash) are declared but not implemented.
//! They stay in the enumeration so their selectors are reserved and the
//! engine can report them as unsupported rather than invalid.

use serde::{Deserialize, Serialize};

use crate::error::UdrError;

/// The "no algorithm selected" sentinel.
pub const SELECTOR_NONE: i16 = 0;

/// A digest algorithm addressable by numeric selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
#[repr(i16)]
pub enum HashAlgorithm {
    /// BLAKE (SHA-3 finalist) with 224-bit output.
    Blake1_224 = 1,
    /// BLAKE with 256-bit output.
    Blake1_256 = 2,
    /// BLAKE with 384-bit output.
    Blake1_384 = 3,
    /// BLAKE with 512-bit output.
    Blake1_512 = 4,
    /// BLAKE2b with 512-bit output.
    Blake2 = 5,
    /// BLAKE2s with 256-bit output.
    Blake2s = 6,
    /// CRC-32 (IEEE 802.3).
    Crc32 = 7,
    /// cSHAKE128. Declared, not implemented.
    Cshake128 = 8,
    /// cSHAKE256. Declared, not implemented.
    Cshake256 = 9,
    /// FNV-1a, 32-bit.
    Fnv32_1a = 10,
    /// FNV-1a, 64-bit.
    Fnv64_1a = 11,
    /// HAS-160 (TTAS.KO-12.0011/R2).
    Has160 = 12,
    /// MD2.
    Md2 = 13,
    /// MD4.
    Md4 = 14,
    /// MD5.
    Md5 = 15,
    /// RIPEMD-128.
    Ripemd128 = 16,
    /// RIPEMD-160.
    Ripemd160 = 17,
    /// RIPEMD-256.
    Ripemd256 = 18,
    /// RIPEMD-320.
    Ripemd320 = 19,
    /// SipHash-2-4 with a fixed key.
    Siphash = 20,
    /// SHA-1.
    Sha1 = 21,
    /// SHA-224.
    Sha2_224 = 22,
    /// SHA-256.
    Sha2_256 = 23,
    /// SHA-384.
    Sha2_384 = 24,
    /// SHA-512.
    Sha2_512 = 25,
    /// SHA-512/224.
    Sha2_512_224 = 26,
    /// SHA-512/256.
    Sha2_512_256 = 27,
    /// SHA3-224.
    Sha3_224 = 28,
    /// SHA3-256.
    Sha3_256 = 29,
    /// SHA3-384.
    Sha3_384 = 30,
    /// SHA3-512.
    Sha3_512 = 31,
    /// SHAKE128. Declared, not implemented.
    Shake128 = 32,
    /// SHAKE256. Declared, not implemented.
    Shake256 = 33,
    /// SM3.
    Sm3 = 34,
    /// Tiger, truncated to 128 bits.
    Tiger1_128 = 35,
    /// Tiger, truncated to 160 bits.
    Tiger1_160 = 36,
    /// Tiger, 192 bits.
    Tiger1_192 = 37,
    /// Tiger2, truncated to 128 bits.
    Tiger2_128 = 38,
    /// Tiger2, truncated to 160 bits.
    Tiger2_160 = 39,
    /// Tiger2, 192 bits.
    Tiger2_192 = 40,
    /// TupleHash128. Declared, not implemented.
    TupleHash128 = 41,
    /// TupleHash256. Declared, not implemented.
    TupleHash256 = 42,
    /// Whirlpool.
    Whirlpool = 43,
}

impl HashAlgorithm {
    /// Every algorithm, ordered by selector (`ALL[i].selector() == i + 1`).
    pub const ALL: [HashAlgorithm; 43] = [
        Self::Blake1_224,
        Self::Blake1_256,
        Self::Blake1_384,
        Self::Blake1_512,
        Self::Blake2,
        Self::Blake2s,
        Self::Crc32,
        Self::Cshake128,
        Self::Cshake256,
        Self::Fnv32_1a,
        Self::Fnv64_1a,
        Self::Has160,
        Self::Md2,
        Self::Md4,
        Self::Md5,
        Self::Ripemd128,
        Self::Ripemd160,
        Self::Ripemd256,
        Self::Ripemd320,
        Self::Siphash,
        Self::Sha1,
        Self::Sha2_224,
        Self::Sha2_256,
        Self::Sha2_384,
        Self::Sha2_512,
        Self::Sha2_512_224,
        Self::Sha2_512_256,
        Self::Sha3_224,
        Self::Sha3_256,
        Self::Sha3_384,
        Self::Sha3_512,
        Self::Shake128,
        Self::Shake256,
        Self::Sm3,
        Self::Tiger1_128,
        Self::Tiger1_160,
        Self::Tiger1_192,
        Self::Tiger2_128,
        Self::Tiger2_160,
        Self::Tiger2_192,
        Self::TupleHash128,
        Self::TupleHash256,
        Self::Whirlpool,
    ];

    /// The numeric selector the host uses for this algorithm.
    pub fn selector(self) -> i16 {
        self as i16
    }

    /// Resolve a host selector.
    ///
    /// A null selector, the [`SELECTOR_NONE`] sentinel and any value outside
    /// the enumeration all fail with [`UdrError::InvalidAlgorithm`].
    pub fn from_selector(selector: Option<i16>) -> Result<Self, UdrError> {
        let Some(value) = selector else {
            return Err(UdrError::InvalidAlgorithm("null selector".to_string()));
        };
        usize::try_from(value)
            .ok()
            .and_then(|v| v.checked_sub(1))
            .and_then(|index| Self::ALL.get(index))
            .copied()
            .ok_or_else(|| UdrError::InvalidAlgorithm(format!("selector {value}")))
    }

    /// Whether the digest engine implements this algorithm.
    pub fn is_supported(self) -> bool {
        !matches!(
            self,
            Self::Cshake128
                | Self::Cshake256
                | Self::Shake128
                | Self::Shake256
                | Self::TupleHash128
                | Self::TupleHash256
        )
    }

    /// Canonical lowercase name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Blake1_224 => "blake1-224",
            Self::Blake1_256 => "blake1-256",
            Self::Blake1_384 => "blake1-384",
            Self::Blake1_512 => "blake1-512",
            Self::Blake2 => "blake2b",
            Self::Blake2s => "blake2s",
            Self::Crc32 => "crc32",
            Self::Cshake128 => "cshake128",
            Self::Cshake256 => "cshake256",
            Self::Fnv32_1a => "fnv32-1a",
            Self::Fnv64_1a => "fnv64-1a",
            Self::Has160 => "has160",
            Self::Md2 => "md2",
            Self::Md4 => "md4",
            Self::Md5 => "md5",
            Self::Ripemd128 => "ripemd128",
            Self::Ripemd160 => "ripemd160",
            Self::Ripemd256 => "ripemd256",
            Self::Ripemd320 => "ripemd320",
            Self::Siphash => "siphash",
            Self::Sha1 => "sha1",
            Self::Sha2_224 => "sha2-224",
            Self::Sha2_256 => "sha2-256",
            Self::Sha2_384 => "sha2-384",
            Self::Sha2_512 => "sha2-512",
            Self::Sha2_512_224 => "sha2-512/224",
            Self::Sha2_512_256 => "sha2-512/256",
            Self::Sha3_224 => "sha3-224",
            Self::Sha3_256 => "sha3-256",
            Self::Sha3_384 => "sha3-384",
            Self::Sha3_512 => "sha3-512",
            Self::Shake128 => "shake128",
            Self::Shake256 => "shake256",
            Self::Sm3 => "sm3",
            Self::Tiger1_128 => "tiger1-128",
            Self::Tiger1_160 => "tiger1-160",
            Self::Tiger1_192 => "tiger1-192",
            Self::Tiger2_128 => "tiger2-128",
            Self::Tiger2_160 => "tiger2-160",
            Self::Tiger2_192 => "tiger2-192",
            Self::TupleHash128 => "tuplehash128",
            Self::TupleHash256 => "tuplehash256",
            Self::Whirlpool => "whirlpool",
        }
    }

    /// The algorithm family, used in "not supported" messages.
    pub fn family(self) -> &'static str {
        match self {
            Self::Blake1_224 | Self::Blake1_256 | Self::Blake1_384 | Self::Blake1_512 => "BLAKE",
            Self::Blake2 | Self::Blake2s => "BLAKE2",
            Self::Crc32 => "CRC",
            Self::Cshake128 | Self::Cshake256 => "cSHAKE",
            Self::Fnv32_1a | Self::Fnv64_1a => "FNV",
            Self::Has160 => "HAS",
            Self::Md2 | Self::Md4 | Self::Md5 => "MD",
            Self::Ripemd128 | Self::Ripemd160 | Self::Ripemd256 | Self::Ripemd320 => "RIPEMD",
            Self::Siphash => "SipHash",
            Self::Sha1 => "SHA-1",
            Self::Sha2_224
            | Self::Sha2_256
            | Self::Sha2_384
            | Self::Sha2_512
            | Self::Sha2_512_224
            | Self::Sha2_512_256 => "SHA-2",
            Self::Sha3_224 | Self::Sha3_256 | Self::Sha3_384 | Self::Sha3_512 => "SHA-3",
            Self::Shake128 | Self::Shake256 => "SHAKE",
            Self::Sm3 => "SM3",
            Self::Tiger1_128
            | Self::Tiger1_160
            | Self::Tiger1_192
            | Self::Tiger2_128
            | Self::Tiger2_160
            | Self::Tiger2_192 => "Tiger",
            Self::TupleHash128 | Self::TupleHash256 => "TupleHash",
            Self::Whirlpool => "Whirlpool",
        }
    }
}

impl std::fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = UdrError;

    /// Parse a canonical name (case-insensitive).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.name() == wanted)
            .ok_or_else(|| UdrError::InvalidAlgorithm(format!("unknown name {s:?}")))
    }
}

impl TryFrom<i16> for HashAlgorithm {
    type Error = UdrError;

    fn try_from(value: i16) -> Result<Self, Self::Error> {
        Self::from_selector(Some(value))
    }
}

impl From<HashAlgorithm> for String {
    fn from(value: HashAlgorithm) -> Self {
        value.name().to_string()
    }
}

impl TryFrom<String> for HashAlgorithm {
    type Error = UdrError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}
