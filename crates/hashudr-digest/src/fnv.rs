//! FNV-1a, 32- and 64-bit.

const FNV32_OFFSET: u32 = 0x811c_9dc5;
const FNV32_PRIME: u32 = 0x0100_0193;
const FNV64_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV64_PRIME: u64 = 0x0000_0100_0000_01b3;

/// 32-bit FNV-1a.
pub fn fnv32_1a(input: &[u8]) -> u32 {
    input.iter().fold(FNV32_OFFSET, |hash, &byte| {
        (hash ^ u32::from(byte)).wrapping_mul(FNV32_PRIME)
    })
}

/// 64-bit FNV-1a.
pub fn fnv64_1a(input: &[u8]) -> u64 {
    input.iter().fold(FNV64_OFFSET, |hash, &byte| {
        (hash ^ u64::from(byte)).wrapping_mul(FNV64_PRIME)
    })
}
