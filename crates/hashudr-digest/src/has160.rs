//! # HAS-160
//!
//! The Korean TTAS.KO-12.0011/R2 hash. Structurally close to SHA-1 (five
//! 32-bit words of state, four rounds of twenty steps) but with
//! little-endian message words and length encoding, per-step rotation of
//! `A`, and four extra message words per round derived by XOR.

/// Digest size in bytes.
pub const OUTPUT_LEN: usize = 20;

const BLOCK_LEN: usize = 64;

const INITIAL_STATE: [u32; 5] = [0x6745_2301, 0xefcd_ab89, 0x98ba_dcfe, 0x1032_5476, 0xc3d2_e1f0];

const ROUND_CONSTANTS: [u32; 4] = [0x0000_0000, 0x5a82_7999, 0x6ed9_eba1, 0x8f1b_bcdc];

/// Rotation of `A` per step, shared by all rounds.
const STEP_SHIFTS: [u32; 20] = [5, 11, 7, 15, 6, 13, 8, 14, 7, 12, 9, 11, 8, 15, 6, 12, 9, 14, 5, 13];

/// Rotation of `B` per round.
const ROUND_SHIFTS: [u32; 4] = [10, 17, 25, 30];

/// Message word order per round. Each group of four also defines one of
/// the extra words `X[16..20]`.
const PERMUTATIONS: [[usize; 16]; 4] = [
    [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12, 13, 14, 15],
    [3, 6, 9, 12, 15, 2, 5, 8, 11, 14, 1, 4, 7, 10, 13, 0],
    [12, 5, 14, 7, 0, 9, 2, 11, 4, 13, 6, 15, 8, 1, 10, 3],
    [7, 2, 13, 8, 3, 14, 9, 4, 15, 10, 5, 0, 11, 6, 1, 12],
];

/// Extra word consumed at the head of each five-step group.
const EXTRA_ORDER: [usize; 4] = [18, 19, 16, 17];

/// Compute the HAS-160 digest of `input`.
pub fn has160(input: &[u8]) -> [u8; OUTPUT_LEN] {
    let mut state = INITIAL_STATE;

    let mut blocks = input.chunks_exact(BLOCK_LEN);
    for block in &mut blocks {
        compress(&mut state, block);
    }

    let remainder = blocks.remainder();
    let mut tail = [0u8; 2 * BLOCK_LEN];
    tail[..remainder.len()].copy_from_slice(remainder);
    tail[remainder.len()] = 0x80;
    let tail_len = if remainder.len() < BLOCK_LEN - 8 {
        BLOCK_LEN
    } else {
        2 * BLOCK_LEN
    };
    let bit_len = (input.len() as u64).wrapping_mul(8);
    tail[tail_len - 8..tail_len].copy_from_slice(&bit_len.to_le_bytes());
    for block in tail[..tail_len].chunks_exact(BLOCK_LEN) {
        compress(&mut state, block);
    }

    let mut out = [0u8; OUTPUT_LEN];
    for (chunk, word) in out.chunks_exact_mut(4).zip(state) {
        chunk.copy_from_slice(&word.to_le_bytes());
    }
    out
}

fn compress(state: &mut [u32; 5], block: &[u8]) {
    let mut x = [0u32; 20];
    for (word, bytes) in x.iter_mut().zip(block.chunks_exact(4)) {
        *word = u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    }

    let [mut a, mut b, mut c, mut d, mut e] = *state;

    for (round, order) in PERMUTATIONS.iter().enumerate() {
        for (k, group) in order.chunks_exact(4).enumerate() {
            x[16 + k] = group.iter().fold(0, |acc, &i| acc ^ x[i]);
        }

        for (step, &shift) in STEP_SHIFTS.iter().enumerate() {
            let group = step / 5;
            let word = match step % 5 {
                0 => x[EXTRA_ORDER[group]],
                offset => x[order[group * 4 + offset - 1]],
            };
            let f = match round {
                0 => d ^ (b & (c ^ d)),
                2 => c ^ (b | !d),
                _ => b ^ c ^ d,
            };
            let t = a
                .rotate_left(shift)
                .wrapping_add(f)
                .wrapping_add(e)
                .wrapping_add(word)
                .wrapping_add(ROUND_CONSTANTS[round]);
            e = d;
            d = c;
            c = b.rotate_left(ROUND_SHIFTS[round]);
            b = a;
            a = t;
        }
    }

    for (slot, value) in state.iter_mut().zip([a, b, c, d, e]) {
        *slot = slot.wrapping_add(value);
    }
}
