//! Extended binary Golay(24,12) codec.
//!
//! Protects the 36 information bits of the MPDU header: each 12-bit group
//! becomes one 24-bit codeword laid out MSB-first as
//! `[12 data bits | 11 check bits | 1 overall parity bit]`.
//!
//! Decoding corrects up to 3 bit errors per codeword. Acceptance is
//! deliberately conservative: a word is accepted only when the corrected
//! error count in the inner (23,12) word plus any overall-parity mismatch
//! is at most 3. This declines a weight-3 pattern confined to the inner
//! word, but in exchange a 4-error inner pattern combined with a flipped
//! parity bit is always reported uncorrectable, which the header decoder
//! relies on to drop corrupt frames instead of acting on them.

/// Generator polynomial of the (23,12) Golay code:
/// g(x) = x^11 + x^9 + x^7 + x^6 + x^5 + x + 1.
const GEN_POLY: u32 = 0xAE3;

/// Encode 12 data bits into a 24-bit extended Golay codeword.
///
/// Only the low 12 bits of `data` are used. The result occupies the low
/// 24 bits: data in bits 23..12, check bits in bits 11..1, overall parity
/// in bit 0.
pub fn golay_encode(data: u16) -> u32 {
    let d = (data & 0x0FFF) as u32;
    let inner = (d << 11) | check_bits(d);
    let parity = inner.count_ones() & 1;
    (inner << 1) | parity
}

/// Decode a 24-bit extended Golay codeword, correcting up to 3 bit errors.
///
/// Returns the corrected 12 data bits and the number of errors corrected,
/// or `None` when the word is judged uncorrectable.
pub fn golay_decode(received: u32) -> Option<(u16, u8)> {
    let word = received & 0xFF_FFFF;
    let inner = word >> 1;

    let pattern = inner_error_pattern(inner)?;
    let inner_errors = pattern.count_ones() as u8;

    // Every valid extended codeword has even weight, so an odd received
    // weight means an odd total error count.
    let parity_mismatch = (word.count_ones() & 1) as u8;

    // Refuse the ambiguous class where three inner corrections coincide
    // with odd overall parity: the same received word is explained by a
    // five-error pattern (four inner flips plus the parity bit).
    if inner_errors + parity_mismatch > 3 {
        return None;
    }

    // The parity bit itself is in error exactly when the inner correction
    // count does not account for the observed weight parity.
    let parity_bit_error = (inner_errors + parity_mismatch) & 1;
    let total_errors = inner_errors + parity_bit_error;

    let corrected = inner ^ pattern;
    Some(((corrected >> 11) as u16, total_errors))
}

/// Remainder of `data(x) * x^11` modulo g(x): the 11 check bits for 12 data
/// bits.
fn check_bits(data: u32) -> u32 {
    let mut rem = data << 11;
    for shift in (0..12).rev() {
        if rem & (1 << (shift + 11)) != 0 {
            rem ^= GEN_POLY << shift;
        }
    }
    rem & 0x7FF
}

/// Syndrome of a 23-bit word: remainder of the received polynomial
/// modulo g(x). Zero for a valid inner codeword.
fn syndrome(word: u32) -> u16 {
    let mut rem = word & 0x7F_FFFF;
    for shift in (0..12).rev() {
        if rem & (1 << (shift + 11)) != 0 {
            rem ^= GEN_POLY << shift;
        }
    }
    (rem & 0x7FF) as u16
}

/// Find the minimum-weight error pattern explaining the syndrome of a
/// received 23-bit word.
///
/// The (23,12) Golay code is perfect, so every 23-bit word lies within
/// Hamming distance 3 of exactly one codeword; the search exploits the
/// linearity of syndromes, checking weight 0, 1, 2 and 3 patterns built
/// from the 23 single-bit syndromes.
fn inner_error_pattern(word: u32) -> Option<u32> {
    let target = syndrome(word);
    if target == 0 {
        return Some(0);
    }

    let mut bit_syndrome = [0u16; 23];
    // syndrome value -> bit position, 0xFF for "no single bit matches"
    let mut position_of = [0xFFu8; 2048];
    for bit in 0..23 {
        let s = syndrome(1u32 << bit);
        bit_syndrome[bit] = s;
        position_of[s as usize] = bit as u8;
    }

    // weight 1
    let hit = position_of[target as usize];
    if hit != 0xFF {
        return Some(1 << hit);
    }

    // weight 2
    for i in 0..23 {
        let hit = position_of[(target ^ bit_syndrome[i]) as usize];
        if hit != 0xFF && (hit as usize) > i {
            return Some((1 << i) | (1 << hit));
        }
    }

    // weight 3
    for i in 0..23 {
        let partial = target ^ bit_syndrome[i];
        for j in (i + 1)..23 {
            let hit = position_of[(partial ^ bit_syndrome[j]) as usize];
            if hit != 0xFF && (hit as usize) > j {
                return Some((1 << i) | (1 << j) | (1 << hit));
            }
        }
    }

    None
}
