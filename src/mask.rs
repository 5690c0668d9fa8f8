//! `CharacterMask`: a cheap per-file summary used to reject files
//! before the trigram index is even consulted (spec §4.4).
//!
//! Two layers:
//! - a 256-bit bitmask, one bit per possible byte value, set
//!   unconditionally for every byte in the file regardless of UTF-8
//!   validity;
//! - a 65,536-bit Bloom filter over Unicode code points above
//!   `0x7F`, plus a `has_unicode` flag, used only to short-circuit
//!   non-ASCII substring queries.
//!
//! Non-UTF-8 byte handling (open question, spec §9): bytes are opaque.
//! The ASCII bitmask is set per raw byte even mid multi-byte sequence;
//! `has_unicode`/the Bloom filter are only populated when the file
//! decodes as valid UTF-8 containing at least one code point > 0x7F.
//! Invalid UTF-8 therefore still gets exact byte-level ASCII rejection,
//! it just can't benefit from the Unicode fast path.

const BLOOM_BITS: usize = 65_536;
const BLOOM_WORDS: usize = BLOOM_BITS / 64;

#[derive(Debug, Clone)]
pub struct CharacterMask {
    ascii: [u64; 4],
    bloom: Vec<u64>,
    has_unicode: bool,
}

impl CharacterMask {
    pub fn empty() -> Self {
        CharacterMask {
            ascii: [0; 4],
            bloom: vec![0; BLOOM_WORDS],
            has_unicode: false,
        }
    }

    /// Build a mask from raw file bytes.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        let mut mask = CharacterMask::empty();
        mask.ingest(bytes);
        mask
    }

    fn set_ascii(&mut self, byte: u8) {
        let word = (byte >> 6) as usize;
        let bit = (byte & 0x3F) as u32;
        self.ascii[word] |= 1u64 << bit;
    }

    fn ascii_is_set(&self, byte: u8) -> bool {
        let word = (byte >> 6) as usize;
        let bit = (byte & 0x3F) as u32;
        self.ascii[word] & (1u64 << bit) != 0
    }

    fn bloom_insert(&mut self, codepoint: u32) {
        for seed in bloom_hashes(codepoint) {
            let bit = (seed as usize) % BLOOM_BITS;
            self.bloom[bit / 64] |= 1u64 << (bit % 64);
        }
    }

    fn bloom_might_contain(&self, codepoint: u32) -> bool {
        bloom_hashes(codepoint).iter().all(|&seed| {
            let bit = (seed as usize) % BLOOM_BITS;
            self.bloom[bit / 64] & (1u64 << (bit % 64)) != 0
        })
    }

    pub fn ingest(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.set_ascii(b);
        }
        if let Ok(text) = std::str::from_utf8(bytes) {
            for ch in text.chars() {
                let cp = ch as u32;
                if cp > 0x7F {
                    self.has_unicode = true;
                    self.bloom_insert(cp);
                }
            }
        }
    }

    pub fn has_unicode(&self) -> bool {
        self.has_unicode
    }

    /// Returns `true` only if every byte in `pattern` could plausibly
    /// occur in the file this mask summarizes. A `false` result is a
    /// proof of absence; a `true` result is not a proof of presence
    /// (spec §8 invariant 3).
    pub fn has_all_bytes(&self, pattern: &[u8]) -> bool {
        pattern.iter().all(|&b| self.ascii_is_set(b))
    }

    /// Case-insensitive ASCII variant: a byte passes if either its
    /// upper- or lower-case form is set.
    pub fn has_all_bytes_ignore_case(&self, pattern: &[u8]) -> bool {
        pattern.iter().all(|&b| {
            self.ascii_is_set(b.to_ascii_lowercase()) || self.ascii_is_set(b.to_ascii_uppercase())
        })
    }

    /// Returns `true` if the pattern's non-ASCII code points could
    /// plausibly occur in the file. ASCII-only patterns always pass
    /// trivially (the ASCII mask is authoritative for those bytes via
    /// `has_all_bytes`).
    pub fn might_contain_unicode_pattern(&self, pattern: &str) -> bool {
        if !self.has_unicode {
            return !pattern.chars().any(|c| c as u32 > 0x7F);
        }
        pattern
            .chars()
            .filter(|c| *c as u32 > 0x7F)
            .all(|c| self.bloom_might_contain(c as u32))
    }

    pub fn merge(&mut self, other: &CharacterMask) {
        for i in 0..4 {
            self.ascii[i] |= other.ascii[i];
        }
        for i in 0..BLOOM_WORDS {
            self.bloom[i] |= other.bloom[i];
        }
        self.has_unicode |= other.has_unicode;
    }
}

/// Two independent hash seeds for a code point, in the classic
/// double-hashing Bloom-filter scheme (k=2).
fn bloom_hashes(codepoint: u32) -> [u64; 2] {
    let x = codepoint as u64;
    let h1 = splitmix64(x);
    let h2 = splitmix64(x ^ 0x9E37_79B9_7F4A_7C15);
    [h1, h2]
}

fn splitmix64(mut x: u64) -> u64 {
    x = x.wrapping_add(0x9E37_79B9_7F4A_7C15);
    x = (x ^ (x >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    x = (x ^ (x >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    x ^ (x >> 31)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admits_every_byte_actually_present() {
        let mask = CharacterMask::from_bytes(b"fn main() {}");
        assert!(mask.has_all_bytes(b"fn main"));
        assert!(mask.has_all_bytes(b"{}"));
    }

    #[test]
    fn rejects_a_byte_known_absent() {
        let mask = CharacterMask::from_bytes(b"fn main() {}");
        assert!(!mask.has_all_bytes(b"zzz"));
    }

    #[test]
    fn unicode_flag_only_set_for_valid_utf8_above_ascii() {
        let ascii_only = CharacterMask::from_bytes(b"hello world");
        assert!(!ascii_only.has_unicode());

        let with_unicode = CharacterMask::from_bytes("héllo".as_bytes());
        assert!(with_unicode.has_unicode());
    }

    #[test]
    fn invalid_utf8_still_sets_ascii_bits() {
        let invalid = [0x66, 0x6E, 0xFF, 0xFE, 0x28];
        let mask = CharacterMask::from_bytes(&invalid);
        assert!(mask.has_all_bytes(&[0x66, 0x6E, 0x28]));
        assert!(!mask.has_unicode());
    }

    #[test]
    fn merge_is_union_of_both_masks() {
        let mut a = CharacterMask::from_bytes(b"abc");
        let b = CharacterMask::from_bytes(b"xyz");
        a.merge(&b);
        assert!(a.has_all_bytes(b"abcxyz"));
    }

    #[test]
    fn bloom_admits_present_codepoint() {
        let mask = CharacterMask::from_bytes("caf\u{e9}".as_bytes());
        assert!(mask.might_contain_unicode_pattern("caf\u{e9}"));
    }
}
