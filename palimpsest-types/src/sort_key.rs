//! Densely ordered keys for sibling lists (tracks, mixer lines, effects).
//!
//! A key is a base-256 fraction `0.d1 d2 .. dn` stored as its digits with no
//! trailing zero. In that canonical form bytewise lexicographic order equals
//! numeric order, so the derived `Ord` is the sibling order. Between any two
//! keys another key exists; keys are capped at [`SortKey::MAX_DIGITS`] and
//! construction returns `None` once that cap would be exceeded, at which
//! point the caller renumbers the sibling run with [`SortKey::evenly_spaced`].

use std::fmt;

use crate::codec::{Decode, DecodeError, Encode, Reader, Writer};

#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SortKey {
    digits: Vec<u8>,
}

impl SortKey {
    pub const MAX_DIGITS: usize = 32;

    /// Key for the first element of an empty list.
    pub fn initial() -> Self {
        Self { digits: vec![0x80] }
    }

    /// A key strictly between `lo` and `hi`; `None` bounds mean "before all"
    /// and "after all". Returns `None` if `lo >= hi` or the gap is exhausted.
    pub fn between(lo: Option<&SortKey>, hi: Option<&SortKey>) -> Option<SortKey> {
        if let (Some(a), Some(b)) = (lo, hi) {
            if a >= b {
                return None;
            }
        }

        let lo: &[u8] = lo.map(|k| k.digits.as_slice()).unwrap_or(&[]);
        let mut hi: Option<&[u8]> = hi.map(|k| k.digits.as_slice());
        let mut digits = Vec::new();

        for i in 0..Self::MAX_DIGITS {
            let l = lo.get(i).copied().unwrap_or(0) as u16;
            let h = match hi {
                Some(hi) => hi.get(i).copied().unwrap_or(0) as u16,
                None => 256,
            };
            if h > l + 1 {
                digits.push(((l + h) / 2) as u8);
                return Some(Self { digits });
            }
            digits.push(l as u8);
            if h == l + 1 {
                // The prefix is now below `hi`; only `lo` constrains the rest.
                hi = None;
            }
        }
        None
    }

    /// A key ordered before `first`.
    pub fn before_first(first: &SortKey) -> Option<SortKey> {
        let digits = &first.digits;
        let key = match digits.iter().position(|&d| d > 1) {
            Some(i) => {
                let mut out = digits[..i].to_vec();
                out.push(digits[i] - 1);
                out
            }
            None => {
                // Only 0s and a final 1: 0.x..1 > 0.x..0ff
                let mut out = digits[..digits.len() - 1].to_vec();
                out.extend_from_slice(&[0, 0xff]);
                out
            }
        };
        Self::checked(key)
    }

    /// A key ordered after `last`.
    pub fn after_last(last: &SortKey) -> Option<SortKey> {
        let digits = &last.digits;
        let key = match digits.iter().position(|&d| d < 0xff) {
            Some(i) => {
                let mut out = digits[..i].to_vec();
                out.push(digits[i] + 1);
                out
            }
            None => {
                let mut out = digits.clone();
                out.push(1);
                out
            }
        };
        Self::checked(key)
    }

    /// `count` increasing keys spread evenly over the whole key space.
    pub fn evenly_spaced(count: usize) -> Vec<SortKey> {
        if count == 0 {
            return Vec::new();
        }
        let slots = count as u128 + 1;
        let mut width = 1u32;
        // Leave room for at least 16 insertions between neighbours.
        while 256u128.pow(width) < slots * 16 {
            width += 1;
        }
        let space = 256u128.pow(width);
        let step = space / slots;

        (1..=count as u128)
            .map(|i| {
                let bytes = (i * step).to_be_bytes();
                let mut digits = bytes[16 - width as usize..].to_vec();
                while digits.last() == Some(&0) {
                    digits.pop();
                }
                Self { digits }
            })
            .collect()
    }

    pub fn digits(&self) -> &[u8] {
        &self.digits
    }

    fn checked(digits: Vec<u8>) -> Option<Self> {
        (digits.len() <= Self::MAX_DIGITS).then_some(Self { digits })
    }
}

impl Default for SortKey {
    fn default() -> Self {
        Self::initial()
    }
}

impl fmt::Debug for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SortKey(")?;
        for d in &self.digits {
            write!(f, "{:02x}", d)?;
        }
        write!(f, ")")
    }
}

impl Encode for SortKey {
    fn encode(&self, w: &mut Writer) {
        w.u8(self.digits.len() as u8);
        w.raw(&self.digits);
    }

    fn encoded_len(&self) -> usize {
        1 + self.digits.len()
    }
}

impl Decode for SortKey {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        let len = r.u8()? as usize;
        if len == 0 || len > Self::MAX_DIGITS {
            return Err(DecodeError::InvalidValue("sort key length"));
        }
        let digits = r.raw(len)?;
        if digits.last() == Some(&0) {
            return Err(DecodeError::InvalidValue("sort key digits"));
        }
        Ok(Self { digits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(digits: &[u8]) -> SortKey {
        SortKey {
            digits: digits.to_vec(),
        }
    }

    fn assert_strictly_sorted(keys: &[SortKey]) {
        for pair in keys.windows(2) {
            assert!(pair[0] < pair[1], "{:?} !< {:?}", pair[0], pair[1]);
        }
    }

    #[test]
    fn initial_is_between_unbounded() {
        assert_eq!(SortKey::between(None, None), Some(SortKey::initial()));
    }

    #[test]
    fn between_adjacent_single_digits() {
        let lo = key(&[0x80]);
        let hi = key(&[0x81]);
        let mid = SortKey::between(Some(&lo), Some(&hi)).unwrap();
        assert!(lo < mid && mid < hi);
        assert_eq!(mid.digits(), &[0x80, 0x80]);
    }

    #[test]
    fn between_prefix_and_extension() {
        let lo = key(&[0x80]);
        let hi = key(&[0x80, 0x01]);
        let mid = SortKey::between(Some(&lo), Some(&hi)).unwrap();
        assert!(lo < mid && mid < hi);
        assert_ne!(mid.digits().last(), Some(&0));
    }

    #[test]
    fn between_rejects_unordered_bounds() {
        let a = key(&[0x40]);
        assert_eq!(SortKey::between(Some(&a), Some(&a)), None);
        assert_eq!(SortKey::between(Some(&key(&[0x50])), Some(&a)), None);
    }

    #[test]
    fn repeated_insertion_keeps_order() {
        let mut keys = vec![SortKey::initial()];
        // Deterministic pseudo-random insertion points.
        let mut seed = 0x2545_f491_u64;
        for _ in 0..2_000 {
            seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            let slot = (seed >> 33) as usize % (keys.len() + 1);
            let lo = slot.checked_sub(1).map(|i| &keys[i]);
            let hi = keys.get(slot);
            let Some(new_key) = SortKey::between(lo, hi) else {
                continue;
            };
            keys.insert(slot, new_key);
        }
        assert!(keys.len() > 1_000);
        assert_strictly_sorted(&keys);
    }

    #[test]
    fn same_gap_eventually_exhausts() {
        let lo = key(&[0x80]);
        let mut hi = key(&[0x81]);
        let mut inserted = 0;
        while let Some(k) = SortKey::between(Some(&lo), Some(&hi)) {
            assert!(lo < k && k < hi);
            assert!(k.digits().len() <= SortKey::MAX_DIGITS);
            hi = k;
            inserted += 1;
            assert!(inserted < 10_000, "gap never exhausted");
        }
        assert!(inserted > 100);
    }

    #[test]
    fn appending_and_prepending_grow_slowly() {
        let mut last = SortKey::initial();
        for _ in 0..1_000 {
            let next = SortKey::after_last(&last).unwrap();
            assert!(next > last);
            last = next;
        }
        assert!(last.digits().len() <= 5);

        let mut first = SortKey::initial();
        for _ in 0..1_000 {
            let prev = SortKey::before_first(&first).unwrap();
            assert!(prev < first);
            assert_ne!(prev.digits().last(), Some(&0));
            first = prev;
        }
        assert!(first.digits().len() <= 6);
    }

    #[test]
    fn before_first_handles_small_digits() {
        let k = key(&[0x01]);
        let prev = SortKey::before_first(&k).unwrap();
        assert_eq!(prev.digits(), &[0x00, 0xff]);
        assert!(prev < k);
    }

    #[test]
    fn evenly_spaced_is_sorted_and_roomy() {
        for count in [1, 2, 15, 16, 300, 5_000] {
            let keys = SortKey::evenly_spaced(count);
            assert_eq!(keys.len(), count);
            assert_strictly_sorted(&keys);
            for pair in keys.windows(2) {
                assert!(SortKey::between(Some(&pair[0]), Some(&pair[1])).is_some());
            }
            assert!(SortKey::before_first(&keys[0]).is_some());
        }
        assert!(SortKey::evenly_spaced(0).is_empty());
    }

    #[test]
    fn codec_validates_canonical_form() {
        let k = key(&[0x12, 0x34]);
        assert_eq!(k.encoded_len(), 3);
        assert_eq!(SortKey::from_bytes(&k.to_bytes()), Ok(k));
        assert!(SortKey::from_bytes(&[0]).is_err());
        assert!(SortKey::from_bytes(&[2, 0x12, 0x00]).is_err());
        assert_eq!(SortKey::from_bytes(&[2, 0x12]), Err(DecodeError::Truncated));
    }
}
