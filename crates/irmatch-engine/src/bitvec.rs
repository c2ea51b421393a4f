//! Finite encoding of the occurrence counts a counts constraint permits.
//!
//! Bit `i` (0..=62) is set when exactly `i` occurrences are permitted; bit 63
//! stands for every count of 63 or more. Constraints on the same node are
//! intersected with a bitwise AND. The saturated top bit makes the check
//! approximate: two constraints whose only disagreement lies above 62
//! (`> 100` and `< 80`) both keep bit 63 and are not flagged.

use std::fmt;

use irmatch_dsl::ast::{Comparator, Relation};

/// Index of the saturating "63 or more" bit.
pub const SATURATION_BIT: u64 = 63;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CountBitVector(u64);

impl CountBitVector {
    /// Every count permitted.
    pub const ALL: CountBitVector = CountBitVector(u64::MAX);
    /// No count permitted.
    pub const NONE: CountBitVector = CountBitVector(0);

    pub fn from_bits(bits: u64) -> Self {
        Self(bits)
    }

    pub fn bits(self) -> u64 {
        self.0
    }

    pub fn from_relation(relation: Relation) -> Self {
        let b = relation.bound;
        let bits = match relation.comparator {
            Comparator::Eq => span(b, Some(b)),
            Comparator::Ne if b < SATURATION_BIT => !span(b, Some(b)),
            Comparator::Ne => u64::MAX,
            Comparator::Lt => match b.checked_sub(1) {
                Some(hi) => span(0, Some(hi)),
                None => 0,
            },
            Comparator::Le => span(0, Some(b)),
            Comparator::Gt => match b.checked_add(1) {
                Some(lo) => span(lo, None),
                None => 0,
            },
            Comparator::Ge => span(b, None),
        };
        Self(bits)
    }

    /// Conjunction of several relations on the same count.
    pub fn from_relations(relations: &[Relation]) -> Self {
        relations
            .iter()
            .fold(Self::ALL, |acc, r| acc.intersect(Self::from_relation(*r)))
    }

    pub fn intersect(self, other: Self) -> Self {
        Self(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn permits_zero(self) -> bool {
        self.0 & 1 == 1
    }

    /// Whether `count` occurrences are permitted, with counts above 62
    /// folded into the saturation bit.
    pub fn permits(self, count: u64) -> bool {
        let bit = count.min(SATURATION_BIT);
        (self.0 >> bit) & 1 == 1
    }
}

/// Mask of the counts in `lo..=hi` (`hi = None` is unbounded), saturated at
/// bit 63.
fn span(lo: u64, hi: Option<u64>) -> u64 {
    if let Some(hi) = hi {
        if hi < lo {
            return 0;
        }
    }
    let lo_bit = lo.min(SATURATION_BIT);
    let hi_bit = hi.map_or(SATURATION_BIT, |h| h.min(SATURATION_BIT));
    (u64::MAX >> (SATURATION_BIT - hi_bit)) & (u64::MAX << lo_bit)
}

impl fmt::Debug for CountBitVector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CountBitVector({:#018x})", self.0)
    }
}

impl fmt::Display for CountBitVector {
    /// Renders the permitted counts as ranges, e.g. `{0..=2, 5, 63+}`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ranges: Vec<String> = Vec::new();
        let mut bit = 0;
        while bit <= SATURATION_BIT {
            if !self.permits(bit) {
                bit += 1;
                continue;
            }
            let start = bit;
            while bit < SATURATION_BIT && self.permits(bit + 1) {
                bit += 1;
            }
            ranges.push(match (start, bit) {
                (s, e) if e == SATURATION_BIT && s == e => "63+".to_string(),
                (s, e) if e == SATURATION_BIT => format!("{s}+"),
                (s, e) if s == e => s.to_string(),
                (s, e) => format!("{s}..={e}"),
            });
            bit += 1;
        }
        write!(f, "{{{}}}", ranges.join(", "))
    }
}
