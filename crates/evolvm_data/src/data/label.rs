use rkyv::{Archive, Deserialize as RkyvDeserialize, Serialize as RkyvSerialize};
use serde::{Deserialize, Serialize};

/// A run of no-op modifiers used as a content-addressed search key.
#[derive(
    Clone,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Archive,
    RkyvSerialize,
    RkyvDeserialize,
)]
#[archive(check_bytes)]
pub struct CodeLabel {
    nops: Vec<u8>,
}

impl CodeLabel {
    #[must_use]
    pub const fn new() -> Self {
        Self { nops: Vec::new() }
    }

    #[must_use]
    pub fn from_nops(nops: &[u8]) -> Self {
        Self {
            nops: nops.to_vec(),
        }
    }

    pub fn push(&mut self, nop: u8) {
        self.nops.push(nop);
    }

    pub fn clear(&mut self) {
        self.nops.clear();
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nops.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nops.is_empty()
    }

    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.nops
    }

    #[must_use]
    pub fn get(&self, idx: usize) -> Option<u8> {
        self.nops.get(idx).copied()
    }

    /// The complement label: every modifier stepped by one through `base`.
    #[must_use]
    pub fn complement(&self, base: u8) -> Self {
        let base = base.max(1);
        Self {
            nops: self
                .nops
                .iter()
                .map(|&n| ((u16::from(n) + 1) % u16::from(base)) as u8)
                .collect(),
        }
    }

    /// Reads the label as a base-`base` number, first modifier most significant.
    #[must_use]
    pub fn as_int(&self, base: u8) -> i32 {
        self.nops.iter().fold(0i32, |acc, &n| {
            acc.wrapping_mul(i32::from(base)).wrapping_add(i32::from(n))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_complement_wraps() {
        let label = CodeLabel::from_nops(&[0, 1, 7]);
        assert_eq!(label.complement(8).as_slice(), &[1, 2, 0]);
    }

    #[test]
    fn test_as_int() {
        assert_eq!(CodeLabel::from_nops(&[1, 2]).as_int(8), 10);
        assert_eq!(CodeLabel::new().as_int(8), 0);
    }
}
