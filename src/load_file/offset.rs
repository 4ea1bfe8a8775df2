use std::ops::{Add, AddAssign, Sub, SubAssign};

/// An absolute (non-negative) address in a core of a given size.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Offset {
    value: u32,
    core_size: u32,
}

/// Fold any signed value into `0..core_size`.
#[must_use]
pub fn fold(value: i64, core_size: u32) -> u32 {
    value.rem_euclid(i64::from(core_size)) as u32
}

/// Move a value folded against `compiled` into a core of `core_size`. Values
/// past the midpoint of the old core are taken as negative offsets. A
/// `compiled` size of 0 means the value is used as is.
#[must_use]
pub fn refold(value: u32, compiled: u32, core_size: u32) -> u32 {
    let value = i64::from(value);
    let compiled = i64::from(compiled);
    if compiled > 0 && value > compiled / 2 {
        fold(value - compiled, core_size)
    } else {
        fold(value, core_size)
    }
}

impl Offset {
    /// Create a new Offset. The value will be wrapped to be within bounds of the core.
    ///
    /// # Panics
    /// If `core_size` is 0.
    #[must_use]
    pub fn new(value: i64, core_size: u32) -> Self {
        Self {
            value: fold(value, core_size),
            core_size,
        }
    }

    /// Get the value of the offset. This will always be less than the core size.
    #[must_use]
    pub fn value(self) -> u32 {
        self.value
    }

    /// The value as an index into the core memory.
    #[must_use]
    pub fn index(self) -> usize {
        self.value as usize
    }

    #[must_use]
    pub fn core_size(self) -> u32 {
        self.core_size
    }

    /// Verify another offset has the same core size. Panics otherwise
    fn check_core_size(self, other: Self) {
        assert_eq!(
            self.core_size, other.core_size,
            "attempt to combine mismatching core sizes: {} != {}",
            self.core_size, other.core_size,
        );
    }
}

impl std::fmt::Display for Offset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}

impl Add for Offset {
    type Output = Self;

    /// Panics if the right-hand side has a different `core_size`.
    fn add(self, rhs: Self) -> Self {
        self.check_core_size(rhs);
        self + rhs.value
    }
}

impl Sub for Offset {
    type Output = Self;

    /// Panics if the right-hand side has a different `core_size`.
    fn sub(self, rhs: Self) -> Self {
        self.check_core_size(rhs);
        self - rhs.value
    }
}

impl Add<u32> for Offset {
    type Output = Self;

    fn add(self, rhs: u32) -> Self {
        Self::new(i64::from(self.value) + i64::from(rhs), self.core_size)
    }
}

impl Sub<u32> for Offset {
    type Output = Self;

    fn sub(self, rhs: u32) -> Self {
        Self::new(i64::from(self.value) - i64::from(rhs), self.core_size)
    }
}

impl Add<i64> for Offset {
    type Output = Self;

    fn add(self, rhs: i64) -> Self {
        Self::new(i64::from(self.value) + rhs, self.core_size)
    }
}

impl AddAssign<u32> for Offset {
    fn add_assign(&mut self, rhs: u32) {
        *self = *self + rhs;
    }
}

impl SubAssign<u32> for Offset {
    fn sub_assign(&mut self, rhs: u32) {
        *self = *self - rhs;
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn create_offset() {
        assert_eq!(Offset::new(1234, 12).value(), 10);
        assert_eq!(Offset::new(-1, 8000).value(), 7999);
        assert_eq!(Offset::new(-16_001, 8000).value(), 7999);
    }

    #[test]
    fn add_offset() {
        let mut offset = Offset::new(0, 12);

        assert_eq!(offset + 17_u32, Offset::new(5, 12));
        assert_eq!(offset + -17_i64, Offset::new(7, 12));
        assert_eq!(offset + Offset::new(17, 12), Offset::new(5, 12));
        assert_eq!(offset + Offset::new(-17, 12), Offset::new(7, 12));

        offset += 17;
        assert_eq!(offset, Offset::new(5, 12));
    }

    #[test]
    fn sub_offset() {
        let mut offset = Offset::new(0, 12);

        assert_eq!(offset - 17_u32, Offset::new(7, 12));
        assert_eq!(offset - Offset::new(17, 12), Offset::new(7, 12));
        assert_eq!(offset - Offset::new(-17, 12), Offset::new(5, 12));

        offset -= 17;
        assert_eq!(offset, Offset::new(7, 12));
    }

    #[test]
    fn fold_large_values() {
        assert_eq!(fold(i64::from(u32::MAX) * 3, 8000), ((u64::from(u32::MAX) * 3) % 8000) as u32);
        assert_eq!(fold(-8000, 8000), 0);
    }

    #[test]
    #[should_panic(expected = "mismatching core sizes")]
    fn mismatched_core_sizes() {
        let _ = Offset::new(1, 12) + Offset::new(1, 13);
    }

    #[test]
    fn refold_keeps_direction() {
        assert_eq!(refold(7999, 8000, 8192), 8191);
        assert_eq!(refold(4000, 8000, 8192), 4000);
        assert_eq!(refold(4001, 8000, 800), 1);
        assert_eq!(refold(12, 8000, 8000), 12);
        assert_eq!(refold(8100, 0, 8000), 100);
    }
}
