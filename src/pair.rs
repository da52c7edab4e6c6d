//! Middlegame/endgame tapered score accumulator.

use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pair {
    pub mid: i32,
    pub end: i32,
}

impl Pair {
    pub const ZERO: Pair = Pair { mid: 0, end: 0 };

    #[inline(always)]
    pub const fn new(mid: i32, end: i32) -> Self {
        Pair { mid, end }
    }
}

impl Add for Pair {
    type Output = Pair;
    #[inline(always)]
    fn add(self, rhs: Pair) -> Pair {
        Pair::new(self.mid + rhs.mid, self.end + rhs.end)
    }
}

impl Sub for Pair {
    type Output = Pair;
    #[inline(always)]
    fn sub(self, rhs: Pair) -> Pair {
        Pair::new(self.mid - rhs.mid, self.end - rhs.end)
    }
}

impl Mul<i32> for Pair {
    type Output = Pair;
    #[inline(always)]
    fn mul(self, rhs: i32) -> Pair {
        Pair::new(self.mid * rhs, self.end * rhs)
    }
}

impl AddAssign for Pair {
    #[inline(always)]
    fn add_assign(&mut self, rhs: Pair) {
        self.mid += rhs.mid;
        self.end += rhs.end;
    }
}

impl SubAssign for Pair {
    #[inline(always)]
    fn sub_assign(&mut self, rhs: Pair) {
        self.mid -= rhs.mid;
        self.end -= rhs.end;
    }
}

/// `lhs.mid*rhs.mid + lhs.end*rhs.end`, used by the feature-vector/weight
/// dot product.
#[inline(always)]
pub fn dot_product(lhs: Pair, rhs: Pair) -> i64 {
    lhs.mid as i64 * rhs.mid as i64 + lhs.end as i64 * rhs.end as i64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_sub_are_inverse() {
        let a = Pair::new(10, -5);
        let b = Pair::new(3, 7);
        assert_eq!((a + b) - b, a);
    }

    #[test]
    fn scalar_multiply() {
        assert_eq!(Pair::new(2, 3) * 4, Pair::new(8, 12));
    }
}
