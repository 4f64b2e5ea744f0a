//! Deep equality used by equality, `in` and `contains` matchers.

use crate::value::Value;
use std::cmp::Ordering;

impl Value {
    /// Deep equality between two values.
    ///
    /// Differs from `==` in two ways:
    /// - arrays ignore the order of their top-level elements: `[1, 2]`
    ///   equals `[2, 1]`. Both sides are sorted by the total order, then
    ///   compared pairwise, so nested arrays keep their own element order
    ///   (`[[2, 1]]` does not equal `[[1, 2]]`)
    /// - numbers compare by value, so `-0` equals `0` and NaN equals NaN
    ///
    /// Dates compare by instant. `Number` and `BigInt` never compare equal.
    pub fn deep_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                Value::Number(*a).total_cmp(&Value::Number(*b)) == Ordering::Equal
            }
            (Value::Array(a), Value::Array(b)) => {
                if a.len() != b.len() {
                    return false;
                }
                let mut a_sorted: Vec<&Value> = a.iter().collect();
                let mut b_sorted: Vec<&Value> = b.iter().collect();
                a_sorted.sort_by(|x, y| x.total_cmp(y));
                b_sorted.sort_by(|x, y| x.total_cmp(y));
                a_sorted
                    .iter()
                    .zip(b_sorted.iter())
                    .all(|(x, y)| x.deep_eq(y))
            }
            (Value::Object(a), Value::Object(b)) => {
                a.len() == b.len()
                    && a
                        .iter()
                        .zip(b.iter())
                        .all(|((ak, av), (bk, bv))| ak == bk && av.deep_eq(bv))
            }
            _ => self == other,
        }
    }
}
