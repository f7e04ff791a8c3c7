//! One-directional set difference over path keys (or anything hashable).

use std::collections::HashSet;
use std::hash::Hash;

/// Returns the elements of `a` that are not in `b`.
///
/// Output keeps the order of `a` and contains no duplicates. `b` is indexed into a
/// `HashSet` once, so the whole call is linear in `a.len() + b.len()`.
pub fn difference<T>(a: &[T], b: &[T]) -> Vec<T>
where
    T: Eq + Hash + Clone,
{
    let index: HashSet<&T> = b.iter().collect();
    let mut seen: HashSet<&T> = HashSet::with_capacity(a.len());
    a.iter()
        .filter(|x| !index.contains(x) && seen.insert(*x))
        .cloned()
        .collect()
}
