// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! A memo of evaluated points keyed on the point folded onto the upper
//! half-plane, so that a point and its mirror image across the real
//! axis are evaluated once between them.  The cache takes `&mut self`
//! and is only ever handed to single-threaded renderers.

use num::Complex;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

use escape::IterationResult;

/// Maps folded coordinates to the result first stored for them.
#[derive(Debug, Default)]
pub struct SymmetryCache {
    entries: HashMap<(u64, u64), IterationResult>,
    hits: usize,
}

impl SymmetryCache {
    /// An empty cache for one render pass.
    pub fn new() -> Self {
        SymmetryCache::default()
    }

    /// The key of a point: the exact bits of its real part and of the
    /// magnitude of its imaginary part.
    pub fn key(point: &Complex<f64>) -> (u64, u64) {
        (point.re.to_bits(), point.im.abs().to_bits())
    }

    /// The stored result for the point or its conjugate, if any.
    pub fn get(&mut self, point: &Complex<f64>) -> Option<IterationResult> {
        let found = self.entries.get(&SymmetryCache::key(point)).cloned();
        if found.is_some() {
            self.hits += 1;
        }
        found
    }

    /// Stores a result unless one is already there, and returns
    /// whichever result the cache now holds for the key.
    pub fn insert(&mut self, point: &Complex<f64>, result: IterationResult) -> IterationResult {
        match self.entries.entry(SymmetryCache::key(point)) {
            Entry::Occupied(held) => *held.get(),
            Entry::Vacant(slot) => *slot.insert(result),
        }
    }

    /// Number of distinct keys stored.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// How many lookups were answered from the cache.
    pub fn hits(&self) -> usize {
        self.hits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use escape::Evaluator;

    #[test]
    fn conjugates_share_a_key() {
        let c = Complex::new(-0.5, 0.25);
        assert_eq!(SymmetryCache::key(&c), SymmetryCache::key(&c.conj()));
        assert_eq!(
            SymmetryCache::key(&Complex::new(1.0, 0.0)),
            SymmetryCache::key(&Complex::new(1.0, -0.0))
        );
        assert_ne!(
            SymmetryCache::key(&c),
            SymmetryCache::key(&Complex::new(0.5, 0.25))
        );
    }

    #[test]
    fn first_write_wins() {
        let ev = Evaluator::new(50, 2.0).unwrap();
        let mut cache = SymmetryCache::new();
        let c = Complex::new(0.3, 0.6);
        let first = ev.evaluate(c);
        let other = ev.evaluate(Complex::new(3.0, 3.0));
        assert_eq!(cache.insert(&c, first), first);
        assert_eq!(cache.insert(&c.conj(), other), first);
        assert_eq!(cache.get(&c), Some(first));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn mirror_lookups_are_hits() {
        let ev = Evaluator::new(50, 2.0).unwrap();
        let mut cache = SymmetryCache::new();
        assert!(cache.is_empty());
        let c = Complex::new(-0.1, 0.9);
        ev.evaluate_with(c, Some(&mut cache));
        assert_eq!(cache.hits(), 0);
        ev.evaluate_with(c.conj(), Some(&mut cache));
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn main_body_points_bypass_the_cache() {
        let ev = Evaluator::new(50, 2.0).unwrap();
        let mut cache = SymmetryCache::new();
        ev.evaluate_with(Complex::new(0.0, 0.1), Some(&mut cache));
        assert!(cache.is_empty());
    }
}
