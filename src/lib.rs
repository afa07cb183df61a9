//! A bucketed cuckoo set specialized for 64-bit fingerprints.
//!
//! `BucketedCuckooSet` stores uniformly-distributed 64-bit hashes ("fingerprints")
//! with no false negatives and a false-positive rate bounded only by the
//! chance of a genuine fingerprint collision (about 2^-64 per pair). Unlike a
//! general-purpose cuckoo filter, the stored values themselves double as
//! their own occupancy marker: there is no side bitmap, and no separately
//! stored value/payload per fingerprint (see the module docs for `buckets`
//! and `slot` for the trick this relies on).
//!
//! ```
//! use bucketed_cuckoo_set::{AddOutcome, BucketedCuckooSet};
//!
//! let mut set = BucketedCuckooSet::new(4).unwrap();
//!
//! for fp in 1u64..=100 {
//!     set.add(fp).unwrap();
//! }
//!
//! assert!(set.has(42));
//! assert!(!set.has(0));
//! assert!(!set.has(u64::MAX));
//!
//! assert!(set.del(42));
//! assert!(!set.has(42));
//! assert!(!set.del(42));
//! ```

mod buckets;
mod cursor;
mod error;
mod shape;
mod slot;
mod stash;

use buckets::BucketArray;
use shape::Shape;
use slot::is_free;
use stash::Stash;

pub use cursor::Cursor;
pub use error::{CuckooSetError, SimdPreference};

#[cfg(feature = "serde_support")]
use serde_derive::{Deserialize, Serialize};

/// Outcome of a successful [`BucketedCuckooSet::add`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde_support", derive(Serialize, Deserialize))]
pub enum AddOutcome {
    /// The fingerprint was already present; the set is unchanged.
    AlreadyPresent,
    /// The fingerprint was inserted without needing to resize.
    Inserted,
    /// The fingerprint was inserted, but only after widening or growing the
    /// set. A caller seeing this often (for a fixed initial `logsize`) is a
    /// sign `logsize` was sized too small up front.
    InsertedAndResized,
}

/// A bucketed cuckoo set of 64-bit fingerprints.
///
/// See the crate documentation for the overall contract. Not `Send`/`Sync`:
/// the set is single-owner and has no internal synchronization, matching its
/// intended use as an in-process membership index.
pub struct BucketedCuckooSet {
    buckets: BucketArray,
    stash: Stash,
    shape: Shape,
    cnt: usize,
    simd: SimdPreference,
}

impl BucketedCuckooSet {
    /// Creates a set sized for roughly `2^logsize` fingerprints, clamping
    /// `logsize` up to a minimum of 4. Rejects `logsize > 32` with
    /// [`CuckooSetError::TooBig`].
    pub fn new(logsize: u32) -> Result<Self, CuckooSetError> {
        Self::with_options(logsize, SimdPreference::default())
    }

    /// Like [`BucketedCuckooSet::new`], additionally taking a SIMD-kernel
    /// preference. Only a scalar probe ships today; `simd` is accepted and
    /// stored for forward API compatibility, not yet acted on.
    pub fn with_options(logsize: u32, simd: SimdPreference) -> Result<Self, CuckooSetError> {
        if logsize > 32 {
            return Err(CuckooSetError::TooBig(logsize));
        }
        let logsize = logsize.max(4);
        let buckets = BucketArray::new(logsize, Shape::Two)?;
        Ok(Self {
            buckets,
            stash: Stash::new(),
            shape: Shape::Two,
            cnt: 0,
            simd,
        })
    }

    /// Number of fingerprints currently stored (buckets + stash).
    pub fn len(&self) -> usize {
        self.cnt + self.stash.len()
    }

    /// Whether the set holds no fingerprints.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The current `logsize` (`2^logsize` is the bucket count).
    pub fn logsize(&self) -> u32 {
        self.buckets.logsize()
    }

    /// The current bucket width (2, 3, or 4 slots per bucket).
    pub fn bucket_width(&self) -> u32 {
        self.buckets.width() as u32
    }

    /// `(cnt + nstash) / (bucket_width * 2^logsize)`.
    pub fn load_factor(&self) -> f64 {
        let capacity = self.buckets.width() * self.buckets.n_buckets();
        self.len() as f64 / capacity as f64
    }

    /// Which SIMD preference this set was built with.
    pub fn simd_preference(&self) -> SimdPreference {
        self.simd
    }

    /// Whether `fp` is stored, either in a bucket or in the stash.
    pub fn has(&self, fp: u64) -> bool {
        let (i1, i2) = self.buckets.indices(fp);
        if self.buckets.has(fp, i1, i2) {
            return true;
        }
        self.stash.is_active() && self.stash.contains(fp)
    }

    /// Removes `fp` if present. Returns whether it was found. Never
    /// triggers a resize; may downgrade dispatch by emptying the stash.
    pub fn del(&mut self, fp: u64) -> bool {
        let (i1, i2) = self.buckets.indices(fp);
        if self.buckets.remove(fp, i1) {
            self.cnt -= 1;
            return true;
        }
        if i2 != i1 && self.buckets.remove(fp, i2) {
            self.cnt -= 1;
            return true;
        }
        if self.stash.is_active() && self.stash.remove(fp) {
            if !self.stash.is_active() {
                log::trace!("stash emptied by del, dropping stash dispatch");
            }
            return true;
        }
        false
    }

    /// Inserts `fp`. See [`AddOutcome`] for the possible results and
    /// [`CuckooSetError`] for the ways this can fail.
    pub fn add(&mut self, fp: u64) -> Result<AddOutcome, CuckooSetError> {
        if self.has(fp) {
            return Ok(AddOutcome::AlreadyPresent);
        }

        let (i1, i2) = self.buckets.indices(fp);
        if self.buckets.place_in_either(fp, i1, i2) {
            self.cnt += 1;
            return Ok(AddOutcome::Inserted);
        }

        let max_kicks = 2 * self.buckets.logsize();
        match self.buckets.kick(fp, i1, max_kicks) {
            Ok(()) => {
                self.cnt += 1;
                Ok(AddOutcome::Inserted)
            }
            Err(pending) => {
                if self.stash.add(pending) {
                    log::debug!("fingerprint absorbed by the overflow stash");
                    Ok(AddOutcome::Inserted)
                } else {
                    self.resize_for(pending)
                }
            }
        }
    }

    /// Returns a fresh traversal cursor (see [`Cursor`] and
    /// [`BucketedCuckooSet::next`]).
    pub fn cursor(&self) -> Cursor {
        Cursor::new()
    }

    /// Yields the next stored fingerprint, or `None` at the end (at which
    /// point `cursor` is reset to the start). Iteration order is
    /// unspecified and unstable across mutation; see [`Cursor`]'s docs for
    /// the interleaving contract with `del`.
    pub fn next(&self, cursor: &mut Cursor) -> Option<u64> {
        let total = self.buckets.total_slots();
        while cursor.position < total {
            let idx = cursor.position;
            cursor.position += 1;
            let v = self
                .buckets
                .value_at(idx)
                .expect("idx is within total_slots");
            let bucket_index = self.buckets.bucket_index_of(idx);
            if !is_free(bucket_index, v) {
                return Some(v);
            }
        }

        let stash_values = self.stash.traversal_values();
        let stash_idx = cursor.position - total;
        if stash_idx < stash_values.len() {
            cursor.position += 1;
            return Some(stash_values[stash_idx]);
        }

        cursor.position = 0;
        None
    }

    /// Widens (bsize 2->3 or 3->4) or grows (bsize 4 -> bsize 3, doubled
    /// bucket count) to make room for `pending`, the fingerprint that
    /// couldn't be placed or stashed. Only reached once the stash is full.
    fn resize_for(&mut self, pending: u64) -> Result<AddOutcome, CuckooSetError> {
        match self.shape.widen() {
            Some(new_shape) => self.widen_and_place(new_shape, pending),
            None => self.grow_and_place(pending),
        }
    }

    fn widen_and_place(
        &mut self,
        new_shape: Shape,
        pending: u64,
    ) -> Result<AddOutcome, CuckooSetError> {
        let mut new_buckets = self.buckets.widen(new_shape)?;

        let (i1, _i2) = new_buckets.indices(pending);
        if !new_buckets.place_in_one(pending, i1) {
            // The freshly added column at i1 must be free; if it somehow
            // isn't, report failure instead of silently dropping `pending`.
            return Err(CuckooSetError::Unplaceable);
        }

        let carry = self.stash.drain();
        self.buckets = new_buckets;
        self.shape = new_shape;
        self.cnt += 1;

        let max_kicks = 2 * self.buckets.logsize();
        for fp in carry {
            let (i1, i2) = self.buckets.indices(fp);
            if self.buckets.place_in_either(fp, i1, i2) {
                self.cnt += 1;
                continue;
            }
            match self.buckets.kick(fp, i1, max_kicks) {
                Ok(()) => self.cnt += 1,
                Err(still_pending) => {
                    let restashed = self.stash.add(still_pending);
                    debug_assert!(restashed, "stash was just drained, must have room");
                }
            }
        }

        log::debug!(
            "widened to bucket width {} at logsize {}",
            self.buckets.width(),
            self.buckets.logsize()
        );
        Ok(AddOutcome::InsertedAndResized)
    }

    fn grow_and_place(&mut self, pending: u64) -> Result<AddOutcome, CuckooSetError> {
        let n = self.buckets.n_buckets();
        if self.cnt < 2 * n {
            return Err(CuckooSetError::Unplaceable);
        }

        let (new_buckets, mut overflow) = self.buckets.grow()?;
        overflow.push(pending);
        overflow.extend(self.stash.values());

        let mut trial = new_buckets;
        let max_kicks = 2 * trial.logsize();
        let mut placed_count = 0usize;
        for &fp in &overflow {
            let (i1, i2) = trial.indices(fp);
            if trial.place_in_either(fp, i1, i2) {
                placed_count += 1;
                continue;
            }
            match trial.kick(fp, i1, max_kicks) {
                Ok(()) => placed_count += 1,
                Err(_) => return Err(CuckooSetError::Unplaceable),
            }
        }

        self.buckets = trial;
        self.shape = Shape::Three;
        self.cnt = placed_count;
        self.stash = Stash::new();
        log::debug!(
            "grew to {} buckets at bucket width 3 (logsize {})",
            self.buckets.n_buckets(),
            self.buckets.logsize()
        );
        Ok(AddOutcome::InsertedAndResized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_oversized_logsize() {
        assert_eq!(
            BucketedCuckooSet::new(33).unwrap_err(),
            CuckooSetError::TooBig(33)
        );
    }

    #[test]
    fn new_clamps_small_logsize() {
        let set = BucketedCuckooSet::new(0).unwrap();
        assert_eq!(set.logsize(), 4);
    }

    #[test]
    fn basic_add_has_del() {
        let mut set = BucketedCuckooSet::new(4).unwrap();
        assert_eq!(set.add(7).unwrap(), AddOutcome::Inserted);
        assert_eq!(set.add(7).unwrap(), AddOutcome::AlreadyPresent);
        assert!(set.has(7));
        assert_eq!(set.len(), 1);
        assert!(set.del(7));
        assert!(!set.has(7));
        assert!(!set.del(7));
        assert!(set.is_empty());
    }

    #[test]
    fn sentinel_values_are_never_members_of_an_empty_set() {
        let set = BucketedCuckooSet::new(4).unwrap();
        assert!(!set.has(0));
        assert!(!set.has(u64::MAX));
    }

    #[test]
    fn resize_happens_while_filling_a_small_set() {
        let mut set = BucketedCuckooSet::new(4).unwrap();
        let mut saw_resize = false;
        for fp in 1u64..=100 {
            if set.add(fp).unwrap() == AddOutcome::InsertedAndResized {
                saw_resize = true;
            }
        }
        assert!(saw_resize, "inserting 100 items into logsize=4 must resize");
        for fp in 1u64..=100 {
            assert!(set.has(fp), "missing {fp}");
        }
        assert!(!set.has(0));
        assert!(!set.has(u64::MAX));
        assert!(!set.has(101));
    }

    #[test]
    fn iteration_yields_every_inserted_value_exactly_once() {
        use std::collections::HashSet;

        let mut set = BucketedCuckooSet::new(6).unwrap();
        let inserted: HashSet<u64> = (1u64..=300).collect();
        for &fp in &inserted {
            set.add(fp).unwrap();
        }

        let mut cursor = set.cursor();
        let mut seen = HashSet::new();
        while let Some(fp) = set.next(&mut cursor) {
            assert!(seen.insert(fp), "duplicate yield: {fp}");
        }
        assert_eq!(seen, inserted);
    }

    #[test]
    fn deleting_mid_bucket_preserves_siblings() {
        let mut set = BucketedCuckooSet::new(4).unwrap();
        // Pick three fingerprints that collide in H1 so they share a bucket;
        // with logsize=4 the low 4 bits of fp select the H1 bucket.
        let base = 0x0000_0000_0000_0003u64;
        let a = base;
        let b = base | (1 << 10);
        let c = base | (2 << 10);
        set.add(a).unwrap();
        set.add(b).unwrap();
        set.add(c).unwrap();

        assert!(set.del(b));
        assert!(!set.has(b));
        assert!(set.has(a));
        assert!(set.has(c));
    }
}
