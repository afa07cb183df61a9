use crate::error::CuckooSetError;
use crate::shape::Shape;
use crate::slot::{is_free, sentinel};

/// The flat, row-major bucket array: `N = 2^logsize` buckets of `width`
/// 64-bit slots each, `B[i*width + j]`.
///
/// A slot is free iff it equals [`sentinel`] for its bucket index; no side
/// occupancy bitmap is kept. This is the only allocation the set holds
/// besides the struct itself (see the crate's concurrency/resource notes).
pub(crate) struct BucketArray {
    slots: Box<[u64]>,
    width: usize,
    logsize: u32,
}

fn try_alloc_sentineled(n_buckets: usize, width: usize) -> Result<Box<[u64]>, CuckooSetError> {
    let len = n_buckets
        .checked_mul(width)
        .ok_or(CuckooSetError::OutOfMemory)?;
    let mut v: Vec<u64> = Vec::new();
    v.try_reserve_exact(len)
        .map_err(|_| CuckooSetError::OutOfMemory)?;
    v.resize(len, 0);
    for slot in &mut v[0..width] {
        *slot = sentinel(0);
    }
    Ok(v.into_boxed_slice())
}

impl BucketArray {
    pub(crate) fn new(logsize: u32, shape: Shape) -> Result<Self, CuckooSetError> {
        let width = shape.width();
        let n_buckets = 1usize << logsize;
        let slots = try_alloc_sentineled(n_buckets, width)?;
        Ok(Self {
            slots,
            width,
            logsize,
        })
    }

    pub(crate) fn width(&self) -> usize {
        self.width
    }

    pub(crate) fn logsize(&self) -> u32 {
        self.logsize
    }

    pub(crate) fn mask(&self) -> usize {
        (1usize << self.logsize) - 1
    }

    pub(crate) fn n_buckets(&self) -> usize {
        1usize << self.logsize
    }

    /// Splits `fp` into its two candidate bucket indices.
    #[inline]
    pub(crate) fn indices(&self, fp: u64) -> (usize, usize) {
        let mask = self.mask() as u64;
        let i1 = (fp & mask) as usize;
        let i2 = ((fp >> 32) & mask) as usize;
        (i1, i2)
    }

    /// The alternative candidate bucket for `fp`, given it currently sits at
    /// `i`. Deterministic: picks whichever of `{i1, i2}` isn't `i`; if both
    /// happen to equal `i`, returns `i2`'s slot deterministically.
    #[inline]
    pub(crate) fn alt_index(&self, fp: u64, i: usize) -> usize {
        let (i1, i2) = self.indices(fp);
        if i == i1 {
            i2
        } else {
            i1
        }
    }

    #[inline]
    fn bucket(&self, i: usize) -> &[u64] {
        let start = i * self.width;
        &self.slots[start..start + self.width]
    }

    #[inline]
    fn bucket_mut(&mut self, i: usize) -> &mut [u64] {
        let start = i * self.width;
        &mut self.slots[start..start + self.width]
    }

    /// Branchless membership probe against buckets `i1` and `i2`.
    #[inline]
    pub(crate) fn has(&self, fp: u64, i1: usize, i2: usize) -> bool {
        let b1 = self.bucket(i1);
        let b2 = self.bucket(i2);
        let mut found = false;
        for j in 0..self.width {
            found |= (fp == b1[j]) | (fp == b2[j]);
        }
        found
    }

    /// Places `fp` into the first free slot of bucket `i`. Returns `false` if
    /// the bucket is full.
    pub(crate) fn place_in_one(&mut self, fp: u64, i: usize) -> bool {
        let b = self.bucket_mut(i);
        for slot in b.iter_mut() {
            if is_free(i, *slot) {
                *slot = fp;
                return true;
            }
        }
        false
    }

    /// Places `fp` into either of its two candidate buckets.
    pub(crate) fn place_in_either(&mut self, fp: u64, i1: usize, i2: usize) -> bool {
        self.place_in_one(fp, i1) || self.place_in_one(fp, i2)
    }

    /// Eviction walk: repeatedly shifts the target bucket down by one slot
    /// (dropping the incumbent at position 0, sliding the rest down, and
    /// placing `fp` at the last position), then tries to re-home the
    /// evicted fingerprint in its alternative bucket. Gives up after
    /// `max_kicks` rounds and returns the fingerprint still being carried.
    pub(crate) fn kick(&mut self, fp: u64, i: usize, max_kicks: u32) -> Result<(), u64> {
        let mut fp = fp;
        let mut i = i;
        for _ in 0..=max_kicks {
            let evicted = {
                let b = self.bucket_mut(i);
                let evicted = b[0];
                for j in 0..self.width - 1 {
                    b[j] = b[j + 1];
                }
                b[self.width - 1] = fp;
                evicted
            };
            let alt = self.alt_index(evicted, i);
            if self.place_in_one(evicted, alt) {
                return Ok(());
            }
            fp = evicted;
            i = alt;
        }
        Err(fp)
    }

    /// Removes `fp` from bucket `i` if present, shifting later slots down to
    /// close the gap and re-sentineling the vacated last slot.
    pub(crate) fn remove(&mut self, fp: u64, i: usize) -> bool {
        let width = self.width;
        let b = self.bucket_mut(i);
        if let Some(pos) = b.iter().position(|&v| v == fp) {
            for j in pos..width - 1 {
                b[j] = b[j + 1];
            }
            b[width - 1] = sentinel(i);
            true
        } else {
            false
        }
    }

    /// Widens every bucket by one column (2->3 or 3->4), preserving
    /// `logsize`. The new column is sentineled like any other fresh slot.
    pub(crate) fn widen(&self, new_shape: Shape) -> Result<Self, CuckooSetError> {
        let new_width = new_shape.width();
        debug_assert_eq!(new_width, self.width + 1);
        let n = self.n_buckets();
        let mut new_slots = try_alloc_sentineled(n, new_width)?;
        for i in 0..n {
            let old = self.bucket(i);
            let base = i * new_width;
            new_slots[base..base + self.width].copy_from_slice(old);
            new_slots[base + self.width] = sentinel(i);
        }
        Ok(Self {
            slots: new_slots,
            width: new_width,
            logsize: self.logsize,
        })
    }

    /// Reinterprets a width-4 array of `N` buckets as a width-3 array of
    /// `2N` buckets. Every occupant (including the overflowing fourth
    /// column) is harvested into the returned buffer for the caller to
    /// redistribute with [`BucketArray::place_in_either`]/[`BucketArray::kick`]
    /// under the new, one-bit-wider mask. Every element necessarily belongs
    /// to either row `i` or row `i + N`, since `H1`/`H2` only gain one new
    /// bit, so ordinary cuckoo placement re-derives the split without a
    /// hand-rolled spread table. `logsize` is incremented by one.
    pub(crate) fn grow(&self) -> Result<(Self, Vec<u64>), CuckooSetError> {
        debug_assert_eq!(self.width, 4);
        let old_n = self.n_buckets();
        let new_n = old_n * 2;
        let new_logsize = self.logsize + 1;
        let new_slots = try_alloc_sentineled(new_n, 3)?;

        let mut overflow = Vec::new();
        for i in 0..old_n {
            for &fp in self.bucket(i) {
                if !is_free(i, fp) {
                    overflow.push(fp);
                }
            }
        }

        Ok((
            Self {
                slots: new_slots,
                width: 3,
                logsize: new_logsize,
            },
            overflow,
        ))
    }

    pub(crate) fn value_at(&self, flat_index: usize) -> Option<u64> {
        self.slots.get(flat_index).copied()
    }

    pub(crate) fn total_slots(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn bucket_index_of(&self, flat_index: usize) -> usize {
        flat_index / self.width
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widen_preserves_first_bucket() {
        let mut arr = BucketArray::new(2, Shape::Two).unwrap();
        assert!(arr.place_in_one(11, 0));
        assert!(arr.place_in_one(13, 0));
        let widened = arr.widen(Shape::Three).unwrap();
        assert_eq!(widened.bucket(0), &[11, 13, sentinel(0)]);
        assert_eq!(widened.width(), 3);
        assert_eq!(widened.logsize(), arr.logsize());
    }

    #[test]
    fn widen_preserves_last_bucket() {
        let mut arr = BucketArray::new(2, Shape::Two).unwrap();
        let last = arr.n_buckets() - 1;
        assert!(arr.place_in_one(21, last));
        assert!(arr.place_in_one(23, last));
        let widened = arr.widen(Shape::Three).unwrap();
        assert_eq!(widened.bucket(last), &[21, 23, sentinel(last)]);
    }

    #[test]
    fn widen_preserves_middle_bucket() {
        let mut arr = BucketArray::new(2, Shape::Two).unwrap();
        let mid = arr.n_buckets() / 2;
        assert!(arr.place_in_one(31, mid));
        let widened = arr.widen(Shape::Three).unwrap();
        assert_eq!(widened.bucket(mid), &[31, sentinel(mid), sentinel(mid)]);
    }

    #[test]
    fn grow_harvests_first_bucket_occupant() {
        let mut arr = BucketArray::new(2, Shape::Four).unwrap();
        assert!(arr.place_in_one(41, 0));
        let (grown, overflow) = arr.grow().unwrap();
        assert_eq!(overflow, vec![41]);
        assert_eq!(grown.width(), 3);
        assert_eq!(grown.logsize(), arr.logsize() + 1);
        assert_eq!(grown.n_buckets(), arr.n_buckets() * 2);
    }

    #[test]
    fn grow_harvests_last_bucket_occupant() {
        let mut arr = BucketArray::new(2, Shape::Four).unwrap();
        let last = arr.n_buckets() - 1;
        assert!(arr.place_in_one(43, last));
        let (_grown, overflow) = arr.grow().unwrap();
        assert_eq!(overflow, vec![43]);
    }

    #[test]
    fn grow_harvests_middle_bucket_occupant() {
        let mut arr = BucketArray::new(2, Shape::Four).unwrap();
        let mid = arr.n_buckets() / 2;
        assert!(arr.place_in_one(45, mid));
        let (_grown, overflow) = arr.grow().unwrap();
        assert_eq!(overflow, vec![45]);
    }

    #[test]
    fn has_is_false_across_empty_first_last_and_middle_buckets() {
        let arr = BucketArray::new(2, Shape::Two).unwrap();
        let last = arr.n_buckets() - 1;
        let mid = arr.n_buckets() / 2;
        assert!(!arr.has(7, 0, 0));
        assert!(!arr.has(7, last, last));
        assert!(!arr.has(7, mid, mid));
    }
}
