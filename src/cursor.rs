/// An in/out traversal cursor for [`crate::BucketedCuckooSet::next`].
///
/// Starts at zero; advancing it walks the flat bucket array first, then the
/// (up to two) stashed fingerprints, then resets back to zero and reports
/// "no more". Mutating the set via `del` while iterating is supported only
/// for the element just yielded: the caller must rewind the cursor by one
/// step (`Cursor::rewind`) before continuing, because deletion shifts later
/// slots down. Concurrent `add` during iteration is not supported.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cursor {
    pub(crate) position: usize,
}

impl Cursor {
    /// A fresh cursor positioned at the start of the set.
    pub fn new() -> Self {
        Self { position: 0 }
    }

    /// Rewinds the cursor by one step, to be called after deleting the
    /// element that was just yielded by `next`.
    pub fn rewind(&mut self) {
        self.position = self.position.saturating_sub(1);
    }
}
