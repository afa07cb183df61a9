/// Fixed two-slot side buffer absorbing occasional insertion failures.
///
/// Invariant: while exactly one element is stashed, `slots[0] == slots[1]`,
/// so [`Stash::contains`] can always compare against both slots without a
/// branch on `len`.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Stash {
    slots: [u64; 2],
    len: u8,
}

impl Stash {
    pub(crate) fn new() -> Self {
        Self {
            slots: [0, 0],
            len: 0,
        }
    }

    pub(crate) fn len(self) -> usize {
        self.len as usize
    }

    pub(crate) fn is_active(self) -> bool {
        self.len > 0
    }

    #[inline]
    pub(crate) fn contains(self, fp: u64) -> bool {
        (fp == self.slots[0]) | (fp == self.slots[1])
    }

    /// Stashes `fp`. Fails (returns `false`) if the stash is already full.
    pub(crate) fn add(&mut self, fp: u64) -> bool {
        match self.len {
            0 => {
                self.slots = [fp, fp];
                self.len = 1;
                true
            }
            1 => {
                self.slots[1] = fp;
                self.len = 2;
                true
            }
            _ => false,
        }
    }

    /// Removes `fp` from the stash if present. Always re-establishes
    /// `len == 1 => slots[0] == slots[1]`, only dropping to `len == 0` when
    /// the last stashed value is removed (see the Open Question in the
    /// design notes: the reference C implementation is inconsistent here).
    pub(crate) fn remove(&mut self, fp: u64) -> bool {
        match self.len {
            0 => false,
            1 => {
                if self.slots[0] == fp {
                    self.slots = [0, 0];
                    self.len = 0;
                    true
                } else {
                    false
                }
            }
            _ => {
                if self.slots[0] == fp {
                    self.slots[0] = self.slots[1];
                    self.len = 1;
                    true
                } else if self.slots[1] == fp {
                    self.slots[1] = self.slots[0];
                    self.len = 1;
                    true
                } else {
                    false
                }
            }
        }
    }

    /// Drains both (or one) stashed values out for reinsertion during a
    /// widen, leaving the stash empty.
    pub(crate) fn drain(&mut self) -> Vec<u64> {
        let out = self.values();
        self.len = 0;
        self.slots = [0, 0];
        out
    }

    /// Copies out the currently stashed values without clearing the stash.
    /// Used by the grow path, which must be able to read the stash before
    /// committing to a resize that might still fail.
    pub(crate) fn values(self) -> Vec<u64> {
        match self.len {
            0 => Vec::new(),
            1 => vec![self.slots[0]],
            _ => vec![self.slots[0], self.slots[1]],
        }
    }

    /// Like [`Stash::values`], but collapses the pair down to one value when
    /// `slots[0] == slots[1]`. Used for iteration, which must not yield the
    /// same fingerprint twice: the second slot only counts as a distinct
    /// member when it actually holds a second, different fingerprint.
    pub(crate) fn traversal_values(self) -> Vec<u64> {
        match self.len {
            0 => Vec::new(),
            1 => vec![self.slots[0]],
            _ => {
                if self.slots[0] == self.slots[1] {
                    vec![self.slots[0]]
                } else {
                    vec![self.slots[0], self.slots[1]]
                }
            }
        }
    }
}
