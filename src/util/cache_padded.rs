use std::fmt;
use std::ops::{Deref, DerefMut};

/// Pads a value out to its own cache line so that neighbouring slots in an
/// array don't false-share. Waiter slot states and per-worker counters live
/// in arrays indexed by worker id, which makes them prime candidates.
#[repr(align(64))]
pub struct CachePadded<T> {
    value: T,
}

impl<T> CachePadded<T> {
    pub const fn new(value: T) -> Self {
        Self { value }
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for CachePadded<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}

impl<T> DerefMut for CachePadded<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.value
    }
}

impl<T: Default> Default for CachePadded<T> {
    fn default() -> Self {
        Self {
            value: T::default(),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for CachePadded<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CachePadded").field(&self.value).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::{align_of, size_of};

    #[test]
    fn test_alignment() {
        assert_eq!(align_of::<CachePadded<u64>>(), 64);
        assert!(size_of::<CachePadded<u64>>() >= 64);
    }

    #[test]
    fn test_deref() {
        let mut padded = CachePadded::new(7u32);
        assert_eq!(*padded, 7);
        *padded = 9;
        assert_eq!(padded.into_inner(), 9);
    }
}
