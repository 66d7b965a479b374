//! Typed Handles
//!
//! Logical resources, scene objects and lights are addressed by small integer
//! handles rather than references. A handle is a `u32` tagged with the type
//! it refers to, so a mesh handle can never be passed where a material handle
//! is expected.
//!
//! Handles are issued in strictly increasing order by a [`HandleAllocator`]
//! and are never recycled within a process. [`Handle::INVALID`] is reserved
//! as the "none" sentinel and is never issued.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// A typed integer handle.
pub struct Handle<T> {
    id: u32,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The reserved "invalid / none" sentinel.
    pub const INVALID: Self = Self::from_raw(u32::MAX);

    #[inline]
    #[must_use]
    pub const fn from_raw(id: u32) -> Self {
        Self {
            id,
            _marker: PhantomData,
        }
    }

    #[inline]
    #[must_use]
    pub const fn raw(self) -> u32 {
        self.id
    }

    /// Dense index form of the handle.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.id as usize
    }

    #[inline]
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.id != u32::MAX
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.id.cmp(&other.id)
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::INVALID
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "Handle({})", self.id)
        } else {
            f.write_str("Handle(INVALID)")
        }
    }
}

/// Issues monotonically increasing handles for one category.
#[derive(Debug, Default)]
pub struct HandleAllocator {
    next: u32,
}

impl HandleAllocator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next handle.
    ///
    /// Exhausting the id space (reaching the sentinel) is a process-lifetime
    /// bug, so it panics instead of wrapping.
    pub fn allocate<T>(&mut self) -> Handle<T> {
        assert!(self.next != u32::MAX, "handle space exhausted");
        let handle = Handle::from_raw(self.next);
        self.next += 1;
        handle
    }

    /// Number of handles issued so far.
    #[inline]
    #[must_use]
    pub fn issued(&self) -> u32 {
        self.next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    #[test]
    fn allocator_is_monotonic() {
        let mut alloc = HandleAllocator::new();
        let a: Handle<Marker> = alloc.allocate();
        let b: Handle<Marker> = alloc.allocate();
        assert!(b > a);
        assert_eq!(alloc.issued(), 2);
    }

    #[test]
    fn invalid_is_default_and_not_valid() {
        let h: Handle<Marker> = Handle::default();
        assert_eq!(h, Handle::INVALID);
        assert!(!h.is_valid());
        assert_eq!(format!("{h:?}"), "Handle(INVALID)");
    }
}
