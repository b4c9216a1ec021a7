//! Deduplicating string pool for entry names
//!
//! Archives often repeat the same directory prefixes and, after filtering,
//! the same stripped names. The pool hands out reference-counted strings so
//! every entry name is stored once per pool.

use std::cell::RefCell;
use std::collections::HashSet;
use std::rc::Rc;

/// Interner for entry names.
#[derive(Debug, Default)]
pub struct StringPool {
    strings: HashSet<Rc<str>>,
}

impl StringPool {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the pooled copy of `s`, adding it on first use.
    pub fn intern(&mut self, s: &str) -> Rc<str> {
        if let Some(existing) = self.strings.get(s) {
            return Rc::clone(existing);
        }
        let pooled: Rc<str> = Rc::from(s);
        self.strings.insert(Rc::clone(&pooled));
        pooled
    }

    /// Number of distinct strings held.
    #[must_use]
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

/// How a resource file holds its string pool.
///
/// An exclusively owned pool is dropped with the resource file. A shared pool
/// lives until its last holder drops it, so several archives opened into one
/// file system can share their names.
#[derive(Debug, Clone)]
pub enum PoolHandle {
    Owned(Rc<RefCell<StringPool>>),
    Shared(Rc<RefCell<StringPool>>),
}

impl PoolHandle {
    /// A fresh pool owned by one archive.
    #[must_use]
    pub fn owned() -> Self {
        Self::Owned(Rc::new(RefCell::new(StringPool::new())))
    }

    /// Attach to a pool that outlives individual archives.
    #[must_use]
    pub fn shared(pool: &Rc<RefCell<StringPool>>) -> Self {
        Self::Shared(Rc::clone(pool))
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Self::Shared(_))
    }

    pub fn intern(&self, s: &str) -> Rc<str> {
        self.pool().borrow_mut().intern(s)
    }

    fn pool(&self) -> &Rc<RefCell<StringPool>> {
        match self {
            Self::Owned(pool) | Self::Shared(pool) => pool,
        }
    }

    /// Number of distinct strings in the underlying pool.
    pub fn len(&self) -> usize {
        self.pool().borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.pool().borrow().is_empty()
    }
}

impl Default for PoolHandle {
    fn default() -> Self {
        Self::owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intern_deduplicates() {
        let mut pool = StringPool::new();
        let a = pool.intern("maps/map01.wad");
        let b = pool.intern("maps/map01.wad");
        let c = pool.intern("maps/map02.wad");

        assert!(Rc::ptr_eq(&a, &b));
        assert!(!Rc::ptr_eq(&a, &c));
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn test_shared_pool_sees_all_holders() {
        let pool = Rc::new(RefCell::new(StringPool::new()));
        let first = PoolHandle::shared(&pool);
        let second = PoolHandle::shared(&pool);

        let a = first.intern("textures/wall.png");
        let b = second.intern("textures/wall.png");

        assert!(first.is_shared());
        assert!(Rc::ptr_eq(&a, &b));
        assert_eq!(pool.borrow().len(), 1);
    }

    #[test]
    fn test_owned_pools_are_independent() {
        let first = PoolHandle::owned();
        let second = PoolHandle::owned();
        first.intern("a.txt");

        assert!(!first.is_shared());
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 0);
    }
}
