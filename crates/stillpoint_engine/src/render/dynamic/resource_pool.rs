//! Object Pool System
//!
//! Recycles short-lived scene objects (particles, transient nodes) instead of
//! rebuilding them every time one is needed. Objects are addressed through
//! generational handles so a stale handle can never reach a recycled object
//! that was disposed.
//!
//! # Architecture
//!
//! ```text
//! ResourcePool<T>
//!     ├── objects   (SlotMap<PoolHandle, T>, owns every live object)
//!     ├── active    (handles checked out by callers)
//!     └── free      (handles parked for reuse, LIFO)
//! ```
//!
//! # Usage
//!
//! ```rust
//! use stillpoint_engine::render::dynamic::{PooledNode, ResourcePool};
//!
//! let mut pool = ResourcePool::new(PooledNode::new, 100);
//! let handle = pool.acquire();
//! assert!(pool.is_active(handle));
//! pool.release(handle);
//! assert_eq!(pool.stats().pool_size, 1);
//! ```

use slotmap::{new_key_type, SlotMap};
use std::collections::HashSet;
use std::fmt;

use crate::foundation::math::Transform;

/// Default free-list ceiling
pub const DEFAULT_POOL_SIZE: usize = 1000;

new_key_type! {
    /// Handle to an object owned by a [`ResourcePool`]
    pub struct PoolHandle;
}

/// An object that can live in a [`ResourcePool`]
pub trait Poolable {
    /// Show or hide the object; called on acquire and release
    fn set_active(&mut self, active: bool);

    /// Mutable access to the object's transform
    fn transform_mut(&mut self) -> &mut Transform;

    /// Restore the object to its pristine state before it is parked
    ///
    /// The default puts the transform back to identity.
    fn reset(&mut self) {
        self.transform_mut().reset();
    }

    /// Release anything the object holds; called before it is dropped
    fn dispose(&mut self) {}
}

/// Pool occupancy
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Objects parked in the free list
    pub pool_size: usize,
    /// Objects checked out
    pub active_count: usize,
    /// `pool_size + active_count`
    pub total_allocated: usize,
}

type Factory<T> = Box<dyn FnMut() -> T>;
type ResetFn<T> = Box<dyn FnMut(&mut T)>;

/// Handle-based pool of reusable objects
pub struct ResourcePool<T: Poolable> {
    objects: SlotMap<PoolHandle, T>,
    active: HashSet<PoolHandle>,
    free: Vec<PoolHandle>,
    factory: Factory<T>,
    reset: Option<ResetFn<T>>,
    max_size: usize,
    disposed: u64,
}

impl<T: Poolable> ResourcePool<T> {
    /// Create an empty pool
    ///
    /// # Arguments
    /// * `factory` - Builds a new object when the free list is empty
    /// * `max_size` - Most objects the free list keeps; extras are disposed
    pub fn new(factory: impl FnMut() -> T + 'static, max_size: usize) -> Self {
        log::info!("Creating resource pool (free list limit {})", max_size);
        Self {
            objects: SlotMap::with_key(),
            active: HashSet::new(),
            free: Vec::new(),
            factory: Box::new(factory),
            reset: None,
            max_size,
            disposed: 0,
        }
    }

    /// Replace the default reset routine ([`Poolable::reset`])
    pub fn with_reset(mut self, reset: impl FnMut(&mut T) + 'static) -> Self {
        self.reset = Some(Box::new(reset));
        self
    }

    /// Free-list ceiling
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Check out an object, reusing a parked one when available
    pub fn acquire(&mut self) -> PoolHandle {
        let handle = match self.free.pop() {
            Some(handle) => handle,
            None => self.objects.insert((self.factory)()),
        };

        if let Some(object) = self.objects.get_mut(handle) {
            object.set_active(true);
        }
        self.active.insert(handle);
        handle
    }

    /// Return an object to the pool
    ///
    /// Returns `false` (and does nothing) when the handle is not checked out.
    /// The object is hidden and reset, then parked, or disposed when the free
    /// list is already full.
    pub fn release(&mut self, handle: PoolHandle) -> bool {
        if !self.active.contains(&handle) {
            return false;
        }
        let Some(object) = self.objects.get_mut(handle) else {
            self.active.remove(&handle);
            return false;
        };

        object.set_active(false);
        match self.reset.as_mut() {
            Some(reset) => reset(object),
            None => object.reset(),
        }
        self.active.remove(&handle);

        if self.free.len() < self.max_size {
            self.free.push(handle);
        } else if let Some(mut object) = self.objects.remove(handle) {
            object.dispose();
            self.disposed += 1;
            log::trace!("Pool full ({}), disposed released object", self.max_size);
        }
        true
    }

    /// Release every checked-out object
    pub fn release_all(&mut self) {
        let handles: Vec<PoolHandle> = self.active.iter().copied().collect();
        let count = handles.len();
        for handle in handles {
            self.release(handle);
        }
        if count > 0 {
            log::debug!("Released {} pooled object(s)", count);
        }
    }

    /// Build objects ahead of demand
    ///
    /// Never grows the free list past `max_size`; returns how many objects
    /// were created.
    pub fn pre_allocate(&mut self, count: usize) -> usize {
        let room = self.max_size.saturating_sub(self.free.len());
        let count = count.min(room);
        for _ in 0..count {
            let mut object = (self.factory)();
            object.set_active(false);
            let handle = self.objects.insert(object);
            self.free.push(handle);
        }
        count
    }

    /// Object behind a handle, active or parked
    pub fn get(&self, handle: PoolHandle) -> Option<&T> {
        self.objects.get(handle)
    }

    /// Mutable object behind a handle, active or parked
    pub fn get_mut(&mut self, handle: PoolHandle) -> Option<&mut T> {
        self.objects.get_mut(handle)
    }

    /// Whether the handle is currently checked out
    pub fn is_active(&self, handle: PoolHandle) -> bool {
        self.active.contains(&handle)
    }

    /// Handles currently checked out, in no particular order
    pub fn active_handles(&self) -> Vec<PoolHandle> {
        self.active.iter().copied().collect()
    }

    /// Objects disposed because the free list was full
    pub fn disposed_count(&self) -> u64 {
        self.disposed
    }

    /// Occupancy counts
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pool_size: self.free.len(),
            active_count: self.active.len(),
            total_allocated: self.free.len() + self.active.len(),
        }
    }

    /// Dispose every object, active or parked, and empty the pool
    ///
    /// Outstanding handles become invalid.
    pub fn dispose(&mut self) {
        let count = self.objects.len();
        for (_, mut object) in self.objects.drain() {
            object.dispose();
        }
        self.disposed += count as u64;
        self.active.clear();
        self.free.clear();
        log::debug!("Disposed resource pool ({} object(s))", count);
    }
}

impl<T: Poolable> fmt::Debug for ResourcePool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourcePool")
            .field("stats", &self.stats())
            .field("max_size", &self.max_size)
            .field("disposed", &self.disposed)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::foundation::math::Vec3;
    use std::cell::Cell;
    use std::rc::Rc;

    #[derive(Debug, Default)]
    struct Widget {
        transform: Transform,
        active: bool,
        marked: bool,
        disposals: Rc<Cell<u32>>,
    }

    impl Poolable for Widget {
        fn set_active(&mut self, active: bool) {
            self.active = active;
        }

        fn transform_mut(&mut self) -> &mut Transform {
            &mut self.transform
        }

        fn dispose(&mut self) {
            self.disposals.set(self.disposals.get() + 1);
        }
    }

    fn widget_pool(max_size: usize) -> (ResourcePool<Widget>, Rc<Cell<u32>>) {
        let disposals = Rc::new(Cell::new(0));
        let shared = disposals.clone();
        let pool = ResourcePool::new(
            move || Widget {
                disposals: shared.clone(),
                ..Widget::default()
            },
            max_size,
        );
        (pool, disposals)
    }

    #[test]
    fn test_acquired_handles_are_exclusive() {
        let (mut pool, _) = widget_pool(10);
        let a = pool.acquire();
        let b = pool.acquire();
        assert_ne!(a, b);
        assert!(pool.is_active(a) && pool.is_active(b));

        pool.release(a);
        assert!(!pool.is_active(a));
        assert_eq!(pool.stats().pool_size, 1);

        let c = pool.acquire();
        assert_eq!(c, a);
        assert_ne!(c, b);
        assert_eq!(pool.stats().active_count, 2);
        assert_eq!(pool.stats().pool_size, 0);
    }

    #[test]
    fn test_release_resets_and_hides() {
        let (mut pool, _) = widget_pool(10);
        let handle = pool.acquire();
        assert!(pool.get(handle).unwrap().active);
        pool.get_mut(handle).unwrap().transform.position = Vec3::new(4.0, 5.0, 6.0);

        assert!(pool.release(handle));
        let parked = pool.get(handle).unwrap();
        assert!(!parked.active);
        assert!(parked.transform.is_identity());
    }

    #[test]
    fn test_active_handles_track_checkouts() {
        let (mut pool, _) = widget_pool(10);
        assert!(pool.active_handles().is_empty());

        let a = pool.acquire();
        let b = pool.acquire();
        let c = pool.acquire();
        pool.release(b);

        let mut active = pool.active_handles();
        active.sort();
        let mut expected = vec![a, c];
        expected.sort();
        assert_eq!(active, expected);

        pool.release_all();
        assert!(pool.active_handles().is_empty());
    }

    #[test]
    fn test_release_of_inactive_handle_is_noop() {
        let (mut pool, disposals) = widget_pool(10);
        let handle = pool.acquire();
        assert!(pool.release(handle));
        assert!(!pool.release(handle));
        assert_eq!(pool.stats().pool_size, 1);
        assert_eq!(disposals.get(), 0);
    }

    #[test]
    fn test_overflow_beyond_max_size_is_disposed() {
        let (mut pool, disposals) = widget_pool(2);
        let handles: Vec<_> = (0..4).map(|_| pool.acquire()).collect();
        for handle in &handles {
            pool.release(*handle);
        }

        assert_eq!(pool.stats().pool_size, 2);
        assert_eq!(disposals.get(), 2);
        assert_eq!(pool.disposed_count(), 2);
        assert!(pool.get(handles[3]).is_none());
    }

    #[test]
    fn test_custom_reset_replaces_default() {
        let (pool, _) = widget_pool(4);
        let mut pool = pool.with_reset(|widget| widget.marked = true);
        let handle = pool.acquire();
        pool.get_mut(handle).unwrap().transform.position = Vec3::new(1.0, 0.0, 0.0);
        pool.release(handle);

        let parked = pool.get(handle).unwrap();
        assert!(parked.marked);
        assert!(!parked.transform.is_identity());
    }

    #[test]
    fn test_pre_allocate_respects_max_size() {
        let (mut pool, _) = widget_pool(3);
        assert_eq!(pool.pre_allocate(2), 2);
        assert_eq!(pool.pre_allocate(5), 1);
        assert_eq!(pool.stats().pool_size, 3);

        let handle = pool.acquire();
        assert_eq!(pool.stats(), PoolStats { pool_size: 2, active_count: 1, total_allocated: 3 });
        assert!(pool.get(handle).unwrap().active);
    }

    #[test]
    fn test_release_all_and_dispose() {
        let (mut pool, disposals) = widget_pool(10);
        let first = pool.acquire();
        pool.acquire();
        pool.acquire();
        pool.release_all();
        assert_eq!(pool.stats().active_count, 0);
        assert_eq!(pool.stats().pool_size, 3);

        pool.acquire();
        pool.dispose();
        assert_eq!(disposals.get(), 3);
        assert_eq!(pool.stats(), PoolStats::default());
        assert!(pool.get(first).is_none());
    }
}
