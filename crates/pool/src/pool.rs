use std::convert::Infallible;
use std::fmt;
use std::ops::{Index, IndexMut};

use tracing::{debug, trace};

use crate::handle::Handle;

enum Slot<T> {
    /// On the free list; `next` is the following free block.
    Free { next: u32 },
    /// Taken by an in-flight `try_construct`.
    Reserved,
    Used(T),
}

/// Snapshot of pool occupancy.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of pooled blocks reserved at creation.
    pub capacity: u32,
    /// Pooled blocks currently available.
    pub free: u32,
    /// Values currently living outside the pooled buffer.
    pub spilled: u32,
}

impl PoolStats {
    /// Live values, pooled and spilled.
    pub fn in_use(&self) -> usize {
        (self.capacity - self.free) as usize + self.spilled as usize
    }
}

/// Fixed-block allocator over one pre-reserved buffer with heap fallback.
///
/// See the [crate docs](crate) for the handle layout.
pub struct Pool<T> {
    blocks: Vec<Slot<T>>,
    capacity: u32,
    head: u32,
    free: u32,
    overflow: Vec<Option<Box<T>>>,
    overflow_free: Vec<u32>,
    spilled: u32,
}

impl<T> Pool<T> {
    /// Creates a pool with room for `capacity` pooled values.
    ///
    /// Only the buffer is reserved; no block is touched until allocation
    /// reaches it.
    pub fn with_capacity(capacity: u32) -> Self {
        Self {
            blocks: Vec::with_capacity(capacity as usize),
            capacity,
            head: 0,
            free: capacity,
            overflow: Vec::new(),
            overflow_free: Vec::new(),
            spilled: 0,
        }
    }

    /// Number of pooled blocks.
    #[inline]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Pooled blocks still available before the pool spills.
    #[inline]
    pub fn free_blocks(&self) -> u32 {
        self.free
    }

    /// Values currently stored outside the pooled buffer.
    #[inline]
    pub fn spilled(&self) -> u32 {
        self.spilled
    }

    /// Total number of live values.
    #[inline]
    pub fn in_use(&self) -> usize {
        self.stats().in_use()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.capacity,
            free: self.free,
            spilled: self.spilled,
        }
    }

    /// Whether `handle` addresses the pooled buffer rather than the heap.
    #[inline]
    pub fn is_pooled(&self, handle: Handle) -> bool {
        handle.0 < self.capacity
    }

    /// Stores `value` and returns its handle. Never fails.
    pub fn allocate(&mut self, value: T) -> Handle {
        match self.try_construct(|| Ok::<T, Infallible>(value)) {
            Ok(handle) => handle,
            Err(never) => match never {},
        }
    }

    /// Reserves a block, then builds the value in it.
    ///
    /// If `init` fails the block goes back to the pool before the error is
    /// returned.
    pub fn try_construct<E, F>(&mut self, init: F) -> Result<Handle, E>
    where
        F: FnOnce() -> Result<T, E>,
    {
        let handle = self.reserve();
        match init() {
            Ok(value) => {
                self.fill(handle, value);
                Ok(handle)
            }
            Err(err) => {
                self.unreserve(handle);
                Err(err)
            }
        }
    }

    /// Infallible form of [`try_construct`](Self::try_construct).
    pub fn construct<F>(&mut self, init: F) -> Handle
    where
        F: FnOnce() -> T,
    {
        match self.try_construct(|| Ok::<T, Infallible>(init())) {
            Ok(handle) => handle,
            Err(never) => match never {},
        }
    }

    /// Releases the value behind `handle` and returns it.
    ///
    /// Pooled blocks go back on the free list; spilled values are unboxed.
    /// Returns `None` when the handle is not live.
    pub fn deallocate(&mut self, handle: Handle) -> Option<T> {
        if self.is_pooled(handle) {
            let slot = self.blocks.get_mut(handle.0 as usize)?;
            if !matches!(slot, Slot::Used(_)) {
                return None;
            }
            let old = std::mem::replace(slot, Slot::Free { next: self.head });
            self.head = handle.0;
            self.free += 1;
            match old {
                Slot::Used(value) => Some(value),
                Slot::Free { .. } | Slot::Reserved => None,
            }
        } else {
            let idx = handle.0 - self.capacity;
            let value = self.overflow.get_mut(idx as usize)?.take()?;
            self.overflow_free.push(idx);
            self.spilled -= 1;
            Some(*value)
        }
    }

    pub fn get(&self, handle: Handle) -> Option<&T> {
        if self.is_pooled(handle) {
            match self.blocks.get(handle.0 as usize)? {
                Slot::Used(value) => Some(value),
                Slot::Free { .. } | Slot::Reserved => None,
            }
        } else {
            self.overflow
                .get((handle.0 - self.capacity) as usize)?
                .as_deref()
        }
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut T> {
        if self.is_pooled(handle) {
            match self.blocks.get_mut(handle.0 as usize)? {
                Slot::Used(value) => Some(value),
                Slot::Free { .. } | Slot::Reserved => None,
            }
        } else {
            self.overflow
                .get_mut((handle.0 - self.capacity) as usize)?
                .as_deref_mut()
        }
    }

    #[inline]
    pub fn contains(&self, handle: Handle) -> bool {
        self.get(handle).is_some()
    }

    /// Drops every live value and resets the pool to its untouched state.
    ///
    /// Outstanding handles become dangling.
    pub fn clear(&mut self) {
        self.blocks.clear();
        self.head = 0;
        self.free = self.capacity;
        self.overflow.clear();
        self.overflow_free.clear();
        self.spilled = 0;
    }

    fn reserve(&mut self) -> Handle {
        if self.free == 0 {
            return self.reserve_spill();
        }
        let inited = self.blocks.len() as u32;
        if inited < self.capacity {
            self.blocks.push(Slot::Free { next: inited + 1 });
        }
        let idx = self.head;
        let slot = &mut self.blocks[idx as usize];
        self.head = match std::mem::replace(slot, Slot::Reserved) {
            Slot::Free { next } => next,
            Slot::Reserved | Slot::Used(_) => unreachable!("free list points at live block {idx}"),
        };
        self.free -= 1;
        Handle(idx)
    }

    fn reserve_spill(&mut self) -> Handle {
        if self.spilled == 0 {
            debug!(capacity = self.capacity, "pool exhausted, spilling to heap");
        } else {
            trace!(spilled = self.spilled, "spilling to heap");
        }
        let idx = match self.overflow_free.pop() {
            Some(idx) => idx,
            None => {
                self.overflow.push(None);
                (self.overflow.len() - 1) as u32
            }
        };
        self.spilled += 1;
        Handle(self.capacity + idx)
    }

    fn fill(&mut self, handle: Handle, value: T) {
        if self.is_pooled(handle) {
            self.blocks[handle.0 as usize] = Slot::Used(value);
        } else {
            self.overflow[(handle.0 - self.capacity) as usize] = Some(Box::new(value));
        }
    }

    fn unreserve(&mut self, handle: Handle) {
        if self.is_pooled(handle) {
            self.blocks[handle.0 as usize] = Slot::Free { next: self.head };
            self.head = handle.0;
            self.free += 1;
        } else {
            self.overflow_free.push(handle.0 - self.capacity);
            self.spilled -= 1;
        }
    }
}

impl<T> Default for Pool<T> {
    fn default() -> Self {
        Self::with_capacity(0)
    }
}

impl<T> Index<Handle> for Pool<T> {
    type Output = T;

    fn index(&self, handle: Handle) -> &T {
        match self.get(handle) {
            Some(value) => value,
            None => panic!("pool handle {handle:?} is not live"),
        }
    }
}

impl<T> IndexMut<Handle> for Pool<T> {
    fn index_mut(&mut self, handle: Handle) -> &mut T {
        match self.get_mut(handle) {
            Some(value) => value,
            None => panic!("pool handle {handle:?} is not live"),
        }
    }
}

impl<T> fmt::Debug for Pool<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pool")
            .field("capacity", &self.capacity)
            .field("touched", &self.blocks.len())
            .field("free", &self.free)
            .field("spilled", &self.spilled)
            .finish()
    }
}
