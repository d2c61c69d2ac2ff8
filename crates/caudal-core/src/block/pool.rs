//! Fixed-capacity block pools.
//!
//! The pool never falls back to the heap after construction: descriptors and
//! buffers live in two arrays allocated once, and free slots are tracked in
//! atomic bitmaps. Acquisition claims the lowest free bit with a CAS loop,
//! so it is safe from any thread and never blocks. An exhausted pool returns
//! `None` and bumps a counter; it does not panic and it does not wait.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use crate::block::Block;
use crate::config::{BLOCK_SAMPLES, POOL_CAPACITY};

/// Atomic bitmap free list. Bit set = slot in use.
struct FreeList {
    words: Box<[AtomicU64]>,
    capacity: usize,
}

impl FreeList {
    fn new(capacity: usize) -> Self {
        let word_count = capacity.div_ceil(64).max(1);
        let words: Vec<AtomicU64> = (0..word_count)
            .map(|w| {
                // Bits past `capacity` are permanently marked in-use so the
                // claim scan can never hand them out.
                let mut init = 0u64;
                for bit in 0..64 {
                    if w * 64 + bit >= capacity {
                        init |= 1 << bit;
                    }
                }
                AtomicU64::new(init)
            })
            .collect();
        FreeList {
            words: words.into_boxed_slice(),
            capacity,
        }
    }

    /// Claim the lowest free slot, or `None` when every slot is taken.
    fn claim(&self) -> Option<usize> {
        for (w, word) in self.words.iter().enumerate() {
            let mut current = word.load(Ordering::Acquire);
            loop {
                let free = !current;
                if free == 0 {
                    break;
                }
                let bit = free.trailing_zeros() as usize;
                match word.compare_exchange_weak(
                    current,
                    current | (1 << bit),
                    Ordering::AcqRel,
                    Ordering::Acquire,
                ) {
                    Ok(_) => return Some(w * 64 + bit),
                    Err(observed) => current = observed,
                }
            }
        }
        None
    }

    fn release(&self, index: usize) {
        let mask = 1u64 << (index % 64);
        let prev = self.words[index / 64].fetch_and(!mask, Ordering::AcqRel);
        debug_assert!(prev & mask != 0, "release of a free pool slot");
    }

    fn in_use(&self) -> usize {
        let set: usize = self
            .words
            .iter()
            .map(|w| w.load(Ordering::Acquire).count_ones() as usize)
            .sum();
        // Subtract the permanently-set padding bits.
        set - (self.words.len() * 64 - self.capacity)
    }
}

/// Block descriptor slot: refcount, buffer index and valid sample count.
pub(crate) struct Descriptor {
    pub(crate) refcount: AtomicU32,
    pub(crate) buffer: AtomicU32,
    pub(crate) data_len: AtomicU32,
}

impl Descriptor {
    fn new() -> Self {
        Descriptor {
            refcount: AtomicU32::new(0),
            buffer: AtomicU32::new(0),
            data_len: AtomicU32::new(0),
        }
    }
}

/// One PCM buffer slot.
///
/// Interior mutability is required because the unique owner of a block
/// writes samples while other pool slots are being read concurrently.
pub(crate) struct BufferCell(UnsafeCell<[i16; BLOCK_SAMPLES]>);

// SAFETY: a buffer slot is only written through `Block::samples_mut`, which
// requires the (unique) owning handle with refcount == 1; shared handles
// only read. Distinct slots never alias.
unsafe impl Sync for BufferCell {}

/// Shared pool state behind the `Arc` held by [`BlockPool`] and every
/// [`Block`] handle.
pub(crate) struct PoolShared {
    descriptors: Box<[Descriptor]>,
    buffers: Box<[BufferCell]>,
    desc_free: FreeList,
    buf_free: FreeList,
    failed_acquires: AtomicU64,
}

impl PoolShared {
    /// Claim a descriptor and a buffer, zero the buffer, refcount 1.
    ///
    /// If the buffer claim fails the descriptor goes back to its free list
    /// before the failure is reported.
    pub(crate) fn acquire(shared: &Arc<Self>) -> Option<Block> {
        let Some(slot) = shared.desc_free.claim() else {
            shared.failed_acquires.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("block pool exhausted (descriptors)");
            return None;
        };
        let Some(buf) = shared.buf_free.claim() else {
            shared.desc_free.release(slot);
            shared.failed_acquires.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("block pool exhausted (buffers)");
            return None;
        };

        // SAFETY: the buffer slot was just claimed, nothing else references it.
        unsafe { (*shared.buffers[buf].0.get()).fill(0) };

        let desc = &shared.descriptors[slot];
        desc.buffer.store(buf as u32, Ordering::Relaxed);
        desc.data_len.store(BLOCK_SAMPLES as u32, Ordering::Relaxed);
        desc.refcount.store(1, Ordering::Release);
        Some(Block::from_slot(Arc::clone(shared), slot))
    }

    pub(crate) fn retain(&self, slot: usize) {
        let old = self.descriptors[slot].refcount.fetch_add(1, Ordering::AcqRel);
        debug_assert!(old > 0, "retain of an unowned block");
    }

    /// Drop one reference; on the 1 → 0 transition return the buffer, then
    /// the descriptor, to their free lists.
    pub(crate) fn release(&self, slot: usize) {
        let old = self.descriptors[slot].refcount.fetch_sub(1, Ordering::AcqRel);
        debug_assert!(old > 0, "release of an unowned block");
        if old == 1 {
            let buf = self.descriptors[slot].buffer.load(Ordering::Relaxed) as usize;
            self.buf_free.release(buf);
            self.desc_free.release(slot);
        }
    }

    pub(crate) fn descriptor(&self, slot: usize) -> &Descriptor {
        &self.descriptors[slot]
    }

    pub(crate) fn buffer_ptr(&self, slot: usize) -> *mut [i16; BLOCK_SAMPLES] {
        let buf = self.descriptors[slot].buffer.load(Ordering::Relaxed) as usize;
        self.buffers[buf].0.get()
    }
}

/// Usage counters for a pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    /// Configured slot count of each free list.
    pub capacity: usize,
    /// Descriptors currently handed out.
    pub descriptors_in_use: usize,
    /// Buffers currently handed out.
    pub buffers_in_use: usize,
    /// Acquisitions that failed because a free list was empty.
    pub failed_acquires: u64,
}

/// A fixed-capacity pool of PCM blocks.
///
/// Cloning a `BlockPool` is cheap and yields another handle to the same
/// pool; generator nodes and mixers keep a clone for their own allocations.
#[derive(Clone)]
pub struct BlockPool {
    shared: Arc<PoolShared>,
}

impl BlockPool {
    /// Create a pool with the default [`POOL_CAPACITY`].
    pub fn new() -> Self {
        Self::with_capacity(POOL_CAPACITY)
    }

    /// Create a pool with an explicit slot count.
    pub fn with_capacity(capacity: usize) -> Self {
        let descriptors: Vec<Descriptor> = (0..capacity).map(|_| Descriptor::new()).collect();
        let buffers: Vec<BufferCell> = (0..capacity)
            .map(|_| BufferCell(UnsafeCell::new([0; BLOCK_SAMPLES])))
            .collect();
        BlockPool {
            shared: Arc::new(PoolShared {
                descriptors: descriptors.into_boxed_slice(),
                buffers: buffers.into_boxed_slice(),
                desc_free: FreeList::new(capacity),
                buf_free: FreeList::new(capacity),
                failed_acquires: AtomicU64::new(0),
            }),
        }
    }

    /// Obtain a zeroed block with refcount 1, or `None` when the pool is
    /// exhausted. Never blocks.
    pub fn acquire(&self) -> Option<Block> {
        PoolShared::acquire(&self.shared)
    }

    /// Number of blocks currently handed out.
    pub fn in_use(&self) -> usize {
        self.shared.desc_free.in_use()
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.shared.desc_free.capacity,
            descriptors_in_use: self.shared.desc_free.in_use(),
            buffers_in_use: self.shared.buf_free.in_use(),
            failed_acquires: self.shared.failed_acquires.load(Ordering::Relaxed),
        }
    }
}

impl Default for BlockPool {
    fn default() -> Self {
        Self::new()
    }
}
