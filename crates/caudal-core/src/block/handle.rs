//! Owning block handles.

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use crate::block::PoolShared;
use crate::config::BLOCK_SAMPLES;
use crate::error::AudioError;

/// An owning, reference-counted handle to a pooled PCM block.
///
/// - `clone` retains (atomic increment); dropping releases. When the last
///   handle goes, buffer and descriptor return to their pools.
/// - While more than one handle exists the samples are read-only:
///   [`samples_mut`](Block::samples_mut) returns `None` and
///   [`make_writable`](Block::make_writable) must be called first.
///
/// Handles transfer ownership when pushed onto a queue and are `Send`, so
/// they can hop freely between workers.
pub struct Block {
    shared: Arc<PoolShared>,
    slot: usize,
}

impl Block {
    pub(crate) fn from_slot(shared: Arc<PoolShared>, slot: usize) -> Self {
        Block { shared, slot }
    }

    /// Number of valid samples. Starts at [`BLOCK_SAMPLES`], may only shrink.
    pub fn len(&self) -> usize {
        self.shared.descriptor(self.slot).data_len.load(Ordering::Relaxed) as usize
    }

    /// True when the block holds no valid samples.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Fixed sample capacity of every block.
    pub fn capacity() -> usize {
        BLOCK_SAMPLES
    }

    /// Current reference count. At least 1 while any handle exists.
    pub fn refcount(&self) -> u32 {
        self.shared
            .descriptor(self.slot)
            .refcount
            .load(Ordering::Acquire)
    }

    /// The valid samples, read-only.
    pub fn samples(&self) -> &[i16] {
        let len = self.len();
        // SAFETY: the refcount keeps the slot allocated for the lifetime of
        // this handle, and writers are excluded unless refcount == 1 (in
        // which case `self` is the writer and holds no `&mut` here).
        unsafe { &(&*self.shared.buffer_ptr(self.slot))[..len] }
    }

    /// Mutable access to the valid samples, or `None` while the block is
    /// shared. Callers that must write a shared block go through
    /// [`make_writable`](Block::make_writable) first.
    pub fn samples_mut(&mut self) -> Option<&mut [i16]> {
        if self.refcount() != 1 {
            return None;
        }
        let len = self.len();
        // SAFETY: refcount == 1 means this is the only handle, and `&mut
        // self` excludes any other borrow of it.
        Some(unsafe { &mut (&mut *self.shared.buffer_ptr(self.slot))[..len] })
    }

    /// Shrink the valid sample count. Growing is not possible; a `len`
    /// at or above the current count leaves the block unchanged.
    pub fn truncate(&mut self, len: usize) {
        if len < self.len() {
            debug_assert_eq!(self.refcount(), 1, "truncate of a shared block");
            self.shared
                .descriptor(self.slot)
                .data_len
                .store(len as u32, Ordering::Relaxed);
        }
    }

    /// Ensure this handle is the unique owner, copying if necessary.
    ///
    /// With refcount 1 this is free. Otherwise a fresh block is acquired,
    /// the samples are copied, the old reference is released and the handle
    /// now points at the private copy. On pool exhaustion the handle is left
    /// untouched and `OutOfMemory` is returned; the caller's contract is to
    /// drop the block and emit nothing that cycle.
    pub fn make_writable(&mut self) -> Result<(), AudioError> {
        if self.refcount() == 1 {
            return Ok(());
        }
        let mut fresh = PoolShared::acquire(&self.shared).ok_or(AudioError::OutOfMemory)?;
        let len = self.len();
        if let Some(dst) = fresh.samples_mut() {
            dst[..len].copy_from_slice(self.samples());
        }
        fresh.truncate(len);
        *self = fresh;
        Ok(())
    }
}

impl Clone for Block {
    fn clone(&self) -> Self {
        self.shared.retain(self.slot);
        Block {
            shared: Arc::clone(&self.shared),
            slot: self.slot,
        }
    }
}

impl Drop for Block {
    fn drop(&mut self) {
        self.shared.release(self.slot);
    }
}

impl fmt::Debug for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Block")
            .field("len", &self.len())
            .field("refcount", &self.refcount())
            .finish()
    }
}
