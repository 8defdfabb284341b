//! Finished, executable kernel chains.

use std::alloc::{self, Layout};
use std::fmt;
use std::ptr::NonNull;

use crate::builder::{ARENA_ALIGN, KernelRequest};
use crate::error::KernelError;
use crate::record::{KernelPrefix, KernelRef};

/// An arena of kernel records rooted at offset zero.
///
/// The chain is read-only once built, so the same chain can run on several
/// threads at once as long as their destinations do not overlap.
pub struct KernelChain {
    data: NonNull<u8>,
    capacity: usize,
    size: usize,
    records: usize,
    request: KernelRequest,
}

// SAFETY: every record holds a `Kernel`, which is Send + Sync, and records
// are never mutated after construction. The chain owns its block exclusively.
unsafe impl Send for KernelChain {}
// SAFETY: see above; execution only reads records.
unsafe impl Sync for KernelChain {}

impl KernelChain {
    /// # Safety
    ///
    /// `data` must be a block of `capacity` bytes allocated with
    /// [`ARENA_ALIGN`] alignment whose offset zero holds a fully built root
    /// record, and the caller must give up ownership of the block and of
    /// every record in it.
    pub(crate) unsafe fn from_raw(
        data: NonNull<u8>,
        capacity: usize,
        size: usize,
        records: usize,
        request: KernelRequest,
    ) -> Self {
        Self {
            data,
            capacity,
            size,
            records,
            request,
        }
    }

    pub fn request(&self) -> KernelRequest {
        self.request
    }

    /// Bytes used by the records.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of kernel records in the chain.
    pub fn record_count(&self) -> usize {
        self.records
    }

    pub fn root(&self) -> KernelRef<'_> {
        // SAFETY: the root record lives as long as the chain.
        unsafe { KernelRef::from_ptr(self.data.cast::<KernelPrefix>()) }
    }

    /// Executes the chain once.
    ///
    /// # Safety
    ///
    /// `dst` and each `src` pointer must address valid elements laid out as
    /// the types and metadata the chain was resolved and built for.
    pub unsafe fn single(&self, dst: *mut u8, src: &[*const u8]) -> Result<(), KernelError> {
        unsafe { self.root().single(dst, src) }
    }

    /// Executes the chain `count` times with the given byte strides.
    ///
    /// # Safety
    ///
    /// As [`KernelChain::single`], for every element position.
    pub unsafe fn strided(
        &self,
        dst: *mut u8,
        dst_stride: isize,
        src: &[*const u8],
        src_stride: &[isize],
        count: usize,
    ) -> Result<(), KernelError> {
        if self.request == KernelRequest::Single {
            return Err(KernelError::UnsupportedRequest);
        }
        if src_stride.len() != src.len() {
            return Err(KernelError::StrideMismatch {
                sources: src.len(),
                strides: src_stride.len(),
            });
        }
        unsafe { self.root().strided(dst, dst_stride, src, src_stride, count) }
    }
}

impl Drop for KernelChain {
    fn drop(&mut self) {
        // SAFETY: the root destructor tears down every record through the
        // stored child offsets; the block is released afterwards.
        unsafe {
            self.root().destroy();
            alloc::dealloc(
                self.data.as_ptr(),
                Layout::from_size_align_unchecked(self.capacity, ARENA_ALIGN),
            );
        }
    }
}

impl fmt::Debug for KernelChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelChain")
            .field("request", &self.request)
            .field("records", &self.records)
            .field("size", &self.size)
            .finish()
    }
}
