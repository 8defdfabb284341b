//! Kernel arena and the deferred call graph that fills it.
//!
//! Resolution never touches memory: it queues [`KernelMaker`] closures in a
//! [`CallGraph`]. Materialization then runs those makers once, in order,
//! against a [`KernelBuilder`]. Each maker emplaces its record and, for
//! composites, pulls its children's makers off the same graph with
//! [`KernelBuilder::instantiate_next`] so the children land directly after
//! their parent.
//!
//! The arena may be reallocated by any emplace. Makers therefore hold on to
//! offsets only, and re-fetch a parent with [`KernelBuilder::get_at`] after
//! building its children.

use std::alloc::{self, Layout};
use std::any::TypeId;
use std::collections::VecDeque;
use std::fmt;
use std::ptr::NonNull;

use tracing::trace;
use weft_types::Arrmeta;

use crate::chain::KernelChain;
use crate::error::BuildError;
use crate::record::{Kernel, KernelPrefix, Record, drop_record};

/// Alignment of the arena and of every record in it.
pub const ARENA_ALIGN: usize = 16;

/// Execution entry points the finished chain must support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KernelRequest {
    /// Only `single` is called.
    Single,
    /// Both `single` and `strided` are called.
    Strided,
}

/// Deferred construction of one kernel record (and, for composites, the
/// records of its children). Returns the record's absolute arena offset.
pub type KernelMaker = Box<
    dyn FnOnce(&mut KernelBuilder, KernelRequest, &Arrmeta, &[&Arrmeta]) -> Result<usize, BuildError>
        + Send,
>;

/// Ordered kernel makers produced by resolution.
#[derive(Default)]
pub struct CallGraph {
    makers: VecDeque<KernelMaker>,
}

impl CallGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a maker; makers are consumed in push order.
    pub fn push<F>(&mut self, maker: F)
    where
        F: FnOnce(&mut KernelBuilder, KernelRequest, &Arrmeta, &[&Arrmeta]) -> Result<usize, BuildError>
            + Send
            + 'static,
    {
        self.makers.push_back(Box::new(maker));
    }

    pub fn len(&self) -> usize {
        self.makers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.makers.is_empty()
    }

    fn pop(&mut self) -> Option<KernelMaker> {
        self.makers.pop_front()
    }
}

impl fmt::Debug for CallGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallGraph")
            .field("makers", &self.makers.len())
            .finish()
    }
}

struct RecordEntry {
    offset: usize,
    type_id: TypeId,
    drop: unsafe fn(NonNull<u8>),
}

/// Growable, relocatable arena that kernel records are emplaced into.
pub struct KernelBuilder {
    data: Option<NonNull<u8>>,
    capacity: usize,
    size: usize,
    initial_capacity: usize,
    records: Vec<RecordEntry>,
    graph: CallGraph,
    /// First emplace that could not be placed; surfaced by the next
    /// `instantiate_next` or `finish`.
    failure: Option<BuildError>,
}

impl KernelBuilder {
    /// Creates an empty arena that will consume `graph`.
    ///
    /// Nothing is allocated until the first emplace, which allocates at
    /// least `initial_capacity` bytes.
    pub fn new(graph: CallGraph, initial_capacity: usize) -> Self {
        Self {
            data: None,
            capacity: 0,
            size: 0,
            initial_capacity,
            records: Vec::new(),
            graph,
            failure: None,
        }
    }

    /// Bytes in use.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Bytes allocated.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Makers not yet consumed.
    pub fn pending(&self) -> usize {
        self.graph.len()
    }

    /// Ensures `total_bytes` fit without another relocation.
    pub fn reserve(&mut self, total_bytes: usize) -> Result<(), BuildError> {
        if total_bytes <= self.capacity {
            return Ok(());
        }
        let overflow = BuildError::CapacityOverflow {
            requested: total_bytes,
        };
        let new_capacity = total_bytes
            .max(self.capacity.saturating_mul(2))
            .max(self.initial_capacity)
            .checked_next_multiple_of(ARENA_ALIGN)
            .ok_or_else(|| overflow.clone())?;
        let new_layout = Layout::from_size_align(new_capacity, ARENA_ALIGN).map_err(|_| overflow)?;

        let ptr = match self.data {
            // SAFETY: the old block was allocated with the same alignment and
            // `self.capacity` bytes.
            Some(old) => unsafe {
                let old_layout = Layout::from_size_align_unchecked(self.capacity, ARENA_ALIGN);
                alloc::realloc(old.as_ptr(), old_layout, new_capacity)
            },
            // SAFETY: new_capacity is non-zero.
            None => unsafe { alloc::alloc(new_layout) },
        };
        let Some(ptr) = NonNull::new(ptr) else {
            alloc::handle_alloc_error(new_layout);
        };
        trace!(
            from = self.capacity,
            to = new_capacity,
            moved = self.data != Some(ptr),
            "kernel arena grown"
        );
        self.data = Some(ptr);
        self.capacity = new_capacity;
        Ok(())
    }

    fn reserve_record(&mut self, offset: usize, record_size: usize) -> Result<NonNull<u8>, BuildError> {
        let end = offset
            .checked_add(record_size)
            .ok_or(BuildError::CapacityOverflow {
                requested: usize::MAX,
            })?;
        self.reserve(end)?;
        self.data
            .ok_or(BuildError::CapacityOverflow { requested: end })
    }

    /// Constructs a record holding `kernel` at the write cursor and returns
    /// its offset from the arena base.
    ///
    /// When the arena cannot grow, `kernel` is dropped and the failure is
    /// reported by the enclosing [`instantiate_next`](Self::instantiate_next)
    /// or by [`finish`](Self::finish).
    pub fn emplace<K: Kernel>(&mut self, kernel: K) -> usize {
        const { assert!(align_of::<Record<K>>() <= ARENA_ALIGN) };
        let offset = self.size;
        let record_size = size_of::<Record<K>>().next_multiple_of(ARENA_ALIGN);
        let base = match self.reserve_record(offset, record_size) {
            Ok(base) => base,
            Err(err) => {
                trace!(offset, size = record_size, %err, "kernel record not placed");
                self.failure.get_or_insert(err);
                return offset;
            }
        };
        let record = Record {
            prefix: KernelPrefix::of::<K>(),
            kernel,
        };
        // SAFETY: reserve guaranteed `record_size` free bytes at `offset`,
        // and `offset` is a multiple of ARENA_ALIGN.
        unsafe {
            base.as_ptr()
                .add(offset)
                .cast::<Record<K>>()
                .write(record);
        }
        self.size = offset + record_size;
        self.records.push(RecordEntry {
            offset,
            type_id: TypeId::of::<K>(),
            drop: drop_record::<K>,
        });
        trace!(
            offset,
            size = record_size,
            kernel = std::any::type_name::<K>(),
            "emplaced kernel record"
        );
        offset
    }

    /// The kernel of type `K` at `offset`.
    ///
    /// The reference is invalidated by the next emplace.
    pub fn get_at<K: Kernel>(&mut self, offset: usize) -> Result<&mut K, BuildError> {
        let mismatch = || BuildError::RecordMismatch {
            offset,
            expected: std::any::type_name::<K>(),
        };
        let index = self
            .records
            .binary_search_by_key(&offset, |entry| entry.offset)
            .map_err(|_| mismatch())?;
        if self.records[index].type_id != TypeId::of::<K>() {
            return Err(mismatch());
        }
        let base = self.data.ok_or_else(mismatch)?;
        // SAFETY: the side table says a live `Record<K>` starts at `offset`.
        Ok(unsafe { &mut (*base.as_ptr().add(offset).cast::<Record<K>>()).kernel })
    }

    /// Runs the next maker in the call graph and returns the offset of the
    /// record it built.
    pub fn instantiate_next(
        &mut self,
        request: KernelRequest,
        dst_arrmeta: &Arrmeta,
        src_arrmeta: &[&Arrmeta],
    ) -> Result<usize, BuildError> {
        let maker = self.graph.pop().ok_or(BuildError::GraphExhausted)?;
        let offset = maker(self, request, dst_arrmeta, src_arrmeta);
        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        offset
    }

    /// Hands the arena over to a [`KernelChain`] rooted at offset zero.
    pub fn finish(mut self, request: KernelRequest) -> Result<KernelChain, BuildError> {
        if let Some(err) = self.failure.take() {
            return Err(err);
        }
        if !self.graph.is_empty() {
            return Err(BuildError::UnconsumedMakers(self.graph.len()));
        }
        let data = match self.data {
            Some(data) if !self.records.is_empty() => data,
            _ => return Err(BuildError::EmptyArena),
        };
        let records = std::mem::take(&mut self.records).len();
        self.data = None;
        let capacity = std::mem::take(&mut self.capacity);
        // SAFETY: ownership of the block and of every record in it moves to
        // the chain; the builder no longer frees or drops anything.
        Ok(unsafe { KernelChain::from_raw(data, capacity, self.size, records, request) })
    }
}

impl Drop for KernelBuilder {
    fn drop(&mut self) {
        let Some(base) = self.data else {
            return;
        };
        // An unfinished build may hold composites whose child offsets were
        // never patched, so each record is dropped on its own.
        for entry in self.records.drain(..) {
            // SAFETY: the entry describes a live record of that type.
            unsafe { (entry.drop)(base.add(entry.offset)) };
        }
        // SAFETY: allocated in `reserve` with this exact layout.
        unsafe {
            alloc::dealloc(
                base.as_ptr(),
                Layout::from_size_align_unchecked(self.capacity, ARENA_ALIGN),
            );
        }
    }
}

impl fmt::Debug for KernelBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelBuilder")
            .field("size", &self.size)
            .field("capacity", &self.capacity)
            .field("records", &self.records.len())
            .field("pending", &self.graph.len())
            .finish()
    }
}
