//! Kernel records and their execution entry points.
//!
//! # Layout
//!
//! Every record in an arena starts with a [`KernelPrefix`]: two entry points
//! (`single` and `strided`) and a destructor, all plain function pointers
//! monomorphized for the record's kernel type. The kernel value follows the
//! prefix in the same `#[repr(C)]` record.
//!
//! Composite kernels refer to their children by byte offset from their own
//! record start. A [`KernelRef`] is the transient address of one record; it
//! is handed to every entry point so a composite can reach its children
//! without storing pointers.

use std::marker::PhantomData;
use std::ptr::NonNull;

use crate::error::KernelError;

/// Most source operands any kernel takes.
pub const MAX_ARITY: usize = 8;

pub type SingleFn =
    unsafe fn(KernelRef<'_>, *mut u8, &[*const u8]) -> Result<(), KernelError>;
pub type StridedFn = unsafe fn(
    KernelRef<'_>,
    *mut u8,
    isize,
    &[*const u8],
    &[isize],
    usize,
) -> Result<(), KernelError>;
pub type DestroyFn = unsafe fn(NonNull<KernelPrefix>);

/// Fixed header of every kernel record.
#[repr(C)]
pub struct KernelPrefix {
    single: SingleFn,
    strided: StridedFn,
    destroy: DestroyFn,
}

impl KernelPrefix {
    pub(crate) fn of<K: Kernel>() -> Self {
        Self {
            single: single_entry::<K>,
            strided: strided_entry::<K>,
            destroy: destroy_entry::<K>,
        }
    }
}

#[repr(C)]
pub(crate) struct Record<K> {
    pub(crate) prefix: KernelPrefix,
    pub(crate) kernel: K,
}

/// A kernel that can live in an arena.
///
/// Implementations read their own fields through `&self` and reach their
/// children through `node`; records are never mutated after construction.
pub trait Kernel: Send + Sync + Sized + 'static {
    /// Executes the operation once.
    ///
    /// # Safety
    ///
    /// `dst` and every pointer in `src` must address valid, initialized
    /// elements of the types this kernel was built for, and `node` must be
    /// the record holding `self`.
    unsafe fn single(
        &self,
        node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError>;

    /// Executes the operation `count` times, advancing every pointer by its
    /// stride after each element.
    ///
    /// # Safety
    ///
    /// Same as [`Kernel::single`] for each of the `count` element positions;
    /// `src_stride` must have the same length as `src`.
    unsafe fn strided(
        &self,
        node: KernelRef<'_>,
        dst: *mut u8,
        dst_stride: isize,
        src: &[*const u8],
        src_stride: &[isize],
        count: usize,
    ) -> Result<(), KernelError> {
        unsafe { strided_by_single(self, node, dst, dst_stride, src, src_stride, count) }
    }

    /// Reports the offset of every child record, relative to this record.
    fn for_each_child(&self, _visit: &mut dyn FnMut(usize)) {}
}

/// Strided execution as a loop over `single`.
///
/// # Safety
///
/// See [`Kernel::strided`].
pub unsafe fn strided_by_single<K: Kernel>(
    kernel: &K,
    node: KernelRef<'_>,
    dst: *mut u8,
    dst_stride: isize,
    src: &[*const u8],
    src_stride: &[isize],
    count: usize,
) -> Result<(), KernelError> {
    let arity = src.len();
    if arity > MAX_ARITY {
        return Err(KernelError::TooManyArguments(arity));
    }
    if src_stride.len() != arity {
        return Err(KernelError::StrideMismatch {
            sources: arity,
            strides: src_stride.len(),
        });
    }
    let mut cursor = [std::ptr::null::<u8>(); MAX_ARITY];
    cursor[..arity].copy_from_slice(src);
    let mut dst = dst;
    for _ in 0..count {
        unsafe { kernel.single(node, dst, &cursor[..arity])? };
        dst = dst.wrapping_offset(dst_stride);
        for (ptr, stride) in cursor[..arity].iter_mut().zip(src_stride) {
            *ptr = ptr.wrapping_offset(*stride);
        }
    }
    Ok(())
}

/// Address of one record inside a finished or in-progress arena.
#[derive(Clone, Copy)]
pub struct KernelRef<'a> {
    ptr: NonNull<KernelPrefix>,
    _arena: PhantomData<&'a KernelPrefix>,
}

impl<'a> KernelRef<'a> {
    /// # Safety
    ///
    /// `ptr` must point at a live record that outlives `'a`.
    pub(crate) unsafe fn from_ptr(ptr: NonNull<KernelPrefix>) -> Self {
        Self {
            ptr,
            _arena: PhantomData,
        }
    }

    /// The child record `offset` bytes after this one.
    ///
    /// # Safety
    ///
    /// `offset` must be a child offset this record's kernel reported.
    pub unsafe fn child(self, offset: usize) -> KernelRef<'a> {
        let ptr = unsafe { self.ptr.cast::<u8>().add(offset).cast::<KernelPrefix>() };
        Self {
            ptr,
            _arena: PhantomData,
        }
    }

    fn prefix(self) -> &'a KernelPrefix {
        // SAFETY: a KernelRef only exists for live records.
        unsafe { self.ptr.as_ref() }
    }

    /// # Safety
    ///
    /// The record must hold a `K`.
    pub(crate) unsafe fn kernel<K>(self) -> &'a K {
        unsafe { &(*self.ptr.cast::<Record<K>>().as_ptr()).kernel }
    }

    /// Runs this record's single entry point.
    ///
    /// # Safety
    ///
    /// See [`Kernel::single`].
    #[inline]
    pub unsafe fn single(self, dst: *mut u8, src: &[*const u8]) -> Result<(), KernelError> {
        unsafe { (self.prefix().single)(self, dst, src) }
    }

    /// Runs this record's strided entry point.
    ///
    /// # Safety
    ///
    /// See [`Kernel::strided`].
    #[inline]
    pub unsafe fn strided(
        self,
        dst: *mut u8,
        dst_stride: isize,
        src: &[*const u8],
        src_stride: &[isize],
        count: usize,
    ) -> Result<(), KernelError> {
        unsafe { (self.prefix().strided)(self, dst, dst_stride, src, src_stride, count) }
    }

    /// Runs this record's destructor, which destroys its children first.
    ///
    /// # Safety
    ///
    /// Must be called at most once per record, and the record must not be
    /// used afterwards.
    pub(crate) unsafe fn destroy(self) {
        unsafe { (self.prefix().destroy)(self.ptr) }
    }
}

unsafe fn single_entry<K: Kernel>(
    node: KernelRef<'_>,
    dst: *mut u8,
    src: &[*const u8],
) -> Result<(), KernelError> {
    unsafe { node.kernel::<K>().single(node, dst, src) }
}

unsafe fn strided_entry<K: Kernel>(
    node: KernelRef<'_>,
    dst: *mut u8,
    dst_stride: isize,
    src: &[*const u8],
    src_stride: &[isize],
    count: usize,
) -> Result<(), KernelError> {
    unsafe {
        node.kernel::<K>()
            .strided(node, dst, dst_stride, src, src_stride, count)
    }
}

unsafe fn destroy_entry<K: Kernel>(ptr: NonNull<KernelPrefix>) {
    let node = unsafe { KernelRef::from_ptr(ptr) };
    let kernel = unsafe { node.kernel::<K>() };
    kernel.for_each_child(&mut |offset| unsafe { node.child(offset).destroy() });
    unsafe { std::ptr::drop_in_place(ptr.cast::<Record<K>>().as_ptr()) };
}

/// Drops one record without touching its children.
pub(crate) unsafe fn drop_record<K: Kernel>(ptr: NonNull<u8>) {
    unsafe { std::ptr::drop_in_place(ptr.cast::<Record<K>>().as_ptr()) };
}
