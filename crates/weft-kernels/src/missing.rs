//! Missing-value sentinels and the kernels that test and write them.
//!
//! An option type stores its missing marker inside the payload's own bytes.
//! Scalars and categoricals use one reserved bit pattern; a variable-length
//! string uses a slot without an allocation.

use weft_types::{StringData, Type, TypeKind, category_storage_size};

use crate::error::KernelError;
use crate::record::{Kernel, KernelRef};

/// Float sentinels. Comparisons are by exact bits, so an ordinary NaN is a
/// value, not a missing marker.
pub const F16_NA: u16 = 0x7c01;
pub const F32_NA: u32 = 0x7f80_07a2;
pub const F64_NA: u64 = 0x7ff0_0000_0000_07a2;

/// Bool storage byte marking a missing bool.
pub const BOOL_NA: u8 = 2;

const MAX_PATTERN: usize = 16;

/// How a payload type represents its missing value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// A fixed bit pattern of `len` bytes.
    Pattern { bytes: [u8; MAX_PATTERN], len: usize },
    /// An empty [`StringData`] slot.
    VarString,
}

impl Missing {
    fn pattern(raw: &[u8]) -> Self {
        let mut bytes = [0u8; MAX_PATTERN];
        bytes[..raw.len()].copy_from_slice(raw);
        Missing::Pattern {
            bytes,
            len: raw.len(),
        }
    }

    /// The representation for `tp`, or `None` when the type has no missing
    /// value (fixed strings, composites, pointers, nested options).
    pub fn of(tp: &Type) -> Option<Self> {
        let f32_pair = || {
            let half = F32_NA.to_ne_bytes();
            let mut both = [0u8; 8];
            both[..4].copy_from_slice(&half);
            both[4..].copy_from_slice(&half);
            Missing::pattern(&both)
        };
        Some(match tp.kind() {
            TypeKind::Bool => Missing::pattern(&[BOOL_NA]),
            TypeKind::Int8 => Missing::pattern(&i8::MIN.to_ne_bytes()),
            TypeKind::Int16 => Missing::pattern(&i16::MIN.to_ne_bytes()),
            TypeKind::Int32 => Missing::pattern(&i32::MIN.to_ne_bytes()),
            TypeKind::Int64 => Missing::pattern(&i64::MIN.to_ne_bytes()),
            TypeKind::UInt8 => Missing::pattern(&u8::MAX.to_ne_bytes()),
            TypeKind::UInt16 => Missing::pattern(&u16::MAX.to_ne_bytes()),
            TypeKind::UInt32 => Missing::pattern(&u32::MAX.to_ne_bytes()),
            TypeKind::UInt64 => Missing::pattern(&u64::MAX.to_ne_bytes()),
            TypeKind::Float16 => Missing::pattern(&F16_NA.to_ne_bytes()),
            TypeKind::Float32 => Missing::pattern(&F32_NA.to_ne_bytes()),
            TypeKind::Float64 => Missing::pattern(&F64_NA.to_ne_bytes()),
            TypeKind::Complex64 => f32_pair(),
            TypeKind::Complex128 => {
                let half = F64_NA.to_ne_bytes();
                let mut both = [0u8; 16];
                both[..8].copy_from_slice(&half);
                both[8..].copy_from_slice(&half);
                Missing::pattern(&both)
            }
            TypeKind::Categorical { categories } => {
                Missing::pattern(&[0xff; 4][..category_storage_size(categories.len())])
            }
            TypeKind::String { .. } => Missing::VarString,
            _ => return None,
        })
    }

    /// # Safety
    ///
    /// `ptr` must address one valid payload element.
    #[inline]
    pub unsafe fn is_missing(&self, ptr: *const u8) -> bool {
        match self {
            Missing::Pattern { bytes, len } => {
                let value = unsafe { std::slice::from_raw_parts(ptr, *len) };
                value == &bytes[..*len]
            }
            Missing::VarString => unsafe { (*ptr.cast::<StringData>()).is_missing() },
        }
    }

    /// # Safety
    ///
    /// `ptr` must address one writable payload element; a string slot must
    /// already be initialized.
    #[inline]
    pub unsafe fn write(&self, ptr: *mut u8) {
        match self {
            Missing::Pattern { bytes, len } => unsafe {
                std::ptr::copy_nonoverlapping(bytes.as_ptr(), ptr, *len)
            },
            Missing::VarString => unsafe { *ptr.cast::<StringData>() = StringData::missing() },
        }
    }
}

/// Writes a `bool` that is true where the source element is missing.
pub struct IsMissing {
    missing: Missing,
}

impl IsMissing {
    pub fn new(missing: Missing) -> Self {
        Self { missing }
    }
}

impl Kernel for IsMissing {
    #[inline]
    unsafe fn single(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        unsafe { dst.write(self.missing.is_missing(src[0]) as u8) };
        Ok(())
    }
}

/// Writes the missing marker; takes no sources.
pub struct AssignMissing {
    missing: Missing,
}

impl AssignMissing {
    pub fn new(missing: Missing) -> Self {
        Self { missing }
    }
}

impl Kernel for AssignMissing {
    #[inline]
    unsafe fn single(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        _src: &[*const u8],
    ) -> Result<(), KernelError> {
        unsafe { self.missing.write(dst) };
        Ok(())
    }

    unsafe fn strided(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        dst_stride: isize,
        _src: &[*const u8],
        _src_stride: &[isize],
        count: usize,
    ) -> Result<(), KernelError> {
        let mut dst = dst;
        for _ in 0..count {
            unsafe { self.missing.write(dst) };
            dst = dst.wrapping_offset(dst_stride);
        }
        Ok(())
    }
}
