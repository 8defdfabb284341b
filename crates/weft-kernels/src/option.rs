//! Option composites.
//!
//! [`OptionAssign`] runs three children: an is-missing test on the source, a
//! value assignment and a missing-value writer for the destination. Strided
//! calls test a chunk at a time and hand whole runs of present or missing
//! elements to a single child call.

use weft_types::{Arrmeta, StringData, StringEncoding};

use crate::builder::{KernelBuilder, KernelRequest};
use crate::codec::Codec;
use crate::error::{BuildError, KernelError};
use crate::record::{Kernel, KernelRef};
use crate::string::StringSlot;

/// Largest number of elements tested per chunk.
pub const MAX_CHUNK_SIZE: usize = 1024;

/// Chunk size used when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 128;

/// Tokens a string source may hold to mean "missing", compared
/// case-insensitively after trimming.
pub const NA_TOKENS: [&str; 5] = ["", "na", "n/a", "null", "none"];

pub fn is_na_token(text: &str) -> bool {
    let trimmed = text.trim();
    NA_TOKENS.iter().any(|token| trimmed.eq_ignore_ascii_case(token))
}

pub(crate) fn single_source<'a>(src: &[&'a Arrmeta]) -> Result<&'a Arrmeta, BuildError> {
    match src {
        [one] => Ok(one),
        _ => Err(BuildError::ArrmetaMismatch(format!(
            "expected one source, got {}",
            src.len()
        ))),
    }
}

/// Assignment from an option source into an option destination.
pub struct OptionAssign {
    is_missing: usize,
    value: usize,
    assign_missing: usize,
    chunk_size: usize,
}

impl OptionAssign {
    /// Emplaces the composite, then its three children from the call graph
    /// in order: is-missing test, value assignment, missing writer.
    pub fn build(
        kb: &mut KernelBuilder,
        request: KernelRequest,
        chunk_size: usize,
        dst: &Arrmeta,
        src: &[&Arrmeta],
    ) -> Result<usize, BuildError> {
        let src = single_source(src)?;
        let me = kb.emplace(OptionAssign {
            is_missing: 0,
            value: 0,
            assign_missing: 0,
            chunk_size: chunk_size.clamp(1, MAX_CHUNK_SIZE),
        });
        let is_missing = kb.instantiate_next(request, &Arrmeta::Empty, &[src])?;
        let value = kb.instantiate_next(request, dst.option_value(), &[src.option_value()])?;
        let assign_missing = kb.instantiate_next(request, dst, &[])?;
        let this = kb.get_at::<OptionAssign>(me)?;
        this.is_missing = is_missing - me;
        this.value = value - me;
        this.assign_missing = assign_missing - me;
        Ok(me)
    }
}

impl Kernel for OptionAssign {
    unsafe fn single(
        &self,
        node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        let mut missing = 0u8;
        unsafe {
            node.child(self.is_missing).single(&mut missing, src)?;
            if missing != 0 {
                node.child(self.assign_missing).single(dst, &[])
            } else {
                node.child(self.value).single(dst, src)
            }
        }
    }

    unsafe fn strided(
        &self,
        node: KernelRef<'_>,
        dst: *mut u8,
        dst_stride: isize,
        src: &[*const u8],
        src_stride: &[isize],
        count: usize,
    ) -> Result<(), KernelError> {
        let is_missing = unsafe { node.child(self.is_missing) };
        let value = unsafe { node.child(self.value) };
        let assign_missing = unsafe { node.child(self.assign_missing) };
        let mut flags = [0u8; MAX_CHUNK_SIZE];
        let (mut dst, mut src_ptr) = (dst, src[0]);
        let mut remaining = count;
        while remaining > 0 {
            let chunk = remaining.min(self.chunk_size);
            unsafe { is_missing.strided(flags.as_mut_ptr(), 1, &[src_ptr], src_stride, chunk)? };
            let mut start = 0;
            while start < chunk {
                let flag = flags[start];
                let run = flags[start..chunk]
                    .iter()
                    .position(|&f| f != flag)
                    .unwrap_or(chunk - start);
                unsafe {
                    if flag != 0 {
                        assign_missing.strided(dst, dst_stride, &[], &[], run)?;
                    } else {
                        value.strided(dst, dst_stride, &[src_ptr], src_stride, run)?;
                    }
                }
                dst = dst.wrapping_offset(dst_stride * run as isize);
                src_ptr = src_ptr.wrapping_offset(src_stride[0] * run as isize);
                start += run;
            }
            remaining -= chunk;
        }
        Ok(())
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(usize)) {
        visit(self.is_missing);
        visit(self.value);
        visit(self.assign_missing);
    }
}

/// Assignment from a string source into an option destination: NA tokens
/// and missing string slots become missing, anything else is parsed by the
/// value child.
pub struct StringToOption {
    value: usize,
    assign_missing: usize,
    src_slot: StringSlot,
    src_codec: Codec,
}

impl StringToOption {
    /// Emplaces the composite, then the value assignment and the missing
    /// writer from the call graph.
    pub fn build(
        kb: &mut KernelBuilder,
        request: KernelRequest,
        src_string: (StringSlot, StringEncoding),
        dst: &Arrmeta,
        src: &[&Arrmeta],
    ) -> Result<usize, BuildError> {
        let src = single_source(src)?;
        let me = kb.emplace(StringToOption {
            value: 0,
            assign_missing: 0,
            src_slot: src_string.0,
            src_codec: Codec::new(src_string.1, false),
        });
        let value = kb.instantiate_next(request, dst.option_value(), &[src])?;
        let assign_missing = kb.instantiate_next(request, dst, &[])?;
        let this = kb.get_at::<StringToOption>(me)?;
        this.value = value - me;
        this.assign_missing = assign_missing - me;
        Ok(me)
    }
}

impl Kernel for StringToOption {
    unsafe fn single(
        &self,
        node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        let missing = match self.src_slot {
            StringSlot::Var if unsafe { (*src[0].cast::<StringData>()).is_missing() } => true,
            slot => {
                let bytes = unsafe { slot.read(src[0], self.src_codec.unit_size()) };
                is_na_token(&self.src_codec.decode_all(bytes)?)
            }
        };
        unsafe {
            if missing {
                node.child(self.assign_missing).single(dst, &[])
            } else {
                node.child(self.value).single(dst, src)
            }
        }
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(usize)) {
        visit(self.value);
        visit(self.assign_missing);
    }
}

/// Assignment from an option source into a non-option destination; a
/// missing element is an error.
pub struct OptionToValue {
    is_missing: usize,
    value: usize,
}

impl OptionToValue {
    /// Emplaces the composite, then the is-missing test and the value
    /// assignment from the call graph.
    pub fn build(
        kb: &mut KernelBuilder,
        request: KernelRequest,
        dst: &Arrmeta,
        src: &[&Arrmeta],
    ) -> Result<usize, BuildError> {
        let src = single_source(src)?;
        let me = kb.emplace(OptionToValue {
            is_missing: 0,
            value: 0,
        });
        let is_missing = kb.instantiate_next(request, &Arrmeta::Empty, &[src])?;
        let value = kb.instantiate_next(request, dst, &[src.option_value()])?;
        let this = kb.get_at::<OptionToValue>(me)?;
        this.is_missing = is_missing - me;
        this.value = value - me;
        Ok(me)
    }
}

impl Kernel for OptionToValue {
    unsafe fn single(
        &self,
        node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        let mut missing = 0u8;
        unsafe {
            node.child(self.is_missing).single(&mut missing, src)?;
            if missing != 0 {
                return Err(KernelError::MissingValue);
            }
            node.child(self.value).single(dst, src)
        }
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(usize)) {
        visit(self.is_missing);
        visit(self.value);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::builder::CallGraph;
    use crate::chain::KernelChain;
    use crate::lattice::CopyAssign;
    use crate::missing::{AssignMissing, IsMissing, Missing};
    use weft_types::Type;

    /// Copies i32 and counts strided calls.
    struct CountingCopy {
        calls: Arc<AtomicUsize>,
    }

    impl Kernel for CountingCopy {
        unsafe fn single(
            &self,
            node: KernelRef<'_>,
            dst: *mut u8,
            src: &[*const u8],
        ) -> Result<(), KernelError> {
            unsafe { CopyAssign::new(4).single(node, dst, src) }
        }

        unsafe fn strided(
            &self,
            node: KernelRef<'_>,
            dst: *mut u8,
            dst_stride: isize,
            src: &[*const u8],
            src_stride: &[isize],
            count: usize,
        ) -> Result<(), KernelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            unsafe { CopyAssign::new(4).strided(node, dst, dst_stride, src, src_stride, count) }
        }
    }

    fn option_int32_chain(chunk_size: usize, calls: &Arc<AtomicUsize>) -> KernelChain {
        let missing = Missing::of(&Type::int32()).unwrap();
        let calls = calls.clone();
        let mut graph = CallGraph::new();
        graph.push(move |kb, request, dst, src| OptionAssign::build(kb, request, chunk_size, dst, src));
        graph.push(move |kb, _, _, _| Ok(kb.emplace(IsMissing::new(missing))));
        graph.push(move |kb, _, _, _| Ok(kb.emplace(CountingCopy { calls })));
        graph.push(move |kb, _, _, _| Ok(kb.emplace(AssignMissing::new(missing))));
        let mut kb = KernelBuilder::new(graph, 64);
        let meta = Arrmeta::Option(Box::new(Arrmeta::Empty));
        kb.instantiate_next(KernelRequest::Strided, &meta, &[&meta]).unwrap();
        kb.finish(KernelRequest::Strided).unwrap()
    }

    #[test]
    fn strided_runs_are_batched() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = option_int32_chain(4, &calls);
        let src = [1, 2, i32::MIN, i32::MIN, 5, 6, 7, 8, 9, i32::MIN];
        let mut dst = [0i32; 10];
        unsafe {
            chain
                .strided(dst.as_mut_ptr().cast(), 4, &[src.as_ptr().cast()], &[4], src.len())
                .unwrap();
        }
        assert_eq!(dst, src);
        // Chunks [1 2 NA NA] [5 6 7 8] [9 NA] hold three present runs.
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn single_dispatches_on_flag() {
        let calls = Arc::new(AtomicUsize::new(0));
        let chain = option_int32_chain(DEFAULT_CHUNK_SIZE, &calls);
        let mut out = 7i32;
        let na = i32::MIN;
        unsafe { chain.single((&raw mut out).cast(), &[(&raw const na).cast()]) }.unwrap();
        assert_eq!(out, i32::MIN);
        let value = 11i32;
        unsafe { chain.single((&raw mut out).cast(), &[(&raw const value).cast()]) }.unwrap();
        assert_eq!(out, 11);
    }

    #[test]
    fn option_to_value_rejects_missing() {
        let missing = Missing::of(&Type::int32()).unwrap();
        let mut graph = CallGraph::new();
        graph.push(|kb, request, dst, src| OptionToValue::build(kb, request, dst, src));
        graph.push(move |kb, _, _, _| Ok(kb.emplace(IsMissing::new(missing))));
        graph.push(|kb, _, _, _| Ok(kb.emplace(CopyAssign::new(4))));
        let mut kb = KernelBuilder::new(graph, 64);
        let meta = Arrmeta::Option(Box::new(Arrmeta::Empty));
        kb.instantiate_next(KernelRequest::Single, &Arrmeta::Empty, &[&meta]).unwrap();
        let chain = kb.finish(KernelRequest::Single).unwrap();

        let mut out = 0i32;
        let na = i32::MIN;
        let err = unsafe { chain.single((&raw mut out).cast(), &[(&raw const na).cast()]) };
        assert_eq!(err, Err(KernelError::MissingValue));
        let value = 3i32;
        unsafe { chain.single((&raw mut out).cast(), &[(&raw const value).cast()]) }.unwrap();
        assert_eq!(out, 3);
    }

    #[test]
    fn na_tokens() {
        for token in ["", "NA", " n/a ", "Null", "NONE"] {
            assert!(is_na_token(token), "{token:?}");
        }
        assert!(!is_na_token("nan"));
        assert!(!is_na_token("0"));
    }
}
