//! Numeric assignment lattice.
//!
//! Kernels are keyed by (destination kind, source kind, error mode). The
//! table holds one canonical kernel per key, or an alias to a less strict
//! mode when the stricter check can never fire for that kind pair. Aliases
//! are derived from the promotion rules in [`is_lossless`] and
//! [`derive_alias`] instead of being listed pair by pair.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::OnceLock;

use tracing::debug;

use crate::builder::KernelBuilder;
use crate::error::KernelError;
use crate::mode::AssignErrorMode;
use crate::numeric::{Element, NumericClass, ScalarKind, convert, with_element};
use crate::record::{Kernel, KernelRef};

/// Emplaces the canonical kernel for one kind pair with the given mode.
pub type EmplaceFn = fn(&mut KernelBuilder, AssignErrorMode) -> usize;

/// One entry of the lattice table.
#[derive(Clone, Copy)]
pub enum LatticeEntry {
    Canonical(EmplaceFn),
    /// Same behavior as the entry for the named, less strict mode.
    Alias(AssignErrorMode),
}

/// Whether every value of `src` converts to `dst` without any loss.
pub fn is_lossless(dst: ScalarKind, src: ScalarKind) -> bool {
    use NumericClass::*;
    if dst == src {
        return true;
    }
    match (dst.class(), src.class()) {
        (_, Bool) => true,
        (Bool, _) => false,
        (Signed, Signed) | (Unsigned, Unsigned) => dst.bits() >= src.bits(),
        (Signed, Unsigned) => dst.bits() > src.bits(),
        (Unsigned, Signed) => false,
        (Float | Complex, Signed | Unsigned) => mantissa(dst) >= src.value_bits(),
        (Float | Complex, Float) | (Complex, Complex) => mantissa(dst) >= mantissa(src),
        (Float, Complex) => false,
        (Signed | Unsigned, Float | Complex) => false,
    }
}

fn mantissa(kind: ScalarKind) -> u32 {
    kind.mantissa_bits().unwrap_or(0)
}

/// The least strict mode that behaves exactly like `mode` for this pair.
pub fn derive_alias(dst: ScalarKind, src: ScalarKind, mode: AssignErrorMode) -> AssignErrorMode {
    if mode == AssignErrorMode::NoCheck || is_lossless(dst, src) {
        return AssignErrorMode::NoCheck;
    }
    let fraction_possible = dst.is_integral() && !src.is_integral();
    match mode {
        AssignErrorMode::Fractional if !fraction_possible => AssignErrorMode::Overflow,
        AssignErrorMode::Inexact if dst.is_integral() && src.is_integral() => {
            AssignErrorMode::Overflow
        }
        // In range and integral means exact for a real source.
        AssignErrorMode::Inexact if dst.is_integral() && src.is_real_float() => {
            AssignErrorMode::Fractional
        }
        mode => mode,
    }
}

/// Canonical kernel converting `S` elements into `D` elements.
pub struct NumericAssign<D, S> {
    mode: AssignErrorMode,
    _types: PhantomData<fn(S) -> D>,
}

impl<D: Element, S: Element> NumericAssign<D, S> {
    pub fn new(mode: AssignErrorMode) -> Self {
        Self {
            mode,
            _types: PhantomData,
        }
    }

    pub fn mode(&self) -> AssignErrorMode {
        self.mode
    }
}

impl<D: Element, S: Element> Kernel for NumericAssign<D, S> {
    #[inline]
    unsafe fn single(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        let value = unsafe { src[0].cast::<S>().read_unaligned() };
        let out = convert::<D>(value.to_repr(), self.mode)?;
        unsafe { dst.cast::<D>().write_unaligned(out) };
        Ok(())
    }
}

/// Byte copy between identical types; preserves NaN payloads exactly.
pub struct CopyAssign {
    size: usize,
}

impl CopyAssign {
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl Kernel for CopyAssign {
    #[inline]
    unsafe fn single(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        unsafe { std::ptr::copy_nonoverlapping(src[0], dst, self.size) };
        Ok(())
    }

    unsafe fn strided(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        dst_stride: isize,
        src: &[*const u8],
        src_stride: &[isize],
        count: usize,
    ) -> Result<(), KernelError> {
        let contiguous = dst_stride == self.size as isize && src_stride[0] == self.size as isize;
        if contiguous {
            unsafe { std::ptr::copy_nonoverlapping(src[0], dst, self.size * count) };
            return Ok(());
        }
        let (mut d, mut s) = (dst, src[0]);
        for _ in 0..count {
            unsafe { std::ptr::copy_nonoverlapping(s, d, self.size) };
            d = d.wrapping_offset(dst_stride);
            s = s.wrapping_offset(src_stride[0]);
        }
        Ok(())
    }
}

fn emplace_numeric<D: Element, S: Element>(kb: &mut KernelBuilder, mode: AssignErrorMode) -> usize {
    kb.emplace(NumericAssign::<D, S>::new(mode))
}

fn emplace_copy<T: Element>(kb: &mut KernelBuilder, _mode: AssignErrorMode) -> usize {
    kb.emplace(CopyAssign::new(size_of::<T>()))
}

fn canonical(dst: ScalarKind, src: ScalarKind) -> EmplaceFn {
    if dst == src {
        return with_element!(dst, |T| emplace_copy::<T> as EmplaceFn);
    }
    with_element!(dst, |D| with_element!(src, |S| emplace_numeric::<D, S> as EmplaceFn))
}

/// The (destination, source, mode) dispatch table, built once.
pub struct AssignLattice {
    entries: HashMap<(ScalarKind, ScalarKind, AssignErrorMode), LatticeEntry>,
}

impl AssignLattice {
    fn build() -> Self {
        let mut entries = HashMap::new();
        let mut aliases = 0usize;
        for dst in ScalarKind::ALL {
            for src in ScalarKind::ALL {
                let kernel = canonical(dst, src);
                for mode in AssignErrorMode::CONCRETE {
                    let effective = derive_alias(dst, src, mode);
                    let entry = if effective == mode {
                        LatticeEntry::Canonical(kernel)
                    } else {
                        aliases += 1;
                        LatticeEntry::Alias(effective)
                    };
                    entries.insert((dst, src, mode), entry);
                }
            }
        }
        debug!(
            entries = entries.len(),
            aliases, "built numeric assignment lattice"
        );
        Self { entries }
    }

    pub fn global() -> &'static AssignLattice {
        static LATTICE: OnceLock<AssignLattice> = OnceLock::new();
        LATTICE.get_or_init(AssignLattice::build)
    }

    pub fn entry(
        &self,
        dst: ScalarKind,
        src: ScalarKind,
        mode: AssignErrorMode,
    ) -> Option<LatticeEntry> {
        self.entries.get(&(dst, src, mode)).copied()
    }

    /// Follows aliases to the canonical kernel; returns it with the mode it
    /// should be built with.
    pub fn lookup(
        &self,
        dst: ScalarKind,
        src: ScalarKind,
        mode: AssignErrorMode,
    ) -> Option<(AssignErrorMode, EmplaceFn)> {
        let mut mode = mode;
        // Aliases only point at strictly weaker modes, so this terminates.
        for _ in 0..AssignErrorMode::CONCRETE.len() {
            match self.entry(dst, src, mode)? {
                LatticeEntry::Canonical(emplace) => return Some((mode, emplace)),
                LatticeEntry::Alias(weaker) => mode = weaker,
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::builder::{CallGraph, KernelRequest};
    use crate::numeric::Repr;
    use weft_types::{Arrmeta, Complex};

    use ScalarKind::*;

    #[test]
    fn lossless_rules() {
        assert!(is_lossless(Float64, Float32));
        assert!(!is_lossless(Float32, Float64));
        assert!(is_lossless(Int16, Int8));
        assert!(!is_lossless(Int8, Int16));
        assert!(is_lossless(Int16, UInt8));
        assert!(!is_lossless(UInt16, Int8));
        assert!(is_lossless(Float64, Int32));
        assert!(!is_lossless(Float64, Int64));
        assert!(is_lossless(Float16, Int8));
        assert!(!is_lossless(Float16, Int16));
        assert!(is_lossless(Complex128, Float64));
        assert!(!is_lossless(Float64, Complex64));
        assert!(is_lossless(Int8, Bool));
        assert!(!is_lossless(Bool, Int8));
    }

    #[test]
    fn aliases_follow_promotion() {
        assert_eq!(derive_alias(Float64, Float32, AssignErrorMode::Inexact), AssignErrorMode::NoCheck);
        assert_eq!(derive_alias(Float32, Float64, AssignErrorMode::Fractional), AssignErrorMode::Overflow);
        assert_eq!(derive_alias(Float32, Float64, AssignErrorMode::Inexact), AssignErrorMode::Inexact);
        assert_eq!(derive_alias(Int8, Int32, AssignErrorMode::Inexact), AssignErrorMode::Overflow);
        assert_eq!(derive_alias(Int8, Float64, AssignErrorMode::Inexact), AssignErrorMode::Fractional);
        assert_eq!(derive_alias(Int8, Complex64, AssignErrorMode::Inexact), AssignErrorMode::Inexact);
        assert_eq!(derive_alias(Int8, Float64, AssignErrorMode::Fractional), AssignErrorMode::Fractional);
    }

    #[test]
    fn table_is_complete_and_resolves() {
        let lattice = AssignLattice::global();
        for dst in ScalarKind::ALL {
            for src in ScalarKind::ALL {
                for mode in AssignErrorMode::CONCRETE {
                    let (resolved, _) = lattice.lookup(dst, src, mode).unwrap();
                    assert!(resolved <= mode);
                    assert_eq!(resolved, derive_alias(dst, src, mode));
                }
            }
        }
        assert!(matches!(
            lattice.entry(Float64, Float32, AssignErrorMode::Overflow),
            Some(LatticeEntry::Alias(AssignErrorMode::NoCheck))
        ));
    }

    fn run<D: Default + Copy, S: Copy>(dst: ScalarKind, src: ScalarKind, mode: AssignErrorMode, value: S) -> Result<D, KernelError> {
        let (mode, emplace) = AssignLattice::global().lookup(dst, src, mode).unwrap();
        let mut graph = CallGraph::new();
        graph.push(move |kb, _, _, _| Ok(emplace(kb, mode)));
        let mut kb = KernelBuilder::new(graph, 64);
        kb.instantiate_next(KernelRequest::Single, &Arrmeta::Empty, &[&Arrmeta::Empty])
            .unwrap();
        let chain = kb.finish(KernelRequest::Single).unwrap();
        let mut out = D::default();
        unsafe {
            chain.single((&raw mut out).cast(), &[(&raw const value).cast()])?;
        }
        Ok(out)
    }

    #[test]
    fn table_kernels_execute() {
        assert_eq!(run::<i8, i32>(Int8, Int32, AssignErrorMode::NoCheck, 1000), Ok(-24));
        assert!(matches!(
            run::<i8, i32>(Int8, Int32, AssignErrorMode::Overflow, 1000),
            Err(KernelError::Overflow { .. })
        ));
        assert_eq!(run::<f64, f32>(Float64, Float32, AssignErrorMode::Inexact, 0.1), Ok(0.1f32 as f64));
        assert_eq!(run::<u16, bool>(UInt16, Bool, AssignErrorMode::Inexact, true), Ok(1));
    }

    #[test]
    fn complex_sources_keep_the_imaginary_check() {
        let value = Complex::new(1.0f64, 2.0);
        for mode in [AssignErrorMode::Overflow, AssignErrorMode::Fractional, AssignErrorMode::Inexact] {
            assert!(matches!(
                run::<f64, Complex<f64>>(Float64, Complex128, mode, value),
                Err(KernelError::ImaginaryDiscarded { .. })
            ));
        }
        assert_eq!(run::<f64, Complex<f64>>(Float64, Complex128, AssignErrorMode::NoCheck, value), Ok(1.0));
        // complex64 -> complex128 is lossless and keeps both parts.
        assert_eq!(
            run::<Complex<f64>, Complex<f32>>(Complex128, Complex64, AssignErrorMode::Inexact, Complex::new(0.5, -4.0)),
            Ok(Complex::new(0.5, -4.0))
        );
    }

    #[test]
    fn copy_preserves_signaling_nan_bits() {
        let bits = 0x7f80_07a2u32;
        let out = run::<u32, f32>(Float32, Float32, AssignErrorMode::NoCheck, f32::from_bits(bits)).unwrap();
        assert_eq!(out, bits);
    }

    fn same_outcome<D: Element>(repr: Repr, requested: AssignErrorMode, resolved: AssignErrorMode) -> bool {
        match (convert::<D>(repr, requested), convert::<D>(repr, resolved)) {
            (Ok(a), Ok(b)) => a.to_repr().same_value(b.to_repr()),
            (Err(_), Err(_)) => true,
            _ => false,
        }
    }

    proptest! {
        #[test]
        fn aliases_behave_like_the_requested_mode(
            int in any::<i64>(),
            float in any::<f64>(),
            imag in prop_oneof![Just(0.0f64), any::<f64>()],
            shape in 0usize..3,
            dst in 0usize..14,
            src in 0usize..14,
            mode in 0usize..4,
        ) {
            let (dst, src) = (ScalarKind::ALL[dst], ScalarKind::ALL[src]);
            let mode = AssignErrorMode::CONCRETE[mode];
            let raw = match shape {
                0 => Repr::Int(int as i128),
                1 => Repr::Float(float),
                _ => Repr::Complex(float, imag),
            };
            let repr = with_element!(src, |S| S::from_repr(raw).to_repr());
            let resolved = derive_alias(dst, src, mode);
            let agrees = with_element!(dst, |D| same_outcome::<D>(repr, mode, resolved));
            prop_assert!(agrees, "{dst} <- {src} ({repr}) under {mode} vs {resolved}");
        }
    }
}
