//! Binary arithmetic kernels and type promotion.

use std::fmt;
use std::marker::PhantomData;

use half::f16;
use weft_types::{Arrmeta, Complex};

use crate::builder::{KernelBuilder, KernelRequest};
use crate::error::{BuildError, KernelError};
use crate::lattice::is_lossless;
use crate::numeric::{Element, NumericClass, ScalarKind};
use crate::record::{Kernel, KernelRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl BinaryOp {
    pub const ALL: [BinaryOp; 4] = [
        BinaryOp::Add,
        BinaryOp::Subtract,
        BinaryOp::Multiply,
        BinaryOp::Divide,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            BinaryOp::Add => "add",
            BinaryOp::Subtract => "subtract",
            BinaryOp::Multiply => "multiply",
            BinaryOp::Divide => "divide",
        }
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Element types with arithmetic. Integers wrap; integer division by zero
/// is an error.
pub trait Arith: Element {
    fn apply(op: BinaryOp, lhs: Self, rhs: Self) -> Result<Self, KernelError>;
}

macro_rules! int_arith {
    ($($t:ty),*) => {$(
        impl Arith for $t {
            #[inline]
            fn apply(op: BinaryOp, lhs: Self, rhs: Self) -> Result<Self, KernelError> {
                Ok(match op {
                    BinaryOp::Add => lhs.wrapping_add(rhs),
                    BinaryOp::Subtract => lhs.wrapping_sub(rhs),
                    BinaryOp::Multiply => lhs.wrapping_mul(rhs),
                    BinaryOp::Divide if rhs == 0 => return Err(KernelError::DivideByZero),
                    BinaryOp::Divide => lhs.wrapping_div(rhs),
                })
            }
        }
    )*};
}

int_arith!(i8, i16, i32, i64, u8, u16, u32, u64);

macro_rules! float_arith {
    ($($t:ty),*) => {$(
        impl Arith for $t {
            #[inline]
            fn apply(op: BinaryOp, lhs: Self, rhs: Self) -> Result<Self, KernelError> {
                Ok(match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Subtract => lhs - rhs,
                    BinaryOp::Multiply => lhs * rhs,
                    BinaryOp::Divide => lhs / rhs,
                })
            }
        }

        impl Arith for Complex<$t> {
            fn apply(op: BinaryOp, lhs: Self, rhs: Self) -> Result<Self, KernelError> {
                let (a, b, c, d) = (lhs.re, lhs.im, rhs.re, rhs.im);
                Ok(match op {
                    BinaryOp::Add => Complex::new(a + c, b + d),
                    BinaryOp::Subtract => Complex::new(a - c, b - d),
                    BinaryOp::Multiply => Complex::new(a * c - b * d, a * d + b * c),
                    BinaryOp::Divide => {
                        let norm = c * c + d * d;
                        Complex::new((a * c + b * d) / norm, (b * c - a * d) / norm)
                    }
                })
            }
        }
    )*};
}

float_arith!(f32, f64);

impl Arith for f16 {
    #[inline]
    fn apply(op: BinaryOp, lhs: Self, rhs: Self) -> Result<Self, KernelError> {
        f32::apply(op, lhs.to_f32(), rhs.to_f32()).map(f16::from_f32)
    }
}

/// `dst = lhs op rhs` with both operands and the result of type `T`.
pub struct BinaryKernel<T> {
    op: BinaryOp,
    _type: PhantomData<fn(T) -> T>,
}

impl<T: Arith> BinaryKernel<T> {
    pub fn new(op: BinaryOp) -> Self {
        Self {
            op,
            _type: PhantomData,
        }
    }
}

impl<T: Arith> Kernel for BinaryKernel<T> {
    #[inline]
    unsafe fn single(
        &self,
        _node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        let (lhs, rhs) = unsafe {
            (
                src[0].cast::<T>().read_unaligned(),
                src[1].cast::<T>().read_unaligned(),
            )
        };
        let out = T::apply(self.op, lhs, rhs)?;
        unsafe { dst.cast::<T>().write_unaligned(out) };
        Ok(())
    }
}

/// Emplaces the arithmetic kernel of `kind`, or `None` for bool.
pub fn emplace_binary(kb: &mut KernelBuilder, kind: ScalarKind, op: BinaryOp) -> Option<usize> {
    Some(match kind {
        ScalarKind::Bool => return None,
        ScalarKind::Int8 => kb.emplace(BinaryKernel::<i8>::new(op)),
        ScalarKind::Int16 => kb.emplace(BinaryKernel::<i16>::new(op)),
        ScalarKind::Int32 => kb.emplace(BinaryKernel::<i32>::new(op)),
        ScalarKind::Int64 => kb.emplace(BinaryKernel::<i64>::new(op)),
        ScalarKind::UInt8 => kb.emplace(BinaryKernel::<u8>::new(op)),
        ScalarKind::UInt16 => kb.emplace(BinaryKernel::<u16>::new(op)),
        ScalarKind::UInt32 => kb.emplace(BinaryKernel::<u32>::new(op)),
        ScalarKind::UInt64 => kb.emplace(BinaryKernel::<u64>::new(op)),
        ScalarKind::Float16 => kb.emplace(BinaryKernel::<f16>::new(op)),
        ScalarKind::Float32 => kb.emplace(BinaryKernel::<f32>::new(op)),
        ScalarKind::Float64 => kb.emplace(BinaryKernel::<f64>::new(op)),
        ScalarKind::Complex64 => kb.emplace(BinaryKernel::<Complex<f32>>::new(op)),
        ScalarKind::Complex128 => kb.emplace(BinaryKernel::<Complex<f64>>::new(op)),
    })
}

/// Common type two operands are computed in, or `None` when either is bool.
///
/// Picks the operand that holds the other losslessly; otherwise the
/// smallest kind holding both, falling back to `float64` (or `complex128`
/// when a complex operand is involved).
pub fn promote(lhs: ScalarKind, rhs: ScalarKind) -> Option<ScalarKind> {
    if lhs.class() == NumericClass::Bool || rhs.class() == NumericClass::Bool {
        return None;
    }
    if is_lossless(lhs, rhs) {
        return Some(lhs);
    }
    if is_lossless(rhs, lhs) {
        return Some(rhs);
    }
    let holds_both = |kind: &ScalarKind| is_lossless(*kind, lhs) && is_lossless(*kind, rhs);
    let promoted = match (lhs.class(), rhs.class()) {
        (NumericClass::Complex, _) | (_, NumericClass::Complex) => [ScalarKind::Complex64, ScalarKind::Complex128]
            .into_iter()
            .find(holds_both)
            .unwrap_or(ScalarKind::Complex128),
        (NumericClass::Float, _) | (_, NumericClass::Float) => [ScalarKind::Float16, ScalarKind::Float32, ScalarKind::Float64]
            .into_iter()
            .find(holds_both)
            .unwrap_or(ScalarKind::Float64),
        _ => [ScalarKind::Int16, ScalarKind::Int32, ScalarKind::Int64]
            .into_iter()
            .find(holds_both)
            .unwrap_or(ScalarKind::Float64),
    };
    Some(promoted)
}

/// Scratch space for one promoted operand; fits a `complex128`.
type Scratch = [u64; 2];

/// Casts both operands to a common type, applies the operation and
/// optionally casts the result to the destination type.
pub struct PromotedBinary {
    lhs_cast: usize,
    rhs_cast: usize,
    op: usize,
    out_cast: Option<usize>,
}

impl PromotedBinary {
    /// Emplaces the composite, then from the call graph: the left cast, the
    /// right cast, the operation and, when `cast_result` is set, the
    /// result cast.
    pub fn build(
        kb: &mut KernelBuilder,
        request: KernelRequest,
        cast_result: bool,
        dst: &Arrmeta,
        src: &[&Arrmeta],
    ) -> Result<usize, BuildError> {
        let [lhs, rhs] = src else {
            return Err(BuildError::ArrmetaMismatch(format!(
                "expected two sources, got {}",
                src.len()
            )));
        };
        let me = kb.emplace(PromotedBinary {
            lhs_cast: 0,
            rhs_cast: 0,
            op: 0,
            out_cast: None,
        });
        let empty = Arrmeta::Empty;
        let lhs_cast = kb.instantiate_next(request, &empty, &[*lhs])?;
        let rhs_cast = kb.instantiate_next(request, &empty, &[*rhs])?;
        let op = kb.instantiate_next(request, if cast_result { &empty } else { dst }, &[&empty, &empty])?;
        let out_cast = if cast_result {
            Some(kb.instantiate_next(request, dst, &[&empty])? - me)
        } else {
            None
        };
        let this = kb.get_at::<PromotedBinary>(me)?;
        this.lhs_cast = lhs_cast - me;
        this.rhs_cast = rhs_cast - me;
        this.op = op - me;
        this.out_cast = out_cast;
        Ok(me)
    }
}

impl Kernel for PromotedBinary {
    unsafe fn single(
        &self,
        node: KernelRef<'_>,
        dst: *mut u8,
        src: &[*const u8],
    ) -> Result<(), KernelError> {
        let mut lhs: Scratch = [0; 2];
        let mut rhs: Scratch = [0; 2];
        unsafe {
            node.child(self.lhs_cast).single(lhs.as_mut_ptr().cast(), &src[..1])?;
            node.child(self.rhs_cast).single(rhs.as_mut_ptr().cast(), &src[1..2])?;
            let operands = [lhs.as_ptr().cast::<u8>(), rhs.as_ptr().cast::<u8>()];
            match self.out_cast {
                None => node.child(self.op).single(dst, &operands),
                Some(out_cast) => {
                    let mut result: Scratch = [0; 2];
                    node.child(self.op).single(result.as_mut_ptr().cast(), &operands)?;
                    node.child(out_cast).single(dst, &[result.as_ptr().cast()])
                }
            }
        }
    }

    fn for_each_child(&self, visit: &mut dyn FnMut(usize)) {
        visit(self.lhs_cast);
        visit(self.rhs_cast);
        visit(self.op);
        if let Some(out_cast) = self.out_cast {
            visit(out_cast);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::CallGraph;
    use crate::lattice::{CopyAssign, NumericAssign};
    use crate::mode::AssignErrorMode;

    use ScalarKind::*;

    #[test]
    fn promotion_table() {
        assert_eq!(promote(Int32, Int32), Some(Int32));
        assert_eq!(promote(Int8, Int32), Some(Int32));
        assert_eq!(promote(UInt8, Int8), Some(Int16));
        assert_eq!(promote(UInt32, Int32), Some(Int64));
        assert_eq!(promote(UInt64, Int64), Some(Float64));
        assert_eq!(promote(Int32, Float32), Some(Float64));
        assert_eq!(promote(Int8, Float16), Some(Float16));
        assert_eq!(promote(Int64, Float64), Some(Float64));
        assert_eq!(promote(Float64, Complex64), Some(Complex128));
        assert_eq!(promote(Float32, Complex64), Some(Complex64));
        assert_eq!(promote(Bool, Int8), None);
    }

    #[test]
    fn element_arithmetic() {
        assert_eq!(i8::apply(BinaryOp::Add, 127, 1), Ok(-128));
        assert_eq!(u32::apply(BinaryOp::Divide, 7, 0), Err(KernelError::DivideByZero));
        assert_eq!(f64::apply(BinaryOp::Divide, 1.0, 0.0), Ok(f64::INFINITY));
        assert_eq!(
            f16::apply(BinaryOp::Multiply, f16::from_f32(1.5), f16::from_f32(2.0)),
            Ok(f16::from_f32(3.0))
        );
        let product = Complex::<f64>::apply(BinaryOp::Multiply, Complex::new(1.0, 2.0), Complex::new(3.0, -1.0));
        assert_eq!(product, Ok(Complex::new(5.0, 5.0)));
        let quotient = Complex::<f64>::apply(BinaryOp::Divide, Complex::new(5.0, 5.0), Complex::new(3.0, -1.0));
        assert_eq!(quotient, Ok(Complex::new(1.0, 2.0)));
    }

    #[test]
    fn promoted_int8_plus_float32() {
        let mut graph = CallGraph::new();
        graph.push(|kb, request, dst, src| PromotedBinary::build(kb, request, true, dst, src));
        graph.push(|kb, _, _, _| Ok(kb.emplace(NumericAssign::<f32, i8>::new(AssignErrorMode::NoCheck))));
        graph.push(|kb, _, _, _| Ok(kb.emplace(CopyAssign::new(4))));
        graph.push(|kb, _, _, _| {
            emplace_binary(kb, Float32, BinaryOp::Subtract).ok_or(BuildError::GraphExhausted)
        });
        graph.push(|kb, _, _, _| Ok(kb.emplace(NumericAssign::<i16, f32>::new(AssignErrorMode::Fractional))));
        let mut kb = KernelBuilder::new(graph, 32);
        kb.instantiate_next(KernelRequest::Strided, &Arrmeta::Empty, &[&Arrmeta::Empty, &Arrmeta::Empty])
            .unwrap();
        let chain = kb.finish(KernelRequest::Strided).unwrap();

        let lhs = [10i8, -3];
        let rhs = [2.0f32, 0.5];
        let mut out = [0i16; 2];
        unsafe {
            chain
                .single(out.as_mut_ptr().cast(), &[lhs.as_ptr().cast(), rhs.as_ptr().cast()])
                .unwrap();
        }
        assert_eq!(out[0], 8);
        let err = unsafe {
            chain.strided(
                out.as_mut_ptr().cast(),
                2,
                &[lhs.as_ptr().cast(), rhs.as_ptr().cast()],
                &[1, 4],
                2,
            )
        };
        assert!(matches!(err, Err(KernelError::Fractional { .. })));
        assert_eq!(out[0], 8);
    }
}
