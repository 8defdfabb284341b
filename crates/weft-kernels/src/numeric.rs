//! Numeric scalar kinds and their lossless intermediate representation.
//!
//! Every numeric conversion goes through [`Repr`], which holds any value of
//! any [`ScalarKind`] exactly: integers up to 64 bits fit in `i128`, and
//! every float format widens exactly to `f64`. A destination type then
//! decides whether the value fits ([`Element::in_range`]) and how to
//! narrow it ([`Element::from_repr`]).

use std::fmt;

use half::f16;
use weft_types::{Complex, Type, TypeId};

use crate::error::KernelError;
use crate::mode::AssignErrorMode;

/// Numeric element kinds with a kernel implementation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ScalarKind {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Complex64,
    Complex128,
}

/// Broad numeric class of a [`ScalarKind`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NumericClass {
    Bool,
    Signed,
    Unsigned,
    Float,
    Complex,
}

impl ScalarKind {
    pub const ALL: [ScalarKind; 14] = [
        ScalarKind::Bool,
        ScalarKind::Int8,
        ScalarKind::Int16,
        ScalarKind::Int32,
        ScalarKind::Int64,
        ScalarKind::UInt8,
        ScalarKind::UInt16,
        ScalarKind::UInt32,
        ScalarKind::UInt64,
        ScalarKind::Float16,
        ScalarKind::Float32,
        ScalarKind::Float64,
        ScalarKind::Complex64,
        ScalarKind::Complex128,
    ];

    pub fn from_id(id: TypeId) -> Option<Self> {
        Some(match id {
            TypeId::Bool => ScalarKind::Bool,
            TypeId::Int8 => ScalarKind::Int8,
            TypeId::Int16 => ScalarKind::Int16,
            TypeId::Int32 => ScalarKind::Int32,
            TypeId::Int64 => ScalarKind::Int64,
            TypeId::UInt8 => ScalarKind::UInt8,
            TypeId::UInt16 => ScalarKind::UInt16,
            TypeId::UInt32 => ScalarKind::UInt32,
            TypeId::UInt64 => ScalarKind::UInt64,
            TypeId::Float16 => ScalarKind::Float16,
            TypeId::Float32 => ScalarKind::Float32,
            TypeId::Float64 => ScalarKind::Float64,
            TypeId::Complex64 => ScalarKind::Complex64,
            TypeId::Complex128 => ScalarKind::Complex128,
            _ => return None,
        })
    }

    /// Kind of a concrete numeric type.
    pub fn of(tp: &Type) -> Option<Self> {
        if tp.is_concrete() {
            Self::from_id(tp.id())
        } else {
            None
        }
    }

    pub fn type_id(self) -> TypeId {
        match self {
            ScalarKind::Bool => TypeId::Bool,
            ScalarKind::Int8 => TypeId::Int8,
            ScalarKind::Int16 => TypeId::Int16,
            ScalarKind::Int32 => TypeId::Int32,
            ScalarKind::Int64 => TypeId::Int64,
            ScalarKind::UInt8 => TypeId::UInt8,
            ScalarKind::UInt16 => TypeId::UInt16,
            ScalarKind::UInt32 => TypeId::UInt32,
            ScalarKind::UInt64 => TypeId::UInt64,
            ScalarKind::Float16 => TypeId::Float16,
            ScalarKind::Float32 => TypeId::Float32,
            ScalarKind::Float64 => TypeId::Float64,
            ScalarKind::Complex64 => TypeId::Complex64,
            ScalarKind::Complex128 => TypeId::Complex128,
        }
    }

    pub fn to_type(self) -> Type {
        match self {
            ScalarKind::Bool => Type::bool(),
            ScalarKind::Int8 => Type::int8(),
            ScalarKind::Int16 => Type::int16(),
            ScalarKind::Int32 => Type::int32(),
            ScalarKind::Int64 => Type::int64(),
            ScalarKind::UInt8 => Type::uint8(),
            ScalarKind::UInt16 => Type::uint16(),
            ScalarKind::UInt32 => Type::uint32(),
            ScalarKind::UInt64 => Type::uint64(),
            ScalarKind::Float16 => Type::float16(),
            ScalarKind::Float32 => Type::float32(),
            ScalarKind::Float64 => Type::float64(),
            ScalarKind::Complex64 => Type::complex64(),
            ScalarKind::Complex128 => Type::complex128(),
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::Int8 => "int8",
            ScalarKind::Int16 => "int16",
            ScalarKind::Int32 => "int32",
            ScalarKind::Int64 => "int64",
            ScalarKind::UInt8 => "uint8",
            ScalarKind::UInt16 => "uint16",
            ScalarKind::UInt32 => "uint32",
            ScalarKind::UInt64 => "uint64",
            ScalarKind::Float16 => "float16",
            ScalarKind::Float32 => "float32",
            ScalarKind::Float64 => "float64",
            ScalarKind::Complex64 => "complex64",
            ScalarKind::Complex128 => "complex128",
        }
    }

    pub const fn class(self) -> NumericClass {
        match self {
            ScalarKind::Bool => NumericClass::Bool,
            ScalarKind::Int8 | ScalarKind::Int16 | ScalarKind::Int32 | ScalarKind::Int64 => {
                NumericClass::Signed
            }
            ScalarKind::UInt8 | ScalarKind::UInt16 | ScalarKind::UInt32 | ScalarKind::UInt64 => {
                NumericClass::Unsigned
            }
            ScalarKind::Float16 | ScalarKind::Float32 | ScalarKind::Float64 => NumericClass::Float,
            ScalarKind::Complex64 | ScalarKind::Complex128 => NumericClass::Complex,
        }
    }

    /// Width in bits of one value, or of one component for complex kinds.
    pub const fn bits(self) -> u32 {
        match self {
            ScalarKind::Bool => 1,
            ScalarKind::Int8 | ScalarKind::UInt8 => 8,
            ScalarKind::Int16 | ScalarKind::UInt16 | ScalarKind::Float16 => 16,
            ScalarKind::Int32 | ScalarKind::UInt32 | ScalarKind::Float32 => 32,
            ScalarKind::Complex64 => 32,
            ScalarKind::Int64 | ScalarKind::UInt64 | ScalarKind::Float64 => 64,
            ScalarKind::Complex128 => 64,
        }
    }

    /// Bits of magnitude an integer kind carries (sign bit excluded).
    pub const fn value_bits(self) -> u32 {
        match self.class() {
            NumericClass::Signed => self.bits() - 1,
            _ => self.bits(),
        }
    }

    /// Significand precision, including the implicit bit, of float and
    /// complex kinds.
    pub const fn mantissa_bits(self) -> Option<u32> {
        match self {
            ScalarKind::Float16 => Some(11),
            ScalarKind::Float32 | ScalarKind::Complex64 => Some(24),
            ScalarKind::Float64 | ScalarKind::Complex128 => Some(53),
            _ => None,
        }
    }

    /// Integer or bool destinations, which cannot hold fractional values.
    pub const fn is_integral(self) -> bool {
        matches!(
            self.class(),
            NumericClass::Bool | NumericClass::Signed | NumericClass::Unsigned
        )
    }

    /// Real float kinds (complex excluded).
    pub const fn is_real_float(self) -> bool {
        matches!(self.class(), NumericClass::Float)
    }

    pub const fn is_complex(self) -> bool {
        matches!(self.class(), NumericClass::Complex)
    }

    pub const fn size(self) -> usize {
        match self {
            ScalarKind::Complex64 => 8,
            ScalarKind::Complex128 => 16,
            kind => kind.bits().div_ceil(8) as usize,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Exact intermediate value of any numeric element.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Repr {
    Int(i128),
    Float(f64),
    Complex(f64, f64),
}

impl Repr {
    /// Numeric equality across representations; NaN equals NaN.
    pub fn same_value(self, other: Repr) -> bool {
        match (self, other) {
            (Repr::Int(a), Repr::Int(b)) => a == b,
            (Repr::Int(i), Repr::Float(f)) | (Repr::Float(f), Repr::Int(i)) => float_equals_int(f, i),
            (Repr::Float(a), Repr::Float(b)) => float_eq(a, b),
            (Repr::Complex(re, im), other) | (other, Repr::Complex(re, im)) => match other {
                Repr::Complex(re2, im2) => float_eq(re, re2) && float_eq(im, im2),
                Repr::Float(f) => im == 0.0 && float_eq(re, f),
                Repr::Int(i) => im == 0.0 && float_equals_int(re, i),
            },
        }
    }

    /// Real part has a non-zero fractional part.
    pub fn has_fraction(self) -> bool {
        match self {
            Repr::Int(_) => false,
            Repr::Float(f) | Repr::Complex(f, _) => f.is_finite() && f.fract() != 0.0,
        }
    }

    pub fn has_imaginary(self) -> bool {
        matches!(self, Repr::Complex(_, im) if im != 0.0)
    }
}

fn float_eq(a: f64, b: f64) -> bool {
    a == b || (a.is_nan() && b.is_nan())
}

fn float_equals_int(f: f64, i: i128) -> bool {
    // 2^127 bounds the i128 range; anything outside cannot be equal.
    const LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;
    f.fract() == 0.0 && f >= -LIMIT && f < LIMIT && f as i128 == i
}

impl fmt::Display for Repr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Repr::Int(i) => write!(f, "{i}"),
            Repr::Float(x) => write!(f, "{x}"),
            Repr::Complex(re, im) => write!(f, "{}", Complex::new(*re, *im)),
        }
    }
}

/// A numeric element type kernels read and write directly.
pub trait Element: Copy + Send + Sync + 'static {
    const KIND: ScalarKind;

    fn to_repr(self) -> Repr;

    /// Unchecked conversion: integers wrap, floats saturate into integers,
    /// imaginary parts are dropped.
    fn from_repr(repr: Repr) -> Self;

    /// Whether the real part of `repr` lies within this type's range.
    fn in_range(repr: Repr) -> bool;
}

macro_rules! int_element {
    ($($t:ty => $kind:ident),* $(,)?) => {$(
        impl Element for $t {
            const KIND: ScalarKind = ScalarKind::$kind;

            #[inline]
            fn to_repr(self) -> Repr {
                Repr::Int(self as i128)
            }

            #[inline]
            fn from_repr(repr: Repr) -> Self {
                match repr {
                    Repr::Int(i) => i as $t,
                    Repr::Float(f) | Repr::Complex(f, _) => f as $t,
                }
            }

            fn in_range(repr: Repr) -> bool {
                match repr {
                    Repr::Int(i) => i >= <$t>::MIN as i128 && i <= <$t>::MAX as i128,
                    Repr::Float(f) | Repr::Complex(f, _) => {
                        let t = f.trunc();
                        t >= <$t>::MIN as f64 && t < <$t>::MAX as f64 + 1.0
                    }
                }
            }
        }
    )*};
}

int_element!(
    i8 => Int8, i16 => Int16, i32 => Int32, i64 => Int64,
    u8 => UInt8, u16 => UInt16, u32 => UInt32, u64 => UInt64,
);

impl Element for bool {
    const KIND: ScalarKind = ScalarKind::Bool;

    #[inline]
    fn to_repr(self) -> Repr {
        Repr::Int(self as i128)
    }

    #[inline]
    fn from_repr(repr: Repr) -> Self {
        match repr {
            Repr::Int(i) => i != 0,
            Repr::Float(f) => f != 0.0,
            Repr::Complex(re, im) => re != 0.0 || im != 0.0,
        }
    }

    fn in_range(repr: Repr) -> bool {
        match repr {
            Repr::Int(i) => i == 0 || i == 1,
            Repr::Float(f) | Repr::Complex(f, _) => f == 0.0 || f == 1.0,
        }
    }
}

fn float_in_range(repr: Repr, max: f64) -> bool {
    match repr {
        Repr::Int(i) => (i as f64).abs() <= max,
        Repr::Float(f) | Repr::Complex(f, _) => !f.is_finite() || f.abs() <= max,
    }
}

fn real_part(repr: Repr) -> f64 {
    match repr {
        Repr::Int(i) => i as f64,
        Repr::Float(f) | Repr::Complex(f, _) => f,
    }
}

fn imag_part(repr: Repr) -> f64 {
    match repr {
        Repr::Complex(_, im) => im,
        _ => 0.0,
    }
}

impl Element for f16 {
    const KIND: ScalarKind = ScalarKind::Float16;

    #[inline]
    fn to_repr(self) -> Repr {
        Repr::Float(self.to_f64())
    }

    #[inline]
    fn from_repr(repr: Repr) -> Self {
        f16::from_f64(real_part(repr))
    }

    fn in_range(repr: Repr) -> bool {
        float_in_range(repr, f16::MAX.to_f64())
    }
}

impl Element for f32 {
    const KIND: ScalarKind = ScalarKind::Float32;

    #[inline]
    fn to_repr(self) -> Repr {
        Repr::Float(self as f64)
    }

    #[inline]
    fn from_repr(repr: Repr) -> Self {
        match repr {
            Repr::Int(i) => i as f32,
            Repr::Float(f) | Repr::Complex(f, _) => f as f32,
        }
    }

    fn in_range(repr: Repr) -> bool {
        float_in_range(repr, f32::MAX as f64)
    }
}

impl Element for f64 {
    const KIND: ScalarKind = ScalarKind::Float64;

    #[inline]
    fn to_repr(self) -> Repr {
        Repr::Float(self)
    }

    #[inline]
    fn from_repr(repr: Repr) -> Self {
        real_part(repr)
    }

    fn in_range(_repr: Repr) -> bool {
        true
    }
}

impl Element for Complex<f32> {
    const KIND: ScalarKind = ScalarKind::Complex64;

    #[inline]
    fn to_repr(self) -> Repr {
        Repr::Complex(self.re as f64, self.im as f64)
    }

    #[inline]
    fn from_repr(repr: Repr) -> Self {
        Complex::new(f32::from_repr(repr), imag_part(repr) as f32)
    }

    fn in_range(repr: Repr) -> bool {
        f32::in_range(repr) && float_in_range(Repr::Float(imag_part(repr)), f32::MAX as f64)
    }
}

impl Element for Complex<f64> {
    const KIND: ScalarKind = ScalarKind::Complex128;

    #[inline]
    fn to_repr(self) -> Repr {
        Repr::Complex(self.re, self.im)
    }

    #[inline]
    fn from_repr(repr: Repr) -> Self {
        Complex::new(real_part(repr), imag_part(repr))
    }

    fn in_range(_repr: Repr) -> bool {
        true
    }
}

/// Converts `repr` into `D` after validating it against `mode`.
#[inline]
pub fn convert<D: Element>(repr: Repr, mode: AssignErrorMode) -> Result<D, KernelError> {
    if mode.is_checked() && mode != AssignErrorMode::Default {
        validate::<D>(repr, mode)?;
    }
    Ok(D::from_repr(repr))
}

fn validate<D: Element>(repr: Repr, mode: AssignErrorMode) -> Result<(), KernelError> {
    let dst = D::KIND.name();
    if !D::in_range(repr) {
        return Err(KernelError::Overflow {
            value: repr.to_string(),
            dst,
        });
    }
    if !D::KIND.is_complex() && repr.has_imaginary() {
        return Err(KernelError::ImaginaryDiscarded {
            value: repr.to_string(),
            dst,
        });
    }
    if mode >= AssignErrorMode::Fractional && D::KIND.is_integral() && repr.has_fraction() {
        return Err(KernelError::Fractional {
            value: repr.to_string(),
            dst,
        });
    }
    if mode == AssignErrorMode::Inexact && !D::from_repr(repr).to_repr().same_value(repr) {
        return Err(KernelError::Inexact {
            value: repr.to_string(),
            dst,
        });
    }
    Ok(())
}

/// Runs `body` with the element type of `kind` bound to the given alias.
macro_rules! with_element {
    ($kind:expr, |$t:ident| $body:expr) => {
        match $kind {
            $crate::numeric::ScalarKind::Bool => {
                type $t = bool;
                $body
            }
            $crate::numeric::ScalarKind::Int8 => {
                type $t = i8;
                $body
            }
            $crate::numeric::ScalarKind::Int16 => {
                type $t = i16;
                $body
            }
            $crate::numeric::ScalarKind::Int32 => {
                type $t = i32;
                $body
            }
            $crate::numeric::ScalarKind::Int64 => {
                type $t = i64;
                $body
            }
            $crate::numeric::ScalarKind::UInt8 => {
                type $t = u8;
                $body
            }
            $crate::numeric::ScalarKind::UInt16 => {
                type $t = u16;
                $body
            }
            $crate::numeric::ScalarKind::UInt32 => {
                type $t = u32;
                $body
            }
            $crate::numeric::ScalarKind::UInt64 => {
                type $t = u64;
                $body
            }
            $crate::numeric::ScalarKind::Float16 => {
                type $t = ::half::f16;
                $body
            }
            $crate::numeric::ScalarKind::Float32 => {
                type $t = f32;
                $body
            }
            $crate::numeric::ScalarKind::Float64 => {
                type $t = f64;
                $body
            }
            $crate::numeric::ScalarKind::Complex64 => {
                type $t = ::weft_types::Complex<f32>;
                $body
            }
            $crate::numeric::ScalarKind::Complex128 => {
                type $t = ::weft_types::Complex<f64>;
                $body
            }
        }
    };
}
pub(crate) use with_element;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nocheck_wraps_and_saturates() {
        assert_eq!(convert::<i8>(Repr::Int(1000), AssignErrorMode::NoCheck), Ok(-24));
        assert_eq!(convert::<u8>(Repr::Float(-3.7), AssignErrorMode::NoCheck), Ok(0));
        assert_eq!(convert::<i32>(Repr::Float(2.9), AssignErrorMode::NoCheck), Ok(2));
        assert_eq!(convert::<bool>(Repr::Float(0.5), AssignErrorMode::NoCheck), Ok(true));
    }

    #[test]
    fn overflow_mode_checks_range() {
        assert!(matches!(
            convert::<i8>(Repr::Int(1000), AssignErrorMode::Overflow),
            Err(KernelError::Overflow { .. })
        ));
        assert_eq!(convert::<i8>(Repr::Int(-128), AssignErrorMode::Overflow), Ok(-128));
        assert_eq!(convert::<i8>(Repr::Float(127.9), AssignErrorMode::Overflow), Ok(127));
        assert!(convert::<i8>(Repr::Float(128.0), AssignErrorMode::Overflow).is_err());
        assert!(convert::<u64>(Repr::Float(f64::NAN), AssignErrorMode::Overflow).is_err());
        assert!(convert::<i64>(Repr::Float(9.223_372_036_854_775_808e18), AssignErrorMode::Overflow).is_err());
        assert!(convert::<f32>(Repr::Float(1e39), AssignErrorMode::Overflow).is_err());
        assert!(convert::<f32>(Repr::Float(f64::INFINITY), AssignErrorMode::Overflow).is_ok());
        assert!(convert::<bool>(Repr::Int(2), AssignErrorMode::Overflow).is_err());
        assert!(matches!(
            convert::<f64>(Repr::Complex(1.0, 2.0), AssignErrorMode::Overflow),
            Err(KernelError::ImaginaryDiscarded { .. })
        ));
    }

    #[test]
    fn fractional_and_inexact() {
        assert_eq!(convert::<i32>(Repr::Float(2.5), AssignErrorMode::Overflow), Ok(2));
        assert!(matches!(
            convert::<i32>(Repr::Float(2.5), AssignErrorMode::Fractional),
            Err(KernelError::Fractional { .. })
        ));
        assert_eq!(convert::<f32>(Repr::Float(0.1), AssignErrorMode::Fractional), Ok(0.1f32));
        assert!(matches!(
            convert::<f32>(Repr::Float(0.1), AssignErrorMode::Inexact),
            Err(KernelError::Inexact { .. })
        ));
        assert!(convert::<f32>(Repr::Int(16_777_217), AssignErrorMode::Inexact).is_err());
        assert!(convert::<f32>(Repr::Int(16_777_216), AssignErrorMode::Inexact).is_ok());
        assert!(convert::<f32>(Repr::Float(f64::NAN), AssignErrorMode::Inexact).is_ok());
    }

    #[test]
    fn same_value_across_reprs() {
        assert!(Repr::Int(3).same_value(Repr::Float(3.0)));
        assert!(!Repr::Int(3).same_value(Repr::Float(3.5)));
        assert!(Repr::Complex(2.0, 0.0).same_value(Repr::Int(2)));
        assert!(!Repr::Complex(2.0, 1.0).same_value(Repr::Float(2.0)));
        assert!(Repr::Float(f64::NAN).same_value(Repr::Float(f64::NAN)));
        assert!(!Repr::Int(i128::MAX).same_value(Repr::Float(f64::MAX)));
    }

    #[test]
    fn kinds_round_trip_through_ids() {
        for kind in ScalarKind::ALL {
            assert_eq!(ScalarKind::from_id(kind.type_id()), Some(kind));
            assert_eq!(ScalarKind::of(&kind.to_type()), Some(kind));
            assert_eq!(kind.to_type().data_size(), kind.size());
        }
    }
}
