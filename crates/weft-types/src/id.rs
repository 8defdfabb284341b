//! Type kind identifiers and the kind hierarchy.
//!
//! Every concrete type has a leaf [`TypeId`]; the remaining identifiers name
//! abstract kinds that group them. The hierarchy is a tree rooted at
//! [`TypeId::Any`], and [`TypeId::is_base_id_of`] is the "is-a" relation the
//! dispatcher orders overloads by.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a type or an abstract type kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TypeId {
    /// Root of the hierarchy; every type is-a `Any`.
    Any,
    /// Any single value that is not a container.
    Scalar,
    BoolKind,
    IntKind,
    UIntKind,
    FloatKind,
    ComplexKind,
    /// Fixed-width and variable-length strings.
    StringKind,

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
    String,
    FixedString,
    Categorical,

    Option,
    Pointer,
    Tuple,
    /// A tuple whose fields carry names.
    Struct,
}

impl TypeId {
    /// Parent kind in the hierarchy, `None` only for [`TypeId::Any`].
    pub const fn base(self) -> Option<TypeId> {
        use TypeId::*;
        Some(match self {
            Any => return None,
            Scalar | Option | Pointer | Tuple => Any,
            BoolKind | IntKind | UIntKind | FloatKind | ComplexKind | StringKind | Categorical => {
                Scalar
            }
            Bool => BoolKind,
            Int8 | Int16 | Int32 | Int64 => IntKind,
            UInt8 | UInt16 | UInt32 | UInt64 => UIntKind,
            Float16 | Float32 | Float64 => FloatKind,
            Complex64 | Complex128 => ComplexKind,
            String | FixedString => StringKind,
            Struct => Tuple,
        })
    }

    /// Returns true when `self` equals `other` or is one of its ancestors.
    pub fn is_base_id_of(self, other: TypeId) -> bool {
        let mut current = Some(other);
        while let Some(id) = current {
            if id == self {
                return true;
            }
            current = id.base();
        }
        false
    }

    /// True for identifiers that only name a group of types.
    pub const fn is_kind(self) -> bool {
        matches!(
            self,
            TypeId::Any
                | TypeId::Scalar
                | TypeId::BoolKind
                | TypeId::IntKind
                | TypeId::UIntKind
                | TypeId::FloatKind
                | TypeId::ComplexKind
                | TypeId::StringKind
        )
    }

    /// Kind name as written in type patterns, e.g. `Int` for [`TypeId::IntKind`].
    pub const fn kind_name(self) -> Option<&'static str> {
        Some(match self {
            TypeId::Any => "Any",
            TypeId::Scalar => "Scalar",
            TypeId::BoolKind => "Bool",
            TypeId::IntKind => "Int",
            TypeId::UIntKind => "UInt",
            TypeId::FloatKind => "Float",
            TypeId::ComplexKind => "Complex",
            TypeId::StringKind => "String",
            _ => return None,
        })
    }

    /// Inverse of [`TypeId::kind_name`].
    pub fn from_kind_name(name: &str) -> Option<TypeId> {
        Some(match name {
            "Any" => TypeId::Any,
            "Scalar" => TypeId::Scalar,
            "Bool" => TypeId::BoolKind,
            "Int" => TypeId::IntKind,
            "UInt" => TypeId::UIntKind,
            "Float" => TypeId::FloatKind,
            "Complex" => TypeId::ComplexKind,
            "String" => TypeId::StringKind,
            _ => return None,
        })
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TypeId::Bool => "bool",
            TypeId::Int8 => "int8",
            TypeId::Int16 => "int16",
            TypeId::Int32 => "int32",
            TypeId::Int64 => "int64",
            TypeId::UInt8 => "uint8",
            TypeId::UInt16 => "uint16",
            TypeId::UInt32 => "uint32",
            TypeId::UInt64 => "uint64",
            TypeId::Float16 => "float16",
            TypeId::Float32 => "float32",
            TypeId::Float64 => "float64",
            TypeId::Complex64 => "complex64",
            TypeId::Complex128 => "complex128",
            TypeId::String => "string",
            TypeId::FixedString => "fixed_string",
            TypeId::Categorical => "categorical",
            TypeId::Option => "option",
            TypeId::Pointer => "pointer",
            TypeId::Tuple => "tuple",
            TypeId::Struct => "struct",
            kind => kind.kind_name().unwrap_or("?"),
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_id_reaches_any() {
        use TypeId::*;
        for id in [Bool, Int32, UInt8, Float16, Complex128, String, FixedString, Categorical] {
            assert!(Any.is_base_id_of(id));
            assert!(Scalar.is_base_id_of(id));
        }
        for id in [Option, Pointer, Tuple, Struct] {
            assert!(Any.is_base_id_of(id));
            assert!(!Scalar.is_base_id_of(id));
        }
    }

    #[test]
    fn relation_is_reflexive_and_directed() {
        assert!(TypeId::Int32.is_base_id_of(TypeId::Int32));
        assert!(TypeId::IntKind.is_base_id_of(TypeId::Int64));
        assert!(!TypeId::Int64.is_base_id_of(TypeId::IntKind));
        assert!(!TypeId::UIntKind.is_base_id_of(TypeId::Int8));
        assert!(TypeId::Tuple.is_base_id_of(TypeId::Struct));
        assert!(!TypeId::Struct.is_base_id_of(TypeId::Tuple));
    }

    #[test]
    fn kind_names_round_trip() {
        for id in [TypeId::Any, TypeId::Scalar, TypeId::IntKind, TypeId::StringKind] {
            let name = id.kind_name().unwrap();
            assert_eq!(TypeId::from_kind_name(name), Some(id));
        }
        assert_eq!(TypeId::from_kind_name("T"), None);
    }
}
