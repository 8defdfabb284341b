//! Type descriptors.
//!
//! A [`Type`] is a cheaply clonable, structurally compared tree. Concrete
//! types describe data that kernels read and write; symbolic types
//! ([`TypeKind::Kind`] and [`TypeKind::TypeVar`]) only appear in callable
//! signatures and are resolved away by pattern matching.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::complex::Complex;
use crate::id::TypeId;
use crate::string::StringData;

/// Code-unit encoding of string data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StringEncoding {
    Ascii,
    #[default]
    Utf8,
    Utf16,
    Utf32,
}

impl StringEncoding {
    /// Size in bytes of one code unit.
    pub const fn unit_size(self) -> usize {
        match self {
            StringEncoding::Ascii | StringEncoding::Utf8 => 1,
            StringEncoding::Utf16 => 2,
            StringEncoding::Utf32 => 4,
        }
    }

    /// Name used in type strings, e.g. `'utf16'`.
    pub const fn name(self) -> &'static str {
        match self {
            StringEncoding::Ascii => "ascii",
            StringEncoding::Utf8 => "utf8",
            StringEncoding::Utf16 => "utf16",
            StringEncoding::Utf32 => "utf32",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.to_ascii_lowercase().as_str() {
            "ascii" | "us-ascii" => StringEncoding::Ascii,
            "utf8" | "utf-8" => StringEncoding::Utf8,
            "utf16" | "utf-16" | "ucs2" => StringEncoding::Utf16,
            "utf32" | "utf-32" => StringEncoding::Utf32,
            _ => return None,
        })
    }
}

/// Structural content of a [`Type`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeKind {
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
    /// Variable-length string stored out of line in a [`StringData`] slot.
    String { encoding: StringEncoding },
    /// Inline string of `size` code units, NUL padded.
    FixedString { size: usize, encoding: StringEncoding },
    /// Index into a fixed list of category names.
    Categorical { categories: Arc<[String]> },
    /// Nullable wrapper; the missing value is a sentinel in the payload's own bytes.
    Option(Type),
    /// Address of a value of the target type.
    Pointer(Type),
    Tuple { fields: Arc<[Type]> },
    Struct { names: Arc<[String]>, fields: Arc<[Type]> },
    /// Symbolic: any type whose id descends from the given kind.
    Kind(TypeId),
    /// Symbolic: binds to one concrete type per resolution.
    TypeVar(Arc<str>),
}

/// Reference-counted type descriptor.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Type(Arc<TypeKind>);

impl Type {
    pub fn new(kind: TypeKind) -> Self {
        Self(Arc::new(kind))
    }

    pub fn kind(&self) -> &TypeKind {
        &self.0
    }

    pub fn bool() -> Self {
        Self::new(TypeKind::Bool)
    }

    pub fn int8() -> Self {
        Self::new(TypeKind::Int8)
    }

    pub fn int16() -> Self {
        Self::new(TypeKind::Int16)
    }

    pub fn int32() -> Self {
        Self::new(TypeKind::Int32)
    }

    pub fn int64() -> Self {
        Self::new(TypeKind::Int64)
    }

    pub fn uint8() -> Self {
        Self::new(TypeKind::UInt8)
    }

    pub fn uint16() -> Self {
        Self::new(TypeKind::UInt16)
    }

    pub fn uint32() -> Self {
        Self::new(TypeKind::UInt32)
    }

    pub fn uint64() -> Self {
        Self::new(TypeKind::UInt64)
    }

    pub fn float16() -> Self {
        Self::new(TypeKind::Float16)
    }

    pub fn float32() -> Self {
        Self::new(TypeKind::Float32)
    }

    pub fn float64() -> Self {
        Self::new(TypeKind::Float64)
    }

    pub fn complex64() -> Self {
        Self::new(TypeKind::Complex64)
    }

    pub fn complex128() -> Self {
        Self::new(TypeKind::Complex128)
    }

    /// UTF-8 variable-length string.
    pub fn string() -> Self {
        Self::new(TypeKind::String {
            encoding: StringEncoding::Utf8,
        })
    }

    pub fn string_with(encoding: StringEncoding) -> Self {
        Self::new(TypeKind::String { encoding })
    }

    pub fn fixed_string(size: usize, encoding: StringEncoding) -> Self {
        Self::new(TypeKind::FixedString { size, encoding })
    }

    pub fn categorical<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(TypeKind::Categorical {
            categories: categories.into_iter().map(Into::into).collect(),
        })
    }

    pub fn option(value: Type) -> Self {
        Self::new(TypeKind::Option(value))
    }

    pub fn pointer(target: Type) -> Self {
        Self::new(TypeKind::Pointer(target))
    }

    pub fn tuple(fields: impl IntoIterator<Item = Type>) -> Self {
        Self::new(TypeKind::Tuple {
            fields: fields.into_iter().collect(),
        })
    }

    pub fn structure<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Type)>,
        S: Into<String>,
    {
        let (names, fields): (Vec<String>, Vec<Type>) =
            fields.into_iter().map(|(n, t)| (n.into(), t)).unzip();
        Self::new(TypeKind::Struct {
            names: names.into(),
            fields: fields.into(),
        })
    }

    /// Symbolic pattern matching any type of the given kind.
    pub fn any_of(kind: TypeId) -> Self {
        Self::new(TypeKind::Kind(kind))
    }

    pub fn any() -> Self {
        Self::any_of(TypeId::Any)
    }

    pub fn var(name: &str) -> Self {
        Self::new(TypeKind::TypeVar(name.into()))
    }

    /// Leaf id of a concrete type, or the kind a symbolic type stands for.
    pub fn id(&self) -> TypeId {
        match self.kind() {
            TypeKind::Bool => TypeId::Bool,
            TypeKind::Int8 => TypeId::Int8,
            TypeKind::Int16 => TypeId::Int16,
            TypeKind::Int32 => TypeId::Int32,
            TypeKind::Int64 => TypeId::Int64,
            TypeKind::UInt8 => TypeId::UInt8,
            TypeKind::UInt16 => TypeId::UInt16,
            TypeKind::UInt32 => TypeId::UInt32,
            TypeKind::UInt64 => TypeId::UInt64,
            TypeKind::Float16 => TypeId::Float16,
            TypeKind::Float32 => TypeId::Float32,
            TypeKind::Float64 => TypeId::Float64,
            TypeKind::Complex64 => TypeId::Complex64,
            TypeKind::Complex128 => TypeId::Complex128,
            TypeKind::String { .. } => TypeId::String,
            TypeKind::FixedString { .. } => TypeId::FixedString,
            TypeKind::Categorical { .. } => TypeId::Categorical,
            TypeKind::Option(_) => TypeId::Option,
            TypeKind::Pointer(_) => TypeId::Pointer,
            TypeKind::Tuple { .. } => TypeId::Tuple,
            TypeKind::Struct { .. } => TypeId::Struct,
            TypeKind::Kind(id) => *id,
            TypeKind::TypeVar(_) => TypeId::Any,
        }
    }

    /// True when no kind pattern or type variable occurs anywhere in the tree.
    pub fn is_concrete(&self) -> bool {
        match self.kind() {
            TypeKind::Kind(_) | TypeKind::TypeVar(_) => false,
            TypeKind::Option(inner) | TypeKind::Pointer(inner) => inner.is_concrete(),
            TypeKind::Tuple { fields } | TypeKind::Struct { fields, .. } => {
                fields.iter().all(Type::is_concrete)
            }
            _ => true,
        }
    }

    /// True for the bool, integer, float and complex scalars.
    pub fn is_numeric(&self) -> bool {
        let id = self.id();
        !id.is_kind()
            && [
                TypeId::BoolKind,
                TypeId::IntKind,
                TypeId::UIntKind,
                TypeId::FloatKind,
                TypeId::ComplexKind,
            ]
            .iter()
            .any(|kind| kind.is_base_id_of(id))
    }

    pub fn is_string(&self) -> bool {
        matches!(
            self.kind(),
            TypeKind::String { .. } | TypeKind::FixedString { .. }
        )
    }

    /// Encoding of a string type.
    pub fn string_encoding(&self) -> Option<StringEncoding> {
        match self.kind() {
            TypeKind::String { encoding } | TypeKind::FixedString { encoding, .. } => {
                Some(*encoding)
            }
            _ => None,
        }
    }

    /// Payload of an option type.
    pub fn option_value(&self) -> Option<&Type> {
        match self.kind() {
            TypeKind::Option(inner) => Some(inner),
            _ => None,
        }
    }

    pub fn pointer_target(&self) -> Option<&Type> {
        match self.kind() {
            TypeKind::Pointer(inner) => Some(inner),
            _ => None,
        }
    }

    /// Field types of a tuple or struct.
    pub fn fields(&self) -> Option<&[Type]> {
        match self.kind() {
            TypeKind::Tuple { fields } | TypeKind::Struct { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Field names of a struct.
    pub fn field_names(&self) -> Option<&[String]> {
        match self.kind() {
            TypeKind::Struct { names, .. } => Some(names),
            _ => None,
        }
    }

    pub fn categories(&self) -> Option<&[String]> {
        match self.kind() {
            TypeKind::Categorical { categories } => Some(categories),
            _ => None,
        }
    }

    /// Size in bytes of one element; zero for symbolic types.
    pub fn data_size(&self) -> usize {
        match self.kind() {
            TypeKind::Bool | TypeKind::Int8 | TypeKind::UInt8 => 1,
            TypeKind::Int16 | TypeKind::UInt16 | TypeKind::Float16 => 2,
            TypeKind::Int32 | TypeKind::UInt32 | TypeKind::Float32 => 4,
            TypeKind::Int64 | TypeKind::UInt64 | TypeKind::Float64 => 8,
            TypeKind::Complex64 => size_of::<Complex<f32>>(),
            TypeKind::Complex128 => size_of::<Complex<f64>>(),
            TypeKind::String { .. } => size_of::<StringData>(),
            TypeKind::FixedString { size, encoding } => size * encoding.unit_size(),
            TypeKind::Categorical { categories } => category_storage_size(categories.len()),
            TypeKind::Option(inner) => inner.data_size(),
            TypeKind::Pointer(_) => size_of::<*const u8>(),
            TypeKind::Tuple { fields } | TypeKind::Struct { fields, .. } => {
                let (_, size) = layout_fields(fields);
                size
            }
            TypeKind::Kind(_) | TypeKind::TypeVar(_) => 0,
        }
    }

    /// Required alignment of one element; one for symbolic types.
    pub fn data_alignment(&self) -> usize {
        match self.kind() {
            TypeKind::Complex64 => align_of::<Complex<f32>>(),
            TypeKind::Complex128 => align_of::<Complex<f64>>(),
            TypeKind::String { .. } => align_of::<StringData>(),
            TypeKind::FixedString { encoding, .. } => encoding.unit_size(),
            TypeKind::Option(inner) => inner.data_alignment(),
            TypeKind::Pointer(_) => align_of::<*const u8>(),
            TypeKind::Tuple { fields } | TypeKind::Struct { fields, .. } => fields
                .iter()
                .map(Type::data_alignment)
                .max()
                .unwrap_or(1),
            TypeKind::Kind(_) | TypeKind::TypeVar(_) => 1,
            _ => self.data_size().max(1),
        }
    }

    /// Offsets of each field under the default C-like layout.
    pub fn default_data_offsets(&self) -> Vec<usize> {
        match self.fields() {
            Some(fields) => layout_fields(fields).0,
            None => Vec::new(),
        }
    }
}

/// Bytes of storage used for a categorical index with `count` categories.
///
/// The largest storage value is reserved as the missing marker.
pub const fn category_storage_size(count: usize) -> usize {
    if count < u8::MAX as usize {
        1
    } else if count < u16::MAX as usize {
        2
    } else {
        4
    }
}

fn layout_fields(fields: &[Type]) -> (Vec<usize>, usize) {
    let mut offsets = Vec::with_capacity(fields.len());
    let mut cursor = 0usize;
    let mut max_align = 1usize;
    for field in fields {
        let align = field.data_alignment();
        max_align = max_align.max(align);
        cursor = cursor.next_multiple_of(align);
        offsets.push(cursor);
        cursor += field.data_size();
    }
    (offsets, cursor.next_multiple_of(max_align))
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Type({self})")
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            TypeKind::String { encoding } if *encoding == StringEncoding::Utf8 => {
                f.write_str("string")
            }
            TypeKind::String { encoding } => write!(f, "string['{}']", encoding.name()),
            TypeKind::FixedString { size, encoding } => {
                write!(f, "fixed_string[{size}, '{}']", encoding.name())
            }
            TypeKind::Categorical { categories } => {
                f.write_str("categorical[")?;
                for (i, category) in categories.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "'{}'", category.replace('\\', "\\\\").replace('\'', "\\'"))?;
                }
                f.write_str("]")
            }
            TypeKind::Option(inner) => write!(f, "?{inner}"),
            TypeKind::Pointer(inner) => write!(f, "pointer[{inner}]"),
            TypeKind::Tuple { fields } => {
                f.write_str("(")?;
                for (i, field) in fields.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{field}")?;
                }
                f.write_str(")")
            }
            TypeKind::Struct { names, fields } => {
                f.write_str("{")?;
                for (i, (name, field)) in names.iter().zip(fields.iter()).enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{name}: {field}")?;
                }
                f.write_str("}")
            }
            TypeKind::Kind(id) => write!(f, "{}", id.kind_name().unwrap_or("Any")),
            TypeKind::TypeVar(name) => f.write_str(name),
            _ => write!(f, "{}", self.id()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structural_equality() {
        let a = Type::structure([("x", Type::int32()), ("y", Type::float64())]);
        let b = Type::structure([("x", Type::int32()), ("y", Type::float64())]);
        let c = Type::structure([("y", Type::float64()), ("x", Type::int32())]);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(Type::option(Type::int8()), Type::option(Type::int8()));
        assert_ne!(Type::string(), Type::string_with(StringEncoding::Utf16));
    }

    #[test]
    fn default_layout_pads_for_alignment() {
        let tp = Type::tuple([Type::int8(), Type::float64(), Type::int16()]);
        assert_eq!(tp.default_data_offsets(), vec![0, 8, 16]);
        assert_eq!(tp.data_size(), 24);
        assert_eq!(tp.data_alignment(), 8);
    }

    #[test]
    fn sizes_of_strings_and_categoricals() {
        assert_eq!(Type::fixed_string(4, StringEncoding::Utf32).data_size(), 16);
        assert_eq!(Type::fixed_string(4, StringEncoding::Utf16).data_alignment(), 2);
        assert_eq!(Type::string().data_size(), size_of::<StringData>());
        assert_eq!(Type::categorical(["a", "b"]).data_size(), 1);
        let many: Vec<String> = (0..300).map(|i| i.to_string()).collect();
        assert_eq!(Type::categorical(many).data_size(), 2);
    }

    #[test]
    fn concreteness() {
        assert!(Type::tuple([Type::int32(), Type::string()]).is_concrete());
        assert!(!Type::option(Type::var("T")).is_concrete());
        assert!(!Type::any_of(TypeId::IntKind).is_concrete());
    }

    #[test]
    fn numeric_classification() {
        assert!(Type::bool().is_numeric());
        assert!(Type::complex64().is_numeric());
        assert!(!Type::string().is_numeric());
        assert!(!Type::any_of(TypeId::IntKind).is_numeric());
        assert!(!Type::categorical(["a"]).is_numeric());
    }
}
