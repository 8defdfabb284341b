//! Out-of-band layout metadata.
//!
//! Kernels never inspect types at execution time, so anything about a value's
//! physical layout that is not fixed by its type (field offsets of a tuple or
//! struct) travels separately as [`Arrmeta`]. Makers read it once while the
//! kernel chain is built and bake the numbers into kernel records.

use crate::types::{Type, TypeKind};

/// Layout metadata accompanying one value of a concrete type.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Arrmeta {
    /// Types whose layout is fully determined by the type itself.
    #[default]
    Empty,
    /// Tuple or struct: byte offset of each field and each field's metadata.
    Fields {
        data_offsets: Vec<usize>,
        fields: Vec<Arrmeta>,
    },
    /// Option payload metadata.
    Option(Box<Arrmeta>),
    /// Metadata of the value a pointer refers to.
    Pointer(Box<Arrmeta>),
}

impl Arrmeta {
    /// Metadata for the default C-like layout of `tp`.
    pub fn default_for(tp: &Type) -> Self {
        match tp.kind() {
            TypeKind::Tuple { fields } | TypeKind::Struct { fields, .. } => Arrmeta::Fields {
                data_offsets: tp.default_data_offsets(),
                fields: fields.iter().map(Arrmeta::default_for).collect(),
            },
            TypeKind::Option(inner) => Arrmeta::Option(Box::new(Arrmeta::default_for(inner))),
            TypeKind::Pointer(target) => Arrmeta::Pointer(Box::new(Arrmeta::default_for(target))),
            _ => Arrmeta::Empty,
        }
    }

    /// Field metadata with explicit offsets, for custom layouts.
    pub fn fields(data_offsets: Vec<usize>, fields: Vec<Arrmeta>) -> Self {
        Arrmeta::Fields {
            data_offsets,
            fields,
        }
    }

    /// Number of fields described, zero for non-field metadata.
    pub fn field_count(&self) -> usize {
        match self {
            Arrmeta::Fields { data_offsets, .. } => data_offsets.len(),
            _ => 0,
        }
    }

    pub fn data_offset(&self, index: usize) -> Option<usize> {
        match self {
            Arrmeta::Fields { data_offsets, .. } => data_offsets.get(index).copied(),
            _ => None,
        }
    }

    pub fn field(&self, index: usize) -> Option<&Arrmeta> {
        match self {
            Arrmeta::Fields { fields, .. } => fields.get(index),
            _ => None,
        }
    }

    /// Payload metadata of an option; other metadata describes its own payload.
    pub fn option_value(&self) -> &Arrmeta {
        match self {
            Arrmeta::Option(inner) => inner,
            other => other,
        }
    }

    pub fn pointer_target(&self) -> Option<&Arrmeta> {
        match self {
            Arrmeta::Pointer(inner) => Some(inner),
            _ => None,
        }
    }
}
