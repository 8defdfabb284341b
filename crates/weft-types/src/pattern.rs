//! Pattern matching of symbolic types against concrete ones.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::types::{Type, TypeKind};

/// Type-variable bindings accumulated during one resolution.
pub type TypeVars = IndexMap<Arc<str>, Type>;

impl Type {
    /// Matches `candidate` against `self` used as a pattern.
    ///
    /// On success new variable bindings are added to `vars`; on failure
    /// `vars` is left untouched.
    pub fn matches(&self, candidate: &Type, vars: &mut TypeVars) -> bool {
        let mut scratch = vars.clone();
        if match_into(self, candidate, &mut scratch) {
            *vars = scratch;
            true
        } else {
            false
        }
    }

    /// Replaces bound type variables; unbound ones are kept.
    pub fn substitute(&self, vars: &TypeVars) -> Type {
        match self.kind() {
            TypeKind::TypeVar(name) => vars.get(name).cloned().unwrap_or_else(|| self.clone()),
            TypeKind::Option(inner) => Type::option(inner.substitute(vars)),
            TypeKind::Pointer(inner) => Type::pointer(inner.substitute(vars)),
            TypeKind::Tuple { fields } => Type::tuple(fields.iter().map(|f| f.substitute(vars))),
            TypeKind::Struct { names, fields } => Type::new(TypeKind::Struct {
                names: names.clone(),
                fields: fields.iter().map(|f| f.substitute(vars)).collect(),
            }),
            _ => self.clone(),
        }
    }
}

fn match_into(pattern: &Type, candidate: &Type, vars: &mut TypeVars) -> bool {
    match (pattern.kind(), candidate.kind()) {
        (TypeKind::TypeVar(name), _) => match vars.get(name) {
            Some(bound) => bound == candidate,
            None => {
                vars.insert(name.clone(), candidate.clone());
                true
            }
        },
        (TypeKind::Kind(kind), _) => kind.is_base_id_of(candidate.id()),
        (TypeKind::Option(p), TypeKind::Option(c)) | (TypeKind::Pointer(p), TypeKind::Pointer(c)) => {
            match_into(p, c, vars)
        }
        (TypeKind::Tuple { fields: p }, TypeKind::Tuple { fields: c }) => {
            p.len() == c.len() && p.iter().zip(c.iter()).all(|(p, c)| match_into(p, c, vars))
        }
        (
            TypeKind::Struct {
                names: pn,
                fields: pf,
            },
            TypeKind::Struct {
                names: cn,
                fields: cf,
            },
        ) => pn == cn && pf.iter().zip(cf.iter()).all(|(p, c)| match_into(p, c, vars)),
        _ => pattern == candidate,
    }
}
