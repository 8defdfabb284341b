//! The `is_missing` and `assign_missing` callables.

use std::sync::OnceLock;

use weft_kernels::missing::{AssignMissing, IsMissing};
use weft_kernels::{CallGraph, Missing};
use weft_types::{Type, TypeVars};

use crate::callable::{Callable, Kwds, ResolveContext, Signature, require_concrete};
use crate::error::{Error, Result};

/// Missing representation of `tp`, looking through one option level.
fn representation(tp: &Type) -> Result<Missing> {
    require_concrete(tp)?;
    let payload = tp.option_value().unwrap_or(tp);
    Missing::of(payload).ok_or_else(|| Error::NoMissingValue(payload.clone()))
}

/// Tests each element for the missing value of its type; yields `bool`.
pub struct IsMissingCallable {
    signature: Signature,
}

impl Callable for IsMissingCallable {
    fn name(&self) -> &str {
        "is_missing"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn resolve(
        &self,
        _caller: Option<&dyn Callable>,
        _ctx: ResolveContext<'_>,
        graph: &mut CallGraph,
        dst: &Type,
        src: &[Type],
        _kwds: &Kwds,
        _tp_vars: &mut TypeVars,
    ) -> Result<Type> {
        let [src] = src else {
            return Err(Error::Arity {
                callable: self.name().to_string(),
                expected: 1,
                actual: src.len(),
            });
        };
        if dst.is_concrete() && *dst != Type::bool() {
            return Err(Error::NoAssignment {
                dst: dst.clone(),
                src: Type::bool(),
            });
        }
        let missing = representation(src)?;
        graph.push(move |kb, _, _, _| Ok(kb.emplace(IsMissing::new(missing))));
        Ok(Type::bool())
    }
}

/// Writes the missing value of the destination type; takes no sources.
pub struct AssignMissingCallable {
    signature: Signature,
}

impl Callable for AssignMissingCallable {
    fn name(&self) -> &str {
        "assign_missing"
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn resolve(
        &self,
        _caller: Option<&dyn Callable>,
        _ctx: ResolveContext<'_>,
        graph: &mut CallGraph,
        dst: &Type,
        src: &[Type],
        _kwds: &Kwds,
        _tp_vars: &mut TypeVars,
    ) -> Result<Type> {
        if !src.is_empty() {
            return Err(Error::Arity {
                callable: self.name().to_string(),
                expected: 0,
                actual: src.len(),
            });
        }
        let missing = representation(dst)?;
        graph.push(move |kb, _, _, _| Ok(kb.emplace(AssignMissing::new(missing))));
        Ok(dst.clone())
    }
}

pub fn is_missing() -> &'static dyn Callable {
    static IS_MISSING: OnceLock<IsMissingCallable> = OnceLock::new();
    IS_MISSING.get_or_init(|| IsMissingCallable {
        signature: Signature::new([Type::any()], Type::bool()),
    })
}

pub fn assign_missing() -> &'static dyn Callable {
    static ASSIGN_MISSING: OnceLock<AssignMissingCallable> = OnceLock::new();
    ASSIGN_MISSING.get_or_init(|| AssignMissingCallable {
        signature: Signature::new([], Type::any()),
    })
}
