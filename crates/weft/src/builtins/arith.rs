//! Binary arithmetic callables.
//!
//! Same-kind operands with a matching destination resolve to one leaf
//! kernel. Everything else goes through a promoting composite: both operands
//! are cast to their common type, the operation runs there and the result
//! is cast to the destination when it differs.

use std::sync::OnceLock;

use weft_kernels::arith::{BinaryOp, PromotedBinary, emplace_binary, promote};
use weft_kernels::{AssignErrorMode, BuildError, CallGraph, ScalarKind};
use weft_types::{Type, TypeId, TypeVars};

use super::{assign_with_mode, register};
use crate::callable::{Callable, Kwds, ResolveContext, Signature, Value, require_concrete};
use crate::config::DispatchConfig;
use crate::dispatch::ConcurrentDispatcher;
use crate::error::{Error, Result};

/// `add`, `subtract`, `multiply` or `divide`.
///
/// Overloads map operand ids to the kind a direct kernel exists for; the
/// `(Scalar, Scalar)` fallback maps to `None` and always promotes.
pub struct Arithmetic {
    op: BinaryOp,
    signature: Signature,
    overloads: ConcurrentDispatcher<Option<ScalarKind>>,
}

impl Arithmetic {
    pub fn new(op: BinaryOp, dispatch: &DispatchConfig) -> Self {
        let overloads = ConcurrentDispatcher::from_config(dispatch);
        register(&overloads, op.name(), [TypeId::Scalar, TypeId::Scalar], None);
        for kind in ScalarKind::ALL {
            if kind != ScalarKind::Bool {
                let id = kind.type_id();
                register(&overloads, op.name(), [id, id], Some(kind));
            }
        }
        Self {
            op,
            signature: Signature::new(
                [Type::any_of(TypeId::Scalar), Type::any_of(TypeId::Scalar)],
                Type::any(),
            )
            .with_keyword(Kwds::ERROR_MODE, Value::Missing),
            overloads,
        }
    }

    pub fn op(&self) -> BinaryOp {
        self.op
    }
}

fn push_op(graph: &mut CallGraph, kind: ScalarKind, op: BinaryOp) {
    graph.push(move |kb, _, _, _| {
        emplace_binary(kb, kind, op).ok_or_else(|| {
            BuildError::ArrmetaMismatch(format!("no {op} kernel for {kind}"))
        })
    });
}

impl Callable for Arithmetic {
    fn name(&self) -> &str {
        self.op.name()
    }

    fn signature(&self) -> &Signature {
        &self.signature
    }

    fn resolve(
        &self,
        _caller: Option<&dyn Callable>,
        ctx: ResolveContext<'_>,
        graph: &mut CallGraph,
        dst: &Type,
        src: &[Type],
        kwds: &Kwds,
        _tp_vars: &mut TypeVars,
    ) -> Result<Type> {
        let [lhs, rhs] = src else {
            return Err(Error::Arity {
                callable: self.name().to_string(),
                expected: 2,
                actual: src.len(),
            });
        };
        require_concrete(lhs)?;
        require_concrete(rhs)?;
        let mode = kwds.error_mode(ctx.config().default_error_mode)?;
        let direct = self.overloads.resolve(&[lhs.id(), rhs.id()])?;

        let (Some(l), Some(r)) = (ScalarKind::of(lhs), ScalarKind::of(rhs)) else {
            let operand = if ScalarKind::of(lhs).is_none() { lhs } else { rhs };
            return Err(Error::NoAssignment {
                dst: dst.clone(),
                src: operand.clone(),
            });
        };
        let Some(promoted) = promote(l, r) else {
            let operand = if l == ScalarKind::Bool { lhs } else { rhs };
            return Err(Error::NoAssignment {
                dst: dst.clone(),
                src: operand.clone(),
            });
        };
        let promoted_type = promoted.to_type();
        let out = if dst.is_concrete() {
            dst.clone()
        } else {
            promoted_type.clone()
        };

        if let Some(kind) = direct
            && ScalarKind::of(&out) == Some(kind)
        {
            push_op(graph, kind, self.op);
            return Ok(out);
        }

        let cast_result = out != promoted_type;
        graph.push(move |kb, request, d, s| PromotedBinary::build(kb, request, cast_result, d, s));
        let child = ctx.descend()?;
        // Promotion never narrows; 64-bit integer pairs widened to float64
        // round like the float operation itself would.
        assign_with_mode(child, graph, &promoted_type, lhs, AssignErrorMode::NoCheck)?;
        assign_with_mode(child, graph, &promoted_type, rhs, AssignErrorMode::NoCheck)?;
        push_op(graph, promoted, self.op);
        if cast_result {
            assign_with_mode(child, graph, &out, &promoted_type, mode)?;
        }
        Ok(out)
    }
}

fn arithmetic(cell: &'static OnceLock<Arithmetic>, op: BinaryOp) -> &'static dyn Callable {
    cell.get_or_init(|| Arithmetic::new(op, &DispatchConfig::default()))
}

pub fn add() -> &'static dyn Callable {
    static ADD: OnceLock<Arithmetic> = OnceLock::new();
    arithmetic(&ADD, BinaryOp::Add)
}

pub fn subtract() -> &'static dyn Callable {
    static SUBTRACT: OnceLock<Arithmetic> = OnceLock::new();
    arithmetic(&SUBTRACT, BinaryOp::Subtract)
}

pub fn multiply() -> &'static dyn Callable {
    static MULTIPLY: OnceLock<Arithmetic> = OnceLock::new();
    arithmetic(&MULTIPLY, BinaryOp::Multiply)
}

pub fn divide() -> &'static dyn Callable {
    static DIVIDE: OnceLock<Arithmetic> = OnceLock::new();
    arithmetic(&DIVIDE, BinaryOp::Divide)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    fn resolve(dst: &Type, lhs: Type, rhs: Type) -> Result<(Type, usize)> {
        let config = EngineConfig::default();
        let mut graph = CallGraph::new();
        let out = add().resolve(
            None,
            ResolveContext::new(&config),
            &mut graph,
            dst,
            &[lhs, rhs],
            &Kwds::new(),
            &mut TypeVars::new(),
        )?;
        Ok((out, graph.len()))
    }

    #[test]
    fn same_kind_is_a_single_leaf() {
        assert_eq!(
            resolve(&Type::any(), Type::int32(), Type::int32()).unwrap(),
            (Type::int32(), 1)
        );
        assert_eq!(
            resolve(&Type::float64(), Type::float64(), Type::float64()).unwrap(),
            (Type::float64(), 1)
        );
    }

    #[test]
    fn mixed_kinds_promote() {
        // composite, two casts, op
        assert_eq!(
            resolve(&Type::any(), Type::int8(), Type::float32()).unwrap(),
            (Type::float32(), 4)
        );
        // plus the result cast
        assert_eq!(
            resolve(&Type::int64(), Type::int8(), Type::int16()).unwrap(),
            (Type::int64(), 5)
        );
        // same kinds but a different destination
        assert_eq!(
            resolve(&Type::float64(), Type::int32(), Type::int32()).unwrap(),
            (Type::float64(), 5)
        );
    }

    #[test]
    fn bool_and_non_numeric_operands_are_rejected() {
        assert!(matches!(
            resolve(&Type::any(), Type::bool(), Type::int8()),
            Err(Error::NoAssignment { ref src, .. }) if *src == Type::bool()
        ));
        assert!(matches!(
            resolve(&Type::any(), Type::int8(), Type::string()),
            Err(Error::NoAssignment { .. })
        ));
    }
}
