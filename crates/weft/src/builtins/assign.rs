//! The `assign` callable.
//!
//! Dispatches on the (destination, source) id pair. Scalar pairs become
//! single leaf kernels; options, tuples, structs and pointers become
//! composites whose children are resolved by recursing into `assign` for
//! each constituent. Every composite pushes its own maker before resolving
//! its children, so the call graph is a depth-first pre-order of the kernel
//! tree.

use std::sync::{Arc, OnceLock};

use tracing::trace;
use weft_kernels::categorical::{CategoricalRemap, CategoricalToString, StringToCategorical};
use weft_kernels::fieldwise::FieldwiseAssign;
use weft_kernels::lattice::CopyAssign;
use weft_kernels::missing::{AssignMissing, IsMissing};
use weft_kernels::option::{OptionAssign, OptionToValue, StringToOption};
use weft_kernels::pointer::DerefAssign;
use weft_kernels::string::{StringAssign, StringSlot, emplace_from_string, emplace_to_string};
use weft_kernels::{AssignErrorMode, AssignLattice, CallGraph, Missing, ScalarKind};
use weft_types::{StringEncoding, Type, TypeId, TypeKind, TypeVars};

use super::register;
use crate::callable::{Callable, Kwds, ResolveContext, Signature, Value, require_concrete};
use crate::config::DispatchConfig;
use crate::dispatch::ConcurrentDispatcher;
use crate::error::{DispatchError, Error, Result};

/// Resolves one (destination, source) pair under a concrete error mode.
pub type AssignFn =
    fn(ResolveContext<'_>, &mut CallGraph, &Type, &Type, AssignErrorMode) -> Result<Type>;

/// Assignment of one value into another, converting as needed.
pub struct Assign {
    signature: Signature,
    overloads: ConcurrentDispatcher<AssignFn>,
}

impl Assign {
    pub fn new(dispatch: &DispatchConfig) -> Self {
        let overloads = ConcurrentDispatcher::from_config(dispatch);
        let table: [([TypeId; 2], AssignFn); 13] = [
            ([TypeId::Scalar, TypeId::Scalar], numeric),
            ([TypeId::StringKind, TypeId::Scalar], number_to_string),
            ([TypeId::Scalar, TypeId::StringKind], string_to_number),
            ([TypeId::StringKind, TypeId::StringKind], string_to_string),
            ([TypeId::Categorical, TypeId::StringKind], string_to_categorical),
            ([TypeId::StringKind, TypeId::Categorical], categorical_to_string),
            ([TypeId::Categorical, TypeId::Categorical], categorical_to_categorical),
            ([TypeId::Option, TypeId::Any], option_from_value),
            ([TypeId::Option, TypeId::StringKind], option_from_string),
            ([TypeId::Option, TypeId::Option], option_from_option),
            ([TypeId::Any, TypeId::Option], value_from_option),
            ([TypeId::Tuple, TypeId::Tuple], fieldwise),
            ([TypeId::Any, TypeId::Pointer], deref),
        ];
        for (params, resolve) in table {
            register(&overloads, "assign", params, resolve);
        }
        Self {
            signature: Signature::new([Type::any()], Type::any())
                .with_keyword(Kwds::ERROR_MODE, Value::Missing),
            overloads,
        }
    }

    /// Overloads in resolution order.
    pub fn overloads(&self) -> &ConcurrentDispatcher<AssignFn> {
        &self.overloads
    }

    fn resolve_pair(
        &self,
        ctx: ResolveContext<'_>,
        graph: &mut CallGraph,
        dst: &Type,
        src: &Type,
        mode: AssignErrorMode,
    ) -> Result<Type> {
        require_concrete(dst)?;
        require_concrete(src)?;
        let resolve = self
            .overloads
            .resolve(&[dst.id(), src.id()])
            .map_err(|err| match err {
                DispatchError::NoApplicableOverload { .. } => no_assignment(dst, src),
                other => other.into(),
            })?;
        trace!(%dst, %src, %mode, depth = ctx.depth(), "resolving assignment");
        resolve(ctx, graph, dst, src, mode)
    }
}

impl Callable for Assign {
    fn name(&self) -> &str {
        "assign"
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
        let [src] = src else {
            return Err(Error::Arity {
                callable: self.name().to_string(),
                expected: 1,
                actual: src.len(),
            });
        };
        let mode = kwds.error_mode(ctx.config().default_error_mode)?;
        self.resolve_pair(ctx, graph, dst, src, mode)
    }
}

fn instance() -> &'static Assign {
    static ASSIGN: OnceLock<Assign> = OnceLock::new();
    ASSIGN.get_or_init(|| Assign::new(&DispatchConfig::default()))
}

/// The shared `assign` callable.
pub fn assign() -> &'static dyn Callable {
    instance()
}

/// Resolves `dst <- src` with an already concrete error mode, as a
/// constituent of another callable.
pub(crate) fn assign_with_mode(
    ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    instance().resolve_pair(ctx, graph, dst, src, mode)
}

fn no_assignment(dst: &Type, src: &Type) -> Error {
    Error::NoAssignment {
        dst: dst.clone(),
        src: src.clone(),
    }
}

fn push_is_missing(graph: &mut CallGraph, missing: Missing) {
    graph.push(move |kb, _, _, _| Ok(kb.emplace(IsMissing::new(missing))));
}

fn push_assign_missing(graph: &mut CallGraph, missing: Missing) {
    graph.push(move |kb, _, _, _| Ok(kb.emplace(AssignMissing::new(missing))));
}

fn missing_of(payload: &Type) -> Result<Missing> {
    Missing::of(payload).ok_or_else(|| Error::NoMissingValue(payload.clone()))
}

fn string_slot(tp: &Type, other: &Type, dst_side: bool) -> Result<(StringSlot, StringEncoding)> {
    StringSlot::of(tp).ok_or_else(|| {
        if dst_side {
            no_assignment(tp, other)
        } else {
            no_assignment(other, tp)
        }
    })
}

fn numeric(
    _ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    let (Some(d), Some(s)) = (ScalarKind::of(dst), ScalarKind::of(src)) else {
        return Err(no_assignment(dst, src));
    };
    let (mode, emplace) = AssignLattice::global()
        .lookup(d, s, mode)
        .ok_or_else(|| no_assignment(dst, src))?;
    graph.push(move |kb, _, _, _| Ok(emplace(kb, mode)));
    Ok(dst.clone())
}

fn number_to_string(
    _ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    let slot = string_slot(dst, src, true)?;
    let kind = ScalarKind::of(src).ok_or_else(|| no_assignment(dst, src))?;
    graph.push(move |kb, _, _, _| Ok(emplace_to_string(kb, kind, slot, mode)));
    Ok(dst.clone())
}

fn string_to_number(
    _ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    let slot = string_slot(src, dst, false)?;
    let kind = ScalarKind::of(dst).ok_or_else(|| no_assignment(dst, src))?;
    graph.push(move |kb, _, _, _| Ok(emplace_from_string(kb, kind, slot, mode)));
    Ok(dst.clone())
}

fn string_to_string(
    _ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    let kernel = StringAssign::new(string_slot(dst, src, true)?, string_slot(src, dst, false)?, mode);
    graph.push(move |kb, _, _, _| Ok(kb.emplace(kernel)));
    Ok(dst.clone())
}

fn string_to_categorical(
    _ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    let categories = dst.categories().ok_or_else(|| no_assignment(dst, src))?;
    let kernel = StringToCategorical::new(categories, string_slot(src, dst, false)?, mode);
    graph.push(move |kb, _, _, _| Ok(kb.emplace(kernel)));
    Ok(dst.clone())
}

fn categorical_to_string(
    _ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    let categories = src.categories().ok_or_else(|| no_assignment(dst, src))?;
    let kernel = CategoricalToString::new(categories, string_slot(dst, src, true)?, mode);
    graph.push(move |kb, _, _, _| Ok(kb.emplace(kernel)));
    Ok(dst.clone())
}

fn categorical_to_categorical(
    _ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    _mode: AssignErrorMode,
) -> Result<Type> {
    let (Some(dst_categories), TypeKind::Categorical { categories }) = (dst.categories(), src.kind())
    else {
        return Err(no_assignment(dst, src));
    };
    if dst == src {
        let size = dst.data_size();
        graph.push(move |kb, _, _, _| Ok(kb.emplace(CopyAssign::new(size))));
    } else {
        let kernel = CategoricalRemap::new(dst_categories, Arc::clone(categories));
        graph.push(move |kb, _, _, _| Ok(kb.emplace(kernel)));
    }
    Ok(dst.clone())
}

/// `?T <- S` for a non-option `S`. A source with its own missing value
/// acts as `?S`; any other source is assigned to the payload directly.
fn option_from_value(
    ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    let payload = dst.option_value().ok_or_else(|| no_assignment(dst, src))?;
    let dst_missing = missing_of(payload)?;
    let child = ctx.descend()?;
    match Missing::of(src) {
        Some(src_missing) => {
            let chunk_size = ctx.config().option.chunk_size;
            graph.push(move |kb, request, d, s| OptionAssign::build(kb, request, chunk_size, d, s));
            push_is_missing(graph, src_missing);
            assign_with_mode(child, graph, payload, src, mode)?;
            push_assign_missing(graph, dst_missing);
        }
        None => {
            assign_with_mode(child, graph, payload, src, mode)?;
        }
    }
    Ok(dst.clone())
}

/// `?T <- string`: NA tokens become missing, other text is parsed into the
/// payload. A string payload keeps the text as is.
fn option_from_string(
    ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    let payload = dst.option_value().ok_or_else(|| no_assignment(dst, src))?;
    if payload.is_string() {
        return option_from_value(ctx, graph, dst, src, mode);
    }
    let dst_missing = missing_of(payload)?;
    let slot = string_slot(src, dst, false)?;
    graph.push(move |kb, request, d, s| StringToOption::build(kb, request, slot, d, s));
    assign_with_mode(ctx.descend()?, graph, payload, src, mode)?;
    push_assign_missing(graph, dst_missing);
    Ok(dst.clone())
}

fn option_from_option(
    ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    let (Some(dst_payload), Some(src_payload)) = (dst.option_value(), src.option_value()) else {
        return Err(no_assignment(dst, src));
    };
    let dst_missing = missing_of(dst_payload)?;
    let src_missing = missing_of(src_payload)?;
    let chunk_size = ctx.config().option.chunk_size;
    graph.push(move |kb, request, d, s| OptionAssign::build(kb, request, chunk_size, d, s));
    push_is_missing(graph, src_missing);
    assign_with_mode(ctx.descend()?, graph, dst_payload, src_payload, mode)?;
    push_assign_missing(graph, dst_missing);
    Ok(dst.clone())
}

/// `T <- ?S`; a missing element fails at run time.
fn value_from_option(
    ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    let payload = src.option_value().ok_or_else(|| no_assignment(dst, src))?;
    let src_missing = missing_of(payload)?;
    graph.push(OptionToValue::build);
    push_is_missing(graph, src_missing);
    assign_with_mode(ctx.descend()?, graph, dst, payload, mode)?;
    Ok(dst.clone())
}

/// Tuples and structs. Two structs line up by field name, anything else by
/// position.
fn fieldwise(
    ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    let (Some(dst_fields), Some(src_fields)) = (dst.fields(), src.fields()) else {
        return Err(no_assignment(dst, src));
    };
    if dst_fields.len() != src_fields.len() {
        return Err(Error::IncompatibleLayout(format!(
            "cannot assign {} fields from {} fields ({dst} <- {src})",
            dst_fields.len(),
            src_fields.len()
        )));
    }
    let source_fields: Vec<usize> = match (dst.field_names(), src.field_names()) {
        (Some(dst_names), Some(src_names)) => dst_names
            .iter()
            .map(|name| {
                src_names.iter().position(|s| s == name).ok_or_else(|| {
                    Error::IncompatibleLayout(format!("source {src} has no field `{name}`"))
                })
            })
            .collect::<Result<_>>()?,
        _ => (0..dst_fields.len()).collect(),
    };

    let order = source_fields.clone();
    graph.push(move |kb, request, d, s| FieldwiseAssign::build(kb, request, &order, d, s));
    let child = ctx.descend()?;
    for (dst_field, &j) in dst_fields.iter().zip(&source_fields) {
        assign_with_mode(child, graph, dst_field, &src_fields[j], mode)?;
    }
    Ok(dst.clone())
}

fn deref(
    ctx: ResolveContext<'_>,
    graph: &mut CallGraph,
    dst: &Type,
    src: &Type,
    mode: AssignErrorMode,
) -> Result<Type> {
    let target = src.pointer_target().ok_or_else(|| no_assignment(dst, src))?;
    graph.push(DerefAssign::build);
    assign_with_mode(ctx.descend()?, graph, dst, target, mode)?;
    Ok(dst.clone())
}
