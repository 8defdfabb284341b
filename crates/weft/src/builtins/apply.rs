//! Plain Rust functions as callables.
//!
//! The signature comes from the function's argument and return types, and
//! resolution emits one leaf kernel that reads each argument element, calls
//! the function and writes the result.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use weft_kernels::apply::{ElementFn, FunctionKernel};
use weft_kernels::{CallGraph, Element, ScalarKind};
use weft_types::{Type, TypeVars};

use crate::callable::{Callable, Kwds, ResolveContext, Signature};
use crate::error::{Error, Result};

/// A function over scalar elements, exposed as a [`Callable`].
///
/// ```
/// use weft::builtins::FunctionCallable;
/// use weft::{Callable, Type};
///
/// let scale = FunctionCallable::new("scale", |x: i32, factor: f64| x as f64 * factor);
/// assert_eq!(scale.signature().params(), [Type::int32(), Type::float64()]);
/// assert_eq!(*scale.signature().ret(), Type::float64());
/// ```
pub struct FunctionCallable<F, Args> {
    name: String,
    func: Arc<F>,
    signature: Signature,
    _args: PhantomData<fn(Args)>,
}

impl<F, Args> FunctionCallable<F, Args>
where
    F: ElementFn<Args>,
    Args: 'static,
{
    pub fn new(name: impl Into<String>, func: F) -> Self {
        let params = F::param_kinds().into_iter().map(ScalarKind::to_type);
        let ret = <F::Output as Element>::KIND.to_type();
        Self {
            name: name.into(),
            func: Arc::new(func),
            signature: Signature::new(params, ret),
            _args: PhantomData,
        }
    }
}

impl<F, Args> Callable for FunctionCallable<F, Args>
where
    F: ElementFn<Args>,
    Args: 'static,
{
    fn name(&self) -> &str {
        &self.name
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
        let params = self.signature.params();
        if src.len() != params.len() {
            return Err(Error::Arity {
                callable: self.name.clone(),
                expected: params.len(),
                actual: src.len(),
            });
        }
        // Arguments are read as the function's own types, so only exact
        // matches are accepted.
        if let Some((expected, actual)) = params.iter().zip(src).find(|(param, arg)| param != arg) {
            return Err(Error::PatternMismatch {
                expected: expected.clone(),
                actual: actual.clone(),
            });
        }
        let ret = self.signature.ret();
        if dst.is_concrete() && dst != ret {
            return Err(Error::NoAssignment {
                dst: dst.clone(),
                src: ret.clone(),
            });
        }
        let func = Arc::clone(&self.func);
        graph.push(move |kb, _, _, _| Ok(kb.emplace(FunctionKernel::<F, Args>::new(func))));
        Ok(ret.clone())
    }
}

impl<F, Args> fmt::Debug for FunctionCallable<F, Args> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FunctionCallable")
            .field("name", &self.name)
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;

    #[test]
    fn resolve_checks_argument_types() {
        let config = EngineConfig::default();
        let negate = FunctionCallable::new("negate", |x: i16| -x);
        let resolve = |dst: &Type, src: &[Type]| {
            let mut graph = CallGraph::new();
            let out = negate.resolve(
                None,
                ResolveContext::new(&config),
                &mut graph,
                dst,
                src,
                &Kwds::new(),
                &mut TypeVars::new(),
            )?;
            Ok::<_, Error>((out, graph.len()))
        };

        assert_eq!(resolve(&Type::any(), &[Type::int16()]).unwrap(), (Type::int16(), 1));
        assert!(matches!(
            resolve(&Type::any(), &[Type::int32()]),
            Err(Error::PatternMismatch { .. })
        ));
        assert!(matches!(
            resolve(&Type::any(), &[]),
            Err(Error::Arity { expected: 1, actual: 0, .. })
        ));
        assert!(matches!(
            resolve(&Type::int64(), &[Type::int16()]),
            Err(Error::NoAssignment { .. })
        ));
    }
}
