//! Resolution and materialization entry points.

use tracing::{debug, instrument};
use weft_kernels::{CallGraph, KernelBuilder, KernelChain, KernelRequest};
use weft_types::{Arrmeta, Type, TypeVars};

use crate::builtins;
use crate::callable::{Callable, Kwds, ResolveContext};
use crate::config::EngineConfig;
use crate::error::Result;

/// Output of [`Engine::resolve`]: the destination type and the makers that
/// build the kernels computing it.
#[derive(Debug)]
pub struct Resolved {
    pub dst_type: Type,
    pub graph: CallGraph,
}

/// Resolves callables against types and builds the resulting kernel chains
/// under one configuration.
#[derive(Debug, Clone, Default)]
pub struct Engine {
    config: EngineConfig,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Binds `callable`'s signature and resolves it into a call graph.
    #[instrument(skip_all, fields(callable = callable.name(), dst = %dst, args = src.len()))]
    pub fn resolve(
        &self,
        callable: &dyn Callable,
        dst: &Type,
        src: &[Type],
        kwds: &Kwds,
    ) -> Result<Resolved> {
        let mut tp_vars = TypeVars::new();
        callable
            .signature()
            .bind(callable.name(), dst, src, kwds, &mut tp_vars)?;
        let mut graph = CallGraph::new();
        let dst_type = callable.resolve(
            None,
            ResolveContext::new(&self.config),
            &mut graph,
            dst,
            src,
            kwds,
            &mut tp_vars,
        )?;
        debug!(dst_type = %dst_type, makers = graph.len(), "resolved kernel graph");
        Ok(Resolved { dst_type, graph })
    }

    /// Runs every maker of `graph` into a fresh arena.
    #[instrument(skip_all, fields(makers = graph.len(), request = ?request))]
    pub fn instantiate(
        &self,
        graph: CallGraph,
        dst_arrmeta: &Arrmeta,
        src_arrmeta: &[&Arrmeta],
        request: KernelRequest,
    ) -> Result<KernelChain> {
        let mut builder = KernelBuilder::new(graph, self.config.arena.initial_capacity);
        builder.instantiate_next(request, dst_arrmeta, src_arrmeta)?;
        let chain = builder.finish(request)?;
        debug!(
            records = chain.record_count(),
            bytes = chain.size(),
            "kernel chain built"
        );
        Ok(chain)
    }

    /// Resolves and builds `dst <- src` for default-layout data.
    pub fn assign_kernel(
        &self,
        dst: &Type,
        src: &Type,
        kwds: &Kwds,
        request: KernelRequest,
    ) -> Result<KernelChain> {
        let resolved = self.resolve(builtins::assign(), dst, std::slice::from_ref(src), kwds)?;
        let dst_arrmeta = Arrmeta::default_for(&resolved.dst_type);
        let src_arrmeta = Arrmeta::default_for(src);
        self.instantiate(resolved.graph, &dst_arrmeta, &[&src_arrmeta], request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn new_validates() {
        let mut config = EngineConfig::default();
        config.arena.initial_capacity = 0;
        assert!(matches!(Engine::new(config), Err(Error::Config(_))));
    }

    #[test]
    fn resolve_binds_before_resolving() {
        let engine = Engine::default();
        let err = engine
            .resolve(
                builtins::assign(),
                &Type::int32(),
                &[Type::int32(), Type::int32()],
                &Kwds::new(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::Arity { expected: 1, actual: 2, .. }));
    }

    #[test]
    fn assign_kernel_copies() {
        let engine = Engine::default();
        let chain = engine
            .assign_kernel(&Type::int32(), &Type::int32(), &Kwds::new(), KernelRequest::Single)
            .unwrap();
        assert_eq!(chain.record_count(), 1);
        let src = 42i32;
        let mut out = 0i32;
        unsafe { chain.single((&raw mut out).cast(), &[(&raw const src).cast()]) }.unwrap();
        assert_eq!(out, 42);
    }
}
