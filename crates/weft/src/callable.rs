//! Callable resolution protocol.
//!
//! A [`Callable`] turns argument types into a destination type plus the
//! kernel makers needed to compute it. Resolution is purely symbolic: it
//! binds the [`Signature`], picks an implementation and pushes makers onto a
//! [`CallGraph`]. Memory is only touched later, when the graph is
//! instantiated into a kernel chain.

use std::fmt;

use indexmap::IndexMap;
use weft_kernels::{AssignErrorMode, CallGraph};
use weft_types::{Type, TypeVars};

use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// A function over typed arrays that resolves into kernels.
pub trait Callable: Send + Sync {
    fn name(&self) -> &str;

    fn signature(&self) -> &Signature;

    /// Pushes the makers computing `dst` from `src` onto `graph` and returns
    /// the destination type, which is `dst` itself unless `dst` is symbolic.
    ///
    /// The signature has already been bound when this is called from
    /// [`Engine::resolve`](crate::Engine::resolve); `caller` is the callable
    /// that delegated here, if any.
    #[allow(clippy::too_many_arguments)]
    fn resolve(
        &self,
        caller: Option<&dyn Callable>,
        ctx: ResolveContext<'_>,
        graph: &mut CallGraph,
        dst: &Type,
        src: &[Type],
        kwds: &Kwds,
        tp_vars: &mut TypeVars,
    ) -> Result<Type>;
}

impl fmt::Debug for dyn Callable + '_ {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.name())
            .field("signature", self.signature())
            .finish()
    }
}

/// Parameter and return patterns plus the accepted keywords with their
/// default values.
#[derive(Debug, Clone)]
pub struct Signature {
    params: Vec<Type>,
    ret: Type,
    keywords: IndexMap<String, Value>,
}

impl Signature {
    pub fn new(params: impl IntoIterator<Item = Type>, ret: Type) -> Self {
        Self {
            params: params.into_iter().collect(),
            ret,
            keywords: IndexMap::new(),
        }
    }

    pub fn with_keyword(mut self, name: impl Into<String>, default: Value) -> Self {
        self.keywords.insert(name.into(), default);
        self
    }

    pub fn params(&self) -> &[Type] {
        &self.params
    }

    pub fn ret(&self) -> &Type {
        &self.ret
    }

    pub fn keywords(&self) -> &IndexMap<String, Value> {
        &self.keywords
    }

    /// Checks arity, unifies the patterns with the arguments and rejects
    /// unknown keywords.
    ///
    /// A symbolic `dst` asks for the destination to be inferred and is not
    /// matched against the return pattern.
    pub fn bind(
        &self,
        callable: &str,
        dst: &Type,
        src: &[Type],
        kwds: &Kwds,
        tp_vars: &mut TypeVars,
    ) -> Result<()> {
        if src.len() != self.params.len() {
            return Err(Error::Arity {
                callable: callable.to_string(),
                expected: self.params.len(),
                actual: src.len(),
            });
        }
        for (param, arg) in self.params.iter().zip(src) {
            if !param.matches(arg, tp_vars) {
                return Err(Error::PatternMismatch {
                    expected: param.substitute(tp_vars),
                    actual: arg.clone(),
                });
            }
        }
        if dst.is_concrete() && !self.ret.matches(dst, tp_vars) {
            return Err(Error::PatternMismatch {
                expected: self.ret.substitute(tp_vars),
                actual: dst.clone(),
            });
        }
        if let Some(unknown) = kwds.names().find(|name| !self.keywords.contains_key(*name)) {
            return Err(Error::UnknownKeyword(unknown.to_string()));
        }
        Ok(())
    }
}

/// Keyword argument value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Explicitly absent; callables fall back to their defaults.
    Missing,
    Str(String),
    Int(i64),
    Bool(bool),
    Type(Type),
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Missing => f.write_str("NA"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Type(tp) => write!(f, "{tp}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<AssignErrorMode> for Value {
    fn from(mode: AssignErrorMode) -> Self {
        Value::Str(mode.name().to_string())
    }
}

/// Keyword arguments of one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Kwds(IndexMap<String, Value>);

impl Kwds {
    pub const ERROR_MODE: &'static str = "error_mode";

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(name.into(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The `error_mode` keyword, with `default` standing in when it is
    /// absent, missing or `"default"`.
    pub fn error_mode(&self, default: AssignErrorMode) -> Result<AssignErrorMode> {
        match self.get(Self::ERROR_MODE) {
            None | Some(Value::Missing) => Ok(default),
            Some(Value::Str(name)) => name
                .parse::<AssignErrorMode>()
                .map(|mode| mode.or(default))
                .map_err(Error::InvalidPolicy),
            Some(other) => Err(Error::InvalidPolicy(other.to_string())),
        }
    }
}

/// Per-call resolution state handed down composite recursion.
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    config: &'a EngineConfig,
    depth: usize,
}

impl<'a> ResolveContext<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config, depth: 0 }
    }

    pub fn config(&self) -> &'a EngineConfig {
        self.config
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Context for resolving a constituent one level down.
    pub fn descend(self) -> Result<Self> {
        let depth = self.depth + 1;
        if depth > self.config.max_resolve_depth {
            return Err(Error::MaxDepthExceeded(self.config.max_resolve_depth));
        }
        Ok(Self { depth, ..self })
    }
}

/// Rejects symbolic types where kernels need a concrete layout.
pub(crate) fn require_concrete(tp: &Type) -> Result<()> {
    if tp.is_concrete() {
        Ok(())
    } else {
        Err(Error::NotConcrete(tp.clone()))
    }
}
