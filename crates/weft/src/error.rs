//! Error types for resolution, dispatch and configuration.
//!
//! # Error Categories
//!
//! - **Type errors** ([`Error`]): raised by `resolve` when arguments do not
//!   fit a callable's signature, when an assignment between two types is not
//!   supported, or when a keyword value is invalid
//! - **Dispatch errors** ([`DispatchError`]): no overload applies to the
//!   argument ids, or the overload set has no consistent specificity order
//! - **Build and execution errors**: [`BuildError`] and [`KernelError`] from
//!   `weft-kernels`, wrapped here so callers can use one error type
//! - **Configuration errors** ([`ConfigError`]): rejected engine settings
//!
//! Errors are surfaced as they occur. Nothing is retried and no error mode is
//! ever downgraded to make a failing assignment pass.

use std::fmt;

use thiserror::Error;
use weft_kernels::{BuildError, KernelError};
use weft_types::{ParseError, Type, TypeId};

/// Errors from resolving and building callables.
#[derive(Debug, Error)]
pub enum Error {
    /// An argument or the destination does not match the signature pattern.
    #[error("type {actual} does not match {expected}")]
    PatternMismatch { expected: Type, actual: Type },

    #[error("{callable} takes {expected} arguments, got {actual}")]
    Arity {
        callable: String,
        expected: usize,
        actual: usize,
    },

    /// Field counts or names of two composite types do not line up.
    #[error("incompatible layout: {0}")]
    IncompatibleLayout(String),

    #[error("no assignment from {src} to {dst}")]
    NoAssignment { dst: Type, src: Type },

    /// An `error_mode` keyword value that names no mode.
    #[error("invalid error mode {0}")]
    InvalidPolicy(String),

    #[error("unknown keyword argument `{0}`")]
    UnknownKeyword(String),

    #[error("type {0} has no missing value representation")]
    NoMissingValue(Type),

    #[error("type {0} is symbolic where a concrete type is required")]
    NotConcrete(Type),

    #[error("resolution exceeded the maximum depth of {0}")]
    MaxDepthExceeded(usize),

    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Execution(#[from] KernelError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// Overload selection failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no applicable overload for ({})", IdList(args))]
    NoApplicableOverload { args: Vec<TypeId> },

    /// The supersedes relation over the overloads contains a cycle.
    #[error("overloads are not well founded; cycle among {}", Overloads(involved))]
    NotWellFounded { involved: Vec<Vec<TypeId>> },
}

/// Invalid [`EngineConfig`](crate::EngineConfig) values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

pub type Result<T> = std::result::Result<T, Error>;

struct IdList<'a>(&'a [TypeId]);

impl fmt::Display for IdList<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, id) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{id}")?;
        }
        Ok(())
    }
}

struct Overloads<'a>(&'a [Vec<TypeId>]);

impl fmt::Display for Overloads<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, params) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "({})", IdList(params))?;
        }
        Ok(())
    }
}
