// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Weft Runtime
//!
//! Resolves callables over typed data into executable kernel chains.
//!
//! Resolution binds a [`Callable`]'s [`Signature`], selects implementations
//! through multiple dispatch on type ids and records deferred kernel makers
//! in a call graph. [`Engine::instantiate`] then builds the chain in one
//! pass, and the chain is executed with raw element pointers.
//!
//! The built-in callables live in [`builtins`]: `assign` with its error
//! modes and composite recursion, the missing-value callables and binary
//! arithmetic. [`builtins::FunctionCallable`] turns a plain Rust function
//! over scalars into a callable.

pub mod builtins;
pub mod callable;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod error;

pub use callable::{Callable, Kwds, ResolveContext, Signature, Value};
pub use config::{ArenaConfig, DispatchConfig, EngineConfig, OptionConfig};
pub use dispatch::{ConcurrentDispatcher, Dispatcher, OverloadSet};
pub use engine::{Engine, Resolved};
pub use error::{ConfigError, DispatchError, Error, Result};

pub use weft_kernels::{AssignErrorMode, KernelChain, KernelError, KernelRequest};
pub use weft_types::{Arrmeta, Type, TypeId};
