// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Kernel arena and kernels for the weft runtime.
//!
//! Resolution produces a [`CallGraph`] of deferred kernel makers. A
//! [`KernelBuilder`] runs those makers into a single relocatable arena where
//! composites address their children by byte offset, and hands the result
//! over as an executable [`KernelChain`].
//!
//! The kernels themselves cover:
//!
//! - numeric assignment, keyed by kind pair and [`AssignErrorMode`] in the
//!   [`AssignLattice`]
//! - string transcoding and string/number conversion
//! - option composites built on missing-value sentinels
//! - tuple and struct assignment, pointer dereference and categoricals
//! - binary arithmetic with operand promotion
//! - plain Rust functions over elements, through [`apply::FunctionKernel`]

pub mod apply;
pub mod arith;
pub mod builder;
pub mod categorical;
pub mod chain;
pub mod codec;
pub mod error;
pub mod fieldwise;
pub mod lattice;
pub mod missing;
pub mod mode;
pub mod numeric;
pub mod option;
pub mod pointer;
pub mod record;
pub mod string;

pub use builder::{ARENA_ALIGN, CallGraph, KernelBuilder, KernelMaker, KernelRequest};
pub use chain::KernelChain;
pub use error::{BuildError, KernelError, Result};
pub use lattice::AssignLattice;
pub use missing::Missing;
pub use mode::AssignErrorMode;
pub use numeric::{Element, ScalarKind};
pub use record::{Kernel, KernelRef, MAX_ARITY};
