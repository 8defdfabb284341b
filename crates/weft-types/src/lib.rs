// Allow unwrap in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]

//! Type descriptors for the weft runtime.
//!
//! This crate is the boundary the resolution engine consumes types through:
//!
//! - [`TypeId`] names concrete types and the abstract kinds grouping them
//! - [`Type`] is a structural descriptor with a textual syntax ([`Type::parse`])
//! - [`TypeVars`] collects bindings while matching symbolic patterns
//! - [`Arrmeta`] carries layout metadata that the type alone does not fix
//! - [`StringData`] and [`Complex`] are the in-memory forms of string and
//!   complex elements

pub mod arrmeta;
pub mod complex;
pub mod error;
pub mod id;
mod parse;
pub mod pattern;
pub mod string;
pub mod types;

pub use arrmeta::Arrmeta;
pub use complex::Complex;
pub use error::ParseError;
pub use id::TypeId;
pub use pattern::TypeVars;
pub use string::StringData;
pub use types::{StringEncoding, Type, TypeKind, category_storage_size};
