//! Errors raised while building and executing kernel chains.
//!
//! # Error Categories
//!
//! - **Execution errors** ([`KernelError`]): raised per element from a
//!   kernel's `single`/`strided` entry point under a checked error mode, on
//!   malformed string data, or when a missing value has nowhere to go
//! - **Build errors** ([`BuildError`]): raised while makers are materialized
//!   into an arena; they indicate a call graph that does not match the
//!   metadata or the request it is instantiated with
//!
//! Nothing is recovered or downgraded here. A failing element aborts the
//! call; elements written earlier in the same strided call stay written.

use thiserror::Error;

/// Execution-time failure of a kernel.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    /// Value outside the destination's range under a checked mode.
    #[error("overflow while assigning {value} to {dst}")]
    Overflow { value: String, dst: &'static str },

    /// Non-zero fractional part dropped by an integer destination.
    #[error("fractional part lost while assigning {value} to {dst}")]
    Fractional { value: String, dst: &'static str },

    /// Value not exactly representable in the destination.
    #[error("inexact value lost precision while assigning {value} to {dst}")]
    Inexact { value: String, dst: &'static str },

    #[error("imaginary component lost while assigning {value} to {dst}")]
    ImaginaryDiscarded { value: String, dst: &'static str },

    /// Malformed code units in a string source.
    #[error("invalid {encoding} data at byte {offset}")]
    Decode {
        encoding: &'static str,
        offset: usize,
    },

    #[error("code point U+{codepoint:04X} is not representable in {encoding}")]
    Encode {
        codepoint: u32,
        encoding: &'static str,
    },

    #[error("cannot parse {text:?} as {dst}")]
    Parse { text: String, dst: &'static str },

    #[error("cannot assign a missing value to a non-option type")]
    MissingValue,

    #[error("string needs {needed} bytes but the destination holds {capacity}")]
    StringTooLong { needed: usize, capacity: usize },

    #[error("unknown category {0:?}")]
    UnknownCategory(String),

    #[error("integer division by zero")]
    DivideByZero,

    #[error("{0} source arguments exceed the strided arity limit")]
    TooManyArguments(usize),

    #[error("kernel takes {expected} source arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("{sources} source pointers but {strides} source strides")]
    StrideMismatch { sources: usize, strides: usize },

    /// `strided` called on a chain built for single execution.
    #[error("kernel chain was built for single-element execution")]
    UnsupportedRequest,
}

/// Failure to materialize a call graph into an arena.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BuildError {
    /// A maker asked for a child but the call graph is empty.
    #[error("call graph exhausted while building a kernel")]
    GraphExhausted,

    #[error("{0} kernel makers were left unconsumed")]
    UnconsumedMakers(usize),

    #[error("no kernel was emplaced")]
    EmptyArena,

    #[error("no {expected} record at arena offset {offset}")]
    RecordMismatch {
        offset: usize,
        expected: &'static str,
    },

    #[error("arrmeta does not match the kernel: {0}")]
    ArrmetaMismatch(String),

    /// The arena would exceed the largest allocatable layout.
    #[error("kernel arena cannot grow to {requested} bytes")]
    CapacityOverflow { requested: usize },
}

pub type Result<T> = std::result::Result<T, KernelError>;
