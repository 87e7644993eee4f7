//! Internal IR invariant errors.
//!
//! These indicate that an earlier compilation stage produced malformed IR —
//! a defect in the compiler, never in the user's source. They are surfaced
//! on a separate channel from [`Diagnostic`](crate::Diagnostic)s and abort
//! the whole batch.

use crate::Stage;

/// A structural invariant violation detected by [`validate`](crate::validate).
#[derive(Debug, thiserror::Error)]
pub enum IrError {
    /// A handle points outside its arena.
    #[error("{context}: handle index {index} out of bounds (arena size {size})")]
    BadHandle {
        context: String,
        index: usize,
        size: usize,
    },

    /// The module's entry point handle does not resolve.
    #[error("entry point refers to an invalid function handle")]
    BadEntryPoint,

    /// `break` outside of any loop.
    #[error("function '{function}': `break` outside of a loop")]
    MisplacedBreak { function: String },

    /// `continue` outside of any loop.
    #[error("function '{function}': `continue` outside of a loop")]
    MisplacedContinue { function: String },

    /// `discard` in a non-fragment module.
    #[error("function '{function}': `discard` in a {stage} shader")]
    MisplacedDiscard { function: String, stage: Stage },

    /// A swizzle pattern with no components or more than four.
    #[error("function '{function}': swizzle pattern of length {len}")]
    BadSwizzle { function: String, len: usize },
}
