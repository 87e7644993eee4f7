//! Statements: stores, calls, and structured control flow.

use crate::arena::Handle;
use crate::expr::Expression;
use crate::func::{ExternalFunction, Function};

/// A block of statements.
pub type Block = Vec<Statement>;

/// The target of a `Call` statement.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum Callee {
    /// A function defined in this module.
    Defined(Handle<Function>),
    /// A declared-but-undefined function, resolved against the built-in
    /// registry at link time.
    External(Handle<ExternalFunction>),
}

/// A statement in the IR.
///
/// Statements have side effects and/or control flow; they operate on
/// expressions referenced by handles.
#[derive(Clone, Debug)]
pub enum Statement {
    /// Write a value through a pointer.
    Store {
        pointer: Handle<Expression>,
        value: Handle<Expression>,
    },
    /// Conditional branch.
    If {
        condition: Handle<Expression>,
        accept: Block,
        reject: Block,
    },
    /// Unified loop construct; `continuing` runs before each back-edge
    /// (holds the step of a lowered `for`).
    Loop { body: Block, continuing: Block },
    /// Call a function, optionally depositing its value in a result
    /// expression.
    Call {
        callee: Callee,
        arguments: Vec<Handle<Expression>>,
        result: Option<Handle<Expression>>,
    },
    /// Break out of the innermost loop.
    Break,
    /// Continue to the next iteration of the innermost loop.
    Continue,
    /// Return from the function.
    Return { value: Option<Handle<Expression>> },
    /// Abandon the fragment (fragment stage only).
    Discard,
}

impl Statement {
    /// Returns `true` for statements after which a block can never resume.
    pub fn is_terminator(&self) -> bool {
        matches!(
            self,
            Self::Break | Self::Continue | Self::Return { .. } | Self::Discard
        )
    }
}
