//! Compilation pipeline for the glint shader compiler.
//!
//! Carries a [`SourceUnit`] through preprocessing, parsing, lowering,
//! optimization, and validation, producing a persistent [`CompiledShader`].
//! Per-attempt allocations live on a transient [`CompileState`]; finalizing
//! moves the surviving IR, symbols, and diagnostics onto the shader record
//! and reclaims everything else.

mod driver;
mod options;
mod shader;
mod state;
mod unit;

pub use driver::{InternalError, PipelineDriver};
pub use options::CompileOptions;
pub use shader::{CompileStatus, CompiledShader};
pub use state::{CompileState, UnitDumps, UnitState};
pub use unit::{InputError, SourceUnit};

// The frontend configuration types are part of this crate's API surface.
pub use glint_parser::{Dialect, LanguageVersion};
