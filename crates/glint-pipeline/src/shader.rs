//! The persistent result of a compile attempt.

use glint_ir::{DiagnosticLog, Module, Stage, SymbolTable};
use glint_parser::LanguageVersion;

use crate::state::UnitDumps;

/// Whether a unit compiled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CompileStatus {
    Success,
    Failure,
}

/// A compiled shader, owned independently of the transient compile state.
///
/// Everything on this record was re-parented out of the attempt's
/// [`CompileState`](crate::CompileState) at finalize time.
#[derive(Debug)]
pub struct CompiledShader {
    pub stage: Stage,
    pub origin: String,
    pub status: CompileStatus,
    pub version: Option<LanguageVersion>,
    /// Extensions the unit enabled via `#extension`.
    pub extensions: Vec<String>,
    /// The unit's info log, in diagnostic order.
    pub diagnostics: DiagnosticLog,
    /// Surviving IR; `None` when compilation failed before lowering, an
    /// empty module for a structurally empty unit.
    pub ir: Option<Module>,
    /// Interface symbols the unit exports.
    pub symbols: SymbolTable,
    /// Built-in functions the linker must resolve for this unit.
    pub required_builtins: Vec<String>,
    /// Captured dump text, when the driver was configured to collect it.
    pub dumps: UnitDumps,
}

impl CompiledShader {
    /// `true` if the unit compiled successfully.
    pub fn succeeded(&self) -> bool {
        self.status == CompileStatus::Success
    }

    /// The info log as printable text.
    pub fn info_log(&self) -> String {
        self.diagnostics.to_string()
    }
}
