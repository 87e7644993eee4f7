//! The transient per-attempt compile state and its state machine.

use std::fmt;

use glint_ir::{Diagnostic, DiagnosticLog, Module, SymbolTable};
use glint_parser::LanguageVersion;

use crate::shader::{CompileStatus, CompiledShader};
use crate::unit::SourceUnit;

/// Where a unit is in the compilation pipeline.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum UnitState {
    Loaded,
    Preprocessed,
    Parsed,
    Lowered,
    Optimized,
    Validated,
    Finalized,
    Failed,
}

impl fmt::Display for UnitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Loaded => "loaded",
            Self::Preprocessed => "preprocessed",
            Self::Parsed => "parsed",
            Self::Lowered => "lowered",
            Self::Optimized => "optimized",
            Self::Validated => "validated",
            Self::Finalized => "finalized",
            Self::Failed => "failed",
        })
    }
}

/// Dump text captured during one compile attempt, when requested.
#[derive(Clone, Debug, Default)]
pub struct UnitDumps {
    pub ast: Option<String>,
    pub unoptimized_ir: Option<String>,
    pub optimized_ir: Option<String>,
}

/// Everything one compile attempt accumulates.
///
/// The state is the transient arena of the attempt: it owns the module under
/// construction and every auxiliary structure. [`CompileState::finalize`]
/// re-parents the surviving pieces onto a [`CompiledShader`] by moving them;
/// whatever is not moved is reclaimed when the state drops. The borrow
/// checker guarantees the shader cannot reference the dropped remainder.
#[derive(Debug)]
pub struct CompileState {
    state: UnitState,
    pub diagnostics: DiagnosticLog,
    pub version: Option<LanguageVersion>,
    pub extensions: Vec<String>,
    /// Set when a required step failed. Invariant: failure is observable
    /// iff this flag is set or the log carries an error entry.
    pub error: bool,
    pub symbols: SymbolTable,
    pub required_builtins: Vec<String>,
    pub ir: Option<Module>,
    pub dumps: UnitDumps,
}

impl Default for CompileState {
    fn default() -> Self {
        Self::new()
    }
}

impl CompileState {
    /// Creates the state for a fresh compile attempt.
    pub fn new() -> Self {
        Self {
            state: UnitState::Loaded,
            diagnostics: DiagnosticLog::new(),
            version: None,
            extensions: Vec::new(),
            error: false,
            symbols: SymbolTable::new(),
            required_builtins: Vec::new(),
            ir: None,
            dumps: UnitDumps::default(),
        }
    }

    /// The current pipeline state.
    pub fn state(&self) -> UnitState {
        self.state
    }

    /// Advances the state machine.
    pub fn transition(&mut self, next: UnitState) {
        log::debug!("unit state: {} -> {next}", self.state);
        self.state = next;
    }

    /// Records a fatal diagnostic and moves to the terminal failed state.
    pub fn fail(&mut self, diagnostic: Diagnostic) {
        self.diagnostics.push(diagnostic);
        self.mark_failed();
    }

    /// Moves to the terminal failed state; the log already carries the
    /// diagnostics.
    pub fn mark_failed(&mut self) {
        self.error = true;
        self.transition(UnitState::Failed);
    }

    /// `true` once any required step has failed.
    pub fn has_failed(&self) -> bool {
        self.error || self.diagnostics.has_errors()
    }

    /// Consumes the attempt, re-parenting the surviving state onto a
    /// persistent [`CompiledShader`].
    pub fn finalize(mut self, unit: &SourceUnit) -> CompiledShader {
        let status = if self.has_failed() {
            CompileStatus::Failure
        } else {
            self.transition(UnitState::Finalized);
            CompileStatus::Success
        };
        log::debug!(
            "finalized {} ({}): {status:?}",
            unit.origin(),
            unit.stage()
        );
        CompiledShader {
            stage: unit.stage(),
            origin: unit.origin().to_string(),
            status,
            version: self.version,
            extensions: self.extensions,
            diagnostics: self.diagnostics,
            ir: self.ir,
            symbols: self.symbols,
            required_builtins: self.required_builtins,
            dumps: self.dumps,
        }
    }
}
