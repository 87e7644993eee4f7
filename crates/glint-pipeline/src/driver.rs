//! The pipeline driver: per-unit state machine and batch loop.

use glint_ir::{validate, IrError, Module};
use glint_opt::PassManager;
use glint_parser::{dump_ast, lower, parse, preprocess, LoweredUnit};

use crate::options::CompileOptions;
use crate::shader::CompiledShader;
use crate::state::{CompileState, UnitState};
use crate::unit::SourceUnit;

/// An internal-invariant failure: a pipeline stage produced malformed IR.
///
/// This is a defect in the compiler, not in the input source, so it aborts
/// the whole batch instead of failing one unit.
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    #[error("internal compiler error: invalid IR produced for {origin}: {source}")]
    InvalidIr {
        origin: String,
        #[source]
        source: IrError,
    },
}

/// Orchestrates compilation of source units according to a
/// [`CompileOptions`] value.
pub struct PipelineDriver {
    options: CompileOptions,
}

impl PipelineDriver {
    /// Creates a driver with the given configuration.
    pub fn new(options: CompileOptions) -> Self {
        Self { options }
    }

    /// The driver's configuration.
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compiles one unit to a finalized [`CompiledShader`].
    ///
    /// User-level failures are recorded on the returned shader; `Err` is
    /// reserved for [`InternalError`]s.
    pub fn compile(&self, unit: &SourceUnit) -> Result<CompiledShader, InternalError> {
        let mut state = CompileState::new();
        log::debug!("compiling {} as a {} shader", unit.origin(), unit.stage());

        // Preprocess.
        let expanded = match preprocess(unit.source(), self.options.dialect) {
            Ok(expanded) => expanded,
            Err(diagnostic) => {
                state.fail(diagnostic);
                return Ok(state.finalize(unit));
            }
        };
        state.version = Some(expanded.version);
        state.extensions = expanded.extensions;
        state.diagnostics.extend(expanded.warnings);
        state.transition(UnitState::Preprocessed);

        // Parse.
        let ast = match parse(&expanded.text) {
            Ok(ast) => ast,
            Err(diagnostic) => {
                state.fail(diagnostic);
                return Ok(state.finalize(unit));
            }
        };
        if self.options.dump_ast {
            state.dumps.ast = Some(dump_ast(&ast));
        }
        state.transition(UnitState::Parsed);

        // Lower. A structurally empty unit skips lowering and compiles to an
        // empty IR module.
        let mut module = if ast.is_empty() {
            Module::new(unit.stage())
        } else {
            match lower(&ast, unit.stage(), &mut state.diagnostics) {
                Ok(LoweredUnit {
                    module,
                    symbols,
                    required_builtins,
                }) => {
                    state.symbols = symbols;
                    state.required_builtins = required_builtins;
                    module
                }
                Err(_) => {
                    state.mark_failed();
                    return Ok(state.finalize(unit));
                }
            }
        };
        state.transition(UnitState::Lowered);

        // A violation here means the frontend emitted malformed IR.
        validate(&module).map_err(|source| InternalError::InvalidIr {
            origin: unit.origin().to_string(),
            source,
        })?;
        if self.options.dump_unoptimized_ir {
            state.dumps.unoptimized_ir = Some(glint_ir::dump_module(&module));
        }

        // Optimize to a fixpoint; skipped for empty modules.
        if !module.is_empty() {
            let mut pass_manager = PassManager::with_default_passes()
                .with_max_rounds(self.options.max_opt_rounds);
            if let Some(deadline) = self.options.opt_deadline {
                pass_manager = pass_manager.with_deadline(deadline);
            }
            let summary = pass_manager.run(&mut module);
            log::debug!(
                "optimized {} in {} round(s) (converged: {})",
                unit.origin(),
                summary.rounds,
                summary.converged
            );
        }
        state.transition(UnitState::Optimized);

        // Re-validate only after the loop completes, not per round.
        validate(&module).map_err(|source| InternalError::InvalidIr {
            origin: unit.origin().to_string(),
            source,
        })?;
        state.transition(UnitState::Validated);
        if self.options.dump_optimized_ir {
            state.dumps.optimized_ir = Some(glint_ir::dump_module(&module));
        }

        state.ir = Some(module);
        Ok(state.finalize(unit))
    }

    /// Compiles a batch of units in order.
    ///
    /// With `stop_on_first_failure` set (the default), units after the first
    /// failing one are not compiled and the returned list is short.
    pub fn compile_all(&self, units: &[SourceUnit]) -> Result<Vec<CompiledShader>, InternalError> {
        let mut shaders = Vec::with_capacity(units.len());
        for unit in units {
            let shader = self.compile(unit)?;
            let failed = !shader.succeeded();
            shaders.push(shader);
            if failed && self.options.stop_on_first_failure {
                log::debug!("stopping batch after failure in {}", unit.origin());
                break;
            }
        }
        Ok(shaders)
    }
}
