//! Driver configuration.
//!
//! Everything the original driver kept in global flags is an explicit value
//! here, so drivers with different configurations can coexist and be tested
//! in parallel.

use std::time::Duration;

use glint_parser::Dialect;

/// Configuration for a [`PipelineDriver`](crate::PipelineDriver).
#[derive(Clone, Debug)]
pub struct CompileOptions {
    /// Source dialect variant.
    pub dialect: Dialect,
    /// Capture the parsed AST on the compiled shader record.
    pub dump_ast: bool,
    /// Capture the IR as lowered, before optimization.
    pub dump_unoptimized_ir: bool,
    /// Capture the IR after optimization.
    pub dump_optimized_ir: bool,
    /// Stop the batch at the first unit that fails to compile (the
    /// historical behavior). When `false`, every unit is compiled and all
    /// failures are reported together.
    pub stop_on_first_failure: bool,
    /// Bound on optimizer fixpoint rounds.
    pub max_opt_rounds: usize,
    /// Optional wall-clock deadline for the optimizer, per unit.
    pub opt_deadline: Option<Duration>,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            dialect: Dialect::Core,
            dump_ast: false,
            dump_unoptimized_ir: false,
            dump_optimized_ir: false,
            stop_on_first_failure: true,
            max_opt_rounds: glint_opt::DEFAULT_MAX_ROUNDS,
            opt_deadline: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_historical_driver() {
        let options = CompileOptions::default();
        assert_eq!(options.dialect, Dialect::Core);
        assert!(options.stop_on_first_failure);
        assert_eq!(options.max_opt_rounds, 32);
        assert!(!options.dump_ast);
        assert!(options.opt_deadline.is_none());
    }
}
