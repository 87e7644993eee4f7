//! IR optimization passes for the glint shader compiler.
//!
//! Provides a [`Pass`] trait, a [`PassManager`] that applies the ordered
//! pass set in rounds until a fixpoint, and the built-in rewrite passes
//! (constant folding, copy propagation, dead code elimination).

mod const_fold;
mod copy_prop;
mod dce;

pub use const_fold::ConstantFolding;
pub use copy_prop::CopyPropagation;
pub use dce::DeadCodeElimination;

use std::fmt::Debug;
use std::time::{Duration, Instant};

use glint_ir::Module;

/// An optimization pass that rewrites an IR module in place.
pub trait Pass: Debug {
    /// Human-readable name of the pass.
    fn name(&self) -> &str;

    /// Runs the pass on a module. Returns `true` if anything was modified.
    fn run(&self, module: &mut Module) -> bool;
}

/// Default bound on fixpoint rounds, matching the historical driver.
pub const DEFAULT_MAX_ROUNDS: usize = 32;

/// What a [`PassManager::run`] invocation did.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct FixpointSummary {
    /// Rounds executed (a round applies every pass once, in order).
    pub rounds: usize,
    /// `true` if a round reported no change; `false` if the round bound or
    /// deadline cut the loop short.
    pub converged: bool,
    /// `true` if any pass in any round modified the module.
    pub changed: bool,
}

/// Runs the ordered pass set to a fixpoint, bounded by a round limit and an
/// optional wall-clock deadline.
///
/// Hitting either bound accepts the current tree as the optimized result —
/// under-optimization is not a compile error.
pub struct PassManager {
    passes: Vec<Box<dyn Pass>>,
    max_rounds: usize,
    deadline: Option<Duration>,
}

impl Default for PassManager {
    fn default() -> Self {
        Self::new()
    }
}

impl PassManager {
    /// Creates an empty pass manager with no passes.
    pub fn new() -> Self {
        Self {
            passes: Vec::new(),
            max_rounds: DEFAULT_MAX_ROUNDS,
            deadline: None,
        }
    }

    /// Creates a pass manager with the standard pass set.
    pub fn with_default_passes() -> Self {
        let mut pm = Self::new();
        pm.add_pass(Box::new(ConstantFolding));
        pm.add_pass(Box::new(CopyPropagation));
        pm.add_pass(Box::new(DeadCodeElimination));
        pm
    }

    /// Appends a pass to the ordered set.
    pub fn add_pass(&mut self, pass: Box<dyn Pass>) {
        self.passes.push(pass);
    }

    /// Overrides the round bound.
    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    /// Adds a wall-clock deadline, checked between rounds.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Applies the full pass set in rounds until none reports a change, the
    /// round bound is reached, or the deadline expires.
    pub fn run(&self, module: &mut Module) -> FixpointSummary {
        let start = Instant::now();
        let mut rounds = 0;
        let mut changed_any = false;

        loop {
            if rounds >= self.max_rounds {
                log::warn!(
                    "optimizer stopped at the round bound ({}) without converging",
                    self.max_rounds
                );
                return FixpointSummary {
                    rounds,
                    converged: false,
                    changed: changed_any,
                };
            }
            if let Some(deadline) = self.deadline {
                if start.elapsed() >= deadline {
                    log::warn!("optimizer stopped at the deadline after {rounds} round(s)");
                    return FixpointSummary {
                        rounds,
                        converged: false,
                        changed: changed_any,
                    };
                }
            }

            let mut changed = false;
            for pass in &self.passes {
                let pass_changed = pass.run(module);
                if pass_changed {
                    log::debug!("round {}: {} modified the module", rounds + 1, pass.name());
                }
                changed |= pass_changed;
            }
            rounds += 1;

            if !changed {
                return FixpointSummary {
                    rounds,
                    converged: true,
                    changed: changed_any,
                };
            }
            changed_any = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glint_ir::Stage;

    fn lowered(source: &str, stage: Stage) -> Module {
        let ast = glint_parser::parse(source).expect("parse failed");
        let mut diags = glint_ir::DiagnosticLog::new();
        glint_parser::lower(&ast, stage, &mut diags)
            .unwrap_or_else(|_| panic!("lowering failed: {diags}"))
            .module
    }

    #[test]
    fn empty_module_converges_immediately() {
        let pm = PassManager::with_default_passes();
        let mut module = Module::new(Stage::Vertex);
        let summary = pm.run(&mut module);
        assert!(summary.converged);
        assert!(!summary.changed);
        assert_eq!(summary.rounds, 1);
    }

    #[test]
    fn fixpoint_is_idempotent() {
        let pm = PassManager::with_default_passes();
        let mut module = lowered(
            "void main() { float x = 1.0 + 2.0; gl_Position = vec4(x); }",
            Stage::Vertex,
        );
        let first = pm.run(&mut module);
        assert!(first.converged);
        assert!(first.changed);

        // A fixpointed module reports zero changes on a second run.
        let second = pm.run(&mut module);
        assert!(second.converged);
        assert!(!second.changed);
        assert_eq!(second.rounds, 1);
    }

    #[test]
    fn terminates_within_the_default_bound() {
        let pm = PassManager::with_default_passes();
        let mut module = lowered(
            "void main() {
                float a = 1.0 + 2.0;
                float b = a + 3.0;
                float c = b + 4.0;
                float d = c + 5.0;
                gl_Position = vec4(d);
            }",
            Stage::Vertex,
        );
        let summary = pm.run(&mut module);
        assert!(summary.converged);
        assert!(summary.rounds <= DEFAULT_MAX_ROUNDS);
    }

    #[test]
    fn round_bound_is_honored() {
        let pm = PassManager::with_default_passes().with_max_rounds(1);
        // Chained constants need more than one round to fold completely.
        let mut module = lowered(
            "void main() { float a = 1.0 + 2.0; float b = a + 3.0; gl_Position = vec4(b); }",
            Stage::Vertex,
        );
        let summary = pm.run(&mut module);
        assert_eq!(summary.rounds, 1);
        assert!(!summary.converged);
    }

    #[test]
    fn zero_round_bound_does_nothing() {
        let pm = PassManager::with_default_passes().with_max_rounds(0);
        let mut module = lowered("void main() { float x = 1.0 + 2.0; }", Stage::Vertex);
        let summary = pm.run(&mut module);
        assert_eq!(summary.rounds, 0);
        assert!(!summary.converged);
        assert!(!summary.changed);
    }

    #[test]
    fn empty_pass_manager_converges() {
        let pm = PassManager::new();
        let mut module = lowered("void main() { float x = 1.0 + 2.0; }", Stage::Vertex);
        let summary = pm.run(&mut module);
        assert!(summary.converged);
        assert!(!summary.changed);
    }
}
