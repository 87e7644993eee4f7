mod common;

use common::{compile, compile_with};
use glint_ir::{Module, Stage, Statement};
use glint_opt::{PassManager, DEFAULT_MAX_ROUNDS};
use glint_pipeline::CompileOptions;

fn lowered(source: &str, stage: Stage) -> Module {
    let ast = glint_parser::parse(source).expect("parse failed");
    let mut diags = glint_ir::DiagnosticLog::new();
    glint_parser::lower(&ast, stage, &mut diags)
        .unwrap_or_else(|_| panic!("lowering failed: {diags}"))
        .module
}

#[test]
fn optimizer_terminates_within_the_configured_bound() {
    // A chain of dependent constants needs several rounds, but always
    // converges inside the default bound.
    let mut module = lowered(
        "void main() {
            float a = 1.0 + 1.0;
            float b = a * 2.0;
            float c = b - 1.0;
            float d = c / 3.0;
            gl_Position = vec4(d);
        }",
        Stage::Vertex,
    );
    let summary = PassManager::with_default_passes().run(&mut module);
    assert!(summary.converged);
    assert!(summary.rounds <= DEFAULT_MAX_ROUNDS);
}

#[test]
fn optimizer_is_idempotent_at_the_fixpoint() {
    let mut module = lowered(
        "void main() { float x = 2.0 * 21.0; gl_Position = vec4(x); }",
        Stage::Vertex,
    );
    let pm = PassManager::with_default_passes();
    let first = pm.run(&mut module);
    assert!(first.changed);

    let second = pm.run(&mut module);
    assert!(!second.changed);
    assert!(second.converged);
    assert_eq!(second.rounds, 1);
}

#[test]
fn constant_branches_collapse_through_the_pipeline() {
    // `if (false)` disappears entirely: const-fold turns the condition
    // literal, DCE splices the taken branch.
    let options = CompileOptions {
        dump_optimized_ir: true,
        ..Default::default()
    };
    let shader = compile_with(
        "void main() {\n    if (false) {\n        gl_Position = vec4(0.0);\n    } else {\n        gl_Position = vec4(1.0);\n    }\n}",
        Stage::Vertex,
        options,
    );
    assert!(shader.succeeded());

    let module = shader.ir.as_ref().unwrap();
    let main = &module.functions[module.entry_point.unwrap()];
    // Only the surviving store remains, with no If around it.
    assert_eq!(main.body.len(), 1);
    assert!(matches!(main.body[0], Statement::Store { .. }));
}

#[test]
fn folded_constants_reach_the_optimized_dump() {
    let options = CompileOptions {
        dump_unoptimized_ir: true,
        dump_optimized_ir: true,
        ..Default::default()
    };
    let shader = compile_with(
        "void main() { float x = 40.0 + 2.0; gl_Position = vec4(x); }",
        Stage::Vertex,
        options,
    );
    let optimized = shader.dumps.optimized_ir.unwrap();
    assert!(optimized.contains("42.0"));
}

#[test]
fn optimizer_preserves_observable_stores() {
    let shader = compile(
        "out float result;\nvoid main() { float x = 1.0 + 2.0; result = x; }",
        Stage::Vertex,
    );
    assert!(shader.succeeded());
    let module = shader.ir.as_ref().unwrap();
    let main = &module.functions[module.entry_point.unwrap()];
    // The store to the output global survives optimization.
    assert!(main
        .body
        .iter()
        .any(|s| matches!(s, Statement::Store { .. })));
}

#[test]
fn optimized_modules_still_validate() {
    let shader = compile(
        "void main() {
            float acc = 0.0;
            for (int i = 0; i < 8; i++) {
                if (acc > 4.0) {
                    break;
                }
                acc += 1.0;
            }
            gl_Position = vec4(acc);
        }",
        Stage::Vertex,
    );
    assert!(shader.succeeded());
    glint_ir::validate(shader.ir.as_ref().unwrap()).expect("optimized IR is well-formed");
}

#[test]
fn zero_opt_rounds_skips_rewrites() {
    let options = CompileOptions {
        max_opt_rounds: 0,
        dump_optimized_ir: true,
        ..Default::default()
    };
    let shader = compile_with(
        "void main() { float x = 40.0 + 2.0; gl_Position = vec4(x); }",
        Stage::Vertex,
        options,
    );
    // Under-optimization is not a compile error.
    assert!(shader.succeeded());
    let dump = shader.dumps.optimized_ir.unwrap();
    assert!(dump.contains("40.0"));
}
