mod common;

use std::path::Path;

use common::compile;
use glint_ir::Stage;
use glint_pipeline::{InputError, SourceUnit};

#[test]
fn unrecognized_suffix_is_rejected_before_compilation() {
    // A `.glsl` file is a usage error; no compile state is ever created.
    let err = SourceUnit::from_path(Path::new("shader.glsl"), "void main() {}".into())
        .unwrap_err();
    assert!(matches!(err, InputError::UnrecognizedSuffix { .. }));
    assert!(err.to_string().contains("shader.glsl"));
}

#[test]
fn preprocessing_failure_yields_a_failed_shader() {
    // Malformed macro: failure status, non-empty log, no IR, and the
    // optimizer never ran.
    let shader = compile("#define\nvoid main() {}", Stage::Fragment);
    assert!(!shader.succeeded());
    assert!(shader.diagnostics.has_errors());
    assert!(!shader.info_log().is_empty());
    assert!(shader.ir.is_none());
}

#[test]
fn preprocessing_diagnostics_carry_lines() {
    let shader = compile("void main() {}\n#ifdef MISSING\n", Stage::Vertex);
    assert!(!shader.succeeded());
    assert!(shader.info_log().contains("#endif"));
}

#[test]
fn parse_errors_name_the_line() {
    let shader = compile("void main() {\n  float x = ;\n}", Stage::Vertex);
    assert!(!shader.succeeded());
    assert!(shader.info_log().contains("0:2"));
}

#[test]
fn lowering_errors_are_user_diagnostics() {
    let shader = compile("void main() { undeclared = 1.0; }", Stage::Vertex);
    assert!(!shader.succeeded());
    assert!(shader.info_log().contains("undeclared"));

    // The failed unit still finalizes so callers can report it.
    assert_eq!(shader.stage, Stage::Vertex);
}

#[test]
fn discard_outside_fragment_is_a_compile_error() {
    let shader = compile("void main() { discard; }", Stage::Vertex);
    assert!(!shader.succeeded());
    assert!(shader.info_log().contains("discard"));

    let shader = compile("void main() { discard; }", Stage::Fragment);
    assert!(shader.succeeded());
}

#[test]
fn call_without_declaration_fails_at_compile_time() {
    // Unlike a prototyped call (resolved at link), a call with no
    // declaration at all is a unit-level error.
    let shader = compile("void main() { float x = mystery(); }", Stage::Fragment);
    assert!(!shader.succeeded());
    assert!(shader.info_log().contains("mystery"));
}

#[test]
fn error_directive_fails_the_unit() {
    let shader = compile("#error not supported here\nvoid main() {}", Stage::Vertex);
    assert!(!shader.succeeded());
    assert!(shader.info_log().contains("not supported here"));
}

#[test]
fn failed_units_keep_their_version_when_detected() {
    let shader = compile("#version 130\nvoid main() { break; }", Stage::Vertex);
    assert!(!shader.succeeded());
    // Preprocessing succeeded, so the version survived the failure.
    assert_eq!(shader.version.unwrap().number, 130);
}
