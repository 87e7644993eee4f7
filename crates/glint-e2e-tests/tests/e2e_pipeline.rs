mod common;

use common::{compile, compile_with, link_stages};
use glint_ir::Stage;
use glint_pipeline::{CompileOptions, Dialect, PipelineDriver, SourceUnit};

#[test]
fn empty_vertex_and_fragment_compile_and_link_cleanly() {
    // Two syntactically valid, semantically empty units: success on both
    // ends with empty diagnostic logs.
    let program = link_stages(&[
        (Stage::Vertex, "void main() {}"),
        (Stage::Fragment, "void main() {}"),
    ]);
    assert!(program.succeeded());
    assert!(program.diagnostics.is_empty());
    for shader in &program.shaders {
        assert!(shader.succeeded());
        assert!(shader.diagnostics.is_empty());
    }
}

#[test]
fn structurally_empty_unit_compiles_to_empty_ir() {
    let shader = compile("", Stage::Vertex);
    assert!(shader.succeeded());
    assert!(shader.diagnostics.is_empty());
    let module = shader.ir.expect("empty unit still finalizes with a module");
    assert!(module.is_empty());

    // Comments and preprocessor-only content are structurally empty too.
    let shader = compile("// nothing here\n#define UNUSED 1\n", Stage::Fragment);
    assert!(shader.succeeded());
    assert!(shader.ir.unwrap().is_empty());
}

#[test]
fn version_directive_is_detected_and_recorded() {
    let shader = compile("#version 120\nvoid main() {}", Stage::Vertex);
    let version = shader.version.unwrap();
    assert_eq!(version.number, 120);
    assert!(!version.es);
}

#[test]
fn es_dialect_defaults_the_version() {
    let options = CompileOptions {
        dialect: Dialect::Es,
        ..Default::default()
    };
    let shader = compile_with("void main() {}", Stage::Fragment, options);
    let version = shader.version.unwrap();
    assert_eq!(version.number, 100);
    assert!(version.es);
}

#[test]
fn extensions_are_recorded_on_the_unit() {
    let shader = compile(
        "#extension GL_EXT_texture_array : enable\nvoid main() {}",
        Stage::Fragment,
    );
    assert!(shader.succeeded());
    assert_eq!(shader.extensions, vec!["GL_EXT_texture_array".to_string()]);
}

#[test]
fn surviving_state_outlives_the_compile_attempt() {
    // The transient compile state (and the driver) are gone by the time we
    // inspect the shader; every re-parented field must still be intact and
    // the module must still validate.
    let shader = {
        let driver = PipelineDriver::new(CompileOptions::default());
        let unit = SourceUnit::new(
            Stage::Vertex,
            "reparent.vert",
            "uniform mat4 mvp;\nin vec3 position;\nout vec2 uv;\n\
             void main() {\n    uv = position.xy;\n    gl_Position = mvp * vec4(position.x, position.y, position.z, 1.0);\n}",
        );
        driver.compile(&unit).expect("internal compiler error")
    };

    assert!(shader.succeeded());
    assert_eq!(shader.origin, "reparent.vert");
    let module = shader.ir.as_ref().expect("surviving IR");
    glint_ir::validate(module).expect("re-parented IR must still be well-formed");
    assert_eq!(shader.symbols.get("mvp").unwrap().ty, "mat4");
    assert_eq!(shader.symbols.get("uv").unwrap().ty, "vec2");
    assert!(shader.diagnostics.is_empty());
}

#[test]
fn dumps_are_captured_per_configuration() {
    let source = "void main() { gl_Position = vec4(1.0 + 2.0); }";

    let plain = compile(source, Stage::Vertex);
    assert!(plain.dumps.ast.is_none());
    assert!(plain.dumps.unoptimized_ir.is_none());
    assert!(plain.dumps.optimized_ir.is_none());

    let options = CompileOptions {
        dump_ast: true,
        dump_unoptimized_ir: true,
        dump_optimized_ir: true,
        ..Default::default()
    };
    let dumped = compile_with(source, Stage::Vertex, options);
    assert!(dumped.dumps.ast.unwrap().contains("fn main()"));
    let hir = dumped.dumps.unoptimized_ir.unwrap();
    assert!(hir.contains("Stage: vertex"));
    assert!(hir.contains("gl_Position"));
    // After optimization the folded constant appears in the dump.
    let lir = dumped.dumps.optimized_ir.unwrap();
    assert!(lir.contains("3.0"));
}

#[test]
fn fail_fast_batch_stops_while_keep_going_continues() {
    let units = vec![
        SourceUnit::new(Stage::Vertex, "bad.vert", "void main( {"),
        SourceUnit::new(Stage::Fragment, "good.frag", "void main() {}"),
    ];

    let fail_fast = PipelineDriver::new(CompileOptions::default());
    let shaders = fail_fast.compile_all(&units).unwrap();
    assert_eq!(shaders.len(), 1);

    let keep_going = PipelineDriver::new(CompileOptions {
        stop_on_first_failure: false,
        ..Default::default()
    });
    let shaders = keep_going.compile_all(&units).unwrap();
    assert_eq!(shaders.len(), 2);
    assert!(!shaders[0].succeeded());
    assert!(shaders[1].succeeded());
}

#[test]
fn geometry_stage_compiles_through_the_same_pipeline() {
    let shader = compile("void main() { gl_Position = vec4(0.0); }", Stage::Geometry);
    assert!(shader.succeeded());
    assert_eq!(shader.stage, Stage::Geometry);
}
