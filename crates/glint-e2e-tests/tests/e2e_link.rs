mod common;

use common::{compile, link_stages, link_stages_with};
use glint_ir::Stage;
use glint_link::{link, BuiltinRegistry, ProgramError};

#[test]
fn missing_builtin_compiles_but_fails_link() {
    // The fragment unit calls a prototyped, undefined function: unit
    // compilation succeeds and records the requirement; the link names it.
    let fragment_src =
        "vec4 env_lookup(vec2 p);\nvoid main() { gl_FragColor = env_lookup(vec2(0.5)); }";
    let fragment = compile(fragment_src, Stage::Fragment);
    assert!(fragment.succeeded());
    assert_eq!(fragment.required_builtins, vec!["env_lookup".to_string()]);

    let program = link_stages(&[
        (Stage::Vertex, "void main() {}"),
        (Stage::Fragment, fragment_src),
    ]);
    assert!(!program.succeeded());
    let log = program.info_log();
    assert!(log.contains("env_lookup"));
    assert!(log.contains("fragment"));
}

#[test]
fn registered_builtin_resolves_the_same_program() {
    let mut registry = BuiltinRegistry::with_defaults();
    registry.register("env_lookup");
    let program = link_stages_with(
        &[
            (Stage::Vertex, "void main() {}"),
            (
                Stage::Fragment,
                "vec4 env_lookup(vec2 p);\nvoid main() { gl_FragColor = env_lookup(vec2(0.5)); }",
            ),
        ],
        &registry,
    );
    assert!(program.succeeded(), "log: {}", program.info_log());
}

#[test]
fn default_registry_resolves_texturing() {
    let program = link_stages(&[
        (Stage::Vertex, "void main() {}"),
        (
            Stage::Fragment,
            "uniform sampler2D tex;\nvec4 texture2D(sampler2D s, vec2 uv);\n\
             void main() { gl_FragColor = texture2D(tex, vec2(0.5)); }",
        ),
    ]);
    assert!(program.succeeded(), "log: {}", program.info_log());
}

#[test]
fn interface_type_mismatch_names_variable_and_both_stages() {
    // Vertex produces `X: float`, fragment consumes `X: int`.
    let program = link_stages(&[
        (Stage::Vertex, "out float X;\nvoid main() { X = 1.0; }"),
        (
            Stage::Fragment,
            "in int X;\nvoid main() { gl_FragColor = vec4(1.0); }",
        ),
    ]);
    assert!(!program.succeeded());
    let log = program.info_log();
    assert!(log.contains("`X`"));
    assert!(log.contains("vertex"));
    assert!(log.contains("fragment"));
}

#[test]
fn matched_interface_links_and_is_resolved() {
    let program = link_stages(&[
        (
            Stage::Vertex,
            "out vec2 uv;\nvoid main() { uv = vec2(0.0); gl_Position = vec4(0.0); }",
        ),
        (
            Stage::Fragment,
            "in vec2 uv;\nvoid main() { gl_FragColor = vec4(uv.x, uv.y, 0.0, 1.0); }",
        ),
    ]);
    assert!(program.succeeded(), "log: {}", program.info_log());
    let interface = program.interface.unwrap();
    assert_eq!(interface.varyings.len(), 1);
    assert_eq!(interface.varyings[0].name, "uv");
    assert_eq!(interface.varyings[0].ty, "vec2");
}

#[test]
fn link_failure_is_monotonic_in_compile_status() {
    // A program whose fragment stage failed can never link successfully,
    // and its diagnostics are aggregated into the link log.
    let program = link_stages(&[
        (Stage::Vertex, "void main() {}"),
        (Stage::Fragment, "void main() { float x = nope; }"),
    ]);
    assert!(!program.succeeded());
    assert!(program.info_log().contains("failed to compile"));
    assert!(program.info_log().contains("nope"));
    assert!(program.interface.is_none());
}

#[test]
fn configuration_errors_precede_resolution() {
    let registry = BuiltinRegistry::with_defaults();
    assert!(matches!(
        link(Vec::new(), &registry),
        Err(ProgramError::NoShaders)
    ));

    let duplicates = vec![
        compile("void main() {}", Stage::Fragment),
        compile("void main() {}", Stage::Fragment),
    ];
    assert!(matches!(
        link(duplicates, &registry),
        Err(ProgramError::DuplicateStage {
            stage: Stage::Fragment
        })
    ));
}

#[test]
fn geometry_sits_between_vertex_and_fragment() {
    // The geometry stage consumes vertex outputs and feeds fragment inputs.
    let program = link_stages(&[
        (
            Stage::Vertex,
            "out vec3 color_v;\nvoid main() { color_v = vec3(1.0); }",
        ),
        (
            Stage::Geometry,
            "in vec3 color_v;\nout vec3 color_g;\nvoid main() { color_g = color_v; }",
        ),
        (
            Stage::Fragment,
            "in vec3 color_g;\nvoid main() { gl_FragColor = vec4(color_g.x, color_g.y, color_g.z, 1.0); }",
        ),
    ]);
    assert!(program.succeeded(), "log: {}", program.info_log());
    assert_eq!(program.interface.unwrap().varyings.len(), 2);
}

#[test]
fn stage_order_is_normalized() {
    // Shaders can be attached in any order; the program sorts them.
    let program = link_stages(&[
        (Stage::Fragment, "in float f;\nvoid main() {}"),
        (Stage::Vertex, "out float f;\nvoid main() { f = 2.0; }"),
    ]);
    assert!(program.succeeded(), "log: {}", program.info_log());
    assert_eq!(program.shaders[0].stage, Stage::Vertex);
    assert_eq!(program.shaders[1].stage, Stage::Fragment);
}
