use glint_ir::Stage;
use glint_link::{link, BuiltinRegistry, ShaderProgram};
use glint_pipeline::{CompileOptions, CompiledShader, PipelineDriver, SourceUnit};

/// Compiles one source string with default options.
#[allow(dead_code)]
pub fn compile(source: &str, stage: Stage) -> CompiledShader {
    compile_with(source, stage, CompileOptions::default())
}

/// Compiles one source string with explicit options.
#[allow(dead_code)]
pub fn compile_with(source: &str, stage: Stage, options: CompileOptions) -> CompiledShader {
    let unit = SourceUnit::new(stage, format!("<test:{stage}>"), source);
    PipelineDriver::new(options)
        .compile(&unit)
        .expect("internal compiler error")
}

/// Compiles every stage and links against the default registry.
#[allow(dead_code)]
pub fn link_stages(sources: &[(Stage, &str)]) -> ShaderProgram {
    link_stages_with(sources, &BuiltinRegistry::with_defaults())
}

/// Compiles every stage and links against the given registry.
#[allow(dead_code)]
pub fn link_stages_with(sources: &[(Stage, &str)], registry: &BuiltinRegistry) -> ShaderProgram {
    let units: Vec<SourceUnit> = sources
        .iter()
        .map(|(stage, source)| SourceUnit::new(*stage, format!("<test:{stage}>"), *source))
        .collect();
    let shaders = PipelineDriver::new(CompileOptions::default())
        .compile_all(&units)
        .expect("internal compiler error");
    link(shaders, registry).expect("program configuration error")
}
