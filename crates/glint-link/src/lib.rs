//! Program linking for the glint shader compiler.
//!
//! Combines independently compiled stage shaders into one program: verifies
//! every contributing shader compiled, resolves interface variables between
//! adjacent stages by name and type, checks uniforms for conflicting
//! declarations, and resolves required built-ins against the shared
//! [`BuiltinRegistry`]. Unlike per-unit compilation, linking is not
//! fail-fast: every discoverable error is collected before the verdict.

mod builtins;

pub use builtins::BuiltinRegistry;

use glint_ir::{Diagnostic, DiagnosticLog, ExportedSymbol, Stage, StorageQualifier};
use glint_pipeline::CompiledShader;

/// The single link verdict.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LinkStatus {
    Success,
    Failure,
}

/// One interface variable successfully bound between two stages.
#[derive(Clone, Debug)]
pub struct ResolvedVarying {
    pub name: String,
    pub ty: String,
    pub producer: Stage,
    pub consumer: Stage,
}

/// The combined interface of a successfully linked program.
#[derive(Clone, Debug, Default)]
pub struct ProgramInterface {
    /// Cross-stage variables, in consumer declaration order.
    pub varyings: Vec<ResolvedVarying>,
    /// Merged uniforms across all stages, deduplicated by name.
    pub uniforms: Vec<ExportedSymbol>,
    /// Built-ins resolved from the registry, in stage order.
    pub builtins: Vec<String>,
}

/// A linked (or failed-to-link) shader program.
#[derive(Debug)]
pub struct ShaderProgram {
    /// The contributing shaders, in stage order.
    pub shaders: Vec<CompiledShader>,
    pub status: LinkStatus,
    /// The consolidated link log.
    pub diagnostics: DiagnosticLog,
    /// Populated only on success.
    pub interface: Option<ProgramInterface>,
}

impl ShaderProgram {
    /// `true` if the link verdict is success.
    pub fn succeeded(&self) -> bool {
        self.status == LinkStatus::Success
    }

    /// The link log as printable text.
    pub fn info_log(&self) -> String {
        self.diagnostics.to_string()
    }

    /// The contributing shader for a stage, if present.
    pub fn shader(&self, stage: Stage) -> Option<&CompiledShader> {
        self.shaders.iter().find(|s| s.stage == stage)
    }
}

/// A program configuration error, reported before any resolution work.
#[derive(Debug, thiserror::Error)]
pub enum ProgramError {
    /// A program needs at least one stage.
    #[error("cannot link a program with no shaders")]
    NoShaders,
    /// At most one shader may fill each stage slot.
    #[error("more than one {stage} shader attached to the program")]
    DuplicateStage { stage: Stage },
}

/// Links compiled stage shaders into a program.
pub fn link(
    mut shaders: Vec<CompiledShader>,
    registry: &BuiltinRegistry,
) -> Result<ShaderProgram, ProgramError> {
    if shaders.is_empty() {
        return Err(ProgramError::NoShaders);
    }
    for stage in Stage::ALL {
        if shaders.iter().filter(|s| s.stage == stage).count() > 1 {
            return Err(ProgramError::DuplicateStage { stage });
        }
    }
    shaders.sort_by_key(|s| s.stage);

    let mut log = DiagnosticLog::new();

    // 1. Aggregate diagnostics from failed stages; a single failure decides
    //    the verdict, but every failed stage is reported.
    let any_failed = shaders.iter().any(|s| !s.succeeded());
    for shader in shaders.iter().filter(|s| !s.succeeded()) {
        log.push(Diagnostic::error(format!(
            "{} shader `{}` failed to compile",
            shader.stage, shader.origin
        )));
        log.extend(shader.diagnostics.iter().cloned());
    }

    let mut interface = ProgramInterface::default();
    if !any_failed {
        // 2. Every linked stage must define main.
        for shader in &shaders {
            let has_main = shader
                .ir
                .as_ref()
                .and_then(|module| module.entry_point)
                .is_some();
            if !has_main {
                log.push(Diagnostic::error(format!(
                    "{} shader `{}` does not define `void main()`",
                    shader.stage, shader.origin
                )));
            }
        }

        // 3. Interface variables between adjacent present stages.
        for pair in shaders.windows(2) {
            resolve_interface(&pair[0], &pair[1], &mut log, &mut interface.varyings);
        }

        // 4. Uniforms must agree across stages.
        interface.uniforms = collect_uniforms(&shaders, &mut log);

        // 5. Required built-ins against the shared registry.
        for shader in &shaders {
            for name in &shader.required_builtins {
                match registry.resolve(name) {
                    Some(resolved) => interface.builtins.push(resolved.to_string()),
                    None => log.push(Diagnostic::error(format!(
                        "unresolved built-in function `{name}` referenced by the {} shader",
                        shader.stage
                    ))),
                }
            }
        }
    }

    let status = if any_failed || log.has_errors() {
        LinkStatus::Failure
    } else {
        LinkStatus::Success
    };
    log::debug!(
        "linked {} stage(s): {status:?}, {} diagnostic(s)",
        shaders.len(),
        log.len()
    );

    Ok(ShaderProgram {
        shaders,
        status,
        diagnostics: log,
        interface: (status == LinkStatus::Success).then_some(interface),
    })
}

/// Binds the consumer's inputs against the producer's outputs by name, then
/// checks the types. All mismatches are reported; resolution never stops at
/// the first error.
fn resolve_interface(
    producer: &CompiledShader,
    consumer: &CompiledShader,
    log: &mut DiagnosticLog,
    varyings: &mut Vec<ResolvedVarying>,
) {
    for symbol in consumer
        .symbols
        .iter()
        .filter(|s| s.qualifier == StorageQualifier::Input)
    {
        let matched = producer
            .symbols
            .get(&symbol.name)
            .filter(|p| p.qualifier == StorageQualifier::Output);
        match matched {
            None => log.push(Diagnostic::error(format!(
                "{} shader input `{}` has no matching output in the {} shader",
                consumer.stage, symbol.name, producer.stage
            ))),
            Some(produced) if produced.ty != symbol.ty => {
                log.push(Diagnostic::error(format!(
                    "type mismatch for interface variable `{}`: the {} shader provides `{}` but the {} shader consumes `{}`",
                    symbol.name, producer.stage, produced.ty, consumer.stage, symbol.ty
                )));
            }
            Some(produced) => varyings.push(ResolvedVarying {
                name: symbol.name.clone(),
                ty: produced.ty.clone(),
                producer: producer.stage,
                consumer: consumer.stage,
            }),
        }
    }
}

/// Merges uniforms across stages, reporting conflicting redeclarations.
fn collect_uniforms(shaders: &[CompiledShader], log: &mut DiagnosticLog) -> Vec<ExportedSymbol> {
    let mut merged: Vec<(ExportedSymbol, Stage)> = Vec::new();
    for shader in shaders {
        for symbol in shader
            .symbols
            .iter()
            .filter(|s| s.qualifier == StorageQualifier::Uniform)
        {
            let previous = merged
                .iter()
                .find(|(m, _)| m.name == symbol.name)
                .map(|(m, stage)| (m.ty.clone(), *stage));
            match previous {
                None => merged.push((symbol.clone(), shader.stage)),
                Some((previous_ty, previous_stage)) if previous_ty != symbol.ty => {
                    log.push(Diagnostic::error(format!(
                        "uniform `{}` declared as `{}` in the {} shader but `{}` in the {} shader",
                        symbol.name, previous_ty, previous_stage, symbol.ty, shader.stage
                    )));
                }
                Some(_) => {}
            }
        }
    }
    merged.into_iter().map(|(symbol, _)| symbol).collect()
}
