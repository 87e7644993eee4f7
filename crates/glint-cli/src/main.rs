use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use miette::{Context, IntoDiagnostic};

use glint_link::{link, BuiltinRegistry};
use glint_pipeline::{CompileOptions, Dialect, PipelineDriver, SourceUnit};

/// glint — shading-language compiler and linker
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// Input shader files (.vert, .geom, .frag)
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Compile with ES dialect defaults
    #[arg(long)]
    es: bool,

    /// Print the parsed AST for each unit
    #[arg(long)]
    dump_ast: bool,

    /// Print the IR as lowered, before optimization
    #[arg(long)]
    dump_hir: bool,

    /// Print the IR after optimization
    #[arg(long)]
    dump_lir: bool,

    /// Link the compiled stages into a program
    #[arg(long)]
    link: bool,

    /// Compile every unit even after a failure
    #[arg(long)]
    keep_going: bool,
}

fn main() -> ExitCode {
    env_logger::init();
    match run() {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            eprintln!("Error: {err:?}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> miette::Result<bool> {
    let cli = Cli::parse();

    let options = CompileOptions {
        dialect: if cli.es { Dialect::Es } else { Dialect::Core },
        dump_ast: cli.dump_ast,
        dump_unoptimized_ir: cli.dump_hir,
        dump_optimized_ir: cli.dump_lir,
        stop_on_first_failure: !cli.keep_going,
        ..Default::default()
    };

    // 1. Load and classify every input before compiling anything; a bad
    //    path or suffix is a usage error, not a compile diagnostic.
    let mut units = Vec::with_capacity(cli.files.len());
    for path in &cli.files {
        let source = std::fs::read_to_string(path)
            .into_diagnostic()
            .wrap_err_with(|| format!("failed to read {}", path.display()))?;
        let unit = SourceUnit::from_path(path, source).into_diagnostic()?;
        units.push(unit);
    }

    // 2. Compile. Internal IR invariant failures abort the whole run here.
    let driver = PipelineDriver::new(options);
    let shaders = driver.compile_all(&units).into_diagnostic()?;

    // 3. Report per-unit results and requested dumps.
    let mut ok = true;
    for shader in &shaders {
        for dump in [
            &shader.dumps.ast,
            &shader.dumps.unoptimized_ir,
            &shader.dumps.optimized_ir,
        ]
        .into_iter()
        .flatten()
        {
            println!("{dump}");
        }
        if !shader.succeeded() {
            ok = false;
            println!("Info log for {}:\n{}", shader.origin, shader.diagnostics);
        }
    }

    // 4. Link on request, only if every unit compiled.
    if ok && cli.link {
        let registry = BuiltinRegistry::with_defaults();
        let program = link(shaders, &registry)
            .into_diagnostic()
            .wrap_err("program configuration error")?;
        if !program.diagnostics.is_empty() {
            println!("Info log for linking:\n{}", program.diagnostics);
        }
        ok = program.succeeded();
    }

    Ok(ok)
}
