//! Kiln's main application entry point.
//! Parses arguments, runs the composition pipeline and writes the document
//! together with any contributed configuration files.

use kiln::{
    cli::{get_args, get_output_path, plan_config_files, write_file, Args},
    config::{ProjectConfig, SchemaValidator},
    error::{default_error_handler, Error, Result},
    generator::Generator,
    logger::init_logger,
    providers::builtin_registry,
    template::{TemplateEngine, DEFAULT_TEMPLATE},
};
use log::{info, warn};

/// Main application entry point.
#[tokio::main(flavor = "current_thread")]
async fn main() {
    let args = get_args();
    init_logger(args.verbose);

    if let Err(err) = run(args).await {
        default_error_handler(err);
    }
}

/// Main application logic execution.
///
/// # Flow
/// 1. Loads the answers file
/// 2. Prepares the registry, template engine and validator
/// 3. Runs the composition pipeline
/// 4. Checks every target, then writes the document and, if requested, the
///    contributed files
async fn run(args: Args) -> Result<()> {
    let config = ProjectConfig::load(&args.answers)?;
    let registry = builtin_registry()?;

    let mut engine = TemplateEngine::with_default_partials();
    if let Some(dir) = &args.partials {
        let count = engine.register_partials_from_dir(dir)?;
        info!("Registered {} partials from {}", count, dir.display());
    }

    let validator = match &args.schema {
        Some(path) => SchemaValidator::load(path)?,
        None => SchemaValidator::new(),
    };

    let output = get_output_path(args.output.as_deref(), args.force)?;
    let generator = Generator::new(&registry, &engine).with_validator(validator);
    let generation = match &args.template {
        Some(path) => generator.generate_from_file(config, path).await?,
        None => generator.generate(config, DEFAULT_TEMPLATE).await?,
    };
    let composition = &generation.composition;

    if args.strict && !composition.conflicts.is_empty() {
        return Err(Error::IncompatibleProviders {
            conflicts: composition.conflicts.iter().map(ToString::to_string).collect(),
        });
    }
    for warning in &composition.warnings {
        warn!("{}", warning);
    }

    let planned = match &args.files_dir {
        Some(dir) => plan_config_files(dir, &composition.config_files, args.force)?,
        None => Vec::new(),
    };

    match &output {
        Some(path) => write_file(&generation.document, path)?,
        None => print!("{}", generation.document),
    }
    for (target, file) in planned {
        write_file(&file.content, &target)?;
        info!("Wrote '{}'", target.display());
    }

    if let Some(path) = output {
        println!("Setup document written to {}.", path.display());
    }
    Ok(())
}
