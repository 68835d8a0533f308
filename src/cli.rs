//! Command-line interface implementation for kiln.
//! Provides argument parsing and help text formatting using clap.

use crate::capability::ConfigFile;
use crate::error::{Error, Result};
use clap::{error::ErrorKind, CommandFactory, Parser};
use log::warn;
use std::path::{Component, Path, PathBuf};

/// Command-line arguments structure for kiln.
#[derive(Parser, Debug)]
#[command(author, version, about = "kiln: compose project setup documents from capability providers", long_about = None)]
pub struct Args {
    /// Path to the answers file (JSON or YAML)
    #[arg(value_name = "ANSWERS")]
    pub answers: PathBuf,

    /// Master template to render instead of the built-in one
    #[arg(short, long, value_name = "FILE")]
    pub template: Option<PathBuf>,

    /// File the document is written to; prints to stdout when omitted
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Directory of additional partials (*.md, *.hbs, *.tpl)
    #[arg(long, value_name = "DIR")]
    pub partials: Option<PathBuf>,

    /// JSON schema the answers are validated against
    #[arg(long, value_name = "FILE")]
    pub schema: Option<PathBuf>,

    /// Also write every contributed configuration file into this directory
    #[arg(long, value_name = "DIR")]
    pub files_dir: Option<PathBuf>,

    /// Force overwrite of existing output files
    #[arg(short, long)]
    pub force: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Fail instead of warning when selected providers are incompatible
    #[arg(long)]
    pub strict: bool,
}

/// Parses command line arguments and returns the Args structure.
///
/// # Returns
/// * `Args` - Parsed command line arguments
///
/// # Exits
/// * With status code 1 if required arguments are missing
/// * With clap's default error handling for other argument errors
pub fn get_args() -> Args {
    match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            if e.kind() == ErrorKind::MissingRequiredArgument {
                // Nothing useful can be done if stdout is closed.
                let _ = Args::command()
                    .help_template(
                        r#"{about-section}
{usage-heading} {usage}

{all-args}
{after-help}
"#,
                    )
                    .print_help();
                std::process::exit(1);
            } else {
                e.exit();
            }
        }
    }
}

/// Ensures the output file is safe to write to.
///
/// # Arguments
/// * `output` - Target file, `None` for stdout
/// * `force` - Whether to overwrite an existing file
///
/// # Errors
/// * Returns `Error::OutputExistsError` if the file exists and force is false
pub fn get_output_path(output: Option<&Path>, force: bool) -> Result<Option<PathBuf>> {
    match output {
        Some(path) if path.exists() && !force => {
            Err(Error::OutputExistsError { output: path.display().to_string() })
        }
        other => Ok(other.map(Path::to_path_buf)),
    }
}

/// Resolves where each contributed file goes under `dir`.
///
/// Every target is checked before anything is written, so a refused
/// overwrite leaves the disk untouched. Names that are empty or would leave
/// `dir` are skipped with a warning.
///
/// # Errors
/// * Returns `Error::OutputExistsError` for the first existing target when force is false
pub fn plan_config_files<'a>(
    dir: &Path,
    files: &'a [ConfigFile],
    force: bool,
) -> Result<Vec<(PathBuf, &'a ConfigFile)>> {
    let mut plan = Vec::with_capacity(files.len());
    for file in files {
        if !is_contained(&file.name) {
            warn!("Skipping config file '{}' outside the target directory", file.name);
            continue;
        }
        let target = dir.join(&file.name);
        if target.exists() && !force {
            return Err(Error::OutputExistsError { output: target.display().to_string() });
        }
        plan.push((target, file));
    }
    Ok(plan)
}

/// Writes `content` to `dest_path`, creating parent directories.
pub fn write_file<P: AsRef<Path>>(content: &str, dest_path: P) -> Result<()> {
    let dest_path = dest_path.as_ref();
    if let Some(parent) = dest_path.parent() {
        std::fs::create_dir_all(parent).map_err(Error::IoError)?;
    }
    std::fs::write(dest_path, content).map_err(Error::IoError)
}

/// Provider file names must name a file inside the target directory.
fn is_contained(name: &str) -> bool {
    let path = Path::new(name);
    path.file_name().is_some()
        && path.components().all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
