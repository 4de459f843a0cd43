//! Code related to the bundled demo properties and the CLI commands for interacting with them.
use super::{OutputOpts, handle_simulate_command};
use crate::property::PROPERTY_FILE_NAME;
use crate::settings::Settings;
use anyhow::{Context, Result, bail, ensure};
use clap::Subcommand;
use include_dir::{Dir, DirEntry, include_dir};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// The directory containing the demo properties.
static DEMOS_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/demos");

/// The trained model the demos are run against.
static DEMO_MODEL_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/data/model");

/// The available subcommands for managing demo properties.
#[derive(Subcommand)]
pub enum DemoSubcommands {
    /// List available demos.
    List,
    /// Provide information about the specified demo.
    Info {
        /// The name of the demo.
        name: String,
    },
    /// Extract a demo property to a new directory.
    Extract {
        /// The name of the demo to extract.
        name: String,
        /// The destination folder for the demo.
        new_path: Option<PathBuf>,
    },
    /// Simulate a demo property with the bundled model.
    Run {
        /// The name of the demo to run.
        name: String,
        /// Directory for output files
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
    },
}

impl DemoSubcommands {
    /// Execute the supplied demo subcommand
    pub fn execute(self) -> Result<()> {
        match self {
            Self::List => handle_demo_list_command(),
            Self::Info { name } => handle_demo_info_command(&name)?,
            Self::Extract {
                name,
                new_path: dest,
            } => handle_demo_extract_command(&name, dest.as_deref())?,
            Self::Run { name, output_dir } => {
                handle_demo_run_command(&name, output_dir.as_deref(), None)?;
            }
        }

        Ok(())
    }
}

/// The names of the bundled demos
pub fn demo_names() -> impl Iterator<Item = &'static str> {
    DEMOS_DIR
        .dirs()
        .filter_map(|dir| dir.path().file_name()?.to_str())
}

/// Handle the `demo list` command.
fn handle_demo_list_command() {
    for name in demo_names() {
        println!("{name}");
    }
}

/// Handle the `demo info` command.
fn handle_demo_info_command(name: &str) -> Result<()> {
    let path: PathBuf = [name, "README.txt"].iter().collect();
    let readme = DEMOS_DIR
        .get_file(path)
        .context("Demo not found.")?
        .contents_utf8()
        .context("README.txt is not UTF-8 encoded")?;

    println!("{readme}");

    Ok(())
}

/// Handle the `demo extract` command
fn handle_demo_extract_command(name: &str, dest: Option<&Path>) -> Result<()> {
    let dest = dest.unwrap_or(Path::new(name));
    let demo_dir = DEMOS_DIR.get_dir(name).context("Demo not found.")?;
    extract_dir(demo_dir, dest)
}

/// Copy the files in an embedded directory to a new directory on disk
fn extract_dir(dir: &Dir, new_path: &Path) -> Result<()> {
    ensure!(
        !new_path.exists(),
        "Destination directory {} already exists",
        new_path.display()
    );

    fs::create_dir_all(new_path)?;
    for entry in dir.entries() {
        match entry {
            DirEntry::Dir(sub_dir) => {
                bail!("Unexpected subdirectory {}", sub_dir.path().display())
            }
            DirEntry::File(f) => {
                let file_name = f.path().file_name().context("Invalid file path")?;
                fs::write(new_path.join(file_name), f.contents())?;
            }
        }
    }

    Ok(())
}

/// Handle the `demo run` command.
pub fn handle_demo_run_command(
    name: &str,
    output_dir: Option<&Path>,
    settings: Option<Settings>,
) -> Result<()> {
    let demo_dir = DEMOS_DIR.get_dir(name).context("Demo not found.")?;

    let temp_dir = TempDir::new().context("Failed to create temporary directory.")?;
    let property_dir = temp_dir.path().join(name);
    let model_dir = temp_dir.path().join("model");
    extract_dir(demo_dir, &property_dir)?;
    extract_dir(&DEMO_MODEL_DIR, &model_dir)?;

    let opts = OutputOpts {
        model_dir: Some(model_dir),
        output_dir: output_dir.map(Path::to_path_buf),
        overwrite: false,
    };
    handle_simulate_command(&property_dir.join(PROPERTY_FILE_NAME), &opts, settings)
}
