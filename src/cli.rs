//! The command line interface for the simulator.
use crate::constants::FeatureConstants;
use crate::engine::{RoiEngine, RoiMetric};
use crate::log;
use crate::output::{
    SENSITIVITY_FILE_NAME, SIMULATION_LOG_FILE_NAME, SimulationLogRow, append_simulation_log,
    create_output_directory, get_output_dir, write_sensitivity,
};
use crate::property::PropertyConfig;
use crate::roi::RoiResult;
use crate::sensitivity::{SensitivityMode, SensitivityRanges, SensitivityResult};
use crate::settings::Settings;
use ::log::{info, warn};
use anyhow::{Context, Result, ensure};
use clap::{Args, CommandFactory, Parser, Subcommand};
use std::fmt::Write;
use std::path::{Path, PathBuf};

pub mod demo;
use demo::DemoSubcommands;
pub mod settings;
use settings::SettingsSubcommands;

/// Years over which cumulative savings are reported
const SAVINGS_HORIZONS: [u32; 2] = [5, 10];

/// The command line interface for the simulator.
#[derive(Parser)]
#[command(version, about)]
struct Cli {
    /// The available commands.
    #[command(subcommand)]
    command: Option<Commands>,
    /// Flag to provide the CLI docs as markdown
    #[arg(long, hide = true)]
    markdown_help: bool,
}

/// Options shared by commands which write output files
#[derive(Args, Default)]
pub struct OutputOpts {
    /// Directory containing the trained model
    #[arg(short, long)]
    pub model_dir: Option<PathBuf>,
    /// Directory for output files
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,
    /// Whether to overwrite existing output files
    #[arg(long)]
    pub overwrite: bool,
}

/// Options for the sensitivity command
#[derive(Args, Default)]
pub struct SensitivityOpts {
    /// How smart features are swept
    #[arg(long, value_enum)]
    pub mode: Option<SensitivityMode>,
    /// The ROI figure to analyse
    #[arg(long, value_enum, default_value_t)]
    pub metric: RoiMetric,
    /// Fractional spread either side of baseline for rent and price (e.g. 0.3 for ±30%)
    #[arg(long)]
    pub spread: Option<f64>,
    /// Output options
    #[command(flatten)]
    pub output: OutputOpts,
}

/// The available commands.
#[derive(Subcommand)]
enum Commands {
    /// Calculate ROI for a property.
    Simulate {
        /// Path to the property file.
        property_file: PathBuf,
        /// Other options
        #[command(flatten)]
        opts: OutputOpts,
    },
    /// Rank the variables which most affect ROI for a property.
    Sensitivity {
        /// Path to the property file.
        property_file: PathBuf,
        /// Other options
        #[command(flatten)]
        opts: SensitivityOpts,
    },
    /// Validate a trained model.
    Validate {
        /// The path to the model directory.
        model_dir: PathBuf,
    },
    /// Manage demo properties.
    Demo {
        /// The available subcommands for managing demo properties.
        #[command(subcommand)]
        subcommand: DemoSubcommands,
    },
    /// Manage program settings.
    Settings {
        /// The subcommands for managing settings.
        #[command(subcommand)]
        subcommand: SettingsSubcommands,
    },
}

impl Commands {
    /// Execute the supplied CLI command
    fn execute(self) -> Result<()> {
        match self {
            Self::Simulate {
                property_file,
                opts,
            } => handle_simulate_command(&property_file, &opts, None),
            Self::Sensitivity {
                property_file,
                opts,
            } => handle_sensitivity_command(&property_file, &opts, None),
            Self::Validate { model_dir } => handle_validate_command(&model_dir, None),
            Self::Demo { subcommand } => subcommand.execute(),
            Self::Settings { subcommand } => subcommand.execute(),
        }
    }
}

/// Parse CLI arguments and run the requested command
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();

    // Invoked as: `$ smartroi --markdown-help`
    if cli.markdown_help {
        clap_markdown::print_help_markdown::<Cli>();
        return Ok(());
    }

    let Some(command) = cli.command else {
        let help_str = Cli::command().render_long_help().to_string();
        println!("{help_str}");
        return Ok(());
    };

    command.execute()
}

/// Load program settings, if not provided
fn load_settings(settings: Option<Settings>) -> Result<Settings> {
    match settings {
        Some(settings) => Ok(settings),
        None => Settings::load().context("Failed to load settings."),
    }
}

/// Work out the output directory, create it and start logging to it
fn prepare_output(
    property_path: &Path,
    opts: &OutputOpts,
    settings: &Settings,
) -> Result<PathBuf> {
    let output_dir = match &opts.output_dir {
        Some(dir) => dir.clone(),
        None => get_output_dir(property_path)?,
    };
    create_output_directory(&output_dir).with_context(|| {
        format!(
            "Failed to create output directory: {}",
            output_dir.display()
        )
    })?;

    log::init(&settings.log_level, Some(&output_dir)).context("Failed to initialise logging.")?;
    info!("Output folder: {}", output_dir.display());

    Ok(output_dir)
}

/// Load the engine, with a trained model if a model directory is known
fn load_engine(opts: &OutputOpts, settings: &Settings) -> Result<RoiEngine> {
    match opts.model_dir.as_ref().or(settings.model_dir.as_ref()) {
        Some(model_dir) => RoiEngine::from_path(model_dir),
        None => {
            info!("No model directory given; predicted ROI will not be calculated");
            Ok(RoiEngine::deterministic(FeatureConstants::default()))
        }
    }
}

/// Warn if any categorical values were missing from the model's vocabulary
fn report_unseen_categories(engine: &RoiEngine) {
    let Some(predictor) = engine.predictor() else {
        return;
    };

    let count = predictor.encoder().unseen_category_count();
    if count > 0 {
        warn!("{count} categorical value(s) were unknown to the model and encoded as zeros");
    }
}

/// Handle the `simulate` command.
pub fn handle_simulate_command(
    property_path: &Path,
    opts: &OutputOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    let output_dir = prepare_output(property_path, opts, &settings)?;

    let property = PropertyConfig::from_path(property_path).context("Failed to load property.")?;
    info!("Loaded property from {}", property_path.display());
    let engine = load_engine(opts, &settings)?;

    let result = engine.compute_roi(&property)?;
    report_unseen_categories(&engine);
    print!("{}", format_summary(&result));

    let overwrite = opts.overwrite || settings.overwrite;
    let log_path = output_dir.join(SIMULATION_LOG_FILE_NAME);
    append_simulation_log(&log_path, &SimulationLogRow::new(&property, &result), overwrite)?;
    info!("Simulation logged to {}", log_path.display());

    Ok(())
}

/// Handle the `sensitivity` command.
pub fn handle_sensitivity_command(
    property_path: &Path,
    opts: &SensitivityOpts,
    settings: Option<Settings>,
) -> Result<()> {
    let settings = load_settings(settings)?;
    let output_dir = prepare_output(property_path, &opts.output, &settings)?;
    let file_path = output_dir.join(SENSITIVITY_FILE_NAME);
    ensure!(
        opts.output.overwrite || settings.overwrite || !file_path.exists(),
        "{} already exists (use --overwrite to replace it)",
        file_path.display()
    );

    let property = PropertyConfig::from_path(property_path).context("Failed to load property.")?;
    let engine = load_engine(&opts.output, &settings)?;
    let mode = opts.mode.unwrap_or(settings.sensitivity_mode);
    let spread = opts.spread.unwrap_or(settings.sensitivity_spread);
    let ranges = SensitivityRanges::around_baseline(&property, spread)?;
    info!("Running {mode:?} sensitivity analysis on {:?} ROI", opts.metric);

    let result = engine.run_sensitivity(&property, &ranges, mode, opts.metric)?;
    report_unseen_categories(&engine);
    print!("{}", format_sensitivity_table(&result));

    write_sensitivity(&file_path, &result)?;
    info!("Sensitivity results written to {}", file_path.display());

    Ok(())
}

/// Handle the `validate` command.
pub fn handle_validate_command(model_dir: &Path, settings: Option<Settings>) -> Result<()> {
    let settings = load_settings(settings)?;

    // Log files aren't written when validating
    log::init(&settings.log_level, None).context("Failed to initialise logging.")?;

    RoiEngine::from_path(model_dir).context("Failed to validate model.")?;
    info!("Model validation successful!");

    Ok(())
}

/// Format the results of a simulation for the console
pub fn format_summary(result: &RoiResult) -> String {
    let expenses = &result.expense_breakdown;
    let mut out = String::new();
    writeln!(out, "Annual rent:           {:>12.2}", result.annual_rent.value()).unwrap();
    writeln!(
        out,
        "Annual expenses:       {:>12.2} (tax {:.2}, maintenance {:.2}, insurance {:.2}, agent fees {:.2})",
        expenses.total.value(),
        expenses.tax.value(),
        expenses.maintenance.value(),
        expenses.insurance.value(),
        expenses.agent_fees.value()
    )
    .unwrap();
    writeln!(out, "Annual smart savings:  {:>12.2}", result.annual_savings().value()).unwrap();
    for years in SAVINGS_HORIZONS {
        let label = format!("Savings over {years} years:");
        writeln!(out, "{label:<23}{:>12.2}", result.savings.lifetime(years).value()).unwrap();
    }
    writeln!(out, "Net income:            {:>12.2}", result.net_income().value()).unwrap();
    writeln!(
        out,
        "Net income (smart):    {:>12.2}",
        result.net_income_with_savings().value()
    )
    .unwrap();
    writeln!(out, "Traditional ROI:       {:>11.2}%", result.traditional_roi.value()).unwrap();
    writeln!(out, "Smart ROI:             {:>11.2}%", result.smart_roi.value()).unwrap();
    if let Some(predicted) = result.predicted_roi {
        writeln!(out, "Predicted ROI:         {:>11.2}%", predicted.value()).unwrap();
    }

    out
}

/// Format sensitivity results as a table, largest impact first
pub fn format_sensitivity_table(result: &SensitivityResult) -> String {
    let mut out = format!(
        "{:<22}{:>12}{:>12}{:>12}\n",
        "Variable", "ROI @ low", "ROI @ high", "Impact"
    );
    for entry in result.iter() {
        writeln!(
            out,
            "{:<22}{:>11.2}%{:>11.2}%{:>11.2}%",
            entry.variable.label(),
            entry.roi_at_low.value(),
            entry.roi_at_high.value(),
            entry.impact.value()
        )
        .unwrap();
    }

    out
}
