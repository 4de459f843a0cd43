//! The module responsible for writing output data to disk.
use crate::feature::SmartFeature;
use crate::property::PropertyConfig;
use crate::roi::RoiResult;
use crate::sensitivity::SensitivityResult;
use crate::units::Percent;
use anyhow::{Context, Result};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

/// The root folder in which property-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "smartroi_results";

/// The output file name for the simulation log
pub const SIMULATION_LOG_FILE_NAME: &str = "simulation_log.csv";

/// The output file name for sensitivity results
pub const SENSITIVITY_FILE_NAME: &str = "sensitivity.csv";

/// The number of decimal places ROI figures are logged with
const ROI_DECIMAL_PLACES: i32 = 2;

/// Get the default output directory for the specified property file
pub fn get_output_dir(property_path: &Path) -> Result<PathBuf> {
    let property_path = property_path
        .canonicalize()
        .context("Could not resolve path to property file")?;

    // Name the folder after the directory the property file is in, as demos each have their own
    let name = property_path
        .parent()
        .and_then(Path::file_name)
        .context("Property file cannot be in root folder")?
        .to_str()
        .context("Invalid chars in property dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, name].iter().collect())
}

/// Create the output directory (with parents) if it doesn't already exist
pub fn create_output_directory(output_dir: &Path) -> Result<()> {
    if output_dir.is_dir() {
        return Ok(());
    }

    fs::create_dir_all(output_dir)?;

    Ok(())
}

fn round_roi(roi: Percent) -> f64 {
    roi.round_to(ROI_DECIMAL_PLACES).value()
}

/// A row of the simulation log
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SimulationLogRow {
    timestamp: String,
    market_price: f64,
    monthly_rent: f64,
    has_solar: bool,
    has_water_recycling: bool,
    has_smart_locks: bool,
    has_smart_thermostats: bool,
    has_integrated_security: bool,
    has_ev_charging: bool,
    predicted_roi: Option<f64>,
    traditional_roi: f64,
    smart_roi: f64,
}

impl SimulationLogRow {
    /// Create a row for a simulation run now
    pub fn new(property: &PropertyConfig, result: &RoiResult) -> Self {
        let has = |feature| property.smart_features.is_present(feature);
        Self {
            timestamp: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            market_price: property.market_price.value(),
            monthly_rent: property.monthly_rent.value(),
            has_solar: has(SmartFeature::Solar),
            has_water_recycling: has(SmartFeature::WaterRecycling),
            has_smart_locks: has(SmartFeature::SmartLocks),
            has_smart_thermostats: has(SmartFeature::SmartThermostats),
            has_integrated_security: has(SmartFeature::IntegratedSecurity),
            has_ev_charging: has(SmartFeature::EvCharging),
            predicted_roi: result.predicted_roi.map(round_roi),
            traditional_roi: round_roi(result.traditional_roi),
            smart_roi: round_roi(result.smart_roi),
        }
    }
}

/// Append a row to the simulation log, writing a header first if the file is new or empty.
///
/// If `overwrite` is set, any existing log is replaced.
pub fn append_simulation_log(
    file_path: &Path,
    row: &SimulationLogRow,
    overwrite: bool,
) -> Result<()> {
    let is_new = overwrite || !fs::metadata(file_path).is_ok_and(|meta| meta.len() > 0);
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(!overwrite)
        .truncate(overwrite)
        .open(file_path)
        .with_context(|| format!("Could not open {}", file_path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(is_new)
        .from_writer(file);
    writer.serialize(row)?;
    writer.flush()?;

    Ok(())
}

/// Represents a row in the sensitivity CSV file
#[derive(Serialize, Deserialize, Debug, PartialEq)]
struct SensitivityRow {
    variable: String,
    roi_at_low: f64,
    roi_at_high: f64,
    impact: f64,
}

/// Write sensitivity results to a CSV file, in descending order of impact
pub fn write_sensitivity(file_path: &Path, result: &SensitivityResult) -> Result<()> {
    let mut writer = csv::Writer::from_path(file_path)
        .with_context(|| format!("Could not create {}", file_path.display()))?;
    for entry in result.iter() {
        writer.serialize(SensitivityRow {
            variable: entry.variable.to_string(),
            roi_at_low: entry.roi_at_low.value(),
            roi_at_high: entry.roi_at_high.value(),
            impact: entry.impact.value(),
        })?;
    }
    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::FeatureConstants;
    use crate::fixture::{constants, property};
    use crate::roi::compute_roi;
    use crate::sensitivity::{SensitivityMode, SensitivityRanges, run_sensitivity};
    use itertools::Itertools;
    use rstest::{fixture, rstest};
    use std::convert::Infallible;
    use tempfile::tempdir;

    #[fixture]
    fn row(constants: FeatureConstants, property: PropertyConfig) -> SimulationLogRow {
        let result = compute_roi(
            property.market_price,
            property.monthly_rent,
            &property.smart_features,
            &constants,
        );
        SimulationLogRow::new(&property, &result.with_prediction(Percent(5.4321)))
    }

    fn read_rows(file_path: &Path) -> Vec<SimulationLogRow> {
        csv::Reader::from_path(file_path)
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap()
    }

    #[rstest]
    fn test_simulation_log_row(row: SimulationLogRow) {
        assert_eq!(row.market_price, 120_000.0);
        assert!(row.has_solar);
        assert!(!row.has_ev_charging);
        assert_eq!(row.traditional_roi, 6.1);
        assert_eq!(row.smart_roi, 6.9);
        assert_eq!(row.predicted_roi, Some(5.43));
    }

    #[rstest]
    fn test_append_simulation_log(row: SimulationLogRow) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SIMULATION_LOG_FILE_NAME);

        append_simulation_log(&file_path, &row, false).unwrap();
        append_simulation_log(&file_path, &row, false).unwrap();
        assert_eq!(read_rows(&file_path), [row.clone(), row.clone()]);

        // Only one header
        let contents = fs::read_to_string(&file_path).unwrap();
        assert_eq!(contents.matches("timestamp").count(), 1);

        append_simulation_log(&file_path, &row, true).unwrap();
        assert_eq!(read_rows(&file_path).len(), 1);
    }

    #[rstest]
    fn test_write_sensitivity(property: PropertyConfig) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join(SENSITIVITY_FILE_NAME);
        let ranges = SensitivityRanges::around_baseline(&property, 0.3).unwrap();
        let result = run_sensitivity(&property, &ranges, SensitivityMode::FullImpact, |p| {
            Ok::<_, Infallible>(Percent(p.monthly_rent.value() / 100.0))
        })
        .unwrap();
        write_sensitivity(&file_path, &result).unwrap();

        let rows: Vec<SensitivityRow> = csv::Reader::from_path(&file_path)
            .unwrap()
            .into_deserialize()
            .try_collect()
            .unwrap();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[0].variable, "Monthly Rent");
        assert!((rows[0].impact - 6.0).abs() < 1e-9);
        assert!(rows[1..].iter().all(|row| row.impact == 0.0));
    }

    #[test]
    fn test_create_output_directory() {
        let dir = tempdir().unwrap();
        let output_dir = dir.path().join("a").join("b");
        create_output_directory(&output_dir).unwrap();
        assert!(output_dir.is_dir());
        create_output_directory(&output_dir).unwrap();
    }
}
