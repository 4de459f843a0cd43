//! Typed errors which callers may need to tell apart from ordinary input problems.
use thiserror::Error;

/// The encoded feature vector does not match what the trained model expects.
///
/// Predictions made from a mismatched vector would be numerically wrong but plausible-looking, so
/// this is always fatal for the request and is never swallowed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FeatureMismatchError {
    /// The vector has the wrong number of columns
    #[error("Model expects {expected} feature columns but got {actual}")]
    Width {
        /// Number of columns the model was trained on
        expected: usize,
        /// Number of columns supplied
        actual: usize,
    },
    /// A column is in the wrong position or has the wrong name
    #[error("Feature column {index} is `{actual}` but the model expects `{expected}`")]
    Column {
        /// Position of the first differing column
        index: usize,
        /// Name the model expects at this position
        expected: String,
        /// Name supplied at this position
        actual: String,
    },
    /// The schema contains a column the encoder cannot fill
    #[error("Unrecognised feature column `{0}`")]
    UnknownColumn(String),
    /// The schema lists the same column twice
    #[error("Feature column `{0}` appears more than once")]
    DuplicateColumn(String),
    /// The schema lacks a column every model must have
    #[error("Required feature column `{0}` is missing")]
    MissingColumn(String),
}

/// Check that a list of column names matches the model's expected feature order exactly
pub fn check_columns_match(
    expected: &[String],
    actual: &[String],
) -> Result<(), FeatureMismatchError> {
    if expected.len() != actual.len() {
        return Err(FeatureMismatchError::Width {
            expected: expected.len(),
            actual: actual.len(),
        });
    }

    if let Some((index, (expected, actual))) = expected
        .iter()
        .zip(actual)
        .enumerate()
        .find(|(_, (expected, actual))| expected != actual)
    {
        return Err(FeatureMismatchError::Column {
            index,
            expected: expected.clone(),
            actual: actual.clone(),
        });
    }

    Ok(())
}
