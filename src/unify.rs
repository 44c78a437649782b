//! Unification of enriched source tables into one long DataFrame
//!
//! Every source becomes a DataFrame with exactly the unified column set;
//! frames are validated against that schema and concatenated in registry
//! order.

use crate::constants::{CLASSIFICATION_COLUMNS, columns};
use crate::error::{NexusError, Result};
use crate::models::EnrichedObservation;
use polars::prelude::*;
use tracing::debug;

/// One source's enriched table, named for error reporting
#[derive(Debug, Clone)]
pub struct SourceFrame {
    pub name: String,
    pub frame: DataFrame,
}

/// Column names and types of every output table, in order
pub fn unified_columns() -> Vec<(&'static str, DataType)> {
    let mut fields = vec![
        (columns::COUNTRY_CODE, DataType::String),
        (columns::YEAR, DataType::Int32),
        (columns::VALUE, DataType::Float64),
        (columns::SOURCE, DataType::String),
        (columns::INDICATOR_CODE, DataType::String),
        (columns::INDICATOR_LABEL, DataType::String),
        (columns::DATABASE, DataType::String),
        (columns::COLLECTION, DataType::String),
        (columns::VALUE_META, DataType::String),
    ];
    fields.extend(CLASSIFICATION_COLUMNS.iter().map(|c| (*c, DataType::String)));
    fields
}

fn text_column<'a>(
    name: &str,
    rows: &'a [EnrichedObservation],
    field: impl Fn(&'a EnrichedObservation) -> &'a str,
) -> Column {
    Column::new(name.into(), rows.iter().map(field).collect::<Vec<&str>>())
}

/// Build the unified-schema frame for one source
pub fn to_frame(rows: &[EnrichedObservation]) -> Result<DataFrame> {
    let mut frame_columns = vec![
        text_column(columns::COUNTRY_CODE, rows, |r| r.observation.country_code.as_str()),
        Column::new(
            columns::YEAR.into(),
            rows.iter().map(|r| r.observation.year).collect::<Vec<Option<i32>>>(),
        ),
        Column::new(
            columns::VALUE.into(),
            rows.iter().map(|r| r.observation.value).collect::<Vec<Option<f64>>>(),
        ),
        text_column(columns::SOURCE, rows, |r| r.observation.source.as_str()),
        text_column(columns::INDICATOR_CODE, rows, |r| r.observation.indicator_code.as_str()),
        text_column(columns::INDICATOR_LABEL, rows, |r| r.observation.indicator_label.as_str()),
        text_column(columns::DATABASE, rows, |r| r.observation.database.as_str()),
        text_column(columns::COLLECTION, rows, |r| r.observation.collection.as_str()),
        Column::new(
            columns::VALUE_META.into(),
            rows.iter()
                .map(|r| r.observation.value_meta.as_deref())
                .collect::<Vec<Option<&str>>>(),
        ),
    ];

    for (index, name) in CLASSIFICATION_COLUMNS.iter().enumerate() {
        let values: Vec<Option<&str>> = rows
            .iter()
            .map(|r| {
                r.classification
                    .as_ref()
                    .and_then(|c| c.values.get(index))
                    .and_then(|v| v.as_deref())
            })
            .collect();
        frame_columns.push(Column::new((*name).into(), values));
    }

    Ok(DataFrame::new(frame_columns)?)
}

/// Check a frame has exactly the unified columns, names and types in order
pub fn validate_schema(name: &str, frame: &DataFrame) -> Result<()> {
    let expected = unified_columns();
    let actual: Vec<(String, DataType)> = frame
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .zip(frame.dtypes())
        .collect();

    if actual.len() != expected.len() {
        return Err(NexusError::SchemaMismatch {
            table: name.to_string(),
            details: format!("expected {} columns, found {}", expected.len(), actual.len()),
        });
    }

    for ((expected_name, expected_type), (actual_name, actual_type)) in expected.iter().zip(&actual) {
        if *expected_name != actual_name.as_str() || expected_type != actual_type {
            return Err(NexusError::SchemaMismatch {
                table: name.to_string(),
                details: format!(
                    "expected column '{}' ({}), found '{}' ({})",
                    expected_name, expected_type, actual_name, actual_type
                ),
            });
        }
    }

    Ok(())
}

/// Concatenate source frames in order after validating each
pub fn unify(frames: Vec<SourceFrame>) -> Result<DataFrame> {
    for source in &frames {
        validate_schema(&source.name, &source.frame)?;
    }

    if frames.is_empty() {
        return to_frame(&[]);
    }

    debug!("Concatenating {} source frames", frames.len());
    let lazy_frames: Vec<LazyFrame> = frames.into_iter().map(|s| s.frame.lazy()).collect();
    let unified = concat(lazy_frames, UnionArgs::default())?.collect()?;

    Ok(unified)
}

/// Rows of one collection
pub fn subset(frame: &DataFrame, collection: &str) -> Result<DataFrame> {
    Ok(frame
        .clone()
        .lazy()
        .filter(col(columns::COLLECTION).eq(lit(collection)))
        .collect()?)
}
