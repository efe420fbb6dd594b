//! CSV loading via polars

use super::{Dataset, LabelMap};
use crate::error::{KolosalError, Result};
use ndarray::Array2;
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;

pub(super) fn read_csv_path(path: &Path) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))?
        .finish()?;
    Ok(df)
}

pub(super) fn read_csv_bytes(bytes: &'static [u8]) -> Result<DataFrame> {
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(100))
        .into_reader_with_file_handle(Cursor::new(bytes))
        .finish()?;
    Ok(df)
}

/// Split a frame into numeric features and an encoded target.
///
/// String targets are encoded by order of first appearance. Integer targets
/// are taken as class indices and named by their decimal value.
pub(super) fn dataset_from_frame(df: &DataFrame, target_column: &str) -> Result<Dataset> {
    let feature_names: Vec<String> = df
        .get_column_names()
        .into_iter()
        .filter(|name| name.as_str() != target_column)
        .map(|name| name.to_string())
        .collect();

    if feature_names.is_empty() {
        return Err(KolosalError::DataError("no feature columns besides the target".to_string()));
    }

    let target = df
        .column(target_column)
        .map_err(|_| KolosalError::DataError(format!("target column '{}' not found", target_column)))?;

    let (labels, label_map) = match target.dtype() {
        DataType::String => encode_string_target(target.str()?)?,
        _ => encode_integer_target(&target.cast(&DataType::Int64)?)?,
    };

    let features = columns_to_array2(df, &feature_names)?;
    Dataset::new(feature_names, features, labels, label_map)
}

fn encode_string_target(values: &StringChunked) -> Result<(Vec<usize>, LabelMap)> {
    let mut names: Vec<String> = Vec::new();
    let mut labels = Vec::with_capacity(values.len());

    for (row, value) in values.into_iter().enumerate() {
        let value = value.ok_or_else(|| KolosalError::DataError(format!("missing target at row {}", row)))?;
        let idx = match names.iter().position(|n| n == value) {
            Some(idx) => idx,
            None => {
                names.push(value.to_string());
                names.len() - 1
            }
        };
        labels.push(idx);
    }

    Ok((labels, LabelMap::new(names)?))
}

fn encode_integer_target(series: &Series) -> Result<(Vec<usize>, LabelMap)> {
    let values = series.i64()?;
    let mut labels = Vec::with_capacity(values.len());

    for (row, value) in values.into_iter().enumerate() {
        match value {
            Some(v) if v >= 0 => labels.push(v as usize),
            Some(v) => {
                return Err(KolosalError::DataError(format!("negative class label {} at row {}", v, row)));
            }
            None => return Err(KolosalError::DataError(format!("missing target at row {}", row))),
        }
    }

    let n_classes = labels.iter().max().map_or(0, |m| m + 1);
    let label_map = LabelMap::new((0..n_classes).map(|c| c.to_string()))?;
    Ok((labels, label_map))
}

/// Extract named columns into a row-major `Array2<f64>`. Nulls are rejected.
fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();

    let col_data: Vec<Vec<f64>> = col_names
        .iter()
        .map(|col_name| {
            let series = df
                .column(col_name)
                .map_err(|_| KolosalError::DataError(format!("column '{}' not found", col_name)))?;
            let series_f64 = series.cast(&DataType::Float64)?;
            series_f64
                .f64()?
                .into_iter()
                .enumerate()
                .map(|(row, v)| {
                    v.ok_or_else(|| {
                        KolosalError::DataError(format!("missing value in '{}' at row {}", col_name, row))
                    })
                })
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<Vec<f64>>>>()?;

    Ok(Array2::from_shape_fn((n_rows, col_names.len()), |(r, c)| col_data[c][r]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_string_target_encoded_by_first_appearance() {
        let file = write_csv("a,b,kind\n1.0,2.0,cat\n3.0,4.0,dog\n5.0,6.0,cat\n");
        let ds = Dataset::from_csv(file.path(), "kind").unwrap();
        assert_eq!(ds.labels(), &[0, 1, 0]);
        assert_eq!(ds.label_map().names(), &["cat", "dog"]);
        assert_eq!(ds.feature_names(), &["a", "b"]);
    }

    #[test]
    fn test_integer_target() {
        let file = write_csv("x,target\n0.5,2\n1.5,0\n2.5,1\n");
        let ds = Dataset::from_csv(file.path(), "target").unwrap();
        assert_eq!(ds.labels(), &[2, 0, 1]);
        assert_eq!(ds.n_classes(), 3);
        assert_eq!(ds.label_map().name(2), Some("2"));
    }

    #[test]
    fn test_missing_target_column() {
        let file = write_csv("x,y\n1,2\n");
        let err = Dataset::from_csv(file.path(), "label").unwrap_err();
        assert!(matches!(err, KolosalError::DataError(_)));
    }
}
