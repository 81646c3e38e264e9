//! Data loading utilities

use crate::error::{PredictorError, Result};
use polars::prelude::*;
use std::io::Cursor;
use std::path::Path;

/// Dataset formats accepted for training
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetFormat {
    Csv,
    /// A JSON array of records
    Json,
}

impl DatasetFormat {
    /// Detect the format from a file name's exact, case-sensitive extension
    pub fn from_file_name(file_name: &str) -> Option<Self> {
        if file_name.ends_with(".csv") {
            Some(DatasetFormat::Csv)
        } else if file_name.ends_with(".json") {
            Some(DatasetFormat::Json)
        } else {
            None
        }
    }
}

/// Data loader for uploaded and on-disk datasets
pub struct DataLoader {
    /// Rows scanned to infer the CSV schema
    infer_schema_length: Option<usize>,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    pub fn new() -> Self {
        Self {
            infer_schema_length: Some(1000),
        }
    }

    /// Set the number of rows scanned for schema inference (`None` scans all)
    pub fn with_infer_schema_length(mut self, rows: Option<usize>) -> Self {
        self.infer_schema_length = rows;
        self
    }

    /// Parse an in-memory dataset
    pub fn load_bytes(&self, format: DatasetFormat, data: &[u8]) -> Result<DataFrame> {
        let df = match format {
            DatasetFormat::Csv => CsvReadOptions::default()
                .with_has_header(true)
                .with_infer_schema_length(self.infer_schema_length)
                .into_reader_with_file_handle(Cursor::new(data))
                .finish(),
            DatasetFormat::Json => JsonReader::new(Cursor::new(data)).finish(),
        };

        df.map_err(|e| PredictorError::DataError(e.to_string()))
    }

    /// Detect file format from extension and load
    pub fn load_path(&self, path: impl AsRef<Path>) -> Result<DataFrame> {
        let path = path.as_ref();
        let name = path.to_string_lossy();
        let format = DatasetFormat::from_file_name(&name).ok_or_else(|| {
            PredictorError::DataError(format!("Unsupported dataset format: {}", name))
        })?;

        let data = std::fs::read(path)?;
        self.load_bytes(format, &data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "RnD,Admin,Marketing,State,Profit\n\
                       165349.2,136897.8,471784.1,New York,192261.83\n\
                       162597.7,151377.59,443898.53,California,191792.06\n";

    const JSON: &str = r#"[
        {"RnD": 165349.2, "Admin": 136897.8, "Marketing": 471784.1, "State": "New York", "Profit": 192261.83},
        {"RnD": 162597.7, "Admin": 151377.59, "Marketing": 443898.53, "State": "California", "Profit": 191792.06}
    ]"#;

    #[test]
    fn test_format_detection() {
        assert_eq!(DatasetFormat::from_file_name("data.csv"), Some(DatasetFormat::Csv));
        assert_eq!(DatasetFormat::from_file_name("data.json"), Some(DatasetFormat::Json));
        assert_eq!(DatasetFormat::from_file_name("DATA.JSON"), None);
        assert_eq!(DatasetFormat::from_file_name("data.Csv"), None);
        assert_eq!(DatasetFormat::from_file_name("data.parquet"), None);
        assert_eq!(DatasetFormat::from_file_name("csv"), None);
    }

    #[test]
    fn test_load_csv_bytes() {
        let df = DataLoader::new().load_bytes(DatasetFormat::Csv, CSV.as_bytes()).unwrap();
        assert_eq!(df.shape(), (2, 5));
        assert_eq!(df.column("State").unwrap().dtype(), &DataType::String);
        assert_eq!(df.column("Profit").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_load_json_bytes_keeps_column_order() {
        let df = DataLoader::new().load_bytes(DatasetFormat::Json, JSON.as_bytes()).unwrap();
        assert_eq!(df.height(), 2);
        let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
        assert_eq!(names, vec!["RnD", "Admin", "Marketing", "State", "Profit"]);
    }

    #[test]
    fn test_full_schema_scan_sees_late_floats() {
        let csv = "x,y\n1,2\n2,3\n2.5,4\n";
        let df = DataLoader::new()
            .with_infer_schema_length(None)
            .load_bytes(DatasetFormat::Csv, csv.as_bytes())
            .unwrap();
        assert_eq!(df.column("x").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("startups.csv");
        std::fs::write(&path, CSV).unwrap();

        let df = DataLoader::new().load_path(&path).unwrap();
        assert_eq!(df.width(), 5);
    }

    #[test]
    fn test_load_path_unknown_extension() {
        assert!(DataLoader::new().load_path("startups.xlsx").is_err());
    }
}
