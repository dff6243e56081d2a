use std::path::PathBuf;

use thiserror::Error;

use crate::table::TableKey;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("no range table for {key} (expected {path})")]
    NotFound { key: TableKey, path: PathBuf },
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("csv error reading {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

impl TableError {
    /// True when the weapon/trajectory/charge combination simply has no data.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TableError::NotFound { .. })
    }
}

#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum InterpolationError {
    #[error("distance {distance} outside table range {min}..={max}")]
    OutOfRange { distance: f64, min: f64, max: f64 },
    #[error("no usable rows to interpolate from")]
    InsufficientData,
}

#[derive(Debug, Error)]
pub enum EquipmentError {
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid equipment json in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("equipment {name} registered twice")]
    Duplicate { name: String },
}
