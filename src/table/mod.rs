use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use itertools::Itertools;
use log::{debug, trace, warn};

use crate::ballistics::{BallisticRow, Solution, Trajectory};
use crate::cache::{CacheStats, DEFAULT_CACHE_CAPACITY, TableCache};
use crate::equipment::EquipmentRegistry;
use crate::error::{InterpolationError, TableError};
use crate::interpolation;

pub const DEFAULT_TABLE_ROOT: &str = "rangeTables";

const REQUIRED_COLUMNS: [&str; 4] = ["range", "mill", "diff100m", "eta"];

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TableKey {
    pub weapon: String,
    pub trajectory: Trajectory,
    pub charge: u32,
}

impl TableKey {
    pub fn new(weapon: impl Into<String>, trajectory: Trajectory, charge: u32) -> Self {
        Self { weapon: weapon.into(), trajectory, charge }
    }
}

impl fmt::Display for TableKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} / {} / charge {}", self.weapon, self.trajectory, self.charge)
    }
}

/// Rows of one range table, sorted ascending by range.
///
/// Sorting is stable, so rows sharing a range keep their file order. This is
/// the only place rows get sorted; the loader hands them over in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeTable {
    key: TableKey,
    rows: Vec<BallisticRow>,
}

impl RangeTable {
    pub fn new(key: TableKey, mut rows: Vec<BallisticRow>) -> Self {
        rows.sort_by(|a, b| a.range.total_cmp(&b.range));
        Self { key, rows }
    }

    pub fn key(&self) -> &TableKey {
        &self.key
    }

    pub fn rows(&self) -> &[BallisticRow] {
        &self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Covered distance span, `None` for an empty table.
    pub fn span(&self) -> Option<(f64, f64)> {
        Some((self.rows.first()?.range, self.rows.last()?.range))
    }

    pub fn supports_range(&self, distance: f64) -> bool {
        interpolation::supports_range(&self.rows, distance)
    }

    pub fn calculate(&self, distance: f64, altitude_delta: f64) -> Result<Solution, InterpolationError> {
        interpolation::calculate(&self.rows, self.key.charge, distance, altitude_delta)
    }
}

/// Maps table keys onto files and parses them.
#[derive(Debug, Clone)]
pub struct RangeTableLoader {
    pub root: PathBuf,
}

impl RangeTableLoader {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn file_stem_prefix(prefix: &str, trajectory: Trajectory) -> String {
        format!("{prefix}_rangeTable_{trajectory}_")
    }

    pub fn file_name(prefix: &str, trajectory: Trajectory, charge: u32) -> String {
        format!("{}{charge}.csv", Self::file_stem_prefix(prefix, trajectory))
    }

    pub fn weapon_dir(&self, prefix: &str) -> PathBuf {
        self.root.join(prefix)
    }

    pub fn table_path(&self, prefix: &str, trajectory: Trajectory, charge: u32) -> PathBuf {
        self.weapon_dir(prefix).join(Self::file_name(prefix, trajectory, charge))
    }

    /// Reads a table file, returning rows in file order.
    pub fn read_rows(path: &Path) -> Result<Vec<BallisticRow>, TableError> {
        let file = File::open(path).map_err(|source| TableError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse_rows(file).map_err(|source| TableError::Csv {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Parses header-delimited CSV. Rows with any missing, unparsable or
    /// non-finite required field are dropped; only I/O failures are errors.
    pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<BallisticRow>, csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let missing: Vec<&str> = REQUIRED_COLUMNS
            .iter()
            .copied()
            .filter(|column| !headers.iter().any(|h| h == *column))
            .collect();
        if !missing.is_empty() {
            warn!("range table header lacks {missing:?}; every row will be dropped");
        }

        let mut rows = Vec::new();
        for (line, record) in reader.deserialize::<BallisticRow>().enumerate() {
            match record {
                Ok(row) if row.is_finite() => rows.push(row),
                Ok(row) => trace!("dropping non-finite row {}: {row:?}", line + 2),
                Err(e) if e.is_io_error() => return Err(e),
                Err(e) => trace!("dropping malformed row {}: {e}", line + 2),
            }
        }
        Ok(rows)
    }

    /// Charges present on disk for a weapon/trajectory, ascending and unique.
    pub fn scan_charges(&self, prefix: &str, trajectory: Trajectory) -> Result<Vec<u32>, TableError> {
        let dir = self.weapon_dir(prefix);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(TableError::Io { path: dir, source }),
        };

        let pattern = Self::file_stem_prefix(prefix, trajectory);
        let mut charges = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|source| TableError::Io { path: dir.clone(), source })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if let Some(charge) = parse_charge_suffix(name, &pattern) {
                charges.push(charge);
            }
        }
        Ok(charges.into_iter().sorted_unstable().dedup().collect())
    }
}

fn parse_charge_suffix(file_name: &str, pattern: &str) -> Option<u32> {
    let suffix = file_name.strip_prefix(pattern)?.strip_suffix(".csv")?;
    if suffix.is_empty() || !suffix.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    suffix.parse().ok()
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub root: PathBuf,
    pub cache_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_TABLE_ROOT),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// Resolves, loads and caches range tables for registered weapons.
pub struct RangeTableStore {
    loader: RangeTableLoader,
    registry: EquipmentRegistry,
    cache: TableCache,
}

impl RangeTableStore {
    pub fn new(config: StoreConfig, registry: EquipmentRegistry) -> Self {
        Self {
            loader: RangeTableLoader::new(config.root),
            registry,
            cache: TableCache::new(config.cache_capacity),
        }
    }

    pub fn registry(&self) -> &EquipmentRegistry {
        &self.registry
    }

    pub fn loader(&self) -> &RangeTableLoader {
        &self.loader
    }

    pub fn table_path(&self, key: &TableKey) -> PathBuf {
        let prefix = self.registry.prefix_for(&key.weapon);
        self.loader.table_path(prefix, key.trajectory, key.charge)
    }

    /// Loads (or fetches from cache) the table for one charge.
    ///
    /// A missing file is reported as [`TableError::NotFound`], which callers
    /// treat as "charge not available" rather than corrupt data.
    pub fn load_rows(
        &self,
        weapon: &str,
        trajectory: Trajectory,
        charge: u32,
    ) -> Result<Arc<RangeTable>, TableError> {
        let key = TableKey::new(weapon, trajectory, charge);
        let path = self.table_path(&key);
        let canonical = match path.canonicalize() {
            Ok(canonical) => canonical,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(TableError::NotFound { key, path });
            }
            Err(source) => return Err(TableError::Io { path, source }),
        };

        self.cache.get_or_try_load(&canonical, || {
            let rows = match RangeTableLoader::read_rows(&canonical) {
                Err(TableError::Io { source, .. }) if source.kind() == io::ErrorKind::NotFound => {
                    return Err(TableError::NotFound { key: key.clone(), path: path.clone() });
                }
                other => other?,
            };
            debug!("loaded {} rows for {} from {}", rows.len(), key, canonical.display());
            Ok(RangeTable::new(key.clone(), rows))
        })
    }

    pub fn available_charges(&self, weapon: &str, trajectory: Trajectory) -> Result<Vec<u32>, TableError> {
        self.loader.scan_charges(self.registry.prefix_for(weapon), trajectory)
    }

    /// Every table present on disk for a weapon, low trajectory first.
    pub fn list_tables(&self, weapon: &str) -> Result<Vec<TableKey>, TableError> {
        let mut keys = Vec::new();
        for trajectory in Trajectory::ALL {
            for charge in self.available_charges(weapon, trajectory)? {
                keys.push(TableKey::new(weapon, trajectory, charge));
            }
        }
        Ok(keys)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_naming() {
        let loader = RangeTableLoader::new(PathBuf::from("tables"));
        assert_eq!(
            loader.table_path("RM70", Trajectory::High, 12),
            PathBuf::from("tables/RM70/RM70_rangeTable_high_12.csv")
        );
    }

    #[test]
    fn test_charge_suffix_parsing() {
        let pattern = RangeTableLoader::file_stem_prefix("M119", Trajectory::Low);
        assert_eq!(parse_charge_suffix("M119_rangeTable_low_3.csv", &pattern), Some(3));
        assert_eq!(parse_charge_suffix("M119_rangeTable_low_10.csv", &pattern), Some(10));
        assert_eq!(parse_charge_suffix("M119_rangeTable_low_3b.csv", &pattern), None);
        assert_eq!(parse_charge_suffix("M119_rangeTable_low_.csv", &pattern), None);
        assert_eq!(parse_charge_suffix("M119_rangeTable_low_+3.csv", &pattern), None);
        assert_eq!(parse_charge_suffix("M119_rangeTable_high_3.csv", &pattern), None);
        assert_eq!(parse_charge_suffix("M119_rangeTable_low_3.txt", &pattern), None);
    }

    #[test]
    fn test_parse_trims_and_ignores_extra_columns() {
        let data = "note, eta ,range, mill, diff100m\nfoo, 40.5 , 1000, 1200, 3\n";
        let rows = RangeTableLoader::parse_rows(data.as_bytes()).unwrap();
        assert_eq!(rows, vec![BallisticRow::new(1000.0, 1200.0, 3.0, 40.5)]);
    }

    #[test]
    fn test_parse_drops_malformed_rows() {
        let data = "range,mill,diff100m,eta\n\
                    1000,800,5,20\n\
                    1500,,5,25\n\
                    abc,700,4,30\n\
                    1800,NaN,4,30\n\
                    1900,650,inf,31\n\
                    1950,640\n\
                    2000,600,4,35\n";
        let rows = RangeTableLoader::parse_rows(data.as_bytes()).unwrap();
        let ranges: Vec<f64> = rows.iter().map(|r| r.range).collect();
        assert_eq!(ranges, vec![1000.0, 2000.0]);
    }

    #[test]
    fn test_parse_drops_undecodable_row_only() {
        let data: &[u8] = b"range,mill,diff100m,eta\n1000,800,5,20\n1500,7\xff0,4.5,27\n2000,600,4,35\n";
        let rows = RangeTableLoader::parse_rows(data).unwrap();
        assert_eq!(
            rows,
            vec![
                BallisticRow::new(1000.0, 800.0, 5.0, 20.0),
                BallisticRow::new(2000.0, 600.0, 4.0, 35.0),
            ]
        );
    }

    #[test]
    fn test_parse_missing_column_yields_empty() {
        let data = "range,mill,eta\n1000,800,20\n";
        let rows = RangeTableLoader::parse_rows(data.as_bytes()).unwrap();
        assert!(rows.is_empty());
    }

    #[test]
    fn test_range_table_sorts_stably() {
        let table = RangeTable::new(
            TableKey::new("T", Trajectory::Low, 0),
            vec![
                BallisticRow::new(3000.0, 450.0, 3.0, 48.0),
                BallisticRow::new(2000.0, 600.0, 4.0, 35.0),
                BallisticRow::new(1000.0, 800.0, 5.0, 20.0),
                BallisticRow::new(2000.0, 610.0, 4.0, 35.0),
            ],
        );
        let mills: Vec<f64> = table.rows().iter().map(|r| r.mill).collect();
        assert_eq!(mills, vec![800.0, 600.0, 610.0, 450.0]);
        assert_eq!(table.span(), Some((1000.0, 3000.0)));
    }
}
