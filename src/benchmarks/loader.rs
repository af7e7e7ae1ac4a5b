//! CSV benchmark ingest and aggregation
//!
//! Turns one or more heterogeneous benchmark exports into a single
//! `(category, country) -> BenchmarkRecord` table:
//!
//! - headers are matched case-insensitively against a few known aliases
//! - rows without a resolvable category or country are discarded
//! - each rate field is averaged (unweighted) over the rows that supplied
//!   a valid value for it; fields with no valid value take the default
//! - a missing source file is a warning, never an error

use std::collections::HashMap;
use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use csv::StringRecord;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::country;
use super::BenchmarkTable;
use crate::types::{BenchmarkKey, BenchmarkRecord};

const CATEGORY_COLUMNS: &[&str] = &["category", "vertical", "brand"];
const COUNTRY_CODE_COLUMNS: &[&str] = &["country_code", "iso2", "country"];
const LABEL_COLUMNS: &[&str] = &["label", "campaign", "name"];

/// One tabular benchmark source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkSource {
    /// Path to the CSV file
    pub path: PathBuf,
    /// Category applied to every row when the file has no category column
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl BenchmarkSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            category: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

/// Counters describing what the loader did, logged once at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub sources_read: usize,
    pub sources_missing: usize,
    pub rows_read: usize,
    pub rows_used: usize,
    pub rows_discarded: usize,
}

// ============================================================================
// Aggregation
// ============================================================================

#[derive(Debug, Clone, Copy, Default)]
struct RunningMean {
    sum: f64,
    count: usize,
}

impl RunningMean {
    fn push(&mut self, value: Option<f64>) {
        if let Some(v) = value {
            self.sum += v;
            self.count += 1;
        }
    }

    fn mean_or(&self, fallback: f64) -> f64 {
        if self.count == 0 {
            fallback
        } else {
            self.sum / self.count as f64
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct RateAccumulator {
    ctr: RunningMean,
    cpm: RunningMean,
    cpc: RunningMean,
    cpa: RunningMean,
}

impl RateAccumulator {
    fn finish(&self) -> BenchmarkRecord {
        let d = BenchmarkRecord::default();
        BenchmarkRecord {
            ctr: self.ctr.mean_or(d.ctr),
            cpm: self.cpm.mean_or(d.cpm),
            cpc: self.cpc.mean_or(d.cpc),
            cpa: self.cpa.mean_or(d.cpa),
        }
    }
}

/// Groups rows by key and averages rate fields on `finish`.
#[derive(Debug, Default)]
pub struct BenchmarkAggregator {
    groups: HashMap<BenchmarkKey, RateAccumulator>,
    report: LoadReport,
}

impl BenchmarkAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read every configured source; missing or unreadable files are skipped.
    pub fn read_sources(&mut self, sources: &[BenchmarkSource]) {
        for source in sources {
            match File::open(&source.path) {
                Ok(file) => {
                    if let Err(e) = self.read_csv(file, source.category.as_deref()) {
                        warn!(path = %source.path.display(), error = %e, "Failed to read benchmark source, skipping");
                        continue;
                    }
                    self.report.sources_read += 1;
                }
                Err(e) if e.kind() == io::ErrorKind::NotFound => {
                    warn!(path = %source.path.display(), "Benchmark source not found, continuing without it");
                    self.report.sources_missing += 1;
                }
                Err(e) => {
                    warn!(path = %source.path.display(), error = %e, "Failed to open benchmark source, skipping");
                    self.report.sources_missing += 1;
                }
            }
        }
    }

    /// Read one CSV document. `category` is used when the file has no
    /// category column of its own.
    pub fn read_csv<R: Read>(&mut self, reader: R, category: Option<&str>) -> Result<(), csv::Error> {
        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = reader.headers()?.clone();
        let columns = ColumnMap::new(&headers);

        for (idx, result) in reader.records().enumerate() {
            // Header is line 1
            let line = idx + 2;
            self.report.rows_read += 1;
            let record = match result {
                Ok(r) => r,
                Err(e) => {
                    debug!(line, error = %e, "Skipping malformed benchmark row");
                    self.report.rows_discarded += 1;
                    continue;
                }
            };

            let Some(key) = columns.key(&record, category) else {
                debug!(line, "Benchmark row has no resolvable category/country, discarding");
                self.report.rows_discarded += 1;
                continue;
            };

            let acc = self.groups.entry(key).or_default();
            acc.ctr.push(columns.rate(&record, "ctr", RateField::Ratio));
            acc.cpm.push(columns.rate(&record, "cpm", RateField::Cost));
            acc.cpc.push(columns.rate(&record, "cpc", RateField::Cost));
            acc.cpa.push(columns.rate(&record, "cpa", RateField::Cost));
            self.report.rows_used += 1;
        }

        Ok(())
    }

    /// Average each group into its final record.
    pub fn finish(self) -> (HashMap<BenchmarkKey, BenchmarkRecord>, LoadReport) {
        let records = self
            .groups
            .into_iter()
            .map(|(key, acc)| (key, acc.finish()))
            .collect();
        (records, self.report)
    }
}

// ============================================================================
// Column resolution
// ============================================================================

struct ColumnMap {
    by_name: HashMap<String, usize>,
}

impl ColumnMap {
    fn new(headers: &StringRecord) -> Self {
        let by_name = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_ascii_lowercase(), i))
            .collect();
        Self { by_name }
    }

    /// First non-empty cell among the candidate column names.
    fn cell<'r>(&self, record: &'r StringRecord, names: &[&str]) -> Option<&'r str> {
        names
            .iter()
            .filter_map(|n| self.by_name.get(*n))
            .filter_map(|&i| record.get(i))
            .map(str::trim)
            .find(|v| !v.is_empty())
    }

    fn key(&self, record: &StringRecord, default_category: Option<&str>) -> Option<BenchmarkKey> {
        let category = self
            .cell(record, CATEGORY_COLUMNS)
            .or(default_category)
            .map(str::trim)
            .filter(|c| !c.is_empty())?;

        let code = self
            .cell(record, COUNTRY_CODE_COLUMNS)
            .and_then(country::normalize_code)
            .or_else(|| {
                self.cell(record, LABEL_COLUMNS)
                    .and_then(country::extract_from_label)
            })?;

        Some(BenchmarkKey::new(category, code))
    }

    fn rate(&self, record: &StringRecord, column: &str, field: RateField) -> Option<f64> {
        self.cell(record, &[column]).and_then(|raw| parse_rate(raw, field))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RateField {
    /// Probability in [0, 1]
    Ratio,
    /// Strictly positive money amount
    Cost,
}

/// Parse a numeric rate cell.
///
/// Accepts a leading `$`, thousands separators and a trailing `%` (which
/// divides by 100). Values outside the field's domain count as missing.
fn parse_rate(raw: &str, field: RateField) -> Option<f64> {
    let mut s = raw.trim().trim_start_matches('$').replace(',', "");
    let percent = s.ends_with('%');
    if percent {
        s.pop();
    }
    let mut value: f64 = s.trim().parse().ok()?;
    if percent {
        value /= 100.0;
    }
    if !value.is_finite() {
        return None;
    }
    let valid = match field {
        RateField::Ratio => (0.0..=1.0).contains(&value),
        RateField::Cost => value > 0.0,
    };
    valid.then_some(value)
}

// ============================================================================
// Entry points
// ============================================================================

/// Load and aggregate all sources, plus optional country display names.
pub fn load_table(sources: &[BenchmarkSource], countries_path: Option<&Path>) -> BenchmarkTable {
    let mut aggregator = BenchmarkAggregator::new();
    aggregator.read_sources(sources);
    let (records, report) = aggregator.finish();

    info!(
        keys = records.len(),
        sources = report.sources_read,
        missing = report.sources_missing,
        rows_used = report.rows_used,
        rows_discarded = report.rows_discarded,
        "Benchmark table loaded"
    );

    let country_names = countries_path.map(load_country_names).unwrap_or_default();

    BenchmarkTable::new(records, country_names)
}

/// Read `country_code,country_name` pairs. Missing file yields an empty map.
pub fn load_country_names(path: &Path) -> HashMap<String, String> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Country names file unavailable, using bare codes");
            return HashMap::new();
        }
    };
    match read_country_names(file) {
        Ok(names) => names,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to parse country names file");
            HashMap::new()
        }
    }
}

pub fn read_country_names<R: Read>(reader: R) -> Result<HashMap<String, String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let columns = ColumnMap::new(&reader.headers()?.clone());

    let mut names = HashMap::new();
    for record in reader.records().flatten() {
        let code = columns
            .cell(&record, &["country_code", "iso2"])
            .and_then(country::normalize_code);
        let name = columns.cell(&record, &["country_name", "name"]);
        if let (Some(code), Some(name)) = (code, name) {
            names.entry(code).or_insert_with(|| name.to_string());
        }
    }
    Ok(names)
}
