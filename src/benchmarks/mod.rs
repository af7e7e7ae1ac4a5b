//! Benchmark Store
//!
//! Loads CTR/CPM/CPC/CPA rate tables per (category, country) from CSV
//! sources and answers point lookups.
//!
//! ## Lifecycle
//!
//! The store is constructed once at startup and shared by handle (`Arc`)
//! with the HTTP handlers. Sources are parsed lazily on first access and
//! cached for the lifetime of the store; concurrent first accesses block
//! on a single initialization. There is no reload: restart the process to
//! pick up new data.
//!
//! ## Fallback
//!
//! `lookup()` never fails. A key with no benchmark resolves to
//! `BenchmarkRecord::default()` (CTR 1%, CPM 5, CPC 1, CPA 10). Callers that
//! need to know whether data actually exists use `get()`.

pub mod country;
mod loader;

pub use loader::{
    load_country_names, read_country_names, BenchmarkAggregator, BenchmarkSource, LoadReport,
};

use serde::Serialize;
use std::collections::{BTreeSet, HashMap};
use std::path::PathBuf;
use std::sync::OnceLock;

use crate::types::{BenchmarkKey, BenchmarkRecord};

/// Immutable parsed benchmark data.
#[derive(Debug, Clone, Default)]
pub struct BenchmarkTable {
    records: HashMap<BenchmarkKey, BenchmarkRecord>,
    country_names: HashMap<String, String>,
}

impl BenchmarkTable {
    pub fn new(
        records: HashMap<BenchmarkKey, BenchmarkRecord>,
        country_names: HashMap<String, String>,
    ) -> Self {
        Self {
            records,
            country_names,
        }
    }

    pub fn get(&self, key: &BenchmarkKey) -> Option<&BenchmarkRecord> {
        self.records.get(key)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Display label for a country: `"Sweden (SE)"`, or the bare code.
    pub fn country_label(&self, code: &str) -> String {
        match self.country_names.get(code) {
            Some(name) => format!("{name} ({code})"),
            None => code.to_string(),
        }
    }
}

/// Country option for form dropdowns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CountryOption {
    pub label: String,
    pub value: String,
}

/// A category/country combination that has benchmark data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BenchmarkPair {
    pub category: String,
    pub country: CountryOption,
}

/// Lazily loaded, process-lifetime benchmark lookup service.
#[derive(Debug)]
pub struct BenchmarkStore {
    sources: Vec<BenchmarkSource>,
    countries_path: Option<PathBuf>,
    table: OnceLock<BenchmarkTable>,
}

impl BenchmarkStore {
    /// Create a store over the given sources. Nothing is read until first use.
    pub fn new(sources: Vec<BenchmarkSource>, countries_path: Option<PathBuf>) -> Self {
        Self {
            sources,
            countries_path,
            table: OnceLock::new(),
        }
    }

    /// Create a store around an already-built table (no file access).
    pub fn from_table(table: BenchmarkTable) -> Self {
        let cell = OnceLock::new();
        let _ = cell.set(table);
        Self {
            sources: Vec::new(),
            countries_path: None,
            table: cell,
        }
    }

    /// Parse all sources on first call; return the cached table afterwards.
    pub fn load(&self) -> &BenchmarkTable {
        self.table.get_or_init(|| {
            tracing::info!(sources = self.sources.len(), "Loading benchmark sources");
            loader::load_table(&self.sources, self.countries_path.as_deref())
        })
    }

    /// Exact-match lookup with no fallback.
    pub fn get(&self, category: &str, country_code: &str) -> Option<BenchmarkRecord> {
        self.load()
            .get(&BenchmarkKey::new(category, country_code))
            .copied()
    }

    /// Exact-match lookup falling back to the default record on a miss.
    pub fn lookup(&self, category: &str, country_code: &str) -> BenchmarkRecord {
        self.get(category, country_code).unwrap_or_default()
    }

    /// Sorted, de-duplicated categories with data.
    pub fn categories(&self) -> Vec<String> {
        self.load()
            .records
            .keys()
            .map(|k| k.category.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// De-duplicated countries with data, sorted by display label.
    pub fn countries(&self) -> Vec<CountryOption> {
        let table = self.load();
        let codes: BTreeSet<&str> = table
            .records
            .keys()
            .map(|k| k.country_code.as_str())
            .collect();
        let mut options: Vec<CountryOption> = codes
            .into_iter()
            .map(|code| CountryOption {
                label: table.country_label(code),
                value: code.to_string(),
            })
            .collect();
        options.sort_by(|a, b| a.label.cmp(&b.label));
        options
    }

    /// Every key with data, ordered by category then country code.
    pub fn pairs(&self) -> Vec<BenchmarkPair> {
        let table = self.load();
        let mut keys: Vec<&BenchmarkKey> = table.records.keys().collect();
        keys.sort();
        keys.into_iter()
            .map(|k| BenchmarkPair {
                category: k.category.clone(),
                country: CountryOption {
                    label: table.country_label(&k.country_code),
                    value: k.country_code.clone(),
                },
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.load().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn store_from_csv(csv: &str) -> BenchmarkStore {
        let mut agg = BenchmarkAggregator::new();
        agg.read_csv(csv.as_bytes(), None).unwrap();
        let (records, _) = agg.finish();
        let mut names = HashMap::new();
        names.insert("SE".to_string(), "Sweden".to_string());
        BenchmarkStore::from_table(BenchmarkTable::new(records, names))
    }

    #[test]
    fn test_miss_returns_default_record() {
        let store = store_from_csv("category,country_code,ctr\niGaming,SE,0.02\n");
        let rec = store.lookup("Finance", "NG");
        assert_eq!(
            rec,
            BenchmarkRecord { ctr: 0.01, cpm: 5.0, cpc: 1.0, cpa: 10.0 }
        );
        assert!(store.get("Finance", "NG").is_none());
    }

    #[test]
    fn test_hit_averages_rows() {
        let store = store_from_csv(
            "category,country_code,ctr\niGaming,SE,0.01\niGaming,SE,0.03\n",
        );
        let rec = store.lookup("iGaming", "se");
        assert!((rec.ctr - 0.02).abs() < 1e-12);
    }

    #[test]
    fn test_no_fuzzy_matching() {
        let store = store_from_csv("category,country_code,ctr\niGaming,SE,0.02\n");
        assert!(store.get("igaming", "SE").is_none());
        assert!(store.get("iGaming ", "SE").is_some());
    }

    #[test]
    fn test_listings_are_sorted() {
        let store = store_from_csv(
            "category,country_code,ctr\n\
             iGaming,SE,0.02\n\
             Finance,SE,0.01\n\
             Finance,NG,0.01\n",
        );
        assert_eq!(store.categories(), vec!["Finance", "iGaming"]);

        let countries = store.countries();
        assert_eq!(countries.len(), 2);
        assert_eq!(countries[0].value, "NG");
        assert_eq!(countries[1].label, "Sweden (SE)");

        let pairs = store.pairs();
        assert_eq!(pairs.len(), 3);
        assert_eq!(pairs[0].category, "Finance");
        assert_eq!(pairs[0].country.value, "NG");
        assert_eq!(pairs[2].category, "iGaming");
    }

    #[test]
    fn test_missing_sources_yield_empty_store() {
        let store = BenchmarkStore::new(
            vec![BenchmarkSource::new("/nonexistent/bench.csv")],
            None,
        );
        assert!(store.is_empty());
        assert_eq!(store.lookup("iGaming", "SE"), BenchmarkRecord::default());
    }

    #[test]
    fn test_load_is_cached_after_first_access() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.csv");
        std::fs::write(&path, "category,country_code,ctr\niGaming,SE,0.02\n").unwrap();

        let store = BenchmarkStore::new(vec![BenchmarkSource::new(&path)], None);
        assert_eq!(store.len(), 1);

        // Changes on disk are not observed once loaded
        std::fs::write(&path, "category,country_code,ctr\nFinance,NG,0.05\n").unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.get("iGaming", "SE").is_some());
        assert!(store.get("Finance", "NG").is_none());
    }

    #[test]
    fn test_concurrent_first_access_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bench.csv");
        std::fs::write(&path, "category,country_code,ctr\niGaming,SE,0.02\n").unwrap();

        let store = Arc::new(BenchmarkStore::new(vec![BenchmarkSource::new(&path)], None));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                std::thread::spawn(move || store.load() as *const BenchmarkTable as usize)
            })
            .collect();
        let addrs: BTreeSet<usize> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(addrs.len(), 1, "all threads must observe the same table");
    }
}
