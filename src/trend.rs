//! World Bank trend extraction
//!
//! Datasets are comma-separated files with (at least) the columns
//! `Country Name`, `Indicator Name`, `Year` and `Value`, in any order.
//! A [`Trend`] is the year→value series for one indicator in one country.

use lru::LruCache;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::SystemTime;
use tracing::{debug, info, trace, warn};

use crate::error::{GatewayError, Result};
use crate::prompts::Topic;

pub const COUNTRY_COLUMN: &str = "Country Name";
pub const INDICATOR_COLUMN: &str = "Indicator Name";
pub const YEAR_COLUMN: &str = "Year";
pub const VALUE_COLUMN: &str = "Value";

/// Year→value observations. Keys are unique; order is applied only by
/// [`Trend::sorted_points`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trend {
    points: HashMap<String, f64>,
}

impl Trend {
    /// Insert an observation, returning the value it replaced.
    pub fn insert(&mut self, year: impl Into<String>, value: f64) -> Option<f64> {
        self.points.insert(year.into(), value)
    }

    pub fn get(&self, year: &str) -> Option<f64> {
        self.points.get(year).copied()
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Observations sorted by ascending year label
    pub fn sorted_points(&self) -> Vec<(&str, f64)> {
        let mut points: Vec<(&str, f64)> = self
            .points
            .iter()
            .map(|(year, value)| (year.as_str(), *value))
            .collect();
        points.sort_by(|a, b| a.0.cmp(b.0));
        points
    }
}

impl FromIterator<(String, f64)> for Trend {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self {
            points: iter.into_iter().collect(),
        }
    }
}

/// One data line of a dataset, value kept as the raw cell text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetRow {
    pub country: String,
    pub indicator: String,
    pub year: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy)]
struct ColumnLayout {
    country: usize,
    indicator: usize,
    year: usize,
    value: usize,
}

impl ColumnLayout {
    fn from_headers(headers: &csv::StringRecord, label: &str) -> Result<Self> {
        let find = |name: &str| {
            headers.iter().position(|h| h == name).ok_or_else(|| {
                GatewayError::dataset(label, format!("missing required column `{}`", name))
            })
        };
        Ok(Self {
            country: find(COUNTRY_COLUMN)?,
            indicator: find(INDICATOR_COLUMN)?,
            year: find(YEAR_COLUMN)?,
            value: find(VALUE_COLUMN)?,
        })
    }
}

/// A fully parsed dataset file
#[derive(Debug, Clone)]
pub struct Dataset {
    source: String,
    rows: Vec<DatasetRow>,
}

impl Dataset {
    /// Read and parse the whole file. Any I/O or CSV error fails the load.
    pub fn load(path: &Path) -> Result<Self> {
        let label = path.display().to_string();
        let file = File::open(path)
            .map_err(|e| GatewayError::dataset(&label, format!("cannot open: {}", e)))?;
        let dataset = Self::from_reader(&label, file)?;
        debug!(path = %dataset.source(), rows = dataset.rows.len(), "dataset loaded");
        Ok(dataset)
    }

    pub fn from_reader<R: Read>(label: &str, reader: R) -> Result<Self> {
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
        let headers = rdr
            .headers()
            .map_err(|e| GatewayError::dataset(label, e.to_string()))?
            .clone();
        let layout = ColumnLayout::from_headers(&headers, label)?;

        let mut rows = Vec::new();
        for record in rdr.records() {
            let record = record.map_err(|e| GatewayError::dataset(label, e.to_string()))?;
            let cell = |idx: usize| record.get(idx).unwrap_or_default().to_string();
            rows.push(DatasetRow {
                country: cell(layout.country),
                indicator: cell(layout.indicator),
                year: cell(layout.year),
                value: cell(layout.value),
            });
        }

        Ok(Self {
            source: label.to_string(),
            rows,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn rows(&self) -> &[DatasetRow] {
        &self.rows
    }

    /// Observations for an exact (indicator, country) pair.
    ///
    /// Rows whose value does not parse as a float are skipped. When several
    /// rows share a year, the last one in file order wins.
    pub fn trend_for(&self, indicator: &str, country: &str) -> Trend {
        let mut trend = Trend::default();
        for row in &self.rows {
            if row.country != country || row.indicator != indicator {
                continue;
            }
            match row.value.parse::<f64>() {
                Ok(value) => {
                    trend.insert(row.year.clone(), value);
                }
                Err(_) => trace!(year = %row.year, value = %row.value, "skipping unparsable value"),
            }
        }
        trend
    }
}

/// Load `dataset_path` and return the trend for `indicator` in `country`.
///
/// No matching rows yields an empty trend, not an error.
pub fn extract_trend(dataset_path: &Path, indicator: &str, country: &str) -> Result<Trend> {
    Ok(Dataset::load(dataset_path)?.trend_for(indicator, country))
}

struct CachedDataset {
    modified: Option<SystemTime>,
    dataset: Arc<Dataset>,
}

/// Read-through dataset cache keyed by path.
///
/// An entry is reused only while the file's modification time is unchanged.
/// A capacity of zero disables caching.
pub struct DatasetCache {
    entries: Option<Mutex<LruCache<PathBuf, CachedDataset>>>,
}

impl DatasetCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: NonZeroUsize::new(capacity).map(|cap| Mutex::new(LruCache::new(cap))),
        }
    }

    pub fn get(&self, path: &Path) -> Result<Arc<Dataset>> {
        let Some(entries) = &self.entries else {
            return Ok(Arc::new(Dataset::load(path)?));
        };

        let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok();
        {
            let mut guard = entries.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(entry) = guard.get(path)
                && modified.is_some()
                && entry.modified == modified
            {
                return Ok(entry.dataset.clone());
            }
        }

        let dataset = Arc::new(Dataset::load(path)?);
        let mut guard = entries.lock().unwrap_or_else(PoisonError::into_inner);
        guard.put(
            path.to_path_buf(),
            CachedDataset {
                modified,
                dataset: dataset.clone(),
            },
        );
        Ok(dataset)
    }

    pub fn len(&self) -> usize {
        self.entries
            .as_ref()
            .map(|e| e.lock().unwrap_or_else(PoisonError::into_inner).len())
            .unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Topic → dataset file mapping, discovered once at startup
pub struct DatasetCatalog {
    data_dir: PathBuf,
    paths: HashMap<Topic, PathBuf>,
    cache: DatasetCache,
}

impl DatasetCatalog {
    /// Look for `<topic>.csv` under `data_dir` and load each file found once.
    ///
    /// A present-but-broken file is an error; a missing file only disables
    /// enrichment for that topic.
    pub fn discover(data_dir: impl Into<PathBuf>, cache_max: usize) -> Result<Self> {
        let data_dir = data_dir.into();
        let cache = DatasetCache::new(cache_max);
        let mut paths = HashMap::new();

        for topic in Topic::ALL {
            let path = data_dir.join(topic.dataset_file_name());
            if path.is_file() {
                let dataset = cache.get(&path)?;
                info!(topic = %topic, path = %path.display(), rows = dataset.rows().len(), "dataset registered");
                paths.insert(topic, path);
            } else {
                warn!(topic = %topic, path = %path.display(), "no dataset for topic; enrichment disabled");
            }
        }

        Ok(Self {
            data_dir,
            paths,
            cache,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn path_for(&self, topic: Topic) -> Option<&Path> {
        self.paths.get(&topic).map(PathBuf::as_path)
    }

    /// Topics that have a dataset, in declaration order
    pub fn topics(&self) -> Vec<Topic> {
        Topic::ALL
            .into_iter()
            .filter(|t| self.paths.contains_key(t))
            .collect()
    }

    /// Trend for the topic's dataset; empty when the topic has none.
    pub fn trend(&self, topic: Topic, indicator: &str, country: &str) -> Result<Trend> {
        match self.path_for(topic) {
            Some(path) => Ok(self.cache.get(path)?.trend_for(indicator, country)),
            None => Ok(Trend::default()),
        }
    }
}
