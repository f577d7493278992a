//! Dataset loading, trend extraction and the dataset cache

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::tempdir;
use wellness_gateway::prompts::Topic;
use wellness_gateway::trend::{DatasetCache, DatasetCatalog, extract_trend};

const LITERACY: &str = "Literacy rate, adult total (% of people ages 15 and above)";

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn education_csv() -> String {
    format!(
        "Country Name,Country Code,Indicator Name,Indicator Code,Year,Value\n\
         India,IND,\"{LITERACY}\",SE.ADT.LITR.ZS,2011,69.3\n\
         India,IND,\"{LITERACY}\",SE.ADT.LITR.ZS,2018,74.4\n\
         India,IND,\"{LITERACY}\",SE.ADT.LITR.ZS,2022,\n\
         India,IND,\"{LITERACY}\",SE.ADT.LITR.ZS,2018,76.3\n\
         Kenya,KEN,\"{LITERACY}\",SE.ADT.LITR.ZS,2018,81.5\n"
    )
}

#[test]
fn test_extract_trend_filters_by_country_and_indicator() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "education.csv", &education_csv());

    let trend = extract_trend(&path, LITERACY, "India").unwrap();
    assert_eq!(trend.len(), 2);
    assert_eq!(trend.get("2011"), Some(69.3));
    // duplicate year: the later row in the file wins
    assert_eq!(trend.get("2018"), Some(76.3));
    // empty value cell is skipped silently
    assert_eq!(trend.get("2022"), None);

    let kenya = extract_trend(&path, LITERACY, "Kenya").unwrap();
    assert_eq!(kenya.len(), 1);
}

#[test]
fn test_extract_trend_is_idempotent() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "education.csv", &education_csv());

    let first = extract_trend(&path, LITERACY, "India").unwrap();
    let second = extract_trend(&path, LITERACY, "India").unwrap();
    assert_eq!(first, second);
    assert_eq!(first.sorted_points(), second.sorted_points());
}

#[test]
fn test_no_matching_rows_is_empty_not_error() {
    let dir = tempdir().unwrap();
    let path = write(dir.path(), "education.csv", &education_csv());

    let trend = extract_trend(&path, LITERACY, "Unknown").unwrap();
    assert!(trend.is_empty());
}

#[test]
fn test_missing_or_broken_file_is_error() {
    let dir = tempdir().unwrap();
    assert!(extract_trend(&dir.path().join("absent.csv"), LITERACY, "India").is_err());

    let path = write(
        dir.path(),
        "broken.csv",
        "Country Name,Indicator Name,Year,Value\nIndia,X,2010,1.0,extra\n",
    );
    let err = extract_trend(&path, "X", "India").unwrap_err();
    assert!(err.to_string().contains("broken.csv"));
}

#[test]
fn test_catalog_registers_only_present_topics() {
    let dir = tempdir().unwrap();
    write(dir.path(), "education.csv", &education_csv());

    let catalog = DatasetCatalog::discover(dir.path(), 4).unwrap();
    assert_eq!(catalog.topics(), vec![Topic::Education]);
    assert!(catalog.path_for(Topic::Health).is_none());

    let trend = catalog.trend(Topic::Education, LITERACY, "India").unwrap();
    assert_eq!(trend.len(), 2);
    // topic without a dataset is simply not enriched
    assert!(catalog.trend(Topic::Health, LITERACY, "India").unwrap().is_empty());
}

#[test]
fn test_catalog_rejects_unparsable_dataset_at_startup() {
    let dir = tempdir().unwrap();
    write(dir.path(), "health.csv", "Country Name,Year,Value\nIndia,2010,1\n");

    let err = DatasetCatalog::discover(dir.path(), 4).err().expect("should fail");
    assert!(err.to_string().contains("Indicator Name"));
}

#[test]
fn test_cache_reloads_after_modification() {
    let dir = tempdir().unwrap();
    let path = write(
        dir.path(),
        "career.csv",
        "Country Name,Indicator Name,Year,Value\nPeru,X,2010,1.0\n",
    );
    let cache = DatasetCache::new(2);

    let first = cache.get(&path).unwrap();
    assert_eq!(first.trend_for("X", "Peru").get("2010"), Some(1.0));
    let again = cache.get(&path).unwrap();
    assert!(std::sync::Arc::ptr_eq(&first, &again));
    assert_eq!(cache.len(), 1);

    fs::write(&path, "Country Name,Indicator Name,Year,Value\nPeru,X,2010,2.0\n").unwrap();
    File::options()
        .write(true)
        .open(&path)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(60))
        .unwrap();

    let reloaded = cache.get(&path).unwrap();
    assert!(!std::sync::Arc::ptr_eq(&first, &reloaded));
    assert_eq!(reloaded.trend_for("X", "Peru").get("2010"), Some(2.0));
}

#[test]
fn test_zero_capacity_cache_always_reads_fresh() {
    let dir = tempdir().unwrap();
    let path = write(
        dir.path(),
        "career.csv",
        "Country Name,Indicator Name,Year,Value\nPeru,X,2010,1.0\n",
    );
    let cache = DatasetCache::new(0);
    let a = cache.get(&path).unwrap();
    let b = cache.get(&path).unwrap();
    assert!(!std::sync::Arc::ptr_eq(&a, &b));
    assert!(cache.is_empty());
}
