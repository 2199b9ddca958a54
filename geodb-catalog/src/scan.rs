//! Catalog path scanning.
//!
//! The system table is treated as opaque single-byte text. Catalog paths are
//! recovered with byte regexes over the whole file:
//! - `<CatalogPath>\Dataset\Name</CatalogPath>` for classes in a dataset
//! - `<CatalogPath>\Name</CatalogPath>` for root items (datasets, root
//!   classes, rasters)

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::bytes::Regex;

static DATASET_PATH_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"<CatalogPath>\\([a-zA-Z0-9_]+)\\([a-zA-Z0-9_]+)</CatalogPath>")
        .expect("valid regex")
});

static ROOT_PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<CatalogPath>\\([a-zA-Z0-9_]+)</CatalogPath>").expect("valid regex"));

/// Datasets and the tables filed under them.
pub type DatasetMap = IndexMap<Option<String>, Vec<String>>;

fn capture(caps: &regex::bytes::Captures<'_>, i: usize) -> Option<String> {
    caps.get(i)
        .map(|m| String::from_utf8_lossy(m.as_bytes()).into_owned())
}

/// Every `(dataset, name)` pair, in file order, duplicates included.
pub fn dataset_paths(system_table: &[u8]) -> Vec<(String, String)> {
    DATASET_PATH_RE
        .captures_iter(system_table)
        .filter_map(|caps| Some((capture(&caps, 1)?, capture(&caps, 2)?)))
        .collect()
}

/// Every single-segment path, in file order, duplicates included.
pub fn root_paths(system_table: &[u8]) -> Vec<String> {
    ROOT_PATH_RE
        .captures_iter(system_table)
        .filter_map(|caps| capture(&caps, 1))
        .collect()
}

/// Fold dataset paths over the table list.
///
/// A dataset bucket is created the first time the dataset is seen. A table
/// is moved out of `tables` into its bucket when matched, so it is listed
/// once no matter how often its path repeats. A path naming a table that
/// is not in `tables` adds nothing beyond its dataset bucket. Whatever is
/// left goes under `None`. An empty table list yields an empty map.
pub fn fold_datasets(paths: &[(String, String)], mut tables: Vec<String>) -> DatasetMap {
    let mut out = DatasetMap::new();
    if tables.is_empty() {
        return out;
    }

    for (dataset, name) in paths {
        let bucket = out.entry(Some(dataset.clone())).or_default();
        if let Some(pos) = tables.iter().position(|t| t == name) {
            bucket.push(tables.remove(pos));
        }
    }

    out.insert(None, tables);
    out
}

/// Root paths that are neither tables nor datasets, de-duplicated in
/// first-seen order.
pub fn rasters(root: Vec<String>, tables: &[String], datasets: &DatasetMap) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    for name in root {
        if out.contains(&name) {
            continue;
        }
        if tables.contains(&name) || datasets.contains_key(&Some(name.clone())) {
            continue;
        }
        out.push(name);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const ZONING: &[u8] = b"\x03\x00\x00\x00<DEWorkspace><CatalogPath>\\</CatalogPath></DEWorkspace>\
        \x10<DEFeatureDataset ><CatalogPath>\\Zoning</CatalogPath></DEFeatureDataset>\
        \x00\xff<DEFeatureClassInfo ><CatalogPath>\\Zoning\\Parcels</CatalogPath></DEFeatureClassInfo>\
        <DEFeatureClassInfo ><CatalogPath>\\Zoning\\Roads</CatalogPath></DEFeatureClassInfo>\
        <DEFeatureClassInfo ><CatalogPath>\\Parcels_Old</CatalogPath></DEFeatureClassInfo>";

    fn tables() -> Vec<String> {
        vec!["Parcels".into(), "Roads".into(), "Parcels_Old".into()]
    }

    #[test]
    fn test_dataset_paths_ignore_binary_noise() {
        assert_eq!(
            dataset_paths(ZONING),
            vec![
                ("Zoning".to_string(), "Parcels".to_string()),
                ("Zoning".to_string(), "Roads".to_string()),
            ]
        );
        assert_eq!(root_paths(ZONING), vec!["Zoning", "Parcels_Old"]);
    }

    #[test]
    fn test_fold_zoning() {
        let map = fold_datasets(&dataset_paths(ZONING), tables());
        let keys: Vec<_> = map.keys().cloned().collect();
        assert_eq!(keys, vec![Some("Zoning".to_string()), None]);
        assert_eq!(map[&Some("Zoning".to_string())], vec!["Parcels", "Roads"]);
        assert_eq!(map[&None::<String>], vec!["Parcels_Old"]);
    }

    #[test]
    fn test_fold_repeated_paths_do_not_duplicate() {
        let paths = vec![
            ("Ds".to_string(), "A".to_string()),
            ("Ds".to_string(), "A".to_string()),
        ];
        let map = fold_datasets(&paths, vec!["A".into(), "B".into()]);
        assert_eq!(map[&Some("Ds".to_string())], vec!["A"]);
        assert_eq!(map[&None::<String>], vec!["B"]);
    }

    #[test]
    fn test_fold_skips_paths_without_a_table() {
        let paths = vec![
            ("Zoning".to_string(), "Parcels".to_string()),
            ("Zoning".to_string(), "Deleted".to_string()),
        ];
        let map = fold_datasets(&paths, vec!["Parcels".to_string(), "Wells".to_string()]);
        assert_eq!(map[&Some("Zoning".to_string())], vec!["Parcels"]);
        assert_eq!(map[&None::<String>], vec!["Wells"]);
    }

    #[test]
    fn test_fold_empty_tables() {
        assert!(fold_datasets(&dataset_paths(ZONING), Vec::new()).is_empty());
    }

    #[test]
    fn test_fold_keeps_none_bucket_when_all_consumed() {
        let paths = vec![("Ds".to_string(), "A".to_string())];
        let map = fold_datasets(&paths, vec!["A".into()]);
        assert_eq!(map[&None::<String>], Vec::<String>::new());
    }

    #[test]
    fn test_rasters_subtract_tables_and_datasets() {
        let map = fold_datasets(&dataset_paths(ZONING), tables());
        assert!(rasters(root_paths(ZONING), &tables(), &map).is_empty());

        let root = vec![
            "Elevation".to_string(),
            "Zoning".to_string(),
            "Elevation".to_string(),
            "Hillshade".to_string(),
        ];
        assert_eq!(rasters(root, &tables(), &map), vec!["Elevation", "Hillshade"]);
    }
}
