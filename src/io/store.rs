//! Persistence collaborator: create-or-replace of [`RasterAsset`] records keyed
//! by their unique name.
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::types::RasterAsset;

/// Whether an upsert created a record or replaced an existing one
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Created,
    Replaced,
}

/// Record store with upsert-by-name semantics
pub trait AssetStore: Send + Sync {
    fn upsert(&self, asset: &RasterAsset) -> Result<UpsertOutcome>;
    fn get(&self, name: &str) -> Result<Option<RasterAsset>>;
    /// All records ordered by name
    fn list(&self) -> Result<Vec<RasterAsset>>;
}

/// One pretty-printed JSON document per asset under a catalog directory
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    dir: PathBuf,
}

impl JsonCatalog {
    pub fn open(dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::persistence(format!("cannot create catalog {:?}: {}", dir, e)))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn record_path(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{}.json", file_stem(name)))
    }
}

/// File-system-safe stem of an asset name. Bytes outside `[A-Za-z0-9_-]`
/// (and a leading `.`) are written as `%XX`, so distinct names never share a file.
fn file_stem(name: &str) -> String {
    let mut stem = String::with_capacity(name.len());
    for (i, b) in name.bytes().enumerate() {
        match b {
            b'a'..=b'z' | b'A'..=b'Z' | b'0'..=b'9' | b'-' | b'_' => stem.push(b as char),
            b'.' if i > 0 => stem.push('.'),
            _ => stem.push_str(&format!("%{:02X}", b)),
        }
    }
    stem
}

impl AssetStore for JsonCatalog {
    fn upsert(&self, asset: &RasterAsset) -> Result<UpsertOutcome> {
        let path = self.record_path(&asset.name);
        let outcome = if path.exists() {
            // case-insensitive file systems can still fold two names together
            let text = std::fs::read_to_string(&path).map_err(Error::persistence)?;
            if let Ok(existing) = serde_json::from_str::<RasterAsset>(&text) {
                if existing.name != asset.name {
                    return Err(Error::Persistence(format!(
                        "record file {:?} already holds {}, refusing to overwrite it with {}",
                        path, existing.name, asset.name
                    )));
                }
            }
            UpsertOutcome::Replaced
        } else {
            UpsertOutcome::Created
        };
        let json = serde_json::to_vec_pretty(asset)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir).map_err(Error::persistence)?;
        std::io::Write::write_all(&mut tmp, &json).map_err(Error::persistence)?;
        tmp.persist(&path).map_err(|e| Error::persistence(e.error))?;
        debug!("Catalog record {:?} {:?}", path, outcome);
        Ok(outcome)
    }

    fn get(&self, name: &str) -> Result<Option<RasterAsset>> {
        let path = self.record_path(name);
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path).map_err(Error::persistence)?;
        let asset: RasterAsset = serde_json::from_str(&text)?;
        Ok((asset.name == name).then_some(asset))
    }

    fn list(&self) -> Result<Vec<RasterAsset>> {
        let mut assets = Vec::new();
        for entry in std::fs::read_dir(&self.dir).map_err(Error::persistence)? {
            let path = entry.map_err(Error::persistence)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let text = std::fs::read_to_string(&path).map_err(Error::persistence)?;
            match serde_json::from_str::<RasterAsset>(&text) {
                Ok(asset) => assets.push(asset),
                Err(e) => warn!("Skipping unreadable catalog record {:?}: {}", path, e),
            }
        }
        assets.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(assets)
    }
}

/// In-memory store for tests and embedding
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    records: Mutex<BTreeMap<String, RasterAsset>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|r| r.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl AssetStore for MemoryCatalog {
    fn upsert(&self, asset: &RasterAsset) -> Result<UpsertOutcome> {
        let mut records = self.records.lock().map_err(Error::persistence)?;
        Ok(match records.insert(asset.name.clone(), asset.clone()) {
            Some(_) => UpsertOutcome::Replaced,
            None => UpsertOutcome::Created,
        })
    }

    fn get(&self, name: &str) -> Result<Option<RasterAsset>> {
        let records = self.records.lock().map_err(Error::persistence)?;
        Ok(records.get(name).cloned())
    }

    fn list(&self) -> Result<Vec<RasterAsset>> {
        let records = self.records.lock().map_err(Error::persistence)?;
        Ok(records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BoundingPolygon, GeoPoint, SourceFiles, ZoomRange};
    use chrono::NaiveDate;

    fn asset(name: &str, resolution: f64) -> RasterAsset {
        RasterAsset {
            name: name.to_string(),
            sensor: "S2".into(),
            acquisition_date: NaiveDate::from_ymd_opt(2023, 6, 15).unwrap(),
            resolution,
            coordinate_system: "WGS 84 / UTM zone 50N".into(),
            bounds: BoundingPolygon::from_corners([
                GeoPoint::new(116.0, 40.0),
                GeoPoint::new(117.0, 40.0),
                GeoPoint::new(117.0, 39.0),
                GeoPoint::new(116.0, 39.0),
            ]),
            center_point: GeoPoint::new(116.5, 39.5),
            band_count: 2,
            band_descriptions: vec!["Band 1".into(), "Band 2".into()],
            wavelength: None,
            tile_url: format!("/tiles/{}/{{z}}/{{x}}/{{y}}.png", name),
            zoom: ZoomRange::new(9, 14),
            thumbnail: Some(format!("thumbnails/{}_thumb.png", name)),
            rectified: false,
            source: SourceFiles {
                header: format!("/data/{}.hdr", name).into(),
                image: format!("/data/{}.img", name).into(),
            },
        }
    }

    #[test]
    fn json_catalog_upserts_by_name() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = JsonCatalog::open(&dir.path().join("catalog")).unwrap();

        assert_eq!(catalog.upsert(&asset("S2A_1", 10.0)).unwrap(), UpsertOutcome::Created);
        assert_eq!(catalog.upsert(&asset("S2A_1", 20.0)).unwrap(), UpsertOutcome::Replaced);
        assert_eq!(catalog.upsert(&asset("S2A_0", 10.0)).unwrap(), UpsertOutcome::Created);

        let all = catalog.list().unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].name, "S2A_0");
        assert_eq!(catalog.get("S2A_1").unwrap().unwrap().resolution, 20.0);
        assert!(catalog.get("missing").unwrap().is_none());
    }

    #[test]
    fn json_catalog_ignores_foreign_files() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = JsonCatalog::open(dir.path()).unwrap();
        std::fs::write(dir.path().join("notes.txt"), "x").unwrap();
        std::fs::write(dir.path().join("broken.json"), "{").unwrap();
        catalog.upsert(&asset("GF5_1", 30.0)).unwrap();
        assert_eq!(catalog.list().unwrap().len(), 1);
    }

    #[test]
    fn unsafe_names_map_to_flat_files() {
        assert_eq!(file_stem("a/b c"), "a%2Fb%20c");
        assert_eq!(file_stem("GF5_E116.5_N40.1"), "GF5_E116.5_N40.1");
        assert_eq!(file_stem("50%"), "50%25");
        assert_eq!(file_stem(".."), "%2E.");
    }

    #[test]
    fn names_differing_only_in_unsafe_characters_stay_distinct() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = JsonCatalog::open(dir.path()).unwrap();

        assert_eq!(catalog.upsert(&asset("S2A_20230615 a", 10.0)).unwrap(), UpsertOutcome::Created);
        assert_eq!(catalog.upsert(&asset("S2A_20230615_a", 20.0)).unwrap(), UpsertOutcome::Created);

        assert_eq!(catalog.list().unwrap().len(), 2);
        assert_eq!(catalog.get("S2A_20230615 a").unwrap().unwrap().resolution, 10.0);
        assert_eq!(catalog.get("S2A_20230615_a").unwrap().unwrap().resolution, 20.0);
    }

    #[test]
    fn record_file_holding_another_name_is_not_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let catalog = JsonCatalog::open(dir.path()).unwrap();
        let foreign = serde_json::to_vec(&asset("GF5_other", 30.0)).unwrap();
        std::fs::write(dir.path().join("GF5_1.json"), foreign).unwrap();

        let err = catalog.upsert(&asset("GF5_1", 10.0)).unwrap_err();

        assert!(matches!(err, Error::Persistence(_)), "{:?}", err);
        assert_eq!(catalog.get("GF5_other").unwrap(), None);
        assert_eq!(catalog.list().unwrap()[0].name, "GF5_other");
    }

    #[test]
    fn memory_catalog_upserts_by_name() {
        let store = MemoryCatalog::new();
        assert_eq!(store.upsert(&asset("x", 1.0)).unwrap(), UpsertOutcome::Created);
        assert_eq!(store.upsert(&asset("x", 2.0)).unwrap(), UpsertOutcome::Replaced);
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("x").unwrap().unwrap().resolution, 2.0);
    }
}
