// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Floor-plan layer catalog.
//!
//! Layers are created by collaborators (or by the navigator for a location
//! that has none). The navigator reads cutting heights and is the only
//! writer of boundaries and the ready flag.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use wayfinder_core::Rect2;

use crate::error::{NavigatorError, Result};
use crate::types::LayerGeometry;

type LayerMap = BTreeMap<(String, String), LayerGeometry>;

pub trait LayerCatalog: Send + Sync {
    /// Layers of `location`, ordered by layer ID.
    fn layers(&self, location: &str) -> Result<Vec<LayerGeometry>>;

    /// Inserts or replaces a layer.
    fn upsert(&self, layer: LayerGeometry) -> Result<()>;

    /// Records the outcome of a rebuild for an existing layer.
    fn publish(&self, location: &str, layer: &str, boundary: Option<Rect2>, ready: bool) -> Result<()>;
}

fn poisoned<T>(_: T) -> NavigatorError {
    NavigatorError::Catalog("catalog lock poisoned".into())
}

fn layers_of(map: &LayerMap, location: &str) -> Vec<LayerGeometry> {
    map.values().filter(|l| l.location == location).cloned().collect()
}

fn publish_into(map: &mut LayerMap, location: &str, layer: &str, boundary: Option<Rect2>, ready: bool) -> Result<()> {
    let entry = map
        .get_mut(&(location.to_string(), layer.to_string()))
        .ok_or_else(|| NavigatorError::Catalog(format!("unknown layer {}/{}", location, layer)))?;
    entry.boundary = boundary;
    entry.ready = ready;
    Ok(())
}

/// In-process catalog
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    layers: RwLock<LayerMap>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

impl LayerCatalog for MemoryCatalog {
    fn layers(&self, location: &str) -> Result<Vec<LayerGeometry>> {
        Ok(layers_of(&*self.layers.read().map_err(poisoned)?, location))
    }

    fn upsert(&self, layer: LayerGeometry) -> Result<()> {
        let key = (layer.location.clone(), layer.id.clone());
        self.layers.write().map_err(poisoned)?.insert(key, layer);
        Ok(())
    }

    fn publish(&self, location: &str, layer: &str, boundary: Option<Rect2>, ready: bool) -> Result<()> {
        publish_into(&mut *self.layers.write().map_err(poisoned)?, location, layer, boundary, ready)
    }
}

/// Catalog persisted as one JSON array, rewritten on every change
#[derive(Debug)]
pub struct FileCatalog {
    path: PathBuf,
    layers: Mutex<LayerMap>,
}

impl FileCatalog {
    /// Opens the catalog at `path`; a missing file is an empty catalog.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let layers = match std::fs::read(&path) {
            Ok(bytes) => {
                let list: Vec<LayerGeometry> = serde_json::from_slice(&bytes)?;
                list.into_iter()
                    .map(|l| ((l.location.clone(), l.id.clone()), l))
                    .collect()
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LayerMap::new(),
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(path = %path.display(), layers = layers.len(), "Opened layer catalog");
        Ok(Self {
            path,
            layers: Mutex::new(layers),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn save(&self, map: &LayerMap) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let list: Vec<&LayerGeometry> = map.values().collect();
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, serde_json::to_vec_pretty(&list)?)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl LayerCatalog for FileCatalog {
    fn layers(&self, location: &str) -> Result<Vec<LayerGeometry>> {
        Ok(layers_of(&*self.layers.lock().map_err(poisoned)?, location))
    }

    fn upsert(&self, layer: LayerGeometry) -> Result<()> {
        let mut map = self.layers.lock().map_err(poisoned)?;
        map.insert((layer.location.clone(), layer.id.clone()), layer);
        self.save(&map)
    }

    fn publish(&self, location: &str, layer: &str, boundary: Option<Rect2>, ready: bool) -> Result<()> {
        let mut map = self.layers.lock().map_err(poisoned)?;
        publish_into(&mut map, location, layer, boundary, ready)?;
        self.save(&map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exercise(catalog: &dyn LayerCatalog) {
        catalog.upsert(LayerGeometry::new("lab", "ground", 1.0)).unwrap();
        catalog.upsert(LayerGeometry::new("lab", "attic", 3.5)).unwrap();
        catalog.upsert(LayerGeometry::new("shop", "ground", 1.5)).unwrap();

        let ids: Vec<String> = catalog.layers("lab").unwrap().into_iter().map(|l| l.id).collect();
        assert_eq!(ids, vec!["attic", "ground"]);

        let rect = Rect2::new(0.0, 0.0, 4.0, 3.0);
        catalog.publish("lab", "ground", Some(rect), true).unwrap();
        let ground = catalog
            .layers("lab")
            .unwrap()
            .into_iter()
            .find(|l| l.id == "ground")
            .unwrap();
        assert!(ground.ready);
        assert_eq!(ground.boundary, Some(rect));
        assert_eq!(ground.cutting_height, 1.0);

        assert!(catalog.publish("lab", "basement", None, true).is_err());
    }

    #[test]
    fn memory_catalog() {
        exercise(&MemoryCatalog::new());
    }

    #[test]
    fn file_catalog_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("catalog.json");
        exercise(&FileCatalog::open(&path).unwrap());

        let reopened = FileCatalog::open(&path).unwrap();
        let layers = reopened.layers("lab").unwrap();
        assert_eq!(layers.len(), 2);
        assert!(layers.iter().any(|l| l.id == "ground" && l.ready));
        assert_eq!(reopened.layers("shop").unwrap()[0].cutting_height, 1.5);
    }
}
