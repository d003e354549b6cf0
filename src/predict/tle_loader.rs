use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::EngineConfig;
use crate::predict::error::PredictError;
use crate::predict::propagation::Propagator;
use crate::predict::tle::parse_multi_tle;
use crate::predict::types::SatelliteInfo;

#[derive(Debug)]
pub struct TleEntry {
    pub info: SatelliteInfo,
    pub propagator: Propagator,
}

/// Satellites read from a TLE file or a directory of them, keyed by
/// catalog number.
pub struct TleLoader {
    path: PathBuf,
    config: EngineConfig,
    satellites: BTreeMap<u32, TleEntry>,
}

impl TleLoader {
    pub fn new(path: impl Into<PathBuf>, config: EngineConfig) -> Self {
        Self {
            path: path.into(),
            config,
            satellites: BTreeMap::new(),
        }
    }

    /// Load every satellite. A directory is scanned for `.tle` and `.txt`
    /// files; files that fail to parse are logged and skipped.
    pub fn load_all(&mut self) -> Result<(), PredictError> {
        if !self.path.exists() {
            return Err(PredictError::NotFound(self.path.display().to_string()));
        }
        self.config.validate()?;

        self.satellites.clear();

        if self.path.is_file() {
            let entries = self.parse_tle_file(&self.path)?;
            self.insert_all(entries);
        } else {
            let mut paths = Vec::new();
            for entry in fs::read_dir(&self.path)? {
                let path = entry?.path();
                let is_tle = path
                    .extension()
                    .is_some_and(|ext| ext == "tle" || ext == "txt");
                if path.is_file() && is_tle {
                    paths.push(path);
                }
            }
            paths.sort();

            for path in paths {
                match self.parse_tle_file(&path) {
                    Ok(entries) => self.insert_all(entries),
                    Err(e) => {
                        log::warn!("Failed to parse TLE file {}: {}", path.display(), e);
                    }
                }
            }
        }

        log::info!(
            "Loaded {} satellites from {}",
            self.satellites.len(),
            self.path.display()
        );
        Ok(())
    }

    fn insert_all(&mut self, entries: Vec<TleEntry>) {
        for entry in entries {
            if let Some(old) = self.satellites.insert(entry.info.norad_id, entry) {
                log::debug!("Replaced earlier TLE for NORAD {}", old.info.norad_id);
            }
        }
    }

    /// Parse a single TLE file (may contain multiple satellites)
    fn parse_tle_file(&self, path: &Path) -> Result<Vec<TleEntry>, PredictError> {
        let content = fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .unwrap_or_default()
            .to_string_lossy()
            .to_string();

        let mut results = Vec::new();
        for raw in parse_multi_tle(&content) {
            let elements = raw.parse().map_err(|source| PredictError::InvalidTle {
                file: filename.clone(),
                source,
            })?;

            let name = elements
                .name()
                .map(String::from)
                .unwrap_or_else(|| format!("NORAD {}", elements.norad_id()));
            let norad_id = elements.norad_id();

            results.push(TleEntry {
                info: SatelliteInfo {
                    name,
                    norad_id,
                    tle_source: filename.clone(),
                },
                propagator: Propagator::new(elements, &self.config)?,
            });
        }

        Ok(results)
    }

    /// Get all loaded satellites, by catalog number
    pub fn satellites(&self) -> Vec<&TleEntry> {
        self.satellites.values().collect()
    }

    pub fn get(&self, norad_id: u32) -> Option<&TleEntry> {
        self.satellites.get(&norad_id)
    }

    /// Look up by catalog number, or else by case-insensitive name substring.
    pub fn find(&self, query: &str) -> Option<&TleEntry> {
        let query = query.trim();
        if let Ok(norad_id) = query.parse::<u32>() {
            return self.get(norad_id);
        }
        let needle = query.to_lowercase();
        self.satellites
            .values()
            .find(|e| e.info.name.to_lowercase().contains(&needle))
    }

    pub fn reload(&mut self) -> Result<(), PredictError> {
        self.load_all()
    }
}
