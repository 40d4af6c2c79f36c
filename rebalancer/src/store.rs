//! File-backed portfolio store: one pretty-printed JSON file per portfolio.
//!
//! Writes go to `<id>.json.tmp` first and are renamed over `<id>.json`, so a
//! crash mid-write never leaves a truncated portfolio behind.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use folio::Portfolio;
use log::debug;

use crate::error::{Error, Result};

/// Directory of `<id>.json` portfolio files.
pub struct Store {
    dir: PathBuf,
}

impl Store {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// File path for a portfolio id.
    pub fn path(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.json"))
    }

    pub fn exists(&self, id: &str) -> bool {
        self.path(id).exists()
    }

    /// Load a portfolio by id.
    ///
    /// The id must be a valid portfolio id, so it never names a file outside
    /// the store, and must match the id recorded in the file.
    pub fn load(&self, id: &str) -> Result<Portfolio> {
        Portfolio::validate_id(id)?;
        let path = self.path(id);
        let portfolio = Portfolio::load_json(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => Error::NotFound(id.to_string()),
            _ => Error::StoreRead {
                path: path.clone(),
                source: e,
            },
        })?;
        if portfolio.id() != id {
            return Err(Error::IdMismatch {
                path,
                found: portfolio.id().to_string(),
            });
        }
        Ok(portfolio)
    }

    /// Save a new portfolio. Fails if one with the same id is already stored.
    pub fn create(&self, portfolio: &Portfolio) -> Result<()> {
        if self.exists(portfolio.id()) {
            return Err(Error::AlreadyExists(portfolio.id().to_string()));
        }
        self.save(portfolio)
    }

    /// Save a portfolio, replacing any previous version.
    pub fn save(&self, portfolio: &Portfolio) -> Result<()> {
        let path = self.path(portfolio.id());
        let write_err = |source| Error::StoreWrite {
            path: path.clone(),
            source,
        };

        fs::create_dir_all(&self.dir).map_err(write_err)?;
        let tmp = self.dir.join(format!("{}.json.tmp", portfolio.id()));
        portfolio.save_json(&tmp).map_err(write_err)?;
        fs::rename(&tmp, &path).map_err(write_err)?;
        debug!("saved {}", path.display());
        Ok(())
    }

    /// Load every stored portfolio, sorted by id. A missing store directory
    /// is an empty store.
    pub fn list(&self) -> Result<Vec<Portfolio>> {
        let read_err = |source| Error::StoreRead {
            path: self.dir.clone(),
            source,
        };
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(read_err(e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let path = entry.map_err(read_err)?.path();
            if path.extension().is_some_and(|ext| ext == "json") {
                match path.file_stem().and_then(|s| s.to_str()) {
                    Some(stem) if Portfolio::validate_id(stem).is_ok() => ids.push(stem.to_string()),
                    _ => debug!("skipping {}", path.display()),
                }
            }
        }
        ids.sort();

        ids.iter().map(|id| self.load(id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use folio::{Price, Ticker};

    fn sample() -> Portfolio {
        let mut p = Portfolio::new("CANSLIM_QUANT", "Canslim Quant Portfolio", 500_00).unwrap();
        p.add_holding(Ticker::new("FORTIS"), 106, Price(750_45), Price(929_75))
            .unwrap();
        p.set_holding_name(&Ticker::new("FORTIS"), "Fortis Healthcare Ltd")
            .unwrap();
        p
    }

    #[test]
    fn save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let p = sample();

        store.create(&p).unwrap();
        let loaded = store.load("CANSLIM_QUANT").unwrap();
        assert_eq!(loaded, p);
        assert!(!dir.path().join("CANSLIM_QUANT.json.tmp").exists());
    }

    #[test]
    fn create_refuses_existing_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        store.create(&sample()).unwrap();
        assert!(matches!(
            store.create(&sample()),
            Err(Error::AlreadyExists(id)) if id == "CANSLIM_QUANT"
        ));
    }

    #[test]
    fn save_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        let mut p = sample();
        store.create(&p).unwrap();

        p.deposit(100_00).unwrap();
        store.save(&p).unwrap();
        assert_eq!(store.load("CANSLIM_QUANT").unwrap().cash(), 600_00);
    }

    #[test]
    fn load_missing_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        assert!(matches!(store.load("NOPE"), Err(Error::NotFound(_))));
    }

    #[test]
    fn load_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("BAD.json"), "{ not json").unwrap();
        let store = Store::new(dir.path());
        assert!(matches!(store.load("BAD"), Err(Error::StoreRead { .. })));
    }

    #[test]
    fn load_rejects_ids_outside_the_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("store"));
        std::fs::create_dir_all(store.dir()).unwrap();
        Portfolio::new("x", "Outside", 0)
            .unwrap()
            .save_json(&dir.path().join("x.json"))
            .unwrap();

        for id in ["../x", "a/b", ""] {
            assert!(matches!(
                store.load(id),
                Err(Error::Portfolio(folio::PortfolioError::InvalidId(_)))
            ));
        }
    }

    #[test]
    fn load_rejects_file_with_other_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path());
        sample().save_json(&store.path("COPY")).unwrap();

        let err = store.load("COPY").unwrap_err();
        assert!(matches!(err, Error::IdMismatch { found, .. } if found == "CANSLIM_QUANT"));
    }

    #[test]
    fn list_sorted_and_skips_other_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(dir.path().join("nested"));
        assert!(store.list().unwrap().is_empty());

        store.create(&Portfolio::new("B", "Beta", 0).unwrap()).unwrap();
        store.create(&Portfolio::new("A", "Alpha", 0).unwrap()).unwrap();
        std::fs::write(store.dir().join("notes.txt"), "ignore me").unwrap();
        std::fs::write(store.dir().join("old.backup.json"), "{}").unwrap();

        let ids: Vec<_> = store
            .list()
            .unwrap()
            .iter()
            .map(|p| p.id().to_string())
            .collect();
        assert_eq!(ids, ["A", "B"]);
    }
}
