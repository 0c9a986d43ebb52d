//! The persisted plugin registry (`updatePlugins.xml`).
//!
//! Records are kept in list order: new ids append, known ids are updated in
//! place. Serialization is deterministic, so an unchanged registry writes
//! byte-identical output.

pub mod xml;

use crate::errors::{RepoError, Result};
use crate::persist::write_atomic;
use crate::types::PluginRecord;
use std::io::{ErrorKind, Write};
use std::path::Path;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Updated,
    Unchanged,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    records: Vec<PluginRecord>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a registry file. A missing file is an empty registry.
    pub fn load(path: &Path) -> Result<Self> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "no existing registry, starting empty");
                return Ok(Self::new());
            }
            Err(e) => return Err(e.into()),
        };

        let records = xml::read(&bytes).map_err(|reason| RepoError::InvalidRegistry {
            path: path.to_path_buf(),
            reason,
        })?;

        let mut registry = Self::new();
        for record in records {
            if registry.get(&record.id).is_some() {
                warn!(id = %record.id, path = %path.display(), "duplicate plugin id in registry, keeping the later entry");
            }
            registry.upsert(record);
        }
        debug!(path = %path.display(), plugins = registry.len(), "loaded registry");
        Ok(registry)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[PluginRecord] {
        &self.records
    }

    pub fn get(&self, id: &str) -> Option<&PluginRecord> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Insert a new id at the end, or overwrite an existing record where it stands.
    pub fn upsert(&mut self, record: PluginRecord) -> Upsert {
        match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) if *existing == record => Upsert::Unchanged,
            Some(existing) => {
                *existing = record;
                Upsert::Updated
            }
            None => {
                self.records.push(record);
                Upsert::Inserted
            }
        }
    }

    pub fn serialize(&self) -> Result<Vec<u8>> {
        xml::write(&self.records)
    }

    /// Serialize and atomically replace `path`.
    pub fn persist(&self, path: &Path) -> Result<()> {
        let bytes = self.serialize()?;
        write_atomic(path, |file| file.write_all(&bytes))?;
        info!(path = %path.display(), plugins = self.len(), "wrote registry");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Compatibility;

    fn record(id: &str, version: &str) -> PluginRecord {
        PluginRecord {
            id: id.into(),
            name: format!("{id} plugin"),
            version: version.into(),
            description: "desc".into(),
            compatibility: Compatibility::from([("since-build".to_string(), "221".to_string())]),
            source_url: format!("https://dl.test/{id}-{version}.zip"),
        }
    }

    #[test]
    fn test_upsert_appends_new_ids_in_order() {
        let mut reg = Registry::new();
        assert_eq!(reg.upsert(record("b", "1.0")), Upsert::Inserted);
        assert_eq!(reg.upsert(record("a", "1.0")), Upsert::Inserted);
        let ids: Vec<_> = reg.records().iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["b", "a"]);
    }

    #[test]
    fn test_upsert_updates_in_place() {
        let mut reg = Registry::new();
        reg.upsert(record("a", "1.0"));
        reg.upsert(record("b", "1.0"));
        reg.upsert(record("c", "1.0"));

        let mut newer = record("b", "2.0");
        newer.compatibility.insert("until-build".into(), "241.*".into());
        assert_eq!(reg.upsert(newer.clone()), Upsert::Updated);

        assert_eq!(reg.len(), 3);
        assert_eq!(reg.records()[1], newer);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut once = Registry::new();
        once.upsert(record("a", "1.0"));

        let mut twice = Registry::new();
        twice.upsert(record("a", "1.0"));
        assert_eq!(twice.upsert(record("a", "1.0")), Upsert::Unchanged);

        assert_eq!(once.serialize().unwrap(), twice.serialize().unwrap());
    }

    #[test]
    fn test_serialization_is_deterministic() {
        let build = || {
            let mut reg = Registry::new();
            reg.upsert(record("x", "0.1"));
            reg.upsert(record("y", "0.2"));
            reg.serialize().unwrap()
        };
        assert_eq!(build(), build());
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let reg = Registry::load(&dir.path().join("nope.xml")).unwrap();
        assert!(reg.is_empty());
    }

    #[test]
    fn test_persist_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dist/updatePlugins.xml");

        let mut reg = Registry::new();
        reg.upsert(record("a", "1.0"));
        reg.upsert(record("b", "3.1"));
        reg.persist(&path).unwrap();

        let loaded = Registry::load(&path).unwrap();
        assert_eq!(loaded, reg);
    }

    #[test]
    fn test_load_collapses_duplicate_ids() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updatePlugins.xml");
        std::fs::write(
            &path,
            r#"<plugins>
  <plugin id="a" version="1.0" url="u1"/>
  <plugin id="b" version="1.0" url="u2"/>
  <plugin id="a" version="1.1" url="u3"/>
</plugins>"#,
        )
        .unwrap();

        let reg = Registry::load(&path).unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.records()[0].id, "a");
        assert_eq!(reg.records()[0].version, "1.1");
    }

    #[test]
    fn test_load_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("updatePlugins.xml");
        std::fs::write(&path, "<plugins><plugin id=").unwrap();
        let err = Registry::load(&path).err().unwrap();
        assert!(matches!(err, RepoError::InvalidRegistry { .. }));
    }
}
