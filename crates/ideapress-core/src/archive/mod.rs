//! In-memory zip/jar archives.
//!
//! Archives are read-only and held entirely in memory. An optional size
//! ceiling makes oversized buffers and entries fail with `TooLarge` instead
//! of being truncated.

pub mod descriptor;

use crate::errors::{RepoError, Result};
use std::io::{Cursor, Read};
use zip::read::ZipFile;
use zip::result::ZipError;
use zip::ZipArchive;

pub use descriptor::extract;

pub struct Archive {
    zip: ZipArchive<Cursor<Vec<u8>>>,
    names: Vec<String>,
    limit: Option<u64>,
}

impl Archive {
    pub fn open(bytes: Vec<u8>) -> Result<Self> {
        Self::open_with_limit(bytes, None)
    }

    pub fn open_with_limit(bytes: Vec<u8>, limit: Option<u64>) -> Result<Self> {
        if let Some(limit) = limit {
            check_size(bytes.len() as u64, limit)?;
        }

        let mut zip = ZipArchive::new(Cursor::new(bytes)).map_err(RepoError::CorruptArchive)?;

        // Central directory order; the name map inside `ZipArchive` is unordered.
        let mut names = Vec::with_capacity(zip.len());
        for i in 0..zip.len() {
            let file = zip.by_index_raw(i).map_err(RepoError::CorruptArchive)?;
            names.push(file.name().to_string());
        }

        Ok(Self { zip, names, limit })
    }

    /// Entry paths starting with `prefix`, in archive order.
    ///
    /// Each call re-enumerates from the start.
    pub fn list_entries<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.names
            .iter()
            .map(String::as_str)
            .filter(move |name| name.starts_with(prefix))
    }

    /// Open an entry as a byte stream.
    pub fn open_entry(&mut self, path: &str) -> Result<ZipFile<'_>> {
        let limit = self.limit;
        let file = self.zip.by_name(path).map_err(|e| match e {
            ZipError::FileNotFound => RepoError::EntryNotFound(path.to_string()),
            other => RepoError::CorruptArchive(other),
        })?;
        if let Some(limit) = limit {
            check_size(file.size(), limit)?;
        }
        Ok(file)
    }

    /// Read an entry fully into memory.
    pub fn read_entry(&mut self, path: &str) -> Result<Vec<u8>> {
        let limit = self.limit;
        let file = self.open_entry(path)?;
        let mut buf = Vec::with_capacity(file.size().min(1 << 20) as usize);

        match limit {
            // Declared sizes can lie; never read past the ceiling.
            Some(limit) => {
                file.take(limit.saturating_add(1)).read_to_end(&mut buf)?;
                check_size(buf.len() as u64, limit)?;
            }
            None => {
                let mut file = file;
                file.read_to_end(&mut buf)?;
            }
        }
        Ok(buf)
    }
}

fn check_size(size: u64, limit: u64) -> Result<()> {
    if size > limit {
        return Err(RepoError::TooLarge { size, limit });
    }
    Ok(())
}
