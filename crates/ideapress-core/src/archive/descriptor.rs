//! Plugin descriptor extraction from a distribution archive.
//!
//! A distribution is a zip holding exactly one top-level directory `<root>/`.
//! The plugin's own library is the entry directly under `<root>/lib/` whose
//! file name contains `<root>`; bundled third-party jars sit next to it. The
//! library is itself a zip with `META-INF/plugin.xml` inside.

use super::Archive;
use crate::errors::{RepoError, Result};
use crate::types::{Compatibility, PluginRecord};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use tracing::debug;

pub const DESCRIPTOR_PATH: &str = "META-INF/plugin.xml";

const REQUIRED_FIELDS: [&str; 4] = ["id", "name", "version", "description"];

/// Extract the plugin record from distribution bytes downloaded from `source_url`.
pub fn extract(bytes: Vec<u8>, source_url: &str, limit: Option<u64>) -> Result<PluginRecord> {
    let mut outer = Archive::open_with_limit(bytes, limit)?;
    let root = root_directory(&outer)?;
    let library = find_library(&outer, &root)?;
    debug!(%root, %library, "found plugin library");

    let inner_bytes = outer.read_entry(&library)?;
    let mut inner = Archive::open_with_limit(inner_bytes, limit)?;
    let xml = inner.read_entry(DESCRIPTOR_PATH).map_err(|e| match e {
        RepoError::EntryNotFound(_) => RepoError::DescriptorNotFound {
            library: library.clone(),
            reason: format!("{DESCRIPTOR_PATH} is missing"),
        },
        other => other,
    })?;

    let descriptor = parse_descriptor(&xml).map_err(|reason| match reason {
        DescriptorError::Missing(field) => RepoError::IncompleteDescriptor(field),
        DescriptorError::Invalid(reason) => RepoError::DescriptorNotFound {
            library: library.clone(),
            reason,
        },
    })?;

    Ok(PluginRecord {
        id: descriptor.id,
        name: descriptor.name,
        version: descriptor.version,
        description: descriptor.description,
        compatibility: descriptor.compatibility,
        source_url: source_url.to_string(),
    })
}

/// Name of the single top-level directory.
fn root_directory(archive: &Archive) -> Result<String> {
    // (name, is_dir) in first-seen order
    let mut tops: Vec<(&str, bool)> = Vec::new();
    for entry in archive.list_entries("") {
        let (head, is_dir) = match entry.split_once('/') {
            Some((head, _)) => (head, true),
            None => (entry, false),
        };
        match tops.iter_mut().find(|(name, _)| *name == head) {
            Some(top) => top.1 |= is_dir,
            None => tops.push((head, is_dir)),
        }
    }

    match tops.as_slice() {
        [(name, true)] if !name.is_empty() => Ok(name.to_string()),
        [] => Err(RepoError::MalformedDistribution("archive is empty".into())),
        _ => Err(RepoError::MalformedDistribution(format!(
            "expected a single top-level directory, found: {}",
            tops.iter()
                .map(|(name, is_dir)| if *is_dir { format!("{name}/") } else { name.to_string() })
                .collect::<Vec<_>>()
                .join(", ")
        ))),
    }
}

/// First entry directly under `<root>/lib/` whose file name contains `root`.
fn find_library(archive: &Archive, root: &str) -> Result<String> {
    let prefix = format!("{root}/lib/");
    let found = archive
        .list_entries(&prefix)
        .find(|entry| {
            let file_name = &entry[prefix.len()..];
            !file_name.is_empty() && !file_name.contains('/') && file_name.contains(root)
        })
        .map(str::to_string);
    found.ok_or_else(|| RepoError::LibraryNotFound {
        root: root.to_string(),
    })
}

#[derive(Debug, Default)]
struct Descriptor {
    id: String,
    name: String,
    version: String,
    description: String,
    compatibility: Compatibility,
}

#[derive(Debug)]
enum DescriptorError {
    Missing(&'static str),
    Invalid(String),
}

fn invalid(e: impl std::fmt::Display) -> DescriptorError {
    DescriptorError::Invalid(e.to_string())
}

fn parse_descriptor(xml: &[u8]) -> std::result::Result<Descriptor, DescriptorError> {
    let text = std::str::from_utf8(xml).map_err(invalid)?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut fields: [Option<String>; 4] = Default::default();
    let mut compatibility = Compatibility::new();
    let mut depth = 0usize;
    let mut seen_root = false;
    // index into REQUIRED_FIELDS of the depth-1 element being captured
    let mut capturing: Option<usize> = None;

    loop {
        match reader.read_event().map_err(invalid)? {
            Event::Start(e) => {
                depth += 1;
                if depth == 1 {
                    seen_root = true;
                } else if depth == 2 {
                    let name = e.name();
                    if name.as_ref() == b"idea-version" {
                        compatibility = attributes(&e)?;
                    }
                    capturing = field_index(name.as_ref());
                    if let Some(i) = capturing {
                        // first occurrence wins
                        if fields[i].is_some() {
                            capturing = None;
                        } else {
                            fields[i] = Some(String::new());
                        }
                    }
                }
            }
            Event::Empty(e) => {
                if depth == 0 {
                    seen_root = true;
                } else if depth == 1 {
                    let name = e.name();
                    if name.as_ref() == b"idea-version" {
                        compatibility = attributes(&e)?;
                    } else if let Some(i) = field_index(name.as_ref()) {
                        fields[i].get_or_insert_with(String::new);
                    }
                }
            }
            Event::End(_) => {
                if depth == 2 {
                    capturing = None;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Text(t) => {
                if let Some(i) = capturing {
                    let value = t.unescape().map_err(invalid)?;
                    push_text(&mut fields[i], &value);
                }
            }
            Event::CData(c) => {
                if let Some(i) = capturing {
                    let value = String::from_utf8_lossy(&c);
                    push_text(&mut fields[i], &value);
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err(DescriptorError::Invalid("document has no root element".into()));
    }

    let [id, name, version, description] = fields;
    let take = |value: Option<String>, field: &'static str| {
        value
            .map(|v| v.trim().to_string())
            .ok_or(DescriptorError::Missing(field))
    };
    Ok(Descriptor {
        id: take(id, "id")?,
        name: take(name, "name")?,
        version: take(version, "version")?,
        description: take(description, "description")?,
        compatibility,
    })
}

fn field_index(name: &[u8]) -> Option<usize> {
    REQUIRED_FIELDS.iter().position(|f| f.as_bytes() == name)
}

fn push_text(field: &mut Option<String>, value: &str) {
    field.get_or_insert_with(String::new).push_str(value);
}

fn attributes(e: &BytesStart<'_>) -> std::result::Result<Compatibility, DescriptorError> {
    let mut map = Compatibility::new();
    for attr in e.attributes() {
        let attr = attr.map_err(invalid)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().map_err(invalid)?.to_string();
        map.insert(key, value);
    }
    Ok(map)
}
