//! XML form of the registry, as read by the IDE's custom plugin repository
//! support:
//!
//! ```xml
//! <?xml version="1.0" encoding="UTF-8"?>
//! <plugins>
//!   <plugin id="com.example.foo" version="1.0" url="https://...">
//!     <name>Foo</name>
//!     <description>...</description>
//!     <idea-version since-build="221" until-build="231.*"/>
//!   </plugin>
//! </plugins>
//! ```

use crate::errors::{RepoError, Result};
use crate::types::{Compatibility, PluginRecord};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

fn ser_err(e: impl std::fmt::Display) -> RepoError {
    RepoError::Serialize(e.to_string())
}

pub fn write(records: &[PluginRecord]) -> Result<Vec<u8>> {
    let mut writer = Writer::new_with_indent(Vec::new(), b' ', 2);
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(ser_err)?;
    writer
        .write_event(Event::Start(BytesStart::new("plugins")))
        .map_err(ser_err)?;

    for record in records {
        let plugin = BytesStart::new("plugin").with_attributes([
            ("id", record.id.as_str()),
            ("version", record.version.as_str()),
            ("url", record.source_url.as_str()),
        ]);
        writer.write_event(Event::Start(plugin)).map_err(ser_err)?;

        for (tag, value) in [("name", &record.name), ("description", &record.description)] {
            if value.is_empty() {
                continue;
            }
            writer
                .write_event(Event::Start(BytesStart::new(tag)))
                .map_err(ser_err)?;
            writer
                .write_event(Event::Text(BytesText::new(value)))
                .map_err(ser_err)?;
            writer
                .write_event(Event::End(BytesEnd::new(tag)))
                .map_err(ser_err)?;
        }

        let idea_version = BytesStart::new("idea-version").with_attributes(
            record
                .compatibility
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str())),
        );
        writer
            .write_event(Event::Empty(idea_version))
            .map_err(ser_err)?;

        writer
            .write_event(Event::End(BytesEnd::new("plugin")))
            .map_err(ser_err)?;
    }

    writer
        .write_event(Event::End(BytesEnd::new("plugins")))
        .map_err(ser_err)?;

    let mut bytes = writer.into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

/// Parse registry XML. Errors are plain reasons; the caller adds the path.
pub fn read(bytes: &[u8]) -> std::result::Result<Vec<PluginRecord>, String> {
    let text = std::str::from_utf8(bytes).map_err(|e| e.to_string())?;
    let mut reader = Reader::from_str(text);
    reader.config_mut().trim_text(true);

    let mut records = Vec::new();
    let mut current: Option<PluginRecord> = None;
    // child of <plugin> whose text is being read
    let mut text_field: Option<&'static str> = None;
    let mut seen_root = false;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| format!("at byte {}: {e}", reader.buffer_position()))?;
        match event {
            Event::Start(e) | Event::Empty(e) if !seen_root => {
                if e.name().as_ref() != b"plugins" {
                    return Err(format!(
                        "root element is <{}>, expected <plugins>",
                        String::from_utf8_lossy(e.name().as_ref())
                    ));
                }
                seen_root = true;
            }
            Event::Start(e) => match e.name().as_ref() {
                b"plugin" => current = Some(plugin(&e)?),
                b"idea-version" => set_compatibility(&mut current, &e)?,
                b"name" => text_field = Some("name"),
                b"description" => text_field = Some("description"),
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"plugin" => records.push(plugin(&e)?),
                b"idea-version" => set_compatibility(&mut current, &e)?,
                _ => {}
            },
            Event::Text(t) => {
                if let (Some(field), Some(record)) = (text_field, current.as_mut()) {
                    let value = t.unescape().map_err(|e| e.to_string())?;
                    field_mut(record, field).push_str(&value);
                }
            }
            Event::CData(c) => {
                if let (Some(field), Some(record)) = (text_field, current.as_mut()) {
                    field_mut(record, field).push_str(&String::from_utf8_lossy(&c));
                }
            }
            Event::End(e) => match e.name().as_ref() {
                b"plugin" => records.extend(current.take()),
                b"name" | b"description" => text_field = None,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    if !seen_root {
        return Err("document has no <plugins> root".into());
    }
    Ok(records)
}

fn field_mut<'r>(record: &'r mut PluginRecord, field: &str) -> &'r mut String {
    match field {
        "name" => &mut record.name,
        _ => &mut record.description,
    }
}

fn attributes(e: &BytesStart<'_>) -> std::result::Result<Compatibility, String> {
    let mut map = Compatibility::new();
    for attr in e.attributes() {
        let attr = attr.map_err(|e| e.to_string())?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).to_string();
        let value = attr.unescape_value().map_err(|e| e.to_string())?;
        map.insert(key, value.to_string());
    }
    Ok(map)
}

fn plugin(e: &BytesStart<'_>) -> std::result::Result<PluginRecord, String> {
    let mut attrs = attributes(e)?;
    let id = attrs
        .remove("id")
        .filter(|id| !id.is_empty())
        .ok_or("<plugin> without an id attribute")?;
    Ok(PluginRecord {
        id,
        name: String::new(),
        version: attrs.remove("version").unwrap_or_default(),
        description: String::new(),
        compatibility: Compatibility::new(),
        source_url: attrs.remove("url").unwrap_or_default(),
    })
}

fn set_compatibility(
    current: &mut Option<PluginRecord>,
    e: &BytesStart<'_>,
) -> std::result::Result<(), String> {
    if let Some(record) = current.as_mut() {
        record.compatibility = attributes(e)?;
    }
    Ok(())
}
