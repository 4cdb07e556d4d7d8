//! Helpers for OOXML packages (pptx, docx): zip archives of XML parts

use crate::error::{Error, Result};
use crate::models::MediaAsset;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Maximum decompressed bytes read from a single ZIP entry
pub const MAX_ENTRY_BYTES: u64 = 50 * 1024 * 1024;

pub type Package = zip::ZipArchive<File>;

fn ooxml_err(e: impl std::fmt::Display) -> Error {
    Error::Extraction(format!("Invalid office document: {}", e))
}

pub fn open(path: &Path) -> Result<Package> {
    let file = File::open(path)?;
    zip::ZipArchive::new(file).map_err(ooxml_err)
}

/// Read an entry, refusing entries that inflate past `MAX_ENTRY_BYTES`
pub fn read_entry(package: &mut Package, name: &str) -> Result<Vec<u8>> {
    let entry = package.by_name(name).map_err(ooxml_err)?;
    let mut out = Vec::new();
    entry
        .take(MAX_ENTRY_BYTES)
        .read_to_end(&mut out)
        .map_err(ooxml_err)?;
    if out.len() as u64 >= MAX_ENTRY_BYTES {
        return Err(Error::Extraction(format!(
            "{} exceeds size limit ({} bytes)",
            name, MAX_ENTRY_BYTES
        )));
    }
    Ok(out)
}

pub fn has_entry(package: &mut Package, name: &str) -> bool {
    package.by_name(name).is_ok()
}

/// Entries named `{prefix}<number>{suffix}`, sorted by number
pub fn numbered_entries(package: &Package, prefix: &str, suffix: &str) -> Vec<(u32, String)> {
    let mut names: Vec<(u32, String)> = package
        .file_names()
        .filter_map(|name| {
            let number = name
                .strip_prefix(prefix)?
                .strip_suffix(suffix)?
                .parse::<u32>()
                .ok()?;
            Some((number, name.to_string()))
        })
        .collect();
    names.sort();
    names
}

/// Concatenate `<*:t>` runs, ending each `<*:p>` paragraph with a newline
pub fn paragraph_text(xml: &[u8]) -> Result<String> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut out = String::new();
    let mut in_text = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) if e.local_name().as_ref() == b"t" => in_text = true,
            Ok(Event::End(e)) => match e.local_name().as_ref() {
                b"t" => in_text = false,
                b"p" => {
                    if !out.is_empty() && !out.ends_with('\n') {
                        out.push('\n');
                    }
                }
                _ => {}
            },
            Ok(Event::Text(te)) if in_text => {
                out.push_str(&te.unescape().map_err(ooxml_err)?);
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(out.trim().to_string())
}

/// One `<Relationship>` from a `.rels` part
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Relationship {
    pub kind: String,
    pub target: String,
}

impl Relationship {
    pub fn is_image(&self) -> bool {
        self.kind.ends_with("/image")
    }
}

/// Parse a `.rels` part into id -> relationship
pub fn relationships(xml: &[u8]) -> Result<HashMap<String, Relationship>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut rels = HashMap::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e))
                if e.local_name().as_ref() == b"Relationship" =>
            {
                let mut id = None;
                let mut kind = String::new();
                let mut target = String::new();
                for attr in e.attributes() {
                    let attr = attr.map_err(ooxml_err)?;
                    let value = attr.unescape_value().map_err(ooxml_err)?.into_owned();
                    match attr.key.local_name().as_ref() {
                        b"Id" => id = Some(value),
                        b"Type" => kind = value,
                        b"Target" => target = value,
                        _ => {}
                    }
                }
                if let Some(id) = id {
                    rels.insert(id, Relationship { kind, target });
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(rels)
}

/// Relationship ids of embedded pictures (`<a:blip r:embed="…">`) in document order
pub fn blip_embeds(xml: &[u8]) -> Result<Vec<String>> {
    let mut reader = Reader::from_reader(xml);
    let mut buf = Vec::new();
    let mut ids = Vec::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Empty(e)) | Ok(Event::Start(e)) if e.local_name().as_ref() == b"blip" => {
                for attr in e.attributes() {
                    let attr = attr.map_err(ooxml_err)?;
                    if attr.key.local_name().as_ref() == b"embed" {
                        ids.push(attr.unescape_value().map_err(ooxml_err)?.into_owned());
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(ooxml_err(e)),
            _ => {}
        }
        buf.clear();
    }

    Ok(ids)
}

/// Resolve a relationship target relative to the part's directory
pub fn resolve_target(part_dir: &str, target: &str) -> String {
    if let Some(absolute) = target.strip_prefix('/') {
        return absolute.to_string();
    }
    let mut segments: Vec<&str> = part_dir.split('/').filter(|s| !s.is_empty()).collect();
    for segment in target.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Copy a package entry into `dest_dir` as `file_name`
pub fn write_asset(
    package: &mut Package,
    entry: &str,
    dest_dir: &Path,
    file_name: &str,
) -> Result<MediaAsset> {
    let bytes = read_entry(package, entry)?;
    let dest = dest_dir.join(file_name);
    std::fs::write(&dest, bytes)?;
    Ok(MediaAsset::from_path(dest))
}

/// Last path segment of an entry name
pub fn entry_file_name(entry: &str) -> &str {
    entry.rsplit('/').next().unwrap_or(entry)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_text_keeps_run_spacing() {
        let xml = br#"<p:sld xmlns:a="a" xmlns:p="p"><a:p><a:r><a:t>Hello </a:t></a:r><a:r><a:t>world</a:t></a:r></a:p><a:p><a:r><a:t>Tom &amp; Jerry</a:t></a:r></a:p></p:sld>"#;
        assert_eq!(paragraph_text(xml).unwrap(), "Hello world\nTom & Jerry");
    }

    #[test]
    fn test_relationships_and_images() {
        let xml = br#"<Relationships><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/slideLayout" Target="../slideLayouts/slideLayout1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/></Relationships>"#;
        let rels = relationships(xml).unwrap();
        assert_eq!(rels.len(), 2);
        assert!(rels["rId2"].is_image());
        assert!(!rels["rId1"].is_image());
    }

    #[test]
    fn test_blip_embeds_in_order() {
        let xml = br#"<w:document xmlns:a="a" xmlns:r="r"><a:blip r:embed="rId7"/><a:blip r:embed="rId3"/></w:document>"#;
        assert_eq!(blip_embeds(xml).unwrap(), vec!["rId7", "rId3"]);
    }

    #[test]
    fn test_resolve_target() {
        assert_eq!(resolve_target("ppt/slides", "../media/image1.png"), "ppt/media/image1.png");
        assert_eq!(resolve_target("word", "media/image2.jpeg"), "word/media/image2.jpeg");
        assert_eq!(resolve_target("word", "/word/media/x.png"), "word/media/x.png");
    }
}
