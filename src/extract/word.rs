//! Word documents (docx): one text stream plus embedded pictures in document order

use super::ooxml;
use super::{ExtractionResult, Extractor};
use crate::error::{Error, Result};
use crate::models::{Anchor, MediaKind};
use async_trait::async_trait;
use std::path::Path;

const DOCUMENT_PART: &str = "word/document.xml";
const DOCUMENT_RELS: &str = "word/_rels/document.xml.rels";

pub struct WordDocumentExtractor;

#[async_trait]
impl Extractor for WordDocumentExtractor {
    fn media_kind(&self) -> MediaKind {
        MediaKind::WordDocument
    }

    async fn extract(&self, file: &Path, workdir: &Path) -> Result<ExtractionResult> {
        let file = file.to_path_buf();
        let workdir = workdir.to_path_buf();
        tokio::task::spawn_blocking(move || extract_document(&file, &workdir))
            .await
            .map_err(|e| Error::Extraction(format!("Word extraction task failed: {}", e)))?
    }
}

fn extract_document(file: &Path, workdir: &Path) -> Result<ExtractionResult> {
    let mut package = ooxml::open(file)?;
    if !ooxml::has_entry(&mut package, DOCUMENT_PART) {
        return Err(Error::Extraction(format!(
            "{} not found in {}",
            DOCUMENT_PART,
            file.display()
        )));
    }

    let xml = ooxml::read_entry(&mut package, DOCUMENT_PART)?;
    let mut result = ExtractionResult::default();
    result.push_text(Anchor::Whole, ooxml::paragraph_text(&xml)?);

    if !ooxml::has_entry(&mut package, DOCUMENT_RELS) {
        return Ok(result);
    }
    let rels = ooxml::relationships(&ooxml::read_entry(&mut package, DOCUMENT_RELS)?)?;

    let mut seen = std::collections::HashSet::new();
    let mut position = 0u32;
    for id in ooxml::blip_embeds(&xml)? {
        let Some(rel) = rels.get(&id).filter(|r| r.is_image()) else {
            continue;
        };
        let entry = ooxml::resolve_target("word", &rel.target);
        if !seen.insert(entry.clone()) || !ooxml::has_entry(&mut package, &entry) {
            continue;
        }
        position += 1;
        let name = format!("inline{}_{}", position, ooxml::entry_file_name(&entry));
        let asset = ooxml::write_asset(&mut package, &entry, workdir, &name)?;
        result.push_image(Anchor::Inline(position), asset);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ooxml::testing::write_package;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_text_and_images_in_document_order() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("notes.docx");
        let body = r#"<w:document xmlns:w="w" xmlns:a="a" xmlns:r="r"><w:body>
            <w:p><w:r><w:t>Krebs cycle</w:t></w:r></w:p>
            <w:p><w:r><w:drawing><a:blip r:embed="rId9"/></w:drawing></w:r></w:p>
            <w:p><w:r><w:t>Electron transport</w:t></w:r></w:p>
            <w:p><w:r><w:drawing><a:blip r:embed="rId4"/></w:drawing></w:r></w:p>
            </w:body></w:document>"#;
        let rels = r#"<Relationships>
            <Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image1.png"/>
            <Relationship Id="rId9" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="media/image2.jpeg"/>
            </Relationships>"#;
        write_package(
            &doc,
            &[
                ("word/document.xml", body.as_bytes()),
                ("word/_rels/document.xml.rels", rels.as_bytes()),
                ("word/media/image1.png", b"png"),
                ("word/media/image2.jpeg", b"jpg"),
            ],
        );

        let result = WordDocumentExtractor.extract(&doc, tmp.path()).await.unwrap();
        let sections: Vec<_> = result.sections().collect();
        assert_eq!(sections.len(), 1);
        assert!(sections[0].1.contains("Krebs cycle"));
        assert!(sections[0].1.contains("Electron transport"));

        let images: Vec<_> = result.images().collect();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].0, Anchor::Inline(1));
        assert_eq!(images[0].1.mime, "image/jpeg");
        assert_eq!(images[1].1.mime, "image/png");
    }

    #[tokio::test]
    async fn test_missing_document_part() {
        let tmp = TempDir::new().unwrap();
        let doc = tmp.path().join("empty.docx");
        write_package(&doc, &[("docProps/app.xml", b"<x/>")]);
        let result = WordDocumentExtractor.extract(&doc, tmp.path()).await;
        assert!(matches!(result, Err(Error::Extraction(_))));
    }
}
