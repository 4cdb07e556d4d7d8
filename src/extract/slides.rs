//! Slide decks (pptx): per-slide text plus the pictures placed on each slide

use super::ooxml::{self, Package};
use super::{ExtractionResult, Extractor};
use crate::error::{Error, Result};
use crate::models::{Anchor, MediaKind};
use async_trait::async_trait;
use std::path::Path;
use tracing::debug;

const SLIDE_PREFIX: &str = "ppt/slides/slide";

pub struct SlideDeckExtractor;

#[async_trait]
impl Extractor for SlideDeckExtractor {
    fn media_kind(&self) -> MediaKind {
        MediaKind::SlideDeck
    }

    async fn extract(&self, file: &Path, workdir: &Path) -> Result<ExtractionResult> {
        let file = file.to_path_buf();
        let workdir = workdir.to_path_buf();
        tokio::task::spawn_blocking(move || extract_deck(&file, &workdir))
            .await
            .map_err(|e| Error::Extraction(format!("Slide extraction task failed: {}", e)))?
    }
}

fn extract_deck(file: &Path, workdir: &Path) -> Result<ExtractionResult> {
    let mut package = ooxml::open(file)?;
    let slides = ooxml::numbered_entries(&package, SLIDE_PREFIX, ".xml");
    if slides.is_empty() {
        return Err(Error::Extraction(format!(
            "{} contains no slides",
            file.display()
        )));
    }

    let mut result = ExtractionResult::default();
    for (number, entry) in slides {
        let xml = ooxml::read_entry(&mut package, &entry)?;
        let text = ooxml::paragraph_text(&xml)?;
        result.push_text(Anchor::Slide(number), text);

        for (i, image_entry) in slide_images(&mut package, number)?.into_iter().enumerate() {
            let name = format!(
                "slide{}_{}_{}",
                number,
                i + 1,
                ooxml::entry_file_name(&image_entry)
            );
            let asset = ooxml::write_asset(&mut package, &image_entry, workdir, &name)?;
            result.push_image(Anchor::Slide(number), asset);
        }
    }

    debug!(
        "Slide deck {} yielded {} units",
        file.display(),
        result.units.len()
    );
    Ok(result)
}

/// Package entries of the images a slide references, in relationship-id order
fn slide_images(package: &mut Package, number: u32) -> Result<Vec<String>> {
    let rels_entry = format!("ppt/slides/_rels/slide{}.xml.rels", number);
    if !ooxml::has_entry(package, &rels_entry) {
        return Ok(Vec::new());
    }
    let rels = ooxml::relationships(&ooxml::read_entry(package, &rels_entry)?)?;

    let mut images: Vec<(String, String)> = rels
        .into_iter()
        .filter(|(_, rel)| rel.is_image())
        .map(|(id, rel)| (id, ooxml::resolve_target("ppt/slides", &rel.target)))
        .filter(|(_, entry)| ooxml::has_entry(package, entry))
        .collect();
    images.sort_by_key(|(id, _)| rel_number(id));
    Ok(images.into_iter().map(|(_, entry)| entry).collect())
}

fn rel_number(id: &str) -> u32 {
    id.trim_start_matches("rId").parse().unwrap_or(u32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::ooxml::testing::write_package;
    use crate::models::ContentUnit;
    use tempfile::TempDir;

    fn slide(text: &str) -> String {
        format!(
            r#"<p:sld xmlns:a="a" xmlns:p="p"><p:cSld><p:spTree><p:sp><p:txBody><a:p><a:r><a:t>{}</a:t></a:r></a:p></p:txBody></p:sp></p:spTree></p:cSld></p:sld>"#,
            text
        )
    }

    #[tokio::test]
    async fn test_slides_in_numeric_order_with_images() {
        let tmp = TempDir::new().unwrap();
        let deck = tmp.path().join("deck.pptx");
        let s1 = slide("Cell structure");
        let s2 = slide("Mitosis phases");
        let s10 = slide("Summary");
        let rels = r#"<Relationships><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/image" Target="../media/image1.png"/></Relationships>"#;
        write_package(
            &deck,
            &[
                ("ppt/slides/slide10.xml", s10.as_bytes()),
                ("ppt/slides/slide2.xml", s2.as_bytes()),
                ("ppt/slides/slide1.xml", s1.as_bytes()),
                ("ppt/slides/_rels/slide2.xml.rels", rels.as_bytes()),
                ("ppt/media/image1.png", b"\x89PNG"),
            ],
        );

        let result = SlideDeckExtractor.extract(&deck, tmp.path()).await.unwrap();
        let sections: Vec<_> = result.sections().collect();
        assert_eq!(
            sections,
            vec![
                (Anchor::Slide(1), "Cell structure"),
                (Anchor::Slide(2), "Mitosis phases"),
                (Anchor::Slide(10), "Summary"),
            ]
        );

        let images: Vec<_> = result.images().collect();
        assert_eq!(images.len(), 1);
        assert_eq!(images[0].0, Anchor::Slide(2));
        assert_eq!(images[0].1.mime, "image/png");
        assert!(images[0].1.path.exists());
        assert!(matches!(result.units[2], ContentUnit::Image { .. }));
    }

    #[tokio::test]
    async fn test_corrupt_deck_is_extraction_error() {
        let tmp = TempDir::new().unwrap();
        let deck = tmp.path().join("broken.pptx");
        std::fs::write(&deck, b"not a zip").unwrap();
        let result = SlideDeckExtractor.extract(&deck, tmp.path()).await;
        assert!(matches!(result, Err(Error::Extraction(_))));
    }
}
