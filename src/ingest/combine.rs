//! Merge extracted text with asset analyses into combined blocks

use crate::models::{Anchor, MediaKind};

/// Description of one image, already ordered by anchor
pub struct Described<'a> {
    pub anchor: Anchor,
    pub text: &'a str,
}

/// Build the combined blocks for one document.
///
/// `sections`, `images` and `image_text` must be sorted by anchor. OCR text
/// is only placed on paged kinds.
pub fn combine(
    kind: MediaKind,
    sections: &[(Anchor, String)],
    images: &[Described<'_>],
    image_text: &[Described<'_>],
    transcript: Option<&str>,
) -> Vec<String> {
    match kind {
        MediaKind::TextDocument => {
            paged(sections, images, image_text, "", "[IMAGE DESCRIPTION]")
        }
        MediaKind::SlideDeck => paged(sections, images, image_text, "Slide ", "[VISUAL CONTENT]"),
        MediaKind::WordDocument => {
            let mut block = raw_text(sections);
            for image in images {
                append(&mut block, "[IMAGE DESCRIPTION]", image.text);
            }
            non_empty(block)
        }
        MediaKind::Video => {
            let mut block = transcript
                .map(|t| format!("TRANSCRIPT: {}", t.trim()))
                .unwrap_or_default();
            for image in images {
                let label = match image.anchor {
                    Anchor::Timestamp(secs) => format!("[VISUAL AT {}s]", secs),
                    _ => "[VISUAL]".to_string(),
                };
                append(&mut block, &label, image.text);
            }
            non_empty(block)
        }
        MediaKind::Audio => non_empty(transcript.unwrap_or_default().to_string()),
    }
}

/// Raw extracted text of all sections
pub fn raw_text(sections: &[(Anchor, String)]) -> String {
    sections
        .iter()
        .map(|(_, body)| body.trim())
        .filter(|body| !body.is_empty())
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// One block per positional anchor (page or slide), image descriptions and
/// OCR text attached to the anchor they were found on
fn paged(
    sections: &[(Anchor, String)],
    images: &[Described<'_>],
    image_text: &[Described<'_>],
    prefix: &str,
    label: &str,
) -> Vec<String> {
    let mut anchors: Vec<Anchor> = sections
        .iter()
        .map(|(a, _)| *a)
        .chain(images.iter().map(|i| i.anchor))
        .chain(image_text.iter().map(|t| t.anchor))
        .collect();
    anchors.sort();
    anchors.dedup();

    anchors
        .into_iter()
        .filter_map(|anchor| {
            let text = sections
                .iter()
                .filter(|(a, _)| *a == anchor)
                .map(|(_, body)| body.trim())
                .collect::<Vec<_>>()
                .join("\n");
            let mut block = match (prefix, anchor) {
                ("", _) | (_, Anchor::Whole) => text,
                (_, Anchor::Slide(n)) | (_, Anchor::Page(n)) | (_, Anchor::Inline(n)) => {
                    format!("{}{}: {}", prefix, n, text)
                }
                (_, Anchor::Timestamp(t)) => format!("{}{}: {}", prefix, t, text),
            };
            for image in images.iter().filter(|i| i.anchor == anchor) {
                append(&mut block, label, image.text);
            }
            for ocr in image_text.iter().filter(|t| t.anchor == anchor) {
                append(&mut block, "[TEXT FROM IMAGE]", ocr.text);
            }
            let block = block.trim().to_string();
            (!block.is_empty()).then_some(block)
        })
        .collect()
}

fn append(block: &mut String, label: &str, text: &str) {
    if text.trim().is_empty() {
        return;
    }
    if !block.is_empty() {
        block.push_str("\n\n");
    }
    block.push_str(label);
    block.push_str(": ");
    block.push_str(text.trim());
}

fn non_empty(block: String) -> Vec<String> {
    let block = block.trim().to_string();
    if block.is_empty() {
        Vec::new()
    } else {
        vec![block]
    }
}
