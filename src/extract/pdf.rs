//! Text documents: PDF (text per page, optional page renders and OCR) and
//! plain text

use super::tool;
use super::{ExtractionResult, Extractor};
use crate::config::IngestConfig;
use crate::error::{Error, Result};
use crate::models::{Anchor, MediaAsset, MediaKind};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{debug, warn};

const PAGE_PREFIX: &str = "page-";

pub struct PdfExtractor {
    pdftoppm_bin: String,
    render_pages: bool,
    dpi: u32,
    ocr: Option<Ocr>,
}

struct Ocr {
    bin: String,
    lang: String,
}

impl PdfExtractor {
    pub fn new(config: &IngestConfig) -> Self {
        Self {
            pdftoppm_bin: config.pdftoppm_bin.clone(),
            render_pages: config.render_pdf_pages,
            dpi: config.pdf_render_dpi,
            ocr: config.ocr_pages.then(|| Ocr {
                bin: config.ocr_bin.clone(),
                lang: config.ocr_lang.clone(),
            }),
        }
    }

    async fn render_pages(&self, file: &Path, workdir: &Path) -> Result<Vec<(u32, MediaAsset)>> {
        let prefix = workdir.join(PAGE_PREFIX.trim_end_matches('-'));
        let dpi = self.dpi.to_string();
        tool::run(
            &self.pdftoppm_bin,
            [
                OsStr::new("-r"),
                OsStr::new(&dpi),
                OsStr::new("-png"),
                file.as_os_str(),
                prefix.as_os_str(),
            ],
        )
        .await?;

        Ok(tool::numbered_files(workdir, PAGE_PREFIX, "png")?
            .into_iter()
            .map(|(page, path)| (page, MediaAsset::from_path(path)))
            .collect())
    }

    /// OCR each rendered page. Pages that fail or read blank are skipped.
    async fn recognize_pages(&self, pages: &[(u32, MediaAsset)]) -> Vec<(u32, String)> {
        let Some(ocr) = &self.ocr else {
            return Vec::new();
        };

        let mut recognized = Vec::new();
        let mut failed = 0;
        for (page, asset) in pages {
            let args = [
                asset.path.as_os_str(),
                OsStr::new("stdout"),
                OsStr::new("-l"),
                OsStr::new(&ocr.lang),
            ];
            match tool::capture(&ocr.bin, args).await {
                Ok(text) if !text.trim().is_empty() => {
                    recognized.push((*page, text.trim().to_string()))
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("OCR failed on page {}: {}", page, e);
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            warn!("OCR failed on {} of {} pages", failed, pages.len());
        }
        recognized
    }
}

#[async_trait]
impl Extractor for PdfExtractor {
    fn media_kind(&self) -> MediaKind {
        MediaKind::TextDocument
    }

    async fn extract(&self, file: &Path, workdir: &Path) -> Result<ExtractionResult> {
        let is_pdf = file
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        let mut result = ExtractionResult::default();
        if !is_pdf {
            let text = tokio::fs::read_to_string(file).await.map_err(|e| {
                Error::Extraction(format!("Failed to read {}: {}", file.display(), e))
            })?;
            result.push_text(Anchor::Whole, text);
            return Ok(result);
        }

        let bytes = tokio::fs::read(file).await?;
        let pages = pdf_pages(bytes).await?;
        debug!("{} has {} pages", file.display(), pages.len());
        for (i, page) in pages.iter().enumerate() {
            let text = page.trim();
            if !text.is_empty() {
                result.push_text(Anchor::Page(i as u32 + 1), text);
            }
        }

        if self.render_pages {
            let rendered = self.render_pages(file, workdir).await?;
            for (page, text) in self.recognize_pages(&rendered).await {
                result.push_image_text(Anchor::Page(page), text);
            }
            for (page, asset) in rendered {
                result.push_image(Anchor::Page(page), asset);
            }
        } else {
            warn!("PDF page rendering disabled; visual content in {} is skipped", file.display());
        }

        Ok(result)
    }
}

/// Text of each page, in page order
#[cfg(feature = "pdf")]
async fn pdf_pages(bytes: Vec<u8>) -> Result<Vec<String>> {
    tokio::task::spawn_blocking(move || pdf_extract::extract_text_from_mem_by_pages(&bytes))
        .await
        .map_err(|e| Error::Extraction(format!("PDF extraction task failed: {}", e)))?
        .map_err(|e| Error::Extraction(format!("PDF extraction failed: {}", e)))
}

#[cfg(not(feature = "pdf"))]
async fn pdf_pages(_bytes: Vec<u8>) -> Result<Vec<String>> {
    Err(Error::Extraction(
        "PDF support not compiled in; rebuild with the `pdf` feature".to_string(),
    ))
}
