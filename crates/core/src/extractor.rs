use crate::cleaning::clean_text;
use crate::config::ExtractorConfig;
use crate::docx::extract_docx_text;
use crate::error::ExtractError;
use crate::models::DocumentFormat;
use crate::ocr::OcrEngine;
use lopdf::Document;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct PageText {
    pub number: u32,
    pub text: String,
}

pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, ExtractError>;
}

#[derive(Default)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_pages(&self, path: &Path) -> Result<Vec<PageText>, ExtractError> {
        let document =
            Document::load(path).map_err(|error| ExtractError::PdfParse(error.to_string()))?;

        let mut pages = Vec::new();
        for (page_no, _page_id) in document.get_pages() {
            let text = document
                .extract_text(&[page_no])
                .map_err(|error| ExtractError::PdfParse(error.to_string()))?;

            if !text.trim().is_empty() {
                pages.push(PageText {
                    number: page_no,
                    text,
                });
            }
        }

        Ok(pages)
    }
}

/// Converts uploaded files into cleaned plain text.
pub struct DocumentExtractor {
    ocr: OcrEngine,
    pdf: Box<dyn PdfExtractor>,
}

impl DocumentExtractor {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            ocr: OcrEngine::new(config.ocr_command.clone(), config.ocr_timeout),
            pdf: Box::new(LopdfExtractor),
        }
    }

    pub fn with_pdf_extractor(mut self, pdf: impl PdfExtractor + 'static) -> Self {
        self.pdf = Box::new(pdf);
        self
    }

    /// Infallible boundary used when storing documents: failures come back as
    /// bracketed diagnostics, so the result is never empty.
    pub async fn extract_text(&self, path: &Path, declared_extension: &str) -> String {
        let format = DocumentFormat::from_extension(declared_extension);
        match self.extract(path, &format).await {
            Ok(text) => text,
            Err(error) => {
                warn!(path = %path.display(), %format, error = %error, "extraction failed");
                error.diagnostic()
            }
        }
    }

    pub async fn extract(
        &self,
        path: &Path,
        format: &DocumentFormat,
    ) -> Result<String, ExtractError> {
        let raw = match format {
            DocumentFormat::PlainText => read_plain_text(path).await?,
            DocumentFormat::Pdf => extract_pdf_text(self.pdf.as_ref(), path)?,
            DocumentFormat::Word => extract_docx_text(path)?,
            DocumentFormat::Image => self.ocr.recognize(path).await?,
            DocumentFormat::Unsupported(extension) => {
                return Err(ExtractError::Unsupported(extension.clone()))
            }
        };

        let cleaned = clean_text(&raw);
        if cleaned.is_empty() {
            return Err(ExtractError::NoText(display_name(path)));
        }

        debug!(path = %path.display(), %format, chars = cleaned.chars().count(), "extracted text");
        Ok(cleaned)
    }
}

async fn read_plain_text(path: &Path) -> Result<String, ExtractError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(decode_text(bytes))
}

/// UTF-8 first; anything else is read as Latin-1, which maps every byte.
pub fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(text) => text,
        Err(error) => error.into_bytes().into_iter().map(char::from).collect(),
    }
}

pub fn extract_pdf_text(pdf: &dyn PdfExtractor, path: &Path) -> Result<String, ExtractError> {
    let pages = pdf.extract_pages(path)?;
    if pages.is_empty() {
        return Err(ExtractError::NoText(display_name(path)));
    }

    let mut text = String::new();
    for page in pages {
        debug!(path = %path.display(), page = page.number, chars = page.text.len(), "pdf page");
        if !text.is_empty() {
            text.push('\n');
        }
        text.push_str(&page.text);
    }
    Ok(text)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}
