use crate::error::ExtractError;
use lopdf::Document;
use tracing::debug;

pub trait PdfExtractor: Send + Sync {
    /// Returns the text of every page, each followed by a newline.
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError>;
}

impl<T: PdfExtractor + ?Sized> PdfExtractor for Box<T> {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        (**self).extract_text(bytes)
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct LopdfExtractor;

impl PdfExtractor for LopdfExtractor {
    fn extract_text(&self, bytes: &[u8]) -> Result<String, ExtractError> {
        let document =
            Document::load_mem(bytes).map_err(|error| ExtractError::PdfParse(error.to_string()))?;

        let pages = document.get_pages();
        let mut text = String::new();
        for page_no in pages.keys() {
            let page_text = document
                .extract_text(&[*page_no])
                .map_err(|error| ExtractError::PdfParse(error.to_string()))?;
            text.push_str(&page_text);
            text.push('\n');
        }

        debug!(pages = pages.len(), chars = text.len(), "extracted pdf text");
        Ok(text)
    }
}

/// True when `filename` carries the `.pdf` extension uploads are required to have.
pub fn has_pdf_extension(filename: &str) -> bool {
    filename.ends_with(".pdf")
}
