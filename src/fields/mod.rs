//! Extracting deposit slip fields from OCR text.

use chrono::NaiveDate;
use regex::Regex;

use crate::{config::ExtractConfig, prelude::*};

pub mod amount;
pub mod jumlah;
pub mod kode_setor;
pub mod tanggal;
pub mod terbilang;
pub mod text;

pub use self::amount::Amount;

/// Separates pages in OCR output.
const FORM_FEED: char = '\x0C';

/// The fields found on a single page.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SlipFields {
    pub kode_setor: Option<String>,
    pub jumlah: Option<Amount>,
    pub tanggal: Option<NaiveDate>,
}

impl SlipFields {
    /// Did we fail to find any field at all?
    pub fn is_empty(&self) -> bool {
        self.kode_setor.is_none() && self.jumlah.is_none() && self.tanggal.is_none()
    }
}

/// Extracts [`SlipFields`] from OCR blocks, using a fixed configuration.
#[derive(Debug)]
pub struct FieldExtractor {
    config: ExtractConfig,
    code_re: Regex,
}

impl FieldExtractor {
    /// Create a new extractor, compiling any keyword patterns.
    pub fn new(config: ExtractConfig) -> Result<Self> {
        let code_re = kode_setor::keyword_regex(&config.code_keywords)?;
        Ok(Self { config, code_re })
    }

    /// Normalize raw OCR blocks the way every parser expects them.
    pub fn normalize<S: AsRef<str>>(&self, raw_blocks: &[S]) -> Vec<String> {
        text::normalize_blocks(raw_blocks, self.config.min_block_chars)
    }

    /// Extract all fields from blocks already passed through
    /// [`FieldExtractor::normalize`].
    pub fn extract_normalized(&self, blocks: &[String]) -> SlipFields {
        let full_text = blocks.join(" ");
        let fields = SlipFields {
            kode_setor: kode_setor::parse_kode_setor(&full_text, &self.code_re),
            jumlah: jumlah::parse_jumlah(blocks, &self.config),
            tanggal: tanggal::parse_tanggal(blocks, &self.config),
        };
        trace!(?fields, "extracted fields");
        fields
    }
}

/// Split OCR text into pages at form feeds. A trailing blank page, which OCR
/// tools emit after the last form feed, is dropped.
pub fn split_pages(text: &str) -> Vec<&str> {
    let mut pages = text.split(FORM_FEED).collect::<Vec<_>>();
    if pages.len() > 1 && pages.last().is_some_and(|page| page.trim().is_empty()) {
        pages.pop();
    }
    pages
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(raw_blocks: &[&str]) -> SlipFields {
        let extractor = FieldExtractor::new(ExtractConfig::default()).unwrap();
        extractor.extract_normalized(&extractor.normalize(raw_blocks))
    }

    #[test]
    fn extracts_all_fields_from_a_slip() {
        let raw = "BUKTI PENERIMAAN NEGARA\n\
                   Tanggal Setor : 17/08/2024\n\
                   Kode Akun Pajak : 411211\n\
                   Jumlah Setoran\n\
                   Rp 1.500.000,00";
        let fields = extract(&text::blocks_from_text(raw));
        assert_eq!(fields.kode_setor.as_deref(), Some("411211"));
        assert_eq!(fields.jumlah, Amount::from_rupiah(1_500_000));
        assert_eq!(fields.tanggal, NaiveDate::from_ymd_opt(2024, 8, 17));
        assert!(!fields.is_empty());
    }

    #[test]
    fn empty_text_has_no_fields() {
        let fields = extract(&["", "  ", "ab"]);
        assert!(fields.is_empty());
    }

    #[test]
    fn split_pages_drops_trailing_blank_page() {
        assert_eq!(split_pages("one\x0Ctwo\x0C\n"), vec!["one", "two"]);
        assert_eq!(split_pages("one\x0C\x0Cthree"), vec!["one", "", "three"]);
        assert_eq!(split_pages(""), vec![""]);
    }
}
