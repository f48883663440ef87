//! Parsing the deposit code ("kode setor").

use std::sync::LazyLock;

use regex::Regex;

use super::text::{CURRENCY_AMOUNT_RE, fix_ocr_digits};
use crate::prelude::*;

/// Six-digit state revenue account codes: 41xxxx (tax) and 42xxxx (non-tax).
static ACCOUNT_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(4[12]\d{4})\b").expect("failed to compile regex"));

/// Build the regex which matches a code keyword followed by its value.
///
/// Keywords are tried longest first, and whitespace inside a keyword may be
/// missing or repeated in the OCR text. The captured value may still contain
/// OCR confusions like `1oo`.
pub fn keyword_regex(keywords: &[String]) -> Result<Regex> {
    let mut keywords = keywords
        .iter()
        .map(|kw| kw.trim().to_lowercase())
        .filter(|kw| !kw.is_empty())
        .collect::<Vec<_>>();
    if keywords.is_empty() {
        return Err(anyhow!("at least one deposit code keyword is required"));
    }
    keywords.sort_by_key(|kw| std::cmp::Reverse(kw.len()));

    let alternatives = keywords
        .iter()
        .map(|kw| {
            kw.split_whitespace()
                .map(regex::escape)
                .collect::<Vec<_>>()
                .join(r"\s*")
        })
        .collect::<Vec<_>>()
        .join("|");
    // A value may end in `|`, after which `\b` can't match.
    let pattern =
        format!(r"\b(?:{alternatives})\s*[:.\-]?\s*([0-9olisbz|]{{3,6}})(?:\b|\s|$)");
    Regex::new(&pattern).with_context(|| format!("invalid deposit code pattern {pattern:?}"))
}

/// Turn a captured value into a 3-to-6 digit code, if possible.
fn clean_code(raw: &str) -> Option<String> {
    if !raw.chars().any(|c| c.is_ascii_digit()) {
        return None;
    }
    let code = fix_ocr_digits(raw);
    let valid = (3..=6).contains(&code.len()) && code.chars().all(|c| c.is_ascii_digit());
    valid.then_some(code)
}

/// Parse the deposit code from the normalized text of a whole page.
///
/// A value labelled by one of the keywords matched by `keyword_re` wins.
/// Otherwise we fall back to the first revenue account code (`41xxxx` or
/// `42xxxx`) which is not part of a currency amount.
pub fn parse_kode_setor(full_text: &str, keyword_re: &Regex) -> Option<String> {
    let labelled = keyword_re
        .captures_iter(full_text)
        .find_map(|caps| clean_code(&caps[1]));
    if labelled.is_some() {
        return labelled;
    }

    let without_amounts = CURRENCY_AMOUNT_RE.replace_all(full_text, " ");
    ACCOUNT_CODE_RE
        .captures(&without_amounts)
        .map(|caps| caps[1].to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExtractConfig;

    fn default_re() -> Regex {
        keyword_regex(&ExtractConfig::default().code_keywords).unwrap()
    }

    #[test]
    fn finds_labelled_codes() {
        let re = default_re();
        assert_eq!(
            parse_kode_setor("kode setor: 411121 jumlah rp 75.000", &re),
            Some("411121".to_owned())
        );
        assert_eq!(
            parse_kode_setor("kode jenis setoran - 100", &re),
            Some("100".to_owned())
        );
        assert_eq!(parse_kode_setor("map:411211", &re), Some("411211".to_owned()));
    }

    #[test]
    fn tolerates_ocr_noise() {
        let re = default_re();
        assert_eq!(parse_kode_setor("kjs 1oo", &re), Some("100".to_owned()));
        assert_eq!(parse_kode_setor("kodesetor 4ll2ll", &re), Some("411211".to_owned()));
    }

    #[test]
    fn reads_pipes_as_ones() {
        let re = default_re();
        assert_eq!(parse_kode_setor("kjs 10|", &re), Some("101".to_owned()));
        assert_eq!(parse_kode_setor("kode setor 4|1211 rp 5.000", &re), Some("411211".to_owned()));
    }

    #[test]
    fn labelled_codes_beat_earlier_account_codes() {
        let re = default_re();
        assert_eq!(parse_kode_setor("akun 421111 kjs 100", &re), Some("100".to_owned()));
    }

    #[test]
    fn ignores_labels_without_codes() {
        let re = default_re();
        assert_eq!(parse_kode_setor("kode setor: lihat lampiran", &re), None);
        assert_eq!(parse_kode_setor("kjs 1234567", &re), None);
    }

    #[test]
    fn falls_back_to_account_codes() {
        let re = default_re();
        assert_eq!(
            parse_kode_setor("bukti setor 421111 tanggal 17/08/2024", &re),
            Some("421111".to_owned())
        );
        assert_eq!(parse_kode_setor("jumlah rp 411.000 ntpn 123", &re), None);
        assert_eq!(parse_kode_setor("setoran rp 411000", &re), None);
    }

    #[test]
    fn custom_keywords_are_escaped() {
        let re = keyword_regex(&["no. akun".to_owned()]).unwrap();
        assert_eq!(parse_kode_setor("no. akun 411211", &re), Some("411211".to_owned()));
        assert!(keyword_regex(&[" ".to_owned()]).is_err());
    }
}
