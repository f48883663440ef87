//! Normalization helpers shared by the field parsers.
//!
//! OCR output for deposit slips is noisy in predictable ways: stray short
//! fragments, mixed case, `O` read instead of `0`, and amounts written with
//! either Indonesian (`1.500.000,00`) or English (`1,500,000.00`) separators.

use std::sync::LazyLock;

use regex::Regex;
use strsim::jaro_winkler;

use super::amount::Amount;

/// An amount written with digits. The first alternative handles grouped
/// thousands (`1.500.000,00`), the second plain runs of digits (`1500000,00`).
pub static AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d{1,3}(?:[.,]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?")
        .expect("failed to compile regex")
});

/// An amount directly preceded by a currency marker.
pub static CURRENCY_AMOUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(?:rp|idr)\.?\s*(\d{1,3}(?:[.,]\d{3})+(?:[.,]\d{1,2})?|\d+(?:[.,]\d{1,2})?)",
    )
    .expect("failed to compile regex")
});

/// Currency markers which may prefix an amount.
static CURRENCY_MARKER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b(?:rp|idr)\.?").expect("failed to compile regex"));

/// Integer parts longer than this are account numbers or transaction IDs.
const MAX_AMOUNT_DIGITS: usize = 15;

/// Currency prefixes which may be glued to a number (`rp1.500.000`).
const CURRENCY_PREFIXES: &[&str] = &["rp.", "rp", "idr"];

/// Month names, followed by accepted abbreviations and spelling variants.
const MONTHS: &[(u32, &str, &[&str])] = &[
    (1, "januari", &["jan", "january"]),
    (2, "februari", &["feb", "peb", "pebruari", "february"]),
    (3, "maret", &["mar", "march"]),
    (4, "april", &["apr"]),
    (5, "mei", &["may"]),
    (6, "juni", &["jun", "june"]),
    (7, "juli", &["jul", "july"]),
    (8, "agustus", &["agu", "agt", "ags", "agust", "aug", "august"]),
    (9, "september", &["sep", "sept"]),
    (10, "oktober", &["okt", "oct", "october"]),
    (11, "november", &["nov", "nop", "nopember"]),
    (12, "desember", &["des", "dec", "december"]),
];

/// Split raw OCR text into blocks, one per line.
pub fn blocks_from_text(text: &str) -> Vec<&str> {
    text.lines().collect()
}

/// Find the first place `keyword` appears in `text` as a whole word, so that
/// `total` doesn't match inside `subtotal`. Digits may touch the keyword, as
/// in `jumlah50.000`.
pub fn find_keyword(text: &str, keyword: &str) -> Option<usize> {
    text.match_indices(keyword).map(|(pos, _)| pos).find(|&pos| {
        let before = text[..pos].chars().next_back();
        let after = text[pos + keyword.len()..].chars().next();
        !before.is_some_and(char::is_alphabetic) && !after.is_some_and(char::is_alphabetic)
    })
}

/// Trim, lowercase and collapse whitespace in OCR blocks, dropping any
/// block shorter than `min_chars` characters.
pub fn normalize_blocks<S: AsRef<str>>(raw_blocks: &[S], min_chars: usize) -> Vec<String> {
    raw_blocks
        .iter()
        .map(|block| {
            block
                .as_ref()
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ")
                .to_lowercase()
        })
        .filter(|block| block.chars().count() >= min_chars)
        .collect()
}

/// Can this character appear in a number once OCR confusions are repaired?
fn is_digit_like(c: char) -> bool {
    c.is_ascii_digit()
        || matches!(
            c,
            '.' | ',' | '-' | '/' | ':' | 'o' | 'O' | 'l' | 'I' | 'i' | '|' | 's' | 'S'
                | 'b' | 'B' | 'z' | 'Z'
        )
}

/// Map a letter commonly confused with a digit back to that digit.
fn repair_digit(c: char) -> char {
    match c {
        'o' | 'O' => '0',
        'l' | 'I' | 'i' | '|' => '1',
        's' | 'S' => '5',
        'b' | 'B' => '8',
        'z' | 'Z' => '2',
        other => other,
    }
}

/// Repair OCR letter/digit confusions inside a numeric token.
///
/// Only tokens that already contain a digit, and otherwise consist entirely of
/// separators and confusable letters, are touched. `1.5oo.ooo` becomes
/// `1.500.000`, but `17agustus` is left alone. A glued currency prefix
/// (`rp1.5oo`) is preserved.
pub fn fix_ocr_digits(token: &str) -> String {
    let (prefix, rest) = CURRENCY_PREFIXES
        .iter()
        .find_map(|prefix| {
            token
                .strip_prefix(*prefix)
                .map(|rest| (&token[..prefix.len()], rest))
        })
        .unwrap_or(("", token));

    if !rest.chars().any(|c| c.is_ascii_digit()) || !rest.chars().all(is_digit_like) {
        return token.to_owned();
    }
    let mut repaired = String::with_capacity(token.len());
    repaired.push_str(prefix);
    repaired.extend(rest.chars().map(repair_digit));
    repaired
}

/// Apply [`fix_ocr_digits`] to every whitespace-separated token of `text`.
pub fn repair_tokens(text: &str) -> String {
    text.split_whitespace()
        .map(fix_ocr_digits)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decide whether a lone separator kind is a decimal separator. Returns
/// `None` when it separates thousands.
fn lone_separator_is_decimal(value: &str, sep: char) -> Option<char> {
    if value.matches(sep).count() > 1 {
        return None;
    }
    let idx = value.rfind(sep)?;
    let fraction_len = value[idx + sep.len_utf8()..].len();
    if (1..=2).contains(&fraction_len) {
        Some(sep)
    } else {
        None
    }
}

/// Normalize a printed transaction value such as `Rp 1.500.000,-` or
/// `IDR 1,500,000.00` into an [`Amount`].
pub fn clean_transaction_value(raw: &str) -> Option<Amount> {
    let lowered = raw.to_lowercase();
    let unmarked = CURRENCY_MARKER_RE.replace_all(&lowered, "");
    let kept = unmarked
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == ',')
        .collect::<String>();
    let kept = kept.trim_matches(|c| c == '.' || c == ',');

    let decimal_sep = match (kept.rfind('.'), kept.rfind(',')) {
        (Some(dot), Some(comma)) => Some(if dot > comma { '.' } else { ',' }),
        (Some(_), None) => lone_separator_is_decimal(kept, '.'),
        (None, Some(_)) => lone_separator_is_decimal(kept, ','),
        (None, None) => None,
    };

    let (integer_part, fraction_part) = match decimal_sep.and_then(|sep| kept.rfind(sep)) {
        Some(idx) => (&kept[..idx], &kept[idx + 1..]),
        None => (kept, ""),
    };
    let integer_digits = integer_part
        .chars()
        .filter(|c| c.is_ascii_digit())
        .collect::<String>();
    let integer_digits = integer_digits.trim_start_matches('0');
    let fraction_digits = fraction_part
        .chars()
        .filter(|c| c.is_ascii_digit())
        .take(2)
        .collect::<String>();

    if !kept.chars().any(|c| c.is_ascii_digit()) || integer_digits.len() > MAX_AMOUNT_DIGITS
    {
        return None;
    }

    let rupiah = if integer_digits.is_empty() {
        0
    } else {
        integer_digits.parse::<i64>().ok()?
    };
    let sen = match fraction_digits.len() {
        0 => 0,
        1 => fraction_digits.parse::<i64>().ok()? * 10,
        _ => fraction_digits.parse::<i64>().ok()?,
    };
    Amount::from_parts(rupiah, sen)
}

/// Match a (possibly misspelled) month name to its number, 1 through 12.
///
/// Exact names and abbreviations are recognized in Indonesian and English.
/// Words of four or more letters are also matched fuzzily against the full
/// names, accepting the best Jaro-Winkler score of at least `min_similarity`.
pub fn fuzzy_month_match(word: &str, min_similarity: f64) -> Option<u32> {
    let word = word
        .trim_matches(|c: char| !c.is_alphabetic())
        .to_lowercase();
    if word.is_empty() {
        return None;
    }

    for (month, name, aliases) in MONTHS {
        if *name == word || aliases.contains(&word.as_str()) {
            return Some(*month);
        }
    }

    let word_len = word.chars().count();
    if word_len < 4 {
        return None;
    }

    let mut best: Option<(u32, f64)> = None;
    for (month, name, aliases) in MONTHS {
        let candidates = std::iter::once(name).chain(aliases.iter());
        for candidate in candidates {
            let candidate_len = candidate.chars().count();
            if candidate_len < 4 || candidate_len.abs_diff(word_len) > 2 {
                continue;
            }
            let score = jaro_winkler(&word, candidate);
            if score >= min_similarity && best.is_none_or(|(_, best_score)| score > best_score)
            {
                best = Some((*month, score));
            }
        }
    }
    best.map(|(month, _)| month)
}
