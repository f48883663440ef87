//! Parsing the deposited amount ("jumlah").

use super::{
    amount::Amount,
    tanggal::strip_dates,
    terbilang::parse_terbilang,
    text::{AMOUNT_RE, CURRENCY_AMOUNT_RE, clean_transaction_value, find_keyword, repair_tokens},
};
use crate::config::ExtractConfig;

/// How many blocks after a keyword block may hold its value.
const KEYWORD_LOOKAHEAD: usize = 2;

/// Marks the line where the amount is spelled out in words.
const TERBILANG: &str = "terbilang";

/// Find the earliest amount keyword in `block`, preferring the longest
/// keyword when several start at the same place. Returns the text after it.
fn after_keyword<'a>(block: &'a str, keywords: &[String]) -> Option<&'a str> {
    keywords
        .iter()
        .filter_map(|kw| find_keyword(block, kw).map(|pos| (pos, kw.len())))
        .min_by_key(|&(pos, len)| (pos, std::cmp::Reverse(len)))
        .map(|(pos, len)| &block[pos + len..])
}

/// The first positive amount written in `text`, ignoring dates and clock
/// times.
fn first_amount(text: &str, config: &ExtractConfig) -> Option<Amount> {
    let cleaned = strip_dates(&repair_tokens(text), config);
    AMOUNT_RE
        .find_iter(&cleaned)
        .filter_map(|m| clean_transaction_value(m.as_str()))
        .find(|amount| amount.is_positive())
}

/// Look for an amount right after a keyword like `jumlah` or `nominal`.
fn keyword_amount(blocks: &[String], config: &ExtractConfig) -> Option<Amount> {
    for (idx, block) in blocks.iter().enumerate() {
        let Some(rest) = after_keyword(block, &config.amount_keywords) else {
            continue;
        };
        let following = blocks.iter().skip(idx + 1).take(KEYWORD_LOOKAHEAD);
        let found = std::iter::once(rest)
            .chain(following.map(String::as_str))
            .find_map(|text| first_amount(text, config));
        if found.is_some() {
            return found;
        }
    }
    None
}

/// The largest amount directly preceded by `rp` or `idr`.
fn currency_amount(blocks: &[String]) -> Option<Amount> {
    blocks
        .iter()
        .flat_map(|block| {
            let repaired = repair_tokens(block);
            CURRENCY_AMOUNT_RE
                .captures_iter(&repaired)
                .filter_map(|caps| clean_transaction_value(&caps[1]))
                .collect::<Vec<_>>()
        })
        .filter(|amount| amount.is_positive())
        .max()
}

/// The amount spelled out after `terbilang`.
fn spelled_out_amount(blocks: &[String]) -> Option<Amount> {
    blocks.iter().enumerate().find_map(|(idx, block)| {
        let pos = block.find(TERBILANG)?;
        let mut text = block[pos + TERBILANG.len()..].to_owned();
        if let Some(next) = blocks.get(idx + 1) {
            text.push(' ');
            text.push_str(next);
        }
        parse_terbilang(&text)
            .and_then(Amount::from_rupiah)
            .filter(|amount| amount.is_positive())
    })
}

/// Parse the deposited amount from normalized OCR blocks.
///
/// Tries, in order: an amount following an amount keyword (in the same block
/// or the next two), the largest `rp`/`idr` amount anywhere, and finally the
/// amount spelled out in words.
pub fn parse_jumlah(blocks: &[String], config: &ExtractConfig) -> Option<Amount> {
    keyword_amount(blocks, config)
        .or_else(|| currency_amount(blocks))
        .or_else(|| spelled_out_amount(blocks))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blocks(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|line| line.to_string()).collect()
    }

    fn rupiah(value: i64) -> Option<Amount> {
        Amount::from_rupiah(value)
    }

    #[test]
    fn finds_amount_after_keyword() {
        let config = ExtractConfig::default();
        let same_block = blocks(&["jumlah: rp 75.000"]);
        assert_eq!(parse_jumlah(&same_block, &config), rupiah(75_000));

        let next_block = blocks(&["jumlah setoran", "rp 1.500.000,00"]);
        assert_eq!(parse_jumlah(&next_block, &config), rupiah(1_500_000));
    }

    #[test]
    fn keyword_amount_skips_dates() {
        let config = ExtractConfig::default();
        let blocks = blocks(&["total 17/08/2024", "idr 1,250,000.00"]);
        assert_eq!(parse_jumlah(&blocks, &config), rupiah(1_250_000));
    }

    #[test]
    fn keyword_amount_skips_invalid_dates_and_times() {
        let config = ExtractConfig::default();
        let bad_day = blocks(&["jumlah setoran", "tanggal 31/09/2024", "rp 500.000"]);
        assert_eq!(parse_jumlah(&bad_day, &config), rupiah(500_000));

        let old_year = blocks(&["total 17/08/1999", "idr 1,250,000.00"]);
        assert_eq!(parse_jumlah(&old_year, &config), rupiah(1_250_000));

        let clock = blocks(&["jumlah 10:15 wib", "rp 500.000"]);
        assert_eq!(parse_jumlah(&clock, &config), rupiah(500_000));
    }

    #[test]
    fn keywords_must_be_whole_words() {
        let config = ExtractConfig::default();
        let blocks = blocks(&["subtotal 2.500", "jumlahnya dua", "setoran rp 300.000"]);
        assert_eq!(parse_jumlah(&blocks, &config), rupiah(300_000));
    }

    #[test]
    fn keyword_amount_repairs_ocr_digits() {
        let config = ExtractConfig::default();
        let blocks = blocks(&["nominal rp 5o.ooo"]);
        assert_eq!(parse_jumlah(&blocks, &config), rupiah(50_000));
    }

    #[test]
    fn falls_back_to_largest_currency_amount() {
        let config = ExtractConfig::default();
        let blocks = blocks(&["biaya admin rp 2.500", "setoran rp 300.000"]);
        assert_eq!(parse_jumlah(&blocks, &config), rupiah(300_000));
    }

    #[test]
    fn falls_back_to_spelled_out_amount() {
        let config = ExtractConfig::default();
        let blocks = blocks(&["terbilang:", "dua ratus ribu rupiah"]);
        assert_eq!(parse_jumlah(&blocks, &config), rupiah(200_000));
    }

    #[test]
    fn returns_none_without_amounts() {
        let config = ExtractConfig::default();
        let blocks = blocks(&["bukti setor", "tanggal 17/08/2024"]);
        assert_eq!(parse_jumlah(&blocks, &config), None);
    }
}
