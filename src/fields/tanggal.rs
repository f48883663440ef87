//! Parsing the deposit date ("tanggal").

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;

use super::text::{find_keyword, fuzzy_month_match, repair_tokens};
use crate::config::ExtractConfig;

/// `17-08-2024`, `17/08/24`, `17.08.2024`.
static DMY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\s*[-/.]\s*(\d{1,2})\s*[-/.]\s*(\d{4}|\d{2})\b")
        .expect("failed to compile regex")
});

/// `2024-08-17`, `2024/08/17`.
static YMD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{4})\s*[-/.]\s*(\d{1,2})\s*[-/.]\s*(\d{1,2})\b")
        .expect("failed to compile regex")
});

/// `17 agustus 2024`, `17-agt-24`, `5 januan 2023`.
static TEXTUAL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(\d{1,2})\s*[-/.,]?\s*([a-z]{3,10})\.?\s*[-/.,]?\s*(\d{4}|\d{2})\b")
        .expect("failed to compile regex")
});

/// Clock times such as `10:15` or `09:30:05`, printed next to the date.
static CLOCK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b\d{1,2}:\d{2}(?::\d{2})?\b").expect("failed to compile regex")
});

/// Expand a two-digit year into this century.
fn full_year(year: &str) -> Option<i32> {
    let value = year.parse::<i32>().ok()?;
    if year.len() == 2 {
        Some(2000 + value)
    } else {
        Some(value)
    }
}

/// Build a date, rejecting impossible days and implausible years.
fn make_date(year: i32, month: u32, day: u32, config: &ExtractConfig) -> Option<NaiveDate> {
    if !(config.min_year..=config.max_year).contains(&year) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Matches of [`TEXTUAL_RE`] whose middle word is a month, with that month.
///
/// When the word isn't a month, we retry from the trailing number, which may
/// be the day of a real date (`10 tgl 17 agustus 2024`).
fn textual_dates<'t>(
    text: &'t str,
    config: &ExtractConfig,
) -> Vec<(regex::Captures<'t>, u32)> {
    let mut found = vec![];
    let mut pos = 0;
    while let Some(caps) = TEXTUAL_RE.captures_at(text, pos) {
        let Some(whole) = caps.get(0) else { break };
        match fuzzy_month_match(&caps[2], config.month_similarity) {
            Some(month) => {
                pos = whole.end();
                found.push((caps, month));
            }
            None => pos = caps.get(3).map_or(whole.end(), |year| year.start()),
        }
    }
    found
}

/// All dates in `text`, in order of appearance, with their byte ranges.
///
/// `text` should already be lowercased.
fn dates_in(text: &str, config: &ExtractConfig) -> Vec<(usize, usize, NaiveDate)> {
    let mut found = vec![];
    for caps in DMY_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let date = (|| {
            let day = caps[1].parse::<u32>().ok()?;
            let month = caps[2].parse::<u32>().ok()?;
            make_date(full_year(&caps[3])?, month, day, config)
        })();
        if let Some(date) = date {
            found.push((whole.start(), whole.end(), date));
        }
    }
    for caps in YMD_RE.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        let date = (|| {
            let year = caps[1].parse::<i32>().ok()?;
            let month = caps[2].parse::<u32>().ok()?;
            let day = caps[3].parse::<u32>().ok()?;
            make_date(year, month, day, config)
        })();
        if let Some(date) = date {
            found.push((whole.start(), whole.end(), date));
        }
    }
    for (caps, month) in textual_dates(text, config) {
        let Some(whole) = caps.get(0) else { continue };
        let date = (|| {
            let day = caps[1].parse::<u32>().ok()?;
            make_date(full_year(&caps[3])?, month, day, config)
        })();
        if let Some(date) = date {
            found.push((whole.start(), whole.end(), date));
        }
    }
    found.sort_by_key(|(start, _, _)| *start);
    found
}

/// Find the first date in a single piece of text.
pub fn parse_date(text: &str, config: &ExtractConfig) -> Option<NaiveDate> {
    let repaired = repair_tokens(&text.to_lowercase());
    dates_in(&repaired, config)
        .into_iter()
        .next()
        .map(|(_, _, date)| date)
}

/// Byte ranges of everything in `text` shaped like a date or a clock time,
/// sorted by start.
///
/// Unlike [`dates_in`], impossible days and out-of-range years still count,
/// since `31/09/2024` is no more an amount than `30/09/2024` is.
fn date_like_spans(text: &str, config: &ExtractConfig) -> Vec<(usize, usize)> {
    let mut spans = [&*DMY_RE, &*YMD_RE, &*CLOCK_RE]
        .into_iter()
        .flat_map(|re| re.find_iter(text))
        .map(|m| (m.start(), m.end()))
        .collect::<Vec<_>>();
    spans.extend(
        textual_dates(text, config)
            .iter()
            .filter_map(|(caps, _)| caps.get(0))
            .map(|m| (m.start(), m.end())),
    );
    spans.sort_unstable();
    spans
}

/// Replace every date and clock time in `text` with a space, so that their
/// digits are not mistaken for amounts.
pub fn strip_dates(text: &str, config: &ExtractConfig) -> String {
    let mut stripped = String::with_capacity(text.len());
    let mut last_end = 0;
    for (start, end) in date_like_spans(text, config) {
        // Matches from different patterns may overlap.
        if start < last_end {
            last_end = last_end.max(end);
            continue;
        }
        stripped.push_str(&text[last_end..start]);
        stripped.push(' ');
        last_end = end;
    }
    stripped.push_str(&text[last_end..]);
    stripped
}

/// Parse the deposit date from normalized OCR blocks.
///
/// Blocks mentioning a date keyword, and the block right after each of them,
/// are searched first. Then every block is searched in order, and finally all
/// blocks joined together, which catches dates split over two lines.
pub fn parse_tanggal(blocks: &[String], config: &ExtractConfig) -> Option<NaiveDate> {
    let mut candidates: Vec<&str> = vec![];
    for (idx, block) in blocks.iter().enumerate() {
        if config
            .date_keywords
            .iter()
            .any(|kw| find_keyword(block, kw).is_some())
        {
            candidates.push(block);
            if let Some(next) = blocks.get(idx + 1) {
                candidates.push(next);
            }
        }
    }
    candidates.extend(blocks.iter().map(String::as_str));

    candidates
        .into_iter()
        .find_map(|block| parse_date(block, config))
        .or_else(|| parse_date(&blocks.join(" "), config))
}
