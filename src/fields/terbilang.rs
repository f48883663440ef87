//! Indonesian number words, as printed in the "terbilang" line of a slip
//! (`satu juta lima ratus ribu rupiah`).

/// Digits spelled out.
fn unit_value(word: &str) -> Option<i64> {
    Some(match word {
        "nol" => 0,
        "satu" => 1,
        "dua" => 2,
        "tiga" => 3,
        "empat" => 4,
        "lima" => 5,
        "enam" => 6,
        "tujuh" => 7,
        "delapan" => 8,
        "sembilan" => 9,
        _ => return None,
    })
}

/// Scale words which close a group of up to three digits.
fn scale_value(word: &str) -> Option<i64> {
    Some(match word {
        "ribu" => 1_000,
        "juta" => 1_000_000,
        "miliar" | "milyar" => 1_000_000_000,
        "triliun" => 1_000_000_000_000,
        _ => return None,
    })
}

/// Parse Indonesian number words into an integer.
///
/// Parsing stops at `rupiah` or `sen` once a number has been seen. Other
/// unknown words are skipped. Returns `None` if no number word is found.
pub fn parse_terbilang(text: &str) -> Option<i64> {
    let lowered = text.to_lowercase();
    let words = lowered
        .split(|c: char| !c.is_alphabetic())
        .filter(|word| !word.is_empty());

    let mut total: i64 = 0;
    // Value of the group below the next scale word (0..=999).
    let mut group: i64 = 0;
    // Most recent unit, which `belas`, `puluh` and `ratus` multiply.
    let mut last_unit: Option<i64> = None;
    let mut seen_number = false;

    for word in words {
        if let Some(unit) = unit_value(word) {
            group = group.saturating_add(unit);
            last_unit = Some(unit);
            seen_number = true;
            continue;
        }
        // `seribu`, `sejuta` and `semiliar` stand for one of the scale.
        if let Some(scale) = word.strip_prefix("se").and_then(scale_value) {
            total = total.saturating_add(scale);
            last_unit = None;
            seen_number = true;
            continue;
        }
        if let Some(scale) = scale_value(word) {
            total = total.saturating_add(group.max(1).saturating_mul(scale));
            group = 0;
            last_unit = None;
            seen_number = true;
            continue;
        }
        let step = match word {
            "sepuluh" => 10,
            "sebelas" => 11,
            "seratus" => 100,
            "belas" => match last_unit {
                Some(_) => 10,
                None => continue,
            },
            "puluh" => match last_unit {
                Some(unit) => unit * 9,
                None => continue,
            },
            "ratus" => match last_unit {
                Some(unit) => unit * 99,
                None => continue,
            },
            "rupiah" | "sen" if seen_number => break,
            _ => continue,
        };
        group = group.saturating_add(step);
        last_unit = None;
        seen_number = true;
    }

    seen_number.then(|| total.saturating_add(group))
}
