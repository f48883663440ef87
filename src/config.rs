//! Extraction settings.
//!
//! The defaults work for the common Indonesian deposit slip layouts. They can
//! be overridden with a TOML or JSON file passed via `--config`, in which any
//! missing key keeps its default.

use schemars::JsonSchema;

use crate::{async_utils::io::read_settings, prelude::*};

/// Settings for the field parsers.
#[derive(Clone, Debug, Deserialize, JsonSchema, PartialEq, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractConfig {
    /// Labels which precede a deposit code, such as `kode setor` or `kjs`.
    pub code_keywords: Vec<String>,

    /// Labels which precede the amount, such as `jumlah` or `nominal`.
    pub amount_keywords: Vec<String>,

    /// Labels which precede the date, such as `tanggal` or `tgl`.
    pub date_keywords: Vec<String>,

    /// OCR blocks shorter than this many characters are discarded.
    pub min_block_chars: usize,

    /// Minimum Jaro-Winkler similarity (0.0 to 1.0) for a misspelled month
    /// name to be accepted.
    pub month_similarity: f64,

    /// Earliest year accepted in a date.
    pub min_year: i32,

    /// Latest year accepted in a date.
    pub max_year: i32,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|&value| value.to_owned()).collect()
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            code_keywords: strings(&[
                "kode jenis setoran",
                "kode akun pajak",
                "kode setoran",
                "kode setor",
                "kode akun",
                "kode map",
                "kjs",
                "map",
            ]),
            amount_keywords: strings(&[
                "jumlah setoran",
                "jumlah",
                "nominal",
                "sebesar",
                "amount",
                "total",
            ]),
            date_keywords: strings(&["tanggal setor", "tanggal", "tgl", "date"]),
            min_block_chars: 3,
            month_similarity: 0.85,
            min_year: 2000,
            max_year: 2099,
        }
    }
}

impl ExtractConfig {
    /// Load settings from `path`, or use the defaults.
    #[instrument(level = "debug", skip_all)]
    pub async fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => read_settings::<Self>(path)
                .await
                .with_context(|| format!("failed to load config from {}", path.display()))?,
            None => Self::default(),
        };
        config.validate()?;
        debug!(?config, "loaded extraction config");
        Ok(config)
    }

    /// Check that our settings make sense.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.month_similarity) {
            return Err(anyhow!(
                "month_similarity must be between 0.0 and 1.0, got {}",
                self.month_similarity
            ));
        }
        if self.min_year > self.max_year {
            return Err(anyhow!(
                "min_year ({}) must not be after max_year ({})",
                self.min_year,
                self.max_year
            ));
        }
        for (name, keywords) in [
            ("code_keywords", &self.code_keywords),
            ("amount_keywords", &self.amount_keywords),
            ("date_keywords", &self.date_keywords),
        ] {
            if keywords.iter().any(|kw| kw.trim().is_empty()) {
                return Err(anyhow!("{name} must not contain blank keywords"));
            }
            if keywords.iter().any(|kw| *kw != kw.to_lowercase()) {
                return Err(anyhow!("{name} must be written in lowercase"));
            }
        }
        Ok(())
    }
}
