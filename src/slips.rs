//! Deposit slip records: what we read, what we write, and how one becomes the
//! other.

use chrono::NaiveDate;
use futures::{StreamExt as _, stream};
use schemars::JsonSchema;

use crate::{
    async_utils::{BoxedStream, io::write_csv},
    cmd::StreamOpts,
    fields::{Amount, FieldExtractor, SlipFields, split_pages, text::blocks_from_text},
    prelude::*,
    ui::Ui,
    work::{WorkInput, WorkItemCounterExt as _, WorkOutput, WorkOutputCounters, WorkStatus},
};

/// Warning for pages where OCR found nothing we could read.
const NO_TEXT_WARNING: &str = "no text detected";

/// Warning for pages with text, but without any recognizable field.
const NO_FIELDS_WARNING: &str = "no fields found";

/// An input record holding the OCR text of one deposit slip.
///
/// Exactly one of `text` and `pages` must be present.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct SlipInput {
    /// The OCR text, one block per line. Pages are separated by form feeds.
    #[serde(default)]
    pub text: Option<String>,

    /// The OCR text of each page, as an alternative to `text`.
    #[serde(default)]
    pub pages: Option<Vec<String>>,

    /// The name of a preview image produced by the OCR step. Copied to every
    /// page of the output.
    #[serde(default)]
    pub preview_filename: Option<String>,
}

impl SlipInput {
    /// The OCR text of each page.
    fn page_texts(&self) -> Result<Vec<&str>> {
        match (&self.text, &self.pages) {
            (Some(text), None) => Ok(split_pages(text)),
            (None, Some(pages)) if pages.is_empty() => {
                Err(anyhow!("`pages` must contain at least one page"))
            }
            (None, Some(pages)) => Ok(pages.iter().map(String::as_str).collect()),
            (Some(_), Some(_)) => Err(anyhow!("expected either `text` or `pages`, not both")),
            (None, None) => Err(anyhow!("expected either `text` or `pages`")),
        }
    }

    /// The preview filename, treating blank values (common in CSV) as missing.
    fn preview_filename(&self) -> Option<String> {
        self.preview_filename
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_owned)
    }
}

/// The fields extracted from one page.
#[derive(Clone, Debug, JsonSchema, PartialEq, Serialize)]
pub struct SlipPage {
    /// The 1-based page number.
    pub page: usize,

    /// The deposit code, as a string of 3 to 6 digits.
    pub kode_setor: Option<String>,

    /// The deposited amount in rupiah.
    #[schemars(with = "Option<f64>")]
    pub jumlah: Option<Amount>,

    /// The deposit date.
    pub tanggal: Option<NaiveDate>,

    /// The preview image name from the input record.
    pub preview_filename: Option<String>,

    /// Why this page yielded nothing, if it didn't.
    pub warning: Option<String>,
}

impl SlipPage {
    /// Did we find anything on this page?
    pub fn has_fields(&self) -> bool {
        self.kode_setor.is_some() || self.jumlah.is_some() || self.tanggal.is_some()
    }
}

/// The result of extracting a whole slip.
#[derive(Clone, Debug, Default, JsonSchema, Serialize)]
pub struct SlipOutput {
    /// How many pages the slip has.
    pub total_pages: usize,

    /// One result per page, in order.
    pub pages: Vec<SlipPage>,
}

/// Extract the fields of a single page.
fn extract_page(
    page: usize,
    text: &str,
    preview_filename: Option<String>,
    extractor: &FieldExtractor,
) -> SlipPage {
    let blocks = extractor.normalize(&blocks_from_text(text));
    let (fields, warning) = if blocks.is_empty() {
        (SlipFields::default(), Some(NO_TEXT_WARNING.to_owned()))
    } else {
        let fields = extractor.extract_normalized(&blocks);
        let warning = fields.is_empty().then(|| NO_FIELDS_WARNING.to_owned());
        (fields, warning)
    };
    SlipPage {
        page,
        kode_setor: fields.kode_setor,
        jumlah: fields.jumlah,
        tanggal: fields.tanggal,
        preview_filename,
        warning,
    }
}

/// `ok` if every page has a field, `failed` if none does, and `incomplete`
/// otherwise.
fn slip_status(pages: &[SlipPage]) -> WorkStatus {
    let with_fields = pages.iter().filter(|page| page.has_fields()).count();
    if with_fields == 0 {
        WorkStatus::Failed
    } else if with_fields < pages.len() {
        WorkStatus::Incomplete
    } else {
        WorkStatus::Ok
    }
}

/// Extract every page of a slip.
#[instrument(level = "debug", skip_all, fields(id = %input.id))]
pub fn extract_slip(input: WorkInput<SlipInput>, extractor: &FieldExtractor) -> WorkOutput<SlipOutput> {
    let WorkInput { id, data } = input;
    let page_texts = match data.page_texts() {
        Ok(page_texts) => page_texts,
        Err(err) => {
            warn!("invalid slip record: {err:#}");
            return WorkOutput::new_failed(id, vec![format!("{err:#}")], SlipOutput::default());
        }
    };

    let preview_filename = data.preview_filename();
    let pages = page_texts
        .iter()
        .enumerate()
        .map(|(idx, text)| extract_page(idx + 1, text, preview_filename.clone(), extractor))
        .collect::<Vec<_>>();

    let status = slip_status(&pages);
    let errors = if status == WorkStatus::Failed {
        vec!["no fields found on any page".to_owned()]
    } else {
        vec![]
    };
    debug!(?status, total_pages = pages.len(), "extracted slip");
    WorkOutput {
        id,
        status,
        errors,
        data: SlipOutput {
            total_pages: pages.len(),
            pages,
        },
    }
}

/// Extract a slip from a raw JSON record. Records which don't deserialize
/// become failed outputs, keeping their `id` when they have one.
pub fn extract_record(value: Value, extractor: &FieldExtractor) -> WorkOutput<SlipOutput> {
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match WorkInput::<SlipInput>::from_json(value) {
        Ok(input) => extract_slip(input, extractor),
        Err(err) => {
            warn!(%id, "could not read slip record: {err:#}");
            WorkOutput::new_failed(id, vec![format!("{err:#}")], SlipOutput::default())
        }
    }
}

/// One page of [`WorkOutput<SlipOutput>`], flattened for CSV output.
///
/// A record without any pages (because its input was invalid) becomes a
/// single row without a page number.
#[derive(Clone, Debug, JsonSchema, Serialize)]
pub struct FlatSlipPage {
    /// The ID of the input record.
    pub id: String,

    /// The status of the whole record.
    pub status: WorkStatus,

    /// The 1-based page number.
    pub page: Option<usize>,

    /// How many pages the slip has.
    pub total_pages: usize,

    /// The deposit code.
    pub kode_setor: Option<String>,

    /// The deposited amount in rupiah.
    #[schemars(with = "Option<f64>")]
    pub jumlah: Option<Amount>,

    /// The deposit date.
    pub tanggal: Option<NaiveDate>,

    /// The preview image name from the input record.
    pub preview_filename: Option<String>,

    /// Why this page yielded nothing, if it didn't.
    pub warning: Option<String>,

    /// Any errors for the whole record, separated by blank lines.
    pub errors: Option<String>,
}

impl WorkOutput<SlipOutput> {
    /// Convert this output record to one flat row per page.
    pub fn to_flat_rows(&self) -> Vec<FlatSlipPage> {
        let id = self.id_string();
        let errors = (!self.errors.is_empty()).then(|| self.errors.join("\n\n"));
        let row = |page: Option<&SlipPage>| FlatSlipPage {
            id: id.clone(),
            status: self.status,
            page: page.map(|page| page.page),
            total_pages: self.data.total_pages,
            kode_setor: page.and_then(|page| page.kode_setor.clone()),
            jumlah: page.and_then(|page| page.jumlah),
            tanggal: page.and_then(|page| page.tanggal),
            preview_filename: page.and_then(|page| page.preview_filename.clone()),
            warning: page.and_then(|page| page.warning.clone()),
            errors: errors.clone(),
        };
        if self.data.pages.is_empty() {
            vec![row(None)]
        } else {
            self.data.pages.iter().map(|page| row(Some(page))).collect()
        }
    }

    /// Write a stream of outputs as CSV to a [`Path`] or to standard output.
    pub async fn write_stream_to_csv(
        ui: &Ui,
        path: Option<&Path>,
        stream: BoxedStream<Result<Self>>,
        stream_opts: &StreamOpts,
    ) -> Result<()> {
        let (stream, counters) = WorkOutputCounters::wrap_stream(stream);
        let rows = stream
            .flat_map(|output| {
                let rows: Vec<Result<FlatSlipPage>> = match output {
                    Ok(output) => output.to_flat_rows().into_iter().map(Ok).collect(),
                    Err(err) => vec![Err(err)],
                };
                stream::iter(rows)
            })
            .boxed();
        write_csv(path, rows).await?;
        counters.finish(ui, stream_opts)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::config::ExtractConfig;

    fn extractor() -> FieldExtractor {
        FieldExtractor::new(ExtractConfig::default()).unwrap()
    }

    #[test]
    fn extracts_a_single_page_slip() {
        let record = json!({
            "id": "slip-1",
            "text": "SLIP SETORAN\ntgl. 5 Januan 2023\nkjs 1OO\nnominal: IDR 250,000",
            "preview_filename": "slip-1.png",
        });
        let output = extract_record(record, &extractor());
        assert_eq!(output.status, WorkStatus::Ok);
        assert!(output.errors.is_empty());
        assert_eq!(output.data.total_pages, 1);
        let page = &output.data.pages[0];
        assert_eq!(page.page, 1);
        assert_eq!(page.kode_setor.as_deref(), Some("100"));
        assert_eq!(page.jumlah, Amount::from_rupiah(250_000));
        assert_eq!(page.tanggal, NaiveDate::from_ymd_opt(2023, 1, 5));
        assert_eq!(page.preview_filename.as_deref(), Some("slip-1.png"));
        assert_eq!(page.warning, None);
    }

    #[test]
    fn blank_pages_make_slips_incomplete() {
        let record = json!({
            "id": 3,
            "pages": ["Tanggal: 01-02-2024\nKode Setor: 411121\nJumlah: Rp 75.000", ""],
        });
        let output = extract_record(record, &extractor());
        assert_eq!(output.status, WorkStatus::Incomplete);
        assert_eq!(output.data.total_pages, 2);
        assert!(output.data.pages[0].has_fields());
        assert_eq!(output.data.pages[1].warning.as_deref(), Some(NO_TEXT_WARNING));
    }

    #[test]
    fn form_feeds_split_pages() {
        let record = json!({
            "id": 4,
            "text": "kode setor 411211\x0Cbukti setor tanpa isi\x0C",
        });
        let output = extract_record(record, &extractor());
        assert_eq!(output.data.total_pages, 2);
        assert_eq!(output.status, WorkStatus::Incomplete);
        assert_eq!(output.data.pages[1].warning.as_deref(), Some(NO_FIELDS_WARNING));
    }

    #[test]
    fn invalid_records_fail_with_errors() {
        let ex = extractor();

        let missing = extract_record(json!({"id": 5, "preview_filename": "x.png"}), &ex);
        assert_eq!(missing.status, WorkStatus::Failed);
        assert_eq!(missing.id, json!(5));
        assert!(missing.errors[0].contains("expected either"));

        let both = extract_record(json!({"id": 6, "text": "a", "pages": ["b"]}), &ex);
        assert_eq!(both.status, WorkStatus::Failed);

        let no_id = extract_record(json!({"text": "kjs 100"}), &ex);
        assert_eq!(no_id.status, WorkStatus::Failed);
        assert_eq!(no_id.id, Value::Null);
    }

    #[test]
    fn slips_without_fields_fail() {
        let output = extract_record(json!({"id": 7, "text": "terima kasih"}), &extractor());
        assert_eq!(output.status, WorkStatus::Failed);
        assert_eq!(output.data.total_pages, 1);
        assert!(!output.errors.is_empty());
    }

    #[test]
    fn serializes_missing_fields_as_null() {
        let output = extract_record(json!({"id": 8, "text": "kjs 100"}), &extractor());
        let json = serde_json::to_value(&output).unwrap();
        assert_eq!(json["status"], json!("ok"));
        assert_eq!(json["pages"][0]["kode_setor"], json!("100"));
        assert_eq!(json["pages"][0]["jumlah"], Value::Null);
        assert_eq!(json["pages"][0]["tanggal"], Value::Null);
    }

    #[test]
    fn flattens_pages_into_rows() {
        let ex = extractor();
        let output = extract_record(
            json!({"id": 9, "pages": ["kjs 100\nnominal rp 5.000", "tgl 17/08/2024"]}),
            &ex,
        );
        let rows = output.to_flat_rows();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].id, "9");
        assert_eq!(rows[0].page, Some(1));
        assert_eq!(rows[0].jumlah, Amount::from_rupiah(5_000));
        assert_eq!(rows[1].tanggal, NaiveDate::from_ymd_opt(2024, 8, 17));
        assert_eq!(rows[1].total_pages, 2);

        let failed = extract_record(json!({"id": "bad"}), &ex);
        let rows = failed.to_flat_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].page, None);
        assert!(rows[0].errors.is_some());
    }
}
