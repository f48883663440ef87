//! Reading slip records and settings files, and writing results.
//!
//! Slip records arrive as JSONL or CSV, and settings as JSON or TOML. The
//! format comes from the file extension, or from the first byte of standard
//! input, where a `{` means JSONL.

use std::sync::Arc;

use futures::{StreamExt as _, TryStreamExt as _, pin_mut};
use peekable::tokio::AsyncPeekable;
use serde::de::DeserializeOwned;
use serde_json::Map;
use tokio::{
    fs::File,
    io::{AsyncBufRead, AsyncBufReadExt as _, AsyncWrite, AsyncWriteExt as _, BufReader, BufWriter},
};
use tokio_stream::wrappers::LinesStream;

use super::{BoxedStream, size_hint::WithSizeHintExt};
use crate::{
    prelude::*,
    ui::{ProgressConfig, Ui},
};

/// A buffered reader over a file or standard input.
type BoxedReader = Box<dyn AsyncBufRead + Unpin + Send + Sync + 'static>;

/// A buffered writer over a file or standard output.
pub type BoxedWriter = Box<dyn AsyncWrite + Unpin + Send + Sync + 'static>;

/// A stream of raw slip records, one JSON object per record.
pub type RecordStream = BoxedStream<Result<Value>>;

/// How a file of slip records is encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RecordFormat {
    /// One JSON object per line.
    Jsonl,
    /// A header row, then one slip per row.
    Csv,
}

impl RecordFormat {
    /// Guess the format from a file extension. Anything that isn't JSON is
    /// read as CSV.
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json" | "jsonl") => Self::Jsonl,
            _ => Self::Csv,
        }
    }
}

/// An open source of slip records, with its detected format.
struct RecordSource {
    format: RecordFormat,
    /// `stdin` or the path, for error messages.
    name: String,
    reader: BoxedReader,
}

impl RecordSource {
    /// Open standard input, sniffing the first byte to pick the format.
    async fn stdin() -> Result<Self> {
        let mut peekable = AsyncPeekable::new(Box::new(BufReader::new(tokio::io::stdin())));
        let mut first = [0u8; 1];
        peekable
            .peek_exact(&mut first)
            .await
            .context("no slip records on stdin")?;
        let format = if first[0] == b'{' {
            RecordFormat::Jsonl
        } else {
            RecordFormat::Csv
        };
        Ok(Self {
            format,
            name: "stdin".to_owned(),
            reader: Box::new(BufReader::new(peekable)),
        })
    }

    /// Open a record file.
    async fn file(path: &Path) -> Result<Self> {
        let file = File::open(path)
            .await
            .with_context(|| format!("failed to open slip records {}", path.display()))?;
        Ok(Self {
            format: RecordFormat::from_path(path),
            name: path.display().to_string(),
            reader: Box::new(BufReader::new(file)),
        })
    }

    async fn open(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::file(path).await,
            None => Self::stdin().await,
        }
    }
}

/// Read a settings file, as JSON if it ends in `.json`, or as TOML otherwise.
pub async fn read_settings<T>(path: &Path) -> Result<T>
where
    T: DeserializeOwned,
{
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read settings {}", path.display()))?;
    // Both parsers are sync, so we read the whole file first.
    match RecordFormat::from_path(path) {
        RecordFormat::Jsonl => serde_json::from_str(&data)
            .with_context(|| format!("invalid JSON settings in {}", path.display())),
        RecordFormat::Csv => toml::from_str(&data)
            .with_context(|| format!("invalid TOML settings in {}", path.display())),
    }
}

/// Count the slips in a record file, so the progress bar can show a length.
///
/// Returns `None` for pipes and other special files, which can only be read
/// once.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
async fn count_slips(ui: &Ui, path: &Path) -> Result<Option<usize>> {
    if !path.is_file() {
        return Ok(None);
    }

    let spinner = ui.new_spinner(&ProgressConfig {
        emoji: "🧮",
        msg: "Counting slips",
        done_msg: "Counted slips",
    });
    let source = RecordSource::file(path).await?;
    let count = match source.format {
        RecordFormat::Jsonl => {
            LinesStream::new(source.reader.lines())
                .try_fold(0, |count, _| async move { Ok(count + 1) })
                .await
        }
        RecordFormat::Csv => csv_async::AsyncReaderBuilder::new()
            .create_reader(source.reader)
            .into_byte_records()
            .try_fold(0, |count, _| async move { Ok(count + 1) })
            .await
            .map_err(std::io::Error::other),
    }
    .with_context(|| format!("failed to count slips in {}", source.name))?;
    spinner.finish_with_message(format!("Found {count} slips"));
    Ok(Some(count))
}

/// Read slip records from a JSONL or CSV file, or from standard input.
///
/// CSV columns become string-valued keys, so `id` is always a string there.
pub async fn read_records(ui: Ui, path: Option<&Path>) -> Result<RecordStream> {
    let count = match path {
        Some(path) => count_slips(&ui, path).await?,
        None => None,
    };
    let size_hint = (count.unwrap_or(0), count);

    let source = RecordSource::open(path).await?;
    let name = Arc::new(source.name);
    match source.format {
        RecordFormat::Jsonl => {
            let lines = LinesStream::new(source.reader.lines())
                .enumerate()
                .with_size_hint(size_hint);
            Ok(lines
                .map(move |(idx, line)| {
                    let line =
                        line.with_context(|| format!("failed to read line {} of {name}", idx + 1))?;
                    serde_json::from_str::<Value>(&line)
                        .with_context(|| format!("line {} of {name} is not valid JSON", idx + 1))
                })
                .boxed())
        }
        RecordFormat::Csv => {
            let mut rdr = csv_async::AsyncReaderBuilder::new().create_reader(source.reader);
            let headers = rdr
                .headers()
                .await
                .with_context(|| format!("failed to read CSV headers from {name}"))?
                .to_owned();
            let rows = rdr.into_records().enumerate().with_size_hint(size_hint);
            Ok(rows
                .map(move |(idx, row)| {
                    let row = row
                        .with_context(|| format!("failed to read CSV row {} of {name}", idx + 1))?;
                    let record = headers
                        .iter()
                        .zip(row.iter())
                        .map(|(header, value)| (header.to_owned(), Value::String(value.to_owned())))
                        .collect::<Map<String, Value>>();
                    Ok(Value::Object(record))
                })
                .boxed())
        }
    }
}

/// Open a file for writing, or standard output when `path` is `None`.
pub async fn open_output(path: Option<&Path>) -> Result<BoxedWriter> {
    match path {
        Some(path) => {
            let file = File::create(path)
                .await
                .with_context(|| format!("failed to create {}", path.display()))?;
            Ok(Box::new(file))
        }
        None => Ok(Box::new(tokio::io::stdout())),
    }
}

/// Write a stream of records as JSONL.
pub async fn write_jsonl<T>(path: Option<&Path>, stream: BoxedStream<Result<T>>) -> Result<()>
where
    T: Serialize + Send + 'static,
{
    let mut wtr = BufWriter::new(open_output(path).await?);
    pin_mut!(stream);
    while let Some(record) = stream.next().await {
        let mut line = serde_json::to_vec(&record?).context("failed to serialize output record")?;
        line.push(b'\n');
        wtr.write_all(&line).await.context("failed to write output")?;
    }
    wtr.flush().await.context("failed to flush output")?;
    Ok(())
}

/// Write a stream of flat records as CSV.
///
/// The header row is taken from the field names of the first record.
pub async fn write_csv<T>(path: Option<&Path>, stream: BoxedStream<Result<T>>) -> Result<()>
where
    T: Serialize + Send + 'static,
{
    let mut wtr = csv_async::AsyncSerializer::from_writer(open_output(path).await?);
    pin_mut!(stream);
    while let Some(record) = stream.next().await {
        wtr.serialize(&record?)
            .await
            .context("failed to write CSV output")?;
    }
    wtr.flush().await.context("failed to flush output")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use futures::{TryStreamExt as _, stream};
    use serde_json::json;

    use super::*;

    async fn read_all(path: &Path) -> Result<Vec<Value>> {
        read_records(Ui::init_for_tests(), Some(path))
            .await?
            .try_collect()
            .await
    }

    #[tokio::test]
    async fn reads_jsonl_records() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(file, r#"{{"id": 1, "text": "kjs 100"}}"#).unwrap();
        writeln!(file, r#"{{"id": 2, "pages": ["a", "b"]}}"#).unwrap();
        let records = read_all(file.path()).await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["pages"], json!(["a", "b"]));
    }

    #[tokio::test]
    async fn reports_the_line_of_bad_json() {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        writeln!(file, r#"{{"id": 1, "text": "kjs 100"}}"#).unwrap();
        writeln!(file, "{{not json").unwrap();
        let err = read_all(file.path()).await.unwrap_err();
        assert!(format!("{err}").starts_with("line 2 of "), "{err}");
    }

    #[tokio::test]
    async fn reads_csv_records_as_strings() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,text\n7,\"kjs 100\nnominal rp 5.000\"").unwrap();
        let records = read_all(file.path()).await.unwrap();
        assert_eq!(
            records,
            vec![json!({"id": "7", "text": "kjs 100\nnominal rp 5.000"})]
        );
    }

    #[tokio::test]
    async fn reads_toml_and_json_settings() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Settings {
            min_year: i32,
        }

        let mut toml_file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(toml_file, "min_year = 2022").unwrap();
        let settings: Settings = read_settings(toml_file.path()).await.unwrap();
        assert_eq!(settings, Settings { min_year: 2022 });

        let mut json_file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        writeln!(json_file, "min_year = 2022").unwrap();
        let err = read_settings::<Settings>(json_file.path()).await.unwrap_err();
        assert!(format!("{err}").starts_with("invalid JSON settings in "), "{err}");
    }

    #[tokio::test]
    async fn writes_csv_with_headers() {
        #[derive(Serialize)]
        struct Row {
            id: String,
            jumlah: Option<i64>,
        }

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let rows: BoxedStream<Result<Row>> = Box::pin(stream::iter(vec![
            Ok(Row { id: "a".to_owned(), jumlah: Some(5) }),
            Ok(Row { id: "b".to_owned(), jumlah: None }),
        ]));
        write_csv(Some(&path), rows).await.unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, "id,jumlah\na,5\nb,\n");
    }
}
