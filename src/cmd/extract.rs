//! The `extract` subcommand.

use std::sync::Arc;

use clap::{Args, ValueEnum};
use futures::StreamExt as _;

use super::StreamOpts;
use crate::{
    async_utils::{io::read_records, spawn_blocking_propagating_panics},
    config::ExtractConfig,
    fields::FieldExtractor,
    prelude::*,
    slips::extract_record,
    ui::{ProgressConfig, Ui},
    work::WorkOutput,
};

/// Output formats for extracted slips.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per slip, holding every page.
    #[default]
    Jsonl,
    /// One CSV row per page.
    Csv,
}

/// Options for the `extract` subcommand.
#[derive(Debug, Args)]
pub struct ExtractOpts {
    /// Input file (JSONL or CSV) with `id` and either `text` or `pages`
    /// fields, plus an optional `preview_filename`. Defaults to standard
    /// input.
    pub input_path: Option<PathBuf>,

    /// Output file. Defaults to standard output.
    #[clap(short = 'o', long = "out")]
    pub output_path: Option<PathBuf>,

    /// Output format.
    #[clap(long, value_enum, default_value_t = OutputFormat::Jsonl)]
    pub format: OutputFormat,

    /// TOML or JSON file overriding the default keywords and limits.
    #[clap(long = "config", value_name = "PATH")]
    pub config_path: Option<PathBuf>,

    #[clap(flatten)]
    pub stream_opts: StreamOpts,
}

/// Run the `extract` subcommand.
#[instrument(level = "debug", skip_all)]
pub async fn cmd_extract(ui: Ui, opts: &ExtractOpts) -> Result<()> {
    let config = ExtractConfig::load(opts.config_path.as_deref()).await?;
    let extractor = Arc::new(FieldExtractor::new(config)?);

    // Open up our input stream.
    let input = read_records(ui.clone(), opts.input_path.as_deref()).await?;
    let input = opts.stream_opts.apply_stream_input_opts(input);

    // Configure our progress bar.
    let pb = ui.new_from_size_hint(
        &ProgressConfig {
            emoji: "🧾",
            msg: "Extracting slips",
            done_msg: "Extracted slips",
        },
        input.size_hint(),
    );

    // Parsing is CPU-bound, so run each record on the blocking pool, keeping
    // output in input order.
    let job_count = opts.stream_opts.job_count();
    let output = input
        .map(move |value| {
            let extractor = extractor.clone();
            async move {
                let value = value?;
                let output =
                    spawn_blocking_propagating_panics(move || extract_record(value, &extractor))
                        .await;
                Ok::<_, anyhow::Error>(output)
            }
        })
        .buffered(job_count);
    let output = pb.wrap_stream(output).boxed();

    let output_path = opts.output_path.as_deref();
    match opts.format {
        OutputFormat::Jsonl => {
            WorkOutput::write_stream(&ui, output_path, output, &opts.stream_opts).await
        }
        OutputFormat::Csv => {
            WorkOutput::write_stream_to_csv(&ui, output_path, output, &opts.stream_opts).await
        }
    }
}
