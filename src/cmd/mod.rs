//! Command-line entry points.

use clap::Args;
use futures::StreamExt as _;

use crate::async_utils::BoxedStream;

pub mod extract;
pub mod schema;

/// Common options for subcommands that process data streams.
#[derive(Debug, Clone, Args)]
pub struct StreamOpts {
    /// Limit processing to the first N records.
    #[clap(long)]
    pub take_first: Option<usize>,

    /// Max number of records to process at a time.
    #[clap(short = 'j', long = "jobs", default_value = "8")]
    pub job_count: usize,

    /// What portion of inputs should we allow to fail? Specified as a
    /// number between 0.0 and 1.0.
    #[clap(long, default_value = "0.01")]
    pub allowed_failure_rate: f32,
}

impl StreamOpts {
    /// Apply any necessary stream opts to our input stream.
    pub fn apply_stream_input_opts<T>(&self, input: BoxedStream<T>) -> BoxedStream<T>
    where
        T: 'static,
    {
        if let Some(take_first) = self.take_first {
            input.take(take_first).boxed()
        } else {
            input
        }
    }

    /// How many records may be in flight at once. Always at least one.
    pub fn job_count(&self) -> usize {
        self.job_count.max(1)
    }

    /// Options for unit tests, with everything but the failure rate left at
    /// its default.
    #[cfg(test)]
    pub fn for_tests(allowed_failure_rate: f32) -> Self {
        Self {
            take_first: None,
            job_count: 1,
            allowed_failure_rate,
        }
    }
}

#[cfg(test)]
mod tests {
    use futures::stream;

    use super::*;
    use crate::prelude::*;

    #[tokio::test]
    async fn take_first_limits_input() {
        let opts = StreamOpts {
            take_first: Some(2),
            ..StreamOpts::for_tests(0.0)
        };
        let input: BoxedStream<Result<i32>> = Box::pin(stream::iter(vec![Ok(1), Ok(2), Ok(3)]));
        let taken = opts
            .apply_stream_input_opts(input)
            .collect::<Vec<_>>()
            .await;
        assert_eq!(taken.len(), 2);
    }
}
