//! Progress bars and run summaries on stderr.
//!
//! Log lines, summaries and progress bars all share stderr, so everything
//! printed there goes through [`Ui`], which clears the bars while writing.

use std::{
    borrow::Cow,
    io::{self, Write as _},
    sync::Arc,
    time::Duration,
};

use indicatif::{
    MultiProgress, ProgressBar, ProgressDrawTarget, ProgressFinish, ProgressStyle,
};

/// How often running bars and spinners are redrawn.
const TICK_INTERVAL: Duration = Duration::from_millis(250);

/// Application UI state. Cheap to clone.
#[derive(Clone)]
pub struct Ui {
    bars: Arc<MultiProgress>,
}

impl Ui {
    /// Create a new UI drawing to stderr.
    pub fn init() -> Ui {
        Ui {
            bars: Arc::new(MultiProgress::new()),
        }
    }

    /// Create a new UI for unit tests, which never draws anything.
    #[cfg(test)]
    pub fn init_for_tests() -> Ui {
        Ui {
            bars: Arc::new(MultiProgress::with_draw_target(ProgressDrawTarget::hidden())),
        }
    }

    /// Stop drawing progress bars, because extracted slips are going to
    /// stdout and may share a terminal with us.
    pub fn hide_progress_bars(&self) {
        self.bars.set_draw_target(ProgressDrawTarget::hidden());
    }

    /// A writer for `tracing` which keeps log lines from tearing progress bars.
    pub fn get_stderr_writer(&self) -> StderrWriter {
        StderrWriter { ui: self.clone() }
    }

    /// Run `f` with every progress bar cleared from the screen.
    fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.bars.suspend(f)
    }

    /// Print a one-line summary, such as the number of slips processed.
    pub fn display_message(&self, emoji: &str, msg: &str) {
        self.suspend(|| eprintln!("{emoji:3}{msg}"));
    }

    /// Register a new bar or spinner, labelled according to `config`.
    fn add(&self, pb: ProgressBar, config: &ProgressConfig<'_>) -> ProgressBar {
        let pb = self.bars.add(pb);
        #[cfg(test)]
        pb.set_draw_target(ProgressDrawTarget::hidden());
        pb.set_prefix(config.emoji.to_owned());
        pb.set_message(config.msg.to_owned());
        pb.enable_steady_tick(TICK_INTERVAL);
        pb.with_finish(ProgressFinish::WithMessage(Cow::Owned(
            config.done_msg.to_owned(),
        )))
    }

    /// Create a spinner, for work of unknown length.
    pub fn new_spinner(&self, config: &ProgressConfig<'_>) -> ProgressBar {
        self.add(ProgressBar::new_spinner().with_style(spinner_style()), config)
    }

    /// Create a progress bar if `size_hint` has a known, non-zero upper bound,
    /// and a spinner otherwise.
    pub fn new_from_size_hint(
        &self,
        config: &ProgressConfig<'_>,
        size_hint: (usize, Option<usize>),
    ) -> ProgressBar {
        match size_hint {
            (_, Some(len)) if len > 0 => {
                let len = u64::try_from(len).unwrap_or(u64::MAX);
                self.add(ProgressBar::new(len).with_style(bar_style()), config)
            }
            _ => self.new_spinner(config),
        }
    }
}

/// Labels for a progress bar.
pub struct ProgressConfig<'a> {
    pub emoji: &'a str,
    /// Shown while running.
    pub msg: &'a str,
    /// Shown once finished.
    pub done_msg: &'a str,
}

fn bar_style() -> ProgressStyle {
    ProgressStyle::default_bar()
        .template("  {prefix:3}{msg:20} {pos:>5}/{len:5} slips {elapsed_precise} {wide_bar:.green/white} {eta}")
        .expect("bad progress bar template")
}

fn spinner_style() -> ProgressStyle {
    ProgressStyle::default_spinner()
        .template("{spinner} {prefix:3}{msg} {pos}")
        .expect("bad progress bar template")
}

/// Writes to stderr with progress bars suspended. Used by `tracing`.
#[derive(Clone)]
pub struct StderrWriter {
    ui: Ui,
}

impl io::Write for StderrWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.ui.suspend(|| io::stderr().write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        self.ui.suspend(|| io::stderr().write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ui.suspend(|| io::stderr().flush())
    }
}

impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for StderrWriter {
    type Writer = StderrWriter;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write as _;

    use super::*;

    #[test]
    fn size_hints_pick_bar_or_spinner() {
        let ui = Ui::init_for_tests();
        let config = ProgressConfig {
            emoji: "🧾",
            msg: "Extracting slips",
            done_msg: "Extracted slips",
        };
        assert_eq!(ui.new_from_size_hint(&config, (0, Some(4))).length(), Some(4));
        assert_eq!(ui.new_from_size_hint(&config, (0, None)).length(), None);
        assert_eq!(ui.new_from_size_hint(&config, (0, Some(0))).length(), None);
    }

    #[test]
    fn stderr_writer_accepts_log_lines() {
        let mut wtr = Ui::init_for_tests().get_stderr_writer();
        wtr.write_all(b"").unwrap();
        wtr.flush().unwrap();
    }
}
