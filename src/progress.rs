use std::fmt::Write;
use std::io::{self, Write as _};
use std::sync::{Arc, Mutex};

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressState, ProgressStyle};

#[derive(Debug, Default)]
struct Counts {
    completed: u64,
    total: u64,
}

/// Completed/total image counter shared by every worker of a batch.
///
/// Increment and render happen under one lock, so the bar never shows a
/// lower value than one already drawn. `completed` never exceeds `total`:
/// if a chapter turns out larger than announced, the total grows with it.
pub struct ProgressCounter {
    counts: Mutex<Counts>,
    bar: Option<ProgressBar>,
}

impl ProgressCounter {
    pub fn new(total: u64) -> Self {
        Self {
            counts: Mutex::new(Counts { completed: 0, total }),
            bar: None,
        }
    }

    /// Counter rendered as the "Total Progress" bar.
    pub fn with_bar(total: u64) -> Self {
        Self::with_draw_target(total, ProgressDrawTarget::stderr())
    }

    fn with_draw_target(total: u64, target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(Some(total), target);
        bar.set_style(bar_style("{msg} [{elapsed_precise}] [{wide_bar:.cyan/blue}] {pos}/{len} images ({eta})"));
        bar.set_message("Total Progress");
        Self {
            counts: Mutex::new(Counts { completed: 0, total }),
            bar: Some(bar),
        }
    }

    /// Records one finished image and returns the new completed count.
    pub fn inc(&self) -> u64 {
        let mut counts = match self.counts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        counts.completed += 1;
        if counts.completed > counts.total {
            counts.total = counts.completed;
            if let Some(bar) = &self.bar {
                bar.set_length(counts.total);
            }
        }
        if let Some(bar) = &self.bar {
            bar.set_position(counts.completed);
        }
        counts.completed
    }

    pub fn completed(&self) -> u64 {
        self.snapshot().0
    }

    pub fn total(&self) -> u64 {
        self.snapshot().1
    }

    fn snapshot(&self) -> (u64, u64) {
        let counts = match self.counts.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        (counts.completed, counts.total)
    }

    /// Prints a line to stderr above the bar instead of tearing through it.
    /// The line is written even when the bar is hidden (stderr not a tty).
    pub fn println(&self, line: impl AsRef<str>) {
        self.write_line(&mut io::stderr(), line.as_ref());
    }

    fn write_line(&self, out: &mut impl io::Write, line: &str) {
        match &self.bar {
            Some(bar) => bar.suspend(|| {
                let _ = writeln!(out, "{}", line);
            }),
            None => {
                let _ = writeln!(out, "{}", line);
            }
        }
    }

    pub fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish();
        }
    }
}

/// How a chapter download reports what it is doing.
#[derive(Clone, Default)]
pub enum ProgressMode {
    /// Sequential runs: status lines and one bar per chapter.
    PerChapter,
    /// Concurrent runs: only the shared counter moves.
    Shared(Arc<ProgressCounter>),
    /// No output at all.
    #[default]
    Silent,
}

impl ProgressMode {
    pub fn is_verbose(&self) -> bool {
        matches!(self, ProgressMode::PerChapter)
    }

    /// Bar for a single chapter, only drawn in [`ProgressMode::PerChapter`].
    pub fn chapter_bar(&self, title: &str, len: usize) -> ProgressBar {
        if !self.is_verbose() {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        bar.set_style(bar_style("{prefix:.bold.dim} [{wide_bar:.cyan/blue}] {pos}/{len} ({eta})"));
        bar.set_prefix(title.chars().take(20).collect::<String>());
        bar
    }

    pub fn image_done(&self) {
        if let ProgressMode::Shared(counter) = self {
            counter.inc();
        }
    }

    /// Error lines always reach stderr, routed around the shared bar if any.
    pub fn report_error(&self, line: impl AsRef<str>) {
        match self {
            ProgressMode::Shared(counter) => counter.println(line),
            _ => eprintln!("{}", line.as_ref()),
        }
    }
}

fn bar_style(template: &str) -> ProgressStyle {
    ProgressStyle::with_template(template)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .with_key("eta", |state: &ProgressState, w: &mut dyn Write| {
            let _ = write!(w, "{:.1}s", state.eta().as_secs_f64());
        })
        .progress_chars("#>-")
}
