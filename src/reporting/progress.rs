//! Progress reporting for the pipelines
//!
//! Pipelines talk to a [`ProgressObserver`] instead of a console, so they
//! can run under a progress bar, silently, or under a recording test double.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::io;
use tracing::Level;
use tracing_subscriber::fmt::MakeWriter;

/// Receives per-item progress and log events from a pipeline
pub trait ProgressObserver {
    /// A batch of `total` items is about to be processed
    fn start(&mut self, label: &str, total: usize);

    /// Processing of the named item has begun
    fn item_started(&mut self, name: &str);

    /// `completed` of `total` items are done
    fn item_finished(&mut self, completed: usize, total: usize);

    /// A message at the given severity
    fn log(&mut self, level: Level, message: &str);

    /// The batch is over, whether complete or interrupted
    fn finish(&mut self, message: &str);
}

/// Forward a message to `tracing` at a runtime-chosen level
pub fn emit(level: Level, message: &str) {
    match level {
        Level::ERROR => tracing::error!("{}", message),
        Level::WARN => tracing::warn!("{}", message),
        Level::INFO => tracing::info!("{}", message),
        Level::DEBUG => tracing::debug!("{}", message),
        _ => tracing::trace!("{}", message),
    }
}

/// Progress bar on the terminal, log events through `tracing`
///
/// The same bar is reused for every batch so that a [`SuspendingWriter`]
/// handed to the logger keeps pointing at it.
pub struct ConsoleObserver {
    bar: ProgressBar,
    batch: bool,
}

impl ConsoleObserver {
    /// `batch` hides the progress bar (no interactive output)
    pub fn new(batch: bool) -> Self {
        Self {
            bar: ProgressBar::with_draw_target(Some(0), ProgressDrawTarget::hidden()),
            batch,
        }
    }

    /// Wrap a console writer so log lines clear the bar before printing
    pub fn log_writer<M>(&self, inner: M) -> SuspendingWriter<M> {
        SuspendingWriter {
            bar: self.bar.clone(),
            inner,
        }
    }

    fn style() -> ProgressStyle {
        ProgressStyle::default_bar()
            .template("{spinner:.green} {prefix} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-")
    }
}

impl ProgressObserver for ConsoleObserver {
    fn start(&mut self, label: &str, total: usize) {
        if !self.batch {
            self.bar.set_draw_target(ProgressDrawTarget::stderr());
            self.bar.set_style(Self::style());
        }
        self.bar.reset();
        self.bar.set_length(total as u64);
        self.bar.set_message("");
        self.bar.set_prefix(label.to_string());
    }

    fn item_started(&mut self, name: &str) {
        self.bar.set_message(name.to_string());
    }

    fn item_finished(&mut self, completed: usize, _total: usize) {
        self.bar.set_position(completed as u64);
    }

    fn log(&mut self, level: Level, message: &str) {
        // The console writer already suspends the bar; nesting would deadlock
        emit(level, message);
    }

    fn finish(&mut self, message: &str) {
        self.bar.finish_with_message(message.to_string());
    }
}

/// [`MakeWriter`] that hides a progress bar while each log line is written
///
/// Covers every `tracing` event, including those that never pass through
/// a [`ProgressObserver`].
#[derive(Clone)]
pub struct SuspendingWriter<M> {
    bar: ProgressBar,
    inner: M,
}

impl<'a, M: MakeWriter<'a>> MakeWriter<'a> for SuspendingWriter<M> {
    type Writer = SuspendedWrite<'a, M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SuspendedWrite {
            bar: &self.bar,
            inner: self.inner.make_writer(),
        }
    }
}

pub struct SuspendedWrite<'a, W> {
    bar: &'a ProgressBar,
    inner: W,
}

impl<W: io::Write> io::Write for SuspendedWrite<'_, W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let inner = &mut self.inner;
        self.bar.suspend(|| inner.write(buf))
    }

    fn write_all(&mut self, buf: &[u8]) -> io::Result<()> {
        let inner = &mut self.inner;
        self.bar.suspend(|| inner.write_all(buf))
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Draws nothing; log events still go to `tracing`
#[derive(Debug, Default)]
pub struct SilentObserver;

impl ProgressObserver for SilentObserver {
    fn start(&mut self, _label: &str, _total: usize) {}

    fn item_started(&mut self, _name: &str) {}

    fn item_finished(&mut self, _completed: usize, _total: usize) {}

    fn log(&mut self, level: Level, message: &str) {
        emit(level, message);
    }

    fn finish(&mut self, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use tracing_subscriber::layer::SubscriberExt;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    impl Captured {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[test]
    fn test_console_observer_in_batch_mode_stays_hidden() {
        let mut observer = ConsoleObserver::new(true);
        observer.start("Scanning", 3);
        observer.item_started("a.pdf");
        observer.item_finished(1, 3);
        observer.log(Level::INFO, "hello");
        observer.finish("done");

        assert!(observer.bar.is_hidden());
        assert_eq!(observer.bar.position(), 1);
    }

    #[test]
    fn test_console_observer_tracks_position() {
        let mut observer = ConsoleObserver::new(false);
        observer.start("Merging", 2);
        observer.item_finished(1, 2);
        observer.item_finished(2, 2);

        assert_eq!(observer.bar.length(), Some(2));
        assert_eq!(observer.bar.position(), 2);
        observer.finish("done");
    }

    #[test]
    fn test_console_observer_restarts_for_next_batch() {
        let mut observer = ConsoleObserver::new(true);
        observer.start("Scanning", 3);
        observer.item_finished(3, 3);
        observer.finish("done");

        observer.start("Merging", 5);
        assert_eq!(observer.bar.length(), Some(5));
        assert_eq!(observer.bar.position(), 0);
        assert!(!observer.bar.is_finished());
    }

    /// Direct `tracing` calls and observer logs both reach the console
    /// writer while a batch is running
    #[test]
    fn test_log_writer_passes_every_event_through() {
        let captured = Captured::default();
        let mut observer = ConsoleObserver::new(false);
        let subscriber = tracing_subscriber::registry().with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(observer.log_writer(captured.clone())),
        );

        tracing::subscriber::with_default(subscriber, || {
            observer.start("Scanning", 2);
            tracing::debug!("Skipping non-PDF file: notes.txt");
            observer.item_finished(1, 2);
            observer.log(Level::WARN, "Failed to merge PDFs: A");
            observer.finish("done");
        });

        let output = captured.text();
        assert!(output.contains("Skipping non-PDF file: notes.txt"), "{}", output);
        assert!(output.contains("Failed to merge PDFs: A"), "{}", output);
    }
}
