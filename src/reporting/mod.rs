//! Output: export files, progress and logging

pub mod export_writer;
pub mod logging;
pub mod progress;

pub use export_writer::write_export;
pub use logging::init_logging;
pub use progress::{ConsoleObserver, ProgressObserver, SilentObserver};
