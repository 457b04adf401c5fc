//! User interruption (Ctrl-C) flag shared with the pipelines

use anyhow::{Context, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Set once the user asks the run to stop. Pipelines check it between items.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    requested: Arc<AtomicBool>,
}

impl Interrupt {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a flag wired to the process Ctrl-C handler
    ///
    /// Can be called once per process.
    pub fn install() -> Result<Self> {
        let interrupt = Self::new();
        let flag = interrupt.clone();

        ctrlc::set_handler(move || {
            eprintln!("\nInterrupt requested. Finishing current item...");
            flag.request();
        })
        .context("Error setting Ctrl-C handler")?;

        Ok(interrupt)
    }

    pub fn request(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    pub fn is_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }
}
