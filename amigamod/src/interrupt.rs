//! Ctrl-C handling shared between worker threads

use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// A flag that flips once the user presses Ctrl-C
///
/// Clones share the same flag, so a single [`Interrupt`] can be handed to every worker in a
/// pool. Long-running loops are expected to poll [`Interrupt::is_triggered()`] and wind down
/// on their own, so temporary directories still get cleaned up.
#[derive(Debug, Clone, Default)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    /// A flag that is only ever triggered manually
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a process-wide Ctrl-C handler that triggers the returned flag
    pub fn install() -> Result<Self, ctrlc::Error> {
        let interrupt = Self::new();
        interrupt.watch()?;

        Ok(interrupt)
    }

    /// Trigger this flag on Ctrl-C
    ///
    /// Pressing Ctrl-C a second time exits the process immediately, for when a worker does not
    /// wind down. Only one handler can be installed per process.
    pub fn watch(&self) -> Result<(), ctrlc::Error> {
        let handle = self.clone();
        ctrlc::set_handler(move || {
            if handle.is_triggered() {
                std::process::exit(130);
            }
            handle.trigger();
        })
    }

    /// Raise the flag
    pub fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    /// Has the flag been raised?
    pub fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}
