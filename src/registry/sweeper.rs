//! Background idle sweep.
//!
//! ```text
//! ┌──────────┐   tick(interval)   ┌──────────────────┐
//! │  ticker  │ ─────────────────▶ │ sweeper thread   │ ──▶ Registry::sweep()
//! └──────────┘                    │                  │
//! ┌──────────┐   drop(sender)     │                  │
//! │  owner   │ ─────────────────▶ │ (exits, joined)  │
//! └──────────┘                    └──────────────────┘
//! ```

use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{bounded, select, tick, Sender};
use log::{debug, warn};

use super::Registry;

/// Periodically sweeps idle handles until dropped
pub struct Sweeper {
    /// Dropping the sender stops the thread
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Sweeper {
    /// Spawn the sweeper thread, named `"mzrange-sweeper"`
    pub fn spawn(registry: Arc<Registry>, interval: Duration) -> io::Result<Self> {
        let (stop, stopped) = bounded::<()>(1);
        let ticker = tick(interval);
        let handle = thread::Builder::new()
            .name("mzrange-sweeper".to_string())
            .spawn(move || loop {
                select! {
                    recv(ticker) -> _ => {
                        let report = registry.sweep();
                        debug!("Sweep: {report:?}");
                    }
                    recv(stopped) -> _ => break,
                }
            })?;
        Ok(Self {
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    /// Stop the thread and wait for it to exit
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        drop(self.stop.take());
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Sweeper thread panicked");
            }
        }
    }
}

impl Drop for Sweeper {
    fn drop(&mut self) {
        self.shutdown();
    }
}
