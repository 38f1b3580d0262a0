use console::Term;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

use super::TransferRegistry;

/// How long a previous render stays eligible for in-place overwriting.
const REDRAW_WINDOW: Duration = Duration::from_secs(1);

/// Renders the state of every registered transfer to the terminal, one line
/// per transfer, overwriting the previous block in place when re-rendered
/// quickly enough. Reads are advisory: transfer counters may advance while a
/// render is in flight and that is fine.
pub struct ProgressReporter {
    registry: Arc<TransferRegistry>,
    term: Term,
    last_render: Mutex<Option<LastRender>>,
}

struct LastRender {
    at: Instant,
    lines: usize,
}

impl ProgressReporter {
    pub fn new(registry: Arc<TransferRegistry>) -> Self {
        Self {
            registry,
            term: Term::stdout(),
            last_render: Mutex::new(None),
        }
    }

    /// Prints one line per transfer: the destination base name plus either a
    /// percentage (known total) or a raw byte counter (unknown total).
    pub fn render(&self) -> std::io::Result<()> {
        let transfers = self.registry.snapshot();
        let mut last_render = self.last_render.lock().unwrap();

        if let Some(previous) = last_render.as_ref() {
            if previous.at.elapsed() <= REDRAW_WINDOW && previous.lines > 0 {
                self.term.move_cursor_up(previous.lines)?;
            }
        }

        for transfer in &transfers {
            self.term.clear_line()?;
            let line = match transfer.progress() {
                Some(percent) => format!("{}: {:.2}%", transfer.file_name(), percent),
                None => format!(
                    "{}: {}",
                    transfer.file_name(),
                    format_bytes(transfer.written_bytes())
                ),
            };
            self.term.write_line(&line)?;
        }

        *last_render = Some(LastRender {
            at: Instant::now(),
            lines: transfers.len(),
        });
        Ok(())
    }

    /// Spawns a task re-rendering every `interval` until aborted.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                let _ = self.render();
                tokio::time::sleep(interval).await;
            }
        })
    }
}

pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
