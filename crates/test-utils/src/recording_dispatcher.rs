use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, Mutex};

use tokio::sync::Semaphore;

use fwatcher::exec::{DispatchOutput, Dispatcher};

/// A dispatcher that records `(path, label)` instead of running anything.
///
/// A gated dispatcher blocks each dispatch until [`release`] hands out a
/// permit, which lets tests hold a watch loop inside a dispatch while more
/// events queue up behind it. Dispatches are recorded before blocking.
///
/// [`release`]: RecordingDispatcher::release
#[derive(Debug, Clone, Default)]
pub struct RecordingDispatcher {
    calls: Arc<Mutex<Vec<(PathBuf, String)>>>,
    gate: Option<Arc<Semaphore>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn gated() -> Self {
        Self {
            calls: Arc::default(),
            gate: Some(Arc::new(Semaphore::new(0))),
        }
    }

    /// Let `n` blocked (or future) dispatches complete.
    pub fn release(&self, n: usize) {
        if let Some(gate) = &self.gate {
            gate.add_permits(n);
        }
    }

    pub fn calls(&self) -> Vec<(PathBuf, String)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn labels_for(&self, path: impl AsRef<Path>) -> Vec<String> {
        let path = path.as_ref();
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(p, _)| p == path)
            .map(|(_, l)| l.clone())
            .collect()
    }
}

impl Dispatcher for RecordingDispatcher {
    fn dispatch<'a>(
        &'a self,
        path: &'a Path,
        label: &'a str,
    ) -> Pin<Box<dyn Future<Output = DispatchOutput> + Send + 'a>> {
        Box::pin(async move {
            self.calls
                .lock()
                .unwrap()
                .push((path.to_path_buf(), label.to_string()));

            if let Some(gate) = &self.gate {
                if let Ok(permit) = gate.acquire().await {
                    permit.forget();
                }
            }

            DispatchOutput {
                command: format!("recorded {} {}", path.display(), label),
                ..DispatchOutput::default()
            }
        })
    }
}
