//! Progress events emitted by the pipeline and the observer list that receives them.

use std::fmt;

/// Fine-grained step an [`ProgressEvent::ItemProcessed`] event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessStep {
    GameFileInfoLoading,
    PatchingInfoLoading,
    GameFilesChecking,
    GameFilesCopy,
    GameFilesPatching,
    PatchGameFile,
    CheckPatchedGameFile,
}

impl fmt::Display for ProcessStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProcessStep::GameFileInfoLoading => write!(f, "Loading game files info"),
            ProcessStep::PatchingInfoLoading => write!(f, "Loading patching info"),
            ProcessStep::GameFilesChecking => write!(f, "Checking game file"),
            ProcessStep::GameFilesCopy => write!(f, "Copying game file"),
            ProcessStep::GameFilesPatching => write!(f, "Awaiting game file to patch"),
            ProcessStep::PatchGameFile => write!(f, "Patching game file"),
            ProcessStep::CheckPatchedGameFile => write!(f, "Checking patched game file"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProgressEvent {
    ItemProcessed {
        value: usize,
        total: usize,
        step: ProcessStep,
        item_name: String,
    },
    StepProcessed {
        label: String,
    },
    DownloadProgress {
        percent: u8,
    },
    ExtractProgress {
        percent: u8,
    },
}

impl ProgressEvent {
    /// Completion of an item event as a whole percentage.
    pub fn percent(&self) -> Option<u8> {
        match self {
            ProgressEvent::ItemProcessed { value, total, .. } if *total > 0 => {
                let ratio = (*value as f64 / *total as f64) * 100.0;
                Some(ratio.round().clamp(0.0, 100.0) as u8)
            }
            ProgressEvent::DownloadProgress { percent } | ProgressEvent::ExtractProgress { percent } => {
                Some(*percent)
            }
            _ => None,
        }
    }
}

pub type Observer = Box<dyn Fn(&ProgressEvent) + Send + Sync>;

/// Plain list of event observers.
///
/// Observers are registered before a run starts; the pipeline only ever
/// borrows the list immutably while running.
#[derive(Default)]
pub struct Observers {
    list: Vec<Observer>,
}

impl Observers {
    pub fn new() -> Self {
        Observers::default()
    }

    pub fn subscribe<F>(&mut self, observer: F)
    where
        F: Fn(&ProgressEvent) + Send + Sync + 'static,
    {
        self.list.push(Box::new(observer));
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn emit(&self, event: ProgressEvent) {
        for observer in &self.list {
            observer(&event);
        }
    }

    pub fn step(&self, label: impl Into<String>) {
        self.emit(ProgressEvent::StepProcessed {
            label: label.into(),
        });
    }

    pub fn item(&self, value: usize, total: usize, step: ProcessStep, item_name: &str) {
        self.emit(ProgressEvent::ItemProcessed {
            value,
            total,
            step,
            item_name: item_name.to_string(),
        });
    }

    pub fn download(&self, percent: u8) {
        self.emit(ProgressEvent::DownloadProgress { percent });
    }

    pub fn extract(&self, percent: u8) {
        self.emit(ProgressEvent::ExtractProgress { percent });
    }
}

impl fmt::Debug for Observers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("len", &self.list.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn every_observer_receives_events_in_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut observers = Observers::new();
        for id in 0..2 {
            let seen = Arc::clone(&seen);
            observers.subscribe(move |e| seen.lock().unwrap().push((id, e.clone())));
        }

        observers.step("first");
        observers.download(50);

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 4);
        assert_eq!(
            seen[0],
            (0, ProgressEvent::StepProcessed { label: "first".to_string() })
        );
        assert_eq!(seen[3], (1, ProgressEvent::DownloadProgress { percent: 50 }));
    }

    #[test]
    fn emit_without_observers_is_noop() {
        let observers = Observers::new();
        assert!(observers.is_empty());
        observers.item(0, 1, ProcessStep::PatchGameFile, "a.bin");
    }

    #[test]
    fn item_percent_rounds() {
        let event = ProgressEvent::ItemProcessed {
            value: 1,
            total: 3,
            step: ProcessStep::GameFilesCopy,
            item_name: "a".to_string(),
        };
        assert_eq!(event.percent(), Some(33));

        let empty = ProgressEvent::ItemProcessed {
            value: 0,
            total: 0,
            step: ProcessStep::GameFilesCopy,
            item_name: "a".to_string(),
        };
        assert_eq!(empty.percent(), None);
        assert_eq!(ProgressEvent::StepProcessed { label: String::new() }.percent(), None);
    }
}
