use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};

use tracing::error;

use crate::context::{CancelToken, RunContext};
use crate::events::ProgressEvent;

use super::error::PipelineError;
use super::stages::{RunSummary, StageRunner};

/// A run executing on a background thread.
pub struct RunHandle {
    events: Receiver<ProgressEvent>,
    cancel: CancelToken,
    handle: JoinHandle<Result<RunSummary, PipelineError>>,
}

impl RunHandle {
    /// Events in emission order; the channel closes when the run ends.
    pub fn events(&self) -> &Receiver<ProgressEvent> {
        &self.events
    }

    /// Ask the run to stop at its next cancellation point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn join(self) -> Result<RunSummary, PipelineError> {
        match self.handle.join() {
            Ok(result) => result,
            Err(_) => {
                error!("Downgrade worker panicked");
                Err(PipelineError::WorkerPanicked)
            }
        }
    }
}

/// Start `runner` on its own thread, forwarding every event over a channel.
pub fn spawn(mut runner: StageRunner, ctx: RunContext) -> RunHandle {
    let (tx, rx) = mpsc::channel();
    runner.subscribe(move |event| {
        let _ = tx.send(event.clone());
    });

    let cancel = ctx.cancel.clone();
    let handle = thread::spawn(move || runner.run(&ctx));

    RunHandle {
        events: rx,
        cancel,
        handle,
    }
}
