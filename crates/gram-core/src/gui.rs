//! Hand-off of work to the GUI thread.
//!
//! Background threads must not touch live views. Anything they need done
//! there is posted as a closure and run by [`crate::Editor::pump`].

use tokio::sync::mpsc;
use tracing::debug;

use crate::editor::Editor;

pub type GuiTask = Box<dyn FnOnce(&mut Editor) + Send>;

/// Cloneable handle for posting tasks from any thread.
#[derive(Clone)]
pub struct GuiSender {
    tx: mpsc::UnboundedSender<GuiTask>,
}

impl GuiSender {
    pub fn post<F>(&self, task: F)
    where
        F: FnOnce(&mut Editor) + Send + 'static,
    {
        if self.tx.send(Box::new(task)).is_err() {
            debug!("GUI queue closed, dropping task");
        }
    }
}

/// The receiving end, owned by the editor on the GUI thread.
pub struct GuiQueue {
    tx: mpsc::UnboundedSender<GuiTask>,
    rx: mpsc::UnboundedReceiver<GuiTask>,
}

impl GuiQueue {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> GuiSender {
        GuiSender {
            tx: self.tx.clone(),
        }
    }

    /// Takes every queued task without waiting.
    pub fn drain(&mut self) -> Vec<GuiTask> {
        let mut tasks = Vec::new();
        while let Ok(task) = self.rx.try_recv() {
            tasks.push(task);
        }
        tasks
    }
}

impl Default for GuiQueue {
    fn default() -> Self {
        Self::new()
    }
}
