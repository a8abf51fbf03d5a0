use serde::Serialize;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

/// Phase of an installation run, in the order an observer sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Phase {
    Resolving,
    Downloading,
    Installing,
    Completed,
    Failed,
}

/// Event emitted to a progress observer.
#[derive(Debug, Clone, Serialize)]
pub enum ProgressEvent {
    /// The item currently in flight, reported before its bytes move.
    CurrentItem { name: String },
    PhaseChanged { phase: Phase },
    BytesTransferred { bytes: u64, total: Option<u64> },
}

pub type ProgressSender = UnboundedSender<ProgressEvent>;
pub type ProgressReceiver = UnboundedReceiver<ProgressEvent>;

/// Create a progress channel. The sender side never blocks; a dropped
/// receiver simply discards events.
pub fn channel() -> (ProgressSender, ProgressReceiver) {
    mpsc::unbounded_channel()
}

/// Handle the pipeline reports through. A detached handle is valid and
/// makes every report a no-op, so operations work with no observer.
#[derive(Debug, Clone, Default)]
pub struct Progress {
    sender: Option<ProgressSender>,
}

impl Progress {
    pub fn attached(sender: ProgressSender) -> Self {
        Self {
            sender: Some(sender),
        }
    }

    pub fn detached() -> Self {
        Self { sender: None }
    }

    pub fn item(&self, name: &str) {
        self.report(ProgressEvent::CurrentItem {
            name: name.to_string(),
        });
    }

    pub fn phase(&self, phase: Phase) {
        self.report(ProgressEvent::PhaseChanged { phase });
    }

    pub fn bytes(&self, bytes: u64, total: Option<u64>) {
        self.report(ProgressEvent::BytesTransferred { bytes, total });
    }

    fn report(&self, event: ProgressEvent) {
        if let Some(sender) = &self.sender {
            // Fire-and-forget: the observer may already be gone.
            let _ = sender.send(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detached_handle_is_a_no_op() {
        let progress = Progress::detached();
        progress.item("map");
        progress.phase(Phase::Completed);
        progress.bytes(1, None);
    }

    #[test]
    fn events_arrive_in_order() {
        let (tx, mut rx) = channel();
        let progress = Progress::attached(tx);
        progress.item("map");
        progress.phase(Phase::Downloading);

        assert!(matches!(
            rx.try_recv().unwrap(),
            ProgressEvent::CurrentItem { name } if name == "map"
        ));
        assert!(matches!(
            rx.try_recv().unwrap(),
            ProgressEvent::PhaseChanged {
                phase: Phase::Downloading
            }
        ));
    }
}
