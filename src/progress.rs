use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::event::{ScanEvent, StatusHandle, TaggedEvent, LOCATOR_WORKER_INDEX};

const TICK_INTERVAL: Duration = Duration::from_millis(100);

/// Optional execution unit: while the scan is neither complete nor failed,
/// sleeps [`TICK_INTERVAL`] then pushes a `PROGRESS_UPDATE` event. Carries
/// no payload — the pool loop synthesises the snapshot. See `spec.md` §4.G.
pub struct ProgressMonitor;

impl ProgressMonitor {
    pub fn spawn(status: StatusHandle, event_tx: Sender<TaggedEvent>) -> JoinHandle<()> {
        std::thread::Builder::new()
            .name("progress-monitor".into())
            .spawn(move || {
                while !status.is_finished() {
                    std::thread::sleep(TICK_INTERVAL);
                    // Re-check after waking: avoids one spurious tick right
                    // as the scan finishes.
                    if status.is_finished() {
                        break;
                    }
                    if event_tx
                        .send(TaggedEvent::new(LOCATOR_WORKER_INDEX, ScanEvent::ProgressUpdate))
                        .is_err()
                    {
                        break;
                    }
                }
            })
            .expect("failed to spawn progress monitor thread")
    }
}
