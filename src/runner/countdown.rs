use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant};

use super::machine::SessionEvent;
use super::SessionTiming;

/// A running countdown for one step. Dropping the handle stops it.
#[derive(Debug)]
pub struct Countdown {
    index: usize,
    handle: JoinHandle<()>,
}

impl Countdown {
    pub fn spawn(
        index: usize,
        seconds: u32,
        timing: SessionTiming,
        events: mpsc::UnboundedSender<SessionEvent>,
    ) -> Self {
        let handle = tokio::spawn(async move {
            let mut ticks = interval_at(Instant::now() + timing.tick, timing.tick);
            for _ in 0..seconds {
                ticks.tick().await;
                if events.send(SessionEvent::Tick { index }).is_err() {
                    return;
                }
            }
            sleep(timing.grace).await;
            let _ = events.send(SessionEvent::CountdownElapsed { index });
        });

        Self { index, handle }
    }

    pub fn index(&self) -> usize {
        self.index
    }
}

impl Drop for Countdown {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
