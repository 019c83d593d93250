use std::time::{Duration, Instant};

/// Tracks wall-clock elapsed time for one scan, analogous to
/// `wordfence.util.timing.Timer` in the original scanner.
pub struct Timer {
    start: Instant,
    stopped: Option<Instant>,
}

impl Timer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
            stopped: None,
        }
    }

    pub fn stop(&mut self) {
        if self.stopped.is_none() {
            self.stopped = Some(Instant::now());
        }
    }

    /// Elapsed time since `start()`, frozen at the point `stop()` was
    /// called if the timer has been stopped.
    pub fn elapsed(&self) -> Duration {
        self.stopped.unwrap_or_else(Instant::now) - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stop_freezes_elapsed_time() {
        let mut timer = Timer::start();
        std::thread::sleep(Duration::from_millis(5));
        timer.stop();
        let first = timer.elapsed();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(first, timer.elapsed());
    }
}
