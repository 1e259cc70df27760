//! The pipeline's only way to wait.
//!
//! Retry backoff and the video poll interval both go through [`Pause`], so
//! tests can assert on the exact delays without sleeping through them.

use std::time::Duration;

pub trait Pause {
    fn pause(&self, duration: Duration);
}

/// Blocks the current thread for the requested duration.
#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadPause;

impl Pause for ThreadPause {
    fn pause(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

impl<P: Pause + ?Sized> Pause for &P {
    fn pause(&self, duration: Duration) {
        (**self).pause(duration)
    }
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Records requested pauses instead of sleeping.
    #[derive(Default)]
    pub struct RecordingPause {
        pub pauses: Mutex<Vec<Duration>>,
    }

    impl RecordingPause {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn recorded(&self) -> Vec<Duration> {
            self.pauses.lock().unwrap().clone()
        }
    }

    impl Pause for RecordingPause {
        fn pause(&self, duration: Duration) {
            self.pauses.lock().unwrap().push(duration);
        }
    }

    #[test]
    fn recording_pause_keeps_order() {
        let pause = RecordingPause::new();
        pause.pause(Duration::from_millis(5));
        (&pause).pause(Duration::from_millis(7));
        assert_eq!(
            pause.recorded(),
            vec![Duration::from_millis(5), Duration::from_millis(7)]
        );
    }

    #[test]
    fn thread_pause_zero_returns() {
        ThreadPause.pause(Duration::ZERO);
    }
}
