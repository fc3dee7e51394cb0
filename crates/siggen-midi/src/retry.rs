//! Opt-in wait-and-retry for control devices
//!
//! By default a missing MIDI port fails startup. With `wait` enabled the
//! lookup is retried with exponential backoff until the port appears or
//! shutdown is requested.

use std::time::Duration;

use siggen_core::shutdown::ShutdownToken;

use crate::connection::MidiResult;
use crate::input::MidiControlSource;

/// Exponential backoff schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    current: Duration,
    max: Duration,
}

impl Default for Backoff {
    /// 250 ms doubling up to 5 s
    fn default() -> Self {
        Self::new(Duration::from_millis(250), Duration::from_secs(5))
    }
}

impl Backoff {
    pub fn new(initial: Duration, max: Duration) -> Self {
        Self {
            current: initial.min(max),
            max,
        }
    }

    /// Delay before the next attempt
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = (self.current * 2).min(self.max);
        delay
    }
}

/// Run `attempt` until it succeeds, fails with a non-retryable error, or
/// `shutdown` is cancelled (`Ok(None)`)
pub fn retry_with_backoff<T, E, F, R>(
    mut attempt: F,
    retryable: R,
    shutdown: &ShutdownToken,
    mut backoff: Backoff,
) -> Result<Option<T>, E>
where
    F: FnMut() -> Result<T, E>,
    R: Fn(&E) -> bool,
    E: std::fmt::Display,
{
    loop {
        if shutdown.is_cancelled() {
            return Ok(None);
        }
        match attempt() {
            Ok(value) => return Ok(Some(value)),
            Err(e) if retryable(&e) => {
                let delay = backoff.next_delay();
                log::info!("{}; retrying in {:?}", e, delay);
                if shutdown.wait_timeout(delay) {
                    return Ok(None);
                }
            }
            Err(e) => return Err(e),
        }
    }
}

/// Connect to a MIDI port, waiting for it to appear when `wait` is set
///
/// Returns `Ok(None)` only if shutdown was requested while waiting.
pub fn connect_with_retry(
    port_match: &str,
    wait: bool,
    shutdown: &ShutdownToken,
) -> MidiResult<Option<MidiControlSource>> {
    if !wait {
        return MidiControlSource::connect(port_match).map(Some);
    }

    log::info!("MIDI: waiting for a port matching {:?}", port_match);
    retry_with_backoff(
        || MidiControlSource::connect(port_match),
        |e| e.is_missing_device(),
        shutdown,
        Backoff::default(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::MidiConnectionError;
    use std::time::Instant;

    #[test]
    fn test_backoff_doubles_to_cap() {
        let mut backoff = Backoff::default();
        let delays: Vec<u64> = (0..7).map(|_| backoff.next_delay().as_millis() as u64).collect();
        assert_eq!(delays, vec![250, 500, 1000, 2000, 4000, 5000, 5000]);
    }

    #[test]
    fn test_retry_until_success() {
        let token = ShutdownToken::new();
        let mut calls = 0;
        let result: Result<Option<u32>, MidiConnectionError> = retry_with_backoff(
            || {
                calls += 1;
                if calls < 3 {
                    Err(MidiConnectionError::NoInputPorts)
                } else {
                    Ok(7)
                }
            },
            |e| e.is_missing_device(),
            &token,
            Backoff::new(Duration::from_millis(1), Duration::from_millis(2)),
        );
        assert_eq!(result, Ok(Some(7)));
        assert_eq!(calls, 3);
    }

    #[test]
    fn test_non_retryable_error_fails_fast() {
        let token = ShutdownToken::new();
        let mut calls = 0;
        let result: Result<Option<()>, MidiConnectionError> = retry_with_backoff(
            || {
                calls += 1;
                Err(MidiConnectionError::ConnectionError("busy".to_string()))
            },
            |e| e.is_missing_device(),
            &token,
            Backoff::default(),
        );
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_cancel_interrupts_wait() {
        let token = ShutdownToken::new();
        let canceller = token.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(20));
            canceller.cancel();
        });

        let begin = Instant::now();
        let result: Result<Option<()>, MidiConnectionError> = retry_with_backoff(
            || Err(MidiConnectionError::PortNotFound("nano".to_string())),
            |e| e.is_missing_device(),
            &token,
            Backoff::new(Duration::from_secs(30), Duration::from_secs(30)),
        );
        handle.join().unwrap();

        assert_eq!(result, Ok(None));
        assert!(begin.elapsed() < Duration::from_secs(5));
    }
}
