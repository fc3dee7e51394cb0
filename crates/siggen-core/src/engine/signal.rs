//! Play/quit wake signal for a voice thread
//!
//! One condition variable carries both "play" and "quit", so a voice parked
//! in the paused state wakes for either, and `stop()` never has to wait for a
//! play that will not come. The hot loop checks the state through an atomic
//! mirror instead of taking the lock on every chunk.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Condvar, Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum RunState {
    Paused = 0,
    Playing = 1,
    Quit = 2,
}

impl RunState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => Self::Playing,
            2 => Self::Quit,
            _ => Self::Paused,
        }
    }
}

#[derive(Debug)]
pub struct RunSignal {
    state: Mutex<RunState>,
    cv: Condvar,
    mirror: AtomicU8,
}

impl Default for RunSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl RunSignal {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RunState::Paused),
            cv: Condvar::new(),
            mirror: AtomicU8::new(RunState::Paused as u8),
        }
    }

    fn set(&self, next: RunState) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        // Quit is sticky
        if *state == RunState::Quit {
            return false;
        }
        *state = next;
        self.mirror.store(next as u8, Ordering::Release);
        drop(state);
        self.cv.notify_all();
        true
    }

    /// Set the play flag; false if the signal has already quit
    pub fn play(&self) -> bool {
        self.set(RunState::Playing)
    }

    /// Clear the play flag; false if the signal has already quit
    pub fn pause(&self) -> bool {
        self.set(RunState::Paused)
    }

    /// Request the voice thread to exit, waking it if paused
    pub fn quit(&self) {
        self.set(RunState::Quit);
    }

    pub fn is_playing(&self) -> bool {
        RunState::from_u8(self.mirror.load(Ordering::Acquire)) == RunState::Playing
    }

    pub fn is_quit(&self) -> bool {
        RunState::from_u8(self.mirror.load(Ordering::Acquire)) == RunState::Quit
    }

    /// Block while paused. Returns true once playing, false on quit.
    pub fn wait_for_play(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        while *state == RunState::Paused {
            state = self.cv.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
        *state == RunState::Playing
    }
}
