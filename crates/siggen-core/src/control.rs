//! Control events and the source trait they come from

use crate::types::{ControlId, ControlValue};

/// One control-surface interaction: which element, which value (0-127)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ControlEvent {
    pub id: ControlId,
    pub value: ControlValue,
}

impl ControlEvent {
    pub fn new(id: ControlId, value: ControlValue) -> Self {
        Self { id, value }
    }
}

/// Non-blocking producer of control events (MIDI port, test script, ...)
pub trait ControlSource {
    /// Append every event received since the last call to `events`
    ///
    /// Must not block; a finite batch per call.
    fn poll_pending(&mut self, events: &mut Vec<ControlEvent>);
}

/// Source that never produces anything, for running without a controller
#[derive(Debug, Default)]
pub struct NoControls;

impl ControlSource for NoControls {
    fn poll_pending(&mut self, _events: &mut Vec<ControlEvent>) {}
}

/// Replays a fixed list of event batches, one batch per poll
#[derive(Debug, Default)]
pub struct ScriptedControls {
    batches: std::collections::VecDeque<Vec<ControlEvent>>,
}

impl ScriptedControls {
    pub fn new(batches: impl IntoIterator<Item = Vec<ControlEvent>>) -> Self {
        Self {
            batches: batches.into_iter().collect(),
        }
    }

    /// True once every batch has been handed out
    pub fn is_exhausted(&self) -> bool {
        self.batches.is_empty()
    }
}

impl ControlSource for ScriptedControls {
    fn poll_pending(&mut self, events: &mut Vec<ControlEvent>) {
        if let Some(batch) = self.batches.pop_front() {
            events.extend(batch);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scripted_controls_one_batch_per_poll() {
        let mut source = ScriptedControls::new([
            vec![ControlEvent::new(1, 10), ControlEvent::new(2, 20)],
            vec![],
            vec![ControlEvent::new(3, 127)],
        ]);
        let mut events = Vec::new();

        source.poll_pending(&mut events);
        assert_eq!(events.len(), 2);
        events.clear();

        source.poll_pending(&mut events);
        assert!(events.is_empty());

        source.poll_pending(&mut events);
        assert_eq!(events, vec![ControlEvent::new(3, 127)]);
        assert!(source.is_exhausted());

        source.poll_pending(&mut events);
        assert_eq!(events.len(), 1);
    }
}
