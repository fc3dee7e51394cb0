//! MIDI input handling
//!
//! Receives raw MIDI bytes from the midir callback, keeps Control Change
//! messages and forwards them as control events through a flume channel.
//! The poll loop drains the channel without blocking.

use flume::{Receiver, Sender};
use midir::MidiInputConnection;
use siggen_core::control::{ControlEvent, ControlSource};

use crate::connection::{find_input_port, MidiConnectionError, MidiResult};

/// Events buffered between two polls before the callback starts dropping
pub const EVENT_QUEUE_CAPACITY: usize = 1024;

/// Raw MIDI input event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MidiInputEvent {
    NoteOn { channel: u8, note: u8, velocity: u8 },
    NoteOff { channel: u8, note: u8, velocity: u8 },
    ControlChange { channel: u8, cc: u8, value: u8 },
}

impl MidiInputEvent {
    /// Parse raw MIDI bytes into an event
    ///
    /// MIDI message format:
    /// - Note Off: 0x8n nn vv (n=channel, nn=note, vv=velocity)
    /// - Note On: 0x9n nn vv
    /// - Control Change: 0xBn cc vv (cc=controller, vv=value)
    pub fn parse(data: &[u8]) -> Option<Self> {
        let (&status, rest) = data.split_first()?;
        let channel = status & 0x0F;
        let (a, b) = match rest {
            [a, b, ..] => (*a & 0x7F, *b & 0x7F),
            _ => return None,
        };

        match status & 0xF0 {
            0x80 => Some(Self::NoteOff {
                channel,
                note: a,
                velocity: b,
            }),
            // Note On with velocity 0 is a Note Off
            0x90 if b == 0 => Some(Self::NoteOff {
                channel,
                note: a,
                velocity: 0,
            }),
            0x90 => Some(Self::NoteOn {
                channel,
                note: a,
                velocity: b,
            }),
            0xB0 => Some(Self::ControlChange {
                channel,
                cc: a,
                value: b,
            }),
            _ => None,
        }
    }

    pub fn channel(&self) -> u8 {
        match self {
            Self::NoteOn { channel, .. }
            | Self::NoteOff { channel, .. }
            | Self::ControlChange { channel, .. } => *channel,
        }
    }

    /// Control event for Control Change messages; notes are not controls
    pub fn to_control_event(&self) -> Option<ControlEvent> {
        match *self {
            Self::ControlChange { cc, value, .. } => Some(ControlEvent::new(cc.into(), value)),
            _ => None,
        }
    }
}

/// Parse one message and queue its control event; false if nothing was queued
fn forward(data: &[u8], tx: &Sender<ControlEvent>) -> bool {
    let Some(event) = MidiInputEvent::parse(data).and_then(|e| e.to_control_event()) else {
        return false;
    };
    if tx.try_send(event).is_err() {
        log::warn!("MIDI: Event channel full, dropping control {}", event.id);
        return false;
    }
    true
}

/// Move everything queued so far into `events`, bounded to one queue's worth
fn drain(rx: &Receiver<ControlEvent>, events: &mut Vec<ControlEvent>) {
    events.extend(rx.try_iter().take(EVENT_QUEUE_CAPACITY));
}

/// Control source reading Control Change messages from a MIDI input port
pub struct MidiControlSource {
    /// The midir connection (kept alive for the duration)
    _connection: MidiInputConnection<Sender<ControlEvent>>,
    events: Receiver<ControlEvent>,
    port_name: String,
}

impl MidiControlSource {
    /// Connect to the first input port whose name contains `port_match`
    pub fn connect(port_match: &str) -> MidiResult<Self> {
        let (midi_in, port, port_name) = find_input_port(port_match)?;
        let (tx, rx) = flume::bounded(EVENT_QUEUE_CAPACITY);

        let connection = midi_in
            .connect(&port, "siggen-midi-input", Self::midi_callback, tx)
            .map_err(|e| MidiConnectionError::ConnectionError(e.to_string()))?;

        log::info!("MIDI: Listening on {}", port_name);

        Ok(Self {
            _connection: connection,
            events: rx,
            port_name,
        })
    }

    /// Called from the MIDI driver thread; must not block
    fn midi_callback(_timestamp: u64, data: &[u8], tx: &mut Sender<ControlEvent>) {
        forward(data, tx);
    }

    pub fn port_name(&self) -> &str {
        &self.port_name
    }
}

impl ControlSource for MidiControlSource {
    fn poll_pending(&mut self, events: &mut Vec<ControlEvent>) {
        drain(&self.events, events);
    }
}

impl std::fmt::Debug for MidiControlSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MidiControlSource")
            .field("port_name", &self.port_name)
            .field("pending", &self.events.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_cc() {
        let data = [0xB2, 0x07, 0x64]; // CC, channel 2, controller 7, value 100
        assert_eq!(
            MidiInputEvent::parse(&data),
            Some(MidiInputEvent::ControlChange {
                channel: 2,
                cc: 7,
                value: 100
            })
        );
    }

    #[test]
    fn test_parse_notes() {
        let on = MidiInputEvent::parse(&[0x90, 0x3C, 0x7F]).unwrap();
        assert_eq!(
            on,
            MidiInputEvent::NoteOn {
                channel: 0,
                note: 60,
                velocity: 127
            }
        );

        // Note On with velocity 0 should be treated as Note Off
        let off = MidiInputEvent::parse(&[0x91, 0x3C, 0x00]).unwrap();
        assert!(matches!(off, MidiInputEvent::NoteOff { channel: 1, note: 60, .. }));
        assert_eq!(off.channel(), 1);
    }

    #[test]
    fn test_parse_rejects_short_and_unknown() {
        assert_eq!(MidiInputEvent::parse(&[]), None);
        assert_eq!(MidiInputEvent::parse(&[0xB0, 0x10]), None);
        // Pitch bend
        assert_eq!(MidiInputEvent::parse(&[0xE0, 0x00, 0x40]), None);
    }

    #[test]
    fn test_only_cc_becomes_control_event() {
        let cc = MidiInputEvent::parse(&[0xB5, 16, 127]).unwrap();
        assert_eq!(cc.to_control_event(), Some(ControlEvent::new(16, 127)));

        let note = MidiInputEvent::parse(&[0x90, 16, 127]).unwrap();
        assert_eq!(note.to_control_event(), None);
    }

    #[test]
    fn test_forward_and_drain() {
        let (tx, rx) = flume::bounded(EVENT_QUEUE_CAPACITY);
        assert!(forward(&[0xB0, 1, 10], &tx));
        assert!(!forward(&[0x90, 1, 10], &tx));
        assert!(forward(&[0xB3, 2, 0], &tx));

        let mut events = Vec::new();
        drain(&rx, &mut events);
        assert_eq!(events, vec![ControlEvent::new(1, 10), ControlEvent::new(2, 0)]);

        events.clear();
        drain(&rx, &mut events);
        assert!(events.is_empty());
    }

    #[test]
    fn test_full_channel_drops_events() {
        let (tx, _rx) = flume::bounded(1);
        assert!(forward(&[0xB0, 1, 10], &tx));
        assert!(!forward(&[0xB0, 1, 11], &tx));
    }
}
