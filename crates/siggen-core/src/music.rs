//! Control value → pitch and gain conversions
//!
//! Frequency controls use a piano-key mapping: the 0-127 control range is
//! spread over 88 keys (index 0..=87), the real-valued key index is
//! truncated, and the key is converted with the equal-temperament formula
//! anchored at key 49 = A4 = 440 Hz.
//!
//! Volume controls map linearly onto the normalized gain range [0, 1].

use crate::types::{ControlValue, CONTROL_MAX};

/// Highest key index produced by [`control_to_key`]
pub const MAX_KEY: u8 = 87;

/// Key index of concert A
pub const A4_KEY: i32 = 49;

/// Frequency of concert A in Hz
pub const A4_FREQ: f64 = 440.0;

/// Map a control value onto a piano key index (truncating)
pub fn control_to_key(value: ControlValue) -> u8 {
    let value = value.min(CONTROL_MAX) as f64;
    ((value / CONTROL_MAX as f64) * MAX_KEY as f64).floor() as u8
}

/// Equal-temperament frequency of a key index
pub fn key_to_frequency(key: u8) -> f32 {
    (2f64.powf((key as i32 - A4_KEY) as f64 / 12.0) * A4_FREQ) as f32
}

/// Frequency in Hz for a frequency-control value
pub fn control_to_frequency(value: ControlValue) -> f32 {
    let key = control_to_key(value);
    let freq = key_to_frequency(key);
    log::debug!("freq control value {} -> key {} -> freq {:.3}", value, key, freq);
    freq
}

/// Normalized gain for a volume-control value
pub fn control_to_volume(value: ControlValue) -> f32 {
    value.min(CONTROL_MAX) as f32 / CONTROL_MAX as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_bounds() {
        assert_eq!(control_to_key(0), 0);
        assert_eq!(control_to_key(127), 87);
        // 64/127 * 87 = 43.84 → truncated
        assert_eq!(control_to_key(64), 43);
    }

    #[test]
    fn test_key_is_monotonic() {
        let keys: Vec<u8> = (0..=127).map(control_to_key).collect();
        assert!(keys.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_key_frequencies() {
        assert!((key_to_frequency(49) - 440.0).abs() < 1e-3);
        assert!((key_to_frequency(61) - 880.0).abs() < 1e-3);
        assert!((key_to_frequency(0) - 25.9565).abs() < 1e-3);
        assert!((key_to_frequency(87) - 3951.066).abs() < 1e-2);
    }

    #[test]
    fn test_control_to_frequency_endpoints() {
        assert_eq!(control_to_frequency(0), key_to_frequency(0));
        assert_eq!(control_to_frequency(127), key_to_frequency(87));
        assert!(control_to_frequency(0) > 0.0);
    }

    #[test]
    fn test_volume() {
        assert_eq!(control_to_volume(0), 0.0);
        assert_eq!(control_to_volume(127), 1.0);
        assert!((control_to_volume(64) - 0.504).abs() < 0.01);
    }
}
