//! Decibel to normalized intensity conversion

/// Power readings at or below this level count as silence.
pub const DB_FLOOR: f32 = -60.0;

/// Convert a decibel power reading to a normalized intensity in 0..1.
///
/// Readings at or below -60 dB map to 0 and readings at or above 0 dB map
/// to 1, with a linear ramp between. Non-finite readings are treated as
/// silence so NaN can never reach the history ring.
pub fn normalize_db(db: f32) -> f32 {
    if !db.is_finite() || db <= DB_FLOOR {
        return 0.0;
    }
    let clamped = db.clamp(DB_FLOOR, 0.0);
    (clamped - DB_FLOOR) / -DB_FLOOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_floor_and_below_is_zero() {
        assert_eq!(normalize_db(-60.0), 0.0);
        assert_eq!(normalize_db(-61.5), 0.0);
        assert_eq!(normalize_db(-1000.0), 0.0);
    }

    #[test]
    fn test_zero_and_above_is_one() {
        assert_eq!(normalize_db(0.0), 1.0);
        assert_eq!(normalize_db(3.0), 1.0);
        assert_eq!(normalize_db(120.0), 1.0);
    }

    #[test]
    fn test_linear_ramp() {
        assert_eq!(normalize_db(-30.0), 0.5);
        assert_eq!(normalize_db(-45.0), 0.25);
        assert_eq!(normalize_db(-15.0), 0.75);
    }

    #[test]
    fn test_strictly_increasing_inside_range() {
        let mut prev = normalize_db(-59.9);
        let mut db = -59.0;
        while db < 0.0 {
            let next = normalize_db(db);
            assert!(next > prev, "not increasing at {} dB", db);
            prev = next;
            db += 1.0;
        }
    }

    #[test]
    fn test_non_finite_is_silence() {
        assert_eq!(normalize_db(f32::NAN), 0.0);
        assert_eq!(normalize_db(f32::INFINITY), 0.0);
        assert_eq!(normalize_db(f32::NEG_INFINITY), 0.0);
    }

    #[test]
    fn test_output_always_in_unit_range() {
        for i in -200..200 {
            let v = normalize_db(i as f32);
            assert!((0.0..=1.0).contains(&v));
        }
    }
}
