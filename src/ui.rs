//! Terminal rendering of the level meter
//!
//! Draws the bar sequence as a row of block glyphs and encodes NDJSON meter
//! frames for machine consumers.

use serde::Serialize;

/// Minimum rendered bar height, so quiet sections stay visible.
pub const MIN_BAR_HEIGHT: f32 = 0.07;

const GLYPHS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Clamp a bar value into the renderable range. Display-only; never fed
/// back into the meter state.
pub fn display_clamp(value: f32) -> f32 {
    let value = if value.is_finite() { value } else { 0.0 };
    value.min(1.0).max(MIN_BAR_HEIGHT)
}

/// Render a bar sequence as a row of block glyphs.
pub fn render_bars(bars: &[f32]) -> String {
    bars.iter()
        .map(|&value| {
            let clamped = display_clamp(value);
            let index = ((clamped * GLYPHS.len() as f32) as usize).min(GLYPHS.len() - 1);
            GLYPHS[index]
        })
        .collect()
}

/// One meter frame for NDJSON output.
#[derive(Debug, Serialize)]
pub struct MeterFrame {
    pub level: f32,
    pub bars: Vec<f32>,
}

/// Encode a meter frame as a newline-terminated JSON line.
pub fn encode_meter_frame(frame: &MeterFrame) -> serde_json::Result<String> {
    Ok(format!("{}\n", serde_json::to_string(frame)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_clamp_floors_and_caps() {
        assert_eq!(display_clamp(0.0), MIN_BAR_HEIGHT);
        assert_eq!(display_clamp(0.03), MIN_BAR_HEIGHT);
        assert_eq!(display_clamp(0.5), 0.5);
        assert_eq!(display_clamp(1.7), 1.0);
        assert_eq!(display_clamp(f32::NAN), MIN_BAR_HEIGHT);
    }

    #[test]
    fn test_render_one_glyph_per_bar() {
        let row = render_bars(&[0.0, 0.25, 0.5, 0.75, 1.0]);
        assert_eq!(row.chars().count(), 5);
    }

    #[test]
    fn test_quiet_and_loud_bars_use_extreme_glyphs() {
        let row: Vec<char> = render_bars(&[0.0, 1.0]).chars().collect();
        assert_eq!(row[0], GLYPHS[0]);
        assert_eq!(row[1], GLYPHS[7]);
    }

    #[test]
    fn test_encode_meter_frame() {
        let frame = MeterFrame {
            level: 0.5,
            bars: vec![0.25, 0.75],
        };
        let encoded = encode_meter_frame(&frame).unwrap();
        assert!(encoded.ends_with('\n'));
        assert!(encoded.contains("\"level\":0.5"));
        assert!(encoded.contains("\"bars\":[0.25,0.75]"));
    }
}
