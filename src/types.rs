//! Common caption types and structures.
//!
//! This module defines the types shared across the pipeline: the CC packet
//! carried between the SEI layer and the decoder, the cue and raw byte-pair
//! events the decoder produces, and the row/indent positioning tables.

use std::fmt;

use serde::{Deserialize, Serialize};

/// One CEA-708 `cc_data` entry carrying a CEA-608 byte pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CcPacket {
    /// 2-bit `cc_type` field (0 = NTSC field 1, 1 = NTSC field 2).
    pub field: u8,
    /// Presentation timestamp of the carrying access unit.
    pub pts: i64,
    /// Two 7-bit CEA-608 characters plus parity bits.
    pub cc_data: u16,
}

impl CcPacket {
    /// Create a new CC packet.
    pub fn new(field: u8, pts: i64, cc_data: u16) -> Self {
        Self {
            field,
            pts,
            cc_data,
        }
    }
}

/// Cue text alignment within its box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CueAlign {
    /// Align to the writing-direction start edge.
    Start,
    /// Centered.
    Center,
    /// Align to the writing-direction end edge.
    End,
}

impl Default for CueAlign {
    fn default() -> Self {
        CueAlign::Start
    }
}

impl fmt::Display for CueAlign {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CueAlign::Start => write!(f, "start"),
            CueAlign::Center => write!(f, "center"),
            CueAlign::End => write!(f, "end"),
        }
    }
}

/// A timed caption cue for a text-track renderer.
///
/// Positioning follows the WebVTT cue-settings model: `line` and `position`
/// are percentages of the video viewport, `None` leaves the renderer
/// default in effect, and `snap_to_lines` is always false (percentage
/// lines, not line numbers).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cue {
    /// Presentation timestamp at which the cue becomes visible.
    pub start_pts: i64,
    /// Presentation timestamp at which the cue is replaced or erased.
    pub end_pts: i64,
    /// Cue text; rows are joined with `'\n'`.
    pub text: String,
    /// Vertical line percentage derived from the caption row.
    pub line: Option<f32>,
    /// Horizontal position percentage derived from the PAC indent.
    pub position: Option<f32>,
    /// Text alignment.
    pub align: CueAlign,
    /// Alignment of the cue box around `position`.
    pub position_align: CueAlign,
    /// Cue box width as a percentage of the viewport.
    pub size: f32,
    /// Whether `line` is a line number rather than a percentage.
    pub snap_to_lines: bool,
}

impl Cue {
    /// Create a cue with the CEA-608 renderer defaults (start-aligned,
    /// 80% box, percentage line positioning).
    pub fn new(start_pts: i64, end_pts: i64, text: impl Into<String>) -> Self {
        Self {
            start_pts,
            end_pts,
            text: text.into(),
            line: None,
            position: None,
            align: CueAlign::Start,
            position_align: CueAlign::Start,
            size: 80.0,
            snap_to_lines: false,
        }
    }

    /// Duration of the cue in PTS ticks.
    pub fn duration(&self) -> i64 {
        self.end_pts - self.start_pts
    }
}

/// An undecoded CEA-608 byte pair, exposed as a debug/raw sidechannel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawCcPair {
    /// Presentation timestamp of the carrying packet.
    pub pts: i64,
    /// The parity-stripped byte pair.
    pub cc_data: [u8; 2],
}

/// Output of the caption pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CaptionEvent {
    /// A decoded, timed caption cue.
    Cue(Cue),
    /// A raw byte pair from the undecoded sidechannel.
    RawPair(RawCcPair),
}

impl CaptionEvent {
    /// The cue, if this event is one.
    pub fn as_cue(&self) -> Option<&Cue> {
        match self {
            CaptionEvent::Cue(cue) => Some(cue),
            _ => None,
        }
    }

    /// The raw byte pair, if this event is one.
    pub fn as_raw_pair(&self) -> Option<&RawCcPair> {
        match self {
            CaptionEvent::RawPair(pair) => Some(pair),
            _ => None,
        }
    }

    /// Consume the event, keeping only a cue.
    pub fn into_cue(self) -> Option<Cue> {
        match self {
            CaptionEvent::Cue(cue) => Some(cue),
            _ => None,
        }
    }
}

/// Caption row to line percentage, indexed by `row - 1` (rows 1..=15).
pub const ROW_POSITION: [f32; 15] = [
    10.0, 15.33, 20.66, 26.0, 31.33, 36.66, 42.0, 47.33, 52.66, 58.0, 63.33, 68.66, 74.0, 79.33,
    84.66,
];

/// PAC indent (0, 4, .., 28) to position percentage, indexed by `indent / 4`.
pub const INDENT_POSITION: [f32; 8] = [10.0, 20.0, 30.0, 40.0, 50.0, 60.0, 70.0, 80.0];

/// Look up the line percentage for a caption row.
///
/// Rows outside 1..=15 have no entry; the renderer default applies.
pub fn row_line(row: u8) -> Option<f32> {
    if (1..=15).contains(&row) {
        Some(ROW_POSITION[(row - 1) as usize])
    } else {
        None
    }
}

/// Look up the position percentage for a PAC indent.
pub fn indent_position(indent: u8) -> Option<f32> {
    if indent % 4 != 0 {
        return None;
    }
    INDENT_POSITION.get((indent / 4) as usize).copied()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_line_table() {
        assert_eq!(row_line(1), Some(10.0));
        assert_eq!(row_line(11), Some(63.33));
        assert_eq!(row_line(15), Some(84.66));
        assert_eq!(row_line(0), None);
        assert_eq!(row_line(16), None);
    }

    #[test]
    fn test_indent_position_table() {
        assert_eq!(indent_position(0), Some(10.0));
        assert_eq!(indent_position(12), Some(40.0));
        assert_eq!(indent_position(28), Some(80.0));
        assert_eq!(indent_position(32), None);
        assert_eq!(indent_position(5), None);
    }

    #[test]
    fn test_cue_defaults() {
        let cue = Cue::new(1000, 2000, "HI");
        assert_eq!(cue.align, CueAlign::Start);
        assert_eq!(cue.position_align, CueAlign::Start);
        assert_eq!(cue.size, 80.0);
        assert!(!cue.snap_to_lines);
        assert_eq!(cue.line, None);
        assert_eq!(cue.duration(), 1000);
    }

    #[test]
    fn test_cue_align_display() {
        assert_eq!(CueAlign::Start.to_string(), "start");
        assert_eq!(CueAlign::Center.to_string(), "center");
    }

    #[test]
    fn test_caption_event_accessors() {
        let event = CaptionEvent::Cue(Cue::new(0, 1, "x"));
        assert!(event.as_cue().is_some());
        assert!(event.as_raw_pair().is_none());

        let event = CaptionEvent::RawPair(RawCcPair {
            pts: 0,
            cc_data: [0x14, 0x20],
        });
        assert!(event.as_cue().is_none());
        assert_eq!(event.as_raw_pair().unwrap().cc_data, [0x14, 0x20]);
    }
}
