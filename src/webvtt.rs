//! WebVTT serialization of caption cues.
//!
//! Renders decoded cues as a WebVTT document with cue settings carrying the
//! CEA-608 positioning (percentage `line` and `position`, start alignment,
//! 80% box). PTS values are converted to wall-clock timestamps with a
//! caller-supplied tick rate; the default is the 90 kHz MPEG-TS clock.

use crate::types::Cue;

/// WebVTT file header.
const WEBVTT_HEADER: &str = "WEBVTT";

/// MPEG-TS presentation clock rate.
pub const MPEG_TS_TIMESCALE: u32 = 90_000;

/// Write cues as a WebVTT document, interpreting PTS as 90 kHz ticks.
pub fn write(cues: &[Cue]) -> String {
    write_with_timescale(cues, MPEG_TS_TIMESCALE)
}

/// Write cues as a WebVTT document with an explicit PTS tick rate.
pub fn write_with_timescale(cues: &[Cue], ticks_per_second: u32) -> String {
    let mut vtt = format!("{}\n\n", WEBVTT_HEADER);

    for cue in cues {
        vtt.push_str(&format!(
            "{} --> {}{}\n",
            format_timestamp(cue.start_pts, ticks_per_second),
            format_timestamp(cue.end_pts, ticks_per_second),
            cue_settings(cue)
        ));
        vtt.push_str(&cue.text);
        vtt.push_str("\n\n");
    }

    vtt
}

fn cue_settings(cue: &Cue) -> String {
    let mut settings = String::new();
    if let Some(line) = cue.line {
        // snap_to_lines is always false: percentage lines
        settings.push_str(&format!(" line:{}%", line));
    }
    if let Some(position) = cue.position {
        settings.push_str(&format!(" position:{}%", position));
    }
    settings.push_str(&format!(" align:{} size:{}%", cue.align, cue.size));
    settings
}

fn format_timestamp(pts: i64, ticks_per_second: u32) -> String {
    let ms = (pts.max(0) as u64 * 1000) / ticks_per_second as u64;
    let hours = ms / 3_600_000;
    let minutes = (ms % 3_600_000) / 60_000;
    let seconds = (ms % 60_000) / 1000;
    let millis = ms % 1000;

    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, seconds, millis)
}
