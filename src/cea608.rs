//! CEA-608 (line 21) closed caption decoding.
//!
//! Decodes the CEA-608 byte-pair stream tunneled inside CEA-708 `cc_data`
//! into timed cues. The decoder handles channel 1 on NTSC field 1 only and
//! supports the pop-on and roll-up caption modes, preamble address codes,
//! backspace, memory erase, the musical-note special character, and the
//! CEA-608 character set overrides (47 CFR 15.119).
//!
//! Screen content is modeled as two 15-row buffers, `displayed` and
//! `non_displayed`; pop-on captions fill the non-displayed buffer and flip
//! it on END_OF_CAPTION, roll-up captions accumulate on the bottom row and
//! scroll on CARRIAGE_RETURN.

use tracing::trace;

use crate::types::{indent_position, row_line, CaptionEvent, CcPacket, Cue, RawCcPair};

// Channel 1 / field 1 control codes, parity stripped.
const PADDING: u16 = 0x0000;
const RESUME_CAPTION_LOADING: u16 = 0x1420;
const BACKSPACE: u16 = 0x1421;
const ROLL_UP_2_ROWS: u16 = 0x1425;
const ROLL_UP_3_ROWS: u16 = 0x1426;
const ROLL_UP_4_ROWS: u16 = 0x1427;
const ERASE_DISPLAYED_MEMORY: u16 = 0x142C;
const CARRIAGE_RETURN: u16 = 0x142D;
const ERASE_NON_DISPLAYED_MEMORY: u16 = 0x142E;
const END_OF_CAPTION: u16 = 0x142F;
const TAB_OFFSET_1: u16 = 0x1721;
const TAB_OFFSET_2: u16 = 0x1722;
const TAB_OFFSET_3: u16 = 0x1723;

/// Number of caption rows.
const ROW_COUNT: usize = 15;

/// Index of the bottom caption row.
const BOTTOM_ROW: usize = 14;

/// CEA-608 caption mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptionMode {
    /// Captions fill non-displayed memory and flip on END_OF_CAPTION.
    PopOn,
    /// Captions accumulate on the bottom row and scroll on CARRIAGE_RETURN.
    RollUp,
}

/// CEA-608 foreground colors selectable by a preamble address code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacColor {
    White,
    Green,
    Blue,
    Cyan,
    Red,
    Yellow,
    Magenta,
}

const PAC_COLORS: [PacColor; 8] = [
    PacColor::White,
    PacColor::Green,
    PacColor::Blue,
    PacColor::Cyan,
    PacColor::Red,
    PacColor::Yellow,
    PacColor::Magenta,
    PacColor::White,
];

/// Pen state derived from the most recent preamble address code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pen {
    /// Foreground color, `None` until a color PAC arrives.
    pub color: Option<PacColor>,
    /// Italic attribute.
    pub italics: bool,
    /// Underline attribute.
    pub underline: bool,
    /// Indent in columns (0, 4, .., 28), `None` for non-indent PACs.
    pub indent: Option<u8>,
    /// Caption row, 1..=15.
    pub row: u8,
}

impl Default for Pen {
    fn default() -> Self {
        Self {
            color: None,
            italics: false,
            underline: false,
            indent: None,
            row: (BOTTOM_ROW + 1) as u8,
        }
    }
}

/// Decode a preamble address code into a complete pen state.
///
/// Channel 2 addresses (`a` in 0x18..=0x1F) fold onto the channel 1 row
/// table; they update the pen but this decoder keeps no channel 2 text.
/// Invalid byte pairs yield `None`.
pub fn parse_pac(a: u8, b: u8) -> Option<Pen> {
    let valid = match a {
        0x11..=0x17 | 0x19..=0x1F => (0x40..=0x7F).contains(&b),
        0x10 | 0x18 => (0x40..=0x5F).contains(&b),
        _ => false,
    };
    if !valid {
        return None;
    }

    let row = pac_row(a, b)?;

    let idx = if b > 0x5F { b - 0x60 } else { b - 0x40 };
    let underline = idx & 1 != 0;
    let (color, italics, indent) = if idx <= 0x0D {
        (Some(PAC_COLORS[(idx / 2) as usize]), false, None)
    } else if idx <= 0x0F {
        (Some(PacColor::White), true, None)
    } else {
        (None, false, Some(((idx - 0x10) / 2) * 4))
    };

    Some(Pen {
        color,
        italics,
        underline,
        indent,
        row,
    })
}

/// Row addressed by a PAC, from the address byte and the high half of the
/// attribute byte.
fn pac_row(a: u8, b: u8) -> Option<u8> {
    let a = if a >= 0x18 { a - 8 } else { a };
    let high = b >= 0x60;
    match (a, high) {
        (0x11, false) => Some(1),
        (0x11, true) => Some(2),
        (0x12, false) => Some(3),
        (0x12, true) => Some(4),
        (0x15, false) => Some(5),
        (0x15, true) => Some(6),
        (0x16, false) => Some(7),
        (0x16, true) => Some(8),
        (0x17, false) => Some(9),
        (0x17, true) => Some(10),
        (0x10, false) => Some(11),
        (0x13, false) => Some(12),
        (0x13, true) => Some(13),
        (0x14, false) => Some(14),
        (0x14, true) => Some(15),
        _ => None,
    }
}

/// Translate a CEA-608 character code to Unicode.
///
/// The CEA-608 basic set reassigns a handful of ASCII positions
/// (47 CFR 15.119 table 1); everything else maps through as its code
/// point. A null code contributes nothing.
fn translate_char(code: u16) -> Option<char> {
    match code {
        0x00 => None,
        0x2A => Some('á'),
        0x5C => Some('é'),
        0x5E => Some('í'),
        0x5F => Some('ó'),
        0x60 => Some('ú'),
        0x7B => Some('ç'),
        0x7C => Some('÷'),
        0x7D => Some('Ñ'),
        0x7E => Some('ñ'),
        0x7F => Some('█'),
        n => char::from_u32(n as u32),
    }
}

fn new_display_buffer() -> [String; ROW_COUNT] {
    std::array::from_fn(|_| String::new())
}

/// Single-channel CEA-608 decoder.
///
/// Consumes timestamped byte pairs ([`CcPacket`]) and accumulates
/// [`CaptionEvent`]s: decoded cues whenever display content is committed,
/// plus the raw byte-pair sidechannel. Events are drained with
/// [`take_events`](Self::take_events).
///
/// The decoder retains its display buffers, mode, and pen across
/// [`flush`](Self::flush) calls; [`reset`](Self::reset) restores the
/// construction state.
#[derive(Debug)]
pub struct Cea608Stream {
    mode: CaptionMode,
    displayed: [String; ROW_COUNT],
    non_displayed: [String; ROW_COUNT],
    pen: Pen,
    start_pts: i64,
    /// Set while the previous pair was a control code; CEA-608 transmits
    /// each control twice and the repeat must decode once.
    last_control_code: Option<u16>,
    /// Smallest row index still scrolled in roll-up mode.
    top_row: usize,
    row_offset: usize,
    /// Cue settings snapshotted when a roll-up row starts.
    cue_line: Option<f32>,
    cue_position: Option<f32>,
    events: Vec<CaptionEvent>,
}

impl Default for Cea608Stream {
    fn default() -> Self {
        Self::new()
    }
}

impl Cea608Stream {
    /// Create a new decoder in pop-on mode with empty buffers.
    pub fn new() -> Self {
        Self {
            mode: CaptionMode::PopOn,
            displayed: new_display_buffer(),
            non_displayed: new_display_buffer(),
            pen: Pen::default(),
            start_pts: 0,
            last_control_code: None,
            top_row: 0,
            row_offset: 0,
            cue_line: None,
            cue_position: None,
            events: Vec::new(),
        }
    }

    /// Process one CC packet.
    ///
    /// Packets for NTSC field 2 are ignored entirely.
    pub fn push(&mut self, packet: CcPacket) {
        if packet.field != 0 {
            return;
        }

        let data = packet.cc_data & 0x7F7F;

        if Some(data) == self.last_control_code {
            self.last_control_code = None;
            return;
        }
        if data & 0xF000 == 0x1000 {
            self.last_control_code = Some(data);
        } else {
            self.last_control_code = None;
        }

        self.emit_raw_pair(&packet, data);

        match data {
            PADDING => {}
            RESUME_CAPTION_LOADING => self.mode = CaptionMode::PopOn,
            END_OF_CAPTION => {
                self.flush_displayed(packet.pts);
                std::mem::swap(&mut self.displayed, &mut self.non_displayed);
                self.start_pts = packet.pts;
            }
            ROLL_UP_2_ROWS => self.set_roll_up(1),
            ROLL_UP_3_ROWS => self.set_roll_up(2),
            ROLL_UP_4_ROWS => self.set_roll_up(3),
            CARRIAGE_RETURN => {
                self.flush_displayed(packet.pts);
                self.shift_rows_up();
                self.start_pts = packet.pts;
            }
            BACKSPACE => {
                let row = match self.mode {
                    CaptionMode::PopOn => &mut self.non_displayed[BOTTOM_ROW],
                    CaptionMode::RollUp => &mut self.displayed[BOTTOM_ROW],
                };
                row.pop();
            }
            ERASE_DISPLAYED_MEMORY => {
                self.flush_displayed(packet.pts);
                self.displayed = new_display_buffer();
            }
            ERASE_NON_DISPLAYED_MEMORY => self.non_displayed = new_display_buffer(),
            TAB_OFFSET_1 | TAB_OFFSET_2 | TAB_OFFSET_3 => {}
            _ => self.decode_characters(&packet, data),
        }
    }

    /// Flush hook invoked at the end of a pipeline flush.
    ///
    /// Display state is kept: roll-up content survives segment boundaries
    /// until the stream erases it or [`reset`](Self::reset) is called.
    pub fn flush(&mut self) {}

    /// Drain the accumulated caption events.
    pub fn take_events(&mut self) -> Vec<CaptionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Restore the decoder to its construction state, dropping any
    /// buffered display content and pending events.
    pub fn reset(&mut self) {
        *self = Self::new();
    }

    fn set_roll_up(&mut self, row_offset: usize) {
        self.top_row = BOTTOM_ROW - row_offset;
        self.row_offset = row_offset;
        self.mode = CaptionMode::RollUp;
    }

    /// Decode a non-control byte pair: PAC, special character, or text.
    fn decode_characters(&mut self, packet: &CcPacket, data: u16) {
        let b0 = (data >> 8) as u8;
        let b1 = (data & 0xFF) as u8;

        let mut char0 = data >> 8;
        let mut char1 = Some(data & 0x00FF);

        let is_pac = (0x10..=0x1F).contains(&b0)
            && (0x40..=0x7F).contains(&b1)
            && !((b0 == 0x10 || b0 == 0x18) && b1 < 0x60);
        if is_pac {
            if let Some(pen) = parse_pac(b0, b1) {
                self.pen = pen;
            }
            if b0 >= 0x18 {
                // channel 2 addresses share the pen but write nothing
                return;
            }
            // a channel 1 PAC occupies the pair; exactly one space is written
            char0 = 0x20;
            char1 = None;
        } else if (b0 == 0x11 || b0 == 0x19) && (0x30..=0x3F).contains(&b1) {
            // special character set; only the musical note is mapped
            char0 = 0x266A;
            char1 = None;
        }

        if char0 & 0x00F0 == 0x0010 {
            trace!(data, "unsupported control code");
            return;
        }

        match self.mode {
            CaptionMode::PopOn => {
                push_chars(&mut self.non_displayed[BOTTOM_ROW], char0, char1);
            }
            CaptionMode::RollUp => {
                if self.displayed[BOTTOM_ROW].is_empty() {
                    // a fresh bottom row starts a new cue
                    self.cue_line = row_line(self.pen.row);
                    self.cue_position = self.pen.indent.and_then(indent_position);
                    self.start_pts = packet.pts;
                }
                push_chars(&mut self.displayed[BOTTOM_ROW], char0, char1);
            }
        }
    }

    /// Emit the current display content as a cue ending at `end_pts`.
    ///
    /// Rows are trimmed, empty rows dropped, and the remainder joined with
    /// newlines; an all-empty display emits nothing.
    fn flush_displayed(&mut self, end_pts: i64) {
        let rows: Vec<&str> = self
            .displayed
            .iter()
            .map(|row| row.trim())
            .filter(|row| !row.is_empty())
            .collect();
        if rows.is_empty() {
            return;
        }

        let (line, position) = match self.mode {
            CaptionMode::RollUp => (self.cue_line, self.cue_position),
            CaptionMode::PopOn => {
                let line = self
                    .pen
                    .row
                    .checked_sub(rows.len() as u8)
                    .and_then(row_line);
                let position = self.pen.indent.and_then(indent_position);
                (line, position)
            }
        };

        let mut cue = Cue::new(self.start_pts, end_pts, rows.join("\n"));
        cue.line = line;
        cue.position = position;
        self.events.push(CaptionEvent::Cue(cue));
    }

    /// Scroll the roll-up window: rows above the window are cleared, rows
    /// inside it move up one, and the bottom row empties.
    fn shift_rows_up(&mut self) {
        for i in 0..self.top_row {
            self.displayed[i].clear();
        }
        for i in self.top_row..BOTTOM_ROW {
            self.displayed[i] = std::mem::take(&mut self.displayed[i + 1]);
        }
        self.displayed[BOTTOM_ROW].clear();
    }

    /// Raw byte-pair sidechannel: every decoded field-1 pair is exposed
    /// undigested, except all-zero padding.
    fn emit_raw_pair(&mut self, packet: &CcPacket, data: u16) {
        let cc_data = [(data >> 8) as u8, (data & 0xFF) as u8];
        if cc_data == [0, 0] {
            return;
        }
        self.events.push(CaptionEvent::RawPair(RawCcPair {
            pts: packet.pts,
            cc_data,
        }));
    }
}

fn push_chars(row: &mut String, char0: u16, char1: Option<u16>) {
    if let Some(c) = translate_char(char0) {
        row.push(c);
    }
    if let Some(c) = char1.and_then(translate_char) {
        row.push(c);
    }
}
