//! # inband-captions
//!
//! Extraction of CEA-608 closed captions carried in-band in an H.264
//! elementary stream, as `user_data_registered_itu_t_t35` SEI payloads
//! (ANSI/SCTE 128-1, ATSC A/53).
//!
//! ## Pipeline
//!
//! Two components compose in series:
//!
//! - [`CaptionStream`] accepts NAL units, extracts CEA-608 byte pairs from
//!   ATSC1 caption user data, and delivers them to the decoder in
//!   presentation order on `flush`.
//! - [`Cea608Stream`] decodes the byte-pair stream (channel 1, field 1):
//!   pop-on and roll-up modes, preamble address codes, backspace, memory
//!   erase, and the CEA-608 character set. It emits a [`CaptionEvent`] for
//!   every committed cue, plus a raw byte-pair sidechannel.
//!
//! Malformed input is dropped silently at every stage; a corrupt frame
//! never poisons the decoder.
//!
//! ## Quick Start
//!
//! Byte pairs can be fed straight to the decoder:
//!
//! ```rust
//! use inband_captions::{CcPacket, Cea608Stream};
//!
//! let mut decoder = Cea608Stream::new();
//! decoder.push(CcPacket::new(0, 1000, 0x1420)); // resume caption loading
//! decoder.push(CcPacket::new(0, 1000, 0x4849)); // "HI"
//! decoder.push(CcPacket::new(0, 2000, 0x142F)); // end of caption
//! decoder.push(CcPacket::new(0, 3000, 0x142C)); // erase displayed memory
//!
//! let cues: Vec<_> = decoder
//!     .take_events()
//!     .into_iter()
//!     .filter_map(|event| event.into_cue())
//!     .collect();
//! assert_eq!(cues[0].text, "HI");
//! assert_eq!(cues[0].start_pts, 2000);
//! assert_eq!(cues[0].end_pts, 3000);
//! ```
//!
//! Or a whole access unit's Annex B data can be run through the pipeline:
//!
//! ```rust
//! use inband_captions::{CaptionStream, NalIterator};
//!
//! let mut captions = CaptionStream::new();
//! let annex_b: &[u8] = &[0x00, 0x00, 0x00, 0x01, 0x09, 0xF0]; // AUD only
//! for nal in NalIterator::new(annex_b, 90_000) {
//!     captions.push(&nal.unwrap());
//! }
//! assert!(captions.flush().is_empty());
//! ```

pub mod caption_stream;
pub mod cea608;
pub mod error;
pub mod nal;
pub mod sei;
pub mod types;
pub mod webvtt;

// Re-export commonly used types at the crate root
pub use caption_stream::CaptionStream;
pub use cea608::{parse_pac, CaptionMode, Cea608Stream, PacColor, Pen};
pub use error::{CaptionError, Result};
pub use nal::{NalIterator, NalUnit, NalUnitType};
pub use types::{CaptionEvent, CcPacket, Cue, CueAlign, RawCcPair};

/// Prelude module for convenient imports.
///
/// ```rust
/// use inband_captions::prelude::*;
/// ```
pub mod prelude {
    pub use crate::caption_stream::CaptionStream;
    pub use crate::cea608::{CaptionMode, Cea608Stream, PacColor, Pen};
    pub use crate::error::{CaptionError, Result};
    pub use crate::nal::{NalIterator, NalUnit, NalUnitType};
    pub use crate::types::{CaptionEvent, CcPacket, Cue, CueAlign, RawCcPair};
    pub use crate::webvtt;
}
