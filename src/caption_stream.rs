//! NAL-to-CC-packet buffering with PTS reordering.
//!
//! H.264 transmits frames in decode order, so caption bytes arrive out of
//! presentation order. [`CaptionStream`] extracts CC packets from SEI NAL
//! units, buffers them between flushes, and delivers them to the CEA-608
//! decoder sorted by PTS.

use tracing::{debug, trace};

use crate::cea608::Cea608Stream;
use crate::nal::NalUnit;
use crate::sei;
use crate::types::{CaptionEvent, CcPacket};

/// Extracts CEA-608 caption packets from SEI NAL units and drives the
/// downstream decoder in presentation order.
///
/// `push` accepts any NAL unit and silently skips everything that does not
/// carry ATSC1 caption user data. `flush` reorders the buffered packets by
/// PTS (stable, so byte-pair order within a frame is preserved), decodes
/// them, and returns the resulting caption events.
#[derive(Debug, Default)]
pub struct CaptionStream {
    packets: Vec<CcPacket>,
    cea608: Cea608Stream,
}

impl CaptionStream {
    /// Create an empty caption stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Extract and buffer the CC packets of one NAL unit.
    ///
    /// Non-SEI units, SEI without a T.35 payload, and payloads that fail
    /// ATSC1 envelope validation contribute nothing.
    pub fn push(&mut self, nal: &NalUnit) {
        if !nal.nal_type.is_sei() {
            return;
        }
        let Some(payload) = sei::find_t35_payload(&nal.rbsp) else {
            trace!(pts = nal.pts, "SEI without T.35 caption payload");
            return;
        };
        let Some(body) = sei::parse_user_data(payload) else {
            debug!(pts = nal.pts, "T.35 payload failed ATSC1 validation");
            return;
        };
        let packets = sei::parse_cc_packets(body, nal.pts);
        trace!(count = packets.len(), pts = nal.pts, "buffered CC packets");
        self.packets.extend(packets);
    }

    /// Buffer a CC packet directly, bypassing SEI extraction.
    pub fn push_packet(&mut self, packet: CcPacket) {
        self.packets.push(packet);
    }

    /// Decode everything buffered since the previous flush and return the
    /// caption events.
    ///
    /// Packets are forwarded in non-decreasing PTS order; `sort_by_key` is
    /// stable, so equal timestamps keep their arrival order. The decoder is
    /// flushed even when nothing is buffered, draining events held from
    /// earlier pushes.
    pub fn flush(&mut self) -> Vec<CaptionEvent> {
        self.packets.sort_by_key(|packet| packet.pts);
        for packet in self.packets.drain(..) {
            self.cea608.push(packet);
        }
        self.cea608.flush();
        self.cea608.take_events()
    }

    /// Drop all buffered packets and restore the decoder to its
    /// construction state.
    pub fn reset(&mut self) {
        self.packets.clear();
        self.cea608.reset();
    }

    /// Access the downstream CEA-608 decoder.
    pub fn cea608(&mut self) -> &mut Cea608Stream {
        &mut self.cea608
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nal::NalUnitType;

    fn caption_sei(pts: i64, pairs: &[u16]) -> NalUnit {
        let mut payload = vec![0xB5, 0x00, 0x31];
        payload.extend_from_slice(b"GA94");
        payload.push(0x03);
        payload.push(0x40 | pairs.len() as u8);
        payload.push(0xFF);
        for pair in pairs {
            payload.push(0xFC); // cc_valid, field 1
            payload.extend_from_slice(&pair.to_be_bytes());
        }
        payload.push(0xFF);

        let mut rbsp = vec![0x04, payload.len() as u8];
        rbsp.extend_from_slice(&payload);
        rbsp.push(0x80);

        NalUnit {
            nal_type: NalUnitType::Sei,
            nal_ref_idc: 0,
            rbsp,
            pts,
        }
    }

    fn cue_texts(events: &[CaptionEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(CaptionEvent::as_cue)
            .map(|cue| cue.text.clone())
            .collect()
    }

    #[test]
    fn test_push_and_flush() {
        let mut stream = CaptionStream::new();
        stream.push(&caption_sei(1000, &[0x1420, 0x4849])); // RCL, "HI"
        stream.push(&caption_sei(2000, &[0x142F, 0x142C])); // EOC, EDM

        let events = stream.flush();
        assert_eq!(cue_texts(&events), vec!["HI"]);
    }

    #[test]
    fn test_flush_orders_by_pts() {
        let mut stream = CaptionStream::new();
        // frames pushed in decode order, presentation order reversed
        stream.push(&caption_sei(2000, &[0x142F])); // EOC
        stream.push(&caption_sei(1000, &[0x1420, 0x4849])); // RCL, "HI"
        stream.push(&caption_sei(3000, &[0x142C])); // EDM

        let events = stream.flush();
        let cues: Vec<_> = events
            .iter()
            .filter_map(CaptionEvent::as_cue)
            .collect();
        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].text, "HI");
        assert_eq!(cues[0].start_pts, 2000);
        assert_eq!(cues[0].end_pts, 3000);
    }

    #[test]
    fn test_flush_is_stable_for_equal_pts() {
        let mut stream = CaptionStream::new();
        // byte-pair order within one frame is semantic
        stream.push(&caption_sei(1000, &[0x1420, 0x4142, 0x4344])); // "ABCD"
        stream.push(&caption_sei(2000, &[0x142F]));
        stream.push(&caption_sei(3000, &[0x142C]));

        let events = stream.flush();
        assert_eq!(cue_texts(&events), vec!["ABCD"]);
    }

    #[test]
    fn test_non_sei_units_skipped() {
        let mut stream = CaptionStream::new();
        let mut nal = caption_sei(1000, &[0x1420, 0x4849]);
        nal.nal_type = NalUnitType::Slice;
        stream.push(&nal);
        assert!(stream.flush().is_empty());
    }

    #[test]
    fn test_bad_envelope_skipped() {
        let mut stream = CaptionStream::new();
        let mut nal = caption_sei(1000, &[0x1420, 0x4849]);
        nal.rbsp[4] = 0x00; // break the provider code
        stream.push(&nal);
        assert!(stream.flush().is_empty());
    }

    #[test]
    fn test_flush_drains_buffer() {
        let mut stream = CaptionStream::new();
        stream.push(&caption_sei(1000, &[0x1420, 0x4849]));
        stream.flush();

        // a second flush with an empty buffer re-flushes the decoder only
        assert!(stream.flush().is_empty());
    }

    #[test]
    fn test_decoder_state_survives_flush() {
        let mut stream = CaptionStream::new();
        stream.push(&caption_sei(1000, &[0x1420, 0x4849])); // loaded, not shown
        stream.flush();

        // the pop-on buffer flips in a later segment
        stream.push(&caption_sei(5000, &[0x142F]));
        stream.push(&caption_sei(6000, &[0x142C]));
        let events = stream.flush();
        assert_eq!(cue_texts(&events), vec!["HI"]);
    }

    #[test]
    fn test_push_packet_bypasses_sei() {
        let mut stream = CaptionStream::new();
        stream.push_packet(CcPacket::new(0, 1000, 0x1425)); // roll-up 2
        stream.push_packet(CcPacket::new(0, 1000, 0x4849));
        stream.push_packet(CcPacket::new(0, 2000, 0x142D)); // carriage return

        let events = stream.flush();
        assert_eq!(cue_texts(&events), vec!["HI"]);
    }

    #[test]
    fn test_reset() {
        let mut stream = CaptionStream::new();
        stream.push(&caption_sei(1000, &[0x1425, 0x4849]));
        stream.reset();
        assert!(stream.flush().is_empty());
    }
}
