//! NAL (Network Abstraction Layer) unit handling.
//!
//! The caption pipeline consumes pre-split NAL units with their
//! emulation-prevention bytes already removed. This module supplies that
//! splitting for callers holding a raw Annex B elementary stream, plus the
//! NAL-type tagging [`CaptionStream`](crate::CaptionStream) filters on.

use crate::error::{CaptionError, Result};

/// NAL unit type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NalUnitType {
    /// Unspecified.
    Unspecified,
    /// Non-IDR slice.
    Slice,
    /// IDR slice.
    IdrSlice,
    /// Supplemental enhancement information (SEI).
    Sei,
    /// Sequence parameter set (SPS).
    Sps,
    /// Picture parameter set (PPS).
    Pps,
    /// Access unit delimiter.
    Aud,
    /// End of sequence.
    EndOfSequence,
    /// End of stream.
    EndOfStream,
    /// Filler data.
    Filler,
    /// Unknown/reserved type.
    Unknown(u8),
}

impl NalUnitType {
    /// Create from the raw NAL unit type value.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Unspecified,
            1 => Self::Slice,
            5 => Self::IdrSlice,
            6 => Self::Sei,
            7 => Self::Sps,
            8 => Self::Pps,
            9 => Self::Aud,
            10 => Self::EndOfSequence,
            11 => Self::EndOfStream,
            12 => Self::Filler,
            n => Self::Unknown(n),
        }
    }

    /// Get the raw value.
    pub fn to_u8(&self) -> u8 {
        match self {
            Self::Unspecified => 0,
            Self::Slice => 1,
            Self::IdrSlice => 5,
            Self::Sei => 6,
            Self::Sps => 7,
            Self::Pps => 8,
            Self::Aud => 9,
            Self::EndOfSequence => 10,
            Self::EndOfStream => 11,
            Self::Filler => 12,
            Self::Unknown(n) => *n,
        }
    }

    /// Check if this NAL unit can carry caption user data.
    pub fn is_sei(&self) -> bool {
        *self == Self::Sei
    }
}

/// A parsed NAL unit tagged with the presentation timestamp of its
/// access unit.
#[derive(Debug, Clone)]
pub struct NalUnit {
    /// NAL unit type.
    pub nal_type: NalUnitType,
    /// NAL reference IDC (0-3).
    pub nal_ref_idc: u8,
    /// RBSP payload, emulation-prevention bytes removed.
    pub rbsp: Vec<u8>,
    /// Presentation timestamp from the carrying PES packet.
    pub pts: i64,
}

impl NalUnit {
    /// Parse a NAL unit from raw data (including the NAL header byte).
    pub fn parse(data: &[u8], pts: i64) -> Result<Self> {
        let header = *data
            .first()
            .ok_or_else(|| CaptionError::InvalidNalUnit("empty NAL unit".into()))?;

        if header & 0x80 != 0 {
            return Err(CaptionError::InvalidNalUnit(
                "forbidden zero bit is set".into(),
            ));
        }

        let nal_ref_idc = (header >> 5) & 3;
        let nal_type = NalUnitType::from_u8(header & 0x1F);

        let rbsp = if data.len() > 1 {
            remove_emulation_prevention(&data[1..])
        } else {
            Vec::new()
        };

        Ok(Self {
            nal_type,
            nal_ref_idc,
            rbsp,
            pts,
        })
    }
}

/// Undo start-code emulation prevention.
///
/// H.264 escapes every in-payload `00 00` pair by inserting 0x03 before
/// the following byte; the unescape drops each 0x03 that arrives on a run
/// of two zeros.
pub fn remove_emulation_prevention(data: &[u8]) -> Vec<u8> {
    let mut rbsp = Vec::with_capacity(data.len());
    let mut zero_run = 0;

    for &byte in data {
        if zero_run >= 2 && byte == 3 {
            zero_run = 0;
            continue;
        }
        zero_run = if byte == 0 { zero_run + 1 } else { 0 };
        rbsp.push(byte);
    }

    rbsp
}

/// NAL unit iterator over an Annex B byte stream.
///
/// Every yielded unit carries the access unit's presentation timestamp,
/// so the output can be pushed straight into a
/// [`CaptionStream`](crate::CaptionStream).
pub struct NalIterator<'a> {
    data: &'a [u8],
    pos: usize,
    pts: i64,
}

impl<'a> NalIterator<'a> {
    /// Create an iterator over one access unit's Annex B data.
    pub fn new(data: &'a [u8], pts: i64) -> Self {
        Self { data, pos: 0, pts }
    }

    /// Locate the next start code at or after `from`.
    ///
    /// Returns the offset where the prefix begins and the offset where the
    /// unit payload begins. A zero leading the three-byte `00 00 01` form
    /// belongs to the prefix, not to the preceding unit.
    fn start_code(&self, from: usize) -> Option<(usize, usize)> {
        let hit = from
            + self
                .data
                .get(from..)?
                .windows(3)
                .position(|w| w == [0, 0, 1])?;
        let prefix = if hit > from && self.data[hit - 1] == 0 {
            hit - 1
        } else {
            hit
        };
        Some((prefix, hit + 3))
    }
}

impl<'a> Iterator for NalIterator<'a> {
    type Item = Result<NalUnit>;

    fn next(&mut self) -> Option<Self::Item> {
        let (_, unit_start) = self.start_code(self.pos)?;
        let unit_end = match self.start_code(unit_start) {
            Some((prefix, _)) => prefix,
            None => self.data.len(),
        };
        self.pos = unit_end;
        Some(NalUnit::parse(&self.data[unit_start..unit_end], self.pts))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nal_unit_type_roundtrip() {
        assert_eq!(NalUnitType::from_u8(6), NalUnitType::Sei);
        assert_eq!(NalUnitType::from_u8(7), NalUnitType::Sps);
        assert_eq!(NalUnitType::from_u8(5), NalUnitType::IdrSlice);
        assert!(matches!(NalUnitType::from_u8(30), NalUnitType::Unknown(30)));
        assert_eq!(NalUnitType::Sei.to_u8(), 6);
        assert_eq!(NalUnitType::Unknown(30).to_u8(), 30);
        assert!(NalUnitType::Sei.is_sei());
        assert!(!NalUnitType::Slice.is_sei());
    }

    #[test]
    fn test_nal_unit_parse() {
        // nal_ref_idc=0, nal_unit_type=6 (SEI)
        let data = [0x06, 0x04, 0x02, 0xB5, 0x00, 0x80];
        let nal = NalUnit::parse(&data, 9000).unwrap();
        assert_eq!(nal.nal_type, NalUnitType::Sei);
        assert_eq!(nal.nal_ref_idc, 0);
        assert_eq!(nal.pts, 9000);
        assert_eq!(nal.rbsp, vec![0x04, 0x02, 0xB5, 0x00, 0x80]);
    }

    #[test]
    fn test_nal_unit_parse_empty() {
        assert!(NalUnit::parse(&[], 0).is_err());
    }

    #[test]
    fn test_nal_unit_parse_forbidden_bit() {
        let data = [0x86, 0x00];
        assert!(NalUnit::parse(&data, 0).is_err());
    }

    #[test]
    fn test_remove_emulation_prevention() {
        let escaped = [0x00, 0x00, 0x03, 0x01, 0x42, 0x00, 0x00, 0x03, 0x00];
        assert_eq!(
            remove_emulation_prevention(&escaped),
            vec![0x00, 0x00, 0x01, 0x42, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_remove_emulation_prevention_untouched() {
        let clean = [0x01, 0x02, 0x03, 0x04];
        assert_eq!(remove_emulation_prevention(&clean), clean.to_vec());
    }

    #[test]
    fn test_annex_b_iteration() {
        let data = [
            0x00, 0x00, 0x00, 0x01, 0x67, 0x42, // SPS
            0x00, 0x00, 0x01, 0x06, 0xB5, // SEI
        ];
        let nals: Vec<_> = NalIterator::new(&data, 1234)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(nals.len(), 2);
        assert_eq!(nals[0].nal_type, NalUnitType::Sps);
        assert_eq!(nals[1].nal_type, NalUnitType::Sei);
        assert_eq!(nals[1].pts, 1234);
    }

    #[test]
    fn test_annex_b_four_byte_separator() {
        let data = [
            0x00, 0x00, 0x01, 0x67, 0x42, // SPS, 3-byte prefix
            0x00, 0x00, 0x00, 0x01, 0x68, 0xCE, // PPS, 4-byte prefix
        ];
        let nals: Vec<_> = NalIterator::new(&data, 0)
            .collect::<Result<Vec<_>>>()
            .unwrap();
        assert_eq!(nals.len(), 2);
        assert_eq!(nals[0].nal_type, NalUnitType::Sps);
        // the separator's zeros are prefix, not SPS payload
        assert_eq!(nals[0].rbsp, vec![0x42]);
        assert_eq!(nals[1].nal_type, NalUnitType::Pps);
        assert_eq!(nals[1].rbsp, vec![0xCE]);
    }

    #[test]
    fn test_annex_b_iteration_empty() {
        assert_eq!(NalIterator::new(&[], 0).count(), 0);
    }
}
