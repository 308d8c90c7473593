//! SEI message parsing and ATSC A/53 caption user data extraction.
//!
//! H.264 carries CEA-608/708 captions as `user_data_registered_itu_t_t35`
//! SEI payloads (ANSI/SCTE 128-1). This module walks an SEI RBSP for the
//! first such payload, validates the ATSC1 envelope, and extracts the
//! CC packets it carries.
//!
//! Every failure mode here is a silent drop: a truncated or mismatched
//! payload yields nothing, never an error.

use tracing::{debug, trace};

use crate::types::CcPacket;

/// SEI payload type for user_data_registered_itu_t_t35.
pub const USER_DATA_REGISTERED_ITU_T_T35: usize = 4;

/// ITU-T T.35 country code for the United States.
const T35_COUNTRY_CODE_US: u8 = 0xB5;

/// ITU-T T.35 provider code assigned to ATSC.
const T35_PROVIDER_CODE_ATSC: u16 = 49;

/// ATSC A/53 user identifier.
const ATSC_USER_IDENTIFIER: [u8; 4] = *b"GA94";

/// ATSC A/53 user data type code for caption data.
const CC_DATA_TYPE_CODE: u8 = 0x03;

/// RBSP trailing bits byte terminating the SEI message list.
const RBSP_TRAILING_BITS: u8 = 0x80;

/// Find the first `user_data_registered_itu_t_t35` payload in an SEI RBSP.
///
/// Walks the SEI message list, accumulating the 0xFF-run encoded payload
/// type and size of each message, and returns a borrow of the first type-4
/// payload. CEA-708 guarantees at most one per SEI. Truncated input yields
/// `None`.
pub fn find_t35_payload(rbsp: &[u8]) -> Option<&[u8]> {
    let mut pos = 0;

    while pos < rbsp.len() {
        if rbsp[pos] == RBSP_TRAILING_BITS {
            break;
        }

        let mut payload_type = 0usize;
        while pos < rbsp.len() && rbsp[pos] == 0xFF {
            payload_type += 255;
            pos += 1;
        }
        payload_type += *rbsp.get(pos)? as usize;
        pos += 1;

        let mut payload_size = 0usize;
        while pos < rbsp.len() && rbsp[pos] == 0xFF {
            payload_size += 255;
            pos += 1;
        }
        payload_size += *rbsp.get(pos)? as usize;
        pos += 1;

        if payload_type == USER_DATA_REGISTERED_ITU_T_T35 {
            if pos + payload_size > rbsp.len() {
                trace!(payload_size, "truncated T.35 SEI payload");
                return None;
            }
            return Some(&rbsp[pos..pos + payload_size]);
        }

        pos += payload_size;
    }

    None
}

/// Validate the ATSC1 envelope of a T.35 SEI payload and return the
/// `cc_data` body, with the trailing marker byte stripped.
pub fn parse_user_data(payload: &[u8]) -> Option<&[u8]> {
    if payload.len() < 9 {
        return None;
    }
    if payload[0] != T35_COUNTRY_CODE_US {
        debug!(country = payload[0], "unexpected T.35 country code");
        return None;
    }
    if u16::from_be_bytes([payload[1], payload[2]]) != T35_PROVIDER_CODE_ATSC {
        debug!("unexpected T.35 provider code");
        return None;
    }
    if payload[3..7] != ATSC_USER_IDENTIFIER {
        debug!("missing GA94 user identifier");
        return None;
    }
    if payload[7] != CC_DATA_TYPE_CODE {
        debug!(type_code = payload[7], "not caption user data");
        return None;
    }

    Some(&payload[8..payload.len() - 1])
}

/// Extract CC packets from a validated `cc_data` body.
///
/// A clear `process_cc_data_flag` marks the packet as filler. Each triple
/// contributes a packet only when its `cc_valid` bit is set; a truncated
/// body stops at the last full triple.
pub fn parse_cc_packets(body: &[u8], pts: i64) -> Vec<CcPacket> {
    let Some(&flags) = body.first() else {
        return Vec::new();
    };
    if flags & 0x40 == 0 {
        return Vec::new();
    }

    let count = (flags & 0x1F) as usize;
    let mut packets = Vec::with_capacity(count);

    for i in 0..count {
        let off = i * 3;
        if off + 4 >= body.len() {
            break;
        }
        let cc_type_flags = body[off + 2];
        if cc_type_flags & 0x04 == 0 {
            continue;
        }
        packets.push(CcPacket {
            field: cc_type_flags & 0x03,
            pts,
            cc_data: u16::from_be_bytes([body[off + 3], body[off + 4]]),
        });
    }

    packets
}
