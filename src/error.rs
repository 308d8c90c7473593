//! Caption extraction errors.

use thiserror::Error;

/// Errors from caption extraction.
///
/// Only the NAL-unit layer rejects input loudly. The caption pipeline itself
/// drops malformed SEI payloads, bad envelopes, and truncated packets
/// silently; a corrupt frame never poisons the decoder.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CaptionError {
    /// Invalid or corrupted NAL unit.
    #[error("invalid NAL unit: {0}")]
    InvalidNalUnit(String),
}

/// Result type for caption operations.
pub type Result<T> = std::result::Result<T, CaptionError>;
