use tracing::trace;

use crate::error::EseError;

/// Accumulates out-of-row long-value segments into a contiguous logical
/// byte stream addressed by (file_offset, length) pairs.
///
/// Segments are never copied; the assembler only remembers where each
/// chunk lives on disk and resolves logical ranges back to file ranges
/// on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LongValueAssembler {
    /// Opaque header fields, written but never interpreted here.
    unknown1: u32,
    unknown2: u32,
    segments: Vec<(i64, u32)>,
    total_size: u64,
}

impl LongValueAssembler {
    pub fn from_header(header: &[u8]) -> Result<Self, EseError> {
        if header.len() != 8 {
            return Err(EseError::Unsupported {
                what: format!("long value header size {} (expected 8)", header.len()),
            });
        }
        let unknown1 = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let unknown2 = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);
        Ok(LongValueAssembler {
            unknown1,
            unknown2,
            segments: Vec::new(),
            total_size: 0,
        })
    }

    pub fn unknown_header_fields(&self) -> (u32, u32) {
        (self.unknown1, self.unknown2)
    }

    pub fn total_size(&self) -> u64 {
        self.total_size
    }

    pub fn segments(&self) -> &[(i64, u32)] {
        &self.segments
    }

    pub fn append_segment(
        &mut self,
        segment_offset: u64,
        file_offset: i64,
        length: u32,
    ) -> Result<(), EseError> {
        if segment_offset != self.total_size {
            return Err(EseError::BoundsExceeded {
                what: "long value segment offset",
                offset: segment_offset as usize,
                length: length as usize,
                blob_size: self.total_size as usize,
            });
        }
        self.segments.push((file_offset, length));
        self.total_size += length as u64;
        trace!(file_offset, length, total_size = self.total_size, "appended long value segment");
        Ok(())
    }

    /// Resolves a logical range `[start, end)` to the underlying file
    /// ranges covering it, as `(file_offset, length)` pairs in order.
    pub fn resolve_range(&self, start: u64, end: u64) -> Result<Vec<(i64, u32)>, EseError> {
        if start > end || end > self.total_size {
            return Err(EseError::BoundsExceeded {
                what: "long value range",
                offset: start as usize,
                length: (end - start.min(end)) as usize,
                blob_size: self.total_size as usize,
            });
        }
        let mut out = Vec::new();
        let mut cursor = 0u64;
        for &(file_offset, length) in &self.segments {
            let seg_start = cursor;
            let seg_end = cursor + length as u64;
            if seg_end > start && seg_start < end {
                let clip_start = start.max(seg_start) - seg_start;
                let clip_end = end.min(seg_end) - seg_start;
                out.push((file_offset + clip_start as i64, (clip_end - clip_start) as u32));
            }
            cursor = seg_end;
            if cursor >= end {
                break;
            }
        }
        Ok(out)
    }
}
