//! Single-range `Range: bytes=...` parsing for blob downloads.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteRange {
    /// No usable range; serve the whole body.
    Full,
    /// Inclusive byte span within the body.
    Partial { start: u64, end: u64 },
    /// The range lies entirely past the end of the body.
    Unsatisfiable,
}

/// Resolve a `Range` header against a body of `len` bytes.
///
/// Multi-range requests and malformed headers fall back to [`ByteRange::Full`].
pub fn parse_range(header: Option<&str>, len: u64) -> ByteRange {
    let Some(ranges) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
        return ByteRange::Full;
    };
    if ranges.contains(',') {
        return ByteRange::Full;
    }
    let Some((start, end)) = ranges.split_once('-') else {
        return ByteRange::Full;
    };
    let (start, end) = (start.trim(), end.trim());

    if start.is_empty() {
        // suffix range: last N bytes
        let Ok(suffix) = end.parse::<u64>() else {
            return ByteRange::Full;
        };
        if suffix == 0 || len == 0 {
            return ByteRange::Unsatisfiable;
        }
        return ByteRange::Partial {
            start: len.saturating_sub(suffix),
            end: len - 1,
        };
    }

    let Ok(start) = start.parse::<u64>() else {
        return ByteRange::Full;
    };
    if start >= len {
        return ByteRange::Unsatisfiable;
    }
    let end = if end.is_empty() {
        len - 1
    } else {
        match end.parse::<u64>() {
            Ok(end) if end >= start => end.min(len - 1),
            _ => return ByteRange::Full,
        }
    };
    ByteRange::Partial { start, end }
}
