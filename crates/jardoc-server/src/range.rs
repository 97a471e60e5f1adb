/// How a `Range` header applies to a body of known length.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum RangeRequest {
    /// No usable range; serve everything.
    Full,
    /// Inclusive byte offsets.
    Partial { start: u64, end: u64 },
    Unsatisfiable,
}

impl RangeRequest {
    /// Interpret a `Range` header value against a body of `size` bytes.
    ///
    /// Only a single `bytes=` range is honoured. Multiple ranges and anything that
    /// does not parse fall back to [`RangeRequest::Full`].
    pub(crate) fn parse(header: Option<&str>, size: u64) -> Self {
        let Some(ranges) = header.and_then(|h| h.trim().strip_prefix("bytes=")) else {
            return Self::Full;
        };
        if ranges.contains(',') {
            return Self::Full;
        }
        let Some((first, last)) = ranges.trim().split_once('-') else {
            return Self::Full;
        };
        let (first, last) = (first.trim(), last.trim());

        if first.is_empty() {
            let Ok(suffix) = last.parse::<u64>() else {
                return Self::Full;
            };
            if suffix == 0 || size == 0 {
                return Self::Unsatisfiable;
            }
            let len = suffix.min(size);
            return Self::Partial {
                start: size - len,
                end: size - 1,
            };
        }

        let Ok(start) = first.parse::<u64>() else {
            return Self::Full;
        };
        let end = if last.is_empty() {
            None
        } else {
            match last.parse::<u64>() {
                Ok(end) if end >= start => Some(end),
                _ => return Self::Full,
            }
        };
        if start >= size {
            return Self::Unsatisfiable;
        }
        Self::Partial {
            start,
            end: end.map_or(size - 1, |end| end.min(size - 1)),
        }
    }
}
