use std::str;

pub const MAX_INPUT_SIZE: usize = 256 * 1024;

/// `data` capped at `MAX_INPUT_SIZE`.
#[inline]
pub fn cap(data: &[u8]) -> &[u8] {
    &data[..data.len().min(MAX_INPUT_SIZE)]
}

/// UTF-8 view of `data` capped at `MAX_INPUT_SIZE`. Trims up to 3 bytes if the cap
/// splits a multibyte codepoint.
#[inline]
pub fn truncate_utf8(data: &[u8]) -> Option<&str> {
    let capped = cap(data);
    (0..=3usize.min(capped.len()))
        .find_map(|trim| str::from_utf8(&capped[..capped.len() - trim]).ok())
}
