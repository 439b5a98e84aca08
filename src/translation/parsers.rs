fn starts_with_at(bytes: &[u8], idx: usize, pattern: &[u8]) -> bool {
    bytes.get(idx..).is_some_and(|rest| rest.starts_with(pattern))
}

pub(super) fn is_line_comment_start(bytes: &[u8], idx: usize) -> bool {
    starts_with_at(bytes, idx, b"--")
}

pub(super) fn is_block_comment_start(bytes: &[u8], idx: usize) -> bool {
    starts_with_at(bytes, idx, b"/*")
}

pub(super) fn is_block_comment_end(bytes: &[u8], idx: usize) -> bool {
    starts_with_at(bytes, idx, b"*/")
}

/// Recognise `$tag$` (or `$$`) at `start`; returns the tag and the index of the closing `$`.
pub(super) fn try_start_dollar_quote(bytes: &[u8], start: usize) -> Option<(String, usize)> {
    let body_start = start + 1;
    let len = bytes
        .get(body_start..)?
        .iter()
        .position(|b| !(b.is_ascii_alphanumeric() || *b == b'_'))?;
    let close = body_start + len;
    if bytes.get(close) != Some(&b'$') {
        return None;
    }
    // `$1` style parameters are not dollar quotes.
    if len > 0 && bytes[body_start].is_ascii_digit() {
        return None;
    }
    let tag = std::str::from_utf8(&bytes[body_start..close]).ok()?;
    Some((tag.to_owned(), close))
}

/// True when the closing `$tag$` starts at `idx`.
pub(super) fn matches_tag(bytes: &[u8], idx: usize, tag: &str) -> bool {
    let end = idx + 1 + tag.len();
    bytes.get(idx) == Some(&b'$')
        && starts_with_at(bytes, idx + 1, tag.as_bytes())
        && bytes.get(end) == Some(&b'$')
}
