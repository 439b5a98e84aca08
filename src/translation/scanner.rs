#[derive(Clone)]
pub(super) enum State {
    Normal,
    SingleQuoted,
    DoubleQuoted,
    BacktickQuoted,
    LineComment,
    BlockComment(u32),
    DollarQuoted(String),
}

pub(super) fn scan_digits(bytes: &[u8], start: usize) -> Option<(usize, &str)> {
    let mut idx = start;
    while idx < bytes.len() && bytes[idx].is_ascii_digit() {
        idx += 1;
    }
    if idx == start {
        None
    } else {
        std::str::from_utf8(&bytes[start..idx])
            .ok()
            .map(|digits| (idx, digits))
    }
}

/// Advance past a quoted section that closes on `quote`, treating a doubled quote as an
/// escaped one. Returns true when the section ends at `idx`.
pub(super) fn closes_quote(bytes: &[u8], idx: &mut usize, quote: u8) -> bool {
    if bytes[*idx] != quote {
        return false;
    }
    if bytes.get(*idx + 1) == Some(&quote) {
        *idx += 1;
        return false;
    }
    true
}
