//! Placeholder handling shared by every dialect.
//!
//! Statements are written with positional `?` placeholders (optionally numbered, `?2`).
//! PostgreSQL needs `$N`; the other engines take `?` natively. The same scanner drives
//! client-side interpolation in [`crate::dialect::interpolate`].

use std::borrow::Cow;
use std::convert::Infallible;

mod parsers;
mod scanner;

use parsers::{
    is_block_comment_end, is_block_comment_start, is_line_comment_start, matches_tag,
    try_start_dollar_quote,
};
use scanner::{State, closes_quote, scan_digits};

use crate::types::EngineKind;

/// Target placeholder style for translation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaceholderStyle {
    /// PostgreSQL-style placeholders like `$1`.
    Postgres,
    /// Positional `?` placeholders (MySQL, `SQLite`, `LibSQL`).
    Question,
}

impl PlaceholderStyle {
    #[must_use]
    pub fn for_engine(kind: EngineKind) -> Self {
        match kind {
            EngineKind::Postgres => PlaceholderStyle::Postgres,
            EngineKind::Mysql | EngineKind::Sqlite | EngineKind::Libsql => {
                PlaceholderStyle::Question
            }
        }
    }
}

/// Translate `?` / `?N` placeholders into the target style.
///
/// Bare `?` placeholders are numbered left to right. Quoted strings, quoted identifiers,
/// comments and dollar-quoted blocks are left untouched. Returns a borrowed `Cow` when no
/// changes are needed.
#[must_use]
pub fn translate_placeholders(sql: &str, target: PlaceholderStyle) -> Cow<'_, str> {
    if matches!(target, PlaceholderStyle::Question) {
        return Cow::Borrowed(sql);
    }
    let rewritten: Result<_, Infallible> =
        rewrite_placeholders(sql, |ordinal| Ok(format!("${ordinal}")));
    match rewritten {
        Ok(cow) => cow,
        Err(never) => match never {},
    }
}

/// Count the placeholders a statement expects (the highest ordinal seen).
#[must_use]
pub fn count_placeholders(sql: &str) -> usize {
    let mut highest = 0;
    let _: Result<_, Infallible> = rewrite_placeholders(sql, |ordinal| {
        highest = highest.max(ordinal);
        Ok(String::new())
    });
    highest
}

/// Walk `sql` and replace every placeholder with the output of `replace(ordinal)`.
///
/// Ordinals are 1-based: explicit for `?N`, sequential for bare `?`.
pub(crate) fn rewrite_placeholders<E>(
    sql: &str,
    mut replace: impl FnMut(usize) -> Result<String, E>,
) -> Result<Cow<'_, str>, E> {
    let mut out: Option<String> = None;
    let mut copied_to = 0;
    let mut next_ordinal = 1;
    let mut state = State::Normal;
    let mut idx = 0;
    let bytes = sql.as_bytes();

    while idx < bytes.len() {
        let b = bytes[idx];
        match state {
            State::Normal => match b {
                b'\'' => state = State::SingleQuoted,
                b'"' => state = State::DoubleQuoted,
                b'`' => state = State::BacktickQuoted,
                _ if is_line_comment_start(bytes, idx) => state = State::LineComment,
                _ if is_block_comment_start(bytes, idx) => state = State::BlockComment(1),
                b'$' => {
                    if let Some((tag, advance)) = try_start_dollar_quote(bytes, idx) {
                        state = State::DollarQuoted(tag);
                        idx = advance;
                    }
                }
                b'?' => {
                    let (end, ordinal) = match scan_digits(bytes, idx + 1) {
                        Some((digits_end, digits)) => {
                            (digits_end, digits.parse::<usize>().unwrap_or(next_ordinal))
                        }
                        None => {
                            let ordinal = next_ordinal;
                            next_ordinal += 1;
                            (idx + 1, ordinal)
                        }
                    };
                    let replacement = replace(ordinal)?;
                    let buf = out.get_or_insert_with(|| String::with_capacity(sql.len() + 16));
                    buf.push_str(&sql[copied_to..idx]);
                    buf.push_str(&replacement);
                    copied_to = end;
                    idx = end;
                    continue;
                }
                _ => {}
            },
            State::SingleQuoted => {
                if b == b'\\' {
                    // MySQL-style backslash escape; harmless for the other dialects here.
                    idx += 1;
                } else if closes_quote(bytes, &mut idx, b'\'') {
                    state = State::Normal;
                }
            }
            State::DoubleQuoted => {
                if closes_quote(bytes, &mut idx, b'"') {
                    state = State::Normal;
                }
            }
            State::BacktickQuoted => {
                if closes_quote(bytes, &mut idx, b'`') {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if b == b'\n' {
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if is_block_comment_start(bytes, idx) {
                    state = State::BlockComment(depth + 1);
                    idx += 1;
                } else if is_block_comment_end(bytes, idx) {
                    idx += 1;
                    if depth == 1 {
                        state = State::Normal;
                    } else {
                        state = State::BlockComment(depth - 1);
                    }
                }
            }
            State::DollarQuoted(ref tag) => {
                if b == b'$' && matches_tag(bytes, idx, tag) {
                    let tag_len = tag.len();
                    state = State::Normal;
                    idx += tag_len + 1;
                }
            }
        }
        idx += 1;
    }

    Ok(match out {
        Some(mut buf) => {
            buf.push_str(&sql[copied_to..]);
            Cow::Owned(buf)
        }
        None => Cow::Borrowed(sql),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_bare_placeholders_for_postgres() {
        let sql = "insert into t (a, b) values (?, ?), (?, ?)";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres);
        assert_eq!(res, "insert into t (a, b) values ($1, $2), ($3, $4)");
    }

    #[test]
    fn keeps_explicit_ordinals() {
        let sql = "select * from t where a = ?2 and b = ?1";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres);
        assert_eq!(res, "select * from t where a = $2 and b = $1");
    }

    #[test]
    fn skips_inside_literals_and_comments() {
        let sql = "select '?', \"a?\", `b?` -- ?\n/* ? /* ? */ ? */ from t where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres);
        assert_eq!(
            res,
            "select '?', \"a?\", `b?` -- ?\n/* ? /* ? */ ? */ from t where a = $1"
        );
    }

    #[test]
    fn skips_dollar_quoted_blocks() {
        let sql = "$foo$ select ? from t $foo$ where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres);
        assert_eq!(res, "$foo$ select ? from t $foo$ where a = $1");
    }

    #[test]
    fn only_postgres_gets_numbered_placeholders() {
        assert_eq!(
            PlaceholderStyle::for_engine(EngineKind::Postgres),
            PlaceholderStyle::Postgres
        );
        for kind in [EngineKind::Mysql, EngineKind::Sqlite, EngineKind::Libsql] {
            assert_eq!(PlaceholderStyle::for_engine(kind), PlaceholderStyle::Question);
        }
    }

    #[test]
    fn question_style_is_borrowed() {
        let sql = "select * from t where a = ?";
        let res = translate_placeholders(sql, PlaceholderStyle::Question);
        assert!(matches!(res, Cow::Borrowed(_)));
    }

    #[test]
    fn preserves_multibyte_text() {
        let sql = "select 'héllo', ? from t where name = 'ünï?'";
        let res = translate_placeholders(sql, PlaceholderStyle::Postgres);
        assert_eq!(res, "select 'héllo', $1 from t where name = 'ünï?'");
    }

    #[test]
    fn counts_placeholders() {
        assert_eq!(count_placeholders("select 1"), 0);
        assert_eq!(count_placeholders("values (?, ?, '?')"), 2);
        assert_eq!(count_placeholders("values (?3, ?1)"), 3);
    }
}
