use std::fmt::Write;

use crate::types::{EngineKind, RowValues};

/// Render `value` as a SQL literal for `kind`.
#[must_use]
pub fn escape_literal(kind: EngineKind, value: &RowValues) -> String {
    match value {
        RowValues::Null => "NULL".to_string(),
        RowValues::Int(i) => i.to_string(),
        RowValues::Float(f) if f.is_finite() => format!("{f:?}"),
        RowValues::Float(_) => "NULL".to_string(),
        RowValues::Bool(b) => match kind {
            EngineKind::Mysql | EngineKind::Postgres => {
                (if *b { "TRUE" } else { "FALSE" }).to_string()
            }
            EngineKind::Sqlite | EngineKind::Libsql => i64::from(*b).to_string(),
        },
        RowValues::Text(s) => quote_string(kind, s),
        RowValues::Timestamp(dt) => quote_string(kind, &dt.format("%F %T%.f").to_string()),
        RowValues::JSON(json) => quote_string(kind, &json.to_string()),
        RowValues::Blob(bytes) => blob_literal(kind, bytes),
    }
}

fn quote_string(kind: EngineKind, s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 3);
    match kind {
        EngineKind::Mysql => {
            out.push('\'');
            for ch in s.chars() {
                match ch {
                    '\0' => out.push_str("\\0"),
                    '\u{8}' => out.push_str("\\b"),
                    '\t' => out.push_str("\\t"),
                    '\n' => out.push_str("\\n"),
                    '\r' => out.push_str("\\r"),
                    '\u{1a}' => out.push_str("\\Z"),
                    '\'' => out.push_str("\\'"),
                    '"' => out.push_str("\\\""),
                    '\\' => out.push_str("\\\\"),
                    other => out.push(other),
                }
            }
            out.push('\'');
        }
        EngineKind::Postgres => {
            if s.contains('\\') {
                out.push('E');
            }
            out.push('\'');
            for ch in s.chars() {
                match ch {
                    '\'' => out.push_str("''"),
                    '\\' => out.push_str("\\\\"),
                    other => out.push(other),
                }
            }
            out.push('\'');
        }
        EngineKind::Sqlite | EngineKind::Libsql => {
            out.push('\'');
            for ch in s.chars() {
                if ch == '\'' {
                    out.push('\'');
                }
                out.push(ch);
            }
            out.push('\'');
        }
    }
    out
}

fn blob_literal(kind: EngineKind, bytes: &[u8]) -> String {
    let mut hex = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(hex, "{byte:02X}");
    }
    match kind {
        EngineKind::Postgres => format!("'\\x{hex}'::bytea"),
        EngineKind::Mysql | EngineKind::Sqlite | EngineKind::Libsql => format!("X'{hex}'"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn strings_per_dialect() {
        let text = RowValues::Text("O'Reilly \\ co".into());
        assert_eq!(
            escape_literal(EngineKind::Mysql, &text),
            "'O\\'Reilly \\\\ co'"
        );
        assert_eq!(
            escape_literal(EngineKind::Postgres, &text),
            "E'O''Reilly \\\\ co'"
        );
        assert_eq!(
            escape_literal(EngineKind::Sqlite, &text),
            "'O''Reilly \\ co'"
        );
        assert_eq!(
            escape_literal(EngineKind::Postgres, &RowValues::Text("plain".into())),
            "'plain'"
        );
    }

    #[test]
    fn scalars_and_blobs() {
        assert_eq!(escape_literal(EngineKind::Sqlite, &RowValues::Bool(true)), "1");
        assert_eq!(escape_literal(EngineKind::Mysql, &RowValues::Bool(false)), "FALSE");
        assert_eq!(escape_literal(EngineKind::Libsql, &RowValues::Null), "NULL");
        assert_eq!(escape_literal(EngineKind::Mysql, &RowValues::Float(1.0)), "1.0");
        assert_eq!(
            escape_literal(EngineKind::Postgres, &RowValues::Float(f64::NAN)),
            "NULL"
        );
        let blob = RowValues::Blob(vec![0xde, 0xad, 0x01]);
        assert_eq!(escape_literal(EngineKind::Sqlite, &blob), "X'DEAD01'");
        assert_eq!(escape_literal(EngineKind::Postgres, &blob), "'\\xDEAD01'::bytea");
    }

    #[test]
    fn timestamps_are_quoted() {
        let dt = NaiveDate::from_ymd_opt(2024, 2, 29)
            .unwrap()
            .and_hms_opt(13, 5, 9)
            .unwrap();
        assert_eq!(
            escape_literal(EngineKind::Mysql, &RowValues::Timestamp(dt)),
            "'2024-02-29 13:05:09'"
        );
    }
}
