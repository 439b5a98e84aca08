use crate::dialect::escape_identifier;
use crate::statement::Statement;
use crate::types::{EngineKind, RowValues};

/// Column alias every catalog query uses for the table name.
pub const TABLE_NAME_COLUMN: &str = "table_name";

/// Catalog query listing base tables.
///
/// `database` selects the MySQL database, the `PostgreSQL` schema (default `public`) or an
/// attached `SQLite` database; `None` means the current one.
#[must_use]
pub fn build_list_tables(kind: EngineKind, database: Option<&str>) -> Statement {
    match kind {
        EngineKind::Mysql => Statement::new(
            "SELECT table_name AS table_name FROM information_schema.tables \
             WHERE table_schema = COALESCE(?, DATABASE()) AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            vec![database.map_or(RowValues::Null, RowValues::from)],
        ),
        EngineKind::Postgres => Statement::new(
            "SELECT table_name::text AS table_name FROM information_schema.tables \
             WHERE table_schema::text = ? AND table_type = 'BASE TABLE' \
             ORDER BY table_name",
            vec![RowValues::from(database.unwrap_or("public"))],
        ),
        EngineKind::Sqlite | EngineKind::Libsql => {
            let master = match database {
                Some(db) => format!("{}.sqlite_master", escape_identifier(kind, db)),
                None => "sqlite_master".to_string(),
            };
            Statement::without_params(format!(
                "SELECT name AS table_name FROM {master} \
                 WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name"
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqlite_catalog_skips_internal_tables() {
        let stmt = build_list_tables(EngineKind::Sqlite, None);
        assert!(stmt.sql.contains("FROM sqlite_master"));
        assert!(stmt.sql.contains("NOT LIKE 'sqlite_%'"));
        assert!(stmt.params.is_empty());

        let attached = build_list_tables(EngineKind::Libsql, Some("aux"));
        assert!(attached.sql.contains(r#"FROM "aux".sqlite_master"#));
    }

    #[test]
    fn network_catalogs_bind_the_database() {
        let my = build_list_tables(EngineKind::Mysql, None);
        assert_eq!(my.params, vec![RowValues::Null]);
        let pg = build_list_tables(EngineKind::Postgres, None);
        assert_eq!(pg.params, vec![RowValues::Text("public".into())]);
        let named = build_list_tables(EngineKind::Postgres, Some("app"));
        assert_eq!(named.params, vec![RowValues::Text("app".into())]);
    }
}
