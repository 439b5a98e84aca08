use crate::dialect::{escape_identifier, escape_identifier_list};
use crate::error::SqlUnifyError;
use crate::schema::{Column, ForeignKey, IndexKind};
use crate::statement::Statement;
use crate::types::EngineKind;

use super::{require_name, require_names};

/// Split `schema.table` into its qualifier and the bare table name.
fn split_qualified(name: &str) -> (Option<&str>, &str) {
    match name.rsplit_once('.') {
        Some((schema, table)) => (Some(schema), table),
        None => (None, name),
    }
}

/// Deterministic foreign-key constraint name: `fk_{table}_{column}_{reftable}_{refcolumn}`.
///
/// Schema qualifiers are not part of the name.
#[must_use]
pub fn foreign_key_name(table: &str, column: &str, foreign_key: &ForeignKey) -> String {
    let (_, table) = split_qualified(table);
    let (_, ref_table) = split_qualified(&foreign_key.table);
    format!("fk_{table}_{column}_{ref_table}_{}", foreign_key.column)
}

/// Deterministic index name: `{idx|uniq}_{table}_{field…}`, without any schema qualifier.
#[must_use]
pub fn index_name<S: AsRef<str>>(table: &str, fields: &[S], kind: IndexKind) -> String {
    let (_, table) = split_qualified(table);
    let mut name = format!("{}_{table}", kind.name_prefix());
    for field in fields {
        name.push('_');
        name.push_str(field.as_ref());
    }
    name
}

/// Build CREATE TABLE plus one CREATE UNIQUE INDEX per unique column.
///
/// Column defaults are not inlined: each becomes a `DEFAULT ?` placeholder whose value is
/// appended, in column order, to the first statement's parameters. An empty
/// `primary_key` produces a table without a PRIMARY KEY clause. `table_options` of `None`
/// falls back to the engine's default options.
///
/// # Errors
/// Returns [`SqlUnifyError::ValidationError`] for an empty table or column name, a table
/// with no columns, or a primary-key column that is not among `columns`.
pub fn build_create_table<S: AsRef<str>>(
    kind: EngineKind,
    name: &str,
    columns: &[Column],
    primary_key: &[S],
    table_options: Option<&str>,
) -> Result<Vec<Statement>, SqlUnifyError> {
    require_name("table", name)?;
    if columns.is_empty() {
        return Err(SqlUnifyError::ValidationError(format!(
            "table {name} needs at least one column"
        )));
    }
    for column in columns {
        require_name("column", &column.name)?;
    }
    for key in primary_key {
        let key = key.as_ref();
        if !columns.iter().any(|c| c.name == key) {
            return Err(SqlUnifyError::ValidationError(format!(
                "primary key column {key} is not a column of {name}"
            )));
        }
    }

    let mut definitions = Vec::with_capacity(columns.len() + 1);
    let mut params = Vec::new();
    for column in columns {
        let mut def = format!(
            "{} {}",
            escape_identifier(kind, &column.name),
            column.sql_type
        );
        if !column.nullable {
            def.push_str(" NOT NULL");
        }
        if let Some(default) = &column.default {
            def.push_str(" DEFAULT ?");
            params.push(default.clone());
        }
        definitions.push(def);
    }

    if !primary_key.is_empty() {
        definitions.push(format!(
            "PRIMARY KEY ({})",
            escape_identifier_list(kind, primary_key)
        ));
    }

    for column in columns {
        if let Some(fk) = &column.foreign_key {
            require_name("referenced table", &fk.table)?;
            require_name("referenced column", &fk.column)?;
            // SQLite parents must live in the child's database and are named unqualified.
            let referenced = if kind.is_sqlite_family() {
                split_qualified(&fk.table).1
            } else {
                fk.table.as_str()
            };
            let mut constraint = format!(
                "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {} ({})",
                escape_identifier(kind, &foreign_key_name(name, &column.name, fk)),
                escape_identifier(kind, &column.name),
                escape_identifier(kind, referenced),
                escape_identifier(kind, &fk.column),
            );
            if let Some(action) = fk.on_update {
                constraint.push_str(" ON UPDATE ");
                constraint.push_str(action.as_sql());
            }
            if let Some(action) = fk.on_delete {
                constraint.push_str(" ON DELETE ");
                constraint.push_str(action.as_sql());
            }
            definitions.push(constraint);
        }
    }

    let mut sql = format!(
        "CREATE TABLE {} ({})",
        escape_identifier(kind, name),
        definitions.join(", ")
    );
    let options = table_options.unwrap_or(kind.default_table_options()).trim();
    if !options.is_empty() {
        sql.push(' ');
        sql.push_str(options);
    }

    let mut statements = vec![Statement::new(sql, params)];
    for column in columns.iter().filter(|c| c.unique) {
        statements.push(build_create_index(
            kind,
            name,
            &[column.name.as_str()],
            IndexKind::Unique,
        )?);
    }
    Ok(statements)
}

/// Build CREATE [UNIQUE] INDEX for `fields` of `table`.
///
/// For a qualified `schema.table` the `SQLite` family qualifies the index name and names
/// the table bare; the other engines qualify the table.
///
/// Engines without `IF NOT EXISTS` support for indexes get a failure-tolerant statement
/// instead, so re-running it inside a transaction is harmless.
///
/// # Errors
/// Returns [`SqlUnifyError::ValidationError`] when `fields` is empty or a name is blank.
pub fn build_create_index<S: AsRef<str>>(
    kind: EngineKind,
    table: &str,
    fields: &[S],
    index_kind: IndexKind,
) -> Result<Statement, SqlUnifyError> {
    require_name("table", table)?;
    if fields.is_empty() {
        return Err(SqlUnifyError::ValidationError(format!(
            "index on {table} needs at least one field"
        )));
    }
    require_names("index field", fields)?;

    let if_not_exists = if kind.supports_index_if_not_exists() {
        " IF NOT EXISTS"
    } else {
        ""
    };
    let index = index_name(table, fields, index_kind);
    let (index, target) = match split_qualified(table) {
        (Some(schema), bare) if kind.is_sqlite_family() => (format!("{schema}.{index}"), bare),
        _ => (index, table),
    };
    let sql = format!(
        "{}{if_not_exists} {} ON {} ({})",
        index_kind.create_keyword(),
        escape_identifier(kind, &index),
        escape_identifier(kind, target),
        escape_identifier_list(kind, fields)
    );
    let statement = Statement::without_params(sql);
    Ok(if kind.supports_index_if_not_exists() {
        statement
    } else {
        statement.tolerant()
    })
}

/// One `DROP TABLE IF EXISTS` per table.
///
/// # Errors
/// Returns [`SqlUnifyError::ValidationError`] for an empty list or a blank name.
pub fn build_drop_table<S: AsRef<str>>(
    kind: EngineKind,
    tables: &[S],
) -> Result<Vec<Statement>, SqlUnifyError> {
    per_table(tables, |table| {
        format!("DROP TABLE IF EXISTS {}", escape_identifier(kind, table))
    })
}

/// One TRUNCATE per table; the `SQLite` family has no TRUNCATE and deletes every row instead.
///
/// # Errors
/// Returns [`SqlUnifyError::ValidationError`] for an empty list or a blank name.
pub fn build_truncate<S: AsRef<str>>(
    kind: EngineKind,
    tables: &[S],
) -> Result<Vec<Statement>, SqlUnifyError> {
    per_table(tables, |table| {
        let table = escape_identifier(kind, table);
        if kind.is_sqlite_family() {
            format!("DELETE FROM {table}")
        } else {
            format!("TRUNCATE TABLE {table}")
        }
    })
}

fn per_table<S: AsRef<str>>(
    tables: &[S],
    render: impl Fn(&str) -> String,
) -> Result<Vec<Statement>, SqlUnifyError> {
    if tables.is_empty() {
        return Err(SqlUnifyError::ValidationError(
            "at least one table name is required".into(),
        ));
    }
    require_names("table", tables)?;
    Ok(tables
        .iter()
        .map(|table| Statement::without_params(render(table.as_ref())))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ReferentialAction;
    use crate::types::RowValues;

    const NO_PK: &[&str] = &[];

    #[test]
    fn create_table_without_primary_key() {
        let cols = [
            Column::new("c1", "varchar(255)"),
            Column::new("c2", "integer"),
        ];
        let stmts = build_create_table(EngineKind::Sqlite, "t", &cols, NO_PK, None).unwrap();
        assert_eq!(stmts.len(), 1);
        assert_eq!(
            stmts[0].sql,
            r#"CREATE TABLE "t" ("c1" varchar(255), "c2" integer)"#
        );
        assert!(!stmts[0].sql.contains("PRIMARY KEY"));
    }

    #[test]
    fn defaults_are_bound_in_column_order() {
        let cols = [
            Column::new("id", "integer").not_null(),
            Column::new("name", "text").default("anon"),
            Column::new("score", "integer").default(7),
            Column::new("active", "boolean").default(true),
        ];
        let stmts =
            build_create_table(EngineKind::Postgres, "people", &cols, &["id"], None).unwrap();
        assert_eq!(
            stmts[0].sql,
            r#"CREATE TABLE "people" ("id" integer NOT NULL, "name" text DEFAULT ?, "score" integer DEFAULT ?, "active" boolean DEFAULT ?, PRIMARY KEY ("id"))"#
        );
        assert_eq!(
            stmts[0].params,
            vec![
                RowValues::Text("anon".into()),
                RowValues::Int(7),
                RowValues::Bool(true)
            ]
        );
    }

    #[test]
    fn mysql_gets_table_options_and_tolerant_unique_indexes() {
        let cols = [
            Column::new("id", "int"),
            Column::new("email", "varchar(255)").unique(),
        ];
        let stmts = build_create_table(EngineKind::Mysql, "users", &cols, &["id"], None).unwrap();
        assert_eq!(stmts.len(), 2);
        assert!(
            stmts[0]
                .sql
                .ends_with(") ENGINE=InnoDB DEFAULT CHARSET=utf8mb4")
        );
        assert_eq!(
            stmts[1].sql,
            "CREATE UNIQUE INDEX `uniq_users_email` ON `users` (`email`)"
        );
        assert!(stmts[1].tolerate_failure);

        let custom =
            build_create_table(EngineKind::Mysql, "users", &cols, &["id"], Some("")).unwrap();
        assert!(custom[0].sql.ends_with("PRIMARY KEY (`id`))"));
    }

    #[test]
    fn unique_index_uses_if_not_exists_where_supported() {
        let cols = [Column::new("email", "text").unique()];
        let stmts = build_create_table(EngineKind::Libsql, "u", &cols, NO_PK, None).unwrap();
        assert_eq!(
            stmts[1].sql,
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "uniq_u_email" ON "u" ("email")"#
        );
        assert!(!stmts[1].tolerate_failure);
    }

    #[test]
    fn foreign_keys_are_named_deterministically() {
        let cols = [Column::new("owner", "integer").references(
            ForeignKey::new("users", "id")
                .on_update(ReferentialAction::Cascade)
                .on_delete(ReferentialAction::SetNull),
        )];
        let stmts = build_create_table(EngineKind::Sqlite, "pets", &cols, NO_PK, None).unwrap();
        assert_eq!(
            stmts[0].sql,
            r#"CREATE TABLE "pets" ("owner" integer, CONSTRAINT "fk_pets_owner_users_id" FOREIGN KEY ("owner") REFERENCES "users" ("id") ON UPDATE CASCADE ON DELETE SET NULL)"#
        );
    }

    #[test]
    fn blank_column_name_is_rejected() {
        let cols = [Column::new("  ", "integer")];
        assert!(matches!(
            build_create_table(EngineKind::Sqlite, "t", &cols, NO_PK, None),
            Err(SqlUnifyError::ValidationError(_))
        ));
        let cols = [Column::new("a", "integer")];
        assert!(matches!(
            build_create_table(EngineKind::Sqlite, "t", &cols, &["b"], None),
            Err(SqlUnifyError::ValidationError(_))
        ));
    }

    #[test]
    fn composite_index_name() {
        let stmt =
            build_create_index(EngineKind::Postgres, "t", &["a", "b"], IndexKind::Index).unwrap();
        assert_eq!(
            stmt.sql,
            r#"CREATE INDEX IF NOT EXISTS "idx_t_a_b" ON "t" ("a", "b")"#
        );
        let empty: &[&str] = &[];
        assert!(build_create_index(EngineKind::Postgres, "t", empty, IndexKind::Index).is_err());
    }

    #[test]
    fn qualified_tables_keep_derived_names_bare() {
        let cols = [
            Column::new("id", "integer"),
            Column::new("email", "text").unique(),
            Column::new("org", "integer").references(ForeignKey::new("main.orgs", "id")),
        ];
        let stmts =
            build_create_table(EngineKind::Sqlite, "main.users", &cols, NO_PK, None).unwrap();
        assert!(stmts[0].sql.starts_with(r#"CREATE TABLE "main"."users" ("#));
        assert!(
            stmts[0]
                .sql
                .contains(r#"CONSTRAINT "fk_users_org_orgs_id" FOREIGN KEY ("org") REFERENCES "orgs" ("id")"#)
        );
        assert_eq!(
            stmts[1].sql,
            r#"CREATE UNIQUE INDEX IF NOT EXISTS "main"."uniq_users_email" ON "users" ("email")"#
        );

        let pg = build_create_index(EngineKind::Postgres, "app.users", &["id"], IndexKind::Index)
            .unwrap();
        assert_eq!(
            pg.sql,
            r#"CREATE INDEX IF NOT EXISTS "idx_users_id" ON "app"."users" ("id")"#
        );
        let my = build_create_index(EngineKind::Mysql, "app.users", &["id"], IndexKind::Unique)
            .unwrap();
        assert_eq!(my.sql, "CREATE UNIQUE INDEX `uniq_users_id` ON `app`.`users` (`id`)");
    }

    #[test]
    fn drop_and_truncate_per_dialect() {
        let drops = build_drop_table(EngineKind::Mysql, &["a", "b"]).unwrap();
        assert_eq!(drops[0].sql, "DROP TABLE IF EXISTS `a`");
        assert_eq!(drops[1].sql, "DROP TABLE IF EXISTS `b`");

        let sqlite = build_truncate(EngineKind::Sqlite, &["t"]).unwrap();
        assert_eq!(sqlite[0].sql, r#"DELETE FROM "t""#);
        let pg = build_truncate(EngineKind::Postgres, &["t"]).unwrap();
        assert_eq!(pg[0].sql, r#"TRUNCATE TABLE "t""#);
    }
}
