//! SQL DDL generation.
//!
//! Renders a [`Schema`] as `CREATE TABLE` statements for one dialect, followed
//! by one `CREATE INDEX` per foreign key column. All dialect differences come
//! from [`SqlDialect::profile`].

use crate::core::auto_layout::dependency_order;
use crate::core::dialect::{SerialKind, SqlDialect};
use crate::core::schema::{Entity, Field, Schema};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Order of the `CREATE TABLE` statements
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableOrder {
    /// Schema order, as the user arranged it
    #[default]
    Insertion,
    /// Referenced tables before the tables that point at them
    Dependencies,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    pub sql_dialect: SqlDialect,
    /// Emit `-- Position: (x, y)` before each table so a re-import keeps the layout
    pub include_positions: bool,
    /// Emit `DROP TABLE IF EXISTS` for every table first, in reverse creation order
    pub include_drop_statements: bool,
    pub table_order: TableOrder,
}

impl ExportOptions {
    pub fn for_dialect(dialect: SqlDialect) -> Self {
        Self {
            sql_dialect: dialect,
            ..Default::default()
        }
    }
}

/// Generate DDL for `schema` in `dialect` with default options.
/// An empty schema yields an empty string.
pub fn generate(schema: &Schema, dialect: SqlDialect) -> String {
    SchemaExporter::export_sql(schema, &ExportOptions::for_dialect(dialect))
}

pub struct SchemaExporter;

impl SchemaExporter {
    /// Best-effort rendering: dangling relationships are left out and an
    /// entity without a primary key simply gets no key clause.
    pub fn export_sql(schema: &Schema, options: &ExportOptions) -> String {
        if schema.entities.is_empty() {
            return String::new();
        }

        let dialect = options.sql_dialect;
        let entities = Self::ordered_entities(schema, options.table_order);
        let mut sql = String::new();

        if options.include_drop_statements {
            for entity in entities.iter().rev() {
                let _ = writeln!(
                    sql,
                    "DROP TABLE IF EXISTS {};",
                    dialect.quote_identifier(&entity.name)
                );
            }
            sql.push('\n');
        }

        for entity in &entities {
            if options.include_positions {
                let _ = writeln!(
                    sql,
                    "-- Position: ({}, {})",
                    entity.position.x, entity.position.y
                );
            }
            Self::write_table(&mut sql, schema, entity, dialect);
        }

        for entity in &entities {
            let indexed: Vec<&Field> = entity
                .fields
                .iter()
                .filter(|f| Self::is_foreign_key_column(schema, entity, f))
                .collect();
            if indexed.is_empty() {
                continue;
            }
            for field in indexed {
                let _ = writeln!(
                    sql,
                    "CREATE INDEX {} ON {}({});",
                    dialect.quote_identifier(&index_name(&entity.name, &field.name)),
                    dialect.quote_identifier(&entity.name),
                    dialect.quote_identifier(&field.name)
                );
            }
            sql.push('\n');
        }

        sql
    }

    fn ordered_entities(schema: &Schema, order: TableOrder) -> Vec<&Entity> {
        match order {
            TableOrder::Insertion => schema.entities.iter().collect(),
            TableOrder::Dependencies => match dependency_order(schema) {
                Some(indices) => indices.into_iter().map(|i| &schema.entities[i]).collect(),
                None => {
                    tracing::warn!(
                        "Foreign keys form a cycle, exporting tables in schema order"
                    );
                    schema.entities.iter().collect()
                }
            },
        }
    }

    fn write_table(sql: &mut String, schema: &Schema, entity: &Entity, dialect: SqlDialect) {
        let profile = dialect.profile();
        let key_count = entity.primary_keys().count();
        let mut lines = Vec::with_capacity(entity.fields.len() + 1);

        for field in &entity.fields {
            let sole_key = field.is_primary_key && key_count == 1;
            let serial_key = profile.serial_key.filter(|_| {
                sole_key && SerialKind::from_type(&field.data_type) == Some(SerialKind::Serial)
            });
            let data_type = match serial_key {
                Some((data_type, _)) => data_type.to_string(),
                None => dialect.render_type(&field.data_type),
            };

            let mut line = format!("  {} {}", dialect.quote_identifier(&field.name), data_type);
            if sole_key {
                line.push_str(" PRIMARY KEY");
                if let Some((_, clause)) = serial_key {
                    line.push(' ');
                    line.push_str(clause);
                }
            }
            if field.is_not_null {
                line.push_str(" NOT NULL");
            }
            if field.is_unique {
                line.push_str(" UNIQUE");
            }
            if let Some(default) = field.default_value.as_deref().filter(|v| !v.trim().is_empty()) {
                line.push_str(" DEFAULT ");
                line.push_str(default.trim());
            }
            lines.push(line);
        }

        if key_count > 1 {
            let columns: Vec<String> = entity
                .primary_keys()
                .map(|f| dialect.quote_identifier(&f.name))
                .collect();
            lines.push(format!("  PRIMARY KEY ({})", columns.join(", ")));
        }

        for rel in schema.incoming_foreign_keys(&entity.id) {
            let Some(((parent, parent_field), (_, child_field))) = schema.resolve(rel) else {
                continue;
            };
            let mut line = format!(
                "  FOREIGN KEY ({}) REFERENCES {}({})",
                dialect.quote_identifier(&child_field.name),
                dialect.quote_identifier(&parent.name),
                dialect.quote_identifier(&parent_field.name)
            );
            if let Some(suffix) = profile.foreign_key_suffix {
                line.push(' ');
                line.push_str(suffix);
            }
            lines.push(line);
        }

        let _ = write!(
            sql,
            "CREATE TABLE {} (\n{}\n);\n\n",
            dialect.quote_identifier(&entity.name),
            lines.join(",\n")
        );
    }

    fn is_foreign_key_column(schema: &Schema, entity: &Entity, field: &Field) -> bool {
        field.is_foreign_key
            || schema
                .incoming_foreign_keys(&entity.id)
                .any(|rel| rel.target_field_id == field.id && schema.resolve(rel).is_some())
    }
}

/// `idx_<table>_<field>`, lowercased, with anything but `[a-z0-9_]` folded to `_`
fn index_name(table: &str, field: &str) -> String {
    format!("idx_{}_{}", table, field)
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}
