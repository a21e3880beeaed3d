//! Schema validation.
//!
//! Two layers:
//! - identifier rules for table and column names (length, characters, reserved words)
//! - [`SchemaValidator`], which checks a whole [`Schema`] against the structural
//!   invariants and collects every violation instead of stopping at the first one
//!
//! The validator runs at the commit boundary. Editing operations are permissive
//! and never call it themselves.

use crate::core::dialect::SqlDialect;
use crate::core::schema::{Entity, EntityId, FieldId, RelationshipId, Schema};
use std::collections::HashSet;
use std::sync::LazyLock;

/// Identifier length limit used when no dialect is specified (MySQL standard)
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Keywords that need quoting when used as identifiers.
/// Combined from the SQL standard, MySQL, PostgreSQL, SQLite and SQL Server.
static RESERVED_KEYWORDS: LazyLock<HashSet<&'static str>> = LazyLock::new(|| {
    [
        // SQL standard
        "ADD", "ALL", "ALTER", "AND", "ANY", "AS", "ASC", "BETWEEN", "BY", "CASE", "CHECK",
        "COLUMN", "CONSTRAINT", "CREATE", "CROSS", "CURRENT", "CURRENT_DATE", "CURRENT_TIME",
        "CURRENT_TIMESTAMP", "CURRENT_USER", "DATABASE", "DEFAULT", "DELETE", "DESC",
        "DISTINCT", "DROP", "ELSE", "END", "EXISTS", "FALSE", "FETCH", "FOR", "FOREIGN", "FROM",
        "FULL", "GRANT", "GROUP", "HAVING", "IF", "IN", "INDEX", "INNER", "INSERT", "INTO", "IS",
        "JOIN", "KEY", "LEFT", "LIKE", "LIMIT", "NOT", "NULL", "OFFSET", "ON", "OR", "ORDER",
        "OUTER", "PRIMARY", "REFERENCES", "RIGHT", "SELECT", "SET", "TABLE", "THEN", "TO",
        "TRUE", "UNION", "UNIQUE", "UPDATE", "USING", "VALUES", "WHEN", "WHERE", "WITH",
        // MySQL
        "AUTO_INCREMENT", "CHANGE", "COLLATE", "EXPLAIN", "FORCE", "IGNORE", "INTERVAL",
        "MODIFY", "PROCEDURE", "RENAME", "REPLACE", "SCHEMA", "SHOW", "TRIGGER", "TRUNCATE",
        "UNSIGNED", "VIEW", "ZEROFILL",
        // PostgreSQL
        "ANALYSE", "ANALYZE", "ARRAY", "ASYMMETRIC", "AUTHORIZATION", "BOTH", "CAST",
        "CONCURRENTLY", "DEFERRABLE", "DO", "EXCEPT", "FREEZE", "ILIKE", "INITIALLY",
        "INTERSECT", "ISNULL", "LATERAL", "LEADING", "LOCALTIME", "LOCALTIMESTAMP", "NATURAL",
        "NOTNULL", "ONLY", "OVERLAPS", "PLACING", "RETURNING", "SESSION_USER", "SIMILAR",
        "SOME", "SYMMETRIC", "TABLESAMPLE", "TRAILING", "VARIADIC", "VERBOSE", "WINDOW",
        // SQLite
        "AUTOINCREMENT", "PRAGMA", "VACUUM",
        // SQL Server
        "IDENTITY", "CLUSTERED", "NONCLUSTERED", "TOP", "TRAN", "TRANSACTION",
    ]
    .into_iter()
    .collect()
});

/// Identifier rule violations
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Identifier is empty
    Empty,
    /// Identifier is too long for the target dialect
    TooLong { max: usize, actual: usize },
    /// Identifier contains characters outside `[A-Za-z0-9_]`
    InvalidCharacters { invalid: Vec<char> },
    StartsWithDigit,
    /// Leading underscore (reserved for system use in some engines)
    StartsWithUnderscore,
    ReservedKeyword { keyword: String },
    /// Identifier contains only underscores/digits
    NoLetters,
    ConsecutiveUnderscores,
    EndsWithUnderscore,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationError::Empty => write!(f, "name cannot be empty"),
            ValidationError::TooLong { max, actual } => {
                write!(f, "name is too long ({} chars, max {})", actual, max)
            }
            ValidationError::InvalidCharacters { invalid } => {
                let chars: String = invalid.iter().collect();
                write!(
                    f,
                    "name contains invalid characters: '{}'. Only letters, numbers, and underscores are allowed",
                    chars
                )
            }
            ValidationError::StartsWithDigit => write!(f, "name cannot start with a digit"),
            ValidationError::StartsWithUnderscore => {
                write!(f, "name should not start with an underscore")
            }
            ValidationError::ReservedKeyword { keyword } => {
                write!(f, "'{}' is a reserved SQL keyword", keyword)
            }
            ValidationError::NoLetters => write!(f, "name must contain at least one letter"),
            ValidationError::ConsecutiveUnderscores => {
                write!(f, "name cannot contain consecutive underscores")
            }
            ValidationError::EndsWithUnderscore => {
                write!(f, "name should not end with an underscore")
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Identifier strictness
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum ValidationLevel {
    /// Empty, too long, invalid characters, leading digit, no letters.
    /// Reserved words only warn because the exporter quotes them.
    #[default]
    Minimal,
    /// Minimal + reserved keywords are errors
    Standard,
    /// Standard + style warnings become errors
    Strict,
}

/// Outcome of checking one identifier
#[derive(Debug, Clone, Default)]
pub struct IdentifierCheck {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationError>,
}

impl IdentifierCheck {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Check a table or column name. `max_length` of `None` disables the length rule.
pub fn validate_identifier(
    name: &str,
    level: ValidationLevel,
    max_length: Option<usize>,
) -> IdentifierCheck {
    let mut check = IdentifierCheck::default();

    let trimmed = name.trim();
    if trimmed.is_empty() {
        check.errors.push(ValidationError::Empty);
        return check;
    }

    if let Some(max) = max_length
        && trimmed.len() > max
    {
        check.errors.push(ValidationError::TooLong {
            max,
            actual: trimmed.len(),
        });
    }

    let invalid: Vec<char> = trimmed
        .chars()
        .filter(|c| !c.is_ascii_alphanumeric() && *c != '_')
        .collect();
    if !invalid.is_empty() {
        check
            .errors
            .push(ValidationError::InvalidCharacters { invalid });
    }

    if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        check.errors.push(ValidationError::StartsWithDigit);
    }

    if !trimmed.chars().any(|c| c.is_ascii_alphabetic()) {
        check.errors.push(ValidationError::NoLetters);
    }

    if is_reserved_keyword(trimmed) {
        let keyword = ValidationError::ReservedKeyword {
            keyword: trimmed.to_string(),
        };
        match level {
            ValidationLevel::Minimal => check.warnings.push(keyword),
            ValidationLevel::Standard | ValidationLevel::Strict => check.errors.push(keyword),
        }
    }

    let mut style = Vec::new();
    if trimmed.starts_with('_') {
        style.push(ValidationError::StartsWithUnderscore);
    }
    if trimmed.ends_with('_') {
        style.push(ValidationError::EndsWithUnderscore);
    }
    if trimmed.contains("__") {
        style.push(ValidationError::ConsecutiveUnderscores);
    }
    if level == ValidationLevel::Strict {
        check.errors.extend(style);
    } else {
        check.warnings.extend(style);
    }

    check
}

/// Check if a string is a reserved keyword
pub fn is_reserved_keyword(name: &str) -> bool {
    RESERVED_KEYWORDS.contains(name.to_uppercase().as_str())
}

/// Turn arbitrary text into a plain identifier. `None` if nothing usable is left.
pub fn sanitize_identifier(name: &str) -> Option<String> {
    let sanitized: String = name
        .trim()
        .chars()
        .filter_map(|c| match c {
            c if c.is_ascii_alphanumeric() || c == '_' => Some(c.to_ascii_lowercase()),
            ' ' | '-' => Some('_'),
            _ => None,
        })
        .collect();

    let sanitized = sanitized.trim_start_matches(|c: char| c.is_ascii_digit());

    let mut result = String::with_capacity(sanitized.len());
    for c in sanitized.chars() {
        if c == '_' && result.ends_with('_') {
            continue;
        }
        result.push(c);
    }
    let result = result.trim_matches('_');

    if !result.chars().any(|c| c.is_ascii_alphabetic()) {
        return None;
    }
    Some(result.chars().take(MAX_IDENTIFIER_LENGTH).collect())
}

// ============================================================================
// Schema Validator
// ============================================================================

/// Which end of a relationship an issue refers to
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RelationshipEnd {
    Source,
    Target,
}

impl std::fmt::Display for RelationshipEnd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationshipEnd::Source => write!(f, "source"),
            RelationshipEnd::Target => write!(f, "target"),
        }
    }
}

/// One structural problem in a schema. Entity and field labels are names,
/// or ids when the name is blank.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaIssue {
    DuplicateEntityId { id: EntityId },
    DuplicateEntityName { name: String },
    InvalidEntityName { entity: String, reason: ValidationError },
    DuplicateFieldId { entity: String, id: FieldId },
    EmptyFieldName { entity: String, field: FieldId },
    DuplicateFieldName { entity: String, name: String },
    MissingPrimaryKey { entity: String },
    DuplicateRelationshipId { id: RelationshipId },
    MissingRelationshipEntity {
        relationship: RelationshipId,
        end: RelationshipEnd,
        entity: EntityId,
    },
    MissingRelationshipField {
        relationship: RelationshipId,
        end: RelationshipEnd,
        entity: String,
        field: FieldId,
    },
    ForeignKeyWithoutReference { entity: String, field: String },
    UnresolvedReference {
        entity: String,
        field: String,
        table: String,
        referenced_field: String,
    },
    /// A stored `references` claim that the relationship list contradicts
    ForeignKeyMismatch {
        entity: String,
        field: String,
        claimed: String,
        derived: String,
    },
    /// Identifier style or reserved word findings that do not block a commit
    NameWarning { name: String, reason: ValidationError },
}

impl std::fmt::Display for SchemaIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SchemaIssue::DuplicateEntityId { id } => {
                write!(f, "Entity id '{}' is used more than once", id)
            }
            SchemaIssue::DuplicateEntityName { name } => {
                write!(f, "Table name '{}' is used more than once", name)
            }
            SchemaIssue::InvalidEntityName { entity, reason } => {
                write!(f, "Table '{}': {}", entity, reason)
            }
            SchemaIssue::DuplicateFieldId { entity, id } => {
                write!(f, "Table '{}': field id '{}' is used more than once", entity, id)
            }
            SchemaIssue::EmptyFieldName { entity, field } => {
                write!(f, "Table '{}': field '{}' has an empty name", entity, field)
            }
            SchemaIssue::DuplicateFieldName { entity, name } => {
                write!(f, "Table '{}': column '{}' is defined more than once", entity, name)
            }
            SchemaIssue::MissingPrimaryKey { entity } => {
                write!(f, "Table '{}' has no primary key", entity)
            }
            SchemaIssue::DuplicateRelationshipId { id } => {
                write!(f, "Relationship id '{}' is used more than once", id)
            }
            SchemaIssue::MissingRelationshipEntity {
                relationship,
                end,
                entity,
            } => write!(
                f,
                "Relationship '{}' references missing {} entity '{}'",
                relationship, end, entity
            ),
            SchemaIssue::MissingRelationshipField {
                relationship,
                end,
                entity,
                field,
            } => write!(
                f,
                "Relationship '{}' references missing {} field '{}' in table '{}'",
                relationship, end, field, entity
            ),
            SchemaIssue::ForeignKeyWithoutReference { entity, field } => write!(
                f,
                "Column '{}.{}' is marked as a foreign key but references nothing",
                entity, field
            ),
            SchemaIssue::UnresolvedReference {
                entity,
                field,
                table,
                referenced_field,
            } => write!(
                f,
                "Column '{}.{}' references '{}.{}', which does not exist",
                entity, field, table, referenced_field
            ),
            SchemaIssue::ForeignKeyMismatch {
                entity,
                field,
                claimed,
                derived,
            } => write!(
                f,
                "Column '{}.{}' claims to reference {}, but its relationships give {}",
                entity, field, claimed, derived
            ),
            SchemaIssue::NameWarning { name, reason } => write!(f, "'{}': {}", name, reason),
        }
    }
}

impl SchemaIssue {
    /// Issues about ids and relationship linkage, as opposed to naming and keys
    pub fn is_referential(&self) -> bool {
        matches!(
            self,
            SchemaIssue::DuplicateEntityId { .. }
                | SchemaIssue::DuplicateFieldId { .. }
                | SchemaIssue::DuplicateRelationshipId { .. }
                | SchemaIssue::MissingRelationshipEntity { .. }
                | SchemaIssue::MissingRelationshipField { .. }
                | SchemaIssue::ForeignKeyWithoutReference { .. }
                | SchemaIssue::UnresolvedReference { .. }
        )
    }
}

/// Full validation outcome
#[derive(Clone, Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<SchemaIssue>,
    pub warnings: Vec<SchemaIssue>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Error messages in check order
    pub fn messages(&self) -> Vec<String> {
        self.errors.iter().map(ToString::to_string).collect()
    }
}

/// Checks a schema against the structural invariants
#[derive(Clone, Copy, Debug, Default)]
pub struct SchemaValidator {
    dialect: Option<SqlDialect>,
    level: ValidationLevel,
}

impl SchemaValidator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply the identifier length limit of `dialect`
    pub fn for_dialect(dialect: SqlDialect) -> Self {
        Self {
            dialect: Some(dialect),
            level: ValidationLevel::default(),
        }
    }

    pub fn with_level(mut self, level: ValidationLevel) -> Self {
        self.level = level;
        self
    }

    fn max_identifier_length(&self) -> Option<usize> {
        match self.dialect {
            Some(dialect) => dialect.profile().max_identifier_length,
            None => Some(MAX_IDENTIFIER_LENGTH),
        }
    }

    pub fn validate(&self, schema: &Schema) -> ValidationReport {
        let mut report = ValidationReport::default();

        self.check_entities(schema, &mut report);
        for entity in &schema.entities {
            self.check_fields(entity, &mut report);
        }
        self.check_relationships(schema, &mut report);
        self.check_references(schema, &mut report);

        report
    }

    fn check_entities(&self, schema: &Schema, report: &mut ValidationReport) {
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        let mut reported_names = HashSet::new();

        for entity in &schema.entities {
            if !ids.insert(&entity.id) {
                report.errors.push(SchemaIssue::DuplicateEntityId {
                    id: entity.id.clone(),
                });
            }

            let check = validate_identifier(&entity.name, self.level, self.max_identifier_length());
            for reason in check.errors {
                report.errors.push(SchemaIssue::InvalidEntityName {
                    entity: entity.label().to_string(),
                    reason,
                });
            }
            for reason in check.warnings {
                report.warnings.push(SchemaIssue::NameWarning {
                    name: entity.name.clone(),
                    reason,
                });
            }

            let key = entity.name.trim().to_lowercase();
            if !key.is_empty() && !names.insert(key.clone()) && reported_names.insert(key) {
                report.errors.push(SchemaIssue::DuplicateEntityName {
                    name: entity.name.clone(),
                });
            }
        }
    }

    fn check_fields(&self, entity: &Entity, report: &mut ValidationReport) {
        let table = entity.label().to_string();
        let mut ids = HashSet::new();
        let mut names = HashSet::new();
        let mut reported_names = HashSet::new();

        for field in &entity.fields {
            if !ids.insert(&field.id) {
                report.errors.push(SchemaIssue::DuplicateFieldId {
                    entity: table.clone(),
                    id: field.id.clone(),
                });
            }

            let key = field.name.trim().to_lowercase();
            if key.is_empty() {
                report.errors.push(SchemaIssue::EmptyFieldName {
                    entity: table.clone(),
                    field: field.id.clone(),
                });
            } else if !names.insert(key.clone()) && reported_names.insert(key) {
                report.errors.push(SchemaIssue::DuplicateFieldName {
                    entity: table.clone(),
                    name: field.name.clone(),
                });
            }
        }

        if entity.primary_keys().next().is_none() {
            report
                .errors
                .push(SchemaIssue::MissingPrimaryKey { entity: table });
        }
    }

    fn check_relationships(&self, schema: &Schema, report: &mut ValidationReport) {
        let mut ids = HashSet::new();

        for rel in &schema.relationships {
            if !ids.insert(&rel.id) {
                report.errors.push(SchemaIssue::DuplicateRelationshipId {
                    id: rel.id.clone(),
                });
            }

            let ends = [
                (RelationshipEnd::Source, &rel.source_entity_id, &rel.source_field_id),
                (RelationshipEnd::Target, &rel.target_entity_id, &rel.target_field_id),
            ];
            for (end, entity_id, field_id) in ends {
                match schema.entity(entity_id) {
                    None => report.errors.push(SchemaIssue::MissingRelationshipEntity {
                        relationship: rel.id.clone(),
                        end,
                        entity: entity_id.clone(),
                    }),
                    Some(entity) if entity.field(field_id).is_none() => {
                        report.errors.push(SchemaIssue::MissingRelationshipField {
                            relationship: rel.id.clone(),
                            end,
                            entity: entity.label().to_string(),
                            field: field_id.clone(),
                        })
                    }
                    Some(_) => {}
                }
            }
        }
    }

    fn check_references(&self, schema: &Schema, report: &mut ValidationReport) {
        for entity in &schema.entities {
            for field in entity.fields.iter().filter(|f| f.is_foreign_key) {
                let Some(reference) = &field.references else {
                    report.errors.push(SchemaIssue::ForeignKeyWithoutReference {
                        entity: entity.label().to_string(),
                        field: field.label().to_string(),
                    });
                    continue;
                };

                let resolves = schema
                    .entity_by_name(&reference.table)
                    .is_some_and(|parent| parent.field_by_name(&reference.field).is_some());
                if !resolves {
                    report.errors.push(SchemaIssue::UnresolvedReference {
                        entity: entity.label().to_string(),
                        field: field.label().to_string(),
                        table: reference.table.clone(),
                        referenced_field: reference.field.clone(),
                    });
                }
            }
        }
    }
}

/// Validate with default rules and return the error list (empty = valid)
pub fn validate(schema: &Schema) -> Vec<SchemaIssue> {
    SchemaValidator::new().validate(schema).errors
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Field, FieldReference, Relationship, RelationshipType};

    fn valid_schema() -> Schema {
        let mut schema = Schema {
            entities: vec![
                Entity::new("entity-0", "users")
                    .add_field(Field::new("u-id", "id", "INT").primary_key())
                    .add_field(Field::new("u-email", "email", "VARCHAR(255)").unique()),
                Entity::new("entity-1", "posts")
                    .add_field(Field::new("p-id", "id", "INT").primary_key())
                    .add_field(Field::new("p-user", "user_id", "INT")),
            ],
            relationships: vec![Relationship::new(
                "rel-0",
                (&EntityId::new("entity-0"), &FieldId::new("u-id")),
                (&EntityId::new("entity-1"), &FieldId::new("p-user")),
                RelationshipType::OneToMany,
            )],
        };
        schema.sync_foreign_keys();
        schema
    }

    #[test]
    fn test_valid_identifiers() {
        for name in ["users", "user_id", "User123", "a"] {
            assert!(validate_identifier(name, ValidationLevel::Standard, Some(64)).is_valid());
        }
    }

    #[test]
    fn test_identifier_rules() {
        let check = |name: &str| validate_identifier(name, ValidationLevel::Standard, Some(64));
        assert_eq!(check("   ").errors, vec![ValidationError::Empty]);
        assert!(check("user-name").errors.iter().any(|e| matches!(
            e,
            ValidationError::InvalidCharacters { .. }
        )));
        assert!(check("1user").errors.contains(&ValidationError::StartsWithDigit));
        assert!(check("___").errors.contains(&ValidationError::NoLetters));
        assert!(!check("select").is_valid());
        assert!(check("user").is_valid());
    }

    #[test]
    fn test_length_limit_depends_on_dialect() {
        let name = "a".repeat(100);
        assert!(!validate_identifier(&name, ValidationLevel::Minimal, Some(64)).is_valid());
        assert!(validate_identifier(&name, ValidationLevel::Minimal, Some(128)).is_valid());
        assert!(validate_identifier(&name, ValidationLevel::Minimal, None).is_valid());
    }

    #[test]
    fn test_validation_levels() {
        let minimal = validate_identifier("order", ValidationLevel::Minimal, None);
        assert!(minimal.is_valid());
        assert!(minimal.has_warnings());

        let strict = validate_identifier("_name", ValidationLevel::Strict, None);
        assert!(!strict.is_valid());

        let standard = validate_identifier("_name", ValidationLevel::Standard, None);
        assert!(standard.is_valid());
        assert!(standard.has_warnings());
    }

    #[test]
    fn test_sanitize_identifier() {
        assert_eq!(sanitize_identifier("User Name"), Some("user_name".to_string()));
        assert_eq!(sanitize_identifier("123user"), Some("user".to_string()));
        assert_eq!(sanitize_identifier("__name__"), Some("name".to_string()));
        assert_eq!(sanitize_identifier("a  b"), Some("a_b".to_string()));
        assert_eq!(sanitize_identifier("@#$"), None);
    }

    #[test]
    fn test_valid_schema_has_no_errors() {
        let report = SchemaValidator::new().validate(&valid_schema());
        assert!(report.is_valid(), "{:?}", report.messages());
    }

    #[test]
    fn test_collects_independent_defects() {
        let mut schema = valid_schema();
        schema.entities[0].fields[0].is_primary_key = false;
        schema.relationships.push(Relationship::new(
            "rel-ghost",
            (&EntityId::new("entity-deleted"), &FieldId::new("x")),
            (&EntityId::new("entity-1"), &FieldId::new("p-user")),
            RelationshipType::OneToMany,
        ));

        let errors = validate(&schema);
        assert!(errors.len() >= 2);
        assert!(errors.contains(&SchemaIssue::MissingPrimaryKey {
            entity: "users".into()
        }));
        assert!(errors.iter().any(|e| matches!(
            e,
            SchemaIssue::MissingRelationshipEntity { end: RelationshipEnd::Source, .. }
        )));
    }

    #[test]
    fn test_duplicate_names_reported_once() {
        let mut schema = valid_schema();
        for id in ["entity-2", "entity-3"] {
            schema.entities.push(
                Entity::new(id, "Users").add_field(Field::new("x", "id", "INT").primary_key()),
            );
        }
        schema.entities[1]
            .fields
            .push(Field::new("p-dup", "ID", "INT"));

        let errors = validate(&schema);
        let dup_tables = errors
            .iter()
            .filter(|e| matches!(e, SchemaIssue::DuplicateEntityName { .. }))
            .count();
        assert_eq!(dup_tables, 1);
        assert!(errors.contains(&SchemaIssue::DuplicateFieldName {
            entity: "posts".into(),
            name: "ID".into()
        }));
    }

    #[test]
    fn test_blank_names_fall_back_to_ids() {
        let mut schema = valid_schema();
        schema.entities[1].name = String::new();
        schema.entities[1].fields[0].name = " ".into();

        let messages: Vec<String> = validate(&schema).iter().map(|e| e.to_string()).collect();
        assert!(messages.contains(&"Table 'entity-1': name cannot be empty".to_string()));
        assert!(messages.contains(&"Table 'entity-1': field 'p-id' has an empty name".to_string()));
    }

    #[test]
    fn test_missing_field_on_existing_entity() {
        let mut schema = valid_schema();
        schema.relationships[0].target_field_id = FieldId::new("gone");

        let errors = validate(&schema);
        assert_eq!(
            errors[0].to_string(),
            "Relationship 'rel-0' references missing target field 'gone' in table 'posts'"
        );
    }

    #[test]
    fn test_denormalized_reference_checked() {
        let mut schema = valid_schema();
        schema.relationships.clear();
        {
            let field = &mut schema.entities[1].fields[1];
            field.is_foreign_key = true;
            field.references = Some(FieldReference {
                table: "accounts".into(),
                field: "id".into(),
            });
        }
        schema.entities[0].fields[1].is_foreign_key = true;

        let errors = validate(&schema);
        assert!(errors.contains(&SchemaIssue::UnresolvedReference {
            entity: "posts".into(),
            field: "user_id".into(),
            table: "accounts".into(),
            referenced_field: "id".into(),
        }));
        assert!(errors.contains(&SchemaIssue::ForeignKeyWithoutReference {
            entity: "users".into(),
            field: "email".into(),
        }));
    }

    #[test]
    fn test_messages_are_deterministic() {
        let mut schema = valid_schema();
        schema.entities[0].fields.clear();
        schema.entities[1].fields[0].is_primary_key = false;
        let first = SchemaValidator::new().validate(&schema).messages();
        let second = SchemaValidator::new().validate(&schema).messages();
        assert_eq!(first, second);
        assert_eq!(first[0], "Table 'users' has no primary key");
    }

    #[test]
    fn test_reserved_table_name_only_warns() {
        let mut schema = valid_schema();
        schema.entities[1].name = "order".into();
        schema.sync_foreign_keys();
        let report = SchemaValidator::for_dialect(SqlDialect::PostgreSQL).validate(&schema);
        assert!(report.is_valid());
        assert_eq!(report.warnings.len(), 1);
    }
}
