//! Normalized schema model shared by the parser, exporter, diagram converter and validator.
//!
//! `Relationship` is the single source of truth for foreign keys. The
//! `is_foreign_key` / `references` pair on [`Field`] is a derived view that
//! [`Schema::sync_foreign_keys`] recomputes; it is kept on the wire so that
//! persisted projects and generated payloads keep their familiar shape.

use derive_more::{Display, From};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of an [`Entity`], unique across a schema
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct EntityId(String);

/// Identifier of a [`Field`], unique within its entity
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct FieldId(String);

/// Identifier of a [`Relationship`], unique across a schema
#[derive(
    Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, From,
)]
#[serde(transparent)]
pub struct RelationshipId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Fresh random id for entities created by editing gestures
    pub fn generate() -> Self {
        Self(format!("entity-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FieldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("field-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl RelationshipId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn generate() -> Self {
        Self(format!("relationship-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<&str> for FieldId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<&str> for RelationshipId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// Diagram coordinate of an entity. Irrelevant to SQL.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Name-based back-reference from a foreign key column to its parent column
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldReference {
    pub table: String,
    pub field: String,
}

/// One column of an entity
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    pub id: FieldId,
    pub name: String,
    #[serde(rename = "type")]
    pub data_type: String,
    #[serde(default)]
    pub is_primary_key: bool,
    /// Derived from the relationship list, see [`Schema::sync_foreign_keys`]
    #[serde(default)]
    pub is_foreign_key: bool,
    #[serde(default)]
    pub is_not_null: bool,
    #[serde(default)]
    pub is_unique: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
    /// Derived from the relationship list, see [`Schema::sync_foreign_keys`]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references: Option<FieldReference>,
}

impl Field {
    pub fn new(id: impl Into<FieldId>, name: impl Into<String>, data_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            data_type: data_type.into(),
            is_primary_key: false,
            is_foreign_key: false,
            is_not_null: false,
            is_unique: false,
            default_value: None,
            references: None,
        }
    }

    pub fn primary_key(mut self) -> Self {
        self.is_primary_key = true;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.is_not_null = true;
        self
    }

    pub fn unique(mut self) -> Self {
        self.is_unique = true;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Name for messages, falling back to the id when the name is blank
    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// One table of the schema
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: EntityId,
    pub name: String,
    /// Column order of the generated SQL
    pub fields: Vec<Field>,
    #[serde(default)]
    pub position: Position,
}

impl Entity {
    pub fn new(id: impl Into<EntityId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            fields: Vec::new(),
            position: Position::default(),
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.position = Position::new(x, y);
        self
    }

    pub fn add_field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field(&self, id: &FieldId) -> Option<&Field> {
        self.fields.iter().find(|f| &f.id == id)
    }

    pub fn field_mut(&mut self, id: &FieldId) -> Option<&mut Field> {
        self.fields.iter_mut().find(|f| &f.id == id)
    }

    /// Case-insensitive lookup by column name
    pub fn field_by_name(&self, name: &str) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name))
    }

    pub fn primary_keys(&self) -> impl Iterator<Item = &Field> {
        self.fields.iter().filter(|f| f.is_primary_key)
    }

    /// First field that can anchor a relationship: a primary or foreign key
    pub fn first_key_field(&self) -> Option<&Field> {
        self.fields
            .iter()
            .find(|f| f.is_primary_key || f.is_foreign_key)
    }

    pub fn label(&self) -> &str {
        if self.name.trim().is_empty() {
            self.id.as_str()
        } else {
            &self.name
        }
    }
}

/// Cardinality of a relationship
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RelationshipType {
    #[serde(rename = "1:1")]
    OneToOne,
    #[default]
    #[serde(rename = "1:N")]
    OneToMany,
    #[serde(rename = "N:M")]
    ManyToMany,
}

impl std::fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationshipType::OneToOne => write!(f, "1:1"),
            RelationshipType::OneToMany => write!(f, "1:N"),
            RelationshipType::ManyToMany => write!(f, "N:M"),
        }
    }
}

impl FromStr for RelationshipType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "1:1" | "ONE_TO_ONE" | "ONE-TO-ONE" => Ok(RelationshipType::OneToOne),
            "1:N" | "ONE_TO_MANY" | "ONE-TO-MANY" => Ok(RelationshipType::OneToMany),
            "N:M" | "M:N" | "MANY_TO_MANY" | "MANY-TO-MANY" => Ok(RelationshipType::ManyToMany),
            other => Err(format!("unknown relationship type '{}'", other)),
        }
    }
}

/// Foreign key edge. The source side is the referenced parent column, the
/// target side is the referencing child column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    pub id: RelationshipId,
    pub source_entity_id: EntityId,
    pub source_field_id: FieldId,
    pub target_entity_id: EntityId,
    pub target_field_id: FieldId,
    #[serde(rename = "type")]
    pub relationship_type: RelationshipType,
}

impl Relationship {
    pub fn new(
        id: impl Into<RelationshipId>,
        source: (&EntityId, &FieldId),
        target: (&EntityId, &FieldId),
        relationship_type: RelationshipType,
    ) -> Self {
        Self {
            id: id.into(),
            source_entity_id: source.0.clone(),
            source_field_id: source.1.clone(),
            target_entity_id: target.0.clone(),
            target_field_id: target.1.clone(),
            relationship_type,
        }
    }

    pub fn touches(&self, entity_id: &EntityId) -> bool {
        &self.source_entity_id == entity_id || &self.target_entity_id == entity_id
    }

    pub fn binds_field(&self, entity_id: &EntityId, field_id: &FieldId) -> bool {
        (&self.source_entity_id == entity_id && &self.source_field_id == field_id)
            || (&self.target_entity_id == entity_id && &self.target_field_id == field_id)
    }
}

/// Aggregate root: ordered entities plus relationships
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    pub entities: Vec<Entity>,
    pub relationships: Vec<Relationship>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty() && self.relationships.is_empty()
    }

    pub fn entity(&self, id: &EntityId) -> Option<&Entity> {
        self.entities.iter().find(|e| &e.id == id)
    }

    pub fn entity_mut(&mut self, id: &EntityId) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| &e.id == id)
    }

    /// Case-insensitive lookup by table name
    pub fn entity_by_name(&self, name: &str) -> Option<&Entity> {
        self.entities
            .iter()
            .find(|e| e.name.eq_ignore_ascii_case(name))
    }

    pub fn relationship(&self, id: &RelationshipId) -> Option<&Relationship> {
        self.relationships.iter().find(|r| &r.id == id)
    }

    /// Resolve both ends of a relationship to `(entity, field)` pairs
    pub fn resolve(
        &self,
        relationship: &Relationship,
    ) -> Option<((&Entity, &Field), (&Entity, &Field))> {
        let source = self.entity(&relationship.source_entity_id)?;
        let source_field = source.field(&relationship.source_field_id)?;
        let target = self.entity(&relationship.target_entity_id)?;
        let target_field = target.field(&relationship.target_field_id)?;
        Some(((source, source_field), (target, target_field)))
    }

    /// Relationships whose child side lives in `entity_id`
    pub fn incoming_foreign_keys<'a>(
        &'a self,
        entity_id: &'a EntityId,
    ) -> impl Iterator<Item = &'a Relationship> + 'a {
        self.relationships
            .iter()
            .filter(move |r| &r.target_entity_id == entity_id)
    }

    /// Recompute `is_foreign_key` / `references` on every field from the
    /// relationship list. Relationships with a dangling end are ignored.
    pub fn sync_foreign_keys(&mut self) {
        let derived: Vec<(EntityId, FieldId, FieldReference)> = self
            .relationships
            .iter()
            .filter_map(|rel| {
                let ((source, source_field), _) = self.resolve(rel)?;
                Some((
                    rel.target_entity_id.clone(),
                    rel.target_field_id.clone(),
                    FieldReference {
                        table: source.name.clone(),
                        field: source_field.name.clone(),
                    },
                ))
            })
            .collect();

        for field in self.entities.iter_mut().flat_map(|e| e.fields.iter_mut()) {
            field.is_foreign_key = false;
            field.references = None;
        }

        for (entity_id, field_id, reference) in derived {
            if let Some(field) = self
                .entity_mut(&entity_id)
                .and_then(|e| e.field_mut(&field_id))
                && !field.is_foreign_key
            {
                field.is_foreign_key = true;
                field.references = Some(reference);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn users_posts() -> Schema {
        let users = Entity::new("entity-0", "users")
            .add_field(Field::new("f-u-id", "id", "INT").primary_key())
            .add_field(Field::new("f-u-name", "name", "VARCHAR(255)").not_null());
        let posts = Entity::new("entity-1", "posts")
            .add_field(Field::new("f-p-id", "id", "INT").primary_key())
            .add_field(Field::new("f-p-user", "user_id", "INT"));
        let rel = Relationship::new(
            "relationship-0",
            (&users.id, &FieldId::new("f-u-id")),
            (&posts.id, &FieldId::new("f-p-user")),
            RelationshipType::OneToMany,
        );
        Schema {
            entities: vec![users, posts],
            relationships: vec![rel],
        }
    }

    #[test]
    fn test_sync_foreign_keys_marks_child_field() {
        let mut schema = users_posts();
        schema.sync_foreign_keys();

        let posts = schema.entity_by_name("posts").unwrap();
        let user_id = posts.field_by_name("user_id").unwrap();
        assert!(user_id.is_foreign_key);
        assert_eq!(
            user_id.references,
            Some(FieldReference {
                table: "users".into(),
                field: "id".into()
            })
        );

        let users = schema.entity_by_name("users").unwrap();
        assert!(users.fields.iter().all(|f| !f.is_foreign_key));
    }

    #[test]
    fn test_sync_foreign_keys_clears_stale_flags() {
        let mut schema = users_posts();
        schema.sync_foreign_keys();
        schema.relationships.clear();
        schema.sync_foreign_keys();

        let posts = schema.entity_by_name("posts").unwrap();
        let user_id = posts.field_by_name("user_id").unwrap();
        assert!(!user_id.is_foreign_key);
        assert!(user_id.references.is_none());
    }

    #[test]
    fn test_sync_ignores_dangling_relationship() {
        let mut schema = users_posts();
        schema.relationships[0].source_entity_id = EntityId::new("missing");
        schema.sync_foreign_keys();

        let posts = schema.entity_by_name("posts").unwrap();
        assert!(!posts.field_by_name("user_id").unwrap().is_foreign_key);
    }

    #[test]
    fn test_wire_format_uses_camel_case() {
        let mut schema = users_posts();
        schema.sync_foreign_keys();
        let json = serde_json::to_value(&schema).unwrap();

        let field = &json["entities"][1]["fields"][1];
        assert_eq!(field["type"], "INT");
        assert_eq!(field["isForeignKey"], true);
        assert_eq!(field["references"]["table"], "users");
        assert!(field.get("defaultValue").is_none());

        let rel = &json["relationships"][0];
        assert_eq!(rel["sourceEntityId"], "entity-0");
        assert_eq!(rel["targetFieldId"], "f-p-user");
        assert_eq!(rel["type"], "1:N");
    }

    #[test]
    fn test_serde_round_trip_keeps_order_and_ids() {
        let schema = users_posts();
        let json = serde_json::to_string(&schema).unwrap();
        let back: Schema = serde_json::from_str(&json).unwrap();
        assert_eq!(back, schema);
        assert_eq!(back.entities[0].fields[1].name, "name");
    }

    #[test]
    fn test_relationship_type_parsing() {
        assert_eq!(
            "1:1".parse::<RelationshipType>(),
            Ok(RelationshipType::OneToOne)
        );
        assert_eq!(
            "one-to-many".parse::<RelationshipType>(),
            Ok(RelationshipType::OneToMany)
        );
        assert_eq!(
            "m:n".parse::<RelationshipType>(),
            Ok(RelationshipType::ManyToMany)
        );
        assert!("2:3".parse::<RelationshipType>().is_err());
        assert_eq!(RelationshipType::ManyToMany.to_string(), "N:M");
    }

    #[test]
    fn test_labels_fall_back_to_id() {
        let entity = Entity::new("entity-9", "  ");
        assert_eq!(entity.label(), "entity-9");
        let field = Field::new("field-9", "", "INT");
        assert_eq!(field.label(), "field-9");
    }

    #[test]
    fn test_first_key_field() {
        let entity = Entity::new("e", "t")
            .add_field(Field::new("a", "note", "TEXT"))
            .add_field(Field::new("b", "id", "INT").primary_key());
        assert_eq!(entity.first_key_field().unwrap().name, "id");
        let keyless = Entity::new("k", "k").add_field(Field::new("a", "note", "TEXT"));
        assert!(keyless.first_key_field().is_none());
    }
}
