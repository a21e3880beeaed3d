//! Entity, field and relationship editing.
//!
//! Every operation checks its preconditions first and leaves the schema
//! untouched when it returns an error. Successful operations recompute the
//! derived foreign key flags. Name rules beyond "non-empty and unique" and
//! the primary key requirement are left to the validator at commit time.

use crate::core::schema::{
    Entity, EntityId, Field, FieldId, Position, Relationship, RelationshipId, RelationshipType,
    Schema,
};
use serde::{Deserialize, Serialize};

const NEW_ENTITY_NAME: &str = "new_entity";

// Slot grid for new entities
const START_X: f64 = 100.0;
const START_Y: f64 = 100.0;
const TABLE_WIDTH: f64 = 250.0;
const TABLE_HEIGHT: f64 = 200.0;
const TABLE_SPACING: f64 = 50.0;
const TABLES_PER_ROW: usize = 4;

/// Why an edit was refused. The schema is unchanged when one of these is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GraphEditRejected {
    #[error("Entity '{0}' does not exist")]
    UnknownEntity(EntityId),
    #[error("Field '{field}' does not exist in entity '{entity}'")]
    UnknownField { entity: EntityId, field: FieldId },
    #[error("Relationship '{0}' does not exist")]
    UnknownRelationship(RelationshipId),
    #[error("Name cannot be empty")]
    EmptyName,
    #[error("Table '{0}' already exists")]
    DuplicateEntityName(String),
    #[error("Column '{name}' already exists in table '{entity}'")]
    DuplicateFieldName { entity: String, name: String },
    #[error("Cannot delete the last field of table '{0}'")]
    LastField(String),
    #[error("Table '{0}' has no primary or foreign key field to connect")]
    NoKeyField(String),
    #[error("These fields are already connected")]
    DuplicateRelationship,
}

/// A connect gesture. Missing field handles fall back to the first
/// primary or foreign key field on that side.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Referenced (parent) side
    pub source: EntityId,
    /// Referencing (child) side
    pub target: EntityId,
    #[serde(default)]
    pub source_field: Option<FieldId>,
    #[serde(default)]
    pub target_field: Option<FieldId>,
    /// Defaults to 1:N
    #[serde(default)]
    pub kind: Option<RelationshipType>,
}

impl Connection {
    pub fn new(source: impl Into<EntityId>, target: impl Into<EntityId>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            source_field: None,
            target_field: None,
            kind: None,
        }
    }

    pub fn fields(mut self, source: impl Into<FieldId>, target: impl Into<FieldId>) -> Self {
        self.source_field = Some(source.into());
        self.target_field = Some(target.into());
        self
    }

    pub fn kind(mut self, kind: RelationshipType) -> Self {
        self.kind = Some(kind);
        self
    }
}

pub trait SchemaOps {
    /// Add an entity with a fresh id, a unique default name, an `id SERIAL`
    /// primary key and a free grid slot
    fn add_entity(&mut self) -> EntityId;
    fn add_entity_named(&mut self, name: &str) -> Result<EntityId, GraphEditRejected>;
    /// Remove an entity and every relationship touching it
    fn delete_entity(&mut self, id: &EntityId) -> Result<Entity, GraphEditRejected>;
    fn rename_entity(&mut self, id: &EntityId, name: &str) -> Result<(), GraphEditRejected>;
    fn move_entity(&mut self, id: &EntityId, position: Position) -> Result<(), GraphEditRejected>;

    /// Append a field; it gets a fresh id whatever id it carried
    fn add_field(&mut self, entity: &EntityId, field: Field) -> Result<FieldId, GraphEditRejected>;
    /// Replace a field's attributes in place, keeping its id and column position
    fn update_field(
        &mut self,
        entity: &EntityId,
        field_id: &FieldId,
        field: Field,
    ) -> Result<(), GraphEditRejected>;
    /// Remove a field and every relationship bound to it. The last field
    /// of an entity cannot be removed.
    fn delete_field(&mut self, entity: &EntityId, field_id: &FieldId) -> Result<Field, GraphEditRejected>;

    fn connect(&mut self, connection: Connection) -> Result<RelationshipId, GraphEditRejected>;
    fn delete_relationship(&mut self, id: &RelationshipId) -> Result<Relationship, GraphEditRejected>;
    fn set_relationship_type(
        &mut self,
        id: &RelationshipId,
        kind: RelationshipType,
    ) -> Result<(), GraphEditRejected>;
}

fn checked_name(name: &str) -> Result<&str, GraphEditRejected> {
    let name = name.trim();
    if name.is_empty() {
        Err(GraphEditRejected::EmptyName)
    } else {
        Ok(name)
    }
}

fn slot_position(slot: usize) -> Position {
    Position::new(
        START_X + (slot % TABLES_PER_ROW) as f64 * (TABLE_WIDTH + TABLE_SPACING),
        START_Y + (slot / TABLES_PER_ROW) as f64 * (TABLE_HEIGHT + TABLE_SPACING),
    )
}

/// First grid slot that does not overlap an existing entity
fn next_free_position(schema: &Schema) -> Position {
    let overlaps = |p: &Position| {
        schema.entities.iter().any(|e| {
            (p.x - e.position.x).abs() < TABLE_WIDTH && (p.y - e.position.y).abs() < TABLE_HEIGHT
        })
    };
    // An entity can cover at most four slots
    (0..=4 * schema.entities.len())
        .map(slot_position)
        .find(|p| !overlaps(p))
        .unwrap_or_else(|| slot_position(schema.entities.len()))
}

impl Schema {
    fn entity_or_reject(&self, id: &EntityId) -> Result<&Entity, GraphEditRejected> {
        self.entity(id)
            .ok_or_else(|| GraphEditRejected::UnknownEntity(id.clone()))
    }

    fn name_taken(&self, name: &str, except: Option<&EntityId>) -> bool {
        self.entities
            .iter()
            .any(|e| Some(&e.id) != except && e.name.eq_ignore_ascii_case(name))
    }

    fn unique_entity_name(&self) -> String {
        if !self.name_taken(NEW_ENTITY_NAME, None) {
            return NEW_ENTITY_NAME.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", NEW_ENTITY_NAME, n))
            .find(|name| !self.name_taken(name, None))
            .unwrap_or_else(|| format!("{}_{}", NEW_ENTITY_NAME, EntityId::generate()))
    }

    fn field_name_taken(entity: &Entity, name: &str, except: Option<&FieldId>) -> bool {
        entity
            .fields
            .iter()
            .any(|f| Some(&f.id) != except && f.name.eq_ignore_ascii_case(name))
    }
}

impl SchemaOps for Schema {
    fn add_entity(&mut self) -> EntityId {
        let id = EntityId::generate();
        let entity = Entity {
            id: id.clone(),
            name: self.unique_entity_name(),
            fields: vec![Field::new(FieldId::generate(), "id", "SERIAL").primary_key()],
            position: next_free_position(self),
        };
        self.entities.push(entity);
        id
    }

    fn add_entity_named(&mut self, name: &str) -> Result<EntityId, GraphEditRejected> {
        let name = checked_name(name)?;
        if self.name_taken(name, None) {
            return Err(GraphEditRejected::DuplicateEntityName(name.to_string()));
        }
        let id = self.add_entity();
        if let Some(entity) = self.entity_mut(&id) {
            entity.name = name.to_string();
        }
        Ok(id)
    }

    fn delete_entity(&mut self, id: &EntityId) -> Result<Entity, GraphEditRejected> {
        let index = self
            .entities
            .iter()
            .position(|e| &e.id == id)
            .ok_or_else(|| GraphEditRejected::UnknownEntity(id.clone()))?;

        let entity = self.entities.remove(index);
        self.relationships.retain(|r| !r.touches(id));
        self.sync_foreign_keys();
        Ok(entity)
    }

    fn rename_entity(&mut self, id: &EntityId, name: &str) -> Result<(), GraphEditRejected> {
        let name = checked_name(name)?;
        self.entity_or_reject(id)?;
        if self.name_taken(name, Some(id)) {
            return Err(GraphEditRejected::DuplicateEntityName(name.to_string()));
        }

        if let Some(entity) = self.entity_mut(id) {
            entity.name = name.to_string();
        }
        self.sync_foreign_keys();
        Ok(())
    }

    fn move_entity(&mut self, id: &EntityId, position: Position) -> Result<(), GraphEditRejected> {
        let entity = self
            .entity_mut(id)
            .ok_or_else(|| GraphEditRejected::UnknownEntity(id.clone()))?;
        entity.position = position;
        Ok(())
    }

    fn add_field(&mut self, entity_id: &EntityId, mut field: Field) -> Result<FieldId, GraphEditRejected> {
        let name = checked_name(&field.name)?.to_string();
        let entity = self.entity_or_reject(entity_id)?;
        if Self::field_name_taken(entity, &name, None) {
            return Err(GraphEditRejected::DuplicateFieldName {
                entity: entity.name.clone(),
                name,
            });
        }

        field.id = FieldId::generate();
        field.name = name;
        let id = field.id.clone();
        if let Some(entity) = self.entity_mut(entity_id) {
            entity.fields.push(field);
        }
        self.sync_foreign_keys();
        Ok(id)
    }

    fn update_field(
        &mut self,
        entity_id: &EntityId,
        field_id: &FieldId,
        mut field: Field,
    ) -> Result<(), GraphEditRejected> {
        let name = checked_name(&field.name)?.to_string();
        let entity = self.entity_or_reject(entity_id)?;
        if entity.field(field_id).is_none() {
            return Err(GraphEditRejected::UnknownField {
                entity: entity_id.clone(),
                field: field_id.clone(),
            });
        }
        if Self::field_name_taken(entity, &name, Some(field_id)) {
            return Err(GraphEditRejected::DuplicateFieldName {
                entity: entity.name.clone(),
                name,
            });
        }

        field.id = field_id.clone();
        field.name = name;
        if let Some(slot) = self
            .entity_mut(entity_id)
            .and_then(|e| e.field_mut(field_id))
        {
            *slot = field;
        }
        self.sync_foreign_keys();
        Ok(())
    }

    fn delete_field(&mut self, entity_id: &EntityId, field_id: &FieldId) -> Result<Field, GraphEditRejected> {
        let entity = self.entity_or_reject(entity_id)?;
        let index = entity
            .fields
            .iter()
            .position(|f| &f.id == field_id)
            .ok_or_else(|| GraphEditRejected::UnknownField {
                entity: entity_id.clone(),
                field: field_id.clone(),
            })?;
        if entity.fields.len() == 1 {
            return Err(GraphEditRejected::LastField(entity.label().to_string()));
        }

        let removed = match self.entity_mut(entity_id) {
            Some(entity) => entity.fields.remove(index),
            None => return Err(GraphEditRejected::UnknownEntity(entity_id.clone())),
        };
        self.relationships
            .retain(|r| !r.binds_field(entity_id, field_id));
        self.sync_foreign_keys();
        Ok(removed)
    }

    fn connect(&mut self, connection: Connection) -> Result<RelationshipId, GraphEditRejected> {
        let resolve = |entity_id: &EntityId, field: Option<&FieldId>| -> Result<FieldId, GraphEditRejected> {
            let entity = self.entity_or_reject(entity_id)?;
            match field {
                Some(field_id) => entity
                    .field(field_id)
                    .map(|f| f.id.clone())
                    .ok_or_else(|| GraphEditRejected::UnknownField {
                        entity: entity_id.clone(),
                        field: field_id.clone(),
                    }),
                None => entity
                    .first_key_field()
                    .map(|f| f.id.clone())
                    .ok_or_else(|| GraphEditRejected::NoKeyField(entity.label().to_string())),
            }
        };

        let source_field = resolve(&connection.source, connection.source_field.as_ref())?;
        let target_field = resolve(&connection.target, connection.target_field.as_ref())?;

        let duplicate = self.relationships.iter().any(|r| {
            r.source_entity_id == connection.source
                && r.source_field_id == source_field
                && r.target_entity_id == connection.target
                && r.target_field_id == target_field
        });
        if duplicate {
            return Err(GraphEditRejected::DuplicateRelationship);
        }

        let relationship = Relationship::new(
            RelationshipId::generate(),
            (&connection.source, &source_field),
            (&connection.target, &target_field),
            connection.kind.unwrap_or_default(),
        );
        let id = relationship.id.clone();
        self.relationships.push(relationship);
        self.sync_foreign_keys();
        Ok(id)
    }

    fn delete_relationship(&mut self, id: &RelationshipId) -> Result<Relationship, GraphEditRejected> {
        let index = self
            .relationships
            .iter()
            .position(|r| &r.id == id)
            .ok_or_else(|| GraphEditRejected::UnknownRelationship(id.clone()))?;
        let removed = self.relationships.remove(index);
        self.sync_foreign_keys();
        Ok(removed)
    }

    fn set_relationship_type(
        &mut self,
        id: &RelationshipId,
        kind: RelationshipType,
    ) -> Result<(), GraphEditRejected> {
        let relationship = self
            .relationships
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| GraphEditRejected::UnknownRelationship(id.clone()))?;
        relationship.relationship_type = kind;
        Ok(())
    }
}
