//! Conversion between a [`Schema`] and the node/edge graph the diagram widget edits.
//!
//! Node ids are entity ids and edge ids are relationship ids, in both
//! directions. Field handles carry a `-source` / `-target` suffix so the widget
//! can tell the two connection points of a column apart.

use crate::core::ops::{Connection, GraphEditRejected, SchemaOps};
use crate::core::schema::{
    Entity, EntityId, Field, FieldId, Position, Relationship, RelationshipId, RelationshipType,
    Schema,
};
use serde::{Deserialize, Serialize};

const SOURCE_SUFFIX: &str = "-source";
const TARGET_SUFFIX: &str = "-target";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramGraph {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

/// Payload of an entity node
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EntityNodeData {
    pub name: String,
    pub fields: Vec<Field>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DiagramNode {
    #[serde(rename = "entityNode")]
    Entity {
        id: EntityId,
        position: Position,
        data: EntityNodeData,
    },
}

impl DiagramNode {
    pub fn id(&self) -> &EntityId {
        match self {
            DiagramNode::Entity { id, .. } => id,
        }
    }

    pub fn position(&self) -> Position {
        match self {
            DiagramNode::Entity { position, .. } => *position,
        }
    }
}

/// Line style of an edge, keyed by cardinality
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeStyle {
    Solid,
    Thick,
    Dashed,
}

impl EdgeStyle {
    pub fn stroke_width(&self) -> f64 {
        match self {
            EdgeStyle::Solid => 1.0,
            EdgeStyle::Thick | EdgeStyle::Dashed => 2.0,
        }
    }

    pub fn dash_array(&self) -> Option<&'static str> {
        match self {
            EdgeStyle::Dashed => Some("5,5"),
            _ => None,
        }
    }
}

impl From<RelationshipType> for EdgeStyle {
    fn from(kind: RelationshipType) -> Self {
        match kind {
            RelationshipType::OneToOne => EdgeStyle::Solid,
            RelationshipType::OneToMany => EdgeStyle::Thick,
            RelationshipType::ManyToMany => EdgeStyle::Dashed,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiagramEdge {
    pub id: RelationshipId,
    pub source: EntityId,
    pub target: EntityId,
    pub source_handle: String,
    pub target_handle: String,
    /// Cardinality, shown as the edge label
    pub label: RelationshipType,
    pub style: EdgeStyle,
}

impl DiagramEdge {
    pub fn source_field(&self) -> FieldId {
        handle_field(&self.source_handle, SOURCE_SUFFIX)
    }

    pub fn target_field(&self) -> FieldId {
        handle_field(&self.target_handle, TARGET_SUFFIX)
    }
}

fn handle_field(handle: &str, suffix: &str) -> FieldId {
    FieldId::new(handle.strip_suffix(suffix).unwrap_or(handle))
}

/// A gesture on the diagram
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op_type")]
pub enum GraphEdit {
    /// Drag stop
    MoveNode { node_id: EntityId, position: Position },
    /// Draw an edge between two nodes
    Connect(Connection),
    DeleteEdge { edge_id: RelationshipId },
}

pub fn to_graph(schema: &Schema) -> DiagramGraph {
    let nodes = schema
        .entities
        .iter()
        .map(|entity| DiagramNode::Entity {
            id: entity.id.clone(),
            position: entity.position,
            data: EntityNodeData {
                name: entity.name.clone(),
                fields: entity.fields.clone(),
            },
        })
        .collect();

    let edges = schema
        .relationships
        .iter()
        .map(|rel| DiagramEdge {
            id: rel.id.clone(),
            source: rel.source_entity_id.clone(),
            target: rel.target_entity_id.clone(),
            source_handle: format!("{}{}", rel.source_field_id, SOURCE_SUFFIX),
            target_handle: format!("{}{}", rel.target_field_id, TARGET_SUFFIX),
            label: rel.relationship_type,
            style: rel.relationship_type.into(),
        })
        .collect();

    DiagramGraph { nodes, edges }
}

/// Rebuild a schema from graph state. Foreign key flags are recomputed from the edges.
pub fn from_graph(graph: &DiagramGraph) -> Schema {
    let entities = graph
        .nodes
        .iter()
        .map(|node| match node {
            DiagramNode::Entity { id, position, data } => Entity {
                id: id.clone(),
                name: data.name.clone(),
                fields: data.fields.clone(),
                position: *position,
            },
        })
        .collect();

    let relationships = graph
        .edges
        .iter()
        .map(|edge| {
            Relationship::new(
                edge.id.clone(),
                (&edge.source, &edge.source_field()),
                (&edge.target, &edge.target_field()),
                edge.label,
            )
        })
        .collect();

    let mut schema = Schema {
        entities,
        relationships,
    };
    schema.sync_foreign_keys();
    schema
}

/// Apply one gesture to a copy of `schema`. A rejected gesture leaves the
/// caller's schema as it was.
pub fn apply_graph_edit(schema: &Schema, edit: &GraphEdit) -> Result<Schema, GraphEditRejected> {
    let mut next = schema.clone();
    let outcome = match edit {
        GraphEdit::MoveNode { node_id, position } => next.move_entity(node_id, *position),
        GraphEdit::Connect(connection) => next.connect(connection.clone()).map(|id| {
            tracing::debug!("Connected {} -> {} as {}", connection.source, connection.target, id);
        }),
        GraphEdit::DeleteEdge { edge_id } => next.delete_relationship(edge_id).map(|_| ()),
    };

    match outcome {
        Ok(()) => Ok(next),
        Err(e) => {
            tracing::warn!("Rejected graph edit: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::FieldReference;

    fn blog() -> Schema {
        let mut schema = Schema {
            entities: vec![
                Entity::new("entity-0", "users")
                    .with_position(100.0, 100.0)
                    .add_field(Field::new("field-0-0", "id", "INT").primary_key())
                    .add_field(Field::new("field-0-1", "name", "VARCHAR(255)").not_null()),
                Entity::new("entity-1", "posts")
                    .with_position(400.0, 100.0)
                    .add_field(Field::new("field-1-0", "id", "INT").primary_key())
                    .add_field(Field::new("field-1-1", "user_id", "INT")),
            ],
            relationships: vec![Relationship::new(
                "relationship-0",
                (&EntityId::new("entity-0"), &FieldId::new("field-0-0")),
                (&EntityId::new("entity-1"), &FieldId::new("field-1-1")),
                RelationshipType::OneToMany,
            )],
        };
        schema.sync_foreign_keys();
        schema
    }

    #[test]
    fn test_to_graph_shapes() {
        let graph = to_graph(&blog());
        assert_eq!(graph.nodes.len(), 2);
        assert_eq!(graph.nodes[1].id().as_str(), "entity-1");
        assert_eq!(graph.nodes[1].position(), Position::new(400.0, 100.0));

        let edge = &graph.edges[0];
        assert_eq!(edge.id.as_str(), "relationship-0");
        assert_eq!(edge.source_handle, "field-0-0-source");
        assert_eq!(edge.target_handle, "field-1-1-target");
        assert_eq!(edge.label, RelationshipType::OneToMany);
        assert_eq!(edge.style, EdgeStyle::Thick);
        assert_eq!(edge.source_field().as_str(), "field-0-0");
        assert_eq!(edge.target_field().as_str(), "field-1-1");
    }

    #[test]
    fn test_edge_style_by_cardinality() {
        assert_eq!(EdgeStyle::from(RelationshipType::OneToOne), EdgeStyle::Solid);
        let dashed = EdgeStyle::from(RelationshipType::ManyToMany);
        assert_eq!(dashed.dash_array(), Some("5,5"));
        assert_eq!(EdgeStyle::Solid.dash_array(), None);
    }

    #[test]
    fn test_round_trip_is_identity() {
        let schema = blog();
        assert_eq!(from_graph(&to_graph(&schema)), schema);
    }

    #[test]
    fn test_wire_format() {
        let json = serde_json::to_value(to_graph(&blog())).unwrap();
        assert_eq!(json["nodes"][0]["type"], "entityNode");
        assert_eq!(json["nodes"][0]["data"]["name"], "users");
        assert_eq!(json["edges"][0]["sourceHandle"], "field-0-0-source");
        assert_eq!(json["edges"][0]["label"], "1:N");
        assert_eq!(json["edges"][0]["style"], "thick");
    }

    #[test]
    fn test_handles_without_suffix_are_accepted() {
        let mut graph = to_graph(&blog());
        graph.edges[0].source_handle = "field-0-0".into();
        let schema = from_graph(&graph);
        assert_eq!(schema.relationships[0].source_field_id.as_str(), "field-0-0");
    }

    #[test]
    fn test_move_changes_only_position() {
        let schema = blog();
        let edit = GraphEdit::MoveNode {
            node_id: EntityId::new("entity-1"),
            position: Position::new(50.0, 600.0),
        };
        let moved = apply_graph_edit(&schema, &edit).unwrap();

        let mut expected = schema.clone();
        expected.entities[1].position = Position::new(50.0, 600.0);
        assert_eq!(moved, expected);
    }

    #[test]
    fn test_connect_with_default_fields() {
        let mut schema = blog();
        schema.entities.push(
            Entity::new("entity-2", "tags")
                .add_field(Field::new("field-2-0", "id", "INT").primary_key()),
        );
        let edit = GraphEdit::Connect(Connection::new("entity-1", "entity-2"));
        let next = apply_graph_edit(&schema, &edit).unwrap();

        assert_eq!(next.relationships.len(), 2);
        let rel = &next.relationships[1];
        assert_eq!(rel.source_field_id.as_str(), "field-1-0");
        assert_eq!(rel.target_field_id.as_str(), "field-2-0");
        assert_eq!(rel.relationship_type, RelationshipType::OneToMany);
        assert_ne!(rel.id.as_str(), "relationship-0");
    }

    #[test]
    fn test_rejected_connect_leaves_schema_alone() {
        let mut schema = blog();
        schema
            .entities
            .push(Entity::new("entity-2", "notes").add_field(Field::new("field-2-0", "body", "TEXT")));

        let edit = GraphEdit::Connect(Connection::new("entity-0", "entity-2"));
        assert_eq!(
            apply_graph_edit(&schema, &edit),
            Err(GraphEditRejected::NoKeyField("notes".into()))
        );

        let edit = GraphEdit::Connect(Connection::new("entity-0", "entity-9"));
        assert!(matches!(
            apply_graph_edit(&schema, &edit),
            Err(GraphEditRejected::UnknownEntity(_))
        ));
    }

    #[test]
    fn test_delete_edge_removes_one_relationship() {
        let schema = blog();
        let edit = GraphEdit::DeleteEdge {
            edge_id: RelationshipId::new("relationship-0"),
        };
        let next = apply_graph_edit(&schema, &edit).unwrap();
        assert!(next.relationships.is_empty());

        let user_id = &next.entities[1].fields[1];
        assert!(!user_id.is_foreign_key);
        assert_eq!(user_id.references, None::<FieldReference>);
        assert_eq!(next.entities[0], schema.entities[0]);
    }

    #[test]
    fn test_graph_edit_wire_format() {
        let edit: GraphEdit = serde_json::from_str(
            r#"{"op_type":"MoveNode","node_id":"entity-0","position":{"x":1.0,"y":2.0}}"#,
        )
        .unwrap();
        assert_eq!(
            edit,
            GraphEdit::MoveNode {
                node_id: EntityId::new("entity-0"),
                position: Position::new(1.0, 2.0)
            }
        );

        let edit: GraphEdit = serde_json::from_str(
            r#"{"op_type":"Connect","source":"entity-0","target":"entity-1","kind":"1:1"}"#,
        )
        .unwrap();
        assert_eq!(
            edit,
            GraphEdit::Connect(Connection::new("entity-0", "entity-1").kind(RelationshipType::OneToOne))
        );
    }
}
