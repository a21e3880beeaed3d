//! Automatic table arrangement and dependency ordering.
//!
//! Two layouts:
//! - [`grid_layout`]: square-ish grid in schema order, the quick "tidy up"
//! - [`force_layout`]: force-directed simulation that pulls tables linked by
//!   foreign keys together and pushes all tables apart
//!
//! Both work on a `petgraph` view of the schema where every relationship is an
//! edge from the referenced (parent) table to the referencing (child) table.
//! The same view gives [`dependency_order`], used to emit parents before children.

use crate::core::schema::{EntityId, Position, Schema};
use petgraph::algo::is_cyclic_directed;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::{BTreeSet, HashMap};

/// Layout configuration
#[derive(Clone, Debug)]
pub struct LayoutConfig {
    /// Horizontal gap between tables
    pub horizontal_spacing: f64,
    /// Vertical gap between tables
    pub vertical_spacing: f64,
    pub start_x: f64,
    pub start_y: f64,
    /// Estimated table width for spacing calculations
    pub table_width: f64,
    /// Estimated table height for spacing calculations
    pub table_height: f64,
    /// Number of iterations for force simulation
    pub iterations: usize,
    /// Initial temperature (movement cap) for simulated annealing
    pub initial_temperature: f64,
    /// Cooling rate per iteration
    pub cooling_rate: f64,
    /// Ideal distance between connected tables
    pub ideal_edge_length: f64,
    pub repulsion_strength: f64,
    pub attraction_strength: f64,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            horizontal_spacing: 80.0,
            vertical_spacing: 100.0,
            start_x: 100.0,
            start_y: 100.0,
            table_width: 280.0,
            table_height: 250.0,
            iterations: 300,
            initial_temperature: 100.0,
            cooling_rate: 0.95,
            ideal_edge_length: 400.0,
            repulsion_strength: 50000.0,
            attraction_strength: 0.1,
        }
    }
}

/// New position per entity
#[derive(Clone, Debug, Default)]
pub struct LayoutResult {
    pub positions: Vec<(EntityId, Position)>,
}

/// Directed parent → child graph; node weights are entity indices.
/// Relationships with a dangling end are left out.
pub fn schema_graph(schema: &Schema) -> DiGraph<usize, ()> {
    let mut graph = DiGraph::with_capacity(schema.entities.len(), schema.relationships.len());
    let nodes: HashMap<&EntityId, NodeIndex> = schema
        .entities
        .iter()
        .enumerate()
        .map(|(i, entity)| (&entity.id, graph.add_node(i)))
        .collect();

    for rel in &schema.relationships {
        if let (Some(&parent), Some(&child)) = (
            nodes.get(&rel.source_entity_id),
            nodes.get(&rel.target_entity_id),
        ) {
            graph.add_edge(parent, child, ());
        }
    }

    graph
}

/// Entity indices with every referenced table before the tables that
/// reference it; ties keep schema order. Self-references are ignored.
/// `None` when foreign keys form a cycle across tables.
pub fn dependency_order(schema: &Schema) -> Option<Vec<usize>> {
    let mut graph = schema_graph(schema);
    graph.retain_edges(|g, edge| {
        g.edge_endpoints(edge)
            .is_some_and(|(parent, child)| parent != child)
    });

    if is_cyclic_directed(&graph) {
        return None;
    }

    let mut pending: Vec<usize> = graph
        .node_indices()
        .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
        .collect();
    let mut ready: BTreeSet<usize> = graph
        .node_indices()
        .filter(|n| pending[n.index()] == 0)
        .map(|n| n.index())
        .collect();
    let mut order = Vec::with_capacity(pending.len());

    while let Some(next) = ready.pop_first() {
        order.push(graph[NodeIndex::new(next)]);
        for child in graph.neighbors_directed(NodeIndex::new(next), Direction::Outgoing) {
            pending[child.index()] -= 1;
            if pending[child.index()] == 0 {
                ready.insert(child.index());
            }
        }
    }

    Some(order)
}

/// Arrange entities on a grid of `ceil(sqrt(n))` columns in schema order
pub fn grid_layout(schema: &mut Schema) {
    const CELL_WIDTH: f64 = 300.0;
    const CELL_HEIGHT: f64 = 250.0;
    const START: f64 = 100.0;

    let columns = (schema.entities.len() as f64).sqrt().ceil().max(1.0) as usize;
    for (i, entity) in schema.entities.iter_mut().enumerate() {
        entity.position = Position::new(
            START + (i % columns) as f64 * CELL_WIDTH,
            START + (i / columns) as f64 * CELL_HEIGHT,
        );
    }
}

/// 2D vector for physics calculations
#[derive(Clone, Copy, Debug, Default)]
struct Vec2 {
    x: f64,
    y: f64,
}

impl Vec2 {
    fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn length(&self) -> f64 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    fn normalize(&self) -> Self {
        let len = self.length();
        if len < 0.0001 {
            Self::new(0.0, 0.0)
        } else {
            Self::new(self.x / len, self.y / len)
        }
    }

    fn add(&self, other: Vec2) -> Self {
        Self::new(self.x + other.x, self.y + other.y)
    }

    fn sub(&self, other: Vec2) -> Self {
        Self::new(self.x - other.x, self.y - other.y)
    }

    fn scale(&self, factor: f64) -> Self {
        Self::new(self.x * factor, self.y * factor)
    }
}

/// Force-directed layout with simulated annealing:
/// repulsion between every pair, spring attraction along foreign keys,
/// a weak pull to the canvas center, then an overlap removal pass.
pub fn calculate_force_layout(schema: &Schema, config: &LayoutConfig) -> LayoutResult {
    let node_count = schema.entities.len();

    match node_count {
        0 => return LayoutResult::default(),
        1 => {
            return LayoutResult {
                positions: vec![(
                    schema.entities[0].id.clone(),
                    Position::new(config.start_x, config.start_y),
                )],
            };
        }
        _ => {}
    }

    let graph = schema_graph(schema);
    let edges: Vec<(usize, usize)> = graph
        .edge_indices()
        .filter_map(|e| {
            let (a, b) = graph.edge_endpoints(e)?;
            (a != b).then(|| (graph[a], graph[b]))
        })
        .collect();

    let mut positions = initialize_positions(schema, config);
    let center = Vec2::new(config.start_x + 600.0, config.start_y + 400.0);
    let mut temperature = config.initial_temperature;

    for _ in 0..config.iterations {
        let mut forces = vec![Vec2::default(); node_count];

        for i in 0..node_count {
            for j in (i + 1)..node_count {
                let delta = positions[i].sub(positions[j]);
                let distance = delta.length().max(1.0);

                let min_distance = config.table_width + config.horizontal_spacing;
                let repulsion = if distance < min_distance {
                    config.repulsion_strength * 2.0 / (distance * distance)
                } else {
                    config.repulsion_strength / (distance * distance)
                };

                let force = delta.normalize().scale(repulsion);
                forces[i] = forces[i].add(force);
                forces[j] = forces[j].sub(force);
            }
        }

        for &(a, b) in &edges {
            let delta = positions[b].sub(positions[a]);
            let distance = delta.length().max(1.0);
            let attraction = config.attraction_strength * (distance - config.ideal_edge_length);

            let force = delta.normalize().scale(attraction);
            forces[a] = forces[a].add(force);
            forces[b] = forces[b].sub(force);
        }

        for (position, force) in positions.iter_mut().zip(forces.iter_mut()) {
            *force = force.add(center.sub(*position).scale(0.01));
            let magnitude = force.length();
            if magnitude > 0.01 {
                *position = position.add(force.normalize().scale(magnitude.min(temperature)));
            }
        }

        temperature *= config.cooling_rate;
        if temperature < 0.1 {
            break;
        }
    }

    let positions = prevent_overlaps(&positions, config);

    let min_x = positions.iter().map(|p| p.x).fold(f64::INFINITY, f64::min);
    let min_y = positions.iter().map(|p| p.y).fold(f64::INFINITY, f64::min);

    LayoutResult {
        positions: schema
            .entities
            .iter()
            .zip(positions)
            .map(|(entity, pos)| {
                (
                    entity.id.clone(),
                    Position::new(
                        (pos.x - min_x + config.start_x).round(),
                        (pos.y - min_y + config.start_y).round(),
                    ),
                )
            })
            .collect(),
    }
}

/// Start from the current positions when they are spread out, otherwise from a circle
fn initialize_positions(schema: &Schema, config: &LayoutConfig) -> Vec<Vec2> {
    let node_count = schema.entities.len();
    let center_x = config.start_x + 600.0;
    let center_y = config.start_y + 400.0;
    let radius = (node_count as f64 * 100.0).max(300.0);

    let spread = schema
        .entities
        .iter()
        .any(|e| e.position != schema.entities[0].position);

    if spread {
        // Jitter breaks symmetric deadlocks
        schema
            .entities
            .iter()
            .enumerate()
            .map(|(i, e)| {
                let jitter = (i as f64 * 0.1).sin() * 10.0;
                Vec2::new(e.position.x + jitter, e.position.y + jitter)
            })
            .collect()
    } else {
        (0..node_count)
            .map(|i| {
                let angle = 2.0 * std::f64::consts::PI * (i as f64) / (node_count as f64);
                Vec2::new(
                    center_x + radius * angle.cos(),
                    center_y + radius * angle.sin(),
                )
            })
            .collect()
    }
}

fn prevent_overlaps(positions: &[Vec2], config: &LayoutConfig) -> Vec<Vec2> {
    let mut result = positions.to_vec();
    let min_dist_x = config.table_width + config.horizontal_spacing;
    let min_dist_y = config.table_height + config.vertical_spacing;

    for _ in 0..50 {
        let mut any_overlap = false;

        for i in 0..result.len() {
            for j in (i + 1)..result.len() {
                let dx = (result[i].x - result[j].x).abs();
                let dy = (result[i].y - result[j].y).abs();

                if dx < min_dist_x && dy < min_dist_y {
                    any_overlap = true;

                    let delta = result[i].sub(result[j]);
                    let push = if delta.length() < 1.0 {
                        Vec2::new(min_dist_x * 0.5, min_dist_y * 0.5)
                    } else {
                        // Separate along the axis that needs the smaller move
                        let norm = delta.normalize();
                        if min_dist_x - dx < min_dist_y - dy {
                            Vec2::new(norm.x.signum() * (min_dist_x - dx) * 0.5, 0.0)
                        } else {
                            Vec2::new(0.0, norm.y.signum() * (min_dist_y - dy) * 0.5)
                        }
                    };

                    result[i] = result[i].add(push);
                    result[j] = result[j].sub(push);
                }
            }
        }

        if !any_overlap {
            break;
        }
    }

    result
}

/// Write a computed layout back into the schema; unknown ids are ignored
pub fn apply_layout(schema: &mut Schema, layout: &LayoutResult) {
    for (id, position) in &layout.positions {
        if let Some(entity) = schema.entity_mut(id) {
            entity.position = *position;
        }
    }
}

/// Force-directed layout with the default config
pub fn force_layout(schema: &mut Schema) {
    let layout = calculate_force_layout(schema, &LayoutConfig::default());
    apply_layout(schema, &layout);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::schema::{Entity, Field, FieldId, Relationship, RelationshipType};

    fn table(i: usize) -> Entity {
        Entity::new(format!("entity-{}", i), format!("table_{}", i))
            .add_field(Field::new("id", "id", "INT").primary_key())
    }

    fn link(schema: &mut Schema, parent: usize, child: usize) {
        let id = format!("relationship-{}", schema.relationships.len());
        let parent = schema.entities[parent].id.clone();
        let child = schema.entities[child].id.clone();
        schema.relationships.push(Relationship::new(
            id,
            (&parent, &FieldId::new("id")),
            (&child, &FieldId::new("id")),
            RelationshipType::OneToMany,
        ));
    }

    #[test]
    fn test_empty_schema() {
        let result = calculate_force_layout(&Schema::new(), &LayoutConfig::default());
        assert!(result.positions.is_empty());
        assert_eq!(dependency_order(&Schema::new()), Some(vec![]));
    }

    #[test]
    fn test_single_table() {
        let mut schema = Schema::new();
        schema.entities.push(table(0));
        let result = calculate_force_layout(&schema, &LayoutConfig::default());
        assert_eq!(result.positions.len(), 1);
    }

    #[test]
    fn test_two_related_tables_stay_close() {
        let mut schema = Schema::new();
        schema.entities.extend([table(0), table(1)]);
        link(&mut schema, 0, 1);

        let config = LayoutConfig::default();
        let result = calculate_force_layout(&schema, &config);
        let (a, b) = (result.positions[0].1, result.positions[1].1);
        let distance = ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt();
        assert!(
            distance < config.ideal_edge_length * 2.5,
            "Connected tables should be close together, but distance is {}",
            distance
        );
    }

    #[test]
    fn test_no_overlaps() {
        let mut schema = Schema::new();
        schema.entities.extend((0..5).map(table));

        let config = LayoutConfig::default();
        force_layout(&mut schema);

        let min_dist_x = config.table_width + config.horizontal_spacing;
        let min_dist_y = config.table_height + config.vertical_spacing;
        for i in 0..schema.entities.len() {
            for j in (i + 1)..schema.entities.len() {
                let (p, q) = (schema.entities[i].position, schema.entities[j].position);
                let (dx, dy) = ((p.x - q.x).abs(), (p.y - q.y).abs());
                assert!(
                    dx >= min_dist_x - 1.0 || dy >= min_dist_y - 1.0,
                    "Tables {} and {} overlap: dx={}, dy={}",
                    i,
                    j,
                    dx,
                    dy
                );
            }
        }
    }

    #[test]
    fn test_grid_layout() {
        let mut schema = Schema::new();
        schema.entities.extend((0..5).map(table));
        grid_layout(&mut schema);

        assert_eq!(schema.entities[0].position, Position::new(100.0, 100.0));
        assert_eq!(schema.entities[2].position, Position::new(700.0, 100.0));
        assert_eq!(schema.entities[3].position, Position::new(100.0, 350.0));
    }

    #[test]
    fn test_dependency_order_puts_parents_first() {
        let mut schema = Schema::new();
        schema.entities.extend((0..4).map(table));
        link(&mut schema, 3, 0);
        link(&mut schema, 2, 3);
        link(&mut schema, 1, 1);

        assert_eq!(dependency_order(&schema), Some(vec![1, 2, 3, 0]));
    }

    #[test]
    fn test_dependency_order_detects_cycles() {
        let mut schema = Schema::new();
        schema.entities.extend((0..2).map(table));
        link(&mut schema, 0, 1);
        link(&mut schema, 1, 0);
        assert_eq!(dependency_order(&schema), None);
    }

    #[test]
    fn test_apply_layout_ignores_unknown_ids() {
        let mut schema = Schema::new();
        schema.entities.push(table(0));
        let layout = LayoutResult {
            positions: vec![
                (EntityId::new("entity-0"), Position::new(500.0, 300.0)),
                (EntityId::new("missing"), Position::new(1.0, 1.0)),
            ],
        };
        apply_layout(&mut schema, &layout);
        assert_eq!(schema.entities[0].position, Position::new(500.0, 300.0));
    }

    #[test]
    fn test_vec2_operations() {
        let a = Vec2::new(3.0, 4.0);
        let b = Vec2::new(1.0, 2.0);

        assert!((a.length() - 5.0).abs() < 0.001);
        let sum = a.add(b);
        assert!((sum.x - 4.0).abs() < 0.001 && (sum.y - 6.0).abs() < 0.001);
        let diff = a.sub(b);
        assert!((diff.x - 2.0).abs() < 0.001 && (diff.y - 2.0).abs() < 0.001);
        assert!((a.scale(2.0).x - 6.0).abs() < 0.001);
        assert!((a.normalize().length() - 1.0).abs() < 0.001);
    }
}
