//! Core domain models and business logic for schema round-tripping

pub mod auto_layout;
pub mod config;
pub mod diagram;
pub mod dialect;
pub mod editor;
pub mod export;
pub mod generation;
pub mod ops;
pub mod project;
mod schema;
pub mod sql_check;
pub mod sql_parser;
pub mod validation;

pub use config::Config;
pub use diagram::{
    DiagramEdge, DiagramGraph, DiagramNode, EdgeStyle, GraphEdit, apply_graph_edit, from_graph,
    to_graph,
};
pub use dialect::SqlDialect;
pub use editor::{EditorError, EditorSession, History, LayoutKind, SchemaEdit};
pub use export::{ExportOptions, SchemaExporter, TableOrder, generate};
pub use generation::{
    ExternalServiceError, GeneratedSchema, GenerationRequest, SchemaService, accept_generated,
};
pub use ops::{Connection, GraphEditRejected, SchemaOps};
pub use project::{InMemoryProjectRepository, Project, ProjectRepository, RepositoryError};
pub use schema::*;
pub use sql_check::{SqlCheckReport, check_sql};
pub use sql_parser::{ParseError, ParseReport, parse, parse_with_report};
pub use validation::{SchemaIssue, SchemaValidator, ValidationReport, validate};
