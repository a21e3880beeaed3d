//! Editing session: owns the current schema and routes user actions through
//! the parser, the diagram converter, the CRUD layer and the exporter.
//!
//! Every accepted edit replaces the schema wholesale and pushes the previous
//! one onto a bounded undo history. Edits are permissive; [`EditorSession::commit`]
//! is the point where the validator decides whether SQL may be produced.

use std::sync::Arc;
use uuid::Uuid;

use crate::core::auto_layout::{force_layout, grid_layout};
use crate::core::config::Config;
use crate::core::diagram::{DiagramGraph, GraphEdit, apply_graph_edit, to_graph};
use crate::core::dialect::SqlDialect;
use crate::core::export::{ExportOptions, SchemaExporter};
use crate::core::generation::{ExternalServiceError, GenerationRequest, SchemaService, generate_schema};
use crate::core::ops::{GraphEditRejected, SchemaOps};
use crate::core::project::{CreateProject, Project, ProjectRepository, RepositoryError, UpdateProject};
use crate::core::schema::{EntityId, Field, FieldId, RelationshipId, RelationshipType, Schema};
use crate::core::sql_parser::{ParseError, parse_with_report};
use crate::core::validation::{SchemaIssue, SchemaValidator};

/// Layout algorithm for [`SchemaEdit::AutoLayout`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LayoutKind {
    Grid,
    Force,
}

/// One user action
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaEdit {
    /// SQL text edited by hand; the schema is rebuilt from it
    ReplaceSql(String),
    Graph(GraphEdit),
    AddEntity,
    AddEntityNamed(String),
    DeleteEntity(EntityId),
    RenameEntity { entity: EntityId, name: String },
    AddField { entity: EntityId, field: Field },
    UpdateField { entity: EntityId, field_id: FieldId, field: Field },
    DeleteField { entity: EntityId, field_id: FieldId },
    SetRelationshipType { relationship: RelationshipId, kind: RelationshipType },
    AutoLayout(LayoutKind),
}

#[derive(Debug, thiserror::Error)]
pub enum EditorError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Rejected(#[from] GraphEditRejected),

    #[error(transparent)]
    External(#[from] ExternalServiceError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),

    #[error("Schema has {} problem(s): {}", .0.len(), summarize(.0))]
    Invalid(Vec<SchemaIssue>),

    #[error("Project {0} not found")]
    ProjectNotFound(Uuid),
}

fn summarize(issues: &[SchemaIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Linear undo/redo over schema snapshots
#[derive(Clone, Debug)]
pub struct History {
    undo: Vec<Schema>,
    redo: Vec<Schema>,
    limit: usize,
}

impl History {
    pub fn new(limit: usize) -> Self {
        Self {
            undo: Vec::new(),
            redo: Vec::new(),
            limit: limit.max(1),
        }
    }

    /// Record the state before a new edit. Drops the redo branch.
    pub fn push(&mut self, previous: Schema) {
        self.undo.push(previous);
        if self.undo.len() > self.limit {
            let to_remove = self.undo.len() - self.limit;
            self.undo.drain(0..to_remove);
        }
        self.redo.clear();
    }

    pub fn undo(&mut self, current: Schema) -> Option<Schema> {
        let previous = self.undo.pop()?;
        self.redo.push(current);
        Some(previous)
    }

    pub fn redo(&mut self, current: Schema) -> Option<Schema> {
        let next = self.redo.pop()?;
        self.undo.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo.clear();
        self.redo.clear();
    }
}

/// Compute the schema that results from `edit` without touching `schema`
pub fn apply_edit(schema: &Schema, edit: &SchemaEdit) -> Result<Schema, EditorError> {
    let mut next = schema.clone();
    match edit {
        SchemaEdit::ReplaceSql(sql) => {
            let report = parse_with_report(sql)?;
            for skipped in &report.skipped {
                tracing::warn!("Skipped statement at line {}: {}", skipped.line, skipped.reason);
            }
            for warning in &report.warnings {
                tracing::debug!("Parser warning: {}", warning);
            }
            next = report.schema;
            keep_known_positions(schema, &mut next);
        }
        SchemaEdit::Graph(graph_edit) => next = apply_graph_edit(schema, graph_edit)?,
        SchemaEdit::AddEntity => {
            next.add_entity();
        }
        SchemaEdit::AddEntityNamed(name) => {
            next.add_entity_named(name)?;
        }
        SchemaEdit::DeleteEntity(id) => {
            next.delete_entity(id)?;
        }
        SchemaEdit::RenameEntity { entity, name } => next.rename_entity(entity, name)?,
        SchemaEdit::AddField { entity, field } => {
            next.add_field(entity, field.clone())?;
        }
        SchemaEdit::UpdateField {
            entity,
            field_id,
            field,
        } => next.update_field(entity, field_id, field.clone())?,
        SchemaEdit::DeleteField { entity, field_id } => {
            next.delete_field(entity, field_id)?;
        }
        SchemaEdit::SetRelationshipType { relationship, kind } => {
            next.set_relationship_type(relationship, *kind)?
        }
        SchemaEdit::AutoLayout(LayoutKind::Grid) => grid_layout(&mut next),
        SchemaEdit::AutoLayout(LayoutKind::Force) => force_layout(&mut next),
    }
    Ok(next)
}

/// Tables that survive a SQL re-import stay where the user put them
fn keep_known_positions(previous: &Schema, next: &mut Schema) {
    for entity in &mut next.entities {
        if let Some(old) = previous.entity_by_name(&entity.name) {
            entity.position = old.position;
        }
    }
}

pub struct EditorSession<R: ProjectRepository> {
    repository: Arc<R>,
    schema: Schema,
    history: History,
    options: ExportOptions,
    project_id: Option<Uuid>,
    prompt: Option<String>,
    /// SQL produced by the last successful commit or generation
    committed_sql: Option<String>,
}

impl<R: ProjectRepository> EditorSession<R> {
    pub fn new(repository: Arc<R>, config: &Config) -> Self {
        Self {
            repository,
            schema: Schema::new(),
            history: History::new(config.history_limit),
            options: config.export_options(),
            project_id: None,
            prompt: None,
            committed_sql: None,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn dialect(&self) -> SqlDialect {
        self.options.sql_dialect
    }

    pub fn set_dialect(&mut self, dialect: SqlDialect) {
        self.options.sql_dialect = dialect;
    }

    pub fn project_id(&self) -> Option<Uuid> {
        self.project_id
    }

    pub fn committed_sql(&self) -> Option<&str> {
        self.committed_sql.as_deref()
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    /// Apply one edit. On error the session is unchanged.
    pub fn apply(&mut self, edit: SchemaEdit) -> Result<(), EditorError> {
        let next = apply_edit(&self.schema, &edit)?;
        self.replace(next);
        Ok(())
    }

    fn replace(&mut self, next: Schema) {
        let previous = std::mem::replace(&mut self.schema, next);
        self.history.push(previous);
    }

    pub fn undo(&mut self) -> bool {
        match self.history.undo(self.schema.clone()) {
            Some(previous) => {
                self.schema = previous;
                true
            }
            None => false,
        }
    }

    pub fn redo(&mut self) -> bool {
        match self.history.redo(self.schema.clone()) {
            Some(next) => {
                self.schema = next;
                true
            }
            None => false,
        }
    }

    /// Live SQL preview; no validation
    pub fn sql(&self) -> String {
        SchemaExporter::export_sql(&self.schema, &self.options)
    }

    pub fn graph(&self) -> DiagramGraph {
        to_graph(&self.schema)
    }

    /// Validate the current schema and, if it passes, produce its SQL
    pub fn commit(&mut self) -> Result<String, EditorError> {
        let report = SchemaValidator::for_dialect(self.dialect()).validate(&self.schema);
        if !report.is_valid() {
            tracing::warn!("Commit blocked by {} validation error(s)", report.errors.len());
            return Err(EditorError::Invalid(report.errors));
        }
        for warning in &report.warnings {
            tracing::debug!("Validation warning: {}", warning);
        }

        let sql = self.sql();
        tracing::info!(
            "Committed schema: {} entities, {} relationships",
            self.schema.entities.len(),
            self.schema.relationships.len()
        );
        self.committed_sql = Some(sql.clone());
        Ok(sql)
    }

    /// Replace the schema with a generated one. A failed or malformed
    /// generation leaves the current schema in place.
    pub async fn generate_from_prompt<S: SchemaService>(
        &mut self,
        service: &S,
        prompt: &str,
    ) -> Result<Vec<SchemaIssue>, EditorError> {
        let request = GenerationRequest::new(prompt, self.dialect());
        let generated = generate_schema(service, &request).await?;

        self.replace(generated.schema);
        self.prompt = Some(prompt.to_string());
        self.committed_sql = Some(generated.sql_code);
        Ok(generated.warnings)
    }

    /// Create or update the session's project
    pub async fn save(&mut self, name: &str) -> Result<Project, EditorError> {
        let sql_code = self.committed_sql.clone().unwrap_or_else(|| self.sql());

        let project = match self.project_id {
            Some(id) => {
                let dto = UpdateProject {
                    name: Some(name.to_string()),
                    prompt: self.prompt.clone(),
                    db_type: Some(self.dialect()),
                    schema: Some(self.schema.clone()),
                    sql_code: Some(sql_code),
                    ..Default::default()
                };
                self.repository.update(id, dto).await?
            }
            None => {
                let dto = CreateProject {
                    name: name.to_string(),
                    description: None,
                    prompt: self.prompt.clone(),
                    db_type: self.dialect(),
                    schema: self.schema.clone(),
                    sql_code,
                };
                self.repository.create(dto).await?
            }
        };

        tracing::info!("Saved project {} ({})", project.id, project.name);
        self.project_id = Some(project.id);
        Ok(project)
    }

    /// Start a session on a saved project
    pub async fn open(repository: Arc<R>, config: &Config, id: Uuid) -> Result<Self, EditorError> {
        let project = repository
            .find_by_id(id)
            .await?
            .ok_or(EditorError::ProjectNotFound(id))?;

        let mut session = Self::new(repository, config);
        let mut schema = project.schema;
        schema.sync_foreign_keys();
        session.schema = schema;
        session.set_dialect(project.db_type);
        session.project_id = Some(project.id);
        session.prompt = project.prompt;
        session.committed_sql = Some(project.sql_code);
        Ok(session)
    }
}
