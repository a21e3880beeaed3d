//! Saved projects and the repository they live in.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::future::Future;
use uuid::Uuid;

use crate::core::dialect::SqlDialect;
use crate::core::schema::Schema;

/// A saved design: the schema plus the SQL shown next to it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub prompt: Option<String>,
    pub db_type: SqlDialect,
    pub schema: Schema,
    pub sql_code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Project data for creation (without id and timestamps)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProject {
    pub name: String,
    pub description: Option<String>,
    pub prompt: Option<String>,
    #[serde(default)]
    pub db_type: SqlDialect,
    pub schema: Schema,
    #[serde(default)]
    pub sql_code: String,
}

/// Project data for updates
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProject {
    pub name: Option<String>,
    pub description: Option<String>,
    pub prompt: Option<String>,
    pub db_type: Option<SqlDialect>,
    pub schema: Option<Schema>,
    pub sql_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("Project not found")]
    NotFound,

    #[error("Project name cannot be empty")]
    EmptyName,

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Project storage
pub trait ProjectRepository: Send + Sync {
    fn create(
        &self,
        dto: CreateProject,
    ) -> impl Future<Output = Result<Project, RepositoryError>> + Send;

    fn find_by_id(
        &self,
        id: Uuid,
    ) -> impl Future<Output = Result<Option<Project>, RepositoryError>> + Send;

    /// Newest first
    fn list(&self) -> impl Future<Output = Result<Vec<Project>, RepositoryError>> + Send;

    fn update(
        &self,
        id: Uuid,
        dto: UpdateProject,
    ) -> impl Future<Output = Result<Project, RepositoryError>> + Send;

    fn delete(&self, id: Uuid) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}

/// Process-local repository
#[derive(Debug, Default)]
pub struct InMemoryProjectRepository {
    projects: DashMap<Uuid, Project>,
}

impl InMemoryProjectRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

fn checked_name(name: &str) -> Result<String, RepositoryError> {
    let name = name.trim();
    if name.is_empty() {
        Err(RepositoryError::EmptyName)
    } else {
        Ok(name.to_string())
    }
}

impl ProjectRepository for InMemoryProjectRepository {
    async fn create(&self, dto: CreateProject) -> Result<Project, RepositoryError> {
        let now = Utc::now();
        let project = Project {
            id: Uuid::new_v4(),
            name: checked_name(&dto.name)?,
            description: dto.description,
            prompt: dto.prompt,
            db_type: dto.db_type,
            schema: dto.schema,
            sql_code: dto.sql_code,
            created_at: now,
            updated_at: now,
        };
        self.projects.insert(project.id, project.clone());
        tracing::debug!("Created project {} ({})", project.id, project.name);
        Ok(project)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Project>, RepositoryError> {
        Ok(self.projects.get(&id).map(|p| p.value().clone()))
    }

    async fn list(&self) -> Result<Vec<Project>, RepositoryError> {
        let mut projects: Vec<Project> = self.projects.iter().map(|p| p.value().clone()).collect();
        projects.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(projects)
    }

    async fn update(&self, id: Uuid, dto: UpdateProject) -> Result<Project, RepositoryError> {
        let name = dto.name.as_deref().map(checked_name).transpose()?;
        let mut entry = self.projects.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        let project = entry.value_mut();

        if let Some(name) = name {
            project.name = name;
        }
        if let Some(description) = dto.description {
            project.description = Some(description);
        }
        if let Some(prompt) = dto.prompt {
            project.prompt = Some(prompt);
        }
        if let Some(db_type) = dto.db_type {
            project.db_type = db_type;
        }
        if let Some(schema) = dto.schema {
            project.schema = schema;
        }
        if let Some(sql_code) = dto.sql_code {
            project.sql_code = sql_code;
        }
        project.updated_at = Utc::now();

        tracing::debug!("Updated project {}", id);
        Ok(project.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.projects
            .remove(&id)
            .map(|_| tracing::debug!("Deleted project {}", id))
            .ok_or(RepositoryError::NotFound)
    }
}
