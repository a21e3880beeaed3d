//! Contract with the prompt-to-schema service and the intake gate for its output.
//!
//! The service itself lives outside this crate. Whatever it returns goes
//! through [`accept_generated`] exactly once: the text must be a JSON object
//! shaped like `{"schema": {"entities": [...], "relationships": [...]}, "sqlCode": "..."}`
//! whose ids all resolve. Nothing is repaired; anything else is a retryable
//! [`ExternalServiceError::MalformedResponse`].

use crate::core::dialect::SqlDialect;
use crate::core::schema::{FieldReference, Schema};
use crate::core::validation::{SchemaIssue, SchemaValidator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::future::Future;

fn default_true() -> bool {
    true
}

/// Request sent to the generation service
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub prompt: String,
    #[serde(rename = "dbType")]
    pub dialect: SqlDialect,
    #[serde(default = "default_true")]
    pub include_constraints: bool,
    #[serde(default)]
    pub include_sample_data: bool,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>, dialect: SqlDialect) -> Self {
        Self {
            prompt: prompt.into(),
            dialect,
            include_constraints: true,
            include_sample_data: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExternalServiceError {
    #[error("Prompt is required")]
    EmptyPrompt,
    #[error("Schema service unavailable: {0}")]
    Unavailable(String),
    #[error("Malformed schema response: {0}")]
    MalformedResponse(String),
}

impl ExternalServiceError {
    /// Whether asking again may succeed
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ExternalServiceError::EmptyPrompt)
    }
}

/// Prompt-to-schema collaborator. Implementations return the raw response text.
pub trait SchemaService: Send + Sync {
    fn generate(
        &self,
        request: &GenerationRequest,
    ) -> impl Future<Output = Result<String, ExternalServiceError>> + Send;
}

/// An accepted candidate
#[derive(Clone, Debug)]
pub struct GeneratedSchema {
    pub schema: Schema,
    pub sql_code: String,
    /// Non-blocking findings such as a missing primary key
    pub warnings: Vec<SchemaIssue>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
    schema: Schema,
    sql_code: String,
}

fn malformed(reason: impl Into<String>) -> ExternalServiceError {
    ExternalServiceError::MalformedResponse(reason.into())
}

fn check_shape(payload: &Value) -> Result<(), ExternalServiceError> {
    let object = payload
        .as_object()
        .ok_or_else(|| malformed("expected a JSON object"))?;

    let schema = object
        .get("schema")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("missing 'schema' object"))?;
    for key in ["entities", "relationships"] {
        if !schema.get(key).is_some_and(Value::is_array) {
            return Err(malformed(format!("'schema.{}' must be an array", key)));
        }
    }

    if !object.get("sqlCode").is_some_and(Value::is_string) {
        return Err(malformed("missing 'sqlCode' string"));
    }
    Ok(())
}

fn describe(reference: Option<&FieldReference>) -> String {
    match reference {
        Some(reference) => format!("'{}.{}'", reference.table, reference.field),
        None => "nothing".to_string(),
    }
}

/// Foreign key claims in `received` that the relationship list does not back.
/// An `isForeignKey` flag without `references` is an omitted view, not a claim.
fn foreign_key_drift(received: &Schema, synced: &Schema) -> Vec<SchemaIssue> {
    let mut drift = Vec::new();
    for (before, after) in received.entities.iter().zip(&synced.entities) {
        for (claimed, derived) in before.fields.iter().zip(&after.fields) {
            let contradicted = match &claimed.references {
                Some(reference) => derived.references.as_ref() != Some(reference),
                None => claimed.is_foreign_key && !derived.is_foreign_key,
            };
            if contradicted {
                drift.push(SchemaIssue::ForeignKeyMismatch {
                    entity: after.label().to_string(),
                    field: derived.label().to_string(),
                    claimed: describe(claimed.references.as_ref()),
                    derived: describe(derived.references.as_ref()),
                });
            }
        }
    }
    drift
}

/// Strictly accept a raw service response
pub fn accept_generated(raw: &str) -> Result<GeneratedSchema, ExternalServiceError> {
    let payload: Value =
        serde_json::from_str(raw.trim()).map_err(|e| malformed(format!("not JSON: {}", e)))?;
    check_shape(&payload)?;

    let envelope: Envelope =
        serde_json::from_value(payload).map_err(|e| malformed(e.to_string()))?;
    let received = envelope.schema;

    let mut schema = received.clone();
    schema.sync_foreign_keys();
    let drift = foreign_key_drift(&received, &schema);
    for issue in &drift {
        tracing::debug!("Generated schema disagrees with its relationships: {}", issue);
    }

    let report = SchemaValidator::new().validate(&schema);
    if let Some(issue) = report.errors.iter().find(|issue| issue.is_referential()) {
        return Err(malformed(issue.to_string()));
    }

    let warnings = drift
        .into_iter()
        .chain(report.errors)
        .chain(report.warnings)
        .collect();

    Ok(GeneratedSchema {
        schema,
        sql_code: envelope.sql_code,
        warnings,
    })
}

/// Ask `service` for a schema and run the result through [`accept_generated`]
pub async fn generate_schema<S: SchemaService>(
    service: &S,
    request: &GenerationRequest,
) -> Result<GeneratedSchema, ExternalServiceError> {
    if request.prompt.trim().is_empty() {
        return Err(ExternalServiceError::EmptyPrompt);
    }

    tracing::info!("Requesting {} schema from generation service", request.dialect);
    let raw = service.generate(request).await?;

    match accept_generated(&raw) {
        Ok(generated) => {
            tracing::info!(
                "Accepted generated schema: {} entities, {} relationships",
                generated.schema.entities.len(),
                generated.schema.relationships.len()
            );
            Ok(generated)
        }
        Err(e) => {
            tracing::warn!("Rejected generated schema: {}", e);
            Err(e)
        }
    }
}
