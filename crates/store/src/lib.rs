pub mod migrations;

use chrono::Utc;
use mockd_models::{
    normalize_path, CreateEndpointRequest, EndpointDefinition, Method, MockError,
    UpdateEndpointRequest,
};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{info, instrument};

/// Persistent store of endpoint definitions, keyed by numeric id with a
/// uniqueness constraint on (path, method).
///
/// Every row write is a single statement, so concurrent readers observe
/// either the old or the new committed version of a definition, never a
/// torn one. Callers get owned snapshots; nothing hands out references
/// into shared state.
#[derive(Clone)]
pub struct EndpointStore {
    pool: SqlitePool,
}

impl EndpointStore {
    pub async fn new(pool: SqlitePool) -> Result<Self, MockError> {
        migrations::run_migrations(&pool)
            .await
            .map_err(|e| MockError::DatabaseError {
                reason: e.to_string(),
            })?;
        Ok(Self { pool })
    }

    /// Every mock request reads the full definition set fresh; there is
    /// no cache to invalidate.
    pub async fn list(&self) -> Result<Vec<EndpointDefinition>, MockError> {
        let rows = sqlx::query("SELECT * FROM endpoints ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .map_err(MockError::SqlxError)?;

        rows.iter().map(row_to_definition).collect()
    }

    pub async fn get(&self, id: i64) -> Result<EndpointDefinition, MockError> {
        let row = sqlx::query("SELECT * FROM endpoints WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(MockError::SqlxError)?
            .ok_or(MockError::EndpointNotFound { id })?;

        row_to_definition(&row)
    }

    pub async fn get_by_key(
        &self,
        path: &str,
        method: Method,
    ) -> Result<Option<EndpointDefinition>, MockError> {
        let row = sqlx::query("SELECT * FROM endpoints WHERE path = ? AND method = ?")
            .bind(normalize_path(path))
            .bind(method.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(MockError::SqlxError)?;

        row.as_ref().map(row_to_definition).transpose()
    }

    /// Create or replace the definition for (path, method). Replace is
    /// whole-row: the previous per-method config does not survive, only
    /// the row id and created_at do.
    #[instrument(skip(self, request), fields(path = %request.path, method = %request.method))]
    pub async fn upsert(
        &self,
        request: CreateEndpointRequest,
    ) -> Result<EndpointDefinition, MockError> {
        let path = normalize_path(&request.path);
        let method = request.method;
        let status = validate_status(request.status.unwrap_or(200))?;
        // An omitted response body serves as an empty object.
        let response = if request.response.is_null() {
            Value::Object(Default::default())
        } else {
            request.response
        };
        let schema_json = request
            .schema
            .as_ref()
            .map(|s| serde_json::to_string(s))
            .transpose()
            .map_err(|e| MockError::InternalError {
                reason: e.to_string(),
            })?;
        let now = Utc::now();

        sqlx::query(
            r#"
            INSERT INTO endpoints (
                path, method, response, status, auth_key, schema, upstream,
                created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(path, method) DO UPDATE SET
                response = excluded.response,
                status = excluded.status,
                auth_key = excluded.auth_key,
                schema = excluded.schema,
                upstream = excluded.upstream,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&path)
        .bind(method.as_str())
        .bind(response.to_string())
        .bind(status as i64)
        .bind(&request.auth_key)
        .bind(&schema_json)
        .bind(&request.upstream)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(MockError::SqlxError)?;

        let stored = self
            .get_by_key(&path, method)
            .await?
            .ok_or_else(|| MockError::InternalError {
                reason: format!("upserted endpoint {method} {path} not readable"),
            })?;

        info!(
            "Stored endpoint definition {} {} (id {})",
            method, path, stored.id
        );
        Ok(stored)
    }

    /// Partial update by id; absent fields keep their stored values.
    #[instrument(skip(self, request))]
    pub async fn update(
        &self,
        id: i64,
        request: UpdateEndpointRequest,
    ) -> Result<EndpointDefinition, MockError> {
        let mut definition = self.get(id).await?;

        if let Some(path) = request.path {
            definition.path = normalize_path(&path);
        }
        if let Some(method) = request.method {
            definition.method = method;
        }
        if let Some(response) = request.response {
            definition.response = response;
        }
        if let Some(status) = request.status {
            definition.status = validate_status(status)?;
        }
        if let Some(auth_key) = request.auth_key {
            definition.auth_key = Some(auth_key);
        }
        if let Some(schema) = request.schema {
            definition.schema = Some(schema);
        }
        if let Some(upstream) = request.upstream {
            definition.upstream = Some(upstream);
        }

        definition.updated_at = Utc::now();
        let schema_json = definition
            .schema
            .as_ref()
            .map(|s| serde_json::to_string(s))
            .transpose()
            .map_err(|e| MockError::InternalError {
                reason: e.to_string(),
            })?;

        sqlx::query(
            r#"
            UPDATE endpoints SET
                path = ?, method = ?, response = ?, status = ?,
                auth_key = ?, schema = ?, upstream = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&definition.path)
        .bind(definition.method.as_str())
        .bind(definition.response.to_string())
        .bind(definition.status as i64)
        .bind(&definition.auth_key)
        .bind(&schema_json)
        .bind(&definition.upstream)
        .bind(definition.updated_at)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_unique_violation)?;

        Ok(definition)
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: i64) -> Result<(), MockError> {
        let result = sqlx::query("DELETE FROM endpoints WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(MockError::SqlxError)?;

        if result.rows_affected() == 0 {
            return Err(MockError::EndpointNotFound { id });
        }

        info!("Deleted endpoint definition {}", id);
        Ok(())
    }
}

fn validate_status(status: u16) -> Result<u16, MockError> {
    if (100..=599).contains(&status) {
        Ok(status)
    } else {
        Err(MockError::MalformedDefinition {
            reason: format!("status {status} is not a valid HTTP status code"),
        })
    }
}

fn map_unique_violation(e: sqlx::Error) -> MockError {
    match &e {
        sqlx::Error::Database(db) if db.message().contains("UNIQUE") => {
            MockError::MalformedDefinition {
                reason: "an endpoint already exists for that path and method".to_string(),
            }
        }
        _ => MockError::SqlxError(e),
    }
}

fn row_to_definition(row: &SqliteRow) -> Result<EndpointDefinition, MockError> {
    let method_raw: String = row.try_get("method").map_err(MockError::SqlxError)?;
    let method = method_raw
        .parse::<Method>()
        .map_err(|e| MockError::DatabaseError {
            reason: format!("corrupt method column: {e}"),
        })?;

    let response_raw: String = row.try_get("response").map_err(MockError::SqlxError)?;
    let response = serde_json::from_str(&response_raw).map_err(|e| MockError::DatabaseError {
        reason: format!("corrupt response column: {e}"),
    })?;

    let schema_raw: Option<String> = row.try_get("schema").map_err(MockError::SqlxError)?;
    let schema = schema_raw
        .as_deref()
        .map(serde_json::from_str)
        .transpose()
        .map_err(|e| MockError::DatabaseError {
            reason: format!("corrupt schema column: {e}"),
        })?;

    let status: i64 = row.try_get("status").map_err(MockError::SqlxError)?;
    let status = u16::try_from(status).map_err(|_| MockError::DatabaseError {
        reason: format!("corrupt status column: {status}"),
    })?;

    Ok(EndpointDefinition {
        id: row.try_get("id").map_err(MockError::SqlxError)?,
        path: row.try_get("path").map_err(MockError::SqlxError)?,
        method,
        response,
        status,
        auth_key: row.try_get("auth_key").map_err(MockError::SqlxError)?,
        schema,
        upstream: row.try_get("upstream").map_err(MockError::SqlxError)?,
        created_at: row.try_get("created_at").map_err(MockError::SqlxError)?,
        updated_at: row.try_get("updated_at").map_err(MockError::SqlxError)?,
    })
}
