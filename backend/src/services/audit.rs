//! Audit log service
//!
//! Append-only record of every status transition and mutating action.
//! Writers call `AuditService::record` inside their own open transaction so
//! the audit row commits or rolls back together with the change it
//! describes.

use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use shared::models::{AuditAction, AuditLog};

/// Audit log service
#[derive(Clone)]
pub struct AuditService {
    db: PgPool,
}

/// Row for audit queries
#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: Uuid,
    user_id: Uuid,
    action: String,
    entity_type: String,
    entity_id: Uuid,
    before: Option<Value>,
    after: Option<Value>,
    created_at: DateTime<Utc>,
}

impl AuditRow {
    fn into_entry(self) -> AppResult<AuditLog> {
        let action = AuditAction::from_str(&self.action)
            .ok_or_else(|| AppError::Internal(format!("Unknown audit action: {}", self.action)))?;
        Ok(AuditLog {
            id: self.id,
            user_id: self.user_id,
            action,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            before: self.before,
            after: self.after,
            created_at: self.created_at,
        })
    }
}

impl AuditService {
    /// Create a new AuditService instance
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append an audit entry inside the caller's transaction
    pub async fn record(
        conn: &mut PgConnection,
        user_id: Uuid,
        action: AuditAction,
        entity_type: &str,
        entity_id: Uuid,
        before: Option<Value>,
        after: Option<Value>,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO audit_log (user_id, action, entity_type, entity_id, before, after)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user_id)
        .bind(action.as_str())
        .bind(entity_type)
        .bind(entity_id)
        .bind(before)
        .bind(after)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// List recent audit entries, newest first
    pub async fn list(&self, limit: i64) -> AppResult<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, user_id, action, entity_type, entity_id, before, after, created_at
            FROM audit_log
            ORDER BY created_at DESC
            LIMIT $1
            "#,
        )
        .bind(limit.clamp(1, 500))
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(AuditRow::into_entry).collect()
    }

    /// List audit entries for one entity, oldest first
    pub async fn list_for_entity(
        &self,
        entity_type: &str,
        entity_id: Uuid,
    ) -> AppResult<Vec<AuditLog>> {
        let rows = sqlx::query_as::<_, AuditRow>(
            r#"
            SELECT id, user_id, action, entity_type, entity_id, before, after, created_at
            FROM audit_log
            WHERE entity_type = $1 AND entity_id = $2
            ORDER BY created_at ASC
            "#,
        )
        .bind(entity_type)
        .bind(entity_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(AuditRow::into_entry).collect()
    }
}
