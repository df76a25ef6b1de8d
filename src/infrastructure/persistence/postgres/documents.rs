//! # JSONB Document Table
//!
//! Aggregates are stored whole as JSONB in a single `documents` table keyed
//! by `(kind, id)`. Tenant and parent-event ids are copied into columns so
//! every query can filter on them with an index; everything else is read
//! from the document with `#>>` path expressions.

use crate::domain::value_objects::{TenantId, Timestamp};
use crate::infrastructure::persistence::traits::{Page, RepositoryError, RepositoryResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Predicate on a stored document.
#[derive(Debug, Clone)]
pub(crate) enum Filter {
    /// `scope_id` column equals the value (the parent event).
    Scope(Uuid),
    /// Text at a JSON path equals the value.
    Field(&'static str, String),
    /// Text at a JSON path equals the value, ignoring case.
    FieldCi(&'static str, String),
    /// Timestamp at a JSON path is strictly after the value.
    After(&'static str, Timestamp),
}

/// Sort order over a timestamp or text path.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Order {
    /// Ascending by a timestamp path.
    TimeAsc(&'static str),
    /// Descending by a timestamp path.
    TimeDesc(&'static str),
    /// Ascending by a text path.
    TextAsc(&'static str),
}

/// Serializes a value and returns it as the plain string it encodes to,
/// matching what `#>>` yields for enums and ids.
pub(crate) fn json_text<T: Serialize>(value: &T) -> RepositoryResult<String> {
    match serde_json::to_value(value)? {
        serde_json::Value::String(s) => Ok(s),
        other => Ok(other.to_string()),
    }
}

/// One logical table inside `documents`.
#[derive(Debug, Clone)]
pub(crate) struct Documents {
    pool: PgPool,
    kind: &'static str,
}

impl Documents {
    pub(crate) fn new(pool: PgPool, kind: &'static str) -> Self {
        Self { pool, kind }
    }

    /// Inserts or replaces a document unconditionally.
    pub(crate) async fn upsert<T: Serialize + Sync>(
        &self,
        id: Uuid,
        tenant: TenantId,
        scope: Option<Uuid>,
        version: u64,
        body: &T,
    ) -> RepositoryResult<()> {
        let body = serde_json::to_value(body)?;
        sqlx::query(
            r#"
            INSERT INTO documents (kind, id, tenant_id, scope_id, version, body)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (kind, id) DO UPDATE
            SET scope_id = EXCLUDED.scope_id,
                version = EXCLUDED.version,
                body = EXCLUDED.body,
                updated_at = now()
            "#,
        )
        .bind(self.kind)
        .bind(id)
        .bind(tenant.as_uuid())
        .bind(scope)
        .bind(to_i64(version))
        .bind(body)
        .execute(&self.pool)
        .await
        .map_err(query_error)?;
        Ok(())
    }

    /// Inserts, or replaces only when the stored version is lower.
    pub(crate) async fn upsert_versioned<T: Serialize + Sync>(
        &self,
        id: Uuid,
        tenant: TenantId,
        scope: Option<Uuid>,
        version: u64,
        body: &T,
    ) -> RepositoryResult<()> {
        let json = serde_json::to_value(body)?;
        let result = sqlx::query(
            r#"
            INSERT INTO documents (kind, id, tenant_id, scope_id, version, body)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (kind, id) DO UPDATE
            SET scope_id = EXCLUDED.scope_id,
                version = EXCLUDED.version,
                body = EXCLUDED.body,
                updated_at = now()
            WHERE documents.version < EXCLUDED.version
            "#,
        )
        .bind(self.kind)
        .bind(id)
        .bind(tenant.as_uuid())
        .bind(scope)
        .bind(to_i64(version))
        .bind(json)
        .execute(&self.pool)
        .await
        .map_err(query_error)?;

        if result.rows_affected() == 0 {
            let (actual,): (i64,) =
                sqlx::query_as("SELECT version FROM documents WHERE kind = $1 AND id = $2")
                    .bind(self.kind)
                    .bind(id)
                    .fetch_one(&self.pool)
                    .await
                    .map_err(query_error)?;
            return Err(RepositoryError::version_conflict(
                self.kind,
                id.to_string(),
                version.saturating_sub(1),
                u64::try_from(actual).unwrap_or_default(),
            ));
        }
        Ok(())
    }

    /// Loads one document owned by `tenant`.
    pub(crate) async fn get<T: DeserializeOwned>(
        &self,
        tenant: TenantId,
        id: Uuid,
    ) -> RepositoryResult<Option<T>> {
        let row: Option<(serde_json::Value,)> = sqlx::query_as(
            "SELECT body FROM documents WHERE kind = $1 AND id = $2 AND tenant_id = $3",
        )
        .bind(self.kind)
        .bind(id)
        .bind(tenant.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(query_error)?;
        row.map(|(body,)| serde_json::from_value(body).map_err(RepositoryError::from))
            .transpose()
    }

    /// Loads the first document of any tenant whose path equals `value`.
    pub(crate) async fn find_any_tenant<T: DeserializeOwned>(
        &self,
        path: &'static str,
        value: &str,
    ) -> RepositoryResult<Option<T>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents WHERE kind = ");
        qb.push_bind(self.kind);
        qb.push(format!(" AND body #>> '{{{path}}}' = "));
        qb.push_bind(value.to_string());
        qb.push(" LIMIT 1");
        let row: Option<(serde_json::Value,)> = qb
            .build_query_as()
            .fetch_optional(&self.pool)
            .await
            .map_err(query_error)?;
        row.map(|(body,)| serde_json::from_value(body).map_err(RepositoryError::from))
            .transpose()
    }

    /// Loads documents of `tenant` matching every filter.
    pub(crate) async fn find<T: DeserializeOwned>(
        &self,
        tenant: TenantId,
        filters: &[Filter],
        order: Order,
        page: Option<Page>,
    ) -> RepositoryResult<Vec<T>> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT body FROM documents");
        self.push_where(&mut qb, tenant, filters);
        let order_by = match order {
            Order::TimeAsc(path) => format!(" ORDER BY (body #>> '{{{path}}}')::timestamptz ASC"),
            Order::TimeDesc(path) => format!(" ORDER BY (body #>> '{{{path}}}')::timestamptz DESC"),
            Order::TextAsc(path) => format!(" ORDER BY body #>> '{{{path}}}' ASC"),
        };
        qb.push(order_by);
        if let Some(page) = page {
            qb.push(" LIMIT ");
            qb.push_bind(to_i64(page.limit as u64));
            qb.push(" OFFSET ");
            qb.push_bind(to_i64(page.offset as u64));
        }
        let rows: Vec<(serde_json::Value,)> = qb
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(query_error)?;
        rows.into_iter()
            .map(|(body,)| serde_json::from_value(body).map_err(RepositoryError::from))
            .collect()
    }

    /// Counts documents of `tenant` matching every filter.
    pub(crate) async fn count(&self, tenant: TenantId, filters: &[Filter]) -> RepositoryResult<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM documents");
        self.push_where(&mut qb, tenant, filters);
        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(&self.pool)
            .await
            .map_err(query_error)?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>, tenant: TenantId, filters: &[Filter]) {
        qb.push(" WHERE kind = ");
        qb.push_bind(self.kind);
        qb.push(" AND tenant_id = ");
        qb.push_bind(tenant.as_uuid());
        for filter in filters {
            match filter {
                Filter::Scope(scope) => {
                    qb.push(" AND scope_id = ");
                    qb.push_bind(*scope);
                }
                Filter::Field(path, value) => {
                    qb.push(format!(" AND body #>> '{{{path}}}' = "));
                    qb.push_bind(value.clone());
                }
                Filter::FieldCi(path, value) => {
                    qb.push(format!(" AND lower(body #>> '{{{path}}}') = lower("));
                    qb.push_bind(value.clone());
                    qb.push(")");
                }
                Filter::After(path, ts) => {
                    qb.push(format!(" AND (body #>> '{{{path}}}')::timestamptz > "));
                    qb.push_bind(*ts.as_datetime());
                }
            }
        }
    }
}

pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

pub(crate) fn query_error(e: sqlx::Error) -> RepositoryError {
    match e {
        sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
            RepositoryError::connection(e.to_string())
        }
        other => RepositoryError::query(other.to_string()),
    }
}
