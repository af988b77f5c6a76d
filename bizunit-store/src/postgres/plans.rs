use sqlx::PgPool;
use uuid::Uuid;

use crate::store::{NewPlan, PlanRecord, PlanSummary, StoreError};

pub async fn upsert_plan(pool: &PgPool, plan: NewPlan) -> Result<PlanRecord, StoreError> {
    let rec = sqlx::query_as::<_, PlanRecord>(
        r#"
INSERT INTO plan_templates (id, name, description, doc_hash, document)
VALUES ($1, $2, $3, $4, $5)
ON CONFLICT (name) DO UPDATE
SET description = EXCLUDED.description,
    doc_hash = EXCLUDED.doc_hash,
    document = EXCLUDED.document,
    version = CASE
      WHEN plan_templates.doc_hash = EXCLUDED.doc_hash THEN plan_templates.version
      ELSE plan_templates.version + 1
    END,
    updated_at = now()
RETURNING id, name, description, doc_hash, document, version, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&plan.name)
    .bind(&plan.description)
    .bind(&plan.doc_hash)
    .bind(&plan.document)
    .fetch_one(pool)
    .await?;
    tracing::info!(plan = %rec.name, version = rec.version, "plan published");
    Ok(rec)
}

pub async fn get_plan(pool: &PgPool, name: &str) -> Result<Option<PlanRecord>, StoreError> {
    let rec = sqlx::query_as::<_, PlanRecord>(
        r#"
SELECT id, name, description, doc_hash, document, version, created_at, updated_at
FROM plan_templates WHERE name = $1
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await?;
    Ok(rec)
}

pub async fn list_plans(pool: &PgPool) -> Result<Vec<PlanSummary>, StoreError> {
    let rows = sqlx::query_as::<_, PlanSummary>(
        r#"SELECT name, description, version, updated_at FROM plan_templates ORDER BY updated_at DESC, name"#,
    )
    .fetch_all(pool)
    .await?;
    Ok(rows)
}
