// src/routes/kpis.rs

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use sqlx::{query, query_as, Pool, Postgres};
use uuid::Uuid;

use crate::engine::performance::format_percent;
use crate::engine::stats::{self, Statistics};
use crate::engine::trend;
use crate::models::{Category, Kpi, KpiListItem, KpiWithCategory, Metric};
use crate::AppState;

use super::{created, missing, ok, ok_with_count, storage_error, ApiError, Envelope};

/// Window of most recent metrics the stats endpoint summarizes.
const STATS_WINDOW: i64 = 30;

#[derive(Deserialize)]
pub struct ListKpisQ {
    pub status: Option<String>,
    pub category: Option<Uuid>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKpiBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Uuid>,
    pub unit: Option<String>,
    pub custom_unit: Option<String>,
    pub target_value: Option<f64>,
    pub target_type: Option<String>,
    pub frequency: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKpiBody {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<Uuid>,
    pub unit: Option<String>,
    pub custom_unit: Option<String>,
    pub target_value: Option<f64>,
    pub target_type: Option<String>,
    pub frequency: Option<String>,
    pub status: Option<String>,
    pub tags: Option<Vec<String>>,
    pub current_value: Option<f64>,
    pub previous_value: Option<f64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiStats {
    pub kpi: Kpi,
    pub statistics: Statistics,
    pub recent_metrics: Vec<Metric>,
}

/// All categories keyed by id, for resolving KPI category references.
pub async fn category_lookup(pool: &Pool<Postgres>) -> Result<HashMap<Uuid, Category>, ApiError> {
    let rows = query_as::<_, Category>(r#"SELECT * FROM categories"#)
        .fetch_all(pool)
        .await
        .map_err(storage_error)?;
    Ok(rows.into_iter().map(|c| (c.category_id, c)).collect())
}

async fn fetch_category(pool: &Pool<Postgres>, id: Option<Uuid>) -> Result<Option<Category>, ApiError> {
    let Some(id) = id else { return Ok(None) };
    query_as::<_, Category>(r#"SELECT * FROM categories WHERE category_id = $1"#)
        .bind(id)
        .fetch_optional(pool)
        .await
        .map_err(storage_error)
}

pub async fn list_kpis(
    State(state): State<AppState>,
    Query(q): Query<ListKpisQ>,
) -> Result<Json<Envelope<Vec<KpiListItem>>>, ApiError> {
    let rows = query_as::<_, Kpi>(
        r#"
        SELECT * FROM kpis
        WHERE ($1::text IS NULL OR status = $1)
          AND ($2::uuid IS NULL OR category_id = $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(q.status)
    .bind(q.category)
    .fetch_all(&state.pool)
    .await
    .map_err(storage_error)?;

    let categories = category_lookup(&state.pool).await?;
    let count = rows.len();
    let data: Vec<KpiListItem> = rows
        .into_iter()
        .map(|kpi| {
            let performance = match kpi.target_value {
                Some(t) if t != 0.0 => Some(format_percent((kpi.current_value / t) * 100.0)),
                _ => None,
            };
            let category = kpi.category_id.and_then(|id| categories.get(&id).cloned());
            KpiListItem { kpi, category, performance }
        })
        .collect();

    Ok(ok_with_count(data, count))
}

pub async fn get_kpi(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<KpiWithCategory>>, ApiError> {
    let kpi = query_as::<_, Kpi>(r#"SELECT * FROM kpis WHERE kpi_id = $1"#)
        .bind(id)
        .fetch_one(&state.pool)
        .await
        .map_err(missing("KPI not found"))?;

    let category = fetch_category(&state.pool, kpi.category_id).await?;
    Ok(ok(KpiWithCategory { kpi, category }))
}

pub async fn create_kpi(
    State(state): State<AppState>,
    Json(body): Json<CreateKpiBody>,
) -> Result<(StatusCode, Json<Envelope<KpiWithCategory>>), ApiError> {
    let (Some(name), Some(category_id), Some(unit)) = (body.name, body.category, body.unit) else {
        return Err(ApiError::Validation(
            "Missing required fields: name, category, unit".to_string(),
        ));
    };

    let kpi = query_as::<_, Kpi>(
        r#"
        INSERT INTO kpis
          (kpi_id, name, description, category_id, unit, custom_unit, target_value,
           target_type, frequency, status, current_value, previous_value, trend, tags,
           created_at, updated_at)
        VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,0,0,'stable',$11,now(),now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(name)
    .bind(body.description)
    .bind(category_id)
    .bind(unit)
    .bind(body.custom_unit)
    .bind(body.target_value)
    .bind(body.target_type.unwrap_or_else(|| "maximize".to_string()))
    .bind(body.frequency.unwrap_or_else(|| "daily".to_string()))
    .bind(body.status.unwrap_or_else(|| "active".to_string()))
    .bind(body.tags.unwrap_or_default())
    .fetch_one(&state.pool)
    .await
    .map_err(storage_error)?;

    let category = fetch_category(&state.pool, kpi.category_id).await?;
    Ok(created(KpiWithCategory { kpi, category }))
}

pub async fn update_kpi(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateKpiBody>,
) -> Result<Json<Envelope<KpiWithCategory>>, ApiError> {
    let mut kpi = query_as::<_, Kpi>(r#"SELECT * FROM kpis WHERE kpi_id = $1"#)
        .bind(id)
        .fetch_one(&state.pool)
        .await
        .map_err(missing("KPI not found"))?;

    if let Some(v) = body.name {
        kpi.name = v;
    }
    if let Some(v) = body.description {
        kpi.description = Some(v);
    }
    if let Some(v) = body.category {
        kpi.category_id = Some(v);
    }
    if let Some(v) = body.unit {
        kpi.unit = v;
    }
    if let Some(v) = body.custom_unit {
        kpi.custom_unit = Some(v);
    }
    if let Some(v) = body.target_value {
        kpi.target_value = Some(v);
    }
    if let Some(v) = body.target_type {
        kpi.target_type = v;
    }
    if let Some(v) = body.frequency {
        kpi.frequency = v;
    }
    if let Some(v) = body.status {
        kpi.status = v;
    }
    if let Some(v) = body.tags {
        kpi.tags = v;
    }

    // trend always follows the value pair; it is never set independently
    let values_changed = body.current_value.is_some() || body.previous_value.is_some();
    if let Some(v) = body.current_value {
        kpi.current_value = v;
    }
    if let Some(v) = body.previous_value {
        kpi.previous_value = v;
    }
    if values_changed {
        kpi.trend = trend::classify(kpi.current_value, kpi.previous_value).as_str().to_string();
    }

    let kpi = query_as::<_, Kpi>(
        r#"
        UPDATE kpis SET
          name = $2, description = $3, category_id = $4, unit = $5, custom_unit = $6,
          target_value = $7, target_type = $8, frequency = $9, status = $10,
          current_value = $11, previous_value = $12, trend = $13, tags = $14,
          updated_at = now()
        WHERE kpi_id = $1
        RETURNING *
        "#,
    )
    .bind(kpi.kpi_id)
    .bind(&kpi.name)
    .bind(&kpi.description)
    .bind(kpi.category_id)
    .bind(&kpi.unit)
    .bind(&kpi.custom_unit)
    .bind(kpi.target_value)
    .bind(&kpi.target_type)
    .bind(&kpi.frequency)
    .bind(&kpi.status)
    .bind(kpi.current_value)
    .bind(kpi.previous_value)
    .bind(&kpi.trend)
    .bind(&kpi.tags)
    .fetch_one(&state.pool)
    .await
    .map_err(storage_error)?;

    let category = fetch_category(&state.pool, kpi.category_id).await?;
    Ok(ok(KpiWithCategory { kpi, category }))
}

pub async fn delete_kpi(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    let _ = query_as::<_, Kpi>(r#"SELECT * FROM kpis WHERE kpi_id = $1"#)
        .bind(id)
        .fetch_one(&state.pool)
        .await
        .map_err(missing("KPI not found"))?;

    // the KPI owns its metrics: sweep them before the row itself
    let mut tx = state.pool.begin().await.map_err(storage_error)?;
    query(r#"DELETE FROM metrics WHERE kpi_id = $1"#)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;
    query(r#"DELETE FROM kpis WHERE kpi_id = $1"#)
        .bind(id)
        .execute(&mut *tx)
        .await
        .map_err(storage_error)?;
    tx.commit().await.map_err(storage_error)?;

    Ok(ok(serde_json::json!({})))
}

pub async fn kpi_stats(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<KpiStats>>, ApiError> {
    let kpi = query_as::<_, Kpi>(r#"SELECT * FROM kpis WHERE kpi_id = $1"#)
        .bind(id)
        .fetch_one(&state.pool)
        .await
        .map_err(missing("KPI not found"))?;

    let metrics = query_as::<_, Metric>(
        r#"SELECT * FROM metrics WHERE kpi_id = $1 ORDER BY recorded_at DESC LIMIT $2"#,
    )
    .bind(id)
    .bind(STATS_WINDOW)
    .fetch_all(&state.pool)
    .await
    .map_err(storage_error)?;

    let values: Vec<f64> = metrics.iter().map(|m| m.value).collect();
    let statistics = stats::recent_statistics(&values);
    let recent_metrics: Vec<Metric> = metrics.into_iter().take(10).collect();

    Ok(ok(KpiStats { kpi, statistics, recent_metrics }))
}
