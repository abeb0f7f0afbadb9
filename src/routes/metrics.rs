// src/routes/metrics.rs

use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use sqlx::{query, query_as, Postgres, Transaction};
use uuid::Uuid;

use crate::engine::update;
use crate::models::{Kpi, Metric};
use crate::AppState;

use super::{
    created, created_with_count, missing, ok, ok_with_count, storage_error, ApiError, Envelope,
};

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListMetricsQ {
    pub kpi: Option<Uuid>,
    pub period: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateMetricBody {
    pub kpi: Option<Uuid>,
    pub value: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub period: Option<String>,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_by: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMetricBody {
    pub value: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
    pub period: Option<String>,
    pub period_start: Option<DateTime<Utc>>,
    pub period_end: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Deserialize)]
pub struct ByKpiQ {
    pub limit: Option<i64>,
    pub period: Option<String>,
}

#[derive(Deserialize)]
pub struct BulkBody {
    pub metrics: Option<Vec<CreateMetricBody>>,
}

/// A metric record that passed request validation.
#[derive(Debug)]
struct NewMetric {
    kpi_id: Uuid,
    value: f64,
    recorded_at: Option<DateTime<Utc>>,
    period: String,
    period_start: DateTime<Utc>,
    period_end: DateTime<Utc>,
    notes: Option<String>,
    metadata: Option<serde_json::Value>,
    created_by: String,
}

fn validate(body: CreateMetricBody) -> Result<NewMetric, ApiError> {
    match (body.kpi, body.value, body.period, body.period_start, body.period_end) {
        (Some(kpi_id), Some(value), Some(period), Some(period_start), Some(period_end)) => {
            Ok(NewMetric {
                kpi_id,
                value,
                recorded_at: body.timestamp,
                period,
                period_start,
                period_end,
                notes: body.notes,
                metadata: body.metadata,
                created_by: body.created_by.unwrap_or_else(|| "system".to_string()),
            })
        }
        _ => Err(ApiError::Validation(
            "Missing required fields: kpi, value, period, periodStart, periodEnd".to_string(),
        )),
    }
}

async fn insert_metric(
    tx: &mut Transaction<'_, Postgres>,
    new: &NewMetric,
) -> Result<Metric, ApiError> {
    query_as::<_, Metric>(
        r#"
        INSERT INTO metrics
          (metric_id, kpi_id, value, recorded_at, period, period_start, period_end,
           notes, metadata, created_by, created_at)
        VALUES ($1,$2,$3,COALESCE($4, now()),$5,$6,$7,$8,$9,$10,now())
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(new.kpi_id)
    .bind(new.value)
    .bind(new.recorded_at)
    .bind(&new.period)
    .bind(new.period_start)
    .bind(new.period_end)
    .bind(&new.notes)
    .bind(&new.metadata)
    .bind(&new.created_by)
    .fetch_one(&mut **tx)
    .await
    .map_err(storage_error)
}

async fn write_kpi_values(
    tx: &mut Transaction<'_, Postgres>,
    kpi_id: Uuid,
    values: update::ValueUpdate,
) -> Result<(), ApiError> {
    query(
        r#"
        UPDATE kpis SET
          current_value = $2, previous_value = $3, trend = $4, updated_at = now()
        WHERE kpi_id = $1
        "#,
    )
    .bind(kpi_id)
    .bind(values.current_value)
    .bind(values.previous_value)
    .bind(values.trend.as_str())
    .execute(&mut **tx)
    .await
    .map_err(storage_error)?;
    Ok(())
}

pub async fn list_metrics(
    State(state): State<AppState>,
    Query(q): Query<ListMetricsQ>,
) -> Result<Json<Envelope<Vec<Metric>>>, ApiError> {
    let rows = query_as::<_, Metric>(
        r#"
        SELECT * FROM metrics
        WHERE ($1::uuid IS NULL OR kpi_id = $1)
          AND ($2::text IS NULL OR period = $2)
          AND ($3::timestamptz IS NULL OR recorded_at >= $3)
          AND ($4::timestamptz IS NULL OR recorded_at <= $4)
        ORDER BY recorded_at DESC
        "#,
    )
    .bind(q.kpi)
    .bind(q.period)
    .bind(q.start_date)
    .bind(q.end_date)
    .fetch_all(&state.pool)
    .await
    .map_err(storage_error)?;

    let count = rows.len();
    Ok(ok_with_count(rows, count))
}

pub async fn get_metric(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Metric>>, ApiError> {
    let row = query_as::<_, Metric>(r#"SELECT * FROM metrics WHERE metric_id = $1"#)
        .bind(id)
        .fetch_one(&state.pool)
        .await
        .map_err(missing("Metric not found"))?;
    Ok(ok(row))
}

pub async fn create_metric(
    State(state): State<AppState>,
    Json(body): Json<CreateMetricBody>,
) -> Result<(StatusCode, Json<Envelope<Metric>>), ApiError> {
    let new = validate(body)?;

    let kpi = query_as::<_, Kpi>(r#"SELECT * FROM kpis WHERE kpi_id = $1"#)
        .bind(new.kpi_id)
        .fetch_one(&state.pool)
        .await
        .map_err(missing("KPI not found"))?;

    let mut tx = state.pool.begin().await.map_err(storage_error)?;
    let metric = insert_metric(&mut tx, &new).await?;
    let values = update::apply_observation(kpi.current_value, new.value);
    write_kpi_values(&mut tx, kpi.kpi_id, values).await?;
    tx.commit().await.map_err(storage_error)?;

    Ok(created(metric))
}

pub async fn update_metric(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(body): Json<UpdateMetricBody>,
) -> Result<Json<Envelope<Metric>>, ApiError> {
    let row = query_as::<_, Metric>(
        r#"
        UPDATE metrics SET
          value        = COALESCE($2, value),
          recorded_at  = COALESCE($3, recorded_at),
          period       = COALESCE($4, period),
          period_start = COALESCE($5, period_start),
          period_end   = COALESCE($6, period_end),
          notes        = COALESCE($7, notes),
          metadata     = COALESCE($8, metadata)
        WHERE metric_id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(body.value)
    .bind(body.timestamp)
    .bind(body.period)
    .bind(body.period_start)
    .bind(body.period_end)
    .bind(body.notes)
    .bind(body.metadata)
    .fetch_one(&state.pool)
    .await
    .map_err(missing("Metric not found"))?;

    Ok(ok(row))
}

pub async fn delete_metric(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<Envelope<serde_json::Value>>, ApiError> {
    let res = query(r#"DELETE FROM metrics WHERE metric_id = $1"#)
        .bind(id)
        .execute(&state.pool)
        .await
        .map_err(storage_error)?;

    if res.rows_affected() == 0 {
        return Err(ApiError::NotFound("Metric not found".to_string()));
    }

    Ok(ok(serde_json::json!({})))
}

pub async fn metrics_by_kpi(
    State(state): State<AppState>,
    Path(kpi_id): Path<Uuid>,
    Query(q): Query<ByKpiQ>,
) -> Result<Json<Envelope<Vec<Metric>>>, ApiError> {
    let limit = q.limit.unwrap_or(50).clamp(1, 500);

    let rows = query_as::<_, Metric>(
        r#"
        SELECT * FROM metrics
        WHERE kpi_id = $1 AND ($2::text IS NULL OR period = $2)
        ORDER BY recorded_at DESC
        LIMIT $3
        "#,
    )
    .bind(kpi_id)
    .bind(q.period)
    .bind(limit)
    .fetch_all(&state.pool)
    .await
    .map_err(storage_error)?;

    let count = rows.len();
    Ok(ok_with_count(rows, count))
}

pub async fn bulk_create_metrics(
    State(state): State<AppState>,
    Json(body): Json<BulkBody>,
) -> Result<(StatusCode, Json<Envelope<Vec<Metric>>>), ApiError> {
    let rows = body.metrics.unwrap_or_default();
    if rows.is_empty() {
        return Err(ApiError::Validation("Metrics array is required".to_string()));
    }

    let new_rows: Vec<NewMetric> = rows.into_iter().map(validate).collect::<Result<_, _>>()?;

    // every referenced KPI must exist before anything is inserted
    let ids: Vec<Uuid> = new_rows.iter().map(|n| n.kpi_id).collect();
    let kpis = query_as::<_, Kpi>(r#"SELECT * FROM kpis WHERE kpi_id = ANY($1)"#)
        .bind(&ids)
        .fetch_all(&state.pool)
        .await
        .map_err(storage_error)?;
    let kpis: HashMap<Uuid, Kpi> = kpis.into_iter().map(|k| (k.kpi_id, k)).collect();
    if let Some(absent) = ids.iter().find(|id| !kpis.contains_key(id)) {
        return Err(ApiError::NotFound(format!("KPI not found: {absent}")));
    }

    let mut tx = state.pool.begin().await.map_err(storage_error)?;

    let mut created_metrics = Vec::with_capacity(new_rows.len());
    for new in &new_rows {
        created_metrics.push(insert_metric(&mut tx, new).await?);
    }

    // only the last value per KPI (by input order) lands on the KPI itself;
    // previous_value stays the pre-batch current
    for (kpi_id, last) in update::last_value_per_kpi(new_rows.iter().map(|n| (n.kpi_id, n.value))) {
        let values = update::apply_observation(kpis[&kpi_id].current_value, last);
        write_kpi_values(&mut tx, kpi_id, values).await?;
    }

    tx.commit().await.map_err(storage_error)?;

    let count = created_metrics.len();
    Ok(created_with_count(created_metrics, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn body(kpi: Option<Uuid>, value: Option<f64>) -> CreateMetricBody {
        CreateMetricBody {
            kpi,
            value,
            timestamp: None,
            period: Some("daily".to_string()),
            period_start: Some(Utc::now()),
            period_end: Some(Utc::now()),
            notes: None,
            metadata: None,
            created_by: None,
        }
    }

    #[test]
    fn validation_rejects_missing_required_fields() {
        let err = validate(body(None, Some(1.0))).unwrap_err();
        match err {
            ApiError::Validation(msg) => assert!(msg.contains("periodStart")),
            other => panic!("expected Validation, got {other:?}"),
        }
        assert!(validate(body(Some(Uuid::new_v4()), None)).is_err());
    }

    #[test]
    fn validation_defaults_creator_to_system() {
        let new = validate(body(Some(Uuid::new_v4()), Some(1.0))).unwrap();
        assert_eq!(new.created_by, "system");
        assert!(new.recorded_at.is_none());
    }
}
