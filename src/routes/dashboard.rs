// src/routes/dashboard.rs

use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{query_as, query_scalar};
use uuid::Uuid;

use crate::engine::attention::{self, DASHBOARD_LIST_LIMIT};
use crate::engine::performance::{self, format_percent, PerformanceStatus, TargetType};
use crate::engine::stats::{self, CategoryCount, KpiTrendSeries, StatusCount};
use crate::models::{Category, Kpi, KpiWithCategory, Metric};
use crate::AppState;

use super::{ok, storage_error, ApiError, Envelope};

use super::kpis::category_lookup;

/// Metrics within the last 7 days count as recent on the overview.
const RECENT_DAYS: i64 = 7;

/// Default lookback window for the trends view.
const DEFAULT_TREND_DAYS: i64 = 30;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewCounts {
    #[serde(rename = "totalKPIs")]
    pub total_kpis: i64,
    #[serde(rename = "activeKPIs")]
    pub active_kpis: i64,
    pub total_categories: i64,
    pub total_metrics: i64,
    pub recent_metrics: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Overview {
    pub overview: OverviewCounts,
    pub kpis_by_status: Vec<StatusCount>,
    pub kpis_by_category: Vec<CategoryCount>,
    #[serde(rename = "topKPIs")]
    pub top_kpis: Vec<KpiWithCategory>,
    pub needs_attention: Vec<KpiWithCategory>,
}

#[derive(Deserialize)]
pub struct TrendsQ {
    pub period: Option<String>,
    pub days: Option<i64>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct KpiIdentity {
    pub id: Uuid,
    pub name: String,
    pub category: Option<Category>,
    pub unit: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceRow {
    pub kpi: KpiIdentity,
    pub current_value: f64,
    pub target_value: Option<f64>,
    pub trend: String,
    pub performance_percent: Option<String>,
    pub performance_status: Option<PerformanceStatus>,
}

pub async fn overview(State(state): State<AppState>) -> Result<Json<Envelope<Overview>>, ApiError> {
    let total_kpis: i64 = query_scalar(r#"SELECT COUNT(*) FROM kpis"#)
        .fetch_one(&state.pool)
        .await
        .map_err(storage_error)?;
    let active_kpis: i64 = query_scalar(r#"SELECT COUNT(*) FROM kpis WHERE status = 'active'"#)
        .fetch_one(&state.pool)
        .await
        .map_err(storage_error)?;
    let total_categories: i64 = query_scalar(r#"SELECT COUNT(*) FROM categories"#)
        .fetch_one(&state.pool)
        .await
        .map_err(storage_error)?;
    let total_metrics: i64 = query_scalar(r#"SELECT COUNT(*) FROM metrics"#)
        .fetch_one(&state.pool)
        .await
        .map_err(storage_error)?;

    let recent_metrics: i64 = query_scalar(r#"SELECT COUNT(*) FROM metrics WHERE recorded_at >= $1"#)
        .bind(Utc::now() - Duration::days(RECENT_DAYS))
        .fetch_one(&state.pool)
        .await
        .map_err(storage_error)?;

    // group-bys and rankings run over the rows in insertion order
    let kpis = query_as::<_, Kpi>(r#"SELECT * FROM kpis ORDER BY created_at ASC"#)
        .fetch_all(&state.pool)
        .await
        .map_err(storage_error)?;
    let categories = category_lookup(&state.pool).await?;

    let kpis_by_status = stats::group_by_status(&kpis);
    let kpis_by_category = stats::group_by_category(&kpis, &categories);
    let top = attention::top_performers(&kpis, DASHBOARD_LIST_LIMIT);
    let flagged = attention::needs_attention(&kpis, DASHBOARD_LIST_LIMIT);

    let attach = |list: Vec<Kpi>| -> Vec<KpiWithCategory> {
        list.into_iter().map(|k| KpiWithCategory::attach(k, &categories)).collect()
    };

    Ok(ok(Overview {
        overview: OverviewCounts {
            total_kpis,
            active_kpis,
            total_categories,
            total_metrics,
            recent_metrics,
        },
        kpis_by_status,
        kpis_by_category,
        top_kpis: attach(top),
        needs_attention: attach(flagged),
    }))
}

pub async fn trends(
    State(state): State<AppState>,
    Query(q): Query<TrendsQ>,
) -> Result<Json<Envelope<Vec<KpiTrendSeries>>>, ApiError> {
    let period = q.period.unwrap_or_else(|| "daily".to_string());
    let days = q.days.unwrap_or(DEFAULT_TREND_DAYS).max(1);
    let since = Utc::now() - Duration::days(days);

    let metrics = query_as::<_, Metric>(
        r#"
        SELECT * FROM metrics
        WHERE recorded_at >= $1 AND period = $2
        ORDER BY recorded_at ASC
        "#,
    )
    .bind(since)
    .bind(&period)
    .fetch_all(&state.pool)
    .await
    .map_err(storage_error)?;

    let ids: Vec<Uuid> = metrics.iter().map(|m| m.kpi_id).collect();
    let kpis = query_as::<_, Kpi>(r#"SELECT * FROM kpis WHERE kpi_id = ANY($1)"#)
        .bind(&ids)
        .fetch_all(&state.pool)
        .await
        .map_err(storage_error)?;
    let lookup: HashMap<Uuid, Kpi> = kpis.into_iter().map(|k| (k.kpi_id, k)).collect();

    Ok(ok(stats::trend_series(&metrics, &lookup)))
}

pub async fn performance_summary(
    State(state): State<AppState>,
) -> Result<Json<Envelope<Vec<PerformanceRow>>>, ApiError> {
    let kpis = query_as::<_, Kpi>(
        r#"SELECT * FROM kpis WHERE status = 'active' ORDER BY created_at ASC"#,
    )
    .fetch_all(&state.pool)
    .await
    .map_err(storage_error)?;
    let categories = category_lookup(&state.pool).await?;

    let summary: Vec<PerformanceRow> = kpis
        .into_iter()
        .map(|kpi| {
            let score = performance::summarize(
                kpi.current_value,
                kpi.target_value,
                TargetType::parse(&kpi.target_type),
            );
            let category = kpi.category_id.and_then(|id| categories.get(&id).cloned());
            PerformanceRow {
                current_value: kpi.current_value,
                target_value: kpi.target_value,
                trend: kpi.trend,
                performance_percent: score.map(|s| format_percent(s.percent)),
                performance_status: score.map(|s| s.status),
                kpi: KpiIdentity { id: kpi.kpi_id, name: kpi.name, category, unit: kpi.unit },
            }
        })
        .collect();

    Ok(ok(summary))
}
