// src/models/mod.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ───────────────────────────────────────
// Rows
// ───────────────────────────────────────

/// Named grouping for KPIs, unique by name. Carries display metadata only;
/// KPIs point back at it by reference.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub category_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub icon: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A tracked indicator. Enumerated fields (unit, target_type, frequency,
/// status, trend) are stored as text; the engine parses them where logic
/// branches on the value. `trend` is derived from the current/previous
/// pair and never set independently.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Kpi {
    pub kpi_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub category_id: Option<Uuid>,
    pub unit: String,
    pub custom_unit: Option<String>,
    pub target_value: Option<f64>,
    pub target_type: String,
    pub frequency: String,
    pub status: String,
    pub current_value: f64,
    pub previous_value: f64,
    pub trend: String,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Kpi {
    pub fn is_active(&self) -> bool {
        self.status == "active"
    }
}

/// One recorded observation for a KPI. The column is `recorded_at` to keep
/// the SQL free of the reserved word; it serializes as `timestamp`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Metric {
    pub metric_id: Uuid,
    pub kpi_id: Uuid,
    pub value: f64,
    #[serde(rename = "timestamp")]
    pub recorded_at: DateTime<Utc>,
    pub period: String,
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

// ───────────────────────────────────────
// Joined response shapes
// ───────────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryWithCount {
    #[serde(flatten)]
    pub category: Category,
    pub kpi_count: i64,
}

#[derive(Debug, Serialize)]
pub struct CategoryWithKpis {
    #[serde(flatten)]
    pub category: Category,
    pub kpis: Vec<Kpi>,
}

#[derive(Debug, Serialize)]
pub struct KpiWithCategory {
    #[serde(flatten)]
    pub kpi: Kpi,
    pub category: Option<Category>,
}

impl KpiWithCategory {
    /// Resolve the weak category reference against an id lookup.
    pub fn attach(kpi: Kpi, categories: &HashMap<Uuid, Category>) -> KpiWithCategory {
        let category = kpi.category_id.and_then(|id| categories.get(&id).cloned());
        KpiWithCategory { kpi, category }
    }
}

/// KPI list item: same shape plus the derived performance percentage
/// (2-decimal string, null when no target is set).
#[derive(Debug, Serialize)]
pub struct KpiListItem {
    #[serde(flatten)]
    pub kpi: Kpi,
    pub category: Option<Category>,
    pub performance: Option<String>,
}
