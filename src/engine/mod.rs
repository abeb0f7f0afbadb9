// src/engine/mod.rs
//
// KPI metrics & performance engine. Pure calculation rules shared by the
// KPI, metric and dashboard handlers; no I/O happens here.

pub mod attention;
pub mod performance;
pub mod stats;
pub mod trend;
pub mod update;

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    use crate::models::{Category, Kpi, Metric};

    pub fn kpi(name: &str, status: &str, current_value: f64, target_value: Option<f64>) -> Kpi {
        let now = Utc::now();
        Kpi {
            kpi_id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            category_id: None,
            unit: "number".to_string(),
            custom_unit: None,
            target_value,
            target_type: "maximize".to_string(),
            frequency: "daily".to_string(),
            status: status.to_string(),
            current_value,
            previous_value: 0.0,
            trend: "stable".to_string(),
            tags: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn category(name: &str) -> Category {
        let now = Utc::now();
        Category {
            category_id: Uuid::new_v4(),
            name: name.to_string(),
            description: None,
            color: None,
            icon: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Metric with a timestamp `minutes_after` a common epoch, so tests can
    /// express chronological order.
    pub fn metric(kpi_id: Uuid, value: f64, minutes_after: i64) -> Metric {
        let base = Utc::now() - Duration::days(1);
        let at = base + Duration::minutes(minutes_after);
        Metric {
            metric_id: Uuid::new_v4(),
            kpi_id,
            value,
            recorded_at: at,
            period: "daily".to_string(),
            period_start: at,
            period_end: at,
            notes: None,
            metadata: None,
            created_by: "system".to_string(),
            created_at: at,
        }
    }
}
