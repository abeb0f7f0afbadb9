// src/engine/attention.rs

use crate::models::Kpi;

pub const DASHBOARD_LIST_LIMIT: usize = 5;

/// Maximize-style performance below this percentage of target lands a KPI
/// on the needs-attention list.
const ATTENTION_THRESHOLD: f64 = 70.0;

/// Active KPIs ordered by current value descending, first `limit`.
pub fn top_performers(kpis: &[Kpi], limit: usize) -> Vec<Kpi> {
    let mut active: Vec<Kpi> = kpis.iter().filter(|k| k.is_active()).cloned().collect();
    active.sort_by(|a, b| b.current_value.total_cmp(&a.current_value));
    active.truncate(limit);
    active
}

/// Active KPIs with a target whose maximize-style performance is below 70%
/// of target, first `limit`. Input order is kept as-is: the list reflects
/// fetch order, not distance below the threshold.
pub fn needs_attention(kpis: &[Kpi], limit: usize) -> Vec<Kpi> {
    kpis.iter()
        .filter(|k| k.is_active())
        .filter(|k| match k.target_value {
            Some(target) if target != 0.0 => (k.current_value / target) * 100.0 < ATTENTION_THRESHOLD,
            _ => false,
        })
        .take(limit)
        .cloned()
        .collect()
}
