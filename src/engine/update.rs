// src/engine/update.rs

use uuid::Uuid;

use crate::engine::trend::{self, Trend};

/// The derived value state written back to a KPI after a metric lands.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueUpdate {
    pub current_value: f64,
    pub previous_value: f64,
    pub trend: Trend,
}

/// Shift the KPI's value pair for a newly recorded observation: the old
/// current becomes previous, the observation becomes current, and the
/// trend is re-derived from the new pair.
pub fn apply_observation(current_value: f64, observed: f64) -> ValueUpdate {
    let previous_value = current_value;
    ValueUpdate {
        current_value: observed,
        previous_value,
        trend: trend::classify(observed, previous_value),
    }
}

/// Reduce a bulk batch to one value per KPI: the last value by input order
/// wins, KPIs keep first-appearance order. Intermediate values in the same
/// batch do not enter trend history.
pub fn last_value_per_kpi(rows: impl IntoIterator<Item = (Uuid, f64)>) -> Vec<(Uuid, f64)> {
    let mut latest: Vec<(Uuid, f64)> = Vec::new();
    for (kpi_id, value) in rows {
        match latest.iter_mut().find(|(id, _)| *id == kpi_id) {
            Some((_, v)) => *v = value,
            None => latest.push((kpi_id, value)),
        }
    }
    latest
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn observation_shifts_the_value_pair() {
        let update = apply_observation(100.0, 150.0);
        assert_eq!(update.current_value, 150.0);
        assert_eq!(update.previous_value, 100.0);
        assert_eq!(update.trend, Trend::Up);
    }

    #[test]
    fn repeat_observation_is_stable() {
        let update = apply_observation(100.0, 100.0);
        assert_eq!(update.trend, Trend::Stable);
    }

    #[test]
    fn first_observation_from_zero_goes_up() {
        let update = apply_observation(0.0, 42.0);
        assert_eq!(update.previous_value, 0.0);
        assert_eq!(update.trend, Trend::Up);
    }

    #[test]
    fn bulk_batch_keeps_last_value_per_kpi() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let latest = last_value_per_kpi(vec![(a, 1.0), (b, 10.0), (a, 2.0), (a, 3.0)]);
        assert_eq!(latest, vec![(a, 3.0), (b, 10.0)]);
    }

    #[test]
    fn bulk_batch_then_observation_skips_intermediates() {
        // three metrics for one KPI in a batch: previous stays pre-batch,
        // current is the third value
        let kpi_id = Uuid::new_v4();
        let batch = vec![(kpi_id, 10.0), (kpi_id, 20.0), (kpi_id, 30.0)];
        let latest = last_value_per_kpi(batch);
        assert_eq!(latest.len(), 1);

        let update = apply_observation(5.0, latest[0].1);
        assert_eq!(update.current_value, 30.0);
        assert_eq!(update.previous_value, 5.0);
    }
}
