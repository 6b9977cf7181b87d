//! Notification criteria evaluation.
//!
//! Pure function: given a sampled value and a tracker's ordered criteria,
//! decide whether to notify. First-match policy — evaluation stops at the
//! first satisfied criterion, later criteria are never consulted.

use pricewatch_core::TrackerConfig;

/// Evaluate the tracker's criteria against a sampled value.
///
/// Returns the HTML notification text for the first satisfied criterion, or
/// `None` when nothing matches (which is not an error). The `=` operator is
/// exact floating-point equality.
pub fn evaluate(tracker: &TrackerConfig, value: f64) -> Option<String> {
    for criterion in &tracker.notify_criteria {
        if criterion.operator.matches(value, criterion.value) {
            let mut message = format!(
                "Tracker <b>{}</b>: current value {:.2} matched the bound '{} {}'",
                tracker.code, value, criterion.operator, criterion.value
            );
            if let Some(view_url) = &tracker.view_url {
                message.push_str(&format!("\n<a href=\"{view_url}\">View source</a>"));
            }
            return Some(message);
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use pricewatch_core::{CompareOp, NotifyCriterion};

    fn tracker_with(criteria: Vec<NotifyCriterion>) -> TrackerConfig {
        TrackerConfig {
            code: "test".into(),
            data_url: "https://example.com/data".into(),
            view_url: None,
            interval: "10m".into(),
            extraction_path: "price".into(),
            notify_criteria: criteria,
        }
    }

    fn criterion(operator: CompareOp, value: f64) -> NotifyCriterion {
        NotifyCriterion { operator, value }
    }

    #[test]
    fn test_single_criterion_fires_above_bound() {
        let tracker = tracker_with(vec![criterion(CompareOp::Gt, 100.0)]);
        assert!(evaluate(&tracker, 150.0).is_some());
        assert!(evaluate(&tracker, 50.0).is_none());
    }

    #[test]
    fn test_first_match_wins() {
        let tracker = tracker_with(vec![
            criterion(CompareOp::Lt, 10.0),
            criterion(CompareOp::Gt, 100.0),
        ]);
        let message = evaluate(&tracker, 5.0).unwrap();
        assert!(message.contains("'< 10'"));
        assert!(!message.contains("'> 100'"));
    }

    #[test]
    fn test_exact_equality() {
        let tracker = tracker_with(vec![criterion(CompareOp::Eq, 42.0)]);
        assert!(evaluate(&tracker, 42.0).is_some());
        assert!(evaluate(&tracker, 42.000001).is_none());
    }

    #[test]
    fn test_no_criteria_no_message() {
        let tracker = tracker_with(vec![]);
        assert!(evaluate(&tracker, 1.0).is_none());
    }

    #[test]
    fn test_view_url_is_linked() {
        let mut tracker = tracker_with(vec![criterion(CompareOp::Ge, 1.0)]);
        tracker.view_url = Some("https://example.com/view".into());
        let message = evaluate(&tracker, 2.0).unwrap();
        assert!(message.contains("https://example.com/view"));
    }
}
