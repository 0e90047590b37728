//! Display projections
//!
//! Pure functions from records (and, for nodes, the current metric set) to
//! the values a row or detail card shows. Nothing here mutates its input.

pub mod node;
pub mod pipeline;
pub mod service;

pub use node::{NodeAction, NodeBatchAction, NodeOverview, NodeRow, ResourceTooltip, TaintBadge, UsageCell};
pub use pipeline::{PipelineAction, PipelineRow, PipelineStatusCell};
pub use service::{Attribute, ReplicaStatus, ServiceOperation, ServiceView};

/// Utilization at or above this ratio carries a warning
pub const WARNING_THRESHOLD: f64 = 0.9;

/// Share of a capacity in use
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Utilization {
    /// `used / total`, zero when the total is zero or unknown
    pub ratio: f64,
    /// Rounded percentage; not clamped, an overcommitted node reads above 100
    pub percent: i64,
    pub warning: bool,
}

impl Utilization {
    pub fn from_parts(used: Option<f64>, total: Option<f64>) -> Self {
        let ratio = match (used, total) {
            (Some(used), Some(total)) if total > 0.0 && total.is_finite() && used.is_finite() => used / total,
            _ => 0.0,
        };

        Self {
            ratio,
            percent: (ratio * 100.0).round() as i64,
            warning: ratio >= WARNING_THRESHOLD,
        }
    }

    /// e.g. `95%`
    pub fn label(&self) -> String {
        format!("{}%", self.percent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_half_used() {
        let u = Utilization::from_parts(Some(2.0), Some(4.0));
        assert_eq!(u.label(), "50%");
        assert!(!u.warning);
    }

    #[test]
    fn test_warning_threshold() {
        let u = Utilization::from_parts(Some(3.8), Some(4.0));
        assert_eq!(u.label(), "95%");
        assert!(u.warning);

        assert!(Utilization::from_parts(Some(9.0), Some(10.0)).warning);
        assert!(!Utilization::from_parts(Some(8.9), Some(10.0)).warning);
    }

    #[test]
    fn test_zero_or_missing_total() {
        assert_eq!(Utilization::from_parts(Some(3.0), Some(0.0)).ratio, 0.0);
        assert_eq!(Utilization::from_parts(Some(3.0), None).percent, 0);
        assert_eq!(Utilization::from_parts(None, Some(4.0)).percent, 0);
        assert_eq!(Utilization::from_parts(Some(f64::NAN), Some(4.0)).percent, 0);
    }

    #[test]
    fn test_overcommit_not_clamped() {
        assert_eq!(Utilization::from_parts(Some(5.0), Some(4.0)).percent, 125);
    }
}
