
use std::ops::AddAssign;

/// Presence counts for one slice of a reconciliation (everything, one variant type, or the above-threshold subset)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PresenceMetrics {
    /// Number of variants found only in the first set
    pub first_only: u64,
    /// Number of variants found only in the second set
    pub second_only: u64,
    /// Number of variants found in both sets
    pub shared: u64,
}

impl AddAssign for PresenceMetrics {
    // Enables += with stats
    fn add_assign(&mut self, rhs: Self) {
        self.first_only += rhs.first_only;
        self.second_only += rhs.second_only;
        self.shared += rhs.shared;
    }
}

impl PresenceMetrics {
    /// Constructor
    pub fn new(first_only: u64, second_only: u64, shared: u64) -> Self {
        Self {
            first_only, second_only, shared
        }
    }

    /// Total variants in the first set
    pub fn first_total(&self) -> u64 {
        self.first_only + self.shared
    }

    /// Total variants in the second set
    pub fn second_total(&self) -> u64 {
        self.second_only + self.shared
    }

    /// Fraction of the first set that is also in the second set
    pub fn first_concordance(&self) -> Option<f64> {
        let denom = self.first_total();
        if denom > 0 {
            Some(self.shared as f64 / denom as f64)
        } else {
            None
        }
    }

    /// Fraction of the second set that is also in the first set
    pub fn second_concordance(&self) -> Option<f64> {
        let denom = self.second_total();
        if denom > 0 {
            Some(self.shared as f64 / denom as f64)
        } else {
            None
        }
    }

    /// Shared variants over the union of both sets
    pub fn jaccard(&self) -> Option<f64> {
        let union = self.first_only + self.second_only + self.shared;
        if union > 0 {
            Some(self.shared as f64 / union as f64)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;

    #[test]
    fn test_concordance() {
        let metrics = PresenceMetrics::new(2, 6, 10);
        assert_eq!(metrics.first_total(), 12);
        assert_eq!(metrics.second_total(), 16);
        assert_approx_eq!(metrics.first_concordance().unwrap(), 10.0 / 12.0);
        assert_approx_eq!(metrics.second_concordance().unwrap(), 10.0 / 16.0);
        assert_approx_eq!(metrics.jaccard().unwrap(), 10.0 / 18.0);
    }

    #[test]
    fn test_empty() {
        let metrics = PresenceMetrics::default();
        assert_eq!(metrics.first_concordance(), None);
        assert_eq!(metrics.second_concordance(), None);
        assert_eq!(metrics.jaccard(), None);
    }

    #[test]
    fn test_add_assign() {
        let mut metrics = PresenceMetrics::new(1, 2, 3);
        metrics += PresenceMetrics::new(10, 20, 30);
        assert_eq!(metrics, PresenceMetrics::new(11, 22, 33));
    }
}
