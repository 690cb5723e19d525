//! Analytics dashboard payloads.

use crate::identity::{FieldId, Timestamp, UserId};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One point of a daily series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Average rating for one evaluation field across submissions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldAverage {
    pub field_id: FieldId,
    pub label: String,
    pub average: f64,
    pub samples: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsDashboard {
    pub user_id: UserId,
    pub profile_views: u64,
    #[serde(default)]
    pub engagement: Vec<SeriesPoint>,
    #[serde(default)]
    pub evaluation_averages: Vec<FieldAverage>,
    pub generated_at: Timestamp,
}

impl AnalyticsDashboard {
    /// Sum of the engagement series.
    pub fn total_engagement(&self) -> f64 {
        self.engagement.iter().map(|p| p.value).sum()
    }

    /// Field with the highest average, weighted ties broken by sample count.
    pub fn strongest_field(&self) -> Option<&FieldAverage> {
        self.evaluation_averages
            .iter()
            .filter(|f| f.samples > 0)
            .max_by(|a, b| {
                a.average
                    .total_cmp(&b.average)
                    .then(a.samples.cmp(&b.samples))
            })
    }
}
