use domain::rating::{RatingSummary, RatingTally};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub listened: usize,
    pub liked: usize,
    pub loved: usize,
}

impl From<&RatingTally> for Tally {
    fn from(tally: &RatingTally) -> Self {
        Self {
            listened: tally.listened,
            liked: tally.liked,
            loved: tally.loved,
        }
    }
}

/// 评分三栏展示：个人 / 乐队成员 / 合计
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingSummaryView {
    pub personal: Option<String>,
    pub collaborators: Tally,
    pub total: Tally,
}

impl From<&RatingSummary> for RatingSummaryView {
    fn from(summary: &RatingSummary) -> Self {
        Self {
            personal: summary.personal.map(|v| v.name().to_string()),
            collaborators: Tally::from(&summary.collaborators),
            total: Tally::from(&summary.total),
        }
    }
}
