//! Rule-based customer segments
//!
//! Segments are assigned by walking [`SEGMENT_RULES`] top to bottom; the
//! first rule whose predicate holds wins. The final rule always matches, so
//! every score triple gets exactly one segment.

use std::fmt;
use std::str::FromStr;

use serde::Serialize;

use crate::error::RfmError;
use crate::scoring::RfmScores;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Segment {
    Champions,
    Loyal,
    Recent,
    Frequent,
    #[serde(rename = "At Risk")]
    AtRisk,
    Others,
}

impl Segment {
    pub const ALL: [Segment; 6] = [
        Segment::Champions,
        Segment::Loyal,
        Segment::Recent,
        Segment::Frequent,
        Segment::AtRisk,
        Segment::Others,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Segment::Champions => "Champions",
            Segment::Loyal => "Loyal",
            Segment::Recent => "Recent",
            Segment::Frequent => "Frequent",
            Segment::AtRisk => "At Risk",
            Segment::Others => "Others",
        }
    }

    /// One-line reading guide for the segment
    pub fn description(&self) -> &'static str {
        match self {
            Segment::Champions => "High RFM: recent, loyal, valuable",
            Segment::Loyal => "Recent and frequent buyers",
            Segment::Recent => "New or recently active",
            Segment::Frequent => "Repeat buyers but not always recent",
            Segment::AtRisk => "Haven't bought in a long time",
            Segment::Others => "No dominant trait",
        }
    }

    /// Classify a score triple by the first matching rule.
    pub fn classify(scores: &RfmScores) -> Segment {
        SEGMENT_RULES
            .iter()
            .find(|rule| (rule.predicate)(scores))
            .map(|rule| rule.segment)
            .unwrap_or(Segment::Others)
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Segment {
    type Err = RfmError;

    /// Accepts labels and their kebab/snake forms, case-insensitively
    /// ("At Risk", "at-risk", "at_risk").
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, ' ' | '-' | '_'))
            .flat_map(char::to_lowercase)
            .collect();

        Segment::ALL
            .into_iter()
            .find(|segment| segment.label().replace(' ', "").to_lowercase() == normalized)
            .ok_or_else(|| RfmError::UnknownSegment(s.to_string()))
    }
}

/// A (predicate, label) pair in the segment cascade
#[derive(Clone, Copy)]
pub struct SegmentRule {
    pub segment: Segment,
    pub predicate: fn(&RfmScores) -> bool,
}

impl fmt::Debug for SegmentRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SegmentRule")
            .field("segment", &self.segment)
            .finish_non_exhaustive()
    }
}

/// Ordered segment rules, evaluated first match wins
pub const SEGMENT_RULES: [SegmentRule; 6] = [
    SegmentRule {
        segment: Segment::Champions,
        predicate: |s| s.total() >= 13,
    },
    SegmentRule {
        segment: Segment::Loyal,
        predicate: |s| s.recency >= 4 && s.frequency >= 4,
    },
    SegmentRule {
        segment: Segment::Recent,
        predicate: |s| s.recency >= 4,
    },
    SegmentRule {
        segment: Segment::Frequent,
        predicate: |s| s.frequency >= 4,
    },
    SegmentRule {
        segment: Segment::AtRisk,
        predicate: |s| s.total() <= 5,
    },
    SegmentRule {
        segment: Segment::Others,
        predicate: |_| true,
    },
];
