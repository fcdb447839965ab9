use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Upper bound of the clinical severity index.
pub const MAX_CLINICAL_SCORE: f64 = 21.0;

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisRecord {
    pub id: Uuid,
    pub analyzed_on: NaiveDate,
    pub clinical_score: f64,
    pub skin_age: f64,
    /// Per-zone severity (0-3) keyed by facial zone name.
    pub zone_scores: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum AdherenceTrend {
    Improving,
    Stable,
    Declining,
}

impl AdherenceTrend {
    pub fn as_str(&self) -> &'static str {
        match self {
            AdherenceTrend::Improving => "improving",
            AdherenceTrend::Stable => "stable",
            AdherenceTrend::Declining => "declining",
        }
    }
}

impl fmt::Display for AdherenceTrend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AdherenceTrend {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "improving" => Ok(AdherenceTrend::Improving),
            "stable" => Ok(AdherenceTrend::Stable),
            "declining" => Ok(AdherenceTrend::Declining),
            other => anyhow::bail!("unknown adherence trend '{other}'"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdherenceSummary {
    pub percentage: f64,
    pub trend: AdherenceTrend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Success,
    Warning,
    Info,
    Achievement,
}

impl InsightKind {
    pub fn label(&self) -> &'static str {
        match self {
            InsightKind::Success => "success",
            InsightKind::Warning => "warning",
            InsightKind::Info => "info",
            InsightKind::Achievement => "achievement",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Insight {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub icon: String,
    pub title: String,
    pub message: String,
    pub priority: i32,
}

#[derive(Debug, Clone)]
pub struct Profile {
    pub id: Uuid,
    pub full_name: String,
    pub email: String,
    pub skin_type: Option<String>,
    pub birth_year: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ScoreTrend {
    pub month_start: NaiveDate,
    pub analysis_count: i64,
    pub avg_score: f64,
    pub avg_skin_age: f64,
}
