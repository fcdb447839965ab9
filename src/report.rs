use std::collections::BTreeMap;
use std::fmt::Write;

use chrono::NaiveDate;

use crate::insights;
use crate::models::{AdherenceSummary, AnalysisRecord, Profile, ScoreTrend, MAX_CLINICAL_SCORE};

#[derive(Debug, Clone, PartialEq)]
pub struct ZoneSummary {
    pub zone: String,
    pub readings: usize,
    pub avg_score: f64,
    pub latest_score: f64,
}

pub fn summarize_zones(records: &[AnalysisRecord]) -> Vec<ZoneSummary> {
    let mut map: BTreeMap<&str, (usize, f64, f64)> = BTreeMap::new();

    for record in records {
        for (zone, score) in &record.zone_scores {
            let entry = map.entry(zone.as_str()).or_insert((0, 0.0, 0.0));
            entry.0 += 1;
            entry.1 += score;
            entry.2 = *score;
        }
    }

    let mut summaries: Vec<ZoneSummary> = map
        .into_iter()
        .map(|(zone, (readings, total, latest_score))| ZoneSummary {
            zone: zone.to_string(),
            readings,
            avg_score: total / readings as f64,
            latest_score,
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.latest_score
            .partial_cmp(&a.latest_score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    summaries
}

fn score_bar(score: f64) -> String {
    let filled = score.clamp(0.0, MAX_CLINICAL_SCORE).round() as usize;
    format!(
        "{}{}",
        "#".repeat(filled),
        ".".repeat(MAX_CLINICAL_SCORE as usize - filled)
    )
}

/// Terminal rendition of the score history, most recent `limit` analyses.
pub fn render_history(records: &[AnalysisRecord], limit: usize) -> String {
    let mut output = String::new();
    let skip = records.len().saturating_sub(limit);

    for record in records.iter().skip(skip) {
        let _ = writeln!(
            output,
            "{}  {} {:>4.1}  skin age {:.1}",
            record.analyzed_on,
            score_bar(record.clinical_score),
            record.clinical_score,
            record.skin_age
        );
    }

    output
}

pub struct ReportInput<'a> {
    pub email: &'a str,
    pub profile: Option<&'a Profile>,
    pub records: &'a [AnalysisRecord],
    pub adherence: Option<&'a AdherenceSummary>,
    pub trends: &'a [ScoreTrend],
    pub generated_on: NaiveDate,
}

pub fn build_report(input: &ReportInput<'_>) -> String {
    let insights = insights::generate_insights(input.records, input.adherence);
    let zones = summarize_zones(input.records);

    let mut output = String::new();
    let name = match input.profile {
        Some(profile) => format!("{} ({})", profile.full_name, profile.email),
        None => input.email.to_string(),
    };

    let _ = writeln!(output, "# Skin Health Dashboard");
    let _ = writeln!(output, "Generated for {} on {}", name, input.generated_on);
    if let Some(profile) = input.profile {
        if let Some(skin_type) = &profile.skin_type {
            let _ = writeln!(output, "Skin type: {skin_type}");
        }
        if let Some(birth_year) = profile.birth_year {
            let _ = writeln!(output, "Born: {birth_year}");
        }
    }
    let _ = writeln!(output);

    if input.records.is_empty() {
        let _ = writeln!(output, "No analyses yet. Run your first scan to start tracking.");
        return output;
    }

    let _ = writeln!(output, "## Insights");
    if insights.is_empty() {
        let _ = writeln!(output, "Nothing notable since your last analysis.");
    } else {
        for insight in insights.iter() {
            let _ = writeln!(
                output,
                "- **{}** ({}): {}",
                insight.title,
                insight.kind.label(),
                insight.message
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Latest Analysis");
    if let Some(latest) = input.records.last() {
        let _ = writeln!(
            output,
            "- {}: clinical score {:.1}/21, skin age {:.1}",
            latest.analyzed_on, latest.clinical_score, latest.skin_age
        );
    }
    if let Some(adherence) = input.adherence {
        let _ = writeln!(
            output,
            "- Routine adherence {:.0}% ({})",
            adherence.percentage, adherence.trend
        );
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Monthly Trend");
    if input.trends.is_empty() {
        let _ = writeln!(output, "No monthly data yet.");
    } else {
        for trend in input.trends {
            let _ = writeln!(
                output,
                "- {}: {} analyses, avg score {:.1}, avg skin age {:.1}",
                trend.month_start.format("%Y-%m"),
                trend.analysis_count,
                trend.avg_score,
                trend.avg_skin_age
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## Zones");
    if zones.is_empty() {
        let _ = writeln!(output, "No zone readings recorded.");
    } else {
        for zone in zones.iter() {
            let _ = writeln!(
                output,
                "- {}: latest {:.1}, average {:.1} over {} readings",
                zone.zone.replace('_', " "),
                zone.latest_score,
                zone.avg_score,
                zone.readings
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## History");
    let _ = writeln!(output, "```");
    output.push_str(&render_history(input.records, 12));
    let _ = writeln!(output, "```");

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use uuid::Uuid;

    fn record(day: i64, score: f64, zones: &[(&str, f64)]) -> AnalysisRecord {
        AnalysisRecord {
            id: Uuid::new_v4(),
            analyzed_on: NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date")
                + Duration::days(day),
            clinical_score: score,
            skin_age: 35.0,
            zone_scores: zones
                .iter()
                .map(|(zone, score)| (zone.to_string(), *score))
                .collect(),
        }
    }

    fn input<'a>(records: &'a [AnalysisRecord]) -> ReportInput<'a> {
        ReportInput {
            email: "maya@example.com",
            profile: None,
            records,
            adherence: None,
            trends: &[],
            generated_on: NaiveDate::from_ymd_opt(2026, 3, 1).expect("valid date"),
        }
    }

    #[test]
    fn zones_sorted_by_latest_severity() {
        let records = vec![
            record(0, 12.0, &[("forehead", 2.0), ("chin", 1.0)]),
            record(14, 11.0, &[("forehead", 1.0), ("chin", 2.5)]),
        ];
        let zones = summarize_zones(&records);
        assert_eq!(zones[0].zone, "chin");
        assert_eq!(zones[0].latest_score, 2.5);
        assert!((zones[1].avg_score - 1.5).abs() < 0.001);
        assert_eq!(zones[1].readings, 2);
    }

    #[test]
    fn history_keeps_most_recent() {
        let records: Vec<AnalysisRecord> =
            (0..5).map(|day| record(day, 10.0 + day as f64, &[])).collect();
        let history = render_history(&records, 2);
        assert_eq!(history.lines().count(), 2);
        assert!(history.starts_with("2026-01-04"));
        assert!(history.contains(&format!("{}{}", "#".repeat(14), ".".repeat(7))));
    }

    #[test]
    fn empty_history_is_a_valid_state() {
        let report = build_report(&input(&[]));
        assert!(report.contains("No analyses yet"));
        assert!(!report.contains("## Insights"));
    }

    #[test]
    fn header_uses_profile_details() {
        let profile = Profile {
            id: Uuid::new_v4(),
            full_name: "Maya Chen".to_string(),
            email: "maya@example.com".to_string(),
            skin_type: Some("oily".to_string()),
            birth_year: None,
        };
        let records = vec![record(0, 12.0, &[])];
        let report = build_report(&ReportInput {
            profile: Some(&profile),
            ..input(&records)
        });
        assert!(report.contains("Generated for Maya Chen (maya@example.com) on 2026-03-01"));
        assert!(report.contains("Skin type: oily"));
        assert!(!report.contains("Born:"));
    }

    #[test]
    fn report_lists_insights_and_zones() {
        let records = vec![
            record(0, 14.0, &[("left_cheek", 2.0)]),
            record(14, 12.0, &[("left_cheek", 1.5)]),
            record(28, 7.0, &[("left_cheek", 1.0)]),
        ];
        let report = build_report(&input(&records));
        assert!(report.contains("**Excellent skin health** (achievement)"));
        assert!(report.contains("- left cheek: latest 1.0"));
        assert!(report.contains("No monthly data yet."));
    }
}
