use crate::models::{
    AdherenceSummary, AdherenceTrend, AnalysisRecord, Insight, InsightKind, MAX_CLINICAL_SCORE,
};

/// Number of insights surfaced on the dashboard.
pub const MAX_INSIGHTS: usize = 5;

const SCORE_DELTA_THRESHOLD: f64 = 2.0;
const EXCELLENT_SCORE: f64 = 8.0;
const SKIN_AGE_WARNING_DELTA: f64 = 2.0;
const ZONE_DELTA_THRESHOLD: f64 = 0.5;
const FORECAST_PERIODS: f64 = 6.0;
const FORECAST_MIN_CHANGE: f64 = 0.5;

/// Builds the ranked dashboard insights for records ordered oldest first.
pub fn generate_insights(
    records: &[AnalysisRecord],
    adherence: Option<&AdherenceSummary>,
) -> Vec<Insight> {
    let mut candidates = Vec::new();

    score_insights(records, &mut candidates);
    skin_age_insights(records, &mut candidates);
    trend_insights(records, &mut candidates);
    if let Some(summary) = adherence {
        adherence_insights(summary, &mut candidates);
    }
    zone_insights(records, &mut candidates);
    forecast_insights(records, &mut candidates);

    tracing::debug!(candidates = candidates.len(), "ranking insight candidates");

    // Stable sort keeps rule order among equal priorities.
    candidates.sort_by(|a, b| b.priority.cmp(&a.priority));
    candidates.truncate(MAX_INSIGHTS);
    candidates
}

fn insight(
    id: impl Into<String>,
    kind: InsightKind,
    icon: &str,
    title: impl Into<String>,
    message: impl Into<String>,
    priority: i32,
) -> Insight {
    Insight {
        id: id.into(),
        kind,
        icon: icon.to_string(),
        title: title.into(),
        message: message.into(),
        priority,
    }
}

/// Difference between two readings at hundredth precision, so decimal inputs
/// such as 2.3 - 1.8 land exactly on the rule thresholds.
fn difference(later: f64, earlier: f64) -> f64 {
    ((later - earlier) * 100.0).round() / 100.0
}

fn last_two(records: &[AnalysisRecord]) -> Option<(&AnalysisRecord, &AnalysisRecord)> {
    match records {
        [.., previous, latest] => Some((previous, latest)),
        _ => None,
    }
}

fn score_insights(records: &[AnalysisRecord], out: &mut Vec<Insight>) {
    if let Some((previous, latest)) = last_two(records) {
        let delta = difference(latest.clinical_score, previous.clinical_score);

        if delta <= -SCORE_DELTA_THRESHOLD {
            out.push(insight(
                "score-improvement",
                InsightKind::Success,
                "trending-down",
                "Skin score improved",
                format!(
                    "Your clinical score dropped by {:.1} points since your last analysis.",
                    -delta
                ),
                9,
            ));
        } else if delta >= SCORE_DELTA_THRESHOLD {
            out.push(insight(
                "score-increase",
                InsightKind::Warning,
                "trending-up",
                "Skin score went up",
                format!(
                    "Your clinical score rose by {:.1} points since your last analysis. \
                     Review recent changes to your routine.",
                    delta
                ),
                8,
            ));
        } else if delta == 0.0 && records.len() >= 3 {
            out.push(insight(
                "score-stable",
                InsightKind::Info,
                "minus",
                "Score holding steady",
                "Your clinical score is unchanged since your last analysis.",
                4,
            ));
        }
    }

    if let Some(latest) = records.last() {
        if latest.clinical_score <= EXCELLENT_SCORE {
            out.push(insight(
                "excellent-score",
                InsightKind::Achievement,
                "award",
                "Excellent skin health",
                format!(
                    "A clinical score of {:.1} puts you in the healthiest range.",
                    latest.clinical_score
                ),
                10,
            ));
        }
    }
}

fn skin_age_insights(records: &[AnalysisRecord], out: &mut Vec<Insight>) {
    let Some((previous, latest)) = last_two(records) else {
        return;
    };
    let delta = difference(latest.skin_age, previous.skin_age);

    if delta < 0.0 {
        out.push(insight(
            "skin-age-improvement",
            InsightKind::Success,
            "clock",
            "Skin age is younger",
            format!(
                "Your estimated skin age went down by {:.1} years.",
                -delta
            ),
            7,
        ));
    } else if delta > SKIN_AGE_WARNING_DELTA {
        out.push(insight(
            "skin-age-increase",
            InsightKind::Warning,
            "clock",
            "Skin age increased",
            format!(
                "Your estimated skin age rose by {:.1} years. Sun protection and sleep can help.",
                delta
            ),
            6,
        ));
    }
}

fn last_three_scores(records: &[AnalysisRecord]) -> Option<[f64; 3]> {
    match records {
        [.., a, b, c] => Some([a.clinical_score, b.clinical_score, c.clinical_score]),
        _ => None,
    }
}

fn trend_insights(records: &[AnalysisRecord], out: &mut Vec<Insight>) {
    let Some([a, b, c]) = last_three_scores(records) else {
        return;
    };

    if a > b && b > c {
        out.push(insight(
            "consistent-improvement",
            InsightKind::Success,
            "target",
            "Consistent improvement",
            "Your score improved across each of your last three analyses.",
            8,
        ));
    } else if a < b && b < c {
        out.push(insight(
            "declining-trend",
            InsightKind::Warning,
            "alert-triangle",
            "Declining trend",
            "Your score worsened across each of your last three analyses.",
            9,
        ));
    }
}

fn adherence_insights(summary: &AdherenceSummary, out: &mut Vec<Insight>) {
    let percentage = summary.percentage;

    if percentage >= 90.0 {
        out.push(insight(
            "excellent-adherence",
            InsightKind::Achievement,
            "calendar-check",
            "Routine champion",
            format!("You followed your routine {:.0}% of the time.", percentage),
            7,
        ));
    } else if percentage >= 70.0 {
        out.push(insight(
            "good-adherence",
            InsightKind::Info,
            "calendar",
            "Good routine consistency",
            format!(
                "You followed your routine {:.0}% of the time. A little more consistency goes a long way.",
                percentage
            ),
            5,
        ));
    } else if percentage < 50.0 {
        out.push(insight(
            "low-adherence",
            InsightKind::Warning,
            "calendar-x",
            "Routine slipping",
            format!(
                "You followed your routine only {:.0}% of the time.",
                percentage
            ),
            8,
        ));
    }

    if summary.trend == AdherenceTrend::Improving {
        out.push(insight(
            "improving-adherence",
            InsightKind::Success,
            "trending-up",
            "Routine on the rise",
            "Your routine adherence is improving.",
            5,
        ));
    }
}

fn zone_insights(records: &[AnalysisRecord], out: &mut Vec<Insight>) {
    if records.len() < 3 {
        return;
    }
    let (Some(first), Some(latest)) = (records.first(), records.last()) else {
        return;
    };

    for (zone, latest_score) in &latest.zone_scores {
        let Some(first_score) = first.zone_scores.get(zone) else {
            continue;
        };
        let change = difference(*latest_score, *first_score);
        let label = zone.replace('_', " ");

        if change <= -ZONE_DELTA_THRESHOLD {
            out.push(insight(
                format!("zone-improvement-{zone}"),
                InsightKind::Success,
                "map-pin",
                format!("Clearer {label}"),
                format!(
                    "Severity in your {label} dropped by {:.1} since your first analysis.",
                    -change
                ),
                6,
            ));
        } else if change >= ZONE_DELTA_THRESHOLD {
            out.push(insight(
                format!("zone-worsening-{zone}"),
                InsightKind::Warning,
                "map-pin",
                format!("Watch your {label}"),
                format!(
                    "Severity in your {label} rose by {:.1} since your first analysis.",
                    change
                ),
                7,
            ));
        }
    }
}

/// Linear projection of the clinical score a fixed number of periods ahead.
pub fn forecast_score(records: &[AnalysisRecord]) -> Option<(f64, f64)> {
    let [first, _, last] = last_three_scores(records)?;
    let average_change = difference(last, first) / 2.0;
    let projected = (last + average_change * FORECAST_PERIODS).clamp(0.0, MAX_CLINICAL_SCORE);
    Some((average_change, projected))
}

fn forecast_insights(records: &[AnalysisRecord], out: &mut Vec<Insight>) {
    let Some((average_change, projected)) = forecast_score(records) else {
        return;
    };
    if average_change.abs() < FORECAST_MIN_CHANGE {
        return;
    }

    if average_change < 0.0 {
        out.push(insight(
            "score-forecast",
            InsightKind::Info,
            "sparkles",
            "Looking ahead",
            format!(
                "At this pace your score could reach {:.1} within {} analyses.",
                projected, FORECAST_PERIODS as i32
            ),
            3,
        ));
    } else {
        out.push(insight(
            "score-forecast-warning",
            InsightKind::Warning,
            "sparkles",
            "Trajectory check",
            format!(
                "If this continues your score could climb to {:.1} within {} analyses.",
                projected, FORECAST_PERIODS as i32
            ),
            5,
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;
    use std::collections::BTreeMap;
    use uuid::Uuid;

    fn record(day: i64, score: f64, skin_age: f64) -> AnalysisRecord {
        let base = NaiveDate::from_ymd_opt(2026, 1, 1).expect("valid date");
        AnalysisRecord {
            id: Uuid::new_v4(),
            analyzed_on: base + Duration::days(day * 14),
            clinical_score: score,
            skin_age,
            zone_scores: BTreeMap::new(),
        }
    }

    fn with_zones(mut record: AnalysisRecord, zones: &[(&str, f64)]) -> AnalysisRecord {
        record.zone_scores = zones
            .iter()
            .map(|(zone, score)| (zone.to_string(), *score))
            .collect();
        record
    }

    fn series(scores: &[f64]) -> Vec<AnalysisRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(index, score)| record(index as i64, *score, 30.0))
            .collect()
    }

    fn ids(insights: &[Insight]) -> Vec<&str> {
        insights.iter().map(|insight| insight.id.as_str()).collect()
    }

    #[test]
    fn empty_history_has_no_insights() {
        assert!(generate_insights(&[], None).is_empty());
    }

    #[test]
    fn drop_of_three_points_is_a_success() {
        let insights = generate_insights(&series(&[10.0, 7.0]), None);
        let improvement = insights
            .iter()
            .find(|insight| insight.id == "score-improvement")
            .expect("score-improvement insight");
        assert_eq!(improvement.kind, InsightKind::Success);
    }

    #[test]
    fn rise_of_two_points_is_a_warning() {
        let insights = generate_insights(&series(&[10.0, 12.0]), None);
        assert!(ids(&insights).contains(&"score-increase"));
        assert!(!ids(&insights).contains(&"score-improvement"));
    }

    #[test]
    fn two_point_change_with_decimal_scores() {
        let dropped = generate_insights(&series(&[10.3, 8.3]), None);
        assert!(ids(&dropped).contains(&"score-improvement"));

        let rose = generate_insights(&series(&[9.1, 11.1]), None);
        assert!(ids(&rose).contains(&"score-increase"));

        let almost = generate_insights(&series(&[10.3, 8.4]), None);
        assert!(!ids(&almost).contains(&"score-improvement"));
    }

    #[test]
    fn small_change_is_silent() {
        let insights = generate_insights(&series(&[12.0, 13.0]), None);
        assert!(insights.is_empty());
    }

    #[test]
    fn single_low_score_is_an_achievement() {
        let insights = generate_insights(&series(&[5.0]), None);
        assert_eq!(ids(&insights), vec!["excellent-score"]);
        assert_eq!(insights[0].kind, InsightKind::Achievement);
    }

    #[test]
    fn unchanged_score_needs_three_records() {
        let two = generate_insights(&series(&[12.0, 12.0]), None);
        assert!(!ids(&two).contains(&"score-stable"));

        let three = generate_insights(&series(&[11.0, 12.0, 12.0]), None);
        assert!(ids(&three).contains(&"score-stable"));
    }

    #[test]
    fn strictly_decreasing_scores_are_consistent_improvement() {
        let insights = generate_insights(&series(&[15.0, 13.0, 11.0]), None);
        assert!(ids(&insights).contains(&"consistent-improvement"));
        assert!(!ids(&insights).contains(&"declining-trend"));
    }

    #[test]
    fn strictly_increasing_scores_are_declining_trend() {
        let insights = generate_insights(&series(&[11.0, 13.0, 15.0]), None);
        assert!(ids(&insights).contains(&"declining-trend"));
        assert!(!ids(&insights).contains(&"consistent-improvement"));
    }

    #[test]
    fn skin_age_rules() {
        let younger = vec![record(0, 12.0, 34.0), record(1, 12.5, 33.0)];
        assert!(ids(&generate_insights(&younger, None)).contains(&"skin-age-improvement"));

        let slightly_older = vec![record(0, 12.0, 34.0), record(1, 12.5, 36.0)];
        assert!(generate_insights(&slightly_older, None).is_empty());

        let older = vec![record(0, 12.0, 34.0), record(1, 12.5, 36.5)];
        assert!(ids(&generate_insights(&older, None)).contains(&"skin-age-increase"));
    }

    #[test]
    fn adherence_buckets() {
        let high = AdherenceSummary {
            percentage: 95.0,
            trend: AdherenceTrend::Stable,
        };
        assert_eq!(ids(&generate_insights(&[], Some(&high))), vec!["excellent-adherence"]);

        let good = AdherenceSummary {
            percentage: 75.0,
            trend: AdherenceTrend::Improving,
        };
        let insights = generate_insights(&[], Some(&good));
        assert_eq!(ids(&insights), vec!["good-adherence", "improving-adherence"]);

        let middling = AdherenceSummary {
            percentage: 60.0,
            trend: AdherenceTrend::Declining,
        };
        assert!(generate_insights(&[], Some(&middling)).is_empty());

        let low = AdherenceSummary {
            percentage: 30.0,
            trend: AdherenceTrend::Improving,
        };
        let insights = generate_insights(&[], Some(&low));
        assert_eq!(ids(&insights), vec!["low-adherence", "improving-adherence"]);
    }

    #[test]
    fn adherence_bucket_edges() {
        let at = |percentage: f64| {
            let summary = AdherenceSummary {
                percentage,
                trend: AdherenceTrend::Stable,
            };
            generate_insights(&[], Some(&summary))
        };

        assert_eq!(ids(&at(90.0)), vec!["excellent-adherence"]);
        assert_eq!(ids(&at(89.9)), vec!["good-adherence"]);
        assert_eq!(ids(&at(70.0)), vec!["good-adherence"]);
        assert!(at(69.9).is_empty());
        assert!(at(50.0).is_empty());
        assert_eq!(ids(&at(49.9)), vec!["low-adherence"]);
    }

    #[test]
    fn zones_compare_first_and_latest() {
        let records = vec![
            with_zones(record(0, 12.0, 30.0), &[("forehead", 2.5), ("chin", 1.0), ("nose", 1.0)]),
            with_zones(record(1, 12.5, 30.0), &[("forehead", 1.0)]),
            with_zones(record(2, 12.0, 30.0), &[("forehead", 1.5), ("chin", 2.0), ("left_cheek", 3.0)]),
        ];
        let insights = generate_insights(&records, None);
        assert!(ids(&insights).contains(&"zone-improvement-forehead"));
        assert!(ids(&insights).contains(&"zone-worsening-chin"));
        assert!(!ids(&insights).iter().any(|id| id.ends_with("left_cheek")));
        assert!(!ids(&insights).iter().any(|id| id.ends_with("nose")));
    }

    #[test]
    fn zone_change_of_half_a_point_counts() {
        let records = vec![
            with_zones(record(0, 12.0, 30.0), &[("chin", 1.8), ("nose", 2.3), ("forehead", 1.2)]),
            with_zones(record(1, 12.5, 30.0), &[]),
            with_zones(record(2, 12.0, 30.0), &[("chin", 2.3), ("nose", 1.8), ("forehead", 1.6)]),
        ];
        let insights = generate_insights(&records, None);
        assert!(ids(&insights).contains(&"zone-worsening-chin"));
        assert!(ids(&insights).contains(&"zone-improvement-nose"));
        assert!(!ids(&insights).iter().any(|id| id.ends_with("forehead")));
    }

    #[test]
    fn zones_need_three_records() {
        let records = vec![
            with_zones(record(0, 12.0, 30.0), &[("forehead", 2.5)]),
            with_zones(record(1, 12.5, 30.0), &[("forehead", 1.0)]),
        ];
        assert!(generate_insights(&records, None).is_empty());
    }

    #[test]
    fn forecast_is_clamped() {
        let (change, projected) = forecast_score(&series(&[12.0, 8.0, 4.0])).expect("three records");
        assert_eq!(change, -4.0);
        assert_eq!(projected, 0.0);

        let (change, projected) = forecast_score(&series(&[15.0, 18.0, 19.0])).expect("three records");
        assert_eq!(change, 2.0);
        assert_eq!(projected, MAX_CLINICAL_SCORE);
    }

    #[test]
    fn forecast_fires_at_half_a_point_per_analysis() {
        let (change, _) = forecast_score(&series(&[12.2, 12.7, 13.2])).expect("three records");
        assert_eq!(change, 0.5);
        let worsening = generate_insights(&series(&[12.2, 12.7, 13.2]), None);
        assert!(ids(&worsening).contains(&"score-forecast-warning"));

        let improving = generate_insights(&series(&[13.2, 12.7, 12.2]), None);
        assert!(ids(&improving).contains(&"score-forecast"));

        let slower = generate_insights(&series(&[12.2, 12.6, 13.1]), None);
        assert!(!ids(&slower).iter().any(|id| id.starts_with("score-forecast")));
    }

    #[test]
    fn forecast_skips_flat_trajectories() {
        let insights = generate_insights(&series(&[12.0, 12.5, 12.5]), None);
        assert!(!ids(&insights).iter().any(|id| id.starts_with("score-forecast")));
    }

    #[test]
    fn worsening_forecast_is_a_warning() {
        let insights = generate_insights(&series(&[10.0, 11.0, 12.0]), None);
        let forecast = insights
            .iter()
            .find(|insight| insight.id == "score-forecast-warning")
            .expect("forecast warning");
        assert_eq!(forecast.kind, InsightKind::Warning);
    }

    #[test]
    fn keeps_top_five_by_priority() {
        let records = vec![
            with_zones(record(0, 16.0, 38.0), &[("forehead", 3.0), ("chin", 3.0)]),
            with_zones(record(1, 12.0, 36.0), &[]),
            with_zones(record(2, 8.0, 34.0), &[("forehead", 1.0), ("chin", 1.0)]),
        ];
        let adherence = AdherenceSummary {
            percentage: 92.0,
            trend: AdherenceTrend::Improving,
        };
        let insights = generate_insights(&records, Some(&adherence));
        assert_eq!(insights.len(), MAX_INSIGHTS);
        assert_eq!(
            ids(&insights),
            vec![
                "excellent-score",
                "score-improvement",
                "consistent-improvement",
                "skin-age-improvement",
                "excellent-adherence",
            ]
        );
    }

    proptest! {
        #[test]
        fn output_is_bounded_and_sorted(
            scores in proptest::collection::vec((0.0f64..=21.0, 18.0f64..=70.0), 0..8),
            percentage in proptest::option::of(0.0f64..=100.0),
        ) {
            let records: Vec<AnalysisRecord> = scores
                .iter()
                .enumerate()
                .map(|(index, (score, age))| {
                    with_zones(record(index as i64, *score, *age), &[("forehead", score / 7.0)])
                })
                .collect();
            let adherence = percentage.map(|percentage| AdherenceSummary {
                percentage,
                trend: AdherenceTrend::Improving,
            });

            let insights = generate_insights(&records, adherence.as_ref());
            prop_assert!(insights.len() <= MAX_INSIGHTS);
            prop_assert!(insights.windows(2).all(|pair| pair[0].priority >= pair[1].priority));
        }
    }
}
