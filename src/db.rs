use std::collections::BTreeMap;
use std::io::Read;

use anyhow::Context;
use chrono::NaiveDate;
use sqlx::types::Json;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::{
    AdherenceSummary, AdherenceTrend, AnalysisRecord, Profile, ScoreTrend, MAX_CLINICAL_SCORE,
};

/// Facial zones carried as optional CSV columns.
pub const CSV_ZONES: [&str; 5] = ["forehead", "left_cheek", "right_cheek", "nose", "chin"];

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let profile_id = upsert_profile(
        pool,
        "Maya Chen",
        "maya.chen@example.com",
        Some("combination"),
        Some(1991),
    )
    .await?;

    let analyses = vec![
        ("seed-001", (2026, 1, 5), 14.0, 37.0, [2.5, 2.0, 2.0, 1.5, 2.0]),
        ("seed-002", (2026, 1, 19), 12.0, 36.0, [2.0, 2.0, 1.5, 1.5, 2.0]),
        ("seed-003", (2026, 2, 2), 11.0, 36.0, [1.5, 1.5, 1.5, 1.0, 2.5]),
        ("seed-004", (2026, 2, 16), 8.0, 34.5, [1.0, 1.5, 1.0, 1.0, 2.5]),
    ];

    for (source_key, (year, month, day), clinical_score, skin_age, zones) in analyses {
        let analyzed_on = NaiveDate::from_ymd_opt(year, month, day).context("invalid date")?;
        let zone_scores: BTreeMap<String, f64> = CSV_ZONES
            .iter()
            .zip(zones)
            .map(|(zone, score)| (zone.to_string(), score))
            .collect();

        insert_analysis(
            pool,
            profile_id,
            &AnalysisImport {
                full_name: "Maya Chen".to_string(),
                email: "maya.chen@example.com".to_string(),
                analyzed_on,
                clinical_score,
                skin_age,
                zone_scores,
                source_key: source_key.to_string(),
            },
        )
        .await?;
    }

    if fetch_latest_adherence(pool, "maya.chen@example.com")
        .await?
        .is_none()
    {
        record_adherence(pool, "maya.chen@example.com", 82.0, AdherenceTrend::Improving).await?;
    }

    Ok(())
}

pub async fn upsert_profile(
    pool: &PgPool,
    full_name: &str,
    email: &str,
    skin_type: Option<&str>,
    birth_year: Option<i32>,
) -> anyhow::Result<Uuid> {
    let id: Uuid = sqlx::query(
        r#"
        INSERT INTO skin_tracker.profiles (id, full_name, email, skin_type, birth_year)
        VALUES ($1, $2, $3, $4, $5)
        ON CONFLICT (email) DO UPDATE
        SET full_name = EXCLUDED.full_name,
            skin_type = COALESCE(EXCLUDED.skin_type, skin_tracker.profiles.skin_type),
            birth_year = COALESCE(EXCLUDED.birth_year, skin_tracker.profiles.birth_year)
        RETURNING id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(full_name)
    .bind(email)
    .bind(skin_type)
    .bind(birth_year)
    .fetch_one(pool)
    .await?
    .get("id");

    tracing::debug!(%id, email, "profile upserted");
    Ok(id)
}

pub async fn fetch_profile(pool: &PgPool, email: &str) -> anyhow::Result<Option<Profile>> {
    let row = sqlx::query(
        "SELECT id, full_name, email, skin_type, birth_year \
         FROM skin_tracker.profiles WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| Profile {
        id: row.get("id"),
        full_name: row.get("full_name"),
        email: row.get("email"),
        skin_type: row.get("skin_type"),
        birth_year: row.get("birth_year"),
    }))
}

async fn profile_id(pool: &PgPool, email: &str) -> anyhow::Result<Uuid> {
    let row = sqlx::query("SELECT id FROM skin_tracker.profiles WHERE email = $1")
        .bind(email)
        .fetch_optional(pool)
        .await?;

    row.map(|row| row.get("id"))
        .with_context(|| format!("no profile registered for {email}"))
}

pub async fn record_adherence(
    pool: &PgPool,
    email: &str,
    percentage: f64,
    trend: AdherenceTrend,
) -> anyhow::Result<()> {
    anyhow::ensure!(
        (0.0..=100.0).contains(&percentage),
        "adherence percentage must be between 0 and 100, got {percentage}"
    );
    let profile_id = profile_id(pool, email).await?;

    sqlx::query(
        r#"
        INSERT INTO skin_tracker.routine_adherence
        (id, profile_id, percentage, trend)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(profile_id)
    .bind(percentage)
    .bind(trend.as_str())
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn fetch_analyses(pool: &PgPool, email: &str) -> anyhow::Result<Vec<AnalysisRecord>> {
    let rows = sqlx::query(
        "SELECT a.id, a.analyzed_on, a.clinical_score, a.skin_age, a.zone_scores \
         FROM skin_tracker.analyses a \
         JOIN skin_tracker.profiles p ON p.id = a.profile_id \
         WHERE p.email = $1 \
         ORDER BY a.analyzed_on ASC, a.created_at ASC",
    )
    .bind(email)
    .fetch_all(pool)
    .await?;

    let mut records = Vec::with_capacity(rows.len());
    for row in rows {
        let zones: Json<BTreeMap<String, f64>> = row.get("zone_scores");
        records.push(AnalysisRecord {
            id: row.get("id"),
            analyzed_on: row.get("analyzed_on"),
            clinical_score: row.get("clinical_score"),
            skin_age: row.get("skin_age"),
            zone_scores: zones.0,
        });
    }

    Ok(records)
}

pub async fn fetch_latest_adherence(
    pool: &PgPool,
    email: &str,
) -> anyhow::Result<Option<AdherenceSummary>> {
    let row = sqlx::query(
        "SELECT r.percentage, r.trend \
         FROM skin_tracker.routine_adherence r \
         JOIN skin_tracker.profiles p ON p.id = r.profile_id \
         WHERE p.email = $1 \
         ORDER BY r.recorded_at DESC \
         LIMIT 1",
    )
    .bind(email)
    .fetch_optional(pool)
    .await?;

    match row {
        Some(row) => {
            let trend: String = row.get("trend");
            Ok(Some(AdherenceSummary {
                percentage: row.get("percentage"),
                trend: trend.parse()?,
            }))
        }
        None => Ok(None),
    }
}

pub async fn fetch_score_trends(pool: &PgPool, email: &str) -> anyhow::Result<Vec<ScoreTrend>> {
    let rows = sqlx::query(
        "SELECT date_trunc('month', a.analyzed_on)::date AS month_start, \
         COUNT(*) AS analysis_count, \
         AVG(a.clinical_score) AS avg_score, \
         AVG(a.skin_age) AS avg_skin_age \
         FROM skin_tracker.analyses a \
         JOIN skin_tracker.profiles p ON p.id = a.profile_id \
         WHERE p.email = $1 \
         GROUP BY month_start \
         ORDER BY month_start ASC",
    )
    .bind(email)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| ScoreTrend {
            month_start: row.get("month_start"),
            analysis_count: row.get("analysis_count"),
            avg_score: row.get("avg_score"),
            avg_skin_age: row.get("avg_skin_age"),
        })
        .collect())
}

/// One analysis row from an export of the external scan pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisImport {
    pub full_name: String,
    pub email: String,
    pub analyzed_on: NaiveDate,
    pub clinical_score: f64,
    pub skin_age: f64,
    pub zone_scores: BTreeMap<String, f64>,
    pub source_key: String,
}

#[derive(serde::Deserialize)]
struct CsvRow {
    full_name: String,
    email: String,
    analyzed_on: NaiveDate,
    clinical_score: f64,
    skin_age: f64,
    forehead: Option<f64>,
    left_cheek: Option<f64>,
    right_cheek: Option<f64>,
    nose: Option<f64>,
    chin: Option<f64>,
    source_key: Option<String>,
}

pub fn parse_csv<R: Read>(reader: R) -> anyhow::Result<Vec<AnalysisImport>> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut imports = Vec::new();

    for (index, result) in reader.deserialize::<CsvRow>().enumerate() {
        let line = index + 2;
        let row = result.with_context(|| format!("malformed row on line {line}"))?;

        anyhow::ensure!(
            (0.0..=MAX_CLINICAL_SCORE).contains(&row.clinical_score),
            "clinical score {} on line {line} is outside 0-21",
            row.clinical_score
        );

        let zone_values = [row.forehead, row.left_cheek, row.right_cheek, row.nose, row.chin];
        let mut zone_scores = BTreeMap::new();
        for (zone, value) in CSV_ZONES.iter().zip(zone_values) {
            if let Some(score) = value {
                anyhow::ensure!(
                    (0.0..=3.0).contains(&score),
                    "{zone} score {score} on line {line} is outside 0-3"
                );
                zone_scores.insert(zone.to_string(), score);
            }
        }

        let source_key = row
            .source_key
            .filter(|key| !key.trim().is_empty())
            .unwrap_or_else(|| format!("import-{}", Uuid::new_v4()));

        imports.push(AnalysisImport {
            full_name: row.full_name,
            email: row.email,
            analyzed_on: row.analyzed_on,
            clinical_score: row.clinical_score,
            skin_age: row.skin_age,
            zone_scores,
            source_key,
        });
    }

    Ok(imports)
}

async fn insert_analysis(
    pool: &PgPool,
    profile_id: Uuid,
    analysis: &AnalysisImport,
) -> anyhow::Result<bool> {
    let result = sqlx::query(
        r#"
        INSERT INTO skin_tracker.analyses
        (id, profile_id, analyzed_on, clinical_score, skin_age, zone_scores, source_key)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        ON CONFLICT (source_key) DO NOTHING
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(profile_id)
    .bind(analysis.analyzed_on)
    .bind(analysis.clinical_score)
    .bind(analysis.skin_age)
    .bind(Json(&analysis.zone_scores))
    .bind(&analysis.source_key)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn import_csv(pool: &PgPool, csv_path: &std::path::Path) -> anyhow::Result<usize> {
    let file = std::fs::File::open(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let imports = parse_csv(file)?;
    let mut inserted = 0usize;

    for analysis in &imports {
        let profile_id =
            upsert_profile(pool, &analysis.full_name, &analysis.email, None, None).await?;
        if insert_analysis(pool, profile_id, analysis).await? {
            inserted += 1;
        } else {
            tracing::debug!(source_key = %analysis.source_key, "analysis already imported");
        }
    }

    tracing::info!(rows = imports.len(), inserted, "csv import finished");
    Ok(inserted)
}
