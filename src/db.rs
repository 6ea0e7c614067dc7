use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, Duration, TimeZone, Utc};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::models::CertificateRecord;

pub async fn init_db(pool: &PgPool) -> anyhow::Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

fn seed_timestamp(year: i32, month: u32, day: u32) -> anyhow::Result<DateTime<Utc>> {
    Utc.with_ymd_and_hms(year, month, day, 9, 30, 0)
        .single()
        .context("invalid seed timestamp")
}

pub async fn seed(pool: &PgPool) -> anyhow::Result<()> {
    let users = vec![
        (
            Uuid::parse_str("6b1f4c1e-8a53-4d1f-9c3e-2f5a7d9e0b41")?,
            "maya.chen@certfolio.dev",
            "demo-session-maya",
        ),
        (
            Uuid::parse_str("a2c9e7d4-3b6f-4f0a-8e21-5d4c3b2a1f90")?,
            "omar.haddad@certfolio.dev",
            "demo-session-omar",
        ),
    ];

    let expires_at = Utc::now() + Duration::days(30);
    for (id, email, token) in &users {
        sqlx::query(
            r#"
            INSERT INTO certfolio.users (id, email)
            VALUES ($1, $2)
            ON CONFLICT (email) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(email)
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO certfolio.sessions (token, user_id, expires_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (token) DO UPDATE SET expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(token)
        .bind(id)
        .bind(expires_at)
        .execute(pool)
        .await?;
    }

    let certificates = vec![
        (
            "seed-001",
            users[0].0,
            "AWS Certified Cloud Practitioner",
            "AWS, Cloud",
            seed_timestamp(2025, 3, 4)?,
        ),
        (
            "seed-002",
            users[0].0,
            "Google Cloud Digital Leader",
            "Cloud, GCP",
            seed_timestamp(2025, 6, 18)?,
        ),
        (
            "seed-003",
            users[0].0,
            "Terraform Associate",
            "Terraform, Cloud, DevOps",
            seed_timestamp(2026, 3, 2)?,
        ),
        (
            "seed-004",
            users[1].0,
            "Machine Learning Specialization",
            "Python, ML",
            seed_timestamp(2025, 11, 9)?,
        ),
        (
            "seed-005",
            users[1].0,
            "Data Analysis with Pandas",
            " Python , Pandas, ",
            seed_timestamp(2026, 1, 21)?,
        ),
    ];

    for (source_key, owner_id, title, skills, created_at) in certificates {
        sqlx::query(
            r#"
            INSERT INTO certfolio.certificates
            (id, user_id, title, file_url, skills, created_at, source_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(title)
        .bind(format!("certificates/{owner_id}/{source_key}.pdf"))
        .bind(skills)
        .bind(created_at)
        .bind(source_key)
        .execute(pool)
        .await?;
    }

    Ok(())
}

/// Every certificate row owned by `owner_id`, in whatever order the table
/// returns them.
pub async fn fetch_certificates(
    pool: &PgPool,
    owner_id: Uuid,
) -> anyhow::Result<Vec<CertificateRecord>> {
    let rows = sqlx::query(
        "SELECT id, user_id, title, file_url, skills, created_at \
         FROM certfolio.certificates \
         WHERE user_id = $1",
    )
    .bind(owner_id)
    .fetch_all(pool)
    .await?;

    let mut certificates = Vec::with_capacity(rows.len());

    for row in rows {
        certificates.push(CertificateRecord {
            id: row.get("id"),
            owner_id: row.get("user_id"),
            title: row.get("title"),
            file_url: row.get("file_url"),
            skills: row.get("skills"),
            created_at: row.get("created_at"),
        });
    }

    Ok(certificates)
}

pub async fn resolve_session(pool: &PgPool, token: &str) -> anyhow::Result<Option<Uuid>> {
    let row = sqlx::query(
        "SELECT user_id FROM certfolio.sessions \
         WHERE token = $1 AND expires_at > now()",
    )
    .bind(token)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|row| row.get("user_id")))
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct CsvRow {
    pub title: String,
    pub file_url: Option<String>,
    pub skills: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub source_key: Option<String>,
}

/// Parses an upload CSV. Empty cells become `None`; rows without a
/// `source_key` get a fresh `import-<uuid>` key so each import inserts them.
pub fn read_certificates_csv(csv_path: &Path) -> anyhow::Result<Vec<CsvRow>> {
    let mut reader = csv::Reader::from_path(csv_path)
        .with_context(|| format!("failed to open {}", csv_path.display()))?;
    let mut rows = Vec::new();

    for (line, result) in reader.deserialize::<CsvRow>().enumerate() {
        let mut row = result.with_context(|| format!("invalid certificate row {}", line + 1))?;
        if row.source_key.is_none() {
            row.source_key = Some(format!("import-{}", Uuid::new_v4()));
        }
        rows.push(row);
    }

    Ok(rows)
}

pub async fn import_csv(pool: &PgPool, owner_id: Uuid, csv_path: &Path) -> anyhow::Result<usize> {
    let mut inserted = 0usize;

    for row in read_certificates_csv(csv_path)? {
        let result = sqlx::query(
            r#"
            INSERT INTO certfolio.certificates
            (id, user_id, title, file_url, skills, created_at, source_key)
            VALUES ($1, $2, $3, $4, $5, COALESCE($6, now()), $7)
            ON CONFLICT (source_key) DO NOTHING
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(&row.title)
        .bind(&row.file_url)
        .bind(&row.skills)
        .bind(row.created_at)
        .bind(&row.source_key)
        .execute(pool)
        .await
        .with_context(|| format!("failed to store certificate {:?}", row.title))?;

        if result.rows_affected() > 0 {
            inserted += 1;
        }
    }

    Ok(inserted)
}
