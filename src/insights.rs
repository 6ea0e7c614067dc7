use std::collections::HashMap;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Audience, CertificateRecord, Dashboard, DashboardSummary, MonthlyUploadPoint, SkillFrequency,
};

pub const NO_STRONGEST_SKILL: &str = "N/A";

const CLOUD_KEYWORDS: [&str; 2] = ["aws", "cloud"];
const DATA_KEYWORDS: [&str; 2] = ["python", "ml"];

/// How upload timestamps are grouped for the trend series.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MonthBucket {
    /// Calendar month only; the same month of different years shares a bucket.
    #[default]
    #[value(name = "month")]
    MonthOnly,
    #[value(name = "year-month")]
    YearMonth,
}

impl MonthBucket {
    fn format(self) -> &'static str {
        match self {
            MonthBucket::MonthOnly => "%b",
            MonthBucket::YearMonth => "%b %Y",
        }
    }
}

pub fn tally_skills(records: &[CertificateRecord]) -> SkillFrequency {
    let mut frequency = SkillFrequency::default();

    for record in records {
        let Some(skills) = record.skills.as_deref() else {
            continue;
        };

        for skill in skills.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            frequency.record(skill);
        }
    }

    frequency
}

pub fn tally_months(records: &[CertificateRecord], bucket: MonthBucket) -> Vec<MonthlyUploadPoint> {
    let mut points: Vec<MonthlyUploadPoint> = Vec::new();
    let mut slots: HashMap<String, usize> = HashMap::new();

    for record in records {
        let Some(created_at) = record.created_at else {
            continue;
        };

        let label = created_at.format(bucket.format()).to_string();
        match slots.get(&label) {
            Some(&slot) => points[slot].count += 1,
            None => {
                slots.insert(label.clone(), points.len());
                points.push(MonthlyUploadPoint {
                    month: label,
                    count: 1,
                });
            }
        }
    }

    points
}

pub fn strongest_skill(frequency: &SkillFrequency) -> Option<&str> {
    frequency
        .ranked()
        .into_iter()
        .next()
        .map(|entry| entry.skill.as_str())
}

pub fn summary_text(frequency: &SkillFrequency, audience: Audience) -> String {
    match (strongest_skill(frequency), audience) {
        (Some(skill), Audience::Private) => format!(
            "Your strongest verified skill is **{skill}**, based on consistent certifications."
        ),
        (Some(skill), Audience::Public) => format!(
            "The user's strongest verified skill is **{skill}**, based on certification frequency."
        ),
        (None, Audience::Private) => {
            "Upload a certificate to generate your personalized AI breakdown.".to_string()
        }
        (None, Audience::Public) => "No certificates uploaded yet.".to_string(),
    }
}

pub fn recommendation(frequency: &SkillFrequency, audience: Audience) -> String {
    let lowered: Vec<String> = frequency
        .iter()
        .map(|entry| entry.skill.to_lowercase())
        .collect();
    let has_any = |keywords: &[&str]| {
        lowered
            .iter()
            .any(|skill| keywords.iter().any(|keyword| skill.as_str() == *keyword))
    };

    let text = if has_any(&CLOUD_KEYWORDS) {
        match audience {
            Audience::Private => "Next Recommended: AWS Solutions Architect Associate 🌩️",
            Audience::Public => "Recommended Next: AWS Solutions Architect Associate 🌩️",
        }
    } else if has_any(&DATA_KEYWORDS) {
        match audience {
            Audience::Private => "Next Recommended: TensorFlow Developer Certification 🤖",
            Audience::Public => "Recommended Next: TensorFlow Developer Certification 🤖",
        }
    } else {
        match audience {
            Audience::Private => "You can explore Cloud, DevOps, or Data Engineering 🚀",
            Audience::Public => "Suggested Path: Cloud, DevOps, or Data Engineering 🚀",
        }
    };

    text.to_string()
}

/// Runs the full pipeline over the complete record set of one owner.
pub fn summarize(
    owner_id: Uuid,
    records: &[CertificateRecord],
    audience: Audience,
    bucket: MonthBucket,
) -> Dashboard {
    let frequency = tally_skills(records);
    let monthly_uploads = tally_months(records, bucket);

    let summary = DashboardSummary {
        total_certificates: records.len(),
        unique_skill_count: frequency.len(),
        strongest_skill: strongest_skill(&frequency)
            .unwrap_or(NO_STRONGEST_SKILL)
            .to_string(),
        ai_summary: summary_text(&frequency, audience),
        ai_recommendation: recommendation(&frequency, audience),
    };

    Dashboard {
        owner_id,
        audience,
        summary,
        skills: frequency.into_counts(),
        monthly_uploads,
    }
}
