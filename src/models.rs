use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct CertificateRecord {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub title: String,
    pub file_url: Option<String>,
    pub skills: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Which dashboard a result is rendered for. The two variants share the
/// pipeline but differ in wording and palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    Private,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillCount {
    pub skill: String,
    pub count: usize,
}

/// Skill tally that remembers the order in which each skill was first seen.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SkillFrequency {
    entries: Vec<SkillCount>,
    index: HashMap<String, usize>,
}

impl SkillFrequency {
    pub fn record(&mut self, skill: &str) {
        match self.index.get(skill) {
            Some(&slot) => self.entries[slot].count += 1,
            None => {
                self.index.insert(skill.to_string(), self.entries.len());
                self.entries.push(SkillCount {
                    skill: skill.to_string(),
                    count: 1,
                });
            }
        }
    }

    #[cfg(test)]
    pub fn get(&self, skill: &str) -> Option<usize> {
        self.index.get(skill).map(|&slot| self.entries[slot].count)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Sum of all counts, i.e. the number of tallied skill tokens.
    #[cfg(test)]
    pub fn total(&self) -> usize {
        self.entries.iter().map(|entry| entry.count).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SkillCount> {
        self.entries.iter()
    }

    /// Entries sorted by descending count. The sort is stable, so equal
    /// counts keep first-seen order.
    pub fn ranked(&self) -> Vec<&SkillCount> {
        let mut ranked: Vec<&SkillCount> = self.entries.iter().collect();
        ranked.sort_by(|a, b| b.count.cmp(&a.count));
        ranked
    }

    pub fn into_counts(self) -> Vec<SkillCount> {
        self.entries
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyUploadPoint {
    pub month: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardSummary {
    pub total_certificates: usize,
    pub unique_skill_count: usize,
    pub strongest_skill: String,
    pub ai_summary: String,
    pub ai_recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Dashboard {
    pub owner_id: Uuid,
    pub audience: Audience,
    pub summary: DashboardSummary,
    pub skills: Vec<SkillCount>,
    pub monthly_uploads: Vec<MonthlyUploadPoint>,
}
