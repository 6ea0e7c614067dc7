use std::fmt::Write;

use serde::Serialize;

use crate::models::{Audience, CertificateRecord, Dashboard};

const PRIVATE_PALETTE: [&str; 5] = ["#FFE066", "#FFD43B", "#FFEE99", "#FFF5C2", "#FFE98A"];
const PUBLIC_PALETTE: [&str; 5] = ["#00F5FF", "#7DF9FF", "#6A5ACD", "#9A4DFF", "#0095FF"];
const BAR_WIDTH: usize = 20;

#[derive(Debug, Clone, Serialize)]
pub struct Theme {
    pub title: &'static str,
    pub palette: &'static [&'static str],
}

impl Theme {
    pub fn for_audience(audience: Audience) -> Self {
        match audience {
            Audience::Private => Theme {
                title: "⚡ Dashboard — Defines Your Capabilities",
                palette: &PRIVATE_PALETTE,
            },
            Audience::Public => Theme {
                title: "🌐 Public Dashboard",
                palette: &PUBLIC_PALETTE,
            },
        }
    }

    /// Slice color for the `index`-th skill; cycles through the palette.
    pub fn color(&self, index: usize) -> &'static str {
        self.palette[index % self.palette.len()]
    }
}

fn bar(count: usize, max: usize) -> String {
    if max == 0 {
        return String::new();
    }
    let width = (count * BAR_WIDTH).div_ceil(max);
    "█".repeat(width)
}

pub fn build_report(dashboard: &Dashboard, share_link: Option<&str>) -> String {
    let theme = Theme::for_audience(dashboard.audience);
    let summary = &dashboard.summary;
    let mut output = String::new();

    let _ = writeln!(output, "# {}", theme.title);
    if let Some(link) = share_link {
        let _ = writeln!(output, "🔗 Share: {link}");
    }
    let _ = writeln!(output);

    let _ = writeln!(output, "| Total Certificates | Unique Skills | Strongest Skill |");
    let _ = writeln!(output, "| --- | --- | --- |");
    let _ = writeln!(
        output,
        "| {} | {} | {} |",
        summary.total_certificates, summary.unique_skill_count, summary.strongest_skill
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## 📈 Monthly Upload Trend");

    if dashboard.monthly_uploads.is_empty() {
        let _ = writeln!(output, "No uploads yet.");
    } else {
        let peak = dashboard
            .monthly_uploads
            .iter()
            .map(|point| point.count)
            .max()
            .unwrap_or(0);
        let _ = writeln!(output, "| Month | Count | |");
        let _ = writeln!(output, "| --- | ---: | --- |");
        for point in &dashboard.monthly_uploads {
            let _ = writeln!(
                output,
                "| {} | {} | {} |",
                point.month,
                point.count,
                bar(point.count, peak)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## 🔮 Skill Distribution");

    let tallied: usize = dashboard.skills.iter().map(|entry| entry.count).sum();
    if tallied == 0 {
        let _ = writeln!(output, "No skills recorded.");
    } else {
        for (index, entry) in dashboard.skills.iter().enumerate() {
            let _ = writeln!(
                output,
                "- {}: {} ({:.0}%) {}",
                entry.skill,
                entry.count,
                entry.count as f64 * 100.0 / tallied as f64,
                theme.color(index)
            );
        }
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## 🤖 AI Skill Summary");
    let _ = writeln!(output, "{}", summary.ai_summary);
    let _ = writeln!(output);
    let _ = writeln!(output, "## 🎯 AI Recommendation");
    let _ = writeln!(output, "{}", summary.ai_recommendation);

    output
}

/// Certificate gallery: one row per certificate, in the order given.
pub fn build_gallery(certificates: &[CertificateRecord]) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# 🎓 My Certificates");
    let _ = writeln!(output);

    if certificates.is_empty() {
        let _ = writeln!(output, "No certificates uploaded yet.");
        return output;
    }

    let _ = writeln!(output, "| Title | Skills | Uploaded | File |");
    let _ = writeln!(output, "| --- | --- | --- | --- |");
    for certificate in certificates {
        let _ = writeln!(
            output,
            "| {} | {} | {} | {} |",
            certificate.title,
            certificate.skills.as_deref().unwrap_or("-"),
            certificate
                .created_at
                .map(|at| at.format("%Y-%m-%d").to_string())
                .unwrap_or_else(|| "-".to_string()),
            certificate.file_url.as_deref().unwrap_or("-")
        );
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::insights::{summarize, MonthBucket};
    use chrono::{TimeZone, Utc};
    use uuid::Uuid;

    fn record(skills: &str, month: u32) -> CertificateRecord {
        CertificateRecord {
            id: Uuid::new_v4(),
            owner_id: Uuid::nil(),
            title: "Certificate".to_string(),
            file_url: None,
            skills: Some(skills.to_string()),
            created_at: Utc.with_ymd_and_hms(2025, month, 3, 8, 0, 0).single(),
        }
    }

    #[test]
    fn empty_private_report_uses_fallbacks() {
        let dashboard = summarize(Uuid::nil(), &[], Audience::Private, MonthBucket::MonthOnly);
        let report = build_report(&dashboard, Some("http://localhost:3000/public-dashboard/x"));

        assert!(report.starts_with("# ⚡ Dashboard"));
        assert!(report.contains("🔗 Share: http://localhost:3000/public-dashboard/x"));
        assert!(report.contains("| 0 | 0 | N/A |"));
        assert!(report.contains("No uploads yet."));
        assert!(report.contains("No skills recorded."));
        assert!(report.contains("Upload a certificate to generate your personalized AI breakdown."));
    }

    #[test]
    fn public_report_lists_skills_with_public_palette() {
        let records = vec![record("AWS, Cloud", 3), record("Cloud", 4)];
        let dashboard = summarize(Uuid::nil(), &records, Audience::Public, MonthBucket::MonthOnly);
        let report = build_report(&dashboard, None);

        assert!(report.starts_with("# 🌐 Public Dashboard"));
        assert!(!report.contains("Share:"));
        assert!(report.contains("- AWS: 1 (33%) #00F5FF"));
        assert!(report.contains("- Cloud: 2 (67%) #7DF9FF"));
        assert!(report.contains("Recommended Next: AWS Solutions Architect Associate"));
    }

    #[test]
    fn trend_renders_as_table_rows() {
        let records = vec![record("Go", 7), record("Rust", 7), record("SQL", 2)];
        let dashboard = summarize(Uuid::nil(), &records, Audience::Private, MonthBucket::MonthOnly);
        let report = build_report(&dashboard, None);

        let full = "█".repeat(BAR_WIDTH);
        let half = "█".repeat(BAR_WIDTH / 2);
        assert!(report.contains("| Month | Count | |"));
        assert!(report.contains(&format!("| Jul | 2 | {full} |")));
        assert!(report.contains(&format!("| Feb | 1 | {half} |")));
    }

    #[test]
    fn gallery_lists_metadata_with_placeholders() {
        let mut bare = record("", 1);
        bare.title = "Team Leadership Workshop".to_string();
        bare.skills = None;
        bare.created_at = None;
        let mut full = record("AWS, Cloud", 3);
        full.title = "AWS Solutions Architect".to_string();
        full.file_url = Some("certificates/aws.pdf".to_string());

        let gallery = build_gallery(&[full, bare]);
        assert!(gallery.starts_with("# 🎓 My Certificates"));
        assert!(gallery
            .contains("| AWS Solutions Architect | AWS, Cloud | 2025-03-03 | certificates/aws.pdf |"));
        assert!(gallery.contains("| Team Leadership Workshop | - | - | - |"));
    }

    #[test]
    fn empty_gallery_says_so() {
        assert!(build_gallery(&[]).contains("No certificates uploaded yet."));
    }

    #[test]
    fn trend_bars_scale_to_the_busiest_month() {
        assert_eq!(bar(2, 2).chars().count(), BAR_WIDTH);
        assert_eq!(bar(1, 2).chars().count(), BAR_WIDTH / 2);
        assert_eq!(bar(0, 0), "");
    }

    #[test]
    fn palette_cycles() {
        let theme = Theme::for_audience(Audience::Private);
        assert_eq!(theme.color(0), "#FFE066");
        assert_eq!(theme.color(5), "#FFE066");
        assert_eq!(theme.color(6), "#FFD43B");
    }
}
