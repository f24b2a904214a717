//! Alert subject and body rendering. User-supplied text is always HTML-escaped.

use chrono::{DateTime, Utc};
use html_escape::encode_text;

use crate::analyze::{TopTrend, TrendAnalysis, Urgency, UrgencyCounts};

/// `"2 to FILM NOW + 1 this week - Birria ramen"`; empty parts are dropped.
pub fn alert_subject(counts: &UrgencyCounts, first_trend: &str) -> String {
    let mut parts = Vec::new();
    if counts.film_now > 0 {
        parts.push(format!("{} to FILM NOW", counts.film_now));
    }
    if counts.this_week > 0 {
        parts.push(format!("{} this week", counts.this_week));
    }
    format!("{} - {}", parts.join(" + "), first_trend)
}

fn headline(counts: &UrgencyCounts) -> String {
    let mut out = String::new();
    if counts.film_now > 0 {
        let s = if counts.film_now > 1 { "s" } else { "" };
        out.push_str(&format!("{} trend{s} to film NOW", counts.film_now));
    }
    if counts.film_now > 0 && counts.this_week > 0 {
        out.push_str(" + ");
    }
    if counts.this_week > 0 {
        out.push_str(&format!("{} to film this week", counts.this_week));
    }
    out
}

fn trend_row(t: &TopTrend) -> String {
    let (fg, bg) = match t.urgency {
        Urgency::FilmNow => ("#EF4444", "#FEE2E2"),
        _ => ("#F97316", "#FFF7ED"),
    };
    let where_to_film = t
        .restaurants
        .as_deref()
        .filter(|r| !r.trim().is_empty())
        .map(|r| {
            format!(
                r#"<div style="background:#F0FDF4;border-radius:8px;padding:12px;margin-top:8px;"><p style="margin:0 0 4px 0;color:#16A34A;font-size:11px;font-weight:700;text-transform:uppercase;">Where to Film</p><p style="margin:0;color:#374151;font-size:13px;">{}</p></div>"#,
                encode_text(r)
            )
        })
        .unwrap_or_default();
    format!(
        r#"<tr><td style="padding:16px;border-bottom:1px solid #E5E7EB;">
<span style="background:{bg};color:{fg};font-size:11px;font-weight:700;padding:3px 10px;border-radius:4px;text-transform:uppercase;">{urgency}</span>
<h3 style="margin:10px 0 6px 0;color:#111827;font-size:17px;">{trend}</h3>
<p style="margin:0 0 12px 0;color:#6B7280;font-size:13px;">{why}</p>
<div style="background:#F9FAFB;border-radius:8px;padding:12px;"><p style="margin:0 0 4px 0;color:#F97316;font-size:11px;font-weight:700;text-transform:uppercase;">Content Brief</p><p style="margin:0;color:#374151;font-size:13px;">{brief}</p></div>
{where_to_film}
</td></tr>"#,
        urgency = t.urgency.as_str(),
        trend = encode_text(&t.trend),
        why = encode_text(&t.why),
        brief = encode_text(&t.content_brief),
    )
}

/// Full HTML email for the urgent trends of an analysis.
pub fn alert_html(analysis: &TrendAnalysis, counts: &UrgencyCounts, now: DateTime<Utc>) -> String {
    let rows: String = analysis.urgent_trends().map(trend_row).collect();
    let summary = if analysis.summary.trim().is_empty() {
        String::new()
    } else {
        format!(
            r#"<p style="margin:8px 0 0 0;color:#78716C;font-size:13px;">{}</p>"#,
            encode_text(&analysis.summary)
        )
    };
    format!(
        r#"<!DOCTYPE html>
<html><head><meta charset="utf-8"></head>
<body style="margin:0;padding:0;background:#F3F4F6;font-family:-apple-system,'Segoe UI',Roboto,Arial,sans-serif;">
<table cellpadding="0" cellspacing="0" border="0" width="600" style="max-width:600px;margin:0 auto;">
<tr><td style="background:#111111;padding:24px;text-align:center;"><h1 style="margin:0;color:#F97316;font-size:24px;">Pre-viral Radar</h1></td></tr>
<tr><td style="background:#FFFBEB;padding:16px 24px;"><p style="margin:0;color:#92400E;font-size:14px;font-weight:600;">{headline}</p>{summary}</td></tr>
<tr><td style="background:white;"><table cellpadding="0" cellspacing="0" border="0" width="100%">{rows}</table></td></tr>
<tr><td style="background:#F9FAFB;padding:16px 24px;text-align:center;"><p style="margin:0;color:#9CA3AF;font-size:11px;">Automated scan - {ts}</p></td></tr>
</table>
</body></html>"#,
        headline = headline(counts),
        ts = now.format("%a %b %-d %H:%M UTC"),
    )
}

/// Plain-text variant used by chat channels.
pub fn alert_text(analysis: &TrendAnalysis, subject: &str) -> String {
    let mut out = format!("*{subject}*");
    for t in analysis.urgent_trends() {
        out.push_str(&format!("\n- [{}] {}: {}", t.urgency.as_str(), t.trend, t.content_brief));
    }
    out
}

pub fn error_subject(now: DateTime<Utc>) -> String {
    format!("Radar scan FAILED - {}", now.format("%Y-%m-%d %H:%M UTC"))
}

pub fn error_text(errors: &[String]) -> String {
    let mut out = String::from("Radar scan returned no data.\n\nErrors:\n");
    for e in errors {
        out.push_str("- ");
        out.push_str(e);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trend(name: &str, urgency: Urgency) -> TopTrend {
        TopTrend {
            trend: name.into(),
            why: "because <script>".into(),
            urgency,
            platforms: vec![],
            content_brief: "brief & hook".into(),
            restaurants: Some("Joe's <Pizza>".into()),
            sources: None,
        }
    }

    #[test]
    fn subject_drops_empty_parts() {
        let both = UrgencyCounts {
            film_now: 2,
            this_week: 1,
            watch: 4,
        };
        assert_eq!(
            alert_subject(&both, "Birria ramen"),
            "2 to FILM NOW + 1 this week - Birria ramen"
        );
        let week = UrgencyCounts {
            this_week: 3,
            ..Default::default()
        };
        assert_eq!(alert_subject(&week, "Matcha"), "3 this week - Matcha");
    }

    #[test]
    fn html_escapes_and_lists_only_urgent() {
        let a = TrendAnalysis {
            summary: "Spicy & sweet".into(),
            top_trends: vec![
                trend("Swicy wings", Urgency::FilmNow),
                trend("Ube latte", Urgency::Watch),
            ],
            generated_at: Utc::now(),
        };
        let html = alert_html(&a, &a.urgency_counts(), Utc::now());
        assert!(html.contains("Swicy wings"));
        assert!(!html.contains("Ube latte"));
        assert!(html.contains("because &lt;script&gt;"));
        assert!(html.contains("Joe's &lt;Pizza&gt;"));
        assert!(html.contains("1 trend to film NOW"));
        assert!(html.contains("Spicy &amp; sweet"));
    }

    #[test]
    fn error_text_lists_every_error() {
        let t = error_text(&["youtube: unavailable".into(), "reddit: timed out".into()]);
        assert!(t.contains("- youtube: unavailable\n- reddit: timed out\n"));
    }
}
