//! # Dashboard
//! Turns the aggregated history into a table, a sentiment distribution and
//! a positiveness trend, and renders them as one HTML page with inline SVG.
//!
//! `present` is pure; `render_page` only formats what `present` produced.

use std::collections::BTreeMap;
use std::fmt::Write as _;

use chrono::{DateTime, Utc};
use html_escape::{encode_double_quoted_attribute, encode_text};
use serde::Serialize;

use crate::history::RecentTable;

/// Column headers of the table view.
pub const TABLE_HEADERS: [&str; 5] = ["publishedAt", "source", "headline", "sentiment", "prob_pos"];

const CHART_W: f64 = 560.0;
const CHART_H: f64 = 240.0;
const PAD: f64 = 32.0;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableRow {
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    pub source: Option<String>,
    pub headline: String,
    pub sentiment: String,
    pub prob_pos: f64,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SentimentCount {
    pub sentiment: String,
    pub count: usize,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrendPoint {
    #[serde(rename = "publishedAt")]
    pub published_at: Option<DateTime<Utc>>,
    pub prob_pos: f64,
}

/// Everything the page shows. Chart data is `None` for an empty table.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DashboardView {
    pub headers: Vec<&'static str>,
    pub rows: Vec<TableRow>,
    pub distribution: Option<Vec<SentimentCount>>,
    pub trend: Option<Vec<TrendPoint>>,
}

pub fn present(table: &RecentTable) -> DashboardView {
    let rows: Vec<TableRow> = table
        .rows
        .iter()
        .map(|r| TableRow {
            published_at: r.published_at,
            source: r.source.clone(),
            headline: r.title.clone(),
            sentiment: r.sentiment.to_string(),
            prob_pos: r.prob_pos,
        })
        .collect();

    if table.is_empty() {
        return DashboardView {
            headers: TABLE_HEADERS.to_vec(),
            rows,
            distribution: None,
            trend: None,
        };
    }

    DashboardView {
        headers: TABLE_HEADERS.to_vec(),
        distribution: Some(sentiment_counts(table)),
        trend: Some(trend_points(table)),
        rows,
    }
}

/// Label counts, largest first; ties by label.
fn sentiment_counts(table: &RecentTable) -> Vec<SentimentCount> {
    let mut by_label: BTreeMap<String, usize> = BTreeMap::new();
    for r in &table.rows {
        *by_label.entry(r.sentiment.to_string()).or_default() += 1;
    }
    let mut out: Vec<SentimentCount> = by_label
        .into_iter()
        .map(|(sentiment, count)| SentimentCount { sentiment, count })
        .collect();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.sentiment.cmp(&b.sentiment)));
    out
}

/// Oldest first, missing timestamps last; non-finite scores plot as 0.
fn trend_points(table: &RecentTable) -> Vec<TrendPoint> {
    let mut pts: Vec<TrendPoint> = table
        .rows
        .iter()
        .map(|r| TrendPoint {
            published_at: r.published_at,
            prob_pos: if r.prob_pos.is_finite() { r.prob_pos } else { 0.0 },
        })
        .collect();
    pts.sort_by(|a, b| match (a.published_at, b.published_at) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => std::cmp::Ordering::Equal,
    });
    pts
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
}

impl Notice {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Success,
            text: text.into(),
        }
    }
    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Warning,
            text: text.into(),
        }
    }
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            kind: NoticeKind::Error,
            text: text.into(),
        }
    }
}

/// Page chrome that is not derived from the data.
#[derive(Debug, Clone)]
pub struct PageContext {
    pub refresh_secs: u64,
    pub last_updated: DateTime<Utc>,
    pub notices: Vec<Notice>,
}

pub fn render_page(view: &DashboardView, ctx: &PageContext) -> String {
    let mut html = String::with_capacity(16 * 1024);
    let _ = write!(
        html,
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta http-equiv="refresh" content="{refresh}; url=/?refresh={refresh}">
<title>Real-Time News Sentiment</title>
<style>
body{{font-family:system-ui,sans-serif;margin:1.5rem;color:#222}}
table{{border-collapse:collapse;width:100%;font-size:.9rem}}
th,td{{border-bottom:1px solid #ddd;padding:.3rem .5rem;text-align:left}}
.scroll{{max-height:400px;overflow-y:auto}}
.cols{{display:flex;gap:2rem;flex-wrap:wrap}}
.notice{{padding:.5rem .8rem;margin:.5rem 0;border-radius:4px}}
.success{{background:#e6f4ea}}.warning{{background:#fff4e5}}.error{{background:#fdecea}}
</style>
</head>
<body>
<h1>Real-Time News Sentiment Dashboard</h1>
<form method="get" action="/">
<label>Refresh interval (seconds): <input type="range" name="refresh" min="10" max="120" value="{refresh}" onchange="this.form.submit()"> {refresh}</label>
</form>
<form method="post" action="/fetch?refresh={refresh}"><button type="submit">Fetch &amp; Classify Latest News</button></form>
"#,
        refresh = ctx.refresh_secs
    );

    for n in &ctx.notices {
        let class = match n.kind {
            NoticeKind::Success => "success",
            NoticeKind::Warning => "warning",
            NoticeKind::Error => "error",
        };
        let _ = writeln!(
            html,
            r#"<div class="notice {class}">{}</div>"#,
            encode_text(&n.text)
        );
    }

    html.push_str("<h2>Latest Headlines</h2>\n<div class=\"scroll\"><table>\n<tr>");
    for h in &view.headers {
        let _ = write!(html, "<th>{h}</th>");
    }
    html.push_str("</tr>\n");
    for r in &view.rows {
        let _ = writeln!(
            html,
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{:.3}</td></tr>",
            r.published_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            encode_text(r.source.as_deref().unwrap_or("")),
            encode_text(&r.headline),
            encode_text(&r.sentiment),
            r.prob_pos
        );
    }
    html.push_str("</table></div>\n<div class=\"cols\">\n");

    html.push_str("<div><h2>Sentiment Distribution</h2>\n");
    if let Some(counts) = &view.distribution {
        html.push_str(&bar_chart_svg(counts));
    }
    html.push_str("</div>\n<div><h2>Positive Sentiment Trend</h2>\n");
    if let Some(points) = &view.trend {
        html.push_str(&line_chart_svg(points));
    }
    html.push_str("</div>\n</div>\n");

    let _ = write!(
        html,
        "<p><strong>Last updated:</strong> {}</p>\n</body>\n</html>\n",
        ctx.last_updated.format("%Y-%m-%d %H:%M:%S%.6f")
    );
    html
}

fn bar_color(label: &str) -> &'static str {
    match label {
        "Positive" => "#2e7d32",
        "Negative" => "#c62828",
        _ => "#546e7a",
    }
}

pub fn bar_chart_svg(counts: &[SentimentCount]) -> String {
    let max = counts.iter().map(|c| c.count).max().unwrap_or(0).max(1) as f64;
    let slot = (CHART_W - 2.0 * PAD) / counts.len().max(1) as f64;
    let plot_h = CHART_H - 2.0 * PAD;

    let mut svg = format!(
        r#"<svg class="bar-chart" xmlns="http://www.w3.org/2000/svg" width="{CHART_W}" height="{CHART_H}" viewBox="0 0 {CHART_W} {CHART_H}">"#
    );
    for (i, c) in counts.iter().enumerate() {
        let h = plot_h * c.count as f64 / max;
        let x = PAD + slot * i as f64 + slot * 0.15;
        let y = CHART_H - PAD - h;
        let label = encode_double_quoted_attribute(&c.sentiment);
        let _ = write!(
            svg,
            r#"<rect x="{x:.1}" y="{y:.1}" width="{w:.1}" height="{h:.1}" fill="{color}" data-sentiment="{label}"><title>{text}: {count}</title></rect><text x="{tx:.1}" y="{ly:.1}" text-anchor="middle" font-size="12">{text} ({count})</text>"#,
            w = slot * 0.7,
            color = bar_color(&c.sentiment),
            text = encode_text(&c.sentiment),
            count = c.count,
            tx = x + slot * 0.35,
            ly = CHART_H - PAD / 2.0,
        );
    }
    svg.push_str("</svg>\n");
    svg
}

/// Horizontal offsets in `[0, width]` for points sorted oldest first.
/// Dated points sit on a time axis; undated ones follow the last dated
/// point, one slot each.
fn trend_offsets(points: &[TrendPoint], width: f64) -> Vec<f64> {
    let dated: Vec<i64> = points
        .iter()
        .filter_map(|p| p.published_at)
        .map(|t| t.timestamp_millis())
        .collect();
    let (Some(&lo), Some(&hi)) = (dated.iter().min(), dated.iter().max()) else {
        let step = if points.len() > 1 {
            width / (points.len() - 1) as f64
        } else {
            0.0
        };
        return (0..points.len()).map(|i| step * i as f64).collect();
    };

    let undated = points.len() - dated.len();
    let slot = width / points.len() as f64;
    let dated_w = width - slot * undated as f64;
    let span = (hi - lo) as f64;

    let mut next_slot = 0usize;
    points
        .iter()
        .map(|p| match p.published_at {
            Some(t) if span > 0.0 => dated_w * (t.timestamp_millis() - lo) as f64 / span,
            Some(_) => 0.0,
            None => {
                next_slot += 1;
                dated_w + slot * next_slot as f64
            }
        })
        .collect()
}

pub fn line_chart_svg(points: &[TrendPoint]) -> String {
    let plot_w = CHART_W - 2.0 * PAD;
    let plot_h = CHART_H - 2.0 * PAD;
    let xs = trend_offsets(points, plot_w);

    let coords: Vec<String> = points
        .iter()
        .zip(&xs)
        .map(|(p, dx)| {
            let x = PAD + dx;
            let y = CHART_H - PAD - plot_h * p.prob_pos.clamp(0.0, 1.0);
            format!("{x:.1},{y:.1}")
        })
        .collect();

    let mut svg = format!(
        r#"<svg class="line-chart" xmlns="http://www.w3.org/2000/svg" width="{CHART_W}" height="{CHART_H}" viewBox="0 0 {CHART_W} {CHART_H}">"#
    );
    let _ = write!(
        svg,
        r##"<line x1="{PAD}" y1="{b}" x2="{r}" y2="{b}" stroke="#999"/><line x1="{PAD}" y1="{PAD}" x2="{PAD}" y2="{b}" stroke="#999"/><text x="4" y="{PAD}" font-size="10">1.0</text><text x="4" y="{b}" font-size="10">0.0</text>"##,
        b = CHART_H - PAD,
        r = CHART_W - PAD,
    );
    let _ = write!(
        svg,
        r##"<polyline fill="none" stroke="#1565c0" stroke-width="2" points="{}"/>"##,
        coords.join(" ")
    );
    if let (Some(first), Some(last)) = (points.first(), points.last()) {
        let fmt = |p: &TrendPoint| {
            p.published_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_else(|| "n/a".to_string())
        };
        let _ = write!(
            svg,
            r#"<text x="{PAD}" y="{y}" font-size="10">{}</text><text x="{r}" y="{y}" font-size="10" text-anchor="end">{}</text>"#,
            fmt(first),
            fmt(last),
            y = CHART_H - 8.0,
            r = CHART_W - PAD,
        );
    }
    svg.push_str("</svg>\n");
    svg
}
