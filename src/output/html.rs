//! HTML report with a sortable DataTables table

use super::{json::ReportRow, write_report};
use crate::error::Result;
use crate::models::ProbeResult;
use crate::types::ProbeStatus;
use chrono::{DateTime, Local};
use std::fmt::Write as _;
use std::path::Path;

const STYLE: &str = r#"        body { font-family: Arial, sans-serif; margin: 2em; background: #1a1a1a; color: #eee; }
        table { background: #2d2d2d; width: 100%; }
        th { background: #007acc; color: white; }
        td { padding: 8px; border-bottom: 1px solid #444; }
        .colo { background: #0f5132 !important; color: #d4edda; font-weight: bold; }
        .slow { background: #664d03 !important; color: #fff3cd; }
        .fail { background: #842029 !important; color: #f8d7da; }
        .summary { margin: 1em 0 2em 0; padding: 1em; background: #2d2d2d; border-radius: 5px; }"#;

const COLUMNS: &[&str] = &[
    "Constant",
    "Category",
    "Domain",
    "IP",
    "Latency (ms)",
    "Status",
    "AWS Region",
    "Country",
    "Region",
    "City",
];

/// Render the full report page
pub fn render_html(results: &[ProbeResult], threshold_ms: f64, generated_at: DateTime<Local>) -> String {
    let total = results.len();
    let colo = results.iter().filter(|r| r.status() == ProbeStatus::CoLocated).count();
    let percentage = if total == 0 { 0.0 } else { colo as f64 / total as f64 * 100.0 };
    let timestamp = generated_at.format("%Y-%m-%d %H:%M");

    let mut html = String::with_capacity(4096 + results.len() * 512);
    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html>\n<head>\n    <meta charset=\"utf-8\">");
    let _ = writeln!(html, "    <title>Co-location Latency Report</title>");
    let _ = writeln!(
        html,
        "    <link rel=\"stylesheet\" href=\"https://cdn.datatables.net/1.13.6/css/jquery.dataTables.min.css\">"
    );
    let _ = writeln!(html, "    <style>\n{}\n    </style>\n</head>\n<body>", STYLE);
    let _ = writeln!(html, "    <h1>Latency Report – {}</h1>", timestamp);
    let _ = writeln!(
        html,
        "    <div class=\"summary\">\n        <p><strong>{}</strong> / <strong>{}</strong> IPs under {} ms → <strong>{:.1}% CO-LOCATED</strong></p>\n    </div>",
        colo, total, threshold_ms, percentage
    );

    let _ = writeln!(html, "    <table id=\"t\">\n        <thead>\n            <tr>");
    for column in COLUMNS {
        let _ = writeln!(html, "                <th>{}</th>", column);
    }
    let _ = writeln!(html, "            </tr>\n        </thead>\n        <tbody>");

    for result in results {
        let row = ReportRow::from(result);
        let latency = row
            .latency_ms
            .map(|ms| format!("{:.2}", ms))
            .unwrap_or_else(|| "N/A".to_string());
        let ip = row.ip.as_deref().unwrap_or("N/A");

        let _ = writeln!(html, "            <tr class=\"{}\">", result.status().css_class());
        for cell in [
            row.constant.as_str(),
            row.category.as_str(),
            row.domain.as_str(),
            ip,
            latency.as_str(),
            row.status.as_str(),
            row.aws_region.as_str(),
            row.country.as_str(),
            row.region.as_str(),
            row.city.as_str(),
        ] {
            let _ = writeln!(html, "                <td>{}</td>", escape(cell));
        }
        let _ = writeln!(html, "            </tr>");
    }

    let _ = writeln!(html, "        </tbody>\n    </table>");
    let _ = writeln!(html, "    <script src=\"https://code.jquery.com/jquery-3.7.1.min.js\"></script>");
    let _ = writeln!(
        html,
        "    <script src=\"https://cdn.datatables.net/1.13.6/js/jquery.dataTables.min.js\"></script>"
    );
    let _ = writeln!(
        html,
        "    <script>\n        $(() => $('#t').DataTable({{ \"pageLength\": 100, \"order\": [[4, \"asc\"]] }}));\n    </script>"
    );
    let _ = write!(html, "</body>\n</html>\n");

    html
}

pub fn save_html(results: &[ProbeResult], threshold_ms: f64, path: &Path) -> Result<()> {
    write_report(path, &render_html(results, threshold_ms, Local::now()))
}

/// Escape text for use inside an HTML element or attribute
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
