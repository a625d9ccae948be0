//! JSON report

use super::{round_ms, write_report};
use crate::error::Result;
use crate::models::ProbeResult;
use serde::{Deserialize, Serialize};
use std::path::Path;

const UNKNOWN: &str = "Unknown";
const NO_PTR: &str = "No PTR";

/// One report row; key names are part of the report format
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRow {
    #[serde(rename = "Constant")]
    pub constant: String,
    #[serde(rename = "Category")]
    pub category: String,
    #[serde(rename = "Domain")]
    pub domain: String,
    #[serde(rename = "IP")]
    pub ip: Option<String>,
    #[serde(rename = "Latency_ms")]
    pub latency_ms: Option<f64>,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "AWS_Region")]
    pub aws_region: String,
    #[serde(rename = "Country")]
    pub country: String,
    #[serde(rename = "Region")]
    pub region: String,
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Error")]
    pub error: Option<String>,
}

impl From<&ProbeResult> for ReportRow {
    fn from(result: &ProbeResult) -> Self {
        let enrichment = result.enrichment();
        let or_unknown = |value: &Option<String>| value.clone().unwrap_or_else(|| UNKNOWN.to_string());

        Self {
            constant: result.name().to_string(),
            category: result.category().to_string(),
            domain: result.domain().to_string(),
            ip: result.address().map(|a| a.to_string()),
            latency_ms: result.latency_ms().map(round_ms),
            status: result.status().label().to_string(),
            aws_region: enrichment
                .cloud_region
                .clone()
                .or_else(|| enrichment.reverse_dns.clone())
                .unwrap_or_else(|| NO_PTR.to_string()),
            country: or_unknown(&enrichment.country),
            region: or_unknown(&enrichment.region),
            city: or_unknown(&enrichment.city),
            error: result
                .failure()
                .map(|f| format!("{}: {}", f.kind, f.detail)),
        }
    }
}

/// Pretty-printed JSON array of report rows
pub fn render_json(results: &[ProbeResult]) -> Result<String> {
    let rows: Vec<ReportRow> = results.iter().map(ReportRow::from).collect();
    Ok(serde_json::to_string_pretty(&rows)?)
}

pub fn save_json(results: &[ProbeResult], path: &Path) -> Result<()> {
    write_report(path, &render_json(results)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Endpoint, Enrichment, ResolvedAddress};
    use crate::probe::ProbeOutcome;
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    fn sample() -> Vec<ProbeResult> {
        let target = ResolvedAddress::new(
            Arc::new(Endpoint::new("TEST", "Test", "example.com")),
            "1.2.3.4".parse().unwrap(),
        );
        let ok = ProbeResult::measured(
            &target,
            &ProbeOutcome::Success {
                elapsed: Duration::from_micros(10_504),
            },
            Duration::from_millis(12),
        )
        .with_enrichment(Enrichment {
            country: Some("Japan".into()),
            region: Some("Tokyo".into()),
            city: Some("Tokyo".into()),
            cloud_region: Some("AWS ap-northeast-1 (Tokyo)".into()),
            reverse_dns: None,
        });
        let gone = ProbeResult::unresolved(&Endpoint::new("GONE", "Test", "nx.example"), "NXDOMAIN");
        vec![ok, gone]
    }

    #[test]
    fn test_row_keys_and_values() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&sample()).unwrap()).unwrap();
        let first = &json[0];

        assert_eq!(first["Constant"], "TEST");
        assert_eq!(first["IP"], "1.2.3.4");
        assert_eq!(first["Latency_ms"], serde_json::json!(10.5));
        assert_eq!(first["Status"], "COLO");
        assert_eq!(first["AWS_Region"], "AWS ap-northeast-1 (Tokyo)");
        assert_eq!(first["City"], "Tokyo");
        assert!(first["Error"].is_null());
    }

    #[test]
    fn test_sentinel_row_placeholders() {
        let json: serde_json::Value = serde_json::from_str(&render_json(&sample()).unwrap()).unwrap();
        let gone = &json[1];

        assert!(gone["IP"].is_null());
        assert!(gone["Latency_ms"].is_null());
        assert_eq!(gone["Status"], "FAIL");
        assert_eq!(gone["AWS_Region"], "No PTR");
        assert_eq!(gone["Country"], "Unknown");
        assert!(gone["Error"].as_str().unwrap().contains("NXDOMAIN"));
    }

    #[test]
    fn test_save_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("results/output.json");

        save_json(&sample(), &path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("TEST"));
        assert!(content.contains("example.com"));

        let rows: Vec<ReportRow> = serde_json::from_str(&content).unwrap();
        assert_eq!(rows.len(), 2);
    }
}
