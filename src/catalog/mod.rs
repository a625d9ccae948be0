//! Endpoint catalog parsing
//!
//! The catalog is a flat text file of category headers and URL constants:
//!
//! ```text
//! # Spot
//! SPOT_REST_URL = "https://api.binance.com/api"
//! SPOT_WS_URL = "wss://stream.binance.com:9443/ws"
//! ```
//!
//! A `#` line sets the category for the assignments below it. Assignments
//! whose URL uses `http`, `https`, `ws` or `wss` yield one endpoint each;
//! every other line is ignored.

use crate::error::{AppError, Result};
use crate::models::Endpoint;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

const UNKNOWN_CATEGORY: &str = "Unknown";
const ASSIGNMENT_PATTERN: &str = r#"(\w+)\s*=\s*"(?:https?|wss?)://([^"/:?#\s]+)"#;

/// Parsed, deduplicated endpoint list in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EndpointCatalog {
    endpoints: Vec<Endpoint>,
    duplicates: Vec<String>,
}

impl EndpointCatalog {
    /// Parse a catalog file
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(AppError::config(format!("URL file not found: {}", path.display())));
        }

        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::config(format!("Failed to read URL file {}: {}", path.display(), e)))?;

        CatalogParser::new()?.parse(&content)
    }

    /// Parse catalog text
    pub fn parse_str(content: &str) -> Result<Self> {
        CatalogParser::new()?.parse(content)
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn into_endpoints(self) -> Vec<Endpoint> {
        self.endpoints
    }

    /// Names dropped because an earlier line already defined them
    pub fn duplicates(&self) -> &[String] {
        &self.duplicates
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Distinct categories in order of first appearance
    pub fn categories(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for endpoint in &self.endpoints {
            if !seen.contains(&endpoint.category.as_str()) {
                seen.push(endpoint.category.as_str());
            }
        }
        seen
    }
}

/// Line-oriented catalog parser
pub struct CatalogParser {
    assignment: Regex,
}

impl CatalogParser {
    pub fn new() -> Result<Self> {
        let assignment = Regex::new(ASSIGNMENT_PATTERN)
            .map_err(|e| AppError::internal(format!("Invalid catalog pattern: {}", e)))?;
        Ok(Self { assignment })
    }

    pub fn parse(&self, content: &str) -> Result<EndpointCatalog> {
        let mut catalog = EndpointCatalog::default();
        let mut seen = HashSet::new();
        let mut category: Option<String> = None;

        for line in content.lines() {
            let line = line.trim();

            if let Some(header) = line.strip_prefix('#') {
                category = Some(header.trim().to_string());
                continue;
            }

            let Some(captures) = self.assignment.captures(line) else {
                continue;
            };

            let name = &captures[1];
            let domain = captures[2].trim_end_matches('.').to_ascii_lowercase();
            if domain.is_empty() {
                continue;
            }

            if !seen.insert(name.to_string()) {
                catalog.duplicates.push(name.to_string());
                continue;
            }

            let category = match category.as_deref() {
                Some(header) if !header.is_empty() => header,
                _ => UNKNOWN_CATEGORY,
            };
            catalog.endpoints.push(Endpoint::new(name, category, domain));
        }

        Ok(catalog)
    }
}
