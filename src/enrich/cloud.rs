//! Cloud placement detection from reverse DNS names
//!
//! AWS publishes PTR names that embed the region, e.g.
//! `ec2-13-230-0-1.ap-northeast-1.compute.amazonaws.com`. us-east-1 is the
//! exception and uses `compute-1.amazonaws.com`. CloudFront edges appear as
//! `server-1-2-3-4.nrt57.r.cloudfront.net`.

use super::Enricher;
use crate::dns::PtrLookup;
use crate::models::Enrichment;
use async_trait::async_trait;
use std::net::IpAddr;

const MAX_PTR_CHARS: usize = 50;

const AWS_REGION_CITIES: &[(&str, &str)] = &[
    ("us-east-1", "N. Virginia"),
    ("us-east-2", "Ohio"),
    ("us-west-1", "N. California"),
    ("us-west-2", "Oregon"),
    ("ca-central-1", "Montreal"),
    ("sa-east-1", "Sao Paulo"),
    ("eu-west-1", "Ireland"),
    ("eu-west-2", "London"),
    ("eu-west-3", "Paris"),
    ("eu-central-1", "Frankfurt"),
    ("eu-central-2", "Zurich"),
    ("eu-north-1", "Stockholm"),
    ("eu-south-1", "Milan"),
    ("me-south-1", "Bahrain"),
    ("me-central-1", "UAE"),
    ("af-south-1", "Cape Town"),
    ("ap-east-1", "Hong Kong"),
    ("ap-south-1", "Mumbai"),
    ("ap-northeast-1", "Tokyo"),
    ("ap-northeast-2", "Seoul"),
    ("ap-northeast-3", "Osaka"),
    ("ap-southeast-1", "Singapore"),
    ("ap-southeast-2", "Sydney"),
    ("ap-southeast-3", "Jakarta"),
];

/// Reverse-DNS based cloud region detection
pub struct CloudRegionEnricher<L> {
    lookup: L,
}

impl<L: PtrLookup> CloudRegionEnricher<L> {
    pub fn new(lookup: L) -> Self {
        Self { lookup }
    }
}

#[async_trait]
impl<L: PtrLookup> Enricher for CloudRegionEnricher<L> {
    fn name(&self) -> &'static str {
        "cloud-region"
    }

    async fn enrich(&self, address: IpAddr) -> Option<Enrichment> {
        let ptr = self.lookup.reverse(address).await?;
        let enrichment = classify_ptr(&ptr);
        (!enrichment.is_empty()).then_some(enrichment)
    }
}

/// Derive `reverse_dns` and, for known providers, `cloud_region` from a PTR name
pub fn classify_ptr(ptr: &str) -> Enrichment {
    let name = ptr.trim().trim_end_matches('.').to_ascii_lowercase();
    if name.is_empty() {
        return Enrichment::default();
    }

    Enrichment {
        cloud_region: cloud_region(&name),
        reverse_dns: Some(name.chars().take(MAX_PTR_CHARS).collect()),
        ..Default::default()
    }
}

fn cloud_region(name: &str) -> Option<String> {
    if name.ends_with(".amazonaws.com") {
        let region = if name.ends_with(".compute-1.amazonaws.com") {
            Some("us-east-1")
        } else {
            name.split('.').find(|label| is_region_code(label))
        }?;

        return Some(match region_city(region) {
            Some(city) => format!("AWS {} ({})", region, city),
            None => format!("AWS {}", region),
        });
    }

    if let Some(prefix) = name.strip_suffix(".r.cloudfront.net") {
        let pop = prefix.rsplit('.').next()?;
        let airport: String = pop.chars().take_while(char::is_ascii_alphabetic).collect();
        if airport.len() == 3 {
            return Some(format!("AWS CloudFront {}", airport.to_ascii_uppercase()));
        }
    }

    None
}

/// `xx-name-N` or `xx-gov-name-N`
fn is_region_code(label: &str) -> bool {
    let parts: Vec<&str> = label.split('-').collect();
    let (geo, number) = match parts.as_slice() {
        [geo, name, number] if is_word(name) => (geo, number),
        [geo, "gov", name, number] if is_word(name) => (geo, number),
        _ => return false,
    };

    geo.len() == 2 && is_word(geo) && !number.is_empty() && number.chars().all(|c| c.is_ascii_digit())
}

fn is_word(part: &str) -> bool {
    !part.is_empty() && part.chars().all(|c| c.is_ascii_lowercase())
}

fn region_city(region: &str) -> Option<&'static str> {
    AWS_REGION_CITIES
        .iter()
        .find(|(code, _)| *code == region)
        .map(|(_, city)| *city)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct StaticPtr(HashMap<IpAddr, String>);

    #[async_trait]
    impl PtrLookup for StaticPtr {
        async fn reverse(&self, address: IpAddr) -> Option<String> {
            self.0.get(&address).cloned()
        }
    }

    #[test]
    fn test_tokyo_ec2_name() {
        let enrichment = classify_ptr("ec2-13-230-0-1.ap-northeast-1.compute.amazonaws.com.");
        assert_eq!(enrichment.cloud_region.as_deref(), Some("AWS ap-northeast-1 (Tokyo)"));
        assert_eq!(
            enrichment.reverse_dns.as_deref(),
            Some("ec2-13-230-0-1.ap-northeast-1.compute.amazonaws.co")
        );
    }

    #[test]
    fn test_us_east_1_legacy_name() {
        let enrichment = classify_ptr("ec2-3-80-0-1.compute-1.amazonaws.com");
        assert_eq!(enrichment.cloud_region.as_deref(), Some("AWS us-east-1 (N. Virginia)"));
    }

    #[test]
    fn test_unknown_region_has_no_city() {
        let enrichment = classify_ptr("ec2-1-2-3-4.xx-example-9.compute.amazonaws.com");
        assert_eq!(enrichment.cloud_region.as_deref(), Some("AWS xx-example-9"));
    }

    #[test]
    fn test_cloudfront_edge() {
        let enrichment = classify_ptr("server-18-65-0-1.nrt57.r.cloudfront.net");
        assert_eq!(enrichment.cloud_region.as_deref(), Some("AWS CloudFront NRT"));
    }

    #[test]
    fn test_non_cloud_name_keeps_ptr_only() {
        let enrichment = classify_ptr("Host-1.Example.NET.");
        assert_eq!(enrichment.cloud_region, None);
        assert_eq!(enrichment.reverse_dns.as_deref(), Some("host-1.example.net"));
    }

    #[test]
    fn test_blank_ptr_is_empty() {
        assert!(classify_ptr("  .").is_empty());
    }

    #[test]
    fn test_region_code_shapes() {
        assert!(is_region_code("ap-northeast-1"));
        assert!(is_region_code("us-gov-west-1"));
        assert!(!is_region_code("compute"));
        assert!(!is_region_code("ec2-13-230-0-1"));
    }

    #[tokio::test]
    async fn test_enricher_uses_lookup() {
        let known: IpAddr = "13.230.0.1".parse().unwrap();
        let unknown: IpAddr = "10.0.0.1".parse().unwrap();
        let lookup = StaticPtr(HashMap::from([(
            known,
            "ec2-13-230-0-1.ap-northeast-1.compute.amazonaws.com".to_string(),
        )]));
        let enricher = CloudRegionEnricher::new(lookup);

        let enrichment = enricher.enrich(known).await.unwrap();
        assert_eq!(enrichment.cloud_region.as_deref(), Some("AWS ap-northeast-1 (Tokyo)"));
        assert!(enricher.enrich(unknown).await.is_none());
    }
}
