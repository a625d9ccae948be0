//! Main application orchestration and execution

use crate::{
    catalog::EndpointCatalog,
    config::{display_config_summary, validate_config, EnvManager},
    dns::{AddressResolver, CatalogResolver, DnsResolver, ResolutionStats},
    enrich::{CloudRegionEnricher, EnrichmentPipeline, GeoEnricher},
    error::Result,
    executor::{ProbeSession, RunSummary},
    logging::{ErrorEventLogger, Logger, LoggerFactory, NetworkLogger},
    models::{Config, ProbeResult, ProbeTarget},
    output::{save_html, save_json, ConsoleReporter, ProgressBarObserver},
    probe::{Prober, TlsHandshakeProber},
};
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Everything a finished run produced
#[derive(Debug, Clone)]
pub struct RunReport {
    pub results: Vec<ProbeResult>,
    pub summary: RunSummary,
    pub resolution: ResolutionStats,
    pub elapsed: Duration,
}

/// Main application struct that coordinates all components
pub struct App {
    config: Config,
}

impl App {
    /// Create a new application instance from a validated configuration
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Run against the live network: system DNS, TLS handshakes and the
    /// enrichment hooks enabled in the configuration
    pub async fn run(&self) -> Result<RunReport> {
        let resolver = Arc::new(DnsResolver::system(self.config.dns_timeout()));
        let prober: Arc<dyn Prober> = Arc::new(TlsHandshakeProber::new(
            self.config.port,
            self.config.probe_timeout(),
        )?);
        let enrichment = self.build_enrichment(&resolver)?;

        self.run_with(resolver, prober, enrichment).await
    }

    fn build_enrichment(&self, resolver: &Arc<DnsResolver>) -> Result<EnrichmentPipeline> {
        let mut pipeline = EnrichmentPipeline::new(self.config.enrich_timeout());
        if self.config.enable_geo {
            pipeline.push(Arc::new(GeoEnricher::with_base_url(
                &self.config.geo_url,
                self.config.enrich_timeout(),
            )?));
        }
        if self.config.enable_cloud_region {
            pipeline.push(Arc::new(CloudRegionEnricher::new(Arc::clone(resolver))));
        }
        Ok(pipeline)
    }

    /// Run the full pipeline with the given resolver, prober and enrichment hooks
    pub async fn run_with<R: AddressResolver>(
        &self,
        resolver: R,
        prober: Arc<dyn Prober>,
        enrichment: EnrichmentPipeline,
    ) -> Result<RunReport> {
        let started = Instant::now();
        let config = &self.config;

        let factory = LoggerFactory::new(config.clone()).with_log_file(&config.log_file)?;
        let logger = factory.create_logger("APP");
        let network = factory.create_network_logger();
        let errors = factory.create_error_logger();

        logger
            .info(&format!("{} v{} starting", crate::PKG_NAME, crate::VERSION))
            .field("workers", config.workers)
            .field("threshold_ms", config.threshold_ms)
            .field("port", config.port)
            .log()
            .await;

        self.report_configuration(&logger).await?;

        let catalog = match EndpointCatalog::from_path(&config.url_file) {
            Ok(catalog) => catalog,
            Err(e) => {
                errors.log_error(&e, Some("Loading endpoint catalog"), None).await;
                return Err(e);
            }
        };
        logger
            .info(&format!(
                "Loaded {} endpoints in {} categories from {}",
                catalog.len(),
                catalog.categories().len(),
                config.url_file.display()
            ))
            .log()
            .await;
        for name in catalog.duplicates() {
            logger
                .warn(&format!("Duplicate endpoint {} ignored", name))
                .field("constant", name)
                .log()
                .await;
        }

        let operation = logger.start_operation("resolution").await;
        let resolution = CatalogResolver::new(resolver, config.workers)
            .expand(catalog.endpoints())
            .await;
        Self::log_resolutions(&network, &resolution.targets, &resolution.failures).await;
        logger.end_operation(&operation, resolution.stats.domains).await;

        let session = ProbeSession::new(config.run_configuration(), prober)
            .with_enrichment(enrichment)
            .with_observer(Arc::new(ProgressBarObserver::new(config.quiet)));

        // Enrichment runs inside the session, after the last handshake
        let operation = logger.start_operation("probing and enrichment").await;
        let results = match session.run(resolution.targets).await {
            Ok(results) => results,
            Err(e) => {
                errors
                    .log_error(&e, Some("Probing"), Some(operation.correlation_id()))
                    .await;
                return Err(e);
            }
        };
        logger.end_operation(&operation, results.len()).await;

        for result in &results {
            network.log_probe(result).await;
        }

        self.write_reports(&results, &errors).await?;

        let summary = RunSummary::from_results(&results);
        network.log_summary(&summary).await;

        Ok(RunReport {
            results,
            summary,
            resolution: resolution.stats,
            elapsed: started.elapsed(),
        })
    }

    async fn report_configuration(&self, logger: &Logger) -> Result<()> {
        let config = &self.config;
        let warnings = validate_config(config)?;

        if config.debug {
            eprintln!("\nConfiguration Summary:");
            eprintln!("{}\n", display_config_summary(config));
        }

        for warning in EnvManager::validate_current_env() {
            logger.warn(&warning).log().await;
        }

        if !warnings.is_empty() && !config.quiet {
            eprintln!("Configuration Warnings:");
            for warning in &warnings {
                eprintln!("  {}", warning.format(config.enable_color));
            }
        }
        for warning in &warnings {
            logger
                .info(&warning.message)
                .field("level", warning.level.as_str())
                .log()
                .await;
        }

        Ok(())
    }

    async fn log_resolutions(
        network: &NetworkLogger,
        targets: &[ProbeTarget],
        failures: &[(String, String)],
    ) {
        let mut resolved: BTreeMap<&str, Vec<IpAddr>> = BTreeMap::new();
        for target in targets {
            if let Some(address) = target.address() {
                let addresses = resolved.entry(target.endpoint().domain.as_str()).or_default();
                if !addresses.contains(&address) {
                    addresses.push(address);
                }
            }
        }

        for (domain, addresses) in &resolved {
            network.log_resolution(domain, Ok(addresses.as_slice())).await;
        }
        for (domain, reason) in failures {
            network.log_resolution(domain, Err(reason.as_str())).await;
        }
    }

    async fn write_reports(&self, results: &[ProbeResult], errors: &ErrorEventLogger) -> Result<()> {
        let config = &self.config;

        if let Err(e) = save_json(results, &config.output_json) {
            errors.log_error(&e, Some("Writing JSON report"), None).await;
            return Err(e);
        }
        if let Err(e) = save_html(results, config.threshold_ms, &config.output_html) {
            errors.log_error(&e, Some("Writing HTML report"), None).await;
            return Err(e);
        }
        Ok(())
    }

    /// Print the end-of-run output for `report`
    pub fn print_report(&self, report: &RunReport) {
        let console = ConsoleReporter::new(self.config.enable_color, self.config.verbose);

        if self.config.debug {
            for result in &report.results {
                println!("{}", console.render_result_line(result));
            }
        }

        console.print_summary(&report.summary, &self.config.output_json, &self.config.output_html);

        if self.config.verbose {
            let stats = &report.resolution;
            println!(
                "\nResolved {}/{} domains into {} addresses ({} unresolved endpoints) in {:.1}s",
                stats.resolved_domains,
                stats.domains,
                stats.addresses,
                stats.sentinels,
                report.elapsed.as_secs_f64()
            );
        }
    }
}
