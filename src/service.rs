//! The rate service: cache, fallback chain and conversions.
//!
//! A rates request is answered from the cache when possible. Otherwise the
//! tiers are tried one after another (bank page, alternate feed, backup feed,
//! bundled data), each gated by the reachability probe and the request budget.
//! The first tier that produces quotes wins; its table is marked up, cached
//! for a tier-dependent lifetime and returned with its provenance.

use crate::core::budget::RequestBudget;
use crate::core::cache::{CachedRates, RateCache};
use crate::core::config::{FetchOptions, SourcesConfig};
use crate::core::convert::{ConversionResult, quote_conversion};
use crate::core::error::RateError;
use crate::core::markup::apply_markup;
use crate::core::quote::{Provenance, QuoteTable, RatesPayload};
use crate::providers::bangkok_bank::{page_request, parse_rates};
use crate::providers::exchange_api::FeedSource;
use crate::providers::fallback::static_rates;
use crate::providers::{
    DirectTransport, FetchRequest, ProxyTransport, ReachabilityProbe, TcpProbe, Transport,
};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

#[derive(Debug)]
enum FetchState {
    CacheHit,
    TryPrimary,
    TryAlternate,
    TryBackup,
    UseStatic,
    Done(QuoteTable, Provenance),
}

pub struct RateService {
    sources: SourcesConfig,
    alternate: FeedSource,
    backup: FeedSource,
    transport: Arc<dyn Transport>,
    probe: Arc<dyn ReachabilityProbe>,
    cache: RateCache,
    budget: RequestBudget,
    // Held for the whole cache-check-then-fetch sequence so concurrent callers
    // never start duplicate fetches.
    fetch_lock: Mutex<()>,
}

impl RateService {
    /// Builds a service with the network transport and probe the config asks for.
    pub fn new(sources: SourcesConfig) -> anyhow::Result<Self> {
        let transport: Arc<dyn Transport> = match &sources.proxy_url {
            Some(proxy_url) => {
                debug!(proxy = %proxy_url, "Using proxied transport");
                Arc::new(ProxyTransport::new(proxy_url)?)
            }
            None => Arc::new(DirectTransport::new()?),
        };
        let probe = Arc::new(TcpProbe::new(sources.probe_timeout()));
        Ok(Self::with_components(sources, transport, probe))
    }

    pub fn with_components(
        sources: SourcesConfig,
        transport: Arc<dyn Transport>,
        probe: Arc<dyn ReachabilityProbe>,
    ) -> Self {
        Self {
            alternate: FeedSource::new("alternative", sources.alternate.clone()),
            backup: FeedSource::new("backup", sources.backup.clone()),
            sources,
            transport,
            probe,
            cache: RateCache::new(),
            budget: RequestBudget::default(),
            fetch_lock: Mutex::new(()),
        }
    }

    pub fn with_budget(mut self, budget: RequestBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn budget(&self) -> &RequestBudget {
        &self.budget
    }

    /// Returns rates from the cache or the first tier that yields any.
    ///
    /// Never fails: tier errors are logged and the chain ends at the bundled
    /// data. Degraded sources show up in the payload's provenance.
    #[instrument(name = "FetchRates", skip(self))]
    pub async fn fetch_rates(&self, options: &FetchOptions) -> RatesPayload {
        let _guard = self.fetch_lock.lock().await;

        let mut state = FetchState::CacheHit;
        loop {
            state = match state {
                FetchState::CacheHit => match self.cache.get().await {
                    Some(cached) => return cached.into_payload(),
                    None => FetchState::TryPrimary,
                },
                FetchState::TryPrimary => match self.fetch_primary().await {
                    Ok(rates) => FetchState::Done(rates, Provenance::Primary),
                    Err(e) => {
                        warn!(tier = %Provenance::Primary, error = %e, "Rate source failed, trying next");
                        FetchState::TryAlternate
                    }
                },
                FetchState::TryAlternate => match self.fetch_feed(&self.alternate).await {
                    Ok(rates) => FetchState::Done(rates, Provenance::Alternate),
                    Err(e) => {
                        warn!(tier = %Provenance::Alternate, error = %e, "Rate source failed, trying next");
                        FetchState::TryBackup
                    }
                },
                FetchState::TryBackup => match self.fetch_feed(&self.backup).await {
                    Ok(rates) => FetchState::Done(rates, Provenance::Backup),
                    Err(e) => {
                        warn!(tier = %Provenance::Backup, error = %e, "Rate source failed, using bundled rates");
                        FetchState::UseStatic
                    }
                },
                FetchState::UseStatic => FetchState::Done(static_rates(), Provenance::Fallback),
                FetchState::Done(rates, provenance) => {
                    return self.commit(rates, provenance, options).await;
                }
            };
        }
    }

    /// Drops the cached table so the next request walks the chain again.
    pub async fn invalidate(&self) {
        self.cache.clear().await;
    }

    /// Invalidates, then fetches.
    pub async fn refresh(&self, options: &FetchOptions) -> RatesPayload {
        info!("Refreshing exchange rates");
        self.invalidate().await;
        self.fetch_rates(options).await
    }

    /// Converts `amount` between two codes using the current rates. The base
    /// unit is always accepted.
    pub async fn convert(
        &self,
        amount: f64,
        from: &str,
        to: &str,
        options: &FetchOptions,
    ) -> Result<ConversionResult, RateError> {
        let payload = self.fetch_rates(options).await;
        let rates = payload.rates.with_base_unit();
        quote_conversion(amount, from, to, &rates, &payload.last_updated)
    }

    async fn commit(
        &self,
        rates: QuoteTable,
        provenance: Provenance,
        options: &FetchOptions,
    ) -> RatesPayload {
        let rates = apply_markup(rates, options.markup_percentage);
        let cached = CachedRates::new(rates, provenance);
        self.cache
            .put(cached.clone(), provenance.ttl(options.cache_duration))
            .await;
        info!(
            %provenance,
            currencies = cached.rates.len(),
            "Exchange rates updated"
        );
        cached.into_payload()
    }

    /// Probe, then spend budget, then fetch. Any non-2xx or blank body fails.
    async fn fetch_body(&self, request: FetchRequest) -> Result<String, RateError> {
        if !self.probe.is_reachable(&request.url).await {
            return Err(RateError::HostUnreachable(request.url));
        }
        self.budget.try_acquire()?;
        self.transport.fetch(&request).await?.into_body()
    }

    async fn fetch_primary(&self) -> Result<QuoteTable, RateError> {
        let request = page_request(&self.sources.primary, self.sources.verify_tls);
        let body = self.fetch_body(request).await?;
        let rates = parse_rates(&body);
        if rates.is_empty() {
            return Err(RateError::ParseFailure(
                "no rate table or embedded rates in page".to_string(),
            ));
        }
        Ok(rates)
    }

    async fn fetch_feed(&self, feed: &FeedSource) -> Result<QuoteTable, RateError> {
        let body = self.fetch_body(feed.request(self.sources.verify_tls)).await?;
        let rates = feed.adapt(&body)?;
        if rates.is_empty() {
            return Err(RateError::ParseFailure(format!(
                "{} API listed none of the supported currencies",
                feed.label
            )));
        }
        Ok(rates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SourceConfig;
    use crate::providers::FetchResponse;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    const BANK_URL: &str = "https://bank.test/rates";
    const ALT_URL: &str = "https://alt.test/v4/latest/THB";
    const BACKUP_URL: &str = "https://backup.test/v6/latest/THB";

    const BANK_PAGE: &str = r#"<table class="table-rate">
        <tr><th>Currency</th><th>Sight</th><th>Transfer</th><th>Selling</th><th>Average</th></tr>
        <tr><td><div class="currency-code">USD</div><div class="currency-name">US Dollar</div></td>
            <td>33.00</td><td>33.50</td><td>34.00</td><td>33.75</td></tr>
        <tr><td><div class="currency-code">EUR</div><div class="currency-name">Euro</div></td>
            <td>36.00</td><td>36.50</td><td>37.00</td><td>36.75</td></tr>
    </table>"#;

    const FEED: &str = r#"{"rates": {"USD": 0.03, "EUR": 0.025, "HKD": 0.22}}"#;

    struct FakeTransport {
        responses: HashMap<String, Result<FetchResponse, RateError>>,
        calls: std::sync::Mutex<Vec<String>>,
    }

    impl FakeTransport {
        fn new() -> Self {
            Self {
                responses: HashMap::new(),
                calls: std::sync::Mutex::new(Vec::new()),
            }
        }

        fn respond(mut self, url: &str, status: u16, body: &str) -> Self {
            self.responses.insert(
                url.to_string(),
                Ok(FetchResponse {
                    status,
                    body: body.to_string(),
                }),
            );
            self
        }

        fn fail(mut self, url: &str, error: RateError) -> Self {
            self.responses.insert(url.to_string(), Err(error));
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse, RateError> {
            self.calls.lock().unwrap().push(request.url.clone());
            self.responses
                .get(&request.url)
                .cloned()
                .unwrap_or_else(|| Err(RateError::Transport("connection refused".into())))
        }
    }

    #[derive(Default)]
    struct FakeProbe {
        unreachable: HashSet<String>,
    }

    impl FakeProbe {
        fn down(urls: &[&str]) -> Self {
            Self {
                unreachable: urls.iter().map(|u| u.to_string()).collect(),
            }
        }
    }

    #[async_trait]
    impl ReachabilityProbe for FakeProbe {
        async fn is_reachable(&self, url: &str) -> bool {
            !self.unreachable.contains(url)
        }
    }

    fn sources() -> SourcesConfig {
        SourcesConfig {
            primary: SourceConfig::new(BANK_URL, 30),
            alternate: SourceConfig::new(ALT_URL, 10),
            backup: SourceConfig::new(BACKUP_URL, 10),
            ..SourcesConfig::default()
        }
    }

    fn service(transport: FakeTransport, probe: FakeProbe) -> (RateService, Arc<FakeTransport>) {
        let transport = Arc::new(transport);
        let service =
            RateService::with_components(sources(), transport.clone(), Arc::new(probe));
        (service, transport)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[tokio::test]
    async fn test_primary_success_is_marked_up_and_untagged() {
        let (service, transport) = service(
            FakeTransport::new().respond(BANK_URL, 200, BANK_PAGE),
            FakeProbe::default(),
        );

        let payload = service.fetch_rates(&FetchOptions::default()).await;

        assert_eq!(payload.provenance, Provenance::Primary);
        assert!(!payload.last_updated.contains('('));
        assert_eq!(payload.rates.len(), 2);
        let usd = payload.rates.get("USD").unwrap();
        assert!(close(usd.selling, 34.0 * 1.03));
        assert!(close(usd.buying_transfer, 33.5 / 1.03));
        assert_eq!(usd.original_selling, Some(34.0));
        assert_eq!(transport.calls(), vec![BANK_URL]);
    }

    #[tokio::test]
    async fn test_unreachable_primary_falls_to_alternate() {
        let (service, transport) = service(
            FakeTransport::new().respond(ALT_URL, 200, FEED),
            FakeProbe::down(&[BANK_URL]),
        );

        let payload = service.fetch_rates(&FetchOptions::default()).await;

        assert_eq!(payload.provenance, Provenance::Alternate);
        assert!(payload.last_updated.ends_with(" (Alternative Source)"));
        assert_eq!(payload.rates.len(), 3);
        // The probe failure means the bank was never fetched
        assert_eq!(transport.calls(), vec![ALT_URL]);
    }

    #[tokio::test]
    async fn test_failures_cascade_to_backup() {
        let (service, transport) = service(
            FakeTransport::new()
                .respond(BANK_URL, 503, "maintenance")
                .respond(ALT_URL, 200, r#"{"error": "quota"}"#)
                .respond(BACKUP_URL, 200, FEED),
            FakeProbe::default(),
        );

        let payload = service.fetch_rates(&FetchOptions::default()).await;

        assert_eq!(payload.provenance, Provenance::Backup);
        assert!(payload.last_updated.ends_with(" (Backup Source)"));
        assert_eq!(transport.calls(), vec![BANK_URL, ALT_URL, BACKUP_URL]);
    }

    #[tokio::test]
    async fn test_unparsable_primary_and_empty_bodies_fall_through() {
        let (service, _) = service(
            FakeTransport::new()
                .respond(BANK_URL, 200, "<html><body>Redesigned page</body></html>")
                .respond(ALT_URL, 200, "   ")
                .respond(BACKUP_URL, 200, r#"{"rates": {"XAU": 0.00001}}"#),
            FakeProbe::default(),
        );

        let payload = service.fetch_rates(&FetchOptions::default()).await;
        assert_eq!(payload.provenance, Provenance::Fallback);
    }

    #[tokio::test]
    async fn test_everything_down_serves_static_data() {
        let (service, transport) = service(
            FakeTransport::new(),
            FakeProbe::down(&[BANK_URL, ALT_URL, BACKUP_URL]),
        );

        let payload = service.fetch_rates(&FetchOptions::default()).await;

        assert_eq!(payload.provenance, Provenance::Fallback);
        assert!(payload.last_updated.ends_with(" (Fallback Data)"));
        for code in ["USD", "EUR", "GBP", "JPY", "CNY", "AUD", "SGD"] {
            let quote = payload.rates.get(code).unwrap();
            assert!(quote.selling > quote.buying_transfer, "{code}");
            assert!(close(
                quote.average,
                (quote.buying_transfer + quote.selling) / 2.0
            ));
        }
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_transport_errors_are_absorbed() {
        let (service, _) = service(
            FakeTransport::new()
                .fail(BANK_URL, RateError::Transport("timed out".into()))
                .fail(ALT_URL, RateError::Transport("timed out".into()))
                .fail(BACKUP_URL, RateError::Transport("timed out".into())),
            FakeProbe::default(),
        );

        let payload = service.fetch_rates(&FetchOptions::default()).await;
        assert_eq!(payload.provenance, Provenance::Fallback);
    }

    #[tokio::test]
    async fn test_second_request_is_served_from_cache() {
        let (service, transport) = service(
            FakeTransport::new().respond(BANK_URL, 200, BANK_PAGE),
            FakeProbe::default(),
        );

        let first = service.fetch_rates(&FetchOptions::default()).await;
        let second = service.fetch_rates(&FetchOptions::default()).await;

        assert_eq!(first.rates, second.rates);
        assert_eq!(first.last_updated, second.last_updated);
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_refetches() {
        let (service, transport) = service(
            FakeTransport::new().respond(BANK_URL, 200, BANK_PAGE),
            FakeProbe::default(),
        );

        service.fetch_rates(&FetchOptions::default()).await;
        let payload = service.refresh(&FetchOptions::default()).await;

        assert_eq!(payload.provenance, Provenance::Primary);
        assert_eq!(transport.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_budget_is_spent_per_attempt() {
        let (service, transport) = service(FakeTransport::new(), FakeProbe::default());
        let options = FetchOptions::default();

        // Three failed attempts per chain
        service.fetch_rates(&options).await;
        assert_eq!(service.budget().remaining(), 2);

        service.invalidate().await;
        let payload = service.fetch_rates(&options).await;

        // The sixth attempt (backup, second chain) was refused before fetching
        assert_eq!(transport.calls().len(), 5);
        assert_eq!(payload.provenance, Provenance::Fallback);
    }

    #[tokio::test]
    async fn test_exhausted_budget_skips_to_static_data() {
        let (service, transport) = service(
            FakeTransport::new().respond(BANK_URL, 200, BANK_PAGE),
            FakeProbe::default(),
        );
        let budget = RequestBudget::new(1, Duration::from_secs(60));
        budget.try_acquire().unwrap();
        let service = service.with_budget(budget);

        let payload = service.fetch_rates(&FetchOptions::default()).await;

        assert_eq!(payload.provenance, Provenance::Fallback);
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn test_concurrent_requests_fetch_once() {
        let (service, transport) = service(
            FakeTransport::new().respond(BANK_URL, 200, BANK_PAGE),
            FakeProbe::default(),
        );
        let service = Arc::new(service);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = Arc::clone(&service);
                tokio::spawn(async move { service.fetch_rates(&FetchOptions::default()).await })
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.await.unwrap().provenance, Provenance::Primary);
        }

        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn test_convert_with_static_data() {
        let (service, _) = service(
            FakeTransport::new(),
            FakeProbe::down(&[BANK_URL, ALT_URL, BACKUP_URL]),
        );
        let options = FetchOptions::new(3.0, 3600);

        let result = service.convert(100.0, "USD", "EUR", &options).await.unwrap();

        let expected = 100.0 * (34.76 * 1.03) / (36.68 / 1.03);
        assert!(close(result.converted_amount, expected));
        assert!(close(result.rate_info.rate, result.converted_amount / 100.0));
        assert!(result.last_updated.ends_with(" (Fallback Data)"));
        assert_eq!(result.from_currency, "USD");
        assert_eq!(result.to_currency, "EUR");
    }

    #[tokio::test]
    async fn test_convert_accepts_base_unit() {
        let (service, _) = service(
            FakeTransport::new(),
            FakeProbe::down(&[BANK_URL, ALT_URL, BACKUP_URL]),
        );
        let result = service
            .convert(250.0, "THB", "THB", &FetchOptions::default())
            .await
            .unwrap();
        assert!(close(result.converted_amount, 250.0));
    }

    #[tokio::test]
    async fn test_convert_unknown_currency_fails() {
        let (service, _) = service(
            FakeTransport::new().respond(BANK_URL, 200, BANK_PAGE),
            FakeProbe::default(),
        );

        let result = service
            .convert(100.0, "ZZZ", "THB", &FetchOptions::default())
            .await;
        assert_eq!(result, Err(RateError::InvalidCurrency("ZZZ".into())));
    }

    #[tokio::test]
    async fn test_markup_comes_from_options() {
        let (service, _) = service(
            FakeTransport::new().respond(BANK_URL, 200, BANK_PAGE),
            FakeProbe::default(),
        );

        let payload = service.fetch_rates(&FetchOptions::new(10.0, 600)).await;
        let eur = payload.rates.get("EUR").unwrap();
        assert!(close(eur.selling, 37.0 * 1.1));
        assert!(close(eur.buying_sight, 36.0 / 1.1));
    }
}
