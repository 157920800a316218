//! The geocode pipeline: cache, provider fallback chain, batch
//! fan-out.
//!
//! A request walks at most one pass over the provider order — the
//! caller-requested provider if any, else the default, followed by the
//! fallback chain — and stops at the first success. Successful results
//! from cacheable providers are written through to the geocode cache;
//! a HOUSE-quality cache hit skips the chain entirely.

use std::sync::Arc;

use district_map_address as address_parser;
use district_map_geocache::GeoCache;
use district_map_models::{
    Address, GeocodeQuality, GeocodeRequest, GeocodeResult, ResultStatus,
};
use district_map_provider::{GeocodeService, ProviderRegistry};

use crate::parallel::ordered_fan_out;

/// Source tag reported for cache hits.
pub const CACHE_SOURCE: &str = "geocache";

/// Default batch fan-out width.
pub const DEFAULT_THREADS: usize = 3;

/// The geocode pipeline.
pub struct GeocodeServiceProvider {
    registry: Arc<ProviderRegistry<dyn GeocodeService>>,
    cache: Option<Arc<GeoCache>>,
    threads: usize,
}

impl GeocodeServiceProvider {
    #[must_use]
    pub const fn new(
        registry: Arc<ProviderRegistry<dyn GeocodeService>>,
        cache: Option<Arc<GeoCache>>,
        threads: usize,
    ) -> Self {
        Self {
            registry,
            cache,
            threads,
        }
    }

    /// Geocodes one request through the cache and the provider chain.
    pub async fn geocode(&self, request: &GeocodeRequest) -> GeocodeResult {
        if request.reverse {
            return self.reverse_geocode(request).await;
        }

        let Some(address) = request.address.as_ref().filter(|a| !a.is_empty()) else {
            return GeocodeResult::new(CACHE_SOURCE, ResultStatus::MissingAddress);
        };

        if request.use_cache {
            if let Some(hit) = self.cache_hit(address) {
                return hit;
            }
        }

        let Some(order) = self.provider_order(request) else {
            return GeocodeResult::new(CACHE_SOURCE, ResultStatus::ProviderNotSupported);
        };

        let mut last: Option<GeocodeResult> = None;
        for name in order {
            let Some(provider) = self.registry.new_instance(Some(name.as_str())) else {
                continue;
            };
            let result = provider.geocode(address).await;
            if result.is_success() {
                if request.use_cache && self.registry.is_cacheable(&name) {
                    if let (Some(cache), Some(geocoded)) = (&self.cache, &result.geocoded_address) {
                        cache.put(geocoded);
                    }
                }
                return result;
            }
            log::warn!("Geocode provider {name} failed with {:?}", result.status);
            // Keep the most recent result, but never let an empty one
            // displace an earlier result that still carries data.
            if !result.is_empty() || last.as_ref().map_or(true, GeocodeResult::is_empty) {
                last = Some(result);
            }
        }

        last.unwrap_or_else(|| GeocodeResult::new(CACHE_SOURCE, ResultStatus::NoGeocodeResult))
    }

    /// Reverse-geocodes a point through the provider chain.
    async fn reverse_geocode(&self, request: &GeocodeRequest) -> GeocodeResult {
        let Some(point) = request.point else {
            return GeocodeResult::new(CACHE_SOURCE, ResultStatus::MissingPoint);
        };
        let Some(order) = self.provider_order(request) else {
            return GeocodeResult::new(CACHE_SOURCE, ResultStatus::ProviderNotSupported);
        };

        let mut last: Option<GeocodeResult> = None;
        for name in order {
            let Some(provider) = self.registry.new_instance(Some(name.as_str())) else {
                continue;
            };
            let result = provider.reverse_geocode(point).await;
            if result.is_success() {
                return result;
            }
            log::warn!("Reverse geocode provider {name} failed with {:?}", result.status);
            last = Some(result);
        }
        last.unwrap_or_else(|| {
            GeocodeResult::new(CACHE_SOURCE, ResultStatus::NoReverseGeocodeResult)
        })
    }

    /// Geocodes a batch with bounded fan-out, results in input order.
    pub async fn geocode_batch(
        &self,
        addresses: &[Address],
        provider: Option<&str>,
    ) -> Vec<GeocodeResult> {
        let requests: Vec<GeocodeRequest> = addresses
            .iter()
            .map(|address| {
                let mut request = GeocodeRequest::for_address(address.clone());
                request.provider = provider.map(ToString::to_string);
                request
            })
            .collect();

        ordered_fan_out(requests, self.threads, |request| async move {
            self.geocode(&request).await
        })
        .await
    }

    /// The provider names to try, in order, each at most once.
    ///
    /// `None` means the caller named a provider that is not
    /// registered, which is a hard error rather than a fallback case.
    fn provider_order(&self, request: &GeocodeRequest) -> Option<Vec<String>> {
        let mut order: Vec<String> = Vec::new();

        if let Some(name) = request.provider.as_ref().filter(|name| !name.is_empty()) {
            if !self.registry.is_registered(name) {
                log::warn!("Unsupported geocode provider requested: {name}");
                return None;
            }
            order.push(name.to_lowercase());
        }

        if order.is_empty() || request.use_fallback {
            if let Some(default) = self.registry.default_name() {
                if !order.contains(&default.to_string()) {
                    order.push(default.to_string());
                }
            }
            for name in self.registry.fallback_chain() {
                if !order.contains(name) {
                    order.push(name.clone());
                }
            }
        }
        Some(order)
    }

    fn cache_hit(&self, address: &Address) -> Option<GeocodeResult> {
        let cache = self.cache.as_ref()?;
        let sa = address_parser::parse(address);
        match cache.lookup(&sa) {
            Ok(Some(hit)) if hit.geocode.quality >= GeocodeQuality::House => {
                log::debug!("Geocode cache hit for {address}");
                Some(GeocodeResult::success(
                    CACHE_SOURCE,
                    hit.to_geocoded_address(),
                ))
            }
            Ok(_) => None,
            Err(e) => {
                log::warn!("Geocode cache lookup failed: {e}");
                None
            }
        }
    }

    /// Flushes any buffered cache writes.
    pub fn flush_cache(&self) {
        if let Some(cache) = &self.cache {
            cache.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use district_map_database::{geocache_db, shared};
    use district_map_models::{Geocode, GeocodedAddress, Point};

    /// Scripted provider: fails `failures` times worth of names before
    /// this one succeeds, tracked through a shared call counter.
    struct Scripted {
        name: &'static str,
        succeed: bool,
        quality: GeocodeQuality,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl GeocodeService for Scripted {
        async fn geocode(&self, address: &Address) -> GeocodeResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.succeed {
                GeocodeResult::success(
                    self.name,
                    GeocodedAddress::new(
                        Some(address.clone()),
                        Some(Geocode::new(42.65, -73.76, self.quality, self.name)),
                    ),
                )
            } else {
                GeocodeResult::new(self.name, ResultStatus::ResponseMissingError)
            }
        }

        async fn reverse_geocode(&self, _point: Point) -> GeocodeResult {
            GeocodeResult::new(self.name, ResultStatus::NoReverseGeocodeResult)
        }
    }

    struct Fixture {
        pipeline: GeocodeServiceProvider,
        yahoo_calls: Arc<AtomicUsize>,
        tiger_calls: Arc<AtomicUsize>,
    }

    fn fixture(yahoo_succeeds: bool, cacheable: &[&str]) -> Fixture {
        let yahoo_calls = Arc::new(AtomicUsize::new(0));
        let tiger_calls = Arc::new(AtomicUsize::new(0));

        let mut registry: ProviderRegistry<dyn GeocodeService> = ProviderRegistry::new();
        let calls = Arc::clone(&yahoo_calls);
        registry.register_default("yahoo", move || {
            Box::new(Scripted {
                name: "yahoo",
                succeed: yahoo_succeeds,
                quality: GeocodeQuality::House,
                calls: Arc::clone(&calls),
            })
        });
        let calls = Arc::clone(&tiger_calls);
        registry.register("tiger", move || {
            Box::new(Scripted {
                name: "tiger",
                succeed: true,
                quality: GeocodeQuality::House,
                calls: Arc::clone(&calls),
            })
        });
        registry.set_fallback_chain(&["tiger".to_string()]);
        for name in cacheable {
            registry.mark_cacheable(name);
        }

        let cache = Arc::new(GeoCache::new(
            shared(geocache_db::open_in_memory().unwrap()),
            100,
        ));
        Fixture {
            pipeline: GeocodeServiceProvider::new(Arc::new(registry), Some(cache), 3),
            yahoo_calls,
            tiger_calls,
        }
    }

    fn albany() -> Address {
        Address::new("200 State St", "", "Albany", "NY", "12210", "")
    }

    #[tokio::test]
    async fn falls_back_to_the_next_provider() {
        let fixture = fixture(false, &["tiger"]);
        let result = fixture
            .pipeline
            .geocode(&GeocodeRequest::for_address(albany()))
            .await;

        assert!(result.is_success());
        assert_eq!(result.source, "tiger");
        assert_eq!(
            result.geocoded_address.unwrap().geocode.unwrap().method,
            "tiger"
        );
        assert_eq!(fixture.yahoo_calls.load(Ordering::SeqCst), 1);
        assert_eq!(fixture.tiger_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn first_success_stops_the_chain() {
        let fixture = fixture(true, &[]);
        let result = fixture
            .pipeline
            .geocode(&GeocodeRequest::for_address(albany()))
            .await;

        assert_eq!(result.source, "yahoo");
        assert_eq!(fixture.tiger_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn cacheable_success_is_served_from_cache_next_time() {
        let fixture = fixture(true, &["yahoo"]);
        let request = GeocodeRequest::for_address(albany());

        fixture.pipeline.geocode(&request).await;
        fixture.pipeline.flush_cache();

        let result = fixture.pipeline.geocode(&request).await;
        assert_eq!(result.source, CACHE_SOURCE);
        let geocode = result.geocoded_address.unwrap().geocode.unwrap();
        assert!(geocode.cached);
        // The provider was not called a second time.
        assert_eq!(fixture.yahoo_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn non_cacheable_success_is_not_cached() {
        let fixture = fixture(true, &[]);
        let request = GeocodeRequest::for_address(albany());

        fixture.pipeline.geocode(&request).await;
        fixture.pipeline.flush_cache();
        fixture.pipeline.geocode(&request).await;

        assert_eq!(fixture.yahoo_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_requested_provider_is_rejected() {
        let fixture = fixture(true, &[]);
        let mut request = GeocodeRequest::for_address(albany());
        request.provider = Some("google".to_string());

        let result = fixture.pipeline.geocode(&request).await;
        assert_eq!(result.status, ResultStatus::ProviderNotSupported);
        assert_eq!(fixture.yahoo_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn total_failure_reports_the_last_attempt() {
        let yahoo_calls = Arc::new(AtomicUsize::new(0));
        let mut registry: ProviderRegistry<dyn GeocodeService> = ProviderRegistry::new();
        let calls = Arc::clone(&yahoo_calls);
        registry.register_default("yahoo", move || {
            Box::new(Scripted {
                name: "yahoo",
                succeed: false,
                quality: GeocodeQuality::House,
                calls: Arc::clone(&calls),
            })
        });

        let pipeline = GeocodeServiceProvider::new(Arc::new(registry), None, 3);
        let result = pipeline.geocode(&GeocodeRequest::for_address(albany())).await;
        assert_eq!(result.status, ResultStatus::ResponseMissingError);
        assert_eq!(result.source, "yahoo");
    }

    #[tokio::test]
    async fn empty_address_is_rejected_before_any_provider() {
        let fixture = fixture(true, &[]);
        let result = fixture
            .pipeline
            .geocode(&GeocodeRequest::for_address(Address::default()))
            .await;
        assert_eq!(result.status, ResultStatus::MissingAddress);
        assert_eq!(fixture.yahoo_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn batch_results_are_positional() {
        let fixture = fixture(true, &[]);
        let addresses: Vec<Address> = (1..=7)
            .map(|n| Address::new(&format!("{n} State St"), "", "Albany", "NY", "12210", ""))
            .collect();

        let results = fixture.pipeline.geocode_batch(&addresses, None).await;
        assert_eq!(results.len(), 7);
        for (address, result) in addresses.iter().zip(&results) {
            assert_eq!(
                result.geocoded_address.as_ref().unwrap().address.as_ref().unwrap().addr1,
                address.addr1
            );
        }
    }
}
