use crate::domain::GeoPoint;
use crate::geocoding::{AddressCache, Geocoder, ResolvedAddress};
use std::sync::Arc;
use tracing::instrument;

/// Resolves single coordinates to addresses, asking the geocoder only on cache misses.
#[derive(Debug)]
pub struct AddressResolver<G: Geocoder> {
    geocoder: Arc<G>,
    cache: AddressCache,
}

impl<G: Geocoder> AddressResolver<G> {
    pub fn new(geocoder: Arc<G>) -> Self {
        AddressResolver {
            geocoder,
            cache: AddressCache::new(),
        }
    }

    #[instrument(skip(self), fields(point = %point))]
    pub async fn resolve(&mut self, point: GeoPoint) -> ResolvedAddress {
        if let Some(address) = self.cache.lookup(point) {
            return address;
        }

        let result = self.geocoder.reverse(point).await;
        self.cache.settle(point, result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::AppConfigBuilder;
    use crate::geocoding::fake::FakeGeocoder;
    use crate::geocoding::NominatimClient;
    use crate::geocoding::cache::AddressSource;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use test_log::test;

    #[test(tokio::test)]
    async fn lookups_in_the_same_bucket_hit_the_network_once() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/reverse")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(include_str!("../../tests/resources/nominatim_reverse_response.json"))
            .expect(1)
            .create_async()
            .await;

        let config = AppConfigBuilder::new().geocoding_url(server.url()).build();
        let mut resolver = AddressResolver::new(Arc::new(NominatimClient::new(&config).unwrap()));

        let first = resolver.resolve(GeoPoint::new(-12.04641, -77.04279)).await;
        let second = resolver.resolve(GeoPoint::new(-12.04639, -77.04281)).await;

        mock.assert_async().await;
        assert_eq!(first.source, AddressSource::Geocoder);
        assert_eq!(second.source, AddressSource::Cache);
        assert_eq!(first.text, second.text);
    }

    #[test(tokio::test)]
    async fn failed_lookups_fall_back_and_are_retried() {
        let geocoder = Arc::new(FakeGeocoder::failing(1));
        let mut resolver = AddressResolver::new(geocoder.clone());
        let point = GeoPoint::new(-12.0464, -77.0428);

        let first = resolver.resolve(point).await;
        let second = resolver.resolve(point).await;

        assert_eq!(first, ResolvedAddress::fallback(point));
        assert_eq!(second.text, FakeGeocoder::address(point));
        assert_eq!(geocoder.calls().len(), 2);
    }
}
