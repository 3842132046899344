use crate::app_config::AppConfig;
use crate::domain::{GeoPoint, Place};
use crate::geocoding::{Geocoder, GeocodingError};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

/// OpenStreetMap Nominatim over HTTP.
#[derive(Debug, Clone)]
pub struct NominatimClient {
    client: Client,
    url: String,
    search_limit: usize,
}

#[derive(Debug, Deserialize)]
struct NominatimResponse {
    display_name: Option<String>,
    lat: Option<String>,
    lon: Option<String>,
}

impl NominatimClient {
    pub fn new(config: &AppConfig) -> Result<Self, GeocodingError> {
        let geocoding = config.geocoding();
        let client = Client::builder()
            .user_agent(geocoding.user_agent())
            .timeout(geocoding.timeout())
            .build()?;

        Ok(NominatimClient {
            client,
            url: geocoding.url().trim_end_matches('/').to_string(),
            search_limit: geocoding.search_limit(),
        })
    }
}

#[async_trait]
impl Geocoder for NominatimClient {
    #[instrument(skip(self), fields(point = %point))]
    async fn reverse(&self, point: GeoPoint) -> Result<String, GeocodingError> {
        debug!("🗺️ Reverse geocoding...");
        let latitude = point.latitude.to_string();
        let longitude = point.longitude.to_string();

        let response = self
            .client
            .get(format!("{}/reverse", self.url))
            .query(&[("format", "json"), ("lat", latitude.as_str()), ("lon", longitude.as_str()), ("addressdetails", "1")])
            .send()
            .await?
            .error_for_status()?;

        let display_name = response
            .json::<NominatimResponse>()
            .await?
            .display_name
            .filter(|name| !name.is_empty())
            .ok_or(GeocodingError::NoAddress(point))?;

        debug!("🗺️ Reverse geocoding... OK, '{}'", display_name);
        Ok(display_name)
    }

    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<Place>, GeocodingError> {
        debug!("🗺️ Searching places...");
        let limit = self.search_limit.to_string();

        let response = self
            .client
            .get(format!("{}/search", self.url))
            .query(&[("q", query), ("format", "json"), ("limit", limit.as_str()), ("addressdetails", "1")])
            .send()
            .await?
            .error_for_status()?;

        let places = response
            .json::<Vec<NominatimResponse>>()
            .await?
            .into_iter()
            .filter_map(|candidate| {
                let latitude = candidate.lat.as_deref().and_then(|lat| lat.parse::<f64>().ok());
                let longitude = candidate.lon.as_deref().and_then(|lon| lon.parse::<f64>().ok());
                let point = latitude.zip(longitude).and_then(|(lat, lon)| GeoPoint::try_new(lat, lon).ok());

                match (point, candidate.display_name) {
                    (Some(point), Some(display_name)) => Some(Place { point, display_name }),
                    (_, display_name) => {
                        warn!(?display_name, "🗺️ Skipping search result without valid coordinates");
                        None
                    }
                }
            })
            .collect::<Vec<Place>>();

        debug!("🗺️ Searching places... OK, {} found", places.len());
        Ok(places)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app_config::AppConfigBuilder;
    use mockito::Matcher;
    use pretty_assertions::assert_eq;
    use test_log::test;

    fn client(url: String) -> NominatimClient {
        NominatimClient::new(&AppConfigBuilder::new().geocoding_url(url).build()).unwrap()
    }

    #[test(tokio::test)]
    async fn reverse_returns_the_display_name() -> Result<(), GeocodingError> {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/reverse")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("format".into(), "json".into()),
                Matcher::UrlEncoded("lat".into(), "-12.0464".into()),
                Matcher::UrlEncoded("lon".into(), "-77.0428".into()),
                Matcher::UrlEncoded("addressdetails".into(), "1".into()),
            ]))
            .match_header("user-agent", "waypoint-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(include_str!("../../tests/resources/nominatim_reverse_response.json"))
            .create_async()
            .await;

        let address = client(server.url()).reverse(GeoPoint::new(-12.0464, -77.0428)).await?;

        mock.assert();
        assert_eq!(address, "Plaza Mayor, Jirón de la Unión, Cercado de Lima, Lima, 15001, Perú");

        Ok(())
    }

    #[test(tokio::test)]
    async fn reverse_without_display_name_is_no_address() {
        let mut server = mockito::Server::new_async().await;

        server
            .mock("GET", "/reverse")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{ "error": "Unable to geocode" }"#)
            .create_async()
            .await;

        let result = client(server.url()).reverse(GeoPoint::new(0.0, -140.0)).await;

        assert!(matches!(result, Err(GeocodingError::NoAddress(_))));
    }

    #[test(tokio::test)]
    async fn reverse_fails_on_server_errors() {
        let mut server = mockito::Server::new_async().await;

        server.mock("GET", "/reverse").match_query(Matcher::Any).with_status(503).create_async().await;

        let result = client(server.url()).reverse(GeoPoint::new(-12.0464, -77.0428)).await;

        assert!(matches!(result, Err(GeocodingError::RequestError(_))));
    }

    #[test(tokio::test)]
    async fn search_maps_candidates_and_skips_invalid_ones() -> Result<(), GeocodingError> {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("GET", "/search")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("q".into(), "plaza mayor".into()),
                Matcher::UrlEncoded("limit".into(), "5".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(include_str!("../../tests/resources/nominatim_search_response.json"))
            .create_async()
            .await;

        let places = client(server.url()).search("plaza mayor").await?;

        mock.assert();
        assert_eq!(
            places,
            vec![
                Place {
                    point: GeoPoint::new(-12.0453, -77.0311),
                    display_name: "Plaza Mayor, Cercado de Lima, Lima, Perú".to_string(),
                },
                Place {
                    point: GeoPoint::new(40.4155, -3.7074),
                    display_name: "Plaza Mayor, Centro, Madrid, España".to_string(),
                },
            ]
        );

        Ok(())
    }
}
