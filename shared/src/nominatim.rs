use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// A single hit from `/search?format=jsonv2`. Coordinates come back as strings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NominatimPlace {
    pub lat: String,
    pub lon: String,
    pub display_name: Option<String>,
}

#[derive(Clone)]
pub struct NominatimClient {
    client: Client,
    base_url: String,
}

impl NominatimClient {
    /// Builds a client with the User-Agent Nominatim's usage policy requires.
    pub fn new(
        base_url: impl Into<String>,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()?;
        Ok(Self::new_with_client(client, base_url))
    }

    pub fn new_with_client(client: Client, base_url: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Returns the best match for `query`, or `None` when nothing matched.
    pub async fn search(&self, query: &str) -> Result<Option<NominatimPlace>, reqwest::Error> {
        let url = format!("{}/search", self.base_url);
        let places = self
            .client
            .get(url)
            .query(&[("q", query), ("format", "jsonv2"), ("limit", "1")])
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<NominatimPlace>>()
            .await?;

        Ok(places.into_iter().next())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_search_payload() {
        let body = r#"[{"place_id":1,"lat":"-23.5505","lon":"-46.6333","display_name":"São Paulo","importance":0.9}]"#;
        let places: Vec<NominatimPlace> = serde_json::from_str(body).unwrap();
        assert_eq!(places[0].lat, "-23.5505");
        assert_eq!(places[0].lon, "-46.6333");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = NominatimClient::new_with_client(Client::new(), "http://localhost:8088/");
        assert_eq!(client.base_url, "http://localhost:8088");
    }
}
