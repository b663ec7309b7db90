// # HTTP IP Source
//
// Discovers the machine's public addresses by asking plain-text echo
// services ("what is my IP") over HTTPS.
//
// ## Failover
//
// Each family has an ordered list of services. They are tried in order and
// the first body that validates as an address of the requested family wins.
// Request errors, non-2xx statuses and garbage bodies all fall through to
// the next service; exhausting the list means "not detected".
//
// ## Family Pinning
//
// The production clients bind their local address to `0.0.0.0` or `::` so
// that an IPv4 query cannot be answered over IPv6 (and vice versa) on a
// dual-stack host.

use ddns_core::traits::{IpFamily, IpSource, validate_address};
use ddns_core::{Error, Result};

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::time::Duration;

/// IPv4 echo services, in failover order
pub const DEFAULT_V4_SERVICES: &[&str] = &[
    "https://api.ipify.org",
    "https://ipv4.icanhazip.com",
    "https://v4.ident.me",
];

/// IPv6 echo services, in failover order
pub const DEFAULT_V6_SERVICES: &[&str] = &[
    "https://api6.ipify.org",
    "https://ipv6.icanhazip.com",
    "https://v6.ident.me",
];

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP echo-service IP source
#[derive(Debug, Clone)]
pub struct HttpIpSource {
    v4_services: Vec<String>,
    v6_services: Vec<String>,
    v4_client: reqwest::Client,
    v6_client: reqwest::Client,
}

fn build_client(local_address: Option<IpAddr>) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .connect_timeout(CONNECT_TIMEOUT)
        .timeout(REQUEST_TIMEOUT)
        .local_address(local_address)
        .user_agent(concat!("ddnsup/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| Error::http(format!("Failed to build HTTP client: {}", e)))
}

impl HttpIpSource {
    /// Source using the default public services, pinned per family
    pub fn new() -> Result<Self> {
        Ok(Self {
            v4_services: DEFAULT_V4_SERVICES.iter().map(|s| s.to_string()).collect(),
            v6_services: DEFAULT_V6_SERVICES.iter().map(|s| s.to_string()).collect(),
            v4_client: build_client(Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)))?,
            v6_client: build_client(Some(IpAddr::V6(Ipv6Addr::UNSPECIFIED)))?,
        })
    }

    /// Source using custom service lists and an unpinned client
    ///
    /// Intended for self-hosted echo services and tests.
    pub fn with_services(v4_services: Vec<String>, v6_services: Vec<String>) -> Result<Self> {
        let client = build_client(None)?;
        Ok(Self {
            v4_services,
            v6_services,
            v4_client: client.clone(),
            v6_client: client,
        })
    }

    fn route(&self, family: IpFamily) -> (&reqwest::Client, &[String]) {
        match family {
            IpFamily::V4 => (&self.v4_client, &self.v4_services),
            IpFamily::V6 => (&self.v6_client, &self.v6_services),
        }
    }

    /// Query one service; `None` on any failure
    async fn query(client: &reqwest::Client, url: &str, family: IpFamily) -> Option<String> {
        let response = match client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                tracing::debug!("{} lookup via {} failed: {}", family, url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            tracing::debug!("{} lookup via {} returned {}", family, url, response.status());
            return None;
        }

        let body = match response.text().await {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("{} lookup via {}: unreadable body: {}", family, url, e);
                return None;
            }
        };

        let address = validate_address(family, &body);
        if address.is_none() {
            tracing::debug!("{} lookup via {}: rejected body {:?}", family, url, body.trim());
        }
        address
    }
}

#[async_trait::async_trait]
impl IpSource for HttpIpSource {
    async fn discover(&self, family: IpFamily) -> Option<String> {
        let (client, services) = self.route(family);

        for url in services {
            if let Some(address) = Self::query(client, url, family).await {
                tracing::debug!("Public {} is {} (via {})", family, address, url);
                return Some(address);
            }
        }

        tracing::warn!("No {} address detected from {} service(s)", family, services.len());
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn service(server: &MockServer, route: &str, status: u16, body: &str) -> String {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(server)
            .await;
        format!("{}{}", server.uri(), route)
    }

    #[tokio::test]
    async fn strips_whitespace_from_body() {
        let server = MockServer::start().await;
        let url = service(&server, "/ip", 200, " 203.0.113.7\n").await;

        let source = HttpIpSource::with_services(vec![url], vec![]).unwrap();
        assert_eq!(source.discover(IpFamily::V4).await.as_deref(), Some("203.0.113.7"));
    }

    #[tokio::test]
    async fn fails_over_to_next_service() {
        let server = MockServer::start().await;
        let broken = service(&server, "/down", 503, "").await;
        let garbage = service(&server, "/html", 200, "<html>rate limited</html>").await;
        let good = service(&server, "/v6", 200, "2001:db8::42").await;

        let source = HttpIpSource::with_services(vec![], vec![broken, garbage, good]).unwrap();
        assert_eq!(source.discover(IpFamily::V6).await.as_deref(), Some("2001:db8::42"));
    }

    #[tokio::test]
    async fn wrong_family_is_rejected() {
        let server = MockServer::start().await;
        let url = service(&server, "/ip", 200, "2001:db8::1").await;

        let source = HttpIpSource::with_services(vec![url], vec![]).unwrap();
        assert_eq!(source.discover(IpFamily::V4).await, None);
    }

    #[tokio::test]
    async fn all_services_failing_is_not_detected() {
        let server = MockServer::start().await;
        let a = service(&server, "/a", 500, "").await;
        let b = service(&server, "/b", 404, "").await;

        let source = HttpIpSource::with_services(vec![a, b], vec![]).unwrap();
        assert_eq!(source.discover(IpFamily::V4).await, None);
        assert_eq!(source.discover(IpFamily::V6).await, None);
    }

    #[test]
    fn default_services_are_ordered() {
        let source = HttpIpSource::new().unwrap();
        assert_eq!(source.v4_services[0], "https://api.ipify.org");
        assert_eq!(source.v6_services.len(), DEFAULT_V6_SERVICES.len());
    }
}
