// # IP Source Trait
//
// Defines the interface for discovering the machine's current public
// address, one family at a time.
//
// ## Implementations
//
// - HTTP echo services: `ddns-ip-http` crate
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::{IpFamily, IpSource};
//
// let source = /* IpSource implementation */;
// if let Some(v4) = source.discover(IpFamily::V4).await {
//     println!("public IPv4 is {}", v4);
// }
// ```

use async_trait::async_trait;
use std::fmt;

use super::RecordType;

/// IP address family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IpFamily {
    V4,
    V6,
}

impl IpFamily {
    /// Both families, in the order they are processed
    pub const ALL: [IpFamily; 2] = [IpFamily::V4, IpFamily::V6];

    /// DNS record type that carries an address of this family
    pub fn record_type(self) -> RecordType {
        match self {
            IpFamily::V4 => RecordType::A,
            IpFamily::V6 => RecordType::Aaaa,
        }
    }
}

impl fmt::Display for IpFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IpFamily::V4 => f.write_str("IPv4"),
            IpFamily::V6 => f.write_str("IPv6"),
        }
    }
}

/// Validate the body returned by an address-echo service
///
/// All whitespace (leading, trailing and internal) is stripped first.
/// IPv4 must be four dot-separated decimal octets; IPv6 must contain at
/// least one colon and nothing but hex digits, colons and dots.
///
/// Returns the cleaned address, or `None` if the shape does not match.
pub fn validate_address(family: IpFamily, raw: &str) -> Option<String> {
    let cleaned: String = raw.chars().filter(|c| !c.is_whitespace()).collect();

    let valid = match family {
        IpFamily::V4 => {
            let octets: Vec<&str> = cleaned.split('.').collect();
            octets.len() == 4
                && octets.iter().all(|octet| {
                    (1..=3).contains(&octet.len())
                        && octet.chars().all(|c| c.is_ascii_digit())
                        && octet.parse::<u8>().is_ok()
                })
        }
        IpFamily::V6 => {
            cleaned.contains(':')
                && cleaned
                    .chars()
                    .all(|c| c.is_ascii_hexdigit() || c == ':' || c == '.')
        }
    };

    valid.then_some(cleaned)
}

/// Trait for IP source implementations
///
/// A source answers one question per family: what is this machine's
/// public address right now? There is no caching and no watching; a run
/// asks once per family and passes the answers down explicitly.
///
/// # Failure
///
/// A source never fails hard. If every lookup for a family fails it
/// returns `None`, and the engine decides whether that is fatal (it is
/// only when both families come back empty).
#[async_trait]
pub trait IpSource: Send + Sync {
    /// Discover the current public address for `family`
    ///
    /// # Returns
    ///
    /// - `Some(String)`: A validated address string
    /// - `None`: No lookup service produced a valid answer
    async fn discover(&self, family: IpFamily) -> Option<String>;
}
