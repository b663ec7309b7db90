//! Configuration types for the DDNS system
//!
//! The configuration file uses dotenv syntax (read with `dotenvy`). Records
//! are given as repeatable `RECORD=subdomain:domain:ttl:ipmode` entries and
//! are parsed into strongly typed [`RecordTarget`]s here, once, so nothing
//! downstream ever sees the raw strings.
//!
//! ```text
//! API_KEY=pk1_...
//! SECRET_API_KEY=sk1_...
//! PACING_SECS=2
//! LOG_RETENTION=10
//! RECORD=@:example.com::
//! RECORD=www:example.com:900:v4
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::traits::{IpFamily, RecordKey, RecordType};

/// Provider-enforced minimum TTL, in seconds
pub const MIN_TTL: u32 = 600;

/// Default pause between configured records
pub const DEFAULT_PACING_SECS: u64 = 2;

/// Default number of runs kept in the persistent log
pub const DEFAULT_LOG_RETENTION: usize = 10;

/// Default run log file name (relative to the config file)
pub const DEFAULT_LOG_FILE: &str = "ddnsup.log";

/// Placeholder values written by the bootstrap template
const PLACEHOLDER_API_KEY: &str = "pk1_your_api_key";
const PLACEHOLDER_SECRET_API_KEY: &str = "sk1_your_secret_api_key";

/// Template written on first run when no config file exists
pub const CONFIG_TEMPLATE: &str = "\
# ddnsup configuration
#
# Porkbun API credentials (API access must be enabled for each domain)
API_KEY=pk1_your_api_key
SECRET_API_KEY=sk1_your_secret_api_key

# Seconds to wait between configured records
PACING_SECS=2

# Number of runs kept in the log file
LOG_RETENTION=10

# Log file, relative to this file unless absolute
LOG_FILE=ddnsup.log

# Records to maintain, one per line: subdomain:domain:ttl:ipmode
#   subdomain  '@' or empty for the apex, '*' for a wildcard
#   ttl        seconds, minimum 600 (default 600)
#   ipmode     both, v4 or v6 (default both)
#
# RECORD=@:example.com::
# RECORD=www:example.com:900:v4
";

/// Which address families a record is maintained for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IpMode {
    /// Both A and AAAA records
    #[default]
    Both,
    /// A record only
    V4Only,
    /// AAAA record only
    V6Only,
}

impl IpMode {
    /// Whether records of `family` are maintained under this mode
    pub fn permits(self, family: IpFamily) -> bool {
        match self {
            IpMode::Both => true,
            IpMode::V4Only => family == IpFamily::V4,
            IpMode::V6Only => family == IpFamily::V6,
        }
    }
}

impl FromStr for IpMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "both" | "dual" => Ok(IpMode::Both),
            "v4" | "4" | "ipv4" => Ok(IpMode::V4Only),
            "v6" | "6" | "ipv6" => Ok(IpMode::V6Only),
            other => Err(Error::config(format!(
                "Unknown ipmode '{}'. Valid: both, v4, v6",
                other
            ))),
        }
    }
}

/// Apply the TTL floor to a configured TTL value
///
/// Absent, non-numeric, negative or too-small values all become
/// [`MIN_TTL`]; valid values at or above it are kept, saturating at
/// `u32::MAX`.
pub fn effective_ttl(raw: &str) -> u32 {
    raw.trim().parse::<u64>().map_or(MIN_TTL, |ttl| {
        u32::try_from(ttl).unwrap_or(u32::MAX).max(MIN_TTL)
    })
}

/// Whether a 3-field spec reads as `label.domain:ttl:ipmode`
///
/// Otherwise it is `subdomain:domain:ttl` with the ipmode omitted.
fn is_dotted_shorthand(name: &str, ttl: &str) -> bool {
    name.contains('.') && (ttl.is_empty() || ttl.chars().all(|c| c.is_ascii_digit()))
}

/// One configured DNS record to maintain
///
/// Immutable once built. The subdomain is stored normalized: `@` and the
/// empty string are both kept as the empty string (the apex).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordTarget {
    subdomain: String,
    domain: String,
    ttl: u32,
    ip_mode: IpMode,
}

impl RecordTarget {
    /// Create a record target, normalizing the apex and flooring the TTL
    pub fn new(
        subdomain: impl Into<String>,
        domain: impl Into<String>,
        ttl: u32,
        ip_mode: IpMode,
    ) -> Result<Self> {
        let subdomain: String = subdomain.into();
        let subdomain = subdomain.trim().to_ascii_lowercase();
        let subdomain = if subdomain == "@" {
            String::new()
        } else {
            subdomain
        };
        let domain: String = domain.into();
        let domain = domain.trim().trim_end_matches('.').to_ascii_lowercase();

        validate_domain_name(&domain)?;
        if !subdomain.is_empty() {
            validate_subdomain(&subdomain)?;
        }

        Ok(Self {
            subdomain,
            domain,
            ttl: ttl.max(MIN_TTL),
            ip_mode,
        })
    }

    /// Normalized subdomain as sent to the provider (empty for the apex)
    pub fn subdomain(&self) -> &str {
        &self.subdomain
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Effective TTL (already floor-clamped)
    pub fn ttl(&self) -> u32 {
        self.ttl
    }

    pub fn ip_mode(&self) -> IpMode {
        self.ip_mode
    }

    pub fn is_apex(&self) -> bool {
        self.subdomain.is_empty()
    }

    /// Display name: the bare domain for the apex, `subdomain.domain` otherwise
    pub fn fqdn(&self) -> String {
        if self.is_apex() {
            self.domain.clone()
        } else {
            format!("{}.{}", self.subdomain, self.domain)
        }
    }

    /// Provider call scope for one record type
    pub fn key(&self, record_type: RecordType) -> RecordKey<'_> {
        RecordKey::new(&self.domain, &self.subdomain, record_type)
    }
}

impl fmt::Display for RecordTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (ttl {}, {:?})", self.fqdn(), self.ttl, self.ip_mode)
    }
}

impl FromStr for RecordTarget {
    type Err = Error;

    /// Parse a colon-delimited record spec
    ///
    /// Accepted shapes:
    /// - `subdomain:domain:ttl:ipmode`
    /// - `label.domain:ttl:ipmode` (leftmost label is the subdomain)
    /// - `subdomain:domain:ttl`
    /// - `subdomain:domain`
    /// - `domain` (apex)
    fn from_str(spec: &str) -> Result<Self> {
        let fields: Vec<&str> = spec.trim().split(':').map(str::trim).collect();

        let (subdomain, domain, ttl, mode) = match fields.as_slice() {
            [domain] => ("", *domain, "", ""),
            [subdomain, domain] => (*subdomain, *domain, "", ""),
            [name, ttl, mode] if is_dotted_shorthand(name, ttl) => {
                let (label, domain) = name.split_once('.').unwrap_or((*name, ""));
                (label, domain, *ttl, *mode)
            }
            [subdomain, domain, ttl] => (*subdomain, *domain, *ttl, ""),
            [subdomain, domain, ttl, mode] => (*subdomain, *domain, *ttl, *mode),
            _ => {
                return Err(Error::config(format!(
                    "Record '{}': expected subdomain:domain:ttl:ipmode",
                    spec
                )));
            }
        };

        if domain.is_empty() {
            return Err(Error::config(format!("Record '{}': domain is required", spec)));
        }

        let ip_mode = mode
            .parse::<IpMode>()
            .map_err(|e| Error::config(format!("Record '{}': {}", spec, e)))?;

        if !ttl.is_empty() && ttl.parse::<u64>().is_err() {
            warn!("Record '{}': TTL '{}' is not a number, using {}", spec, ttl, MIN_TTL);
        }

        Self::new(subdomain, domain, effective_ttl(ttl), ip_mode)
            .map_err(|e| Error::config(format!("Record '{}': {}", spec, e)))
    }
}

/// Validate a registrable domain name
///
/// This implements basic DNS domain name validation per RFC 1035.
/// It's not comprehensive but catches common errors.
fn validate_domain_name(domain: &str) -> Result<()> {
    if domain.is_empty() {
        return Err(Error::config("Domain name cannot be empty"));
    }

    // Total length limit (RFC 1035: 253 chars max)
    if domain.len() > 253 {
        return Err(Error::config(format!(
            "Domain name too long: {} chars (max 253)",
            domain.len()
        )));
    }

    for label in domain.split('.') {
        validate_label(label, domain)?;
    }

    Ok(())
}

/// Validate a subdomain; a leading `*` label (wildcard) is allowed
fn validate_subdomain(subdomain: &str) -> Result<()> {
    for (i, label) in subdomain.split('.').enumerate() {
        if i == 0 && label == "*" {
            continue;
        }
        // Underscore labels are common for service records
        let label = label.trim_start_matches('_');
        validate_label(label, subdomain)?;
    }
    Ok(())
}

fn validate_label(label: &str, name: &str) -> Result<()> {
    if label.is_empty() {
        return Err(Error::config(format!("Name has empty label: '{}'", name)));
    }

    if label.len() > 63 {
        return Err(Error::config(format!(
            "Label too long: {} chars (max 63). Label: '{}'",
            label.len(),
            label
        )));
    }

    if !label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(Error::config(format!(
            "Label contains invalid characters: '{}'. Valid: alphanumeric and hyphen only.",
            label
        )));
    }

    if label.starts_with('-') || label.ends_with('-') {
        return Err(Error::config(format!(
            "Label cannot start or end with hyphen: '{}'",
            label
        )));
    }

    Ok(())
}

/// Provider API credentials
///
/// The Debug implementation intentionally does NOT expose either key.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// ⚠️ NEVER log this value
    pub api_key: String,
    /// ⚠️ NEVER log this value
    pub secret_api_key: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, secret_api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_api_key: secret_api_key.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<REDACTED>")
            .field("secret_api_key", &"<REDACTED>")
            .finish()
    }
}

/// Fully validated configuration for one run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Provider credentials
    pub credentials: Credentials,

    /// Records to maintain, in configured order
    pub records: Vec<RecordTarget>,

    /// Pause taken between configured records
    pub pacing: Duration,

    /// Maximum number of runs kept in the log
    pub retention: usize,

    /// Persistent run log location
    pub log_file: PathBuf,
}

impl RunConfig {
    /// Load the config file at `path`, then apply overrides from `env`
    ///
    /// `env` is a variable lookup, normally `|k| std::env::var(k).ok()`.
    pub fn load<F>(path: &Path, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let pairs = dotenvy::from_path_iter(path).map_err(|e| {
            Error::config(format!("Failed to read config {}: {}", path.display(), e))
        })?;

        let base_dir = path.parent().unwrap_or_else(|| Path::new(""));
        let mut raw = RawConfig::from_pairs(pairs)?;
        raw.apply_env(env);
        raw.into_config(base_dir)
    }

    /// Parse config text without applying `DDNS_*` overrides
    pub fn parse(text: &str, base_dir: &Path) -> Result<Self> {
        RawConfig::from_pairs(dotenvy::from_read_iter(text.as_bytes()))?.into_config(base_dir)
    }
}

/// Config values before validation
#[derive(Debug, Default)]
struct RawConfig {
    api_key: Option<String>,
    secret_api_key: Option<String>,
    pacing_secs: Option<String>,
    retention: Option<String>,
    log_file: Option<String>,
    records: Vec<String>,
}

impl RawConfig {
    /// Collect known keys from dotenv `(key, value)` pairs, in file order
    fn from_pairs<I>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = std::result::Result<(String, String), dotenvy::Error>>,
    {
        let mut raw = RawConfig::default();

        for pair in pairs {
            let (key, value) =
                pair.map_err(|e| Error::config(format!("Malformed config: {}", e)))?;
            let value = value.trim().to_string();

            match key.trim().to_ascii_uppercase().as_str() {
                "API_KEY" => raw.api_key = Some(value),
                "SECRET_API_KEY" => raw.secret_api_key = Some(value),
                "PACING_SECS" => raw.pacing_secs = Some(value),
                "LOG_RETENTION" => raw.retention = Some(value),
                "LOG_FILE" => raw.log_file = Some(value),
                "RECORD" => raw.records.push(value),
                other => warn!("Ignoring unknown config key '{}'", other),
            }
        }

        Ok(raw)
    }

    fn apply_env<F>(&mut self, env: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let overrides = [
            ("DDNS_API_KEY", &mut self.api_key),
            ("DDNS_SECRET_API_KEY", &mut self.secret_api_key),
            ("DDNS_PACING_SECS", &mut self.pacing_secs),
            ("DDNS_LOG_RETENTION", &mut self.retention),
            ("DDNS_LOG_FILE", &mut self.log_file),
        ];

        for (var, slot) in overrides {
            if let Some(value) = env(var).filter(|v| !v.trim().is_empty()) {
                debug!("Config value overridden by {}", var);
                *slot = Some(value.trim().to_string());
            }
        }
    }

    fn into_config(self, base_dir: &Path) -> Result<RunConfig> {
        let api_key = required_secret(self.api_key, "API_KEY", PLACEHOLDER_API_KEY)?;
        let secret_api_key = required_secret(
            self.secret_api_key,
            "SECRET_API_KEY",
            PLACEHOLDER_SECRET_API_KEY,
        )?;

        if self.records.is_empty() {
            return Err(Error::config(
                "No records configured. Add at least one RECORD=subdomain:domain:ttl:ipmode line",
            ));
        }

        let records = self
            .records
            .iter()
            .map(|spec| spec.parse::<RecordTarget>())
            .collect::<Result<Vec<_>>>()?;

        let pacing_secs = match self.pacing_secs.as_deref() {
            None | Some("") => DEFAULT_PACING_SECS,
            Some(v) => v.parse::<u64>().map_err(|_| {
                Error::config(format!("PACING_SECS must be a whole number of seconds. Got: {}", v))
            })?,
        };

        let retention = match self.retention.as_deref() {
            None | Some("") => DEFAULT_LOG_RETENTION,
            Some(v) => match v.parse::<usize>() {
                Ok(n) if n >= 1 => n,
                _ => {
                    return Err(Error::config(format!(
                        "LOG_RETENTION must be a positive number of runs. Got: {}",
                        v
                    )));
                }
            },
        };

        let log_file = PathBuf::from(self.log_file.as_deref().unwrap_or(DEFAULT_LOG_FILE));
        let log_file = if log_file.is_absolute() {
            log_file
        } else {
            base_dir.join(log_file)
        };

        Ok(RunConfig {
            credentials: Credentials::new(api_key, secret_api_key),
            records,
            pacing: Duration::from_secs(pacing_secs),
            retention,
            log_file,
        })
    }
}

fn required_secret(value: Option<String>, key: &str, placeholder: &str) -> Result<String> {
    match value {
        None => Err(Error::config(format!("{} is required", key))),
        Some(v) if v.is_empty() => Err(Error::config(format!("{} cannot be empty", key))),
        Some(v) if v == placeholder => Err(Error::config(format!(
            "{} still holds the template placeholder. Use a real key from your Porkbun account.",
            key
        ))),
        Some(v) => Ok(v),
    }
}

/// Write the commented config template to `path`
///
/// Parent directories are created as needed. Fails if the file already
/// exists so an existing configuration is never overwritten.
pub fn write_template(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::config(format!(
                "Failed to create config directory {}: {}",
                parent.display(),
                e
            ))
        })?;
    }

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            Error::config(format!("Failed to create config {}: {}", path.display(), e))
        })?;

    std::io::Write::write_all(&mut file, CONFIG_TEMPLATE.as_bytes()).map_err(|e| {
        Error::config(format!("Failed to write config {}: {}", path.display(), e))
    })
}
