//! Remote image download for profile image import.
//!
//! Only public hosts are contacted. Loopback, private and link-local
//! addresses are refused in the URL, in DNS answers and in redirects.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use bytes::{Bytes, BytesMut};
use reqwest::dns::{Addrs, Name, Resolve, Resolving};
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use reqwest::{Client, Url};

use kiroku_core::profile::ProfileImageError;
use kiroku_core::storage::{StorageError, StoragePrefix};

const FETCH_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 5;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Downloaded image body and its declared type.
#[derive(Debug, Clone)]
pub struct FetchedImage {
    /// Response body.
    pub body: Bytes,
    /// `Content-Type` header, empty if absent.
    pub content_type: String,
}

/// HTTP client for remote profile images (e.g. the identity provider's
/// avatar URL).
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    max_size: u64,
    allow_private_hosts: bool,
}

impl ImageFetcher {
    /// Build a fetcher capped at the avatars size limit that only reaches
    /// public hosts.
    ///
    /// # Errors
    ///
    /// Returns an error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::build(false)
    }

    /// Fetcher that may reach local servers.
    #[cfg(test)]
    pub(crate) fn allowing_private_hosts() -> Result<Self, reqwest::Error> {
        Self::build(true)
    }

    fn build(allow_private_hosts: bool) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder()
            .timeout(FETCH_TIMEOUT)
            .user_agent(concat!("kiroku/", env!("CARGO_PKG_VERSION")))
            .redirect(redirect_policy(allow_private_hosts));

        if !allow_private_hosts {
            builder = builder.dns_resolver(Arc::new(PublicResolver));
        }

        Ok(Self {
            client: builder.build()?,
            max_size: StoragePrefix::Avatars.config().max_file_size,
            allow_private_hosts,
        })
    }

    /// Parse and check an image URL. Only `http` and `https` to a public
    /// host are accepted.
    ///
    /// # Errors
    ///
    /// Returns `ProfileImageError::Fetch` for malformed URLs, other schemes
    /// and private hosts.
    pub fn parse_url(&self, raw: &str) -> Result<Url, ProfileImageError> {
        let url =
            Url::parse(raw).map_err(|e| ProfileImageError::fetch(format!("invalid url: {e}")))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(ProfileImageError::fetch(format!(
                "unsupported url scheme: {}",
                url.scheme()
            )));
        }

        let host = url.host_str().unwrap_or_default();
        if host.is_empty() || (!self.allow_private_hosts && !is_public_host(host)) {
            return Err(ProfileImageError::fetch(format!("host not allowed: {host}")));
        }

        Ok(url)
    }

    /// Download `url`.
    ///
    /// The body is read chunk by chunk and abandoned as soon as it exceeds
    /// the avatars limit, whether or not a length was declared.
    ///
    /// # Errors
    ///
    /// Returns `Fetch` on transport errors and non-success statuses, and a
    /// size error when the body exceeds the avatars limit.
    pub async fn fetch(&self, url: Url) -> Result<FetchedImage, ProfileImageError> {
        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ProfileImageError::fetch(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProfileImageError::fetch(format!(
                "remote host responded with {status}"
            )));
        }

        if let Some(length) = response.content_length()
            && length > self.max_size
        {
            return Err(StorageError::file_too_large(length, self.max_size).into());
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let mut body = BytesMut::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| ProfileImageError::fetch(e.to_string()))?
        {
            let size = u64::try_from(body.len() + chunk.len()).unwrap_or(u64::MAX);
            if size > self.max_size {
                return Err(StorageError::file_too_large(size, self.max_size).into());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedImage {
            body: body.freeze(),
            content_type,
        })
    }
}

fn redirect_policy(allow_private_hosts: bool) -> Policy {
    Policy::custom(move |attempt| {
        let too_many = attempt.previous().len() >= MAX_REDIRECTS;
        let allowed =
            allow_private_hosts || attempt.url().host_str().is_some_and(is_public_host);

        if too_many {
            attempt.error("too many redirects")
        } else if !allowed {
            attempt.error("redirect to a host that is not allowed")
        } else {
            attempt.follow()
        }
    })
}

/// Resolver that drops every non-public address.
#[derive(Debug)]
struct PublicResolver;

impl Resolve for PublicResolver {
    fn resolve(&self, name: Name) -> Resolving {
        Box::pin(async move {
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((name.as_str(), 0))
                .await?
                .filter(|addr| is_public_ip(addr.ip()))
                .collect();

            if addrs.is_empty() {
                return Err(format!("{} has no public address", name.as_str()).into());
            }

            let addrs: Addrs = Box::new(addrs.into_iter());
            Ok::<_, BoxError>(addrs)
        })
    }
}

/// `host` as rendered by `Url::host_str` (IPv6 in brackets).
fn is_public_host(host: &str) -> bool {
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    match bare.parse::<IpAddr>() {
        Ok(ip) => is_public_ip(ip),
        Err(_) => {
            let name = bare.trim_end_matches('.').to_ascii_lowercase();
            name != "localhost" && !name.ends_with(".localhost")
        }
    }
}

fn is_public_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(ip) => is_public_v4(ip),
        IpAddr::V6(ip) => match ip.to_ipv4_mapped() {
            Some(mapped) => is_public_v4(mapped),
            None => {
                !(ip.is_loopback()
                    || ip.is_unspecified()
                    || ip.is_unique_local()
                    || ip.is_unicast_link_local())
            }
        },
    }
}

fn is_public_v4(ip: Ipv4Addr) -> bool {
    let [a, b, ..] = ip.octets();
    // 100.64.0.0/10 carrier-grade NAT
    let shared = a == 100 && (b & 0xc0) == 64;

    !(ip.is_loopback()
        || ip.is_private()
        || ip.is_link_local()
        || ip.is_unspecified()
        || ip.is_broadcast()
        || ip.is_documentation()
        || shared)
}
