// crates/pactum-providers/src/http.rs
// ============================================================================
// Module: HTTP Signing Authority
// Description: Bearer-token client for a remote signature and certificate API.
// Purpose: Turn a document hash into a signature assertion under strict limits.
// Dependencies: pactum-core, base64, reqwest, serde, serde_json
// ============================================================================

//! ## Overview
//! [`HttpSigningAuthority`] POSTs `{"hashBase64", "certificateId"}` to the
//! signature endpoint with the credential's bearer token and keeps the full
//! JSON response as the assertion payload. `hashBase64` is the base64 of the
//! hex digest string, not of the raw digest bytes. A non-empty object under
//! `identity`, `signer` or `userinfo` becomes the reported signer identity.
//!
//! Endpoints are checked once at construction (scheme, credentials in the
//! URL, host allowlist) and every call re-resolves the host, rejects private
//! addresses unless allowed, pins the connection to a vetted address and
//! refuses redirects. Responses are read under a hard byte limit.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::io::Read;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::net::ToSocketAddrs;
use std::time::Duration;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use pactum_core::AuthorityError;
use pactum_core::AuthorityRequest;
use pactum_core::SignatureAssertion;
use pactum_core::SigningAuthority;
use pactum_core::SigningCredential;
use reqwest::Method;
use reqwest::StatusCode;
use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::blocking::Response;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use reqwest::redirect::Policy;
use serde::Deserialize;
use serde_json::Value;
use serde_json::json;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum characters of an error body echoed into a failure reason.
const MAX_ERROR_SNIPPET_CHARS: usize = 200;
/// Response keys that may carry the signer identity, in lookup order.
const IDENTITY_KEYS: [&str; 3] = ["identity", "signer", "userinfo"];

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration for the HTTP signing authority.
///
/// # Invariants
/// - `allow_http = false` blocks cleartext `http://` endpoints.
/// - `max_response_bytes` is a hard upper bound on response bodies.
/// - If `allowed_hosts` is set, only listed hosts are contacted.
/// - `timeout_ms` applies to the full request lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpAuthorityConfig {
    /// Signature endpoint.
    pub signature_url: String,
    /// Certificate listing endpoint.
    #[serde(default)]
    pub certificates_url: Option<String>,
    /// Allow cleartext HTTP (disabled by default).
    #[serde(default)]
    pub allow_http: bool,
    /// Request timeout in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Maximum response size allowed, in bytes.
    #[serde(default = "default_max_response_bytes")]
    pub max_response_bytes: usize,
    /// Optional host allowlist.
    #[serde(default)]
    pub allowed_hosts: Option<BTreeSet<String>>,
    /// Allow requests to private/link-local/loopback addresses.
    #[serde(default)]
    pub allow_private_networks: bool,
    /// User agent string for outbound requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl HttpAuthorityConfig {
    /// Creates a configuration with default limits for a signature endpoint.
    #[must_use]
    pub fn new(signature_url: impl Into<String>) -> Self {
        Self {
            signature_url: signature_url.into(),
            certificates_url: None,
            allow_http: false,
            timeout_ms: default_timeout_ms(),
            max_response_bytes: default_max_response_bytes(),
            allowed_hosts: None,
            allow_private_networks: false,
            user_agent: default_user_agent(),
        }
    }
}

/// Default request timeout.
const fn default_timeout_ms() -> u64 {
    10_000
}

/// Default response size limit.
const fn default_max_response_bytes() -> usize {
    256 * 1024
}

/// Default user agent.
fn default_user_agent() -> String {
    "pactum/0.1".to_string()
}

// ============================================================================
// SECTION: Authority
// ============================================================================

/// Signing authority reached over HTTPS with bearer credentials.
pub struct HttpSigningAuthority {
    /// Limits and endpoint policy.
    config: HttpAuthorityConfig,
    /// Parsed signature endpoint.
    signature_url: Url,
    /// Parsed certificate endpoint.
    certificates_url: Option<Url>,
    /// Client used for IP-literal hosts.
    client: Client,
}

impl HttpSigningAuthority {
    /// Creates an authority after validating both endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError::Unavailable`] when an endpoint violates the
    /// policy or the HTTP client cannot be built.
    pub fn new(config: HttpAuthorityConfig) -> Result<Self, AuthorityError> {
        let signature_url = parse_endpoint(&config.signature_url, &config)?;
        let certificates_url = config
            .certificates_url
            .as_deref()
            .map(|raw| parse_endpoint(raw, &config))
            .transpose()?;
        let client = build_http_client(&config, None)?;
        Ok(Self {
            config,
            signature_url,
            certificates_url,
            client,
        })
    }

    /// Lists the certificates available to the credential holder.
    ///
    /// Accepts either a bare JSON array or an object wrapping the array under
    /// `certificates` or `certificados`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthorityError`] when no certificate endpoint is configured,
    /// the request fails, or the response has an unexpected shape.
    pub fn list_certificates(
        &self,
        credential: &SigningCredential,
    ) -> Result<Vec<Value>, AuthorityError> {
        let url = self.certificates_url.as_ref().ok_or_else(|| {
            AuthorityError::Unavailable("no certificate endpoint configured".to_string())
        })?;
        let body = self.exchange(url, Method::GET, None, &credential.access_token)?;
        let list = match body {
            Value::Array(items) => items,
            Value::Object(mut map) => {
                match map.remove("certificates").or_else(|| map.remove("certificados")) {
                    Some(Value::Array(items)) => items,
                    _ => {
                        return Err(AuthorityError::InvalidResponse(
                            "certificate response has no certificate list".to_string(),
                        ));
                    }
                }
            }
            _ => {
                return Err(AuthorityError::InvalidResponse(
                    "certificate response must be an array or object".to_string(),
                ));
            }
        };
        Ok(list)
    }

    /// Sends one authenticated JSON request and returns the parsed body.
    fn exchange(
        &self,
        url: &Url,
        method: Method,
        body: Option<&Value>,
        token: &str,
    ) -> Result<Value, AuthorityError> {
        let resolved = resolve_request_host(url, &self.config)?;
        let encoded = body
            .map(serde_json::to_vec)
            .transpose()
            .map_err(|err| AuthorityError::Unavailable(format!("request encoding failed: {err}")))?;
        let mut response = self.send_pinned_request(url, &resolved, &method, encoded, token)?;
        let status = response.status();
        let bytes = read_response_limited(&mut response, self.config.max_response_bytes)?;
        if !status.is_success() {
            return Err(status_error(status, &bytes));
        }
        serde_json::from_slice(&bytes).map_err(|_| {
            AuthorityError::InvalidResponse("authority response is not valid JSON".to_string())
        })
    }

    /// Sends a request using pinned DNS resolution for the selected host.
    fn send_pinned_request(
        &self,
        url: &Url,
        resolved: &ResolvedHost,
        method: &Method,
        body: Option<Vec<u8>>,
        token: &str,
    ) -> Result<Response, AuthorityError> {
        let mut last_error: Option<AuthorityError> = None;
        for ip in &resolved.ips {
            let client = match self.client_for_ip(resolved, *ip) {
                Ok(client) => client,
                Err(err) => {
                    last_error = Some(err);
                    continue;
                }
            };
            let mut request = client
                .request(method.clone(), url.as_str())
                .bearer_auth(token)
                .header(ACCEPT, "application/json");
            if let Some(bytes) = &body {
                request = request.header(CONTENT_TYPE, "application/json").body(bytes.clone());
            }
            let response = match request.send() {
                Ok(response) => response,
                Err(err) if err.is_timeout() => {
                    return Err(AuthorityError::Timeout(self.config.timeout_ms));
                }
                Err(_) => {
                    last_error = Some(AuthorityError::Unreachable(format!(
                        "request to {} failed",
                        resolved.host_label
                    )));
                    continue;
                }
            };
            if response.url() != url {
                return Err(AuthorityError::InvalidResponse("redirect not allowed".to_string()));
            }
            enforce_ip_policy(&resolved.host_label, *ip, self.config.allow_private_networks)?;
            return Ok(response);
        }
        Err(last_error
            .unwrap_or_else(|| AuthorityError::Unreachable("request failed".to_string())))
    }

    /// Builds a client pinned to a specific resolved IP when needed.
    fn client_for_ip(&self, resolved: &ResolvedHost, ip: IpAddr) -> Result<Client, AuthorityError> {
        if !resolved.is_domain {
            return Ok(self.client.clone());
        }
        let socket_addr = SocketAddr::new(ip, resolved.port);
        build_http_client(&self.config, Some((&resolved.host, socket_addr)))
    }
}

impl SigningAuthority for HttpSigningAuthority {
    fn sign(&self, request: &AuthorityRequest) -> Result<SignatureAssertion, AuthorityError> {
        let body = json!({
            "hashBase64": STANDARD.encode(request.document_hash.as_bytes()),
            "certificateId": request.credential.certificate_id,
        });
        let payload = self.exchange(
            &self.signature_url,
            Method::POST,
            Some(&body),
            &request.credential.access_token,
        )?;
        let signature = payload
            .get("signature")
            .and_then(Value::as_str)
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                AuthorityError::InvalidResponse("response has no signature field".to_string())
            })?
            .to_string();
        let identity = reported_identity(&payload);
        Ok(SignatureAssertion {
            signature,
            payload,
            identity,
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the first identity object the authority reported, if any.
fn reported_identity(payload: &Value) -> Option<Value> {
    IDENTITY_KEYS
        .iter()
        .filter_map(|key| payload.get(key))
        .find(|value| value.as_object().is_some_and(|map| !map.is_empty()))
        .cloned()
}

/// Maps a non-success status to an authority error.
fn status_error(status: StatusCode, body: &[u8]) -> AuthorityError {
    let snippet: String =
        String::from_utf8_lossy(body).chars().take(MAX_ERROR_SNIPPET_CHARS).collect();
    let message = if snippet.trim().is_empty() {
        format!("authority returned {}", status.as_u16())
    } else {
        format!("authority returned {}: {}", status.as_u16(), snippet.trim())
    };
    if status.is_client_error() {
        AuthorityError::Rejected(message)
    } else {
        AuthorityError::Unreachable(message)
    }
}

/// Parses and validates a configured endpoint.
fn parse_endpoint(raw: &str, config: &HttpAuthorityConfig) -> Result<Url, AuthorityError> {
    let url = Url::parse(raw)
        .map_err(|_| AuthorityError::Unavailable(format!("invalid endpoint url: {raw}")))?;
    validate_url(&url, config)?;
    Ok(url)
}

/// Validates URL scheme and allowlist policy.
fn validate_url(url: &Url, config: &HttpAuthorityConfig) -> Result<(), AuthorityError> {
    match url.scheme() {
        "https" => {}
        "http" if config.allow_http => {}
        _ => {
            return Err(AuthorityError::Unavailable("unsupported endpoint scheme".to_string()));
        }
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(AuthorityError::Unavailable(
            "endpoint credentials are not allowed".to_string(),
        ));
    }
    if let Some(allowlist) = &config.allowed_hosts {
        let host = normalize_host_label(
            url.host_str()
                .ok_or_else(|| AuthorityError::Unavailable("endpoint host required".to_string()))?,
        );
        let allowed = allowlist.iter().any(|entry| normalize_host_label(entry.as_str()) == host);
        if !allowed {
            return Err(AuthorityError::Unavailable(format!("endpoint host not allowed: {host}")));
        }
    }
    Ok(())
}

/// Resolves host metadata and validates address policy before requests.
fn resolve_request_host(
    url: &Url,
    config: &HttpAuthorityConfig,
) -> Result<ResolvedHost, AuthorityError> {
    let host = url
        .host_str()
        .ok_or_else(|| AuthorityError::Unavailable("endpoint host required".to_string()))?;
    let host_label = normalize_host_label(host);
    let host_for_resolution =
        host.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')).unwrap_or(host);
    let port = url
        .port_or_known_default()
        .ok_or_else(|| AuthorityError::Unavailable("endpoint port required".to_string()))?;
    let mut ips = resolve_host_ips(host_for_resolution, port)?;
    if ips.is_empty() {
        return Err(AuthorityError::Unreachable(format!("{host_label} has no addresses")));
    }
    for ip in &ips {
        enforce_ip_policy(&host_label, *ip, config.allow_private_networks)?;
    }
    dedupe_ips(&mut ips);
    Ok(ResolvedHost {
        host: host_for_resolution.to_string(),
        host_label,
        port,
        ips,
        is_domain: host_for_resolution.parse::<IpAddr>().is_err(),
    })
}

/// Builds an HTTP client with optional DNS pinning override.
fn build_http_client(
    config: &HttpAuthorityConfig,
    resolve: Option<(&str, SocketAddr)>,
) -> Result<Client, AuthorityError> {
    let mut builder = Client::builder()
        .timeout(Duration::from_millis(config.timeout_ms))
        .user_agent(config.user_agent.clone())
        .redirect(Policy::none());
    if let Some((host, socket_addr)) = resolve {
        builder = builder.resolve(host, socket_addr);
    }
    builder.build().map_err(|_| AuthorityError::Unavailable("http client build failed".to_string()))
}

/// Resolves hostnames to peer IPs used for policy checks and pinning.
fn resolve_host_ips(host: &str, port: u16) -> Result<Vec<IpAddr>, AuthorityError> {
    if let Ok(ip) = host.parse::<IpAddr>() {
        return Ok(vec![ip]);
    }
    (host, port)
        .to_socket_addrs()
        .map(|iter| iter.map(|addr| addr.ip()).collect::<Vec<IpAddr>>())
        .map_err(|_| AuthorityError::Unreachable(format!("cannot resolve {host}")))
}

/// Rejects private and link-local peers unless allowed.
fn enforce_ip_policy(
    host_label: &str,
    ip: IpAddr,
    allow_private_networks: bool,
) -> Result<(), AuthorityError> {
    if allow_private_networks || !is_private_or_link_local(&ip) {
        return Ok(());
    }
    Err(AuthorityError::Unavailable(format!(
        "{host_label} resolves to a private or link-local address"
    )))
}

/// Returns true when an IP is private, loopback, link-local, or otherwise local.
const fn is_private_or_link_local(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(addr) => {
            addr.is_private()
                || addr.is_loopback()
                || addr.is_link_local()
                || addr.is_unspecified()
                || addr.is_multicast()
                || addr.is_broadcast()
        }
        IpAddr::V6(addr) => {
            addr.is_loopback()
                || addr.is_unique_local()
                || addr.is_unicast_link_local()
                || addr.is_unspecified()
                || addr.is_multicast()
        }
    }
}

/// Normalizes host labels for allowlist comparisons.
fn normalize_host_label(host: &str) -> String {
    let trimmed = host.trim_end_matches('.');
    let trimmed =
        trimmed.strip_prefix('[').and_then(|inner| inner.strip_suffix(']')).unwrap_or(trimmed);
    trimmed.to_ascii_lowercase()
}

/// Deduplicates IP addresses while preserving order.
fn dedupe_ips(ips: &mut Vec<IpAddr>) {
    let mut unique = Vec::with_capacity(ips.len());
    for ip in ips.drain(..) {
        if !unique.contains(&ip) {
            unique.push(ip);
        }
    }
    *ips = unique;
}

/// Resolved host metadata for pinned outbound requests.
struct ResolvedHost {
    /// Host string as it appears in the URL.
    host: String,
    /// Normalized host label used in messages.
    host_label: String,
    /// Effective request port.
    port: u16,
    /// Resolved candidate peer IPs, non-empty and deduplicated.
    ips: Vec<IpAddr>,
    /// True when the host is a DNS name.
    is_domain: bool,
}

/// Reads the response body while enforcing a byte limit.
fn read_response_limited(
    response: &mut Response,
    max_bytes: usize,
) -> Result<Vec<u8>, AuthorityError> {
    let too_large =
        || AuthorityError::InvalidResponse(format!("response exceeds {max_bytes} bytes"));
    let max_bytes_u64 = u64::try_from(max_bytes).unwrap_or(u64::MAX);
    if response.content_length().is_some_and(|expected| expected > max_bytes_u64) {
        return Err(too_large());
    }
    let mut buf = Vec::new();
    response
        .take(max_bytes_u64.saturating_add(1))
        .read_to_end(&mut buf)
        .map_err(|_| AuthorityError::InvalidResponse("failed to read response".to_string()))?;
    if buf.len() > max_bytes {
        return Err(too_large());
    }
    Ok(buf)
}
