//! Origin allow-list guard for `/mcp`, preventing DNS-rebinding attacks
//! against browser-hosted clients.

use url::Url;

use crate::error::TransportError;

const DEV_HOSTS: &[&str] = &["localhost", "127.0.0.1"];
const DEV_PORTS: &[&str] = &["3000", "3001"];

/// Check an incoming `Origin` header against the allow-list.
///
/// Requests with no `Origin` header are always allowed (stdio-like or
/// same-process clients never send one). `production_host`, when given,
/// extends the allow-list to that exact host in production.
pub fn check_origin(origin: Option<&str>, production: bool, production_host: Option<&str>) -> Result<(), TransportError> {
    let Some(origin) = origin else {
        return Ok(());
    };

    let parsed = Url::parse(origin).map_err(|_| TransportError::InvalidOrigin)?;
    let host = parsed.host_str().unwrap_or_default();
    let port = parsed.port().map(|p| p.to_string());

    let is_dev_origin = DEV_HOSTS.contains(&host)
        && matches!(parsed.scheme(), "http" | "https")
        && port.as_deref().is_none_or(|p| DEV_PORTS.contains(&p));

    if is_dev_origin {
        return Ok(());
    }

    if production {
        if let Some(expected_host) = production_host {
            if host == expected_host {
                return Ok(());
            }
        }
    }

    Err(TransportError::InvalidOrigin)
}
