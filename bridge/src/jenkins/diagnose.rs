//! Host diagnostics for an unreachable job server
//!
//! Nothing here is retried or repaired. The collected facts are attached to
//! the dispatch error so an operator can see why the host could not be reached.

use std::fmt;
use std::future::Future;
use std::net::IpAddr;
use std::process::Stdio;
use std::time::Duration;

use anyhow::Context;
use serde::Serialize;
use tokio::process::Command;
use tracing::debug;

const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Facts gathered about a job server host
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HostDiagnostics {
    pub host: String,

    /// Addresses the host resolved to, empty when resolution failed
    pub resolved: Vec<IpAddr>,

    pub resolve_error: Option<String>,

    /// Name the first resolved address maps back to
    pub reverse_dns: Option<String>,

    pub ping_reachable: bool,

    /// Outcome of a plain GET against the server root
    pub http_probe: String,
}

impl fmt::Display for HostDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let resolved = if self.resolved.is_empty() {
            self.resolve_error
                .clone()
                .unwrap_or_else(|| "no addresses".to_string())
        } else {
            self.resolved
                .iter()
                .map(|ip| ip.to_string())
                .collect::<Vec<_>>()
                .join(", ")
        };
        write!(
            f,
            "host={} resolved=[{}] reverse_dns={} ping={} http_probe={}",
            self.host,
            resolved,
            self.reverse_dns.as_deref().unwrap_or("none"),
            if self.ping_reachable { "reachable" } else { "unreachable" },
            self.http_probe,
        )
    }
}

/// Gather diagnostics for `host`.
///
/// `http_probe` is awaited alongside the other probes and its text recorded.
pub async fn collect<P>(host: &str, port: u16, http_probe: P) -> HostDiagnostics
where
    P: Future<Output = String>,
{
    let (resolution, ping_reachable, http_probe) =
        futures::join!(resolve(host, port), ping(host), http_probe);

    let (resolved, resolve_error) = match resolution {
        Ok(addrs) => (addrs, None),
        Err(e) => (Vec::new(), Some(format!("{:#}", e))),
    };

    let reverse_dns = match resolved.first() {
        Some(ip) => match reverse_lookup(*ip).await {
            Ok(name) => name,
            Err(e) => {
                debug!("Reverse lookup for {} failed: {:#}", ip, e);
                None
            }
        },
        None => None,
    };

    let ping_reachable = match ping_reachable {
        Ok(reachable) => reachable,
        Err(e) => {
            debug!("Ping of {} failed to run: {:#}", host, e);
            false
        }
    };

    HostDiagnostics {
        host: host.to_string(),
        resolved,
        resolve_error,
        reverse_dns,
        ping_reachable,
        http_probe,
    }
}

async fn resolve(host: &str, port: u16) -> anyhow::Result<Vec<IpAddr>> {
    let addrs = tokio::time::timeout(PROBE_TIMEOUT, tokio::net::lookup_host((host, port)))
        .await
        .context("DNS lookup timed out")?
        .with_context(|| format!("DNS lookup for {} failed", host))?;

    let mut ips: Vec<IpAddr> = addrs.map(|addr| addr.ip()).collect();
    ips.dedup();
    Ok(ips)
}

async fn reverse_lookup(ip: IpAddr) -> anyhow::Result<Option<String>> {
    let output = tokio::time::timeout(
        PROBE_TIMEOUT,
        Command::new("getent")
            .args(["hosts", &ip.to_string()])
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output(),
    )
    .await
    .context("getent timed out")?
    .context("failed to run getent")?;

    if !output.status.success() {
        return Ok(None);
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    Ok(parse_getent_name(&stdout))
}

fn parse_getent_name(stdout: &str) -> Option<String> {
    stdout
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .map(|name| name.to_string())
}

async fn ping(host: &str) -> anyhow::Result<bool> {
    let status = tokio::time::timeout(
        PROBE_TIMEOUT,
        Command::new("ping")
            .args(["-c", "1", "-W", "2", host])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status(),
    )
    .await
    .context("ping timed out")?
    .context("failed to run ping")?;

    Ok(status.success())
}
