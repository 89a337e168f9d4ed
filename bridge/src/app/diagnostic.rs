//! `--diagnostic` report

use colored::Colorize;

use crate::app::options::AppOptions;
use crate::errors::BridgeError;
use crate::jenkins::client::{JenkinsApi, JenkinsClient};
use crate::jenkins::diagnose::HostDiagnostics;
use crate::jenkins::health;
use crate::utils::version_info;

/// Probe the configured job server and print a report to stdout
pub async fn run_diagnostic(options: &AppOptions) -> Result<(), BridgeError> {
    let client = JenkinsClient::new(&options.jenkins.server, options.jenkins.request_timeout)?;
    let reachable = health::is_reachable(&client).await;
    let diagnostics = client.diagnose_host().await;

    println!("{}", render(options, reachable, &diagnostics));
    Ok(())
}

fn render(options: &AppOptions, reachable: bool, diagnostics: &HostDiagnostics) -> String {
    let version = version_info();
    let mut lines = vec![
        format!("{} {}", "jobbridge".bold(), version.version),
        format!("  server:       {}", options.jenkins.server),
    ];

    lines.push(format!("  liveness:     {}", status(reachable, "403 as expected", "no 403")));

    let resolved = if diagnostics.resolved.is_empty() {
        diagnostics
            .resolve_error
            .clone()
            .unwrap_or_else(|| "no addresses".to_string())
    } else {
        diagnostics
            .resolved
            .iter()
            .map(|ip| ip.to_string())
            .collect::<Vec<_>>()
            .join(", ")
    };
    lines.push(format!(
        "  resolve:      {} {}",
        status(!diagnostics.resolved.is_empty(), "ok", "failed"),
        resolved
    ));
    lines.push(format!(
        "  reverse dns:  {}",
        diagnostics.reverse_dns.as_deref().unwrap_or("-")
    ));
    lines.push(format!(
        "  ping:         {}",
        status(diagnostics.ping_reachable, "reachable", "unreachable")
    ));
    lines.push(format!("  http probe:   {}", diagnostics.http_probe));

    lines.join("\n")
}

fn status(ok: bool, good: &str, bad: &str) -> String {
    if ok {
        good.green().to_string()
    } else {
        bad.red().to_string()
    }
}
