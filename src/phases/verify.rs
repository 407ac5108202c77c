//! Best-effort verification: version queries, service-active queries and a
//! liveness probe against the freshly started API.
//!
//! Everything here is diagnostic. Failures downgrade to warnings and never
//! change the final exit code.

use std::time::Duration;

use anyhow::{Context, Result, anyhow};

use crate::command::{CommandRunner, run_lenient};
use crate::config::ProvisionConfig;
use crate::phases::PhaseOutcome;
use crate::report::Reporter;

pub async fn run(
    runner: &dyn CommandRunner,
    cfg: &ProvisionConfig,
    report: &mut Reporter,
) -> PhaseOutcome {
    let before = report.warnings().len();

    query_versions(runner, report);

    for service in ["nginx", cfg.service_name.as_str()] {
        if crate::systemd::control::is_active(runner, service) {
            report.success(&format!("{service} is active"));
        } else {
            report.warn(format!("{service} is not active"));
        }
    }

    if cfg.auto_start {
        // Let the service bind its port before probing
        tokio::time::sleep(cfg.settle_delay).await;
        match probe_liveness(&cfg.liveness_url(), cfg.probe_timeout).await {
            Ok(status) => report.success(&format!(
                "liveness probe returned HTTP {status} from {}",
                cfg.liveness_url()
            )),
            Err(e) => report.warn(format!("liveness probe failed: {e}")),
        }
    }

    PhaseOutcome::from_warning_count(before, report.warnings().len())
}

fn query_versions(runner: &dyn CommandRunner, report: &mut Reporter) {
    // nginx reports its version on stderr
    for (program, args) in [
        ("nginx", ["-v"].as_slice()),
        ("python3", ["--version"].as_slice()),
        ("certbot", ["--version"].as_slice()),
    ] {
        match run_lenient(runner, program, args) {
            Ok(output) => report.info(&output.combined()),
            Err(msg) => report.warn(format!("version query failed: {msg}")),
        }
    }
}

/// Probe the API's root endpoint once. Any 2xx/3xx counts as alive.
pub async fn probe_liveness(url: &str, request_timeout: Duration) -> Result<u16> {
    let client = reqwest::Client::builder()
        .timeout(request_timeout)
        .build()?;
    let response = client
        .get(url)
        .send()
        .await
        .with_context(|| format!("no response from {url}"))?;

    let status = response.status();
    if status.is_success() || status.is_redirection() {
        Ok(status.as_u16())
    } else {
        Err(anyhow!("{url} answered HTTP {status}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_probe_accepts_success() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(200).body("{\"status\":\"ok\"}");
            })
            .await;

        let status = probe_liveness(&server.url("/"), Duration::from_secs(2))
            .await
            .unwrap();
        assert_eq!(status, 200);
    }

    #[tokio::test]
    async fn test_probe_rejects_server_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/");
                then.status(502);
            })
            .await;

        let err = probe_liveness(&server.url("/"), Duration::from_secs(2))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("502"));
    }

    #[tokio::test]
    async fn test_probe_unreachable_endpoint() {
        // Port 9 (discard) is virtually never listening
        let err = probe_liveness("http://127.0.0.1:9/", Duration::from_millis(500))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no response"));
    }
}
