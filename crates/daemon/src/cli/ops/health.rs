use clap::Args;

use privy_daemon::state::{CONFIG_FILE_NAME, KEY_FILE_NAME};

#[derive(Args, Debug, Clone)]
pub struct Health;

#[async_trait::async_trait]
impl crate::cli::op::Op for Health {
    // Problems are reported in the output, never as a failure
    type Error = std::convert::Infallible;

    async fn execute(&self, ctx: &crate::cli::op::OpContext) -> Result<String, Self::Error> {
        let mut lines = Vec::new();

        // 1. Check config directory
        lines.push("Config:".to_string());
        match ctx.app_state() {
            Ok(state) => {
                lines.push(format!("  directory:    {}", state.privy_dir.display()));
                lines.push(format!("  {}:  OK", CONFIG_FILE_NAME));
                match state.load_key() {
                    Ok(_) => lines.push(format!("  {}:     OK", KEY_FILE_NAME)),
                    Err(e) => lines.push(format!("  {}:     {}", KEY_FILE_NAME, e)),
                }
                let private_dir = &state.config.private_base_dir;
                let status = if private_dir.is_dir() { "OK" } else { "MISSING" };
                lines.push(format!(
                    "  private dir:  {} ({})",
                    private_dir.display(),
                    status
                ));
                lines.push(format!("  sessions:     {}", state.config.sessions.len()));
                lines.push(format!("  api_port:     {}", state.config.api_port));
                lines.push(format!("  gateway_port: {}", state.config.gateway_port));
            }
            Err(e) => {
                lines.push(format!("  error: {}", e));
            }
        }

        // 2. Check daemon liveness and readiness
        let base = ctx.client.base_url();
        let client = ctx.client.http_client();

        lines.push(String::new());
        lines.push(format!("Daemon ({}):", base));

        for check in ["livez", "readyz"] {
            let url = format!(
                "{}/_status/{}",
                base.as_str().trim_end_matches('/'),
                check
            );
            let status = match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => "OK".to_string(),
                Ok(resp) => format!("UNHEALTHY ({})", resp.status()),
                Err(_) => "NOT REACHABLE".to_string(),
            };
            lines.push(format!("  {:<7} {}", format!("{}:", check), status));
        }

        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::cli::op::{Op, OpContext};

    #[tokio::test]
    async fn test_problems_are_reported_not_raised() {
        let temp = tempfile::TempDir::new().unwrap();
        let ctx = OpContext::new(
            Some(Url::parse("http://127.0.0.1:1").unwrap()),
            Some(temp.path().join("absent")),
        )
        .unwrap();

        let report = match Health.execute(&ctx).await {
            Ok(report) => report,
            Err(never) => match never {},
        };
        assert!(report.contains("  error: "));
        assert!(report.contains("NOT REACHABLE"));
    }
}
