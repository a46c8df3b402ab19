use secrecy::SecretString;

use scriven_core::config::{AppConfig, LoadOptions};

pub fn run() -> String {
    match AppConfig::load(LoadOptions::default()) {
        Ok(config) => render(&config),
        Err(error) => format!("config: failed to load configuration\n- {error}"),
    }
}

fn render(config: &AppConfig) -> String {
    let mut lines = Vec::new();
    lines.push("config: effective configuration (secrets redacted)".to_string());

    lines.push(format!("- automation.base_url = {}", config.automation.base_url));
    lines.push(format!("- automation.timeout_secs = {}", config.automation.timeout_secs));

    lines.push(format!("- backend.base_url = {}", config.backend.base_url));
    lines.push(format!(
        "- backend.email = {}",
        config.backend.email.as_deref().unwrap_or("(unset)")
    ));
    lines.push(format!("- backend.password = {}", redact(config.backend.password.as_ref())));
    lines.push(format!("- backend.entity_limit = {}", config.backend.entity_limit));

    lines.push(format!("- llm.provider = {:?}", config.llm.provider));
    lines.push(format!("- llm.model = {}", config.llm.model));
    lines.push(format!(
        "- llm.base_url = {}",
        config.llm.base_url.as_deref().unwrap_or("(unset)")
    ));
    lines.push(format!("- llm.api_key = {}", redact(config.llm.api_key.as_ref())));

    lines.push(format!(
        "- server.bind_address = {}:{}",
        config.server.bind_address, config.server.port
    ));
    lines.push(format!(
        "- server.allowed_origins = {}",
        config.server.allowed_origins.join(", ")
    ));
    lines.push(format!("- server.max_upload_mb = {}", config.server.max_upload_mb));

    lines.push(format!("- logging.level = {}", config.logging.level));
    lines.push(format!("- logging.format = {:?}", config.logging.format));

    lines.join("\n")
}

fn redact(secret: Option<&SecretString>) -> &'static str {
    match secret {
        Some(_) => "(redacted)",
        None => "(unset)",
    }
}

#[cfg(test)]
mod tests {
    use scriven_core::config::AppConfig;

    use super::render;

    #[test]
    fn render_never_exposes_secret_values() {
        let mut config = AppConfig::default();
        config.backend.email = Some("assistant@example.com".to_string());
        config.backend.password = Some("super-secret-password".to_string().into());
        config.llm.api_key = Some("sk-super-secret-key".to_string().into());

        let output = render(&config);

        assert!(output.contains("backend.password = (redacted)"));
        assert!(output.contains("llm.api_key = (redacted)"));
        assert!(!output.contains("super-secret-password"));
        assert!(!output.contains("sk-super-secret-key"));
    }

    #[test]
    fn render_lists_every_section() {
        let output = render(&AppConfig::default());
        for section in ["automation.", "backend.", "llm.", "server.", "logging."] {
            assert!(output.contains(section), "missing section {section}");
        }
    }
}
