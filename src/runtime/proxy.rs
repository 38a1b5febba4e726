//! IDE-level HTTP proxy applied per attempt

use crate::command::{Command, config_option};
use crate::config::SvnConfig;

/// Proxy host, port and exceptions for `url`, when a configured proxy applies to it.
pub fn runtime_parameters(config: &SvnConfig, url: Option<&str>) -> Vec<String> {
    let Some(proxy) = config.proxy.as_ref() else {
        return Vec::new();
    };
    let Some(host) = http_host(url) else {
        return Vec::new();
    };
    if !proxy.applies_to(&host) {
        return Vec::new();
    }

    let mut parameters = vec![
        "--config-option".to_string(),
        config_option("servers", "global", "http-proxy-host", &proxy.host),
        "--config-option".to_string(),
        config_option("servers", "global", "http-proxy-port", &proxy.port.to_string()),
    ];
    if !proxy.exceptions.is_empty() {
        parameters.push("--config-option".to_string());
        parameters.push(config_option(
            "servers",
            "global",
            "http-proxy-exceptions",
            &proxy.exceptions.join(","),
        ));
    }
    parameters
}

/// Configured proxy credentials, passed as masked options.
pub fn put_credentials(config: &SvnConfig, command: &mut Command) {
    let Some(proxy) = config.proxy.as_ref() else {
        return;
    };
    let applies = http_host(command.get_repository_url()).is_some_and(|host| proxy.applies_to(&host));
    if !applies {
        return;
    }
    if let Some(username) = &proxy.username {
        command.put_config_option(
            config_option("servers", "global", "http-proxy-username", username),
            true,
        );
    }
    if let Some(password) = &proxy.password {
        command.put_config_option(
            config_option("servers", "global", "http-proxy-password", password),
            true,
        );
    }
}

fn http_host(url: Option<&str>) -> Option<String> {
    let url = url::Url::parse(url?).ok()?;
    matches!(url.scheme(), "http" | "https")
        .then(|| url.host_str().map(str::to_string))
        .flatten()
}
