//! Tunnel command for `svn+ssh://` repositories

use crate::command::config_option;
use crate::config::SvnConfig;

const SSH_SCHEME: &str = "svn+ssh://";

pub fn runtime_parameters(config: &SvnConfig, url: Option<&str>) -> Vec<String> {
    let (Some(ssh), Some(url)) = (config.ssh.as_ref(), url) else {
        return Vec::new();
    };
    if !url.to_ascii_lowercase().starts_with(SSH_SCHEME) {
        return Vec::new();
    }
    vec![
        "--config-option".to_string(),
        config_option("config", "tunnels", "ssh", &ssh.tunnel_command()),
    ]
}
