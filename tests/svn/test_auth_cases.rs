//! Auth callback case selection and command amendment.

use kodegen_tools_svn::{
    AuthCallbackCase, AuthCategory, Command, Credentials, ProxySettings, SvnCommandName,
    SvnConfig, Target,
};

use super::support::RecordingService;

const URL: &str = "https://svn.example.com/repo";

fn samples() -> Vec<(AuthCategory, &'static str)> {
    vec![
        (
            AuthCategory::CertificateTrust,
            "svn: E230001: Server SSL certificate verification failed: issuer is not trusted",
        ),
        (
            AuthCategory::Proxy,
            "svn: E175002: Could not authenticate to proxy server",
        ),
        (
            AuthCategory::TwoWaySsl,
            "svn: E175013: Access to '/repo/trunk' forbidden",
        ),
        (
            AuthCategory::UsernamePassword,
            "svn: E170001: Authentication failed",
        ),
        (
            AuthCategory::Passphrase,
            "Authentication realm: <https://svn.example.com:443> Example\nPassphrase for '/home/me/client.p12':",
        ),
        (
            AuthCategory::CredentialsByRealm,
            "Authentication realm: <svn://svn.example.com:3690> Example",
        ),
        (
            AuthCategory::ServerUnavailable,
            "svn: E000111: Can't connect to host 'svn.example.com': Connection refused",
        ),
    ]
}

#[test]
fn test_each_sample_selects_its_category() {
    for (category, text) in samples() {
        let case = AuthCallbackCase::select(text, Some(URL), false).unwrap();
        assert_eq!(case.category(), category, "sample: {text}");
        assert_eq!(case.url(), Some(URL));
    }
}

#[test]
fn test_selection_does_not_depend_on_sample_order() {
    let forward: Vec<_> = samples()
        .iter()
        .map(|(_, text)| AuthCallbackCase::select(text, None, false).map(|c| c.category()))
        .collect();
    let mut reversed: Vec<_> = samples()
        .iter()
        .rev()
        .map(|(_, text)| AuthCallbackCase::select(text, None, false).map(|c| c.category()))
        .collect();
    reversed.reverse();
    assert_eq!(forward, reversed);
}

#[test]
fn test_terminal_mode_leaves_certificates_to_the_client() {
    let text = "svn: E230001: Server SSL certificate verification failed: issuer is not trusted";
    assert!(AuthCallbackCase::select(text, Some(URL), true).is_none());
    assert!(!AuthCategory::candidates(true).contains(&AuthCategory::CertificateTrust));
    assert_eq!(AuthCategory::candidates(false)[0], AuthCategory::CertificateTrust);
}

#[test]
fn test_unrelated_error_selects_nothing() {
    let text = "svn: E155007: '/tmp/x' is not a working copy";
    assert!(AuthCallbackCase::select(text, Some(URL), false).is_none());
}

#[test]
fn test_username_password_grant_sets_credentials_only() {
    let text = "svn: E170001: Authentication failed";
    let mut case = AuthCallbackCase::select(text, Some(URL), false).unwrap();
    let service = RecordingService::granting("u", "p");
    assert!(case.acquire_credentials(&service, text));

    let mut command = Command::new(SvnCommandName::Update).target(Target::path("/wc"));
    case.update_parameters(&mut command, &SvnConfig::default());

    assert_eq!(command.get_credentials(), Some(&Credentials::new("u", "p")));
    assert!(!command.get_parameters().iter().any(|p| p == "--config-option"));
}

#[test]
fn test_certificate_trust_forces_non_interactive() {
    let text = "svn: E230001: Server SSL certificate untrusted";
    let mut case = AuthCallbackCase::select(text, Some(URL), false).unwrap();
    let service = RecordingService {
        accept_certificates: true,
        ..RecordingService::default()
    };
    assert!(case.acquire_credentials(&service, text));
    assert_eq!(case.grant_fingerprint(), Some(0));

    let mut command = Command::new(SvnCommandName::Update);
    case.update_parameters(&mut command, &SvnConfig::default());
    assert!(command.get_parameters().iter().any(|p| p == "--trust-server-cert"));
    assert!(command.is_non_interactive());
}

#[test]
fn test_proxy_grant_uses_server_group_for_configured_proxy() {
    let text = "svn: E175002: Proxy authentication failed";
    let mut case = AuthCallbackCase::select(text, Some(URL), false).unwrap();
    let service = RecordingService::granting("proxy-user", "proxy-secret");
    assert!(case.acquire_credentials(&service, text));

    let config = SvnConfig::default().with_proxy(ProxySettings::new("proxy.local", 3128));
    let mut command = Command::new(SvnCommandName::Update);
    case.update_parameters(&mut command, &config);

    let parameters = command.get_parameters();
    assert!(parameters.contains(&"servers:groups:group_svn_example_com=svn.example.com".to_string()));
    assert!(parameters.contains(&"servers:group_svn_example_com:http-proxy-host=proxy.local".to_string()));
    assert!(parameters.contains(&"servers:group_svn_example_com:http-proxy-port=3128".to_string()));
    let logged = command.to_string();
    assert!(logged.contains("http-proxy-password=******"));
    assert!(!logged.contains("proxy-secret"));
}

#[test]
fn test_denied_case_leaves_command_untouched() {
    let text = "svn: E170001: Authentication failed";
    let mut case = AuthCallbackCase::select(text, Some(URL), false).unwrap();
    assert!(!case.acquire_credentials(&RecordingService::denying(), text));
    assert_eq!(case.grant_fingerprint(), None);

    let mut command = Command::new(SvnCommandName::Update);
    case.update_parameters(&mut command, &SvnConfig::default());
    assert!(command.get_credentials().is_none());
    assert!(command.get_parameters().is_empty());
}
