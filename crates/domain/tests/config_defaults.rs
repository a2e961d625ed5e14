//! Config tree defaults and TOML round-trips.

use fd_domain::config::{Config, ConfigSeverity};

#[test]
fn empty_toml_gives_usable_defaults() {
    let cfg: Config = toml::from_str("").unwrap();
    assert_eq!(cfg.server.port, 8090);
    assert_eq!(cfg.server.host, "127.0.0.1");
    assert_eq!(cfg.llm.providers.len(), 1);
    assert_eq!(cfg.mcp.tools_path.to_str(), Some("tools.json"));
    assert_eq!(cfg.sessions.max_entries, 1024);
}

#[test]
fn default_config_validates_clean() {
    let cfg = Config::default();
    let errors: Vec<_> = cfg
        .validate()
        .into_iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .collect();
    assert!(errors.is_empty(), "unexpected errors: {errors:?}");
}

#[test]
fn zero_port_is_rejected() {
    let cfg: Config = toml::from_str(
        r#"
        [server]
        port = 0
        "#,
    )
    .unwrap();
    let issues = cfg.validate();
    assert!(issues
        .iter()
        .any(|e| e.severity == ConfigSeverity::Error && e.field == "server.port"));
}

#[test]
fn missing_provider_is_an_error() {
    let cfg: Config = toml::from_str(
        r#"
        [llm]
        providers = []
        "#,
    )
    .unwrap();
    let issues = cfg.validate();
    assert!(issues
        .iter()
        .any(|e| e.severity == ConfigSeverity::Error && e.field == "llm.providers"));
}

#[test]
fn wildcard_cors_is_a_warning_not_an_error() {
    let cfg: Config = toml::from_str(
        r#"
        [server.cors]
        allowed_origins = ["*"]
        "#,
    )
    .unwrap();
    let issues = cfg.validate();
    assert!(issues
        .iter()
        .any(|e| e.severity == ConfigSeverity::Warning
            && e.field == "server.cors.allowed_origins"));
    assert!(!issues.iter().any(|e| e.severity == ConfigSeverity::Error));
}

#[test]
fn full_config_roundtrips_through_toml() {
    let toml_str = r#"
        [server]
        port = 9000
        host = "0.0.0.0"

        [[llm.providers]]
        id = "openai"
        base_url = "https://api.openai.com/v1"
        default_model = "gpt-4o-mini"

        [mcp]
        tools_path = "conf/tools.json"

        [sessions]
        max_entries = 64
        idle_ttl_secs = 3600
    "#;
    let cfg: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(cfg.server.port, 9000);
    assert_eq!(cfg.mcp.tools_path.to_str(), Some("conf/tools.json"));
    assert_eq!(cfg.sessions.max_entries, 64);

    let serialized = toml::to_string(&cfg).unwrap();
    let reparsed: Config = toml::from_str(&serialized).unwrap();
    assert_eq!(reparsed.server.port, 9000);
    assert_eq!(reparsed.sessions.idle_ttl_secs, 3600);
}
