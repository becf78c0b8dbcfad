use std::{env, fs};

use brandhub_agent::build_deps;
use brandhub_agent::config::loader::load_config;

#[test]
fn config_parsing_and_env_overrides_and_validation() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("brandhub.toml");

    let toml_content = r#"
[brand]
scope_id = "brandA"
auth_token = "secret"

[api]
base_url = "https://api.example.com/v1"
request_timeout_ms = 8000

[channel]
url = "wss://push.example.com/ws"

[audio]
enabled = true
command = "paplay"
args = ["/usr/share/sounds/{kind}.oga"]

[notifications]
fallback_delay_ms = 100

[logging]
level = "debug"
"#;
    fs::write(&path, toml_content).expect("write toml");

    // 1) Valid config parses
    let cfg = load_config(path.to_str()).expect("should parse config");
    assert_eq!(cfg.brand.scope_id.as_deref(), Some("brandA"));
    assert_eq!(cfg.api.request_timeout_ms, Some(8000));
    assert_eq!(cfg.notifications.fallback_delay_ms, 100);
    assert_eq!(cfg.notifications.audio_timeout_ms, 5000);
    assert_eq!(cfg.audio.args.len(), 1);
    assert_eq!(cfg.logging.level, "debug");
    assert!(build_deps(&cfg).is_ok());

    // 2) Env override should win over file
    unsafe {
        env::set_var("BRANDHUB__NOTIFICATIONS__FALLBACK_DELAY_MS", "400");
    }
    let cfg_env = load_config(path.to_str()).expect("should parse config with env overrides");
    assert_eq!(cfg_env.notifications.fallback_delay_ms, 400);
    unsafe {
        env::remove_var("BRANDHUB__NOTIFICATIONS__FALLBACK_DELAY_MS");
    }

    // 3) Invalid values are rejected
    let bad = dir.path().join("bad.toml");
    fs::write(
        &bad,
        r#"
[channel]
url = "https://push.example.com/ws"
"#,
    )
    .expect("write bad toml");
    let err = load_config(bad.to_str()).expect_err("http channel url must be rejected");
    assert!(err.contains("channel.url"), "unexpected error: {err}");
}

#[test]
fn missing_file_falls_back_to_defaults() {
    let dir = tempfile::tempdir().expect("tmp dir");
    let path = dir.path().join("absent.toml");

    let cfg = load_config(path.to_str()).expect("defaults should be valid");
    assert_eq!(cfg.api.base_url, "http://localhost:3000/api");
    assert_eq!(cfg.channel.url, "ws://localhost:3000/ws");
    assert!(!cfg.audio.enabled);
}
