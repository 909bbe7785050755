#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use devicehub_server::config::{self, StorageBackend};

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
server:
  listen: "0.0.0.0:8080"
storage:
  backend: memory
  max_conections: 5 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.client_code().as_str(), "BAD_REQUEST");
}

#[test]
fn ok_minimal_config() {
    let ok = r#"
version: 1
storage:
  backend: memory
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.storage.backend, StorageBackend::Memory);
    assert_eq!(cfg.server.listen, "0.0.0.0:8080");
    assert_eq!(cfg.storage.max_connections, 10);
    assert!(cfg.cache.enabled);
    assert_eq!(cfg.cache.settings().ttl, Duration::from_secs(300));
}

#[test]
fn postgres_requires_url() {
    let bad = r#"
version: 1
storage:
  backend: postgres
"#;
    let err = config::load_from_str(bad).expect_err("must fail");
    assert!(err.to_string().contains("storage.url"));
}

#[test]
fn rejects_out_of_range_values() {
    let bad = r#"
version: 1
storage:
  backend: memory
cache:
  ttl_secs: 0
"#;
    assert!(config::load_from_str(bad).is_err());

    let bad = r#"
version: 2
storage:
  backend: memory
"#;
    assert!(config::load_from_str(bad).is_err());

    let bad = r#"
version: 1
server:
  listen: "not-an-addr"
storage:
  backend: memory
"#;
    assert!(config::load_from_str(bad).is_err());
}

#[test]
fn sample_config_parses() {
    let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../devicehub.yaml");
    let cfg = config::load_from_file(path).expect("sample config must load");
    assert_eq!(cfg.storage.backend, StorageBackend::Postgres);
    assert_eq!(cfg.storage.acquire_timeout(), Duration::from_millis(5000));
}
