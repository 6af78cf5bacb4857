//! Tests for loading configuration files

use std::io::Write;
use tempfile::NamedTempFile;
use vidir::prelude::*;

const CLIPS_YAML: &str = r#"
server:
  bind: 0.0.0.0:8080
collections:
  - name: clips
    response_key: clips
    text_fields: [title, description]
    filters:
      - { param: channel, field: channel_id }
    ranges:
      - { field: duration, min_param: duration_min, max_param: duration_max, scale: 60.0 }
    sorts:
      - key: newest
        rule: { kind: timestamp, field: created_at, descending: true }
      - key: hot
        rule: { kind: trending, count_field: views, timestamp_field: created_at }
      - key: title
        rule: { kind: lexical, field: title }
    default_sort: hot
    default_page_size: 12
    max_page_size: 48
"#;

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(content.as_bytes()).expect("write config");
    file
}

#[test]
fn test_load_from_file() {
    let file = write_config(CLIPS_YAML);
    let config = AppConfig::from_yaml_file(file.path()).expect("valid config");

    assert_eq!(config.bind_addr().expect("bind").port(), 8080);
    let clips = config.collection("clips").expect("clips declared");
    assert_eq!(clips.items_key(), "clips");
    assert_eq!(clips.default_sort, "hot");
    assert_eq!(clips.default_page_size, 12);
    assert!(matches!(clips.sort_rule("hot"), Some(SortRule::Trending { .. })));
}

#[test]
fn test_loaded_schema_drives_pipeline() {
    let file = write_config(CLIPS_YAML);
    let config = AppConfig::from_yaml_file(file.path()).expect("valid config");
    let pipeline = QueryPipeline::new(config.collection("clips").expect("clips").clone());

    let spec = pipeline.normalize([("channel", "c-9"), ("limit", "500")]);
    assert_eq!(spec.page_size, 48);
    assert_eq!(spec.sort, "hot");
    assert_eq!(spec.filters.get("channel_id"), Some(&FilterValue::Exact("c-9".to_string())));
}

#[test]
fn test_missing_file() {
    let err = AppConfig::from_yaml_file("/nonexistent/vidir.yaml").expect_err("missing file");
    assert!(matches!(err, ConfigError::Io { .. }));
}

#[test]
fn test_malformed_yaml() {
    let file = write_config("collections: [name: {");
    let err = AppConfig::from_yaml_file(file.path()).expect_err("malformed");
    assert!(matches!(err, ConfigError::Yaml(_)));
}

#[test]
fn test_undeclared_default_sort() {
    let yaml = CLIPS_YAML.replace("default_sort: hot", "default_sort: viral");
    let err = AppConfig::from_yaml_str(&yaml).expect_err("undeclared sort");

    assert!(matches!(err, ConfigError::Schema { ref collection, .. } if collection == "clips"));
    assert_eq!(
        VidirError::from(err).status_code(),
        axum::http::StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[test]
fn test_field_validation() {
    let yaml = CLIPS_YAML.replace("default_page_size: 12", "default_page_size: 0");
    let err = AppConfig::from_yaml_str(&yaml).expect_err("zero page size");
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn test_reserved_query_key() {
    let yaml = CLIPS_YAML.replace("param: channel,", "param: page,");
    let err = AppConfig::from_yaml_str(&yaml).expect_err("reserved key");
    assert!(matches!(err, ConfigError::Schema { .. }));
}

#[test]
fn test_config_builds_server() {
    let file = write_config(CLIPS_YAML);
    let config = AppConfig::from_yaml_file(file.path()).expect("valid config");
    let builder = ServerBuilder::new().with_config(&config).expect("register");

    assert!(builder.collection("clips").is_some());
    assert!(builder.collection("videos").is_none());
}
