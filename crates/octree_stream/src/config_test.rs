use super::*;

#[test]
fn test_empty_config_is_default() {
  let config = StreamConfig::from_toml_str("").unwrap();
  assert_eq!(config, StreamConfig::default());
  assert_eq!(config.lod, LodProfile::DESKTOP);
  assert_eq!(config.budget, RequestBudget::DEFAULT);
  assert!(config.decode.filter_highlighted);
  assert_eq!(config.failure, FailurePolicy::UNLIMITED);
}

#[test]
fn test_partial_tables_keep_defaults() {
  let config = StreamConfig::from_toml_str(
    r#"
    [lod]
    split_threshold = 300.0

    [budget]
    max_in_flight = 4

    [decode]
    hidden_objects = [40, 12, 40]
    filter_highlighted = false

    [failure]
    max_attempts = 3
    "#,
  )
  .unwrap();

  assert_eq!(config.lod.split_threshold, 300.0);
  assert_eq!(config.lod.tolerance_scale, 128.0);
  assert_eq!(config.budget.max_in_flight, 4);
  assert_eq!(config.budget.max_new_per_frame, 8);
  assert_eq!(config.decode.hidden_objects, vec![12, 40]);
  assert!(config.decode.is_hidden(12));
  assert!(!config.decode.filter_highlighted);
  assert_eq!(config.failure.max_attempts, 3);
}

#[test]
fn test_invalid_config() {
  let err = StreamConfig::from_toml_str("[budget]\nmax_in_flight = \"many\"").unwrap_err();
  assert!(matches!(err, ConfigError::Parse(_)));
}

#[test]
fn test_missing_file() {
  let err = StreamConfig::load("/definitely/not/here/stream.toml").unwrap_err();
  assert!(matches!(err, ConfigError::Io(_)));
}

#[test]
fn test_mobile() {
  let config = StreamConfig::mobile();
  assert_eq!(config.lod, LodProfile::MOBILE);
  assert_eq!(config.budget, RequestBudget::default());
}
