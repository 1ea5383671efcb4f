use std::fs;

use relay_engine::{AutomationConfig, ConfigError};
use tempfile::TempDir;

#[test]
fn partial_config_keeps_defaults() {
    let config = AutomationConfig::from_ron_str(
        r#"(
            timings: (max_step_attempts: 3, retry_base_ms: 250),
            harvest: (no_growth_threshold: 2),
            target: (send_label: "Send"),
        )"#,
    )
    .unwrap();

    assert_eq!(config.timings.max_step_attempts, 3);
    assert_eq!(config.timings.retry_base_ms, 250);
    assert_eq!(config.timings.share_max_polls, 10);
    assert_eq!(config.harvest.no_growth_threshold, 2);
    assert_eq!(config.harvest.iteration_budget, 500);
    assert_eq!(config.target.send_label, "Send");
    assert_eq!(config.target.package, "com.tencent.mm");
}

#[test]
fn invalid_values_are_rejected() {
    let inverted = AutomationConfig::from_ron_str("(harvest: (swipe_from: 0.2, swipe_to: 0.8))");
    assert!(matches!(inverted, Err(ConfigError::Invalid(_))));

    let zero = AutomationConfig::from_ron_str("(timings: (max_step_attempts: 0))");
    assert!(matches!(zero, Err(ConfigError::Invalid(_))));

    let garbage = AutomationConfig::from_ron_str("(timings: [1, 2])");
    assert!(matches!(garbage, Err(ConfigError::Parse(_))));
}

#[test]
fn load_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("relay.ron");
    assert!(matches!(
        AutomationConfig::load(&path),
        Err(ConfigError::Io { .. })
    ));

    fs::write(&path, "()").unwrap();
    assert_eq!(AutomationConfig::load(&path).unwrap(), AutomationConfig::default());
}
