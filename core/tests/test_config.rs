#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nxgzip_core::{
        config::{JobConfig, PollConfig, DEFAULT_MAX_RETRIES, DEFAULT_TIMEOUT_MS},
        error::ConfigError,
    };

    #[test]
    fn test_empty_json_gives_defaults() {
        let cfg = JobConfig::from_json("{}").unwrap();
        assert_eq!(cfg, JobConfig::default());
        assert_eq!(cfg.timeout(), Duration::from_millis(DEFAULT_TIMEOUT_MS));
        assert_eq!(cfg.max_retries, DEFAULT_MAX_RETRIES);
        assert_eq!(cfg.poll, PollConfig::default());
    }

    #[test]
    fn test_partial_json_overrides() {
        let cfg = JobConfig::from_json(
            r#"{ "timeout_ms": 250, "notify": true, "completion_method": 2, "poll": { "max_sleep_us": 50 } }"#,
        )
        .unwrap();
        assert_eq!(cfg.timeout(), Duration::from_millis(250));
        assert!(cfg.notify);
        assert_eq!(cfg.completion_method, 2);
        assert_eq!(cfg.poll.max_sleep(), Duration::from_micros(50));
        assert!(!cfg.limit_select);
    }

    #[test]
    fn test_invalid_settings_rejected() {
        for text in [
            r#"{ "timeout_ms": 0 }"#,
            r#"{ "notify": true, "completion_method": 8 }"#,
            r#"{ "completion_method": 1 }"#,
            r#"{ "max_stream_steps": 0 }"#,
        ] {
            assert!(matches!(JobConfig::from_json(text), Err(ConfigError::Invalid(_))), "{}", text);
        }
        assert!(matches!(JobConfig::from_json("{ nope"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_oversized_timeout_saturates() {
        let cfg = JobConfig::default().with_timeout(Duration::MAX);
        assert_eq!(cfg.timeout_ms, u64::MAX);
        assert_eq!(cfg.timeout(), Duration::from_millis(u64::MAX));

        let cfg = JobConfig::default().with_timeout(Duration::from_secs(u64::MAX / 1_000 + 1));
        assert_eq!(cfg.timeout_ms, u64::MAX);

        let cfg = JobConfig::default().with_timeout(Duration::from_micros(1_500_999));
        assert_eq!(cfg.timeout_ms, 1_500);
    }

    #[test]
    fn test_builders_and_json_round_trip() {
        let cfg = JobConfig::default()
            .with_timeout(Duration::from_millis(10))
            .with_max_retries(0);
        assert!(cfg.validate().is_ok());
        let text = serde_json::to_string(&cfg).unwrap();
        assert_eq!(JobConfig::from_json(&text).unwrap(), cfg);
    }
}
