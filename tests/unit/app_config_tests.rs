/*!
 * Tests for configuration parsing and validation
 */

use subtrad::app_config::{Config, ProviderConfig, TranslationProvider};

#[test]
fn test_minimal_json_should_fill_defaults() {
    let json = r#"{
        "source_language": "auto",
        "target_language": "fr",
        "translation": { "provider": "libretranslate" }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();

    assert_eq!(config.translation.provider, TranslationProvider::LibreTranslate);
    assert_eq!(config.translation.common.retry_count, 3);
    assert_eq!(config.translation.get_endpoint(), "http://127.0.0.1:5000");
    assert!(config.validate().is_ok());
}

#[test]
fn test_provider_entry_should_override_defaults() {
    let json = r#"{
        "source_language": "en",
        "target_language": "es",
        "translation": {
            "provider": "google_free",
            "available_providers": [
                { "type": "google_free", "endpoint": "http://localhost:9000", "max_lines_per_batch": 5 }
            ]
        }
    }"#;
    let config: Config = serde_json::from_str(json).unwrap();
    let active = config.translation.get_active_provider_config();

    assert_eq!(active.max_lines_per_batch, 5);
    assert_eq!(config.translation.get_endpoint(), "http://localhost:9000");
}

#[test]
fn test_engine_thresholds_should_differ_per_provider() {
    let google_batch = ProviderConfig::new(TranslationProvider::GoogleBatch);
    let google_free = ProviderConfig::new(TranslationProvider::GoogleFree);

    assert_eq!((google_batch.max_lines_per_batch, google_batch.max_chars_per_batch), (60, 1400));
    assert_eq!((google_free.max_lines_per_batch, google_free.max_chars_per_batch), (20, 900));
}

#[test]
fn test_validate_should_reject_bad_values() {
    let mut config = Config::default();
    config.translation.common.max_concurrent_files = 0;
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.target_language = "zz-unknown".to_string();
    assert!(config.validate().is_err());

    let mut config = Config::default();
    config.translation.available_providers[1].endpoint = "not a url".to_string();
    assert!(config.validate().is_err());
}

#[test]
fn test_provider_names_should_parse_from_config_strings() {
    for provider in TranslationProvider::ALL {
        let parsed: TranslationProvider = provider.as_config_str().parse().unwrap();
        assert_eq!(parsed, provider);
    }
    assert!("deepl".parse::<TranslationProvider>().is_err());
}
