use std::path::PathBuf;
use std::time::Duration;

use archive_engine::{CrawlConfig, PollSettings};
use crawl_logging::LogDestination;
use log::LevelFilter;
use tempfile::TempDir;

#[test]
fn defaults_match_the_archive_site() {
    let config = CrawlConfig::default();
    let fetch = config.fetch_settings();
    assert_eq!(fetch.endpoint, "http://eais.tatar.ru/Pages/ImageFilePart.ashx");
    assert_eq!(fetch.attempts, 5);
    assert_eq!(fetch.request_timeout, Duration::from_secs(120));
    assert_eq!(config.poll_settings(), PollSettings::default());
    assert_eq!(config.max_document_pages, 3000);
    assert_eq!(config.log_destination(), LogDestination::Terminal);
}

#[test]
fn partial_ron_keeps_defaults_for_missing_fields() {
    let config = CrawlConfig::from_ron_str(
        r#"(
            output_dir: "archive",
            proxy: Some("127.0.0.1:9050"),
            poll_interval_ms: 250,
            log_level: "debug",
            log_file: Some("crawl.log"),
        )"#,
    )
    .unwrap();

    assert_eq!(config.output_dir, PathBuf::from("archive"));
    assert_eq!(config.fetch_settings().proxy.as_deref(), Some("127.0.0.1:9050"));
    assert_eq!(
        config.poll_settings(),
        PollSettings {
            timeout: Duration::from_secs(10),
            interval: Duration::from_millis(250),
        }
    );
    assert_eq!(config.download_attempts, 5);
    assert_eq!(config.log_level(), LevelFilter::Debug);
    assert_eq!(
        config.log_destination(),
        LogDestination::Both(PathBuf::from("crawl.log"))
    );
}

#[test]
fn unknown_log_level_falls_back_to_info() {
    let config = CrawlConfig {
        log_level: "chatty".to_string(),
        ..CrawlConfig::default()
    };
    assert_eq!(config.log_level(), LevelFilter::Info);
}

#[test]
fn malformed_config_is_an_error() {
    assert!(CrawlConfig::from_ron_str("(output_dir: 5").is_err());
}

#[test]
fn config_is_loaded_from_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("crawler.ron");
    std::fs::write(&path, "(download_attempts: 2, max_document_pages: 50)").unwrap();

    let config = CrawlConfig::load(&path).unwrap();
    assert_eq!(config.download_attempts, 2);
    assert_eq!(config.max_document_pages, 50);

    assert!(CrawlConfig::load(&temp.path().join("missing.ron")).is_err());
}
