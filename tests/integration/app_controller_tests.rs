/*!
 * Tests for the controller's file queue
 */

use anyhow::Result;
use std::sync::Arc;
use std::time::{Duration, Instant};

use subtrad::app_config::Config;
use subtrad::app_controller::{Controller, RunSummary};
use subtrad::cancellation::CancellationFlag;
use subtrad::errors::AppError;
use subtrad::file_utils::FileManager;
use subtrad::providers::mock::MockProvider;

use crate::common;

fn controller(max_concurrent_files: usize) -> Result<Controller> {
    let mut config = Config::default();
    config.source_language = "en".to_string();
    config.target_language = "es".to_string();
    config.translation.common.max_concurrent_files = max_concurrent_files;
    for provider in &mut config.translation.available_providers {
        provider.min_request_interval_ms = 0;
        provider.pause_after_batch_ms = 0;
    }
    Ok(Controller::with_config(config)?)
}

#[tokio::test]
async fn test_run_files_should_translate_queue_and_skip_existing() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let season = temp_dir.path().join("season1");
    FileManager::ensure_dir(&season)?;
    common::create_test_subtitle(temp_dir.path(), "a.srt")?;
    common::create_test_subtitle(&season, "b.srt")?;
    common::create_test_subtitle(&season, "c.srt")?;

    let controller = controller(2)?;
    let files = FileManager::find_files(temp_dir.path(), "srt")?;
    assert_eq!(files.len(), 3);

    let provider = Arc::new(MockProvider::dictionary(&[("Hello", "Hola"), ("World", "Mundo")]));
    let summary = controller.run_files(files.clone(), false, provider.clone()).await;
    assert_eq!(
        summary,
        RunSummary {
            translated: 3,
            ..RunSummary::default()
        }
    );
    for file in &files {
        assert!(controller.output_path_for(file).exists());
    }

    // outputs live in Subtitles_es directories, which discovery skips
    let again = FileManager::find_files(temp_dir.path(), "srt")?;
    assert_eq!(again, files);

    let summary = controller.run_files(again, false, provider).await;
    assert_eq!(summary.skipped, 3);
    Ok(())
}

#[tokio::test]
async fn test_run_files_should_share_cache_across_files() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let first = common::create_test_subtitle(temp_dir.path(), "a.srt")?;
    let second = common::create_test_subtitle(temp_dir.path(), "b.srt")?;

    let controller = controller(1)?;
    let provider = Arc::new(MockProvider::dictionary(&[("Hello", "Hola"), ("World", "Mundo")]));
    let summary = controller.run_files(vec![first, second], false, provider.clone()).await;

    assert_eq!(summary.translated, 2);
    assert_eq!(provider.call_count(), 1);
    Ok(())
}

#[tokio::test]
async fn test_pipelines_from_one_service_should_respect_min_interval() -> Result<()> {
    let mut config = Config::default();
    config.source_language = "en".to_string();
    config.target_language = "es".to_string();
    let active = config.translation.provider;
    for provider in &mut config.translation.available_providers {
        provider.min_request_interval_ms = if provider.provider_type == active { 120 } else { 0 };
        provider.pause_after_batch_ms = 0;
    }
    let controller = Controller::with_config(config)?;

    let provider = Arc::new(MockProvider::dictionary(&[("Hello", "Hola"), ("World", "Mundo")]));
    let service = controller.build_service(provider.clone());
    let first = controller.build_pipeline(service.clone());
    let second = controller.build_pipeline(service);
    let mut hello = common::entries_from(&["Hello"], 1);
    let mut world = common::entries_from(&["World"], 1);
    let cancel = CancellationFlag::new();

    let start = Instant::now();
    let (a, b) = tokio::join!(
        first.translate_entries(&mut hello, &cancel),
        second.translate_entries(&mut world, &cancel)
    );
    assert!(a? && b?);
    assert!(start.elapsed() >= Duration::from_millis(120));
    assert_eq!(provider.call_count(), 2);
    assert_eq!(hello[0].translated, "Hola");
    assert_eq!(world[0].translated, "Mundo");
    Ok(())
}

#[tokio::test]
async fn test_run_files_after_cancel_all_should_not_start_files() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let file = common::create_test_subtitle(temp_dir.path(), "a.srt")?;

    let controller = controller(1)?;
    controller.cancel_all();

    let provider = Arc::new(MockProvider::echo());
    let summary = controller.run_files(vec![file.clone()], true, provider.clone()).await;

    assert_eq!(summary.cancelled, 1);
    assert_eq!(provider.call_count(), 0);
    assert!(!controller.output_path_for(&file).exists());
    Ok(())
}

#[tokio::test]
async fn test_timefix_should_default_output_next_to_translation() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let original = common::create_test_subtitle(temp_dir.path(), "ep.srt")?;
    let translated = common::create_test_file(
        temp_dir.path(),
        "ep_es.srt",
        "1\n00:00:09,000 --> 00:00:10,000\nHola\n",
    )?;

    let controller = controller(1)?;
    let (path, report) = controller.timefix(&original, &translated, None)?;

    assert_eq!(path, temp_dir.path().join("ep_es_fixed.srt"));
    assert_eq!(report.aligned, 1);
    assert_eq!(report.missing_translated, 2);
    Ok(())
}

#[tokio::test]
async fn test_missing_inputs_should_report_app_errors() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let controller = controller(1)?;

    let missing = temp_dir.path().join("missing.srt");
    let result = controller.run(missing.clone(), false).await;
    assert!(matches!(result, Err(AppError::File(_))));

    let result = controller.run_folder(temp_dir.path().to_path_buf(), false).await;
    assert!(matches!(result, Err(AppError::File(_))));

    let translated = common::create_test_subtitle(temp_dir.path(), "b.srt")?;
    let result = controller.timefix(&missing, &translated, None);
    assert!(matches!(result, Err(AppError::Subtitle(_))));
    Ok(())
}
