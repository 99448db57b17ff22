/*!
 * End-to-end tests for translating subtitle files through the pipeline
 */

use anyhow::Result;
use std::sync::Arc;

use subtrad::cancellation::CancellationFlag;
use subtrad::file_utils::OutputWriter;
use subtrad::providers::mock::MockProvider;
use subtrad::subtitle_processor::SubtitleCollection;
use subtrad::translation::{BatchLimits, PipelineOutcome, TranslationPipeline, TranslationService};

use crate::common;

fn one_line_batches() -> BatchLimits {
    BatchLimits {
        max_lines: 1,
        ..BatchLimits::default()
    }
}

#[tokio::test]
async fn test_pipeline_with_repeated_lines_should_write_translated_file() -> Result<()> {
    common::init_test_logger();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "episode.srt")?;

    let provider = Arc::new(MockProvider::dictionary(&[("Hello", "Hola"), ("World", "Mundo")]));
    let pipeline = TranslationPipeline::new(TranslationService::new(provider.clone()), "en", "es");

    let outcome = pipeline.run(&input, &CancellationFlag::new()).await?;

    let expected_path = temp_dir.path().join("Subtitles_es").join("episode_es.srt");
    assert_eq!(outcome, PipelineOutcome::Completed(expected_path.clone()));
    assert_eq!(provider.call_count(), 1);

    let written = SubtitleCollection::load_entries(&expected_path)?;
    let texts: Vec<&str> = written.iter().map(|e| e.original.as_str()).collect();
    assert_eq!(texts, vec!["Hola", "Hola", "Mundo"]);

    let original = SubtitleCollection::load_entries(&input)?;
    for (before, after) in original.iter().zip(&written) {
        assert_eq!(before.seq_num, after.seq_num);
        assert!(before.same_timing(after));
    }
    Ok(())
}

#[tokio::test]
async fn test_pipeline_cancelled_after_first_batch_should_write_nothing() -> Result<()> {
    common::init_test_logger();
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(
        temp_dir.path(),
        "three.srt",
        "1\n00:00:01,000 --> 00:00:02,000\nOne\n\n2\n00:00:03,000 --> 00:00:04,000\nTwo\n\n3\n00:00:05,000 --> 00:00:06,000\nThree\n",
    )?;

    let cancel = CancellationFlag::new();
    let provider = Arc::new(MockProvider::echo().cancel_after(1, cancel.clone()));
    let pipeline =
        TranslationPipeline::new(TranslationService::new(provider.clone()), "en", "es").with_limits(one_line_batches());

    let outcome = pipeline.run(&input, &cancel).await?;

    assert_eq!(outcome, PipelineOutcome::Cancelled);
    assert_eq!(provider.call_count(), 1);
    assert!(!OutputWriter::output_path(&input, "es").exists());
    Ok(())
}

#[tokio::test]
async fn test_spawned_pipeline_with_failing_provider_should_keep_originals() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_subtitle(temp_dir.path(), "fail.srt")?;

    let pipeline = TranslationPipeline::new(TranslationService::new(Arc::new(MockProvider::failing())), "en", "de");
    let outcome = pipeline.spawn(input.clone(), CancellationFlag::new()).await??;

    let PipelineOutcome::Completed(path) = outcome else {
        panic!("expected a written file");
    };
    let written = SubtitleCollection::load_entries(&path)?;
    let texts: Vec<&str> = written.iter().map(|e| e.original.as_str()).collect();
    assert_eq!(texts, vec!["Hello", "Hello", "World"]);
    Ok(())
}

#[tokio::test]
async fn test_pipeline_with_unparseable_file_should_fail() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let input = common::create_test_file(temp_dir.path(), "junk.srt", "no subtitles here\n")?;

    let pipeline = TranslationPipeline::new(TranslationService::new(Arc::new(MockProvider::echo())), "en", "es");
    assert!(pipeline.run(&input, &CancellationFlag::new()).await.is_err());
    assert!(!OutputWriter::output_path(&input, "es").exists());
    Ok(())
}
