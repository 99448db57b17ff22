/*!
 * Tests for deduplication, batch planning and post-processing
 */

use std::sync::Arc;

use subtrad::cancellation::CancellationFlag;
use subtrad::providers::mock::MockProvider;
use subtrad::translation::{TranslationService, deduplicate, plan_batches, postprocess, recompose};

use crate::common::lines;

#[test]
fn test_dedup_then_recompose_should_restore_every_position() {
    let input = lines(&["Hello", "  ", "World", "Hello", "", "World"]);
    let plan = deduplicate(&input);

    assert_eq!(plan.unique, lines(&["Hello", "World"]));
    assert_eq!(plan.mapping, vec![Some(0), None, Some(1), Some(0), None, Some(1)]);

    let translated = lines(&["Hola", "Mundo"]);
    let output = recompose(&plan, &translated).unwrap();
    assert_eq!(output, lines(&["Hola", "", "Mundo", "Hola", "", "Mundo"]));
}

#[test]
fn test_recompose_with_wrong_length_should_fail() {
    let plan = deduplicate(&lines(&["a", "b"]));
    assert!(recompose(&plan, &lines(&["x"])).is_err());
}

#[test]
fn test_plan_batches_should_respect_limits_and_cover_indices() {
    let texts: Vec<String> = (0..95).map(|i| format!("line number {} with some padding text", i)).collect();
    let batches = plan_batches(&texts, 20, 900);

    for batch in &batches {
        assert!(batch.len() <= 20);
        assert!(batch.len() == 1 || batch.char_count() <= 900);
    }

    let indices: Vec<usize> = batches.iter().flat_map(|b| b.indices.clone()).collect();
    assert_eq!(indices, (0..95).collect::<Vec<_>>());
}

#[test]
fn test_plan_batches_with_oversized_text_should_isolate_it() {
    let big = "x".repeat(1200);
    let texts = vec!["short".to_string(), big.clone(), "tail".to_string()];
    let batches = plan_batches(&texts, 20, 900);

    assert!(batches.iter().any(|b| b.texts == vec![big.clone()]));
    assert_eq!(batches.iter().map(|b| b.len()).sum::<usize>(), 3);
}

#[test]
fn test_postprocess_should_be_idempotent() {
    let samples = [
        "  Hola ,  mundo  !  ",
        "Espera . . . ¿qué ?",
        "<i>Hola</i>",
        "Line one\nLine two",
    ];
    for sample in samples {
        let once = postprocess(sample);
        assert_eq!(postprocess(&once), once, "not idempotent for {:?}", sample);
    }
}

#[test]
fn test_postprocess_should_remove_space_before_punctuation() {
    assert_eq!(postprocess("Hola , mundo !"), "Hola, mundo!");
}

#[test]
fn test_service_translate_text_should_keep_markup() {
    let service = TranslationService::new(Arc::new(MockProvider::dictionary(&[("Run", "Corre")])));
    let translated = tokio_test::block_on(service.translate_text("<i>Run</i>", "en", "es", &CancellationFlag::new()));
    assert_eq!(translated, "<i>Corre</i>");
}
