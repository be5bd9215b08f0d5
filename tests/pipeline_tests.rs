use anyhow::{bail, Result};
use async_trait::async_trait;
use rtms_scribe::analysis::{Analysis, Analyzer};
use rtms_scribe::pipeline::TranscriptProcessor;
use rtms_scribe::search::SearchProvider;
use std::sync::Arc;
use tokio::sync::Mutex;

// ============================================================================
// Collaborator stubs
// ============================================================================

/// Recognizes only explicit questions as information needs; everything else
/// is treated as a task.
struct QuestionOnlyAnalyzer;

#[async_trait]
impl Analyzer for QuestionOnlyAnalyzer {
    async fn analyze(&self, transcript: &str) -> Result<Analysis> {
        let text = transcript.trim().to_string();
        if text.ends_with('?') {
            Ok(Analysis {
                action_items: vec![],
                info_needs: vec![text],
            })
        } else {
            Ok(Analysis {
                action_items: vec![text],
                info_needs: vec![],
            })
        }
    }
}

/// Returns the same fixed result for every window.
struct FixedAnalyzer(Analysis);

#[async_trait]
impl Analyzer for FixedAnalyzer {
    async fn analyze(&self, _transcript: &str) -> Result<Analysis> {
        Ok(self.0.clone())
    }
}

struct FailingAnalyzer;

#[async_trait]
impl Analyzer for FailingAnalyzer {
    async fn analyze(&self, _transcript: &str) -> Result<Analysis> {
        bail!("analysis collaborator is down")
    }
}

/// Records every (query, context) pair it is called with.
#[derive(Default)]
struct RecordingSearch {
    calls: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl SearchProvider for RecordingSearch {
    async fn search(&self, query: &str, context: &str) -> Result<String> {
        let mut calls = self.calls.lock().await;
        calls.push((query.to_string(), context.to_string()));
        Ok(format!("Search Results:\nstub answer for {query}"))
    }
}

struct FailingSearch;

#[async_trait]
impl SearchProvider for FailingSearch {
    async fn search(&self, _query: &str, _context: &str) -> Result<String> {
        bail!("search collaborator is down")
    }
}

fn processor_with(
    analyzer: Arc<dyn Analyzer>,
    search: Arc<dyn SearchProvider>,
) -> TranscriptProcessor {
    TranscriptProcessor::new(analyzer, search)
}

// ============================================================================
// Rolling context
// ============================================================================

#[tokio::test]
async fn rolling_context_is_bounded_and_ordered() {
    let processor = processor_with(
        Arc::new(FixedAnalyzer(Analysis::default())),
        Arc::new(RecordingSearch::default()),
    );

    for i in 1..=12 {
        processor.on_chunk(&format!("chunk {i}")).await;
    }

    let window = processor.recent_chunks().await;
    assert_eq!(window.len(), 10);
    assert_eq!(window.first().map(String::as_str), Some("chunk 3"));
    assert_eq!(window.last().map(String::as_str), Some("chunk 12"));
}

#[tokio::test]
async fn rolling_context_holds_fewer_than_capacity_early_on() {
    let processor = processor_with(
        Arc::new(FixedAnalyzer(Analysis::default())),
        Arc::new(RecordingSearch::default()),
    );

    processor.on_chunk("only one").await;
    assert_eq!(processor.recent_chunks().await, vec!["only one"]);
}

// ============================================================================
// Action item dedup
// ============================================================================

#[tokio::test]
async fn duplicate_action_items_are_added_once() {
    let analysis = Analysis {
        action_items: vec!["Send the report".to_string()],
        info_needs: vec![],
    };
    let processor = processor_with(
        Arc::new(FixedAnalyzer(analysis)),
        Arc::new(RecordingSearch::default()),
    );

    processor.on_chunk("first mention").await;
    processor.on_chunk("second mention").await;

    assert_eq!(processor.action_items().await, vec!["Send the report"]);
}

#[tokio::test]
async fn dash_marker_is_trimmed_before_membership_test() {
    let analysis = Analysis {
        action_items: vec!["- Send the report".to_string(), "Send the report".to_string()],
        info_needs: vec![],
    };
    let processor = processor_with(
        Arc::new(FixedAnalyzer(analysis)),
        Arc::new(RecordingSearch::default()),
    );

    processor.on_chunk("one chunk").await;

    assert_eq!(processor.action_items().await, vec!["Send the report"]);
}

#[tokio::test]
async fn action_items_keep_first_seen_order() {
    let processor = processor_with(
        Arc::new(FixedAnalyzer(Analysis {
            action_items: vec!["alpha".to_string(), "beta".to_string()],
            info_needs: vec![],
        })),
        Arc::new(RecordingSearch::default()),
    );

    processor.on_chunk("x").await;
    assert_eq!(processor.action_items().await, vec!["alpha", "beta"]);
}

// ============================================================================
// Scenario tests from observed behavior
// ============================================================================

#[tokio::test]
async fn task_statement_yields_one_action_item_and_no_search() {
    let search = Arc::new(RecordingSearch::default());
    let processor = processor_with(Arc::new(QuestionOnlyAnalyzer), search.clone());

    processor.on_chunk("I need to report the outage").await;

    let items = processor.action_items().await;
    assert_eq!(items.len(), 1);
    assert!(items[0].contains("I need to report the outage"));
    assert!(search.calls.lock().await.is_empty());
}

#[tokio::test]
async fn explicit_question_triggers_one_search_with_chunk_context() {
    let search = Arc::new(RecordingSearch::default());
    let processor = processor_with(Arc::new(QuestionOnlyAnalyzer), search.clone());

    let chunk = "What was user growth last quarter?";
    processor.on_chunk(chunk).await;

    let calls = search.calls.lock().await;
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].0, chunk);
    assert_eq!(calls[0].1, chunk);
    drop(calls);

    assert!(processor.action_items().await.is_empty());
}

#[tokio::test]
async fn search_context_is_the_triggering_chunk_not_the_window() {
    let search = Arc::new(RecordingSearch::default());
    let analysis = Analysis {
        action_items: vec![],
        info_needs: vec!["What is the market size?".to_string()],
    };
    let processor = processor_with(Arc::new(FixedAnalyzer(analysis)), search.clone());

    processor.on_chunk("earlier chunk").await;
    processor.on_chunk("the triggering chunk").await;

    let calls = search.calls.lock().await;
    // One call per chunk processed; every context is the single chunk that
    // raised it, never the merged window
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].1, "earlier chunk");
    assert_eq!(calls[1].1, "the triggering chunk");
}

#[tokio::test]
async fn multiple_needs_from_one_chunk_each_get_a_search() {
    let search = Arc::new(RecordingSearch::default());
    let analysis = Analysis {
        action_items: vec![],
        info_needs: vec![
            "What was Q3 revenue?".to_string(),
            "Who is the new vendor?".to_string(),
        ],
    };
    let processor = processor_with(Arc::new(FixedAnalyzer(analysis)), search.clone());

    processor.on_chunk("one chunk, two questions").await;

    let calls = search.calls.lock().await;
    // Results for one chunk are unordered; compare as a set
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().any(|(q, _)| q == "What was Q3 revenue?"));
    assert!(calls.iter().any(|(q, _)| q == "Who is the new vendor?"));
}

// ============================================================================
// Collaborator failure isolation
// ============================================================================

#[tokio::test]
async fn analyzer_failure_is_swallowed_and_state_still_advances() {
    let processor = processor_with(
        Arc::new(FailingAnalyzer),
        Arc::new(RecordingSearch::default()),
    );

    processor.on_chunk("a chunk the analyzer never sees succeed").await;

    // Empty substitute result: no items, but the window still grew
    assert!(processor.action_items().await.is_empty());
    assert_eq!(processor.recent_chunks().await.len(), 1);
}

#[tokio::test]
async fn search_failure_does_not_abort_action_item_processing() {
    let analysis = Analysis {
        action_items: vec!["File the incident ticket".to_string()],
        info_needs: vec!["What caused the outage?".to_string()],
    };
    let processor = processor_with(Arc::new(FixedAnalyzer(analysis)), Arc::new(FailingSearch));

    processor.on_chunk("outage retro").await;

    assert_eq!(
        processor.action_items().await,
        vec!["File the incident ticket"]
    );
}
