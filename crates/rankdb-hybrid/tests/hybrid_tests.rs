use std::fs;
use std::sync::Arc;
use tempfile::TempDir;

use rankdb_core::config::{PrefilterMode, ScoringSettings, Settings};
use rankdb_core::discovery::DocumentDiscovery;
use rankdb_core::error::Error;
use rankdb_core::traits::MetadataStore;
use rankdb_core::types::IngestItem;
use rankdb_embed::HashEmbedder;
use rankdb_hybrid::{
    BatchInfo, BatchStatus, HybridIndex, HybridScorer, HybridSearchEngine, InMemoryMetadataStore, IngestionPipeline,
    SavedCandidates,
};
use rankdb_text::FsDocumentSource;
use rankdb_vector::PersistenceManager;

fn write_docs(dir: &TempDir, docs: &[(&str, &str)]) {
    for (name, text) in docs {
        fs::write(dir.path().join(name), text).unwrap();
    }
}

fn index_in(dir: &TempDir, dim: usize, scorer: HybridScorer) -> HybridIndex {
    HybridIndex::new(dim, Arc::new(FsDocumentSource::with_root(dir.path())), scorer)
}

/// A=(1,0) B=(0.8,0.6) C=(0.6,0.8); only C mentions "rust".
fn abc(dir: &TempDir, scorer: HybridScorer) -> HybridIndex {
    write_docs(
        dir,
        &[
            ("a.txt", "python developer"),
            ("b.txt", "java developer"),
            ("c.txt", &"rust ".repeat(12)),
        ],
    );
    let index = index_in(dir, 2, scorer);
    index.add_one("a.txt", &[1.0, 0.0]).unwrap();
    index.add_one("b.txt", &[0.8, 0.6]).unwrap();
    index.add_one("c.txt", &[0.6, 0.8]).unwrap();
    index
}

fn approx(a: f32, b: f32) -> bool {
    (a - b).abs() < 1e-5
}

#[test]
fn keyword_evidence_reorders_hand_computed_scores() {
    let tmp = TempDir::new().unwrap();
    let index = abc(&tmp, HybridScorer::default());
    let results = index.search(&[1.0, 0.0], "Rust", 3).unwrap();

    let docs: Vec<&str> = results.iter().map(|r| r.document.as_str()).collect();
    assert_eq!(docs, vec!["a.txt", "c.txt", "b.txt"]);
    // A: 0.7*1.0 + 0.3*0 ; C: 0.7*0.2 + 0.3*1.0 ; B: 0.7*0.6 + 0.3*0
    assert!(approx(results[0].score, 0.70));
    assert!(approx(results[1].score, 0.44));
    assert!(approx(results[2].score, 0.42));
    assert!(approx(results[1].vector_score, 0.2));
    assert!(approx(results[1].keyword_score, 1.0));
    assert!(approx(results[2].keyword_score, 0.0));
}

#[test]
fn prefer_matches_keeps_only_matching_candidates() {
    let tmp = TempDir::new().unwrap();
    let settings = ScoringSettings { prefilter: PrefilterMode::PreferMatches, ..ScoringSettings::default() };
    let index = abc(&tmp, HybridScorer::new(settings, 10));
    let results = index.search(&[1.0, 0.0], "rust", 3).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].document, "c.txt");

    // Nothing matches: falls back to every candidate.
    let results = index.search(&[1.0, 0.0], "haskell", 3).unwrap();
    assert_eq!(results.len(), 3);
}

#[test]
fn legacy_filter_reverts_when_only_some_candidates_match() {
    let tmp = TempDir::new().unwrap();
    let index = abc(&tmp, HybridScorer::default());
    let results = index.search(&[1.0, 0.0], "developer", 3).unwrap();
    // Only A and B mention "developer": the filter reverts to all three.
    assert_eq!(results.len(), 3);

    let results = index.search(&[1.0, 0.0], "developer", 1).unwrap();
    assert_eq!(results[0].document, "a.txt");
}

#[test]
fn legacy_filter_keeps_set_when_every_candidate_matches() {
    let tmp = TempDir::new().unwrap();
    let index = abc(&tmp, HybridScorer::default());
    // A and B mention "developer" once, C mentions "rust" twelve times.
    let results = index.search(&[1.0, 0.0], "developer rust", 3).unwrap();
    let docs: Vec<&str> = results.iter().map(|r| r.document.as_str()).collect();
    assert_eq!(docs, vec!["a.txt", "b.txt", "c.txt"]);
    // A: 0.7*1.0 + 0.3*0.1 ; B: 0.7*0.6 + 0.3*0.1 ; C: 0.7*0.2 + 0.3*1.0
    assert!(approx(results[0].score, 0.73));
    assert!(approx(results[1].score, 0.45));
    assert!(approx(results[2].score, 0.44));
    assert!(approx(results[1].keyword_score, 0.1));
    assert!(approx(results[2].keyword_score, 1.0));
}

#[test]
fn self_query_returns_own_document_first() {
    let tmp = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(32);
    let texts = ["rust systems engineer", "frontend react developer", "data scientist python", "sre kubernetes oncall"];
    let index = index_in(&tmp, 32, HybridScorer::default());
    for (i, t) in texts.iter().enumerate() {
        index.add_one(&format!("doc-{}", i), &embedder.embed_text(t)).unwrap();
    }
    for (i, t) in texts.iter().enumerate() {
        let hits = index.search(&embedder.embed_text(t), "", 1).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].document, format!("doc-{}", i));
        assert!(approx(hits[0].vector_score, 1.0));
        assert!(approx(hits[0].keyword_score, 0.0));
    }
}

#[test]
fn result_count_is_bounded_by_k_and_corpus() {
    let tmp = TempDir::new().unwrap();
    let index = index_in(&tmp, 2, HybridScorer::default());
    for i in 0..5 {
        index.add_one(&format!("missing-{}.txt", i), &[i as f32, 1.0]).unwrap();
    }
    assert_eq!(index.search(&[0.0, 1.0], "anything", 3).unwrap().len(), 3);
    assert_eq!(index.search(&[0.0, 1.0], "anything", 10).unwrap().len(), 5);
    assert!(index.search(&[0.0, 1.0], "anything", 0).unwrap().is_empty());
}

#[test]
fn wrong_dimension_leaves_index_untouched() {
    let tmp = TempDir::new().unwrap();
    let index = abc(&tmp, HybridScorer::default());
    let err = index.add_one("d.txt", &[1.0, 0.0, 0.0]).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 3 }));
    assert_eq!(index.slot_count(), 3);

    let err = index.search(&[1.0], "rust", 1).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { expected: 2, actual: 1 }));
    let err = index.search(&[1.0], "rust", 0).unwrap_err();
    assert!(matches!(err, Error::DimensionMismatch { .. }));
}

#[test]
fn deleted_source_scores_zero_keywords_but_keeps_vector_score() {
    let tmp = TempDir::new().unwrap();
    let index = abc(&tmp, HybridScorer::default());
    let before = index.search(&[0.6, 0.8], "rust", 1).unwrap();
    assert_eq!(before[0].document, "c.txt");
    assert!(approx(before[0].keyword_score, 1.0));

    fs::remove_file(tmp.path().join("c.txt")).unwrap();
    index.clear_text_cache();
    let after = index.search(&[0.6, 0.8], "rust", 1).unwrap();
    assert_eq!(after[0].document, "c.txt");
    assert!(approx(after[0].keyword_score, 0.0));
    assert!(approx(after[0].vector_score, before[0].vector_score));
}

#[test]
fn source_deleted_before_first_read_scores_zero_keywords() {
    let tmp = TempDir::new().unwrap();
    let index = abc(&tmp, HybridScorer::default());
    // An empty query ranks by vectors only and reads no text.
    let baseline = index.search(&[0.6, 0.8], "", 1).unwrap();
    assert_eq!(baseline[0].document, "c.txt");

    fs::remove_file(tmp.path().join("c.txt")).unwrap();
    let hits = index.search(&[0.6, 0.8], "rust", 1).unwrap();
    assert_eq!(hits[0].document, "c.txt");
    assert!(approx(hits[0].keyword_score, 0.0));
    assert!(approx(hits[0].vector_score, baseline[0].vector_score));
    assert!(approx(hits[0].vector_score, 1.0));
}

#[test]
fn identical_batches_are_not_deduplicated() {
    let tmp = TempDir::new().unwrap();
    let index = Arc::new(index_in(&tmp, 2, HybridScorer::default()));
    let pipeline = IngestionPipeline::new(index.clone(), Arc::new(InMemoryMetadataStore::new()));
    let batch = || vec![IngestItem::new("a.txt", vec![1.0, 0.0]), IngestItem::new("b.txt", vec![0.0, 1.0])];

    let first = pipeline.add_batch(batch()).unwrap();
    assert_eq!(index.slot_count(), 2);
    let second = pipeline.add_batch(batch()).unwrap();
    assert_eq!(index.slot_count(), 4);
    assert_eq!(second.inserted, vec![("a.txt".to_string(), 2), ("b.txt".to_string(), 3)]);
    assert!(first.is_clean() && second.is_clean());

    let hits = index.search(&[1.0, 0.0], "", 2).unwrap();
    assert_eq!(hits.iter().map(|h| h.slot).collect::<Vec<_>>(), vec![0, 2]);
}

#[test]
fn batch_matches_sequential_inserts_and_saves_snapshot() {
    let tmp = TempDir::new().unwrap();
    let base = tmp.path().join("snap/rankdb");
    let index = Arc::new(index_in(&tmp, 2, HybridScorer::default()).with_persistence(PersistenceManager::new(&base)));
    let pipeline = IngestionPipeline::new(index.clone(), Arc::new(InMemoryMetadataStore::new()));

    let report = pipeline
        .add_batch(vec![
            IngestItem::new("a.txt", vec![1.0, 0.0]),
            IngestItem::new("bad.txt", vec![1.0, 0.0, 0.0]),
            IngestItem::new("b.txt", vec![0.0, 1.0]),
        ])
        .unwrap();
    assert_eq!(report.inserted.iter().map(|(_, s)| *s).collect::<Vec<_>>(), vec![0, 1]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].position, 1);
    assert_eq!(report.failures[0].document, "bad.txt");

    let restored = index_in(&tmp, 2, HybridScorer::default());
    restored.load_from(&PersistenceManager::new(&base)).unwrap();
    assert_eq!(restored.slot_count(), 2);
    assert_eq!(restored.resolve(1).unwrap(), "b.txt");
}

#[test]
fn save_then_load_preserves_neighbor_order() {
    let tmp = TempDir::new().unwrap();
    let embedder = HashEmbedder::new(16);
    let persistence = PersistenceManager::new(tmp.path().join("rankdb"));
    let index = index_in(&tmp, 16, HybridScorer::default()).with_persistence(persistence.clone());
    for i in 0..20 {
        index.add_one(&format!("doc-{}", i), &embedder.embed_text(&format!("token{} shared", i))).unwrap();
    }
    index.save().unwrap();

    let restored = index_in(&tmp, 16, HybridScorer::default()).with_persistence(persistence);
    restored.load().unwrap();
    for query in ["token3 shared", "token17", "unrelated words"] {
        let q = embedder.embed_text(query);
        let a: Vec<_> = index.search(&q, "", 5).unwrap().into_iter().map(|r| r.slot).collect();
        let b: Vec<_> = restored.search(&q, "", 5).unwrap().into_iter().map(|r| r.slot).collect();
        assert_eq!(a, b, "query {:?}", query);
    }
}

#[test]
fn open_falls_back_to_empty_on_corrupt_snapshot() {
    let tmp = TempDir::new().unwrap();
    let mut settings = Settings::default();
    settings.index.dim = 2;
    settings.index.base_path = tmp.path().join("rankdb").to_string_lossy().into_owned();

    let index = HybridIndex::open(&settings, Arc::new(FsDocumentSource::new()));
    assert_eq!(index.slot_count(), 0);
    index.add_one("a.txt", &[1.0, 0.0]).unwrap();
    index.teardown().unwrap();

    let reopened = HybridIndex::open(&settings, Arc::new(FsDocumentSource::new()));
    assert_eq!(reopened.slot_count(), 1);

    fs::write(tmp.path().join("rankdb.index"), b"garbage").unwrap();
    let broken = HybridIndex::open(&settings, Arc::new(FsDocumentSource::new()));
    assert_eq!(broken.slot_count(), 0);
    assert!(matches!(broken.load().unwrap_err(), Error::PersistenceCorruption(_)));
}

#[test]
fn failed_save_does_not_hide_documents_from_the_next_run() {
    let docs = TempDir::new().unwrap();
    write_docs(&docs, &[("a.txt", "rust engineer"), ("b.txt", "go engineer")]);
    let tmp = TempDir::new().unwrap();
    fs::write(tmp.path().join("blocker"), b"not a directory").unwrap();
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let embedder = HashEmbedder::new(8);
    let batch = BatchInfo::now();

    // The snapshot lives under a regular file, so the save after the metadata upsert fails.
    let unsaveable = index_in(&docs, 8, HybridScorer::default())
        .with_persistence(PersistenceManager::new(tmp.path().join("blocker/rankdb")));
    let pipeline = IngestionPipeline::new(Arc::new(unsaveable), metadata.clone());
    assert!(pipeline.ingest_directory(docs.path(), &DocumentDiscovery::default(), &embedder, &batch).is_err());
    assert_eq!(metadata.all().len(), 2);

    // Restart: nothing reached the snapshot, so both documents are ingested again.
    let restarted = Arc::new(
        index_in(&docs, 8, HybridScorer::default()).with_persistence(PersistenceManager::new(tmp.path().join("rankdb"))),
    );
    let pipeline = IngestionPipeline::new(restarted.clone(), metadata);
    let report = pipeline.ingest_directory(docs.path(), &DocumentDiscovery::default(), &embedder, &batch).unwrap();
    assert_eq!(report.inserted.len(), 2);
    assert_eq!(report.skipped, 0);
    assert_eq!(restarted.slot_count(), 2);
    assert!(restarted.contains_document(&report.inserted[0].0));
}

#[test]
fn load_without_snapshot_path_is_a_config_error() {
    let tmp = TempDir::new().unwrap();
    let index = index_in(&tmp, 2, HybridScorer::default());
    assert!(matches!(index.save().unwrap_err(), Error::InvalidConfig(_)));
    assert!(matches!(index.load().unwrap_err(), Error::InvalidConfig(_)));
}

#[test]
fn concurrent_searches_see_consistent_state() {
    let tmp = TempDir::new().unwrap();
    let index = Arc::new(index_in(&tmp, 4, HybridScorer::default()));
    std::thread::scope(|s| {
        for w in 0..2 {
            let index = index.clone();
            s.spawn(move || {
                for i in 0..50 {
                    index.add_one(&format!("w{}-{}", w, i), &[w as f32, i as f32, 1.0, 0.0]).unwrap();
                }
            });
        }
        for _ in 0..2 {
            let index = index.clone();
            s.spawn(move || {
                for _ in 0..50 {
                    for hit in index.search(&[0.0, 0.0, 1.0, 0.0], "", 3).unwrap() {
                        assert_eq!(index.resolve(hit.slot).unwrap(), hit.document);
                    }
                }
            });
        }
    });
    assert_eq!(index.slot_count(), 100);
}

#[test]
fn engine_ingests_directory_and_enriches_results() {
    let docs = TempDir::new().unwrap();
    write_docs(
        &docs,
        &[
            ("alice.txt", "rust engineer tokio async services"),
            ("bob.txt", "marketing manager campaigns"),
            ("empty.txt", "   "),
            ("notes.md", "ignored by discovery"),
        ],
    );
    let metadata = Arc::new(InMemoryMetadataStore::new());
    let index = Arc::new(HybridIndex::new(64, Arc::new(FsDocumentSource::new()), HybridScorer::default()));
    let engine = HybridSearchEngine::new(index.clone(), metadata.clone(), Box::new(HashEmbedder::new(64))).unwrap();

    let batch = BatchInfo::now().with_id("b-1").with_name("Spring hiring");
    let report = engine.index_directory(docs.path(), &DocumentDiscovery::default(), &batch).unwrap();
    assert_eq!(report.inserted.len(), 2);
    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].document.ends_with("empty.txt"));
    assert!(matches!(report.failures[0].error, Error::DocumentUnavailable { .. }));

    let again = engine.index_directory(docs.path(), &DocumentDiscovery::default(), &batch).unwrap();
    assert_eq!(again.skipped, 2);
    assert!(again.inserted.is_empty());
    assert_eq!(index.slot_count(), 2);

    let results = engine.query("rust engineer", 2).unwrap();
    assert!(results[0].result.document.ends_with("alice.txt"));
    assert!(results[0].result.keyword_score > 0.0);
    assert_eq!(results[0].metadata.batch_id.as_deref(), Some("b-1"));
    assert!(metadata.contains(&results[1].result.document));

    assert_eq!(engine.recent_searches()[0].query, "rust engineer");
    let uploads = engine.recent_uploads();
    assert_eq!(uploads.len(), 1);
    assert_eq!(uploads[0].name, "Spring hiring");
    assert_eq!(uploads[0].status, BatchStatus::Partial);
    assert_eq!((uploads[0].file_count, uploads[0].success_count, uploads[0].failed_count), (3, 2, 1));
    let failed = uploads[0].files.iter().find(|f| f.error.is_some()).unwrap();
    assert!(failed.document.ends_with("empty.txt"));
    engine.teardown().unwrap();
}

#[test]
fn engine_saves_only_indexed_candidates() {
    let docs = TempDir::new().unwrap();
    write_docs(&docs, &[("alice.txt", "rust engineer"), ("blank.txt", "")]);
    let saved_at = TempDir::new().unwrap();
    let saved_path = saved_at.path().join("saved_candidates.json");
    let index = Arc::new(HybridIndex::new(16, Arc::new(FsDocumentSource::new()), HybridScorer::default()));
    let engine = HybridSearchEngine::new(index, Arc::new(InMemoryMetadataStore::new()), Box::new(HashEmbedder::new(16)))
        .unwrap()
        .with_saved_candidates(SavedCandidates::open(&saved_path).unwrap());
    let batch = BatchInfo::now().with_id("b-2");
    engine.index_directory(docs.path(), &DocumentDiscovery::default(), &batch).unwrap();

    let alice = docs.path().join("alice.txt").to_string_lossy().into_owned();
    let blank = docs.path().join("blank.txt").to_string_lossy().into_owned();
    engine.save_candidate(&alice).unwrap();
    assert!(engine.save_candidate(&blank).is_err(), "failed documents are not saveable");
    assert!(engine.save_candidate("nobody.txt").is_err());

    let saved = engine.saved_candidates();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].document, alice);
    assert_eq!(saved[0].metadata.batch_id.as_deref(), Some("b-2"));
    assert!(SavedCandidates::open(&saved_path).unwrap().contains(&alice));
}

#[test]
fn engine_rejects_embedder_of_other_dimension() {
    let index = Arc::new(HybridIndex::new(8, Arc::new(FsDocumentSource::new()), HybridScorer::default()));
    let result = HybridSearchEngine::new(index, Arc::new(InMemoryMetadataStore::new()), Box::new(HashEmbedder::new(4)));
    assert!(result.is_err());
}
