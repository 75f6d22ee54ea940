use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use evogen::services::embedding::{cosine_distance, HashingEmbedder};
use evogen::services::question_index::{NoveltyStore, QuestionIndex, EMPTY_STORE_DISTANCE};
use evogen::store::Store;

const QUESTIONS: &[&str] = &[
    "What is the time complexity of quicksort in the worst case?",
    "Which element has the chemical symbol Fe?",
    "Describe the causes of the French Revolution.",
    "How do vaccines train the immune system?",
];

fn setup_index(dir: &tempfile::TempDir) -> (Arc<Store>, QuestionIndex) {
    let store = Arc::new(Store::open(dir.path().join("index.sled")).expect("open store"));
    let index = QuestionIndex::new(store.clone(), Arc::new(HashingEmbedder));
    (store, index)
}

/// Waits for sled's background flusher to release the lock left by a
/// dropped handle before opening the same path again.
async fn reopen_store(path: &Path) -> Store {
    let mut attempts = 0;
    loop {
        match Store::open(path) {
            Ok(store) => return store,
            Err(e) if attempts >= 100 => panic!("reopen {}: {e}", path.display()),
            Err(_) => {
                attempts += 1;
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        }
    }
}

#[tokio::test]
async fn self_similarity_is_maximal() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (_store, index) = setup_index(&dir);
    for q in QUESTIONS {
        index.index(q).await.expect("index");
    }

    for (i, q) in QUESTIONS.iter().enumerate() {
        let nearest = index.nearest_distance(q).await.expect("distance");
        let own = HashingEmbedder::embed_sync(q);
        for (j, other) in QUESTIONS.iter().enumerate() {
            if i == j {
                continue;
            }
            let to_other = cosine_distance(&own, &HashingEmbedder::embed_sync(other));
            assert!(
                nearest <= to_other,
                "{q:?}: nearest {nearest} > distance {to_other} to {other:?}"
            );
        }
    }
}

#[tokio::test]
async fn near_duplicates_fall_under_a_typical_threshold() {
    let dir = tempfile::tempdir().expect("tempdir");
    let (_store, index) = setup_index(&dir);
    index
        .index("Which element has the chemical symbol Fe?")
        .await
        .expect("index");

    let duplicate = index
        .nearest_distance("which element has the chemical symbol Fe ?")
        .await
        .expect("distance");
    let unrelated = index
        .nearest_distance("Describe the causes of the French Revolution.")
        .await
        .expect("distance");

    assert!(duplicate < 0.15, "duplicate distance {duplicate}");
    assert!(unrelated > duplicate);
}

#[tokio::test]
async fn corpus_survives_reopen() {
    let dir = tempfile::tempdir().expect("tempdir");
    {
        let (store, index) = setup_index(&dir);
        assert_eq!(
            index.nearest_distance("anything").await.expect("distance"),
            EMPTY_STORE_DISTANCE
        );
        index.index(QUESTIONS[0]).await.expect("index");
        index.index(QUESTIONS[1]).await.expect("index");
        store.flush().expect("flush");
    }

    let store = Arc::new(reopen_store(&dir.path().join("index.sled")).await);
    let index = QuestionIndex::new(store, Arc::new(HashingEmbedder));
    assert_eq!(index.count().expect("count"), 2);
    assert_eq!(
        index.list_all().expect("list"),
        vec![QUESTIONS[0].to_string(), QUESTIONS[1].to_string()]
    );
}
