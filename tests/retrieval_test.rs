mod helpers;

use helpers::{create_memory, test_service, text_content};
use hindsight::error::HindsightError;

// The helper embedder spikes on the first byte, so "apple" and "apricot"
// land on the same axis while "grape" (g) and "melon" (m) are orthogonal
// to them and to each other.

#[test]
fn search_is_scoped_to_one_memory() {
    let service = test_service();
    let fruit = create_memory(&service, "alice", "fruit");
    let other = create_memory(&service, "alice", "other");
    let wanted = service
        .add_content("alice", &fruit.id, text_content("apple pie"))
        .unwrap();
    service
        .add_content("alice", &other.id, text_content("avocado toast"))
        .unwrap();

    let results = service.search("alice", &fruit.id, "apple", None).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content_id, wanted.id);
}

#[test]
fn search_ranks_nearest_first() {
    let service = test_service();
    let memory = create_memory(&service, "alice", "pantry");
    service
        .add_content("alice", &memory.id, text_content("grape jelly"))
        .unwrap();
    service
        .add_content("alice", &memory.id, text_content("apple pie"))
        .unwrap();
    service
        .add_content("alice", &memory.id, text_content("melon balls"))
        .unwrap();

    let results = service.search("alice", &memory.id, "apricot", None).unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0].content, "apple pie");
    assert!(results[0].similarity > 0.99);
    assert!(results[1].similarity < 0.01);
}

#[test]
fn search_respects_the_limit() {
    let service = test_service();
    let memory = create_memory(&service, "alice", "notes");
    for text in ["apple one", "apple two", "apple three", "apple four"] {
        service
            .add_content("alice", &memory.id, text_content(text))
            .unwrap();
    }

    let results = service
        .search("alice", &memory.id, "apple", Some(2))
        .unwrap();
    assert_eq!(results.len(), 2);
}

#[test]
fn search_unknown_memory_is_not_found() {
    let service = test_service();
    let memory = create_memory(&service, "alice", "notes");

    let err = service
        .search("alice", "no-such-memory", "apple", None)
        .unwrap_err();
    assert!(matches!(err, HindsightError::NotFound(_)));

    // owner scoping applies to reads of the index too
    let err = service.search("bob", &memory.id, "apple", None).unwrap_err();
    assert!(matches!(err, HindsightError::NotFound(_)));
}

#[test]
fn recall_with_alpha_one_is_pure_vector() {
    let service = test_service();
    let memory = create_memory(&service, "alice", "notes");
    // "grape apple notes" carries the keyword but a distant vector;
    // "apricot jam" is vector-near the query but has no keyword overlap
    service
        .add_content("alice", &memory.id, text_content("grape apple notes"))
        .unwrap();
    service
        .add_content("alice", &memory.id, text_content("apricot jam"))
        .unwrap();

    let results = service
        .recall("alice", &memory.id, "apple", Some(1.0), None)
        .unwrap();
    assert_eq!(results[0].content, "apricot jam");
    assert!(results[0].similarity > 0.99);
}

#[test]
fn recall_with_alpha_zero_is_pure_keyword() {
    let service = test_service();
    let memory = create_memory(&service, "alice", "notes");
    service
        .add_content("alice", &memory.id, text_content("grape apple notes"))
        .unwrap();
    service
        .add_content("alice", &memory.id, text_content("apricot jam"))
        .unwrap();

    let results = service
        .recall("alice", &memory.id, "apple", Some(0.0), None)
        .unwrap();
    assert_eq!(results[0].content, "grape apple notes");
    assert!(results[0].similarity > 0.99);
}

#[test]
fn recall_keyword_terms_all_have_to_match() {
    let service = test_service();
    let memory = create_memory(&service, "alice", "recipes");
    service
        .add_content("alice", &memory.id, text_content("apple pie crust"))
        .unwrap();
    service
        .add_content("alice", &memory.id, text_content("apple sauce"))
        .unwrap();

    let results = service
        .recall("alice", &memory.id, "apple pie", Some(0.0), None)
        .unwrap();
    assert_eq!(results[0].content, "apple pie crust");
    // "apple sauce" never matched the keyword side
    assert!(results
        .iter()
        .skip(1)
        .all(|r| r.similarity < 0.01));
}

#[test]
fn recall_truncates_to_the_default_limit() {
    let service = test_service();
    let memory = create_memory(&service, "alice", "notes");
    for text in [
        "apple one",
        "apple two",
        "apple three",
        "apple four",
        "apple five",
    ] {
        service
            .add_content("alice", &memory.id, text_content(text))
            .unwrap();
    }

    let results = service
        .recall("alice", &memory.id, "apple", None, None)
        .unwrap();
    assert_eq!(results.len(), 3);
}

#[test]
fn deleted_content_disappears_from_results() {
    let service = test_service();
    let memory = create_memory(&service, "alice", "notes");
    let keep = service
        .add_content("alice", &memory.id, text_content("apple keep"))
        .unwrap();
    let doomed = service
        .add_content("alice", &memory.id, text_content("apple drop"))
        .unwrap();

    service
        .delete_content("alice", &memory.id, &doomed.id)
        .unwrap();

    let results = service.search("alice", &memory.id, "apple", None).unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].content_id, keep.id);
}
