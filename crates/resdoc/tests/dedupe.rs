//! Integration tests for deduplication of included resources.
#![allow(missing_docs)]

use proptest::prelude::*;
use resdoc::{marshal_one, Record, ResourceObject};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

// ============================================================================
// Fixtures
// ============================================================================

#[derive(Debug, Default, Clone, Record)]
struct Comment {
    #[resdoc(primary = "comments")]
    pub id: u32,
    pub body: String,
    pub flagged: bool,
    #[resdoc(relation)]
    pub reply_to: Option<Box<Comment>>,
}

#[derive(Debug, Default, Record)]
struct Post {
    #[resdoc(primary = "posts")]
    pub id: u32,
    pub title: String,
    #[resdoc(relation)]
    pub comments: Vec<Comment>,
}

fn full(id: u32, reply_to: Option<Comment>) -> Comment {
    Comment {
        id,
        body: format!("comment {id}"),
        flagged: true,
        reply_to: reply_to.map(Box::new),
    }
}

fn bare(id: u32) -> Comment {
    Comment {
        id,
        ..Default::default()
    }
}

/// Comments 2..=5; 3 replies to 2, 4 replies to an id-only 3, 5 replies to
/// an id-only 6 that is never given in full.
fn thread() -> Vec<Comment> {
    vec![
        full(2, None),
        full(3, Some(full(2, None))),
        full(4, Some(bare(3))),
        full(5, Some(bare(6))),
    ]
}

fn included_by_id(included: &[ResourceObject], id: &str) -> ResourceObject {
    included
        .iter()
        .find(|doc| doc.id == id)
        .cloned()
        .unwrap_or_else(|| panic!("comment {id} missing from included"))
}

fn check_thread(included: &[ResourceObject]) -> Result<(), TestCaseError> {
    prop_assert_eq!(included.len(), 5);
    for id in ["2", "3", "4", "5"] {
        let doc = included_by_id(included, id);
        let expected = format!("comment {id}");
        prop_assert_eq!(doc.attributes["body"].as_str(), Some(expected.as_str()));
        prop_assert_eq!(doc.attributes["flagged"].as_bool(), Some(true));
    }
    let six = included_by_id(included, "6");
    prop_assert_eq!(six.attributes["body"].as_str(), Some(""));

    let three = included_by_id(included, "3");
    prop_assert!(three.relationships["replyTo"].data.is_some());
    Ok(())
}

// ============================================================================
// Order independence
// ============================================================================

proptest! {
    #[test]
    fn test_dedupe_independent_of_order(comments in Just(thread()).prop_shuffle()) {
        let post = Post {
            id: 1,
            title: "thread".into(),
            comments,
        };
        let doc = marshal_one(&post).unwrap();
        check_thread(&doc.included)?;
    }
}

#[test]
fn test_dedupe_keeps_first_seen_order() {
    let post = Post {
        id: 1,
        comments: vec![full(5, Some(bare(6))), full(2, None)],
        ..Default::default()
    };
    let doc = marshal_one(&post).unwrap();
    let ids: Vec<&str> = doc.included.iter().map(|d| d.id.as_str()).collect();
    assert_eq!(ids, ["6", "5", "2"]);
}

// ============================================================================
// Conflicts
// ============================================================================

struct WarnCounter(Arc<AtomicUsize>);

impl<S: tracing::Subscriber> Layer<S> for WarnCounter {
    fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
        if *event.metadata().level() == tracing::Level::WARN {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }
}

#[test]
fn test_conflicting_sightings_warn_and_keep_last() {
    let mut first = full(7, None);
    first.body = "first".into();
    let mut second = full(7, None);
    second.body = "second".into();
    let post = Post {
        id: 1,
        comments: vec![first, second],
        ..Default::default()
    };

    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber =
        tracing_subscriber::registry::Registry::default().with(WarnCounter(warnings.clone()));
    let doc = tracing::subscriber::with_default(subscriber, || marshal_one(&post)).unwrap();

    assert_eq!(doc.included.len(), 1);
    assert_eq!(doc.included[0].attributes["body"], "second");
    assert_eq!(warnings.load(Ordering::SeqCst), 1);
}

#[test]
fn test_zero_sighting_never_warns() {
    let post = Post {
        id: 1,
        comments: vec![full(8, None), bare(8)],
        ..Default::default()
    };

    let warnings = Arc::new(AtomicUsize::new(0));
    let subscriber =
        tracing_subscriber::registry::Registry::default().with(WarnCounter(warnings.clone()));
    let doc = tracing::subscriber::with_default(subscriber, || marshal_one(&post)).unwrap();

    assert_eq!(doc.included[0].attributes["body"], "comment 8");
    assert_eq!(warnings.load(Ordering::SeqCst), 0);
}
