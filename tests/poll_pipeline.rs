// tests/poll_pipeline.rs
//
// Head-check / poll behavior end to end over an in-memory transport.

mod common;

use common::{session, StubTransport};
use intel_feed_sync::render::{EMPTY_FEED, NO_MATCHING_ITEMS};
use intel_feed_sync::{MetadataFailurePolicy, PollRequest};
use serde_json::{json, Value};

fn head(cursor: &str) -> Value {
    json!({
        "cursor": cursor,
        "generated_at": "2026-10-19T08:00:00Z",
        "ttl_sec": 300,
        "counts": { "new": 2, "updated": 0, "removed": 0, "flagged": 0 },
        "sources_checked": 12,
        "sources_ok": 11,
        "all_clear": false,
        "all_clear_confidence": 0.3
    })
}

fn two_source_feed(cursor: &str) -> Value {
    json!({
        "cursor": cursor,
        "buckets": {
            "new": [
                { "source_id": "a", "headline": "X" },
                { "source_id": "b", "headline": "Y" }
            ]
        }
    })
}

fn sources_doc() -> Value {
    json!({
        "sources": [
            { "source_id": "a", "name": "Alpha", "tags": ["sec"], "status": "ok" },
            { "source_id": "b", "name": "Beta", "tags": ["ops"], "status": "degraded" }
        ]
    })
}

fn req(sources: Option<&[&str]>, tags: Option<&[&str]>) -> PollRequest {
    let own = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    PollRequest {
        sources: sources.map(own),
        tags: tags.map(own),
        ..PollRequest::default()
    }
}

#[tokio::test]
async fn head_checks_never_advance_the_cursor() {
    let stub = StubTransport::new();
    stub.set("/head.json", head("C1"));
    let sync = session(&stub, MetadataFailurePolicy::Degrade);

    let first = sync.check_head(None).await.unwrap();
    let second = sync.check_head(None).await.unwrap();
    assert!(first.changed);
    assert!(second.changed);
    assert!(second.previous_cursor.is_none());
    assert!(sync.cursors().is_empty());
    assert_eq!(stub.count("/latest.json"), 0);

    assert_eq!(first.sources_checked, 12);
    assert_eq!(first.all_clear_confidence, Some(0.3));
}

#[tokio::test]
async fn confirmed_cursor_settles_and_short_circuits() {
    let stub = StubTransport::new();
    stub.set("/head.json", head("C1"));
    stub.set("/latest.json", two_source_feed("C1"));
    let sync = session(&stub, MetadataFailurePolicy::Degrade);

    let first = sync.poll(&PollRequest::default()).await.unwrap();
    assert!(first.changed);
    assert_eq!(first.shown, 2);

    let head = sync.check_head(None).await.unwrap();
    assert!(!head.changed);
    assert_eq!(head.previous_cursor.as_ref().map(|c| c.as_str()), Some("C1"));

    let second = sync.poll(&PollRequest::default()).await.unwrap();
    assert!(!second.changed);
    assert_eq!(second.text, "No changes since last check (cursor C1).");
    assert_eq!(stub.count("/latest.json"), 1);
}

#[tokio::test]
async fn different_head_cursor_is_a_change_regardless_of_counts() {
    let stub = StubTransport::new();
    stub.set("/head.json", head("A"));
    stub.set("/latest.json", two_source_feed("A"));
    let sync = session(&stub, MetadataFailurePolicy::Degrade);
    sync.poll(&PollRequest::default()).await.unwrap();

    stub.set("/head.json", json!({ "cursor": "B", "counts": {} }));
    let status = sync.check_head(None).await.unwrap();
    assert!(status.changed);
    assert_eq!(status.counts.total(), 0);
}

#[tokio::test]
async fn document_without_cursor_leaves_state_unknown() {
    let stub = StubTransport::new();
    stub.set("/head.json", head("C1"));
    stub.set("/latest.json", json!({ "buckets": { "new": [ { "source_id": "a", "headline": "X" } ] } }));
    let sync = session(&stub, MetadataFailurePolicy::Degrade);

    assert!(sync.poll(&PollRequest::default()).await.unwrap().changed);
    assert!(sync.cursors().is_empty());
    assert!(sync.poll(&PollRequest::default()).await.unwrap().changed);
    assert_eq!(stub.count("/latest.json"), 2);
}

#[tokio::test]
async fn failed_full_fetch_keeps_previous_cursor() {
    let stub = StubTransport::new();
    stub.set("/head.json", head("C1"));
    stub.fail("/latest.json", 500);
    let sync = session(&stub, MetadataFailurePolicy::Degrade);

    let err = sync.poll(&PollRequest::default()).await.unwrap_err();
    assert_eq!(err.kind(), "http");
    assert!(sync.cursors().is_empty());
}

#[tokio::test]
async fn modern_and_legacy_items_render_same_risk() {
    let stub = StubTransport::new();
    stub.set("/head.json", head("C1"));
    stub.set(
        "/latest.json",
        json!({
            "cursor": "C1",
            "buckets": {
                "new": [
                    { "source_id": "a", "headline": "modern", "risk": { "score": 0.98 } },
                    { "source_id": "a", "headline": "legacy", "risk_score": 9.8 }
                ]
            }
        }),
    );
    let sync = session(&stub, MetadataFailurePolicy::Degrade);
    let text = sync.poll(&PollRequest::default()).await.unwrap().text;
    assert_eq!(text.matches("risk:9.8/10").count(), 2, "{text}");
}

#[tokio::test]
async fn source_and_tag_filters_compose() {
    let stub = StubTransport::new();
    stub.set("/head.json", head("C1"));
    stub.set("/latest.json", two_source_feed("C1"));
    stub.set("/sources.json", sources_doc());

    let only_a = session(&stub, MetadataFailurePolicy::Degrade)
        .poll(&req(Some(&["a"]), None))
        .await
        .unwrap();
    assert!(only_a.text.contains("a: X"));
    assert!(!only_a.text.contains("b: Y"));
    assert_eq!(stub.count("/sources.json"), 0);

    let only_ops = session(&stub, MetadataFailurePolicy::Degrade)
        .poll(&req(None, Some(&["ops"])))
        .await
        .unwrap();
    assert!(only_ops.text.contains("b: Y"));
    assert!(!only_ops.text.contains("a: X"));
    assert_eq!(only_ops.shown, 1);

    let none = session(&stub, MetadataFailurePolicy::Degrade)
        .poll(&req(Some(&["a"]), Some(&["ops"])))
        .await
        .unwrap();
    assert_eq!(none.text, NO_MATCHING_ITEMS);
    assert_eq!(none.shown, 0);
}

#[tokio::test]
async fn failed_metadata_lookup_degrades_to_unfiltered() {
    let stub = StubTransport::new();
    stub.set("/head.json", head("C1"));
    stub.set("/latest.json", two_source_feed("C1"));
    stub.fail("/sources.json", 503);

    let unfiltered = session(&stub, MetadataFailurePolicy::Degrade)
        .poll(&PollRequest::default())
        .await
        .unwrap();
    let tagged = session(&stub, MetadataFailurePolicy::Degrade)
        .poll(&req(None, Some(&["ops"])))
        .await
        .unwrap();
    assert_eq!(tagged.text, unfiltered.text);
    assert!(tagged.tag_filter_skipped);

    // Source filter still applies while tags are skipped.
    let by_source = session(&stub, MetadataFailurePolicy::Degrade)
        .poll(&req(Some(&["b"]), Some(&["sec"])))
        .await
        .unwrap();
    assert_eq!(by_source.shown, 1);
    assert!(by_source.text.contains("b: Y"));

    let strict = session(&stub, MetadataFailurePolicy::Fail)
        .poll(&req(None, Some(&["ops"])))
        .await
        .unwrap_err();
    assert_eq!(strict.kind(), "http");
}

#[tokio::test]
async fn long_excerpt_is_cut_at_200_chars() {
    let excerpt = format!("{}{}", "x".repeat(200), "y".repeat(50));
    let stub = StubTransport::new();
    stub.set("/head.json", head("C1"));
    stub.set(
        "/latest.json",
        json!({
            "cursor": "C1",
            "buckets": { "new": [ { "source_id": "s", "headline": "h", "content": excerpt } ] }
        }),
    );
    let text = session(&stub, MetadataFailurePolicy::Degrade)
        .poll(&PollRequest::default())
        .await
        .unwrap()
        .text;
    assert!(text.contains(&format!("\n  {}", "x".repeat(200))));
    assert!(!text.contains('y'));
    assert!(!text.contains('…'));
}

#[tokio::test]
async fn empty_feed_differs_from_filtered_to_empty() {
    let stub = StubTransport::new();
    stub.set("/head.json", head("C1"));
    stub.set("/latest.json", json!({ "cursor": "C1", "buckets": {} }));
    let empty = session(&stub, MetadataFailurePolicy::Degrade)
        .poll(&PollRequest::default())
        .await
        .unwrap();
    assert_eq!(empty.text, EMPTY_FEED);

    stub.set("/latest.json", two_source_feed("C1"));
    let filtered = session(&stub, MetadataFailurePolicy::Degrade)
        .poll(&req(Some(&["nobody"]), None))
        .await
        .unwrap();
    assert_eq!(filtered.text, NO_MATCHING_ITEMS);
    assert_ne!(empty.text, filtered.text);
}

#[tokio::test]
async fn narrative_is_prepended_and_flagged_leads() {
    let stub = StubTransport::new();
    stub.set("/head.json", head("C1"));
    stub.set(
        "/latest.json",
        json!({
            "cursor": "C1",
            "batch_narrative": "One exploited CVE; otherwise quiet.",
            "buckets": {
                "new": [ { "source_id": "a", "headline": "minor release" } ],
                "flagged": [ {
                    "source_id": "nvd", "headline": "CVE-2026-0001",
                    "evidence": { "severity": { "level": "critical", "cvss": 9.8, "exploited": true } },
                    "suggested_action": "patch_immediately"
                } ]
            }
        }),
    );
    let text = session(&stub, MetadataFailurePolicy::Degrade)
        .poll(&PollRequest::default())
        .await
        .unwrap()
        .text;
    assert!(text.starts_with("Summary: One exploited CVE; otherwise quiet.\n\n2 items (of 2 in feed):\n\n"));
    let flagged = text.find("[FLAGGED] nvd").unwrap();
    let new = text.find("[NEW] a").unwrap();
    assert!(flagged < new);
    assert!(text.contains("severity:critical(9.8) | ⚠ EXPLOITED"));
    assert!(text.contains("action: patch_immediately"));
}

#[tokio::test]
async fn source_feeds_track_independent_cursors() {
    let stub = StubTransport::new();
    stub.set("/head.json", head("G1"));
    stub.set("/latest.json", two_source_feed("G1"));
    stub.set("/head.json?source=a", head("A1"));
    stub.set("/latest.json?source=a", two_source_feed("A1"));
    let sync = session(&stub, MetadataFailurePolicy::Degrade);

    let a = sync
        .poll(&PollRequest {
            source: Some("a".into()),
            ..PollRequest::default()
        })
        .await
        .unwrap();
    assert!(a.changed);
    assert_eq!(a.feed_key.to_string(), "source:a");

    // The global feed is still unknown.
    assert!(sync.check_head(None).await.unwrap().changed);
    assert!(!sync.check_head(Some("a")).await.unwrap().changed);
    assert_eq!(sync.cursors().len(), 1);
}

#[tokio::test]
async fn concurrent_polls_on_different_feeds() {
    let stub = StubTransport::new();
    for id in ["a", "b", "c", "d"] {
        stub.set(&format!("/head.json?source={id}"), head(&format!("{id}1")));
        stub.set(&format!("/latest.json?source={id}"), two_source_feed(&format!("{id}1")));
    }
    let sync = std::sync::Arc::new(session(&stub, MetadataFailurePolicy::Degrade));

    let mut tasks = Vec::new();
    for id in ["a", "b", "c", "d"] {
        let sync = sync.clone();
        tasks.push(tokio::spawn(async move {
            sync.poll(&PollRequest {
                source: Some(id.to_string()),
                ..PollRequest::default()
            })
            .await
        }));
    }
    for t in tasks {
        assert!(t.await.unwrap().unwrap().changed);
    }

    let cursors = sync.cursors();
    assert_eq!(cursors.len(), 4);
    assert!(cursors.iter().all(|(k, c)| c.as_str() == format!("{}1", k.source_id().unwrap())));
}

#[tokio::test]
async fn resources_and_listings_do_not_touch_cursors() {
    let stub = StubTransport::new();
    stub.set("/latest.json", two_source_feed("C1"));
    stub.set("/sources.json", sources_doc());
    stub.set(
        "/healthz.json",
        json!({ "ok": true, "sources_checked": 12, "sources_ok": 12, "time": "2026-10-19T08:00:00Z", "engine_version": "3.1.0" }),
    );
    let sync = session(&stub, MetadataFailurePolicy::Degrade);

    let doc = sync.latest_document(None).await.unwrap();
    assert_eq!(doc.buckets.total(), 2);
    assert!(sync.cursors().is_empty());

    let health = sync.health().await.unwrap();
    assert!(health.ok);
    assert_eq!(health.engine_version.as_deref(), Some("3.1.0"));

    let all = sync.list_sources(None).await.unwrap();
    assert!(all.starts_with("2 sources:"));
    let ops = sync.list_sources(Some("ops")).await.unwrap();
    assert_eq!(ops, "1 source:\n\n- b (Beta) [degraded] tags: ops");
}

#[tokio::test]
async fn null_counters_in_head_read_as_zero() {
    let stub = StubTransport::new();
    stub.set(
        "/head.json",
        json!({ "cursor": "C1", "counts": null, "sources_checked": null, "sources_ok": null }),
    );
    let sync = session(&stub, MetadataFailurePolicy::Degrade);

    let status = sync.check_head(None).await.unwrap();
    assert!(status.changed);
    assert_eq!(status.counts.total(), 0);
    assert_eq!(status.sources_checked, 0);
    assert_eq!(status.sources_ok, 0);
}

#[tokio::test]
async fn huge_ttl_leaves_staleness_unknown() {
    let stub = StubTransport::new();
    stub.set(
        "/head.json",
        json!({ "cursor": "C1", "generated_at": "2026-10-19T08:00:00Z", "ttl_sec": 10_000_000_000_000u64 }),
    );
    let sync = session(&stub, MetadataFailurePolicy::Degrade);

    let status = sync.check_head(None).await.unwrap();
    assert_eq!(status.cursor.as_ref().map(|c| c.as_str()), Some("C1"));
    assert!(status.stale.is_none());
}

#[tokio::test]
async fn one_item_with_null_list_does_not_sink_the_poll() {
    let stub = StubTransport::new();
    stub.set("/head.json", head("C1"));
    stub.set(
        "/latest.json",
        json!({
            "cursor": "C1",
            "buckets": {
                "new": [
                    { "source_id": "a", "headline": "healthy" },
                    {
                        "source_id": "b",
                        "headline": "sunset",
                        "evidence": { "deprecation": { "type": "api", "affected": null } }
                    }
                ],
                "updated": null
            }
        }),
    );
    let sync = session(&stub, MetadataFailurePolicy::Degrade);

    let report = sync.poll(&PollRequest::default()).await.unwrap();
    assert!(report.changed);
    assert_eq!(report.shown, 2);
    assert!(report.text.contains("healthy"));
    assert!(report.text.contains("sunset"));
    assert_eq!(sync.cursors().len(), 1);
}
