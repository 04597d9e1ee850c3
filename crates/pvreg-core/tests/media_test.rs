#![allow(clippy::unwrap_used)]
// Integration tests for the media library facade.

mod common;

use std::sync::Arc;

use pretty_assertions::assert_eq;

use common::{MockSource, drain, registry, sources, tag};
use pvreg_core::{
    ClientCapabilities, CoreError, EntityKey, MediaFilter, MediaLibrary, MediaTag, MemoryStore,
    ResumePoint,
};

fn radio(client: i32, uid: &str, deleted: bool) -> MediaTag {
    let mut t = tag(client, uid, uid);
    t.is_radio = true;
    t.is_deleted = deleted;
    t
}

fn deleted_tv(client: i32, uid: &str) -> MediaTag {
    let mut t = tag(client, uid, uid);
    t.is_deleted = true;
    t
}

fn point() -> ResumePoint {
    ResumePoint {
        position_secs: 600.0,
        total_secs: 1800.0,
    }
}

async fn library(client: &Arc<MockSource>) -> (MediaLibrary, tokio::sync::broadcast::Receiver<pvreg_core::RegistryEvent>) {
    let clients = sources(&[client]);
    let (reg, rx) = registry::<MediaTag>(&clients, Arc::new(MemoryStore::new()));
    let lib = MediaLibrary::new(reg);
    assert!(lib.refresh().await.is_completed());
    (lib, rx)
}

// ── Counters ────────────────────────────────────────────────────────

#[tokio::test]
async fn counters_split_tv_radio_and_deleted() {
    let client = MockSource::new(1);
    client.report_media(vec![tag(1, "t1", "T1"), tag(1, "t2", "T2"), radio(1, "r1", false)]);
    client.report_deleted_media(vec![deleted_tv(1, "t3")]);
    let (lib, _rx) = library(&client).await;

    assert_eq!(lib.tv_count(), 2);
    assert_eq!(lib.radio_count(), 1);
    assert!(lib.has_deleted_tv());
    assert!(!lib.has_deleted_radio());
    assert_eq!(lib.filtered(&MediaFilter::Deleted).len(), 1);
}

#[tokio::test]
async fn deleted_bin_skipped_without_capability() {
    let client = MockSource::new(1);
    client.set_capabilities(ClientCapabilities {
        supports_media: true,
        ..ClientCapabilities::default()
    });
    client.report_media(vec![tag(1, "t1", "T1")]);
    client.report_deleted_media(vec![radio(1, "r9", true)]);
    let (lib, _rx) = library(&client).await;

    assert_eq!(lib.list().len(), 1);
    assert!(!lib.has_deleted_radio());
}

#[tokio::test]
async fn lookup_by_path() {
    let client = MockSource::new(4);
    client.report_media(vec![radio(4, "abc", false)]);
    let (lib, _rx) = library(&client).await;

    let found = lib.by_path("pvr://media/radio/active/4/abc").unwrap();
    assert_eq!(found.uid(), "abc");
    assert!(lib.by_path("pvr://media/tv/active/4/abc").is_none());
    assert!(lib.by_client(pvreg_core::ClientId(4), "abc").is_some());
}

// ── Play count authority ────────────────────────────────────────────

#[tokio::test]
async fn local_play_count_survives_refresh_without_capability() {
    let client = MockSource::new(1);
    client.report_media(vec![tag(1, "x", "X")]);
    let (lib, _rx) = library(&client).await;
    let key = EntityKey::new(1, "x");

    let updated = lib.set_play_count(&key, 5).await.unwrap();
    assert_eq!(updated.play_count, 5);
    assert!(client.forwarded_play_counts.lock().unwrap().is_empty());

    let report = lib.refresh().await;
    assert!(!report.report().unwrap().changed());
    assert_eq!(lib.by_client(pvreg_core::ClientId(1), "x").unwrap().play_count, 5);
}

#[tokio::test]
async fn backend_play_count_is_forwarded_and_wins_on_refresh() {
    let client = MockSource::new(1);
    client.set_capabilities(ClientCapabilities::all());
    client.report_media(vec![tag(1, "x", "X")]);
    let (lib, _rx) = library(&client).await;
    let key = EntityKey::new(1, "x");

    lib.set_play_count(&key, 2).await.unwrap();
    assert_eq!(
        *client.forwarded_play_counts.lock().unwrap(),
        vec![("x".to_owned(), 2)]
    );

    // The backend still reports 0; it owns the value.
    lib.refresh().await;
    assert_eq!(lib.by_client(pvreg_core::ClientId(1), "x").unwrap().play_count, 0);
}

#[tokio::test]
async fn forwarding_failure_is_returned_but_local_value_stands() {
    let client = MockSource::new(1);
    client.set_capabilities(ClientCapabilities::all());
    client.fail_forwarding();
    client.report_media(vec![tag(1, "x", "X")]);
    let (lib, _rx) = library(&client).await;
    let key = EntityKey::new(1, "x");

    let err = lib.increment_play_count(&key).await.unwrap_err();
    assert!(matches!(err, CoreError::Client(_)));
    assert_eq!(lib.by_client(pvreg_core::ClientId(1), "x").unwrap().play_count, 1);
}

#[tokio::test]
async fn watched_toggles_play_count_and_clears_resume_point() {
    let client = MockSource::new(1);
    client.report_media(vec![tag(1, "x", "X")]);
    let (lib, mut rx) = library(&client).await;
    drain(&mut rx);
    let key = EntityKey::new(1, "x");

    lib.set_resume_point(&key, point()).await.unwrap();
    let watched = lib.mark_watched(&key, true).await.unwrap();
    assert_eq!(watched.play_count, 1);
    assert!(watched.resume_point.is_none());
    assert!(watched.is_watched());

    let again = lib.mark_watched(&key, true).await.unwrap();
    assert_eq!(again.play_count, 2);

    let unwatched = lib.mark_watched(&key, false).await.unwrap();
    assert_eq!(unwatched.play_count, 0);
    assert_eq!(drain(&mut rx), 4);
}

#[tokio::test]
async fn resume_point_reset_is_forwarded_when_backend_owns_it() {
    let client = MockSource::new(1);
    client.set_capabilities(ClientCapabilities {
        supports_media: true,
        supports_media_last_played_position: true,
        ..ClientCapabilities::default()
    });
    client.report_media(vec![tag(1, "x", "X")]);
    let (lib, _rx) = library(&client).await;
    let key = EntityKey::new(1, "x");

    lib.set_resume_point(&key, point()).await.unwrap();
    let reset = lib.reset_resume_point(&key).await.unwrap();

    assert!(reset.resume_point.is_none());
    assert_eq!(
        *client.forwarded_resume_points.lock().unwrap(),
        vec![("x".to_owned(), Some(point())), ("x".to_owned(), None)]
    );
}

#[tokio::test]
async fn watching_clears_resume_point_on_backend_that_owns_it() {
    let client = MockSource::new(1);
    client.set_capabilities(ClientCapabilities {
        supports_media: true,
        supports_media_last_played_position: true,
        ..ClientCapabilities::default()
    });
    let mut started = tag(1, "x", "X");
    started.resume_point = Some(point());
    client.report_media(vec![started]);
    let (lib, _rx) = library(&client).await;
    let key = EntityKey::new(1, "x");
    assert_eq!(lib.by_client(pvreg_core::ClientId(1), "x").unwrap().resume_point, Some(point()));

    let watched = lib.mark_watched(&key, true).await.unwrap();

    assert!(watched.resume_point.is_none());
    assert_eq!(
        *client.forwarded_resume_points.lock().unwrap(),
        vec![("x".to_owned(), None)]
    );

    // The backend applied the reset; the next cycle must not revive it.
    client.report_media(vec![tag(1, "x", "X")]);
    lib.refresh().await;
    assert!(lib.by_client(pvreg_core::ClientId(1), "x").unwrap().resume_point.is_none());
}

#[tokio::test]
async fn unwatching_leaves_backend_resume_point_alone() {
    let client = MockSource::new(1);
    client.set_capabilities(ClientCapabilities {
        supports_media: true,
        supports_media_last_played_position: true,
        ..ClientCapabilities::default()
    });
    client.report_media(vec![tag(1, "x", "X")]);
    let (lib, _rx) = library(&client).await;

    lib.set_play_count(&EntityKey::new(1, "x"), 0).await.unwrap();
    assert!(client.forwarded_resume_points.lock().unwrap().is_empty());
}

#[tokio::test]
async fn play_count_on_unknown_key_is_not_found() {
    let client = MockSource::new(1);
    let (lib, _rx) = library(&client).await;

    let err = lib.set_play_count(&EntityKey::new(1, "ghost"), 1).await.unwrap_err();
    assert!(matches!(err, CoreError::NotFound { .. }));
}
