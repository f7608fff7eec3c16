//! Submission, identity, and the start guard.

use std::time::Duration;

use crate::downloader::test_helpers::{
    create_test_downloader, sample_info, sample_input, wait_for_terminal, StubResolver,
    StubTransfer,
};
use crate::error::Error;
use crate::types::{DownloadId, DownloadStatus};

#[tokio::test]
async fn submissions_get_distinct_ids() {
    let downloader = create_test_downloader(StubResolver::ok(sample_info()), StubTransfer::ok());

    let a = downloader.submit(sample_input("https://x/a")).await.unwrap();
    let b = downloader.submit(sample_input("https://x/b")).await.unwrap();
    let c = downloader.submit(sample_input("https://x/c")).await.unwrap();

    assert_ne!(a, b);
    assert_ne!(b, c);
    assert_ne!(a, c);
}

#[tokio::test]
async fn status_right_after_submit_is_never_terminal() {
    let resolver = StubResolver::ok(sample_info()).with_delay(Duration::from_millis(200));
    let downloader = create_test_downloader(resolver, StubTransfer::ok());

    let id = downloader.submit(sample_input("https://x/a")).await.unwrap();
    let record = downloader.status(id).await.unwrap();

    assert!(
        matches!(
            record.status,
            DownloadStatus::Initial | DownloadStatus::Downloading
        ),
        "freshly submitted job observed in {}",
        record.status
    );
    assert!(record.failure.is_none());

    wait_for_terminal(&downloader, id).await;
}

#[tokio::test]
async fn duplicate_url_is_rejected_while_tracked() {
    let downloader = create_test_downloader(StubResolver::ok(sample_info()), StubTransfer::ok());

    let id = downloader.submit(sample_input("https://x/a")).await.unwrap();
    let err = downloader
        .submit(sample_input("https://x/a"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Duplicate(url) if url == "https://x/a"));

    // The original job is untouched by the rejected submission.
    wait_for_terminal(&downloader, id).await;
    assert_eq!(downloader.list().await.len(), 1);
}

#[tokio::test]
async fn status_of_unknown_id_is_not_found() {
    let downloader = create_test_downloader(StubResolver::ok(sample_info()), StubTransfer::ok());

    let err = downloader.status(DownloadId::new(999)).await.unwrap_err();
    assert!(matches!(err, Error::NotFound(id) if id == 999));
}

#[tokio::test]
async fn second_start_is_rejected_and_leaves_the_job_untouched() {
    // Slow transfer keeps the job in Downloading while we poke at it.
    let transfer = StubTransfer::ok().with_delay(Duration::from_millis(300));
    let downloader = create_test_downloader(StubResolver::ok(sample_info()), transfer);

    let id = downloader.submit(sample_input("https://x/a")).await.unwrap();

    let err = downloader.start(id).await.unwrap_err();
    assert!(
        matches!(err, Error::AlreadyStarted { id: got, .. } if got == id),
        "duplicate start must report AlreadyStarted"
    );

    // Still exactly one job, still driving toward its single terminal state.
    let record = downloader.status(id).await.unwrap();
    assert!(!record.is_terminal());
    let record = wait_for_terminal(&downloader, id).await;
    assert_eq!(record.status, DownloadStatus::Completed);
}

#[tokio::test]
async fn start_on_terminal_job_is_rejected() {
    let downloader = create_test_downloader(StubResolver::ok(sample_info()), StubTransfer::ok());

    let id = downloader.submit(sample_input("https://x/a")).await.unwrap();
    wait_for_terminal(&downloader, id).await;

    let err = downloader.start(id).await.unwrap_err();
    assert!(
        matches!(err, Error::AlreadyStarted { status, .. } if status == "completed"),
        "restarting a finished job must be rejected"
    );
}

#[tokio::test]
async fn submit_after_shutdown_is_rejected() {
    let downloader = create_test_downloader(StubResolver::ok(sample_info()), StubTransfer::ok());

    downloader.shutdown().await.unwrap();

    let err = downloader
        .submit(sample_input("https://x/a"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ShuttingDown));
}
