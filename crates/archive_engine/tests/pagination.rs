mod common;

use archive_core::FileRecord;
use archive_engine::{ArchiveView, PaginationWalker, PollSettings};
use common::{with_files, Action, FakeArchive};
use pretty_assertions::assert_eq;

fn scans(count: usize) -> Vec<FileRecord> {
    (1..=count)
        .map(|n| FileRecord::new(format!("scan-{n}"), "Jpeg"))
        .collect()
}

#[tokio::test(start_paused = true)]
async fn every_page_is_visited_once_in_order() {
    let mut archive = FakeArchive::showing_files(with_files("Case 7", scans(5)), 2);
    let total = archive.total_pages().await.unwrap();
    let mut walker = PaginationWalker::new(total);
    let mut records = archive.file_records().await.unwrap();
    let poll = PollSettings::default();

    let mut visited = Vec::new();
    while let Some(page) = walker.next_page() {
        walker
            .turn_to(&mut archive, page, &mut records, &poll)
            .await
            .unwrap();
        let ids: Vec<String> = records.iter().map(|r| r.id.clone()).collect();
        visited.push((page, ids));
    }

    assert_eq!(
        visited,
        vec![
            (1, vec!["scan-1".to_string(), "scan-2".to_string()]),
            (2, vec!["scan-3".to_string(), "scan-4".to_string()]),
            (3, vec!["scan-5".to_string()]),
        ]
    );
    assert_eq!(archive.actions, vec![Action::SetPage(2), Action::SetPage(3)]);
}

#[tokio::test(start_paused = true)]
async fn single_page_view_is_never_turned() {
    let mut archive = FakeArchive::showing_files(with_files("Case 8", scans(2)), 5);
    let mut walker = PaginationWalker::new(1);
    let mut records = archive.file_records().await.unwrap();

    let page = walker.next_page().unwrap();
    walker
        .turn_to(&mut archive, page, &mut records, &PollSettings::default())
        .await
        .unwrap();

    assert_eq!(walker.next_page(), None);
    assert!(archive.actions.is_empty());
}

#[tokio::test(start_paused = true)]
async fn turning_back_after_a_reset_restores_the_page() {
    let mut archive = FakeArchive::showing_files(with_files("Case 9", scans(4)), 2);
    let mut walker = PaginationWalker::new(2);
    let mut records = archive.file_records().await.unwrap();
    let poll = PollSettings::default();

    walker.next_page();
    let page = walker.next_page().unwrap();
    walker.turn_to(&mut archive, page, &mut records, &poll).await.unwrap();
    assert_eq!(walker.current(), Some(2));

    // Something navigated back to page 1 behind the walker's back.
    archive.set_page(1).await.unwrap();
    let mut records = archive.file_records().await.unwrap();
    walker.turn_to(&mut archive, 2, &mut records, &poll).await.unwrap();

    assert_eq!(records[0].id, "scan-3");
}
