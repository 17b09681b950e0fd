use std::sync::Arc;

use chrono::Duration;
use course_core::model::{BookmarkId, ModuleId, ProgressUpdate, UserId};
use course_core::time::fixed_now;
use storage::repository::{NewBookmark, NewQuizAttempt, Storage};

fn bookmark(user: u64, module: u64, section: &str) -> NewBookmark {
    NewBookmark {
        user_id: UserId::new(user),
        module_id: ModuleId::new(module),
        section_id: section.to_string(),
        title: format!("Module {module} / {section}"),
        created_at: fixed_now(),
    }
}

#[tokio::test]
async fn completed_at_is_never_cleared() {
    let storage = Storage::in_memory();
    let user = UserId::new(1);
    let module = ModuleId::new(4);

    let done = ProgressUpdate::new(user, module, true, Some(85)).unwrap();
    let first = storage.progress.upsert_progress(&done, fixed_now()).await.unwrap();
    assert_eq!(first.completed_at, Some(fixed_now()));

    let undone = ProgressUpdate::new(user, module, false, None).unwrap();
    let later = fixed_now() + Duration::minutes(5);
    let second = storage.progress.upsert_progress(&undone, later).await.unwrap();
    assert!(!second.completed);
    assert_eq!(second.quiz_score, Some(85));
    assert_eq!(second.completed_at, Some(fixed_now()));
}

#[tokio::test]
async fn bookmarks_are_per_user_and_deletable_by_anyone() {
    let storage = Storage::in_memory();
    let mine = storage.bookmarks.insert_bookmark(bookmark(1, 2, "intro")).await.unwrap();
    storage.bookmarks.insert_bookmark(bookmark(1, 3, "gmp")).await.unwrap();
    storage.bookmarks.insert_bookmark(bookmark(2, 2, "intro")).await.unwrap();

    let listed = storage.bookmarks.list_bookmarks(UserId::new(1)).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert!(listed.windows(2).all(|w| w[0].id < w[1].id));

    assert!(storage.bookmarks.delete_bookmark(mine.id).await.unwrap());
    assert!(!storage.bookmarks.delete_bookmark(mine.id).await.unwrap());
    assert!(!storage.bookmarks.delete_bookmark(BookmarkId::new(999)).await.unwrap());
    assert_eq!(storage.bookmarks.list_bookmarks(UserId::new(1)).await.unwrap().len(), 1);
}

#[tokio::test]
async fn reset_leaves_other_learners_alone() {
    let storage = Storage::in_memory();
    for user in [1, 2] {
        let update = ProgressUpdate::new(UserId::new(user), ModuleId::new(1), true, None).unwrap();
        storage.progress.upsert_progress(&update, fixed_now()).await.unwrap();
        storage
            .attempts
            .append_attempt(NewQuizAttempt {
                user_id: UserId::new(user),
                module_id: ModuleId::new(2),
                answers: Default::default(),
                score: 0,
                passed: false,
                attempted_at: fixed_now(),
            })
            .await
            .unwrap();
        storage.bookmarks.insert_bookmark(bookmark(user, 1, "intro")).await.unwrap();
    }

    let report = storage.resets.reset_user(UserId::new(1)).await.unwrap();
    assert_eq!((report.progress, report.attempts, report.bookmarks), (1, 1, 1));

    let other = UserId::new(2);
    assert_eq!(storage.progress.list_progress(other).await.unwrap().len(), 1);
    assert_eq!(storage.attempts.list_attempts(other, None).await.unwrap().len(), 1);
    assert_eq!(storage.bookmarks.list_bookmarks(other).await.unwrap().len(), 1);
    assert!(storage.progress.list_progress(UserId::new(1)).await.unwrap().is_empty());
}

#[tokio::test]
async fn concurrent_upserts_keep_a_single_record() {
    let storage = Storage::in_memory();
    let progress = Arc::clone(&storage.progress);
    let mut handles = Vec::new();
    for score in 0..32u8 {
        let progress = Arc::clone(&progress);
        handles.push(tokio::spawn(async move {
            let update =
                ProgressUpdate::new(UserId::new(1), ModuleId::new(5), score % 2 == 0, Some(score))
                    .unwrap();
            progress.upsert_progress(&update, fixed_now()).await.unwrap()
        }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let records = storage.progress.list_progress(UserId::new(1)).await.unwrap();
    assert_eq!(records.len(), 1);
}

#[tokio::test]
async fn attempt_ids_increase_in_append_order() {
    let storage = Storage::in_memory();
    let mut last = None;
    for score in [10, 60, 100] {
        let stored = storage
            .attempts
            .append_attempt(NewQuizAttempt {
                user_id: UserId::new(1),
                module_id: ModuleId::new(3),
                answers: Default::default(),
                score,
                passed: score >= 75,
                attempted_at: fixed_now(),
            })
            .await
            .unwrap();
        assert!(last.is_none_or(|prev| prev < stored.id));
        last = Some(stored.id);
    }
    let scores: Vec<u8> = storage
        .attempts
        .list_attempts(UserId::new(1), Some(ModuleId::new(3)))
        .await
        .unwrap()
        .iter()
        .map(|a| a.score)
        .collect();
    assert_eq!(scores, vec![10, 60, 100]);
}
