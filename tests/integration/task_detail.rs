//! Integration tests for the task detail view against the reference server.
//!
//! Exercises the load / edit / delete state machine, document removal,
//! document download into a directory, and visibility rules between users.

#![allow(clippy::expect_used, clippy::unwrap_used, clippy::similar_names)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use taskdesk::api::ApiError;
use taskdesk::api::TaskApi;
use taskdesk::api::http::HttpApiClient;
use taskdesk::attachments::ValidationError;
use taskdesk::controller::{Confirmation, DetailState, TaskDetailController, ViewError};
use taskdesk::download::DirectorySink;
use taskdesk::session::{self, SessionStore};
use taskdesk_proto::task::{Task, TaskFields, TaskId, TaskPriority, TaskStatus, UploadFile};
use taskdesk_server::server::{self, AppState};
use taskdesk_server::store::TaskStore;

async fn start() -> (String, tokio::task::JoinHandle<()>) {
    let store = TaskStore::with_admin("admin@example.com", "admin").expect("seed admin");
    let state = Arc::new(AppState::with_config(1024 * 1024, store));
    let (addr, handle) = server::start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start server");
    (format!("http://{addr}/api"), handle)
}

async fn register(base: &str, email: &str) -> Arc<HttpApiClient> {
    let sessions = SessionStore::new();
    let api = HttpApiClient::new(base, Duration::from_secs(5), sessions.clone()).expect("client");
    session::register(&api, &sessions, email, "pw", None)
        .await
        .expect("register");
    Arc::new(api)
}

fn fields(title: &str) -> TaskFields {
    TaskFields {
        title: title.into(),
        description: "details".into(),
        status: TaskStatus::Todo,
        priority: TaskPriority::Medium,
        due_date: NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
        assigned_to_id: None,
    }
}

async fn seed(api: &HttpApiClient, files: Vec<UploadFile>) -> Task {
    api.create_task(&fields("seeded"), &files).await.unwrap()
}

// =============================================================================
// Loading
// =============================================================================

#[tokio::test]
async fn load_then_edit_round_trip() {
    let (base, _h) = start().await;
    let api = register(&base, "owner@example.com").await;
    let task = seed(&api, Vec::new()).await;

    let mut ctl = TaskDetailController::new(api.clone(), task.id);
    assert_eq!(ctl.load().await.unwrap().title, "seeded");
    assert_eq!(ctl.state(), &DetailState::Loaded);

    let mut draft = ctl.begin_edit().unwrap().clone();
    draft.title = "renamed".into();
    draft.status = TaskStatus::InProgress;
    ctl.submit_edit(draft, vec![UploadFile::pdf("a.pdf", b"%PDF".to_vec())])
        .await
        .unwrap();

    assert_eq!(ctl.state(), &DetailState::Loaded);
    let loaded = ctl.task().unwrap();
    assert_eq!(loaded.title, "renamed");
    assert_eq!(loaded.status, TaskStatus::InProgress);
    assert_eq!(loaded.documents.len(), 1);
}

#[tokio::test]
async fn missing_task_is_terminal_not_found() {
    let (base, _h) = start().await;
    let api = register(&base, "owner@example.com").await;

    let mut ctl = TaskDetailController::new(api, TaskId::new(4242));
    assert!(matches!(
        ctl.load().await,
        Err(ViewError::Api(ApiError::NotFound(_)))
    ));
    assert_eq!(ctl.state(), &DetailState::NotFound);
    assert!(matches!(
        ctl.load().await,
        Err(ViewError::InvalidState { .. })
    ));
}

#[tokio::test]
async fn other_users_task_is_forbidden() {
    let (base, _h) = start().await;
    let owner = register(&base, "owner@example.com").await;
    let stranger = register(&base, "stranger@example.com").await;
    let task = seed(&owner, Vec::new()).await;

    let mut ctl = TaskDetailController::new(stranger, task.id);
    let err = ctl.load().await.unwrap_err();
    assert!(matches!(err, ViewError::Api(ApiError::Forbidden(_))));
    assert_eq!(err.user_message(), "Access denied");
}

// =============================================================================
// Documents
// =============================================================================

#[tokio::test]
async fn deleting_only_document_keeps_task() {
    let (base, _h) = start().await;
    let api = register(&base, "owner@example.com").await;
    let task = seed(&api, vec![UploadFile::pdf("only.pdf", b"%PDF-1.4".to_vec())]).await;
    let doc = task.documents[0].id;

    let mut ctl = TaskDetailController::new(api.clone(), task.id);
    ctl.load().await.unwrap();
    ctl.delete_document(doc, Confirmation::Confirmed)
        .await
        .unwrap();

    assert_eq!(ctl.state(), &DetailState::Loaded);
    let reloaded = ctl.task().unwrap();
    assert_eq!(reloaded.id, task.id);
    assert!(reloaded.documents.is_empty());
    assert_eq!(api.get_task(task.id).await.unwrap().title, "seeded");
}

#[tokio::test]
async fn declined_document_delete_sends_nothing() {
    let (base, _h) = start().await;
    let api = register(&base, "owner@example.com").await;
    let task = seed(&api, vec![UploadFile::pdf("keep.pdf", b"%PDF".to_vec())]).await;

    let mut ctl = TaskDetailController::new(api.clone(), task.id);
    ctl.load().await.unwrap();
    ctl.delete_document(task.documents[0].id, Confirmation::Declined)
        .await
        .unwrap();

    assert_eq!(api.get_task(task.id).await.unwrap().documents.len(), 1);
}

#[tokio::test]
async fn download_writes_file_into_directory() {
    let (base, _h) = start().await;
    let api = register(&base, "owner@example.com").await;
    let content = b"%PDF-1.7 quarterly numbers".to_vec();
    let task = seed(&api, vec![UploadFile::pdf("report.pdf", content.clone())]).await;

    let dir = tempfile::tempdir().unwrap();
    let sink = DirectorySink::new(dir.path());
    let mut ctl = TaskDetailController::new(api, task.id);
    ctl.load().await.unwrap();

    let path = ctl
        .download_document(task.documents[0].id, &sink)
        .await
        .unwrap();
    assert_eq!(path, dir.path().join("report.pdf"));
    assert_eq!(std::fs::read(&path).unwrap(), content);
    assert_eq!(ctl.state(), &DetailState::Loaded);
    assert!(ctl.alert().is_none());
}

#[tokio::test]
async fn edit_respects_remaining_slots() {
    let (base, _h) = start().await;
    let api = register(&base, "owner@example.com").await;
    let task = seed(
        &api,
        vec![
            UploadFile::pdf("one.pdf", b"1".to_vec()),
            UploadFile::pdf("two.pdf", b"2".to_vec()),
        ],
    )
    .await;

    let mut ctl = TaskDetailController::new(api.clone(), task.id);
    ctl.load().await.unwrap();
    let draft = ctl.begin_edit().unwrap().clone();
    let err = ctl
        .submit_edit(
            draft,
            vec![
                UploadFile::pdf("three.pdf", b"3".to_vec()),
                UploadFile::pdf("four.pdf", b"4".to_vec()),
            ],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ViewError::Validation(ValidationError::TooManyFiles(1))
    ));
    assert_eq!(ctl.state(), &DetailState::Editing);
    assert!(ctl.form_error().is_some());
    assert_eq!(api.get_task(task.id).await.unwrap().documents.len(), 2);
}

// =============================================================================
// Deletion
// =============================================================================

#[tokio::test]
async fn confirmed_delete_is_terminal() {
    let (base, _h) = start().await;
    let api = register(&base, "owner@example.com").await;
    let task = seed(&api, Vec::new()).await;

    let mut ctl = TaskDetailController::new(api.clone(), task.id);
    ctl.load().await.unwrap();
    ctl.delete_task(Confirmation::Confirmed).await.unwrap();

    assert_eq!(ctl.state(), &DetailState::Deleted);
    assert!(ctl.task().is_none());
    assert!(matches!(
        api.get_task(task.id).await,
        Err(ApiError::NotFound(_))
    ));
}
