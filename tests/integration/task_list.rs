//! Integration tests for the task list view.
//!
//! Covers stale-response suppression when filters change faster than the
//! server answers, filtering and sorting against the reference server, and
//! attachment pre-checks that must stop a submission before any request.

#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::similar_names,
    clippy::redundant_clone
)]

use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;
use taskdesk::api::TaskApi;
use taskdesk::api::http::HttpApiClient;
use taskdesk::api::loopback::{Call, Endpoint, LoopbackApi, Reply};
use taskdesk::attachments::ValidationError;
use taskdesk::controller::ViewError;
use taskdesk::controller::tasks::TaskListController;
use taskdesk::draft::TaskDraft;
use taskdesk::roster::{AssigneeCheck, load_assignees, locate_assignee};
use taskdesk::session::{self, SessionStore};
use taskdesk::sync::FetchOutcome;
use taskdesk_proto::page::Page;
use taskdesk_proto::query::{SortDirection, TaskQueryPatch, TaskSortField};
use taskdesk_proto::task::{Task, TaskId, TaskPriority, TaskStatus, UploadFile};
use taskdesk_proto::user::{NewUser, Role, UserId};
use taskdesk_server::server::{self, AppState};
use taskdesk_server::store::TaskStore;

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

fn task(id: i64, status: TaskStatus) -> Task {
    Task {
        id: TaskId::new(id),
        title: format!("task {id}"),
        description: String::new(),
        status,
        priority: TaskPriority::Medium,
        due_date: date(1),
        assigned_to_id: None,
        assigned_to_email: None,
        created_by_id: None,
        created_by_email: "owner@example.com".into(),
        documents: Vec::new(),
    }
}

/// Start the reference server in-process and return a signed-in client.
async fn signed_in_client() -> (Arc<HttpApiClient>, tokio::task::JoinHandle<()>) {
    let store = TaskStore::with_admin("admin@example.com", "admin").expect("seed admin");
    let state = Arc::new(AppState::with_config(1024 * 1024, store));
    let (addr, handle) = server::start_server_with_state("127.0.0.1:0", state)
        .await
        .expect("failed to start server");

    let sessions = SessionStore::new();
    let api = HttpApiClient::new(
        &format!("http://{addr}/api"),
        Duration::from_secs(5),
        sessions.clone(),
    )
    .expect("client");
    session::login(&api, &sessions, "admin@example.com", "admin")
        .await
        .expect("login");
    (Arc::new(api), handle)
}

fn draft(title: &str, status: TaskStatus, priority: TaskPriority, due: NaiveDate) -> TaskDraft {
    TaskDraft {
        title: title.into(),
        status,
        priority,
        due_date: Some(due),
        ..TaskDraft::default()
    }
}

// =============================================================================
// Stale responses
// =============================================================================

#[tokio::test]
async fn slower_first_response_is_discarded() {
    let api = Arc::new(LoopbackApi::new());
    let release_d1 = api.reply_gated(
        Endpoint::ListTasks,
        Ok(Reply::Tasks(Page::slice(&[task(1, TaskStatus::Todo)], 0, 10))),
    );
    api.reply(
        Endpoint::ListTasks,
        Ok(Reply::Tasks(Page::slice(&[task(2, TaskStatus::Done)], 0, 10))),
    );
    let ctl = Arc::new(TaskListController::new(api.clone(), 10));

    // D1: status TODO, held by the server.
    let first = {
        let ctl = ctl.clone();
        tokio::spawn(async move {
            ctl.set_filter(&TaskQueryPatch::default().status(Some(TaskStatus::Todo)))
                .await
        })
    };
    while api.call_count(Endpoint::ListTasks) < 1 {
        tokio::task::yield_now().await;
    }

    // D2: status DONE, answered immediately.
    let second = ctl
        .set_filter(&TaskQueryPatch::default().status(Some(TaskStatus::Done)))
        .await;
    assert_eq!(second, FetchOutcome::Applied);

    release_d1.send(()).unwrap();
    assert_eq!(first.await.unwrap(), FetchOutcome::Superseded);

    let state = ctl.state();
    assert_eq!(state.items().len(), 1);
    assert_eq!(state.items()[0].id, TaskId::new(2));
    assert!(!state.is_loading());
    assert_eq!(ctl.query().status, Some(TaskStatus::Done));
}

#[tokio::test]
async fn filter_change_resets_to_first_page() {
    let api = Arc::new(LoopbackApi::new());
    api.reply(Endpoint::ListTasks, Ok(Reply::Tasks(Page::slice(&[], 3, 10))));
    api.reply(Endpoint::ListTasks, Ok(Reply::Tasks(Page::slice(&[], 0, 10))));
    let ctl = TaskListController::new(api.clone(), 10);

    let _ = ctl.set_page(3).await;
    assert_eq!(ctl.query().page, 3);
    let _ = ctl
        .set_filter(&TaskQueryPatch::default().priority(Some(TaskPriority::High)))
        .await;

    let calls = api.calls();
    let Some(Call::ListTasks(last)) = calls.last() else {
        panic!("expected a list call");
    };
    assert_eq!(last.page, 0);
    assert_eq!(last.priority, Some(TaskPriority::High));
}

// =============================================================================
// Against the reference server
// =============================================================================

#[tokio::test]
async fn done_high_filter_sorted_by_due_date() {
    let (api, _handle) = signed_in_client().await;
    let ctl = TaskListController::new(api.clone(), 10);

    let seeds = [
        ("late", TaskStatus::Done, TaskPriority::High, date(20)),
        ("early", TaskStatus::Done, TaskPriority::High, date(5)),
        ("open", TaskStatus::Todo, TaskPriority::High, date(1)),
        ("minor", TaskStatus::Done, TaskPriority::Low, date(2)),
    ];
    for (title, status, priority, due) in seeds {
        ctl.create_task(&draft(title, status, priority, due), Vec::new())
            .await
            .unwrap();
    }

    let patch = TaskQueryPatch::default()
        .status(Some(TaskStatus::Done))
        .priority(Some(TaskPriority::High))
        .sort(TaskSortField::DueDate, SortDirection::Asc);
    assert_eq!(ctl.set_filter(&patch).await, FetchOutcome::Applied);

    let state = ctl.state();
    let titles: Vec<_> = state.items().iter().map(|t| t.title.as_str()).collect();
    assert_eq!(titles, ["early", "late"]);
    assert_eq!(state.current_page(), 0);
    assert_eq!(state.total_pages(), 1);
    assert!(state.error().is_none());
}

#[tokio::test]
async fn pages_follow_server_totals() {
    let (api, _handle) = signed_in_client().await;
    let ctl = TaskListController::new(api.clone(), 2);
    for day in 1..=5 {
        ctl.create_task(
            &draft(&format!("t{day}"), TaskStatus::Todo, TaskPriority::Low, date(day)),
            Vec::new(),
        )
        .await
        .unwrap();
    }

    assert_eq!(ctl.set_page(2).await, FetchOutcome::Applied);
    let state = ctl.state();
    assert_eq!(state.total_pages(), 3);
    assert_eq!(state.current_page(), 2);
    assert_eq!(state.items().len(), 1);
}

#[tokio::test]
async fn create_with_pdf_attaches_document() {
    let (api, _handle) = signed_in_client().await;
    let ctl = TaskListController::new(api.clone(), 10);

    let created = ctl
        .create_task(
            &draft("with file", TaskStatus::InProgress, TaskPriority::Medium, date(9)),
            vec![UploadFile::pdf("brief.pdf", b"%PDF-1.7 brief".to_vec())],
        )
        .await
        .unwrap();

    assert_eq!(created.documents.len(), 1);
    assert_eq!(created.documents[0].file_name, "brief.pdf");
    assert_eq!(ctl.state().items().len(), 1);
}

#[tokio::test]
async fn assignee_past_first_roster_page_is_left_to_server() {
    let (api, _handle) = signed_in_client().await;
    let admin = api.session().user().unwrap();
    let worker = api
        .create_user(&NewUser {
            email: "worker@example.com".into(),
            password: "pw".into(),
            role: Role::User,
        })
        .await
        .unwrap();

    let roster = load_assignees(api.as_ref(), &admin, 1).await.unwrap();
    assert_eq!(roster.len(), 1);
    assert_eq!(locate_assignee(&roster, 1, worker.id), AssigneeCheck::Unlisted);

    let ctl = TaskListController::new(api.clone(), 10);
    let mut assigned = draft("delegated", TaskStatus::Todo, TaskPriority::Low, date(3));
    assigned.assigned_to_id = Some(worker.id);
    let task = ctl.create_task(&assigned, Vec::new()).await.unwrap();
    assert_eq!(task.assigned_to_id, Some(worker.id));

    assigned.assigned_to_id = Some(UserId::new(999));
    let err = ctl.create_task(&assigned, Vec::new()).await.unwrap_err();
    assert_eq!(err.user_message(), "Assigned user not found");
}

// =============================================================================
// Attachment pre-checks
// =============================================================================

#[tokio::test]
async fn four_files_are_rejected_without_a_request() {
    let api = Arc::new(LoopbackApi::new());
    let ctl = TaskListController::new(api.clone(), 10);
    let files = (0..4)
        .map(|i| UploadFile::pdf(format!("f{i}.pdf"), vec![1, 2, 3]))
        .collect();

    let err = ctl
        .create_task(
            &draft("too many", TaskStatus::Todo, TaskPriority::Low, date(1)),
            files,
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ViewError::Validation(ValidationError::TooManyFiles(3))
    ));
    assert!(ctl.form_error().is_some());
    assert!(api.calls().is_empty());
}

#[tokio::test]
async fn non_pdf_is_rejected_without_a_request() {
    let api = Arc::new(LoopbackApi::new());
    let ctl = TaskListController::new(api.clone(), 10);

    let err = ctl
        .create_task(
            &draft("wrong type", TaskStatus::Todo, TaskPriority::Low, date(1)),
            vec![UploadFile::new("notes.txt", "text/plain", b"hi".to_vec())],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ViewError::Validation(ValidationError::InvalidFileType(ref name)) if name == "notes.txt"
    ));
    assert!(api.calls().is_empty());
}
