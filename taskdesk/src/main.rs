//! `taskdesk`: command-line client for the `TaskDesk` task manager.
//!
//! Signs in, performs one action against the API and prints the result.
//! Configuration via CLI flags, environment variables, or config file
//! (`~/.config/taskdesk/config.toml`).
//!
//! ```bash
//! # Finished tasks, highest priority first
//! taskdesk --email me@example.com tasks list --status DONE --sort-by priority
//!
//! # Credentials from the environment
//! TASKDESK_EMAIL=admin@example.com TASKDESK_PASSWORD=secret taskdesk users list
//! ```

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing_appender::non_blocking::WorkerGuard;

use taskdesk::api::http::HttpApiClient;
use taskdesk::api::ApiError;
use taskdesk::cli::{self, Command, DocCommand, TaskCommand, UserCommand};
use taskdesk::collection::CollectionState;
use taskdesk::config::{CliArgs, ClientConfig};
use taskdesk::controller::{
    Confirmation, DashboardController, TaskDetailController, TaskListController,
    UserAdminController, ViewError,
};
use taskdesk::download::DirectorySink;
use taskdesk::draft::TaskDraft;
use taskdesk::gate::{self, Route, RouteDecision};
use taskdesk::roster::{AssigneeCheck, load_assignees, locate_assignee};
use taskdesk::session::{self, SessionError, SessionStore};
use taskdesk::sync::FetchOutcome;
use taskdesk_proto::task::{DocumentId, Task, TaskId};
use taskdesk_proto::user::{User, UserId};

/// Anything that ends a run with a non-zero exit code.
#[derive(Debug, thiserror::Error)]
enum RunError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("{}", .0.user_message())]
    View(#[from] ViewError),
    #[error("{}", .0.user_message())]
    Api(#[from] ApiError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Usage(String),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = CliArgs::parse();

    let config = match ClientConfig::load(&cli) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config file: {e}");
            ClientConfig::default()
        }
    };

    let _log_guard = init_logging(&cli.log_level, cli.log_file.as_deref());

    let Some(command) = cli.command.clone() else {
        eprintln!("No command given. Run with --help to see the available commands.");
        return ExitCode::FAILURE;
    };

    tracing::info!(base_url = %config.base_url, "taskdesk starting");
    let result = run(&cli, &config, command).await;
    tracing::info!(ok = result.is_ok(), "taskdesk exiting");

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Initialize file-based logging.
///
/// Logs go to a file so they never mix with command output on stdout.
/// Returns a [`WorkerGuard`] that must be held until shutdown to ensure all
/// buffered log entries are flushed.
fn init_logging(level: &str, file_path: Option<&Path>) -> Option<WorkerGuard> {
    let default_path = std::env::temp_dir().join("taskdesk.log");
    let log_path = file_path.unwrap_or(&default_path);

    let log_dir = log_path.parent()?;
    let file_name = log_path.file_name()?.to_str()?;

    let file_appender = tracing_appender::rolling::never(log_dir, file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_env_filter(env_filter)
        .with_ansi(false)
        .init();

    Some(guard)
}

async fn run(cli: &CliArgs, config: &ClientConfig, command: Command) -> Result<(), RunError> {
    let session = SessionStore::new();
    let api = Arc::new(HttpApiClient::new(
        &config.base_url,
        config.request_timeout,
        session.clone(),
    )?);
    let email = cli.email.as_deref().unwrap_or_default();
    let password = cli.password.as_deref().unwrap_or_default();

    if let Command::Register { role } = command {
        let user = session::register(api.as_ref(), &session, email, password, role).await?;
        println!("Registered {} ({}) as user {}", user.email, user.role, user.id);
        return Ok(());
    }

    let user = session::login(api.as_ref(), &session, email, password).await?;
    tracing::info!(user_id = %user.id, role = %user.role, "signed in");

    match command {
        Command::Register { .. } => Ok(()),
        Command::Dashboard => {
            enter(Route::Dashboard, &session)?;
            dashboard(api, config).await
        }
        Command::Tasks(cmd) => {
            enter(Route::Tasks, &session)?;
            tasks(api, config, &user, cmd).await
        }
        Command::Docs(cmd) => docs(api, config, &session, cmd).await,
        Command::Users(cmd) => {
            enter(Route::Users, &session)?;
            users(api, config, session, cmd).await
        }
    }
}

/// Applies the route guard the way navigation would.
fn enter(route: Route, session: &SessionStore) -> Result<(), RunError> {
    match gate::guard(route, session) {
        RouteDecision::Render => Ok(()),
        RouteDecision::Redirect(to) => Err(RunError::Usage(format!(
            "cannot open {route}: redirected to {to}"
        ))),
    }
}

fn ensure_fetched<T>(outcome: FetchOutcome, state: &CollectionState<T>) -> Result<(), RunError> {
    match (outcome, state.error()) {
        (FetchOutcome::Failed, Some(e)) => Err(RunError::Api(e.clone())),
        _ => Ok(()),
    }
}

async fn dashboard(api: Arc<HttpApiClient>, config: &ClientConfig) -> Result<(), RunError> {
    let dash = DashboardController::new(api, config.dashboard_page_size);
    let outcome = dash.load().await;
    let state = dash.state();
    ensure_fetched(outcome, &state)?;

    for (status, count) in dash.status_counts() {
        println!("{status:<12} {count}");
    }
    println!();
    print_task_rows(state.items());
    Ok(())
}

async fn tasks(
    api: Arc<HttpApiClient>,
    config: &ClientConfig,
    user: &User,
    cmd: TaskCommand,
) -> Result<(), RunError> {
    match cmd {
        TaskCommand::List(args) => {
            let list = TaskListController::with_query(api, args.to_query(config.task_page_size));
            let outcome = list.refresh().await;
            let state = list.state();
            ensure_fetched(outcome, &state)?;
            print_task_rows(state.items());
            print_page_footer(&state);
            Ok(())
        }
        TaskCommand::Show { id } => {
            let mut detail = TaskDetailController::new(api, TaskId::new(id));
            let task = detail.load().await?;
            print_task(task);
            Ok(())
        }
        TaskCommand::Create(form) => {
            if let Some(assignee) = form.assignee {
                check_assignee(api.as_ref(), user, config, assignee).await?;
            }
            let files = cli::read_uploads(&form.files).await?;
            let mut draft = TaskDraft::default();
            form.apply_to(&mut draft);

            let list = TaskListController::new(api, config.task_page_size);
            let task = list.create_task(&draft, files).await?;
            println!("Created task {}", task.id);
            print_task(&task);
            Ok(())
        }
        TaskCommand::Edit { id, form } => {
            if let Some(assignee) = form.assignee {
                check_assignee(api.as_ref(), user, config, assignee).await?;
            }
            let files = cli::read_uploads(&form.files).await?;
            let mut detail = TaskDetailController::new(api, TaskId::new(id));
            detail.load().await?;
            let mut draft = detail.begin_edit()?.clone();
            form.apply_to(&mut draft);
            detail.submit_edit(draft, files).await?;

            if let Some(alert) = detail.alert() {
                eprintln!("Warning: {}", alert.user_message());
            }
            if let Some(task) = detail.task() {
                print_task(task);
            }
            Ok(())
        }
        TaskCommand::Delete { id, yes } => {
            let mut detail = TaskDetailController::new(api, TaskId::new(id));
            detail.load().await?;
            detail.delete_task(Confirmation::from_flag(yes)).await?;
            if yes {
                println!("Deleted task {id}");
            } else {
                println!("Task {id} kept; pass --yes to delete it");
            }
            Ok(())
        }
    }
}

/// Only administrators pick assignees. An id missing from a complete
/// roster is rejected here; past the first roster page the server decides.
async fn check_assignee(
    api: &HttpApiClient,
    user: &User,
    config: &ClientConfig,
    assignee: i64,
) -> Result<(), RunError> {
    let roster = load_assignees(api, user, config.roster_page_size).await?;
    if roster.is_empty() {
        return Err(RunError::Usage(
            "only administrators can assign tasks".to_string(),
        ));
    }
    match locate_assignee(&roster, config.roster_page_size, UserId::new(assignee)) {
        AssigneeCheck::Unknown => Err(RunError::Usage(format!("no user with id {assignee}"))),
        AssigneeCheck::Listed => Ok(()),
        AssigneeCheck::Unlisted => {
            tracing::debug!(assignee, "assignee beyond loaded roster; left to the server");
            Ok(())
        }
    }
}

async fn docs(
    api: Arc<HttpApiClient>,
    config: &ClientConfig,
    session: &SessionStore,
    cmd: DocCommand,
) -> Result<(), RunError> {
    let task = match cmd {
        DocCommand::Download { task, .. } | DocCommand::Delete { task, .. } => TaskId::new(task),
    };
    enter(Route::TaskDetail(task), session)?;
    let mut detail = TaskDetailController::new(api, task);
    detail.load().await?;

    match cmd {
        DocCommand::Download { document, .. } => {
            let sink = DirectorySink::new(config.download_dir.clone());
            let path = detail
                .download_document(DocumentId::new(document), &sink)
                .await?;
            println!("Saved {}", path.display());
        }
        DocCommand::Delete { document, yes, .. } => {
            detail
                .delete_document(DocumentId::new(document), Confirmation::from_flag(yes))
                .await?;
            if !yes {
                println!("Document {document} kept; pass --yes to delete it");
                return Ok(());
            }
            println!("Deleted document {document}");
            if let Some(alert) = detail.alert() {
                eprintln!("Warning: {}", alert.user_message());
            }
            if let Some(task) = detail.task() {
                print_task(task);
            }
        }
    }
    Ok(())
}

async fn users(
    api: Arc<HttpApiClient>,
    config: &ClientConfig,
    session: SessionStore,
    cmd: UserCommand,
) -> Result<(), RunError> {
    match cmd {
        UserCommand::List(args) => {
            let admin =
                UserAdminController::with_query(api, session, args.to_query(config.user_page_size));
            let outcome = admin.open().await?;
            let state = admin.state();
            ensure_fetched(outcome, &state)?;
            for u in state.items() {
                println!("{:>6}  {:<6} {}", u.id, u.role, u.email);
            }
            print_page_footer(&state);
        }
        UserCommand::Create {
            email,
            password,
            role,
        } => {
            let admin = UserAdminController::new(api, session, config.user_page_size);
            let draft = cli::user_draft(&email, Some(&password), role);
            let user = admin.create_user(&draft).await?;
            println!("Created user {} ({}, {})", user.id, user.email, user.role);
        }
        UserCommand::Update {
            id,
            email,
            password,
            role,
        } => {
            let admin = UserAdminController::new(api, session, config.user_page_size);
            let draft = cli::user_draft(&email, password.as_deref(), role);
            let user = admin.update_user(UserId::new(id), &draft).await?;
            println!("Updated user {} ({}, {})", user.id, user.email, user.role);
        }
        UserCommand::Delete { id, yes } => {
            let admin = UserAdminController::new(api, session, config.user_page_size);
            admin
                .delete_user(UserId::new(id), Confirmation::from_flag(yes))
                .await?;
            if yes {
                println!("Deleted user {id}");
            } else {
                println!("User {id} kept; pass --yes to delete it");
            }
        }
    }
    Ok(())
}

fn print_task_rows(tasks: &[Task]) {
    if tasks.is_empty() {
        println!("No tasks.");
        return;
    }
    for t in tasks {
        println!(
            "{:>6}  {:<12} {:<7} {}  {}",
            t.id, t.status, t.priority, t.due_date, t.title
        );
    }
}

fn print_page_footer<T>(state: &CollectionState<T>) {
    println!(
        "page {} of {}{}{}",
        state.current_page() + 1,
        state.total_pages().max(1),
        if state.has_previous() { "  [prev]" } else { "" },
        if state.has_next() { "  [next]" } else { "" },
    );
}

fn print_task(task: &Task) {
    println!("#{} {}", task.id, task.title);
    println!("  status:    {}", task.status);
    println!("  priority:  {}", task.priority);
    println!("  due:       {}", task.due_date);
    println!(
        "  assignee:  {}",
        task.assigned_to_email.as_deref().unwrap_or("-")
    );
    println!("  creator:   {}", task.created_by_email);
    if !task.description.is_empty() {
        println!("  {}", task.description);
    }
    println!(
        "  documents ({} slot(s) free):",
        task.remaining_document_slots()
    );
    for d in &task.documents {
        println!("    {:>6}  {}  ({} bytes)", d.id, d.file_name, d.file_size);
    }
}
