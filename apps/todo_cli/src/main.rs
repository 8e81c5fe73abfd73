use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use client_core::{
    DragEndOutcome, DragGesture, DragLocation, FileCredentialStorage, HttpSyncEngine, ListModel,
    SessionController, SessionStore, Workspace,
};
use shared::domain::ListId;
use tracing_subscriber::EnvFilter;

mod config;

use config::load_settings;

type Controller = SessionController<FileCredentialStorage>;

#[derive(Parser, Debug)]
#[command(name = "todo", about = "Ordered task lists synced with a remote list service")]
struct Args {
    /// Overrides the configured service URL.
    #[arg(long, global = true)]
    server_url: Option<String>,
    /// Path of a TOML config file (defaults to ./todo.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    Login {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Signup {
        #[arg(long)]
        username: String,
        #[arg(long)]
        password: String,
    },
    Logout,
    Status,
    Show,
    AddList {
        title: String,
    },
    AddTask {
        #[arg(long)]
        list: String,
        content: String,
    },
    /// Moves a task; omitting --to-list behaves like a drop outside every list.
    Move {
        #[arg(long)]
        from_list: String,
        #[arg(long)]
        from_index: usize,
        #[arg(long)]
        to_list: Option<String>,
        #[arg(long, default_value_t = 0)]
        to_index: usize,
    },
}

fn print_workspace(workspace: &Workspace) {
    if workspace.is_empty() {
        println!("(no lists)");
        return;
    }
    for list in workspace.lists() {
        println!("{} [{}]", list.title, list.id);
        for (index, task) in list.tasks.iter().enumerate() {
            let mark = if task.completed { "x" } else { " " };
            println!("  {index}. [{mark}] {} ({})", task.content, task.id);
        }
    }
}

async fn require_session(controller: &Controller) -> Result<()> {
    let session = controller.restore().await;
    if session.is_authenticated() {
        Ok(())
    } else {
        Err(anyhow!("not signed in; run `todo login` first"))
    }
}

async fn run(controller: &Controller, command: Command) -> Result<()> {
    match command {
        Command::Login { username, password } => {
            controller
                .sign_in(&username, &password)
                .await
                .context("sign-in failed")?;
            println!("Signed in as {username}");
            print_workspace(&controller.model().snapshot());
        }
        Command::Signup { username, password } => {
            controller
                .sign_up(&username, &password)
                .await
                .context("sign-up failed")?;
            println!("Registered and signed in as {username}");
            print_workspace(&controller.model().snapshot());
        }
        Command::Logout => {
            controller.sign_out();
            println!("Signed out");
        }
        Command::Status => match controller.persisted_session().username() {
            Some(username) => println!("Signed in as {username}"),
            None => println!("Not signed in"),
        },
        Command::Show => {
            require_session(controller).await?;
            print_workspace(&controller.model().snapshot());
        }
        Command::AddList { title } => {
            require_session(controller).await?;
            controller.add_list(&title).await.context("add list failed")?;
            print_workspace(&controller.model().snapshot());
        }
        Command::AddTask { list, content } => {
            require_session(controller).await?;
            controller
                .add_task(&ListId::new(list), &content)
                .await
                .context("add task failed")?;
            print_workspace(&controller.model().snapshot());
        }
        Command::Move {
            from_list,
            from_index,
            to_list,
            to_index,
        } => {
            require_session(controller).await?;
            let gesture = DragGesture {
                source: DragLocation::new(from_list, from_index),
                destination: to_list.map(|list_id| DragLocation::new(list_id, to_index)),
            };
            let outcome = controller
                .reorder_controller()
                .on_drag_end(&gesture)
                .await
                .context("move rejected")?;
            match &outcome {
                DragEndOutcome::Ignored => println!("Nothing to move"),
                DragEndOutcome::Synced { .. } => println!("Moved"),
                DragEndOutcome::Unreconciled { failures, .. } => {
                    for failure in failures {
                        eprintln!(
                            "warning: remote order of list {} not saved: {}",
                            failure.list_id, failure.error
                        );
                    }
                }
            }
            print_workspace(&controller.model().snapshot());
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
    let args = Args::parse();

    let mut settings = load_settings(args.config.as_deref());
    if let Some(server_url) = args.server_url {
        settings.server_url = server_url;
    }
    tracing::debug!(
        server_url = %settings.server_url,
        session_path = %settings.session_path.display(),
        "loaded settings"
    );

    let engine = HttpSyncEngine::with_timeout(
        &settings.server_url,
        Duration::from_secs(settings.request_timeout_secs),
    )?;
    let controller = SessionController::new(
        SessionStore::new(FileCredentialStorage::new(&settings.session_path)),
        Arc::new(engine),
        Arc::new(ListModel::new()),
    );

    run(&controller, args.command).await
}
