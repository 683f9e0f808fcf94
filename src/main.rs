use std::sync::Arc;

use anyhow::Context;
use futures::StreamExt;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::oneshot;
use tokio_stream::wrappers::BroadcastStream;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use mindos::config::{AppConfig, StoreBackend};
use mindos::error::{Error, WizardError};
use mindos::onboarding::{
    Cardinality, OnboardingController, ProfileField, StepKind, UserProfile, WizardEvent,
};
use mindos::session::{self, Route};
use mindos::store::{KeyValueStore, LibSqlStore, MemoryStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::from_env().context("invalid MINDOS_* configuration")?;
    let _log_guard = init_tracing(&config);

    eprintln!("🧠 MindOS v{}", env!("CARGO_PKG_VERSION"));

    let store: Arc<dyn KeyValueStore> = match config.store {
        StoreBackend::LibSql => {
            eprintln!("   Store: {}", config.db_path.display());
            Arc::new(
                LibSqlStore::new_local(&config.db_path, &config.namespace)
                    .await
                    .with_context(|| format!("failed to open {}", config.db_path.display()))?,
            )
        }
        StoreBackend::Memory => {
            eprintln!("   Store: in-memory (nothing is kept)");
            Arc::new(MemoryStore::new())
        }
    };

    if std::env::args().skip(1).any(|a| a == "--reset") {
        session::sign_out(store.as_ref()).await?;
        eprintln!("   Previous setup cleared.");
    }

    if session::entry_route(store.as_ref()).await? == Route::Dashboard {
        show_dashboard(store.as_ref()).await?;
        return Ok(());
    }

    run_wizard(Arc::clone(&store), &config).await?;
    show_dashboard(store.as_ref()).await
}

fn init_tracing(config: &AppConfig) -> Option<WorkerGuard> {
    // Quiet by default so log lines do not break up the prompts.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "mindos.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .with(
                    tracing_subscriber::fmt::layer()
                        .with_ansi(false)
                        .with_writer(writer),
                )
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(stderr_layer)
                .init();
            None
        }
    }
}

/// Drive the wizard from stdin until the profile is stored.
async fn run_wizard(store: Arc<dyn KeyValueStore>, config: &AppConfig) -> anyhow::Result<()> {
    let controller = OnboardingController::new(store, config.wizard.clone())?;
    let (done_tx, mut done_rx) = oneshot::channel();
    let renderer = tokio::spawn(render_events(
        BroadcastStream::new(controller.subscribe()),
        done_tx,
    ));

    controller.start().await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = &mut done_rx => break,
            line = lines.next_line() => {
                match line.context("failed to read stdin")? {
                    Some(line) => handle_input(&controller, line.trim()).await,
                    None => anyhow::bail!("input closed before setup finished"),
                }
            }
        }
    }

    renderer.abort();
    Ok(())
}

/// Apply one line of input to whatever the current step asks for.
async fn handle_input(controller: &OnboardingController, line: &str) {
    let step = controller.current_step().await;
    let result = match step.kind {
        StepKind::AutoAdvance => {
            if !controller.snapshot().await.awaiting_retry() {
                eprintln!("   …one moment");
                return;
            }
            controller.complete().await.map(|_| ())
        }
        StepKind::FreeText { field } => {
            match controller.set_field_value(field, line).await {
                Ok(()) => controller.advance().await.map(|_| ()),
                Err(e) => Err(e),
            }
        }
        StepKind::Select {
            field,
            options,
            cardinality,
        } => {
            if cardinality == Cardinality::AtLeastOne && line.is_empty() {
                controller.advance().await.map(|_| ())
            } else {
                match resolve_option(options, line) {
                    Some(option) => controller
                        .toggle_selection(field, option)
                        .await
                        .map(|_| print_selection(field, option)),
                    None => {
                        eprintln!("   Pick 1-{} or type an option.", options.len());
                        return;
                    }
                }
            }
        }
    };

    match result {
        Ok(()) => {}
        Err(Error::Wizard(WizardError::Gated { .. })) => match step.kind {
            StepKind::FreeText { .. } => eprintln!("   Please enter something first."),
            _ => eprintln!("   Choose at least one option first."),
        },
        Err(e) => eprintln!("   {e}"),
    }
}

/// Accept either a 1-based number or the option's label (any case).
fn resolve_option(options: &'static [&'static str], input: &str) -> Option<&'static str> {
    if let Ok(n) = input.parse::<usize>() {
        return n.checked_sub(1).and_then(|i| options.get(i)).copied();
    }
    options
        .iter()
        .find(|o| o.eq_ignore_ascii_case(input))
        .copied()
}

fn print_selection(field: ProfileField, option: &str) {
    if field == ProfileField::Goals {
        eprintln!("   toggled {option} (press Enter when done)");
    }
}

async fn render_events(
    mut events: BroadcastStream<WizardEvent>,
    done: oneshot::Sender<()>,
) {
    while let Some(event) = events.next().await {
        let Ok(event) = event else { continue };
        match event {
            WizardEvent::StepEntered { index, step } => {
                println!("\n[{}] {}", index + 1, step.title);
                println!("    {}", step.subtitle);
                match step.kind {
                    StepKind::FreeText { .. } => eprint!("> "),
                    StepKind::Select {
                        options,
                        cardinality,
                        ..
                    } => {
                        for (i, option) in options.iter().enumerate() {
                            println!("    {}. {option}", i + 1);
                        }
                        if cardinality == Cardinality::AtLeastOne {
                            eprintln!("   Toggle options, then press Enter to continue.");
                        }
                        eprint!("> ");
                    }
                    StepKind::AutoAdvance => {}
                }
            }
            WizardEvent::Progress { percent, .. } if percent % 20 == 0 => {
                println!("    {percent}% complete");
            }
            WizardEvent::CompletionFailed { error } => {
                eprintln!("   Could not save your profile: {error}");
                eprintln!("   Press Enter to try again.");
            }
            WizardEvent::Navigate { route } => {
                tracing::debug!(%route, "Navigating");
                let _ = done.send(());
                return;
            }
            _ => {}
        }
    }
}

async fn show_dashboard(store: &dyn KeyValueStore) -> anyhow::Result<()> {
    let Some(profile) = session::load_profile(store).await? else {
        anyhow::bail!("setup is marked complete but no profile is stored; run with --reset");
    };
    print_profile(&profile);
    Ok(())
}

fn print_profile(profile: &UserProfile) {
    println!("\nWelcome back, {}.", profile.name);
    match profile.mood {
        Some(mood) => println!("    Mood:  {mood}"),
        None => println!("    Mood:  not shared"),
    }
    if profile.goals.is_empty() {
        println!("    Goals: none yet");
    } else {
        let goals: Vec<&str> = profile.goals.iter().map(|g| g.label()).collect();
        println!("    Goals: {}", goals.join(", "));
    }
}
