//! Terminal viewer for one session: prints the ranked ledger on every change
//! and submits each line typed on stdin as a question.

use std::{env, sync::Arc};

use anyhow::{Context, bail};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use live_qna_back::{
    config::AppConfig,
    dao::qa_store::postgrest::{PostgrestConfig, PostgrestQaStore},
    dto::validation::validate_join_code,
    services::qa_core::QaCore,
    sync::{DropReason, MessageStatus, SendOutcome, SyncClient, SyncSnapshot},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let Some(join_code) = env::args().nth(1) else {
        bail!("usage: qa-watch <join-code>");
    };
    if validate_join_code(&join_code).is_err() {
        bail!("`{join_code}` is not a five digit join code");
    }

    let config = AppConfig::load();
    let backend = PostgrestConfig::from_env()
        .context("reading SUPABASE_URL / SUPABASE_ANON_KEY")?
        .with_feed_capacity(config.sse_capacity);
    let store = PostgrestQaStore::connect(backend)
        .await
        .context("connecting to PostgREST")?;
    let core = QaCore::new(Arc::new(store), &config);
    let client = SyncClient::new(core, join_code, &config);

    let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
    let runner = client.clone();
    let sync_task = tokio::spawn(async move {
        runner
            .run(async {
                let _ = stopped.await;
            })
            .await
    });

    let printer = client.clone();
    let mut changes = client.changes();
    let print_task = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            render(&printer.snapshot().await);
        }
    });

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("reading stdin")? {
        match client.send(&line).await {
            SendOutcome::Accepted(_) => {}
            SendOutcome::Dropped(DropReason::Empty) => {}
            SendOutcome::Dropped(DropReason::CoolingDown { .. }) => {
                let secs = client.snapshot().await.cooldown_secs;
                eprintln!("wait {secs}s before sending again");
            }
        }
    }

    let _ = stop.send(());
    sync_task.await.context("sync client task")?;
    print_task.abort();
    Ok(())
}

fn render(snapshot: &SyncSnapshot) {
    println!("--- session {} ---", snapshot.join_code);
    for message in &snapshot.messages {
        let marker = match message.status {
            MessageStatus::Pending => " (sending)",
            MessageStatus::Confirmed => "",
            MessageStatus::Failed => " (not sent)",
        };
        println!("{:>4}  {}{}", message.votes, message.text, marker);
    }
    if let Some(error) = &snapshot.last_error {
        println!("! {error}");
    }
}

fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
