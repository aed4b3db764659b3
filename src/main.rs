use std::io::{self, BufRead};
use std::sync::Arc;

use auth_eng::model::ExternalEvent;
use auth_eng::window::spawn_evictor;
use auth_eng::{json, Config, Engine, TransactionWindow};
use tokio_stream::wrappers::ReceiverStream;
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse().unwrap()))
        .with_writer(std::io::stderr)
        .init();

    let config = Config::from_env();
    let window = Arc::new(TransactionWindow::new(&config));
    let evictor = spawn_evictor(
        Arc::clone(&window),
        config.eviction_tick,
        config.eviction_interval,
    );

    let engine = Engine::new(config, Arc::clone(&window));
    let (event_sender, event_receiver) = tokio::sync::mpsc::channel(10);

    // Blocking stdin reads live on the blocking pool; events flow to the
    // engine through the bounded channel, which also applies back-pressure.
    tokio::task::spawn_blocking(move || {
        if event_sender.blocking_send(ExternalEvent::Start).is_err() {
            return;
        }
        for (idx, line) in io::stdin().lock().lines().enumerate() {
            match line {
                Ok(raw) => {
                    if raw.trim().is_empty() {
                        continue;
                    }
                    match json::classify(idx + 1, &raw) {
                        Ok(event) => {
                            if event_sender.blocking_send(event).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("{e}"),
                    }
                }
                Err(e) => {
                    warn!("stdin read failed: {e}");
                    break;
                }
            }
        }
    });

    let stdout = io::stdout();
    if let Err(e) = engine
        .run(ReceiverStream::new(event_receiver), stdout.lock())
        .await
    {
        error!("output stream failed: {e}");
        std::process::exit(1);
    }

    evictor.abort();
}
