use dotenv::dotenv;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

mod ai;
mod channels;
mod config;
mod http;
mod models;
mod responder;
mod scheduler;

use ai::OpenAIClient;
use channels::TwitterClient;
use config::Config;
use responder::MentionResponder;
use scheduler::{IntervalTrigger, Scheduler};

#[tokio::main]
async fn main() {
    dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            log::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    log::info!(
        "Reply bot: reply cap={}, lookback={}min, poll interval={}s, model={}",
        config.responder.response_limit,
        config.responder.lookback_minutes,
        config.poll_interval_secs,
        config.openai.model
    );

    let generator = match OpenAIClient::new(&config.openai) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            log::error!("Failed to initialize language model client: {}", e);
            std::process::exit(1);
        }
    };
    let platform = Arc::new(TwitterClient::new(config.credentials.clone()));

    // Identity is resolved once for the process lifetime
    let responder = match MentionResponder::connect(platform, generator, config.responder).await {
        Ok(responder) => Arc::new(responder),
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };
    log::info!("Listening for mentions of account {}", responder.account_id());

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {}", e);
            // Keep the sender alive so the scheduler is not stopped
            std::future::pending::<()>().await;
        }
        log::info!("Ctrl-C received, stopping after the current run");
        let _ = shutdown_tx.send(());
    });

    let trigger = IntervalTrigger::new(Duration::from_secs(config.poll_interval_secs), shutdown_rx);
    Scheduler::new(responder).run(trigger).await;
}
