use crate::models::RunStats;
use crate::responder::MentionResponder;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::time::{interval, Duration, Interval, MissedTickBehavior};

/// Decides when the next run starts
#[async_trait]
pub trait Trigger: Send {
    /// Wait for the next run. `false` stops the scheduler.
    async fn next(&mut self) -> bool;
}

/// Fires on a fixed wall-clock interval until the shutdown signal arrives.
/// The first tick fires immediately.
pub struct IntervalTrigger {
    poll_interval: Interval,
    shutdown_rx: oneshot::Receiver<()>,
}

impl IntervalTrigger {
    pub fn new(period: Duration, shutdown_rx: oneshot::Receiver<()>) -> Self {
        let mut poll_interval = interval(period);
        // A run that overruns the period delays the next tick instead of bursting
        poll_interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        IntervalTrigger {
            poll_interval,
            shutdown_rx,
        }
    }
}

#[async_trait]
impl Trigger for IntervalTrigger {
    async fn next(&mut self) -> bool {
        tokio::select! {
            biased;
            _ = &mut self.shutdown_rx => {
                log::info!("Scheduler received shutdown signal");
                false
            }
            _ = self.poll_interval.tick() => true,
        }
    }
}

/// Runs the mention pipeline once per trigger, one run at a time
pub struct Scheduler {
    responder: Arc<MentionResponder>,
}

impl Scheduler {
    pub fn new(responder: Arc<MentionResponder>) -> Self {
        Scheduler { responder }
    }

    /// Loop until the trigger stops. Returns the number of completed runs.
    pub async fn run<T: Trigger>(&self, mut trigger: T) -> usize {
        log::info!("Scheduler started");

        let mut completed = 0;
        while trigger.next().await {
            if self.tick().await.is_some() {
                completed += 1;
            }
        }

        log::info!("Scheduler stopped after {} completed run(s)", completed);
        completed
    }

    /// One pipeline run. A failed run is logged and the scheduler keeps going.
    async fn tick(&self) -> Option<RunStats> {
        match self.responder.run_once(Utc::now()).await {
            Ok(stats) => Some(stats),
            Err(e) => {
                log::error!("Mention run failed: {}", e);
                None
            }
        }
    }
}
