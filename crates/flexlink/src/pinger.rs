//! Application-level keepalive for the command channel.
//!
//! The radio drops clients it considers dead, and a client has no other
//! way to notice a silently failed link, so [`Pinger`] sends a `ping`
//! command every second and tracks when the last reply arrived. If no
//! reply is seen for four seconds it emits a single
//! [`RadioEvent::PingTimeout`] and stops -- it never restarts itself;
//! reconnect policy belongs to the application.
//!
//! This is TCP-side liveness only. The UDP stream channel keeps its own,
//! unrelated activity watchdog.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use flexlink_core::events::RadioEvent;
use tokio::sync::broadcast;

use crate::client::CommandChannel;
use crate::registry::ReplyHandler;

/// Ping cadence.
const PING_INTERVAL: Duration = Duration::from_secs(1);

/// How long without a reply before the link is declared dead.
const PING_DEADLINE: Duration = Duration::from_secs(4);

/// Periodic keepalive over a [`CommandChannel`].
///
/// Created running via [`Pinger::start`]; stops itself on timeout and can
/// be stopped from any state -- before the first tick, mid-flight, or
/// after a timeout -- with [`Pinger::stop`]. Dropping the pinger stops it.
pub struct Pinger {
    cancel: CancellationToken,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Pinger {
    /// Start pinging over the given channel.
    ///
    /// Sends a one-time `keepalive enable` so the radio expects pings,
    /// seeds the reply clock to now (the first real reply hasn't happened
    /// yet), emits [`RadioEvent::PingStarted`], and arms the 1 second tick.
    pub fn start(channel: Arc<CommandChannel>) -> Self {
        let cancel = CancellationToken::new();
        let events = channel.event_sender();

        // Tell the radio to expect pings.
        if !channel.send_checked("keepalive enable", false, None) {
            tracing::debug!("keepalive enable not sent; channel not connected");
        }

        let last_reply = Arc::new(Mutex::new(Instant::now()));
        let _ = events.send(RadioEvent::PingStarted);

        let task = {
            let cancel = cancel.clone();
            tokio::spawn(async move {
                run(channel, events, last_reply, cancel).await;
            })
        };

        Self {
            cancel,
            task: Mutex::new(Some(task)),
        }
    }

    /// Stop pinging.
    ///
    /// Cancels the tick so no further ping is sent and no timeout can
    /// fire. Idempotent and safe from any state.
    pub fn stop(&self) {
        self.cancel.cancel();
    }

    /// Stop and wait for the timer task to finish.
    pub async fn shutdown(&self) {
        self.stop();
        let task = self.task.lock().unwrap().take();
        if let Some(task) = task {
            let _ = task.await;
        }
    }
}

impl Drop for Pinger {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// The timer task: tick once a second, watch the reply clock.
async fn run(
    channel: Arc<CommandChannel>,
    events: broadcast::Sender<RadioEvent>,
    last_reply: Arc<Mutex<Instant>>,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(PING_INTERVAL);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                let elapsed = last_reply.lock().unwrap().elapsed();
                if elapsed > PING_DEADLINE {
                    tracing::warn!(
                        elapsed_ms = elapsed.as_millis(),
                        "No ping reply within deadline, declaring link dead"
                    );
                    let _ = events.send(RadioEvent::PingTimeout);
                    break;
                }

                // Any reply at all refreshes the clock; the reply body is
                // irrelevant.
                let clock = Arc::clone(&last_reply);
                let handler: ReplyHandler = Box::new(move |_, _, _, _| {
                    *clock.lock().unwrap() = Instant::now();
                });

                if !channel.send_checked("ping", false, Some(handler)) {
                    tracing::debug!("Ping not sent; channel not connected");
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
