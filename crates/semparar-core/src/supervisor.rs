//! Single-flight supervisor owning the active run slot.
//!
//! At most one report run is alive at any time. A new trigger is a hard
//! replacement: the previous run's token is cancelled, its task aborted,
//! and its browser session released before the fresh run starts. The
//! aborted task publishes nothing further, which settles the stale-write
//! question in favor of explicit cancellation.

use semparar_types::config::{BrowserSettings, ReportConfig};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::channel::{CorrelationChannel, Transport};
use crate::ui::UiLauncher;
use crate::workflow::{release_session, ReportRun, SessionSlot};

struct ActiveRun<D> {
    handle: JoinHandle<()>,
    cancel: CancellationToken,
    session: SessionSlot<D>,
}

/// Holds the optional active run and replaces it atomically:
/// release-then-reassign, never two runs alive concurrently.
pub struct Supervisor<T, L: UiLauncher> {
    channel: CorrelationChannel<T>,
    launcher: L,
    browser: BrowserSettings,
    active: Option<ActiveRun<L::Driver>>,
}

impl<T, L> Supervisor<T, L>
where
    T: Transport + Clone + 'static,
    L: UiLauncher + Clone + 'static,
{
    pub fn new(channel: CorrelationChannel<T>, launcher: L, browser: BrowserSettings) -> Self {
        Self {
            channel,
            launcher,
            browser,
            active: None,
        }
    }

    /// Handle one trigger message.
    ///
    /// Always terminates the previous run first. A `None` payload clears
    /// the slot and starts nothing; `Some(config)` starts a fresh run.
    pub async fn trigger(&mut self, config: Option<ReportConfig>) {
        self.clear().await;

        let Some(config) = config else {
            tracing::info!("empty trigger payload, active run cleared");
            return;
        };

        tracing::info!(emails = config.emails.len(), "starting report run");

        let run = ReportRun::new(
            self.channel.clone(),
            self.launcher.clone(),
            self.browser.clone(),
            config,
        );
        let session = run.session_slot();
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("report run replaced before completion");
                }
                outcome = run.send() => {
                    tracing::info!(?outcome, "report run finished");
                }
            }
        });

        self.active = Some(ActiveRun {
            handle,
            cancel,
            session,
        });
    }

    /// Terminate the active run, if any, and release its browser session.
    pub async fn clear(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
            active.handle.abort();
            release_session(&active.session).await;
        }
    }

    /// Whether a run is currently registered in the slot.
    pub fn has_active_run(&self) -> bool {
        self.active.is_some()
    }
}
