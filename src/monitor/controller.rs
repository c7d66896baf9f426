// Monitor controller - owns one account's monitoring session
//
// Stopped --start--> Monitoring --stop--> Stopped
//
// - Ticks run one after another on a single task; the next tick is not
//   scheduled until the previous one returns
// - Events from a tick go to the store first, then to the vault
// - stop() cancels ticks that have not started and waits for an in-flight
//   tick; its events are discarded

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::adapters::traits::LedgerFeed;
use crate::error::AppResult;
use crate::ledger::models::{AccountContext, Strategy, VaultSnapshot};
use crate::monitor::poller::{LedgerPoller, PollerParams};
use crate::settlement::activation::VaultManager;
use crate::settlement::store::ReconciledView;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Stopped,
    Monitoring,
}

/// Session settings, fixed once a session starts
#[derive(Debug, Clone)]
pub struct SessionParams {
    pub poll_interval: Duration,
    pub poller: PollerParams,
    pub strategy: Strategy,
}

struct Session {
    id: Uuid,
    account: AccountContext,
    shutdown: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

pub struct MonitorController {
    feed: Arc<dyn LedgerFeed>,
    vault: Arc<VaultManager>,
    params: SessionParams,
    session: Option<Session>,
}

impl MonitorController {
    pub fn new(feed: Arc<dyn LedgerFeed>, vault: Arc<VaultManager>, params: SessionParams) -> Self {
        Self {
            feed,
            vault,
            params,
            session: None,
        }
    }

    pub fn state(&self) -> MonitorState {
        if self.is_monitoring() {
            MonitorState::Monitoring
        } else {
            MonitorState::Stopped
        }
    }

    pub fn is_monitoring(&self) -> bool {
        self.session
            .as_ref()
            .map_or(false, |session| !session.handle.is_finished())
    }

    pub fn session_id(&self) -> Option<Uuid> {
        self.session.as_ref().map(|session| session.id)
    }

    pub fn view(&self) -> ReconciledView {
        self.vault.store().read().view()
    }

    pub fn vault(&self) -> &Arc<VaultManager> {
        &self.vault
    }

    /// Activate the vault with the session's settings, then start monitoring.
    /// Nothing is started if activation fails.
    pub async fn activate(&mut self, account: AccountContext) -> AppResult<VaultSnapshot> {
        let snapshot = self
            .vault
            .activate(self.params.poller.increment, self.params.strategy)
            .await?;

        self.start(account).await;
        Ok(snapshot)
    }

    /// Stop monitoring and mark the vault inactive
    pub async fn deactivate(&mut self) -> AppResult<()> {
        self.stop().await;
        self.vault.deactivate().await
    }

    pub async fn start(&mut self, account: AccountContext) {
        if let Some(session) = &self.session {
            if session.account == account && !session.handle.is_finished() {
                return;
            }
        }

        // never two sessions at once: the old timer is gone before the new one exists
        self.stop().await;

        let id = Uuid::new_v4();
        let (shutdown, shutdown_rx) = watch::channel(false);

        let poller = LedgerPoller::new(
            account.clone(),
            self.feed.clone(),
            self.params.poller.clone(),
        );
        let span = info_span!("monitor", session = %id, account = %account.address);
        let handle = tokio::spawn(
            run_session(poller, self.params.poll_interval, shutdown_rx, self.vault.clone())
                .instrument(span),
        );

        info!(
            "👀 Monitoring {} every {:?} (session {})",
            account.address, self.params.poll_interval, id
        );

        self.session = Some(Session {
            id,
            account,
            shutdown,
            handle,
        });
    }

    pub async fn stop(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        // receiver may already be gone if the task ended
        let _ = session.shutdown.send(true);

        match session.handle.await {
            Ok(()) => info!(
                "⏹️ Monitoring stopped for {} (session {})",
                session.account.address, session.id
            ),
            Err(e) => error!("❌ Monitor session {} ended abnormally: {}", session.id, e),
        }
    }
}

async fn run_session(
    mut poller: LedgerPoller,
    poll_interval: Duration,
    mut shutdown: watch::Receiver<bool>,
    vault: Arc<VaultManager>,
) {
    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            _ = shutdown.changed() => break,
            _ = ticker.tick() => {}
        }

        let events = poller.tick().await;

        if *shutdown.borrow() {
            if !events.is_empty() {
                warn!("⚠️ Session stopped mid-tick, discarding {} event(s)", events.len());
            }
            break;
        }

        for event in events {
            vault.store().write().record(event.clone());
            vault.deposit_round_up(&event).await;
        }
    }

    let cursor = poller.cursor();
    debug!(
        "Session loop exited at {:?} (slot {:?})",
        cursor.last_seen(),
        cursor.last_slot()
    );
}
