//! Live top-of-book prices over a single shared streaming connection.
//!
//! [`StreamSessionManager`] owns at most one session. Chart controllers claim
//! it for a symbol; asking for a different symbol replaces the session, and the
//! connection closes once the last claim is released. Dropped connections are
//! not re-established here: the next `ensure_subscription` opens a fresh one.

use std::sync::{Arc, Mutex, PoisonError, Weak};

use anyhow::{Context, Result};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use crate::config::HYPERLIQUID;

#[cfg(debug_assertions)]
use crate::config::DF;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceTick {
    pub symbol: String,
    pub price: f64,
}

/// Receives prices for the subscribed symbol.
pub trait TickSink: Send + Sync {
    fn on_tick(&self, price: f64);
}

/// A live connection. `close` must be idempotent.
pub trait StreamConnection: Send {
    fn close(&mut self);
}

/// Opens connections. `open` must not call back into `events` synchronously.
pub trait StreamConnector: Send + Sync {
    fn open(&self, symbol: &str, events: SessionEvents) -> Result<Box<dyn StreamConnection>>;
}

/// Handle a connection uses to report ticks and teardown for its own session.
#[derive(Clone)]
pub struct SessionEvents {
    session_id: u64,
    manager: Weak<StreamSessionManager>,
}

impl SessionEvents {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Ticks from a session that has since been replaced are dropped.
    pub fn tick(&self, tick: PriceTick) {
        if let Some(manager) = self.manager.upgrade() {
            if manager.active_session_id() == Some(self.session_id) {
                manager.handle_incoming_tick(&tick);
            }
        }
    }

    /// The connection errored or closed.
    pub fn closed(&self) {
        if let Some(manager) = self.manager.upgrade() {
            manager.handle_teardown(self.session_id);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClaimId(u64);

/// A controller's registration on the session. Give it back via
/// [`StreamSessionManager::release`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    id: ClaimId,
    session_id: u64,
    symbol: String,
}

impl Claim {
    pub fn symbol(&self) -> &str {
        &self.symbol
    }
}

struct ActiveSession {
    id: u64,
    symbol: String,
    connection: Box<dyn StreamConnection>,
    claimants: Vec<(ClaimId, Arc<dyn TickSink>)>,
}

struct ManagerState {
    active: Option<ActiveSession>,
    next_session_id: u64,
    next_claim_id: u64,
}

pub struct StreamSessionManager {
    connector: Arc<dyn StreamConnector>,
    state: Mutex<ManagerState>,
}

impl StreamSessionManager {
    pub fn new(connector: Arc<dyn StreamConnector>) -> Arc<Self> {
        Arc::new(Self {
            connector,
            state: Mutex::new(ManagerState {
                active: None,
                next_session_id: 1,
                next_claim_id: 1,
            }),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, ManagerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make sure a session for `symbol` is live and register `sink` on it.
    /// A session for another symbol is closed first.
    pub fn ensure_subscription(
        self: &Arc<Self>,
        symbol: &str,
        sink: Arc<dyn TickSink>,
    ) -> Result<Claim> {
        let mut state = self.lock();

        let other_symbol = state.active.as_ref().is_some_and(|s| s.symbol != symbol);
        if other_symbol {
            if let Some(mut old) = state.active.take() {
                log::info!(
                    "Price stream: switching {} -> {} ({} claimant(s) dropped)",
                    old.symbol,
                    symbol,
                    old.claimants.len()
                );
                old.connection.close();
            }
        }

        if state.active.is_none() {
            let id = state.next_session_id;
            state.next_session_id += 1;
            let events = SessionEvents {
                session_id: id,
                manager: Arc::downgrade(self),
            };
            let connection = self
                .connector
                .open(symbol, events)
                .with_context(|| format!("open price stream for {}", symbol))?;

            #[cfg(debug_assertions)]
            if DF.log_price_stream_updates {
                log::info!("Price stream: session {} opened for {}", id, symbol);
            }

            state.active = Some(ActiveSession {
                id,
                symbol: symbol.to_string(),
                connection,
                claimants: Vec::new(),
            });
        }

        let claim_id = ClaimId(state.next_claim_id);
        state.next_claim_id += 1;

        let Some(session) = state.active.as_mut() else {
            anyhow::bail!("price stream session vanished while claiming {}", symbol);
        };
        session.claimants.push((claim_id, sink));
        Ok(Claim {
            id: claim_id,
            session_id: session.id,
            symbol: session.symbol.clone(),
        })
    }

    /// Apply `tick` to every claimant when it is for the active symbol.
    /// Returns how many sinks received it.
    pub fn handle_incoming_tick(&self, tick: &PriceTick) -> usize {
        let sinks: Vec<Arc<dyn TickSink>> = {
            let state = self.lock();
            match state.active.as_ref() {
                Some(session) if session.symbol == tick.symbol => {
                    session.claimants.iter().map(|(_, s)| s.clone()).collect()
                }
                _ => return 0,
            }
        };

        #[cfg(debug_assertions)]
        if DF.log_price_stream_updates {
            log::info!("[l2Book] {} -> {:.6}", tick.symbol, tick.price);
        }

        for sink in &sinks {
            sink.on_tick(tick.price);
        }
        sinks.len()
    }

    /// Error/close from session `session_id`. Ignored unless it is the active one.
    pub fn handle_teardown(&self, session_id: u64) {
        let mut state = self.lock();
        if state.active.as_ref().map(|s| s.id) != Some(session_id) {
            return;
        }
        if let Some(mut session) = state.active.take() {
            log::warn!(
                "Price stream for {} ended; {} claimant(s) detached",
                session.symbol,
                session.claimants.len()
            );
            session.connection.close();
        }
    }

    /// Drop `claim`. Closes the connection when it was the last one.
    /// Claims on a session that is already gone are ignored.
    pub fn release(&self, claim: &Claim) {
        let mut state = self.lock();
        let Some(session) = state.active.as_mut() else {
            return;
        };
        if session.id != claim.session_id {
            return;
        }
        session.claimants.retain(|(id, _)| *id != claim.id);

        if session.claimants.is_empty() {
            if let Some(mut session) = state.active.take() {
                #[cfg(debug_assertions)]
                if DF.log_price_stream_updates {
                    log::info!("Price stream: last claim released, closing {}", session.symbol);
                }
                session.connection.close();
            }
        }
    }

    pub fn active_symbol(&self) -> Option<String> {
        self.lock().active.as_ref().map(|s| s.symbol.clone())
    }

    pub fn active_session_id(&self) -> Option<u64> {
        self.lock().active.as_ref().map(|s| s.id)
    }

    pub fn claimant_count(&self) -> usize {
        self.lock()
            .active
            .as_ref()
            .map_or(0, |s| s.claimants.len())
    }

    /// Whether `claim` is still registered on the live session.
    pub fn is_claim_live(&self, claim: &Claim) -> bool {
        self.lock().active.as_ref().is_some_and(|s| {
            s.id == claim.session_id && s.claimants.iter().any(|(id, _)| *id == claim.id)
        })
    }
}

// ---------------------------------------------------------------------------
// Wire format
// ---------------------------------------------------------------------------

pub fn subscribe_message(symbol: &str) -> String {
    serde_json::json!({
        "method": "subscribe",
        "subscription": { "type": HYPERLIQUID.book_channel, "coin": symbol },
    })
    .to_string()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Decimal {
    Text(String),
    Number(f64),
}

impl Decimal {
    fn value(&self) -> Option<f64> {
        match self {
            Decimal::Text(s) => s.parse().ok(),
            Decimal::Number(n) => Some(*n),
        }
    }
}

#[derive(Debug, Deserialize)]
struct BookLevel {
    #[serde(alias = "price")]
    px: Decimal,
}

#[derive(Debug, Deserialize)]
struct BookData {
    coin: String,
    levels: Vec<Vec<BookLevel>>,
}

#[derive(Debug, Deserialize)]
struct BookMessage {
    channel: String,
    data: Option<serde_json::Value>,
}

/// Best bid from an `l2Book` message. Other channels and malformed payloads
/// yield `None`.
pub fn parse_book_tick(text: &str) -> Option<PriceTick> {
    let msg: BookMessage = serde_json::from_str(text).ok()?;
    if msg.channel != HYPERLIQUID.book_channel {
        return None;
    }
    let data: BookData = serde_json::from_value(msg.data?).ok()?;
    let price = data.levels.first()?.first()?.px.value()?;
    price.is_finite().then_some(PriceTick {
        symbol: data.coin,
        price,
    })
}

// ---------------------------------------------------------------------------
// Hyperliquid connector
// ---------------------------------------------------------------------------

pub struct L2BookConnector {
    url: String,
}

impl L2BookConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

impl Default for L2BookConnector {
    fn default() -> Self {
        Self::new(HYPERLIQUID.ws_url)
    }
}

impl StreamConnector for L2BookConnector {
    fn open(&self, symbol: &str, events: SessionEvents) -> Result<Box<dyn StreamConnection>> {
        let runtime = tokio::runtime::Handle::try_current()
            .context("price stream requires a tokio runtime")?;
        let task = runtime.spawn(run_session(self.url.clone(), symbol.to_string(), events));
        Ok(Box::new(TaskConnection { task }))
    }
}

struct TaskConnection {
    task: JoinHandle<()>,
}

impl StreamConnection for TaskConnection {
    fn close(&mut self) {
        self.task.abort();
    }
}

impl Drop for TaskConnection {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_session(url: String, symbol: String, events: SessionEvents) {
    match read_book_stream(&url, &symbol, &events).await {
        Ok(()) => log::warn!("l2Book stream for {} closed by server", symbol),
        Err(e) => log::error!("l2Book stream for {} failed: {:#}", symbol, e),
    }
    events.closed();
}

async fn read_book_stream(url: &str, symbol: &str, events: &SessionEvents) -> Result<()> {
    let (ws_stream, _) = connect_async(url)
        .await
        .with_context(|| format!("connect {}", url))?;
    let (mut write, mut read) = ws_stream.split();

    write
        .send(Message::Text(subscribe_message(symbol).into()))
        .await
        .context("send l2Book subscription")?;

    #[cfg(debug_assertions)]
    if DF.log_price_stream_updates {
        log::info!("l2Book: subscribed to {} (session {})", symbol, events.session_id());
    }

    while let Some(msg) = read.next().await {
        match msg? {
            Message::Text(text) => {
                if let Some(tick) = parse_book_tick(&text) {
                    events.tick(tick);
                }
            }
            Message::Close(_) => break,
            _ => {}
        }
    }
    Ok(())
}
