/// WebSocket quiz host: one task per connection, shared read-only catalog
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context as _, Result};
use futures_util::{SinkExt, StreamExt};
use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::{accept_async, tungstenite::protocol::Message};
use tracing::{debug, info, warn};

use crate::core::catalog::{Catalog, CatalogStore, ClueId, WordId};
use crate::core::dice::{Dice, RandomDice};
use crate::core::round::{build_round, DEFAULT_DECOYS};
use crate::server::protocol::{ClientMessage, RoundView, ServerMessage};
use crate::server::session::{SessionId, SessionStore};

pub const GAME_NAME: &str = "Crosscraft";

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Decoy clues per round
    pub decoys: usize,
    /// When set, `Verify` must present this token
    pub access_token: Option<String>,
    pub session_ttl: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            decoys: DEFAULT_DECOYS,
            access_token: None,
            session_ttl: Duration::from_secs(30 * 60),
        }
    }
}

/// State every connection task can see
pub struct QuizHost<S> {
    catalog: Catalog<S>,
    sessions: SessionStore,
    config: ServerConfig,
}

impl<S: CatalogStore> QuizHost<S> {
    pub fn new(catalog: Catalog<S>, config: ServerConfig) -> Self {
        Self { catalog, sessions: SessionStore::new(), config }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Handles one client message for the connection bound to `session`.
    pub async fn handle<D: Dice + Send>(
        &self,
        session: &mut Option<SessionId>,
        msg: ClientMessage,
        dice: &mut D,
    ) -> ServerMessage {
        let msg = match msg {
            ClientMessage::Hello { session: resume } => return self.hello(session, resume).await,
            other => other,
        };

        let Some(id) = session.as_deref() else {
            return ServerMessage::Error("send Hello first".to_string());
        };

        match msg {
            ClientMessage::Verify { token } => self.verify(id, &token).await,
            ClientMessage::NextRound => self.next_round(id, dice).await,
            ClientMessage::Answer { word_id, clue_id } => self.answer(id, word_id, clue_id).await,
            ClientMessage::Hello { .. } | ClientMessage::Leave => {
                ServerMessage::Error("unexpected message".to_string())
            }
        }
    }

    async fn hello(&self, session: &mut Option<SessionId>, resume: Option<String>) -> ServerMessage {
        let (id, state) = self.sessions.get_or_create(resume.as_deref()).await;
        info!(session = %id, verified = state.verified, "player connected");
        *session = Some(id.clone());
        ServerMessage::Welcome {
            name: GAME_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            session: id,
            verified: state.verified,
            progress: state.progress.view(),
        }
    }

    async fn verify(&self, id: &str, token: &str) -> ServerMessage {
        let accepted = match &self.config.access_token {
            Some(expected) => tokens_match(expected, token),
            None => true,
        };
        let verified = self
            .sessions
            .update(id, |s| {
                s.verified |= accepted;
                s.verified
            })
            .await;
        match verified {
            Some(verified) => {
                debug!(session = %id, verified, "verification");
                ServerMessage::Verification { verified }
            }
            None => expired(),
        }
    }

    async fn next_round<D: Dice + Send>(&self, id: &str, dice: &mut D) -> ServerMessage {
        let Some(state) = self.sessions.get(id).await else {
            return expired();
        };
        if !state.verified {
            return ServerMessage::Error("verification required".to_string());
        }

        match build_round(&self.catalog, dice, self.config.decoys).await {
            Ok(round) => ServerMessage::Round(RoundView::new(round, state.progress.view())),
            Err(e) => {
                warn!(session = %id, error = %e, "failed to build round");
                ServerMessage::Error(format!("could not build a round: {e}"))
            }
        }
    }

    async fn answer(&self, id: &str, word_id: WordId, clue_id: ClueId) -> ServerMessage {
        match self.sessions.get(id).await {
            Some(state) if state.verified => {}
            Some(_) => return ServerMessage::Error("verification required".to_string()),
            None => return expired(),
        }

        let correct = match self.catalog.find_clue(word_id, clue_id).await {
            Ok(correct) => correct,
            Err(e) => {
                warn!(session = %id, word_id, clue_id, error = %e, "answer check failed");
                return ServerMessage::Error(format!("could not check answer: {e}"));
            }
        };

        let progress = self
            .sessions
            .update(id, |s| {
                s.progress = if correct {
                    s.progress.on_correct_answer()
                } else {
                    s.progress.on_wrong_answer()
                };
                s.progress
            })
            .await;

        match progress {
            Some(progress) => {
                info!(session = %id, correct, score = progress.score, level = progress.level, "answer");
                ServerMessage::Outcome { correct, progress: progress.view() }
            }
            None => expired(),
        }
    }
}

fn expired() -> ServerMessage {
    ServerMessage::SessionExpired
}

/// Compares every byte regardless of where the first mismatch is.
fn tokens_match(expected: &str, given: &str) -> bool {
    let (expected, given) = (expected.as_bytes(), given.as_bytes());
    let mut diff = expected.len() ^ given.len();
    for (i, byte) in expected.iter().enumerate() {
        let other = given.get(i).copied().unwrap_or(0);
        diff |= usize::from(byte ^ other);
    }
    diff == 0
}

/// Aborts the idle-session sweeper when dropped
pub struct SweeperGuard(JoinHandle<()>);

impl Drop for SweeperGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

/// Purges idle sessions of `host` every [`SWEEP_INTERVAL`] until the guard is dropped.
pub fn spawn_sweeper<S: CatalogStore + 'static>(host: Arc<QuizHost<S>>) -> SweeperGuard {
    SweeperGuard(tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let purged = host.sessions.purge_idle(host.config.session_ttl).await;
            if purged > 0 {
                debug!(purged, "expired idle sessions");
            }
        }
    }))
}

/// Listens for quiz clients
pub struct QuizServer<S> {
    listener: TcpListener,
    host: Arc<QuizHost<S>>,
}

impl<S: CatalogStore + 'static> QuizServer<S> {
    pub async fn bind(addr: &str, catalog: Catalog<S>, config: ServerConfig) -> Result<Self> {
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("failed to bind {addr}"))?;
        Ok(Self { listener, host: Arc::new(QuizHost::new(catalog, config)) })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accepts connections until the task is dropped. Failed accepts (e.g.
    /// out of file descriptors) are logged and retried after a short pause.
    pub async fn run(self) -> Result<()> {
        info!(addr = %self.listener.local_addr()?, "quiz server listening");
        let _sweeper = spawn_sweeper(Arc::clone(&self.host));

        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    debug!(%addr, "new connection");
                    tokio::spawn(Self::handle_connection(stream, addr, Arc::clone(&self.host)));
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            }
        }
    }

    async fn handle_connection(stream: TcpStream, addr: SocketAddr, host: Arc<QuizHost<S>>) {
        let ws_stream = match accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                warn!(%addr, error = %e, "websocket handshake failed");
                return;
            }
        };

        let (mut ws_sender, mut ws_receiver) = ws_stream.split();
        let mut dice = RandomDice::new(StdRng::from_os_rng());
        let mut session: Option<SessionId> = None;

        while let Some(msg_result) = ws_receiver.next().await {
            let text = match msg_result {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => break,
                Ok(_) => continue,
                Err(e) => {
                    warn!(%addr, error = %e, "websocket error");
                    break;
                }
            };

            let reply = match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::Leave) => break,
                Ok(msg) => host.handle(&mut session, msg, &mut dice).await,
                Err(e) => ServerMessage::Error(format!("malformed message: {e}")),
            };

            let json = match serde_json::to_string(&reply) {
                Ok(json) => json,
                Err(e) => {
                    warn!(%addr, error = %e, "failed to encode reply");
                    continue;
                }
            };
            if ws_sender.send(Message::Text(json)).await.is_err() {
                break;
            }
        }

        if let Some(id) = session {
            info!(session = %id, %addr, "player disconnected");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::catalog::{Clue, Word};
    use crate::core::store::MemoryStore;

    fn words() -> Vec<Word> {
        (1..=4)
            .map(|id| Word {
                id,
                text: format!("word{id}"),
                clues: vec![Clue { id: id * 10, text: format!("clue for word{id}") }],
            })
            .collect()
    }

    async fn host(config: ServerConfig) -> QuizHost<MemoryStore> {
        let catalog = Catalog::open(MemoryStore::new(words()).unwrap()).await.unwrap();
        QuizHost::new(catalog, config)
    }

    fn dice() -> RandomDice<StdRng> {
        RandomDice::new(StdRng::seed_from_u64(5))
    }

    async fn hello(host: &QuizHost<MemoryStore>, session: &mut Option<SessionId>) {
        let reply = host.handle(session, ClientMessage::Hello { session: None }, &mut dice()).await;
        assert!(matches!(reply, ServerMessage::Welcome { verified: false, .. }));
    }

    #[tokio::test]
    async fn hello_is_required_first() {
        let host = host(ServerConfig::default()).await;
        let mut session = None;
        let reply = host.handle(&mut session, ClientMessage::NextRound, &mut dice()).await;
        assert!(matches!(reply, ServerMessage::Error(_)));
    }

    #[tokio::test]
    async fn rounds_need_verification() {
        let config = ServerConfig { access_token: Some("open-sesame".into()), ..Default::default() };
        let host = host(config).await;
        let mut session = None;
        hello(&host, &mut session).await;

        let reply = host.handle(&mut session, ClientMessage::NextRound, &mut dice()).await;
        assert_eq!(reply, ServerMessage::Error("verification required".into()));

        let wrong = ClientMessage::Verify { token: "guess".into() };
        let reply = host.handle(&mut session, wrong, &mut dice()).await;
        assert_eq!(reply, ServerMessage::Verification { verified: false });

        let right = ClientMessage::Verify { token: "open-sesame".into() };
        let reply = host.handle(&mut session, right, &mut dice()).await;
        assert_eq!(reply, ServerMessage::Verification { verified: true });

        let reply = host.handle(&mut session, ClientMessage::NextRound, &mut dice()).await;
        match reply {
            ServerMessage::Round(view) => assert_eq!(view.clues.len(), 1 + DEFAULT_DECOYS),
            other => panic!("expected a round, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn answers_drive_progress() {
        let host = host(ServerConfig { decoys: 2, ..Default::default() }).await;
        let mut session = None;
        hello(&host, &mut session).await;
        let verify = ClientMessage::Verify { token: String::new() };
        host.handle(&mut session, verify, &mut dice()).await;

        let right = ClientMessage::Answer { word_id: 2, clue_id: 20 };
        let reply = host.handle(&mut session, right.clone(), &mut dice()).await;
        let ServerMessage::Outcome { correct: true, progress } = reply else {
            panic!("expected a correct outcome, got {reply:?}");
        };
        assert_eq!((progress.score, progress.experience), (1, 1));

        host.handle(&mut session, right, &mut dice()).await;
        let wrong = ClientMessage::Answer { word_id: 2, clue_id: 30 };
        let reply = host.handle(&mut session, wrong, &mut dice()).await;
        let ServerMessage::Outcome { correct: false, progress } = reply else {
            panic!("expected a wrong outcome, got {reply:?}");
        };
        assert_eq!(progress.score, 0);
        assert_eq!(progress.max_score, 2);
        assert_eq!(progress.experience, 3);
    }

    #[tokio::test]
    async fn resumed_sessions_keep_progress() {
        let host = Arc::new(host(ServerConfig::default()).await);
        let mut first = None;
        hello(&host, &mut first).await;
        host.handle(&mut first, ClientMessage::Verify { token: String::new() }, &mut dice())
            .await;
        host.handle(&mut first, ClientMessage::Answer { word_id: 1, clue_id: 10 }, &mut dice())
            .await;

        let mut second = None;
        let resume = ClientMessage::Hello { session: first.clone() };
        let reply = host.handle(&mut second, resume, &mut dice()).await;
        let ServerMessage::Welcome { verified, progress, .. } = reply else {
            panic!("expected welcome, got {reply:?}");
        };
        assert!(verified);
        assert_eq!(progress.score, 1);
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn purged_session_can_start_over() {
        let host = host(ServerConfig::default()).await;
        let mut session = None;
        hello(&host, &mut session).await;
        host.handle(&mut session, ClientMessage::Verify { token: String::new() }, &mut dice())
            .await;

        host.sessions().purge_idle(Duration::ZERO).await;
        let answer = ClientMessage::Answer { word_id: 1, clue_id: 10 };
        let reply = host.handle(&mut session, answer, &mut dice()).await;
        assert_eq!(reply, ServerMessage::SessionExpired);
        let reply = host.handle(&mut session, ClientMessage::NextRound, &mut dice()).await;
        assert_eq!(reply, ServerMessage::SessionExpired);

        // a fresh Hello gets a new session that works again
        let stale = session.clone();
        hello(&host, &mut session).await;
        assert_ne!(session, stale);
        let reply = host.handle(&mut session, ClientMessage::Verify { token: String::new() }, &mut dice()).await;
        assert_eq!(reply, ServerMessage::Verification { verified: true });
    }

    #[test]
    fn token_comparison() {
        assert!(tokens_match("open-sesame", "open-sesame"));
        assert!(!tokens_match("open-sesame", "open-sesamE"));
        assert!(!tokens_match("open-sesame", "open"));
        assert!(!tokens_match("open", "open-sesame"));
        assert!(tokens_match("", ""));
    }

    #[tokio::test]
    async fn dropping_the_guard_stops_the_sweeper() {
        let host = Arc::new(host(ServerConfig::default()).await);
        let guard = spawn_sweeper(Arc::clone(&host));
        assert_eq!(Arc::strong_count(&host), 2);

        drop(guard);
        // the aborted task releases its handle on the host
        for _ in 0..100 {
            if Arc::strong_count(&host) == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(Arc::strong_count(&host), 1);
    }
}
