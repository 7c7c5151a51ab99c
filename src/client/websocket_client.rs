/// WebSocket quiz client driving the terminal UI
use anyhow::{Context as _, Result};
use crossterm::event::{self, Event, KeyEventKind};
use futures_util::{Sink, SinkExt, Stream, StreamExt};
use ratatui::DefaultTerminal;
use tokio::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::warn;

use crate::client::app::QuizApp;
use crate::server::protocol::{ClientMessage, ServerMessage};

pub struct QuizClient {
    url: String,
}

impl QuizClient {
    /// Accepts `host:port` or a full `ws://` / `wss://` url
    pub fn new(addr: &str) -> Self {
        let url = if addr.starts_with("ws://") || addr.starts_with("wss://") {
            addr.to_string()
        } else {
            format!("ws://{addr}")
        };
        Self { url }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Connects, then runs the UI until the player quits or the host hangs
    /// up. Returns the session id so a later run can resume it.
    pub async fn play(&self, token: String, session: Option<String>) -> Result<Option<String>> {
        let (ws_stream, _) = connect_async(self.url.as_str())
            .await
            .with_context(|| format!("failed to connect to {}", self.url))?;
        let (mut ws_sender, mut ws_receiver) = ws_stream.split();

        let mut app = QuizApp::new(token, session);
        send(&mut ws_sender, &app.hello()).await?;

        let mut terminal = ratatui::init();
        let result = run_loop(&mut terminal, &mut app, &mut ws_sender, &mut ws_receiver).await;
        ratatui::restore();

        result.map(|_| app.session)
    }
}

async fn run_loop<Tx, Rx>(
    terminal: &mut DefaultTerminal,
    app: &mut QuizApp,
    ws_sender: &mut Tx,
    ws_receiver: &mut Rx,
) -> Result<()>
where
    Tx: Sink<Message> + Unpin,
    Tx::Error: std::error::Error + Send + Sync + 'static,
    Rx: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    while !app.quit {
        terminal.draw(|f| app.render(f))?;

        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(50)) => {
                if event::poll(Duration::from_millis(1))? {
                    if let Event::Key(key) = event::read()? {
                        if key.kind == KeyEventKind::Press {
                            if let Some(request) = app.on_key(key.code) {
                                send(ws_sender, &request).await?;
                            }
                        }
                    }
                }
            }

            msg_result = ws_receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => match serde_json::from_str::<ServerMessage>(&text) {
                        Ok(msg) => {
                            if let Some(request) = app.on_server(msg) {
                                send(ws_sender, &request).await?;
                            }
                        }
                        Err(e) => warn!(error = %e, "unreadable server message"),
                    },
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(error = %e, "websocket error");
                        break;
                    }
                }
            }
        }
    }
    Ok(())
}

async fn send<Tx>(ws_sender: &mut Tx, msg: &ClientMessage) -> Result<()>
where
    Tx: Sink<Message> + Unpin,
    Tx::Error: std::error::Error + Send + Sync + 'static,
{
    let json = serde_json::to_string(msg)?;
    ws_sender.send(Message::Text(json)).await?;
    Ok(())
}
