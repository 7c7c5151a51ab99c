/// Client-side quiz state and its ratatui rendering
use crossterm::event::KeyCode;
use ratatui::{
    layout::{Alignment, Constraint, Layout},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Gauge, List, ListItem, Paragraph},
    Frame,
};

use crate::core::progress::{PlayerProgress, ProgressView};
use crate::server::protocol::{ClientMessage, RoundView, ServerMessage};

/// What the client knows between server messages
pub struct QuizApp {
    token: String,
    pub session: Option<String>,
    pub round: Option<RoundView>,
    pub progress: ProgressView,
    /// Result of the last answer, cleared by the next round
    pub outcome: Option<bool>,
    pub status: String,
    pub quit: bool,
}

impl QuizApp {
    pub fn new(token: String, session: Option<String>) -> Self {
        Self {
            token,
            session,
            round: None,
            progress: PlayerProgress::default().view(),
            outcome: None,
            status: "Connecting...".to_string(),
            quit: false,
        }
    }

    pub fn hello(&self) -> ClientMessage {
        ClientMessage::Hello { session: self.session.clone() }
    }

    /// Applies a server message; returns the follow-up request, if any
    pub fn on_server(&mut self, msg: ServerMessage) -> Option<ClientMessage> {
        match msg {
            ServerMessage::Welcome { name, session, verified, progress, .. } => {
                self.session = Some(session);
                self.progress = progress;
                self.status = format!("Welcome to {name}!");
                if verified {
                    Some(ClientMessage::NextRound)
                } else {
                    Some(ClientMessage::Verify { token: self.token.clone() })
                }
            }
            ServerMessage::Verification { verified: true } => Some(ClientMessage::NextRound),
            ServerMessage::Verification { verified: false } => {
                self.status = "Verification refused. Check your access token.".to_string();
                None
            }
            ServerMessage::Round(view) => {
                self.progress = view.progress;
                self.round = Some(view);
                self.outcome = None;
                self.status = "Pick the matching clue.".to_string();
                None
            }
            ServerMessage::Outcome { correct, progress } => {
                self.progress = progress;
                self.outcome = Some(correct);
                self.status = if correct {
                    "Correct! Press [N] for the next word.".to_string()
                } else {
                    "Wrong, streak reset. Press [N] for the next word.".to_string()
                };
                None
            }
            ServerMessage::SessionExpired => {
                self.session = None;
                self.round = None;
                self.outcome = None;
                self.status = "Session expired, starting a new one...".to_string();
                Some(self.hello())
            }
            ServerMessage::Error(err) => {
                self.status = err;
                None
            }
        }
    }

    /// Maps a key press to a request
    pub fn on_key(&mut self, code: KeyCode) -> Option<ClientMessage> {
        match code {
            KeyCode::Esc | KeyCode::Char('q') => {
                self.quit = true;
                Some(ClientMessage::Leave)
            }
            KeyCode::Char('n') | KeyCode::Enter if self.outcome.is_some() || self.round.is_none() => {
                Some(ClientMessage::NextRound)
            }
            KeyCode::Char(c) if self.outcome.is_none() => {
                let round = self.round.as_ref()?;
                let pick = c.to_digit(10)? as usize;
                let clue = round.clues.get(pick.checked_sub(1)?)?;
                Some(ClientMessage::Answer { word_id: round.word_id, clue_id: clue.id })
            }
            _ => None,
        }
    }

    pub fn render(&self, frame: &mut Frame) {
        let chunks = Layout::vertical([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Word
            Constraint::Min(0),    // Clues
            Constraint::Length(3), // Score
            Constraint::Length(3), // Level progress
            Constraint::Length(3), // Status
        ])
        .split(frame.area());

        let header = Paragraph::new(" CROSSCRAFT ")
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD))
            .alignment(Alignment::Center);
        frame.render_widget(header, chunks[0]);

        let word = self.round.as_ref().map(|r| r.word.to_uppercase()).unwrap_or_default();
        frame.render_widget(
            Paragraph::new(word)
                .block(Block::default().title(" Word ").borders(Borders::ALL))
                .alignment(Alignment::Center),
            chunks[1],
        );

        let items: Vec<ListItem> = self
            .round
            .iter()
            .flat_map(|r| r.clues.iter())
            .enumerate()
            .map(|(i, clue)| ListItem::new(format!(" [{}] {}", i + 1, clue.text)))
            .collect();
        frame.render_widget(
            List::new(items).block(Block::default().title(" Clues ").borders(Borders::ALL)),
            chunks[2],
        );

        let p = &self.progress;
        frame.render_widget(
            Paragraph::new(format!(
                "Score: {}   Best: {}   Exp: {}/{}   Level: {}",
                p.score, p.max_score, p.experience, p.next_level_cap, p.level
            ))
            .block(Block::default().borders(Borders::ALL)),
            chunks[3],
        );

        frame.render_widget(
            Gauge::default()
                .block(Block::default().title(" Level progress ").borders(Borders::ALL))
                .gauge_style(Style::default().fg(Color::Green))
                .percent(p.progress_percent.min(100) as u16),
            chunks[4],
        );

        let status_color = match self.outcome {
            Some(true) => Color::Green,
            Some(false) => Color::Red,
            None => Color::Yellow,
        };
        frame.render_widget(
            Paragraph::new(format!("{}   [1-9] Answer  [N] Next  [Q] Quit", self.status))
                .block(Block::default().borders(Borders::ALL))
                .style(Style::default().fg(status_color)),
            chunks[5],
        );
    }
}
