//! Per-connection state machine: handshake, then the authenticated command
//! loop. Each `Session` owns its `Wire` and its address key for its whole
//! lifetime; after a line is read from the authenticated store, the session
//! is otherwise stateless — everything else lives in `ChatState` keyed by
//! address or login.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tracing::{info, info_span, warn, Instrument};

use crate::chat::ChatState;
use crate::codec::Wire;
use crate::command::{self, Command, Flow};
use crate::config::ServerConfig;
use crate::error::SessionError;

pub struct Session {
    wire: Wire,
    address: String,
}

enum HandshakeOutcome {
    Authenticated(String),
    Closed,
}

impl Session {
    pub fn new(wire: Wire, address: String) -> Self {
        Session { wire, address }
    }

    pub async fn run(mut self, state: Arc<Mutex<ChatState>>, config: ServerConfig) {
        let span = info_span!("session", address = %self.address);
        async {
            match self.handshake(&state).await {
                Ok(HandshakeOutcome::Authenticated(login)) => {
                    self.chat_loop(&login, &state, &config).await;
                    self.close(&state, &login).await;
                }
                Ok(HandshakeOutcome::Closed) => {}
                Err(e) => warn!(error = %e, "session ended before handshake completed"),
            }
        }
        .instrument(span)
        .await;
    }

    async fn handshake(&mut self, state: &Mutex<ChatState>) -> Result<HandshakeOutcome, SessionError> {
        loop {
            self.wire
                .write("Please, register (/auth) or log in (/login).", true)
                .await?;
            let line = self.read_line().await?;
            match line {
                None => return Ok(HandshakeOutcome::Closed),
                Some(line) if line.is_empty() => return Ok(HandshakeOutcome::Closed),
                Some(line) => match line.as_str() {
                    "/auth" => {
                        return match self.register(state).await? {
                            Some(login) => Ok(HandshakeOutcome::Authenticated(login)),
                            None => Ok(HandshakeOutcome::Closed),
                        }
                    }
                    "/login" => {
                        return match self.login(state).await? {
                            Some(login) => Ok(HandshakeOutcome::Authenticated(login)),
                            None => Ok(HandshakeOutcome::Closed),
                        }
                    }
                    _ => {
                        self.wire.write("Command unknown, please repeat.", true).await?;
                    }
                },
            }
        }
    }

    async fn register(&mut self, state: &Mutex<ChatState>) -> Result<Option<String>, SessionError> {
        let login = loop {
            let candidate = match self.prompt_line("Input your login: ").await? {
                Some(l) if l.is_empty() => continue,
                Some(l) => l,
                None => return Ok(None),
            };
            let taken = state.lock().await.has_login(&candidate);
            if taken {
                self.wire
                    .write("The login is taken. Input another login.", true)
                    .await?;
                continue;
            }
            break candidate;
        };

        let password = match self.prompt_line("Input your password: ").await? {
            Some(p) => p,
            None => return Ok(None),
        };

        state.lock().await.register_user(&login, &password, &self.address);
        self.wire.write("Login and password was set.", true).await?;
        info!(%login, "registered new user");
        Ok(Some(login))
    }

    async fn login(&mut self, state: &Mutex<ChatState>) -> Result<Option<String>, SessionError> {
        let login = loop {
            match self.prompt_line("Input your login: ").await? {
                Some(l) if l.is_empty() => continue,
                Some(l) => break l,
                None => return Ok(None),
            }
        };
        let password = match self.prompt_line("Input your password: ").await? {
            Some(p) => p,
            None => return Ok(None),
        };

        let (reply, should_close) = {
            let st = state.lock().await;
            let outcome = st.authenticate(&login, &password);
            command::login_outcome_reply(outcome)
        };
        self.wire.write(reply, true).await?;
        if should_close {
            warn!(%login, "login rejected");
            return Ok(None);
        }
        state.lock().await.bind_address(&login, &self.address);
        info!(%login, "login successful");
        Ok(Some(login))
    }

    async fn chat_loop(&mut self, login: &str, state: &Arc<Mutex<ChatState>>, config: &ServerConfig) {
        let (tx, mut rx) = mpsc::unbounded_channel();
        state.lock().await.register_connection(&self.address, login, tx);

        if let Err(e) = self.enter_general_chat(login, state, config).await {
            warn!(error = %e, "failed to send chat entry banner");
        }

        loop {
            tokio::select! {
                pushed = rx.recv() => {
                    match pushed {
                        Some(line) => {
                            if self.wire.write(&line, true).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                line = self.read_line() => {
                    match line {
                        Ok(None) => break,
                        Ok(Some(line)) if line.is_empty() => break,
                        Ok(Some(line)) => {
                            if self.dispatch_line(login, state, &line).await.is_break() {
                                break;
                            }
                        }
                        Err(e) => {
                            warn!(error = %e, "read error in chat loop");
                            break;
                        }
                    }
                }
            }
        }
    }

    async fn enter_general_chat(
        &mut self,
        login: &str,
        state: &Arc<Mutex<ChatState>>,
        config: &ServerConfig,
    ) -> Result<(), SessionError> {
        self.wire.write("You are in general chat.", true).await?;
        let lines: Vec<String> = {
            let st = state.lock().await;
            st.recent_public(config.short_history_depth)
                .into_iter()
                .map(|m| m.render_for(login))
                .collect()
        };
        for line in lines {
            self.wire.write(&line, true).await?;
        }
        Ok(())
    }

    async fn dispatch_line(&mut self, login: &str, state: &Arc<Mutex<ChatState>>, line: &str) -> std::ops::ControlFlow<()> {
        match Command::parse(line) {
            None => {
                if self.wire.write("Wrong command.", true).await.is_err() {
                    return std::ops::ControlFlow::Break(());
                }
                std::ops::ControlFlow::Continue(())
            }
            Some(cmd) => match command::dispatch(state, &self.address, login, cmd).await {
                Flow::Continue => std::ops::ControlFlow::Continue(()),
                Flow::Exit => std::ops::ControlFlow::Break(()),
                Flow::AwaitJoinApproval { name } => loop {
                    match self.read_line().await {
                        Ok(Some(answer)) if answer == "y" || answer == "n" => {
                            command::complete_join_request(state, login, &name, &answer).await;
                            break std::ops::ControlFlow::Continue(());
                        }
                        Ok(Some(_)) => continue,
                        _ => break std::ops::ControlFlow::Break(()),
                    }
                },
            },
        }
    }

    async fn close(&mut self, state: &Mutex<ChatState>, login: &str) {
        state.lock().await.logout(login, &self.address);
        let _ = self
            .wire
            .write("You are disconnected from chat. Have a nice day.", true)
            .await;
        info!(%login, address = %self.address, "session closed");
    }

    async fn prompt_line(&mut self, prompt: &str) -> Result<Option<String>, SessionError> {
        self.wire.write(prompt, false).await?;
        self.read_line().await
    }

    async fn read_line(&mut self) -> Result<Option<String>, SessionError> {
        match self.wire.read_command().await {
            Ok(v) => Ok(v),
            Err(e) => Err(SessionError::from(e)),
        }
    }
}
