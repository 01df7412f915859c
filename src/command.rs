//! Parses authenticated-phase command lines and dispatches them against the
//! shared state, pushing replies and deliveries through `delivery.rs`.

use chrono::Utc;
use tracing::{info, warn};

use crate::chat::{AuthOutcome, ChatState, Message};
use crate::delivery;

/// One parsed command line. Unrecognized heads do not produce a variant;
/// `parse` returns `None` for those and the caller replies `Wrong command.`.
pub enum Command {
    Exit,
    Unread,
    Status,
    Send { text: String },
    Private { login: String, text: String },
    Create { name: String },
    SendChat { name: String, text: String },
    Invite { login: String, name: String },
    Join { name: String, token: Option<String> },
}

fn split_first(tail: &str) -> (&str, &str) {
    match tail.find(char::is_whitespace) {
        Some(idx) => (&tail[..idx], tail[idx..].trim_start()),
        None => (tail, ""),
    }
}

impl Command {
    /// Splits on the first whitespace run into `(head, tail)` and matches
    /// `head` against the command vocabulary, including both spellings of
    /// each aliased command.
    pub fn parse(line: &str) -> Option<Command> {
        let (head, tail) = split_first(line.trim());
        match head {
            "/exit" => Some(Command::Exit),
            "/unread" | "/show_unread" => Some(Command::Unread),
            "/status" => Some(Command::Status),
            "/send" => Some(Command::Send { text: tail.to_string() }),
            "/private" | "/send_private" => {
                let (login, text) = split_first(tail);
                Some(Command::Private {
                    login: login.to_string(),
                    text: text.to_string(),
                })
            }
            "/create" | "/create_chat" => Some(Command::Create { name: tail.to_string() }),
            "/send_chat" => {
                let (name, text) = split_first(tail);
                Some(Command::SendChat {
                    name: name.to_string(),
                    text: text.to_string(),
                })
            }
            "/invite" => {
                let (login, name) = split_first(tail);
                Some(Command::Invite {
                    login: login.to_string(),
                    name: name.to_string(),
                })
            }
            "/join" => {
                let (name, token) = split_first(tail);
                Some(Command::Join {
                    name: name.to_string(),
                    token: if token.is_empty() { None } else { Some(token.to_string()) },
                })
            }
            _ => None,
        }
    }
}

/// What the session driver should do after dispatching a command.
pub enum Flow {
    Continue,
    Exit,
    /// `/join` without a token enters the admin-approval sub-dialog; the
    /// session driver must read one more line (`y`/`n`) before continuing.
    AwaitJoinApproval { name: String },
}

/// Dispatches one parsed command for `login`/`address`. Replies are pushed
/// directly to `address`; broader deliveries go through `delivery.rs`.
pub async fn dispatch(state: &tokio::sync::Mutex<ChatState>, address: &str, login: &str, cmd: Command) -> Flow {
    match cmd {
        Command::Exit => Flow::Exit,

        Command::Unread => {
            let mut st = state.lock().await;
            let logout_time = st.user(login).and_then(|u| u.logout_time);
            if let Some(since) = logout_time {
                let lines: Vec<String> = st
                    .unread_since(login, since)
                    .into_iter()
                    .map(|m| m.render_for(login))
                    .collect();
                for line in lines {
                    delivery::push_text(&st, address, &line);
                }
            }
            drop(st);
            Flow::Continue
        }

        Command::Status => {
            let st = state.lock().await;
            let summary = st.status_summary(login);
            delivery::push_text(&st, address, &format!("Your address is {}.", address));
            delivery::push_text(
                &st,
                address,
                &format!("You have sent {} private messages.", summary.private_messages_sent),
            );
            delivery::push_text(
                &st,
                address,
                &format!("You administer {} chats.", summary.rooms_administered),
            );
            delivery::push_text(&st, address, &format!("You are a member of {} chats.", summary.rooms_joined));
            for (room, token) in summary.private_chats {
                delivery::push_text(&st, address, &format!("The invite key for the chat {} is {}.", room, token));
            }
            drop(st);
            Flow::Continue
        }

        Command::Send { text } => {
            let now = Utc::now();
            let mut st = state.lock().await;
            if !st.try_record_send(login, now) {
                let cap = st.rate_cap();
                let line = format!(
                    "Sorry, but you have reached your limit of {} per hour. The message not be sent.",
                    cap
                );
                for addr in st.addresses_of(login) {
                    delivery::push_text(&st, &addr, &line);
                }
            } else {
                let msg = Message::new_public(login, &text, now);
                st.record(msg.clone());
                delivery::broadcast(&st, &msg);
            }
            drop(st);
            Flow::Continue
        }

        Command::Private { login: target, text } => {
            let now = Utc::now();
            let mut st = state.lock().await;
            let msg = Message::new_private_dm(login, &target, &text, now);
            st.record(msg.clone());
            if !st.has_login(&target) {
                delivery::push_text(&st, address, "Wrong user login.");
            } else if target == login {
                delivery::push_text(&st, address, &msg.render_for(login));
            } else {
                delivery::push_message_to_login(&st, &target, &msg);
            }
            drop(st);
            Flow::Continue
        }

        Command::Create { name } => {
            let mut st = state.lock().await;
            if name.is_empty() {
                delivery::push_text(&st, address, "Chat name can not be empty.");
            } else if st.room_exists(&name) {
                delivery::push_text(&st, address, &format!("Chat {} already exists.", name));
            } else {
                st.create_room(&name, login);
                delivery::push_text(&st, address, &format!("Chat {} created.", name));
            }
            drop(st);
            Flow::Continue
        }

        Command::SendChat { name, text } => {
            let now = Utc::now();
            let mut st = state.lock().await;
            if !st.room_exists(&name) {
                delivery::push_text(&st, address, &format!("Chat {} does not exist.", name));
            } else if text.is_empty() {
                delivery::push_text(&st, address, "Message text can not be empty.");
            } else if !st.room(&name).map(|r| r.is_member(login)).unwrap_or(false) {
                delivery::push_text(&st, address, &format!("You are not member of chat {}.", name));
            } else {
                let msg = Message::new_room(login, &name, &text, now);
                st.record(msg.clone());
                delivery::deliver_to_room(&st, &name, &msg);
            }
            drop(st);
            Flow::Continue
        }

        Command::Invite { login: target, name } => {
            let mut st = state.lock().await;
            if target.is_empty() || name.is_empty() {
                delivery::push_text(&st, address, "Usage: /invite <login> <name>.");
            } else if !st.room_exists(&name) {
                delivery::push_text(&st, address, &format!("Chat {} does not exist.", name));
            } else if !st.room(&name).map(|r| r.is_admin(login)).unwrap_or(false) {
                delivery::push_text(&st, address, "Only the chat admin can invite users.");
            } else if !st.has_login(&target) {
                delivery::push_text(&st, address, "Wrong user login.");
            } else if st.room(&name).map(|r| r.is_member(&target)).unwrap_or(false) {
                delivery::push_text(&st, address, &format!("User {} is already a member of {}.", target, name));
            } else {
                let token = st.invite(&name, &target).expect("room existence already checked");
                delivery::push_text(
                    &st,
                    address,
                    &format!("An invitation to user {} to chat {} has been sent.", target, name),
                );
                let push = format!(
                    "You are invited to the chat {} by an admin {}. Your invite key is {}",
                    name, login, token
                );
                for addr in st.addresses_of(&target) {
                    delivery::push_text(&st, &addr, &push);
                }
            }
            drop(st);
            Flow::Continue
        }

        Command::Join { name, token } => {
            let mut st = state.lock().await;
            if name.is_empty() {
                delivery::push_text(&st, address, "Chat name can not be empty.");
                drop(st);
                return Flow::Continue;
            }
            if !st.room_exists(&name) {
                delivery::push_text(&st, address, &format!("Chat {} does not exist.", name));
                drop(st);
                return Flow::Continue;
            }
            if st.room(&name).map(|r| r.is_member(login)).unwrap_or(false) {
                delivery::push_text(&st, address, &format!("You are already a member of {}.", name));
                drop(st);
                return Flow::Continue;
            }
            match token {
                None => {
                    drop(st);
                    Flow::AwaitJoinApproval { name }
                }
                Some(candidate) => {
                    if st.join_with_token(&name, login, &candidate) {
                        delivery::push_text(&st, address, &format!("You are join to chat {}.", name));
                        info!(%login, room = %name, "joined chat with invite token");
                    } else {
                        delivery::push_text(&st, address, "The invite-key is invalid.");
                        warn!(%login, room = %name, "rejected invalid invite token");
                    }
                    drop(st);
                    Flow::Continue
                }
            }
        }
    }
}

/// Completes the y/n sub-dialog entered via `Flow::AwaitJoinApproval`. `y`
/// notifies every admin address and returns; anything else, including `n`,
/// is a silent no-op per the admin-request path.
pub async fn complete_join_request(state: &tokio::sync::Mutex<ChatState>, login: &str, name: &str, answer: &str) {
    if answer.trim() != "y" {
        return;
    }
    let st = state.lock().await;
    let admin = match st.room(name) {
        Some(r) => r.admin.clone(),
        None => return,
    };
    let push = format!("User {} wants to join the chat {}.", login, name);
    for addr in st.addresses_of(&admin) {
        delivery::push_text(&st, &addr, &push);
    }
}

/// Translates a store auth outcome into the handshake reply + whether the
/// session should close, per the `/login` sub-dialog in the session driver.
pub fn login_outcome_reply(outcome: AuthOutcome) -> (&'static str, bool) {
    match outcome {
        AuthOutcome::Ok => ("Login successful.", false),
        AuthOutcome::UnknownUser => ("User not found.", true),
        AuthOutcome::WrongPassword => ("Wrong password.", true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_spellings_of_aliased_commands() {
        assert!(matches!(Command::parse("/unread"), Some(Command::Unread)));
        assert!(matches!(Command::parse("/show_unread"), Some(Command::Unread)));
        assert!(matches!(Command::parse("/create room1"), Some(Command::Create { .. })));
        assert!(matches!(Command::parse("/create_chat room1"), Some(Command::Create { .. })));
    }

    #[test]
    fn unknown_head_parses_to_none() {
        assert!(Command::parse("/nope").is_none());
    }

    #[test]
    fn private_splits_login_then_remaining_text_verbatim() {
        match Command::parse("/private bob hello there").unwrap() {
            Command::Private { login, text } => {
                assert_eq!(login, "bob");
                assert_eq!(text, "hello there");
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn join_without_token_parses_token_as_none() {
        match Command::parse("/join room1").unwrap() {
            Command::Join { name, token } => {
                assert_eq!(name, "room1");
                assert!(token.is_none());
            }
            _ => panic!("wrong variant"),
        }
    }
}
