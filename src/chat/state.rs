use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::info;

use crate::chat::message::Message;
use crate::chat::room::Room;
use crate::chat::user::User;

pub type OutboundTx = mpsc::UnboundedSender<String>;

pub enum AuthOutcome {
    Ok,
    UnknownUser,
    WrongPassword,
}

pub struct StatusSummary {
    pub private_messages_sent: usize,
    pub rooms_administered: usize,
    pub rooms_joined: usize,
    pub private_chats: Vec<(String, String)>,
}

/// The in-memory store: users, rooms, history, connections, invite tokens,
/// and per-user rate counters. Exclusively owned here; session drivers only
/// ever borrow a connection by address key and never retain it past the
/// session. All mutation happens under the single `tokio::sync::Mutex` that
/// wraps a `ChatState` (see `lib.rs::SharedState`); this type itself assumes
/// the caller already holds that lock.
pub struct ChatState {
    users: HashMap<String, User>,
    rooms: HashMap<String, Room>,
    history: Vec<Message>,
    /// address -> outbound sender for that connection
    connections: HashMap<String, OutboundTx>,
    /// address -> owning login, kept in lockstep with `connections`
    address_login: HashMap<String, String>,
    rate_cap: u32,
}

impl ChatState {
    pub fn new(rate_cap: u32) -> Self {
        ChatState {
            users: HashMap::new(),
            rooms: HashMap::new(),
            history: Vec::new(),
            connections: HashMap::new(),
            address_login: HashMap::new(),
            rate_cap,
        }
    }

    pub fn rate_cap(&self) -> u32 {
        self.rate_cap
    }

    // --- connections -------------------------------------------------

    pub fn register_connection(&mut self, address: impl Into<String>, login: impl Into<String>, tx: OutboundTx) {
        let address = address.into();
        let login = login.into();
        info!(%address, %login, "connection registered");
        self.address_login.insert(address.clone(), login);
        self.connections.insert(address, tx);
    }

    pub fn remove_connection(&mut self, address: &str) {
        self.connections.remove(address);
        self.address_login.remove(address);
    }

    pub fn sender_for(&self, address: &str) -> Option<OutboundTx> {
        self.connections.get(address).cloned()
    }

    pub fn login_of(&self, address: &str) -> Option<&str> {
        self.address_login.get(address).map(|s| s.as_str())
    }

    pub fn all_addresses(&self) -> Vec<String> {
        self.connections.keys().cloned().collect()
    }

    // --- users / auth --------------------------------------------------

    pub fn has_login(&self, login: &str) -> bool {
        self.users.contains_key(login)
    }

    pub fn user(&self, login: &str) -> Option<&User> {
        self.users.get(login)
    }

    pub fn register_user(&mut self, login: &str, password: &str, address: &str) {
        self.users
            .insert(login.to_string(), User::new(login, password, address));
    }

    pub fn authenticate(&self, login: &str, password: &str) -> AuthOutcome {
        match self.users.get(login) {
            None => AuthOutcome::UnknownUser,
            Some(u) if u.password != password => AuthOutcome::WrongPassword,
            Some(_) => AuthOutcome::Ok,
        }
    }

    pub fn bind_address(&mut self, login: &str, address: &str) {
        if let Some(u) = self.users.get_mut(login) {
            u.bind_address(address);
        }
    }

    pub fn addresses_of(&self, login: &str) -> Vec<String> {
        self.users
            .get(login)
            .map(|u| u.addresses.clone())
            .unwrap_or_default()
    }

    /// Unbinds `address` from `login`, stamps the logout time, and drops the
    /// connection. Best-effort: a missing user or connection is a no-op.
    pub fn logout(&mut self, login: &str, address: &str) {
        if let Some(u) = self.users.get_mut(login) {
            u.unbind_address(address);
            u.logout_time = Some(Utc::now());
        }
        self.remove_connection(address);
    }

    // --- rate limiting ---------------------------------------------------

    pub fn try_record_send(&mut self, login: &str, now: DateTime<Utc>) -> bool {
        match self.users.get_mut(login) {
            Some(u) => u.rate.try_record(self.rate_cap, now),
            None => false,
        }
    }

    // --- history / unread / status --------------------------------------

    pub fn record(&mut self, msg: Message) {
        self.history.push(msg);
    }

    pub fn recent_public(&self, depth: usize) -> Vec<&Message> {
        self.history
            .iter()
            .filter(|m| !m.is_private)
            .rev()
            .take(depth)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect()
    }

    /// Entries with `pub_date > since`, skipping private entries whose
    /// author is not `login`: only the author sees their own private
    /// traffic replayed here, not its recipient.
    pub fn unread_since(&self, login: &str, since: DateTime<Utc>) -> Vec<&Message> {
        self.history
            .iter()
            .filter(|m| m.pub_date > since)
            .filter(|m| !m.is_private || m.author == login)
            .collect()
    }

    pub fn status_summary(&self, login: &str) -> StatusSummary {
        let private_messages_sent = self
            .history
            .iter()
            .filter(|m| m.is_private && m.author == login)
            .count();
        let rooms_administered = self.rooms.values().filter(|r| r.is_admin(login)).count();
        let rooms_joined = self.rooms.values().filter(|r| r.is_member(login)).count();
        let private_chats = self
            .users
            .get(login)
            .map(|u| {
                u.private_chats
                    .iter()
                    .map(|(room, token)| (room.clone(), token.clone()))
                    .collect()
            })
            .unwrap_or_default();

        StatusSummary {
            private_messages_sent,
            rooms_administered,
            rooms_joined,
            private_chats,
        }
    }

    // --- rooms -----------------------------------------------------------

    pub fn room_exists(&self, name: &str) -> bool {
        self.rooms.contains_key(name)
    }

    pub fn room(&self, name: &str) -> Option<&Room> {
        self.rooms.get(name)
    }

    pub fn create_room(&mut self, name: &str, admin: &str) -> bool {
        if self.rooms.contains_key(name) {
            return false;
        }
        self.rooms.insert(name.to_string(), Room::new(name, admin));
        true
    }

    pub fn members_of(&self, room: &str) -> Vec<String> {
        self.rooms
            .get(room)
            .map(|r| r.members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Mints (idempotently) an invite token for `(room, login)` and records
    /// it in the target user's `private_chats`. Returns `None` if the room
    /// doesn't exist.
    pub fn invite(&mut self, room: &str, login: &str) -> Option<String> {
        let token = self.rooms.get_mut(room)?.mint_invite(login);
        if let Some(u) = self.users.get_mut(login) {
            u.private_chats.insert(room.to_string(), token.clone());
        }
        Some(token)
    }

    pub fn join_with_token(&mut self, room: &str, login: &str, token: &str) -> bool {
        match self.rooms.get_mut(room) {
            Some(r) if r.verify_invite(login, token) => {
                r.add_member(login);
                true
            }
            _ => false,
        }
    }
}
