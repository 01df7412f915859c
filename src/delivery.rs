//! Fan-out from `ChatState` to connected sockets.
//!
//! Delivery never touches a socket directly: it pushes a rendered line onto
//! the recipient's `OutboundTx`, and the recipient's own session task (see
//! `session.rs`) is the only task that ever writes to that connection's
//! `Wire`. This mirrors the reference server's `MessageQueueTX`/`RX` split,
//! which decouples "a message arrived for you" from "write it to the wire
//! now" so a slow reader can never stall the sender holding the state lock.

use crate::chat::{ChatState, Message};

/// Pushes a single already-rendered line to one address. Silently drops if
/// the address has since disconnected; delivery never errors on a missing
/// peer.
pub fn push_text(state: &ChatState, address: &str, line: &str) {
    if let Some(tx) = state.sender_for(address) {
        let _ = tx.send(line.to_string());
    }
}

/// Renders `msg` for each of `login`'s connected addresses and pushes it to
/// all of them. A user logged in from several addresses sees the message on
/// every one.
pub fn push_message_to_login(state: &ChatState, login: &str, msg: &Message) {
    for address in state.addresses_of(login) {
        let line = msg.render_for(login);
        push_text(state, &address, &line);
    }
}

/// Delivers a public message to every currently connected address.
pub fn broadcast(state: &ChatState, msg: &Message) {
    for address in state.all_addresses() {
        let login = match state.login_of(&address) {
            Some(l) => l.to_string(),
            None => continue,
        };
        let line = msg.render_for(&login);
        push_text(state, &address, &line);
    }
}

/// Delivers a room message to every member of `room` who is currently
/// connected, wherever they're connected from.
pub fn deliver_to_room(state: &ChatState, room: &str, msg: &Message) {
    for login in state.members_of(room) {
        push_message_to_login(state, &login, msg);
    }
}
