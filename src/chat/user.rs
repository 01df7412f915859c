use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::chat::ratelimit::RateCounter;

/// A registered account. Created by `/auth`, never destroyed; mutated only
/// via login/logout, send, and invite operations.
pub struct User {
    pub login: String,
    pub password: String,
    /// Ordered sequence of peer-address strings currently bound to this
    /// user; empty when offline.
    pub addresses: Vec<String>,
    pub logout_time: Option<DateTime<Utc>>,
    /// Room name -> invite token this user currently holds.
    pub private_chats: HashMap<String, String>,
    pub rate: RateCounter,
}

impl User {
    pub fn new(login: impl Into<String>, password: impl Into<String>, address: impl Into<String>) -> Self {
        User {
            login: login.into(),
            password: password.into(),
            addresses: vec![address.into()],
            logout_time: None,
            private_chats: HashMap::new(),
            rate: RateCounter::new(),
        }
    }

    pub fn bind_address(&mut self, address: impl Into<String>) {
        let address = address.into();
        if !self.addresses.contains(&address) {
            self.addresses.push(address);
        }
    }

    pub fn unbind_address(&mut self, address: &str) {
        self.addresses.retain(|a| a != address);
    }
}
