use std::collections::{HashMap, HashSet};

use crate::chat::invite;

/// A named, membership-gated channel created by `/create`. Never destroyed.
pub struct Room {
    pub name: String,
    pub admin: String,
    pub members: HashSet<String>,
    invite_tokens: HashMap<String, String>,
}

impl Room {
    pub fn new(name: impl Into<String>, admin: impl Into<String>) -> Self {
        let admin = admin.into();
        let mut members = HashSet::new();
        members.insert(admin.clone());
        Room {
            name: name.into(),
            admin,
            members,
            invite_tokens: HashMap::new(),
        }
    }

    pub fn is_admin(&self, login: &str) -> bool {
        self.admin == login
    }

    pub fn is_member(&self, login: &str) -> bool {
        self.members.contains(login)
    }

    pub fn add_member(&mut self, login: impl Into<String>) {
        self.members.insert(login.into());
    }

    pub fn mint_invite(&mut self, login: &str) -> String {
        invite::mint_or_get(&mut self.invite_tokens, login)
    }

    pub fn verify_invite(&mut self, login: &str, candidate: &str) -> bool {
        invite::verify_or_mint(&mut self.invite_tokens, login, candidate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_is_a_member_on_creation() {
        let room = Room::new("room1", "alice");
        assert!(room.is_member("alice"));
        assert!(room.is_admin("alice"));
    }
}
