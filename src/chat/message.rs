use chrono::{DateTime, Utc};

/// A message once created is immutable and shared by reference from history
/// and the delivery path. `text` is the fully rendered line (timestamp,
/// author, privacy tag) computed at creation time; it is never mutated
/// afterwards and is delivered verbatim to every viewer, including the
/// author's own addresses.
#[derive(Clone, Debug)]
pub struct Message {
    pub text: String,
    pub author: String,
    pub pub_date: DateTime<Utc>,
    pub is_private: bool,
    pub recipient: Option<String>,
    pub room: Option<String>,
}

impl Message {
    pub fn new_public(author: impl Into<String>, body: impl Into<String>, now: DateTime<Utc>) -> Self {
        let author = author.into();
        let body = body.into();
        Message {
            text: Self::format(&author, false, &body, now),
            author,
            pub_date: now,
            is_private: false,
            recipient: None,
            room: None,
        }
    }

    pub fn new_private_dm(
        author: impl Into<String>,
        recipient: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let author = author.into();
        let body = body.into();
        Message {
            text: Self::format(&author, true, &body, now),
            author,
            pub_date: now,
            is_private: true,
            recipient: Some(recipient.into()),
            room: None,
        }
    }

    pub fn new_room(
        author: impl Into<String>,
        room: impl Into<String>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let author = author.into();
        let body = body.into();
        Message {
            text: Self::format(&author, true, &body, now),
            author,
            pub_date: now,
            is_private: true,
            recipient: None,
            room: Some(room.into()),
        }
    }

    fn format(author: &str, is_private: bool, body: &str, now: DateTime<Utc>) -> String {
        let date = now.format("%Y.%m.%d %H:%M:%S");
        let privacy = if is_private { "in private" } else { "" };
        format!("{} {} {} says: {}", date, author, privacy, body)
    }

    /// Renders this message for `viewer`. Every viewer, including the
    /// author, sees the same stored text -- there is no self-name
    /// substitution.
    pub fn render_for(&self, _viewer: &str) -> String {
        self.text.clone()
    }
}
