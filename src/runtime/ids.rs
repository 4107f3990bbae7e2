//! Session id generation

use chrono::Utc;

/// Generates `<clientId><unix-millis>` session ids.
///
/// The time component strictly increases across calls on one generator, so
/// two ids generated within the same millisecond still differ.
#[derive(Debug)]
pub struct SessionIdGenerator {
    client_id: String,
    last_millis: i64,
}

impl SessionIdGenerator {
    pub fn new(client_id: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            last_millis: 0,
        }
    }

    pub fn next_id(&mut self) -> String {
        let now = Utc::now().timestamp_millis();
        self.last_millis = now.max(self.last_millis + 1);
        format!("{}{}", self.client_id, self.last_millis)
    }
}
