//! Last-writer-wins reconciliation of client and server copies.

use crate::models::{Chat, Message};
use chrono::{DateTime, Utc};

pub trait Timestamped {
    fn updated_at(&self) -> DateTime<Utc>;
}

impl Timestamped for Chat {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl Timestamped for Message {
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Winner {
    Local,
    Remote,
}

/// The local copy wins only if it is strictly newer.
pub fn merge<T: Timestamped>(local: &T, remote: &T) -> Winner {
    if local.updated_at() > remote.updated_at() {
        Winner::Local
    } else {
        Winner::Remote
    }
}

/// Whether a client copy must be written to the server.
pub fn should_upload<T: Timestamped>(local: &T, remote: Option<&T>) -> bool {
    match remote {
        Some(remote) => merge(local, remote) == Winner::Local,
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    struct Record(DateTime<Utc>);

    impl Timestamped for Record {
        fn updated_at(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn newer_local_wins() {
        let now = Utc::now();
        assert_eq!(merge(&Record(now), &Record(now - Duration::seconds(1))), Winner::Local);
        assert_eq!(merge(&Record(now - Duration::seconds(1)), &Record(now)), Winner::Remote);
    }

    #[test]
    fn ties_keep_the_server_copy() {
        let now = Utc::now();
        assert_eq!(merge(&Record(now), &Record(now)), Winner::Remote);
        assert!(!should_upload(&Record(now), Some(&Record(now))));
    }

    #[test]
    fn missing_server_copy_is_uploaded() {
        assert!(should_upload::<Record>(&Record(Utc::now()), None));
    }

    #[test]
    fn chat_uses_updated_at() {
        let mut local = Chat::default();
        let mut remote = Chat::default();
        local.updated_at = Utc::now();
        remote.updated_at = local.updated_at - Duration::minutes(5);
        remote.timestamp = local.updated_at + Duration::minutes(5);
        assert_eq!(merge(&local, &remote), Winner::Local);
    }
}
