use crux_core::capability::{Capability, CapabilityContext, Operation};
use futures::StreamExt;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{RoomId, RoomListing, RoomPayload};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "op", content = "data")]
pub enum FeedOperation {
    Subscribe { path: String },
    Unsubscribe { path: String },
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum FeedError {
    #[error("could not attach to feed at {path}: {reason}")]
    Attach { path: String, reason: String },

    #[error("feed stream interrupted: {reason}")]
    Stream { reason: String },

    #[error("permission denied reading {path}")]
    PermissionDenied { path: String },
}

impl FeedError {
    #[must_use]
    pub fn stream(reason: impl Into<String>) -> Self {
        Self::Stream {
            reason: reason.into(),
        }
    }
}

/// One full-collection snapshot from the remote store. `Records` carries
/// every keyed payload under the subscribed path, in the store's own
/// enumeration order; `Empty` means the path currently holds no data.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum FeedSnapshot {
    Records(IndexMap<String, RoomPayload>),
    Empty,
}

impl FeedSnapshot {
    #[must_use]
    pub fn record_count(&self) -> usize {
        match self {
            Self::Records(records) => records.len(),
            Self::Empty => 0,
        }
    }
}

pub type FeedResult = Result<FeedSnapshot, FeedError>;

impl Operation for FeedOperation {
    type Output = FeedResult;
}

/// Opaque token for an open feed subscription. Owned by the model; the
/// only way to act on it is to hand it back to [`RoomFeed::unsubscribe`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionHandle {
    path: String,
}

impl SubscriptionHandle {
    fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }
}

pub struct RoomFeed<Ev> {
    context: CapabilityContext<FeedOperation, Ev>,
}

impl<Ev> Capability<Ev> for RoomFeed<Ev> {
    type Operation = FeedOperation;
    type MappedSelf<MappedEv> = RoomFeed<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        RoomFeed::new(self.context.map_event(f))
    }
}

impl<Ev> RoomFeed<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<FeedOperation, Ev>) -> Self {
        Self { context }
    }

    /// Opens a persistent subscription to `path`. The shell resolves the
    /// streamed request once per remote snapshot, indefinitely, until it is
    /// told to detach via [`Self::unsubscribe`].
    pub fn subscribe<F>(&self, path: impl Into<String>, make_event: F) -> SubscriptionHandle
    where
        F: Fn(FeedResult) -> Ev + Send + 'static,
    {
        let path = path.into();
        let handle = SubscriptionHandle::new(&path);

        let context = self.context.clone();
        self.context.spawn(async move {
            let mut snapshots = context.stream_from_shell(FeedOperation::Subscribe { path });

            while let Some(result) = snapshots.next().await {
                context.update_app(make_event(result));
            }
        });

        handle
    }

    /// Tells the shell to detach its listener. Consumes the handle: once
    /// released, a subscription cannot be reused.
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context
                .notify_shell(FeedOperation::Unsubscribe { path: handle.path })
                .await;
        });
    }
}

/// Maps one keyed snapshot into the renderable listing collection. Each
/// entry's key becomes the record id; enumeration order is preserved
/// untouched, so the list always mirrors the store's own ordering.
#[must_use]
pub fn rooms_from_snapshot(records: IndexMap<String, RoomPayload>) -> Vec<RoomListing> {
    records
        .into_iter()
        .map(|(key, payload)| RoomListing::from_payload(RoomId::new(key), payload))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(title: &str, price: f64) -> RoomPayload {
        RoomPayload {
            title: title.into(),
            description: String::new(),
            price_per_night: price,
            image_url: String::new(),
            amenities: Vec::new(),
        }
    }

    #[test]
    fn test_operation_serialization_round_trip() {
        let op = FeedOperation::Subscribe {
            path: "rooms/".into(),
        };
        let json = serde_json::to_string(&op).unwrap();
        let deserialized: FeedOperation = serde_json::from_str(&json).unwrap();
        assert_eq!(op, deserialized);
    }

    #[test]
    fn test_snapshot_round_trip_keeps_enumeration_order() {
        let mut records = IndexMap::new();
        records.insert("r9".to_string(), payload("Loft", 900_000.0));
        records.insert("r1".to_string(), payload("Studio", 100_000.0));
        records.insert("r5".to_string(), payload("Suite", 500_000.0));

        let snapshot = FeedSnapshot::Records(records);
        let json = serde_json::to_string(&snapshot).unwrap();
        let restored: FeedSnapshot = serde_json::from_str(&json).unwrap();

        let FeedSnapshot::Records(restored) = restored else {
            panic!("expected records");
        };
        let keys: Vec<&str> = restored.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["r9", "r1", "r5"]);
    }

    #[test]
    fn test_rooms_from_snapshot_tags_keys_as_ids() {
        let mut records = IndexMap::new();
        records.insert("abc".to_string(), payload("A", 1.0));
        records.insert("def".to_string(), payload("D", 2.0));

        let rooms = rooms_from_snapshot(records);

        assert_eq!(rooms.len(), 2);
        assert_eq!(rooms[0].id.as_str(), "abc");
        assert_eq!(rooms[0].title, "A");
        assert_eq!(rooms[1].id.as_str(), "def");
        assert_eq!(rooms[1].title, "D");
    }

    #[test]
    fn test_empty_snapshot_counts_zero_records() {
        assert_eq!(FeedSnapshot::Empty.record_count(), 0);
        assert_eq!(
            FeedSnapshot::Records(IndexMap::new()).record_count(),
            0
        );
    }

    #[test]
    fn test_feed_error_display() {
        let error = FeedError::Attach {
            path: "rooms/".into(),
            reason: "socket closed".into(),
        };
        assert_eq!(
            error.to_string(),
            "could not attach to feed at rooms/: socket closed"
        );
        assert!(FeedError::stream("reset").to_string().contains("reset"));
    }

    #[test]
    fn test_subscription_handle_exposes_path() {
        let handle = SubscriptionHandle::new("rooms/");
        assert_eq!(handle.path(), "rooms/");
    }
}
