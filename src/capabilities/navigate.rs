use crux_core::capability::{Capability, CapabilityContext, Operation};
use serde::{Deserialize, Serialize};

use crate::{RoomId, SessionToken};

/// A named-destination routing request for the shell's navigator. The
/// variant name is the route; `params` carries the payload the destination
/// screen expects. The session token is forwarded as-is, absent included.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "screen", content = "params")]
pub enum NavigationIntent {
    RoomDetail {
        #[serde(rename = "roomId")]
        room_id: RoomId,
        #[serde(rename = "userId")]
        user_id: Option<SessionToken>,
    },
    HistoryBooking {
        #[serde(rename = "userId")]
        user_id: Option<SessionToken>,
    },
    Login,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NavigateOperation(pub NavigationIntent);

impl Operation for NavigateOperation {
    type Output = ();
}

pub struct Navigator<Ev> {
    context: CapabilityContext<NavigateOperation, Ev>,
}

impl<Ev> Capability<Ev> for Navigator<Ev> {
    type Operation = NavigateOperation;
    type MappedSelf<MappedEv> = Navigator<MappedEv>;

    fn map_event<F, NewEv>(&self, f: F) -> Self::MappedSelf<NewEv>
    where
        F: Fn(NewEv) -> Ev + Send + Sync + 'static,
        Ev: 'static,
        NewEv: 'static,
    {
        Navigator::new(self.context.map_event(f))
    }
}

impl<Ev> Navigator<Ev>
where
    Ev: 'static,
{
    pub fn new(context: CapabilityContext<NavigateOperation, Ev>) -> Self {
        Self { context }
    }

    /// Fire-and-forget: the core never waits on, or hears back from, a
    /// navigation request.
    pub fn navigate(&self, intent: NavigationIntent) {
        let context = self.context.clone();
        self.context.spawn(async move {
            context.notify_shell(NavigateOperation(intent)).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_room_detail_wire_shape() {
        let intent = NavigationIntent::RoomDetail {
            room_id: RoomId::new("r7"),
            user_id: Some(SessionToken::new("u42")),
        };

        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(
            value,
            json!({
                "screen": "RoomDetail",
                "params": { "roomId": "r7", "userId": "u42" }
            })
        );
    }

    #[test]
    fn test_absent_session_is_forwarded_as_null() {
        let intent = NavigationIntent::HistoryBooking { user_id: None };

        let value = serde_json::to_value(&intent).unwrap();
        assert_eq!(
            value,
            json!({
                "screen": "HistoryBooking",
                "params": { "userId": null }
            })
        );
    }

    #[test]
    fn test_login_carries_no_params() {
        let value = serde_json::to_value(NavigationIntent::Login).unwrap();
        assert_eq!(value, json!({ "screen": "Login" }));
    }
}
