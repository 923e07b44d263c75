mod feed;
mod location;
mod navigate;

pub use self::feed::{
    rooms_from_snapshot, FeedError, FeedOperation, FeedResult, FeedSnapshot, RoomFeed,
    SubscriptionHandle,
};
pub use self::location::{
    Location, LocationError, LocationOperation, LocationOutput, LocationResult, PositionResult,
};
pub use self::navigate::{NavigateOperation, NavigationIntent, Navigator};

pub use crux_core::render::Render;

use crate::app::App;
use crate::Event;

#[derive(crux_core::macros::Effect)]
#[effect(app = "App")]
pub struct Capabilities {
    pub render: Render<Event>,
    pub location: Location<Event>,
    pub feed: RoomFeed<Event>,
    pub navigator: Navigator<Event>,
}
