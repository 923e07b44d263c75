#![forbid(unsafe_code)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod capabilities;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use app::App;
pub use capabilities::{Capabilities, Effect};
use capabilities::{FeedResult, PositionResult, SubscriptionHandle};

/// Remote collection path the home screen subscribes to.
pub const ROOMS_FEED_PATH: &str = "rooms/";
/// Fixed zoom span of the map region, in degrees of latitude and longitude.
pub const MAP_SPAN_DEGREES: f64 = 0.05;
pub const AMENITY_SEPARATOR: &str = " • ";
pub const VND_CURRENCY_CODE: &str = "VND";
pub const USER_MARKER_TITLE: &str = "Your location";
pub const LOCATION_DENIED_NOTICE: &str = "Location access was denied";

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CoordinateError {
    #[error("latitude {0} is out of valid range [-90, 90]")]
    LatitudeOutOfRange(f64),
    #[error("longitude {0} is out of valid range [-180, 180]")]
    LongitudeOutOfRange(f64),
    #[error("coordinate value is not finite")]
    NonFinite,
}

/// A validated geographic position. Construction is the only place range
/// and finiteness are checked; everything downstream can trust the values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    latitude: f64,
    longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CoordinateError> {
        if !latitude.is_finite() || !longitude.is_finite() {
            return Err(CoordinateError::NonFinite);
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CoordinateError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CoordinateError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    #[must_use]
    pub const fn latitude(self) -> f64 {
        self.latitude
    }

    #[must_use]
    pub const fn longitude(self) -> f64 {
        self.longitude
    }
}

impl TryFrom<(f64, f64)> for Coordinate {
    type Error = CoordinateError;

    fn try_from((latitude, longitude): (f64, f64)) -> Result<Self, Self::Error> {
        Self::new(latitude, longitude)
    }
}

/// The visible map window: a center plus a symmetric span.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MapRegion {
    pub latitude: f64,
    pub longitude: f64,
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl MapRegion {
    #[must_use]
    pub fn centered_on(center: Coordinate) -> Self {
        Self {
            latitude: center.latitude(),
            longitude: center.longitude(),
            latitude_delta: MAP_SPAN_DEGREES,
            longitude_delta: MAP_SPAN_DEGREES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

impl RoomId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RoomId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The externally issued session token. This core never mints or validates
/// one; it only stamps navigation payloads with it and clears it on logout.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub String);

impl SessionToken {
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// One record payload as the remote store serializes it. Field names match
/// the wire exactly; the record's key arrives separately, as the map key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomPayload {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price_per_night: f64,
    #[serde(rename = "imageURL", default)]
    pub image_url: String,
    #[serde(default)]
    pub amenities: Vec<String>,
}

/// An immutable listing snapshot. A new remote update produces a whole new
/// set of these; they are never patched in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomListing {
    pub id: RoomId,
    pub title: String,
    pub description: String,
    pub price_per_night: f64,
    pub image_url: String,
    pub amenities: Vec<String>,
}

impl RoomListing {
    #[must_use]
    pub fn from_payload(id: RoomId, payload: RoomPayload) -> Self {
        Self {
            id,
            title: payload.title,
            description: payload.description,
            price_per_night: payload.price_per_night,
            image_url: payload.image_url,
            amenities: payload.amenities,
        }
    }
}

#[must_use]
pub fn format_currency(amount: f64, code: &str) -> String {
    if !amount.is_finite() || amount < 0.0 {
        return "—".to_string();
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let whole = amount.round() as u64;

    if code == VND_CURRENCY_CODE {
        format!("{} ₫", group_thousands(whole, '.'))
    } else {
        format!("{} {code}", group_thousands(whole, ','))
    }
}

fn group_thousands(value: u64, separator: char) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(separator);
        }
        grouped.push(c);
    }
    grouped
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    #[default]
    Info,
    Warning,
    Error,
}

/// A transient user-visible message. Non-fatal by definition: notices never
/// block the screen, only annotate it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub message: String,
    pub kind: NoticeKind,
}

impl Notice {
    #[must_use]
    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NoticeKind::Warning,
        }
    }
}

/// Progress of the one-shot location acquisition. `Denied` is terminal for
/// the view lifetime; there is no retry path.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum LocationState {
    #[default]
    Locating,
    Available(Coordinate),
    Denied,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Model {
    pub session: Option<SessionToken>,
    pub location: LocationState,
    pub rooms: Vec<RoomListing>,
    pub subscription: Option<SubscriptionHandle>,
    pub generation: u64,
    pub logout_prompt: bool,
    pub notice: Option<Notice>,
}

impl Model {
    /// True while `generation` identifies the currently mounted view
    /// lifetime. Every asynchronous completion is gated on this; anything
    /// that resolves after teardown (or after a restart) is discarded.
    #[must_use]
    pub fn is_live(&self, generation: u64) -> bool {
        self.subscription.is_some() && generation == self.generation
    }

    pub fn show_notice(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// The shell mounted the screen. Carries the externally owned session
    /// token; both the location gate and the feed subscription start here.
    ScreenStarted {
        session: Option<SessionToken>,
    },
    /// The shell is dismissing the screen. Releases the feed subscription
    /// and invalidates all in-flight completions.
    ScreenClosed,

    LocationPermissionResolved {
        generation: u64,
        granted: bool,
    },
    PositionResolved {
        generation: u64,
        position: PositionResult,
    },

    FeedUpdate {
        generation: u64,
        result: Box<FeedResult>,
    },

    RoomSelected {
        room_id: RoomId,
    },
    HistoryRequested,
    LogoutRequested,
    LogoutConfirmed,
    LogoutCancelled,
    NoticeDismissed,
}

impl Event {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::ScreenStarted { .. } => "screen_started",
            Self::ScreenClosed => "screen_closed",
            Self::LocationPermissionResolved { .. } => "location_permission_resolved",
            Self::PositionResolved { .. } => "position_resolved",
            Self::FeedUpdate { .. } => "feed_update",
            Self::RoomSelected { .. } => "room_selected",
            Self::HistoryRequested => "history_requested",
            Self::LogoutRequested => "logout_requested",
            Self::LogoutConfirmed => "logout_confirmed",
            Self::LogoutCancelled => "logout_cancelled",
            Self::NoticeDismissed => "notice_dismissed",
        }
    }

    #[must_use]
    pub const fn is_user_initiated(&self) -> bool {
        matches!(
            self,
            Self::RoomSelected { .. }
                | Self::HistoryRequested
                | Self::LogoutRequested
                | Self::LogoutConfirmed
                | Self::LogoutCancelled
                | Self::NoticeDismissed
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub title: String,
}

impl MapMarker {
    #[must_use]
    pub fn user_position(coordinate: Coordinate) -> Self {
        Self {
            latitude: coordinate.latitude(),
            longitude: coordinate.longitude(),
            title: USER_MARKER_TITLE.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapView {
    /// Shown before the position resolves, and forever after a denial.
    Locating,
    Positioned {
        region: MapRegion,
        marker: MapMarker,
    },
}

/// One renderable row of the listing feed, fully formatted for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub price_display: String,
    pub amenities_display: String,
}

impl From<&RoomListing> for RoomCard {
    fn from(room: &RoomListing) -> Self {
        Self {
            id: room.id.0.clone(),
            title: room.title.clone(),
            description: room.description.clone(),
            image_url: room.image_url.clone(),
            price_display: format_currency(room.price_per_night, VND_CURRENCY_CODE),
            amenities_display: room.amenities.join(AMENITY_SEPARATOR),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogoutPrompt {
    pub title: String,
    pub message: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

impl Default for LogoutPrompt {
    fn default() -> Self {
        Self {
            title: "Sign out".into(),
            message: "Are you sure you want to sign out?".into(),
            confirm_label: "Sign out".into(),
            cancel_label: "Cancel".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewModel {
    pub map: MapView,
    pub rooms: Vec<RoomCard>,
    pub logout_prompt: Option<LogoutPrompt>,
    pub notice: Option<Notice>,
}

pub mod app {
    use super::{
        Coordinate, Event, LocationState, LogoutPrompt, MapMarker, MapRegion, MapView, Model,
        Notice, RoomCard, ViewModel, LOCATION_DENIED_NOTICE, ROOMS_FEED_PATH,
    };
    use crate::capabilities::{rooms_from_snapshot, Capabilities, FeedSnapshot, NavigationIntent};
    use tracing::{debug, info, warn};

    #[derive(Default)]
    pub struct App;

    impl crux_core::App for App {
        type Event = Event;
        type Model = Model;
        type ViewModel = ViewModel;
        type Capabilities = Capabilities;

        fn update(&self, event: Event, model: &mut Model, caps: &Capabilities) {
            debug!(event = event.name(), "handling event");

            match event {
                Event::ScreenStarted { session } => {
                    // A restart without a close is a fresh view lifetime; the
                    // superseded subscription is released and its late
                    // updates fall to the generation guard.
                    if let Some(stale) = model.subscription.take() {
                        caps.feed.unsubscribe(stale);
                    }

                    model.session = session;
                    model.location = LocationState::Locating;
                    model.rooms.clear();
                    model.notice = None;
                    model.logout_prompt = false;
                    model.generation += 1;
                    let generation = model.generation;

                    caps.location.request_permission(move |granted| {
                        Event::LocationPermissionResolved {
                            generation,
                            granted,
                        }
                    });

                    let handle = caps.feed.subscribe(ROOMS_FEED_PATH, move |result| {
                        Event::FeedUpdate {
                            generation,
                            result: Box::new(result),
                        }
                    });
                    model.subscription = Some(handle);

                    caps.render.render();
                }

                Event::ScreenClosed => {
                    if let Some(handle) = model.subscription.take() {
                        caps.feed.unsubscribe(handle);
                    }
                    // Invalidates every in-flight completion, the one-shot
                    // position request included.
                    model.generation += 1;
                }

                Event::LocationPermissionResolved {
                    generation,
                    granted,
                } => {
                    if !model.is_live(generation) {
                        debug!("discarding permission result for a closed screen");
                        return;
                    }
                    if model.location != LocationState::Locating {
                        return;
                    }

                    if granted {
                        caps.location.current_position(move |position| {
                            Event::PositionResolved {
                                generation,
                                position,
                            }
                        });
                    } else {
                        model.location = LocationState::Denied;
                        model.show_notice(Notice::warning(LOCATION_DENIED_NOTICE));
                        caps.render.render();
                    }
                }

                Event::PositionResolved {
                    generation,
                    position,
                } => {
                    if !model.is_live(generation) {
                        debug!("discarding position result for a closed screen");
                        return;
                    }
                    if model.location != LocationState::Locating {
                        return;
                    }

                    match position {
                        Ok((latitude, longitude)) => {
                            match Coordinate::new(latitude, longitude) {
                                Ok(coordinate) => {
                                    model.location = LocationState::Available(coordinate);
                                    caps.render.render();
                                }
                                Err(e) => {
                                    warn!(
                                        latitude,
                                        longitude,
                                        error = %e,
                                        "shell delivered an invalid coordinate"
                                    );
                                }
                            }
                        }
                        Err(e) => {
                            // One-shot with no retry: the locating
                            // placeholder simply stays up.
                            warn!(error = %e, "current position request failed");
                        }
                    }
                }

                Event::FeedUpdate { generation, result } => {
                    if !model.is_live(generation) {
                        debug!("discarding feed update for a closed screen");
                        return;
                    }

                    match *result {
                        Ok(FeedSnapshot::Records(records)) => {
                            model.rooms = rooms_from_snapshot(records);
                            debug!(count = model.rooms.len(), "applied room snapshot");
                            caps.render.render();
                        }
                        Ok(FeedSnapshot::Empty) => {
                            // The store reports no data at the path; the last
                            // delivered list stays visible.
                            debug!("empty snapshot, keeping current list");
                        }
                        Err(e) => {
                            warn!(error = %e, "room feed error, keeping last state");
                        }
                    }
                }

                Event::RoomSelected { room_id } => {
                    caps.navigator.navigate(NavigationIntent::RoomDetail {
                        room_id,
                        user_id: model.session.clone(),
                    });
                }

                Event::HistoryRequested => {
                    caps.navigator.navigate(NavigationIntent::HistoryBooking {
                        user_id: model.session.clone(),
                    });
                }

                Event::LogoutRequested => {
                    model.logout_prompt = true;
                    caps.render.render();
                }

                Event::LogoutConfirmed => {
                    // Only honored while the prompt is armed, so a duplicate
                    // confirmation cannot emit a second intent.
                    if !model.logout_prompt {
                        return;
                    }
                    model.logout_prompt = false;
                    model.session = None;
                    info!("session cleared");

                    caps.navigator.navigate(NavigationIntent::Login);
                    caps.render.render();
                }

                Event::LogoutCancelled => {
                    if model.logout_prompt {
                        model.logout_prompt = false;
                        caps.render.render();
                    }
                }

                Event::NoticeDismissed => {
                    if model.notice.take().is_some() {
                        caps.render.render();
                    }
                }
            }
        }

        fn view(&self, model: &Model) -> ViewModel {
            let map = match model.location {
                LocationState::Available(coordinate) => MapView::Positioned {
                    region: MapRegion::centered_on(coordinate),
                    marker: MapMarker::user_position(coordinate),
                },
                LocationState::Locating | LocationState::Denied => MapView::Locating,
            };

            ViewModel {
                map,
                rooms: model.rooms.iter().map(RoomCard::from).collect(),
                logout_prompt: model.logout_prompt.then(LogoutPrompt::default),
                notice: model.notice.clone(),
            }
        }
    }
}
