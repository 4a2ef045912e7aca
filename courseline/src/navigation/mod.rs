//! Turn-by-turn navigation.
//!
//! This module turns a planned [`Route`](crate::route::Route) and a stream of
//! location fixes into [`NavigationUpdate`]s: step progress, remaining
//! distance and time, instruction text, speed warnings, spoken
//! announcements and automatic rerouting.
//!
//! # Components
//!
//! - [`Navigator`] starts sessions and hands back a [`NavigationHandle`]
//! - [`NavigationSession`] is the synchronous per-trip state machine
//! - [`RerouteCoordinator`] fetches replacement routes
//! - [`AnnouncementGate`] limits how often an instruction is spoken
//! - [`VoiceChannel`] is implemented by the caller to speak announcements
//!
//! # Session lifecycle
//!
//! ```text
//!  Idle ──start──► Active ──off-route×3──► Rerouting ──┐
//!                    ▲                                 │
//!                    └──────── success / failure ──────┘
//!                    │
//!                    └──arrival──► Completed
//!
//!  any ──stop──► Idle
//! ```

mod config;
mod constants;
mod deviation;
mod engine;
mod instruction;
mod reroute;
mod session;
mod state;
mod update;
mod voice;

pub use config::NavigationConfig;
pub use constants::*;
pub use deviation::{distance_from_route, is_off_route, DeviationTracker};
pub use engine::{NavigationHandle, Navigator, SessionStopper};
pub use instruction::{
    classify_speed, instruction_text, AnnouncementGate, SpeedSeverity, SpeedWarning,
};
pub use reroute::{RerouteCoordinator, RerouteStats};
pub use session::{NavigationSession, Observation, DESTINATION_ARRIVAL_TEXT};
pub use state::{SessionState, TrackingStatus};
pub use update::NavigationUpdate;
pub use voice::{dispatch_announcements, Announcement, AnnouncementPriority, VoiceChannel};

use thiserror::Error;

use crate::provider::ProviderError;

/// Errors from starting or driving a navigation session.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum NavigationError {
    /// The initial route could not be fetched.
    #[error("no route available: {0}")]
    RouteUnavailable(#[from] ProviderError),

    /// The session was stopped or has finished.
    #[error("navigation session has ended")]
    SessionClosed,
}
