//! Navigation session state machine.
//!
//! [`NavigationSession`] holds all mutable progress of one trip and is
//! driven synchronously, one matched location at a time. It performs no I/O:
//! the engine does the snapping and the reroute request, and feeds the
//! results in. A tick is two calls:
//!
//! 1. [`observe`](NavigationSession::observe) advances the step and
//!    waypoint, updates distance traveled and the deviation counter, and
//!    reports whether a reroute is due.
//! 2. [`build_update`](NavigationSession::build_update) computes remaining
//!    distance and time, instruction text, speed warning and announcements,
//!    and detects arrival at the destination.
//!
//! Between the two the engine may swap in a new route with
//! [`apply_reroute`](NavigationSession::apply_reroute).

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::NavigationConfig;
use super::deviation::{is_off_route, DeviationTracker};
use super::instruction::{classify_speed, instruction_text, AnnouncementGate, SpeedSeverity};
use super::state::SessionState;
use super::update::NavigationUpdate;
use super::voice::Announcement;
use crate::geo::{distance, GeoPoint};
use crate::matching::MatchedLocation;
use crate::provider::{ProviderError, RouteRequest};
use crate::route::{Route, VehicleMode, Waypoint};

/// Spoken on arrival at the final destination.
pub const DESTINATION_ARRIVAL_TEXT: &str = "You have arrived at your destination";

/// Result of [`NavigationSession::observe`].
#[derive(Debug, Clone, Default)]
pub struct Observation {
    /// The position is off the current route.
    pub off_route: bool,
    /// Enough consecutive deviations to request a new route.
    pub reroute_due: bool,
    /// Step index advanced on this tick.
    pub step_advanced: bool,
    /// Waypoint arrivals on this tick.
    pub announcements: Vec<Announcement>,
}

/// Progress of one trip.
pub struct NavigationSession {
    id: Uuid,
    origin: GeoPoint,
    destination: GeoPoint,
    waypoints: Vec<Waypoint>,
    vehicle_mode: VehicleMode,
    route: Route,
    geometry: Vec<GeoPoint>,
    step_index: usize,
    waypoint_index: usize,
    distance_traveled_m: f64,
    last_position: Option<GeoPoint>,
    deviation: DeviationTracker,
    gate: AnnouncementGate,
    last_speed_severity: Option<SpeedSeverity>,
    sequence: u64,
    state: SessionState,
    config: NavigationConfig,
}

impl NavigationSession {
    /// Start a session on `route` for the trip described by `request`.
    pub fn new(request: &RouteRequest, route: Route, config: NavigationConfig) -> Self {
        let geometry = route.geometry();
        Self {
            id: Uuid::new_v4(),
            origin: request.origin,
            destination: request.destination,
            waypoints: request.waypoints.clone(),
            vehicle_mode: request.vehicle_mode,
            route,
            geometry,
            step_index: 0,
            waypoint_index: 0,
            distance_traveled_m: 0.0,
            last_position: None,
            deviation: DeviationTracker::new(config.deviation_strikes),
            gate: AnnouncementGate::from_config(&config),
            last_speed_severity: None,
            sequence: 0,
            state: SessionState::Active,
            config,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn origin(&self) -> GeoPoint {
        self.origin
    }

    pub fn destination(&self) -> GeoPoint {
        self.destination
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn step_index(&self) -> usize {
        self.step_index
    }

    pub fn waypoint_index(&self) -> usize {
        self.waypoint_index
    }

    pub fn deviation_count(&self) -> u32 {
        self.deviation.count()
    }

    pub fn distance_traveled_m(&self) -> f64 {
        self.distance_traveled_m
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Waypoints not yet reached, in order.
    pub fn remaining_waypoints(&self) -> &[Waypoint] {
        &self.waypoints[self.waypoint_index..]
    }

    /// Apply one matched location.
    pub fn observe(&mut self, matched: &MatchedLocation) -> Observation {
        let position = matched.snapped;
        let mut observation = Observation::default();

        if let Some(last) = self.last_position {
            self.distance_traveled_m += distance(last, position);
        }
        self.last_position = Some(position);

        // Step advancement, at most one step per tick
        if self.step_index + 1 < self.route.step_count()
            && distance(position, self.route.steps()[self.step_index].end_location)
                < self.config.arrival_radius_m
        {
            self.step_index += 1;
            observation.step_advanced = true;
            debug!(
                session_id = %self.id,
                step_index = self.step_index,
                "Advanced to next step"
            );
        }

        // Off-route and deviation
        observation.off_route =
            is_off_route(position, &self.geometry, self.config.reroute_threshold_m);
        observation.reroute_due = self.deviation.record(observation.off_route);
        if observation.off_route {
            debug!(
                session_id = %self.id,
                deviation_count = self.deviation.count(),
                "Position off route"
            );
        }

        // Waypoint arrival
        if let Some(waypoint) = self.waypoints.get(self.waypoint_index) {
            if distance(position, waypoint.location) < self.config.arrival_radius_m {
                let text = if waypoint.name.is_empty() {
                    "Arrived at waypoint".to_string()
                } else {
                    format!("Arrived at {}", waypoint.name)
                };
                info!(
                    session_id = %self.id,
                    waypoint_index = self.waypoint_index,
                    waypoint = %waypoint.name,
                    "Waypoint reached"
                );
                observation.announcements.push(Announcement::flush_now(text));
                self.waypoint_index += 1;
            }
        }

        observation
    }

    /// Request for a new route from `current` through the unvisited
    /// waypoints to the unchanged destination.
    pub fn reroute_request(&self, current: GeoPoint) -> RouteRequest {
        RouteRequest::new(current, self.destination)
            .with_waypoints(self.remaining_waypoints().to_vec())
            .with_vehicle_mode(self.vehicle_mode)
    }

    /// Swap in a new route. Step index and deviation counter restart; the
    /// waypoint index is kept.
    pub fn apply_reroute(&mut self, route: Route) {
        info!(
            session_id = %self.id,
            steps = route.step_count(),
            distance_m = route.distance_m(),
            "Route replaced"
        );
        self.geometry = route.geometry();
        self.route = route;
        self.step_index = 0;
        self.deviation.reset();
        self.gate.reset();
    }

    /// Keep the stale route; the counter is left as is so the next
    /// off-route tick tries again.
    pub fn reroute_failed(&mut self, error: &ProviderError) {
        warn!(
            session_id = %self.id,
            deviation_count = self.deviation.count(),
            error = %error,
            "Reroute failed, keeping current route"
        );
    }

    /// Build the update for this tick.
    pub fn build_update(
        &mut self,
        matched: &MatchedLocation,
        observation: Observation,
        rerouted: bool,
    ) -> NavigationUpdate {
        let position = matched.snapped;
        let steps = self.route.steps();
        let step = &steps[self.step_index];
        let next_step = steps.get(self.step_index + 1);
        let later_steps = &steps[self.step_index + 1..];

        let average_speed = self.config.average_speed_mps.max(f64::EPSILON);
        let distance_to_maneuver_m = distance(position, step.end_location);
        let time_to_maneuver_s = distance_to_maneuver_m / average_speed;
        let distance_remaining_m =
            distance_to_maneuver_m + later_steps.iter().map(|s| s.distance_m).sum::<f64>();
        let time_remaining_s =
            time_to_maneuver_s + later_steps.iter().map(|s| s.duration_s).sum::<f64>();

        let off_route = if rerouted {
            is_off_route(position, &self.geometry, self.config.reroute_threshold_m)
        } else {
            observation.off_route
        };

        let mut announcements = observation.announcements;

        let instruction = instruction_text(
            distance_to_maneuver_m,
            step,
            next_step,
            self.config.instruction_lead_distance_m,
        );
        if let Some(text) = &instruction {
            if self.gate.should_announce(self.step_index, distance_to_maneuver_m) {
                announcements.push(Announcement::enqueue(text.clone()));
            }
        }

        let speed_kmh = matched.original.speed_kmh();
        let speed_limit_kmh = matched.speed_limit_kmh.or(step.speed_limit_kmh);
        let speed_warning = speed_limit_kmh.and_then(|limit| {
            classify_speed(speed_kmh, limit, self.config.speed_warning_threshold_kmh)
        });
        let severity = speed_warning.as_ref().map(|w| w.severity);
        if let Some(warning) = &speed_warning {
            if warning.severity == SpeedSeverity::Critical
                && self.last_speed_severity != Some(SpeedSeverity::Critical)
            {
                announcements.push(Announcement::flush_now(warning.message()));
            }
        }
        self.last_speed_severity = severity;

        let arrived = self.step_index + 1 == steps.len()
            && self.waypoint_index == self.waypoints.len()
            && distance(position, self.route.destination()) < self.config.arrival_radius_m;
        if arrived {
            announcements.push(Announcement::flush_now(DESTINATION_ARRIVAL_TEXT));
            self.state = SessionState::Completed;
            info!(
                session_id = %self.id,
                distance_traveled_m = self.distance_traveled_m,
                "Destination reached"
            );
        }

        self.sequence += 1;

        NavigationUpdate {
            session_id: self.id,
            sequence: self.sequence,
            location: matched.original,
            snapped_location: position,
            match_confidence: matched.confidence,
            speed_kmh,
            bearing: matched.bearing,
            step_index: self.step_index,
            current_step: step.clone(),
            next_step: next_step.cloned(),
            distance_to_maneuver_m,
            time_to_maneuver_s,
            distance_remaining_m,
            time_remaining_s,
            distance_traveled_m: self.distance_traveled_m,
            waypoint_index: self.waypoint_index,
            current_waypoint: self.waypoints.get(self.waypoint_index).cloned(),
            off_route,
            deviation_count: self.deviation.count(),
            rerouted,
            speed_limit_kmh,
            speed_warning,
            instruction,
            announcements,
            state: self.state,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::destination;
    use crate::location::LocationFix;
    use crate::navigation::voice::{dispatch_announcements, AnnouncementPriority, VoiceChannel};
    use crate::route::{Step, WaypointKind};
    use parking_lot::Mutex;

    const A: GeoPoint = GeoPoint::new(45.0, 7.0);

    /// A→B north 500m, B→C east 500m.
    fn two_step_route() -> (Route, GeoPoint, GeoPoint) {
        let b = destination(A, 0.0, 500.0);
        let c = destination(b, 90.0, 500.0);
        let route = Route::new(
            vec![
                Step::new("Head north", A, b).with_duration(40.0),
                Step::new("Turn right", b, c).with_duration(40.0),
            ],
            vec![],
        )
        .unwrap();
        (route, b, c)
    }

    fn at(p: GeoPoint) -> MatchedLocation {
        MatchedLocation::unmatched(LocationFix::at(p))
    }

    fn session(route: Route, waypoints: Vec<Waypoint>) -> NavigationSession {
        let request = RouteRequest::new(A, route.destination()).with_waypoints(waypoints);
        NavigationSession::new(&request, route, NavigationConfig::default())
    }

    fn tick(session: &mut NavigationSession, p: GeoPoint) -> NavigationUpdate {
        let matched = at(p);
        let observation = session.observe(&matched);
        session.build_update(&matched, observation, false)
    }

    #[test]
    fn test_step_advances_near_step_end() {
        let (route, b, _) = two_step_route();
        let mut s = session(route, vec![]);

        let update = tick(&mut s, destination(A, 0.0, 470.0));
        assert_eq!(update.step_index, 0);

        let update = tick(&mut s, destination(b, 180.0, 10.0));
        assert_eq!(update.step_index, 1);
        assert!(!update.off_route);
    }

    #[test]
    fn test_short_step_is_not_skipped() {
        // A→B north 500m, a 15m roundabout entry, then north 300m
        let b = destination(A, 0.0, 500.0);
        let entry = destination(b, 90.0, 15.0);
        let c = destination(entry, 0.0, 300.0);
        let route = Route::new(
            vec![
                Step::new("Head north", A, b),
                Step::new("Enter the roundabout", b, entry),
                Step::new("Exit north", entry, c),
            ],
            vec![],
        )
        .unwrap();
        let mut s = session(route, vec![]);

        let update = tick(&mut s, b);
        assert_eq!(update.step_index, 1);
        assert_eq!(update.current_step.instruction, "Enter the roundabout");

        let update = tick(&mut s, entry);
        assert_eq!(update.step_index, 2);
        assert_eq!(update.current_step.instruction, "Exit north");
    }

    #[test]
    fn test_last_step_does_not_advance() {
        let (route, _, c) = two_step_route();
        let mut s = session(route, vec![]);
        tick(&mut s, destination(A, 0.0, 495.0));
        let update = tick(&mut s, c);
        assert_eq!(update.step_index, 1);
    }

    #[test]
    fn test_remaining_distance_and_time() {
        let (route, _, _) = two_step_route();
        let mut s = session(route, vec![]);

        let update = tick(&mut s, destination(A, 0.0, 200.0));
        // 300m to B plus the 500m step after it
        assert!((update.distance_to_maneuver_m - 300.0).abs() < 0.5);
        assert!((update.distance_remaining_m - 800.0).abs() < 0.5);
        assert!((update.time_to_maneuver_s - 20.0).abs() < 0.05);
        assert!((update.time_remaining_s - 60.0).abs() < 0.05);
    }

    #[test]
    fn test_distance_traveled_accumulates() {
        let (route, _, _) = two_step_route();
        let mut s = session(route, vec![]);
        tick(&mut s, A);
        tick(&mut s, destination(A, 0.0, 100.0));
        let update = tick(&mut s, destination(A, 0.0, 250.0));
        assert!((update.distance_traveled_m - 250.0).abs() < 0.1);
    }

    #[test]
    fn test_three_off_route_ticks_request_reroute() {
        let (route, _, _) = two_step_route();
        let mut s = session(route, vec![]);
        let off = destination(destination(A, 0.0, 250.0), 270.0, 100.0);

        assert!(!s.observe(&at(off)).reroute_due);
        assert!(!s.observe(&at(off)).reroute_due);
        let third = s.observe(&at(off));
        assert!(third.off_route);
        assert!(third.reroute_due);
    }

    #[test]
    fn test_apply_reroute_resets_step_and_counter() {
        let (route, b, c) = two_step_route();
        let mut s = session(route, vec![]);
        tick(&mut s, destination(b, 180.0, 5.0));
        assert_eq!(s.step_index(), 1);

        let off = destination(b, 0.0, 300.0);
        for _ in 0..3 {
            s.observe(&at(off));
        }
        assert_eq!(s.deviation_count(), 3);

        let new_route = Route::new(vec![Step::new("Head south-east", off, c)], vec![]).unwrap();
        s.apply_reroute(new_route);
        assert_eq!(s.step_index(), 0);
        assert_eq!(s.deviation_count(), 0);

        let matched = at(off);
        let observation = Observation {
            off_route: true,
            ..Default::default()
        };
        let update = s.build_update(&matched, observation, true);
        assert!(update.rerouted);
        assert!(!update.off_route);
    }

    #[test]
    fn test_reroute_request_keeps_unvisited_waypoints() {
        let (route, b, _) = two_step_route();
        let waypoints = vec![
            Waypoint::new(b, "Pickup", WaypointKind::Pickup),
            Waypoint::new(destination(b, 90.0, 250.0), "Drop", WaypointKind::Drop),
        ];
        let mut s = session(route.clone(), waypoints);
        tick(&mut s, b);
        assert_eq!(s.waypoint_index(), 1);

        let here = destination(b, 0.0, 100.0);
        let request = s.reroute_request(here);
        assert_eq!(request.origin, here);
        assert_eq!(request.destination, route.destination());
        assert_eq!(request.waypoints.len(), 1);
        assert_eq!(request.waypoints[0].name, "Drop");
    }

    #[test]
    fn test_waypoint_arrival_announces_flush_now() {
        let (route, b, _) = two_step_route();
        let mut s = session(route, vec![Waypoint::new(b, "Depot", WaypointKind::Stop)]);

        let update = tick(&mut s, destination(b, 180.0, 5.0));
        assert_eq!(update.waypoint_index, 1);
        assert!(update.current_waypoint.is_none());
        assert!(update
            .announcements
            .contains(&Announcement::flush_now("Arrived at Depot")));
    }

    #[test]
    fn test_instruction_announced_once_per_band() {
        let (route, _, _) = two_step_route();
        let mut s = session(route, vec![]);

        let first = tick(&mut s, destination(A, 0.0, 300.0));
        assert_eq!(first.instruction.as_deref(), Some("In 200 meters, Head north"));
        assert_eq!(first.announcements.len(), 1);
        assert_eq!(first.announcements[0].priority, AnnouncementPriority::Enqueue);

        let second = tick(&mut s, destination(A, 0.0, 305.0));
        assert!(second.instruction.is_some());
        assert!(second.announcements.is_empty());
    }

    #[test]
    fn test_critical_speed_announced_once() {
        let (route, _, _) = two_step_route();
        let mut steps = route.steps().to_vec();
        steps[0] = steps[0].clone().with_speed_limit(60.0);
        let route = Route::new(steps, vec![]).unwrap();
        let mut s = session(route, vec![]);

        let fast = |d: f64| {
            MatchedLocation::unmatched(
                LocationFix::at(destination(A, 0.0, d)).with_speed(85.0 / 3.6),
            )
        };

        let m = fast(100.0);
        let o = s.observe(&m);
        let first = s.build_update(&m, o, false);
        assert_eq!(
            first.speed_warning.as_ref().unwrap().severity,
            SpeedSeverity::Critical
        );
        assert!(first.announcements.iter().any(|a| a.text.starts_with("Slow down")
            && a.priority == AnnouncementPriority::FlushNow));

        let m = fast(110.0);
        let o = s.observe(&m);
        let second = s.build_update(&m, o, false);
        assert!(second.speed_warning.is_some());
        assert!(!second.announcements.iter().any(|a| a.text.starts_with("Slow down")));
    }

    #[test]
    fn test_arrival_completes_session() {
        let (route, b, c) = two_step_route();
        let mut s = session(route, vec![]);
        tick(&mut s, destination(b, 180.0, 5.0));

        let update = tick(&mut s, destination(c, 270.0, 5.0));
        assert_eq!(update.state, SessionState::Completed);
        assert!(update.is_arrival());
        assert_eq!(
            update.announcements.last().unwrap().text,
            DESTINATION_ARRIVAL_TEXT
        );
    }

    #[test]
    fn test_no_arrival_with_pending_waypoint() {
        let (route, b, c) = two_step_route();
        let far_waypoint = Waypoint::new(destination(b, 0.0, 900.0), "Skipped", WaypointKind::Stop);
        let mut s = session(route, vec![far_waypoint]);
        tick(&mut s, destination(b, 180.0, 5.0));

        let update = tick(&mut s, c);
        assert_eq!(update.state, SessionState::Active);
    }

    #[test]
    fn test_sequence_increases() {
        let (route, _, _) = two_step_route();
        let mut s = session(route, vec![]);
        let first = tick(&mut s, A);
        let second = tick(&mut s, A);
        assert_eq!(first.sequence + 1, second.sequence);
        assert_eq!(first.session_id, second.session_id);
    }

    #[derive(Default)]
    struct RecordingVoice {
        spoken: Mutex<Vec<(String, AnnouncementPriority)>>,
    }

    impl VoiceChannel for RecordingVoice {
        fn announce(&self, text: &str, priority: AnnouncementPriority) {
            self.spoken.lock().push((text.to_string(), priority));
        }
    }

    #[test]
    fn test_dispatch_announcements_in_order() {
        let (route, b, _) = two_step_route();
        let mut s = session(route, vec![Waypoint::new(b, "Depot", WaypointKind::Stop)]);
        let update = tick(&mut s, destination(b, 180.0, 5.0));

        let voice = RecordingVoice::default();
        dispatch_announcements(&update, &voice);

        let spoken = voice.spoken.lock();
        assert_eq!(spoken.len(), update.announcements.len());
        assert_eq!(spoken[0].0, "Arrived at Depot");
        assert_eq!(spoken[0].1, AnnouncementPriority::FlushNow);
    }
}
