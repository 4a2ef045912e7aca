//! Navigation engine.
//!
//! [`Navigator`] owns the shared collaborators and starts sessions. Each
//! session runs as one Tokio task that consumes location ticks and emits
//! [`NavigationUpdate`]s through a [`NavigationHandle`].
//!
//! # Architecture
//!
//! ```text
//!  LocationSource ──┐
//!                   ├──► select ──► snap ──► observe ──► [reroute] ──► build_update ──► updates
//!  push_fix() ──────┘        ▲
//!                            └── CancellationToken (stop)
//! ```
//!
//! Ticks from the source and from [`NavigationHandle::push_fix`] are
//! serialized through the same task, so session state is never touched
//! concurrently. The only state shared between sessions is the map-matching
//! cache inside the [`MapMatcher`].
//!
//! # Example
//!
//! ```ignore
//! let navigator = Navigator::new(routing, matcher, NavigationConfig::default());
//! let mut handle = navigator.start_navigation(request, &source).await?;
//!
//! while let Some(update) = handle.recv().await {
//!     dispatch_announcements(&update, &voice);
//! }
//! ```

use std::sync::Arc;

use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::config::NavigationConfig;
use super::reroute::RerouteCoordinator;
use super::session::NavigationSession;
use super::state::{SessionState, TrackingStatus};
use super::update::NavigationUpdate;
use super::NavigationError;
use crate::location::{LocationFix, LocationResult, LocationSource};
use crate::matching::{MapMatcher, MatchedLocation};
use crate::provider::{RouteRequest, RoutingProvider};
use crate::route::Route;

/// Buffered updates before the session waits for the consumer.
const UPDATE_BUFFER: usize = 32;

/// Buffered manual fixes.
const MANUAL_FIX_BUFFER: usize = 16;

/// Starts navigation sessions.
pub struct Navigator {
    routing: Arc<dyn RoutingProvider>,
    matcher: Arc<MapMatcher>,
    config: NavigationConfig,
}

impl Navigator {
    pub fn new(
        routing: Arc<dyn RoutingProvider>,
        matcher: Arc<MapMatcher>,
        config: NavigationConfig,
    ) -> Self {
        Self {
            routing,
            matcher,
            config,
        }
    }

    pub fn matcher(&self) -> &Arc<MapMatcher> {
        &self.matcher
    }

    pub fn config(&self) -> &NavigationConfig {
        &self.config
    }

    /// Fetch the initial route and start a session consuming `source`.
    pub async fn start_navigation(
        &self,
        request: RouteRequest,
        source: &dyn LocationSource,
    ) -> Result<NavigationHandle, NavigationError> {
        let route = self.routing.get_route(&request).await?;
        Ok(self.start_with_route(request, route, source))
    }

    /// Start a session on an already planned route.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start_with_route(
        &self,
        request: RouteRequest,
        route: Route,
        source: &dyn LocationSource,
    ) -> NavigationHandle {
        let session = NavigationSession::new(&request, route, self.config.clone());
        let session_id = session.id();

        info!(
            session_id = %session_id,
            origin = %request.origin,
            destination = %request.destination,
            waypoints = request.waypoints.len(),
            steps = session.route().step_count(),
            distance_m = session.route().distance_m(),
            "Navigation started"
        );

        let (updates_tx, updates_rx) = mpsc::channel(UPDATE_BUFFER);
        let (manual_tx, manual_rx) = mpsc::channel(MANUAL_FIX_BUFFER);
        let (state_tx, state_rx) = watch::channel(SessionState::Active);
        let (tracking_tx, tracking_rx) = watch::channel(TrackingStatus::Live);
        let state_tx = Arc::new(state_tx);
        let cancel = CancellationToken::new();

        let task = SessionTask {
            session,
            matcher: Arc::clone(&self.matcher),
            coordinator: RerouteCoordinator::new(Arc::clone(&self.routing)),
            fixes: source.fixes(),
            manual: manual_rx,
            updates: updates_tx,
            state: Arc::clone(&state_tx),
            tracking: tracking_tx,
            cancel: cancel.clone(),
        };
        let join = tokio::spawn(task.run());

        NavigationHandle {
            session_id,
            updates: updates_rx,
            manual: manual_tx,
            state: state_rx,
            tracking: tracking_rx,
            stopper: SessionStopper {
                session_id,
                cancel,
                state: state_tx,
            },
            task: join,
        }
    }
}

/// Stops a session. Cheap to clone; stopping is idempotent.
#[derive(Clone)]
pub struct SessionStopper {
    session_id: Uuid,
    cancel: CancellationToken,
    state: Arc<watch::Sender<SessionState>>,
}

impl SessionStopper {
    /// Cancel the session task and any in-flight provider call, and move the
    /// session to `Idle`. Calling it again does nothing.
    pub fn stop(&self) {
        if self.cancel.is_cancelled() {
            return;
        }
        self.cancel.cancel();
        self.state.send_replace(SessionState::Idle);
        info!(session_id = %self.session_id, "Navigation stopped");
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

/// Caller's handle on a running session.
pub struct NavigationHandle {
    session_id: Uuid,
    updates: mpsc::Receiver<NavigationUpdate>,
    manual: mpsc::Sender<LocationFix>,
    state: watch::Receiver<SessionState>,
    tracking: watch::Receiver<TrackingStatus>,
    stopper: SessionStopper,
    task: JoinHandle<()>,
}

impl NavigationHandle {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Next update, or `None` once the session completed or was stopped.
    pub async fn recv(&mut self) -> Option<NavigationUpdate> {
        next_update(&mut self.updates, &self.stopper).await
    }

    /// Consume the handle as a stream of updates.
    ///
    /// Take a [`stop_handle`](Self::stop_handle) first if the stream may
    /// need to be stopped early.
    pub fn into_stream(self) -> BoxStream<'static, NavigationUpdate> {
        let NavigationHandle {
            updates, stopper, ..
        } = self;
        stream::unfold((updates, stopper), |(mut updates, stopper)| async move {
            let update = next_update(&mut updates, &stopper).await?;
            Some((update, (updates, stopper)))
        })
        .boxed()
    }

    /// Stop navigation. Idempotent.
    pub fn stop(&self) {
        self.stopper.stop();
    }

    pub fn stop_handle(&self) -> SessionStopper {
        self.stopper.clone()
    }

    pub fn state(&self) -> SessionState {
        *self.state.borrow()
    }

    pub fn state_watch(&self) -> watch::Receiver<SessionState> {
        self.state.clone()
    }

    pub fn tracking(&self) -> TrackingStatus {
        self.tracking.borrow().clone()
    }

    pub fn tracking_watch(&self) -> watch::Receiver<TrackingStatus> {
        self.tracking.clone()
    }

    /// Feed a fix by hand, e.g. when the live source is degraded.
    pub async fn push_fix(&self, fix: LocationFix) -> Result<(), NavigationError> {
        if self.stopper.is_stopped() {
            return Err(NavigationError::SessionClosed);
        }
        self.manual
            .send(fix)
            .await
            .map_err(|_| NavigationError::SessionClosed)
    }

    /// Whether the session task has exited.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

async fn next_update(
    updates: &mut mpsc::Receiver<NavigationUpdate>,
    stopper: &SessionStopper,
) -> Option<NavigationUpdate> {
    if stopper.is_stopped() {
        return None;
    }
    tokio::select! {
        biased;
        _ = stopper.cancel.cancelled() => None,
        update = updates.recv() => update,
    }
}

/// The per-session task.
struct SessionTask {
    session: NavigationSession,
    matcher: Arc<MapMatcher>,
    coordinator: RerouteCoordinator,
    fixes: BoxStream<'static, LocationResult>,
    manual: mpsc::Receiver<LocationFix>,
    updates: mpsc::Sender<NavigationUpdate>,
    state: Arc<watch::Sender<SessionState>>,
    tracking: watch::Sender<TrackingStatus>,
    cancel: CancellationToken,
}

impl SessionTask {
    async fn run(mut self) {
        let session_id = self.session.id();
        let mut source_done = false;

        loop {
            let fix = tokio::select! {
                biased;

                _ = self.cancel.cancelled() => break,

                _ = self.updates.closed() => {
                    debug!(session_id = %session_id, "Update receiver dropped");
                    break;
                }

                Some(fix) = self.manual.recv() => fix,

                item = self.fixes.next(), if !source_done => match item {
                    Some(Ok(fix)) => {
                        self.set_tracking(TrackingStatus::Live);
                        fix
                    }
                    Some(Err(e)) => {
                        warn!(session_id = %session_id, error = %e, "Location source degraded");
                        self.set_tracking(TrackingStatus::Degraded(e.to_string()));
                        continue;
                    }
                    None => {
                        info!(session_id = %session_id, "Location source ended");
                        source_done = true;
                        self.set_tracking(TrackingStatus::SourceEnded);
                        continue;
                    }
                },
            };

            if !self.process(fix).await {
                break;
            }
        }

        debug!(
            session_id = %session_id,
            reroutes = self.coordinator.stats().successes,
            "Session task finished"
        );
    }

    /// Handle one tick. Returns `false` when the session is over.
    async fn process(&mut self, fix: LocationFix) -> bool {
        let matched = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            result = self.matcher.snap_one(fix) => result,
        };
        let matched = matched.unwrap_or_else(|e| {
            debug!(
                session_id = %self.session.id(),
                error = %e,
                "Map matching failed, using raw position"
            );
            MatchedLocation::unmatched(fix)
        });

        let observation = self.session.observe(&matched);

        let mut rerouted = false;
        if observation.reroute_due {
            self.set_state(SessionState::Rerouting);
            let request = self.session.reroute_request(matched.snapped);
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return false,
                result = self.coordinator.reroute(&request) => result,
            };
            match result {
                Ok(route) => {
                    self.session.apply_reroute(route);
                    rerouted = true;
                }
                Err(e) => self.session.reroute_failed(&e),
            }
            self.set_state(SessionState::Active);
        }

        let update = self.session.build_update(&matched, observation, rerouted);
        let completed = update.state == SessionState::Completed;
        if completed {
            self.set_state(SessionState::Completed);
        }

        if self.cancel.is_cancelled() {
            return false;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return false,
            sent = self.updates.send(update) => {
                if sent.is_err() {
                    return false;
                }
            }
        }

        !completed
    }

    /// Publish a state change unless the session was stopped.
    fn set_state(&self, next: SessionState) {
        let cancel = &self.cancel;
        self.state.send_if_modified(|current| {
            if cancel.is_cancelled() || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    fn set_tracking(&self, status: TrackingStatus) {
        self.tracking.send_if_modified(|current| {
            if *current == status {
                return false;
            }
            *current = status;
            true
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::{destination, GeoPoint};
    use crate::location::{ChannelLocationSource, LocationError, ReplayLocationSource};
    use crate::matching::MatchingConfig;
    use crate::provider::{
        PassthroughRoadsProvider, ProviderError, StaticRoutingProvider,
    };
    use crate::route::Step;
    use futures::future::BoxFuture;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const A: GeoPoint = GeoPoint::new(45.0, 7.0);

    fn route() -> Route {
        let b = destination(A, 0.0, 200.0);
        let c = destination(b, 90.0, 200.0);
        Route::new(
            vec![Step::new("Head north", A, b), Step::new("Turn right", b, c)],
            vec![],
        )
        .unwrap()
    }

    fn matcher() -> Arc<MapMatcher> {
        Arc::new(MapMatcher::new(
            Arc::new(PassthroughRoadsProvider::new()),
            MatchingConfig::default(),
        ))
    }

    fn navigator(routing: Arc<dyn RoutingProvider>) -> Navigator {
        Navigator::new(routing, matcher(), NavigationConfig::default())
    }

    fn request() -> RouteRequest {
        RouteRequest::new(A, route().destination())
    }

    fn fix(p: GeoPoint) -> LocationFix {
        LocationFix::at(p)
    }

    /// Serves the route once, then fails.
    struct OnceRouting {
        calls: AtomicUsize,
    }

    impl RoutingProvider for OnceRouting {
        fn get_route<'a>(
            &'a self,
            _request: &'a RouteRequest,
        ) -> BoxFuture<'a, Result<Route, ProviderError>> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            Box::pin(async move {
                if call == 0 {
                    Ok(route())
                } else {
                    Err(ProviderError::Timeout)
                }
            })
        }

        fn name(&self) -> &str {
            "once"
        }
    }

    #[tokio::test]
    async fn test_replay_to_arrival() {
        let b = destination(A, 0.0, 200.0);
        let c = destination(b, 90.0, 200.0);
        let source = ReplayLocationSource::new(vec![
            fix(A),
            fix(destination(A, 0.0, 100.0)),
            fix(b),
            fix(destination(b, 90.0, 100.0)),
            fix(c),
        ]);

        let nav = navigator(Arc::new(StaticRoutingProvider::new(route())));
        let handle = nav.start_navigation(request(), &source).await.unwrap();
        let stopper = handle.stop_handle();
        let updates: Vec<_> = handle.into_stream().collect().await;

        assert_eq!(updates.len(), 5);
        assert!(updates.iter().all(|u| !u.off_route));
        assert_eq!(updates[2].step_index, 1);
        let last = updates.last().unwrap();
        assert_eq!(last.state, SessionState::Completed);
        assert!(last.voice_text().unwrap().contains("arrived"));
        assert!(!stopper.is_stopped());
    }

    #[tokio::test]
    async fn test_initial_route_failure() {
        struct NoRoute;
        impl RoutingProvider for NoRoute {
            fn get_route<'a>(
                &'a self,
                _request: &'a RouteRequest,
            ) -> BoxFuture<'a, Result<Route, ProviderError>> {
                Box::pin(async { Err(ProviderError::NoResults) })
            }
            fn name(&self) -> &str {
                "none"
            }
        }

        let nav = navigator(Arc::new(NoRoute));
        let source = ReplayLocationSource::new(vec![]);
        assert!(matches!(
            nav.start_navigation(request(), &source).await,
            Err(NavigationError::RouteUnavailable(ProviderError::NoResults))
        ));
    }

    #[tokio::test]
    async fn test_stop_is_idempotent_and_final() {
        let (source, sender) = ChannelLocationSource::new(8);
        let nav = navigator(Arc::new(StaticRoutingProvider::new(route())));
        let mut handle = nav.start_navigation(request(), &source).await.unwrap();

        sender.send(fix(A)).await;
        assert!(handle.recv().await.is_some());

        handle.stop();
        handle.stop();
        assert_eq!(handle.state(), SessionState::Idle);

        sender.send(fix(destination(A, 0.0, 50.0))).await;
        assert!(handle.recv().await.is_none());
        assert!(matches!(
            handle.push_fix(fix(A)).await,
            Err(NavigationError::SessionClosed)
        ));
    }

    #[tokio::test]
    async fn test_external_stopper() {
        let (source, _sender) = ChannelLocationSource::new(8);
        let nav = navigator(Arc::new(StaticRoutingProvider::new(route())));
        let mut handle = nav.start_navigation(request(), &source).await.unwrap();

        let stopper = handle.stop_handle();
        tokio::spawn(async move { stopper.stop() });

        assert!(handle.recv().await.is_none());
        assert_eq!(handle.state(), SessionState::Idle);
    }

    #[tokio::test]
    async fn test_failed_reroute_keeps_session_alive() {
        let routing = Arc::new(OnceRouting {
            calls: AtomicUsize::new(0),
        });
        let nav = navigator(routing.clone());
        let (source, sender) = ChannelLocationSource::new(8);
        let mut handle = nav.start_navigation(request(), &source).await.unwrap();

        let off = destination(destination(A, 0.0, 100.0), 270.0, 150.0);
        let mut last = None;
        for _ in 0..4 {
            sender.send(fix(off)).await;
            last = handle.recv().await;
        }

        let last = last.unwrap();
        assert!(last.off_route);
        assert!(!last.rerouted);
        assert_eq!(last.deviation_count, 4);
        // Initial route plus one attempt on each of ticks 3 and 4
        assert_eq!(routing.calls.load(Ordering::SeqCst), 3);
        assert_eq!(handle.state(), SessionState::Active);
    }

    #[tokio::test]
    async fn test_source_error_degrades_without_ending() {
        let (source, sender) = ChannelLocationSource::new(8);
        let nav = navigator(Arc::new(StaticRoutingProvider::new(route())));
        let mut handle = nav.start_navigation(request(), &source).await.unwrap();
        let mut tracking = handle.tracking_watch();

        sender
            .fail(LocationError::SensorFailure("gps off".into()))
            .await;
        while tracking.borrow().is_live() {
            tracking.changed().await.unwrap();
        }
        assert!(matches!(handle.tracking(), TrackingStatus::Degraded(_)));

        sender.send(fix(A)).await;
        assert!(handle.recv().await.is_some());
        assert!(handle.tracking().is_live());
    }

    #[tokio::test]
    async fn test_manual_fixes_after_source_ends() {
        let (source, sender) = ChannelLocationSource::new(8);
        let nav = navigator(Arc::new(StaticRoutingProvider::new(route())));
        let mut handle = nav.start_navigation(request(), &source).await.unwrap();
        let mut tracking = handle.tracking_watch();

        drop(sender);
        while *tracking.borrow() != TrackingStatus::SourceEnded {
            tracking.changed().await.unwrap();
        }
        assert_eq!(handle.state(), SessionState::Active);

        handle.push_fix(fix(A)).await.unwrap();
        let update = handle.recv().await.unwrap();
        assert_eq!(update.sequence, 1);
        assert!(!handle.is_finished());
    }

    #[tokio::test]
    async fn test_concurrent_sessions_share_cache() {
        let nav = navigator(Arc::new(StaticRoutingProvider::new(route())));
        let source = ReplayLocationSource::new(vec![fix(A), fix(destination(A, 0.0, 100.0))]);

        let first: Vec<_> = nav
            .start_navigation(request(), &source)
            .await
            .unwrap()
            .into_stream()
            .take(2)
            .collect()
            .await;
        let second: Vec<_> = nav
            .start_navigation(request(), &source)
            .await
            .unwrap()
            .into_stream()
            .take(2)
            .collect()
            .await;

        assert_ne!(first[0].session_id, second[0].session_id);
        assert_eq!(nav.matcher().cache_stats().hits, 2);
    }
}
