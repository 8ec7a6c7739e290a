//! The coin flip scene: turn, connection and flip-in-progress state.
//!
//! Every input reaches the scene as a [`SceneEvent`] and is applied in the
//! order it was queued. Flip requests that arrive at the wrong moment are
//! dropped without effect.

use crate::animation::{
    AnimationEvent, AnimationId, AnimationProgress, AnimationSpec, AnimationTarget, Animator,
};
use crate::config::AnimationTiming;
use crate::connection::{ConnectionEvent, Outbox};
use crate::error::CoinFlipError;
use crate::identity::Identity;
use crate::protocol::ClientMessage;
use crate::types::{ConnectionState, FlipOutcome, FlipRecord, PlayerId, TurnState};
use chrono::Utc;
use rand::rngs::StdRng;
use rand::SeedableRng;

pub const STATUS_CONNECTING: &str = "Connecting...";
pub const STATUS_MY_TURN: &str = "Your turn!";
pub const STATUS_OPPONENT_TURN: &str = "Opponent's turn...";
pub const STATUS_OFFLINE: &str = "Offline test mode: your turn!";
pub const STATUS_FLIPPING: &str = "Flipping...";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SceneEvent {
    Connection(ConnectionEvent),
    Animation(AnimationEvent),
    FlipPressed,
    Shutdown,
}

impl From<ConnectionEvent> for SceneEvent {
    fn from(event: ConnectionEvent) -> Self {
        SceneEvent::Connection(event)
    }
}

impl From<AnimationEvent> for SceneEvent {
    fn from(event: AnimationEvent) -> Self {
        SceneEvent::Animation(event)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenePhase {
    AwaitingConnection,
    OnlineMyTurn,
    OnlineOpponentTurn,
    OfflineReady,
    Flipping,
}

/// What the player should currently see.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct View {
    pub status: String,
    pub coin_face: Option<FlipOutcome>,
    pub coin_spinning: bool,
    pub flip_enabled: bool,
    pub button_label: &'static str,
    pub retry_visible: bool,
    pub completed_flips: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlightStage {
    Spinning,
    Revealing,
}

#[derive(Debug)]
struct CoinFlight {
    outcome: FlipOutcome,
    stage: FlightStage,
    animation: AnimationId,
}

pub struct GameScene<A> {
    identity: Identity,
    connection: ConnectionState,
    turn: TurnState,
    awaiting_result: bool,
    flight: Option<CoinFlight>,
    coin_face: Option<FlipOutcome>,
    status: String,
    outbox: Option<Outbox>,
    animator: A,
    timing: AnimationTiming,
    rng: StdRng,
    history: Vec<FlipRecord>,
    completed_flips: usize,
}

impl<A: Animator> GameScene<A> {
    /// Scene waiting for the coordinator; flips go out through `outbox`
    pub fn connecting(
        identity: Identity,
        outbox: Outbox,
        animator: A,
        timing: AnimationTiming,
    ) -> Self {
        Self::build(
            identity,
            ConnectionState::Connecting,
            TurnState::OpponentTurn,
            Some(outbox),
            animator,
            timing,
            STATUS_CONNECTING,
        )
    }

    /// Local-only scene that never attempts a connection
    pub fn offline(identity: Identity, animator: A, timing: AnimationTiming) -> Self {
        Self::build(
            identity,
            ConnectionState::Offline,
            TurnState::MyTurn,
            None,
            animator,
            timing,
            STATUS_OFFLINE,
        )
    }

    fn build(
        identity: Identity,
        connection: ConnectionState,
        turn: TurnState,
        outbox: Option<Outbox>,
        animator: A,
        timing: AnimationTiming,
        status: &str,
    ) -> Self {
        Self {
            identity,
            connection,
            turn,
            awaiting_result: false,
            flight: None,
            coin_face: None,
            status: status.to_string(),
            outbox,
            animator,
            timing,
            rng: StdRng::from_os_rng(),
            history: Vec::new(),
            completed_flips: 0,
        }
    }

    /// Replace the outcome generator, for reproducible local flips
    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn connection(&self) -> ConnectionState {
        self.connection
    }

    pub fn turn(&self) -> TurnState {
        self.turn
    }

    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn history(&self) -> &[FlipRecord] {
        &self.history
    }

    pub fn animator(&self) -> &A {
        &self.animator
    }

    pub fn is_animating(&self) -> bool {
        self.flight.is_some()
    }

    pub fn phase(&self) -> ScenePhase {
        if self.connection == ConnectionState::Connecting {
            return ScenePhase::AwaitingConnection;
        }

        if self.awaiting_result || self.flight.is_some() {
            return ScenePhase::Flipping;
        }

        match (self.connection, self.turn) {
            (ConnectionState::Offline, _) => ScenePhase::OfflineReady,
            (_, TurnState::MyTurn) => ScenePhase::OnlineMyTurn,
            (_, TurnState::OpponentTurn) => ScenePhase::OnlineOpponentTurn,
        }
    }

    pub fn can_flip(&self) -> bool {
        self.connection != ConnectionState::Connecting
            && self.turn == TurnState::MyTurn
            && !self.awaiting_result
            && self.flight.is_none()
    }

    pub fn view(&self) -> View {
        let flip_enabled = self.can_flip();
        let retry_visible = flip_enabled && self.completed_flips > 0;

        View {
            status: self.status.clone(),
            coin_face: self.coin_face,
            coin_spinning: matches!(
                self.flight,
                Some(CoinFlight {
                    stage: FlightStage::Spinning,
                    ..
                })
            ),
            flip_enabled,
            button_label: if retry_visible { "Flip Again" } else { "Flip Coin" },
            retry_visible,
            completed_flips: self.completed_flips,
        }
    }

    pub fn handle(&mut self, event: SceneEvent) {
        match event {
            SceneEvent::Connection(ConnectionEvent::Ready { your_turn }) => self.on_ready(your_turn),
            SceneEvent::Connection(ConnectionEvent::FlipResult { flipper, result }) => {
                self.on_flip_result(flipper, result)
            }
            SceneEvent::Connection(ConnectionEvent::Offline) => self.on_offline(),
            SceneEvent::Animation(event) => self.on_animation(event),
            SceneEvent::FlipPressed => {
                self.flip();
            }
            SceneEvent::Shutdown => {
                tracing::debug!("Scene shutdown requested");
            }
        }
    }

    /// Try to flip. Returns whether the flip was accepted.
    pub fn flip(&mut self) -> bool {
        if !self.can_flip() {
            tracing::debug!("Ignoring flip in phase {:?}", self.phase());
            return false;
        }

        let outcome = FlipOutcome::random(&mut self.rng);

        if self.connection == ConnectionState::Offline {
            tracing::info!("Local flip: {}", outcome);
            let me = self.identity.player_id.clone();
            self.record(me, outcome);
            self.status = format!("You flipped: {}", outcome);
            self.start_flight(outcome);
            return true;
        }

        let message = ClientMessage::Flip {
            room: self.identity.room.clone(),
            player_id: self.identity.player_id.clone(),
            result: outcome,
        };

        let sent = match &self.outbox {
            Some(outbox) => outbox.send(message),
            None => Err(CoinFlipError::ChannelClosed),
        };

        if let Err(e) = sent {
            tracing::warn!("Could not send flip, switching to offline play: {}", e);
            self.on_offline();
            return false;
        }

        tracing::info!("Sent flip {} to room {}", outcome, self.identity.room);
        self.awaiting_result = true;
        self.status = STATUS_FLIPPING.to_string();
        true
    }

    fn on_ready(&mut self, your_turn: bool) {
        if self.connection == ConnectionState::Offline {
            tracing::debug!("Ignoring start after going offline");
            return;
        }

        self.connection = ConnectionState::Online;
        self.awaiting_result = false;
        self.turn = if your_turn {
            TurnState::MyTurn
        } else {
            TurnState::OpponentTurn
        };
        self.status = if your_turn {
            STATUS_MY_TURN
        } else {
            STATUS_OPPONENT_TURN
        }
        .to_string();

        tracing::info!("Online in room {}: {}", self.identity.room, self.status);
    }

    fn on_flip_result(&mut self, flipper: PlayerId, result: FlipOutcome) {
        if self.connection != ConnectionState::Online {
            tracing::debug!("Ignoring flip result while {:?}", self.connection);
            return;
        }

        let mine = flipper == self.identity.player_id;
        self.awaiting_result = false;
        self.turn = if mine {
            TurnState::OpponentTurn
        } else {
            TurnState::MyTurn
        };
        self.status = format!(
            "{} flipped: {}",
            if mine { "You" } else { "Opponent" },
            result
        );

        self.record(flipper, result);
        self.start_flight(result);
    }

    fn on_offline(&mut self) {
        if self.connection == ConnectionState::Offline {
            return;
        }

        tracing::info!("Playing offline from now on");
        self.connection = ConnectionState::Offline;
        self.outbox = None;
        self.awaiting_result = false;
        self.turn = TurnState::MyTurn;
        self.status = STATUS_OFFLINE.to_string();
    }

    fn on_animation(&mut self, event: AnimationEvent) {
        let Some(flight) = self.flight.as_mut() else {
            return;
        };

        if flight.animation != event.id {
            tracing::debug!("Ignoring progress of superseded animation {:?}", event.id);
            return;
        }

        match (flight.stage, event.progress) {
            (FlightStage::Spinning, AnimationProgress::Midpoint) => {
                self.coin_face = Some(flight.outcome);
            }
            (FlightStage::Spinning, AnimationProgress::Finished) => {
                self.coin_face = Some(flight.outcome);
                flight.stage = FlightStage::Revealing;
                flight.animation = self.animator.request_animation(
                    AnimationTarget::StatusText,
                    AnimationSpec::result_reveal(&self.timing),
                );
            }
            (FlightStage::Revealing, AnimationProgress::Midpoint) => {}
            (FlightStage::Revealing, AnimationProgress::Finished) => {
                self.flight = None;
                self.completed_flips += 1;
                tracing::debug!("Flip animation complete");
            }
        }
    }

    fn start_flight(&mut self, outcome: FlipOutcome) {
        if self.flight.is_some() {
            tracing::debug!("New flip replaces the coin still in the air");
        }

        let animation = self
            .animator
            .request_animation(AnimationTarget::Coin, AnimationSpec::coin_spin(&self.timing));

        self.coin_face = None;
        self.flight = Some(CoinFlight {
            outcome,
            stage: FlightStage::Spinning,
            animation,
        });
    }

    fn record(&mut self, flipper: PlayerId, outcome: FlipOutcome) {
        let by_me = flipper == self.identity.player_id;
        self.history.push(FlipRecord {
            flipper,
            outcome,
            by_me,
            timestamp: Utc::now(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentitySource;
    use crate::types::RoomId;
    use tokio::sync::mpsc::UnboundedReceiver;

    /// Records requests; progress is fed back by hand.
    #[derive(Default)]
    struct RecordingAnimator {
        requests: Vec<(AnimationId, AnimationTarget, AnimationSpec)>,
    }

    impl RecordingAnimator {
        fn last(&self) -> AnimationId {
            self.requests.last().unwrap().0
        }
    }

    impl Animator for RecordingAnimator {
        fn request_animation(
            &mut self,
            target: AnimationTarget,
            spec: AnimationSpec,
        ) -> AnimationId {
            let id = AnimationId::new(self.requests.len() as u64 + 1);
            self.requests.push((id, target, spec));
            id
        }
    }

    fn identity(player: &str, room: &str) -> Identity {
        Identity {
            player_id: PlayerId::new(player),
            room: RoomId::new(room),
            source: IdentitySource::Platform,
            room_defaulted: false,
        }
    }

    fn online_scene() -> (
        GameScene<RecordingAnimator>,
        UnboundedReceiver<ClientMessage>,
    ) {
        let (outbox, sent) = Outbox::channel();
        let scene = GameScene::connecting(
            identity("p1", "abc123"),
            outbox,
            RecordingAnimator::default(),
            AnimationTiming::default(),
        )
        .with_rng(StdRng::seed_from_u64(1));
        (scene, sent)
    }

    fn offline_scene() -> GameScene<RecordingAnimator> {
        GameScene::offline(
            identity("p1", "default"),
            RecordingAnimator::default(),
            AnimationTiming::default(),
        )
        .with_rng(StdRng::seed_from_u64(1))
    }

    fn ready(your_turn: bool) -> SceneEvent {
        SceneEvent::Connection(ConnectionEvent::Ready { your_turn })
    }

    fn flip_result(flipper: &str, result: FlipOutcome) -> SceneEvent {
        SceneEvent::Connection(ConnectionEvent::FlipResult {
            flipper: PlayerId::new(flipper),
            result,
        })
    }

    fn progress(id: AnimationId, progress: AnimationProgress) -> SceneEvent {
        SceneEvent::Animation(AnimationEvent { id, progress })
    }

    /// Run the current coin flight to completion
    fn finish_animations(scene: &mut GameScene<RecordingAnimator>) {
        let spin = scene.animator().last();
        scene.handle(progress(spin, AnimationProgress::Midpoint));
        scene.handle(progress(spin, AnimationProgress::Finished));
        let reveal = scene.animator().last();
        scene.handle(progress(reveal, AnimationProgress::Finished));
    }

    #[test]
    fn test_initial_phases() {
        let (scene, _sent) = online_scene();
        assert_eq!(scene.phase(), ScenePhase::AwaitingConnection);
        assert_eq!(scene.status(), STATUS_CONNECTING);
        assert!(!scene.can_flip());

        let scene = offline_scene();
        assert_eq!(scene.phase(), ScenePhase::OfflineReady);
        assert!(scene.can_flip());
    }

    #[test]
    fn test_start_my_turn_then_flip_sends_one_message() {
        let (mut scene, mut sent) = online_scene();

        scene.handle(ready(true));
        assert_eq!(scene.phase(), ScenePhase::OnlineMyTurn);
        assert_eq!(scene.status(), "Your turn!");
        assert!(scene.view().flip_enabled);

        scene.handle(SceneEvent::FlipPressed);
        assert_eq!(scene.phase(), ScenePhase::Flipping);
        assert_eq!(scene.status(), STATUS_FLIPPING);

        match sent.try_recv().unwrap() {
            ClientMessage::Flip {
                room, player_id, ..
            } => {
                assert_eq!(room.as_str(), "abc123");
                assert_eq!(player_id.as_str(), "p1");
            }
            other => panic!("unexpected message {:?}", other),
        }
        assert!(sent.try_recv().is_err());
        // the coin only spins once the coordinator answers
        assert!(scene.animator().requests.is_empty());
    }

    #[test]
    fn test_flips_out_of_turn_have_no_effect() {
        let (mut scene, mut sent) = online_scene();

        // still connecting
        assert!(!scene.flip());

        scene.handle(ready(false));
        assert_eq!(scene.phase(), ScenePhase::OnlineOpponentTurn);
        assert_eq!(scene.status(), "Opponent's turn...");
        for _ in 0..3 {
            scene.handle(SceneEvent::FlipPressed);
        }

        assert!(sent.try_recv().is_err());
        assert!(scene.animator().requests.is_empty());
        assert_eq!(scene.phase(), ScenePhase::OnlineOpponentTurn);
    }

    #[test]
    fn test_flip_while_awaiting_result_is_ignored() {
        let (mut scene, mut sent) = online_scene();
        scene.handle(ready(true));

        assert!(scene.flip());
        assert!(!scene.flip());

        assert!(sent.try_recv().is_ok());
        assert!(sent.try_recv().is_err());
    }

    #[test]
    fn test_own_flip_result_passes_turn() {
        let (mut scene, _sent) = online_scene();
        scene.handle(ready(true));
        scene.flip();

        scene.handle(flip_result("p1", FlipOutcome::Heads));
        assert_eq!(scene.turn(), TurnState::OpponentTurn);
        assert_eq!(scene.status(), "You flipped: HEADS");
        assert_eq!(scene.phase(), ScenePhase::Flipping);

        finish_animations(&mut scene);
        assert_eq!(scene.phase(), ScenePhase::OnlineOpponentTurn);
        assert!(!scene.view().retry_visible);
    }

    #[test]
    fn test_opponent_flip_result_gives_turn_back() {
        let (mut scene, _sent) = online_scene();
        scene.handle(ready(false));

        scene.handle(flip_result("p2", FlipOutcome::Tails));
        assert_eq!(scene.turn(), TurnState::MyTurn);
        assert_eq!(scene.status(), "Opponent flipped: TAILS");

        // mid-animation: not yet
        assert!(!scene.can_flip());

        finish_animations(&mut scene);
        let view = scene.view();
        assert!(view.flip_enabled);
        assert!(view.retry_visible);
        assert_eq!(view.button_label, "Flip Again");
        assert_eq!(view.coin_face, Some(FlipOutcome::Tails));
        assert_eq!(scene.phase(), ScenePhase::OnlineMyTurn);
    }

    #[test]
    fn test_animation_chain() {
        let (mut scene, _sent) = online_scene();
        scene.handle(ready(false));
        scene.handle(flip_result("p2", FlipOutcome::Heads));

        let (spin, target, spec) = scene.animator().requests[0];
        assert_eq!(target, AnimationTarget::Coin);
        assert!(spec.yoyo);
        assert!(scene.view().coin_spinning);
        assert_eq!(scene.view().coin_face, None);

        scene.handle(progress(spin, AnimationProgress::Midpoint));
        assert_eq!(scene.view().coin_face, Some(FlipOutcome::Heads));

        scene.handle(progress(spin, AnimationProgress::Finished));
        let (reveal, target, _) = scene.animator().requests[1];
        assert_eq!(target, AnimationTarget::StatusText);
        assert!(!scene.view().coin_spinning);
        assert!(scene.is_animating());

        scene.handle(progress(reveal, AnimationProgress::Finished));
        assert!(!scene.is_animating());
        assert_eq!(scene.view().completed_flips, 1);
    }

    #[test]
    fn test_duplicate_result_restarts_coin() {
        let (mut scene, _sent) = online_scene();
        scene.handle(ready(false));

        scene.handle(flip_result("p2", FlipOutcome::Heads));
        let first = scene.animator().last();
        scene.handle(flip_result("p2", FlipOutcome::Tails));
        assert_eq!(scene.history().len(), 2);

        // progress of the replaced coin changes nothing
        scene.handle(progress(first, AnimationProgress::Finished));
        assert_eq!(scene.animator().requests.len(), 2);

        finish_animations(&mut scene);
        assert_eq!(scene.view().coin_face, Some(FlipOutcome::Tails));
        assert_eq!(scene.view().completed_flips, 1);
    }

    #[test]
    fn test_offline_flip_resolves_locally() {
        let mut scene = offline_scene();

        for round in 1..=3 {
            assert!(scene.flip());
            assert_eq!(scene.turn(), TurnState::MyTurn);
            assert_eq!(scene.history().len(), round);
            assert!(scene.status().starts_with("You flipped: "));

            // no second flip while the coin is in the air
            assert!(!scene.flip());

            finish_animations(&mut scene);
            assert_eq!(scene.phase(), ScenePhase::OfflineReady);
            assert!(scene.can_flip());
        }

        assert!(scene.history().iter().all(|record| record.by_me));
    }

    #[test]
    fn test_connection_failure_before_start() {
        let (mut scene, _sent) = online_scene();

        scene.handle(SceneEvent::Connection(ConnectionEvent::Offline));
        assert_eq!(scene.connection(), ConnectionState::Offline);
        assert_eq!(scene.turn(), TurnState::MyTurn);
        assert_eq!(scene.status(), STATUS_OFFLINE);
        assert!(scene.can_flip());

        // offline is terminal
        scene.handle(ready(false));
        assert_eq!(scene.phase(), ScenePhase::OfflineReady);
    }

    #[test]
    fn test_drop_while_awaiting_result() {
        let (mut scene, _sent) = online_scene();
        scene.handle(ready(true));
        scene.flip();

        scene.handle(SceneEvent::Connection(ConnectionEvent::Offline));
        assert_eq!(scene.phase(), ScenePhase::OfflineReady);

        // late results from the dead connection are not applied
        scene.handle(flip_result("p1", FlipOutcome::Heads));
        assert!(scene.history().is_empty());
        assert!(scene.flip());
    }

    #[test]
    fn test_closed_outbox_falls_back_to_offline() {
        let (mut scene, sent) = online_scene();
        scene.handle(ready(true));
        drop(sent);

        assert!(!scene.flip());
        assert_eq!(scene.connection(), ConnectionState::Offline);
        assert!(scene.can_flip());
    }

    #[test]
    fn test_example_round() {
        let (mut scene, mut sent) = online_scene();

        scene.handle(ready(true));
        assert_eq!(scene.status(), "Your turn!");
        assert!(scene.flip());
        assert!(matches!(
            sent.try_recv(),
            Ok(ClientMessage::Flip { .. })
        ));

        scene.handle(flip_result("p1", FlipOutcome::Heads));
        finish_animations(&mut scene);
        assert!(!scene.can_flip());

        scene.handle(flip_result("p2", FlipOutcome::Tails));
        assert_eq!(scene.status(), "Opponent flipped: TAILS");
        finish_animations(&mut scene);
        assert!(scene.can_flip());
        assert_eq!(scene.view().completed_flips, 2);
    }
}
