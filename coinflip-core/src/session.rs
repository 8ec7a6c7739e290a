use crate::animation::TimelineAnimator;
use crate::config::GameConfig;
use crate::connection::{ConnectionManager, Connector};
use crate::error::Result;
use crate::identity::{self, HostEnvironment};
use crate::scene::{GameScene, SceneEvent, View};
use std::sync::Arc;
use tokio::sync::mpsc;

pub type SessionScene = GameScene<TimelineAnimator<SceneEvent>>;

/// A running game: one scene fed by one ordered event queue.
///
/// Must be launched from inside a tokio runtime; the connection task and
/// animation timers are spawned onto it.
pub struct Session {
    scene: SessionScene,
    events: mpsc::UnboundedReceiver<SceneEvent>,
    sender: mpsc::UnboundedSender<SceneEvent>,
}

impl Session {
    pub fn launch(
        config: &GameConfig,
        host: &dyn HostEnvironment,
        connector: Arc<dyn Connector>,
    ) -> Result<Self> {
        config.validate()?;

        let identity = identity::resolve(host, &config.default_room);
        tracing::info!(
            "Starting session for player {} in room {}",
            identity.player_id,
            identity.room
        );

        let (sender, events) = mpsc::unbounded_channel();
        let animator = TimelineAnimator::new(sender.clone());

        let scene = if config.offline_only {
            tracing::info!("Offline mode requested, not contacting the coordinator");
            GameScene::offline(identity, animator, config.animation.clone())
        } else {
            let manager =
                ConnectionManager::new(config.server_url.clone(), config.connect_timeout, connector);
            let outbox =
                manager.spawn(identity.room.clone(), identity.player_id.clone(), sender.clone());
            GameScene::connecting(identity, outbox, animator, config.animation.clone())
        };

        Ok(Self {
            scene,
            events,
            sender,
        })
    }

    /// Sender for user input (`FlipPressed`, `Shutdown`)
    pub fn controls(&self) -> mpsc::UnboundedSender<SceneEvent> {
        self.sender.clone()
    }

    pub fn scene(&self) -> &SessionScene {
        &self.scene
    }

    /// Apply the next queued event. Returns `None` once shut down.
    pub async fn step(&mut self) -> Option<View> {
        // the session holds a sender itself, so the queue never runs dry
        let event = self.events.recv().await?;

        if event == SceneEvent::Shutdown {
            self.scene.handle(event);
            return None;
        }

        self.scene.handle(event);
        Some(self.scene.view())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnimationTiming;
    use crate::connection::memory::{memory_channel, RefusingConnector};
    use crate::identity::LaunchContext;
    use crate::protocol::{ClientMessage, ServerMessage};
    use crate::scene::ScenePhase;
    use crate::types::{ConnectionState, FlipOutcome, PlayerId, TurnState};
    use std::time::Duration;

    fn fast_config() -> GameConfig {
        GameConfig {
            server_url: "ws://coordinator.test".to_string(),
            connect_timeout: Duration::from_secs(1),
            animation: AnimationTiming {
                coin_spin: Duration::from_millis(2),
                result_reveal: Duration::from_millis(2),
            },
            ..GameConfig::default()
        }
    }

    /// Step until `done` holds for the scene
    async fn step_until(session: &mut Session, done: impl Fn(&SessionScene) -> bool) {
        while !done(session.scene()) {
            session.step().await.expect("session ended early");
        }
    }

    #[tokio::test]
    async fn test_invalid_config_is_rejected() {
        let mut config = fast_config();
        config.server_url = "http://wrong.scheme".to_string();

        let result = Session::launch(&config, &LaunchContext::new(), Arc::new(RefusingConnector));
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_coordinator_falls_back_offline() {
        let host = LaunchContext::new().with_user_id("p1");
        let mut session =
            Session::launch(&fast_config(), &host, Arc::new(RefusingConnector)).unwrap();

        assert_eq!(session.scene().phase(), ScenePhase::AwaitingConnection);
        let view = session.step().await.unwrap();

        assert_eq!(session.scene().connection(), ConnectionState::Offline);
        assert!(view.flip_enabled);
    }

    #[tokio::test]
    async fn test_offline_round_trip() {
        let mut session = Session::launch(
            &GameConfig {
                offline_only: true,
                ..fast_config()
            },
            &LaunchContext::new(),
            Arc::new(RefusingConnector),
        )
        .unwrap();

        session.controls().send(SceneEvent::FlipPressed).unwrap();
        session.step().await.unwrap();
        assert_eq!(session.scene().history().len(), 1);

        step_until(&mut session, |scene| !scene.is_animating()).await;
        assert!(session.scene().view().retry_visible);

        session.controls().send(SceneEvent::Shutdown).unwrap();
        assert!(session.step().await.is_none());
    }

    #[tokio::test]
    async fn test_online_match() {
        let (connector, mut remote) = memory_channel();
        let host = LaunchContext::new()
            .with_user_id("p1")
            .with_launch_url("https://game.example/?room=abc123");

        let mut session = Session::launch(&fast_config(), &host, Arc::new(connector)).unwrap();

        assert!(matches!(
            remote.recv_client().await,
            Some(ClientMessage::Join { .. })
        ));
        remote.send(&ServerMessage::Start { your_turn: true });

        let view = session.step().await.unwrap();
        assert_eq!(view.status, "Your turn!");

        session.controls().send(SceneEvent::FlipPressed).unwrap();
        session.step().await.unwrap();

        let Some(ClientMessage::Flip {
            room,
            player_id,
            result,
        }) = remote.recv_client().await
        else {
            panic!("expected a flip message");
        };
        assert_eq!(room.as_str(), "abc123");
        assert_eq!(player_id.as_str(), "p1");

        // coordinator echoes the flip, then the opponent answers
        remote.send(&ServerMessage::FlipResult {
            flipper: PlayerId::new("p1"),
            result,
        });
        step_until(&mut session, |scene| scene.turn() == TurnState::OpponentTurn).await;
        step_until(&mut session, |scene| !scene.is_animating()).await;

        remote.send(&ServerMessage::FlipResult {
            flipper: PlayerId::new("p2"),
            result: FlipOutcome::Tails,
        });
        step_until(&mut session, |scene| scene.turn() == TurnState::MyTurn).await;
        assert_eq!(session.scene().status(), "Opponent flipped: TAILS");

        step_until(&mut session, |scene| scene.can_flip()).await;
        assert_eq!(session.scene().history().len(), 2);
    }
}
