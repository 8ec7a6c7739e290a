//! Animation requests and the timer-driven timeline that fulfils them.
//!
//! The scene never waits on an animation. It asks an [`Animator`] to play
//! one, keeps the returned id, and later receives [`AnimationEvent`]s for it
//! through its normal event queue.

use crate::config::AnimationTiming;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AnimationId(u64);

impl AnimationId {
    pub fn new(id: u64) -> Self {
        Self(id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationTarget {
    Coin,
    StatusText,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    Linear,
    QuadIn,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationSpec {
    pub duration: Duration,
    pub easing: Easing,
    /// Play forward then back; the turn-around is reported as a midpoint
    pub yoyo: bool,
}

impl AnimationSpec {
    pub fn coin_spin(timing: &AnimationTiming) -> Self {
        Self {
            duration: timing.coin_spin,
            easing: Easing::QuadIn,
            yoyo: true,
        }
    }

    pub fn result_reveal(timing: &AnimationTiming) -> Self {
        Self {
            duration: timing.result_reveal,
            easing: Easing::Linear,
            yoyo: true,
        }
    }

    pub fn total_duration(&self) -> Duration {
        if self.yoyo {
            self.duration * 2
        } else {
            self.duration
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationProgress {
    Midpoint,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnimationEvent {
    pub id: AnimationId,
    pub progress: AnimationProgress,
}

pub trait Animator {
    /// Start an animation. Progress for the returned id must eventually be
    /// delivered back to the scene, ending with `Finished`.
    fn request_animation(&mut self, target: AnimationTarget, spec: AnimationSpec) -> AnimationId;
}

/// Plays animations on tokio timers and reports progress into an event queue.
pub struct TimelineAnimator<E> {
    next_id: u64,
    events: mpsc::UnboundedSender<E>,
}

impl<E> TimelineAnimator<E>
where
    E: From<AnimationEvent> + Send + 'static,
{
    pub fn new(events: mpsc::UnboundedSender<E>) -> Self {
        Self { next_id: 0, events }
    }
}

impl<E> Animator for TimelineAnimator<E>
where
    E: From<AnimationEvent> + Send + 'static,
{
    fn request_animation(&mut self, target: AnimationTarget, spec: AnimationSpec) -> AnimationId {
        self.next_id += 1;
        let id = AnimationId(self.next_id);
        let events = self.events.clone();

        tracing::debug!("Animating {:?} for {:?} ({:?})", target, spec.total_duration(), id);

        tokio::spawn(async move {
            tokio::time::sleep(spec.duration).await;

            if spec.yoyo {
                let midpoint = AnimationEvent {
                    id,
                    progress: AnimationProgress::Midpoint,
                };
                if events.send(E::from(midpoint)).is_err() {
                    return;
                }
                tokio::time::sleep(spec.duration).await;
            }

            let _ = events.send(E::from(AnimationEvent {
                id,
                progress: AnimationProgress::Finished,
            }));
        });

        id
    }
}
