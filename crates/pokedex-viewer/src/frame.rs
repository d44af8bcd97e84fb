//! Per-frame driving of live sessions

use bevy::prelude::*;
use pokedex_core::Liveness;

use crate::controls::OrbitController;
use crate::session::ViewerSession;

/// Cancellation token for a session's per-frame work
///
/// The frame driver checks it every tick; once cancelled it never fires
/// again for that session.
#[derive(Debug, Clone, Default)]
pub struct FrameTicket(Liveness);

impl FrameTicket {
    pub fn new() -> Self {
        Self(Liveness::new())
    }

    pub fn is_live(&self) -> bool {
        self.0.is_alive()
    }

    /// Returns whether the ticket was still live
    pub fn cancel(&self) -> bool {
        self.0.revoke()
    }
}

/// Time accumulated by a session since construction
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameClock {
    elapsed: f32,
    last_delta: f32,
}

impl FrameClock {
    pub fn tick(&mut self, delta: f32) {
        self.last_delta = delta;
        self.elapsed += delta;
    }

    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    pub fn last_delta(&self) -> f32 {
        self.last_delta
    }
}

/// Integrate controls, advance the clock and count a frame for every live session
pub(crate) fn drive_frames(
    time: Res<Time>,
    mut sessions: Query<&mut ViewerSession>,
    mut cameras: Query<(&mut OrbitController, &mut Transform)>,
    mut players: Query<&mut AnimationPlayer>,
) {
    let dt = time.delta_secs();

    for mut session in &mut sessions {
        if !session.ticket().is_live() {
            continue;
        }

        if let Some(camera) = session.camera() {
            if let Ok((mut controller, mut transform)) = cameras.get_mut(camera) {
                controller.integrate(dt);
                *transform = controller.camera_transform();
            }
        }

        // The engine advances the channels by the same delta; keep them running
        if let Some(player) = session.animation().map(|driver| driver.player) {
            if let Ok(mut player) = players.get_mut(player) {
                if player.all_paused() {
                    player.resume_all();
                }
            }
        }

        session.record_frame(dt);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ticket_cancel_once() {
        let ticket = FrameTicket::new();
        let shared = ticket.clone();
        assert!(ticket.is_live());
        assert!(shared.cancel());
        assert!(!ticket.is_live());
        assert!(!ticket.cancel());
    }

    #[test]
    fn test_clock_accumulates() {
        let mut clock = FrameClock::default();
        clock.tick(0.016);
        clock.tick(0.034);
        assert!((clock.elapsed() - 0.05).abs() < 1e-6);
        assert_eq!(clock.last_delta(), 0.034);
    }
}
