//! Animation playback for loaded models

use bevy::animation::graph::{AnimationGraph, AnimationGraphHandle, AnimationNodeIndex};
use bevy::prelude::*;

use crate::session::ViewerSession;

/// Clips waiting for the model's animation player to appear
#[derive(Component, Debug, Clone)]
pub struct PendingAnimations {
    pub clips: Vec<Handle<AnimationClip>>,
}

/// Animation state owned by a session
#[derive(Debug, Clone)]
pub struct AnimationDriver {
    /// Entity carrying the `AnimationPlayer`
    pub player: Entity,
    pub graph: Handle<AnimationGraph>,
    pub channels: Vec<AnimationNodeIndex>,
}

/// Build a graph over every clip and start them all looping
pub(crate) fn start_animations(
    mut commands: Commands,
    mut graphs: ResMut<Assets<AnimationGraph>>,
    pending: Query<(Entity, &PendingAnimations, &ChildOf)>,
    children: Query<&Children>,
    mut players: Query<&mut AnimationPlayer>,
    mut sessions: Query<&mut ViewerSession>,
) {
    for (model, pending_clips, parent) in &pending {
        let Ok(mut session) = sessions.get_mut(parent.parent()) else {
            continue;
        };
        if !session.liveness().is_alive() {
            continue;
        }

        // The scene spawns the player somewhere below the model root
        let Some(player_entity) = children
            .iter_descendants(model)
            .find(|e| players.contains(*e))
        else {
            continue;
        };
        let Ok(mut player) = players.get_mut(player_entity) else {
            continue;
        };

        let (graph, channels) = AnimationGraph::from_clips(pending_clips.clips.iter().cloned());
        let graph = graphs.add(graph);

        for &node in &channels {
            player.play(node).repeat();
        }

        commands
            .entity(player_entity)
            .insert(AnimationGraphHandle(graph.clone()));
        commands.entity(model).remove::<PendingAnimations>();

        tracing::info!(
            session = %session.id(),
            "Playing {} animation(s)",
            channels.len()
        );
        session.attach_animation(AnimationDriver {
            player: player_entity,
            graph,
            channels,
        });
    }
}
