//! Fixed light rig shared by every session

use bevy::prelude::*;

pub const KEY_LIGHT_POSITION: Vec3 = Vec3::new(5.0, 10.0, 7.5);
pub const FILL_LIGHT_POSITION: Vec3 = Vec3::new(-5.0, 5.0, -5.0);

/// Blue tint of the fill light (#4a90e2)
pub fn fill_light_color() -> Color {
    Color::srgb_u8(0x4a, 0x90, 0xe2)
}

/// White ambient fill, attached to the session camera
pub fn ambient_light() -> AmbientLight {
    AmbientLight {
        color: Color::WHITE,
        brightness: 400.0,
        ..default()
    }
}

/// Spawn the key and fill lights under `root`
pub fn spawn_light_rig(commands: &mut Commands, root: Entity) {
    commands.spawn((
        Name::new("Key light"),
        DirectionalLight {
            color: Color::WHITE,
            illuminance: 4000.0,
            shadows_enabled: true,
            ..default()
        },
        Transform::from_translation(KEY_LIGHT_POSITION).looking_at(Vec3::ZERO, Vec3::Y),
        ChildOf(root),
    ));

    commands.spawn((
        Name::new("Fill light"),
        PointLight {
            color: fill_light_color(),
            intensity: 200_000.0,
            range: 50.0,
            shadows_enabled: false,
            ..default()
        },
        Transform::from_translation(FILL_LIGHT_POSITION),
        ChildOf(root),
    ));
}
