//! Model normalization: rescale and re-center loaded content

use bevy::math::Affine3A;
use bevy::mesh::VertexAttributeValues;
use bevy::prelude::*;

use crate::ViewerSettings;

/// Marks a freshly spawned model whose transform has not been fitted yet
#[derive(Component, Debug, Default)]
pub struct PendingFit;

/// Axis-aligned bounding box
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Vec3,
    pub max: Vec3,
}

impl Bounds {
    pub fn new(min: Vec3, max: Vec3) -> Self {
        Self {
            min: min.min(max),
            max: max.max(min),
        }
    }

    /// Smallest box containing every point, `None` for no points
    pub fn from_points(points: impl IntoIterator<Item = Vec3>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let mut bounds = Self::new(first, first);
        for p in points {
            bounds.extend(p);
        }
        Some(bounds)
    }

    pub fn extend(&mut self, point: Vec3) {
        self.min = self.min.min(point);
        self.max = self.max.max(point);
    }

    pub fn union(self, other: Bounds) -> Bounds {
        Bounds {
            min: self.min.min(other.min),
            max: self.max.max(other.max),
        }
    }

    pub fn size(&self) -> Vec3 {
        self.max - self.min
    }

    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn max_dimension(&self) -> f32 {
        self.size().max_element()
    }
}

/// Transform mapping `bounds` to a box centered at the origin whose largest
/// side is `reference_size`
///
/// Returns `None` for degenerate (zero-sized) bounds.
pub fn normalize(bounds: &Bounds, reference_size: f32) -> Option<Transform> {
    let max_dimension = bounds.max_dimension();
    if !max_dimension.is_finite() || max_dimension <= f32::EPSILON {
        return None;
    }
    let scale = reference_size / max_dimension;
    Some(Transform {
        translation: -bounds.center() * scale,
        rotation: Quat::IDENTITY,
        scale: Vec3::splat(scale),
    })
}

/// Outcome of walking a spawned model for mesh positions
enum Survey {
    /// Scene not spawned, or a mesh asset not loaded yet
    NotReady,
    NoMeshes,
    Found(Bounds),
}

/// Accumulate bounds of every mesh below `entity`, in the model's local space
fn collect_bounds(
    entity: Entity,
    parent: Affine3A,
    children: &Query<&Children>,
    nodes: &Query<(&Transform, Option<&Mesh3d>), Without<PendingFit>>,
    meshes: &Assets<Mesh>,
    bounds: &mut Option<Bounds>,
    missing: &mut bool,
) {
    let Ok(child_list) = children.get(entity) else {
        return;
    };

    for child in child_list.iter() {
        let Ok((transform, mesh_handle)) = nodes.get(child) else {
            continue;
        };
        let affine = parent * transform.compute_affine();

        if let Some(mesh_handle) = mesh_handle {
            match meshes.get(&mesh_handle.0) {
                Some(mesh) => {
                    if let Some(VertexAttributeValues::Float32x3(positions)) =
                        mesh.attribute(Mesh::ATTRIBUTE_POSITION)
                    {
                        let points = positions
                            .iter()
                            .map(|p| affine.transform_point3(Vec3::from_array(*p)));
                        if let Some(mesh_bounds) = Bounds::from_points(points) {
                            *bounds = Some(match bounds.take() {
                                Some(b) => b.union(mesh_bounds),
                                None => mesh_bounds,
                            });
                        }
                    }
                }
                None => *missing = true,
            }
        }

        collect_bounds(child, affine, children, nodes, meshes, bounds, missing);
    }
}

fn survey(
    model: Entity,
    children: &Query<&Children>,
    nodes: &Query<(&Transform, Option<&Mesh3d>), Without<PendingFit>>,
    meshes: &Assets<Mesh>,
) -> Survey {
    if children.get(model).is_err() {
        return Survey::NotReady;
    }

    let mut bounds = None;
    let mut missing = false;
    collect_bounds(
        model,
        Affine3A::IDENTITY,
        children,
        nodes,
        meshes,
        &mut bounds,
        &mut missing,
    );

    match (bounds, missing) {
        (_, true) => Survey::NotReady,
        (Some(bounds), false) => Survey::Found(bounds),
        (None, false) => Survey::NoMeshes,
    }
}

/// Fit each newly spawned model once its scene and meshes are available
pub(crate) fn fit_loaded_models(
    mut commands: Commands,
    settings: Res<ViewerSettings>,
    mut pending: Query<(Entity, &mut Transform), With<PendingFit>>,
    children: Query<&Children>,
    nodes: Query<(&Transform, Option<&Mesh3d>), Without<PendingFit>>,
    meshes: Res<Assets<Mesh>>,
) {
    for (model, mut transform) in &mut pending {
        match survey(model, &children, &nodes, &meshes) {
            Survey::NotReady => continue,
            Survey::NoMeshes => {
                tracing::warn!(?model, "Loaded model has no meshes, leaving it unscaled");
            }
            Survey::Found(bounds) => {
                if let Some(fitted) = normalize(&bounds, settings.reference_size) {
                    tracing::debug!(
                        ?model,
                        size = ?bounds.size(),
                        scale = fitted.scale.x,
                        "Normalized model"
                    );
                    *transform = fitted;
                }
            }
        }
        commands.entity(model).remove::<PendingFit>();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::ecs::system::RunSystemOnce;

    fn assert_normalized(bounds: Bounds, reference: f32) {
        let t = normalize(&bounds, reference).unwrap();
        let fitted = Bounds::new(
            t.transform_point(bounds.min),
            t.transform_point(bounds.max),
        );
        assert!((fitted.max_dimension() - reference).abs() < 1e-4);
        assert!(fitted.center().length() < 1e-4);
    }

    #[test]
    fn test_normalize_offset_box() {
        let bounds = Bounds::new(Vec3::new(-1.0, 0.0, -0.5), Vec3::new(3.0, 2.0, 0.5));
        let t = normalize(&bounds, 2.0).unwrap();
        assert_eq!(t.scale, Vec3::splat(0.5));
        assert!((t.translation - Vec3::new(-0.5, -0.5, 0.0)).length() < 1e-6);
    }

    #[test]
    fn test_normalize_various_bounds() {
        let cases = [
            Bounds::new(Vec3::splat(-0.01), Vec3::splat(0.01)),
            Bounds::new(Vec3::new(10.0, 20.0, 30.0), Vec3::new(110.0, 25.0, 31.0)),
            Bounds::new(Vec3::new(-500.0, -2.0, 0.0), Vec3::new(-400.0, 300.0, 1.0)),
            Bounds::new(Vec3::ZERO, Vec3::new(0.0, 0.0, 4.0)),
        ];
        for bounds in cases {
            assert_normalized(bounds, 2.0);
            assert_normalized(bounds, 5.0);
        }
    }

    #[test]
    fn test_degenerate_bounds() {
        let point = Bounds::new(Vec3::ONE, Vec3::ONE);
        assert!(normalize(&point, 2.0).is_none());
    }

    #[test]
    fn test_from_points() {
        assert!(Bounds::from_points(std::iter::empty()).is_none());
        let b = Bounds::from_points([
            Vec3::new(1.0, -2.0, 0.0),
            Vec3::new(-1.0, 4.0, 0.5),
            Vec3::new(0.0, 0.0, -0.5),
        ])
        .unwrap();
        assert_eq!(b.min, Vec3::new(-1.0, -2.0, -0.5));
        assert_eq!(b.max, Vec3::new(1.0, 4.0, 0.5));
        assert_eq!(b.max_dimension(), 6.0);
    }

    #[test]
    fn test_union() {
        let a = Bounds::new(Vec3::ZERO, Vec3::ONE);
        let b = Bounds::new(Vec3::splat(-1.0), Vec3::splat(0.5));
        let u = a.union(b);
        assert_eq!(u.min, Vec3::splat(-1.0));
        assert_eq!(u.max, Vec3::ONE);
    }

    fn fit_world() -> World {
        let mut world = World::new();
        world.init_resource::<Assets<Mesh>>();
        world.init_resource::<ViewerSettings>();
        world
    }

    fn run_fit(world: &mut World) {
        world.run_system_once(fit_loaded_models).unwrap();
    }

    #[test]
    fn test_fit_nested_mesh() {
        let mut world = fit_world();
        let mesh = world
            .resource_mut::<Assets<Mesh>>()
            .add(Mesh::from(Cuboid::new(2.0, 8.0, 0.8)));

        let model = world.spawn((Transform::default(), PendingFit)).id();
        let limb = world
            .spawn((
                Transform::from_xyz(100.0, 0.0, 0.0).with_scale(Vec3::splat(0.5)),
                ChildOf(model),
            ))
            .id();
        world.spawn((
            Transform::from_xyz(0.0, -20.0, 3.0),
            Mesh3d(mesh),
            ChildOf(limb),
        ));

        run_fit(&mut world);

        assert!(world.get::<PendingFit>(model).is_none());
        let fitted = *world.get::<Transform>(model).unwrap();

        // Cuboid in model space after the limb and mesh transforms
        let local = Bounds::new(Vec3::new(99.5, -12.0, 1.3), Vec3::new(100.5, -8.0, 1.7));
        let root_space = Bounds::new(
            fitted.transform_point(local.min),
            fitted.transform_point(local.max),
        );
        assert!((root_space.max_dimension() - 2.0).abs() < 1e-3);
        assert!(root_space.center().length() < 1e-3);
        assert!((root_space.size() - Vec3::new(0.5, 2.0, 0.2)).length() < 1e-3);
    }

    #[test]
    fn test_fit_waits_for_mesh_asset() {
        let mut world = fit_world();
        let unloaded = world.resource::<Assets<Mesh>>().reserve_handle();

        let model = world.spawn((Transform::default(), PendingFit)).id();
        world.spawn((Transform::default(), Mesh3d(unloaded), ChildOf(model)));

        run_fit(&mut world);
        assert!(world.get::<PendingFit>(model).is_some());
        assert_eq!(*world.get::<Transform>(model).unwrap(), Transform::default());
    }

    #[test]
    fn test_fit_waits_for_scene_spawn() {
        let mut world = fit_world();
        let model = world.spawn((Transform::default(), PendingFit)).id();

        run_fit(&mut world);
        assert!(world.get::<PendingFit>(model).is_some());
    }

    #[test]
    fn test_fit_without_meshes_leaves_model_unscaled() {
        let mut world = fit_world();
        let model = world.spawn((Transform::default(), PendingFit)).id();
        world.spawn((Transform::from_xyz(3.0, 0.0, 0.0), ChildOf(model)));

        run_fit(&mut world);
        assert!(world.get::<PendingFit>(model).is_none());
        assert_eq!(*world.get::<Transform>(model).unwrap(), Transform::default());
    }
}
