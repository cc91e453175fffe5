//! Scene Graph Tests
//!
//! Tests for:
//! - Node identity and type tags
//! - Hierarchy: attach/detach, re-parenting, cycle rejection, removal
//! - Dirty flags and cached bounds
//! - Named node lookup

use glam::{Mat4, Vec3};

use arbor::resources::sphere::SphereShape;
use arbor::resources::state::State;
use arbor::scene::{Node, Scene};

const EPSILON: f32 = 1e-7;

fn sphere_node(center: Vec3, radius: f32) -> Node {
    Node::sphere(SphereShape::new(center, radius, 1).unwrap())
}

// ============================================================================
// Identity
// ============================================================================

#[test]
fn node_ids_positive_and_unique() {
    let nodes: Vec<Node> = (0..64).map(|_| Node::group()).collect();
    for node in &nodes {
        assert!(node.id() > 0);
    }
    let mut ids: Vec<u64> = nodes.iter().map(Node::id).collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 64);
}

#[test]
fn node_type_tags() {
    assert_eq!(Node::group().kind().type_name(), "group");
    assert_eq!(Node::transform(Mat4::IDENTITY).kind().type_name(), "transform");
    assert_eq!(
        Node::projection(Mat4::IDENTITY).kind().type_name(),
        "projection"
    );
    assert_eq!(sphere_node(Vec3::ZERO, 1.0).kind().type_name(), "sphere");
    assert!(sphere_node(Vec3::ZERO, 1.0).kind().is_shape());
    assert!(!Node::group().kind().is_shape());
}

// ============================================================================
// Hierarchy
// ============================================================================

#[test]
fn attach_sets_parent_and_child() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::group());
    let child = scene.add_node(Node::group());

    scene.attach(child, parent).unwrap();

    assert_eq!(scene.get_node(child).unwrap().parent(), Some(parent));
    assert!(scene.children(parent).contains(&child));
    assert!(!scene.root_nodes.contains(&child));
}

#[test]
fn attach_unlinks_from_previous_parent() {
    let mut scene = Scene::new();
    let parent1 = scene.add_node(Node::group());
    let parent2 = scene.add_node(Node::group());
    let child = scene.add_node(Node::group());

    scene.attach(child, parent1).unwrap();
    scene.attach(child, parent2).unwrap();

    assert!(
        !scene.children(parent1).contains(&child),
        "child should be removed from the old parent"
    );
    assert!(scene.children(parent2).contains(&child));
    assert_eq!(scene.get_node(child).unwrap().parent(), Some(parent2));
}

#[test]
fn attach_to_self_is_rejected() {
    let mut scene = Scene::new();
    let node = scene.add_node(Node::group());
    assert!(scene.attach(node, node).is_err());
    assert_eq!(scene.get_node(node).unwrap().parent(), None);
}

#[test]
fn attach_ancestor_under_descendant_is_rejected() {
    let mut scene = Scene::new();
    let root = scene.add_node(Node::group());
    let mid = scene.add_child(root, Node::group()).unwrap();
    let leaf = scene.add_child(mid, Node::group()).unwrap();

    assert!(scene.attach(root, leaf).is_err());
    // Hierarchy is unchanged.
    assert_eq!(scene.get_node(root).unwrap().parent(), None);
    assert_eq!(scene.get_node(leaf).unwrap().parent(), Some(mid));
}

#[test]
fn remove_child_absent_is_noop() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::group());
    let stranger = scene.add_node(Node::group());

    scene.remove_child(parent, stranger);

    assert!(scene.get_node(stranger).is_some());
    assert_eq!(scene.node_count(), 2);
}

#[test]
fn remove_child_destroys_subtree() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::group());
    let child = scene.add_child(parent, Node::group()).unwrap();
    let grandchild = scene.add_child(child, Node::group()).unwrap();

    scene.remove_child(parent, child);

    assert!(scene.get_node(child).is_none());
    assert!(scene.get_node(grandchild).is_none());
    assert!(scene.get_node(parent).is_some());
}

#[test]
fn remove_node_removes_from_roots() {
    let mut scene = Scene::new();
    let root = scene.add_node(Node::group());
    let child = scene.add_child(root, Node::group()).unwrap();

    scene.remove_node(root);

    assert!(scene.root_nodes.is_empty());
    assert!(scene.get_node(root).is_none());
    assert!(scene.get_node(child).is_none());
}

#[test]
fn for_each_child_preserves_insertion_order() {
    let mut scene = Scene::new();
    let parent = scene.add_node(Node::group());
    let a = scene.add_child(parent, Node::group()).unwrap();
    let b = scene.add_child(parent, Node::group()).unwrap();
    let c = scene.add_child(parent, Node::group()).unwrap();

    let mut seen = Vec::new();
    scene.for_each_child(parent, |child| seen.push(child));
    assert_eq!(seen, vec![a, b, c]);
}

// ============================================================================
// Bounds
// ============================================================================

#[test]
fn sphere_bounds_are_center_plus_minus_radius() {
    let mut scene = Scene::new();
    let center = Vec3::new(1.0, -2.0, 3.0);
    let radius = 2.5;
    let handle = scene.add_node(sphere_node(center, radius));
    scene.update().unwrap();

    let bbox = scene.bounding_box(handle);
    let expected_min = center - Vec3::splat(radius);
    let expected_max = center + Vec3::splat(radius);
    assert!((bbox.min - expected_min).abs().max_element() < EPSILON);
    assert!((bbox.max - expected_max).abs().max_element() < EPSILON);

    let sphere = scene.bounding_sphere(handle);
    assert!((sphere.center - center).abs().max_element() < EPSILON);
    assert!((sphere.radius - radius).abs() < EPSILON);
}

#[test]
fn group_bounds_union_children() {
    let mut scene = Scene::new();
    let root = scene.add_node(Node::group());
    scene
        .add_child(root, sphere_node(Vec3::new(-5.0, 0.0, 0.0), 1.0))
        .unwrap();
    scene
        .add_child(root, sphere_node(Vec3::new(5.0, 0.0, 0.0), 1.0))
        .unwrap();
    scene.update().unwrap();

    let bbox = scene.bounding_box(root);
    assert!((bbox.min.x - -6.0).abs() < EPSILON);
    assert!((bbox.max.x - 6.0).abs() < EPSILON);
}

#[test]
fn transform_bounds_apply_matrix() {
    let mut scene = Scene::new();
    let transform = scene.add_node(Node::transform(Mat4::from_translation(Vec3::new(
        10.0, 0.0, 0.0,
    ))));
    scene
        .add_child(transform, sphere_node(Vec3::ZERO, 1.0))
        .unwrap();
    scene.update().unwrap();

    let bbox = scene.bounding_box(transform);
    assert!((bbox.min.x - 9.0).abs() < EPSILON);
    assert!((bbox.max.x - 11.0).abs() < EPSILON);
}

#[test]
fn mutating_sphere_recomputes_bounds() {
    let mut scene = Scene::new();
    let handle = scene.add_node(sphere_node(Vec3::ZERO, 1.0));
    scene.update().unwrap();
    assert!((scene.bounding_box(handle).max.x - 1.0).abs() < EPSILON);

    scene
        .sphere_mut(handle)
        .unwrap()
        .set_center(Vec3::new(4.0, 0.0, 0.0))
        .unwrap();
    scene.update().unwrap();
    assert!((scene.bounding_box(handle).max.x - 5.0).abs() < EPSILON);
}

#[test]
fn update_regenerates_only_dirty_spheres() {
    let mut scene = Scene::new();
    let handle = scene.add_node(sphere_node(Vec3::ZERO, 1.0));
    scene.update().unwrap();

    let before = match scene.get_node(handle).unwrap().kind() {
        arbor::scene::NodeKind::Sphere(s) => s.geometry().points().unwrap().id(),
        _ => unreachable!(),
    };

    // A clean second update leaves the generated geometry untouched.
    scene.update().unwrap();
    let after = match scene.get_node(handle).unwrap().kind() {
        arbor::scene::NodeKind::Sphere(s) => s.geometry().points().unwrap().id(),
        _ => unreachable!(),
    };
    assert_eq!(before, after);

    // Mutation regenerates.
    scene.sphere_mut(handle).unwrap().set_subdivisions(2);
    scene.update().unwrap();
    let regenerated = match scene.get_node(handle).unwrap().kind() {
        arbor::scene::NodeKind::Sphere(s) => s.geometry().points().unwrap().id(),
        _ => unreachable!(),
    };
    assert_ne!(before, regenerated);
}

// ============================================================================
// Naming & State
// ============================================================================

#[test]
fn find_named_node() {
    let mut scene = Scene::new();
    scene.add_node(Node::group());
    let named = scene.add_node(Node::group().with_name("hud"));
    assert_eq!(scene.find_named("hud"), Some(named));
    assert_eq!(scene.find_named("missing"), None);
}

#[test]
fn state_is_shared_between_shapes() {
    let mut scene = Scene::new();
    let state = State::solid_color("shared");
    let a = scene.add_node(sphere_node(Vec3::ZERO, 1.0).with_state(state.clone()));
    let b = scene.add_node(sphere_node(Vec3::ONE, 1.0));
    scene.set_state(b, Some(state.clone()));

    let sa = scene.get_node(a).unwrap().state().unwrap();
    let sb = scene.get_node(b).unwrap().state().unwrap();
    assert!(std::sync::Arc::ptr_eq(sa, sb));
    assert_eq!(sa.name(), "shared");
}
