//! Draw Recording Tests
//!
//! Tests for:
//! - Pre-multiplied clear colour
//! - Canonical op sequence for simple scenes
//! - Apply/reset bracketing around state groups
//! - Soft-skip of undrawable primitives
//! - Recording determinism

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use glam::{Mat4, Vec3, Vec4};

use arbor::renderer::cull::{Cull, FALLBACK_SURFACE_FORMAT};
use arbor::renderer::draw::{Draw, DrawOp};
use arbor::renderer::graph::RenderGraph;
use arbor::resources::geometry::Geometry;
use arbor::resources::shader::Shader;
use arbor::resources::sphere::SphereShape;
use arbor::resources::state::{State, StateDesc};
use arbor::scene::{Node, Scene};

fn sphere_node(center: Vec3) -> Node {
    Node::sphere(SphereShape::new(center, 1.0, 1).unwrap())
}

fn cull_into(scene: &Scene, graph: &mut RenderGraph) {
    let mut cull = Cull::new(graph, State::solid_color("default"), FALLBACK_SURFACE_FORMAT);
    cull.run(scene);
}

// ============================================================================
// Clear colour
// ============================================================================

#[test]
fn opaque_clear_color_is_unchanged() {
    let mut draw = Draw::new();
    draw.set_clear_color([0.5, 0.5, 0.5, 1.0]);
    assert_eq!(draw.pre_multiplied_clear_color(), [0.5, 0.5, 0.5, 1.0]);
}

#[test]
fn translucent_clear_color_is_premultiplied() {
    let mut draw = Draw::new();
    draw.set_clear_color([1.0, 1.0, 1.0, 0.25]);
    assert_eq!(draw.pre_multiplied_clear_color(), [0.25, 0.25, 0.25, 0.25]);
}

#[test]
fn premultiply_helper() {
    assert_eq!(
        Draw::pre_multiply([0.8, 0.4, 0.2, 0.5]),
        [0.4, 0.2, 0.1, 0.5]
    );
}

// ============================================================================
// Recording
// ============================================================================

#[test]
fn empty_graph_records_no_ops() {
    let scene = Scene::new();
    let graph = RenderGraph::new();
    let ops = Draw::new().record(&scene, &graph);
    assert!(ops.is_empty());
}

#[test]
fn single_sphere_records_one_indexed_draw() {
    let mut scene = Scene::new();
    scene.add_node(sphere_node(Vec3::ZERO));
    scene.update().unwrap();

    let mut graph = RenderGraph::new();
    cull_into(&scene, &mut graph);

    let ops = Draw::new().record(&scene, &graph);

    let draws: Vec<&DrawOp> = ops
        .iter()
        .filter(|op| matches!(op, DrawOp::DrawIndexed { .. }))
        .collect();
    assert_eq!(draws.len(), 1);
    match draws[0] {
        DrawOp::DrawIndexed { num_indices, .. } => assert_eq!(*num_indices, 240),
        _ => unreachable!(),
    }

    // Canonical bracketing: pipeline, matrices, apply, draw, reset.
    assert!(matches!(ops[0], DrawOp::BindPipeline { .. }));
    assert!(matches!(ops[1], DrawOp::SetProjection(m) if m == Mat4::IDENTITY));
    assert!(matches!(ops[2], DrawOp::SetModel(m) if m == Mat4::IDENTITY));
    assert!(matches!(ops[3], DrawOp::Apply(_)));
    assert!(matches!(ops[4], DrawOp::DrawIndexed { .. }));
    assert!(matches!(ops[5], DrawOp::Reset(_)));
    assert_eq!(ops.len(), 6);
}

#[test]
fn apply_and_reset_bracket_each_state_group() {
    let shader = Shader::solid_color();
    let red = Arc::new(State::new(StateDesc::new("red", shader.clone())));
    let green = Arc::new(State::new(StateDesc::new("green", shader)));

    let mut scene = Scene::new();
    let root = scene.add_node(Node::group());
    for state in [&red, &green, &red, &green] {
        scene
            .add_child(root, sphere_node(Vec3::ZERO).with_state((*state).clone()))
            .unwrap();
    }
    scene.update().unwrap();

    let mut graph = RenderGraph::new();
    cull_into(&scene, &mut graph);
    let ops = Draw::new().record(&scene, &graph);

    let mut sequence = Vec::new();
    for op in &ops {
        match op {
            DrawOp::Apply(state) => sequence.push(format!("apply:{}", state.name())),
            DrawOp::Reset(state) => sequence.push(format!("reset:{}", state.name())),
            DrawOp::DrawIndexed { .. } => sequence.push("draw".to_string()),
            _ => {}
        }
    }
    assert_eq!(
        sequence,
        vec![
            "apply:red",
            "draw",
            "draw",
            "reset:red",
            "apply:green",
            "draw",
            "draw",
            "reset:green",
        ]
    );
}

#[test]
fn apply_hook_sees_bucket_matrices() {
    let shader = Shader::solid_color();
    let calls = Arc::new(AtomicUsize::new(0));
    let observed = calls.clone();
    let state = Arc::new(State::new(StateDesc {
        apply: Some(Box::new(move |_state, projection, model| {
            assert_eq!(*projection, Mat4::IDENTITY);
            assert_eq!(model.w_axis.truncate(), Vec3::new(4.0, 0.0, 0.0));
            observed.fetch_add(1, Ordering::Relaxed);
        })),
        ..StateDesc::new("hooked", shader)
    }));

    let mut scene = Scene::new();
    let moved = scene.add_node(Node::transform(Mat4::from_translation(Vec3::X * 4.0)));
    scene
        .add_child(moved, sphere_node(Vec3::ZERO).with_state(state))
        .unwrap();
    scene.update().unwrap();

    let mut graph = RenderGraph::new();
    cull_into(&scene, &mut graph);
    let ops = Draw::new().record(&scene, &graph);

    // Hooks run during the execute sweep, which needs a device; here we
    // drive the recorded ops directly the way the sweep does.
    let mut projection = Mat4::IDENTITY;
    let mut model = Mat4::IDENTITY;
    for op in &ops {
        match op {
            DrawOp::SetProjection(m) => projection = *m,
            DrawOp::SetModel(m) => model = *m,
            DrawOp::Apply(state) => state.apply(&projection, &model),
            DrawOp::Reset(state) => state.reset(),
            _ => {}
        }
    }
    assert_eq!(calls.load(Ordering::Relaxed), 1);
}

#[test]
fn apply_hook_can_mutate_shader_color() {
    let shader = Shader::solid_color();
    shader.set_color(Vec4::ONE);
    let state = Arc::new(State::new(StateDesc {
        apply: Some(Box::new(|state, _projection, _model| {
            state.shader().set_color(Vec4::new(1.0, 0.0, 0.0, 1.0));
        })),
        ..StateDesc::new("tint", shader.clone())
    }));

    state.apply(&Mat4::IDENTITY, &Mat4::IDENTITY);
    assert_eq!(shader.color(), Vec4::new(1.0, 0.0, 0.0, 1.0));
}

// ============================================================================
// Soft skips
// ============================================================================

#[test]
fn geometry_without_points_is_skipped() {
    let mut scene = Scene::new();
    scene.add_node(Node::geometry(Geometry::new()));

    let mut graph = RenderGraph::new();
    cull_into(&scene, &mut graph);
    let ops = Draw::new().record(&scene, &graph);

    // The bucket exists, but no draw is emitted.
    assert!(graph.num_layers() == 1);
    assert!(
        !ops.iter()
            .any(|op| matches!(op, DrawOp::DrawIndexed { .. } | DrawOp::DrawArrays { .. }))
    );
}

#[test]
fn topology_mismatch_is_skipped() {
    let shader = Shader::solid_color();
    let lines = Arc::new(State::new(StateDesc {
        topology: wgpu::PrimitiveTopology::LineList,
        ..StateDesc::new("wire", shader)
    }));

    let mut scene = Scene::new();
    // Sphere geometry is a triangle list; the state expects lines.
    scene.add_node(sphere_node(Vec3::ZERO).with_state(lines));
    scene.update().unwrap();

    let mut graph = RenderGraph::new();
    cull_into(&scene, &mut graph);
    let ops = Draw::new().record(&scene, &graph);

    assert!(
        !ops.iter()
            .any(|op| matches!(op, DrawOp::DrawIndexed { .. }))
    );
}

// ============================================================================
// Determinism
// ============================================================================

#[test]
fn recording_unchanged_graph_twice_is_identical() {
    let mut scene = Scene::new();
    let root = scene.add_node(Node::group());
    let moved = scene
        .add_child(root, Node::transform(Mat4::from_translation(Vec3::Y * 2.0)))
        .unwrap();
    scene.add_child(moved, sphere_node(Vec3::ZERO)).unwrap();
    scene.add_child(root, sphere_node(Vec3::X)).unwrap();
    scene.update().unwrap();

    let mut graph = RenderGraph::new();
    cull_into(&scene, &mut graph);

    let draw = Draw::new();
    let first = draw.record(&scene, &graph);
    let second = draw.record(&scene, &graph);

    assert_eq!(first.len(), second.len());
    for (a, b) in first.iter().zip(&second) {
        assert_eq!(a, b);
    }
}

#[test]
fn reculling_unchanged_scene_records_identically() {
    let mut scene = Scene::new();
    let root = scene.add_node(Node::group());
    for i in 0..3 {
        scene
            .add_child(root, sphere_node(Vec3::new(i as f32 * 2.0, 0.0, 0.0)))
            .unwrap();
    }
    scene.update().unwrap();

    let draw = Draw::new();

    let mut graph = RenderGraph::new();
    cull_into(&scene, &mut graph);
    let first = draw.record(&scene, &graph);

    cull_into(&scene, &mut graph);
    let second = draw.record(&scene, &graph);

    assert_eq!(first, second);
}
