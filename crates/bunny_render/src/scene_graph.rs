//! The render world: a flat set of box meshes keyed by stable ids.
//!
//! Nodes are stored in a `BTreeMap` so instance order, and therefore
//! draw order, is deterministic across frames.

use std::collections::BTreeMap;

use glam::{Mat4, Quat, Vec3};

use crate::vertex::InstanceRaw;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub translation: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
        scale: Vec3::ONE,
    };

    pub fn from_translation_scale(translation: Vec3, scale: Vec3) -> Self {
        Self {
            translation,
            scale,
            ..Self::IDENTITY
        }
    }

    pub fn to_matrix(&self) -> Mat4 {
        Mat4::from_scale_rotation_translation(self.scale, self.rotation, self.translation)
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MeshNode {
    pub transform: Transform,
    pub color: [f32; 4],
    pub visible: bool,
}

impl MeshNode {
    pub fn new(transform: Transform, color: [f32; 4]) -> Self {
        Self {
            transform,
            color,
            visible: true,
        }
    }
}

#[derive(Debug, Default)]
pub struct SceneGraph {
    nodes: BTreeMap<NodeId, MeshNode>,
    next_id: u32,
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, node: MeshNode) -> NodeId {
        let id = NodeId(self.next_id);
        self.next_id += 1;
        self.nodes.insert(id, node);
        id
    }

    /// Returns false if the node was already gone.
    pub fn remove(&mut self, id: NodeId) -> bool {
        self.nodes.remove(&id).is_some()
    }

    pub fn get(&self, id: NodeId) -> Option<&MeshNode> {
        self.nodes.get(&id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut MeshNode> {
        self.nodes.get_mut(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
    }

    pub fn instances(&self) -> Vec<InstanceRaw> {
        self.nodes
            .values()
            .filter(|node| node.visible)
            .map(|node| InstanceRaw {
                model: node.transform.to_matrix().to_cols_array_2d(),
                color: node.color,
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node_at(x: f32) -> MeshNode {
        MeshNode::new(
            Transform::from_translation_scale(Vec3::new(x, 0.0, 0.0), Vec3::ONE),
            [1.0, 1.0, 1.0, 1.0],
        )
    }

    #[test]
    fn ids_are_never_reused() {
        let mut graph = SceneGraph::new();
        let a = graph.add(node_at(0.0));
        assert!(graph.remove(a));
        let b = graph.add(node_at(1.0));
        assert_ne!(a, b);
        assert!(!graph.contains(a));
        assert!(graph.contains(b));
    }

    #[test]
    fn removing_twice_reports_missing() {
        let mut graph = SceneGraph::new();
        let a = graph.add(node_at(0.0));
        assert!(graph.remove(a));
        assert!(!graph.remove(a));
        assert!(graph.is_empty());
    }

    #[test]
    fn instances_skip_hidden_nodes_and_keep_insertion_order() {
        let mut graph = SceneGraph::new();
        graph.add(node_at(1.0));
        let hidden = graph.add(node_at(2.0));
        graph.add(node_at(3.0));
        graph.get_mut(hidden).expect("node exists").visible = false;

        let instances = graph.instances();
        assert_eq!(instances.len(), 2);
        assert_eq!(instances[0].model[3][0], 1.0);
        assert_eq!(instances[1].model[3][0], 3.0);
    }

    #[test]
    fn transform_matrix_applies_scale_then_rotation_then_translation() {
        let transform = Transform {
            translation: Vec3::new(0.0, 1.0, 0.0),
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            scale: Vec3::new(2.0, 1.0, 1.0),
        };
        let p = transform.to_matrix().transform_point3(Vec3::X);
        assert!((p - Vec3::new(0.0, 1.0, -2.0)).length() < 1e-5);
    }
}
