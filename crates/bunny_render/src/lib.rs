pub mod camera;
pub mod color;
pub mod gpu_context;
pub mod lighting;
pub mod mesh;
pub mod mesh_pipeline;
pub mod scene_graph;
mod shaders;
pub mod vertex;

pub use camera::{FollowCamera, FrameUniform};
pub use color::color_from_hex;
pub use gpu_context::GpuContext;
pub use lighting::Lighting;
pub use mesh_pipeline::MeshPipeline;
pub use scene_graph::{MeshNode, NodeId, SceneGraph, Transform};
pub use vertex::{InstanceRaw, MeshVertex};
