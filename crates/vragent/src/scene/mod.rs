mod fixture;
mod hashing;
mod host;
pub mod stable_id;
mod world;

pub use fixture::{
    build_scene_world, load_scene_world, parse_scene_description, ComponentDescription,
    ObjectDescription, SceneDescription, SceneFixtureError,
};
pub use hashing::asset_guid_for_path;
pub use host::{ComponentId, ObjectId, ObjectOrigin, SceneHost, Transform, Vec3};
pub use stable_id::{derive_file_id, GlobalObjectId, StableIdSubject};
pub use world::{ObjectSpec, SceneObject, SceneWorld, ScriptComponent};
