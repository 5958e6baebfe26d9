//! # clipswap_core - ClipSwap Core
//!
//! Zero-dependency primitives shared by the ClipSwap crates:
//! - **Clips**: decoded audio resources handed out as cheap shared handles
//! - **Ids**: generational object ids and coordinator ids
//! - **Host**: the object graph a host application exposes, plus an
//!   in-memory implementation used by the runtime and tests
//!
//! Nothing in here knows about overrides or loading; those live in
//! `clipswap_services`.

pub mod clip;
pub mod host;
pub mod id;

pub use clip::*;
pub use host::*;
pub use id::*;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::clip::{AudioClip, AudioFormat, ClipHandle};
    pub use crate::host::{ObjectGraph, SceneGraph};
    pub use crate::id::{CoordinatorId, ObjectId};
}
