//! Entities - registry, needs and naming

pub mod names;
pub mod needs;
pub mod registry;

pub use names::NameGenerator;
pub use needs::{NeedChange, NeedType, Needs};
pub use registry::{Entity, EntityRegistry, EntityStatus, NewEntity};
