//! Cross-module scenarios
//!
//! Unit tests live next to the code they cover. These exercise several
//! subsystems together: transform hierarchies under random edits, terrain on
//! a live scene and physics world, and the entity world end to end.

mod terrain_scenarios;
mod transform_consistency;
mod world_scenarios;
