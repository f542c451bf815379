pub mod battle;
pub mod cooldown;
pub mod snapshot;
pub mod tick;
pub mod world;

pub use battle::{calculate_power, casualties, loot, resolve_battle, BattleReport};
pub use cooldown::Cooldowns;
pub use snapshot::{EntityView, QueueView, Snapshot};
pub use tick::{run_tick, SimulationEvent};
pub use world::{GameState, Rival, World};
