//! Idle Engine - Tick-driven queue progression for idle strategy games

pub mod catalog;
pub mod command;
pub mod core;
pub mod economy;
pub mod entity;
pub mod persistence;
pub mod queue;
pub mod runtime;
pub mod simulation;
