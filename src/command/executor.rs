//! Command execution - validates and applies player commands

use crate::command::{Command, CommandOutcome, RaidOutcome};
use crate::core::error::{EngineError, Result};
use crate::core::types::{ActionKind, EntityId, Timestamp};
use crate::economy::ledger::Cost;
use crate::queue::manager::EnrollRequest;
use crate::simulation::battle::{casualties, loot, resolve_battle};
use crate::simulation::cooldown::raid_key;
use crate::simulation::world::World;

/// Executes commands against a world
pub struct CommandExecutor;

impl CommandExecutor {
    pub fn execute(world: &mut World, command: Command, now: Timestamp) -> Result<CommandOutcome> {
        match command {
            Command::Enroll {
                subject,
                partner,
                action,
            } => enroll(world, subject, partner, &action, now),
            Command::Acquire { archetype, name } => acquire(world, &archetype, name, now),
            Command::Remove { entity } => remove(world, entity),
            Command::Care { entity, care } => care_for(world, entity, &care),
            Command::Raid { rival } => raid(world, &rival, now),
            Command::Pause => Ok(pause(world, now)),
            Command::Resume => Ok(resume(world, now)),
        }
    }
}

fn reject_if_paused(world: &World) -> Result<()> {
    if world.is_paused() {
        return Err(EngineError::Paused);
    }
    Ok(())
}

fn enroll(
    world: &mut World,
    subject: EntityId,
    partner: Option<EntityId>,
    kind: &ActionKind,
    now: Timestamp,
) -> Result<CommandOutcome> {
    reject_if_paused(world)?;
    let action = world.catalog.action(kind)?;
    if let Some(tech) = &action.effect.research {
        reject_if_researched(world, tech)?;
    }
    let duration_ms = action.duration.to_millis(&world.config);

    let state = &mut world.state;
    let entry = state.queue.enroll(
        &mut state.registry,
        &mut state.ledger,
        EnrollRequest {
            subject,
            partner,
            action,
            duration_ms,
        },
        now,
    )?;

    Ok(CommandOutcome::Enrolled {
        entry,
        ends_at: now.saturating_add(duration_ms),
    })
}

/// A technology is researched once: not again, and not twice at the same time
fn reject_if_researched(world: &World, tech: &str) -> Result<()> {
    let in_progress = world.state.queue.pending().iter().any(|entry| {
        world
            .catalog
            .action(&entry.action)
            .is_ok_and(|a| a.effect.research.as_deref() == Some(tech))
    });
    if in_progress || world.state.researched.contains(tech) {
        return Err(EngineError::AlreadyResearched(tech.to_string()));
    }
    Ok(())
}

fn acquire(world: &mut World, archetype: &str, name: Option<String>, now: Timestamp) -> Result<CommandOutcome> {
    let archetype = world.catalog.archetype(archetype)?;
    if !archetype.for_sale {
        return Err(EngineError::NotForSale(archetype.name.clone()));
    }
    let state = &mut world.state;
    state.ledger.pay(&archetype.cost)?;

    let name = match name {
        Some(name) => name,
        None => world.catalog.names.generate(&mut state.rng),
    };
    let entity = state.registry.spawn(archetype.template(name), now);
    tracing::debug!(entity = %entity, archetype = %archetype.name, "Acquired");
    Ok(CommandOutcome::Acquired { entity })
}

fn remove(world: &mut World, id: EntityId) -> Result<CommandOutcome> {
    let entity = world.state.registry.ensure_idle(id)?;
    let refund = world
        .catalog
        .archetype(&entity.archetype)
        .map(|a| a.sale_price(entity))
        .unwrap_or_default();

    world.state.registry.remove(id)?;
    world.state.ledger.credit_all(&refund);
    tracing::debug!(entity = %id, "Removed");
    Ok(CommandOutcome::Removed { entity: id, refund })
}

fn care_for(world: &mut World, id: EntityId, kind: &str) -> Result<CommandOutcome> {
    let care = world.catalog.care(kind)?;
    let entity = if care.requires_idle {
        world.state.registry.ensure_idle(id)?
    } else {
        world.state.registry.require(id)?
    };
    if entity.needs.is_none() {
        return Err(EngineError::InvalidSubject {
            entity: id,
            action: care.kind.clone(),
        });
    }

    let state = &mut world.state;
    state.ledger.pay(&care.cost)?;
    if let Some(needs) = state.registry.get_mut(id).and_then(|e| e.needs.as_mut()) {
        for change in &care.changes {
            needs.adjust(change.need, change.amount);
        }
    }
    Ok(CommandOutcome::Cared { entity: id })
}

fn raid(world: &mut World, rival_name: &str, now: Timestamp) -> Result<CommandOutcome> {
    reject_if_paused(world)?;
    let rival_idx = world
        .state
        .rivals
        .iter()
        .position(|r| r.name == rival_name)
        .ok_or_else(|| EngineError::UnknownRival(rival_name.to_string()))?;
    let key = raid_key(rival_name);
    world.state.cooldowns.check(&key, now)?;

    let units = world.combat_units();
    if units.is_empty() {
        return Err(EngineError::NoArmy);
    }

    // Validated; the cooldown starts whatever the result
    world
        .state
        .cooldowns
        .start(key, now, world.config.battle.raid_cooldown_ms);

    let attacker_power = world.power();
    let defender_power = world.state.rivals[rival_idx].power;
    let report = resolve_battle(
        attacker_power,
        defender_power,
        &world.config.battle,
        &mut world.state.rng,
    );

    let state = &mut world.state;
    let rival = &mut state.rivals[rival_idx];
    let taken = if report.victory {
        let taken = loot(&rival.holdings, &world.config.battle);
        rival.holdings = rival
            .holdings
            .iter()
            .map(|(kind, amount)| (kind.clone(), amount - taken.get(kind.as_str())))
            .collect::<Cost>();
        state.ledger.credit_all(&taken);
        taken
    } else {
        Cost::new()
    };
    rival.power = (rival.power * (1.0 - report.defender_attrition)).max(0.0);

    let lost = casualties(units.len(), report.attacker_attrition);
    let lost_units: Vec<EntityId> = units
        .iter()
        .rev()
        .copied()
        .filter(|id| state.registry.get(*id).is_some_and(|e| e.is_idle()))
        .take(lost)
        .collect();
    for id in &lost_units {
        state.registry.remove(*id)?;
    }

    tracing::info!(
        rival = rival_name,
        victory = report.victory,
        attacker_power,
        defender_power,
        lost = lost_units.len(),
        "Raid resolved"
    );

    Ok(CommandOutcome::Raided(RaidOutcome {
        rival: rival_name.to_string(),
        attacker_power,
        defender_power,
        report,
        loot: taken,
        lost_units,
    }))
}

fn pause(world: &mut World, now: Timestamp) -> CommandOutcome {
    let since = *world.state.paused_since.get_or_insert(now);
    tracing::info!(since, "Paused");
    CommandOutcome::Paused { since }
}

/// Pending entries that were not yet due when the pause began are pushed back
/// by the pause length
fn resume(world: &mut World, now: Timestamp) -> CommandOutcome {
    let paused_ms = match world.state.paused_since.take() {
        Some(since) => {
            let paused_ms = now.saturating_sub(since);
            world.state.queue.extend_after(since, paused_ms);
            paused_ms
        }
        None => 0,
    };
    tracing::info!(paused_ms, "Resumed");
    CommandOutcome::Resumed { paused_ms }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ActionDef, ActionDuration, Archetype, CareAction, Catalog, RivalDef, StartingEntity, Technology};
    use crate::core::config::EngineConfig;
    use crate::entity::needs::{NeedChange, NeedType};

    fn kingdom() -> World {
        let mut catalog = Catalog::new("kingdom");
        let mut soldier = Archetype::new("soldier");
        soldier.combat = true;
        soldier.cost = Cost::new().with("gold", 50);
        soldier.sale_value = Cost::new().with("gold", 20);
        for (attr, value) in [("attack", 10.0), ("defense", 8.0), ("health", 25.0)] {
            soldier.attributes.insert(attr.into(), value);
            soldier.power.insert(attr.into(), 1.0);
        }
        catalog.add_archetype(soldier);

        let mut colonist = Archetype::new("colonist");
        colonist.has_needs = true;
        colonist.for_sale = false;
        catalog.add_archetype(colonist);
        catalog.add_care(CareAction {
            kind: "feed".into(),
            cost: Cost::new().with("food", 1),
            changes: vec![
                NeedChange { need: NeedType::Hunger, amount: 30.0 },
                NeedChange { need: NeedType::Morale, amount: 10.0 },
            ],
            requires_idle: false,
        });

        catalog.add_rival(RivalDef {
            name: "Goblins".into(),
            power: 10.0,
            holdings: Cost::new().with("gold", 1000).with("food", 100),
        });
        catalog.add_rival(RivalDef {
            name: "Empire".into(),
            power: 1_000_000.0,
            holdings: Cost::new().with("gold", 1000),
        });
        catalog.starting.resources = Cost::new().with("gold", 500).with("food", 5);
        catalog.starting.entities.push(StartingEntity {
            archetype: "colonist".into(),
            name: Some("Sarah".into()),
            attributes: Default::default(),
            needs: None,
        });
        World::new(EngineConfig::default(), catalog, 0).unwrap()
    }

    #[test]
    fn test_acquire_and_remove() {
        let mut world = kingdom();
        let outcome = world
            .dispatch(
                Command::Acquire {
                    archetype: "soldier".into(),
                    name: None,
                },
                0,
            )
            .unwrap();
        let CommandOutcome::Acquired { entity } = outcome else {
            panic!("unexpected outcome {:?}", outcome);
        };
        assert_eq!(world.state.ledger.balance("gold"), 450);
        assert!(!world.state.registry.get(entity).unwrap().name.is_empty());

        world.dispatch(Command::Remove { entity }, 0).unwrap();
        assert_eq!(world.state.ledger.balance("gold"), 470);
        assert!(!world.state.registry.contains(entity));
    }

    #[test]
    fn test_research_only_once() {
        let mut world = kingdom();
        world.catalog.add_technology(Technology::new("agriculture"));
        let mut research = ActionDef::new("research_agriculture", ActionDuration::Secs(60));
        research.cost = Cost::new().with("gold", 100);
        research.effect.research = Some("agriculture".into());
        world.catalog.add_action(research);
        for name in ["Ada", "Bo"] {
            world.dispatch(Command::Acquire { archetype: "soldier".into(), name: Some(name.into()) }, 0).unwrap();
        }
        let enroll = |subject| Command::Enroll {
            subject: EntityId(subject),
            partner: None,
            action: ActionKind::from("research_agriculture"),
        };

        world.dispatch(enroll(2), 0).unwrap();
        let gold = world.state.ledger.balance("gold");
        let err = world.dispatch(enroll(3), 0).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyResearched(ref t) if t == "agriculture"));
        assert_eq!(world.state.ledger.balance("gold"), gold);

        world.complete_due(60_000);
        assert!(world.state.researched.contains("agriculture"));
        let err = world.dispatch(enroll(3), 60_000).unwrap_err();
        assert!(matches!(err, EngineError::AlreadyResearched(_)));
    }

    #[test]
    fn test_acquire_unaffordable() {
        let mut world = kingdom();
        world.state.ledger.debit(&"gold".into(), 480).unwrap();
        let err = world
            .dispatch(
                Command::Acquire {
                    archetype: "soldier".into(),
                    name: None,
                },
                0,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::InsufficientResources { .. }));
        assert_eq!(world.state.registry.len(), 1);
    }

    #[test]
    fn test_acquire_rejects_archetype_not_for_sale() {
        let mut world = kingdom();
        let err = world
            .dispatch(
                Command::Acquire {
                    archetype: "colonist".into(),
                    name: None,
                },
                0,
            )
            .unwrap_err();
        assert!(matches!(err, EngineError::NotForSale(ref name) if name == "colonist"));
        assert_eq!(world.state.ledger.balance("gold"), 500);
    }

    #[test]
    fn test_feed_pays_and_restores() {
        let mut world = kingdom();
        world.state.registry.get_mut(EntityId(1)).unwrap().needs.as_mut().unwrap().hunger = 50.0;
        world
            .dispatch(
                Command::Care {
                    entity: EntityId(1),
                    care: "feed".into(),
                },
                0,
            )
            .unwrap();
        let needs = world.state.registry.get(EntityId(1)).unwrap().needs.clone().unwrap();
        assert_eq!(needs.hunger, 80.0);
        assert_eq!(needs.morale, 90.0);
        assert_eq!(world.state.ledger.balance("food"), 4);
    }

    #[test]
    fn test_raid_needs_army() {
        let mut world = kingdom();
        let err = world.dispatch(Command::Raid { rival: "Goblins".into() }, 0).unwrap_err();
        assert!(matches!(err, EngineError::NoArmy));
        assert!(world.state.cooldowns.is_empty());

        let err = world.dispatch(Command::Raid { rival: "Nobody".into() }, 0).unwrap_err();
        assert!(matches!(err, EngineError::UnknownRival(_)));
    }

    #[test]
    fn test_raid_victory_loots_and_cools_down() {
        let mut world = kingdom();
        world
            .dispatch(Command::Acquire { archetype: "soldier".into(), name: None }, 0)
            .unwrap();

        let outcome = world.dispatch(Command::Raid { rival: "Goblins".into() }, 0).unwrap();
        let CommandOutcome::Raided(raid) = outcome else {
            panic!("expected raid outcome");
        };
        assert!(raid.report.victory);
        assert_eq!(raid.loot.get("gold"), 300);
        assert_eq!(raid.loot.get("food"), 20);
        assert_eq!(world.state.ledger.balance("gold"), 450 + 300);
        assert_eq!(world.state.rivals[0].holdings.get("gold"), 700);
        assert!(world.state.rivals[0].power < 10.0);

        let err = world.dispatch(Command::Raid { rival: "Goblins".into() }, 5_000).unwrap_err();
        assert!(matches!(err, EngineError::OnCooldown { until: 10_000, .. }));
    }

    #[test]
    fn test_raid_defeat_takes_nothing() {
        let mut world = kingdom();
        world
            .dispatch(Command::Acquire { archetype: "soldier".into(), name: None }, 0)
            .unwrap();
        let outcome = world.dispatch(Command::Raid { rival: "Empire".into() }, 0).unwrap();
        let CommandOutcome::Raided(raid) = outcome else {
            panic!("expected raid outcome");
        };
        assert!(!raid.report.victory);
        assert!(raid.loot.is_empty());
        assert_eq!(world.state.rivals[1].holdings.get("gold"), 1000);
    }

    #[test]
    fn test_pause_blocks_enroll_and_raid() {
        let mut world = kingdom();
        world.dispatch(Command::Pause, 100).unwrap();
        let err = world.dispatch(Command::Raid { rival: "Goblins".into() }, 200).unwrap_err();
        assert!(matches!(err, EngineError::Paused));

        let outcome = world.dispatch(Command::Resume, 1_100).unwrap();
        assert_eq!(outcome, CommandOutcome::Resumed { paused_ms: 1_000 });
        assert!(!world.is_paused());
    }

    #[test]
    fn test_command_json() {
        let command: Command =
            serde_json::from_str(r#"{"command":"enroll","subject":3,"action":"train_soldier"}"#).unwrap();
        assert_eq!(
            command,
            Command::Enroll {
                subject: EntityId(3),
                partner: None,
                action: ActionKind::from("train_soldier"),
            }
        );
    }
}
