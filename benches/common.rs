#![allow(dead_code)]

use std::sync::Once;

use soa_ecs::prelude::*;

pub const AGENTS_SMALL: usize = 10_000;
pub const AGENTS_MED: usize = 100_000;

#[derive(Clone, Copy, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

#[derive(Clone, Copy, Default)]
pub struct Wealth {
    pub value: f32,
}

#[derive(Clone, Copy, Default)]
pub struct Productivity {
    pub rate: f32,
}

static INIT: Once = Once::new();

pub fn init_components() {
    INIT.call_once(|| {
        register_component::<Position>().unwrap();
        register_component::<Wealth>().unwrap();
        register_component::<Productivity>().unwrap();
    });
}

pub fn populate(world: &mut World, agent_count: usize) {
    for _ in 0..agent_count {
        world
            .spawn((
                Position { x: 0.0, y: 0.0 },
                Wealth { value: 100.0 },
                Productivity { rate: 1.0 },
            ))
            .unwrap();
    }
}
