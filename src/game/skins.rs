//! Ability skins and their capability table

use serde::{Deserialize, Serialize};

/// Cosmetic skin with gameplay capabilities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Skin {
    #[default]
    Default,
    Golden,
    Speed,
    Ghost,
    Tank,
    Rainbow,
}

/// Gameplay modifiers granted by a skin
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SkinCapabilities {
    /// Lane-change speed multiplier
    pub move_speed: f32,
    /// Extra coin fraction on bucket conversion (0.25 = +25%)
    pub coin_bonus: f64,
    /// Destroys obstacles on contact
    pub destroys_obstacles: bool,
    /// Earns ghost charges at score milestones
    pub earns_ghost_charges: bool,
}

impl Skin {
    pub const ALL: [Skin; 6] = [
        Skin::Default,
        Skin::Golden,
        Skin::Speed,
        Skin::Ghost,
        Skin::Tank,
        Skin::Rainbow,
    ];

    pub fn capabilities(&self) -> SkinCapabilities {
        match self {
            Skin::Default => SkinCapabilities {
                move_speed: 1.0,
                coin_bonus: 0.0,
                destroys_obstacles: false,
                earns_ghost_charges: false,
            },
            Skin::Golden => SkinCapabilities {
                move_speed: 1.0,
                coin_bonus: 0.25,
                destroys_obstacles: false,
                earns_ghost_charges: false,
            },
            Skin::Speed => SkinCapabilities {
                move_speed: 1.2,
                coin_bonus: 0.0,
                destroys_obstacles: false,
                earns_ghost_charges: false,
            },
            Skin::Ghost => SkinCapabilities {
                move_speed: 1.0,
                coin_bonus: 0.0,
                destroys_obstacles: false,
                earns_ghost_charges: true,
            },
            Skin::Tank => SkinCapabilities {
                move_speed: 0.9,
                coin_bonus: 0.0,
                destroys_obstacles: true,
                earns_ghost_charges: false,
            },
            Skin::Rainbow => SkinCapabilities {
                move_speed: 1.1,
                coin_bonus: 0.25,
                destroys_obstacles: true,
                earns_ghost_charges: true,
            },
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Skin::Default => "default",
            Skin::Golden => "golden",
            Skin::Speed => "speed",
            Skin::Ghost => "ghost",
            Skin::Tank => "tank",
            Skin::Rainbow => "rainbow",
        }
    }

    pub fn parse(s: &str) -> Option<Skin> {
        Skin::ALL
            .into_iter()
            .find(|skin| skin.name().eq_ignore_ascii_case(s.trim()))
    }
}
