//! Fleet stances
//!
//! A stance is issued per fleet by the player or the AI and is read-only
//! input to combat. It biases targeting and adds flat damage bonuses.

use serde::{Deserialize, Serialize};

use crate::combat::constants::{
    ENGAGE_ATTACK_BONUS, ENGAGE_RETALIATION_BONUS, FORMATION_BONUS, RAID_BONUS,
    RAID_VS_ENGAGE_EXTRA, RUSH_BONUS,
};

/// Tactical directive for a fleet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Stance {
    /// Close in and fight
    Engage,
    /// Charge the enemy line
    Rush,
    /// Hold formation around high-value units
    Formation,
    /// Go after transports and civilian hulls
    #[serde(alias = "transports")]
    Raid,
    /// Try to leave the sector before firing starts
    Retreat,
    #[default]
    Default,
}

/// Which half of an exchange a hit belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FirePhase {
    Attack,
    Retaliation,
}

impl Stance {
    /// Fraction of the firepower amount added for this stance matchup
    pub fn bonus_against(self, defender: Stance, phase: FirePhase) -> f64 {
        use Stance::*;

        match (self, defender) {
            (Engage, Rush | Formation) => match phase {
                FirePhase::Attack => ENGAGE_ATTACK_BONUS,
                FirePhase::Retaliation => ENGAGE_RETALIATION_BONUS,
            },
            (Raid, Engage) => RAID_BONUS + RAID_VS_ENGAGE_EXTRA,
            (Raid, Formation) => 0.0,
            (Raid, _) => RAID_BONUS,
            (Rush, Retreat | Raid) => RUSH_BONUS,
            (Formation, Raid | Rush) => FORMATION_BONUS,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engage_bonus_depends_on_phase() {
        let attack = Stance::Engage.bonus_against(Stance::Rush, FirePhase::Attack);
        let retaliation = Stance::Engage.bonus_against(Stance::Rush, FirePhase::Retaliation);
        assert_eq!(attack, 0.15);
        assert_eq!(retaliation, 0.12);
    }

    #[test]
    fn test_raid_bonus_stacks_against_engage() {
        let vs_default = Stance::Raid.bonus_against(Stance::Default, FirePhase::Attack);
        let vs_engage = Stance::Raid.bonus_against(Stance::Engage, FirePhase::Attack);
        assert_eq!(vs_default, 0.17);
        assert!((vs_engage - 0.30).abs() < 1e-9);
    }

    #[test]
    fn test_raid_blunted_by_formation() {
        assert_eq!(Stance::Raid.bonus_against(Stance::Formation, FirePhase::Attack), 0.0);
    }

    #[test]
    fn test_formation_punishes_raiders() {
        assert_eq!(Stance::Formation.bonus_against(Stance::Raid, FirePhase::Attack), 0.17);
        assert_eq!(Stance::Formation.bonus_against(Stance::Rush, FirePhase::Attack), 0.17);
        assert_eq!(Stance::Formation.bonus_against(Stance::Engage, FirePhase::Attack), 0.0);
    }

    #[test]
    fn test_transports_alias_parses_as_raid() {
        #[derive(Deserialize)]
        struct Wrapper {
            stance: Stance,
        }
        let parsed: Wrapper = toml::from_str("stance = \"transports\"").unwrap();
        assert_eq!(parsed.stance, Stance::Raid);
    }
}
