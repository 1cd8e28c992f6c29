//! Combat balance tables - all fixed values in one place
//!
//! Behavioural knobs that scenarios may override live in
//! `core::config::CombatConfig`; these tables are the game's balance sheet.

// Accuracy by experience rank (Unknown, Green, Regular, Veteran, Elite, Legendary)
pub const ACCURACY_UNKNOWN: f64 = 0.70;
pub const ACCURACY_GREEN: f64 = 0.50;
pub const ACCURACY_REGULAR: f64 = 0.60;
pub const ACCURACY_VETERAN: f64 = 0.70;
pub const ACCURACY_ELITE: f64 = 1.00;
pub const ACCURACY_LEGENDARY: f64 = 1.10;
pub const HERO_ACCURACY_BONUS: f64 = 0.80;

// Damage control by experience rank
pub const DAMAGE_CONTROL_UNKNOWN: f64 = 0.55;
pub const DAMAGE_CONTROL_GREEN: f64 = 0.40;
pub const DAMAGE_CONTROL_REGULAR: f64 = 0.45;
pub const DAMAGE_CONTROL_VETERAN: f64 = 0.50;
pub const DAMAGE_CONTROL_ELITE: f64 = 0.57;
pub const DAMAGE_CONTROL_LEGENDARY: f64 = 0.65;
/// Heroes and stationary platforms shrug off more of every hit
pub const HARDENED_DAMAGE_CONTROL_BONUS: f64 = 0.55;
/// Damage scales with (ceiling - damage control)
pub const DAMAGE_CONTROL_CEILING: f64 = 1.5;

// Command-ship density tiers (share of the owner's units that are command class)
pub const COMMAND_DENSITY_LOW: f64 = 0.10;
pub const COMMAND_DENSITY_HIGH: f64 = 0.25;
pub const COMMAND_MALUS: f64 = -0.15;
pub const COMMAND_BONUS_MODEST: f64 = 0.01;
pub const COMMAND_BONUS_STRONG: f64 = 0.10;

// Scissor bonus
pub const SCISSOR_BONUS: f64 = 0.35;

// Stance bonuses (fraction of the firepower amount)
pub const ENGAGE_ATTACK_BONUS: f64 = 0.15;
pub const ENGAGE_RETALIATION_BONUS: f64 = 0.12;
pub const RAID_BONUS: f64 = 0.17;
pub const RAID_VS_ENGAGE_EXTRA: f64 = 0.13;
pub const RUSH_BONUS: f64 = 0.12;
pub const FORMATION_BONUS: f64 = 0.17;

// Favor the Bold
pub const BOLD_CLAMP_RATIO: f64 = 10.0;
pub const BOLD_ASYMMETRY_RATIO: f64 = 2.0;
pub const BOLD_CLAMP_UNDERDOG: f64 = 1.3;
pub const BOLD_CLAMP_OVERWHELMING: f64 = 0.9;

/// Underdog tiers: (minimum turn, minimum attacker durability, multiplier),
/// checked from the top; the last entry is the baseline.
pub const BOLD_UNDERDOG_TIERS: [(u32, f64, f64); 4] = [
    (150, 5000.0, 1.7),
    (100, 2000.0, 1.5),
    (50, 0.0, 1.3),
    (0, 0.0, 1.15),
];

/// Overwhelming-force tiers: (minimum turn, multiplier), checked from the top
pub const BOLD_MALUS_TIERS: [(u32, f64); 4] = [(150, 0.45), (100, 0.6), (50, 0.7), (0, 0.8)];

// Maneuverability: factor = rating * step, capped
pub const MANEUVERABILITY_STEP: f64 = 0.04;
pub const MANEUVERABILITY_CAP: f64 = 0.4;

// Sticky target keep chances
pub const STICKY_KEEP_BORG: f64 = 0.95;
pub const STICKY_KEEP_HIGH_SHIELD: f64 = 0.75;
pub const STICKY_KEEP_HIGH_HULL: f64 = 0.5;
/// Shield or hull above this share of maximum counts as "high"
pub const STICKY_HIGH_THRESHOLD: f64 = 0.5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accuracy_ranks_reasonable() {
        assert!(ACCURACY_GREEN < ACCURACY_REGULAR);
        assert!(ACCURACY_REGULAR < ACCURACY_VETERAN);
        assert!(ACCURACY_VETERAN < ACCURACY_ELITE);
        assert!(ACCURACY_ELITE < ACCURACY_LEGENDARY);
    }

    #[test]
    fn test_damage_control_never_negates_damage() {
        let max = DAMAGE_CONTROL_LEGENDARY + HARDENED_DAMAGE_CONTROL_BONUS;
        assert!(DAMAGE_CONTROL_CEILING - max > 0.0);
    }

    #[test]
    fn test_bold_tiers_monotonic() {
        for pair in BOLD_UNDERDOG_TIERS.windows(2) {
            assert!(pair[0].2 > pair[1].2);
        }
        for pair in BOLD_MALUS_TIERS.windows(2) {
            assert!(pair[0].1 < pair[1].1);
        }
    }
}
