//! # Level Curve
//!
//! Pure functions mapping lifetime XP to levels. The curve is fixed:
//! each tier costs 20% more than the previous one, starting at 100 XP
//! for level 1 → 2.
//!
//! | Level | XP to next | Cumulative to reach |
//! |-------|-----------|---------------------|
//! | 1     | 100       | 0                   |
//! | 2     | 120       | 100                 |
//! | 3     | 144       | 220                 |
//! | 4     | 172       | 364                 |
//! | 5     | 207       | 536                 |
//!
//! Levels are always derived by walking the tiers from level 1. The
//! per-tier cost is floored after the exponentiation, so a closed-form
//! geometric sum would drift from these values; the iteration is the
//! contract.

/// XP required to advance from `level` to `level + 1`.
///
/// `floor(100 * 1.2^(level - 1))`. Monotonically increasing.
pub fn xp_to_next(level: u32) -> u64 {
    (100.0 * 1.2f64.powi(level as i32 - 1)).floor() as u64
}

/// Total lifetime XP required to reach `level`.
///
/// Sum of all tier costs below `level`; level 1 costs nothing.
pub fn total_xp_for_level(level: u32) -> u64 {
    (1..level).map(xp_to_next).sum()
}

/// Derive the level for a lifetime XP total.
///
/// Walks tiers upward from level 1, consuming each tier's cost while
/// the remaining XP covers it. `xp = 0` yields level 1.
pub fn level_from_xp(xp: u64) -> u32 {
    let mut level = 1;
    let mut cumulative = 0u64;

    loop {
        let need = xp_to_next(level);
        if xp >= cumulative + need {
            cumulative += need;
            level += 1;
        } else {
            return level;
        }
    }
}

/// Fraction of the current tier already earned, in `0.0..=1.0`.
///
/// Used by progress bars: how far along a user is between their
/// current level and the next one.
pub fn progress_within_level(xp: u64) -> f64 {
    let level = level_from_xp(xp);
    let floor = total_xp_for_level(level);
    let tier = xp_to_next(level);
    if tier == 0 {
        return 1.0;
    }
    (xp - floor) as f64 / tier as f64
}
