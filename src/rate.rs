//! Rate math for recipes, facilities and proliferator modifiers
//!
//! All rates are items per minute. Nothing here divides by zero or panics:
//! degenerate inputs produce a rate of 0.

use crate::models::{Modifier, ModifierMode};

pub const SECONDS_PER_MINUTE: f64 = 60.0;

pub const MAX_MODIFIER_LEVEL: u8 = 3;

pub const SPEED_MULTIPLIERS: [f64; 4] = [1.0, 1.25, 1.5, 2.0];

pub const PRODUCT_MULTIPLIERS: [f64; 4] = [1.0, 1.125, 1.2, 1.25];

/// Charges held by one charge item, by level.
pub const CHARGES_PER_ITEM: [f64; 4] = [0.0, 12.0, 24.0, 60.0];

fn level_index(level: u8) -> usize {
    level.min(MAX_MODIFIER_LEVEL) as usize
}

pub fn speed_multiplier(level: u8) -> f64 {
    SPEED_MULTIPLIERS[level_index(level)]
}

pub fn product_multiplier(level: u8) -> f64 {
    PRODUCT_MULTIPLIERS[level_index(level)]
}

pub fn modifier_multiplier(mode: ModifierMode, level: u8) -> f64 {
    match mode {
        ModifierMode::None => 1.0,
        ModifierMode::Speed => speed_multiplier(level),
        ModifierMode::Product => product_multiplier(level),
    }
}

/// Unmodified per-facility rate for `count` items per cycle.
fn base_rate(count: f64, cycle_seconds: f64, facility_speed: f64) -> f64 {
    if !(cycle_seconds > 0.0) || !cycle_seconds.is_finite() {
        return 0.0;
    }
    let rate = count * (SECONDS_PER_MINUTE / cycle_seconds) * facility_speed;
    if rate.is_finite() { rate } else { 0.0 }
}

/// Output rate of one facility for an output slot of `count` per cycle.
pub fn output_rate(count: f64, cycle_seconds: f64, facility_speed: f64, modifier: &Modifier) -> f64 {
    base_rate(count, cycle_seconds, facility_speed) * modifier_multiplier(modifier.mode, modifier.level)
}

/// Input draw of one facility for an input slot of `count` per cycle.
///
/// Product mode needs fewer inputs per unit of output, so the base rate is
/// divided by the product multiplier.
pub fn input_rate(count: f64, cycle_seconds: f64, facility_speed: f64, modifier: &Modifier) -> f64 {
    let base = base_rate(count, cycle_seconds, facility_speed);
    match modifier.mode {
        ModifierMode::None => base,
        ModifierMode::Speed => base * speed_multiplier(modifier.level),
        ModifierMode::Product => base / product_multiplier(modifier.level),
    }
}

pub fn required_facilities(required_rate: f64, output_rate_per_facility: f64) -> f64 {
    if !(output_rate_per_facility > 0.0) || !output_rate_per_facility.is_finite() {
        return 0.0;
    }
    let count = required_rate / output_rate_per_facility;
    if count.is_finite() { count } else { 0.0 }
}

/// Mining yield of one facility, given the seconds needed per item.
pub fn mining_rate(mining_time: f64, facility_speed: f64) -> f64 {
    base_rate(1.0, mining_time, facility_speed)
}

pub fn crafts_per_minute(cycle_seconds: f64, facility_speed: f64, modifier: &Modifier) -> f64 {
    let crafts = base_rate(1.0, cycle_seconds, facility_speed);
    match modifier.mode {
        ModifierMode::Speed => crafts * speed_multiplier(modifier.level),
        _ => crafts,
    }
}

/// Charge items consumed per minute by `facility_count` facilities.
///
/// Every input item of a craft takes one charge. Returns `None` when the
/// modifier is inert or the recipe has no inputs.
pub fn modifier_consumption(
    charges_per_craft: f64,
    cycle_seconds: f64,
    facility_speed: f64,
    facility_count: f64,
    modifier: &Modifier,
) -> Option<f64> {
    if modifier.is_inert() || !(charges_per_craft > 0.0) {
        return None;
    }
    let per_item = CHARGES_PER_ITEM[level_index(modifier.level)];
    if per_item <= 0.0 {
        return None;
    }
    let crafts = crafts_per_minute(cycle_seconds, facility_speed, modifier);
    Some(charges_per_craft * crafts * facility_count / per_item)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn multiplier_tables() {
        assert_eq!(modifier_multiplier(ModifierMode::Speed, 2), 1.5);
        assert_eq!(modifier_multiplier(ModifierMode::Product, 2), 1.2);
        for level in 0..=3 {
            assert_eq!(modifier_multiplier(ModifierMode::None, level), 1.0);
        }
        assert_eq!(modifier_multiplier(ModifierMode::Speed, 0), 1.0);
        assert_eq!(modifier_multiplier(ModifierMode::Product, 0), 1.0);
    }

    #[test]
    fn level_is_clamped() {
        assert_eq!(speed_multiplier(9), speed_multiplier(3));
        assert_eq!(product_multiplier(200), 1.25);
    }

    #[test]
    fn product_mode_reduces_inputs() {
        let modifier = Modifier::new(ModifierMode::Product, 3);
        assert!(close(input_rate(10.0, 60.0, 1.5, &modifier), 12.0));
    }

    #[test]
    fn speed_mode_scales_inputs_like_outputs() {
        let modifier = Modifier::new(ModifierMode::Speed, 1);
        let out = output_rate(2.0, 4.0, 1.0, &modifier);
        let inp = input_rate(2.0, 4.0, 1.0, &modifier);
        assert!(close(out, 37.5));
        assert!(close(inp, out));
    }

    #[test]
    fn required_facilities_never_divides_by_zero() {
        assert_eq!(required_facilities(10.0, 0.0), 0.0);
        assert_eq!(required_facilities(10.0, -2.0), 0.0);
        assert_eq!(required_facilities(10.0, f64::NAN), 0.0);
        assert!(close(required_facilities(10.0, 5.0), 2.0));
    }

    #[test]
    fn degenerate_cycle_yields_zero_rate() {
        let none = Modifier::default();
        assert_eq!(output_rate(1.0, 0.0, 1.0, &none), 0.0);
        assert_eq!(output_rate(1.0, -3.0, 1.0, &none), 0.0);
        assert_eq!(input_rate(1.0, f64::INFINITY, 1.0, &none), 0.0);
    }

    #[test]
    fn mining_rate_is_sixty_over_time() {
        assert!(close(mining_rate(2.0, 1.0), 30.0));
        assert!(close(mining_rate(2.0, 2.0), 60.0));
    }

    #[test]
    fn modifier_consumption_counts_charges() {
        let modifier = Modifier::new(ModifierMode::Speed, 1);
        // 3 charges per craft, 1 craft/s at speed 1 boosted 1.25x, 2 facilities, 12 charges per item
        let used = modifier_consumption(3.0, 60.0 / 60.0, 1.0, 2.0, &modifier).unwrap();
        assert!(close(used, 3.0 * 60.0 * 1.25 * 2.0 / 12.0));
    }

    #[test]
    fn inert_modifier_consumes_nothing() {
        assert!(modifier_consumption(3.0, 1.0, 1.0, 1.0, &Modifier::default()).is_none());
        assert!(modifier_consumption(3.0, 1.0, 1.0, 1.0, &Modifier::new(ModifierMode::Product, 0)).is_none());
        assert!(modifier_consumption(0.0, 1.0, 1.0, 1.0, &Modifier::new(ModifierMode::Product, 2)).is_none());
    }
}
