// Conversion constants used by the shoreline lookup tables
pub const SQ_METERS_PER_ACRE: f64 = 4046.873;
pub const CUBIC_METERS_PER_ACRE_FOOT: f64 = 1233.489;
pub const FEET_PER_METER: f64 = 3.280833;

pub fn feet_to_meters(feet: f64) -> f64 {
    feet / FEET_PER_METER
}

pub fn sq_meters_to_acres(sq_meters: f64) -> f64 {
    sq_meters / SQ_METERS_PER_ACRE
}

pub fn cubic_meters_to_acre_feet(cubic_meters: f64) -> f64 {
    cubic_meters / CUBIC_METERS_PER_ACRE_FOOT
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: u32) -> f64 {
    let scale = 10f64.powi(decimals as i32);
    (value * scale).round() / scale
}
