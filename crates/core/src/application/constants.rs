// Dispatch constants (no magic values)

/// Upper watermark as a multiple of the worker count
pub const UPPER_BOUND_FACTOR: usize = 3;

/// Largest seed handed to a Monte-Carlo Pi job (seeds are drawn from 0..=65535)
pub const PI_SEED_MAX: u64 = 65_535;

/// Significant digits kept when dividing the Pi estimate
pub const PI_ESTIMATE_PRECISION: u64 = 100;

/// Default multiplier applied to ln(n) when sizing factor-hunt chunks
pub const DEFAULT_CHUNK_SCALE: f64 = 1.0;
