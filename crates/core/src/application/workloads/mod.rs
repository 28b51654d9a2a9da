// Workloads - the computations dispatched by the search workflows

pub mod factor;
pub mod pi;
pub mod primes;

pub use factor::{FactorHunt, FactorHuntOutcome, FactorPair, FactorPayload, FactorRangeWorkload};
pub use pi::{MonteCarloPi, PiEstimation, PiOutcome, PiPayload, PiSample};
pub use primes::{PrimalityVerdict, PrimalityWorkload, PrimeSweep, PrimeSweepOutcome};
