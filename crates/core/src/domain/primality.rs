// Probabilistic primality testing on arbitrary-precision integers
//
// Miller-Rabin with random witnesses, optionally gated by a Fermat check.
// Both are one-sided: a prime is never reported composite.

use crate::domain::error::{DomainError, Result};
use num_bigint::{BigUint, RandBigInt};
use num_traits::{One, Zero};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Default number of independent witness trials
pub const DEFAULT_TRIALS: u32 = 3;

/// Which test a primality payload runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimalityTest {
    /// Deterministic odd trial division up to isqrt(n)
    TrialDivision,
    Fermat,
    MillerRabin,
    /// Miller-Rabin AND Fermat
    Combined,
}

impl std::str::FromStr for PrimalityTest {
    type Err = DomainError;

    /// Accepts names and the numeric codes operators already know (0/1/2)
    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "0" | "naive" | "trial-division" => Ok(PrimalityTest::TrialDivision),
            "1" | "fermat" => Ok(PrimalityTest::Fermat),
            "2" | "miller-rabin" | "mr" => Ok(PrimalityTest::MillerRabin),
            "combined" => Ok(PrimalityTest::Combined),
            other => Err(DomainError::InvalidInput(format!(
                "unknown primality test: {}",
                other
            ))),
        }
    }
}

impl std::fmt::Display for PrimalityTest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PrimalityTest::TrialDivision => write!(f, "trial-division"),
            PrimalityTest::Fermat => write!(f, "fermat"),
            PrimalityTest::MillerRabin => write!(f, "miller-rabin"),
            PrimalityTest::Combined => write!(f, "combined"),
        }
    }
}

/// Primality oracle with a fixed witness trial count
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrimalityOracle {
    trials: u32,
}

impl Default for PrimalityOracle {
    fn default() -> Self {
        Self {
            trials: DEFAULT_TRIALS,
        }
    }
}

impl PrimalityOracle {
    /// # Errors
    /// - `DomainError::InvalidInput` if `trials == 0`
    pub fn new(trials: u32) -> Result<Self> {
        if trials == 0 {
            return Err(DomainError::InvalidInput(
                "trial count must be at least 1".to_string(),
            ));
        }
        Ok(Self { trials })
    }

    pub fn trials(&self) -> u32 {
        self.trials
    }

    /// Miller-Rabin with thread-local randomness
    pub fn is_probable_prime(&self, n: &BigUint) -> bool {
        self.is_probable_prime_with(n, &mut rand::thread_rng())
    }

    /// Miller-Rabin drawing witnesses from `rng`
    pub fn is_probable_prime_with<G: Rng + ?Sized>(&self, n: &BigUint, rng: &mut G) -> bool {
        let two = BigUint::from(2u32);
        if *n == two {
            return true;
        }
        if n.is_zero() || n.is_one() || is_even(n) {
            return false;
        }

        let n_minus_one = n - 1u32;
        let (d, s) = split_odd_part(&n_minus_one);

        for _ in 0..self.trials {
            // uniform over [2, n-1]
            let witness = rng.gen_biguint_range(&two, n);
            if !strong_probe(n, &n_minus_one, &witness, &d, s) {
                return false;
            }
        }
        true
    }

    /// Fermat check with thread-local randomness
    pub fn fermat(&self, n: &BigUint) -> bool {
        self.fermat_with(n, &mut rand::thread_rng())
    }

    /// Fermat check: a^(n-1) mod n == 1 for `trials` bases drawn from [1, n-1]
    pub fn fermat_with<G: Rng + ?Sized>(&self, n: &BigUint, rng: &mut G) -> bool {
        if *n <= BigUint::one() {
            return false;
        }
        let one = BigUint::one();
        let n_minus_one = n - 1u32;
        for _ in 0..self.trials {
            let base = rng.gen_biguint_range(&one, n);
            if !base.modpow(&n_minus_one, n).is_one() {
                return false;
            }
        }
        true
    }

    /// Miller-Rabin AND Fermat, as used to filter factor candidates
    pub fn is_prime_combined(&self, n: &BigUint) -> bool {
        self.is_prime_combined_with(n, &mut rand::thread_rng())
    }

    pub fn is_prime_combined_with<G: Rng + ?Sized>(&self, n: &BigUint, rng: &mut G) -> bool {
        self.is_probable_prime_with(n, rng) && self.fermat_with(n, rng)
    }

    /// Run the selected test
    pub fn check(&self, test: PrimalityTest, n: &BigUint) -> bool {
        match test {
            PrimalityTest::TrialDivision => trial_division(n),
            PrimalityTest::Fermat => self.fermat(n),
            PrimalityTest::MillerRabin => self.is_probable_prime(n),
            PrimalityTest::Combined => self.is_prime_combined(n),
        }
    }
}

/// Decompose `n - 1 = d * 2^s` with `d` odd
///
/// Returns `None` for `n < 2`, where there is nothing to decompose.
pub fn decompose(n: &BigUint) -> Option<(BigUint, u64)> {
    if *n < BigUint::from(2u32) {
        return None;
    }
    Some(split_odd_part(&(n - 1u32)))
}

/// One Miller-Rabin round for a fixed witness `a`
///
/// Returns true if `a` fails to prove `n` composite. Only meaningful for odd
/// `n > 2` and `2 <= a <= n - 2`; anything else returns false.
pub fn witness_passes(n: &BigUint, a: &BigUint) -> bool {
    let two = BigUint::from(2u32);
    if *n <= two || is_even(n) || *a < two || *a >= *n {
        return false;
    }
    let n_minus_one = n - 1u32;
    let (d, s) = split_odd_part(&n_minus_one);
    strong_probe(n, &n_minus_one, a, &d, s)
}

/// Deterministic trial division by odd numbers up to isqrt(n)
pub fn trial_division(n: &BigUint) -> bool {
    let two = BigUint::from(2u32);
    if *n == two {
        return true;
    }
    if *n < two || is_even(n) {
        return false;
    }
    let limit = n.sqrt();
    let mut divisor = BigUint::from(3u32);
    while divisor <= limit {
        if (n % &divisor).is_zero() {
            return false;
        }
        divisor += 2u32;
    }
    true
}

/// Random probable prime with exactly `digits` decimal digits
///
/// # Errors
/// - `DomainError::InvalidInput` if `digits == 0`
pub fn random_prime_with_digits<G: Rng + ?Sized>(
    oracle: &PrimalityOracle,
    digits: u32,
    rng: &mut G,
) -> Result<BigUint> {
    if digits == 0 {
        return Err(DomainError::InvalidInput(
            "prime must have at least one digit".to_string(),
        ));
    }
    let ten = BigUint::from(10u32);
    let low = ten.pow(digits - 1);
    let high = ten.pow(digits);
    loop {
        let candidate = rng.gen_biguint_range(&low, &high);
        if oracle.is_probable_prime_with(&candidate, rng) {
            return Ok(candidate);
        }
    }
}

/// Product of two random primes of `digits` digits each
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SemiPrime {
    #[serde(with = "crate::domain::serde_decimal")]
    pub p: BigUint,
    #[serde(with = "crate::domain::serde_decimal")]
    pub q: BigUint,
    #[serde(with = "crate::domain::serde_decimal")]
    pub product: BigUint,
}

pub fn semi_prime_with_digits<G: Rng + ?Sized>(
    oracle: &PrimalityOracle,
    digits: u32,
    rng: &mut G,
) -> Result<SemiPrime> {
    let p = random_prime_with_digits(oracle, digits, rng)?;
    let q = random_prime_with_digits(oracle, digits, rng)?;
    let product = &p * &q;
    Ok(SemiPrime { p, q, product })
}

fn is_even(n: &BigUint) -> bool {
    !n.bit(0)
}

/// Split `m` into (odd part, power of two); `m` must be non-zero
fn split_odd_part(m: &BigUint) -> (BigUint, u64) {
    let s = m.trailing_zeros().unwrap_or(0);
    (m >> s, s)
}

fn strong_probe(n: &BigUint, n_minus_one: &BigUint, a: &BigUint, d: &BigUint, s: u64) -> bool {
    let mut x = a.modpow(d, n);
    if x.is_one() || x == *n_minus_one {
        return true;
    }
    for _ in 1..s {
        x = (&x * &x) % n;
        if x == *n_minus_one {
            return true;
        }
    }
    false
}
