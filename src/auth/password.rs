use bcrypt::DEFAULT_COST;
use thiserror::Error;

/// bcrypt's accepted work-factor range
pub const MIN_COST: u32 = 4;
pub const MAX_COST: u32 = 31;

/// bcrypt only reads this many bytes of input
const MAX_PASSWORD_BYTES: usize = 72;

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("password longer than 72 bytes")]
    TooLong,

    #[error("failed to hash password: {0}")]
    Hash(#[from] bcrypt::BcryptError),
}

/// bcrypt hasher with a fixed work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: DEFAULT_COST }
    }
}

impl PasswordHasher {
    /// Use `cost_override` when it lies in 4..=31, otherwise the default cost
    pub fn new(cost_override: Option<u32>) -> Self {
        match cost_override {
            Some(cost) if (MIN_COST..=MAX_COST).contains(&cost) => Self { cost },
            Some(cost) => {
                tracing::warn!("Ignoring out-of-range bcrypt cost {}, using {}", cost, DEFAULT_COST);
                Self::default()
            }
            None => Self::default(),
        }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        if plain.len() > MAX_PASSWORD_BYTES {
            return Err(PasswordError::TooLong);
        }
        Ok(bcrypt::hash(plain, self.cost)?)
    }

    /// Constant-time check of `plain` against a stored hash. Any failure,
    /// including a malformed hash, is just `false`.
    pub fn verify(&self, hashed: &str, plain: &str) -> bool {
        compare_password(hashed, plain)
    }
}

/// Hash with the default work factor
pub fn hash_password(plain: &str) -> Result<String, PasswordError> {
    PasswordHasher::default().hash(plain)
}

pub fn compare_password(hashed: &str, plain: &str) -> bool {
    if plain.len() > MAX_PASSWORD_BYTES {
        return false;
    }
    bcrypt::verify(plain, hashed).unwrap_or(false)
}
