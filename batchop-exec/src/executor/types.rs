use batchop_core::EngineError;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Maximum number of leaf actions running at once across the whole tree.
    pub pool_size: usize,
}

impl EngineConfig {
    pub const DEFAULT_POOL_SIZE: usize = 4;

    pub fn validate(&self) -> Result<(), EngineError> {
        if self.pool_size == 0 {
            return Err(EngineError::InvalidPoolSize(self.pool_size));
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            pool_size: Self::DEFAULT_POOL_SIZE,
        }
    }
}
