//! Sealbox configuration.

/// Tuning for envelope I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealboxConfig {
    /// Plaintext bytes encrypted per body line. Values too large for the
    /// decoder's line limit are clamped.
    pub chunk_size: usize,
    /// Bytes requested per read from a file or source.
    pub read_buffer_size: usize,
}

impl Default for SealboxConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1024,
            read_buffer_size: 4096,
        }
    }
}
