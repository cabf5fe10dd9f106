//! Reusable Scratch Sample Buffer
//!
//! Sits between the sample source and the hardware write pointer. Allocated
//! capacity only ever grows; the logical length goes back to zero after each
//! fill cycle so the render path stops allocating once it has seen its
//! largest request.

/// Grow-only interleaved f32 buffer
#[derive(Debug, Default)]
pub struct ScratchBuffer {
    samples: Vec<f32>,
}

impl ScratchBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate room for `samples` samples
    pub fn with_capacity(samples: usize) -> Self {
        Self {
            samples: Vec::with_capacity(samples),
        }
    }

    /// Set the logical length to `len` and return the zeroed samples
    ///
    /// Reallocates only when `len` exceeds the current capacity.
    pub fn prepare(&mut self, len: usize) -> &mut [f32] {
        self.samples.clear();
        self.samples.resize(len, 0.0);
        &mut self.samples
    }

    /// Reset the logical length, keeping the allocation
    pub fn clear(&mut self) {
        self.samples.clear();
    }

    /// Current logical length in samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Allocated capacity in samples
    pub fn capacity(&self) -> usize {
        self.samples.capacity()
    }
}
