//! Per-frame GPU staging buffers
//!
//! Vertex, index and draw-uniform data are appended during a flush and the
//! write cursor is rewound before the next one.

/// Initial buffer size (64KB)
const INITIAL_BUFFER_SIZE: u64 = 64 * 1024;

/// Capacity multiplier on growth
const BUFFER_GROWTH_FACTOR: u64 = 2;

/// GPU buffer that doubles its capacity when an upload does not fit.
pub struct GrowableBuffer {
    buffer: wgpu::Buffer,
    usage: wgpu::BufferUsages,
    capacity: u64,
    used: u64,
    label: &'static str,
}

impl GrowableBuffer {
    pub fn new(device: &wgpu::Device, usage: wgpu::BufferUsages, label: &'static str) -> Self {
        Self {
            buffer: Self::allocate(device, usage, label, INITIAL_BUFFER_SIZE),
            usage,
            capacity: INITIAL_BUFFER_SIZE,
            used: 0,
            label,
        }
    }

    fn allocate(device: &wgpu::Device, usage: wgpu::BufferUsages, label: &str, size: u64) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some(label),
            size,
            usage: usage | wgpu::BufferUsages::COPY_SRC | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    /// Make room for `additional_bytes` past the write cursor.
    ///
    /// Grown buffers keep the bytes already written. Returns true if the
    /// buffer was replaced, which invalidates bind groups built on it.
    pub fn ensure_capacity(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, additional_bytes: u64) -> bool {
        let required = self.used + additional_bytes;
        if required <= self.capacity {
            return false;
        }

        let mut new_capacity = self.capacity * BUFFER_GROWTH_FACTOR;
        while new_capacity < required {
            new_capacity *= BUFFER_GROWTH_FACTOR;
        }

        tracing::debug!(
            "Growing buffer '{}': {} -> {} bytes (preserving {} bytes)",
            self.label,
            self.capacity,
            new_capacity,
            self.used
        );

        let new_buffer = Self::allocate(device, self.usage, self.label, new_capacity);
        if self.used > 0 {
            let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Buffer Grow Copy"),
            });
            encoder.copy_buffer_to_buffer(&self.buffer, 0, &new_buffer, 0, self.used);
            queue.submit(std::iter::once(encoder.finish()));
        }

        self.buffer = new_buffer;
        self.capacity = new_capacity;
        true
    }

    /// Append `data`, growing first if needed. Returns the byte offset.
    ///
    /// The cursor is kept 4-byte aligned for `COPY_BUFFER_ALIGNMENT`.
    pub fn upload(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, data: &[u8]) -> u64 {
        let len = data.len() as u64;
        let aligned = (len + 3) & !3;
        self.ensure_capacity(device, queue, aligned);

        let offset = self.used;
        if len % 4 == 0 {
            queue.write_buffer(&self.buffer, offset, data);
        } else {
            let mut padded = data.to_vec();
            padded.resize(aligned as usize, 0);
            queue.write_buffer(&self.buffer, offset, &padded);
        }
        self.used += aligned;
        offset
    }

    /// Rewind the write cursor.
    pub fn reset(&mut self) {
        self.used = 0;
    }

    pub fn buffer(&self) -> &wgpu::Buffer {
        &self.buffer
    }

    pub fn used(&self) -> u64 {
        self.used
    }

    pub fn capacity(&self) -> u64 {
        self.capacity
    }
}
