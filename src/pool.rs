pub trait Pooled {
    /// What a particle leaves behind when it is released.
    type Remains;

    fn bucket(&self) -> usize;

    /// Clear per-lifetime state before the slot is reused. Returns whatever
    /// terminal behavior the particle was carrying, exactly once.
    fn retire(&mut self) -> Option<Self::Remains>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(usize);

impl Handle {
    pub const fn index(self) -> usize {
        self.0
    }
}

// Every slot is either on the free stack or in exactly one bucket.
#[derive(Debug, Clone)]
pub struct ParticlePool<T> {
    slots: Vec<T>,
    free: Vec<usize>,
    buckets: Vec<Vec<Handle>>,
}

impl<T: Pooled> ParticlePool<T> {
    pub fn new(bucket_count: usize) -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            buckets: vec![Vec::new(); bucket_count],
        }
    }

    pub fn with_capacity(bucket_count: usize, capacity: usize) -> Self {
        Self {
            slots: Vec::with_capacity(capacity),
            free: Vec::with_capacity(capacity),
            buckets: vec![Vec::new(); bucket_count],
        }
    }

    /// Take a free slot (or grow the arena), fill it and make it active in
    /// the particle's bucket.
    pub fn add(&mut self, particle: T) -> Handle {
        let bucket = particle.bucket();
        let handle = match self.free.pop() {
            Some(index) => {
                self.slots[index] = particle;
                Handle(index)
            }
            None => {
                self.slots.push(particle);
                Handle(self.slots.len() - 1)
            }
        };
        self.buckets[bucket].push(handle);
        handle
    }

    pub fn get(&self, handle: Handle) -> &T {
        &self.slots[handle.0]
    }

    pub fn get_mut(&mut self, handle: Handle) -> &mut T {
        &mut self.slots[handle.0]
    }

    pub fn bucket(&self, bucket: usize) -> &[Handle] {
        &self.buckets[bucket]
    }

    pub fn bucket_len(&self, bucket: usize) -> usize {
        self.buckets[bucket].len()
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn iter_bucket(&self, bucket: usize) -> impl Iterator<Item = &T> + '_ {
        self.buckets[bucket].iter().map(|h| &self.slots[h.0])
    }

    pub fn iter_active(&self) -> impl Iterator<Item = &T> + '_ {
        self.buckets
            .iter()
            .flat_map(|bucket| bucket.iter().map(|h| &self.slots[h.0]))
    }

    /// Remove the particle at `position` in `bucket` and return its slot to
    /// the free stack.
    ///
    /// Uses swap-remove: the bucket's last entry takes `position`, so callers
    /// scanning a bucket must walk it from the back.
    pub fn release_at(&mut self, bucket: usize, position: usize) -> Option<T::Remains> {
        let handle = self.buckets[bucket].swap_remove(position);
        let remains = self.slots[handle.0].retire();
        self.free.push(handle.0);
        remains
    }

    /// Move the particle at `position` in `bucket` to the end of `to`.
    /// The caller is responsible for having updated the particle so that
    /// its own [`Pooled::bucket`] reports `to`.
    pub fn move_at(&mut self, bucket: usize, position: usize, to: usize) {
        let handle = self.buckets[bucket].swap_remove(position);
        self.buckets[to].push(handle);
    }

    /// Pop the most recently added particle of a bucket, releasing its slot.
    pub fn pop(&mut self, bucket: usize) -> Option<T>
    where
        T: Clone,
    {
        let handle = self.buckets[bucket].pop()?;
        let particle = self.slots[handle.0].clone();
        self.slots[handle.0].retire();
        self.free.push(handle.0);
        Some(particle)
    }

    pub fn active_count(&self) -> usize {
        self.buckets.iter().map(Vec::len).sum()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.iter().all(Vec::is_empty)
    }

    /// Drop every slot, active or free. Nothing is retired, so no terminal
    /// behavior fires.
    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        for bucket in &mut self.buckets {
            bucket.clear();
        }
    }

    #[cfg(test)]
    pub(crate) fn assert_consistent(&self) {
        let mut seen = vec![0u8; self.slots.len()];
        for index in &self.free {
            seen[*index] += 1;
        }
        for (b, bucket) in self.buckets.iter().enumerate() {
            for handle in bucket {
                seen[handle.0] += 1;
                assert_eq!(
                    self.slots[handle.0].bucket(),
                    b,
                    "slot {} listed under the wrong bucket",
                    handle.0
                );
            }
        }
        for (index, count) in seen.iter().enumerate() {
            assert_eq!(*count, 1, "slot {index} is tracked {count} times");
        }
    }
}
