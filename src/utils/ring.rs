// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license
/// 固定容量环形缓冲区 (保存最近几帧)
/// Fixed-capacity ring buffer holding the most recent frames
#[derive(Clone, Debug)]
pub struct FrameRing<T> {
    slots: Vec<Option<T>>,
    /// 下一次写入位置
    head: usize,
    len: usize,
}

impl<T> FrameRing<T> {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            head: 0,
            len: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 写入新帧, 满时覆盖最旧的一帧
    pub fn push(&mut self, item: T) {
        self.slots[self.head] = Some(item);
        self.head = (self.head + 1) % self.slots.len();
        self.len = (self.len + 1).min(self.slots.len());
    }

    /// 按"距今"取帧: 0 = 最新, 1 = 上一帧 ...
    pub fn get(&self, age: usize) -> Option<&T> {
        if age >= self.len {
            return None;
        }
        let cap = self.slots.len();
        let idx = (self.head + cap - 1 - age) % cap;
        self.slots[idx].as_ref()
    }
}
