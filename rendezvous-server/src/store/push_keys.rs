/// Generates child keys that sort lexicographically in generation order, even if the wall
/// clock steps backwards.
#[derive(Debug, Default)]
pub(crate) struct PushKeys {
    last_ms: u64,
    seq: u64,
}

impl PushKeys {
    pub(crate) fn next(&mut self, now_ms: u64) -> String {
        self.last_ms = self.last_ms.max(now_ms);
        self.seq += 1;
        format!("-{:012x}{:012x}", self.last_ms, self.seq)
    }
}
