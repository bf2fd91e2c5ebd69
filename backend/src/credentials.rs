//! Parsing of the caller's raw key list and the rotating start cursor used to
//! spread parallel requests over different keys.

/// Ordered, de-blanked list of API keys. Derived fresh from the raw string on
/// every call, so the same input always yields the same order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CredentialPool {
    keys: Vec<String>,
}

impl CredentialPool {
    pub fn parse(raw: &str) -> Self {
        let keys = raw
            .split([',', '\n'])
            .map(str::trim)
            .filter(|key| !key.is_empty())
            .map(str::to_string)
            .collect();
        Self { keys }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Keys from `start` to the end, then wrapping around to `start - 1`.
    pub fn rotated(&self, start: usize) -> impl Iterator<Item = &str> {
        let start = if self.keys.is_empty() {
            0
        } else {
            start % self.keys.len()
        };
        self.keys[start..]
            .iter()
            .chain(self.keys[..start].iter())
            .map(String::as_str)
    }
}

/// Only the last four characters, safe for logs.
pub fn mask(key: &str) -> String {
    let tail: String = key
        .chars()
        .rev()
        .take(4)
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    format!("...{}", tail)
}

/// Round-robin start offset into a [`CredentialPool`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KeyCursor {
    position: usize,
}

impl KeyCursor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(position: usize) -> Self {
        Self { position }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns the current offset and advances by one modulo the pool size.
    /// An empty pool always yields 0 and leaves the cursor untouched.
    pub fn next_start_index(&mut self, pool: &CredentialPool) -> usize {
        if pool.is_empty() {
            return 0;
        }
        let index = self.position % pool.len();
        self.position = (index + 1) % pool.len();
        index
    }

    /// `count` consecutive offsets, taken in one synchronous step.
    pub fn reserve(&mut self, pool: &CredentialPool, count: usize) -> Vec<usize> {
        (0..count).map(|_| self.next_start_index(pool)).collect()
    }
}
