use std::collections::HashSet;

/// Payloads still to be tried, in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct PayloadQueue {
    pending: Vec<String>,
    skipped: usize,
}

impl PayloadQueue {
    /// Candidates minus `completed`, order preserved. Duplicates within the
    /// candidate list collapse onto their first occurrence.
    pub fn new(candidates: &[String], completed: &HashSet<String>) -> Self {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut pending = Vec::new();
        let mut skipped = 0;

        for payload in candidates {
            if !seen.insert(payload.as_str()) {
                continue;
            }
            if completed.contains(payload) {
                skipped += 1;
            } else {
                pending.push(payload.clone());
            }
        }

        Self { pending, skipped }
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Distinct candidates excluded because a previous run attempted them.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn as_slice(&self) -> &[String] {
        &self.pending
    }

    pub fn into_vec(self) -> Vec<String> {
        self.pending
    }
}
