/// Tracks whether the backend has accepted at least one file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadGate {
    accepted: Vec<String>,
}

impl UploadGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an accepted file and returns true when it was the first one.
    pub fn record_success(&mut self, file_name: impl Into<String>) -> bool {
        let first = self.accepted.is_empty();
        self.accepted.push(file_name.into());
        first
    }

    pub fn is_open(&self) -> bool {
        !self.accepted.is_empty()
    }

    /// File names accepted so far, in arrival order.
    pub fn accepted_files(&self) -> &[String] {
        &self.accepted
    }
}
