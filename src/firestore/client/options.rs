#[derive(Clone)]
pub struct FirestoreClientOptions {
    /// Host to connect to. Override this to target a local emulator; note
    /// that the emulator must be addressed as `127.0.0.1`, not `localhost`.
    pub host_url: String,
    /// Which database within the project to use. Virtually all projects only
    /// have the default one.
    pub database_id: String,
}

impl Default for FirestoreClientOptions {
    fn default() -> Self {
        Self {
            host_url: "https://firestore.googleapis.com".to_string(),
            database_id: "(default)".to_string(),
        }
    }
}

impl FirestoreClientOptions {
    pub fn host_url(mut self, host_url: impl Into<String>) -> Self {
        self.host_url = host_url.into();
        self
    }

    pub fn database_id(mut self, database_id: impl Into<String>) -> Self {
        self.database_id = database_id.into();
        self
    }
}
