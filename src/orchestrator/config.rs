use crate::gateway::KeyLayout;

const DEFAULT_AVATARS_BUCKET: &str = "avatars";
const DEFAULT_SITE_URL: &str = "http://localhost:3000";
const DEFAULT_AVATAR_MAX_BYTES: usize = 5 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct OrchestratorConfig {
    avatars_bucket: String,
    key_layout: KeyLayout,
    confirm_redirect_url: String,
    reset_redirect_url: String,
    avatar_max_bytes: usize,
}

impl OrchestratorConfig {
    /// Redirect targets are derived from `site_url`: `/auth/callback` for
    /// sign-up confirmation, `/reset-password` for password resets.
    #[must_use]
    pub fn new(site_url: &str) -> Self {
        let base = site_url.trim_end_matches('/');
        Self {
            avatars_bucket: DEFAULT_AVATARS_BUCKET.to_string(),
            key_layout: KeyLayout::default(),
            confirm_redirect_url: format!("{base}/auth/callback"),
            reset_redirect_url: format!("{base}/reset-password"),
            avatar_max_bytes: DEFAULT_AVATAR_MAX_BYTES,
        }
    }

    #[must_use]
    pub fn with_avatars_bucket(mut self, bucket: String) -> Self {
        self.avatars_bucket = bucket;
        self
    }

    #[must_use]
    pub fn with_key_layout(mut self, layout: KeyLayout) -> Self {
        self.key_layout = layout;
        self
    }

    #[must_use]
    pub fn with_confirm_redirect_url(mut self, url: String) -> Self {
        self.confirm_redirect_url = url;
        self
    }

    #[must_use]
    pub fn with_reset_redirect_url(mut self, url: String) -> Self {
        self.reset_redirect_url = url;
        self
    }

    #[must_use]
    pub fn with_avatar_max_bytes(mut self, bytes: usize) -> Self {
        self.avatar_max_bytes = bytes;
        self
    }

    #[must_use]
    pub fn avatars_bucket(&self) -> &str {
        &self.avatars_bucket
    }

    #[must_use]
    pub fn key_layout(&self) -> KeyLayout {
        self.key_layout
    }

    #[must_use]
    pub fn confirm_redirect_url(&self) -> &str {
        &self.confirm_redirect_url
    }

    #[must_use]
    pub fn reset_redirect_url(&self) -> &str {
        &self.reset_redirect_url
    }

    #[must_use]
    pub fn avatar_max_bytes(&self) -> usize {
        self.avatar_max_bytes
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self::new(DEFAULT_SITE_URL)
    }
}
