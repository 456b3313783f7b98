//! Profile reconciliation orchestrator.
//!
//! Flow Overview:
//! 1) Validate inputs locally; validation failures never reach a backend.
//! 2) Take the session from the caller's [`SessionContext`].
//! 3) Call the gateways in the fixed order each flow prescribes.
//! 4) Return a closed [`crate::Error`] kind or the resulting record.
//!
//! Every flow refuses a second submit while the first is pending
//! ([`crate::Error::Busy`]) instead of queueing it.

mod avatar;
mod config;
mod credentials;
mod guard;
mod profile;
mod state;

pub use config::OrchestratorConfig;
pub use guard::{Lane, Status};
pub use state::{CredentialState, SessionContext};

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::gateway::{
    IdentityProvider, MediaStore, ObjectStore, ProfileRepository, RelationalStore, SessionGateway,
};
use crate::model::{AuthSession, Profile, ProfileRow};
use guard::InFlight;

pub struct Orchestrator {
    config: OrchestratorConfig,
    sessions: SessionGateway,
    media: MediaStore,
    profiles: ProfileRepository,
    in_flight: InFlight,
}

impl Orchestrator {
    pub fn new(
        config: OrchestratorConfig,
        identity: Arc<dyn IdentityProvider>,
        objects: Arc<dyn ObjectStore>,
        rows: Arc<dyn RelationalStore>,
    ) -> Self {
        let media = MediaStore::new(
            objects,
            config.avatars_bucket().to_string(),
            config.key_layout(),
        );
        Self {
            sessions: SessionGateway::new(identity),
            media,
            profiles: ProfileRepository::new(rows),
            in_flight: InFlight::default(),
            config,
        }
    }

    #[must_use]
    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    /// Whether a profile write on `lane` is pending for `identity_id`.
    #[must_use]
    pub fn profile_status(&self, identity_id: &str, lane: Lane) -> Status {
        self.in_flight.status(identity_id, lane)
    }

    fn require_session(context: &SessionContext) -> Result<AuthSession> {
        context.session().ok_or(Error::NoSession)
    }

    fn to_profile(&self, row: ProfileRow, email: Option<String>) -> Profile {
        let avatar_url = row
            .avatar_ref
            .as_deref()
            .map(|reference| self.media.resolve(reference));
        Profile {
            id: row.id,
            email,
            display_name: row.name,
            avatar_ref: row.avatar_ref,
            avatar_url,
            points: row.points,
        }
    }
}

#[cfg(test)]
pub(crate) mod fixture {
    use super::{Orchestrator, OrchestratorConfig, SessionContext};
    use crate::backend::memory::{MemoryIdentityProvider, MemoryObjectStore, MemoryProfileStore};
    use secrecy::SecretString;
    use std::sync::Arc;

    pub(crate) const EMAIL: &str = "max@example.com";
    pub(crate) const PASSWORD: &str = "pw123456";

    pub(crate) struct Fixture {
        pub(crate) provider: Arc<MemoryIdentityProvider>,
        pub(crate) objects: Arc<MemoryObjectStore>,
        pub(crate) rows: Arc<MemoryProfileStore>,
        pub(crate) orchestrator: Orchestrator,
    }

    impl Fixture {
        pub(crate) fn new() -> Self {
            Self::with_stores(MemoryObjectStore::new(), MemoryProfileStore::new())
        }

        pub(crate) fn with_stores(objects: MemoryObjectStore, rows: MemoryProfileStore) -> Self {
            let objects = Arc::new(objects);
            let rows = Arc::new(rows);
            let provider = Arc::new(MemoryIdentityProvider::new().with_provisioning(rows.clone()));
            let orchestrator = Orchestrator::new(
                OrchestratorConfig::default(),
                provider.clone(),
                objects.clone(),
                rows.clone(),
            );
            Self {
                provider,
                objects,
                rows,
                orchestrator,
            }
        }

        /// Seed a confirmed "Max" account and sign it in.
        pub(crate) async fn signed_in(&self) -> anyhow::Result<(SessionContext, String)> {
            let id = self.provider.register_confirmed(EMAIL, PASSWORD, "Max");
            let context = SessionContext::new();
            self.orchestrator
                .sign_in(&context, EMAIL, &SecretString::from(PASSWORD.to_string()))
                .await?;
            Ok((context, id))
        }
    }
}
