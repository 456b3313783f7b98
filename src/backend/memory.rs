//! In-process collaborators.
//!
//! Every fake counts its calls per [`MemoryOp`], can be told to fail the next
//! call of a given operation, and can add latency so a caller observes a
//! pending state. [`MemoryIdentityProvider::confirm`] stands in for the user
//! clicking the confirmation link, and provisions the profile row the way the
//! database trigger does in production.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crate::gateway::{IdentityProvider, ObjectStore, ProviderError, RelationalStore};
use crate::model::{AuthSession, Identity, ProfilePatch, ProfileRow, Registration};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MemoryOp {
    SignUp,
    SignIn,
    SignOut,
    ResetPassword,
    CurrentUser,
    PutObject,
    DeleteObject,
    ReadRow,
    UpdateRow,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
struct Recorder {
    calls: Mutex<HashMap<MemoryOp, usize>>,
    faults: Mutex<HashMap<MemoryOp, ProviderError>>,
    latency: Option<Duration>,
}

impl Recorder {
    async fn enter(&self, op: MemoryOp) -> Result<(), ProviderError> {
        *lock(&self.calls).entry(op).or_default() += 1;
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        match lock(&self.faults).remove(&op) {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn calls(&self, op: MemoryOp) -> usize {
        lock(&self.calls).get(&op).copied().unwrap_or(0)
    }

    fn fail_next(&self, op: MemoryOp, err: ProviderError) {
        lock(&self.faults).insert(op, err);
    }
}

#[derive(Clone, Debug)]
struct UserRecord {
    id: String,
    password: String,
    confirmed: bool,
    name: Option<String>,
}

#[derive(Debug, Default)]
struct IdentityState {
    users: HashMap<String, UserRecord>,
    tokens: HashMap<String, String>,
}

/// Identity provider fake that requires email confirmation before sign-in.
#[derive(Debug, Default)]
pub struct MemoryIdentityProvider {
    state: Mutex<IdentityState>,
    recorder: Recorder,
    mutations: AtomicUsize,
    sequence: AtomicUsize,
    provisioning: Option<Arc<MemoryProfileStore>>,
}

impl MemoryIdentityProvider {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Provision a profile row in `store` when an account is confirmed.
    #[must_use]
    pub fn with_provisioning(mut self, store: Arc<MemoryProfileStore>) -> Self {
        self.provisioning = Some(store);
        self
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.recorder.latency = Some(latency);
        self
    }

    /// Out-of-band email confirmation. Returns `false` for unknown addresses.
    pub fn confirm(&self, email: &str) -> bool {
        let user = {
            let mut state = lock(&self.state);
            let Some(user) = state.users.get_mut(email) else {
                return false;
            };
            if user.confirmed {
                return true;
            }
            user.confirmed = true;
            user.clone()
        };

        if let Some(store) = &self.provisioning {
            store.insert(ProfileRow {
                id: user.id,
                name: user.name.unwrap_or_default(),
                avatar_ref: None,
                points: 0,
            });
        }
        true
    }

    /// Seed a confirmed account, returning its id.
    pub fn register_confirmed(&self, email: &str, password: &str, name: &str) -> String {
        let id = self.next_id("user");
        lock(&self.state).users.insert(
            email.to_string(),
            UserRecord {
                id: id.clone(),
                password: password.to_string(),
                confirmed: false,
                name: Some(name.to_string()),
            },
        );
        self.confirm(email);
        id
    }

    /// Drop every issued token, as if all sessions expired.
    pub fn expire_sessions(&self) {
        lock(&self.state).tokens.clear();
    }

    #[must_use]
    pub fn calls(&self, op: MemoryOp) -> usize {
        self.recorder.calls(op)
    }

    /// Number of calls that changed provider state.
    #[must_use]
    pub fn mutations(&self) -> usize {
        self.mutations.load(Ordering::SeqCst)
    }

    pub fn fail_next(&self, op: MemoryOp, err: ProviderError) {
        self.recorder.fail_next(op, err);
    }

    fn next_id(&self, prefix: &str) -> String {
        let n = self.sequence.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{prefix}-{n}")
    }

    fn identity(email: &str, user: &UserRecord) -> Identity {
        Identity {
            id: user.id.clone(),
            email: email.to_string(),
            verified: user.confirmed,
        }
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &SecretString,
        metadata: &Value,
        _confirm_redirect_url: &str,
    ) -> Result<Registration, ProviderError> {
        self.recorder.enter(MemoryOp::SignUp).await?;

        let mut state = lock(&self.state);
        if let Some(user) = state.users.get(email) {
            if user.confirmed {
                // Existing accounts answer with an obfuscated identity and no
                // linked credentials; nothing is written.
                return Ok(Registration {
                    identity: Identity {
                        id: self.next_id("obfuscated"),
                        email: email.to_string(),
                        verified: false,
                    },
                    linked_credentials: 0,
                    session: None,
                });
            }
            // Unconfirmed: the provider re-sends the confirmation email.
            return Ok(Registration {
                identity: Self::identity(email, user),
                linked_credentials: 1,
                session: None,
            });
        }

        let user = UserRecord {
            id: self.next_id("user"),
            password: password.expose_secret().to_string(),
            confirmed: false,
            name: metadata
                .get("name")
                .and_then(Value::as_str)
                .map(str::to_string),
        };
        let identity = Self::identity(email, &user);
        state.users.insert(email.to_string(), user);
        self.mutations.fetch_add(1, Ordering::SeqCst);

        Ok(Registration {
            identity,
            linked_credentials: 1,
            session: None,
        })
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthSession, ProviderError> {
        self.recorder.enter(MemoryOp::SignIn).await?;

        let mut state = lock(&self.state);
        let user = state
            .users
            .get(email)
            .filter(|user| user.password == password.expose_secret())
            .cloned()
            .ok_or_else(|| ProviderError::rejected(400, "Invalid login credentials"))?;
        if !user.confirmed {
            return Err(ProviderError::rejected(400, "Email not confirmed"));
        }

        let token = self.next_id("token");
        state.tokens.insert(token.clone(), email.to_string());
        Ok(AuthSession {
            identity: Self::identity(email, &user),
            access_token: SecretString::from(token),
        })
    }

    async fn sign_out(&self, access_token: &SecretString) -> Result<(), ProviderError> {
        self.recorder.enter(MemoryOp::SignOut).await?;
        match lock(&self.state).tokens.remove(access_token.expose_secret()) {
            Some(_) => Ok(()),
            None => Err(ProviderError::rejected(401, "invalid token")),
        }
    }

    async fn request_password_reset(
        &self,
        _email: &str,
        _redirect_url: &str,
    ) -> Result<(), ProviderError> {
        self.recorder.enter(MemoryOp::ResetPassword).await
    }

    async fn current_user(
        &self,
        access_token: &SecretString,
    ) -> Result<Option<Identity>, ProviderError> {
        self.recorder.enter(MemoryOp::CurrentUser).await?;
        let state = lock(&self.state);
        Ok(state
            .tokens
            .get(access_token.expose_secret())
            .and_then(|email| {
                state
                    .users
                    .get(email)
                    .map(|user| Self::identity(email, user))
            }))
    }
}

#[derive(Clone, Debug)]
struct StoredObject {
    content_type: String,
    bytes: Vec<u8>,
}

/// Object store fake keyed by `(bucket, key)`.
#[derive(Debug, Default)]
pub struct MemoryObjectStore {
    objects: Mutex<BTreeMap<(String, String), StoredObject>>,
    recorder: Recorder,
}

impl MemoryObjectStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.recorder.latency = Some(latency);
        self
    }

    #[must_use]
    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        lock(&self.objects).contains_key(&(bucket.to_string(), key.to_string()))
    }

    /// Keys currently stored in `bucket`, sorted.
    #[must_use]
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        lock(&self.objects)
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, key)| key.clone())
            .collect()
    }

    #[must_use]
    pub fn content_type(&self, bucket: &str, key: &str) -> Option<String> {
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.content_type.clone())
    }

    #[must_use]
    pub fn size(&self, bucket: &str, key: &str) -> Option<usize> {
        lock(&self.objects)
            .get(&(bucket.to_string(), key.to_string()))
            .map(|object| object.bytes.len())
    }

    #[must_use]
    pub fn calls(&self, op: MemoryOp) -> usize {
        self.recorder.calls(op)
    }

    pub fn fail_next(&self, op: MemoryOp, err: ProviderError) {
        self.recorder.fail_next(op, err);
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn put_object(
        &self,
        _access_token: &SecretString,
        bucket: &str,
        key: &str,
        content_type: &str,
        bytes: &[u8],
    ) -> Result<(), ProviderError> {
        self.recorder.enter(MemoryOp::PutObject).await?;
        let mut objects = lock(&self.objects);
        let id = (bucket.to_string(), key.to_string());
        if objects.contains_key(&id) {
            return Err(ProviderError::rejected(409, "The resource already exists"));
        }
        objects.insert(
            id,
            StoredObject {
                content_type: content_type.to_string(),
                bytes: bytes.to_vec(),
            },
        );
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("memory://objects/{bucket}/{key}")
    }

    async fn delete_object(
        &self,
        _access_token: &SecretString,
        bucket: &str,
        key: &str,
    ) -> Result<(), ProviderError> {
        self.recorder.enter(MemoryOp::DeleteObject).await?;
        lock(&self.objects)
            .remove(&(bucket.to_string(), key.to_string()))
            .map(|_| ())
            .ok_or(ProviderError::NotFound)
    }
}

/// `profiles` table fake.
#[derive(Debug, Default)]
pub struct MemoryProfileStore {
    rows: Mutex<HashMap<String, ProfileRow>>,
    recorder: Recorder,
}

impl MemoryProfileStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.recorder.latency = Some(latency);
        self
    }

    pub fn insert(&self, row: ProfileRow) {
        lock(&self.rows).insert(row.id.clone(), row);
    }

    #[must_use]
    pub fn get(&self, id: &str) -> Option<ProfileRow> {
        lock(&self.rows).get(id).cloned()
    }

    #[must_use]
    pub fn calls(&self, op: MemoryOp) -> usize {
        self.recorder.calls(op)
    }

    pub fn fail_next(&self, op: MemoryOp, err: ProviderError) {
        self.recorder.fail_next(op, err);
    }
}

#[async_trait]
impl RelationalStore for MemoryProfileStore {
    async fn read_profile(
        &self,
        _access_token: &SecretString,
        id: &str,
    ) -> Result<Option<ProfileRow>, ProviderError> {
        self.recorder.enter(MemoryOp::ReadRow).await?;
        Ok(self.get(id))
    }

    async fn update_profile(
        &self,
        _access_token: &SecretString,
        id: &str,
        patch: &ProfilePatch,
    ) -> Result<Option<ProfileRow>, ProviderError> {
        self.recorder.enter(MemoryOp::UpdateRow).await?;
        let mut rows = lock(&self.rows);
        let Some(row) = rows.get_mut(id) else {
            return Ok(None);
        };
        match patch {
            ProfilePatch::DisplayName(name) => row.name.clone_from(name),
            ProfilePatch::AvatarRef(reference) => row.avatar_ref.clone_from(reference),
        }
        Ok(Some(row.clone()))
    }
}
