//! Credential service: registration, authentication and the token lifecycle.
//!
//! A token is live only while **both** hold:
//! 1. its signature and time window verify ([`Hs256Jwt::verify`]), and
//! 2. its store record is active and unexpired.
//!
//! Revocation (logout, rotation, password change) flips the store record, so a
//! structurally valid token stops resolving immediately. Nothing here ever
//! becomes active again once revoked.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

use authgate_core::{AuthError, AuthResult, Clock, Settings, UserId};

use crate::claims::{TokenClaims, TokenKind};
use crate::jwt::Hs256Jwt;
use crate::secret::{hash_password, token_digest, verify_password};
use crate::store::{StoreError, TokenStore, UserStore};
use crate::token::{TokenInfo, TokenPair, TokenRecord};
use crate::user::User;
use crate::validation::{RegistrationRequest, validate_password};

/// Tokens written per issuance (access + refresh).
const PAIR_SIZE: usize = 2;

#[derive(Clone)]
pub struct CredentialService {
    users: Arc<dyn UserStore>,
    tokens: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    jwt: Hs256Jwt,
    access_ttl: Duration,
    refresh_ttl: Duration,
    max_active_tokens: usize,
}

impl core::fmt::Debug for CredentialService {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CredentialService")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .field("max_active_tokens", &self.max_active_tokens)
            .finish_non_exhaustive()
    }
}

impl CredentialService {
    pub fn new(
        users: Arc<dyn UserStore>,
        tokens: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
        settings: &Settings,
    ) -> Self {
        Self {
            users,
            tokens,
            clock,
            jwt: Hs256Jwt::new(&settings.secret_key),
            access_ttl: settings.access_token_ttl,
            refresh_ttl: settings.refresh_token_ttl,
            max_active_tokens: settings.max_active_tokens,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Create an account.
    ///
    /// Format, confirmation and age rules are the caller's
    /// ([`RegistrationRequest::validate`]); this enforces uniqueness only.
    #[instrument(skip(self, request), fields(username = %request.username), err)]
    pub async fn register(&self, request: &RegistrationRequest) -> AuthResult<User> {
        if self.users.find_by_username(&request.username).await?.is_some() {
            return Err(AuthError::DuplicateUsername);
        }
        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::DuplicateEmail);
        }

        let user = User::new(
            request.username.clone(),
            request.email.clone(),
            hash_password(&request.password)?,
            request.birthday,
            self.clock.now(),
        );

        // A concurrent registration can still win between check and insert;
        // the store's unique violation maps to the same error kinds.
        self.users.insert_user(&user).await?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Unknown username and wrong password both fail with `InvalidCredentials`.
    #[instrument(skip(self, password), fields(username = %username), err)]
    pub async fn authenticate(&self, username: &str, password: &str) -> AuthResult<User> {
        let Some(user) = self.users.find_by_username(username).await? else {
            warn!("authentication failed");
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &user.password_hash) {
            warn!(user_id = %user.id, "authentication failed");
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            warn!(user_id = %user.id, "authentication refused for disabled account");
            return Err(AuthError::AccountDisabled);
        }

        Ok(user)
    }

    /// Mint and persist a new access/refresh pair.
    ///
    /// Refused with `TooManyActiveSessions` when the pair would take the user
    /// past `max_active_tokens` live tokens; nothing is written in that case.
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    pub async fn issue_token_pair(&self, user: &User) -> AuthResult<TokenPair> {
        let now = self.clock.now();
        self.ensure_capacity(user.id, now, 0).await?;
        self.store_pair(user, now).await
    }

    /// Fail unless a new pair fits under the ceiling once `releasing` live
    /// tokens are given up.
    async fn ensure_capacity(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
        releasing: usize,
    ) -> AuthResult<()> {
        let active = self.tokens.count_active(user_id, now).await?;
        if active.saturating_sub(releasing) + PAIR_SIZE > self.max_active_tokens {
            warn!(active, limit = self.max_active_tokens, "token ceiling reached");
            return Err(AuthError::TooManyActiveSessions {
                limit: self.max_active_tokens,
            });
        }
        Ok(())
    }

    async fn store_pair(&self, user: &User, now: DateTime<Utc>) -> AuthResult<TokenPair> {
        let (access_token, access) = self.mint(user, TokenKind::Access, self.access_ttl, now)?;
        let (refresh_token, refresh) =
            self.mint(user, TokenKind::Refresh, self.refresh_ttl, now)?;

        self.tokens.insert_tokens(&[access, refresh]).await?;

        info!(user_id = %user.id, "token pair issued");
        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn mint(
        &self,
        user: &User,
        kind: TokenKind,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> AuthResult<(String, TokenRecord)> {
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or_else(|| AuthError::internal("token expiry out of range"))?;
        let claims = TokenClaims::new(user.id, user.username.clone(), kind, now, expires_at);
        let token = self.jwt.sign(&claims)?;
        let record = TokenRecord::new(user.id, token_digest(&token), kind, now, expires_at);
        Ok((token, record))
    }

    /// Resolve an access token to its (active) owner.
    #[instrument(skip(self, token), err)]
    pub async fn resolve_bearer(&self, token: &str) -> AuthResult<User> {
        self.resolve(token, TokenKind::Access)
            .await
            .map(|(user, _)| user)
    }

    /// Shared by bearer resolution and rotation up to the store lookup.
    async fn verified_owner(
        &self,
        token: &str,
        expected: TokenKind,
        now: DateTime<Utc>,
    ) -> AuthResult<User> {
        let claims = self.jwt.verify(token, now)?;
        if claims.kind != expected {
            return Err(AuthError::WrongTokenType {
                expected: expected.as_str(),
            });
        }

        let user = self
            .users
            .get_user(claims.sub)
            .await?
            .ok_or(AuthError::UserNotFound)?;
        if !user.is_active {
            return Err(AuthError::AccountDisabled);
        }
        Ok(user)
    }

    async fn resolve(&self, token: &str, kind: TokenKind) -> AuthResult<(User, TokenRecord)> {
        let now = self.clock.now();
        let user = self.verified_owner(token, kind, now).await?;

        let record = self
            .tokens
            .find_active(user.id, &token_digest(token), kind, now)
            .await?
            .ok_or(AuthError::TokenRevoked)?;

        Ok((user, record))
    }

    /// Deactivate the caller's record for `token`; unknown tokens are ignored.
    #[instrument(skip(self, token, user), fields(user_id = %user.id), err)]
    pub async fn logout(&self, token: &str, user: &User) -> AuthResult<()> {
        if let Some(record) = self
            .tokens
            .find_by_hash(user.id, &token_digest(token))
            .await?
        {
            self.tokens.deactivate(record.id).await?;
            info!(token_id = %record.id, "token revoked");
        }
        Ok(())
    }

    /// Deactivate every active token of `user`. Returns how many were flipped.
    #[instrument(skip(self, user), fields(user_id = %user.id), err)]
    pub async fn logout_all(&self, user: &User) -> AuthResult<usize> {
        self.revoke_all(user.id).await
    }

    async fn revoke_all(&self, user_id: UserId) -> AuthResult<usize> {
        let revoked = self.tokens.deactivate_all(user_id).await?;
        info!(user_id = %user_id, revoked, "all tokens revoked");
        Ok(revoked)
    }

    /// Exchange a refresh token for a new pair.
    ///
    /// The refresh record is single-use. Presenting one that verifies but has
    /// no live record (already used, revoked or forged) revokes every token of
    /// its owner before failing with `RefreshTokenInvalid`. So does losing a
    /// race to consume the record. A rotation that would exceed the ceiling is
    /// refused before the refresh record is touched.
    #[instrument(skip(self, refresh_token), err)]
    pub async fn rotate_tokens(&self, refresh_token: &str) -> AuthResult<TokenPair> {
        let now = self.clock.now();
        let user = self
            .verified_owner(refresh_token, TokenKind::Refresh, now)
            .await?;

        let record = self
            .tokens
            .find_active(user.id, &token_digest(refresh_token), TokenKind::Refresh, now)
            .await?;

        let Some(record) = record else {
            warn!(user_id = %user.id, "refresh token reuse detected, revoking all sessions");
            self.revoke_all(user.id).await?;
            return Err(AuthError::RefreshTokenInvalid);
        };

        self.ensure_capacity(user.id, now, 1).await?;

        // Only the caller that flips the record owns the rotation.
        if !self.tokens.deactivate(record.id).await? {
            warn!(
                user_id = %user.id,
                token_id = %record.id,
                "refresh token consumed concurrently, revoking all sessions"
            );
            self.revoke_all(user.id).await?;
            return Err(AuthError::RefreshTokenInvalid);
        }

        self.store_pair(&user, now).await
    }

    /// Replace the password and revoke every session, including the caller's.
    #[instrument(skip(self, user, current_password, new_password), fields(user_id = %user.id), err)]
    pub async fn change_password(
        &self,
        user: &User,
        current_password: &str,
        new_password: &str,
    ) -> AuthResult<()> {
        // Re-read so a concurrent change is verified against the current hash.
        let stored = self
            .users
            .get_user(user.id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !verify_password(current_password, &stored.password_hash) {
            warn!("password change refused: current password mismatch");
            return Err(AuthError::InvalidCredentials);
        }
        validate_password(new_password)?;

        let hash = hash_password(new_password)?;
        self.users
            .update_password_hash(stored.id, &hash)
            .await
            .map_err(user_not_found)?;

        info!("password changed");
        self.revoke_all(stored.id).await?;
        Ok(())
    }

    pub async fn list_active_tokens(&self, user: &User) -> AuthResult<Vec<TokenInfo>> {
        let records = self.tokens.list_active(user.id, self.clock.now()).await?;
        Ok(records.iter().map(TokenRecord::info).collect())
    }

    pub async fn get_user(&self, user_id: UserId) -> AuthResult<User> {
        self.users
            .get_user(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)
    }

    /// Disable an account. Its tokens stop resolving with `AccountDisabled`.
    #[instrument(skip(self), err)]
    pub async fn deactivate_user(&self, user_id: UserId) -> AuthResult<()> {
        self.users
            .set_active(user_id, false)
            .await
            .map_err(user_not_found)?;
        info!("user deactivated");
        Ok(())
    }

    #[instrument(skip(self), err)]
    pub async fn activate_user(&self, user_id: UserId) -> AuthResult<()> {
        self.users
            .set_active(user_id, true)
            .await
            .map_err(user_not_found)?;
        info!("user activated");
        Ok(())
    }
}

fn user_not_found(err: StoreError) -> AuthError {
    match err {
        StoreError::NotFound => AuthError::UserNotFound,
        other => other.into(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use authgate_core::{ManualClock, TokenId};

    use super::*;
    use crate::store::{InMemoryTokenStore, InMemoryUserStore, StoreResult};

    struct Harness {
        service: CredentialService,
        tokens: Arc<InMemoryTokenStore>,
        clock: Arc<ManualClock>,
    }

    fn harness_with(max_active_tokens: usize) -> Harness {
        let tokens = Arc::new(InMemoryTokenStore::new());
        let clock = Arc::new(ManualClock::default());
        let settings = Settings::new("test-secret").with_max_active_tokens(max_active_tokens);
        let service = CredentialService::new(
            Arc::new(InMemoryUserStore::new()),
            tokens.clone(),
            clock.clone(),
            &settings,
        );
        Harness {
            service,
            tokens,
            clock,
        }
    }

    fn harness() -> Harness {
        // High enough that ceiling checks don't interfere with lifecycle tests.
        harness_with(100)
    }

    fn request(username: &str, email: &str) -> RegistrationRequest {
        RegistrationRequest {
            username: username.into(),
            email: email.into(),
            password: "Password1!".into(),
            confirm_password: "Password1!".into(),
            birthday: NaiveDate::from_ymd_opt(2000, 1, 1).unwrap(),
        }
    }

    async fn registered(h: &Harness) -> User {
        h.service
            .register(&request("Testuser1", "test@x.com"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn end_to_end_lifecycle() {
        let h = harness();
        let user = registered(&h).await;

        let authed = h.service.authenticate("Testuser1", "Password1!").await.unwrap();
        assert_eq!(authed.id, user.id);

        let pair = h.service.issue_token_pair(&authed).await.unwrap();
        assert_ne!(pair.access_token, pair.refresh_token);

        let records = h.tokens.all_for(user.id).unwrap();
        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.is_active));
        let access = records.iter().find(|r| r.kind == TokenKind::Access).unwrap();
        let refresh = records.iter().find(|r| r.kind == TokenKind::Refresh).unwrap();
        assert_eq!(access.expires_at - access.created_at, Duration::minutes(30));
        assert_eq!(refresh.expires_at - refresh.created_at, Duration::days(7));
        assert_ne!(access.token_hash, pair.access_token);

        let resolved = h.service.resolve_bearer(&pair.access_token).await.unwrap();
        assert_eq!(resolved.id, user.id);

        assert_eq!(h.service.logout_all(&user).await.unwrap(), 2);
        assert_eq!(
            h.service.resolve_bearer(&pair.access_token).await.unwrap_err(),
            AuthError::TokenRevoked
        );
        assert_eq!(
            h.service.rotate_tokens(&pair.refresh_token).await.unwrap_err(),
            AuthError::RefreshTokenInvalid
        );
    }

    #[tokio::test]
    async fn usernames_are_unique_ignoring_case() {
        let h = harness();
        h.service
            .register(&request("Alice1234", "alice@x.com"))
            .await
            .unwrap();

        let err = h
            .service
            .register(&request("alice1234", "other@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::DuplicateUsername);

        let err = h
            .service
            .register(&request("Bobberty", "alice@x.com"))
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::DuplicateEmail);
    }

    #[tokio::test]
    async fn authentication_does_not_reveal_which_part_failed() {
        let h = harness();
        registered(&h).await;

        let unknown = h
            .service
            .authenticate("Nobodyhere", "Password1!")
            .await
            .unwrap_err();
        let wrong = h
            .service
            .authenticate("Testuser1", "Password2!")
            .await
            .unwrap_err();

        assert_eq!(unknown, wrong);
        assert_eq!(unknown.to_string(), wrong.to_string());
        assert_eq!(unknown, AuthError::InvalidCredentials);

        // Lookup ignores case, like registration.
        assert!(h.service.authenticate("TESTUSER1", "Password1!").await.is_ok());
    }

    #[tokio::test]
    async fn disabled_accounts_cannot_authenticate_or_resolve() {
        let h = harness();
        let user = registered(&h).await;
        let pair = h.service.issue_token_pair(&user).await.unwrap();

        h.service.deactivate_user(user.id).await.unwrap();

        assert_eq!(
            h.service
                .authenticate("Testuser1", "Password1!")
                .await
                .unwrap_err(),
            AuthError::AccountDisabled
        );
        assert_eq!(
            h.service.resolve_bearer(&pair.access_token).await.unwrap_err(),
            AuthError::AccountDisabled
        );

        h.service.activate_user(user.id).await.unwrap();
        assert!(h.service.resolve_bearer(&pair.access_token).await.is_ok());

        assert_eq!(
            h.service.deactivate_user(UserId::new()).await.unwrap_err(),
            AuthError::UserNotFound
        );
    }

    #[tokio::test]
    async fn ceiling_rejects_issuance_without_writing() {
        let h = harness_with(5);
        let user = registered(&h).await;

        h.service.issue_token_pair(&user).await.unwrap();
        h.service.issue_token_pair(&user).await.unwrap();
        let before = h.tokens.all_for(user.id).unwrap().len();

        // A third pair would make six live tokens.
        let err = h.service.issue_token_pair(&user).await.unwrap_err();
        assert_eq!(err, AuthError::TooManyActiveSessions { limit: 5 });
        assert_eq!(h.tokens.all_for(user.id).unwrap().len(), before);
        assert_eq!(
            h.tokens.count_active(user.id, h.clock.now()).await.unwrap(),
            4
        );
    }

    #[tokio::test]
    async fn rotation_stays_under_the_ceiling() {
        let h = harness_with(4);
        let user = registered(&h).await;
        let first = h.service.issue_token_pair(&user).await.unwrap();
        let second = h.service.issue_token_pair(&user).await.unwrap();

        // Swapping one refresh token for a pair would leave five live tokens.
        assert_eq!(
            h.service.rotate_tokens(&first.refresh_token).await.unwrap_err(),
            AuthError::TooManyActiveSessions { limit: 4 }
        );
        assert_eq!(
            h.tokens.count_active(user.id, h.clock.now()).await.unwrap(),
            4
        );

        // The refused refresh token was not consumed.
        h.service.logout(&second.access_token, &user).await.unwrap();
        h.service.rotate_tokens(&first.refresh_token).await.unwrap();
        assert_eq!(
            h.tokens.count_active(user.id, h.clock.now()).await.unwrap(),
            4
        );
    }

    #[tokio::test]
    async fn odd_ceiling_is_never_exceeded_by_rotation() {
        let h = harness_with(5);
        let user = registered(&h).await;
        let pair = h.service.issue_token_pair(&user).await.unwrap();
        h.service.issue_token_pair(&user).await.unwrap();

        let rotated = h.service.rotate_tokens(&pair.refresh_token).await.unwrap();
        assert_eq!(
            h.tokens.count_active(user.id, h.clock.now()).await.unwrap(),
            5
        );
        assert!(h.service.rotate_tokens(&rotated.refresh_token).await.is_err());
        assert!(h.tokens.count_active(user.id, h.clock.now()).await.unwrap() <= 5);
    }

    #[tokio::test]
    async fn unrepresentable_expiry_is_an_error() {
        let tokens = Arc::new(InMemoryTokenStore::new());
        let settings = Settings::new("test-secret")
            .with_token_ttls(Duration::minutes(30), Duration::days(50_000_000_000));
        let service = CredentialService::new(
            Arc::new(InMemoryUserStore::new()),
            tokens.clone(),
            Arc::new(ManualClock::default()),
            &settings,
        );
        let user = service
            .register(&request("Testuser1", "test@x.com"))
            .await
            .unwrap();

        let err = service.issue_token_pair(&user).await.unwrap_err();
        assert_eq!(err.kind(), "internal");
        assert!(tokens.all_for(user.id).unwrap().is_empty());
    }

    #[tokio::test]
    async fn ceiling_counts_only_live_tokens() {
        let h = harness_with(2);
        let user = registered(&h).await;

        let pair = h.service.issue_token_pair(&user).await.unwrap();
        assert!(h.service.issue_token_pair(&user).await.is_err());

        // Revoked tokens free their slots.
        h.service.logout(&pair.access_token, &user).await.unwrap();
        h.service.logout(&pair.refresh_token, &user).await.unwrap();
        h.service.issue_token_pair(&user).await.unwrap();

        // So do expired ones.
        h.clock.advance(Duration::days(8));
        h.service.issue_token_pair(&user).await.unwrap();
    }

    #[tokio::test]
    async fn logout_revokes_only_the_presented_token() {
        let h = harness();
        let user = registered(&h).await;
        let first = h.service.issue_token_pair(&user).await.unwrap();
        let second = h.service.issue_token_pair(&user).await.unwrap();

        h.service.logout(&first.access_token, &user).await.unwrap();

        assert_eq!(
            h.service.resolve_bearer(&first.access_token).await.unwrap_err(),
            AuthError::TokenRevoked
        );
        assert!(h.service.resolve_bearer(&second.access_token).await.is_ok());

        // Unknown or already-revoked tokens are a no-op.
        h.service.logout(&first.access_token, &user).await.unwrap();
        h.service.logout("garbage", &user).await.unwrap();
    }

    #[tokio::test]
    async fn refresh_is_single_use_and_reuse_burns_everything() {
        let h = harness();
        let user = registered(&h).await;
        let original = h.service.issue_token_pair(&user).await.unwrap();

        let rotated = h.service.rotate_tokens(&original.refresh_token).await.unwrap();
        assert!(h.service.resolve_bearer(&rotated.access_token).await.is_ok());

        let err = h
            .service
            .rotate_tokens(&original.refresh_token)
            .await
            .unwrap_err();
        assert_eq!(err, AuthError::RefreshTokenInvalid);

        assert_eq!(
            h.service.resolve_bearer(&rotated.access_token).await.unwrap_err(),
            AuthError::TokenRevoked
        );
        assert_eq!(
            h.service.rotate_tokens(&rotated.refresh_token).await.unwrap_err(),
            AuthError::RefreshTokenInvalid
        );
        assert_eq!(h.tokens.count_active(user.id, h.clock.now()).await.unwrap(), 0);
    }

    /// Token store that hands control back to the runtime after each
    /// `find_active`, so two rotations interleave between lookup and update.
    struct YieldingTokenStore(InMemoryTokenStore);

    #[async_trait::async_trait]
    impl TokenStore for YieldingTokenStore {
        async fn insert_tokens(&self, records: &[TokenRecord]) -> StoreResult<()> {
            self.0.insert_tokens(records).await
        }

        async fn count_active(&self, user_id: UserId, now: DateTime<Utc>) -> StoreResult<usize> {
            self.0.count_active(user_id, now).await
        }

        async fn find_active(
            &self,
            user_id: UserId,
            token_hash: &str,
            kind: TokenKind,
            now: DateTime<Utc>,
        ) -> StoreResult<Option<TokenRecord>> {
            let found = self.0.find_active(user_id, token_hash, kind, now).await;
            tokio::task::yield_now().await;
            found
        }

        async fn find_by_hash(
            &self,
            user_id: UserId,
            token_hash: &str,
        ) -> StoreResult<Option<TokenRecord>> {
            self.0.find_by_hash(user_id, token_hash).await
        }

        async fn list_active(
            &self,
            user_id: UserId,
            now: DateTime<Utc>,
        ) -> StoreResult<Vec<TokenRecord>> {
            self.0.list_active(user_id, now).await
        }

        async fn deactivate(&self, id: TokenId) -> StoreResult<bool> {
            self.0.deactivate(id).await
        }

        async fn deactivate_all(&self, user_id: UserId) -> StoreResult<usize> {
            self.0.deactivate_all(user_id).await
        }
    }

    #[tokio::test]
    async fn concurrent_rotation_of_one_refresh_token_succeeds_once() {
        let tokens = Arc::new(YieldingTokenStore(InMemoryTokenStore::new()));
        let service = CredentialService::new(
            Arc::new(InMemoryUserStore::new()),
            tokens.clone(),
            Arc::new(ManualClock::default()),
            &Settings::new("test-secret").with_max_active_tokens(100),
        );
        let user = service
            .register(&request("Testuser1", "test@x.com"))
            .await
            .unwrap();
        let pair = service.issue_token_pair(&user).await.unwrap();

        let (a, b) = tokio::join!(
            service.rotate_tokens(&pair.refresh_token),
            service.rotate_tokens(&pair.refresh_token),
        );

        let outcomes = [a, b];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);
        assert!(
            outcomes
                .iter()
                .any(|r| r.as_ref().err() == Some(&AuthError::RefreshTokenInvalid))
        );

        // The loser burned every session, including the winner's new pair.
        for issued in outcomes.iter().flatten() {
            assert_eq!(
                service.resolve_bearer(&issued.access_token).await.unwrap_err(),
                AuthError::TokenRevoked
            );
        }
        assert_eq!(
            tokens.count_active(user.id, Utc::now()).await.unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn token_types_are_not_interchangeable() {
        let h = harness();
        let user = registered(&h).await;
        let pair = h.service.issue_token_pair(&user).await.unwrap();

        assert_eq!(
            h.service.resolve_bearer(&pair.refresh_token).await.unwrap_err(),
            AuthError::WrongTokenType { expected: "access" }
        );
        assert_eq!(
            h.service.rotate_tokens(&pair.access_token).await.unwrap_err(),
            AuthError::WrongTokenType { expected: "refresh" }
        );

        // A type mismatch is not a reuse signal.
        assert!(h.service.resolve_bearer(&pair.access_token).await.is_ok());
    }

    #[tokio::test]
    async fn expired_and_malformed_tokens_are_invalid() {
        let h = harness();
        let user = registered(&h).await;
        let pair = h.service.issue_token_pair(&user).await.unwrap();

        assert_eq!(
            h.service.resolve_bearer("not-a-token").await.unwrap_err(),
            AuthError::InvalidToken
        );

        h.clock.advance(Duration::minutes(31));
        assert_eq!(
            h.service.resolve_bearer(&pair.access_token).await.unwrap_err(),
            AuthError::InvalidToken
        );
        assert!(h.service.rotate_tokens(&pair.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn password_change_invalidates_existing_sessions() {
        let h = harness();
        let user = registered(&h).await;
        let pair = h.service.issue_token_pair(&user).await.unwrap();

        assert_eq!(
            h.service
                .change_password(&user, "Password2!", "NewPassword1")
                .await
                .unwrap_err(),
            AuthError::InvalidCredentials
        );
        assert_eq!(
            h.service
                .change_password(&user, "Password1!", "weak")
                .await
                .unwrap_err()
                .kind(),
            "weak_password"
        );
        assert!(h.service.resolve_bearer(&pair.access_token).await.is_ok());

        h.service
            .change_password(&user, "Password1!", "NewPassword1")
            .await
            .unwrap();

        assert_eq!(
            h.service.resolve_bearer(&pair.access_token).await.unwrap_err(),
            AuthError::TokenRevoked
        );
        assert!(h.service.authenticate("Testuser1", "Password1!").await.is_err());
        assert!(h.service.authenticate("Testuser1", "NewPassword1").await.is_ok());
    }

    #[tokio::test]
    async fn listing_shows_live_tokens_only() {
        let h = harness();
        let user = registered(&h).await;
        let pair = h.service.issue_token_pair(&user).await.unwrap();

        let listed = h.service.list_active_tokens(&user).await.unwrap();
        assert_eq!(listed.len(), 2);

        h.clock.advance(Duration::hours(1));
        let listed = h.service.list_active_tokens(&user).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].kind, TokenKind::Refresh);

        h.service.logout(&pair.refresh_token, &user).await.unwrap();
        assert!(h.service.list_active_tokens(&user).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn tokens_of_removed_subjects_do_not_resolve() {
        let h = harness();
        let user = registered(&h).await;
        let pair = h.service.issue_token_pair(&user).await.unwrap();

        // Same secret, fresh user store: the subject no longer exists.
        let settings = Settings::new("test-secret");
        let other = CredentialService::new(
            Arc::new(InMemoryUserStore::new()),
            h.tokens.clone(),
            h.clock.clone(),
            &settings,
        );
        assert_eq!(
            other.resolve_bearer(&pair.access_token).await.unwrap_err(),
            AuthError::UserNotFound
        );
    }
}
