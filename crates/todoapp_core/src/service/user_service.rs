//! User directory use-case service.
//!
//! # Responsibility
//! - Register, look up, edit and soft-delete user accounts.
//! - Authenticate username/password pairs and issue session tokens.
//!
//! # Invariants
//! - Field rules are checked before any hashing or persistence.
//! - Username uniqueness is ultimately enforced by the repository; the
//!   pre-check here only avoids hashing for an obvious duplicate.
//! - Unknown usernames pay the same verification cost as wrong passwords.

use crate::model::user::{
    normalize_name, normalize_username, validate_password, User, UserChanges, UserId,
    UserValidationError,
};
use crate::repo::user_repo::UserRepository;
use crate::service::credential_service::{CredentialService, IssuedToken};
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};

/// Registration input. Values are validated and normalized by `register`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterUser {
    pub name: String,
    pub username: String,
    pub password: String,
}

/// Partial profile edit. `None` leaves the field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
}

/// User directory facade over a repository and the credential service.
pub struct UserService<'c, R: UserRepository> {
    repo: R,
    credentials: &'c CredentialService,
}

impl<'c, R: UserRepository> UserService<'c, R> {
    pub fn new(repo: R, credentials: &'c CredentialService) -> Self {
        Self { repo, credentials }
    }

    /// Creates an active account with a fresh id and hashed password.
    ///
    /// # Errors
    /// - `InvalidUser` when a field is blank or the password is too short.
    /// - `DuplicateUsername` when an active user holds the username.
    pub fn register(&self, request: &RegisterUser) -> ServiceResult<User> {
        let name = normalize_name(&request.name)?;
        let username = normalize_username(&request.username)?;
        validate_password(&request.password)?;

        if self.repo.find_user_by_username(&username)?.is_some() {
            return Err(ServiceError::DuplicateUsername(username));
        }

        let hash = self.credentials.hash_password(&request.password)?;
        let user = User::new(name, username, hash);
        self.repo.insert_user(&user)?;

        info!(
            "event=user_register module=user_service status=ok user_id={}",
            user.id
        );
        Ok(user)
    }

    pub fn find_by_id(&self, id: UserId) -> ServiceResult<User> {
        self.repo
            .get_user(id, false)?
            .ok_or(ServiceError::UserNotFound(id))
    }

    pub fn find_by_username(&self, username: &str) -> ServiceResult<User> {
        let username = username.trim();
        self.repo
            .find_user_by_username(username)?
            .ok_or_else(|| ServiceError::UsernameNotFound(username.to_string()))
    }

    /// Applies a partial edit; a new password is re-hashed.
    ///
    /// # Errors
    /// - `InvalidUser(NoChanges)` when the patch carries no field.
    /// - `UserNotFound` when the account is absent or deleted.
    /// - `DuplicateUsername` when the new username is taken.
    pub fn update(&self, id: UserId, patch: &UserPatch) -> ServiceResult<User> {
        let mut changes = UserChanges {
            name: patch.name.as_deref().map(normalize_name).transpose()?,
            username: patch.username.as_deref().map(normalize_username).transpose()?,
            password_hash: None,
        };
        if let Some(password) = patch.password.as_deref() {
            validate_password(password)?;
        }
        if changes.is_empty() && patch.password.is_none() {
            return Err(UserValidationError::NoChanges.into());
        }

        if let Some(password) = patch.password.as_deref() {
            changes.password_hash = Some(self.credentials.hash_password(password)?);
        }

        let user = self.repo.update_user(id, &changes)?;
        info!(
            "event=user_update module=user_service status=ok user_id={} password_changed={}",
            user.id,
            changes.password_hash.is_some()
        );
        Ok(user)
    }

    /// Soft-deletes an account. Todos owned by it are left untouched.
    pub fn delete(&self, id: UserId) -> ServiceResult<()> {
        self.repo.soft_delete_user(id)?;
        info!("event=user_delete module=user_service status=ok user_id={id}");
        Ok(())
    }

    /// Returns the account matching the credentials.
    ///
    /// Unknown username and wrong password both yield `InvalidCredentials`.
    pub fn authenticate(&self, username: &str, password: &str) -> ServiceResult<User> {
        let Some(user) = self.repo.find_user_by_username(username.trim())? else {
            self.credentials.verify_dummy(password);
            warn!("event=user_authenticate module=user_service status=error reason=invalid_credentials");
            return Err(ServiceError::InvalidCredentials);
        };

        if !self
            .credentials
            .verify_password(&user.password_hash, password)?
        {
            warn!("event=user_authenticate module=user_service status=error reason=invalid_credentials");
            return Err(ServiceError::InvalidCredentials);
        }

        Ok(user)
    }

    /// Authenticates and issues a session token for the account.
    pub fn sign_in(&self, username: &str, password: &str) -> ServiceResult<IssuedToken> {
        let user = self.authenticate(username, password)?;
        let token = self.credentials.issue_token(user.id, &user.username)?;
        info!(
            "event=user_sign_in module=user_service status=ok user_id={}",
            user.id
        );
        Ok(token)
    }
}
