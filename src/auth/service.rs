use actix_web::web;
use log::info;
use sqlx::PgPool;
use uuid::Uuid;
use validator::Validate;

use crate::auth::extractors::AuthenticatedUser;
use crate::auth::password::{ensure_strong_enough, hash_password, verify_password};
use crate::auth::token::{decode_token, encode_token};
use crate::auth::{AuthResponse, LoginRequest, RegisterRequest, UpdateProfileRequest};
use crate::error::AppError;
use crate::models::{NewUser, Role, User, UserChanges, UserProfile};

/// Secrets and limits the auth service is constructed with.
#[derive(Debug, Clone)]
pub struct AuthSettings {
    /// HMAC secret for session tokens. `None` disables issuing and verifying tokens.
    pub jwt_secret: Option<String>,
    /// Shared secret that elevates a registration to admin. `None` accepts no invite.
    pub admin_invite_token: Option<String>,
    pub token_ttl: chrono::Duration,
}

/// Registration, login, token verification and profile updates.
///
/// Holds its configuration explicitly; nothing here reads the process environment.
#[derive(Debug, Clone)]
pub struct AuthService {
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(settings: AuthSettings) -> Self {
        Self { settings }
    }

    fn signing_secret(&self) -> Result<&str, AppError> {
        self.settings
            .jwt_secret
            .as_deref()
            .ok_or_else(|| AppError::InternalServerError("JWT secret is not configured".into()))
    }

    pub fn issue_token(&self, user_id: Uuid, role: Role) -> Result<String, AppError> {
        encode_token(self.signing_secret()?, user_id, role, self.settings.token_ttl)
    }

    /// Fails with `Unauthorized` on a bad signature, an expired token, or when no
    /// signing secret is configured.
    pub fn verify_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let secret = self
            .settings
            .jwt_secret
            .as_deref()
            .ok_or_else(|| AppError::Unauthorized("Token verification is not configured".into()))?;
        let claims = decode_token(secret, token)?;
        Ok(AuthenticatedUser::new(claims.sub, claims.role))
    }

    /// Role for a new registration. No token (or a blank one) means `member`; a token
    /// that does not match the configured invite secret is rejected, never downgraded.
    pub fn role_for_invite(&self, invite_token: Option<&str>) -> Result<Role, AppError> {
        let supplied = match invite_token.map(str::trim) {
            None | Some("") => return Ok(Role::Member),
            Some(token) => token,
        };

        match self.settings.admin_invite_token.as_deref() {
            Some(expected) if constant_time_eq(expected.as_bytes(), supplied.as_bytes()) => {
                Ok(Role::Admin)
            }
            _ => Err(AppError::invalid_invite()),
        }
    }

    fn respond(&self, user: &User) -> Result<AuthResponse, AppError> {
        let token = self.issue_token(user.id, user.role)?;
        Ok(AuthResponse::new(UserProfile::from(user), token))
    }

    pub async fn register(
        &self,
        pool: &PgPool,
        request: RegisterRequest,
    ) -> Result<AuthResponse, AppError> {
        request.validate()?;
        let role = self.role_for_invite(request.admin_invite_token.as_deref())?;
        self.signing_secret()?;

        if User::email_taken(pool, &request.email, None).await? {
            return Err(AppError::duplicate_email());
        }

        let password = request.password;
        let password_hash = web::block(move || hash_password(&password)).await??;

        let user = User::create(
            pool,
            NewUser {
                name: request.name.trim().to_string(),
                email: request.email,
                password_hash,
                role,
                profile_image_url: request.profile_image_url,
            },
        )
        .await?;

        info!("Registered {} user {}", user.role.as_str(), user.id);
        self.respond(&user)
    }

    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, pool: &PgPool, request: LoginRequest) -> Result<AuthResponse, AppError> {
        request.validate()?;

        let user = User::find_by_email(pool, &request.email)
            .await?
            .ok_or_else(AppError::invalid_credentials)?;

        let password = request.password;
        let password_hash = user.password_hash.clone();
        let matches = web::block(move || verify_password(&password, &password_hash)).await??;
        if !matches {
            return Err(AppError::invalid_credentials());
        }

        self.respond(&user)
    }

    pub async fn profile(&self, pool: &PgPool, user_id: Uuid) -> Result<UserProfile, AppError> {
        let user = User::find_by_id(pool, user_id)
            .await?
            .ok_or_else(AppError::user_not_found)?;
        Ok(UserProfile::from(&user))
    }

    /// Partial update of the caller's own profile. Returns a freshly issued token.
    pub async fn update_profile(
        &self,
        pool: &PgPool,
        user_id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<AuthResponse, AppError> {
        request.validate()?;
        if let Some(password) = &request.password {
            ensure_strong_enough(password)?;
        }
        self.signing_secret()?;

        if let Some(email) = &request.email {
            if User::email_taken(pool, email, Some(user_id)).await? {
                return Err(AppError::duplicate_email());
            }
        }

        let password_hash = match request.password {
            Some(password) => Some(web::block(move || hash_password(&password)).await??),
            None => None,
        };

        let user = User::update(
            pool,
            user_id,
            UserChanges {
                name: request.name.map(|name| name.trim().to_string()),
                email: request.email,
                password_hash,
                profile_image_url: request.profile_image_url,
            },
        )
        .await?;

        info!("Updated profile of user {}", user.id);
        self.respond(&user)
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service(secret: Option<&str>, invite: Option<&str>) -> AuthService {
        AuthService::new(AuthSettings {
            jwt_secret: secret.map(String::from),
            admin_invite_token: invite.map(String::from),
            token_ttl: chrono::Duration::days(7),
        })
    }

    #[test]
    fn test_issue_and_verify_round_trip() {
        let auth = service(Some("secret"), None);
        let user_id = Uuid::new_v4();

        let token = auth.issue_token(user_id, Role::Admin).unwrap();
        let user = auth.verify_token(&token).unwrap();

        assert_eq!(user, AuthenticatedUser::new(user_id, Role::Admin));
    }

    #[test]
    fn test_verify_fails_without_secret() {
        let token = service(Some("secret"), None)
            .issue_token(Uuid::new_v4(), Role::Member)
            .unwrap();

        let unconfigured = service(None, None);
        assert!(matches!(
            unconfigured.verify_token(&token),
            Err(AppError::Unauthorized(_))
        ));
        assert!(matches!(
            unconfigured.issue_token(Uuid::new_v4(), Role::Member),
            Err(AppError::InternalServerError(_))
        ));
    }

    #[test]
    fn test_verify_rejects_other_secret() {
        let token = service(Some("one"), None)
            .issue_token(Uuid::new_v4(), Role::Member)
            .unwrap();
        assert!(matches!(
            service(Some("two"), None).verify_token(&token),
            Err(AppError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_invite_token_grants_admin() {
        let auth = service(Some("secret"), Some("open-sesame"));
        assert_eq!(auth.role_for_invite(Some("open-sesame")).unwrap(), Role::Admin);
    }

    #[test]
    fn test_absent_invite_token_is_member() {
        let auth = service(Some("secret"), Some("open-sesame"));
        assert_eq!(auth.role_for_invite(None).unwrap(), Role::Member);
        assert_eq!(auth.role_for_invite(Some("  ")).unwrap(), Role::Member);
    }

    #[test]
    fn test_wrong_invite_token_is_rejected() {
        let auth = service(Some("secret"), Some("open-sesame"));
        assert!(matches!(
            auth.role_for_invite(Some("open-sesame!")),
            Err(AppError::Forbidden(_))
        ));
        assert!(matches!(
            auth.role_for_invite(Some("OPEN-SESAME")),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_invite_rejected_when_not_configured() {
        let auth = service(Some("secret"), None);
        assert!(matches!(
            auth.role_for_invite(Some("anything")),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn test_constant_time_eq() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }
}
