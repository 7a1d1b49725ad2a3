// security/src/credentials.rs
use log::{info, warn};
use lib::services::StaffService;
use once_cell::sync::Lazy;
use models::{Actor, Login, Staff, StaffProfile};
use serde::{Deserialize, Serialize};

use crate::jwt::{TokenKind, TokenPair, TokenService};
use crate::AuthError;

// Verified against when the email is unknown, so both failure paths pay the
// same bcrypt cost.
static UNKNOWN_ACCOUNT_HASH: Lazy<String> =
    Lazy::new(|| Staff::hash_password("no-such-account").unwrap_or_default());

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub staff: StaffProfile,
}

/// Email/password login and token refresh over the staff records.
#[derive(Clone)]
pub struct CredentialService {
    staff: StaffService,
    tokens: TokenService,
}

impl CredentialService {
    pub fn new(staff: StaffService, tokens: TokenService) -> Self {
        CredentialService { staff, tokens }
    }

    pub fn tokens(&self) -> &TokenService {
        &self.tokens
    }

    /// Logs in a staff member. Returns a token pair on success.
    pub async fn login(&self, login: Login) -> Result<LoginResponse, AuthError> {
        let staff = self.staff.get_by_email(&login.email).await?;
        let stored_hash = staff.as_ref().map(|s| s.password_hash.clone());
        let matched = password_matches(login.password, stored_hash).await;
        let staff = match staff {
            Some(staff) if matched => staff,
            Some(staff) => {
                warn!("Failed login for {}", staff.email);
                return Err(AuthError::InvalidCredentials);
            }
            None => return Err(AuthError::InvalidCredentials),
        };
        if !staff.is_active {
            return Err(AuthError::InactiveAccount);
        }

        let staff = self.staff.record_login(staff.id).await?;
        let actor = Actor::new(staff.id, staff.role);
        let tokens = self.tokens.issue_pair(&actor)?;
        info!("Staff {} logged in", staff.id);
        Ok(LoginResponse { tokens, staff: staff.profile() })
    }

    /// Exchanges a refresh token for a new pair, re-reading the account so
    /// deactivated or deleted staff cannot renew.
    pub async fn refresh(&self, refresh_token: &str) -> Result<LoginResponse, AuthError> {
        let claims = self.tokens.verify(refresh_token, TokenKind::Refresh)?;
        let actor = self.staff.resolve_actor(claims.staff_id()?).await?;
        let profile = self.staff.get_by_id(&actor, actor.staff_id).await?;
        let tokens = self.tokens.issue_pair(&actor)?;
        Ok(LoginResponse { tokens, staff: profile })
    }

    /// Resolves the acting staff member behind an access token.
    pub async fn authenticate(&self, access_token: &str) -> Result<Actor, AuthError> {
        let claims = self.tokens.verify(access_token, TokenKind::Access)?;
        Ok(self.staff.resolve_actor(claims.staff_id()?).await?)
    }
}

/// Checks `password` against `hash`, or against a placeholder hash when there is
/// no account. The placeholder never matches.
async fn password_matches(password: String, hash: Option<String>) -> bool {
    let verified = tokio::task::spawn_blocking(move || match hash {
        Some(hash) => Staff::verify_password(&password, &hash),
        None => Staff::verify_password(&password, &UNKNOWN_ACCOUNT_HASH).map(|_| false),
    })
    .await;
    match verified {
        Ok(Ok(matches)) => matches,
        Ok(Err(e)) => {
            warn!("Stored password hash could not be verified: {}", e);
            false
        }
        Err(e) => {
            warn!("Password verification task failed: {}", e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use lib::config::BootstrapConfig;
    use lib::services::ensure_admin;
    use lib::storage_engine::{InMemoryStorage, Repositories};
    use models::{Role, ServiceError};
    use std::sync::Arc;

    async fn setup() -> (Repositories, CredentialService, BootstrapConfig) {
        let repos = Repositories::from_store(Arc::new(InMemoryStorage::new()));
        let staff = StaffService::new(repos.clone());
        let config = BootstrapConfig::default();
        ensure_admin(&staff, &config).await.unwrap();
        let tokens = TokenService::new("test-secret", Duration::minutes(15), Duration::hours(1));
        (repos, CredentialService::new(staff, tokens), config)
    }

    #[tokio::test]
    async fn should_login_with_case_insensitive_email() {
        let (_repos, credentials, config) = setup().await;
        let response = credentials
            .login(Login {
                email: config.email.to_uppercase(),
                password: config.password.clone(),
            })
            .await
            .unwrap();
        assert_eq!(response.staff.role, Role::Admin);
        assert!(response.staff.last_login.is_some());

        let actor = credentials.authenticate(&response.tokens.access_token).await.unwrap();
        assert_eq!(actor.staff_id, response.staff.id);

        let refreshed = credentials.refresh(&response.tokens.refresh_token).await.unwrap();
        assert_eq!(refreshed.staff.id, response.staff.id);
        assert!(credentials.refresh(&response.tokens.access_token).await.is_err());
    }

    #[tokio::test]
    async fn should_reject_bad_credentials_uniformly() {
        let (_repos, credentials, config) = setup().await;
        let wrong_password = credentials
            .login(Login { email: config.email.clone(), password: "nope".to_string() })
            .await
            .unwrap_err();
        let unknown = credentials
            .login(Login { email: "ghost@hospital.com".to_string(), password: "nope".to_string() })
            .await
            .unwrap_err();
        assert_eq!(wrong_password.to_string(), unknown.to_string());
        assert_eq!(
            ServiceError::from(unknown),
            ServiceError::Unauthenticated("invalid email or password".to_string())
        );
    }

    #[tokio::test]
    async fn should_run_bcrypt_for_unknown_emails() {
        assert!(UNKNOWN_ACCOUNT_HASH.starts_with("$2"));
        assert!(Staff::verify_password("no-such-account", &UNKNOWN_ACCOUNT_HASH).unwrap());
        assert!(!password_matches("no-such-account".to_string(), None).await);

        let hash = Staff::hash_password("correct").unwrap();
        assert!(password_matches("correct".to_string(), Some(hash.clone())).await);
        assert!(!password_matches("wrong".to_string(), Some(hash)).await);
    }

    #[tokio::test]
    async fn should_refuse_inactive_accounts() {
        let (repos, credentials, config) = setup().await;
        let mut admin = repos.staff.find_by_email(&config.email).await.unwrap().unwrap();
        let pair = credentials
            .tokens()
            .issue_pair(&Actor::new(admin.id, admin.role))
            .unwrap();
        admin.is_active = false;
        repos.staff.update(admin).await.unwrap();

        let err = credentials
            .login(Login { email: config.email.clone(), password: config.password.clone() })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::InactiveAccount));

        let err = credentials.authenticate(&pair.access_token).await.unwrap_err();
        assert_eq!(ServiceError::from(err), ServiceError::Forbidden("account inactive".to_string()));
    }
}
