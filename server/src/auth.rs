use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use derive_more::Display;
use jsonwebtoken::{
    errors::Error as JwtError, Algorithm, DecodingKey, EncodingKey, Header as JwtHeader,
    Validation,
};
use model::user::User;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use storage::user::Identity;
use tracing::instrument;
use uuid::Uuid;

use crate::{error::Error, AppResult, AppState};

static BEARER_AUTH_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new("^Bearer ([a-zA-Z0-9_=.-]{16,})$").unwrap());

#[derive(Debug, Display)]
pub enum AuthError {
    #[display("Authorization header missing")]
    MissingHeader,
    #[display("Authorization header is invalid")]
    InvalidHeader,
    #[display("User is blocked")]
    Blocked,
    #[display("User was deleted")]
    Deleted,
    #[display("User is not an admin")]
    NotAdmin,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

/// Claims of an access token issued by the identity provider.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: String,
    pub aud: String,
    pub exp: u64,
    #[serde(default)]
    pub user_metadata: UserMetadata,
}

impl Claims {
    pub fn identity(&self) -> Identity<'_> {
        let metadata = &self.user_metadata;
        Identity {
            id: self.sub,
            email: &self.email,
            name: metadata.full_name.as_deref().or(metadata.name.as_deref()),
            avatar_url: metadata.avatar_url.as_deref(),
        }
    }
}

#[derive(Clone)]
pub struct AuthState {
    encoding: Arc<EncodingKey>,
    decoding: Arc<DecodingKey>,
    validation: Arc<Validation>,
}

impl AuthState {
    pub fn new(secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_required_spec_claims(&["exp", "sub", "aud"]);
        validation.set_audience(&[audience]);
        Self {
            encoding: Arc::new(EncodingKey::from_secret(secret.as_bytes())),
            decoding: Arc::new(DecodingKey::from_secret(secret.as_bytes())),
            validation: Arc::new(validation),
        }
    }

    pub fn encode(&self, claims: &Claims) -> Result<String, JwtError> {
        jsonwebtoken::encode(&JwtHeader::new(Algorithm::HS256), claims, &self.encoding)
    }

    pub fn decode(&self, token: &str) -> Result<Claims, JwtError> {
        jsonwebtoken::decode(token, &self.decoding, &self.validation).map(|data| data.claims)
    }
}

#[derive(Debug, Clone)]
pub struct SessionInfo {
    pub user: Uuid,
    pub email: String,
    pub is_admin: bool,
}

impl SessionInfo {
    pub fn check_admin(&self) -> AppResult<()> {
        if self.is_admin {
            Ok(())
        } else {
            Err(AuthError::NotAdmin.into())
        }
    }
}

impl From<User> for SessionInfo {
    fn from(user: User) -> Self {
        Self {
            user: user.id,
            email: user.email,
            is_admin: user.is_admin,
        }
    }
}

fn find_token(parts: &Parts) -> Result<Option<&str>, Error> {
    let Some(header) = parts.headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };
    let header = header.to_str().map_err(|_| AuthError::InvalidHeader)?;
    let Some(captures) = BEARER_AUTH_REGEX.captures(header) else {
        return Err(AuthError::InvalidHeader.into());
    };
    match captures.get(1) {
        Some(m) => Ok(Some(m.as_str())),
        None => Err(AuthError::InvalidHeader.into()),
    }
}

#[instrument(skip_all)]
async fn authenticate(state: &AppState, token: &str) -> AppResult<SessionInfo> {
    let claims = state.auth().decode(token)?;
    let conn = state.conn().await?;
    let Some(user) = storage::user::provision(&conn, &claims.identity()).await? else {
        tracing::info!(user = %claims.sub, "rejected deleted user");
        return Err(AuthError::Deleted.into());
    };
    if !user.is_active {
        tracing::info!(user = %user.id, "rejected blocked user");
        return Err(AuthError::Blocked.into());
    }
    Ok(user.into())
}

/// Requires a valid bearer token of an active user.
pub struct ApiAuth(pub SessionInfo);

#[axum::async_trait]
impl FromRequestParts<AppState> for ApiAuth {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = find_token(parts)?.ok_or(AuthError::MissingHeader)?;
        Ok(Self(authenticate(state, token).await?))
    }
}

/// Like [`ApiAuth`] but lets anonymous requests through. A header that is
/// present must still be valid.
pub struct OptionalAuth(pub Option<SessionInfo>);

#[axum::async_trait]
impl FromRequestParts<AppState> for OptionalAuth {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match find_token(parts)? {
            Some(token) => Ok(Self(Some(authenticate(state, token).await?))),
            None => Ok(Self(None)),
        }
    }
}

impl OptionalAuth {
    pub fn user(&self) -> Option<Uuid> {
        self.0.as_ref().map(|session| session.user)
    }

    pub fn is_admin(&self) -> bool {
        self.0.as_ref().is_some_and(|session| session.is_admin)
    }
}

/// An authenticated admin.
pub struct AdminAuth(pub SessionInfo);

#[axum::async_trait]
impl FromRequestParts<AppState> for AdminAuth {
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let ApiAuth(session) = ApiAuth::from_request_parts(parts, state).await?;
        session.check_admin()?;
        Ok(Self(session))
    }
}
