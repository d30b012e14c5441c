//! HTTP-shaped request/response bodies.
//!
//! Shape only — transport and routing live in an external collaborator.
//! These types define the JSON contract for `POST /auth/login`,
//! `POST /auth/2fa/setup`, `POST /auth/2fa/verify`,
//! `POST /auth/change-password`, and `POST /auth/refresh`.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::session::{ConfirmedEnrollment, LoginOutcome, RefreshedAccess, TwoFactorSetup};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged, rename_all = "camelCase")]
pub enum LoginResponse {
    #[serde(rename_all = "camelCase")]
    Tokens {
        access_token: String,
        refresh_token: String,
    },
    #[serde(rename_all = "camelCase")]
    TwoFactorChallenge { challenge_token: String },
}

impl From<LoginOutcome> for LoginResponse {
    fn from(outcome: LoginOutcome) -> Self {
        match outcome {
            LoginOutcome::Authenticated(session) => LoginResponse::Tokens {
                access_token: session.tokens.access_token,
                refresh_token: session.tokens.refresh_token,
            },
            LoginOutcome::TwoFactorRequired { challenge_token } => {
                LoginResponse::TwoFactorChallenge { challenge_token }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorSetupRequest {
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorSetupResponse {
    pub secret: String,
    pub otpauth_url: String,
    /// Base64-encoded PNG of the provisioning QR code.
    pub qr_code: String,
}

impl From<TwoFactorSetup> for TwoFactorSetupResponse {
    fn from(setup: TwoFactorSetup) -> Self {
        Self {
            secret: setup.secret_base32,
            otpauth_url: setup.otpauth_url,
            qr_code: STANDARD.encode(setup.qr_png),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwoFactorVerifyRequest {
    /// The submitted one-time code.
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TwoFactorVerifyResponse {
    pub verified: bool,
    /// Present only when this verification confirmed a pending
    /// enrollment — shown once, never retrievable again.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_codes: Option<Vec<String>>,
}

impl From<ConfirmedEnrollment> for TwoFactorVerifyResponse {
    fn from(confirmed: ConfirmedEnrollment) -> Self {
        Self {
            verified: true,
            backup_codes: Some(confirmed.backup_codes),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangePasswordResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    pub access_token: String,
    pub expires_in: u64,
}

impl From<RefreshedAccess> for RefreshResponse {
    fn from(refreshed: RefreshedAccess) -> Self {
        Self {
            access_token: refreshed.access_token,
            expires_in: refreshed.expires_in,
        }
    }
}
