use std::time::{Duration, SystemTime, UNIX_EPOCH};

use axum::{extract::FromRequestParts, http::header::AUTHORIZATION, http::request::Parts};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use pbkdf2::pbkdf2_hmac;
use rand::RngCore;
use sha2::Sha256;
use tracing::info;
use uuid::Uuid;

use crate::{
    dao::models::ParticipantEntity,
    dto::auth::{AuthResponse, SigninRequest, SignupRequest},
    error::{AppError, ServiceError},
    state::SharedState,
};

type HmacSha256 = Hmac<Sha256>;

const PBKDF2_ROUNDS: u32 = 100_000;
const SALT_LEN: usize = 16;
const KEY_LEN: usize = 32;

/// Signs and verifies the bearer tokens handed out at registration.
///
/// A token is `base64url(participant_id:expiry_unix_secs) . base64url(hmac)`,
/// so verification needs no session storage.
#[derive(Clone)]
pub struct TokenSigner {
    secret: Vec<u8>,
    ttl: Duration,
}

impl TokenSigner {
    /// Build a signer from the shared secret and token lifetime.
    pub fn new(secret: impl Into<Vec<u8>>, ttl: Duration) -> Self {
        Self {
            secret: secret.into(),
            ttl,
        }
    }

    /// Mint a token binding `participant` until the configured expiry.
    pub fn mint(&self, participant: Uuid) -> String {
        let expiry = SystemTime::now() + self.ttl;
        let expiry_secs = expiry
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(0);
        let payload = format!("{participant}:{expiry_secs}");
        let signature = self.sign(payload.as_bytes());
        format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(payload.as_bytes()),
            URL_SAFE_NO_PAD.encode(signature)
        )
    }

    /// Verify a token and return the participant id it binds, or `None` for
    /// malformed, tampered, or expired tokens.
    pub fn verify(&self, token: &str) -> Option<Uuid> {
        let (payload_b64, signature_b64) = token.split_once('.')?;
        let payload = URL_SAFE_NO_PAD.decode(payload_b64).ok()?;
        let signature = URL_SAFE_NO_PAD.decode(signature_b64).ok()?;

        let mut mac = HmacSha256::new_from_slice(&self.secret).ok()?;
        mac.update(&payload);
        mac.verify_slice(&signature).ok()?;

        let payload = String::from_utf8(payload).ok()?;
        let (id, expiry_secs) = payload.split_once(':')?;
        let expiry_secs: u64 = expiry_secs.parse().ok()?;
        let now_secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| elapsed.as_secs())
            .unwrap_or(u64::MAX);
        if now_secs > expiry_secs {
            return None;
        }

        Uuid::parse_str(id).ok()
    }

    fn sign(&self, payload: &[u8]) -> Vec<u8> {
        let mut mac =
            HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size");
        mac.update(payload);
        mac.finalize().into_bytes().to_vec()
    }
}

/// Extractor asserting a valid bearer token; yields the participant id.
pub struct AuthParticipant(pub Uuid);

impl FromRequestParts<SharedState> for AuthParticipant {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &SharedState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::Unauthorized("missing authorization header".into()))?;
        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| AppError::Unauthorized("expected a bearer token".into()))?;

        state
            .tokens()
            .verify(token)
            .map(AuthParticipant)
            .ok_or_else(|| AppError::Unauthorized("invalid or expired token".into()))
    }
}

/// Hash a password with PBKDF2-HMAC-SHA256 and a fresh random salt.
pub fn hash_password(password: &str) -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    let mut key = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ROUNDS, &mut key);
    format!(
        "{}${}",
        URL_SAFE_NO_PAD.encode(salt),
        URL_SAFE_NO_PAD.encode(key)
    )
}

/// Check `password` against a stored `hash_password` value.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt_b64, key_b64)) = stored.split_once('$') else {
        return false;
    };
    let (Ok(salt), Ok(key)) = (
        URL_SAFE_NO_PAD.decode(salt_b64),
        URL_SAFE_NO_PAD.decode(key_b64),
    ) else {
        return false;
    };

    let mut candidate = [0u8; KEY_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, PBKDF2_ROUNDS, &mut candidate);

    // Constant-time comparison through the MAC layer.
    let Ok(mut mac) = HmacSha256::new_from_slice(&salt) else {
        return false;
    };
    mac.update(&candidate);
    let candidate_tag = mac.finalize().into_bytes();
    let Ok(mut mac) = HmacSha256::new_from_slice(&salt) else {
        return false;
    };
    mac.update(&key);
    mac.finalize().into_bytes() == candidate_tag
}

/// Register a new participant and hand back their first token.
pub async fn signup(
    state: &SharedState,
    request: SignupRequest,
) -> Result<AuthResponse, ServiceError> {
    let store = state.require_store().await?;

    if store
        .find_participant_by_email(&request.email)
        .await?
        .is_some()
    {
        return Err(ServiceError::Conflict("User already exists".into()));
    }

    let participant = ParticipantEntity {
        id: Uuid::new_v4(),
        name: request.name,
        email: request.email,
        password_hash: hash_password(&request.password),
        highest_score: 0,
        created_at: SystemTime::now(),
    };

    if !store.insert_participant(participant.clone()).await? {
        return Err(ServiceError::Conflict("User already exists".into()));
    }

    info!(participant_id = %participant.id, "participant registered");

    Ok(AuthResponse {
        message: "User created successfully".into(),
        token: state.tokens().mint(participant.id),
        participant_id: participant.id,
    })
}

/// Verify credentials and mint a fresh token.
pub async fn signin(
    state: &SharedState,
    request: SigninRequest,
) -> Result<AuthResponse, ServiceError> {
    let store = state.require_store().await?;

    let participant = store
        .find_participant_by_email(&request.email)
        .await?
        .filter(|participant| verify_password(&request.password, &participant.password_hash))
        .ok_or_else(|| ServiceError::Unauthorized("Incorrect Credentials".into()))?;

    Ok(AuthResponse {
        message: "User signed in successfully".into(),
        token: state.tokens().mint(participant.id),
        participant_id: participant.id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer() -> TokenSigner {
        TokenSigner::new(*b"test-secret-test-secret-test-sec", Duration::from_secs(60))
    }

    #[test]
    fn minted_tokens_verify_back_to_the_participant() {
        let signer = signer();
        let id = Uuid::new_v4();
        let token = signer.mint(id);
        assert_eq!(signer.verify(&token), Some(id));
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let signer = signer();
        let token = signer.mint(Uuid::new_v4());
        let mut tampered = token.clone();
        tampered.replace_range(0..1, if token.starts_with('A') { "B" } else { "A" });
        assert_eq!(signer.verify(&tampered), None);
        assert_eq!(signer.verify("not-a-token"), None);
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let signer = TokenSigner::new(b"secret".to_vec(), Duration::ZERO);
        let token = signer.mint(Uuid::new_v4());
        // TTL of zero expires within the same second boundary at worst.
        std::thread::sleep(Duration::from_millis(1_100));
        assert_eq!(signer.verify(&token), None);
    }

    #[test]
    fn password_hashes_verify_and_salts_differ() {
        let first = hash_password("correct horse");
        let second = hash_password("correct horse");

        assert_ne!(first, second);
        assert!(verify_password("correct horse", &first));
        assert!(verify_password("correct horse", &second));
        assert!(!verify_password("wrong horse", &first));
        assert!(!verify_password("correct horse", "garbage"));
    }
}
