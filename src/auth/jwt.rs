// JWT token creation and verification
// Admin sessions are issued elsewhere; this crate only verifies them

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Role required for every admin route
pub const ADMIN_ROLE: &str = "admin";

/// JWT claims structure
///
/// # Fields
/// * `sub` - Subject (user id of the session holder)
/// * `role` - Dashboard role, e.g. `admin` or `agent`
/// * `exp` - Expiry time (seconds since epoch)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub role: String,
    pub exp: usize,
}

impl Claims {
    pub fn is_admin(&self) -> bool {
        self.role == ADMIN_ROLE
    }
}

/// Creates a JWT token
///
/// # Token Properties
/// - Expires after 8 hours
/// - Signed with HS256 algorithm
///
/// # Example
/// ```
/// use docdesk_api::auth::jwt::{create_token, verify_token, ADMIN_ROLE};
///
/// let token = create_token("admin-1", ADMIN_ROLE, "your-secret-key").expect("valid token");
/// let claims = verify_token(&token, "your-secret-key").expect("valid token");
/// assert!(claims.is_admin());
/// ```
pub fn create_token(subject: &str, role: &str, secret: &str) -> Result<String, String> {
    let expiry = Utc::now() + Duration::hours(8);
    let claims = Claims {
        sub: subject.to_string(),
        role: role.to_string(),
        exp: expiry.timestamp() as usize,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| e.to_string())
}

/// Verifies and decodes a JWT token
///
/// # Returns
/// * `Ok(Claims)` - The decoded claims if token is valid
/// * `Err(String)` - If token is invalid or expired
pub fn verify_token(token: &str, secret: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| e.to_string())
}
