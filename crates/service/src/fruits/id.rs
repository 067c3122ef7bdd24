use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use rand::{rngs::OsRng, RngCore};

use crate::errors::ServiceError;

/// Raw random bytes per id; 6 bytes encode to 8 base64 characters.
pub const ID_RAW_LEN: usize = 6;
pub const ID_LEN: usize = 8;

/// New id from the OS CSPRNG, URL-safe base64 without padding.
pub fn generate_id() -> Result<String, ServiceError> {
    let mut raw = [0u8; ID_RAW_LEN];
    OsRng
        .try_fill_bytes(&mut raw)
        .map_err(|e| ServiceError::IdGeneration(e.to_string()))?;
    Ok(URL_SAFE_NO_PAD.encode(raw))
}
