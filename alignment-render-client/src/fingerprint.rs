use crate::render_request::invalid_request_error::{InvalidRequestError, RequestField};
use crate::RenderRequest;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt::{self, Display};
use std::str::FromStr;

const ENCODING_VERSION: &[u8] = b"v1";
const ABSENT: &[u8] = b"~";
const PRESENT: &[u8] = b"s";
const HEX_LEN: usize = 64;

/// Content address of a render request.
///
/// Used both as the cache key and as the identity of an in-flight
/// computation. Always 64 lowercase hex characters.
#[derive(Hash, Eq, PartialEq, Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Fingerprint every field of `request` that changes the rendered image.
    pub fn of(request: &RenderRequest) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(ENCODING_VERSION);

        write_field(&mut hasher, "alignment", Some(request.alignment().as_bytes()));
        write_field(&mut hasher, "format", Some(request.format().as_bytes()));
        write_field(
            &mut hasher,
            "alignment_type",
            Some(request.alignment_type().as_str().as_bytes()),
        );
        for (name, flag) in request.options().fields() {
            let value = flag.map(|flag| if flag { "true" } else { "false" });
            write_field(&mut hasher, name, value.map(str::as_bytes));
        }

        Fingerprint(hex::encode(hasher.finalize()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Every field is `name=`, then either `s` + big-endian length + bytes or
/// the absent marker, then `;`. The length prefix keeps field boundaries
/// unambiguous whatever the value contains.
fn write_field(hasher: &mut Sha256, name: &str, value: Option<&[u8]>) {
    hasher.update(name.as_bytes());
    hasher.update(b"=");
    match value {
        Some(bytes) => {
            hasher.update(PRESENT);
            hasher.update((bytes.len() as u64).to_be_bytes());
            hasher.update(bytes);
        }
        None => hasher.update(ABSENT),
    }
    hasher.update(b";");
}

impl FromStr for Fingerprint {
    type Err = InvalidRequestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        if key.len() != HEX_LEN || !key.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(InvalidRequestError::new(
                RequestField::ImageKey,
                key,
                "expected 64 hexadecimal characters",
            ));
        }
        Ok(Fingerprint(key.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = InvalidRequestError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

impl Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
