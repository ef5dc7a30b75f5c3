//! Gateway request signatures
//!
//! Both directions sign the same canonical string:
//!
//! ```text
//! {METHOD} {PATH}\n{CLIENT_ID}.{TIMESTAMP}.{BODY}
//! ```
//!
//! with RSASSA-PKCS1-v1_5 over SHA-256. Signatures travel base64 encoded and
//! URL-encoded, either bare or inside the header form
//! `algorithm=RSA256,keyVersion=1,signature=<value>`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use rsa::pkcs1::{DecodeRsaPrivateKey, DecodeRsaPublicKey};
use rsa::pkcs1v15::{Signature, SigningKey, VerifyingKey};
use rsa::pkcs8::{DecodePrivateKey, DecodePublicKey};
use rsa::signature::{SignatureEncoding, Signer, Verifier};
use rsa::{RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use thiserror::Error;

pub type SignatureResult<T> = Result<T, SignatureError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("Malformed key material: {message}")]
    MalformedKey { message: String },

    #[error("Malformed signature encoding: {message}")]
    MalformedSignature { message: String },
}

impl SignatureError {
    pub fn malformed_key(message: impl Into<String>) -> Self {
        Self::MalformedKey {
            message: message.into(),
        }
    }

    pub fn malformed_signature(message: impl Into<String>) -> Self {
        Self::MalformedSignature {
            message: message.into(),
        }
    }
}

/// The parts of an HTTP exchange covered by a gateway signature
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignedRequest<'a> {
    pub method: &'a str,
    pub path: &'a str,
    pub client_id: &'a str,
    /// `Request-Time` header value, used verbatim
    pub request_time: &'a str,
    pub body: &'a str,
}

impl<'a> SignedRequest<'a> {
    pub fn canonical_string(&self) -> String {
        canonical_string(
            self.method,
            self.path,
            self.client_id,
            self.request_time,
            self.body,
        )
    }
}

/// Build the canonical signing string.
pub fn canonical_string(
    method: &str,
    path: &str,
    client_id: &str,
    request_time: &str,
    body: &str,
) -> String {
    format!("{} {}\n{}.{}.{}", method, path, client_id, request_time, body)
}

/// Pull the signature value out of a `Signature` header.
///
/// Accepts the `key=value,...` header form or a bare signature.
pub fn signature_from_header(header: &str) -> &str {
    header
        .split(',')
        .map(str::trim)
        .find_map(|part| part.strip_prefix("signature="))
        .unwrap_or_else(|| header.trim())
}

/// Decode a transported signature (URL-encoded base64) into raw bytes.
pub fn decode_signature(value: &str) -> SignatureResult<Vec<u8>> {
    let raw = signature_from_header(value);
    if raw.is_empty() {
        return Err(SignatureError::malformed_signature("signature is empty"));
    }

    let unescaped = urlencoding::decode(raw)
        .map_err(|e| SignatureError::malformed_signature(format!("bad URL encoding: {}", e)))?;

    STANDARD
        .decode(unescaped.as_bytes())
        .map_err(|e| SignatureError::malformed_signature(format!("bad base64: {}", e)))
}

fn strip_whitespace(material: &str) -> String {
    material.chars().filter(|c| !c.is_whitespace()).collect()
}

fn decode_der(material: &str) -> SignatureResult<Vec<u8>> {
    STANDARD
        .decode(strip_whitespace(material))
        .map_err(|e| {
            SignatureError::malformed_key(format!("key is neither PEM nor base64 DER: {}", e))
        })
}

/// Parse a public key given as SPKI PEM, PKCS#1 PEM or bare base64 DER.
pub fn parse_public_key(material: &str) -> SignatureResult<RsaPublicKey> {
    let material = material.trim();
    if material.is_empty() {
        return Err(SignatureError::malformed_key("public key is empty"));
    }

    if material.contains("BEGIN RSA PUBLIC KEY") {
        return RsaPublicKey::from_pkcs1_pem(material)
            .map_err(|e| SignatureError::malformed_key(e.to_string()));
    }
    if material.contains("BEGIN PUBLIC KEY") {
        return RsaPublicKey::from_public_key_pem(material)
            .map_err(|e| SignatureError::malformed_key(e.to_string()));
    }

    let der = decode_der(material)?;
    RsaPublicKey::from_public_key_der(&der)
        .or_else(|_| RsaPublicKey::from_pkcs1_der(&der))
        .map_err(|e| SignatureError::malformed_key(e.to_string()))
}

/// Parse a private key given as PKCS#8 PEM, PKCS#1 PEM or bare base64 DER.
pub fn parse_private_key(material: &str) -> SignatureResult<RsaPrivateKey> {
    let material = material.trim();
    if material.is_empty() {
        return Err(SignatureError::malformed_key("private key is empty"));
    }

    if material.contains("BEGIN RSA PRIVATE KEY") {
        return RsaPrivateKey::from_pkcs1_pem(material)
            .map_err(|e| SignatureError::malformed_key(e.to_string()));
    }
    if material.contains("BEGIN PRIVATE KEY") {
        return RsaPrivateKey::from_pkcs8_pem(material)
            .map_err(|e| SignatureError::malformed_key(e.to_string()));
    }

    let der = decode_der(material)?;
    RsaPrivateKey::from_pkcs8_der(&der)
        .or_else(|_| RsaPrivateKey::from_pkcs1_der(&der))
        .map_err(|e| SignatureError::malformed_key(e.to_string()))
}

/// Verifies signatures made by the counterparty's private key
#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    key: VerifyingKey<Sha256>,
}

impl SignatureVerifier {
    pub fn new(public_key: RsaPublicKey) -> Self {
        Self {
            key: VerifyingKey::new(public_key),
        }
    }

    pub fn from_public_key(material: &str) -> SignatureResult<Self> {
        Ok(Self::new(parse_public_key(material)?))
    }

    /// Check `signature` over the canonical string of `request`.
    ///
    /// `Ok(false)` for a well-formed signature that does not match; `Err` only
    /// when the signature cannot be decoded at all.
    pub fn verify(&self, request: &SignedRequest<'_>, signature: &str) -> SignatureResult<bool> {
        let bytes = decode_signature(signature)?;
        let Ok(signature) = Signature::try_from(bytes.as_slice()) else {
            return Ok(false);
        };

        let message = request.canonical_string();
        Ok(self.key.verify(message.as_bytes(), &signature).is_ok())
    }
}

/// Signs outbound gateway requests with the merchant private key
#[derive(Debug, Clone)]
pub struct RequestSigner {
    key: SigningKey<Sha256>,
    public_key: RsaPublicKey,
    client_id: String,
    key_version: String,
}

impl RequestSigner {
    pub fn new(
        private_key: RsaPrivateKey,
        client_id: impl Into<String>,
        key_version: impl Into<String>,
    ) -> Self {
        let public_key = private_key.to_public_key();
        Self {
            key: SigningKey::new(private_key),
            public_key,
            client_id: client_id.into(),
            key_version: key_version.into(),
        }
    }

    pub fn from_private_key(
        material: &str,
        client_id: impl Into<String>,
        key_version: impl Into<String>,
    ) -> SignatureResult<Self> {
        Ok(Self::new(parse_private_key(material)?, client_id, key_version))
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Base64 signature over the canonical string (not URL-encoded).
    pub fn sign(&self, method: &str, path: &str, request_time: &str, body: &str) -> String {
        let message = canonical_string(method, path, &self.client_id, request_time, body);
        let signature: Signature = self.key.sign(message.as_bytes());
        STANDARD.encode(signature.to_bytes())
    }

    /// Full `Signature` header value for a request.
    pub fn signature_header(
        &self,
        method: &str,
        path: &str,
        request_time: &str,
        body: &str,
    ) -> String {
        let signature = self.sign(method, path, request_time, body);
        format!(
            "algorithm=RSA256,keyVersion={},signature={}",
            self.key_version,
            urlencoding::encode(&signature)
        )
    }

    /// Verifier for signatures produced by this signer.
    pub fn verifier(&self) -> SignatureVerifier {
        SignatureVerifier::new(self.public_key.clone())
    }
}
