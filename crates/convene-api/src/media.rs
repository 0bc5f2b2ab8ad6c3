//! Presigned uploads to S3-compatible object storage (Cloudflare R2).
//!
//! The API never proxies image bytes. For each media field the client
//! describes what it wants to upload; the server picks the object key, signs
//! a short-lived PUT URL and immediately records the public URL the object
//! will be served from.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use tracing::debug;
use uuid::Uuid;

use convene_types::api::{MediaDescriptor, UploadTicket};

use crate::error::ApiError;

pub const UPLOAD_URL_TTL_SECS: u64 = 30;

const MAX_FILENAME: usize = 255;

/// Accepted content types and the extension used in the object key.
const ALLOWED_TYPES: &[(&str, &str)] = &[
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
    ("image/avif", "avif"),
];

fn extension_for(content_type: &str) -> Option<&'static str> {
    let content_type = content_type.trim().to_ascii_lowercase();
    ALLOWED_TYPES
        .iter()
        .find(|(ty, _)| *ty == content_type)
        .map(|(_, ext)| *ext)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaField {
    Thumbnail,
    Banner,
}

impl MediaField {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thumbnail => "thumbnail",
            Self::Banner => "banner",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PresignedUpload {
    pub upload_url: String,
    pub public_url: String,
}

/// Object storage able to hand out pre-authorized upload URLs.
pub trait MediaStore: Send + Sync {
    fn presign_put(&self, key: &str, content_type: &str, expires_in: u64) -> anyhow::Result<PresignedUpload>;
}

/// Check a descriptor, choose its object key and presign the upload.
pub fn reserve_upload(
    store: &dyn MediaStore,
    field: MediaField,
    media: &MediaDescriptor,
) -> Result<UploadTicket, ApiError> {
    let filename = media.filename.trim();
    if filename.is_empty() || filename.chars().count() > MAX_FILENAME {
        return Err(ApiError::field(
            field.as_str(),
            format!("filename must be between 1 and {} characters", MAX_FILENAME),
        ));
    }
    let Some(ext) = extension_for(&media.content_type) else {
        return Err(ApiError::field(
            field.as_str(),
            "content_type must be one of image/jpeg, image/png, image/webp, image/gif, image/avif",
        ));
    };

    let key = format!("events/{}/{}.{}", Uuid::new_v4(), field.as_str(), ext);
    let content_type = media.content_type.trim().to_ascii_lowercase();
    let presigned = store.presign_put(&key, &content_type, UPLOAD_URL_TTL_SECS)?;
    debug!(key = %key, "Reserved {} upload", field.as_str());

    Ok(UploadTicket {
        field: field.as_str().to_string(),
        upload_url: presigned.upload_url,
        public_url: presigned.public_url,
        expires_in: UPLOAD_URL_TTL_SECS,
    })
}

// -- R2 --

#[derive(Debug, Clone)]
pub struct R2Config {
    pub endpoint: String,
    pub bucket: String,
    pub access_key: String,
    pub secret_key: String,
    pub public_url: String,
    pub region: String,
}

/// Path-style SigV4 presigner for an R2 bucket.
pub struct R2Presigner {
    scheme: String,
    host: String,
    bucket: String,
    access_key: String,
    secret_key: String,
    public_url: String,
    region: String,
}

impl R2Presigner {
    pub fn new(config: R2Config) -> anyhow::Result<Self> {
        let (scheme, rest) = config
            .endpoint
            .split_once("://")
            .ok_or_else(|| anyhow::anyhow!("R2 endpoint must include a scheme: {}", config.endpoint))?;
        if scheme != "https" && scheme != "http" {
            anyhow::bail!("R2 endpoint scheme must be http or https, got {}", scheme);
        }
        let host = rest.split('/').next().unwrap_or_default();
        if host.is_empty() {
            anyhow::bail!("R2 endpoint has no host: {}", config.endpoint);
        }
        if config.bucket.trim().is_empty() {
            anyhow::bail!("R2 bucket must not be empty");
        }

        Ok(Self {
            scheme: scheme.to_string(),
            host: host.to_string(),
            bucket: config.bucket.trim().to_string(),
            access_key: config.access_key,
            secret_key: config.secret_key,
            public_url: config.public_url.trim_end_matches('/').to_string(),
            region: config.region,
        })
    }
}

impl MediaStore for R2Presigner {
    fn presign_put(&self, key: &str, content_type: &str, expires_in: u64) -> anyhow::Result<PresignedUpload> {
        let path = format!("/{}/{}", self.bucket, key);
        let query = presign_query(&PresignParams {
            method: "PUT",
            host: &self.host,
            path: &path,
            extra_headers: &[("content-type", content_type)],
            region: &self.region,
            access_key: &self.access_key,
            secret_key: &self.secret_key,
            expires_in,
            now: Utc::now(),
        })?;

        Ok(PresignedUpload {
            upload_url: format!("{}://{}{}?{}", self.scheme, self.host, encode_path(&path), query),
            public_url: format!("{}/{}", self.public_url, key),
        })
    }
}

// -- SigV4 query signing --

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "AWS4-HMAC-SHA256";
const SERVICE: &str = "s3";

pub(crate) struct PresignParams<'a> {
    pub method: &'a str,
    pub host: &'a str,
    pub path: &'a str,
    /// Signed in addition to `host`. Names must be lowercase.
    pub extra_headers: &'a [(&'a str, &'a str)],
    pub region: &'a str,
    pub access_key: &'a str,
    pub secret_key: &'a str,
    pub expires_in: u64,
    pub now: DateTime<Utc>,
}

/// Canonical query string with `X-Amz-Signature` appended.
pub(crate) fn presign_query(p: &PresignParams<'_>) -> anyhow::Result<String> {
    let amz_date = p.now.format("%Y%m%dT%H%M%SZ").to_string();
    let date = p.now.format("%Y%m%d").to_string();
    let scope = format!("{}/{}/{}/aws4_request", date, p.region, SERVICE);

    let mut headers: Vec<(&str, String)> = vec![("host", p.host.to_string())];
    headers.extend(p.extra_headers.iter().map(|(k, v)| (*k, v.trim().to_string())));
    headers.sort_by(|a, b| a.0.cmp(b.0));
    let signed_headers = headers.iter().map(|(k, _)| *k).collect::<Vec<_>>().join(";");
    let canonical_headers: String = headers.iter().map(|(k, v)| format!("{}:{}\n", k, v)).collect();

    let mut query = vec![
        ("X-Amz-Algorithm", ALGORITHM.to_string()),
        ("X-Amz-Credential", format!("{}/{}", p.access_key, scope)),
        ("X-Amz-Date", amz_date.clone()),
        ("X-Amz-Expires", p.expires_in.to_string()),
        ("X-Amz-SignedHeaders", signed_headers.clone()),
    ];
    query.sort_by(|a, b| a.0.cmp(b.0));
    let canonical_query = query
        .iter()
        .map(|(k, v)| format!("{}={}", urlencoding::encode(k), urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let canonical_request = format!(
        "{}\n{}\n{}\n{}\n{}\nUNSIGNED-PAYLOAD",
        p.method,
        encode_path(p.path),
        canonical_query,
        canonical_headers,
        signed_headers
    );
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        amz_date,
        scope,
        hex::encode(Sha256::digest(canonical_request.as_bytes()))
    );

    let k_date = hmac_sha256(format!("AWS4{}", p.secret_key).as_bytes(), date.as_bytes())?;
    let k_region = hmac_sha256(&k_date, p.region.as_bytes())?;
    let k_service = hmac_sha256(&k_region, SERVICE.as_bytes())?;
    let k_signing = hmac_sha256(&k_service, b"aws4_request")?;
    let signature = hex::encode(hmac_sha256(&k_signing, string_to_sign.as_bytes())?);

    Ok(format!("{}&X-Amz-Signature={}", canonical_query, signature))
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key).map_err(|e| anyhow::anyhow!("HMAC key rejected: {}", e))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}

/// URI-encode each path segment, keeping the separators.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
