use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::debug;
use url::Url;

use crate::{error::AppError, models::media::StoredObject};

/// Path prefix under which stored files are served.
pub const PUBLIC_PREFIX: &str = "uploads";

#[derive(Clone)]
pub struct StorageService {
    root: Arc<PathBuf>,
    base_url: Arc<Url>,
}

impl StorageService {
    pub fn new(root: PathBuf, base_url: Url) -> Self {
        Self {
            root: Arc::new(root),
            base_url: Arc::new(base_url),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_structure(&self) -> Result<(), AppError> {
        fs::create_dir_all(self.root()).await?;
        Ok(())
    }

    pub fn user_dir(&self, owner_uuid: &str) -> PathBuf {
        self.root().join(owner_uuid)
    }

    /// Writes `data` content-addressed under the owner's directory. Uploading
    /// the same bytes twice yields the same key.
    pub async fn store(
        &self,
        owner_uuid: &str,
        content_type: &str,
        data: &[u8],
    ) -> Result<StoredObject, AppError> {
        if data.is_empty() {
            return Err(AppError::BadRequest("uploaded file is empty".into()));
        }
        let extension = image_extension(content_type)?;
        let digest = hex::encode(Sha256::digest(data));
        let key = format!("{owner_uuid}/{digest}.{extension}");
        let path = self.path_for(&key)?;

        fs::create_dir_all(self.user_dir(owner_uuid)).await?;
        if !fs::try_exists(&path).await? {
            fs::write(&path, data).await?;
        }
        debug!(key = %key, bytes = data.len(), "stored upload");

        Ok(StoredObject {
            url: self.url_for(&key)?,
            storage_key: key.clone(),
            content_type: content_type_for_key(&key),
            size_bytes: data.len() as i64,
        })
    }

    pub async fn exists(&self, key: &str) -> Result<bool, AppError> {
        let path = self.path_for(key)?;
        Ok(fs::try_exists(path).await?)
    }

    pub async fn size_of(&self, key: &str) -> Result<u64, AppError> {
        let path = self.path_for(key)?;
        Ok(fs::metadata(path).await?.len())
    }

    /// Removes a stored file; a file that is already gone is not an error.
    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        let path = self.path_for(key)?;
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    pub fn owns(&self, owner_uuid: &str, key: &str) -> bool {
        key.split_once('/')
            .map(|(owner, _)| owner == owner_uuid)
            .unwrap_or(false)
    }

    pub fn url_for(&self, key: &str) -> Result<String, AppError> {
        let url = self
            .base_url
            .join(&format!("{PUBLIC_PREFIX}/{key}"))
            .map_err(|err| AppError::Other(err.into()))?;
        Ok(url.to_string())
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, AppError> {
        if !is_valid_key(key) {
            return Err(AppError::BadRequest("invalid storage key".into()));
        }
        Ok(self.root().join(key))
    }
}

/// Keys look like `<owner>/<file>`; both parts are restricted to a safe
/// alphabet so a key can never leave the storage root.
pub fn is_valid_key(key: &str) -> bool {
    let Some((owner, file)) = key.split_once('/') else {
        return false;
    };
    let safe = |part: &str| {
        !part.is_empty()
            && !part.starts_with('.')
            && part
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    };
    safe(owner) && safe(file) && !file.contains("..")
}

/// File extension for an image content type. Common types get their usual
/// extension; any other `image/<subtype>` keeps the subtype so the content
/// type can be recovered from the key.
pub fn image_extension(content_type: &str) -> Result<String, AppError> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let ext = match mime.as_str() {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/heic" => "heic",
        "image/avif" => "avif",
        other => match other.strip_prefix("image/") {
            Some(subtype) if is_plain_subtype(subtype) => subtype,
            _ => {
                return Err(AppError::BadRequest(format!(
                    "unsupported content type {content_type:?}, expected an image"
                )))
            }
        },
    };
    Ok(ext.to_string())
}

fn is_plain_subtype(subtype: &str) -> bool {
    !subtype.is_empty()
        && !subtype.contains("..")
        && subtype
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.'))
}

/// Content type implied by a key's extension, the inverse of [`image_extension`].
pub fn content_type_for_key(key: &str) -> String {
    let ext = key
        .rsplit_once('/')
        .map_or(key, |(_, file)| file)
        .split_once('.')
        .map(|(_, ext)| ext);
    match ext {
        Some("jpg") => "image/jpeg".into(),
        Some("png") => "image/png".into(),
        Some("gif") => "image/gif".into(),
        Some("webp") => "image/webp".into(),
        Some("heic") => "image/heic".into(),
        Some("avif") => "image/avif".into(),
        Some(other) if is_plain_subtype(other) => format!("image/{other}"),
        _ => "application/octet-stream".into(),
    }
}
