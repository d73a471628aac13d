use crate::error::ExtractError;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};

/// Final path component of an uploaded name, rejecting names that would
/// escape the working directory.
pub fn upload_file_name(raw: &str) -> Result<String, ExtractError> {
    let name = raw
        .rsplit(['/', '\\'])
        .next()
        .map(str::trim)
        .unwrap_or_default();

    if name.is_empty() || name == "." || name == ".." {
        return Err(ExtractError::MissingFileName(raw.to_string()));
    }

    Ok(name.to_string())
}

/// Writes upload bytes to `<workdir>/<file_name>`, creating the directory on demand.
pub async fn persist_upload(
    workdir: &Path,
    file_name: &str,
    bytes: &[u8],
) -> Result<PathBuf, ExtractError> {
    tokio::fs::create_dir_all(workdir).await?;
    let path = workdir.join(file_name);
    tokio::fs::write(&path, bytes).await?;
    Ok(path)
}

pub fn digest_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}
