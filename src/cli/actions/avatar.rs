use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

use super::{connect, print_json, report, restore};
use crate::cli::commands::backend::Options;
use crate::Error;
use crate::model::AvatarFile;
use crate::validation::validate_avatar;

#[derive(Debug)]
pub enum Command {
    Upload {
        path: Option<PathBuf>,
        content_type: Option<String>,
    },
    Delete,
}

#[derive(Debug)]
pub struct Args {
    pub backend: Options,
    pub command: Command,
}

/// # Errors
/// Returns an error if the file is missing or unreadable or not an acceptable
/// image, there is no valid session, or the operation fails.
pub async fn execute(args: Args) -> Result<()> {
    let file = match args.command {
        Command::Upload { path, content_type } => Some(
            prepare(path, content_type, args.backend.avatar_max_bytes).await?,
        ),
        Command::Delete => None,
    };

    let orchestrator = connect(&args.backend).await?;
    let context = restore(&orchestrator, &args.backend).await?;

    let profile = match file {
        Some(file) => orchestrator.upload_avatar(&context, Some(file)).await,
        None => orchestrator.delete_avatar(&context).await,
    }
    .map_err(report)?;

    print_json(&profile)
}

/// Read and check the upload locally, before anything touches the network.
async fn prepare(
    path: Option<PathBuf>,
    content_type: Option<String>,
    max_bytes: usize,
) -> Result<AvatarFile> {
    let Some(path) = path else {
        return Err(report(Error::NoFileSelected));
    };
    let file = read_file(&path, content_type).await?;
    validate_avatar(&file, max_bytes).map_err(|err| report(err.into()))?;
    Ok(file)
}

async fn read_file(path: &Path, content_type: Option<String>) -> Result<AvatarFile> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let content_type = content_type.unwrap_or_else(|| guess_content_type(path).to_string());
    Ok(AvatarFile::new(&file_name, &content_type, bytes))
}

fn guess_content_type(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();
    match extension.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "avif" => "image/avif",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "heic" => "image/heic",
        _ => "application/octet-stream",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ValidationError;
    use crate::cli::actions::offline_options;

    fn error_of<T>(result: &Result<T>) -> Option<&Error> {
        result.as_ref().err().and_then(|err| err.downcast_ref::<Error>())
    }

    #[tokio::test]
    async fn upload_without_path_is_rejected_before_restore() {
        let result = execute(Args {
            backend: offline_options(),
            command: Command::Upload {
                path: None,
                content_type: None,
            },
        })
        .await;
        assert_eq!(error_of(&result), Some(&Error::NoFileSelected));
    }

    #[tokio::test]
    async fn prepare_rejects_non_images_and_oversized_files() -> Result<()> {
        let path = std::env::temp_dir().join(format!("roomie-{}.txt", ulid::Ulid::new()));
        tokio::fs::write(&path, b"plain text").await?;
        let text = prepare(Some(path.clone()), None, 1024).await;
        let image = prepare(Some(path.clone()), Some("image/png".to_string()), 4).await;
        let accepted = prepare(Some(path.clone()), Some("image/png".to_string()), 1024).await;
        tokio::fs::remove_file(&path).await?;

        assert!(matches!(
            error_of(&text),
            Some(Error::Validation(ValidationError::UnsupportedMediaType(_)))
        ));
        assert_eq!(
            error_of(&image),
            Some(&Error::Validation(ValidationError::FileTooLarge { limit: 4 }))
        );
        assert_eq!(accepted?.bytes, b"plain text".to_vec());
        Ok(())
    }

    #[test]
    fn content_type_from_extension() {
        assert_eq!(guess_content_type(Path::new("me.PNG")), "image/png");
        assert_eq!(guess_content_type(Path::new("/tmp/a.jpeg")), "image/jpeg");
        assert_eq!(guess_content_type(Path::new("notes.txt")), "application/octet-stream");
        assert_eq!(guess_content_type(Path::new("README")), "application/octet-stream");
    }

    #[tokio::test]
    async fn read_file_keeps_name_and_bytes() -> Result<()> {
        let path = std::env::temp_dir().join(format!("roomie-{}.png", ulid::Ulid::new()));
        tokio::fs::write(&path, b"\x89PNG").await?;

        let file = read_file(&path, None).await;
        tokio::fs::remove_file(&path).await?;
        let file = file?;

        assert_eq!(file.content_type, "image/png");
        assert_eq!(file.bytes, b"\x89PNG".to_vec());
        assert!(file.file_name.ends_with(".png"));

        let missing = read_file(Path::new("/nonexistent/roomie.png"), None).await;
        assert!(missing.is_err());
        Ok(())
    }
}
