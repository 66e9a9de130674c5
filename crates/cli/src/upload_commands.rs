use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use {
    anyhow::{Context, Result, bail},
    clap::{Args, ValueEnum},
    tracing::info,
    tubepost_config::TubepostConfig,
    tubepost_upload::{PublishTarget, UploadRequest},
};

use crate::app::{credential_manager, upload_orchestrator};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Shorts,
    Video,
}

impl From<FormatArg> for PublishTarget {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Shorts => Self::YouTubeShort,
            FormatArg::Video => Self::YouTubeVideo,
        }
    }
}

#[derive(Args)]
pub struct UploadArgs {
    /// Video file to publish. Files outside the media directory are copied
    /// into it first, so the original is left untouched.
    #[arg(long)]
    pub file: PathBuf,
    #[arg(long)]
    pub title: String,
    /// Description, defaults to the title.
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long, value_enum, default_value_t = FormatArg::Shorts)]
    pub format: FormatArg,
}

pub async fn handle_upload(args: UploadArgs, config: &TubepostConfig) -> Result<()> {
    if !args.file.is_file() {
        bail!("no such file: {}", args.file.display());
    }
    let staged = if is_within(&args.file, &config.media.dir) {
        // Leftover from a failed chat upload; consumed like one.
        args.file.clone()
    } else {
        let staged = stage_copy(&args.file, &config.media.dir).await?;
        info!(source = %args.file.display(), staged = %staged.display(), "staged file for upload");
        staged
    };

    let credentials = Arc::new(credential_manager(config)?);
    let orchestrator = upload_orchestrator(config, credentials);
    let request = UploadRequest {
        file_path: staged,
        description: args.description.unwrap_or_else(|| args.title.clone()),
        title: args.title,
        target: args.format.into(),
    };

    let video = orchestrator.upload(request).await?;
    println!("Uploaded: {}", video.url);
    Ok(())
}

fn is_within(file: &Path, dir: &Path) -> bool {
    match (file.canonicalize(), dir.canonicalize()) {
        (Ok(file), Ok(dir)) => file.starts_with(dir),
        _ => false,
    }
}

/// Copy `source` into `media_dir` under a timestamped name, since a
/// successful upload deletes the file it was given.
async fn stage_copy(source: &Path, media_dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(media_dir)
        .await
        .with_context(|| format!("failed to create {}", media_dir.display()))?;
    let name = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.bin".into());
    let target = media_dir.join(format!("{}-{name}", tubepost_common::now_ms()));
    tokio::fs::copy(source, &target)
        .await
        .with_context(|| {
            format!(
                "failed to copy {} into {}",
                source.display(),
                media_dir.display()
            )
        })?;
    Ok(target)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn staging_copies_and_keeps_original() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("clip.mp4");
        std::fs::write(&source, b"video").unwrap();
        let media = dir.path().join("media");

        let staged = stage_copy(&source, &media).await.unwrap();
        assert!(staged.starts_with(&media));
        assert!(staged.to_string_lossy().ends_with("-clip.mp4"));
        assert_eq!(std::fs::read(&staged).unwrap(), b"video");
        assert!(source.exists());
    }

    #[test]
    fn files_in_media_dir_are_not_copied() {
        let dir = tempfile::tempdir().unwrap();
        let media = dir.path().join("media");
        std::fs::create_dir(&media).unwrap();
        let leftover = media.join("1700000000000.mp4");
        let outside = dir.path().join("clip.mp4");
        std::fs::write(&leftover, b"a").unwrap();
        std::fs::write(&outside, b"b").unwrap();

        assert!(is_within(&leftover, &media));
        assert!(!is_within(&outside, &media));
        assert!(!is_within(&leftover, &dir.path().join("missing")));
    }

    #[test]
    fn format_maps_to_target() {
        assert_eq!(PublishTarget::from(FormatArg::Shorts), PublishTarget::YouTubeShort);
        assert_eq!(PublishTarget::from(FormatArg::Video), PublishTarget::YouTubeVideo);
    }
}
