//! Presentation boundary: notifications, download and clipboard copy.

use crate::error::{PollinateError, Result};
use crate::image::{GenerationResult, ImageFormat, ImageRef};
use crate::session::ObjectStore;
use async_trait::async_trait;
use base64::Engine;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Prefix of downloaded file names.
pub const DOWNLOAD_PREFIX: &str = "pollinations-ai";

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    /// Progress or neutral information.
    Info,
    /// An action completed.
    Success,
    /// An action failed.
    Error,
}

/// A short, transient message for the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    /// Severity.
    pub level: NotificationLevel,
    /// Text to show.
    pub message: String,
}

impl Notification {
    /// Informational message.
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    /// Success message.
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    /// Failure message.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Renders generation state. Implementations only read results.
pub trait Presenter {
    /// A generation started; hide the previous image.
    fn show_pending(&mut self) {}

    /// A generation succeeded.
    fn show_result(&mut self, result: &GenerationResult);

    /// A generation failed; show the failed placeholder.
    fn show_failed(&mut self);

    /// Shows a transient message.
    fn notify(&mut self, notification: Notification);
}

/// Destination for copied images or URLs.
#[async_trait]
pub trait Clipboard: Send {
    /// Places text on the clipboard.
    async fn set_text(&mut self, text: &str) -> Result<()>;

    /// Places an encoded image on the clipboard.
    async fn set_image(&mut self, data: &[u8], format: ImageFormat) -> Result<()>;
}

/// Clipboard backed by the platform's command-line tools
/// (`wl-copy`, `xclip`, or `pbcopy`).
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClipboard;

impl SystemClipboard {
    fn text_commands() -> &'static [&'static [&'static str]] {
        &[
            &["wl-copy"],
            &["xclip", "-selection", "clipboard"],
            &["pbcopy"],
        ]
    }

    async fn pipe(candidates: &[Vec<String>], data: &[u8]) -> Result<()> {
        let mut last_error = String::from("no clipboard tool found");
        for argv in candidates {
            let Some((program, args)) = argv.split_first() else {
                continue;
            };
            match Self::pipe_one(program, args, data).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::debug!(program = %program, "clipboard tool failed: {e}");
                    last_error = e;
                }
            }
        }
        Err(PollinateError::Clipboard(last_error))
    }

    async fn pipe_one(
        program: &str,
        args: &[String],
        data: &[u8],
    ) -> std::result::Result<(), String> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .spawn()
            .map_err(|e| format!("{program}: {e}"))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(data)
                .await
                .map_err(|e| format!("{program}: {e}"))?;
        }

        let status = child.wait().await.map_err(|e| format!("{program}: {e}"))?;
        if status.success() {
            Ok(())
        } else {
            Err(format!("{program} exited with {status}"))
        }
    }
}

#[async_trait]
impl Clipboard for SystemClipboard {
    async fn set_text(&mut self, text: &str) -> Result<()> {
        let candidates: Vec<Vec<String>> = Self::text_commands()
            .iter()
            .map(|argv| argv.iter().map(|s| s.to_string()).collect())
            .collect();
        Self::pipe(&candidates, text.as_bytes()).await
    }

    async fn set_image(&mut self, data: &[u8], format: ImageFormat) -> Result<()> {
        let mime = format.mime_type();
        let candidates = vec![
            vec!["wl-copy".into(), "--type".into(), mime.into()],
            vec![
                "xclip".into(),
                "-selection".into(),
                "clipboard".into(),
                "-t".into(),
                mime.into(),
            ],
        ];
        Self::pipe(&candidates, data).await
    }
}

/// Returns the bytes behind an image reference.
///
/// URLs are re-fetched, data URIs decoded, transient objects read from the
/// session store.
pub async fn resolve_bytes(
    image_ref: &ImageRef,
    objects: &ObjectStore,
    client: &reqwest::Client,
) -> Result<Vec<u8>> {
    match image_ref {
        ImageRef::Url(url) => {
            let response = client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(PollinateError::Upstream {
                    status: status.as_u16(),
                    message: "Failed to download image from URL".into(),
                });
            }
            Ok(response.bytes().await?.to_vec())
        }
        ImageRef::DataUri(uri) => decode_data_uri(uri),
        ImageRef::Object(handle) => objects
            .get(handle)
            .map(|o| o.data.clone())
            .ok_or_else(|| PollinateError::Decode(format!("image {handle} was released"))),
    }
}

fn decode_data_uri(uri: &str) -> Result<Vec<u8>> {
    let (_, payload) = uri
        .split_once(";base64,")
        .ok_or_else(|| PollinateError::Decode("not a base64 data URI".into()))?;
    base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| PollinateError::Decode(e.to_string()))
}

/// File name for a download made now.
pub fn download_file_name() -> String {
    format!(
        "{DOWNLOAD_PREFIX}-{}.png",
        chrono::Utc::now().timestamp_millis()
    )
}

/// Saves the image into `dir` and returns the written path.
pub async fn download(
    image_ref: &ImageRef,
    objects: &ObjectStore,
    client: &reqwest::Client,
    dir: &Path,
) -> Result<PathBuf> {
    let data = resolve_bytes(image_ref, objects, client).await?;
    tokio::fs::create_dir_all(dir).await?;
    let path = dir.join(download_file_name());
    tokio::fs::write(&path, &data).await?;
    tracing::info!(path = %path.display(), bytes = data.len(), "image downloaded");
    Ok(path)
}

/// Copies the image to the clipboard.
///
/// A transient object is copied as image data; anything else is copied as
/// its URI. Returns what was copied.
pub async fn copy(
    image_ref: &ImageRef,
    objects: &ObjectStore,
    clipboard: &mut dyn Clipboard,
) -> Result<CopiedContent> {
    match image_ref {
        ImageRef::Object(handle) => {
            let object = objects
                .get(handle)
                .ok_or_else(|| PollinateError::Clipboard(format!("image {handle} was released")))?;
            clipboard.set_image(&object.data, object.format).await?;
            Ok(CopiedContent::Image)
        }
        other => {
            clipboard.set_text(other.as_uri()).await?;
            Ok(CopiedContent::Url)
        }
    }
}

/// What a copy placed on the clipboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CopiedContent {
    /// Image bytes.
    Image,
    /// The image URL or data URI.
    Url,
}


#[cfg(test)]
mod tests {
    use super::test_support::MemoryClipboard;
    use super::*;
    use crate::error::ErrorCategory;

    #[test]
    fn test_download_file_name() {
        let name = download_file_name();
        assert!(name.starts_with("pollinations-ai-"));
        assert!(name.ends_with(".png"));
        let millis = &name["pollinations-ai-".len()..name.len() - 4];
        assert!(millis.parse::<i64>().is_ok());
    }

    #[tokio::test]
    async fn test_download_data_uri() {
        let dir = tempfile::tempdir().unwrap();
        let objects = ObjectStore::default();
        let image_ref = ImageRef::DataUri("data:image/png;base64,AQID".into());

        let path = download(&image_ref, &objects, &reqwest::Client::new(), dir.path())
            .await
            .unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), vec![1, 2, 3]);
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with(DOWNLOAD_PREFIX));
    }

    #[tokio::test]
    async fn test_download_url_refetches() {
        let server = httpmock::MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(httpmock::Method::GET).path("/fox.png");
                then.status(200).body([9u8, 8, 7]);
            })
            .await;

        let dir = tempfile::tempdir().unwrap();
        let image_ref = ImageRef::Url(server.url("/fox.png"));
        let path = download(
            &image_ref,
            &ObjectStore::default(),
            &reqwest::Client::new(),
            dir.path(),
        )
        .await
        .unwrap();

        mock.assert_async().await;
        assert_eq!(std::fs::read(path).unwrap(), vec![9, 8, 7]);
    }

    #[tokio::test]
    async fn test_download_released_object_fails() {
        let mut objects = ObjectStore::default();
        let handle = objects.insert(vec![1], ImageFormat::Png);
        objects.revoke(&handle);

        let dir = tempfile::tempdir().unwrap();
        let err = download(
            &ImageRef::Object(handle),
            &objects,
            &reqwest::Client::new(),
            dir.path(),
        )
        .await
        .unwrap_err();
        assert_eq!(err.category(), ErrorCategory::Decode);
    }

    #[tokio::test]
    async fn test_copy_url_as_text() {
        let mut clipboard = MemoryClipboard::default();
        let image_ref = ImageRef::Url("https://example.com/a.png".into());

        let copied = copy(&image_ref, &ObjectStore::default(), &mut clipboard)
            .await
            .unwrap();

        assert_eq!(copied, CopiedContent::Url);
        assert_eq!(clipboard.text.as_deref(), Some("https://example.com/a.png"));
    }

    #[tokio::test]
    async fn test_copy_object_as_image() {
        let mut objects = ObjectStore::default();
        let handle = objects.insert(vec![4, 5, 6], ImageFormat::Png);
        let mut clipboard = MemoryClipboard::default();

        let copied = copy(&ImageRef::Object(handle), &objects, &mut clipboard)
            .await
            .unwrap();

        assert_eq!(copied, CopiedContent::Image);
        assert_eq!(clipboard.image, Some(vec![4, 5, 6]));
        assert!(clipboard.text.is_none());
    }

    #[tokio::test]
    async fn test_copy_denied_is_clipboard_error() {
        let mut clipboard = MemoryClipboard {
            deny: true,
            ..Default::default()
        };
        let err = copy(
            &ImageRef::Url("https://example.com/a.png".into()),
            &ObjectStore::default(),
            &mut clipboard,
        )
        .await
        .unwrap_err();

        assert_eq!(err.category(), ErrorCategory::Clipboard);
        assert!(err.user_message().contains("download"));
    }
}
