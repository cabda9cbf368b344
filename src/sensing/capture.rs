use std::{io::Cursor, sync::Arc};

use image::ImageFormat;

use crate::error::{TrackerError, TrackerResult};

use super::source::ScreenSource;

/// Screen sensor: grab, then encode as PNG. Knows nothing about sessions.
#[derive(Clone)]
pub struct CaptureTransport {
    source: Arc<dyn ScreenSource>,
}

impl CaptureTransport {
    pub fn new(source: Arc<dyn ScreenSource>) -> Self {
        Self { source }
    }

    pub async fn capture(&self) -> TrackerResult<Vec<u8>> {
        let image = self.source.grab().await?;
        if image.width() == 0 || image.height() == 0 {
            return Err(TrackerError::CaptureUnavailable(
                "no display surface (empty image)".into(),
            ));
        }

        tokio::task::spawn_blocking(move || -> TrackerResult<Vec<u8>> {
            let mut buffer = Cursor::new(Vec::new());
            image.write_to(&mut buffer, ImageFormat::Png)?;
            Ok(buffer.into_inner())
        })
        .await
        .map_err(|err| TrackerError::CaptureUnavailable(format!("encode worker failed: {err}")))?
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use async_trait::async_trait;
    use image::{DynamicImage, Rgba, RgbaImage};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Test source returning a small solid image, optionally failing the
    /// first `fail_first` grabs.
    #[derive(Default)]
    pub(crate) struct FakeScreen {
        pub(crate) grabs: AtomicUsize,
        pub(crate) fail_first: usize,
    }

    impl FakeScreen {
        pub(crate) fn failing_first(fail_first: usize) -> Self {
            Self {
                grabs: AtomicUsize::new(0),
                fail_first,
            }
        }

        pub(crate) fn grab_count(&self) -> usize {
            self.grabs.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ScreenSource for FakeScreen {
        async fn grab(&self) -> TrackerResult<DynamicImage> {
            let n = self.grabs.fetch_add(1, Ordering::SeqCst);
            if n < self.fail_first {
                return Err(TrackerError::CaptureUnavailable("display asleep".into()));
            }
            Ok(DynamicImage::ImageRgba8(RgbaImage::from_pixel(
                4,
                3,
                Rgba([10, 20, 30, 255]),
            )))
        }
    }

    struct EmptyScreen;

    #[async_trait]
    impl ScreenSource for EmptyScreen {
        async fn grab(&self) -> TrackerResult<DynamicImage> {
            Ok(DynamicImage::new_rgba8(0, 0))
        }
    }

    #[tokio::test]
    async fn capture_encodes_png() {
        let transport = CaptureTransport::new(Arc::new(FakeScreen::default()));
        let bytes = transport.capture().await.unwrap();

        assert_eq!(&bytes[..8], b"\x89PNG\r\n\x1a\n");
        let decoded = image::load_from_memory_with_format(&bytes, ImageFormat::Png).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[tokio::test]
    async fn source_failure_is_capture_unavailable() {
        let transport = CaptureTransport::new(Arc::new(FakeScreen::failing_first(1)));
        assert!(matches!(
            transport.capture().await,
            Err(TrackerError::CaptureUnavailable(_))
        ));
        assert!(transport.capture().await.is_ok());
    }

    #[tokio::test]
    async fn empty_image_is_capture_unavailable() {
        let transport = CaptureTransport::new(Arc::new(EmptyScreen));
        assert!(matches!(
            transport.capture().await,
            Err(TrackerError::CaptureUnavailable(_))
        ));
    }
}
