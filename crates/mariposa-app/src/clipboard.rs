//! System clipboard backed by `arboard`.

use mariposa_core::BoxFuture;
use mariposa_core::clipboard::{ClipboardError, ClipboardImage, ClipboardResult, SystemClipboard};

/// The desktop clipboard. A fresh `arboard::Clipboard` is opened per call,
/// so nothing is held between operations.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArboardClipboard;

impl ArboardClipboard {
    /// Check that the platform clipboard can be opened at all.
    pub fn detect() -> ClipboardResult<Self> {
        open().map(|_| Self)
    }
}

fn open() -> ClipboardResult<arboard::Clipboard> {
    arboard::Clipboard::new().map_err(|e| ClipboardError::Unavailable(e.to_string()))
}

fn map_error(e: arboard::Error) -> ClipboardError {
    match e {
        arboard::Error::ContentNotAvailable => ClipboardError::Empty,
        other => ClipboardError::Unavailable(other.to_string()),
    }
}

impl SystemClipboard for ArboardClipboard {
    fn write_text(&self, text: String) -> BoxFuture<'_, ClipboardResult<()>> {
        Box::pin(async move {
            let mut clipboard = open()?;
            clipboard.set_text(text).map_err(map_error)
        })
    }

    fn read_text(&self) -> BoxFuture<'_, ClipboardResult<String>> {
        Box::pin(async {
            let mut clipboard = open()?;
            clipboard.get_text().map_err(map_error)
        })
    }

    fn read_image(&self) -> BoxFuture<'_, ClipboardResult<Option<ClipboardImage>>> {
        Box::pin(async {
            let mut clipboard = open()?;
            let img_data = match clipboard.get_image() {
                Ok(img_data) => img_data,
                Err(arboard::Error::ContentNotAvailable) => return Ok(None),
                Err(e) => return Err(map_error(e)),
            };
            // img_data contains RGBA pixel data
            let width = img_data.width as u32;
            let height = img_data.height as u32;
            let png = crate::encode_png(&img_data.bytes, width, height)
                .ok_or_else(|| ClipboardError::Malformed("could not encode clipboard image".to_string()))?;
            Ok(Some(ClipboardImage { width, height, png }))
        })
    }
}
