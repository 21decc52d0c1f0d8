//! Message input from piped stdin and the clipboard.

use crate::error::{ChatlineError, Result};
use crate::turn::ImageAttachment;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::{Cursor, Read};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::time::Duration;
use tracing::debug;

/// How long piped stdin may take to produce its first bytes.
const STDIN_WAIT: Duration = Duration::from_millis(50);

/// Read piped stdin when it has data ready. A terminal or an idle pipe yields `None`.
pub fn read_piped_stdin() -> Result<Option<String>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }
    read_when_ready(std::io::stdin(), STDIN_WAIT)
}

/// Read `source` to the end if its first bytes arrive within `wait`.
///
/// The reader runs on its own thread; when nothing arrives in time that thread is left
/// blocked and the input is ignored.
fn read_when_ready<R: Read + Send + 'static>(
    mut source: R,
    wait: Duration,
) -> Result<Option<String>> {
    let (tx, rx) = mpsc::channel();
    std::thread::spawn(move || {
        let mut buf = [0u8; 8192];
        loop {
            let chunk = match source.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => Ok(buf[..n].to_vec()),
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => Err(e),
            };
            let failed = chunk.is_err();
            if tx.send(chunk).is_err() || failed {
                break;
            }
        }
    });

    let mut bytes = match rx.recv_timeout(wait) {
        Ok(chunk) => chunk?,
        Err(RecvTimeoutError::Timeout) => {
            debug!("No stdin within {:?}, ignoring it", wait);
            return Ok(None);
        }
        Err(RecvTimeoutError::Disconnected) => return Ok(None),
    };
    for chunk in rx {
        bytes.extend(chunk?);
    }

    debug!("Read {} bytes from stdin", bytes.len());
    Ok(Some(String::from_utf8_lossy(&bytes).into_owned()))
}

/// Append the words of piped text to the command-line arguments.
///
/// The words are placed after a `--` so text starting with a dash stays part of the message.
pub fn merge_stdin(mut args: Vec<String>, stdin: Option<&str>) -> Vec<String> {
    let words: Vec<String> = stdin
        .map(str::trim)
        .unwrap_or_default()
        .split_whitespace()
        .map(str::to_string)
        .collect();

    if words.is_empty() {
        return args;
    }
    if !args.iter().skip(1).any(|a| a == "--") {
        args.push("--".to_string());
    }
    args.extend(words);
    args
}

/// Capture the image currently on the clipboard as PNG.
pub fn capture_clipboard_image() -> Result<ImageAttachment> {
    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| ChatlineError::Clipboard(e.to_string()))?;
    let data = clipboard
        .get_image()
        .map_err(|e| ChatlineError::Clipboard(format!("No image on the clipboard ({})", e)))?;

    debug!("Clipboard image {}x{}", data.width, data.height);
    encode_png(data.width as u32, data.height as u32, data.bytes.into_owned())
}

/// Encode raw RGBA pixels as a PNG attachment.
pub fn encode_png(width: u32, height: u32, rgba: Vec<u8>) -> Result<ImageAttachment> {
    let image = RgbaImage::from_raw(width, height, rgba).ok_or_else(|| {
        ChatlineError::Image(format!("Pixel data does not match {}x{}", width, height))
    })?;

    let mut png = Vec::new();
    DynamicImage::ImageRgba8(image)
        .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
        .map_err(|e| ChatlineError::Image(format!("Failed to encode PNG: {}", e)))?;
    Ok(ImageAttachment::from_png(png))
}
