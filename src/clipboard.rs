use anyhow::Result;

/// Copy-to-clipboard capability
pub trait Clipboard: Send {
    fn copy(&mut self, text: &str) -> Result<()>;
}

/// System clipboard via arboard. A fresh handle is opened per copy so a
/// missing display server only fails the copy, not startup.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl Clipboard for SystemClipboard {
    fn copy(&mut self, text: &str) -> Result<()> {
        let mut clipboard = arboard::Clipboard::new()?;
        clipboard.set_text(text.to_string())?;
        Ok(())
    }
}
