//! A [`MessageTransport`] that prints outgoing bot messages to the terminal.

use async_trait::async_trait;
use colored::Colorize;
use formdesk_core::error::Result;
use formdesk_core::identity::UserId;
use formdesk_core::transport::{Keyboard, MessageTransport, PhotoRef};

#[derive(Debug, Default)]
pub struct ConsoleTransport;

#[async_trait]
impl MessageTransport for ConsoleTransport {
    async fn send_text(
        &self,
        recipient: UserId,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<()> {
        println!("{}", format!("[bot -> {}]", recipient).bright_magenta());
        for line in strip_markup(text).lines() {
            println!("{}", line.bright_blue());
        }
        if let Some(keyboard) = keyboard {
            for button in keyboard.buttons() {
                println!(
                    "  {} {}",
                    format!("[{}]", button.text).yellow(),
                    format!("/cb {}", button.data).bright_black()
                );
            }
        }
        println!();
        Ok(())
    }

    async fn send_photo(&self, recipient: UserId, photo: &PhotoRef, caption: &str) -> Result<()> {
        println!(
            "{} {} {}",
            format!("[bot -> {}]", recipient).bright_magenta(),
            format!("🖼  {}", photo.as_str()).cyan(),
            caption.bright_black()
        );
        Ok(())
    }
}

/// Drops HTML tags and decodes the escapes produced by the renderer.
pub fn strip_markup(text: &str) -> String {
    let mut plain = String::with_capacity(text.len());
    let mut in_tag = false;
    for c in text.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => plain.push(c),
            _ => {}
        }
    }
    plain
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&amp;", "&")
}
