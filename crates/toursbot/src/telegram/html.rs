//! HTML parse-mode helpers.
//!
//! All user-visible messages go out as HTML; anything that originated from
//! user input or chain data must pass through [`escape`] first.

use teloxide::prelude::*;
use teloxide::types::ParseMode;
use teloxide::RequestError;

/// Escape text for Telegram's HTML parse mode.
pub fn escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' => result.push_str("&quot;"),
            _ => result.push(c),
        }
    }
    result
}

fn is_parse_error(err: &RequestError) -> bool {
    err.to_string().to_lowercase().contains("can't parse entities")
}

/// Send an HTML message; on an entity-parse error (stray markup that slipped
/// through) retry the same text fully escaped instead of dropping the reply.
pub async fn send_html(bot: &Bot, chat_id: ChatId, text: impl Into<String>) -> ResponseResult<Message> {
    let raw_text = text.into();
    match bot
        .send_message(chat_id, raw_text.clone())
        .parse_mode(ParseMode::Html)
        .await
    {
        Ok(msg) => Ok(msg),
        Err(e) if is_parse_error(&e) => {
            bot.send_message(chat_id, escape(&raw_text))
                .parse_mode(ParseMode::Html)
                .await
        }
        Err(e) => Err(e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn escapes_html_metacharacters() {
        assert_eq!(escape("a < b & c > d"), "a &lt; b &amp; c &gt; d");
        assert_eq!(escape(r#"say "hi""#), "say &quot;hi&quot;");
    }

    #[test]
    fn plain_text_is_untouched() {
        assert_eq!(escape("Moonlight Arête 🧗"), "Moonlight Arête 🧗");
    }

    #[test]
    fn escaped_output_is_safe_to_embed() {
        let hostile = "<script>alert(1)</script>";
        let escaped = escape(hostile);
        assert!(!escaped.contains('<'));
        assert!(!escaped.contains('>'));
    }
}
