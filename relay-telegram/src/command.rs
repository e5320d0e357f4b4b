//! Chat → game-server command translation.
//!
//! A chat message becomes either a fixed server command (`/ip`, `/players`, configured custom
//! commands) or one or two `say "..."` statements: an optional reply prefix and the message line.

use relay_core::{truncate_chars, ChatContent, ChatEvent, ChatUser};

/// Longest text embedded in a single `say` statement, in characters.
pub const SAY_MAX_CHARS: usize = 255;

const ADDR_COMMAND: &str = "get addr";
const STATUS_COMMAND: &str = "show_ips 1; status; echo \"end_status\"";

/// Formatting templates for forwarded chat messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Templates {
    /// `{name}`, `{text}`
    pub text: String,
    /// `{sticker_emoji}`
    pub sticker: String,
    pub video: String,
    pub photo: String,
    pub audio: String,
    pub voice: String,
    /// `{replay_id}`, `{replay_msg}`
    pub reply: String,
}

impl Default for Templates {
    fn default() -> Self {
        Self {
            text: "[TG] {name}: {text}".to_string(),
            sticker: "[STICKER {sticker_emoji}]".to_string(),
            video: "[MEDIA]".to_string(),
            photo: "[PHOTO]".to_string(),
            audio: "[AUDIO]".to_string(),
            voice: "[VOICE]".to_string(),
            reply: "[Reply {replay_id}] {replay_msg}".to_string(),
        }
    }
}

/// A configured slash command mapped onto a server command template with `{arg}` placeholders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CustomCommand {
    pub slash: String,
    pub template: String,
    placeholders: Vec<String>,
}

impl CustomCommand {
    pub fn new(slash: impl Into<String>, template: impl Into<String>) -> Self {
        let template = template.into();
        let placeholders = placeholders(&template);
        Self {
            slash: slash.into(),
            template,
            placeholders,
        }
    }

    pub fn arg_count(&self) -> usize {
        self.placeholders.len()
    }

    /// Fills placeholders in order from `args`; `None` when there are too few.
    pub fn render(&self, args: &[&str]) -> Option<String> {
        if args.len() < self.placeholders.len() {
            return None;
        }
        let mut out = self.template.clone();
        for (placeholder, arg) in self.placeholders.iter().zip(args) {
            out = out.replacen(&format!("{{{}}}", placeholder), &escape(arg), 1);
        }
        Some(out)
    }

    /// Parses `"/slash=template;/other=template"`. Entries without `=` are skipped.
    pub fn parse_list(raw: &str) -> Vec<CustomCommand> {
        raw.split(';')
            .filter_map(|entry| {
                let (slash, template) = entry.split_once('=')?;
                let slash = slash.trim();
                let template = template.trim();
                if slash.is_empty() || template.is_empty() {
                    return None;
                }
                Some(CustomCommand::new(slash, template))
            })
            .collect()
    }
}

fn placeholders(template: &str) -> Vec<String> {
    let mut found = Vec::new();
    let mut rest = template;
    while let Some(start) = rest.find('{') {
        let after = &rest[start + 1..];
        match after.find('}') {
            Some(end) if end > 0 => {
                found.push(after[..end].to_string());
                rest = &after[end + 1..];
            }
            Some(end) => rest = &after[end + 1..],
            None => break,
        }
    }
    found
}

/// Escapes text for embedding in a double-quoted server string; newlines become spaces.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("\\\""),
            '\n' => out.push(' '),
            other => out.push(other),
        }
    }
    out
}

fn say(text: &str) -> String {
    format!("say \"{}\"", escape(truncate_chars(text, SAY_MAX_CHARS)))
}

/// Translates chat events into server command lines.
#[derive(Debug, Clone, Default)]
pub struct CommandTranslator {
    templates: Templates,
    custom: Vec<CustomCommand>,
}

impl CommandTranslator {
    pub fn new(templates: Templates, custom: Vec<CustomCommand>) -> Self {
        Self { templates, custom }
    }

    /// Command body for `event`, or `None` when the message carries nothing to forward.
    pub fn translate(&self, event: &ChatEvent) -> Option<String> {
        if let ChatContent::Text(text) = &event.content {
            if let Some(command) = self.server_command(text) {
                return Some(command);
            }
        }

        let line = self.render_content(event)?;
        let mut body = String::new();
        if let Some(reply) = self.render_reply(event) {
            body.push_str(&say(&reply));
            body.push(';');
        }
        body.push_str(&say(&line));
        Some(body)
    }

    fn server_command(&self, text: &str) -> Option<String> {
        let mut words = text.split_whitespace();
        let slash = words.next()?;
        match slash {
            "/ip" | "/addr" => return Some(ADDR_COMMAND.to_string()),
            "/players" | "/status" => return Some(STATUS_COMMAND.to_string()),
            _ => {}
        }
        let args: Vec<&str> = words.collect();
        self.custom
            .iter()
            .find(|c| c.slash == slash)
            .and_then(|c| c.render(&args))
    }

    fn render_line(&self, sender: &ChatUser, text: &str) -> String {
        self.templates
            .text
            .replace("{name}", &sender.display_name())
            .replace("{text}", text)
    }

    fn render_content(&self, event: &ChatEvent) -> Option<String> {
        let media = match &event.content {
            ChatContent::Text(text) => return Some(self.render_line(&event.sender, text)),
            ChatContent::Sticker { emoji } => self
                .templates
                .sticker
                .replace("{sticker_emoji}", emoji.as_deref().unwrap_or("")),
            ChatContent::Video => self.templates.video.clone(),
            ChatContent::Photo => self.templates.photo.clone(),
            ChatContent::Audio => self.templates.audio.clone(),
            ChatContent::Voice => self.templates.voice.clone(),
            ChatContent::None => return None,
        };
        let media = match event.caption.as_deref() {
            Some(caption) => format!("{} | {}", media, caption),
            None => media,
        };
        Some(self.render_line(&event.sender, &media))
    }

    /// Reply prefix; only replies to text messages get one.
    fn render_reply(&self, event: &ChatEvent) -> Option<String> {
        let reply = event.reply_to.as_ref()?;
        let text = reply.text.as_deref()?;
        Some(
            self.templates
                .reply
                .replace("{replay_id}", &reply.message_id.to_string())
                .replace("{replay_msg}", &self.render_line(&reply.sender, text)),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use relay_core::{ReplyContext, ThreadId};

    fn user(first: &str, last: Option<&str>) -> ChatUser {
        ChatUser {
            id: 1,
            first_name: first.to_string(),
            last_name: last.map(str::to_string),
        }
    }

    fn event(content: ChatContent) -> ChatEvent {
        ChatEvent {
            message_id: 10,
            chat_id: -100,
            thread_id: Some(ThreadId::Int(42)),
            sender: user("Ann", Some("Lee")),
            date: Utc::now(),
            content,
            caption: None,
            reply_to: None,
        }
    }

    fn text(s: &str) -> ChatContent {
        ChatContent::Text(s.to_string())
    }

    #[test]
    fn test_fixed_commands() {
        let t = CommandTranslator::default();
        assert_eq!(t.translate(&event(text("/ip"))).unwrap(), "get addr");
        assert_eq!(t.translate(&event(text("/addr"))).unwrap(), "get addr");
        assert_eq!(
            t.translate(&event(text("/status"))).unwrap(),
            "show_ips 1; status; echo \"end_status\""
        );
        assert_eq!(
            t.translate(&event(text("/players"))).unwrap(),
            "show_ips 1; status; echo \"end_status\""
        );
    }

    #[test]
    fn test_plain_text_is_escaped() {
        let t = CommandTranslator::default();
        let body = t.translate(&event(text("say \"hi\"\nit's a\\b"))).unwrap();
        assert_eq!(body, r#"say "[TG] AnnLee: say \"hi\" it\'s a\\b""#);
    }

    #[test]
    fn test_reply_prefix_only_for_text_replies() {
        let t = CommandTranslator::default();
        let mut e = event(text("yes"));
        e.reply_to = Some(ReplyContext {
            message_id: 7,
            sender: user("Bob", None),
            text: Some("ready?".to_string()),
        });
        assert_eq!(
            t.translate(&e).unwrap(),
            r#"say "[Reply 7] [TG] Bob: ready?";say "[TG] AnnLee: yes""#
        );

        e.reply_to.as_mut().unwrap().text = None;
        assert_eq!(t.translate(&e).unwrap(), r#"say "[TG] AnnLee: yes""#);
    }

    #[test]
    fn test_media_with_caption() {
        let t = CommandTranslator::default();
        let mut e = event(ChatContent::Photo);
        e.caption = Some("look".to_string());
        assert_eq!(t.translate(&e).unwrap(), r#"say "[TG] AnnLee: [PHOTO] | look""#);

        let sticker = event(ChatContent::Sticker {
            emoji: Some(":)".to_string()),
        });
        assert_eq!(
            t.translate(&sticker).unwrap(),
            r#"say "[TG] AnnLee: [STICKER :)]""#
        );
        assert!(t.translate(&event(ChatContent::None)).is_none());
    }

    #[test]
    fn test_say_truncates_to_255_chars() {
        let t = CommandTranslator::default();
        let body = t.translate(&event(text(&"x".repeat(400)))).unwrap();
        let inner = &body["say \"".len()..body.len() - 1];
        assert_eq!(inner.chars().count(), SAY_MAX_CHARS);
    }

    #[test]
    fn test_custom_commands() {
        let custom = CustomCommand::parse_list("/kick=kick {id} {reason};/map=change_map {map}; junk");
        assert_eq!(custom.len(), 2);
        assert_eq!(custom[0].arg_count(), 2);

        let t = CommandTranslator::new(Templates::default(), custom);
        assert_eq!(
            t.translate(&event(text("/kick 3 spam"))).unwrap(),
            "kick 3 spam"
        );
        assert_eq!(
            t.translate(&event(text("/map dm1"))).unwrap(),
            "change_map dm1"
        );
        // Too few arguments: forwarded as ordinary chat.
        assert_eq!(
            t.translate(&event(text("/kick 3"))).unwrap(),
            r#"say "[TG] AnnLee: /kick 3""#
        );
    }
}
