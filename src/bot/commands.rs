/// Replies relayed from the AI are cut to this many characters.
pub const MAX_REPLY_CHARS: usize = 500;

/// Command names in the order `help` lists them.
pub const COMMAND_NAMES: [&str; 5] = ["get", "set", "hello", "promt", "help"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    Hello,
    Get,
    Set(&'a str),
    Help,
    /// Relay to the AI. The name is user-facing vocabulary and kept as is.
    Promt(&'a str),
}

impl Command<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Hello => "hello",
            Self::Get => "get",
            Self::Set(_) => "set",
            Self::Help => "help",
            Self::Promt(_) => "promt",
        }
    }
}

/// Parses `text` as `<prefix><name>[ <argument>]`. The name runs up to the
/// first whitespace, so `!helloworld` is not `hello`.
pub fn parse<'a>(prefix: &str, text: &'a str) -> Option<Command<'a>> {
    let rest = text.strip_prefix(prefix)?;
    let (name, argument) = match rest.find(char::is_whitespace) {
        Some(idx) => (&rest[..idx], rest[idx..].trim_start()),
        None => (rest, ""),
    };

    match name {
        "hello" => Some(Command::Hello),
        "get" => Some(Command::Get),
        "set" => Some(Command::Set(argument)),
        "help" => Some(Command::Help),
        "promt" => Some(Command::Promt(argument)),
        _ => None,
    }
}

pub fn help_text(prefix: &str) -> String {
    let names: Vec<String> = COMMAND_NAMES
        .iter()
        .map(|name| format!("{prefix}{name}"))
        .collect();
    format!("Commands: {}", names.join(" "))
}

pub fn truncate_reply(text: &str) -> &str {
    match text.char_indices().nth(MAX_REPLY_CHARS) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::{Command, MAX_REPLY_CHARS, help_text, parse, truncate_reply};

    #[test]
    fn parses_commands_without_arguments() {
        assert_eq!(parse("!", "!hello"), Some(Command::Hello));
        assert_eq!(parse("!", "!get"), Some(Command::Get));
        assert_eq!(parse("!", "!help"), Some(Command::Help));
        assert_eq!(parse("!", "!hello there"), Some(Command::Hello));
    }

    #[test]
    fn parses_command_arguments() {
        assert_eq!(parse("!", "!set cheerful"), Some(Command::Set("cheerful")));
        assert_eq!(
            parse("!", "!promt tell me a joke"),
            Some(Command::Promt("tell me a joke"))
        );
        assert_eq!(parse("!", "!set"), Some(Command::Set("")));
    }

    #[test]
    fn argument_keeps_later_prefix_occurrences() {
        assert_eq!(
            parse("!", "!promt what does !promt do"),
            Some(Command::Promt("what does !promt do"))
        );
    }

    #[test]
    fn supports_multi_character_prefix() {
        assert_eq!(parse("bot ", "bot get"), Some(Command::Get));
        assert_eq!(parse("bot ", "!get"), None);
    }

    #[test]
    fn rejects_unknown_or_unprefixed_text() {
        assert_eq!(parse("!", "hello"), None);
        assert_eq!(parse("!", "!helloworld"), None);
        assert_eq!(parse("!", "!prompt hi"), None);
        assert_eq!(parse("!", "say !hello"), None);
        assert_eq!(parse("!", "!"), None);
    }

    #[test]
    fn help_lists_prefixed_command_names() {
        assert_eq!(help_text("!"), "Commands: !get !set !hello !promt !help");
    }

    #[test]
    fn truncate_reply_caps_length_in_characters() {
        let long = "é".repeat(MAX_REPLY_CHARS + 20);
        let truncated = truncate_reply(&long);
        assert_eq!(truncated.chars().count(), MAX_REPLY_CHARS);

        assert_eq!(truncate_reply("short"), "short");
        let exact = "a".repeat(MAX_REPLY_CHARS);
        assert_eq!(truncate_reply(&exact), exact);
    }
}
