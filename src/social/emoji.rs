use std::fmt;

/// The fixed set of reactions a post can receive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Emoji {
    Smile,
    Joy,
    HoldingBackTears,
    SmilingHearts,
    StarStruck,
    Party,
}

impl Emoji {
    /// Every allowed reaction, in display order.
    pub const ALL: [Emoji; 6] = [
        Emoji::Smile,
        Emoji::Joy,
        Emoji::HoldingBackTears,
        Emoji::SmilingHearts,
        Emoji::StarStruck,
        Emoji::Party,
    ];

    pub const DEFAULT: Emoji = Emoji::Smile;

    pub fn as_str(self) -> &'static str {
        match self {
            Emoji::Smile => "😊",
            Emoji::Joy => "😂",
            Emoji::HoldingBackTears => "🥹",
            Emoji::SmilingHearts => "🥰",
            Emoji::StarStruck => "🤩",
            Emoji::Party => "🥳",
        }
    }

    pub fn parse(s: &str) -> Option<Emoji> {
        Self::ALL.into_iter().find(|e| e.as_str() == s)
    }

    /// Unknown input falls back to the default reaction.
    pub fn normalize(s: &str) -> Emoji {
        Self::parse(s.trim()).unwrap_or(Self::DEFAULT)
    }
}

impl fmt::Display for Emoji {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_every_allowed_emoji() {
        for emoji in Emoji::ALL {
            assert_eq!(Emoji::parse(emoji.as_str()), Some(emoji));
        }
    }

    #[test]
    fn normalize_falls_back_to_default() {
        assert_eq!(Emoji::normalize("🔥"), Emoji::Smile);
        assert_eq!(Emoji::normalize(""), Emoji::Smile);
        assert_eq!(Emoji::normalize("smile"), Emoji::Smile);
    }

    #[test]
    fn normalize_keeps_allowed_emoji() {
        assert_eq!(Emoji::normalize("🥳"), Emoji::Party);
        assert_eq!(Emoji::normalize(" 🤩 "), Emoji::StarStruck);
    }
}
