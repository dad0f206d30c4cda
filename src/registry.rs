use std::fmt;

/// Opaque identifier of a chat on the messaging platform.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChatRef(String);

impl ChatRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<i64> for ChatRef {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for ChatRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Administrator chats that receive relayed messages, in configuration order.
#[derive(Debug, Clone, Default)]
pub struct Recipients {
    ids: Vec<ChatRef>,
}

impl Recipients {
    /// Build from raw tokens. Whitespace is trimmed and blank tokens are dropped.
    pub fn new<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let ids = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .map(ChatRef::new)
            .collect();
        Self { ids }
    }

    /// Parse a comma-separated list such as `"123, -100456,@channel"`.
    pub fn parse(raw: &str) -> Self {
        Self::new(raw.split(','))
    }

    pub fn iter(&self) -> impl Iterator<Item = &ChatRef> {
        self.ids.iter()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
