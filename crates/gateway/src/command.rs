/// A recognized relay command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Ask to be paired with a stranger.
    Start,
    /// Leave the current chat or withdraw a pending request.
    Stop,
}

impl Command {
    /// Exact-match `content` against the command set for `prefix`.
    ///
    /// The whole message must be the command; trailing text disqualifies it
    /// so chat lines that merely mention a command are relayed untouched.
    pub fn parse(content: &str, prefix: &str) -> Option<Self> {
        match content.strip_prefix(prefix)? {
            "start" => Some(Self::Start),
            "stop" => Some(Self::Stop),
            _ => None,
        }
    }
}
