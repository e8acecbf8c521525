//! Config link parsing.
//!
//! Boards hand out links of the form `dlass://config/{boardId}/{secretKey}`
//! which carry both credentials in one copyable token.

pub const CONFIG_LINK_SCHEME: &str = "dlass";

/// Board credentials extracted from a config link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigLink {
    pub board_id: String,
    pub secret_key: String,
}

/// Parse a config link. Returns `None` if the link is malformed.
pub fn parse_config_link(link: &str) -> Option<ConfigLink> {
    let rest = link
        .trim()
        .strip_prefix(CONFIG_LINK_SCHEME)?
        .strip_prefix("://config/")?;
    let (board_id, secret_key) = rest.split_once('/')?;
    if board_id.is_empty() || secret_key.is_empty() || secret_key.contains('/') {
        return None;
    }
    Some(ConfigLink {
        board_id: board_id.to_string(),
        secret_key: secret_key.to_string(),
    })
}
