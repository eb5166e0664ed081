use ulid::Ulid;

/// Well-known id prefixes minted across the platform.
pub mod prefix {
    pub const USER: &str = "usr";
    pub const CONNECTION: &str = "conn";
    pub const MESSAGE: &str = "msg";
    pub const COMMUNITY: &str = "com";
    pub const NOTIFICATION: &str = "ntf";
}

/// Mints an id of the form `{prefix}_{ULID}`. The ULID part embeds a
/// millisecond timestamp, so ids sort roughly by creation time.
///
/// # Examples
/// ```
/// use alumnet_common::id::{mint, prefix};
///
/// let id = mint(prefix::MESSAGE);
/// assert!(id.starts_with("msg_"));
/// ```
pub fn mint(prefix: &str) -> String {
    format!("{prefix}_{}", Ulid::new())
}
