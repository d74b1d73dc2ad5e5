/// Identifier of an authenticated user, as issued by the identity provider.
pub type UserId = String;

/// Server-assigned identifier of a single live WebSocket connection.
pub type ConnectionId = String;

/// Business-record identifier (order number, client id, vendor id).
pub type ResourceId = String;

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;
