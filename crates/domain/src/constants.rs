//! Wire-protocol constants shared between the queue and the ingest client.

/// Session start action. Background starts with this action are subject to
/// collapsing when a later start supersedes them.
pub const ACTION_START: &str = "start";

/// Session stop action.
pub const ACTION_STOP: &str = "stop";

/// Tracked analytics event.
pub const ACTION_TRACK: &str = "track";

/// State advance within a session.
pub const ACTION_ADVANCE: &str = "advance";

/// Periodic keep-alive issued by the delivery timer.
pub const ACTION_HEARTBEAT: &str = "heartbeat";

/// User attribute update.
pub const ACTION_SET_USER_ATTRIBUTES: &str = "setUserAttributes";

/// Envelope action for a batched upload of multiple calls.
pub const ACTION_MULTI: &str = "multi";

/// Parameter keys understood by the collection endpoint.
pub mod params {
    pub const ACTION: &str = "action";
    pub const BACKGROUND: &str = "background";
    pub const DATA: &str = "data";
    pub const REQUEST_ID: &str = "reqId";
    pub const UUID: &str = "uuid";
    pub const TIME: &str = "time";
    pub const APP_ID: &str = "appId";
    pub const CLIENT_KEY: &str = "clientKey";
    pub const DEVICE_ID: &str = "deviceId";
    pub const USER_ID: &str = "userId";
    pub const SDK_VERSION: &str = "sdkVersion";
}

/// Upper bound on calls included in a single upload.
pub const MAX_CALLS_PER_BATCH: usize = 10_000;

/// SDK version reported with every upload.
pub const SDK_VERSION: &str = env!("CARGO_PKG_VERSION");
