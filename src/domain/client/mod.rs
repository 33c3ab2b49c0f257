//! Client-side domain values: routing filters and admin snapshots.

use serde::Serialize;

use crate::domain::foundation::Timestamp;
use crate::domain::notification::NotificationPayload;

/// Optional routing filters attached to a registered client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientFilters {
    pub device: Option<String>,
    pub user: Option<String>,
}

/// Which filter caused a payload to match a client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterMatch {
    Device,
    User,
}

/// Coarse classification of a client by the filters it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    /// Has a device filter (a user filter may also be set).
    Device,
    /// Has only a user filter.
    User,
    /// Has neither; receives heartbeats and broadcasts only.
    Unfiltered,
}

impl ClientFilters {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn device(device_id: impl Into<String>) -> Self {
        Self {
            device: Some(device_id.into()),
            user: None,
        }
    }

    pub fn user(user_id: impl Into<String>) -> Self {
        Self {
            device: None,
            user: Some(user_id.into()),
        }
    }

    pub fn with_device(mut self, device_id: impl Into<String>) -> Self {
        self.device = Some(device_id.into());
        self
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user = Some(user_id.into());
        self
    }

    /// Evaluates the filters against a payload, device first.
    ///
    /// A client carrying both filters matches at most once: the user
    /// filter is only consulted when the device filter did not match.
    pub fn matches(&self, payload: &NotificationPayload) -> Option<FilterMatch> {
        if let (Some(filter), Some(device_id)) = (&self.device, &payload.device_id) {
            if filter == device_id {
                return Some(FilterMatch::Device);
            }
        }
        if let (Some(filter), Some(user_id)) = (&self.user, &payload.user_id) {
            if filter == user_id {
                return Some(FilterMatch::User);
            }
        }
        None
    }

    pub fn kind(&self) -> FilterKind {
        match (&self.device, &self.user) {
            (Some(_), _) => FilterKind::Device,
            (None, Some(_)) => FilterKind::User,
            (None, None) => FilterKind::Unfiltered,
        }
    }
}

/// Read-only view of one registered client, computed at call time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    pub id: String,
    pub device_filter: Option<String>,
    pub user_filter: Option<String>,
    pub connected_at: Timestamp,
    pub duration_ms: u64,
}

/// Current clients grouped by filter kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientBreakdown {
    pub total: usize,
    pub device_filtered: usize,
    pub user_filtered: usize,
    pub unfiltered: usize,
}

impl ClientBreakdown {
    pub fn record(&mut self, kind: FilterKind) {
        self.total += 1;
        match kind {
            FilterKind::Device => self.device_filtered += 1,
            FilterKind::User => self.user_filtered += 1,
            FilterKind::Unfiltered => self.unfiltered += 1,
        }
    }
}
