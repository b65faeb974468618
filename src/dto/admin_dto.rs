use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct RiderActivationRequest {
    pub active: bool,
}

// Windows in days; omitted ones use the configured defaults
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AlertRefreshRequest {
    pub due_soon_days: Option<i64>,
    pub starting_soon_days: Option<i64>,
}
