use serde::Deserialize;

// ==================================================================================================
// Boards
// ==================================================================================================

/// One page of `GET /v5/boards`
#[derive(Debug, Clone, Deserialize)]
pub struct BoardsPage {
    #[serde(default)]
    pub items: Vec<Board>,
    pub bookmark: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Board {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub privacy: Option<String>,
    pub pin_count: Option<u64>,
}

// ==================================================================================================
// Pins
// ==================================================================================================

/// One page of `GET /v5/boards/{board_id}/pins`
#[derive(Debug, Clone, Deserialize)]
pub struct PinsPage {
    #[serde(default)]
    pub items: Vec<Pin>,
    pub bookmark: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Pin {
    pub id: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,

    /// Media shape varies by pin type
    pub media: Option<serde_json::Value>,
}

impl Pin {
    pub fn display_title(&self) -> &str {
        self.title
            .as_deref()
            .filter(|t| !t.is_empty())
            .unwrap_or("Untitled")
    }
}

// ==================================================================================================
// Account
// ==================================================================================================

/// `GET /v5/user_account`
#[derive(Debug, Clone, Deserialize)]
pub struct UserAccount {
    pub username: Option<String>,
    pub account_type: Option<String>,
    pub website_url: Option<String>,
    pub board_count: Option<u64>,
    pub pin_count: Option<u64>,
}
