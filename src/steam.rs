//! Steam storefront endpoints and payload decoding.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

pub const STORE_BASE_URL: &str = "http://store.steampowered.com";
pub const API_BASE_URL: &str = "https://api.steampowered.com";

const CATEGORY_SINGLEPLAYER: i64 = 2;
const CATEGORY_MULTIPLAYER: i64 = 1;
const CATEGORY_ONLINE_MULTIPLAYER: i64 = 36;
const CATEGORY_LOCAL_MULTIPLAYER: i64 = 37;

static APP_PAGE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/steam/apps/(\d+)").expect("valid regex"));

pub fn search_page_url(base: &str, page: u32) -> String {
    format!("{base}/search/?sort_by=Released_DESC&vrsupport=101&page={page}")
}

pub fn app_details_url(base: &str, app_id: i64) -> String {
    format!("{base}/api/appdetails?appids={app_id}")
}

pub fn player_count_url(base: &str, app_id: i64) -> String {
    format!("{base}/ISteamUserStats/GetNumberOfCurrentPlayers/v1/?appid={app_id}")
}

/// Extract application ids from a search results page, in page order.
/// Digit groups too large for an id are logged and skipped; an empty result
/// means the end of the catalog has been reached.
pub fn extract_app_ids(html: &str) -> Vec<i64> {
    let mut ids = Vec::new();
    for caps in APP_PAGE_RE.captures_iter(html) {
        let digits = &caps[1];
        match digits.parse::<i64>() {
            Ok(id) => ids.push(id),
            Err(_) => tracing::warn!(digits, "bad app id"),
        }
    }
    ids
}

/// The appdetails endpoint keys its response by the decimal form of the
/// queried app id. A `null` body decodes as `None` and is treated like the
/// empty map by callers.
pub type AppInfoById = HashMap<String, AppInfo>;

#[derive(Debug, Default, Deserialize)]
pub struct AppInfo {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: AppData,
}

#[derive(Debug, Default, Deserialize)]
pub struct AppData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub categories: Vec<AppCategory>,
}

#[derive(Debug, Deserialize)]
pub struct AppCategory {
    pub id: i64,
    #[serde(default)]
    pub description: String,
}

impl AppInfo {
    fn has_category(&self, id: i64) -> bool {
        self.data.categories.iter().any(|c| c.id == id)
    }

    pub fn is_singleplayer(&self) -> bool {
        self.has_category(CATEGORY_SINGLEPLAYER)
    }

    pub fn is_multiplayer(&self) -> bool {
        self.has_category(CATEGORY_MULTIPLAYER)
    }

    pub fn is_online_multiplayer(&self) -> bool {
        self.has_category(CATEGORY_ONLINE_MULTIPLAYER)
    }

    pub fn is_local_multiplayer(&self) -> bool {
        self.has_category(CATEGORY_LOCAL_MULTIPLAYER)
    }
}

#[derive(Debug, Deserialize)]
pub struct PlayerCount {
    pub response: PlayerCountResponse,
}

#[derive(Debug, Default, Deserialize)]
pub struct PlayerCountResponse {
    #[serde(default)]
    pub player_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_ids_in_page_order() {
        let html = r#"
            <a href="https://steamdb.example/steam/apps/620"></a>
            <a href="/steam/apps/440?snr=1"></a>
            <a href="/steam/apps/730"></a>
        "#;
        assert_eq!(extract_app_ids(html), vec![620, 440, 730]);
    }

    #[test]
    fn skips_unparseable_digit_groups() {
        let html = "/steam/apps/99999999999999999999999 /steam/apps/570";
        assert_eq!(extract_app_ids(html), vec![570]);
    }

    #[test]
    fn empty_page_yields_no_ids() {
        assert!(extract_app_ids("<html><body>no games here</body></html>").is_empty());
    }

    #[test]
    fn capability_predicates_match_category_ids() {
        let info: AppInfo = serde_json::from_str(
            r#"{
                "success": true,
                "data": {
                    "name": "Example",
                    "categories": [
                        {"id": 2, "description": "Single-player"},
                        {"id": 36, "description": "Online Multi-Player"}
                    ]
                }
            }"#,
        )
        .unwrap();
        assert!(info.success);
        assert_eq!(info.data.categories[0].description, "Single-player");
        assert!(info.is_singleplayer());
        assert!(info.is_online_multiplayer());
        assert!(!info.is_multiplayer());
        assert!(!info.is_local_multiplayer());
    }

    #[test]
    fn unknown_categories_set_no_capability() {
        let info: AppInfo = serde_json::from_str(
            r#"{"success": true, "data": {"name": "X", "categories": [{"id": 99}]}}"#,
        )
        .unwrap();
        assert!(!info.is_singleplayer());
        assert!(!info.is_multiplayer());
        assert!(!info.is_online_multiplayer());
        assert!(!info.is_local_multiplayer());
    }

    #[test]
    fn envelope_is_keyed_by_decimal_id() {
        let by_id: Option<AppInfoById> = serde_json::from_str(
            r#"{"42": {"success": true, "data": {"name": "Answer", "categories": []}}}"#,
        )
        .unwrap();
        let by_id = by_id.unwrap();
        assert_eq!(by_id.len(), 1);
        assert_eq!(by_id["42"].data.name, "Answer");
    }

    #[test]
    fn null_and_empty_envelopes_decode_as_empty() {
        let null_body: Option<AppInfoById> = serde_json::from_str("null").unwrap();
        assert!(null_body.is_none());

        let empty: Option<AppInfoById> = serde_json::from_str("{}").unwrap();
        assert!(empty.unwrap().is_empty());
    }

    #[test]
    fn player_count_envelope_decodes() {
        let players: PlayerCount =
            serde_json::from_str(r#"{"response": {"player_count": 31337}}"#).unwrap();
        assert_eq!(players.response.player_count, 31337);
    }

    #[test]
    fn url_builders_match_endpoints() {
        assert_eq!(
            search_page_url(STORE_BASE_URL, 3),
            "http://store.steampowered.com/search/?sort_by=Released_DESC&vrsupport=101&page=3"
        );
        assert_eq!(
            app_details_url(STORE_BASE_URL, 620),
            "http://store.steampowered.com/api/appdetails?appids=620"
        );
        assert_eq!(
            player_count_url(API_BASE_URL, 620),
            "https://api.steampowered.com/ISteamUserStats/GetNumberOfCurrentPlayers/v1/?appid=620"
        );
    }
}
