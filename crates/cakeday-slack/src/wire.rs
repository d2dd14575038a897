//! Serde views of the Slack Web API responses this crate touches.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MembersResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub members: Vec<String>,
    #[serde(default)]
    pub response_metadata: Option<ResponseMetadata>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ResponseMetadata {
    #[serde(default)]
    pub next_cursor: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserInfoResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub user: Option<UserObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserObject {
    #[serde(default)]
    pub is_bot: bool,
    #[serde(default)]
    pub deleted: bool,
    #[serde(default)]
    pub tz: Option<String>,
    #[serde(default)]
    pub profile: Option<UserProfileObject>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UserProfileObject {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub real_name: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image_512: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadUrlResponse {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    pub upload_url: Option<String>,
    pub file_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_info_parses_real_payload_shape() {
        let json = r#"{
            "ok": true,
            "user": {
                "id": "U0123",
                "deleted": false,
                "is_bot": false,
                "tz": "Europe/Kyiv",
                "profile": {
                    "display_name": "lena",
                    "real_name": "Olena K",
                    "title": "SRE",
                    "image_512": "https://avatars.example/u0123_512.jpg"
                }
            }
        }"#;
        let resp: UserInfoResponse = serde_json::from_str(json).unwrap();
        assert!(resp.ok);
        let user = resp.user.unwrap();
        assert_eq!(user.tz.as_deref(), Some("Europe/Kyiv"));
        let profile = user.profile.unwrap();
        assert_eq!(profile.display_name.as_deref(), Some("lena"));
        assert_eq!(profile.title.as_deref(), Some("SRE"));
    }

    #[test]
    fn members_pagination_cursor() {
        let json = r#"{
            "ok": true,
            "members": ["U1", "U2"],
            "response_metadata": {"next_cursor": "dGVhbTpD"}
        }"#;
        let resp: MembersResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.members, vec!["U1", "U2"]);
        assert_eq!(resp.response_metadata.unwrap().next_cursor, "dGVhbTpD");
    }

    #[test]
    fn error_envelope() {
        let json = r#"{"ok": false, "error": "channel_not_found"}"#;
        let resp: Envelope = serde_json::from_str(json).unwrap();
        assert!(!resp.ok);
        assert_eq!(resp.error.as_deref(), Some("channel_not_found"));
    }
}
