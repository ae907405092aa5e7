use serde::{Deserialize, Serialize};

use crate::node::UserId;

/// Display information about a user who owns or shares nodes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserProfile {
    #[serde(rename = "ID")]
    pub id: UserId,
    #[serde(default)]
    pub login_name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(rename = "ProfilePicURL", default, skip_serializing_if = "String::is_empty")]
    pub profile_pic_url: String,
}
