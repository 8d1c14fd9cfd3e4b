//! Response payloads of the Identity Toolkit REST endpoints.

use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordSignInResponse {
    pub local_id: String,
    pub email: String,
    pub id_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResponse {
    pub local_id: String,
    pub email: String,
    pub id_token: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendCodeResponse {
    pub session_info: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneSignInResponse {
    pub local_id: String,
    pub id_token: String,
    #[serde(default)]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub is_new_user: bool,
}
