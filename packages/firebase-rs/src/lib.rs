// REST client for the hosted backend: Identity Toolkit for authentication,
// Firestore for documents. Thin request/response plumbing only; error
// mapping and flow logic live in the consuming crate.

pub mod models;

use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::models::{
    PasswordSignInResponse, PhoneSignInResponse, SendCodeResponse, SignUpResponse,
};

const IDENTITY_BASE_URL: &str = "https://identitytoolkit.googleapis.com/v1";
const FIRESTORE_BASE_URL: &str = "https://firestore.googleapis.com/v1";

#[derive(Debug, Clone)]
pub struct FirebaseOptions {
    pub api_key: String,
    pub project_id: String,
}

#[derive(Debug, Error)]
pub enum FirebaseError {
    /// Error code reported by the backend, e.g. `EMAIL_EXISTS`.
    #[error("{code}")]
    Api { code: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected response: {0}")]
    Unexpected(String),
}

// =============================================================================
// Identity Toolkit
// =============================================================================

#[derive(Debug, Clone)]
pub struct IdentityClient {
    options: FirebaseOptions,
    client: Client,
}

impl IdentityClient {
    pub fn new(options: FirebaseOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PasswordSignInResponse, FirebaseError> {
        self.post(
            "signInWithPassword",
            json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }),
        )
        .await
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
    ) -> Result<SignUpResponse, FirebaseError> {
        self.post(
            "signUp",
            json!({
                "email": email,
                "password": password,
                "returnSecureToken": true,
            }),
        )
        .await
    }

    pub async fn send_verification_code(
        &self,
        phone_number: &str,
        recaptcha_token: &str,
    ) -> Result<SendCodeResponse, FirebaseError> {
        self.post(
            "sendVerificationCode",
            json!({
                "phoneNumber": phone_number,
                "recaptchaToken": recaptcha_token,
            }),
        )
        .await
    }

    pub async fn sign_in_with_phone_number(
        &self,
        session_info: &str,
        code: &str,
    ) -> Result<PhoneSignInResponse, FirebaseError> {
        self.post(
            "signInWithPhoneNumber",
            json!({
                "sessionInfo": session_info,
                "code": code,
            }),
        )
        .await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        method: &str,
        body: Value,
    ) -> Result<T, FirebaseError> {
        let url = format!("{IDENTITY_BASE_URL}/accounts:{method}");
        let response = self
            .client
            .post(&url)
            .query(&[("key", self.options.api_key.as_str())])
            .json(&body)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(response.json::<T>().await?)
    }
}

// =============================================================================
// Firestore documents
// =============================================================================

#[derive(Debug, Clone)]
pub struct FirestoreClient {
    options: FirebaseOptions,
    client: Client,
}

impl FirestoreClient {
    pub fn new(options: FirebaseOptions) -> Self {
        Self {
            options,
            client: Client::new(),
        }
    }

    /// Fetch a document as plain JSON. `Ok(None)` when it does not exist.
    pub async fn get_document(
        &self,
        collection: &str,
        id: &str,
        bearer: Option<&str>,
    ) -> Result<Option<Value>, FirebaseError> {
        let mut request = self
            .client
            .get(self.document_url(collection, id))
            .query(&[("key", self.options.api_key.as_str())]);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        let document: Value = response.json().await?;
        let fields = document
            .get("fields")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        Ok(Some(fields_to_json(&fields)?))
    }

    /// Create-or-overwrite a document from plain JSON.
    pub async fn set_document(
        &self,
        collection: &str,
        id: &str,
        document: &Value,
        bearer: Option<&str>,
    ) -> Result<(), FirebaseError> {
        let body = json!({ "fields": json_to_fields(document)? });
        let mut request = self
            .client
            .patch(self.document_url(collection, id))
            .query(&[("key", self.options.api_key.as_str())])
            .json(&body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }
        Ok(())
    }

    fn document_url(&self, collection: &str, id: &str) -> String {
        format!(
            "{FIRESTORE_BASE_URL}/projects/{}/databases/(default)/documents/{}/{}",
            self.options.project_id, collection, id
        )
    }
}

// =============================================================================
// Error extraction and value wrapping
// =============================================================================

async fn api_error(response: reqwest::Response) -> FirebaseError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let code = error_code(&body).unwrap_or_else(|| status.to_string());
    FirebaseError::Api { code }
}

fn error_code(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    value["error"]["message"].as_str().map(str::to_string)
}

/// Convert a Firestore `fields` map into plain JSON.
fn fields_to_json(fields: &Value) -> Result<Value, FirebaseError> {
    let Some(entries) = fields.as_object() else {
        return Err(FirebaseError::Unexpected(
            "document fields are not a map".to_string(),
        ));
    };
    let mut out = Map::new();
    for (key, wrapped) in entries {
        out.insert(key.clone(), unwrap_value(wrapped));
    }
    Ok(Value::Object(out))
}

/// Convert plain JSON into a Firestore `fields` map.
fn json_to_fields(document: &Value) -> Result<Value, FirebaseError> {
    let Some(entries) = document.as_object() else {
        return Err(FirebaseError::Unexpected(
            "document must be a JSON object".to_string(),
        ));
    };
    let mut out = Map::new();
    for (key, value) in entries {
        out.insert(key.clone(), wrap_value(value));
    }
    Ok(Value::Object(out))
}

fn wrap_value(value: &Value) -> Value {
    match value {
        Value::Null => json!({ "nullValue": null }),
        Value::Bool(flag) => json!({ "booleanValue": flag }),
        Value::Number(number) => {
            if number.is_f64() {
                json!({ "doubleValue": number })
            } else {
                // Firestore carries integers as strings
                json!({ "integerValue": number.to_string() })
            }
        }
        Value::String(text) => json!({ "stringValue": text }),
        Value::Array(items) => {
            let values: Vec<Value> = items.iter().map(wrap_value).collect();
            json!({ "arrayValue": { "values": values } })
        }
        Value::Object(map) => {
            let mut fields = Map::new();
            for (key, inner) in map {
                fields.insert(key.clone(), wrap_value(inner));
            }
            json!({ "mapValue": { "fields": fields } })
        }
    }
}

fn unwrap_value(wrapped: &Value) -> Value {
    if let Some(text) = wrapped.get("stringValue").and_then(Value::as_str) {
        return Value::String(text.to_string());
    }
    if let Some(text) = wrapped.get("timestampValue").and_then(Value::as_str) {
        return Value::String(text.to_string());
    }
    if let Some(raw) = wrapped.get("integerValue").and_then(Value::as_str) {
        if let Ok(number) = raw.parse::<i64>() {
            return Value::from(number);
        }
    }
    if let Some(number) = wrapped.get("doubleValue") {
        return number.clone();
    }
    if let Some(flag) = wrapped.get("booleanValue").and_then(Value::as_bool) {
        return Value::Bool(flag);
    }
    if wrapped.get("nullValue").is_some() {
        return Value::Null;
    }
    if let Some(values) = wrapped
        .get("arrayValue")
        .and_then(|a| a.get("values"))
        .and_then(Value::as_array)
    {
        return Value::Array(values.iter().map(unwrap_value).collect());
    }
    if let Some(fields) = wrapped.get("mapValue").and_then(|m| m.get("fields")) {
        return fields_to_json(fields).unwrap_or(Value::Null);
    }
    Value::Null
}
