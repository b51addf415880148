//! Endpoint helpers
//!
//! Each helper builds a path and body for one API action and goes through
//! the verb API of [`Platform`]. None of them check token validity.

use serde::{Deserialize, Serialize};

use crate::http::ApiResponse;
use crate::platform::Platform;
use crate::request::ApiRequest;
use crate::Result;

/// Account info
pub const ACCOUNT_PATH: &str = "/restapi/v1.0/account/~";
/// Account call log
pub const CALL_LOG_PATH: &str = "/restapi/v1.0/account/~/call-log";
/// Extension message store
pub const MESSAGE_STORE_PATH: &str = "/restapi/v1.0/account/~/extension/~/message-store";
/// Place a RingOut call
pub const RING_OUT_PATH: &str = "/restapi/v1.0/account/~/extension/~/ringout";
/// Send an SMS
pub const SMS_PATH: &str = "/restapi/v1.0/account/~/extension/~/sms";

/// `{"phoneNumber": ...}` wrapper used by call and message bodies
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PhoneNumber {
    /// Number in E.164 or local format
    pub phone_number: String,
}

impl PhoneNumber {
    /// Wrap a number
    pub fn new(phone_number: impl Into<String>) -> Self {
        Self {
            phone_number: phone_number.into(),
        }
    }
}

/// RingOut request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RingOutRequest {
    /// Number to call
    pub to: PhoneNumber,
    /// Number to ring first
    pub from: PhoneNumber,
    /// Number shown to the callee
    pub caller_id: PhoneNumber,
    /// Ask the caller to press 1 before connecting
    pub play_prompt: bool,
}

/// SMS request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmsRequest {
    /// Recipients
    pub to: Vec<PhoneNumber>,
    /// Sender number
    pub from: PhoneNumber,
    /// Message text
    pub text: String,
}

impl Platform {
    /// Connect `from` to `to`, showing `caller_id`
    pub async fn ring_out(
        &self,
        to: &str,
        from: &str,
        caller_id: &str,
        play_prompt: bool,
    ) -> Result<ApiResponse> {
        let body = RingOutRequest {
            to: PhoneNumber::new(to),
            from: PhoneNumber::new(from),
            caller_id: PhoneNumber::new(caller_id),
            play_prompt,
        };
        self.post(ApiRequest::new(RING_OUT_PATH).json_body(&body)?).await
    }

    /// Send `text` from `from` to a single recipient
    pub async fn send_sms(&self, to: &str, from: &str, text: &str) -> Result<ApiResponse> {
        let body = SmsRequest {
            to: vec![PhoneNumber::new(to)],
            from: PhoneNumber::new(from),
            text: text.to_string(),
        };
        self.post(ApiRequest::new(SMS_PATH).json_body(&body)?).await
    }

    /// Fetch the account call log
    pub async fn call_log(&self) -> Result<ApiResponse> {
        self.get(ApiRequest::new(CALL_LOG_PATH)).await
    }

    /// Fetch the extension message store
    pub async fn message_store(&self) -> Result<ApiResponse> {
        self.get(ApiRequest::new(MESSAGE_STORE_PATH)).await
    }

    /// Fetch account info; doubles as an API liveness probe
    pub async fn version(&self) -> Result<ApiResponse> {
        self.get(ApiRequest::new(ACCOUNT_PATH)).await
    }
}
