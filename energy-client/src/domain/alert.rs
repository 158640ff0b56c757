use serde::{Deserialize, Serialize};

/// Advisory text computed by the server for one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AlertMessage(pub String);

#[derive(Deserialize)]
#[serde(untagged)]
enum WireAlert {
    Text(String),
    Object { message: String },
}

impl AlertMessage {
    /// Interpret a raw response body. JSON strings and `{"message": ..}`
    /// objects are unwrapped; any other body is taken verbatim as plain text.
    pub fn from_body(body: &str) -> Self {
        match serde_json::from_str::<WireAlert>(body) {
            Ok(WireAlert::Text(text)) => Self(text),
            Ok(WireAlert::Object { message }) => Self(message),
            Err(_) => Self(body.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}
