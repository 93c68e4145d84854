//! Wire response assembly.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SearchError};
use crate::types::Passage;

/// The JSON body returned to clients: `{"response": [{url, title, content}]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchResponse {
    pub response: Vec<Passage>,
}

impl SearchResponse {
    pub fn len(&self) -> usize {
        self.response.len()
    }

    pub fn is_empty(&self) -> bool {
        self.response.is_empty()
    }

    /// Serialise to the wire format.
    ///
    /// # Errors
    ///
    /// Returns [`SearchError::Parse`] if serialisation fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| SearchError::Parse(format!("response encoding failed: {e}")))
    }
}

/// Build the response from accepted passages, keeping acceptance order and at
/// most `wanted` entries.
pub fn assemble(mut accepted: Vec<Passage>, wanted: usize) -> SearchResponse {
    accepted.truncate(wanted);
    SearchResponse { response: accepted }
}
