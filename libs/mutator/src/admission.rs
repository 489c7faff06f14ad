use base64::prelude::*;
use json_patch::Patch;
use kube::core::TypeMeta;
use serde::{Deserialize, Serialize};

pub const PATCH_TYPE_JSON_PATCH: &str = "JSONPatch";

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AdmissionReview {
    #[serde(flatten)]
    pub types: TypeMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<AdmissionRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<AdmissionResponse>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupVersionKind {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub kind: String,
}

/// One admission call as sent by the API server.
///
/// `object` is kept opaque here; it is only projected once the engine needs it.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct AdmissionRequest {
    pub uid: String,
    pub kind: GroupVersionKind,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub operation: String,
    #[serde(default)]
    pub object: serde_json::Value,
    /// `apiVersion`/`kind` of the enclosing review, echoed back in the response.
    #[serde(skip)]
    pub envelope: TypeMeta,
}

#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AdmissionResponse {
    pub uid: String,
    pub allowed: bool,
    /// Base64 encoded JSON Patch document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
}

/// Outcome of an admission call. The webhook never denies, so `allowed` is always true.
#[derive(Debug, Clone, PartialEq)]
pub struct AdmissionDecision {
    pub uid: String,
    pub allowed: bool,
    pub patch: Option<Patch>,
}

impl AdmissionDecision {
    pub fn allow(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            allowed: true,
            patch: None,
        }
    }

    pub fn with_patch(mut self, patch: Patch) -> Self {
        self.patch = Some(patch);
        self
    }

    pub fn patch_type(&self) -> Option<&'static str> {
        self.patch.as_ref().map(|_| PATCH_TYPE_JSON_PATCH)
    }

    pub fn into_response(self) -> Result<AdmissionResponse, serde_json::Error> {
        let patch_type = self.patch_type().map(str::to_string);
        let patch = self
            .patch
            .map(|patch| serde_json::to_vec(&patch).map(|raw| BASE64_STANDARD.encode(raw)))
            .transpose()?;
        Ok(AdmissionResponse {
            uid: self.uid,
            allowed: self.allowed,
            patch,
            patch_type,
        })
    }

    pub fn into_review(self, envelope: TypeMeta) -> Result<AdmissionReview, serde_json::Error> {
        Ok(AdmissionReview {
            types: envelope,
            request: None,
            response: Some(self.into_response()?),
        })
    }
}
