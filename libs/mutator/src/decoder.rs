use crate::admission::{AdmissionRequest, AdmissionReview};
use crate::error::DecodeError;

pub const EXPECTED_CONTENT_TYPE: &str = "application/json";

/// Turn a raw webhook call into an [`AdmissionRequest`].
pub fn decode(content_type: Option<&str>, body: &[u8]) -> Result<AdmissionRequest, DecodeError> {
    if content_type != Some(EXPECTED_CONTENT_TYPE) {
        return Err(DecodeError::BadContentType(content_type.map(str::to_string)));
    }

    let review: AdmissionReview =
        serde_json::from_slice(body).map_err(DecodeError::MalformedEnvelope)?;

    let mut request = review.request.ok_or(DecodeError::MissingRequest)?;
    request.envelope = review.types;
    Ok(request)
}
