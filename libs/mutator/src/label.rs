use std::collections::BTreeMap;

pub const APP_NAME_LABEL: &str = "appName";
pub const CAR_ID_LABEL: &str = "car_id";
pub const SERVICE_LABEL: &str = "service";

/// Compute the `service` label a Pod should carry from its `appName` and `car_id` labels.
///
/// Returns `None` when neither source label is set, in which case the Pod is left alone.
pub fn service_label_value(labels: Option<&BTreeMap<String, String>>) -> Option<String> {
    let labels = labels?;
    match (labels.get(APP_NAME_LABEL), labels.get(CAR_ID_LABEL)) {
        (Some(app_name), Some(car_id)) => Some(format!("{app_name}-{car_id}")),
        (Some(app_name), None) => Some(app_name.clone()),
        (None, Some(car_id)) => Some(car_id.clone()),
        (None, None) => None,
    }
}
