use std::collections::HashMap;

use opentelemetry::KeyValue;
use opentelemetry_sdk::Resource;

/// Build the [`Resource`] that identifies this process on every span and log record.
pub(crate) fn build_resource(service_name: &str, attributes: &HashMap<String, String>) -> Resource {
    let mut kvs: Vec<KeyValue> = Vec::with_capacity(attributes.len() + 2);
    kvs.push(KeyValue::new("service.name", service_name.to_owned()));
    kvs.push(KeyValue::new("service.version", env!("CARGO_PKG_VERSION")));

    for (key, value) in attributes {
        kvs.push(KeyValue::new(key.clone(), value.clone()));
    }

    Resource::builder().with_attributes(kvs).build()
}
