use std::str::FromStr;

use assert_matches::assert_matches;
use serde_json::json;

use rds_port_adapter::domain::{
    Capabilities, Capability, Credentials, CustomProperty, FileTransferMode, LoginMode, PortName,
};
use rds_port_adapter::error::PortError;

#[test]
fn port_name_normalization() {
    let cases = [
        ("Zenodo", "port-zenodo", "Zenodo"),
        ("  owncloud ", "port-owncloud", "owncloud"),
        ("port-openscienceframework", "port-openscienceframework", "port-openscienceframework"),
        ("PORT-Reva", "port-reva", "PORT-Reva"),
    ];
    for (raw, normalized, service) in cases {
        let name = PortName::from_str(raw).unwrap();
        assert_eq!(name.as_str(), normalized);
        assert_eq!(name.service(), service);
        assert_eq!(name.to_string(), normalized);
    }
}

#[test]
fn port_name_rejects_blank() {
    assert_matches!(PortName::from_str(""), Err(PortError::InvalidPortName(_)));
    assert_matches!(PortName::from_str("\t"), Err(PortError::InvalidPortName(_)));
}

#[test]
fn capability_serializes_camel_case() {
    assert_eq!(serde_json::to_value(Capability::FileStorage).unwrap(), json!("fileStorage"));
    assert_eq!(serde_json::to_value(Capability::Metadata).unwrap(), json!("metadata"));
}

#[test]
fn capability_membership() {
    let storage = Capabilities::new(true, false);
    assert!(storage.contains(Capability::FileStorage));
    assert!(!storage.contains(Capability::Metadata));
    assert!(!storage.is_empty());
}

#[test]
fn transfer_modes_display_lowercase() {
    assert_eq!(FileTransferMode::default().to_string(), "active");
    assert_eq!(FileTransferMode::Passive.to_string(), "passive");
    assert_eq!(LoginMode::default().to_string(), "oauth");
    assert_eq!(serde_json::to_value(LoginMode::None).unwrap(), json!("none"));
}

#[test]
fn credentials_expose_string_fields() {
    let credentials: Credentials =
        serde_json::from_value(json!({"username": "alice", "retries": 3})).unwrap();
    assert_eq!(credentials.get("username"), Some("alice"));
    assert_eq!(credentials.get("retries"), None);
    assert_eq!(credentials.get("password"), None);
    assert!(!credentials.is_empty());
}

#[test]
fn custom_property_wire_shape() {
    let property: CustomProperty =
        serde_json::from_value(json!({"key": "projectId", "value": 12})).unwrap();
    assert_eq!(property, CustomProperty::new("projectId", 12));
}
