use std::collections::BTreeMap;

use orbit_core::events::{decode, encode, origin_hostname};
use orbit_core::{
    Address, BackgroundEvent, ConnectedAccount, ContentEvent, InjectedEvent, SidePanelEvent,
};
use serde_json::json;

#[test]
fn injected_events_carry_origin_and_type() {
    let value = encode(&InjectedEvent::GetTagsForAddresses {
        request_id: 3,
        addresses: vec![Address::new("abc")],
    })
    .expect("encode");
    assert_eq!(
        value,
        json!({
            "origin": "injected",
            "type": "getTagsForAddresses",
            "requestId": 3,
            "addresses": ["abc"],
        })
    );
}

#[test]
fn side_panel_submit_uses_camel_case_fields() {
    let value = encode(&SidePanelEvent::ConnectionSubmit {
        tab_id: 12,
        request_id: 4,
        for_origin: "app.example".to_owned(),
        addresses: vec![],
    })
    .expect("encode");
    assert_eq!(value["origin"], "sidePanel");
    assert_eq!(value["type"], "connectionSubmit");
    assert_eq!(value["tabId"], 12);
    assert_eq!(value["forOrigin"], "app.example");
}

#[test]
fn content_event_decodes_from_wire_shape() {
    let wire = json!({
        "origin": "content",
        "type": "connectAccounts",
        "requestId": 9,
        "accounts": [{"address": "abc", "label": "main", "tags": ["defi"]}],
    });
    let event: ContentEvent = decode(&wire).expect("decode");
    assert_eq!(
        event,
        ContentEvent::ConnectAccounts {
            request_id: 9,
            accounts: vec![ConnectedAccount {
                address: Address::new("abc"),
                label: "main".to_owned(),
                tags: vec!["defi".to_owned()],
            }],
        }
    );
}

#[test]
fn tags_response_is_keyed_by_address() {
    let mut tags = BTreeMap::new();
    tags.insert(Address::new("abc"), vec!["cold".to_owned()]);
    let value = encode(&ContentEvent::TagsForAddresses { request_id: 1, tags }).expect("encode");
    assert_eq!(value["tags"], json!({"abc": ["cold"]}));
}

#[test]
fn decode_ignores_other_origins() {
    let wire = encode(&InjectedEvent::Disconnect { request_id: 1 }).expect("encode");
    assert!(decode::<ContentEvent>(&wire).is_none());
    assert!(decode::<BackgroundEvent>(&wire).is_none());
    assert!(decode::<InjectedEvent>(&wire).is_some());
}

#[test]
fn decode_ignores_unknown_types_and_missing_origin() {
    let unknown = json!({"origin": "injected", "type": "signAll", "requestId": 1});
    assert!(decode::<InjectedEvent>(&unknown).is_none());
    assert!(decode::<InjectedEvent>(&json!({"type": "disconnect", "requestId": 1})).is_none());
    assert!(decode::<InjectedEvent>(&json!("disconnect")).is_none());
}

#[test]
fn hostname_is_extracted_from_page_origin() {
    assert_eq!(
        origin_hostname("https://app.example.com:8443").as_deref(),
        Some("app.example.com")
    );
    assert_eq!(
        origin_hostname("https://app.example.com/some/page?x=1").as_deref(),
        Some("app.example.com")
    );
    assert!(origin_hostname("null").is_none());
}
