//! HTTP gateway tests against a local mock catalog service.
#![cfg(feature = "remote")]

use std::sync::Arc;

use mockito::{Matcher, Server};
use optionset_catalog::{
    CatalogError, FieldValueType, GatewayConfig, GatewayError, HttpGateway, InlineExecutor,
    MetadataCache, MetadataGateway,
};
use serde_json::json;

fn gateway(server: &Server) -> HttpGateway {
    HttpGateway::new(&server.url(), &GatewayConfig::default()).unwrap()
}

#[test]
fn list_objects_passes_container_filter() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/objects")
        .match_query(Matcher::UrlEncoded("container".into(), "sales".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                { "identifier": "account", "display_label": "Account",
                  "is_managed": false, "is_customizable": true }
            ])
            .to_string(),
        )
        .create();

    let objects = gateway(&server).list_objects(Some("sales")).unwrap();
    mock.assert();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].identifier, "account");
}

#[test]
fn list_fields_decodes_value_types() {
    let mut server = Server::new();
    let mock = server
        .mock("GET", "/objects/account/fields")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                { "identifier": "industrycode", "display_label": "Industry", "value_type": "picklist" },
                { "identifier": "location", "display_label": "Location", "value_type": "geography" }
            ])
            .to_string(),
        )
        .create();

    let fields = gateway(&server).list_fields("account").unwrap();
    mock.assert();
    assert_eq!(fields[0].value_type, FieldValueType::Picklist);
    assert_eq!(fields[1].value_type, FieldValueType::Other);
}

#[test]
fn http_error_status_is_a_network_error() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/objects/account/fields/industrycode/value-set")
        .with_status(503)
        .create();

    let result = gateway(&server).describe_value_set("account", "industrycode");
    match result {
        Err(err @ GatewayError::Network { .. }) => assert_eq!(err.exit_code(), 3),
        other => panic!("unexpected result: {other:?}"),
    }
}

#[test]
fn malformed_body_is_a_network_error() {
    let mut server = Server::new();
    let _mock = server
        .mock("GET", "/objects/account/fields")
        .with_status(200)
        .with_body("not json")
        .create();

    let result = gateway(&server).list_fields("account");
    assert!(matches!(result, Err(GatewayError::Network { .. })));
}

#[test]
fn cache_over_http_describes_shared_set_once_per_field() {
    let mut server = Server::new();
    let industry = json!({
        "is_global": true,
        "global_name": "industry_g",
        "values": [{ "value": 1, "label": "Tech" }, { "value": 2, "label": "Finance" }]
    });

    let _objects = server
        .mock("GET", "/objects")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            json!([
                { "identifier": "account", "display_label": "Account" },
                { "identifier": "contact", "display_label": "Contact" }
            ])
            .to_string(),
        )
        .create();
    let _account_fields = server
        .mock("GET", "/objects/account/fields")
        .with_status(200)
        .with_body(
            json!([{ "identifier": "industrycode", "display_label": "Industry", "value_type": "picklist" }])
                .to_string(),
        )
        .create();
    let _contact_fields = server
        .mock("GET", "/objects/contact/fields")
        .with_status(200)
        .with_body(
            json!([{ "identifier": "preferredindustry", "display_label": "Preferred Industry", "value_type": "picklist" }])
                .to_string(),
        )
        .create();
    let account_values = server
        .mock("GET", "/objects/account/fields/industrycode/value-set")
        .with_status(200)
        .with_body(industry.to_string())
        .expect(1)
        .create();
    let contact_values = server
        .mock("GET", "/objects/contact/fields/preferredindustry/value-set")
        .with_status(200)
        .with_body(json!({ "is_global": true, "global_name": "industry_g", "values": [] }).to_string())
        .expect(1)
        .create();

    let mut cache = MetadataCache::new(Arc::new(gateway(&server)), InlineExecutor);
    cache.load_objects(None).unwrap();
    for (object, field) in [("account", "industrycode"), ("contact", "preferredindustry")] {
        let object = cache.require_object(object).unwrap();
        cache.load_fields(object).unwrap();
        let field = cache.require_field(object, field).unwrap();
        cache.load_options(field).unwrap();
        // Loaded options are served from the cache.
        cache.load_options(field).unwrap();
    }

    account_values.assert();
    contact_values.assert();

    let contact = cache.require_object("contact").unwrap();
    let preferred = cache.require_field(contact, "preferredindustry").unwrap();
    let labels: Vec<_> = cache
        .field(preferred)
        .unwrap()
        .options()
        .iter()
        .map(|o| o.label())
        .collect();
    assert_eq!(labels, ["Tech", "Finance"]);
}

#[test]
fn unreachable_service_fails_the_load() {
    // Port 9 (discard) is not expected to serve HTTP.
    let config = GatewayConfig::default().timeout(std::time::Duration::from_secs(2));
    let gateway = HttpGateway::new("http://127.0.0.1:9", &config).unwrap();
    let mut cache = MetadataCache::new(Arc::new(gateway), InlineExecutor);

    let err = cache.load_objects(None).unwrap_err();
    assert!(matches!(err, CatalogError::GatewayUnavailable { .. }));
    assert!(cache.objects().is_empty());
}
