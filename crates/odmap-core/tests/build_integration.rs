//! Integration tests for building decision requests
//!
//! These tests drive the public engine API end to end:
//! - The credit-risk fixture mapping against a full application
//! - Transform behaviour observable in the envelope
//! - Required-target validation and error reporting
//! - Serialization of the last built request

mod test_support;

use odmap_core::{BuildOptions, DecisionRequest, Error, Record, Value, VariableKind};
use pretty_assertions::assert_eq;
use serde_json::json;
use test_support::*;

#[test]
fn test_credit_application_envelope() {
    let mut engine = credit_engine();
    let request = engine.build(&credit_application()).unwrap();

    let expected = json!({
        "__DecisionID__": FIXED_DECISION_ID,
        "coRequest": {
            "sourceSystem": "FLEET",
            "channel": "DEALER",
            "assetType": "CAR",
            "customerType": "PARTICULAR",
            "maritalStatus": "SOLTERO",
            "paymentType": "CONTADO",
            "productType": "AUTO",
            "role": "titular",
            "vehicleType": "SUV",
            "employmentType": "ASALARIADO",
            "countryCode": "ES",
            "dateVariables": [
                {"name": "decisionDate", "value": "2023-08-15"},
                {"name": "applicationDate", "value": "2023-08-01"},
                {"name": "registrationDate", "value": "2020-01-01"},
                {"name": "lastDefaultDate", "value": "2021-05-10"},
                {"name": "lastRecoveryDate", "value": "2021-06-20"},
                {"name": "birthDate", "value": "1990-10-05"}
            ],
            "doubleVariables": [
                {"name": "outstandingBalance", "value": 20000.0},
                {"name": "requestedAmount", "value": 30000.0},
                {"name": "eurotaxValue", "value": 15000.0},
                {"name": "netAnnualIncome", "value": 40000.0},
                {"name": "downPayment", "value": 5000.0},
                {"name": "netMonthlyIncome", "value": 3500.0},
                {"name": "monthlyInstallment", "value": 600.0},
                {"name": "ratio44", "value": 0.25},
                {"name": "pymeScore", "value": 700.0}
            ],
            "integerVariables": [
                {"name": "numberOfClients", "value": 1},
                {"name": "termMonths", "value": 36},
                {"name": "yearsEmployed", "value": 5},
                {"name": "totalIncidents", "value": 0},
                {"name": "currentDefaultLitigations", "value": 0},
                {"name": "riskScore", "value": 500}
            ],
            "stringVariables": [
                {"name": "scoringModel", "value": "v2"},
                {"name": "storePostalCode", "value": "28080"},
                {"name": "postalCode", "value": "28010"},
                {"name": "rciCustomerType", "value": "EMPRESA"}
            ],
            "listOfDoubleVariables": [
                {"name": "amortizationPlan", "value": [1.0, 2.56, 0.0, 4.3]}
            ]
        }
    });

    assert_eq!(request.to_json_value().unwrap(), expected);
}

#[test]
fn test_scalar_key_order_keeps_constant_position() {
    let mut engine = credit_engine();
    let request = engine.build(&credit_application()).unwrap();
    let keys: Vec<&str> = request.co_request.fields.keys().map(String::as_str).collect();
    assert_eq!(&keys[..3], ["sourceSystem", "channel", "assetType"]);
}

#[test]
fn test_builds_are_deterministic_for_fixed_identifier() {
    let mut first = credit_engine();
    let mut second = credit_engine();
    first.build(&credit_application()).unwrap();
    second.build(&credit_application()).unwrap();
    assert_eq!(first.serialize().unwrap(), second.serialize().unwrap());
}

#[test]
fn test_customer_type_substitution() {
    let mut engine = engine_for(json!({
        "co_fields": {"customerType": {"from": "tipo_cliente", "map_from": {"P": "PARTICULAR"}}}
    }));
    let request = engine.build(&Record::new().with("tipo_cliente", "P")).unwrap();
    assert_eq!(request.scalar("customerType"), Some(&json!("PARTICULAR")));
}

#[test]
fn test_date_normalization_in_envelope() {
    let mut engine = engine_for(json!({
        "variables": {"date": {
            "decisionDate": {"from": "fecha", "date_in": "%d/%m/%Y"},
            "isoDate": {"from": "iso", "as_date": true}
        }}
    }));
    let record = Record::new().with("fecha", "15/08/2023").with("iso", "2021-05-10");
    let request = engine.build(&record).unwrap();
    assert_eq!(request.date_variable("decisionDate"), Some("2023-08-15"));
    assert_eq!(request.date_variable("isoDate"), Some("2021-05-10"));
}

#[test]
fn test_null_date_format_normalizes_iso() {
    let mut engine = engine_for(json!({
        "variables": {"date": {"lastDefaultDate": {"from": "fecha", "date_in": null}}}
    }));
    let request = engine
        .build(&Record::new().with("fecha", "2021-05-10T10:00:00"))
        .unwrap();
    assert_eq!(request.date_variable("lastDefaultDate"), Some("2021-05-10"));
}

#[test]
fn test_invalid_date_aborts_build() {
    let mut engine = engine_for(json!({
        "variables": {"date": {"decisionDate": {"from": "fecha", "date_in": "%d/%m/%Y"}}}
    }));
    let err = engine.build(&Record::new().with("fecha", "2023-08-15")).unwrap_err();
    assert!(matches!(err, Error::InvalidDate { .. }));
    assert!(engine.last_request().is_none());
}

#[test]
fn test_split_list_into_list_double() {
    let mut engine = engine_for(json!({
        "variables": {"list_double": {"plan": {"from": "plan", "split_csv": true}}}
    }));
    let request = engine.build(&Record::new().with("plan", "1, 2;3")).unwrap();
    assert_eq!(request.list_double_variable("plan"), Some(&[1.0, 2.0, 3.0][..]));
}

#[test]
fn test_scale_on_string_amount() {
    let mut engine = engine_for(json!({
        "variables": {"double": {"fee": {"from": "comision", "scale": 0.01}}}
    }));
    let request = engine.build(&Record::new().with("comision", "100")).unwrap();
    assert_eq!(request.double_variable("fee"), Some(1.0));
}

#[test]
fn test_missing_required_names_exactly_the_missing_target() {
    let mut engine = credit_engine();
    let mut application = credit_application();
    application = application
        .iter()
        .filter(|(key, _)| *key != "plazo_meses")
        .map(|(key, value)| (key.to_string(), value.clone()))
        .collect();

    let err = engine.build(&application).unwrap_err();
    match err {
        Error::MissingRequiredFields { missing } => assert_eq!(missing, vec!["termMonths"]),
        other => panic!("unexpected error: {other}"),
    }

    let request = engine
        .build_with(&application, BuildOptions::new().validate_required(false))
        .unwrap();
    assert_eq!(request.integer_variable("termMonths"), None);
}

#[test]
fn test_unproduced_collection_is_omitted() {
    let mut engine = engine_for(json!({
        "variables": {
            "string": {"postalCode": "cp"},
            "integer": {"termMonths": "plazo"}
        }
    }));
    let request = engine.build(&Record::new().with("plazo", 36)).unwrap();
    let value = request.to_json_value().unwrap();
    assert!(value["coRequest"].get("stringVariables").is_none());
    assert!(!request.co_request.has_collection(VariableKind::String));
    assert_eq!(request.co_request.collection_len(VariableKind::Integer), 1);
}

#[test]
fn test_blank_and_null_values() {
    let mut engine = engine_for(json!({
        "co_fields": {"channel": {"from": "canal", "default": "WEB"}},
        "variables": {"double": {"income": "ingresos"}},
        "required_odm": ["income"]
    }));
    let record = Record::new().with("canal", "   ").with("ingresos", Value::Null);
    let request = engine.build(&record).unwrap();
    assert_eq!(request.scalar("channel"), Some(&json!("WEB")));
    assert!(request.co_request.double_variables.is_none());
}

#[test]
fn test_serialized_request_reads_back() {
    let mut engine = credit_engine();
    let built = engine.build(&credit_application()).unwrap();

    let text = engine.serialize().unwrap();
    assert!(text.starts_with("{\n  \"__DecisionID__\""));
    let parsed = DecisionRequest::from_json_str(&text).unwrap();
    assert_eq!(parsed, built);
}

#[test]
fn test_scalar_named_like_a_collection_is_dropped() {
    let mut engine = engine_for(json!({
        "constants": {"co_fields": {"dateVariables": "x"}},
        "co_fields": {"stringVariables": "sv", "channel": "canal"},
        "variables": {"string": {"postalCode": "cp"}}
    }));
    let record = Record::new()
        .with("sv", "x")
        .with("canal", "WEB")
        .with("cp", "28010");
    let built = engine.build(&record).unwrap();

    let keys: Vec<&str> = built.co_request.fields.keys().map(String::as_str).collect();
    assert_eq!(keys, ["channel"]);

    let text = engine.serialize().unwrap();
    assert_eq!(text.matches("\"stringVariables\"").count(), 1);
    assert!(!text.contains("dateVariables"));
    let parsed = DecisionRequest::from_json_str(&text).unwrap();
    assert_eq!(parsed.string_variable("postalCode"), Some("28010"));
    assert_eq!(parsed, built);
}

#[test]
fn test_whitespace_date_aborts_required_build() {
    let mut engine = engine_for(json!({
        "variables": {"date": {"decisionDate": {"from": "fecha", "date_in": "%d/%m/%Y"}}},
        "required_odm": ["decisionDate"]
    }));
    let err = engine.build(&Record::new().with("fecha", "   ")).unwrap_err();
    assert!(matches!(err, Error::InvalidDate { .. }));
    assert!(engine.last_request().is_none());
}

#[test]
fn test_identifier_held_across_builds() {
    let mut engine = odmap_core::DecisionEngine::new(credit_mapping());
    let first = engine.build(&credit_application()).unwrap();
    assert!(first.decision_id.starts_with("Decision_"));
    assert_eq!(first.decision_id.len(), "Decision_".len() + 12);

    let second = engine.build(&credit_application()).unwrap();
    assert_eq!(second.decision_id, first.decision_id);
}

#[test]
fn test_record_rejects_nested_input() {
    let err = Record::from_json_str(r#"{"cliente": {"tipo": "P"}}"#).unwrap_err();
    assert!(matches!(err, Error::InvalidInput { .. }));
}
