//! End-to-end scenarios A-F from the similarity-engine specification,
//! exercised through the public `SignatureService` surface rather than its
//! internal pipeline stages (those have their own unit tests alongside the
//! code they cover).

use gatekeeper::core::config::RulesetConfig;
use gatekeeper::{SignatureService, SignatureStore};

const PETSTORE: &str = r#"{
    "info": {"title": "Petstore", "version": "1.0"},
    "paths": {"/pets": {"get": {"operationId": "listPets", "tags": ["pets"]}}}
}"#;

const ORDERS: &str = r#"{
    "info": {"title": "Orders", "version": "1.0"},
    "paths": {"/orders/{id}": {"post": {"operationId": "createOrder"}}},
    "components": {"schemas": {"Order": {"properties": {"status": {"type": "string"}}}}}
}"#;

fn new_service() -> SignatureService {
    let config = RulesetConfig::default();
    let store = SignatureStore::open_in_memory().expect("open in-memory store");
    SignatureService::new(&config, store)
}

#[test]
fn scenario_a_identical_specs_are_a_high_confidence_duplicate() {
    let service = new_service();
    service.index_api(PETSTORE, "A", "t").unwrap();

    let result = service
        .check_for_duplicates(PETSTORE, "B", "t", 0.95)
        .unwrap();

    assert!(result.is_duplicate);
    assert!(result.high_confidence);
    assert_eq!(result.conflict_reports.len(), 1);
    assert_eq!(result.conflict_reports[0].matched_api_uuid, "A");
    assert!((result.conflict_reports[0].similarity_score - 1.0).abs() < f64::EPSILON);
}

#[test]
fn scenario_b_boilerplate_only_differences_still_match() {
    let service = new_service();
    let spec_with_server_a = PETSTORE.replacen(
        "\"paths\"",
        "\"servers\": [{\"url\": \"https://a.example\"}], \"paths\"",
        1,
    );
    let spec_with_server_b = PETSTORE.replacen(
        "\"paths\"",
        "\"servers\": [{\"url\": \"https://b.example\"}], \"paths\"",
        1,
    );

    service.index_api(&spec_with_server_a, "A", "t").unwrap();
    let result = service
        .check_for_duplicates(&spec_with_server_b, "B", "t", 0.95)
        .unwrap();

    assert!(result.is_duplicate);
    assert!((result.conflict_reports[0].similarity_score - 1.0).abs() < f64::EPSILON);
}

#[test]
fn scenario_c_unrelated_apis_are_not_flagged() {
    let service = new_service();
    service.index_api(PETSTORE, "A", "t").unwrap();

    let result = service
        .check_for_duplicates(ORDERS, "B", "t", 0.5)
        .unwrap();

    assert!(!result.is_duplicate);
    assert!(result.conflict_reports.is_empty());
}

#[test]
fn scenario_d_self_is_excluded_even_on_a_perfect_match() {
    let service = new_service();
    service.index_api(PETSTORE, "X", "t").unwrap();

    let result = service
        .check_for_duplicates(PETSTORE, "X", "t", 0.95)
        .unwrap();

    assert!(!result.is_duplicate);
}

#[test]
fn scenario_e_tenants_are_isolated() {
    let service = new_service();
    service.index_api(PETSTORE, "X", "t1").unwrap();

    let result = service
        .check_for_duplicates(PETSTORE, "Y", "t2", 0.95)
        .unwrap();

    assert!(!result.is_duplicate);
}

#[test]
fn scenario_f_hydration_restores_index_and_self_matches_appear() {
    let config = RulesetConfig::default();
    let store = SignatureStore::open_in_memory().unwrap();
    let priming_service = SignatureService::new(&config, store);

    priming_service.index_api(PETSTORE, "A", "t").unwrap();
    priming_service.index_api(ORDERS, "B", "t").unwrap();
    priming_service.index_api(PETSTORE, "C", "t").unwrap();

    // Simulate a process restart: copy the primed store's rows into a
    // fresh store and hand that to a brand-new service.
    let fresh_store = SignatureStore::open_in_memory().unwrap();
    for record in priming_service.store().get_all().unwrap() {
        fresh_store
            .insert(&record.tenant, &record.api_id, &record.signature)
            .unwrap();
    }
    let fresh_service = SignatureService::new(&config, fresh_store);
    let hydrated = fresh_service.initialize().unwrap();

    assert_eq!(hydrated, 3);
    assert_eq!(fresh_service.get_index_size(), 3);

    // Querying with a stored signature returns that signature's own id
    // (no filtering id supplied, so the self-match still appears).
    let petstore_sig = fresh_service
        .generate_signature(PETSTORE, "scratch", "t")
        .unwrap();
    let candidates = fresh_service
        .index()
        .find_candidates(
            "t",
            &gatekeeper::Signature::from_cells(petstore_sig.signature_array.clone()),
        )
        .unwrap();
    assert!(candidates.contains("A") || candidates.contains("C"));
}
