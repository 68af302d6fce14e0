use std::collections::HashSet;
use std::path::{Path, PathBuf};

use tm_core::ElementClass;
use tm_graph::{ComponentClass, DatastoreType, Machine, ThreatKind, Tracer};
use tm_project::{ProjectError, from_yaml_str, load, load_yaml};

fn models_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("../../models")
}

#[test]
fn hotel_booking_loads() {
    let loaded = load_yaml(&models_dir().join("hotel_booking.yaml"))
        .unwrap_or_else(|e| panic!("Failed to load hotel_booking.yaml: {}", e));
    let tm = &loaded.model;

    assert_eq!(tm.name(), "Hotel Booking TM");
    assert_eq!(tm.assumptions().len(), 2);
    assert_eq!(tm.actors().count(), 3);
    assert_eq!(tm.assets().count(), 15);
    assert_eq!(tm.boundaries().count(), 2);
    assert_eq!(tm.flows().count(), 41);
    assert_eq!(loaded.limits.max_paths, Some(10_000));
    tm.validate().unwrap();

    let subnet = tm.find(ElementClass::Boundary, "Private Subnet").unwrap();
    let cloud = tm.find(ElementClass::Boundary, "AWS Cloud").unwrap();
    assert_eq!(tm.get(subnet).unwrap().parent(), Some(cloud));
    assert_eq!(tm.get(subnet).unwrap().children().len(), 5);

    let redis = tm.find(ElementClass::Component, "Redis Cache Server").unwrap();
    let redis = tm.get(redis).unwrap().as_component().unwrap();
    assert_eq!(
        redis.class(),
        &ComponentClass::Datastore(DatastoreType::Other(
            "https://redis.io/docs/latest/".to_string()
        ))
    );

    let gateway = tm.find(ElementClass::Component, "Amazon API Gateway").unwrap();
    let gateway = tm.get(gateway).unwrap().as_component().unwrap();
    assert_eq!(gateway.machine, Machine::Serverless);
    assert!(gateway.open_ports.contains(&443));

    let payment = tm
        .find(ElementClass::Flow, "Payment Service to Stripe Payment Gateway")
        .unwrap();
    assert_eq!(tm.describe_data("Card Details"), vec![payment]);
    let element = tm.get(payment).unwrap();
    let flow = element.as_flow().unwrap();
    assert_eq!(flow.protocol(), Some("HTTPS"));
    assert_eq!(flow.port(), Some(443));
    assert_eq!(flow.authentication.as_deref(), Some("API key"));
    assert_eq!(element.attachments().unwrap().threats()[0].id, "CAPEC-94");

    let weaknesses: Vec<&str> = element
        .attachments()
        .unwrap()
        .threats_of(ThreatKind::Weakness)
        .map(|t| t.id.as_str())
        .collect();
    assert_eq!(weaknesses, ["CWE-295"]);

    let findings: Vec<_> = tm.findings_for(payment).collect();
    assert_eq!(findings.len(), 1);
    assert_eq!(findings[0].threats(), ["CAPEC-94", "CWE-295"]);
    assert_eq!(findings[0].assessment.residual_risk.as_deref(), Some("Low"));
}

#[test]
fn hotel_booking_vectors() {
    let loaded = load(&models_dir().join("hotel_booking.yaml")).unwrap();
    let tm = &loaded.model;
    let db = tm
        .find(ElementClass::Component, "PostgreSQL Database Server")
        .unwrap();

    let trace = Tracer::new(tm)
        .unwrap()
        .with_limits(loaded.limits)
        .find_related_attack_vectors(db)
        .unwrap();
    assert!(!trace.truncated);

    let reached: HashSet<_> = trace.reached().into_iter().collect();
    for name in ["Users", "System Admin", "Developer"] {
        let actor = tm.find(ElementClass::Actor, name).unwrap();
        assert!(reached.contains(&actor), "{} should reach the database", name);
    }
    let subnet = tm.find(ElementClass::Boundary, "Private Subnet").unwrap();
    assert!(reached.contains(&subnet));
}

#[test]
fn unknown_flow_endpoint_fails() {
    let yaml = r#"
version: 1
name: Broken
components:
  - name: Web
flows:
  - name: Web to DB
    src: Web
    dst: DB
"#;
    match from_yaml_str(yaml) {
        Err(ProjectError::UnknownReference { name, .. }) => assert_eq!(name, "DB"),
        other => panic!("expected UnknownReference, got {:?}", other),
    }
}

#[test]
fn boundaries_cannot_terminate_flows() {
    let yaml = r#"
version: 1
name: Broken
boundaries:
  - name: Zone
components:
  - name: Web
flows:
  - name: Web to Zone
    src: Web
    dst: Zone
"#;
    assert!(matches!(
        from_yaml_str(yaml),
        Err(ProjectError::UnknownReference { .. })
    ));
}

#[test]
fn future_version_is_rejected() {
    assert!(matches!(
        from_yaml_str("version: 7\nname: Future\n"),
        Err(ProjectError::UnsupportedVersion { version: 7 })
    ));
}

#[test]
fn duplicate_names_are_rejected() {
    let yaml = "version: 1\nname: Dup\ncomponents:\n  - name: A\n  - name: A\n";
    assert!(matches!(
        from_yaml_str(yaml),
        Err(ProjectError::Validation(_))
    ));
}

#[test]
fn work_flows_carry_no_port() {
    let yaml = r#"
version: 1
name: Work
components:
  - name: A
  - name: B
flows:
  - name: A to B
    src: A
    dst: B
    kind: work
    port: 22
"#;
    assert!(matches!(
        from_yaml_str(yaml),
        Err(ProjectError::Validation(_))
    ));
}

#[test]
fn containment_cycle_is_a_model_error() {
    let yaml = r#"
version: 1
name: Cycle
boundaries:
  - name: Outer
    parent: Inner
  - name: Inner
    parent: Outer
"#;
    assert!(matches!(
        from_yaml_str(yaml),
        Err(ProjectError::Model(tm_core::TmError::InvalidRelationship { .. }))
    ));
}

#[test]
fn malformed_yaml_and_missing_files() {
    assert!(matches!(
        from_yaml_str("version: [1\n"),
        Err(ProjectError::Yaml(_))
    ));
    assert!(matches!(
        load_yaml(&models_dir().join("does_not_exist.yaml")),
        Err(ProjectError::Io(_))
    ));
}

#[test]
fn trace_starts_resolve_by_name() {
    let loaded = load(&models_dir().join("hotel_booking.yaml")).unwrap();
    let tm = &loaded.model;
    let users = tm_project::find_endpoint(tm, "Users").unwrap();
    assert_eq!(tm.get(users).unwrap().class(), ElementClass::Actor);
    assert!(matches!(
        tm_project::find_endpoint(tm, "AWS Cloud"),
        Err(ProjectError::UnknownReference { .. })
    ));
}
