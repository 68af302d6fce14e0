//! Integration tests for tm-graph.

use std::collections::HashSet;

use tm_graph::{
    Actor, Boundary, Component, ContainmentPolicy, DatastoreType, ElementId, Flow, Machine,
    PathStep, ThreatModel, TmError, TraceLimits, Tracer,
};

fn flow_names(tm: &ThreatModel, steps: &[PathStep]) -> Vec<String> {
    steps
        .iter()
        .filter(|s| s.is_flow())
        .map(|s| tm.get(s.element()).unwrap().name().to_string())
        .collect()
}

#[test]
fn load_balancer_scenario() {
    // LB -> Booking -> DB
    let mut tm = ThreatModel::new("Scenario");
    let lb = tm
        .add_component("LB", Component::process().with_machine(Machine::Serverless))
        .unwrap();
    let booking = tm.add_component("Booking", Component::process()).unwrap();
    let db = tm
        .add_component("DB", Component::datastore(DatastoreType::Sql))
        .unwrap();
    tm.add_flow("LB to Booking", Flow::data(lb, booking)).unwrap();
    tm.add_flow("Booking to DB", Flow::data(booking, db)).unwrap();

    let paths = tm.simulate_attack(lb).unwrap().paths;
    let named: Vec<_> = paths.iter().map(|p| flow_names(&tm, p.steps())).collect();
    assert!(named.contains(&vec!["LB to Booking".to_string()]));
    assert!(named.contains(&vec![
        "LB to Booking".to_string(),
        "Booking to DB".to_string()
    ]));

    let back = tm.find_related_attack_vectors(db).unwrap().paths;
    let named: Vec<_> = back.iter().map(|p| flow_names(&tm, p.steps())).collect();
    assert_eq!(
        named,
        vec![
            vec!["Booking to DB".to_string()],
            vec!["LB to Booking".to_string(), "Booking to DB".to_string()],
        ]
    );
    assert_eq!(back[1].describe(&tm), "LB to Booking -> Booking to DB");
}

#[test]
fn backward_and_forward_are_dual() {
    let mut tm = ThreatModel::new("Dual");
    let a = tm.add_component("A", Component::generic()).unwrap();
    let b = tm.add_component("B", Component::generic()).unwrap();
    let f = tm.add_flow("A to B", Flow::data(a, b)).unwrap();

    let back = tm.find_related_attack_vectors(b).unwrap().paths;
    let fwd = tm.simulate_attack(a).unwrap().paths;
    assert!(back.iter().any(|p| p.steps() == [PathStep::Flow(f)]));
    assert!(fwd.iter().any(|p| p.steps() == [PathStep::Flow(f)]));
}

#[test]
fn parent_pivot_without_flows() {
    let mut tm = ThreatModel::new("Pivot");
    let zone = tm.add_boundary("DMZ", Boundary::new()).unwrap();
    let host = tm.add_component("Host", Component::generic()).unwrap();
    let web = tm.add_component("Web", Component::process()).unwrap();
    tm.set_parent(host, zone).unwrap();
    tm.set_parent(web, host).unwrap();

    let paths = tm.simulate_attack(host).unwrap().paths;
    assert_eq!(paths.len(), 1);
    assert_eq!(paths[0].steps(), &[PathStep::Child(web)]);

    // Backward climbs through the host into the boundary.
    let paths = tm.find_related_attack_vectors(web).unwrap().paths;
    let steps: Vec<_> = paths.iter().map(|p| p.steps().to_vec()).collect();
    assert_eq!(
        steps,
        vec![
            vec![PathStep::Parent(host)],
            vec![PathStep::Parent(zone), PathStep::Parent(host)],
        ]
    );
}

#[test]
fn isolated_element_has_no_paths() {
    let mut tm = ThreatModel::new("Empty");
    let x = tm.add_component("X", Component::generic()).unwrap();
    assert!(tm.simulate_attack(x).unwrap().paths.is_empty());
    assert!(tm.find_related_attack_vectors(x).unwrap().paths.is_empty());
}

#[test]
fn containment_policies() {
    for policy in [ContainmentPolicy::Nested, ContainmentPolicy::NoGrandparents] {
        let mut tm = ThreatModel::with_policy("Policy", policy);
        let outer = tm.add_boundary("Outer", Boundary::new()).unwrap();
        let inner = tm.add_boundary("Inner", Boundary::new()).unwrap();
        let app = tm.add_component("App", Component::process()).unwrap();
        tm.set_parent(app, inner).unwrap();

        let nested = tm.set_parent(inner, outer);
        match policy {
            ContainmentPolicy::Nested => {
                nested.unwrap();
                // Still no cycles.
                assert!(matches!(
                    tm.set_parent(outer, app),
                    Err(TmError::InvalidRelationship { .. })
                ));
            }
            ContainmentPolicy::NoGrandparents => {
                assert!(matches!(nested, Err(TmError::InvalidRelationship { .. })));
            }
        }
        tm.validate().unwrap();
    }
}

#[test]
fn names_resolve_per_class() {
    let mut tm = ThreatModel::new("Names");
    let c = tm.add_component("Billing", Component::process()).unwrap();
    let b = tm.add_boundary("Billing", Boundary::new()).unwrap();
    assert_ne!(c, b);
    assert_eq!(tm.lookup("Billing"), vec![c, b]);
    assert!(matches!(
        tm.add_component("Billing", Component::generic()),
        Err(TmError::DuplicateName { .. })
    ));
}

#[test]
fn path_cap_truncates_large_fan_out() {
    let mut tm = ThreatModel::new("Fan");
    let root = tm.add_actor("Attacker", Actor::new()).unwrap();
    let mut layer = vec![root];
    for depth in 0..3 {
        let mut next = Vec::new();
        for (i, &src) in layer.iter().enumerate() {
            for j in 0..3 {
                let n = tm
                    .add_component(format!("N{depth}-{i}-{j}"), Component::generic())
                    .unwrap();
                tm.add_flow(format!("{src} to N{depth}-{i}-{j}"), Flow::data(src, n))
                    .unwrap();
                next.push(n);
            }
        }
        layer = next;
    }

    let full = Tracer::new(&tm).unwrap().simulate_attack(root).unwrap();
    assert_eq!(full.paths.len(), 3 + 9 + 27);
    assert!(!full.truncated);

    let capped = Tracer::new(&tm)
        .unwrap()
        .with_limits(TraceLimits::default().with_max_paths(10))
        .simulate_attack(root)
        .unwrap();
    assert_eq!(capped.paths.len(), 10);
    assert!(capped.truncated);
    assert_eq!(capped.paths[..], full.paths[..10]);
}

#[test]
fn default_cap_is_reported_by_model_entry_points() {
    // Complete DAG: every N_i flows to every N_j with i < j. From N0 that is
    // 2^17 - 1 acyclic paths, more than the default cap.
    let mut tm = ThreatModel::new("Dense");
    let nodes: Vec<ElementId> = (0..18)
        .map(|i| tm.add_component(format!("N{i}"), Component::generic()).unwrap())
        .collect();
    for (i, &src) in nodes.iter().enumerate() {
        for (j, &dst) in nodes.iter().enumerate().skip(i + 1) {
            tm.add_flow(format!("N{i} to N{j}"), Flow::data(src, dst)).unwrap();
        }
    }

    let forward = tm.simulate_attack(nodes[0]).unwrap();
    assert!(forward.truncated);
    assert_eq!(forward.paths.len(), TraceLimits::DEFAULT_MAX_PATHS);

    let backward = tm.find_related_attack_vectors(nodes[17]).unwrap();
    assert!(backward.truncated);
    assert_eq!(backward.paths.len(), TraceLimits::DEFAULT_MAX_PATHS);

    // A small target is still complete.
    let near = tm.find_related_attack_vectors(nodes[2]).unwrap();
    assert!(!near.truncated);
    assert_eq!(near.paths.len(), 3);
}

mod hotel_booking {
    use super::*;

    struct Hotel {
        tm: ThreatModel,
        ids: std::collections::HashMap<&'static str, ElementId>,
    }

    impl Hotel {
        fn id(&self, name: &str) -> ElementId {
            self.ids[name]
        }
    }

    fn build() -> Hotel {
        let mut tm = ThreatModel::new("Hotel Booking TM");
        tm.set_model_description("Hotel Booking Website Threat Model");
        let mut ids = std::collections::HashMap::new();

        for (name, kind) in [
            ("Users", "Individual"),
            ("System Admin", "Administrator"),
            ("Developer", "Organization"),
        ] {
            ids.insert(name, tm.add_actor(name, Actor::new().with_type(kind)).unwrap());
        }

        let components: [(&'static str, Component); 15] = [
            ("Main Load Balancer", Component::process().with_machine(Machine::Serverless)),
            ("Secondary Load Balancer", Component::process().with_machine(Machine::Serverless)),
            ("Booking Service", Component::process().with_machine(Machine::Container)),
            ("User Service", Component::process().with_machine(Machine::Container)),
            ("Payment Service", Component::process().with_machine(Machine::Container)),
            ("Search Service", Component::process().with_machine(Machine::Container)),
            ("Splunk Monitoring Service", Component::process().with_machine(Machine::Virtual)),
            ("Amazon API Gateway", Component::process().with_machine(Machine::Serverless)),
            ("PostgreSQL Database Server", Component::datastore(DatastoreType::Sql)),
            ("MongoDB Database", Component::datastore(DatastoreType::NoSql)),
            ("Redis Cache Server", Component::datastore(DatastoreType::Other("Redis".into()))),
            ("RabbitMQ Message Queue", Component::datastore(DatastoreType::Other("AMQP broker".into()))),
            ("Amazon Cloudfront CDN", Component::external_entity().with_machine(Machine::Serverless)),
            ("Stripe Payment Gateway", Component::external_entity().with_machine(Machine::Serverless)),
            ("SendGrid Email Service", Component::external_entity().with_machine(Machine::Serverless)),
        ];
        for (name, component) in components {
            ids.insert(name, tm.add_component(name, component).unwrap());
        }

        let services = ["Booking Service", "User Service", "Payment Service", "Search Service"];
        let mut flows: Vec<(&str, &str, &str, u16)> = vec![("Users", "Amazon API Gateway", "HTTPS", 443)];
        for s in services {
            flows.push(("Amazon API Gateway", s, "HTTP", 8080));
        }
        flows.extend([
            ("Booking Service", "PostgreSQL Database Server", "SQL", 5432),
            ("Booking Service", "MongoDB Database", "MongoDB", 27017),
            ("User Service", "PostgreSQL Database Server", "SQL", 5432),
            ("Payment Service", "PostgreSQL Database Server", "SQL", 5432),
            ("Search Service", "PostgreSQL Database Server", "SQL", 5432),
            ("User Service", "MongoDB Database", "MongoDB", 27017),
        ]);
        for s in services {
            flows.push((s, "Redis Cache Server", "Redis", 6379));
        }
        flows.push(("Payment Service", "Stripe Payment Gateway", "HTTPS", 443));
        flows.push(("User Service", "SendGrid Email Service", "SMTP", 587));
        for s in services {
            flows.push((s, "RabbitMQ Message Queue", "AMQP", 5672));
        }
        for s in services {
            flows.push((s, "Splunk Monitoring Service", "HTTPS", 8089));
        }
        flows.push(("System Admin", "Amazon API Gateway", "HTTPS", 443));
        flows.push(("Developer", "Amazon API Gateway", "HTTPS", 443));
        for lb in ["Main Load Balancer", "Secondary Load Balancer"] {
            flows.push(("Amazon API Gateway", lb, "HTTP", 80));
            for s in services {
                flows.push((lb, s, "HTTP", 8080));
            }
        }
        flows.extend([
            ("Users", "Amazon Cloudfront CDN", "HTTPS", 443),
            ("Amazon Cloudfront CDN", "Amazon API Gateway", "HTTPS", 443),
            ("Amazon API Gateway", "Amazon Cloudfront CDN", "HTTPS", 443),
            ("Amazon Cloudfront CDN", "Users", "HTTPS", 443),
        ]);

        for (src, dst, protocol, port) in flows {
            let flow = Flow::data(ids[src], ids[dst]).with_protocol(protocol, Some(port));
            tm.add_flow(format!("{src} to {dst}"), flow).unwrap();
        }

        Hotel { tm, ids }
    }

    #[test]
    fn model_is_consistent() {
        let hotel = build();
        hotel.tm.validate().unwrap();
        assert_eq!(hotel.tm.actors().count(), 3);
        assert_eq!(hotel.tm.assets().count(), 15);
        assert_eq!(hotel.tm.flows().count(), 41);
    }

    #[test]
    fn database_vectors_reach_every_actor() {
        let hotel = build();
        let db = hotel.id("PostgreSQL Database Server");
        let trace = Tracer::new(&hotel.tm)
            .unwrap()
            .find_related_attack_vectors(db)
            .unwrap();
        assert!(!trace.truncated);

        let reached: HashSet<_> = trace.reached().into_iter().collect();
        for who in ["Users", "System Admin", "Developer", "Main Load Balancer", "Amazon Cloudfront CDN"] {
            assert!(reached.contains(&hotel.id(who)), "{who} should reach the database");
        }
        assert!(!reached.contains(&hotel.id("Stripe Payment Gateway")));

        for path in &trace.paths {
            // Every path ends in the database.
            let last = path.steps().last().unwrap().element();
            let (_, last_flow) = hotel
                .tm
                .flows()
                .find(|(e, _)| e.id() == last)
                .unwrap();
            assert_eq!(last_flow.dst(), db);
        }
    }

    #[test]
    fn load_balancer_compromise_spreads_to_services() {
        let hotel = build();
        let lb = hotel.id("Main Load Balancer");
        let trace = Tracer::new(&hotel.tm).unwrap().simulate_attack(lb).unwrap();

        let reached: HashSet<_> = trace.reached().into_iter().collect();
        for what in [
            "Booking Service",
            "PostgreSQL Database Server",
            "Stripe Payment Gateway",
            "SendGrid Email Service",
        ] {
            assert!(reached.contains(&hotel.id(what)), "{what} should be exposed");
        }
        // Nothing flows from the services back to the edge.
        assert!(!reached.contains(&hotel.id("Amazon API Gateway")));
        assert!(!reached.contains(&hotel.id("Users")));
        assert_eq!(trace.paths.len(), 4 + 5 + 6 + 5 + 4);
    }
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn random_model(
        n: usize,
        edges: &[(usize, usize)],
        links: &[(usize, usize)],
    ) -> (ThreatModel, Vec<ElementId>) {
        let mut tm = ThreatModel::new("random");
        let ids: Vec<_> = (0..n)
            .map(|i| tm.add_component(format!("C{i}"), Component::generic()).unwrap())
            .collect();
        for (k, &(s, d)) in edges.iter().enumerate() {
            let (s, d) = (s % n, d % n);
            if s != d {
                tm.add_flow(format!("F{k}"), Flow::data(ids[s], ids[d])).unwrap();
            }
        }
        for &(c, p) in links {
            // Rejected links are fine; the model must stay consistent either way.
            let _ = tm.set_parent(ids[c % n], ids[p % n]);
        }
        (tm, ids)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn containment_stays_symmetric(
            n in 2usize..8,
            links in prop::collection::vec((0usize..8, 0usize..8), 0..16),
        ) {
            let (tm, ids) = random_model(n, &[], &links);
            prop_assert!(tm.validate().is_ok());
            for &id in &ids {
                let e = tm.get(id).unwrap();
                if let Some(p) = e.parent() {
                    prop_assert!(tm.get(p).unwrap().has_child(id));
                    prop_assert!(!tm.is_ancestor(id, p));
                }
                for &c in e.children() {
                    prop_assert_eq!(tm.get(c).unwrap().parent(), Some(id));
                }
            }
        }

        #[test]
        fn traces_terminate_without_loops(
            n in 2usize..6,
            edges in prop::collection::vec((0usize..6, 0usize..6), 0..10),
            links in prop::collection::vec((0usize..6, 0usize..6), 0..4),
            start in 0usize..6,
        ) {
            let (tm, ids) = random_model(n, &edges, &links);
            let origin = ids[start % n];
            let tracer = Tracer::new(&tm).unwrap();

            let back = tracer.find_related_attack_vectors(origin).unwrap();
            let fwd = tracer.simulate_attack(origin).unwrap();
            prop_assert!(!back.truncated && !fwd.truncated);

            let index = tm_graph::FlowIndex::from_model(&tm).unwrap();
            let edge_of = |flow: ElementId| *index.edges().iter().find(|e| e.flow == flow).unwrap();

            for path in back.paths.iter().chain(&fwd.paths) {
                let flows: Vec<_> = path.flows().collect();
                let unique: HashSet<_> = flows.iter().collect();
                prop_assert_eq!(unique.len(), flows.len());
                prop_assert!(path.len() <= tm.len());
            }
            for path in &back.paths {
                for f in path.flows() {
                    prop_assert_ne!(edge_of(f).src, origin);
                }
            }
            for path in &fwd.paths {
                for f in path.flows() {
                    prop_assert_ne!(edge_of(f).dst, origin);
                }
            }
        }
    }
}
