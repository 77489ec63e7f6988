//! End-to-end workflow tests: the full path a real request takes, from
//! on-disk record files and CLI-style configuration through wire encoding,
//! agent selection, and back to a wire-encoded response.

use std::fs;

use snmpsim::config::load_settings;
use snmpsim::engine::{decode_message, encode_message, Pdu, PduType, SnmpMessage};
use snmpsim::pipeline::Registry;
use snmpsim::record::discover_stores;
use snmpsim::selector::{ProbeInput, TransportKind};
use snmpsim::value::{SnmpValue, VarBind};

fn argv(extra: &[&str]) -> Vec<String> {
    std::iter::once("snmpsim-responder".to_string())
        .chain(extra.iter().map(|s| s.to_string()))
        .collect()
}

fn probe() -> ProbeInput {
    ProbeInput {
        transport_domain: vec![1, 3, 6, 1, 6, 1, 1, 0],
        transport_kind: TransportKind::UdpV4,
        transport_address: "192.0.2.1".to_string(),
        context_engine_id: String::new(),
        context_name: String::new(),
    }
}

/// Simulate the daemon's startup sequence: load config, discover record
/// files under a data directory, register every agent, then answer a
/// request, exactly as `snmpsim-responder`'s `main` does.
#[test]
fn discovery_to_answered_request_workflow() {
    let data_dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(data_dir.path().join("community")).unwrap();
    fs::write(
        data_dir.path().join("community/public.snmprec"),
        "1.3.6.1.2.1.1.1.0|4|Simulated Router\n1.3.6.1.2.1.1.5.0|4|router1\n",
    )
    .unwrap();

    let settings = load_settings(argv(&["--data-dir", data_dir.path().to_str().unwrap()])).unwrap();
    assert_eq!(settings.data_dir.len(), 1);

    let discovered = discover_stores(
        &settings.data_dir,
        settings.cache_dir.as_deref(),
        settings.force_index_rebuild,
        settings.validate_data,
    );
    // The one real data file, plus the synthetic `_index` instrumentation store.
    assert_eq!(discovered.len(), 2);

    let mut registry = Registry::new(settings.cache_capacity, settings.max_varbinds);
    for (keys, store) in discovered {
        let mut keys = keys.into_iter();
        if let Some(first) = keys.next() {
            for extra in keys {
                registry.register(extra, store.clone());
            }
            registry.register(first, store);
        }
    }
    assert_eq!(registry.len(), 2);

    let request = SnmpMessage::V2c {
        community: "community/public".to_string(),
        pdu: Pdu {
            pdu_type: PduType::GetRequest,
            request_id: 1,
            field2: 0,
            field3: 0,
            var_binds: vec![VarBind::new(
                "1.3.6.1.2.1.1.1.0".parse().unwrap(),
                SnmpValue::Null,
            )],
        },
    };
    let response = registry.handle(request, probe()).unwrap();
    match response {
        SnmpMessage::V2c { pdu, .. } => {
            assert_eq!(
                pdu.var_binds[0].value,
                SnmpValue::OctetString(b"Simulated Router".to_vec())
            );
        }
        _ => panic!("expected v2c response"),
    }
}

/// A GETNEXT walk across a whole table, one step at a time, the way an
/// SNMP walk tool issues requests.
#[test]
fn getnext_walk_visits_every_record_then_ends_of_mib() {
    let data_dir = tempfile::tempdir().unwrap();
    fs::write(
        data_dir.path().join("public.snmprec"),
        "1.3.6.1.2.1.1.1.0|4|Router\n\
         1.3.6.1.2.1.1.3.0|67|42\n\
         1.3.6.1.2.1.1.5.0|4|router1\n",
    )
    .unwrap();

    let settings = load_settings(argv(&["--data-dir", data_dir.path().to_str().unwrap()])).unwrap();
    let discovered = discover_stores(&settings.data_dir, None, false, false);
    let mut registry = Registry::new(8, 64);
    for (keys, store) in discovered {
        registry.register(keys[0].clone(), store);
    }

    let mut current: snmpsim::oid::Oid = "1.3.6.1.2.1.1.1.0".parse().unwrap();
    let mut visited = Vec::new();
    for _ in 0..4 {
        let request = SnmpMessage::V2c {
            community: "public".to_string(),
            pdu: Pdu {
                pdu_type: PduType::GetNextRequest,
                request_id: 1,
                field2: 0,
                field3: 0,
                var_binds: vec![VarBind::new(current.clone(), SnmpValue::Null)],
            },
        };
        let response = registry.handle(request, probe()).unwrap();
        let vb = match response {
            SnmpMessage::V2c { pdu, .. } => pdu.var_binds.into_iter().next().unwrap(),
            _ => panic!("expected v2c response"),
        };
        if vb.value == SnmpValue::EndOfMibView {
            visited.push("endOfMib".to_string());
            break;
        }
        visited.push(vb.oid.canonical());
        current = vb.oid;
    }

    assert_eq!(
        visited,
        vec![
            "1.3.6.1.2.1.1.3.0",
            "1.3.6.1.2.1.1.5.0",
            "endOfMib",
        ]
    );
}

/// A v1 client asks for a counter64 value that only exists in v2c: the
/// whole response must revert to the original request with `genErr`, not
/// just drop the one offending varbind, round-tripped through the real
/// wire codec.
#[test]
fn v1_client_gets_gen_err_for_counter64_over_the_wire() {
    let data_dir = tempfile::tempdir().unwrap();
    fs::write(
        data_dir.path().join("public.snmprec"),
        "1.3.6.1.2.1.31.1.1.1.10.1|70|9999999999999\n",
    )
    .unwrap();

    let settings = load_settings(argv(&["--data-dir", data_dir.path().to_str().unwrap()])).unwrap();
    let discovered = discover_stores(&settings.data_dir, None, false, false);
    let mut registry = Registry::new(8, 64);
    for (keys, store) in discovered {
        registry.register(keys[0].clone(), store);
    }

    let request = SnmpMessage::V1 {
        community: "public".to_string(),
        pdu: Pdu {
            pdu_type: PduType::GetRequest,
            request_id: 55,
            field2: 0,
            field3: 0,
            var_binds: vec![VarBind::new(
                "1.3.6.1.2.1.31.1.1.1.10.1".parse().unwrap(),
                SnmpValue::Null,
            )],
        },
    };
    let response = registry.handle(request, probe()).unwrap();

    let mut wire = bytes::BytesMut::new();
    encode_message(&response, &mut wire);
    let decoded = decode_message(&wire).unwrap();

    match decoded {
        SnmpMessage::V1 { pdu, .. } => {
            assert_eq!(pdu.error_status(), 5, "genErr");
            assert_eq!(pdu.error_index(), 1);
            assert_eq!(pdu.var_binds[0].value, SnmpValue::Null);
            assert_eq!(pdu.var_binds[0].oid.canonical(), "1.3.6.1.2.1.31.1.1.1.10.1");
        }
        _ => panic!("expected v1 response"),
    }
}
