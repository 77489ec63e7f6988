//! Registry-level routing tests: multiple agents, GETBULK expansion, and
//! v3 context-name selection, all driven through decoded `SnmpMessage`s
//! rather than individual lookup/selector calls.

use std::fs;

use snmpsim::engine::{Pdu, PduType, SnmpMessage, UsmParameters, V3Header};
use snmpsim::pipeline::Registry;
use snmpsim::record::RecordStore;
use snmpsim::selector::{ProbeInput, TransportKind};
use snmpsim::value::{SnmpValue, VarBind};

fn probe(context_name: &str) -> ProbeInput {
    ProbeInput {
        transport_domain: vec![1, 3, 6, 1, 6, 1, 1, 0],
        transport_kind: TransportKind::UdpV4,
        transport_address: "127.0.0.1".to_string(),
        context_engine_id: String::new(),
        context_name: context_name.to_string(),
    }
}

fn registered(dir: &tempfile::TempDir, agent: &str, contents: &str, registry: &mut Registry) {
    let text_path = dir.path().join(format!("{agent}.snmprec"));
    fs::write(&text_path, contents).unwrap();
    let index_path = dir.path().join(format!("{agent}.snmprec.index"));
    let store = RecordStore::open(&text_path, &index_path, agent, true, false).unwrap();
    registry.register(agent, store);
}

#[test]
fn two_communities_answer_from_their_own_data_file() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new(8, 64);
    registered(&dir, "public", "1.3.6.1.2.1.1.1.0|4|Agent Public\n", &mut registry);
    registered(&dir, "private", "1.3.6.1.2.1.1.1.0|4|Agent Private\n", &mut registry);

    for (community, expected) in [("public", "Agent Public"), ("private", "Agent Private")] {
        let message = SnmpMessage::V2c {
            community: community.to_string(),
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
        let response = registry.handle(message, probe(community)).unwrap();
        match response {
            SnmpMessage::V2c { pdu, .. } => {
                assert_eq!(
                    pdu.var_binds[0].value,
                    SnmpValue::OctetString(expected.as_bytes().to_vec())
                );
            }
            _ => panic!("expected a v2c response"),
        }
    }
}

#[test]
fn getbulk_walks_multiple_repeaters_across_a_real_agent() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new(8, 64);
    registered(
        &dir,
        "public",
        "1.3.6.1.2.1.2.2.1.1.1|2|1\n\
         1.3.6.1.2.1.2.2.1.1.2|2|2\n\
         1.3.6.1.2.1.2.2.1.2.1|4|eth0\n\
         1.3.6.1.2.1.2.2.1.2.2|4|eth1\n",
        &mut registry,
    );

    let message = SnmpMessage::V2c {
        community: "public".to_string(),
        pdu: Pdu {
            pdu_type: PduType::GetBulkRequest,
            request_id: 7,
            field2: 0,
            field3: 2,
            var_binds: vec![
                VarBind::new("1.3.6.1.2.1.2.2.1.1".parse().unwrap(), SnmpValue::Null),
                VarBind::new("1.3.6.1.2.1.2.2.1.2".parse().unwrap(), SnmpValue::Null),
            ],
        },
    };

    let response = registry.handle(message, probe("public")).unwrap();
    match response {
        SnmpMessage::V2c { pdu, .. } => {
            // 2 repeaters x 2 repetitions = 4 varbinds.
            assert_eq!(pdu.var_binds.len(), 4);
            assert_eq!(pdu.var_binds[0].value, SnmpValue::Integer(1));
            assert_eq!(pdu.var_binds[1].value, SnmpValue::OctetString(b"eth0".to_vec()));
            assert_eq!(pdu.var_binds[2].value, SnmpValue::Integer(2));
            assert_eq!(pdu.var_binds[3].value, SnmpValue::OctetString(b"eth1".to_vec()));
        }
        _ => panic!("expected a v2c response"),
    }
}

#[test]
fn v3_request_selects_agent_by_context_name() {
    let dir = tempfile::tempdir().unwrap();
    let mut registry = Registry::new(8, 64);
    registered(&dir, "lab-switch", "1.3.6.1.2.1.1.1.0|4|Lab Switch\n", &mut registry);

    let header = V3Header {
        msg_id: 1,
        max_size: 1472,
        flags: 0,
        security_model: 3,
        usm: UsmParameters {
            user_name: "simulator".to_string(),
            ..Default::default()
        },
        context_engine_id: Vec::new(),
        context_name: "lab-switch".to_string(),
    };
    let message = SnmpMessage::V3 {
        header,
        pdu: Pdu {
            pdu_type: PduType::GetRequest,
            request_id: 3,
            field2: 0,
            field3: 0,
            var_binds: vec![VarBind::new(
                "1.3.6.1.2.1.1.1.0".parse().unwrap(),
                SnmpValue::Null,
            )],
        },
    };

    let response = registry.handle(message, probe("lab-switch")).unwrap();
    match response {
        SnmpMessage::V3 { pdu, .. } => {
            assert_eq!(pdu.var_binds[0].value, SnmpValue::OctetString(b"Lab Switch".to_vec()));
        }
        _ => panic!("expected a v3 response"),
    }
}

#[test]
fn overlong_community_name_resolves_via_its_md5_digest() {
    let dir = tempfile::tempdir().unwrap();
    let long_community = "c".repeat(48);
    let hashed = snmpsim::util::hash_if_long(&long_community);

    let mut registry = Registry::new(8, 64);
    registered(&dir, &hashed, "1.3.6.1.2.1.1.1.0|4|Hashed Agent\n", &mut registry);

    let message = SnmpMessage::V2c {
        community: long_community.clone(),
        pdu: Pdu {
            pdu_type: PduType::GetRequest,
            request_id: 4,
            field2: 0,
            field3: 0,
            var_binds: vec![VarBind::new(
                "1.3.6.1.2.1.1.1.0".parse().unwrap(),
                SnmpValue::Null,
            )],
        },
    };
    let response = registry.handle(message, probe(&long_community)).unwrap();
    match response {
        SnmpMessage::V2c { pdu, .. } => {
            assert_eq!(pdu.var_binds[0].value, SnmpValue::OctetString(b"Hashed Agent".to_vec()));
        }
        _ => panic!("expected a v2c response"),
    }
}
