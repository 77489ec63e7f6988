//! Binds a real Unix datagram endpoint through `Dispatcher::bind` and
//! drives its readiness loop on a background thread, the way the
//! `snmpsim-responder` binary does, then talks to it as a client would.

use std::fs;
use std::os::unix::net::UnixDatagram;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use snmpsim::config::Settings;
use snmpsim::engine::{decode_message, encode_message, Pdu, PduType, SnmpMessage};
use snmpsim::pipeline::Registry;
use snmpsim::record::RecordStore;
use snmpsim::transport::{domain_oid_for, Dispatcher};
use snmpsim::selector::TransportKind;
use snmpsim::value::{SnmpValue, VarBind};

#[test]
fn domain_oids_follow_rfc3419_bases() {
    assert_eq!(domain_oid_for(TransportKind::UdpV4, 0).canonical(), "1.3.6.1.6.1.1.0");
    assert_eq!(domain_oid_for(TransportKind::UdpV6, 0).canonical(), "1.3.6.1.6.1.2.0");
    assert_eq!(domain_oid_for(TransportKind::Unix, 5).canonical(), "1.3.6.1.6.1.3.5");
}

#[test]
fn unix_socket_round_trip_through_a_bound_dispatcher() {
    let dir = tempfile::tempdir().unwrap();
    let text_path = dir.path().join("public.snmprec");
    fs::write(&text_path, "1.3.6.1.2.1.1.1.0|4|Agent One\n").unwrap();
    let index_path = dir.path().join("public.snmprec.index");
    let store = RecordStore::open(&text_path, &index_path, "public", true, false).unwrap();

    let mut registry = Registry::new(4, 64);
    registry.register("public", store);

    let server_path = dir.path().join("agent.sock");
    let settings = Settings {
        agent_unix_endpoint: vec![server_path.to_string_lossy().to_string()],
        ..Settings::default()
    };

    let mut dispatcher = Dispatcher::new(registry);
    dispatcher.bind(&settings).unwrap();

    let running = Arc::new(AtomicBool::new(true));
    let running_for_thread = running.clone();
    let handle = thread::spawn(move || dispatcher.run(&running_for_thread));

    let client_path = dir.path().join("client.sock");
    let client = UnixDatagram::bind(&client_path).unwrap();
    client.set_read_timeout(Some(Duration::from_secs(2))).unwrap();
    client.connect(&server_path).unwrap();

    let message = SnmpMessage::V2c {
        community: "public".to_string(),
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
    let mut out = bytes::BytesMut::new();
    encode_message(&message, &mut out);
    client.send(&out).unwrap();

    let mut buf = [0u8; 4096];
    let n = client.recv(&mut buf).expect("dispatcher should answer within the timeout");

    running.store(false, Ordering::Relaxed);
    handle.join().unwrap();

    let decoded = decode_message(&buf[..n]).unwrap();
    match decoded {
        SnmpMessage::V2c { pdu, .. } => {
            assert_eq!(pdu.var_binds[0].value, SnmpValue::OctetString(b"Agent One".to_vec()));
        }
        _ => panic!("expected a v2c response"),
    }
}
