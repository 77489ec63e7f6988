//! Record store tests through the public `RecordStore`/`HandleCache`
//! surface, including the variation-module dispatch path.

use std::fs;

use snmpsim::context::{EvalContext, RequestMeta};
use snmpsim::oid::Oid;
use snmpsim::record::{EvalOutcome, HandleCache, RecordStore, StoreLookup};
use snmpsim::value::SnmpValue;
use snmpsim::variation::builtin::NumericModule;
use snmpsim::variation::VariationHost;

fn open_store(dir: &tempfile::TempDir, contents: &str) -> RecordStore {
    let text_path = dir.path().join("public.snmprec");
    fs::write(&text_path, contents).unwrap();
    let index_path = dir.path().join("public.snmprec.index");
    RecordStore::open(&text_path, &index_path, "public", true, false).unwrap()
}

#[test]
fn rebuilds_index_when_forced() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir, "1.3.6.1.2.1.1.1.0|4|Agent One\n1.3.6.1.2.1.1.5.0|4|host\n");
    assert_eq!(store.record_count(), 2);
}

#[test]
fn nearest_greater_lookup_finds_next_oid() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir, "1.3.6.1.2.1.1.1.0|4|Agent One\n1.3.6.1.2.1.1.5.0|4|host\n");

    let oid: Oid = "1.3.6.1.2.1.1.3.0".parse().unwrap();
    match store.lookup(&oid) {
        StoreLookup::NearestGreater(found, _) => {
            assert_eq!(found.canonical(), "1.3.6.1.2.1.1.5.0");
        }
        _ => panic!("expected a nearest-greater match"),
    }
}

#[test]
fn variation_module_drives_value_through_the_store() {
    let dir = tempfile::tempdir().unwrap();
    let store = open_store(&dir, "1.3.6.1.4.1.8072.1.1|2:numeric,0,100,10|5\n");

    let mut cache = HandleCache::new(4);
    let mut host = VariationHost::new();
    host.register("numeric", Box::new(NumericModule::new()), "").unwrap();

    let oid: Oid = "1.3.6.1.4.1.8072.1.1".parse().unwrap();
    let entry = match store.lookup(&oid) {
        StoreLookup::Exact(_, entry) => entry,
        _ => panic!("expected exact match"),
    };

    let mut ctx = EvalContext {
        meta: RequestMeta::default(),
        orig_oid: oid.clone(),
        orig_value: SnmpValue::Null,
        data_file: String::new(),
        subtree_flag: false,
        exact_match: true,
        error_status: SnmpValue::NoSuchInstance,
        vars_total: 1,
        vars_remaining: 0,
        oid_only: false,
        extension: Default::default(),
    };

    let first = store.read_and_evaluate(&entry, &mut cache, &mut ctx, &mut host).unwrap();
    let second = store.read_and_evaluate(&entry, &mut cache, &mut ctx, &mut host).unwrap();

    match (first, second) {
        (EvalOutcome::Value(_, SnmpValue::Integer(a)), EvalOutcome::Value(_, SnmpValue::Integer(b))) => {
            assert_eq!(a, 5);
            assert_eq!(b, 15);
        }
        _ => panic!("expected the numeric variation to count up across calls"),
    }
}
