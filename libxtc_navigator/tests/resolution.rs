mod common;

use std::sync::Arc;

use common::{entry, evr_config, open, partition, run, src, PARTITION_NODE};
use libxtc_navigator::error::ResolveError;
use libxtc_navigator::graph::Group;
use libxtc_navigator::record::{AliasConfig, Record, RecordSnapshot, SrcAlias};
use libxtc_navigator::registry::TypeRegistry;
use libxtc_navigator::resolver::{ConfigResolver, ResolveOptions};

fn resolver() -> ConfigResolver {
    ConfigResolver::new(Arc::new(TypeRegistry::new()), ResolveOptions::default())
}

#[test]
fn partition_without_aliases_synthesizes_them() {
    let snapshot = RecordSnapshot::from_entries(&[partition(&[
        ("BldInfo(EBeam)", 0),
        ("DetInfo(XppGon.0:Cspad.0)", 1),
    ])]);
    let graph = resolver().resolve(&snapshot).unwrap();

    assert_eq!(graph.alias_of(&src("BldInfo(EBeam)")), Some("EBeam"));
    assert_eq!(
        graph.alias_of(&src("DetInfo(XppGon.0:Cspad.0)")),
        Some("XppGon_0_Cspad_0")
    );
    assert_eq!(
        graph.group_of(&src("DetInfo(XppGon.0:Cspad.0)")),
        Some(Group::Readout(1))
    );
    assert!(graph
        .readout_groups()
        .values()
        .all(|group| group.event_codes.is_empty()));
}

#[test]
fn first_declared_event_code_wins() {
    let snapshot = RecordSnapshot::from_entries(&[
        partition(&[("DetInfo(XppEndstation.0:Opal1000.1)", 1)]),
        evr_config(&[(40, 1), (140, 1)]),
    ]);
    let graph = resolver().resolve(&snapshot).unwrap();
    let info = graph
        .source(&src("DetInfo(XppEndstation.0:Opal1000.1)"))
        .unwrap();
    assert_eq!(info.event_code, Some(40));
    assert_eq!(
        graph.readout_groups().get(&Group::Readout(1)).map(|g| g.event_codes.clone()),
        Some(vec![40, 140])
    );
}

#[test]
fn no_partition_gives_degraded_graph() {
    let snapshot = RecordSnapshot::from_entries(&[
        entry(
            "Alias.ConfigV1",
            PARTITION_NODE,
            Record::Alias(AliasConfig {
                src_alias: vec![SrcAlias {
                    alias_name: String::from("cspad"),
                    src: src("DetInfo(XppGon.0:Cspad.0)"),
                }],
            }),
        ),
        evr_config(&[(40, 1)]),
        entry(
            "CsPad.ConfigV5",
            "DetInfo(XppGon.0:Cspad.0)",
            Record::Detector {
                payload: serde_yaml::Value::Null,
            },
        ),
        entry(
            "Bld.BldDataEBeamV7",
            "BldInfo(EBeam)",
            Record::Detector {
                payload: serde_yaml::Value::Null,
            },
        ),
    ]);
    let graph = resolver().resolve(&snapshot).unwrap();
    assert!(graph.is_degraded());
    // The ProcInfo alias node and the EVR placeholder are not data sources
    assert_eq!(graph.sources().count(), 2);
    for info in graph.sources() {
        assert_eq!(info.group, Group::Background);
        assert!(!info.alias.is_empty());
    }
}

#[test]
fn two_partitions_are_fatal() {
    let mut second = partition(&[("BldInfo(EBeam)", 0)]);
    second.source = src("ProcInfo(172.21.22.6, pid=77)");
    let snapshot = RecordSnapshot::from_entries(&[partition(&[("BldInfo(EBeam)", 0)]), second]);
    assert!(matches!(
        resolver().resolve(&snapshot),
        Err(ResolveError::ConfigurationMissing(2))
    ));
}

#[test]
fn step_configuration_updates_graph() {
    // The second step adds an event code table; streaming cursors pick it up at the
    // step boundary
    let runs = vec![run(
        54,
        vec![partition(&[("DetInfo(XppGon.0:Cspad.0)", 1)])],
        &[1, 1],
        |step| {
            if step == 1 {
                vec![evr_config(&[(41, 1)])]
            } else {
                Vec::new()
            }
        },
    )];
    let mut ds = open(runs, "exp=xpptut15:run=54:smd");
    let cspad = src("DetInfo(XppGon.0:Cspad.0)");

    let first = ds.advance().unwrap();
    assert_eq!(first.graph().source(&cspad).and_then(|i| i.event_code), None);
    let second = ds.advance().unwrap();
    assert_eq!(second.graph().source(&cspad).and_then(|i| i.event_code), Some(41));
    // Handles keep the graph they were read with
    assert_eq!(first.graph().source(&cspad).and_then(|i| i.event_code), None);
}
