// Configuration resolution. A configuration snapshot is an unordered bag of keyed
// records; the DAQ spreads what we want to know about a source over several of them:
// the Partition record says who takes part and in which readout group, Alias records
// (one per recording node) give human names, EvrData configs carry event codes and
// pulse generators, and the EvrData IO config says which source is cabled to which
// EVR output. ConfigResolver pulls all of this together into one SourceGraph.
//
// Only the partition is essential. Without one the graph is built in a degraded form
// (every data source in group 0, no trigger wiring); with more than one nothing
// sensible can be built and resolution fails. Everything past the partition is
// best effort: a bad alias or a dangling channel is logged and skipped.
use std::collections::BTreeMap;
use std::sync::Arc;

use super::error::{AliasResolutionError, ResolveError, StoreError};
use super::graph::{Group, PartitionSummary, SourceGraph, SourceInfo, TriggerInfo};
use super::output_map::OutputKey;
use super::record::{Record, RecordKey, RecordSnapshot};
use super::registry::{RecordCategory, TypeRegistry};
use super::source::{sanitize_alias, Source};

/// Aliases for sources whose historical names do not follow their source string
pub const ALIAS_DEFAULTS: [(&str, &str); 3] = [
    ("BldInfo(FEE-SPEC0)", "FEE_Spec"),
    ("BldInfo(NH2-SB1-IPM-01)", "Nh2Sb1_Ipm1"),
    ("BldInfo(NH2-SB1-IPM-02)", "Nh2Sb1_Ipm2"),
];

#[derive(Debug, Clone, PartialEq)]
pub struct ResolveOptions {
    /// Live sessions admit every aliased source, as monitor-only (group -2)
    pub live: bool,
    /// Source string -> default alias, consulted before synthesizing one
    pub alias_defaults: BTreeMap<String, String>,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self::new(false)
    }
}

impl ResolveOptions {
    pub fn new(live: bool) -> Self {
        Self {
            live,
            alias_defaults: ALIAS_DEFAULTS
                .iter()
                .map(|(source, alias)| (source.to_string(), alias.to_string()))
                .collect(),
        }
    }

    /// Add (or override) default aliases
    pub fn with_alias_defaults(
        mut self,
        extra: impl IntoIterator<Item = (String, String)>,
    ) -> Self {
        self.alias_defaults.extend(extra);
        self
    }
}

/// Per-source bookkeeping while a graph is being built
#[derive(Debug)]
struct PendingSource {
    alias: Option<String>,
    group: Group,
    in_partition: bool,
}

/// ConfigResolver builds SourceGraphs from configuration snapshots.
///
/// Resolution is a pure function of the snapshot, the registry and the options; the
/// resolver itself holds no state between calls.
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    registry: Arc<TypeRegistry>,
    options: ResolveOptions,
}

impl ConfigResolver {
    pub fn new(registry: Arc<TypeRegistry>, options: ResolveOptions) -> Self {
        Self { registry, options }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// A shared handle on the registry, for event handles which outlive the resolver
    pub fn shared_registry(&self) -> Arc<TypeRegistry> {
        self.registry.clone()
    }

    pub fn options(&self) -> &ResolveOptions {
        &self.options
    }

    /// Build the SourceGraph of a configuration snapshot
    ///
    /// Fails with `ConfigurationMissing` if the snapshot has more than one Partition
    /// record. All other problems are logged and leave the affected source with
    /// defaults.
    pub fn resolve(&self, snapshot: &RecordSnapshot) -> Result<SourceGraph, ResolveError> {
        let partitions: Vec<&RecordKey> = self
            .registry
            .keys_of(snapshot, RecordCategory::Partition)
            .collect();

        let mut graph = SourceGraph::default();
        let mut pending: BTreeMap<Source, PendingSource> = BTreeMap::new();
        let mut taken: BTreeMap<String, Source> = BTreeMap::new();

        match partitions.len() {
            0 => {
                log::debug!("No Partition record in configuration, source graph is degraded");
                graph.degraded = true;
                for source in snapshot.sources() {
                    if source.is_detector() {
                        pending.insert(
                            source.clone(),
                            PendingSource {
                                alias: None,
                                group: Group::Background,
                                in_partition: false,
                            },
                        );
                    }
                }
                graph.readout_groups.entry(Group::Background).or_default();
            }
            1 => {
                let key = partitions[0];
                let partition = snapshot
                    .get(key)?
                    .as_partition()
                    .ok_or_else(|| StoreError::WrongRecordType(key.clone()))?;
                let partition_ip = key.source.ip_addr();
                graph.partition = Some(PartitionSummary {
                    source: key.source.clone(),
                    ip_addr: partition_ip,
                    bld_mask: partition.bld_mask,
                });
                for declared in partition.sources.iter() {
                    // A source listed twice keeps its first group
                    pending
                        .entry(declared.src.clone())
                        .or_insert(PendingSource {
                            alias: None,
                            group: Group::from(declared.group),
                            in_partition: true,
                        });
                }
                self.bind_aliases(snapshot, partition_ip, &mut pending, &mut taken);
            }
            n => return Err(ResolveError::ConfigurationMissing(n)),
        }

        for (source, entry) in pending.into_iter() {
            let alias = match entry.alias {
                Some(alias) => alias,
                None => self.default_alias(&source, &mut taken),
            };
            graph.readout_groups
                .entry(entry.group)
                .or_default()
                .sources
                .push(source.clone());
            graph.sources.insert(
                source.clone(),
                SourceInfo {
                    source,
                    alias,
                    group: entry.group,
                    in_partition: entry.in_partition,
                    event_code: None,
                    trigger: None,
                },
            );
        }
        graph.aliases = taken;
        graph.configured = snapshot
            .sources()
            .into_iter()
            .filter(|source| graph.sources.contains_key(*source))
            .cloned()
            .collect();

        if !graph.degraded {
            self.wire_triggers(snapshot, &mut graph);
        }
        self.read_run_metadata(snapshot, &mut graph);

        log::debug!(
            "Resolved source graph with {} sources in {} readout groups",
            graph.sources.len(),
            graph.readout_groups.len()
        );
        Ok(graph)
    }

    fn bind_aliases(
        &self,
        snapshot: &RecordSnapshot,
        partition_ip: u32,
        pending: &mut BTreeMap<Source, PendingSource>,
        taken: &mut BTreeMap<String, Source>,
    ) {
        for key in self.registry.keys_of(snapshot, RecordCategory::Alias) {
            let Some(config) = typed_record(snapshot, key, Record::as_alias) else {
                continue;
            };
            // Aliases are published by each recording node; the node address decides
            // whether a non-partition source belongs to somebody else
            let alias_ip = key.source.ip_addr();
            for declared in config.src_alias.iter() {
                if let Err(e) = self.bind_alias(
                    &declared.alias_name,
                    &declared.src,
                    alias_ip != partition_ip,
                    pending,
                    taken,
                ) {
                    log::warn!("{e}");
                }
            }
        }
    }

    fn bind_alias(
        &self,
        name: &str,
        source: &Source,
        foreign_node: bool,
        pending: &mut BTreeMap<Source, PendingSource>,
        taken: &mut BTreeMap<String, Source>,
    ) -> Result<(), AliasResolutionError> {
        let alias = sanitize_alias(name);
        if alias.is_empty() {
            return Err(AliasResolutionError::EmptyAlias(source.clone()));
        }

        match pending.get(source) {
            Some(PendingSource {
                alias: Some(existing),
                ..
            }) => {
                log::debug!("{source} is already aliased as {existing}, ignoring alias {alias}");
                return Ok(());
            }
            Some(_) => (),
            None if foreign_node || self.options.live => (),
            None => {
                log::debug!("Alias {alias} names {source} which is not part of the partition");
                return Ok(());
            }
        }

        claim_alias(&alias, source, taken)?;
        let group = if self.options.live {
            Group::Monitor
        } else {
            Group::Controls
        };
        pending
            .entry(source.clone())
            .or_insert(PendingSource {
                alias: None,
                group,
                in_partition: false,
            })
            .alias = Some(alias);
        Ok(())
    }

    /// Alias for a source without an alias record: the fixed table first, then the
    /// source string without its wrapper. Collisions get a numeric suffix.
    fn default_alias(&self, source: &Source, taken: &mut BTreeMap<String, Source>) -> String {
        let stem = match self.options.alias_defaults.get(source.as_str()) {
            Some(alias) => alias.as_str(),
            None => source.alias_stem(),
        };
        let mut base = sanitize_alias(stem);
        if base.is_empty() {
            base = sanitize_alias(source.as_str());
        }
        if source.is_placeholder() {
            return base;
        }

        let mut alias = base.clone();
        let mut suffix = 1;
        while taken.contains_key(&alias) {
            suffix += 1;
            alias = format!("{base}_{suffix}");
        }
        if suffix > 1 {
            log::debug!("Default alias {base} of {source} is taken, using {alias}");
        }
        taken.insert(alias.clone(), source.clone());
        alias
    }

    fn wire_triggers(&self, snapshot: &RecordSnapshot, graph: &mut SourceGraph) {
        for key in self.registry.keys_of(snapshot, RecordCategory::EvrConfig) {
            let Some(config) = typed_record(snapshot, key, Record::as_evr_config) else {
                continue;
            };
            for code in config.eventcodes.iter() {
                graph
                    .event_codes
                    .entry(code.code)
                    .or_insert_with(|| code.clone());
                if code.is_readout {
                    let codes = &mut graph
                        .readout_groups
                        .entry(Group::from(code.readout_group))
                        .or_default()
                        .event_codes;
                    if !codes.contains(&code.code) {
                        codes.push(code.code);
                    }
                }
            }
            for failure in graph.output_maps.add_config(config) {
                log::warn!("{failure}");
            }
        }

        let io_keys: Vec<&RecordKey> = self
            .registry
            .keys_of(snapshot, RecordCategory::EvrIoConfig)
            .collect();
        if io_keys.len() > 1 {
            log::warn!(
                "Found {} EVR IO configurations, only {} is used for trigger wiring",
                io_keys.len(),
                io_keys[0]
            );
        }
        if let Some(config) = io_keys
            .first()
            .and_then(|key| typed_record(snapshot, key, Record::as_evr_io_config))
        {
            for channel in config.channels.iter() {
                let output = OutputKey::new(channel.output.module, channel.output.conn_id);
                let Some(timing) = graph.output_maps.get(&output).map(|map| map.timing) else {
                    log::warn!(
                        "{}",
                        AliasResolutionError::MissingOutputMap(output.module, output.conn_id)
                    );
                    continue;
                };
                for source in channel.infos.iter() {
                    match graph.sources.get_mut(source) {
                        Some(info) => info.trigger = Some(TriggerInfo { output, timing }),
                        None => {
                            log::warn!("{}", AliasResolutionError::UnknownSource(source.clone()))
                        }
                    }
                }
            }
        }

        // First declared code of a readout group is the trigger of all its members
        for group in graph.readout_groups.values() {
            let Some(code) = group.event_codes.first() else {
                continue;
            };
            for source in group.sources.iter() {
                if let Some(info) = graph.sources.get_mut(source) {
                    info.event_code = Some(*code);
                }
            }
        }
    }

    /// Scan control data and EPICS PV aliases
    fn read_run_metadata(&self, snapshot: &RecordSnapshot, graph: &mut SourceGraph) {
        graph.control_data = self
            .registry
            .keys_of(snapshot, RecordCategory::ControlData)
            .next()
            .and_then(|key| typed_record(snapshot, key, Record::as_control_data))
            .cloned();

        for key in self.registry.keys_of(snapshot, RecordCategory::EpicsConfig) {
            let Some(config) = typed_record(snapshot, key, Record::as_epics_config) else {
                continue;
            };
            for pv in config.pvs.iter() {
                let alias = sanitize_alias(&pv.description);
                if !alias.is_empty() {
                    graph.pv_aliases.insert(pv.pv_name.clone(), alias);
                }
            }
        }
    }
}

/// Reserve an alias for a source. Placeholders never occupy the alias namespace.
fn claim_alias(
    alias: &str,
    source: &Source,
    taken: &mut BTreeMap<String, Source>,
) -> Result<(), AliasResolutionError> {
    if source.is_placeholder() {
        return Ok(());
    }
    match taken.get(alias) {
        Some(kept) if kept != source => Err(AliasResolutionError::DuplicateAlias {
            alias: alias.to_string(),
            kept: kept.clone(),
            dropped: source.clone(),
        }),
        _ => {
            taken.insert(alias.to_string(), source.clone());
            Ok(())
        }
    }
}

/// Fetch a record and check its type, logging (and skipping) failures
fn typed_record<'a, T>(
    snapshot: &'a RecordSnapshot,
    key: &RecordKey,
    accessor: fn(&Record) -> Option<&T>,
) -> Option<&'a T> {
    let record = match snapshot.get(key) {
        Ok(record) => record,
        Err(e) => {
            log::warn!("{}", AliasResolutionError::Store(e));
            return None;
        }
    };
    let typed = accessor(record);
    if typed.is_none() {
        log::warn!(
            "{}",
            AliasResolutionError::Store(StoreError::WrongRecordType(key.clone()))
        );
    }
    typed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::ReadoutGroup;
    use crate::output_map::EVR_CLOCK_HZ;
    use crate::record::*;

    const PARTITION_NODE: &str = "ProcInfo(172.21.22.5, pid=4821)";
    const OTHER_NODE: &str = "ProcInfo(172.21.22.9, pid=77)";

    fn src(repr: &str) -> Source {
        Source::new(repr).unwrap()
    }

    fn key(type_name: &str, source: &str) -> RecordKey {
        RecordKey::new(type_name.parse().unwrap(), src(source), "")
    }

    fn partition(sources: &[(&str, i32)]) -> Record {
        Record::Partition(PartitionConfig {
            bld_mask: 0,
            sources: sources
                .iter()
                .map(|(source, group)| PartitionSource {
                    src: src(source),
                    group: *group,
                })
                .collect(),
        })
    }

    fn aliases(declared: &[(&str, &str)]) -> Record {
        Record::Alias(AliasConfig {
            src_alias: declared
                .iter()
                .map(|(name, source)| SrcAlias {
                    alias_name: name.to_string(),
                    src: src(source),
                })
                .collect(),
        })
    }

    fn event_code(code: u16, group: i32) -> EventCodeConfig {
        EventCodeConfig {
            code,
            readout_group: group,
            is_readout: true,
            desc: String::new(),
        }
    }

    fn resolver(live: bool) -> ConfigResolver {
        ConfigResolver::new(Arc::new(TypeRegistry::new()), ResolveOptions::new(live))
    }

    #[test]
    fn test_synthesized_aliases() {
        let mut snapshot = RecordSnapshot::new();
        snapshot.insert(
            key("Partition.ConfigV2", PARTITION_NODE),
            partition(&[("BldInfo(EBeam)", 0), ("DetInfo(XppGon.0:Cspad.0)", 1)]),
        );
        let graph = resolver(false).resolve(&snapshot).unwrap();

        assert!(!graph.is_degraded());
        assert_eq!(graph.alias_of(&src("BldInfo(EBeam)")), Some("EBeam"));
        assert_eq!(
            graph.alias_of(&src("DetInfo(XppGon.0:Cspad.0)")),
            Some("XppGon_0_Cspad_0")
        );
        assert_eq!(graph.readout_groups().len(), 2);
        assert!(graph
            .readout_groups()
            .values()
            .all(|group| group.event_codes.is_empty() && group.sources.len() == 1));
        assert_eq!(
            graph.partition().map(|p| p.ip_addr),
            Some(src(PARTITION_NODE).ip_addr())
        );
    }

    #[test]
    fn test_first_event_code_wins() {
        let mut snapshot = RecordSnapshot::new();
        snapshot.insert(
            key("Partition.ConfigV2", PARTITION_NODE),
            partition(&[("DetInfo(XppEndstation.0:Opal1000.1)", 1)]),
        );
        snapshot.insert(
            key("EvrData.ConfigV7", "DetInfo(NoDetector.0:Evr.0)"),
            Record::EvrConfig(EvrConfig {
                eventcodes: vec![event_code(40, 1), event_code(140, 1)],
                pulses: Vec::new(),
                output_maps: Vec::new(),
            }),
        );
        let graph = resolver(false).resolve(&snapshot).unwrap();
        let source = graph
            .source(&src("DetInfo(XppEndstation.0:Opal1000.1)"))
            .unwrap();
        assert_eq!(source.event_code, Some(40));
        assert_eq!(
            graph.readout_groups().get(&Group::Readout(1)),
            Some(&ReadoutGroup {
                event_codes: vec![40, 140],
                sources: vec![src("DetInfo(XppEndstation.0:Opal1000.1)")],
            })
        );
        assert_eq!(graph.event_codes().len(), 2);
    }

    #[test]
    fn test_degraded_without_partition() {
        let mut snapshot = RecordSnapshot::new();
        snapshot.insert(
            key("CsPad.ConfigV5", "DetInfo(XppGon.0:Cspad.0)"),
            Record::Detector {
                payload: serde_yaml::Value::Null,
            },
        );
        snapshot.insert(
            key("Bld.BldDataEBeamV7", "BldInfo(EBeam)"),
            Record::Detector {
                payload: serde_yaml::Value::Null,
            },
        );
        snapshot.insert(
            key("ControlData.ConfigV3", PARTITION_NODE),
            Record::ControlData(ControlDataConfig::default()),
        );
        let graph = resolver(false).resolve(&snapshot).unwrap();

        assert!(graph.is_degraded());
        assert_eq!(graph.sources().count(), 2);
        assert!(graph
            .sources()
            .all(|info| info.group == Group::Background && !info.alias.is_empty()));
        assert!(graph.source(&src(PARTITION_NODE)).is_none());
        assert!(graph.control_data().is_some());
    }

    #[test]
    fn test_two_partitions_are_fatal() {
        let mut snapshot = RecordSnapshot::new();
        snapshot.insert(
            key("Partition.ConfigV2", PARTITION_NODE),
            partition(&[("BldInfo(EBeam)", 0)]),
        );
        snapshot.insert(
            key("Partition.ConfigV2", OTHER_NODE),
            partition(&[("BldInfo(EBeam)", 0)]),
        );
        assert!(matches!(
            resolver(false).resolve(&snapshot),
            Err(ResolveError::ConfigurationMissing(2))
        ));
    }

    fn aliased_snapshot() -> RecordSnapshot {
        let mut snapshot = RecordSnapshot::new();
        snapshot.insert(
            key("Partition.ConfigV2", PARTITION_NODE),
            partition(&[("DetInfo(XppGon.0:Cspad.0)", 1)]),
        );
        snapshot.insert(
            key("Alias.ConfigV1", PARTITION_NODE),
            aliases(&[
                ("cspad", "DetInfo(XppGon.0:Cspad.0)"),
                ("local-only", "DetInfo(XppGon.0:Opal1000.0)"),
            ]),
        );
        snapshot.insert(
            key("Alias.ConfigV1", OTHER_NODE),
            aliases(&[("yag lom-2", "DetInfo(XppEndstation.0:Opal1000.2)")]),
        );
        snapshot
    }

    #[test]
    fn test_non_partition_aliases() {
        let graph = resolver(false).resolve(&aliased_snapshot()).unwrap();
        let cspad = graph.by_alias("cspad").unwrap();
        assert_eq!(cspad.group, Group::Readout(1));
        assert!(cspad.in_partition);

        let yag = graph.by_alias("yag_lom_2").unwrap();
        assert_eq!(yag.group, Group::Controls);
        assert!(!yag.in_partition);
        assert!(graph.readout_groups()[&Group::Controls]
            .sources
            .contains(&yag.source));

        // Owned by the partition node but not in the partition
        assert!(graph.by_alias("local_only").is_none());

        let live = resolver(true).resolve(&aliased_snapshot()).unwrap();
        assert_eq!(live.by_alias("yag_lom_2").unwrap().group, Group::Monitor);
        assert_eq!(live.by_alias("local_only").unwrap().group, Group::Monitor);
    }

    #[test]
    fn test_duplicate_alias_falls_back() {
        let mut snapshot = RecordSnapshot::new();
        snapshot.insert(
            key("Partition.ConfigV2", PARTITION_NODE),
            partition(&[("DetInfo(XppGon.0:Cspad.0)", 1), ("DetInfo(XppGon.0:Cspad2x2.0)", 1)]),
        );
        snapshot.insert(
            key("Alias.ConfigV1", PARTITION_NODE),
            aliases(&[
                ("cspad", "DetInfo(XppGon.0:Cspad.0)"),
                ("cspad", "DetInfo(XppGon.0:Cspad2x2.0)"),
            ]),
        );
        let graph = resolver(false).resolve(&snapshot).unwrap();
        assert_eq!(graph.by_alias("cspad").unwrap().source, src("DetInfo(XppGon.0:Cspad.0)"));
        assert_eq!(
            graph.alias_of(&src("DetInfo(XppGon.0:Cspad2x2.0)")),
            Some("XppGon_0_Cspad2x2_0")
        );
        assert_eq!(graph.aliases().len(), 2);
    }

    #[test]
    fn test_alias_defaults() {
        let mut snapshot = RecordSnapshot::new();
        snapshot.insert(
            key("Partition.ConfigV2", PARTITION_NODE),
            partition(&[("BldInfo(FEE-SPEC0)", 0), ("BldInfo(XCS-IPM-02)", 0)]),
        );
        let options = ResolveOptions::new(false).with_alias_defaults([(
            String::from("BldInfo(XCS-IPM-02)"),
            String::from("Ipm2"),
        )]);
        let graph = ConfigResolver::new(Arc::new(TypeRegistry::new()), options)
            .resolve(&snapshot)
            .unwrap();
        assert_eq!(graph.alias_of(&src("BldInfo(FEE-SPEC0)")), Some("FEE_Spec"));
        assert_eq!(graph.alias_of(&src("BldInfo(XCS-IPM-02)")), Some("Ipm2"));
    }

    #[test]
    fn test_placeholders_hidden() {
        let mut snapshot = RecordSnapshot::new();
        snapshot.insert(
            key("Partition.ConfigV2", PARTITION_NODE),
            partition(&[("DetInfo(NoDetector.0:Evr.0)", 0), ("BldInfo(EBeam)", 0)]),
        );
        let graph = resolver(false).resolve(&snapshot).unwrap();
        assert_eq!(graph.sources().count(), 1);
        assert_eq!(graph.all_sources().count(), 2);
        assert!(graph.source(&src("DetInfo(NoDetector.0:Evr.0)")).is_none());
        assert!(graph.by_alias("NoDetector_0_Evr_0").is_none());
        assert_eq!(graph.readout_groups()[&Group::Background].sources.len(), 2);
    }

    #[test]
    fn test_io_channel_timing() {
        let opal = "DetInfo(XppEndstation.0:Opal1000.1)";
        let mut snapshot = RecordSnapshot::new();
        snapshot.insert(
            key("Partition.ConfigV2", PARTITION_NODE),
            partition(&[(opal, 1)]),
        );
        snapshot.insert(
            key("EvrData.ConfigV7", "DetInfo(NoDetector.0:Evr.0)"),
            Record::EvrConfig(EvrConfig {
                eventcodes: vec![event_code(41, 1)],
                pulses: vec![PulseConfig {
                    pulse_id: 0,
                    polarity: Polarity::Negative,
                    prescale: 2,
                    delay: 119,
                    width: 1190,
                }],
                output_maps: vec![OutputMapConfig {
                    source: OutputSource::Pulse,
                    source_id: 0,
                    conn: OutputConnector::FrontPanel,
                    conn_id: 3,
                    module: 0,
                }],
            }),
        );
        snapshot.insert(
            key("EvrData.IOConfigV2", "DetInfo(NoDetector.0:Evr.0)"),
            Record::EvrIoConfig(EvrIoConfig {
                channels: vec![
                    IoChannel {
                        name: String::from("opal"),
                        output: OutputAddress {
                            module: 0,
                            conn_id: 3,
                        },
                        infos: vec![src(opal), src("DetInfo(XppGon.0:Unknown.0)")],
                    },
                    IoChannel {
                        name: String::from("unwired"),
                        output: OutputAddress {
                            module: 1,
                            conn_id: 0,
                        },
                        infos: vec![src(opal)],
                    },
                ],
            }),
        );
        let graph = resolver(false).resolve(&snapshot).unwrap();
        let info = graph.source(&src(opal)).unwrap();
        let trigger = info.trigger.unwrap();
        assert_eq!(trigger.output, OutputKey::new(0, 3));
        assert!((trigger.timing.delay.unwrap() - 2.0 * 119.0 / EVR_CLOCK_HZ).abs() < 1.0e-15);
        assert!((trigger.timing.width.unwrap() - 2.0e-5).abs() < 1.0e-15);
        assert_eq!(trigger.timing.polarity, Some(Polarity::Negative));
        assert_eq!(info.event_code, Some(41));
    }

    #[test]
    fn test_epics_pv_aliases() {
        let mut snapshot = RecordSnapshot::new();
        snapshot.insert(
            key("Epics.ConfigV1", "DetInfo(EpicsArch.0:NoDevice.0)"),
            Record::EpicsConfig(EpicsConfig {
                pvs: vec![
                    EpicsPvConfig {
                        pv_id: 0,
                        pv_name: String::from("XPP:LAS:MMN:01"),
                        description: String::from("lxt delay"),
                        interval: 1.0,
                    },
                    EpicsPvConfig {
                        pv_id: 1,
                        pv_name: String::from("XPP:GON:MMS:07"),
                        description: String::new(),
                        interval: 1.0,
                    },
                ],
            }),
        );
        let graph = resolver(false).resolve(&snapshot).unwrap();
        assert_eq!(graph.pv_alias("XPP:LAS:MMN:01"), Some("lxt_delay"));
        assert_eq!(graph.pv_alias("XPP:GON:MMS:07"), None);
        // EpicsArch is a placeholder and never visible
        assert_eq!(graph.sources().count(), 0);
    }
}
