// Event receiver (EVR) output wiring. Every front panel / universal IO output of an
// EVR module is addressed by (module, connector id) and driven either by a pulse
// generator or by something we cannot time (DBus, prescaler, forced levels). For
// pulse driven outputs the trigger width and delay are known from the pulse
// definition, in ticks of the EVR clock scaled by the pulse prescale.
use fxhash::FxHashMap;

use super::error::AliasResolutionError;
use super::record::{EvrConfig, OutputConnector, OutputSource, Polarity, PulseConfig};

/// EVR clock frequency in Hz
pub const EVR_CLOCK_HZ: f64 = 119.0e6;

/// Address of an EVR output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OutputKey {
    pub module: u16,
    pub conn_id: u16,
}

impl OutputKey {
    pub fn new(module: u16, conn_id: u16) -> Self {
        Self { module, conn_id }
    }
}

/// Trigger timing of an output, in seconds. All fields are None unless the output is
/// driven by a pulse generator.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Timing {
    pub width: Option<f64>,
    pub delay: Option<f64>,
    pub polarity: Option<Polarity>,
}

impl Timing {
    pub fn from_pulse(pulse: &PulseConfig) -> Self {
        let scale = pulse.prescale as f64 / EVR_CLOCK_HZ;
        Self {
            width: Some(pulse.width as f64 * scale),
            delay: Some(pulse.delay as f64 * scale),
            polarity: Some(pulse.polarity),
        }
    }

    pub fn is_defined(&self) -> bool {
        self.width.is_some()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputMap {
    pub key: OutputKey,
    pub source: OutputSource,
    pub source_id: usize,
    pub conn: OutputConnector,
    pub timing: Timing,
}

/// OutputMapTable is the (module, connector) -> OutputMap lookup for every EVR
/// configuration in a snapshot.
#[derive(Debug, Clone, Default)]
pub struct OutputMapTable {
    map: FxHashMap<OutputKey, OutputMap>,
}

impl OutputMapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the output maps of one EVR configuration.
    ///
    /// An output referencing an undeclared pulse is still added, with undefined
    /// timing; the failure is returned so the caller can report it.
    pub fn add_config(&mut self, config: &EvrConfig) -> Vec<AliasResolutionError> {
        let mut failures = Vec::new();
        for output in config.output_maps.iter() {
            let key = OutputKey::new(output.module, output.conn_id);
            let timing = match output.source {
                OutputSource::Pulse => {
                    match config
                        .pulses
                        .iter()
                        .find(|pulse| pulse.pulse_id == output.source_id)
                    {
                        Some(pulse) => Timing::from_pulse(pulse),
                        None => {
                            failures.push(AliasResolutionError::MissingPulse(
                                key.module,
                                key.conn_id,
                                output.source_id,
                            ));
                            Timing::default()
                        }
                    }
                }
                _ => Timing::default(),
            };
            self.map.insert(
                key,
                OutputMap {
                    key,
                    source: output.source,
                    source_id: output.source_id,
                    conn: output.conn,
                    timing,
                },
            );
        }
        failures
    }

    pub fn get(&self, key: &OutputKey) -> Option<&OutputMap> {
        self.map.get(key)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&OutputKey, &OutputMap)> {
        self.map.iter()
    }
}
