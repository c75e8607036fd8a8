use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

use super::error::SourceError;

/// Markers which identify placeholder sources. These are bookkeeping entries in the
/// DAQ configuration and never carry data.
const PLACEHOLDER_MARKERS: [&str; 2] = ["NoDetector", "NoDevice"];
const WRAPPER_MARKER: &str = "Info(";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    DetInfo,
    BldInfo,
    ProcInfo,
    Other,
}

impl FromStr for SourceKind {
    type Err = SourceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DetInfo" => Ok(Self::DetInfo),
            "BldInfo" => Ok(Self::BldInfo),
            "ProcInfo" => Ok(Self::ProcInfo),
            "" => Err(SourceError::BadSource(s.to_string())),
            _ => Ok(Self::Other),
        }
    }
}

/// A physical or logical origin of recorded data.
///
/// The identity of a Source is its canonical string form, e.g. `DetInfo(XppGon.0:Cspad.0)`,
/// `BldInfo(EBeam)` or `ProcInfo(172.21.22.5, pid=4821)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Source {
    repr: String,
}

impl Source {
    pub fn new(repr: &str) -> Result<Self, SourceError> {
        let repr = repr.trim();
        let bad = || SourceError::BadSource(repr.to_string());
        let open = repr.find('(').ok_or_else(bad)?;
        if open == 0 || !repr.ends_with(')') {
            return Err(bad());
        }
        Ok(Self {
            repr: repr.to_string(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.repr
    }

    pub fn kind(&self) -> SourceKind {
        let prefix = self.repr.split('(').next().unwrap_or_default();
        SourceKind::from_str(prefix).unwrap_or(SourceKind::Other)
    }

    /// The text between the outer parentheses
    pub fn body(&self) -> &str {
        match self.repr.find('(') {
            Some(open) => &self.repr[open + 1..self.repr.len() - 1],
            None => &self.repr,
        }
    }

    /// The IP address of the node owning this source.
    ///
    /// Only ProcInfo sources carry an address (`ProcInfo(a.b.c.d, pid=N)`); all others
    /// report 0.
    pub fn ip_addr(&self) -> u32 {
        if self.kind() != SourceKind::ProcInfo {
            return 0;
        }
        let address = self.body().split(',').next().unwrap_or_default().trim();
        let octets: Vec<u32> = address
            .split('.')
            .filter_map(|octet| octet.parse::<u8>().ok())
            .map(|octet| octet as u32)
            .collect();
        if octets.len() != 4 {
            return 0;
        }
        octets.iter().fold(0, |ip, octet| (ip << 8) | octet)
    }

    /// DetInfo and BldInfo sources are data origins, everything else is DAQ bookkeeping
    pub fn is_detector(&self) -> bool {
        matches!(self.kind(), SourceKind::DetInfo | SourceKind::BldInfo)
    }

    pub fn is_placeholder(&self) -> bool {
        PLACEHOLDER_MARKERS
            .iter()
            .any(|marker| self.repr.contains(marker))
    }

    /// The source string with its type-qualifier wrapper removed, unsanitized
    pub fn alias_stem(&self) -> &str {
        match self.repr.split_once(WRAPPER_MARKER) {
            Some((_, rest)) => rest.trim_end_matches(')'),
            None => &self.repr,
        }
    }
}

impl FromStr for Source {
    type Err = SourceError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Source {
    type Error = SourceError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<Source> for String {
    fn from(value: Source) -> Self {
        value.repr
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.repr)
    }
}

/// Replace the punctuation the DAQ allows in names with underscores
pub fn sanitize_alias(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| match c {
            '-' | ':' | '.' | ' ' => '_',
            other => other,
        })
        .collect()
}
