//! Unit-operation kinds and the stencil shapes that draw them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Supported unit operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BlockKind {
    AmineTreater,
    Separator,
    HeatExchanger,
    Compressor,
    Pump,
    Valve,
    Mixer,
    Splitter,
}

impl BlockKind {
    pub const ALL: [BlockKind; 8] = [
        Self::AmineTreater,
        Self::Separator,
        Self::HeatExchanger,
        Self::Compressor,
        Self::Pump,
        Self::Valve,
        Self::Mixer,
        Self::Splitter,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::AmineTreater => "AmineTreater",
            Self::Separator => "Separator",
            Self::HeatExchanger => "HeatExchanger",
            Self::Compressor => "Compressor",
            Self::Pump => "Pump",
            Self::Valve => "Valve",
            Self::Mixer => "Mixer",
            Self::Splitter => "Splitter",
        }
    }

    /// Stencil document holding the block's master shape.
    pub fn stencil(self) -> &'static str {
        match self {
            Self::AmineTreater => "Column.vss",
            Self::Separator => "Separators.vss",
            Self::HeatExchanger => "Exchangers.vss",
            Self::Compressor | Self::Pump => "Fluid Drivers.vss",
            Self::Valve => "Valves.vss",
            Self::Mixer | Self::Splitter => "Mixer Splitters.vss",
        }
    }

    /// Master shape name within [`Self::stencil`].
    pub fn master(self) -> &'static str {
        match self {
            // staged column
            Self::AmineTreater => "Distill",
            Self::Separator => "2 Phase Separator",
            Self::HeatExchanger => "Shell and Tube Exchanger",
            Self::Compressor => "Compressor",
            Self::Pump => "Pump",
            Self::Valve => "JT Valve",
            Self::Mixer => "Mixer",
            Self::Splitter => "Splitter",
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BlockKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| {
                let known: Vec<&str> = Self::ALL.iter().map(|k| k.as_str()).collect();
                format!("Unknown block type: {s}. Known types: {}", known.join(", "))
            })
    }
}
