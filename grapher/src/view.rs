use std::fmt;
use std::str::FromStr;

use crate::error::GraphError;

/// Which topology to draw from a resolved workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum View {
    /// One node per block; edges where data flows between blocks.
    #[default]
    Process,
    /// Blocks and data artifacts as a bipartite graph.
    Data,
    /// Both of the above merged.
    Combined,
}

impl View {
    pub const ALL: [View; 3] = [View::Process, View::Data, View::Combined];

    pub fn as_str(self) -> &'static str {
        match self {
            View::Process => "process",
            View::Data => "data",
            View::Combined => "combined",
        }
    }
}

impl FromStr for View {
    type Err = GraphError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "process" => Ok(View::Process),
            "data" => Ok(View::Data),
            "combined" => Ok(View::Combined),
            _ => Err(GraphError::UnknownView(s.to_string())),
        }
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_case_insensitively() {
        assert_eq!("Process".parse::<View>(), Ok(View::Process));
        assert_eq!("DATA".parse::<View>(), Ok(View::Data));
        assert_eq!(" combined ".parse::<View>(), Ok(View::Combined));
    }

    #[test]
    fn rejects_unknown_views() {
        assert_eq!(
            "dataflow".parse::<View>(),
            Err(GraphError::UnknownView("dataflow".into()))
        );
    }

    #[test]
    fn display_round_trips() {
        for view in View::ALL {
            assert_eq!(view.to_string().parse::<View>(), Ok(view));
        }
    }
}
