//! Declarative topology descriptions and reference topologies

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use eonsim_core::Network;

/// A network description loadable from TOML.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TopologySpec {
    #[serde(default = "default_slots_per_core")]
    pub slots_per_core: usize,
    #[serde(default = "default_cores_per_link")]
    pub cores_per_link: usize,
    #[serde(default = "default_candidates_per_pair")]
    pub candidates_per_pair: usize,
    #[serde(default = "default_regenerator_metric_value")]
    pub regenerator_metric_value: f64,
    #[serde(default = "default_can_switch_modulation")]
    pub can_switch_modulation: bool,
    pub nodes: Vec<NodeSpec>,
    pub links: Vec<LinkSpec>,
}

fn default_slots_per_core() -> usize {
    80
}

fn default_cores_per_link() -> usize {
    1
}

fn default_candidates_per_pair() -> usize {
    3
}

fn default_regenerator_metric_value() -> f64 {
    25.0
}

fn default_can_switch_modulation() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct NodeSpec {
    pub name: String,
    #[serde(default = "default_regenerators")]
    pub regenerators: usize,
}

fn default_regenerators() -> usize {
    100
}

/// A link between two nodes, referenced by name, with its length in km.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LinkSpec {
    pub a: String,
    pub b: String,
    pub length: f64,
}

impl TopologySpec {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading topology {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing topology {}", path.display()))
    }

    /// Build the runtime [`Network`] this description declares.
    pub fn build(&self) -> Result<Network> {
        let mut builder = Network::builder();
        builder
            .slots_per_core(self.slots_per_core)
            .cores_per_link(self.cores_per_link)
            .candidates_per_pair(self.candidates_per_pair)
            .regenerator_metric_value(self.regenerator_metric_value)
            .can_switch_modulation(self.can_switch_modulation);

        let mut ids = std::collections::HashMap::new();
        for node in &self.nodes {
            let id = builder.add_node(&node.name, node.regenerators);
            if ids.insert(node.name.clone(), id).is_some() {
                anyhow::bail!("duplicate node name {:?}", node.name);
            }
        }
        for link in &self.links {
            let a = *ids
                .get(&link.a)
                .with_context(|| format!("link references unknown node {:?}", link.a))?;
            let b = *ids
                .get(&link.b)
                .with_context(|| format!("link references unknown node {:?}", link.b))?;
            builder.add_link(a, b, link.length);
        }
        builder.build().context("building network")
    }

    /// The 14-node NSFNET reference topology.
    pub fn nsfnet() -> Self {
        let nodes = [
            "seattle",
            "palo-alto",
            "san-diego",
            "salt-lake-city",
            "boulder",
            "houston",
            "lincoln",
            "champaign",
            "ann-arbor",
            "pittsburgh",
            "atlanta",
            "college-park",
            "ithaca",
            "princeton",
        ];
        let links = [
            ("seattle", "palo-alto", 1100.0),
            ("seattle", "san-diego", 1600.0),
            ("seattle", "champaign", 2800.0),
            ("palo-alto", "san-diego", 600.0),
            ("palo-alto", "salt-lake-city", 1000.0),
            ("san-diego", "houston", 2000.0),
            ("salt-lake-city", "boulder", 600.0),
            ("salt-lake-city", "ann-arbor", 2400.0),
            ("boulder", "houston", 1100.0),
            ("boulder", "lincoln", 800.0),
            ("houston", "atlanta", 1200.0),
            ("houston", "college-park", 2000.0),
            ("lincoln", "champaign", 700.0),
            ("champaign", "pittsburgh", 700.0),
            ("ann-arbor", "pittsburgh", 500.0),
            ("ann-arbor", "ithaca", 800.0),
            ("pittsburgh", "princeton", 500.0),
            ("atlanta", "pittsburgh", 900.0),
            ("college-park", "princeton", 300.0),
            ("college-park", "ithaca", 500.0),
            ("ithaca", "princeton", 300.0),
        ];
        Self {
            slots_per_core: default_slots_per_core(),
            cores_per_link: default_cores_per_link(),
            candidates_per_pair: default_candidates_per_pair(),
            regenerator_metric_value: default_regenerator_metric_value(),
            can_switch_modulation: default_can_switch_modulation(),
            nodes: nodes
                .iter()
                .map(|&name| NodeSpec {
                    name: name.to_string(),
                    regenerators: default_regenerators(),
                })
                .collect(),
            links: links
                .iter()
                .map(|&(a, b, length)| LinkSpec {
                    a: a.to_string(),
                    b: b.to_string(),
                    length,
                })
                .collect(),
        }
    }
}
