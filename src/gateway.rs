//! Remote solver gateway.
//!
//! Serializes a built [`Netlist`] plus analysis parameters into the solver's
//! JSON contract and exchanges it over a [`Transport`]. At most one request
//! may be in flight: a second call made while one is outstanding fails with
//! [`GatewayError::Busy`]. There is no cancellation and no timeout.
//!
//! # Endpoints
//!
//! ```text
//! POST <simulation_path>  { netList, numberNodes, analysisType, frequency }
//!                         -> { voltages: {V_node_<n>: ..}, current: {I_<id>: ..} }
//! POST <parameter_path>   { netList, numberNodes, parameterType, frequency,
//!                           p1n1, p1n2, p2n1, p2n2, z01, z02, fStart, fStop }
//!                         -> { parameters: { symbolic, numeric }, parameter_type }
//! POST <netlist_path>     { components: [{ type, id, node: [..], value }] }
//!                         -> { netlist: "<text>" }
//! ```
//!
//! `netList` is itself a JSON string of `{ components, groundNode }`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::config::ServerConfig;
use crate::error::{GatewayError, GridSpiceError};
use crate::ir::{ComponentValue, Netlist, NodeNumber};
use crate::values::ValueStore;

/// Default reference impedance for parameter analysis (ohms).
pub const DEFAULT_REFERENCE_IMPEDANCE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalysisType {
    #[default]
    Dc,
    Ac,
    Transient,
}

impl fmt::Display for AnalysisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisType::Dc => "dc",
            AnalysisType::Ac => "ac",
            AnalysisType::Transient => "transient",
        })
    }
}

impl FromStr for AnalysisType {
    type Err = GridSpiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "dc" => Ok(AnalysisType::Dc),
            "ac" => Ok(AnalysisType::Ac),
            "transient" | "tran" => Ok(AnalysisType::Transient),
            _ => Err(GridSpiceError::Parse(format!(
                "unknown analysis type '{}', expected dc, ac or transient",
                s
            ))),
        }
    }
}

/// Two-port parameter family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterType {
    #[default]
    Z,
    Y,
    S,
}

impl ParameterType {
    pub fn as_str(self) -> &'static str {
        match self {
            ParameterType::Z => "z",
            ParameterType::Y => "y",
            ParameterType::S => "s",
        }
    }
}

impl FromStr for ParameterType {
    type Err = GridSpiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "z" => Ok(ParameterType::Z),
            "y" => Ok(ParameterType::Y),
            "s" => Ok(ParameterType::S),
            _ => Err(GridSpiceError::Parse(format!(
                "unknown parameter type '{}', expected z, y or s",
                s
            ))),
        }
    }
}

/// Port node quadruplet for two-port analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PortNodes {
    pub p1n1: Option<NodeNumber>,
    pub p1n2: Option<NodeNumber>,
    pub p2n1: Option<NodeNumber>,
    pub p2n2: Option<NodeNumber>,
}

impl PortNodes {
    pub fn new(p1n1: NodeNumber, p1n2: NodeNumber, p2n1: NodeNumber, p2n2: NodeNumber) -> Self {
        Self {
            p1n1: Some(p1n1),
            p1n2: Some(p1n2),
            p2n1: Some(p2n1),
            p2n2: Some(p2n2),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.p1n1.is_some() && self.p1n2.is_some() && self.p2n1.is_some() && self.p2n2.is_some()
    }
}

/// Two-port parameter analysis settings.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterRequest {
    pub parameter_type: ParameterType,
    pub frequency: f64,
    pub ports: PortNodes,
    /// Reference impedances of port 1 and port 2.
    pub reference_impedance: [f64; 2],
    /// Optional `(start, stop)` frequency sweep.
    pub sweep: Option<(f64, f64)>,
}

impl ParameterRequest {
    pub fn new(parameter_type: ParameterType, frequency: f64) -> Self {
        Self {
            parameter_type,
            frequency,
            ports: PortNodes::default(),
            reference_impedance: [DEFAULT_REFERENCE_IMPEDANCE; 2],
            sweep: None,
        }
    }

    /// Every family except the default one needs all four port nodes.
    pub fn validate(&self) -> Result<(), GatewayError> {
        if self.parameter_type != ParameterType::default() && !self.ports.is_complete() {
            return Err(GatewayError::MissingPortNodes(self.parameter_type.as_str()));
        }
        Ok(())
    }
}

/// A solver reading. The solver reports plain numbers, but some analyses
/// send numeric strings; both are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Text(String),
}

impl Reading {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Reading::Number(v) => Some(*v),
            Reading::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Number(v) => write!(f, "{}", v),
            Reading::Text(s) => f.write_str(s),
        }
    }
}

/// Successful simulation reply, keyed `V_node_<n>` and `I_<synthetic id>`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationResponse {
    #[serde(default)]
    pub voltages: BTreeMap<String, Reading>,
    #[serde(default)]
    pub current: BTreeMap<String, Reading>,
    #[serde(default)]
    pub analysis_type: Option<String>,
}

impl SimulationResponse {
    pub fn node_voltage(&self, node: NodeNumber) -> Option<f64> {
        self.voltages.get(&format!("V_node_{}", node)).and_then(Reading::as_f64)
    }

    pub fn branch_current(&self, synthetic_id: &str) -> Option<f64> {
        self.current.get(&format!("I_{}", synthetic_id)).and_then(Reading::as_f64)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParameterValues {
    #[serde(default)]
    pub symbolic: serde_json::Value,
    #[serde(default)]
    pub numeric: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ParameterResponse {
    #[serde(default)]
    pub parameters: ParameterValues,
    #[serde(default)]
    pub parameter_type: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SimulationBody {
    net_list: String,
    number_nodes: usize,
    analysis_type: AnalysisType,
    frequency: f64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ParameterBody {
    net_list: String,
    number_nodes: usize,
    parameter_type: ParameterType,
    frequency: f64,
    #[serde(flatten)]
    ports: PortNodes,
    z01: f64,
    z02: f64,
    f_start: Option<f64>,
    f_stop: Option<f64>,
}

#[derive(Serialize)]
struct RenderComponent<'a> {
    #[serde(rename = "type")]
    label: &'a str,
    id: &'a str,
    node: Vec<NodeNumber>,
    value: ComponentValue,
}

#[derive(Serialize)]
struct RenderBody<'a> {
    components: Vec<RenderComponent<'a>>,
}

#[derive(Deserialize)]
struct RenderResponse {
    netlist: String,
}

/// Moves JSON documents to and from the solver service.
pub trait Transport {
    fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value, GatewayError>;
}

/// Blocking HTTP transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    agent: ureq::Agent,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            agent: ureq::AgentBuilder::new().build(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl Transport for HttpTransport {
    fn post_json(&self, path: &str, body: &serde_json::Value) -> Result<serde_json::Value, GatewayError> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), path);
        tracing::debug!(%url, "POST");

        match self
            .agent
            .post(&url)
            .set("Accept", "application/json")
            .send_json(body)
        {
            Ok(response) => response
                .into_json::<serde_json::Value>()
                .map_err(|e| GatewayError::Decode(e.to_string())),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(GatewayError::Status { code, body })
            }
            Err(e) => Err(GatewayError::Transport(e.to_string())),
        }
    }
}

/// Transport that refuses every request (`--offline`).
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineTransport;

impl Transport for OfflineTransport {
    fn post_json(&self, _path: &str, _body: &serde_json::Value) -> Result<serde_json::Value, GatewayError> {
        Err(GatewayError::Offline)
    }
}

/// Clears the busy flag when a request finishes, successfully or not.
struct InFlight<'a>(&'a AtomicBool);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

#[derive(Debug)]
pub struct SimulationGateway<T> {
    transport: T,
    server: ServerConfig,
    busy: AtomicBool,
}

impl<T: Transport> SimulationGateway<T> {
    pub fn new(transport: T, server: ServerConfig) -> Self {
        Self {
            transport,
            server,
            busy: AtomicBool::new(false),
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// True while a request is outstanding.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Run a DC, AC or transient analysis.
    pub fn simulate(
        &self,
        netlist: &Netlist,
        analysis: AnalysisType,
        frequency: f64,
    ) -> Result<SimulationResponse, GatewayError> {
        let _in_flight = self.begin()?;
        let _span = tracing::info_span!("simulate", %analysis, frequency, entries = netlist.components.len()).entered();

        let body = SimulationBody {
            net_list: encode_netlist(netlist)?,
            number_nodes: netlist.number_of_nodes,
            analysis_type: analysis,
            frequency,
        };
        let response: SimulationResponse = self.exchange(&self.server.simulation_path, &body)?;
        tracing::info!(
            voltages = response.voltages.len(),
            currents = response.current.len(),
            "simulation completed"
        );
        Ok(response)
    }

    /// Evaluate two-port Z/Y/S parameters.
    pub fn evaluate_parameters(
        &self,
        netlist: &Netlist,
        request: &ParameterRequest,
    ) -> Result<ParameterResponse, GatewayError> {
        request.validate()?;
        let _in_flight = self.begin()?;
        let _span = tracing::info_span!("parameters", kind = request.parameter_type.as_str()).entered();

        let body = ParameterBody {
            net_list: encode_netlist(netlist)?,
            number_nodes: netlist.number_of_nodes,
            parameter_type: request.parameter_type,
            frequency: request.frequency,
            ports: request.ports,
            z01: request.reference_impedance[0],
            z02: request.reference_impedance[1],
            f_start: request.sweep.map(|(start, _)| start),
            f_stop: request.sweep.map(|(_, stop)| stop),
        };
        self.exchange(&self.server.parameter_path, &body)
    }

    /// Ask the service to render `netlist` as SPICE text.
    pub fn render_netlist(&self, netlist: &Netlist, values: &ValueStore) -> Result<String, GatewayError> {
        let _in_flight = self.begin()?;

        let body = RenderBody {
            components: netlist
                .components
                .iter()
                .map(|entry| RenderComponent {
                    label: entry.label,
                    id: &entry.id,
                    node: entry.nodes(),
                    value: values.get(&entry.component).cloned().unwrap_or_default(),
                })
                .collect(),
        };
        let response: RenderResponse = self.exchange(&self.server.netlist_path, &body)?;
        Ok(response.netlist)
    }

    fn begin(&self) -> Result<InFlight<'_>, GatewayError> {
        if self.busy.swap(true, Ordering::AcqRel) {
            tracing::warn!("request rejected: another request is in flight");
            return Err(GatewayError::Busy);
        }
        Ok(InFlight(&self.busy))
    }

    fn exchange<B: Serialize, R: DeserializeOwned>(&self, path: &str, body: &B) -> Result<R, GatewayError> {
        let body = serde_json::to_value(body).map_err(|e| GatewayError::Encode(e.to_string()))?;
        let reply = self.transport.post_json(path, &body).map_err(|e| {
            tracing::warn!(error = %e, path, "solver request failed");
            e
        })?;
        serde_json::from_value(reply).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}

fn encode_netlist(netlist: &Netlist) -> Result<String, GatewayError> {
    serde_json::to_string_pretty(netlist).map_err(|e| GatewayError::Encode(e.to_string()))
}
