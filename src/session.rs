//! An editing session: grid, selection, topology and solver gateway owned
//! together, driven one event at a time.

use crate::annotate::{Readout, ResultAnnotator};
use crate::config::Config;
use crate::error::{Result, TopologyError};
use crate::gateway::{
    AnalysisType, ParameterRequest, ParameterResponse, SimulationGateway, SimulationResponse, Transport,
};
use crate::grid::TerminalGrid;
use crate::ir::{ComponentId, ComponentKind, ComponentValue, Netlist, Terminal};
use crate::netlist;
use crate::selection::{SelectionController, SelectionEvent};
use crate::topology::TopologyStore;

/// What a single click did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Click {
    pub event: SelectionEvent,
    /// Id of the component the click placed, if it completed a selection.
    pub placed: Option<ComponentId>,
}

pub struct Workbench<T> {
    topology: TopologyStore,
    selection: SelectionController,
    gateway: SimulationGateway<T>,
    analysis: AnalysisType,
    frequency: f64,
    last_netlist: Option<Netlist>,
    last_response: Option<SimulationResponse>,
    last_parameters: Option<ParameterResponse>,
}

impl<T: Transport> Workbench<T> {
    pub fn new(config: &Config, transport: T) -> Self {
        Self {
            topology: TopologyStore::new(TerminalGrid::from_config(&config.grid)),
            selection: SelectionController::default(),
            gateway: SimulationGateway::new(transport, config.server.clone()),
            analysis: config.analysis.kind,
            frequency: config.analysis.frequency,
            last_netlist: None,
            last_response: None,
            last_parameters: None,
        }
    }

    pub fn topology(&self) -> &TopologyStore {
        &self.topology
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn gateway(&self) -> &SimulationGateway<T> {
        &self.gateway
    }

    pub fn last_netlist(&self) -> Option<&Netlist> {
        self.last_netlist.as_ref()
    }

    pub fn last_response(&self) -> Option<&SimulationResponse> {
        self.last_response.as_ref()
    }

    pub fn last_parameters(&self) -> Option<&ParameterResponse> {
        self.last_parameters.as_ref()
    }

    /// Switch the component kind. A pending selection is dropped, along with
    /// any ground set on a terminal nothing references.
    pub fn set_kind(&mut self, kind: ComponentKind) {
        self.selection.set_kind(kind);
        if self.selection.selected().is_none() {
            self.topology.release_unreferenced();
        }
    }

    /// Feed one terminal click; a completed selection is placed immediately.
    ///
    /// Deselecting undoes a ground set on the pending terminal if no
    /// component uses it.
    pub fn click(&mut self, terminal: Terminal) -> Result<Click> {
        self.topology.grid().check(&terminal)?;
        let event = self.selection.click(terminal, &self.topology);
        let placed = match &event {
            SelectionEvent::Completed(placement) => Some(
                self.topology
                    .place_component(placement.kind, placement.terminals.clone())?,
            ),
            SelectionEvent::Deselected => {
                self.topology.release_unreferenced();
                None
            }
            SelectionEvent::Pending | SelectionEvent::Ignored => None,
        };
        Ok(Click { event, placed })
    }

    /// Ground `terminal`, or the pending selected terminal when none is given.
    pub fn set_ground(&mut self, terminal: Option<Terminal>) -> Result<Terminal> {
        let terminal = terminal
            .or_else(|| self.selection.selected())
            .ok_or(TopologyError::NothingSelected)?;
        self.topology.set_ground(terminal)?;
        Ok(terminal)
    }

    pub fn set_value(&mut self, id: &ComponentId, value: ComponentValue) -> Result<()> {
        self.topology.set_value(id, value)?;
        Ok(())
    }

    pub fn remove(&mut self, id: &ComponentId) -> Result<()> {
        self.topology.remove_component(id)?;
        Ok(())
    }

    /// Build the netlist and remember the synthetic ids it handed out.
    pub fn build_netlist(&mut self) -> Result<&Netlist> {
        Ok(rebuild(&mut self.topology, &mut self.last_netlist)?)
    }

    /// Build and simulate. `None` falls back to the configured analysis.
    ///
    /// A topology error is returned before any request is made. The reply
    /// replaces the previous one unconditionally.
    pub fn simulate(&mut self, analysis: Option<AnalysisType>, frequency: Option<f64>) -> Result<&SimulationResponse> {
        let analysis = analysis.unwrap_or(self.analysis);
        let frequency = frequency.unwrap_or(self.frequency);
        let netlist = rebuild(&mut self.topology, &mut self.last_netlist)?;
        let response = self.gateway.simulate(netlist, analysis, frequency)?;
        Ok(self.last_response.insert(response))
    }

    pub fn evaluate_parameters(&mut self, request: &ParameterRequest) -> Result<&ParameterResponse> {
        let netlist = rebuild(&mut self.topology, &mut self.last_netlist)?;
        let response = self.gateway.evaluate_parameters(netlist, request)?;
        Ok(self.last_parameters.insert(response))
    }

    /// Have the solver service render the current netlist as SPICE text.
    pub fn render_remote(&mut self) -> Result<String> {
        let netlist = rebuild(&mut self.topology, &mut self.last_netlist)?;
        Ok(self.gateway.render_netlist(netlist, self.topology.values())?)
    }

    pub fn annotator(&self) -> ResultAnnotator<'_> {
        ResultAnnotator::new(&self.topology, self.last_response.as_ref())
    }

    pub fn readout(&self, id: &ComponentId) -> Result<Readout> {
        self.annotator()
            .readout(id)
            .ok_or_else(|| TopologyError::UnknownComponent(id.to_string()).into())
    }
}

fn rebuild<'a>(topology: &mut TopologyStore, slot: &'a mut Option<Netlist>) -> std::result::Result<&'a Netlist, TopologyError> {
    let built = netlist::build(topology.snapshot())?;
    topology.record_build(&built);
    Ok(slot.insert(built))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GatewayError, GridSpiceError};
    use crate::gateway::OfflineTransport;
    use crate::selection::SelectionState;

    fn t(row: u16, col: u16) -> Terminal {
        Terminal::new(row, col)
    }

    fn bench() -> Workbench<OfflineTransport> {
        Workbench::new(&Config::default(), OfflineTransport)
    }

    #[test]
    fn test_clicks_place_component() {
        let mut wb = bench();
        wb.set_kind(ComponentKind::Capacitor);
        let first = wb.click(t(0, 0)).unwrap();
        assert_eq!(first.event, SelectionEvent::Pending);
        assert_eq!(first.placed, None);
        let second = wb.click(t(3, 0)).unwrap();
        assert!(matches!(second.event, SelectionEvent::Completed(_)));
        assert_eq!(second.placed, Some(ComponentId::from("C_0-0_3-0")));
        assert_eq!(wb.topology().len(), 1);
        assert_eq!(wb.topology().components()[0].id.as_str(), "C_0-0_3-0");
    }

    #[test]
    fn test_off_grid_click_rejected_without_state_change() {
        let mut wb = bench();
        wb.click(t(0, 0)).unwrap();
        assert!(matches!(
            wb.click(t(17, 0)),
            Err(GridSpiceError::Topology(TopologyError::OffGrid(..)))
        ));
        assert_eq!(wb.selection().state(), SelectionState::OneSelected(t(0, 0)));
    }

    #[test]
    fn test_ground_uses_selected_terminal() {
        let mut wb = bench();
        assert!(matches!(
            wb.set_ground(None),
            Err(GridSpiceError::Topology(TopologyError::NothingSelected))
        ));
        wb.click(t(2, 2)).unwrap();
        assert_eq!(wb.set_ground(None).unwrap(), t(2, 2));
        assert_eq!(wb.topology().nodes().get(&t(2, 2)), Some(0));
    }

    #[test]
    fn test_deselect_drops_pending_ground() {
        let mut wb = bench();
        wb.click(t(0, 0)).unwrap();
        let r = wb.click(t(0, 1)).unwrap().placed.unwrap();

        wb.click(t(5, 5)).unwrap();
        wb.set_ground(None).unwrap();
        assert_eq!(wb.click(t(5, 5)).unwrap().event, SelectionEvent::Deselected);
        assert!(!wb.topology().nodes().contains(&t(5, 5)));

        wb.remove(&r).unwrap();
        assert!(wb.topology().nodes().is_empty());
        wb.click(t(2, 0)).unwrap();
        wb.click(t(2, 1)).unwrap();
        assert_eq!(wb.build_netlist().unwrap().components[0].nodes(), vec![0, 1]);
    }

    #[test]
    fn test_kind_change_drops_pending_ground() {
        let mut wb = bench();
        wb.click(t(4, 4)).unwrap();
        wb.set_ground(None).unwrap();
        wb.set_kind(ComponentKind::Inductor);
        assert!(wb.topology().nodes().is_empty());
    }

    #[test]
    fn test_offline_simulation_keeps_netlist() {
        let mut wb = bench();
        wb.click(t(0, 0)).unwrap();
        wb.click(t(0, 1)).unwrap();
        assert!(matches!(
            wb.simulate(None, None),
            Err(GridSpiceError::Gateway(GatewayError::Offline))
        ));
        assert_eq!(wb.last_netlist().unwrap().components.len(), 1);
        assert!(wb.last_response().is_none());
        assert!(!wb.gateway().is_busy());
    }
}
