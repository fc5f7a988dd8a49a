//! Topology-graph derivation.
//!
//! Nodes are the deciders and process managers named across the validated
//! Process specs; edges carry the event or command that connects them. An
//! All trigger becomes a convergence node: its source events converge there
//! and one edge labeled with the correlate field continues to the process.

use serde::Serialize;
use serde_json::json;

use ubispec_schema::Trigger;
use ubispec_verify::ValidatedSet;

use crate::output::ArtifactOutput;

/// What a topology node represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NodeKind {
    Decider,
    Process,
    /// The join point of an All trigger.
    Convergence,
}

/// One node of the topology graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    pub kind: NodeKind,
}

/// One labeled, directed edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub label: String,
}

/// The derived topology graph: an adjacency structure serializable to any
/// graph-description notation.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TopologyGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl TopologyGraph {
    fn add_node(&mut self, id: &str, label: &str, kind: NodeKind) {
        if !self.nodes.iter().any(|n| n.id == id) {
            self.nodes.push(Node {
                id: id.to_string(),
                label: label.to_string(),
                kind,
            });
        }
    }

    fn add_edge(&mut self, from: &str, to: &str, label: &str) {
        let edge = Edge {
            from: from.to_string(),
            to: to.to_string(),
            label: label.to_string(),
        };
        if !self.edges.contains(&edge) {
            self.edges.push(edge);
        }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Edges leaving a node.
    pub fn edges_from<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a Edge> {
        self.edges.iter().filter(move |e| e.from == id)
    }

    pub fn output(&self) -> ArtifactOutput {
        let mut text = String::from("## Topology\n\n");
        for edge in &self.edges {
            text.push_str(&format!("{} --{}--> {}\n", edge.from, edge.label, edge.to));
        }
        let data = json!({
            "artifact": "topology",
            "nodes": self.nodes,
            "edges": self.edges,
        });
        ArtifactOutput { text, data }
    }
}

/// Derive the topology graph across every derivable Process spec.
pub fn topology(set: &ValidatedSet) -> TopologyGraph {
    let mut graph = TopologyGraph::default();

    for spec in set.processes() {
        let process = spec.process.as_str();
        graph.add_node(process, process, NodeKind::Process);

        for decider in spec.reacts_to.iter().chain(&spec.emits_to) {
            graph.add_node(decider.as_str(), decider.as_str(), NodeKind::Decider);
        }

        for (idx, reaction) in spec.reactions.iter().enumerate() {
            match &reaction.when {
                Trigger::All { entries, correlate } => {
                    let join_id = format!("{process}:all:{idx}");
                    graph.add_node(&join_id, &reaction.when.label(), NodeKind::Convergence);
                    for entry in entries {
                        graph.add_node(entry.source.as_str(), entry.source.as_str(), NodeKind::Decider);
                        graph.add_edge(entry.source.as_str(), &join_id, entry.event.as_str());
                    }
                    graph.add_edge(&join_id, process, correlate);
                }
                trigger => {
                    for (event, source) in trigger.event_sources() {
                        graph.add_node(source.as_str(), source.as_str(), NodeKind::Decider);
                        graph.add_edge(source.as_str(), process, event.as_str());
                    }
                }
            }

            for dispatch in &reaction.then {
                graph.add_node(dispatch.target.as_str(), dispatch.target.as_str(), NodeKind::Decider);
                graph.add_edge(process, dispatch.target.as_str(), dispatch.command.as_str());
            }
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::validated_set;

    const ORDER: &str = r#"
ubispec: lifecycle/v1.0
decider: Order
identity: orderId
model: ./m.ts
lifecycle:
  - When: PlaceOrder
    Then: OrderPlaced
    Outcome: [order-is-open]
"#;

    const INVENTORY: &str = r#"
ubispec: lifecycle/v1.0
decider: Inventory
identity: sku
model: ./m.ts
lifecycle:
  - When: ReserveStock
    Then: StockReserved
    Outcome: [stock-is-reserved]
"#;

    const PAYMENT: &str = r#"
ubispec: lifecycle/v1.0
decider: Payment
identity: paymentId
model: ./m.ts
lifecycle:
  - When: CapturePayment
    Then: PaymentCaptured
    Outcome: [payment-is-captured]
"#;

    const SHIPPING: &str = r#"
ubispec: lifecycle/v1.0
decider: Shipping
identity: shipmentId
model: ./m.ts
lifecycle:
  - When: ShipOrder
    Then: OrderShipped
    Outcome: [order-is-shipped]
"#;

    const FULFILLMENT: &str = r#"
ubispec: process/v1.0
process: Fulfillment
reacts_to: [Order, Inventory, Payment]
emits_to: [Inventory, Shipping]
model: ./m.ts
reactions:
  - When: OrderPlaced
    From: Order
    Then: ReserveStock -> Inventory
    Outcome:
      - reservation-requested
  - When:
      all:
        - StockReserved from Inventory
        - PaymentCaptured from Payment
    correlate: orderId
    Then: ShipOrder -> Shipping
    Outcome:
      - shipment-requested
"#;

    fn graph() -> TopologyGraph {
        let set = validated_set(&[ORDER, INVENTORY, PAYMENT, SHIPPING], &[FULFILLMENT]);
        topology(&set)
    }

    #[test]
    fn nodes_cover_deciders_and_processes() {
        let graph = graph();
        assert_eq!(graph.node("Fulfillment").unwrap().kind, NodeKind::Process);
        for decider in ["Order", "Inventory", "Payment", "Shipping"] {
            assert_eq!(graph.node(decider).unwrap().kind, NodeKind::Decider);
        }
    }

    #[test]
    fn scalar_trigger_becomes_one_labeled_edge() {
        let graph = graph();
        assert!(graph
            .edges
            .contains(&Edge {
                from: "Order".into(),
                to: "Fulfillment".into(),
                label: "OrderPlaced".into()
            }));
    }

    #[test]
    fn dispatches_become_command_edges() {
        let graph = graph();
        assert!(graph.edges.contains(&Edge {
            from: "Fulfillment".into(),
            to: "Inventory".into(),
            label: "ReserveStock".into()
        }));
        assert!(graph.edges.contains(&Edge {
            from: "Fulfillment".into(),
            to: "Shipping".into(),
            label: "ShipOrder".into()
        }));
    }

    #[test]
    fn all_trigger_converges_with_correlate_label() {
        let graph = graph();
        let join = graph.node("Fulfillment:all:1").unwrap();
        assert_eq!(join.kind, NodeKind::Convergence);
        assert_eq!(join.label, "all(StockReserved, PaymentCaptured)");

        let into_join: Vec<&Edge> =
            graph.edges.iter().filter(|e| e.to == "Fulfillment:all:1").collect();
        assert_eq!(into_join.len(), 2);

        let out: Vec<&Edge> = graph.edges_from("Fulfillment:all:1").collect();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].label, "orderId");
        assert_eq!(out[0].to, "Fulfillment");
    }

    #[test]
    fn rendering_lists_edges() {
        let graph = graph();
        let output = graph.output();
        assert!(output.text.contains("Order --OrderPlaced--> Fulfillment"));
        assert_eq!(output.data["artifact"], "topology");
    }
}
