//! `boardmesh simulate`: a chain of in-memory nodes editing one document

use anyhow::{bail, Result};
use mesh_config::MembershipPolicy;
use mesh_sync::{
    Element, ElementSetReconciler, FixedIdentity, MemoryTransport, MeshNode, NodeHandle,
    SyncConfig, Update,
};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, Instant};

const CONVERGENCE_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(20);

type Node = NodeHandle<ElementSetReconciler>;

#[derive(Debug, Serialize)]
struct NodeReport {
    identity: String,
    view: Vec<String>,
    elements: usize,
}

#[derive(Debug, Serialize)]
struct SimulationReport {
    policy: MembershipPolicy,
    peers: usize,
    edits: usize,
    converged: bool,
    nodes: Vec<NodeReport>,
}

pub async fn cmd_simulate(
    peers: usize,
    edits: usize,
    policy: MembershipPolicy,
    json: bool,
) -> Result<()> {
    let transport = Arc::new(MemoryTransport::new());
    let config = SyncConfig {
        membership: policy,
        ..SyncConfig::default()
    };

    let mut nodes: Vec<Node> = Vec::with_capacity(peers);
    for i in 0..peers {
        let node = MeshNode::spawn(
            &config,
            &FixedIdentity::new(format!("peer-{}", i))?,
            transport.clone(),
            ElementSetReconciler::default(),
        )?;
        if let Some(previous) = nodes.last() {
            node.connect_to(previous.identity().clone())?;
        }
        nodes.push(node);
    }
    tracing::info!(peers, %policy, "mesh started");

    for node in &nodes {
        for seq in 0..edits {
            let shape = Element::new(format!("{}/shape-{}", node.identity(), seq))
                .with("author", node.identity().as_str())
                .with("seq", seq as u64);
            node.edit(vec![shape]).await?;
        }
    }

    let converged = wait_for_convergence(&nodes, peers * edits).await?;
    let report = SimulationReport {
        policy,
        peers,
        edits,
        converged,
        nodes: collect_reports(&nodes).await?,
    };

    for node in &nodes {
        node.shutdown().await?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }

    if !converged {
        bail!(
            "mesh did not converge within {}s",
            CONVERGENCE_TIMEOUT.as_secs()
        );
    }
    Ok(())
}

/// Poll until every node sees every peer and all documents are equal
async fn wait_for_convergence(nodes: &[Node], expected_elements: usize) -> Result<bool> {
    let deadline = Instant::now() + CONVERGENCE_TIMEOUT;
    loop {
        if is_converged(nodes, expected_elements).await? {
            return Ok(true);
        }
        if Instant::now() >= deadline {
            tracing::warn!("mesh did not converge before the deadline");
            return Ok(false);
        }
        sleep(POLL_INTERVAL).await;
    }
}

async fn is_converged(nodes: &[Node], expected_elements: usize) -> Result<bool> {
    let mut reference: Option<Update> = None;
    for node in nodes {
        if node.current_view().await?.len() != nodes.len() {
            return Ok(false);
        }

        let state = node.full_state().await?;
        if state.len() != expected_elements {
            return Ok(false);
        }
        match &reference {
            Some(first) if *first != state => return Ok(false),
            Some(_) => {}
            None => reference = Some(state),
        }
    }
    Ok(true)
}

async fn collect_reports(nodes: &[Node]) -> Result<Vec<NodeReport>> {
    let mut reports = Vec::with_capacity(nodes.len());
    for node in nodes {
        let view = node.current_view().await?;
        reports.push(NodeReport {
            identity: node.identity().to_string(),
            view: view.iter().map(|peer| peer.to_string()).collect(),
            elements: node.full_state().await?.len(),
        });
    }
    Ok(reports)
}

fn print_text(report: &SimulationReport) {
    println!(
        "policy: {}  peers: {}  edits per peer: {}",
        report.policy, report.peers, report.edits
    );
    for node in &report.nodes {
        println!(
            "{:<10} view={:<3} elements={}",
            node.identity,
            node.view.len(),
            node.elements
        );
    }
    println!(
        "converged: {}",
        if report.converged { "yes" } else { "no" }
    );
}
