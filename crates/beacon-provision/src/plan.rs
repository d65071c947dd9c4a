//! Provisioning as an explicit dependency graph.
//!
//! Every deployment and wiring transaction is a [`Step`] that names the steps
//! whose results it consumes. Execution order is derived from the graph, so
//! an order that would touch a contract before it exists is rejected before
//! anything reaches the chain.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use beacon_core::error::BeaconError;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StepId {
    // ── Foundations ──────────────────────────────────────────────────────────
    Token,
    TokenGrant,
    Registry,
    // ── Staking ──────────────────────────────────────────────────────────────
    StakingEscrow,
    MinimumStakeSchedule,
    GrantStaking,
    Locks,
    TokenStaking,
    EscrowOwnership,
    // ── Service ──────────────────────────────────────────────────────────────
    ServiceImpl,
    ServiceProxy,
    // ── Operator ─────────────────────────────────────────────────────────────
    Bls,
    GroupSelection,
    Groups,
    DelayFactor,
    DkgResultVerification,
    Reimbursements,
    Operator,
    // ── Wiring ───────────────────────────────────────────────────────────────
    ApproveOperator,
    OperatorUpgrader,
    RegisterOperator,
    Genesis,
}

impl StepId {
    pub fn name(self) -> &'static str {
        match self {
            StepId::Token => "token",
            StepId::TokenGrant => "tokenGrant",
            StepId::Registry => "registry",
            StepId::StakingEscrow => "stakingEscrow",
            StepId::MinimumStakeSchedule => "minimumStakeSchedule",
            StepId::GrantStaking => "grantStaking",
            StepId::Locks => "locks",
            StepId::TokenStaking => "tokenStaking",
            StepId::EscrowOwnership => "escrowOwnership",
            StepId::ServiceImpl => "serviceImpl",
            StepId::ServiceProxy => "serviceProxy",
            StepId::Bls => "bls",
            StepId::GroupSelection => "groupSelection",
            StepId::Groups => "groups",
            StepId::DelayFactor => "delayFactor",
            StepId::DkgResultVerification => "dkgResultVerification",
            StepId::Reimbursements => "reimbursements",
            StepId::Operator => "operator",
            StepId::ApproveOperator => "approveOperator",
            StepId::OperatorUpgrader => "operatorUpgrader",
            StepId::RegisterOperator => "registerOperator",
            StepId::Genesis => "genesis",
        }
    }

    /// Steps whose results this step consumes.
    pub fn dependencies(self) -> &'static [StepId] {
        use StepId::*;
        match self {
            Token | Registry | ServiceImpl => &[],
            TokenGrant => &[Token],
            StakingEscrow => &[Token, TokenGrant],
            MinimumStakeSchedule | GrantStaking | Locks => &[],
            TokenStaking => &[
                Token,
                TokenGrant,
                StakingEscrow,
                Registry,
                MinimumStakeSchedule,
                GrantStaking,
                Locks,
            ],
            EscrowOwnership => &[StakingEscrow, TokenStaking],
            ServiceProxy => &[ServiceImpl, Registry],
            Bls | GroupSelection | DelayFactor | DkgResultVerification | Reimbursements => &[],
            Groups => &[Bls],
            Operator => &[
                ServiceProxy,
                TokenStaking,
                Registry,
                Bls,
                GroupSelection,
                Groups,
                DelayFactor,
                DkgResultVerification,
                Reimbursements,
            ],
            ApproveOperator => &[Registry, Operator],
            OperatorUpgrader => &[Registry, ServiceProxy],
            RegisterOperator => &[ServiceProxy, Operator, ApproveOperator, OperatorUpgrader],
            Genesis => &[Operator, RegisterOperator],
        }
    }

    /// Library artifact deployed by this step, if it deploys one.
    pub fn library_name(self) -> Option<&'static str> {
        match self {
            StepId::MinimumStakeSchedule => Some("MinimumStakeSchedule"),
            StepId::GrantStaking => Some("GrantStaking"),
            StepId::Locks => Some("Locks"),
            StepId::Bls => Some("BLS"),
            StepId::GroupSelection => Some("GroupSelection"),
            StepId::Groups => Some("Groups"),
            StepId::DelayFactor => Some("DelayFactor"),
            StepId::DkgResultVerification => Some("DKGResultVerification"),
            StepId::Reimbursements => Some("Reimbursements"),
            _ => None,
        }
    }

    /// Whether the step deploys a contract (as opposed to calling one).
    pub fn is_deployment(self) -> bool {
        !matches!(
            self,
            StepId::EscrowOwnership
                | StepId::ApproveOperator
                | StepId::OperatorUpgrader
                | StepId::RegisterOperator
                | StepId::Genesis
        )
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Step {
    pub id: StepId,
    pub depends_on: Vec<StepId>,
}

impl Step {
    pub fn new(id: StepId) -> Self {
        Self {
            id,
            depends_on: id.dependencies().to_vec(),
        }
    }
}

/// A set of steps plus the inputs supplied from outside the plan.
#[derive(Clone, Debug, Default)]
pub struct Plan {
    steps: Vec<Step>,
    external: BTreeSet<StepId>,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step with its standard dependencies.
    pub fn step(mut self, id: StepId) -> Self {
        self.steps.push(Step::new(id));
        self
    }

    /// Append a step with explicit dependencies.
    pub fn custom_step(mut self, id: StepId, depends_on: Vec<StepId>) -> Self {
        self.steps.push(Step { id, depends_on });
        self
    }

    /// Declare a result supplied by the caller rather than produced here.
    pub fn external(mut self, id: StepId) -> Self {
        self.external.insert(id);
        self
    }

    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    pub fn externals(&self) -> impl Iterator<Item = StepId> + '_ {
        self.external.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The full system, declared in the order the contracts are introduced.
    pub fn standard() -> Self {
        use StepId::*;
        [
            Token,
            TokenGrant,
            Registry,
            StakingEscrow,
            MinimumStakeSchedule,
            GrantStaking,
            Locks,
            TokenStaking,
            EscrowOwnership,
            ServiceImpl,
            ServiceProxy,
            Bls,
            GroupSelection,
            Groups,
            DelayFactor,
            DkgResultVerification,
            Reimbursements,
            Operator,
            ApproveOperator,
            OperatorUpgrader,
            RegisterOperator,
            Genesis,
        ]
        .into_iter()
        .fold(Plan::new(), Plan::step)
    }

    /// The staking phase alone. Token, grant ledger and registry come from
    /// the caller.
    pub fn staking() -> Self {
        use StepId::*;
        [
            StakingEscrow,
            MinimumStakeSchedule,
            GrantStaking,
            Locks,
            TokenStaking,
            EscrowOwnership,
        ]
        .into_iter()
        .fold(Plan::new(), Plan::step)
        .external(Token)
        .external(TokenGrant)
        .external(Registry)
    }

    /// The plan as a graph with an edge from each dependency to its
    /// dependent. Node indices follow declaration order.
    pub fn graph(&self) -> Result<DiGraph<StepId, ()>, BeaconError> {
        let mut graph = DiGraph::with_capacity(self.steps.len(), self.steps.len());
        let mut nodes = BTreeMap::new();
        for step in &self.steps {
            let node = graph.add_node(step.id);
            if nodes.insert(step.id, node).is_some() {
                return Err(BeaconError::DuplicateStep(step.id.to_string()));
            }
        }
        for (i, step) in self.steps.iter().enumerate() {
            for dep in &step.depends_on {
                if self.external.contains(dep) {
                    continue;
                }
                let Some(&from) = nodes.get(dep) else {
                    return Err(BeaconError::MissingInput {
                        step: step.id.to_string(),
                        input: dep.to_string(),
                    });
                };
                graph.add_edge(from, NodeIndex::new(i), ());
            }
        }
        Ok(graph)
    }

    /// Kahn's algorithm. Among ready steps the earliest declared runs first,
    /// so a plan declared in a valid order executes in exactly that order.
    pub fn topological_order(&self) -> Result<Vec<StepId>, BeaconError> {
        let graph = self.graph()?;
        let mut indegree: Vec<usize> = graph
            .node_indices()
            .map(|n| graph.neighbors_directed(n, Direction::Incoming).count())
            .collect();

        let mut ready: BTreeSet<NodeIndex> = graph
            .node_indices()
            .filter(|n| indegree[n.index()] == 0)
            .collect();
        let mut order = Vec::with_capacity(graph.node_count());
        while let Some(n) = ready.pop_first() {
            order.push(graph[n]);
            for k in graph.neighbors_directed(n, Direction::Outgoing) {
                indegree[k.index()] -= 1;
                if indegree[k.index()] == 0 {
                    ready.insert(k);
                }
            }
        }

        if order.len() != graph.node_count() {
            let stuck: Vec<&str> = graph
                .node_indices()
                .filter(|n| indegree[n.index()] > 0)
                .map(|n| graph[n].name())
                .collect();
            return Err(BeaconError::CyclicPlan(stuck.join(", ")));
        }
        Ok(order)
    }

    /// Reject `order` if it runs a step before one of its dependencies, runs
    /// a step twice, or names a step outside the plan.
    pub fn validate_order(&self, order: &[StepId]) -> Result<(), BeaconError> {
        let steps: BTreeMap<StepId, &Step> = self.steps.iter().map(|s| (s.id, s)).collect();
        let mut done: BTreeSet<StepId> = self.external.clone();
        for id in order {
            let step = steps
                .get(id)
                .ok_or_else(|| BeaconError::Other(format!("step {id} is not part of the plan")))?;
            if let Some(dep) = step.depends_on.iter().find(|d| !done.contains(d)) {
                return Err(BeaconError::MissingInput {
                    step: id.to_string(),
                    input: dep.to_string(),
                });
            }
            if !done.insert(*id) {
                return Err(BeaconError::DuplicateStep(id.to_string()));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_order_is_declaration_order() {
        let plan = Plan::standard();
        let order = plan.topological_order().unwrap();
        let declared: Vec<StepId> = plan.steps().iter().map(|s| s.id).collect();
        assert_eq!(order, declared);
        assert_eq!(order.len(), 22);
        plan.validate_order(&order).unwrap();
    }

    #[test]
    fn order_respects_dependencies_regardless_of_declaration() {
        let plan = Plan::new()
            .step(StepId::Genesis)
            .step(StepId::Groups)
            .step(StepId::Bls)
            .custom_step(StepId::Operator, vec![StepId::Groups])
            .custom_step(StepId::RegisterOperator, vec![StepId::Operator]);
        let order = plan.topological_order().unwrap();
        assert_eq!(
            order,
            vec![
                StepId::Bls,
                StepId::Groups,
                StepId::Operator,
                StepId::RegisterOperator,
                StepId::Genesis
            ]
        );
    }

    #[test]
    fn staking_plan_needs_its_externals() {
        assert!(Plan::staking().topological_order().is_ok());

        let plan = Plan::new().step(StepId::StakingEscrow);
        assert!(matches!(
            plan.topological_order(),
            Err(BeaconError::MissingInput { ref input, .. }) if input == "token"
        ));
    }

    #[test]
    fn graph_skips_externals() {
        use StepId::*;
        let graph = Plan::staking().graph().unwrap();
        assert_eq!(graph.node_count(), 6);
        let staking = graph
            .node_indices()
            .find(|n| graph[*n] == TokenStaking)
            .unwrap();
        let inputs: BTreeSet<StepId> = graph
            .neighbors_directed(staking, Direction::Incoming)
            .map(|n| graph[n])
            .collect();
        assert_eq!(
            inputs,
            BTreeSet::from([StakingEscrow, MinimumStakeSchedule, GrantStaking, Locks])
        );
    }

    #[test]
    fn cycle_is_reported() {
        let plan = Plan::new()
            .custom_step(StepId::Bls, vec![StepId::Groups])
            .custom_step(StepId::Groups, vec![StepId::Bls])
            .step(StepId::Token);
        match plan.topological_order() {
            Err(BeaconError::CyclicPlan(stuck)) => assert_eq!(stuck, "bls, groups"),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn duplicate_step_is_rejected() {
        let plan = Plan::new().step(StepId::Token).step(StepId::Token);
        assert!(matches!(plan.topological_order(), Err(BeaconError::DuplicateStep(_))));
    }

    #[test]
    fn ownership_transfer_before_staking_is_rejected() {
        let plan = Plan::staking();
        let order = [
            StepId::StakingEscrow,
            StepId::EscrowOwnership,
            StepId::MinimumStakeSchedule,
        ];
        match plan.validate_order(&order) {
            Err(BeaconError::MissingInput { step, input }) => {
                assert_eq!(step, "escrowOwnership");
                assert_eq!(input, "tokenStaking");
            }
            other => panic!("expected missing input, got {other:?}"),
        }
    }

    #[test]
    fn step_ids_serialize_by_name() {
        for id in Plan::standard().steps().iter().map(|s| s.id) {
            let json = serde_json::to_string(&id).unwrap();
            assert_eq!(json, format!("\"{}\"", id.name()));
        }
    }
}
