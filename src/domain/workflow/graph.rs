//! State machine graph: named nodes, fixed and conditional edges
//!
//! Nodes are registered with [`StateGraph::add_node`], wired with
//! [`StateGraph::add_edge`] or [`StateGraph::add_conditional_edge`], and the
//! builder is validated by [`StateGraph::compile`]. The compiled graph runs a
//! [`WorkflowState`] from the entry node until an edge resolves to
//! [`Target::End`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::error::WorkflowError;
use super::state::WorkflowState;

/// Default ceiling on node executions per invocation
pub const DEFAULT_MAX_STEPS: usize = 64;

/// Identifier of a workflow node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeId {
    StoreQuestion,
    Guardrails,
    Retrieve,
    GradeDocuments,
    Generate,
    ValidateGeneration,
    TransformQuery,
}

impl NodeId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StoreQuestion => "store_question",
            Self::Guardrails => "guardrails",
            Self::Retrieve => "retrieve",
            Self::GradeDocuments => "grade_documents",
            Self::Generate => "generate",
            Self::ValidateGeneration => "validate_gen",
            Self::TransformQuery => "transform_query",
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an edge leads
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Node(NodeId),
    End,
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node(id) => id.fmt(f),
            Self::End => f.write_str("END"),
        }
    }
}

/// Pure routing function evaluated after a node completes
pub type Router = fn(&WorkflowState) -> Target;

/// Outgoing edge of a node
#[derive(Clone)]
pub enum Edge {
    Fixed(Target),
    Conditional { name: &'static str, router: Router },
}

impl Edge {
    fn resolve(&self, state: &WorkflowState) -> Target {
        match self {
            Self::Fixed(target) => *target,
            Self::Conditional { router, .. } => router(state),
        }
    }
}

impl fmt::Debug for Edge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fixed(target) => write!(f, "Fixed({})", target),
            Self::Conditional { name, .. } => write!(f, "Conditional({})", name),
        }
    }
}

/// A unit of work in the graph: takes the state, returns the updated state
#[async_trait]
pub trait WorkflowNode: Send + Sync {
    fn id(&self) -> NodeId;

    async fn run(&self, state: WorkflowState) -> Result<WorkflowState, WorkflowError>;
}

/// Result of one graph invocation
#[derive(Debug, Clone)]
pub struct GraphRun {
    pub state: WorkflowState,
    /// Nodes in execution order
    pub path: Vec<NodeId>,
}

/// Graph builder
pub struct StateGraph {
    nodes: HashMap<NodeId, Arc<dyn WorkflowNode>>,
    edges: HashMap<NodeId, Edge>,
    entry: Option<NodeId>,
    max_steps: usize,
}

impl Default for StateGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl StateGraph {
    pub fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            entry: None,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Register a node under its own id; replaces any node with the same id
    pub fn add_node(&mut self, node: Arc<dyn WorkflowNode>) -> &mut Self {
        self.nodes.insert(node.id(), node);
        self
    }

    pub fn set_entry(&mut self, id: NodeId) -> &mut Self {
        self.entry = Some(id);
        self
    }

    pub fn add_edge(&mut self, from: NodeId, to: Target) -> &mut Self {
        self.edges.insert(from, Edge::Fixed(to));
        self
    }

    pub fn add_conditional_edge(
        &mut self,
        from: NodeId,
        name: &'static str,
        router: Router,
    ) -> &mut Self {
        self.edges.insert(from, Edge::Conditional { name, router });
        self
    }

    pub fn max_steps(&mut self, max_steps: usize) -> &mut Self {
        self.max_steps = max_steps;
        self
    }

    /// Validate the wiring and freeze the graph.
    ///
    /// Every node needs an outgoing edge, every edge source and fixed target
    /// must be registered, and the entry node must exist.
    pub fn compile(self) -> Result<CompiledGraph, WorkflowError> {
        let entry = self
            .entry
            .ok_or_else(|| WorkflowError::compilation("no entry node set"))?;

        if !self.nodes.contains_key(&entry) {
            return Err(WorkflowError::compilation(format!(
                "entry node '{}' is not registered",
                entry
            )));
        }

        if self.max_steps == 0 {
            return Err(WorkflowError::compilation("max_steps must be at least 1"));
        }

        for (from, edge) in &self.edges {
            if !self.nodes.contains_key(from) {
                return Err(WorkflowError::compilation(format!(
                    "edge source '{}' is not registered",
                    from
                )));
            }
            if let Edge::Fixed(Target::Node(to)) = edge {
                if !self.nodes.contains_key(to) {
                    return Err(WorkflowError::compilation(format!(
                        "edge target '{}' is not registered",
                        to
                    )));
                }
            }
        }

        for id in self.nodes.keys() {
            if !self.edges.contains_key(id) {
                return Err(WorkflowError::compilation(format!(
                    "node '{}' has no outgoing edge",
                    id
                )));
            }
        }

        Ok(CompiledGraph {
            nodes: self.nodes,
            edges: self.edges,
            entry,
            max_steps: self.max_steps,
        })
    }
}

/// Immutable, executable graph
pub struct CompiledGraph {
    nodes: HashMap<NodeId, Arc<dyn WorkflowNode>>,
    edges: HashMap<NodeId, Edge>,
    entry: NodeId,
    max_steps: usize,
}

impl fmt::Debug for CompiledGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompiledGraph")
            .field("entry", &self.entry)
            .field("edges", &self.edges)
            .field("max_steps", &self.max_steps)
            .finish()
    }
}

impl CompiledGraph {
    /// Run the state from the entry node to END
    pub async fn invoke(&self, state: WorkflowState) -> Result<GraphRun, WorkflowError> {
        let mut state = state;
        let mut path = Vec::new();
        let mut current = self.entry;

        loop {
            if path.len() >= self.max_steps {
                return Err(WorkflowError::step_limit(self.max_steps));
            }

            // Conditional edges are only checked here
            let node = self.nodes.get(&current).ok_or_else(|| {
                WorkflowError::compilation(format!("node '{}' is not registered", current))
            })?;
            state = node.run(state).await?;
            path.push(current);

            let edge = self.edges.get(&current).ok_or_else(|| {
                WorkflowError::compilation(format!("node '{}' has no outgoing edge", current))
            })?;
            let target = edge.resolve(&state);

            debug!(from = %current, to = %target, "Transition");

            match target {
                Target::End => return Ok(GraphRun { state, path }),
                Target::Node(next) => current = next,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AppendNode {
        id: NodeId,
        suffix: &'static str,
    }

    #[async_trait]
    impl WorkflowNode for AppendNode {
        fn id(&self) -> NodeId {
            self.id
        }

        async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
            state.question.push_str(self.suffix);
            Ok(state)
        }
    }

    struct CountingNode;

    #[async_trait]
    impl WorkflowNode for CountingNode {
        fn id(&self) -> NodeId {
            NodeId::TransformQuery
        }

        async fn run(&self, mut state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
            state.loop_count += 1;
            Ok(state)
        }
    }

    struct FailingNode;

    #[async_trait]
    impl WorkflowNode for FailingNode {
        fn id(&self) -> NodeId {
            NodeId::Generate
        }

        async fn run(&self, _state: WorkflowState) -> Result<WorkflowState, WorkflowError> {
            Err(WorkflowError::node_failed("generate", "boom"))
        }
    }

    fn append(id: NodeId, suffix: &'static str) -> Arc<dyn WorkflowNode> {
        Arc::new(AppendNode { id, suffix })
    }

    #[tokio::test]
    async fn test_linear_graph_runs_in_order() {
        let mut graph = StateGraph::new();
        graph
            .add_node(append(NodeId::StoreQuestion, "a"))
            .add_node(append(NodeId::Retrieve, "b"))
            .set_entry(NodeId::StoreQuestion)
            .add_edge(NodeId::StoreQuestion, Target::Node(NodeId::Retrieve))
            .add_edge(NodeId::Retrieve, Target::End);

        let run = graph
            .compile()
            .unwrap()
            .invoke(WorkflowState::new(">"))
            .await
            .unwrap();

        assert_eq!(run.state.question, ">ab");
        assert_eq!(run.path, vec![NodeId::StoreQuestion, NodeId::Retrieve]);
    }

    #[tokio::test]
    async fn test_conditional_edge_loops_until_router_ends() {
        fn router(state: &WorkflowState) -> Target {
            if state.loop_count < 3 {
                Target::Node(NodeId::TransformQuery)
            } else {
                Target::End
            }
        }

        let mut graph = StateGraph::new();
        graph
            .add_node(Arc::new(CountingNode))
            .set_entry(NodeId::TransformQuery)
            .add_conditional_edge(NodeId::TransformQuery, "loop", router);

        let run = graph
            .compile()
            .unwrap()
            .invoke(WorkflowState::new("q"))
            .await
            .unwrap();

        assert_eq!(run.state.loop_count, 3);
        assert_eq!(run.path.len(), 3);
    }

    #[tokio::test]
    async fn test_step_limit_stops_runaway_loop() {
        fn forever(_: &WorkflowState) -> Target {
            Target::Node(NodeId::TransformQuery)
        }

        let mut graph = StateGraph::new();
        graph
            .add_node(Arc::new(CountingNode))
            .set_entry(NodeId::TransformQuery)
            .add_conditional_edge(NodeId::TransformQuery, "forever", forever)
            .max_steps(5);

        let err = graph
            .compile()
            .unwrap()
            .invoke(WorkflowState::new("q"))
            .await
            .unwrap_err();

        assert_eq!(err, WorkflowError::step_limit(5));
    }

    #[tokio::test]
    async fn test_node_failure_propagates() {
        let mut graph = StateGraph::new();
        graph
            .add_node(Arc::new(FailingNode))
            .set_entry(NodeId::Generate)
            .add_edge(NodeId::Generate, Target::End);

        let err = graph
            .compile()
            .unwrap()
            .invoke(WorkflowState::new("q"))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::NodeFailed { .. }));
    }

    #[tokio::test]
    async fn test_unregistered_conditional_target_fails_at_runtime() {
        fn elsewhere(_: &WorkflowState) -> Target {
            Target::Node(NodeId::Generate)
        }

        let mut graph = StateGraph::new();
        graph
            .add_node(append(NodeId::Retrieve, "x"))
            .set_entry(NodeId::Retrieve)
            .add_conditional_edge(NodeId::Retrieve, "elsewhere", elsewhere);

        let err = graph
            .compile()
            .unwrap()
            .invoke(WorkflowState::new("q"))
            .await
            .unwrap_err();

        assert!(matches!(err, WorkflowError::Compilation(_)));
    }

    #[test]
    fn test_compile_requires_entry() {
        let mut graph = StateGraph::new();
        graph
            .add_node(append(NodeId::Retrieve, "x"))
            .add_edge(NodeId::Retrieve, Target::End);

        assert!(matches!(
            graph.compile(),
            Err(WorkflowError::Compilation(_))
        ));
    }

    #[test]
    fn test_compile_rejects_dangling_fixed_edge() {
        let mut graph = StateGraph::new();
        graph
            .add_node(append(NodeId::Retrieve, "x"))
            .set_entry(NodeId::Retrieve)
            .add_edge(NodeId::Retrieve, Target::Node(NodeId::Generate));

        let err = graph.compile().unwrap_err();
        assert!(err.to_string().contains("generate"));
    }

    #[test]
    fn test_compile_rejects_node_without_edge() {
        let mut graph = StateGraph::new();
        graph
            .add_node(append(NodeId::Retrieve, "x"))
            .add_node(append(NodeId::Generate, "y"))
            .set_entry(NodeId::Retrieve)
            .add_edge(NodeId::Retrieve, Target::Node(NodeId::Generate));

        let err = graph.compile().unwrap_err();
        assert!(err.to_string().contains("no outgoing edge"));
    }

    #[test]
    fn test_node_names() {
        assert_eq!(NodeId::ValidateGeneration.to_string(), "validate_gen");
        assert_eq!(NodeId::GradeDocuments.as_str(), "grade_documents");
        assert_eq!(Target::End.to_string(), "END");
    }
}
