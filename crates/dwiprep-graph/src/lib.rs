//! Processing graphs for preprocessing plans.
//!
//! A graph is a set of [`ProcessingNode`]s (one external step each, with
//! named input and output ports) joined by [`Edge`]s from output ports to
//! input ports. Graphs are assembled with a [`GraphBuilder`], validated on
//! build, and handed to a [`GraphExecutor`].
//!
//! # Features
//!
//! - **Validation**: unresolved ports, doubly fed inputs and cycles are
//!   rejected at build time
//! - **Composition**: built graphs embed into larger ones under a namespace
//! - **Export**: Graphviz DOT and JSON plan documents
//!
//! # Example
//!
//! ```ignore
//! use dwiprep_graph::{GraphBuilder, ProcessingNode, StepKind};
//!
//! let mut builder = GraphBuilder::new("epi_ref_wf");
//! builder
//!     .add_node(ProcessingNode::identity("inputnode", &["in_file"]))
//!     .add_node(ProcessingNode::new("mean", StepKind::new("mrtrix3.MRMath")).input("in_file").output("out_file"))
//!     .connect("inputnode", "in_file", "mean", "in_file");
//! let graph = builder.build()?;
//! ```

mod builder;
mod error;
mod executor;
mod node;
mod pipeline;
mod plan;

// === Error Types ===
pub use error::{
    ExecutorError, GraphCycleError, GraphError, GraphWiringError, PortDirection, Result,
};

// === Nodes ===
pub use node::{PortSpec, ProcessingNode, StepKind};

// === Graphs ===
pub use builder::{Edge, GraphBuilder, PortRef, build_graph};
pub use pipeline::PipelineGraph;

// === Execution ===
pub use executor::{DryRun, ExecutionHandle, GraphExecutor, PlanWriter};
pub use plan::PlanDocument;
