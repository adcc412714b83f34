//! `cellsets` is a crate for working with hierarchical sets of observations
//! (typically cells) that are shared across a set of coordinated views.
//!
//! The crate is organized around three concerns:
//!
//! - Describing sets of observations as trees of named, colored groups.
//! - Turning paths within those trees into concrete lists of observations.
//! - Keeping the analytic views that depend on the current selection up to
//!   date without ever displaying a result for a stale selection.
//!
//! ## Set trees
//!
//! A [`SetTree`] is a forest of [`SetNode`](tree::SetNode)s. Interior nodes
//! group other nodes and leaf nodes carry the identifiers of their members.
//! Nodes are addressed by a [`Path`]: the names of the nodes from a root
//! down to the node itself. Names are compared in a normalized form (trimmed
//! and lowercased) so that `"Leiden/Cluster 1"` and `" leiden/cluster 1"`
//! refer to the same node.
//!
//! Two trees exist side by side. The _canonical_ tree is supplied with a
//! dataset and never changes. The _user-defined_ tree is built up from
//! interactive selections via [`intersection::add_selection()`], which also
//! records how each new selection overlaps the canonical groups.
//!
//! ## Resolving paths
//!
//! The [`Resolver`] turns a path into the observations it denotes by
//! consulting a [`Membership`] index of the canonical tree and then the
//! user-defined tree.
//!
//! ```
//! use cellsets::Membership;
//! use cellsets::Resolver;
//! use cellsets::tree::SetNode;
//! use cellsets::tree::SetTree;
//!
//! let canonical = SetTree::new([SetNode::interior(
//!     "Leiden",
//!     [SetNode::leaf("1", ["a", "b"]), SetNode::leaf("2", ["c"])],
//! )]);
//!
//! let membership = Membership::from_tree(&canonical);
//! let resolver = Resolver::new(Some(&membership), None);
//!
//! assert_eq!(resolver.resolve(&["Leiden", "1"]), vec!["a", "b"]);
//! ```
//!
//! ## Coordinating views
//!
//! Each analytic view (a differential expression volcano plot or an
//! interaction heatmap) is driven by a [`Coordinator`], which tracks a
//! generation counter for the selection. Requests are tagged with the
//! generation they were issued for, and results for any other generation are
//! discarded. A [`Session`] ties the trees, the selection, the colors, and
//! both coordinators together behind a single owner, and talks to an
//! [`AnalysisService`](analysis::AnalysisService) to compute results.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![warn(rust_2021_compatibility)]
#![warn(missing_debug_implementations)]
#![warn(clippy::missing_docs_in_private_items)]
#![warn(rustdoc::broken_intra_doc_links)]

pub mod analysis;
pub mod color;
pub mod coordinator;
pub mod intersection;
pub mod matrix;
pub mod membership;
pub mod path;
pub mod resolve;
pub mod selection;
pub mod session;
pub mod tree;

pub use coordinator::Coordinator;
pub use membership::Membership;
pub use path::Path;
pub use resolve::Resolver;
pub use selection::Selection;
pub use session::Session;
pub use tree::SetTree;
