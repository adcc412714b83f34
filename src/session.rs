//! A single-owner store for everything a set of linked views shares.
//!
//! A [`Session`] owns the dataset snapshot, the user-defined tree, the
//! selection, the color table, and a [`Coordinator`] for each analytic view.
//! All mutation goes through the session's methods, each of which bumps the
//! selection generation of the views it can affect. Reads hand out snapshots
//! rather than live references, so an in-flight recomputation never observes
//! a half-applied change.
//!
//! Recomputation happens in two phases. A `dispatch_*` method snapshots the
//! current selection and returns the request to send along with a ticket. The
//! caller sends the request however it likes and hands the response back to
//! the matching `complete_*` method, which renders it only if the selection
//! has not changed in the meantime. The `refresh_*` methods do both in one
//! step using the session's own [`AnalysisService`].
//!
//! ```
//! use cellsets::analysis::Config;
//! use cellsets::analysis::HttpService;
//! use cellsets::coordinator::Rendered;
//! use cellsets::path::Path;
//! use cellsets::session::Dataset;
//! use cellsets::session::Session;
//! use cellsets::tree::SetNode;
//! use cellsets::tree::SetTree;
//!
//! let obs_sets = SetTree::new([SetNode::interior(
//!     "Leiden",
//!     [SetNode::leaf("1", ["a", "b"]), SetNode::leaf("2", ["c"])],
//! )]);
//!
//! let service = HttpService::try_new(Config::default())?;
//! let mut session = Session::new(service, Dataset::new(obs_sets));
//!
//! let selection = session.add_selection(None, ["b", "c"], None);
//! assert_eq!(session.resolve(&selection), vec!["b", "c"]);
//!
//! session.select([Path::try_new(["Leiden", "1"])?]);
//!
//! // A comparison needs exactly two groups, so the view prompts for more.
//! assert!(session.dispatch_deg().is_none());
//! assert_eq!(session.deg(), &Rendered::Prompt);
//!
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use tracing::debug;
use tracing::info;

use crate::analysis;
use crate::analysis::AnalysisService;
use crate::analysis::DegRecord;
use crate::analysis::DegRequest;
use crate::analysis::InteractionRequest;
use crate::analysis::deg::Volcano;
use crate::analysis::interaction::Heatmap;
use crate::color;
use crate::color::Color;
use crate::color::Theme;
use crate::coordinator::Arity;
use crate::coordinator::Coordinator;
use crate::coordinator::Outcome;
use crate::coordinator::Rendered;
use crate::coordinator::Ticket;
use crate::intersection;
use crate::matrix::ObsFeatureMatrix;
use crate::matrix::ObsLocations;
use crate::membership::Membership;
use crate::path::Path;
use crate::resolve::Resolver;
use crate::selection::Partition;
use crate::selection::Selection;
use crate::tree;
use crate::tree::ObsId;
use crate::tree::SetNode;
use crate::tree::SetTree;
use crate::tree::algebra;

/// A [`Result`](std::result::Result) with a [`tree::Error`].
type Result<T> = std::result::Result<T, tree::Error>;

////////////////////////////////////////////////////////////////////////////////////////
// Dataset
////////////////////////////////////////////////////////////////////////////////////////

/// The read-only data supplied with a dataset.
#[derive(Clone, Debug, Default)]
pub struct Dataset {
    /// The canonical set tree.
    obs_sets: SetTree,

    /// The observation by feature matrix, if one was loaded.
    matrix: Option<ObsFeatureMatrix>,

    /// The observation centroids, if they were loaded.
    locations: Option<ObsLocations>,
}

impl Dataset {
    /// Creates a dataset from its canonical set tree.
    pub fn new(obs_sets: SetTree) -> Self {
        Self {
            obs_sets,
            ..Default::default()
        }
    }

    /// Sets the observation by feature matrix.
    pub fn with_matrix(mut self, matrix: ObsFeatureMatrix) -> Self {
        self.matrix = Some(matrix);
        self
    }

    /// Sets the observation centroids.
    pub fn with_locations(mut self, locations: ObsLocations) -> Self {
        self.locations = Some(locations);
        self
    }

    /// Gets the canonical set tree as supplied.
    pub fn obs_sets(&self) -> &SetTree {
        &self.obs_sets
    }

    /// Gets the observation by feature matrix.
    pub fn matrix(&self) -> Option<&ObsFeatureMatrix> {
        self.matrix.as_ref()
    }

    /// Gets the observation centroids.
    pub fn locations(&self) -> Option<&ObsLocations> {
        self.locations.as_ref()
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Dispatches
////////////////////////////////////////////////////////////////////////////////////////

/// A set operation over the sets denoted by the checked paths.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SetOperation {
    /// Observations in any checked set.
    Union,

    /// Observations in every checked set.
    Intersection,

    /// Canonical observations in no checked set.
    Complement,
}

/// A comparison that has been issued but not yet completed.
#[derive(Debug)]
pub struct DegDispatch {
    /// The ticket for the issuing generation.
    ticket: Ticket,

    /// The request to send.
    request: DegRequest,

    /// The two groups being compared.
    groups: [Path; 2],

    /// The features to highlight in the result.
    highlighted: Vec<String>,
}

impl DegDispatch {
    /// Gets the request to send.
    pub fn request(&self) -> &DegRequest {
        &self.request
    }

    /// Gets the generation the request was issued for.
    pub fn generation(&self) -> u64 {
        self.ticket.generation()
    }
}

/// An interaction scoring that has been issued but not yet completed.
#[derive(Debug)]
pub struct InteractionDispatch {
    /// The ticket for the issuing generation.
    ticket: Ticket,

    /// The request to send.
    request: InteractionRequest,
}

impl InteractionDispatch {
    /// Gets the request to send.
    pub fn request(&self) -> &InteractionRequest {
        &self.request
    }

    /// Gets the generation the request was issued for.
    pub fn generation(&self) -> u64 {
        self.ticket.generation()
    }
}

////////////////////////////////////////////////////////////////////////////////////////
// Session
////////////////////////////////////////////////////////////////////////////////////////

/// The shared state of a set of linked views.
#[derive(Debug)]
pub struct Session<S> {
    /// The analysis service.
    service: S,

    /// The theme.
    theme: Theme,

    /// The dataset snapshot.
    dataset: Dataset,

    /// The membership index of the canonical tree.
    membership: Membership,

    /// The user-defined tree.
    user: SetTree,

    /// The selection.
    selection: Selection,

    /// The color assigned to each path.
    colors: color::Table,

    /// The selected features.
    feature_selection: Vec<String>,

    /// The feature under the pointer, if any.
    feature_highlight: Option<String>,

    /// The coordinator for the differential expression view.
    deg: Coordinator<Volcano>,

    /// The coordinator for the interaction view.
    interaction: Coordinator<Heatmap>,
}

impl<S> Session<S>
where
    S: AnalysisService,
{
    /// Creates a new session over a dataset using the light theme.
    pub fn new(service: S, dataset: Dataset) -> Self {
        let mut session = Self {
            service,
            theme: Theme::default(),
            dataset: Dataset::default(),
            membership: Membership::default(),
            user: SetTree::default(),
            selection: Selection::new(),
            colors: color::Table::new(),
            feature_selection: Vec::new(),
            feature_highlight: None,
            deg: Coordinator::new(Arity::Exactly(2)),
            interaction: Coordinator::new(Arity::AtLeast(2)),
        };

        session.load(dataset);
        session
    }

    /// Sets the theme.
    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// Gets the analysis service.
    pub fn service(&self) -> &S {
        &self.service
    }

    /// Gets the theme.
    pub fn theme(&self) -> Theme {
        self.theme
    }

    /// Gets the dataset snapshot.
    pub fn dataset(&self) -> &Dataset {
        &self.dataset
    }

    /// Gets the membership index of the canonical tree.
    pub fn membership(&self) -> &Membership {
        &self.membership
    }

    /// Gets the selection.
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Gets the color table.
    pub fn colors(&self) -> &color::Table {
        &self.colors
    }

    /// Gets what the differential expression view is displaying.
    pub fn deg(&self) -> &Rendered<Volcano> {
        self.deg.rendered()
    }

    /// Gets what the interaction view is displaying.
    pub fn interaction(&self) -> &Rendered<Heatmap> {
        self.interaction.rendered()
    }

    /// Gets the selection generation of the differential expression view.
    pub fn deg_generation(&self) -> u64 {
        self.deg.generation()
    }

    /// Gets the selection generation of the interaction view.
    pub fn interaction_generation(&self) -> u64 {
        self.interaction.generation()
    }

    ////////////////////////////////////////////////////////////////////////////////////
    // Mutation
    ////////////////////////////////////////////////////////////////////////////////////

    /// Replaces the dataset, discarding everything derived from the previous
    /// one.
    ///
    /// Any request in flight is invalidated.
    pub fn reset(&mut self, dataset: Dataset) {
        info!("resetting session for a new dataset");

        self.user = SetTree::default();
        self.selection.clear();
        self.colors.clear();
        self.feature_selection.clear();
        self.feature_highlight = None;
        self.deg.reset();
        self.interaction.reset();
        self.load(dataset);
    }

    /// Installs a dataset and the state derived from it.
    fn load(&mut self, dataset: Dataset) {
        self.membership = Membership::from_tree(dataset.obs_sets());

        for (path, node) in dataset.obs_sets().nodes() {
            if let Some(color) = node.color() {
                self.colors.insert(path, color);
            }
        }

        self.dataset = dataset;
    }

    /// Replaces the user-defined tree with one saved from an earlier session.
    ///
    /// Leaves that do not already have an entry in the color table are given
    /// their own color or the theme's default.
    pub fn restore(&mut self, user: SetTree) {
        debug!("restoring {} user-defined root(s)", user.roots().len());

        self.user = user;
        self.populate_colors();
        self.tree_changed();
    }

    /// Replaces the selected paths.
    pub fn select(&mut self, paths: impl IntoIterator<Item = Path>) {
        if self.selection.select(paths) {
            self.deg.selection_changed();
            self.interaction.selection_changed();
        }
    }

    /// Replaces the checked paths.
    pub fn check(&mut self, paths: impl IntoIterator<Item = Path>) {
        self.selection.check(paths);
    }

    /// Replaces the expanded paths.
    pub fn expand(&mut self, paths: impl IntoIterator<Item = Path>) {
        self.selection.expand(paths);
    }

    /// Sets the selected features and the feature under the pointer.
    pub fn set_feature_selection(
        &mut self,
        features: impl IntoIterator<Item = String>,
        highlight: Option<String>,
    ) {
        self.feature_selection = features.into_iter().collect();
        self.feature_highlight = highlight;
        self.deg.selection_changed();
    }

    /// Adds a new selection to the user-defined tree, returning its path.
    ///
    /// The new selection is intersected with the canonical groups (see
    /// [`intersection::add_selection()`]) and every new leaf is given an
    /// entry in the color table.
    pub fn add_selection<I, M>(
        &mut self,
        name: Option<String>,
        members: I,
        color: Option<Color>,
    ) -> Path
    where
        I: IntoIterator<Item = M>,
        M: Into<tree::Member>,
    {
        let canonical = self.canonical_tree();
        let path =
            intersection::add_selection(&mut self.user, canonical.roots(), name, members, color);

        debug!("added selection at {path}");

        // Entries left behind by an earlier node at the same path must not win
        // over the colors the new node was created with.
        let fresh = self
            .user
            .node(&path)
            .map(|node| {
                std::iter::once((path.clone(), node.color()))
                    .chain(
                        node.children()
                            .iter()
                            .map(|child| (path.child(child.name()), child.color())),
                    )
                    .filter_map(|(path, color)| color.map(|color| (path, color)))
                    .collect::<Vec<_>>()
            })
            .unwrap_or_default();

        for (path, color) in fresh {
            self.colors.assign(path, color);
        }

        self.populate_colors();
        self.tree_changed();
        path
    }

    /// Applies `operation` to the checked sets and saves the result as a new
    /// selection, returning its path.
    pub fn save_checked(&mut self, operation: SetOperation, name: Option<String>) -> Path {
        let members = self.apply(operation);
        self.add_selection(name, members, None)
    }

    /// Renames the user-defined node at `path`, returning its new path.
    pub fn rename(&mut self, path: &Path, name: impl Into<String>) -> Result<Path> {
        let renamed = self.user.rename(path, name)?;

        let moved = self
            .colors
            .iter()
            .filter_map(|entry| {
                entry
                    .path
                    .rebase(path, &renamed)
                    .map(|rebased| (rebased, entry.color))
            })
            .collect::<Vec<_>>();

        for (path, color) in moved {
            self.colors.assign(path, color);
        }

        self.selection.rename(path, &renamed);
        self.populate_colors();
        self.tree_changed();

        Ok(renamed)
    }

    /// Removes the user-defined node at `path`.
    pub fn remove(&mut self, path: &Path) -> Result<SetNode> {
        let node = self
            .user
            .remove(path)
            .ok_or_else(|| tree::Error::NotFound(path.clone()))?;

        self.selection.forget(path);
        self.tree_changed();

        Ok(node)
    }

    /// Assigns a color to the node at `path` in either tree.
    pub fn recolor(&mut self, path: &Path, color: Color) -> Result<()> {
        match self.user.node(path) {
            Some(_) => self.user.recolor(path, color)?,
            None if self.dataset.obs_sets().node(path).is_some() => {}
            None => return Err(tree::Error::NotFound(path.clone())),
        }

        self.colors.assign(path.clone(), color);
        self.interaction.selection_changed();

        Ok(())
    }

    /// Appends an entry to the color table for every user-defined leaf that
    /// does not already have one.
    fn populate_colors(&mut self) {
        let default = self.theme.default_color();

        for (path, node) in self.user.nodes() {
            if node.is_leaf() {
                self.colors.insert(path, node.color().unwrap_or(default));
            }
        }
    }

    /// Records a change to the user-defined tree, which can change what the
    /// selected paths resolve to.
    fn tree_changed(&mut self) {
        self.deg.selection_changed();
        self.interaction.selection_changed();
    }

    ////////////////////////////////////////////////////////////////////////////////////
    // Snapshots
    ////////////////////////////////////////////////////////////////////////////////////

    /// Gets the canonical tree with every node colored.
    pub fn canonical_tree(&self) -> SetTree {
        self.dataset.obs_sets().with_colors(&self.colors, self.theme)
    }

    /// Gets the user-defined tree with every node colored.
    pub fn user_tree(&self) -> SetTree {
        self.user.with_colors(&self.colors, self.theme)
    }

    /// Gets the selection split between the canonical and user-defined trees.
    pub fn partition(&self) -> Partition {
        self.selection.partition(&self.user)
    }

    /// Gets a resolver over the current trees.
    pub fn resolver(&self) -> Resolver<'_> {
        Resolver::new(Some(&self.membership), Some(&self.user))
    }

    /// Resolves `path` to observation identifiers.
    pub fn resolve(&self, path: &Path) -> Vec<ObsId> {
        self.resolver().resolve_path(path)
    }

    /// Applies `operation` to the sets denoted by the checked paths.
    pub fn apply(&self, operation: SetOperation) -> Vec<ObsId> {
        let sets = self.resolver().resolve_all(self.selection.checked());

        match operation {
            SetOperation::Union => algebra::union(&sets),
            SetOperation::Intersection => algebra::intersection(&sets),
            SetOperation::Complement => {
                let universe = self.membership.observations().collect::<Vec<_>>();
                algebra::complement(&sets, &universe)
            }
        }
    }

    ////////////////////////////////////////////////////////////////////////////////////
    // Differential expression
    ////////////////////////////////////////////////////////////////////////////////////

    /// Issues a comparison for the current selection.
    ///
    /// Returns `None` (and renders a prompt) unless exactly two groups are
    /// selected and both have at least one row in the matrix.
    pub fn dispatch_deg(&mut self) -> Option<DegDispatch> {
        let selected = self.selection.selected();
        let sets = self.resolver().resolve_all(selected);

        let (request, groups) = match (self.dataset.matrix(), selected) {
            (Some(matrix), [a, b]) => (
                DegRequest::from_groups(matrix, &sets[0], &sets[1]),
                [a.clone(), b.clone()],
            ),
            _ => {
                self.deg.issue(&[]);
                return None;
            }
        };

        let ticket = self
            .deg
            .issue(&[request.group1.len(), request.group2.len()])?;

        let mut highlighted = self.feature_selection.clone();
        highlighted.extend(self.feature_highlight.clone());

        Some(DegDispatch {
            ticket,
            request,
            groups,
            highlighted,
        })
    }

    /// Hands back the records for a dispatched comparison.
    pub fn complete_deg(&mut self, dispatch: DegDispatch, records: Vec<DegRecord>) -> Outcome {
        let [a, b] = &dispatch.groups;
        let volcano = Volcano::new(records, [a, b], &dispatch.highlighted);
        self.deg.complete(dispatch.ticket, volcano)
    }

    /// Recomputes the comparison for the current selection.
    pub async fn refresh_deg(&mut self) -> &Rendered<Volcano> {
        while let Some(dispatch) = self.dispatch_deg() {
            let records = analysis::request_comparison(&self.service, dispatch.request()).await;

            match self.complete_deg(dispatch, records) {
                Outcome::Discarded { refire: true } => continue,
                _ => break,
            }
        }

        self.deg.rendered()
    }

    ////////////////////////////////////////////////////////////////////////////////////
    // Interaction
    ////////////////////////////////////////////////////////////////////////////////////

    /// Issues interaction scoring for the current selection.
    ///
    /// Returns `None` (and renders a prompt) unless at least two distinct
    /// groups have located observations.
    pub fn dispatch_interaction(&mut self) -> Option<InteractionDispatch> {
        let selected = self.selection.selected();
        let sets = self.resolver().resolve_all(selected);

        let request = match self.dataset.locations() {
            Some(locations) => {
                let groups = selected.iter().cloned().zip(sets).collect::<Vec<_>>();
                InteractionRequest::from_groups(locations, &groups, &self.colors)
            }
            None => {
                self.interaction.issue(&[]);
                return None;
            }
        };

        let sizes = request
            .labels()
            .iter()
            .map(|label| request.cell_type.iter().filter(|l| l.as_str() == *label).count())
            .collect::<Vec<_>>();

        let ticket = self.interaction.issue(&sizes)?;
        Some(InteractionDispatch { ticket, request })
    }

    /// Hands back the scores for a dispatched interaction scoring.
    pub fn complete_interaction(
        &mut self,
        dispatch: InteractionDispatch,
        matrix: Vec<Vec<f64>>,
    ) -> Outcome {
        let heatmap = Heatmap::new(&dispatch.request, &matrix);
        self.interaction.complete(dispatch.ticket, heatmap)
    }

    /// Recomputes the interaction scores for the current selection.
    pub async fn refresh_interaction(&mut self) -> &Rendered<Heatmap> {
        while let Some(dispatch) = self.dispatch_interaction() {
            let matrix =
                analysis::request_interaction_scores(&self.service, dispatch.request()).await;

            match self.complete_interaction(dispatch, matrix) {
                Outcome::Discarded { refire: true } => continue,
                _ => break,
            }
        }

        self.interaction.rendered()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use async_trait::async_trait;
    use tokio::sync::mpsc;

    use super::*;
    use crate::analysis::tests::FixedService;
    use crate::analysis::tests::record;

    fn obs_sets() -> SetTree {
        SetTree::new([SetNode::interior(
            "Leiden",
            [
                SetNode::leaf("1", ["a", "b"]).with_color(Color::new(255, 0, 0)),
                SetNode::leaf("2", ["c", "d"]).with_color(Color::new(0, 0, 255)),
                SetNode::leaf("3", ["e"]),
            ],
        )])
    }

    fn matrix() -> ObsFeatureMatrix {
        ObsFeatureMatrix::try_new(
            ["a", "b", "c", "d", "e"].iter().map(|s| s.to_string()).collect(),
            vec![String::from("CD3E"), String::from("MS4A1")],
            vec![1.0, 0.0, 1.0, 0.0, 0.0, 1.0, 0.0, 1.0, 0.5, 0.5],
        )
        .unwrap()
    }

    fn locations() -> ObsLocations {
        ObsLocations::try_new(
            ["a", "b", "c", "d"].iter().map(|s| s.to_string()).collect(),
            vec![0.0, 1.0, 2.0, 3.0],
            vec![0.0, 1.0, 2.0, 3.0],
        )
        .unwrap()
    }

    fn dataset() -> Dataset {
        Dataset::new(obs_sets())
            .with_matrix(matrix())
            .with_locations(locations())
    }

    fn path(s: &str) -> Path {
        s.parse().unwrap()
    }

    #[test]
    fn dataset_colors_seed_the_table() {
        let session = Session::new(FixedService::default(), dataset());
        let tree = session.canonical_tree();
        let root = &tree.roots()[0];

        assert_eq!(root.color(), Some(Theme::Light.default_color()));
        assert_eq!(root.children()[0].color(), Some(Color::new(255, 0, 0)));
        assert_eq!(
            root.children()[2].color(),
            Some(Theme::Light.default_color())
        );
    }

    #[test]
    fn new_selections_are_intersected_and_colored() {
        let mut session =
            Session::new(FixedService::default(), dataset()).with_theme(Theme::Dark);

        let selection = session.add_selection(None, ["b", "c"], None);
        let tree = session.user_tree();
        let node = tree.node(&selection).unwrap();

        let derived = node
            .children()
            .iter()
            .map(|child| (child.name().to_string(), child.color()))
            .collect::<Vec<_>>();

        assert_eq!(
            derived,
            vec![
                (
                    String::from("Intersection with 1"),
                    Some(Color::new(255, 0, 0))
                ),
                (
                    String::from("Intersection with 2"),
                    Some(Color::new(0, 0, 255))
                ),
            ]
        );
        assert_eq!(node.color(), Some(Theme::Dark.default_color()));
        assert_eq!(
            session.colors().get(&selection.child("Intersection with 2")),
            Some(Color::new(0, 0, 255))
        );
    }

    #[test]
    fn explicit_colors_replace_those_of_removed_nodes() {
        let red = Color::new(255, 0, 0);
        let blue = Color::new(0, 0, 255);
        let mut session = Session::new(FixedService::default(), dataset());

        let first = session.add_selection(Some(String::from("G")), ["a"], Some(red));
        session.remove(&first).unwrap();

        let second = session.add_selection(Some(String::from("G")), ["a"], Some(blue));
        assert_eq!(first, second);
        assert_eq!(session.colors().get(&second), Some(blue));
        assert_eq!(session.user_tree().node(&second).unwrap().color(), Some(blue));
    }

    #[test]
    fn renamed_nodes_keep_their_colors_over_stale_entries() {
        let red = Color::new(255, 0, 0);
        let blue = Color::new(0, 0, 255);
        let mut session = Session::new(FixedService::default(), dataset());

        let old = session.add_selection(Some(String::from("A")), ["a"], Some(red));
        session.remove(&old).unwrap();

        let moving = session.add_selection(Some(String::from("B")), ["a"], Some(blue));
        let renamed = session.rename(&moving, "A").unwrap();

        assert_eq!(renamed, old);
        assert_eq!(session.colors().get(&renamed), Some(blue));
        assert_eq!(session.user_tree().node(&renamed).unwrap().color(), Some(blue));
    }

    #[test]
    fn restored_empty_roots_are_not_duplicated() {
        let mut session = Session::new(FixedService::default(), dataset());

        let selection = session.add_selection(None, ["a"], None);
        session.remove(&selection).unwrap();

        let saved = serde_json::to_string(&session.user_tree()).unwrap();
        let restored: SetTree = serde_json::from_str(&saved).unwrap();
        session.restore(restored);
        session.add_selection(None, ["b"], None);

        let tree = session.user_tree();
        assert_eq!(tree.roots().len(), 1);
        assert_eq!(tree.roots()[0].children().len(), 1);
    }

    #[test]
    fn tree_edits_bump_the_generation() {
        let mut session = Session::new(FixedService::default(), dataset());
        let before = session.deg_generation();

        let selection = session.add_selection(Some(String::from("Group A")), ["a"], None);
        session.select([selection.clone()]);
        session.check([selection.clone()]);
        session.recolor(&selection, Color::new(1, 2, 3)).unwrap();

        let renamed = session.rename(&selection, "Group B").unwrap();
        assert_eq!(session.selection().selected(), &[renamed.clone()]);
        assert_eq!(session.colors().get(&renamed), Some(Color::new(1, 2, 3)));
        assert_eq!(session.partition().user.checked, vec!["My Selections___Group B"]);

        session.remove(&renamed).unwrap();
        assert!(session.selection().selected().is_empty());
        assert!(session.remove(&renamed).is_err());

        assert!(session.deg_generation() >= before + 4);
    }

    #[test]
    fn restored_trees_resolve_and_are_colored() {
        let mut session = Session::new(FixedService::default(), dataset());
        let before = session.interaction_generation();

        session.restore(SetTree::new([SetNode::interior(
            "My Selections",
            [SetNode::leaf("Saved", ["d", "e"]).with_color(Color::new(9, 9, 9))],
        )]));

        let saved = path("My Selections/Saved");
        assert_eq!(session.resolve(&saved), vec!["d", "e"]);
        assert_eq!(session.colors().get(&saved), Some(Color::new(9, 9, 9)));
        assert_eq!(session.interaction_generation(), before + 1);

        // New selections land beside the restored ones.
        let next = session.add_selection(None, ["a"], None);
        assert_eq!(next, path("My Selections/Selection 2"));
    }

    #[test]
    fn recoloring_unknown_paths_fails() {
        let mut session = Session::new(FixedService::default(), dataset());

        assert!(session.recolor(&path("Nowhere"), Color::BLACK).is_err());
        assert!(session.recolor(&path("Leiden/3"), Color::BLACK).is_ok());
        assert_eq!(session.colors().get(&path("leiden/3")), Some(Color::BLACK));
    }

    #[test]
    fn checked_sets_can_be_combined_and_saved() {
        let mut session = Session::new(FixedService::default(), dataset());
        session.check([path("Leiden/1"), path("Leiden/2")]);

        assert_eq!(session.apply(SetOperation::Union), vec!["a", "b", "c", "d"]);
        assert!(session.apply(SetOperation::Intersection).is_empty());
        assert_eq!(session.apply(SetOperation::Complement), vec!["e"]);

        let saved = session.save_checked(SetOperation::Complement, None);
        assert_eq!(session.resolve(&saved), vec!["e"]);
    }

    #[test]
    fn reset_clears_everything() {
        let mut session = Session::new(FixedService::default(), dataset());
        session.add_selection(None, ["a"], None);
        session.select([path("Leiden/1"), path("Leiden/2")]);
        let dispatch = session.dispatch_deg().unwrap();

        session.reset(Dataset::new(SetTree::default()));

        assert!(session.user_tree().is_empty());
        assert!(session.selection().selected().is_empty());
        assert!(session.colors().is_empty());
        assert_eq!(
            session.complete_deg(dispatch, vec![record("CD3E", 2.0, 0.01)]),
            Outcome::Discarded { refire: false }
        );
        assert_eq!(session.deg(), &Rendered::Prompt);
    }

    #[tokio::test]
    async fn comparisons_render_volcano_data() {
        let service = FixedService {
            records: Some(vec![record("CD3E", 2.0, 0.01), record("MS4A1", -2.0, 0.01)]),
            ..Default::default()
        };

        let mut session = Session::new(service, dataset());
        session.set_feature_selection([String::from("MS4A1")], None);
        session.select([path("Leiden/1"), path("Leiden/2")]);

        match session.refresh_deg().await {
            Rendered::Ready(volcano) => {
                assert_eq!(volcano.groups, [String::from("1"), String::from("2")]);
                assert!(!volcano.points[0].is_highlighted);
                assert!(volcano.points[1].is_highlighted);
            }
            other => panic!("expected a volcano plot, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn failed_comparisons_render_no_data() {
        let mut session = Session::new(FixedService::default(), dataset());
        session.select([path("Leiden/1"), path("Leiden/2")]);

        assert_eq!(session.refresh_deg().await, &Rendered::NoData);
    }

    #[tokio::test]
    async fn comparisons_need_two_located_groups() {
        let mut session = Session::new(FixedService::default(), dataset());

        session.select([path("Leiden/1")]);
        assert_eq!(session.refresh_deg().await, &Rendered::Prompt);

        session.select([path("Leiden/1"), path("Leiden/Nowhere")]);
        assert_eq!(session.refresh_deg().await, &Rendered::Prompt);

        session.reset(Dataset::new(obs_sets()));
        session.select([path("Leiden/1"), path("Leiden/2")]);
        assert_eq!(session.refresh_deg().await, &Rendered::Prompt);
    }

    #[tokio::test]
    async fn interactions_render_heatmaps() {
        let service = FixedService {
            matrix: Some(vec![vec![0.0, 1.0], vec![2.0, 3.0]]),
            ..Default::default()
        };

        let mut session = Session::new(service, dataset());
        session.select([path("Leiden/1"), path("Leiden/2"), path("Leiden/3")]);

        let dispatch = session.dispatch_interaction().unwrap();
        assert_eq!(dispatch.request().cell_type, vec!["1", "1", "2", "2"]);
        assert_eq!(dispatch.request().cell_type_colors, vec!["#ff0000", "#0000ff"]);

        let matrix = vec![vec![0.0, 1.0], vec![2.0, 3.0]];
        assert_eq!(session.complete_interaction(dispatch, matrix), Outcome::Applied);

        match session.interaction() {
            Rendered::Ready(heatmap) => assert_eq!(heatmap.rows[0].data[1].y, 2.0),
            other => panic!("expected a heatmap, got {other:?}"),
        }

        // A matrix of the wrong size has no usable data.
        let service = FixedService {
            matrix: Some(vec![vec![1.0]]),
            ..Default::default()
        };
        let mut session = Session::new(service, dataset());
        session.select([path("Leiden/1"), path("Leiden/2")]);
        assert_eq!(session.refresh_interaction().await, &Rendered::NoData);
    }

    /// A service that answers more slowly for larger first groups.
    struct SlowService;

    #[async_trait]
    impl AnalysisService for SlowService {
        async fn deg_analysis(&self, request: &DegRequest) -> analysis::Result<Vec<DegRecord>> {
            let delay = request.group1.len() as u64 * 100;
            tokio::time::sleep(Duration::from_millis(delay)).await;
            Ok(vec![record(&format!("rows-{}", request.group1.len()), 2.0, 0.01)])
        }

        async fn cell_interaction(
            &self,
            _request: &InteractionRequest,
        ) -> analysis::Result<Vec<Vec<f64>>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn only_the_latest_selection_is_rendered() {
        let mut session = Session::new(SlowService, dataset());

        // The first selection compares two rows against two rows (slow).
        session.select([path("Leiden/1"), path("Leiden/2")]);
        let first = session.dispatch_deg().unwrap();

        // The second compares one row against two rows (fast).
        session.select([path("Leiden/3"), path("Leiden/2")]);
        let second = session.dispatch_deg().unwrap();

        let (tx, mut rx) = mpsc::unbounded_channel();

        {
            let service = session.service();
            let run = |dispatch: DegDispatch| {
                let tx = tx.clone();
                async move {
                    let records = analysis::request_comparison(service, dispatch.request()).await;
                    let _ = tx.send((dispatch, records));
                }
            };

            tokio::join!(run(first), run(second));
        }

        drop(tx);

        let mut outcomes = Vec::new();

        while let Some((dispatch, records)) = rx.recv().await {
            outcomes.push(session.complete_deg(dispatch, records));
        }

        assert_eq!(
            outcomes,
            vec![Outcome::Applied, Outcome::Discarded { refire: false }]
        );

        match session.deg() {
            Rendered::Ready(volcano) => {
                assert_eq!(volcano.groups, [String::from("3"), String::from("2")]);
                assert_eq!(volcano.points[0].record.feature, "rows-1");
            }
            other => panic!("expected a volcano plot, got {other:?}"),
        }
    }
}
