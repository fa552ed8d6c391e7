use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arrow_array::{ArrayRef, RecordBatch, UInt64Array};
use itertools::Itertools;
use sift_error::{SiftResult, sift_bail, sift_err};
use sift_expr::traversal::{is_position_dependent, references};
use sift_expr::{EvalScope, ExprRef, FieldName, conjunction};
use sift_mask::{AllOr, Mask};

use crate::cache::{MaskCache, SelectionCell};
use crate::dataset::record_batch;
use crate::{Dataset, DerivedColumn};

static NEXT_VIEW_ID: AtomicU64 = AtomicU64::new(0);

/// Process-wide identity of a [`View`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ViewId(u64);

impl ViewId {
    pub(crate) fn next() -> Self {
        Self(NEXT_VIEW_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl Display for ViewId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "view#{}", self.0)
    }
}

pub type ViewRef = Arc<View>;

/// A logical table: either a dataset, or the rows of a parent view for which a filter holds.
///
/// Views are immutable. Filtering, declaring a column or dropping one returns a new view, and
/// nothing is evaluated until the data or a length is asked for. The selection of a filtered view
/// is memoized in the [`MaskCache`] shared by the whole view tree.
pub struct View {
    id: ViewId,
    source: ViewSource,
    columns: Vec<DerivedColumn>,
    cache: Arc<MaskCache>,
}

#[derive(Clone)]
pub(crate) enum ViewSource {
    Root(Arc<Dataset>),
    Filtered {
        parent: ViewRef,
        filter: ExprRef,
        selection: Arc<SelectionCell>,
    },
}

impl View {
    /// An unfiltered view over `dataset`, with a cache of its own.
    pub fn new_root(dataset: Arc<Dataset>) -> ViewRef {
        Self::new_root_in(dataset, Arc::new(MaskCache::default()))
    }

    /// An unfiltered view over `dataset` whose selections are memoized in `cache`.
    pub fn new_root_in(dataset: Arc<Dataset>, cache: Arc<MaskCache>) -> ViewRef {
        Arc::new(Self::new(ViewSource::Root(dataset), vec![], cache))
    }

    pub(crate) fn new(
        source: ViewSource,
        columns: Vec<DerivedColumn>,
        cache: Arc<MaskCache>,
    ) -> Self {
        Self {
            id: ViewId::next(),
            source,
            columns,
            cache,
        }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn cache(&self) -> &Arc<MaskCache> {
        &self.cache
    }

    /// The view this view filters, if any.
    pub fn parent(&self) -> Option<&ViewRef> {
        match &self.source {
            ViewSource::Root(_) => None,
            ViewSource::Filtered { parent, .. } => Some(parent),
        }
    }

    /// The filter applied to the parent, if any.
    pub fn filter_expr(&self) -> Option<&ExprRef> {
        match &self.source {
            ViewSource::Root(_) => None,
            ViewSource::Filtered { filter, .. } => Some(filter),
        }
    }

    /// Every filter on the chain combined with `and`, root first.
    pub fn combined_filter(&self) -> Option<ExprRef> {
        let mut filters = vec![];
        let mut view = self;
        while let ViewSource::Filtered { parent, filter, .. } = &view.source {
            filters.push(filter.clone());
            view = parent.as_ref();
        }
        conjunction(filters.into_iter().rev())
    }

    /// The dataset at the root of the chain.
    pub fn root_dataset(&self) -> &Arc<Dataset> {
        match &self.source {
            ViewSource::Root(dataset) => dataset,
            ViewSource::Filtered { parent, .. } => parent.root_dataset(),
        }
    }

    pub(crate) fn source(&self) -> &ViewSource {
        &self.source
    }

    /// The derived columns declared on this view, in declaration order.
    pub fn own_columns(&self) -> &[DerivedColumn] {
        &self.columns
    }

    /// Every derived column reachable from this view, root first, in declaration order.
    pub fn derived_columns(&self) -> Vec<&DerivedColumn> {
        let mut levels = vec![];
        let mut view = Some(self);
        while let Some(current) = view {
            levels.push(&current.columns);
            view = current.parent().map(Arc::as_ref);
        }
        levels.into_iter().rev().flatten().collect()
    }

    /// A child view keeping the rows of this view where `filter` holds.
    ///
    /// The filter is not evaluated until the child's rows or length are needed.
    pub fn filter(self: &Arc<Self>, filter: ExprRef) -> ViewRef {
        Arc::new(Self::new(
            self.filtered_by(filter),
            vec![],
            self.cache.clone(),
        ))
    }

    fn filtered_by(self: &Arc<Self>, filter: ExprRef) -> ViewSource {
        ViewSource::Filtered {
            selection: self.cache.claim(self.id, filter.clone()),
            parent: self.clone(),
            filter,
        }
    }

    /// A view that also has a column `name` computed from `expr`.
    ///
    /// A column with the same name, physical or derived, is shadowed; `expr` may still refer to
    /// it.
    pub fn with_column(&self, name: impl Into<FieldName>, expr: ExprRef) -> SiftResult<ViewRef> {
        let name = name.into();
        let mut position_dependent = is_position_dependent(&expr)?;
        for reference in references(&expr)? {
            if !self.has_column(&reference) {
                sift_bail!(ColumnNotFound: "{}", reference);
            }
            position_dependent |= self
                .find_derived(&reference)
                .is_some_and(DerivedColumn::is_position_dependent);
        }

        let mut columns = self.columns.clone();
        columns.push(DerivedColumn::new(
            name,
            expr,
            self.is_filtered(),
            position_dependent,
        ));
        Ok(Arc::new(Self::new(
            self.source.clone(),
            columns,
            self.cache.clone(),
        )))
    }

    /// A view without the nearest derived column `name`.
    ///
    /// When the column was declared on an ancestor, the chain below that ancestor is rebuilt
    /// without it: every filter and derived column in between is declared again, in order. A
    /// column that some later filter or derived column reads cannot be dropped.
    pub fn drop_column(&self, name: &str) -> SiftResult<ViewRef> {
        let own = self.columns.iter().rposition(|c| c.name().as_ref() == name);
        let source = match (own, &self.source) {
            (Some(_), _) => self.source.clone(),
            (None, ViewSource::Root(_)) => {
                sift_bail!("{} is not a derived column of {}", name, self.id)
            }
            (None, ViewSource::Filtered { parent, filter, .. }) => {
                if references(filter)?.contains(name) {
                    sift_bail!("cannot drop column {}, filter {} uses it", name, filter);
                }
                parent.drop_column(name)?.filtered_by(filter.clone())
            }
        };

        let later = own.map_or(&self.columns[..], |idx| &self.columns[idx + 1..]);
        let mut dependents = vec![];
        for column in later {
            if references(column.expr())?.contains(name) {
                dependents.push(column.name());
            }
        }
        if !dependents.is_empty() {
            sift_bail!(
                "cannot drop column {}, it is used by {}",
                name,
                dependents.iter().join(", ")
            );
        }

        let mut columns = self.columns.clone();
        if let Some(idx) = own {
            columns.remove(idx);
        }
        Ok(Arc::new(Self::new(source, columns, self.cache.clone())))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c.name().as_ref() == name)
            || match &self.source {
                ViewSource::Root(dataset) => dataset.column(name).is_some(),
                ViewSource::Filtered { parent, .. } => parent.has_column(name),
            }
    }

    /// The names of every visible column: physical columns first, then derived columns in
    /// declaration order.
    pub fn column_names(&self) -> Vec<FieldName> {
        self.root_dataset()
            .column_names()
            .chain(self.derived_columns().into_iter().map(DerivedColumn::name))
            .unique()
            .cloned()
            .collect()
    }

    /// The values of column `name` for the rows of this view.
    pub fn column(&self, name: &str) -> SiftResult<ArrayRef> {
        self.resolve(name, self.columns.len())
    }

    /// Evaluate `expr` over the rows of this view.
    pub fn evaluate(&self, expr: &ExprRef) -> SiftResult<ArrayRef> {
        expr.evaluate(&ViewScope::try_new(self, self.columns.len())?)
    }

    /// Materialize every visible column.
    pub fn to_record_batch(&self) -> SiftResult<RecordBatch> {
        let columns = self
            .column_names()
            .into_iter()
            .map(|name| {
                let values = self.column(&name)?;
                Ok((name, values))
            })
            .collect::<SiftResult<Vec<_>>>()?;
        record_batch(self.len()?, &columns)
    }

    /// The selection of this view over the rows of its parent. Unfiltered views select
    /// everything.
    pub fn selection(&self) -> SiftResult<Mask> {
        match &self.source {
            ViewSource::Root(dataset) => Ok(Mask::new_true(dataset.row_count())),
            ViewSource::Filtered {
                parent,
                filter,
                selection,
            } => selection.get_or_compute(|| {
                let predicate = parent.evaluate(filter).map_err(|err| {
                    sift_err!(FilterEvaluation: "failed to evaluate {} over {}: {}", filter, parent.id, err)
                })?;
                Mask::from_predicate(predicate.as_ref()).map_err(|err| {
                    sift_err!(FilterEvaluation: "filter {} is not a predicate: {}", filter, err)
                })
            }),
        }
    }

    /// The nearest derived column named `name` visible from this view.
    fn find_derived(&self, name: &str) -> Option<&DerivedColumn> {
        self.columns
            .iter()
            .rev()
            .find(|c| c.name().as_ref() == name)
            .or_else(|| self.parent().and_then(|parent| parent.find_derived(name)))
    }

    /// Resolve a column as seen by the first `visible` derived columns of this view.
    fn resolve(&self, name: &str, visible: usize) -> SiftResult<ArrayRef> {
        if let Some(idx) = self.columns[..visible]
            .iter()
            .rposition(|c| c.name().as_ref() == name)
        {
            let scope = ViewScope::try_new(self, idx)?;
            return self.columns[idx]
                .expr()
                .evaluate(&scope)
                .map_err(|err| err.with_context(format!("evaluating column {name}")));
        }

        match &self.source {
            ViewSource::Root(dataset) => dataset
                .column(name)
                .cloned()
                .ok_or_else(|| sift_err!(ColumnNotFound: "{}", name)),
            ViewSource::Filtered { parent, .. } => self.selection()?.filter_array(&parent.column(name)?),
        }
    }
}

impl Debug for View {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("View")
            .field("id", &self.id)
            .field("filter", &self.filter_expr().map(|e| e.to_string()))
            .field("parent", &self.parent().map(|p| p.id))
            .field("columns", &self.columns)
            .finish()
    }
}

/// The columns visible to an expression evaluated on a view.
struct ViewScope<'a> {
    view: &'a View,
    visible: usize,
    row_count: usize,
}

impl<'a> ViewScope<'a> {
    fn try_new(view: &'a View, visible: usize) -> SiftResult<Self> {
        Ok(Self {
            view,
            visible,
            row_count: view.len()?,
        })
    }
}

impl EvalScope for ViewScope<'_> {
    fn row_count(&self) -> usize {
        self.row_count
    }

    fn column(&self, name: &FieldName) -> SiftResult<ArrayRef> {
        self.view.resolve(name, self.visible)
    }

    fn row_positions(&self) -> SiftResult<ArrayRef> {
        let positions = match self.view.row_selection()?.indices() {
            AllOr::All => UInt64Array::from_iter_values(0..self.row_count as u64),
            AllOr::None => UInt64Array::from_iter_values([]),
            AllOr::Some(indices) => {
                UInt64Array::from_iter_values(indices.iter().map(|&idx| idx as u64))
            }
        };
        Ok(Arc::new(positions))
    }
}
