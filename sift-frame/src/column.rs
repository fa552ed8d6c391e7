use sift_expr::{ExprRef, FieldName};

/// A column computed on demand from an expression over other columns of its view.
#[derive(Debug, Clone)]
pub struct DerivedColumn {
    name: FieldName,
    expr: ExprRef,
    declared_under_filter: bool,
    position_dependent: bool,
}

impl DerivedColumn {
    pub(crate) fn new(
        name: FieldName,
        expr: ExprRef,
        declared_under_filter: bool,
        position_dependent: bool,
    ) -> Self {
        Self {
            name,
            expr,
            declared_under_filter,
            position_dependent,
        }
    }

    pub fn name(&self) -> &FieldName {
        &self.name
    }

    pub fn expr(&self) -> &ExprRef {
        &self.expr
    }

    /// Whether the column was declared on a view that already had a filter applied.
    pub fn is_declared_under_filter(&self) -> bool {
        self.declared_under_filter
    }

    /// Whether the value of a row depends on its absolute position in the root dataset, directly
    /// or through another derived column.
    pub fn is_position_dependent(&self) -> bool {
        self.position_dependent
    }

    /// Whether the column keeps its meaning once a filtered view is materialized.
    pub(crate) fn survives_extraction(&self) -> bool {
        !self.declared_under_filter && !self.position_dependent
    }

    /// The same column, as declared on a freshly materialized root.
    pub(crate) fn rebased(&self) -> Self {
        Self {
            declared_under_filter: false,
            ..self.clone()
        }
    }
}
