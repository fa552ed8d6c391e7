use std::collections::HashSet;

use sift_error::SiftResult;

use crate::traversal::{NodeVisitor, TraversalOrder};
use crate::{Expr, ExprRef, FieldName};

/// Collects the names of the columns an expression reads.
#[derive(Debug, Default)]
pub struct ReferenceCollector {
    fields: HashSet<FieldName>,
}

impl ReferenceCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_fields(self) -> HashSet<FieldName> {
        self.fields
    }
}

impl<'a> NodeVisitor<'a> for ReferenceCollector {
    type NodeTy = ExprRef;

    fn visit_up(&mut self, node: &'a ExprRef) -> SiftResult<TraversalOrder> {
        if let Expr::Column(name) = node.as_ref() {
            self.fields.insert(name.clone());
        }
        Ok(TraversalOrder::Continue)
    }
}
