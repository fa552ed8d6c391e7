mod references;
mod visitor;

use std::collections::HashSet;

pub use references::ReferenceCollector;
use sift_error::SiftResult;
pub use visitor::pre_order_visit_down;

use crate::{Expr, ExprRef, FieldName};

/// A pre-order traversal over the nodes of an expression tree.
///
/// Visitors steer the traversal with a [`TraversalOrder`]:
/// - `Skip`: Skip visiting the children of the current node.
/// - `Stop`: Stop visiting any more nodes in the traversal.
/// - `Continue`: Continue with the traversal as expected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TraversalOrder {
    // In a top-down traversal, skip visiting the children of the current node.
    // In the bottom-up phase of the traversal this does nothing.
    Skip,

    // Stop visiting any more nodes in the traversal.
    Stop,

    // Continue with the traversal as expected.
    Continue,
}

pub trait NodeVisitor<'a> {
    type NodeTy: Node;

    fn visit_down(&mut self, _node: &'a Self::NodeTy) -> SiftResult<TraversalOrder> {
        Ok(TraversalOrder::Continue)
    }

    fn visit_up(&mut self, _node: &'a Self::NodeTy) -> SiftResult<TraversalOrder> {
        Ok(TraversalOrder::Continue)
    }
}

pub trait Node: Sized {
    fn accept<'a, V: NodeVisitor<'a, NodeTy = Self>>(
        &'a self,
        visitor: &mut V,
    ) -> SiftResult<TraversalOrder>;
}

impl Node for ExprRef {
    // A pre-order traversal.
    fn accept<'a, V: NodeVisitor<'a, NodeTy = ExprRef>>(
        &'a self,
        visitor: &mut V,
    ) -> SiftResult<TraversalOrder> {
        let mut ord = visitor.visit_down(self)?;
        if ord == TraversalOrder::Stop {
            return Ok(TraversalOrder::Stop);
        }
        if ord == TraversalOrder::Skip {
            return Ok(TraversalOrder::Continue);
        }
        for child in self.children() {
            if ord != TraversalOrder::Continue {
                return Ok(ord);
            }
            ord = child.accept(visitor)?;
        }
        if ord == TraversalOrder::Stop {
            return Ok(TraversalOrder::Stop);
        }
        visitor.visit_up(self)
    }
}

/// The names of every column the expression reads.
pub fn references(expr: &ExprRef) -> SiftResult<HashSet<FieldName>> {
    let mut collector = ReferenceCollector::new();
    expr.accept(&mut collector)?;
    Ok(collector.into_fields())
}

/// True if the expression reads the row position directly.
///
/// This only inspects the tree itself; columns the expression reads may be position dependent
/// on their own.
pub fn is_position_dependent(expr: &ExprRef) -> SiftResult<bool> {
    let mut found = false;
    expr.accept(&mut pre_order_visit_down(|node: &ExprRef| {
        if matches!(node.as_ref(), Expr::RowIndex) {
            found = true;
            return Ok(TraversalOrder::Stop);
        }
        Ok(TraversalOrder::Continue)
    }))?;
    Ok(found)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{add, and, col, fill_null, gt, lit, lt, not, row_index};

    #[test]
    fn visits_parents_before_children() {
        let sum = add(col("col1"), lit(1));
        let expr = gt(sum.clone(), lit(2));

        let mut nodes = Vec::new();
        expr.accept(&mut pre_order_visit_down(|node: &ExprRef| {
            nodes.push(node.clone());
            Ok(TraversalOrder::Continue)
        }))
        .unwrap();

        assert_eq!(nodes, vec![expr.clone(), sum, col("col1"), lit(1), lit(2)]);
    }

    #[test]
    fn skip_prunes_children() {
        let expr = and(gt(col("a"), lit(1)), lt(col("b"), lit(2)));

        let mut columns = Vec::new();
        expr.accept(&mut pre_order_visit_down(|node: &ExprRef| {
            match node.as_ref() {
                Expr::Binary { op: crate::Operator::Gt, .. } => return Ok(TraversalOrder::Skip),
                Expr::Column(name) => columns.push(name.clone()),
                _ => {}
            }
            Ok(TraversalOrder::Continue)
        }))
        .unwrap();

        assert_eq!(columns, vec![FieldName::from("b")]);
    }

    #[test]
    fn stop_ends_traversal() {
        let expr = and(gt(col("a"), lit(1)), lt(col("b"), lit(2)));

        let mut seen = Vec::new();
        let order = expr
            .accept(&mut pre_order_visit_down(|node: &ExprRef| {
                seen.push(node.to_string());
                if matches!(node.as_ref(), Expr::Column(_)) {
                    return Ok(TraversalOrder::Stop);
                }
                Ok(TraversalOrder::Continue)
            }))
            .unwrap();

        assert_eq!(order, TraversalOrder::Stop);
        assert_eq!(seen, vec![expr.to_string(), "($a > 1_i64)".to_string(), "$a".to_string()]);
    }

    #[test]
    fn collects_references() {
        let expr = and(
            gt(col("a"), lit(1)),
            not(lt(fill_null(col("b"), col("a")), lit(2))),
        );
        let refs = references(&expr).unwrap();
        assert_eq!(refs, HashSet::from(["a".into(), "b".into()]));
        assert!(references(&lit(3)).unwrap().is_empty());
    }

    #[test]
    fn finds_row_index() {
        assert!(is_position_dependent(&row_index()).unwrap());
        assert!(is_position_dependent(&gt(add(col("a"), row_index()), lit(2))).unwrap());
        assert!(!is_position_dependent(&gt(col("a"), lit(2))).unwrap());
    }
}
