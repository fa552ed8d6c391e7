use std::marker::PhantomData;

use sift_error::SiftResult;

use crate::traversal::{Node, NodeVisitor, TraversalOrder};

/// Calls a closure on every node before its children.
struct FnVisitor<'a, F, T: 'a> {
    f: F,
    _data: PhantomData<&'a T>,
}

impl<'a, T, F> NodeVisitor<'a> for FnVisitor<'a, F, T>
where
    F: FnMut(&'a T) -> SiftResult<TraversalOrder>,
    T: Node,
{
    type NodeTy = T;

    fn visit_down(&mut self, node: &'a T) -> SiftResult<TraversalOrder> {
        (self.f)(node)
    }
}

/// Visit every node before its children.
pub fn pre_order_visit_down<'a, T: 'a + Node>(
    f: impl FnMut(&'a T) -> SiftResult<TraversalOrder>,
) -> impl NodeVisitor<'a, NodeTy = T> {
    FnVisitor {
        f,
        _data: PhantomData,
    }
}
