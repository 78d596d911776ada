//! Native argument shapes
//!
//! The engine hands the bridge arguments in one of two shapes:
//!
//! - [`TupleList`]: a circular doubly-linked list with a sentinel head, used for
//!   node insert/delete firings
//! - [`ArgumentDesc`]: a singly-linked, `None`-terminated parameter chain, used
//!   for queries, calls and events
//!
//! Both implement [`ArgumentSource`], a finite restartable sequence of values,
//! so the invocation guard never sees the link representation.

use std::fmt;

/// Native value type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    None,
    Integer,
    Integer64,
    Real,
    String,
    GuidString,
}

/// A single native argument value
#[derive(Debug, Clone, PartialEq)]
pub enum OsiValue {
    None,
    Integer(i32),
    Integer64(i64),
    Real(f32),
    String(String),
    GuidString(String),
}

impl OsiValue {
    pub fn value_type(&self) -> ValueType {
        match self {
            Self::None => ValueType::None,
            Self::Integer(_) => ValueType::Integer,
            Self::Integer64(_) => ValueType::Integer64,
            Self::Real(_) => ValueType::Real,
            Self::String(_) => ValueType::String,
            Self::GuidString(_) => ValueType::GuidString,
        }
    }
}

impl fmt::Display for OsiValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("<none>"),
            Self::Integer(v) => write!(f, "{v}"),
            Self::Integer64(v) => write!(f, "{v}"),
            Self::Real(v) => write!(f, "{v}"),
            Self::String(v) | Self::GuidString(v) => write!(f, "\"{v}\""),
        }
    }
}

/// A finite, restartable sequence of argument values in call order
pub trait ArgumentSource {
    type Iter<'a>: Iterator<Item = &'a OsiValue>
    where
        Self: 'a;

    /// Start a fresh walk over the arguments
    fn values(&self) -> Self::Iter<'_>;

    /// Number of arguments; walks the sequence once
    fn count(&self) -> usize {
        self.values().count()
    }
}

impl ArgumentSource for [OsiValue] {
    type Iter<'a> = std::slice::Iter<'a, OsiValue>;

    fn values(&self) -> Self::Iter<'_> {
        self.iter()
    }

    fn count(&self) -> usize {
        self.len()
    }
}

/// No arguments, for firings the engine reports without a tuple or chain
pub const NO_ARGS: &[OsiValue] = &[];

const SENTINEL: usize = 0;

#[derive(Debug, Clone)]
struct TupleNode {
    item: Option<OsiValue>,
    next: usize,
    prev: usize,
}

/// Circular doubly-linked tuple list with a sentinel head.
///
/// Nodes live in an arena. Slot 0 is the sentinel; a walk starts at
/// `head.next` and stops when it arrives back at the head.
#[derive(Debug, Clone)]
pub struct TupleList {
    nodes: Vec<TupleNode>,
}

impl Default for TupleList {
    fn default() -> Self {
        Self::new()
    }
}

impl TupleList {
    pub fn new() -> Self {
        Self {
            nodes: vec![TupleNode {
                item: None,
                next: SENTINEL,
                prev: SENTINEL,
            }],
        }
    }

    /// Link `value` in just before the head, i.e. at the tail
    pub fn push_back(&mut self, value: OsiValue) {
        let index = self.nodes.len();
        let tail = self.nodes[SENTINEL].prev;
        self.nodes.push(TupleNode {
            item: Some(value),
            next: SENTINEL,
            prev: tail,
        });
        self.nodes[tail].next = index;
        self.nodes[SENTINEL].prev = index;
    }

    /// Link `value` in just after the head
    pub fn push_front(&mut self, value: OsiValue) {
        let index = self.nodes.len();
        let first = self.nodes[SENTINEL].next;
        self.nodes.push(TupleNode {
            item: Some(value),
            next: first,
            prev: SENTINEL,
        });
        self.nodes[first].prev = index;
        self.nodes[SENTINEL].next = index;
    }

    pub fn is_empty(&self) -> bool {
        self.nodes[SENTINEL].next == SENTINEL
    }

    pub fn iter(&self) -> TupleIter<'_> {
        TupleIter {
            list: self,
            cursor: self.nodes[SENTINEL].next,
        }
    }
}

impl FromIterator<OsiValue> for TupleList {
    fn from_iter<I: IntoIterator<Item = OsiValue>>(iter: I) -> Self {
        let mut list = Self::new();
        for value in iter {
            list.push_back(value);
        }
        list
    }
}

/// Walks a [`TupleList`] from the head's successor back around to the head
pub struct TupleIter<'a> {
    list: &'a TupleList,
    cursor: usize,
}

impl<'a> Iterator for TupleIter<'a> {
    type Item = &'a OsiValue;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == SENTINEL {
            return None;
        }
        let node = &self.list.nodes[self.cursor];
        self.cursor = node.next;
        node.item.as_ref()
    }
}

impl ArgumentSource for TupleList {
    type Iter<'a> = TupleIter<'a>;

    fn values(&self) -> Self::Iter<'_> {
        self.iter()
    }
}

/// One link of a singly-linked parameter chain
#[derive(Debug, Clone, PartialEq)]
pub struct ArgumentDesc {
    pub value: OsiValue,
    pub next_param: Option<Box<ArgumentDesc>>,
}

impl ArgumentDesc {
    pub fn new(value: OsiValue) -> Self {
        Self {
            value,
            next_param: None,
        }
    }

    /// Build a chain in order; `None` for an empty argument list
    pub fn chain(values: impl IntoIterator<Item = OsiValue>) -> Option<Box<ArgumentDesc>> {
        let mut values: Vec<OsiValue> = values.into_iter().collect();
        let mut head: Option<Box<ArgumentDesc>> = None;
        while let Some(value) = values.pop() {
            head = Some(Box::new(ArgumentDesc {
                value,
                next_param: head,
            }));
        }
        head
    }

    pub fn iter(&self) -> ArgumentIter<'_> {
        ArgumentIter { cursor: Some(self) }
    }
}

/// Follows `next_param` until the chain ends
pub struct ArgumentIter<'a> {
    cursor: Option<&'a ArgumentDesc>,
}

impl<'a> Iterator for ArgumentIter<'a> {
    type Item = &'a OsiValue;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.cursor?;
        self.cursor = node.next_param.as_deref();
        Some(&node.value)
    }
}

impl ArgumentSource for ArgumentDesc {
    type Iter<'a> = ArgumentIter<'a>;

    fn values(&self) -> Self::Iter<'_> {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ints(source: &impl ArgumentSource) -> Vec<i32> {
        source
            .values()
            .map(|v| match v {
                OsiValue::Integer(i) => *i,
                other => panic!("unexpected {other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_empty_tuple_walks_nothing() {
        let list = TupleList::new();
        assert!(list.is_empty());
        assert_eq!(list.count(), 0);
    }

    #[test]
    fn test_tuple_walk_order() {
        let mut list: TupleList = [1, 2, 3].into_iter().map(OsiValue::Integer).collect();
        list.push_front(OsiValue::Integer(0));
        assert_eq!(ints(&list), vec![0, 1, 2, 3]);
        assert_eq!(list.count(), 4);
    }

    #[test]
    fn test_tuple_walk_is_restartable() {
        let list: TupleList = [5, 6].into_iter().map(OsiValue::Integer).collect();
        assert_eq!(ints(&list), ints(&list));
    }

    #[test]
    fn test_argument_chain_order() {
        let chain = ArgumentDesc::chain([10, 20, 30].into_iter().map(OsiValue::Integer)).unwrap();
        assert_eq!(ints(chain.as_ref()), vec![10, 20, 30]);
        assert_eq!(chain.count(), 3);
    }

    #[test]
    fn test_empty_chain() {
        assert!(ArgumentDesc::chain(std::iter::empty()).is_none());
        assert_eq!(NO_ARGS.count(), 0);
    }

    #[test]
    fn test_value_types() {
        assert_eq!(OsiValue::Real(1.5).value_type(), ValueType::Real);
        assert_eq!(
            OsiValue::GuidString("x".into()).value_type(),
            ValueType::GuidString
        );
        assert_eq!(OsiValue::String("a".into()).to_string(), "\"a\"");
    }
}
