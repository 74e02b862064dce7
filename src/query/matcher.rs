//! Structural matching of one pattern against one candidate node.
//!
//! Child sequences are compiled to a small instruction list and executed with
//! an explicit backtrack stack rather than call-stack recursion. Quantifiers
//! are greedy and give back repetitions when a later sibling fails; unanchored
//! children may skip siblings through a gap loop; anchors pin adjacency over
//! named siblings (anonymous tokens are invisible to anchors and to named
//! repetitions).

use crate::query::parser::{
    CaptureId, NodeMatcher, Pattern, PatternChild, PatternNode, Quantifier,
};
use crate::tree::Node;

/// One step of a compiled sibling sequence. Operands are instruction indexes
/// except for `Atom`, which indexes the pattern's child list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SeqInst {
    /// Match the pattern child at this index against the current sibling(s).
    Atom(usize),
    /// Skip one sibling of any kind.
    Skip,
    /// Skip any run of anonymous siblings (deterministic, no backtrack).
    SkipAnon,
    /// Try the first target; on failure resume at the second.
    Split(usize, usize),
    Jump(usize),
    /// Accept. When anchored, no named sibling may remain.
    End(bool),
}

/// Compile a child list into a sequence program.
///
/// The first child of a group is pinned to the start position; everything
/// else follows the anchor flags recorded by the parser.
pub(crate) fn compile_sequence(
    children: &[PatternChild],
    anchor_last: bool,
    in_group: bool,
) -> Vec<SeqInst> {
    let mut seq = Vec::new();
    for (i, child) in children.iter().enumerate() {
        let exact = in_group && i == 0;
        let anchored = exact || child.anchor_before;
        let expects = expects_named(&child.node);

        let emit_first = |seq: &mut Vec<SeqInst>| {
            if anchored {
                if expects && !exact {
                    seq.push(SeqInst::SkipAnon);
                }
                seq.push(SeqInst::Atom(i));
            } else {
                emit_gap_atom(seq, i);
            }
        };

        match child.quantifier {
            Quantifier::One => emit_first(&mut seq),
            Quantifier::ZeroOrOne => {
                let split_at = seq.len();
                seq.push(SeqInst::Split(0, 0));
                emit_first(&mut seq);
                let next = seq.len();
                seq[split_at] = SeqInst::Split(split_at + 1, next);
            }
            Quantifier::OneOrMore => {
                emit_first(&mut seq);
                emit_rep_loop(&mut seq, i, expects);
            }
            Quantifier::ZeroOrMore => {
                let split_at = seq.len();
                seq.push(SeqInst::Split(0, 0));
                emit_first(&mut seq);
                emit_rep_loop(&mut seq, i, expects);
                let next = seq.len();
                seq[split_at] = SeqInst::Split(split_at + 1, next);
            }
        }
    }
    seq.push(SeqInst::End(anchor_last));
    seq
}

/// `L0: Split(match, skip); match: Atom; Jump next; skip: Skip; Jump L0`
///
/// Prefers matching at the current position; skipping a sibling is the
/// backtrack path, so the earliest occurrence wins.
fn emit_gap_atom(seq: &mut Vec<SeqInst>, i: usize) {
    let l0 = seq.len();
    seq.push(SeqInst::Split(0, 0));
    seq.push(SeqInst::Atom(i));
    let jump_next = seq.len();
    seq.push(SeqInst::Jump(0));
    let l_skip = seq.len();
    seq.push(SeqInst::Skip);
    seq.push(SeqInst::Jump(l0));
    let next = seq.len();
    seq[l0] = SeqInst::Split(l0 + 1, l_skip);
    seq[jump_next] = SeqInst::Jump(next);
}

/// Greedy repetition tail: take another repetition while possible, leaving a
/// reduction point before each one.
fn emit_rep_loop(seq: &mut Vec<SeqInst>, i: usize, expects_named: bool) {
    let l_loop = seq.len();
    seq.push(SeqInst::Split(0, 0));
    if expects_named {
        seq.push(SeqInst::SkipAnon);
    }
    seq.push(SeqInst::Atom(i));
    seq.push(SeqInst::Jump(l_loop));
    let next = seq.len();
    seq[l_loop] = SeqInst::Split(l_loop + 1, next);
}

/// Whether a pattern node can only ever match named nodes. Anchors and
/// repetition adjacency ignore anonymous siblings exactly when this holds.
pub(crate) fn expects_named(node: &PatternNode) -> bool {
    match &node.matcher {
        NodeMatcher::Kind(_) | NodeMatcher::NamedWildcard => true,
        NodeMatcher::Token(_) | NodeMatcher::AnyWildcard => false,
        NodeMatcher::Alternation(branches) => branches.iter().all(expects_named),
        NodeMatcher::Group => node
            .children
            .first()
            .is_some_and(|c| expects_named(&c.node)),
    }
}

/// The sibling list a match runs over: a parent's children, or a lone root.
#[derive(Clone, Copy)]
pub(crate) enum Siblings<'t> {
    Children(Node<'t>),
    Single(Node<'t>),
}

impl<'t> Siblings<'t> {
    fn len(&self) -> usize {
        match self {
            Siblings::Children(parent) => parent.child_count(),
            Siblings::Single(_) => 1,
        }
    }

    fn get(&self, i: usize) -> Option<Node<'t>> {
        match self {
            Siblings::Children(parent) => parent.child(i),
            Siblings::Single(node) => (i == 0).then_some(*node),
        }
    }

    fn is_named_at(&self, i: usize) -> bool {
        self.get(i).is_some_and(|n| n.is_named())
    }
}

struct Frame {
    pc: usize,
    pos: usize,
    caps_mark: usize,
}

/// Run a node's compiled sequence over `sibs` starting at `start`.
///
/// Returns the sibling position after the last consumed sibling. Captures
/// bound along abandoned branches are rolled back.
pub(crate) fn run_sequence<'t>(
    pat: &PatternNode,
    sibs: Siblings<'t>,
    start: usize,
    caps: &mut Vec<(CaptureId, Node<'t>)>,
) -> Option<usize> {
    let mut stack: Vec<Frame> = Vec::new();
    let mut pc = 0;
    let mut pos = start;

    fn backtrack<'t>(
        stack: &mut Vec<Frame>,
        pc: &mut usize,
        pos: &mut usize,
        caps: &mut Vec<(CaptureId, Node<'t>)>,
    ) -> bool {
        match stack.pop() {
            Some(frame) => {
                *pc = frame.pc;
                *pos = frame.pos;
                caps.truncate(frame.caps_mark);
                true
            }
            None => false,
        }
    }

    loop {
        match pat.seq[pc] {
            SeqInst::Atom(i) => match match_atom(&pat.children[i], sibs, pos, caps) {
                Some(consumed) => {
                    pos += consumed;
                    pc += 1;
                }
                None => {
                    if !backtrack(&mut stack, &mut pc, &mut pos, caps) {
                        return None;
                    }
                }
            },
            SeqInst::Skip => {
                if pos < sibs.len() {
                    pos += 1;
                    pc += 1;
                } else if !backtrack(&mut stack, &mut pc, &mut pos, caps) {
                    return None;
                }
            }
            SeqInst::SkipAnon => {
                while pos < sibs.len() && !sibs.is_named_at(pos) {
                    pos += 1;
                }
                pc += 1;
            }
            SeqInst::Split(first, fallback) => {
                stack.push(Frame {
                    pc: fallback,
                    pos,
                    caps_mark: caps.len(),
                });
                pc = first;
            }
            SeqInst::Jump(target) => pc = target,
            SeqInst::End(anchored) => {
                let trailing_named = (pos..sibs.len()).any(|i| sibs.is_named_at(i));
                if anchored && trailing_named {
                    if !backtrack(&mut stack, &mut pc, &mut pos, caps) {
                        return None;
                    }
                } else {
                    return Some(pos);
                }
            }
        }
    }
}

/// Match one pattern child at a sibling position, returning how many
/// siblings it consumed (groups can consume several; everything else one).
fn match_atom<'t>(
    child: &PatternChild,
    sibs: Siblings<'t>,
    pos: usize,
    caps: &mut Vec<(CaptureId, Node<'t>)>,
) -> Option<usize> {
    if matches!(child.node.matcher, NodeMatcher::Group) {
        let mark = caps.len();
        match run_sequence(&child.node, sibs, pos, caps) {
            // A zero-width group match would never make progress.
            Some(end) if end > pos => Some(end - pos),
            _ => {
                caps.truncate(mark);
                None
            }
        }
    } else {
        let node = sibs.get(pos)?;
        if let Some(field) = child.field {
            if node.field_id() != Some(field) {
                return None;
            }
        }
        match_node(&child.node, node, caps).then_some(1)
    }
}

/// Match a pattern node against one tree node, binding captures on success.
pub(crate) fn match_node<'t>(
    pat: &PatternNode,
    node: Node<'t>,
    caps: &mut Vec<(CaptureId, Node<'t>)>,
) -> bool {
    let mark = caps.len();
    let structural = match &pat.matcher {
        NodeMatcher::Kind(id) => node.is_named() && node.kind_id() == *id,
        NodeMatcher::NamedWildcard => node.is_named(),
        NodeMatcher::AnyWildcard => true,
        NodeMatcher::Token(id) => !node.is_named() && node.kind_id() == *id,
        NodeMatcher::Alternation(branches) => {
            branches.iter().any(|branch| match_node(branch, node, caps))
        }
        // Groups only appear as sibling atoms, never as a node matcher.
        NodeMatcher::Group => false,
    };
    if !structural {
        caps.truncate(mark);
        return false;
    }
    if pat
        .negated_fields
        .iter()
        .any(|&field| node.child_by_field_id(field).is_some())
    {
        caps.truncate(mark);
        return false;
    }
    if !pat.children.is_empty()
        && run_sequence(pat, Siblings::Children(node), 0, caps).is_none()
    {
        caps.truncate(mark);
        return false;
    }
    for &cap in &pat.captures {
        caps.push((cap, node));
    }
    true
}

/// Match a top-level pattern with `node` as the candidate root.
///
/// Quantified top-level patterns fire only at the start of a run of matching
/// siblings and consume the whole run, so three consecutive matching nodes
/// produce one match with three bound captures rather than three matches.
pub(crate) fn match_pattern_at<'t>(
    pattern: &Pattern,
    node: Node<'t>,
    caps: &mut Vec<(CaptureId, Node<'t>)>,
) -> bool {
    let root = &pattern.root;
    let (sibs, start) = match node.parent() {
        Some(parent) => (Siblings::Children(parent), node.index_in_parent()),
        None => (Siblings::Single(node), 0),
    };

    match root.quantifier {
        Quantifier::One | Quantifier::ZeroOrOne => match_atom(root, sibs, start, caps).is_some(),
        Quantifier::OneOrMore | Quantifier::ZeroOrMore => {
            let expects = expects_named(&root.node);
            if let Some(prev) = prev_relevant(sibs, start, expects) {
                let mut scratch = Vec::new();
                if match_atom(root, sibs, prev, &mut scratch).is_some() {
                    return false;
                }
            }
            let Some(consumed) = match_atom(root, sibs, start, caps) else {
                return false;
            };
            let mut pos = start + consumed;
            loop {
                let mut probe = pos;
                if expects {
                    while probe < sibs.len() && !sibs.is_named_at(probe) {
                        probe += 1;
                    }
                }
                match match_atom(root, sibs, probe, caps) {
                    Some(n) => pos = probe + n,
                    None => break,
                }
            }
            true
        }
    }
}

/// The nearest earlier sibling a repetition would have continued from.
fn prev_relevant(sibs: Siblings<'_>, start: usize, expects_named: bool) -> Option<usize> {
    let mut i = start;
    while i > 0 {
        i -= 1;
        if !expects_named || sibs.is_named_at(i) {
            return Some(i);
        }
    }
    None
}
