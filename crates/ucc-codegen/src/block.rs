//! Basic blocks and the per-function control-flow graph.
//!
//! Blocks live in a per-function arena ([`Cfg`]) and reference each
//! other through [`BlockId`] indices: a singly-linked `next` pointer for
//! layout order, predecessor index lists, and `taken`/`fall_through`
//! children on condition blocks. Index references keep the graph free of
//! owning cycles.
//!
//! [`Cfg::linearize`] flattens the layout chain into the indexed
//! instruction vector the dataflow engine works on; [`Cfg::to_dot`]
//! projects the arena into a petgraph `DiGraph` and renders DOT for the
//! `--cfg` flag.

use petgraph::dot::Dot;
use petgraph::graph::{DiGraph, NodeIndex};
use serde::{Deserialize, Serialize};

use crate::error::CodegenError;
use crate::ir::Instr;

/// Index of a block within its function's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BlockId(pub u32);

impl BlockId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// Whether a block is plain straight-line code or a loop/assert header
/// with explicit branch children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockKind {
    Basic,
    Condition {
        taken: Option<BlockId>,
        fall_through: Option<BlockId>,
    },
}

/// A named straight-line instruction sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub label: String,
    pub instrs: Vec<Instr>,
    /// Layout successor: the block emitted immediately after this one.
    pub next: Option<BlockId>,
    pub preds: Vec<BlockId>,
    pub kind: BlockKind,
}

impl Block {
    fn new(label: impl Into<String>, kind: BlockKind) -> Self {
        Block {
            label: label.into(),
            instrs: Vec::new(),
            next: None,
            preds: Vec::new(),
            kind,
        }
    }
}

/// A per-function block arena rooted at `entry`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cfg {
    blocks: Vec<Block>,
    pub entry: BlockId,
}

impl Cfg {
    /// Create a CFG whose entry block carries the given label.
    pub fn new(entry_label: impl Into<String>) -> Self {
        Cfg {
            blocks: vec![Block::new(entry_label, BlockKind::Basic)],
            entry: BlockId(0),
        }
    }

    pub fn add_basic(&mut self, label: impl Into<String>) -> BlockId {
        self.add(Block::new(label, BlockKind::Basic))
    }

    pub fn add_condition(&mut self, label: impl Into<String>) -> BlockId {
        self.add(Block::new(
            label,
            BlockKind::Condition {
                taken: None,
                fall_through: None,
            },
        ))
    }

    fn add(&mut self, block: Block) -> BlockId {
        let id = BlockId(self.blocks.len() as u32);
        self.blocks.push(block);
        id
    }

    pub fn block(&self, id: BlockId) -> &Block {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut Block {
        &mut self.blocks[id.index()]
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Append an instruction to `block`.
    pub fn push(&mut self, block: BlockId, instr: Instr) {
        self.blocks[block.index()].instrs.push(instr);
    }

    /// Link `from` to `to` in layout order and record the predecessor.
    pub fn link(&mut self, from: BlockId, to: BlockId) {
        self.blocks[from.index()].next = Some(to);
        self.blocks[to.index()].preds.push(from);
    }

    /// Attach the `taken`/`fall_through` children of a condition block.
    pub fn set_branches(&mut self, cond: BlockId, taken: BlockId, fall_through: BlockId) {
        if let BlockKind::Condition {
            taken: t,
            fall_through: ft,
        } = &mut self.blocks[cond.index()].kind
        {
            *t = Some(taken);
            *ft = Some(fall_through);
        }
    }

    /// Flatten the layout chain into one instruction vector. Labels and
    /// branches carry all control-flow information, so the block
    /// structure is not needed again until the optimizer writes its
    /// result back.
    pub fn linearize(&self) -> Vec<Instr> {
        let mut code = Vec::new();
        let mut seen = vec![false; self.blocks.len()];
        let mut cursor = Some(self.entry);
        while let Some(id) = cursor {
            if seen[id.index()] {
                break;
            }
            seen[id.index()] = true;
            let block = &self.blocks[id.index()];
            code.extend(block.instrs.iter().cloned());
            cursor = block.next;
        }
        code
    }

    /// Like [`linearize`](Self::linearize) but reports a revisited block
    /// as the internal error it is.
    pub fn try_linearize(&self) -> Result<Vec<Instr>, CodegenError> {
        let mut code = Vec::new();
        let mut seen = vec![false; self.blocks.len()];
        let mut cursor = Some(self.entry);
        while let Some(id) = cursor {
            if seen[id.index()] {
                return Err(CodegenError::InvalidLayout {
                    label: self.blocks[id.index()].label.clone(),
                });
            }
            seen[id.index()] = true;
            let block = &self.blocks[id.index()];
            code.extend(block.instrs.iter().cloned());
            cursor = block.next;
        }
        Ok(code)
    }

    /// Project the arena into a petgraph graph: one node per block, edges
    /// for layout order and condition branches.
    pub fn to_graph(&self) -> DiGraph<String, &'static str> {
        let mut graph = DiGraph::new();
        let nodes: Vec<NodeIndex> = self
            .blocks
            .iter()
            .map(|b| {
                let mut text = format!("{}\\l", b.label);
                for instr in &b.instrs {
                    text.push_str(&instr.to_string());
                    text.push_str("\\l");
                }
                graph.add_node(text)
            })
            .collect();

        for (i, block) in self.blocks.iter().enumerate() {
            if let Some(next) = block.next {
                graph.add_edge(nodes[i], nodes[next.index()], "next");
            }
            if let BlockKind::Condition {
                taken,
                fall_through,
            } = block.kind
            {
                if let Some(t) = taken {
                    graph.add_edge(nodes[i], nodes[t.index()], "taken");
                }
                if let Some(ft) = fall_through {
                    graph.add_edge(nodes[i], nodes[ft.index()], "fall");
                }
            }
        }
        graph
    }

    /// Render this CFG in DOT format for the `--cfg` flag.
    pub fn to_dot(&self) -> String {
        format!("{}", Dot::new(&self.to_graph()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Instr;
    use ucc_core::PrimType;

    fn label(name: &str) -> Instr {
        Instr::Label(name.to_string())
    }

    #[test]
    fn linearize_follows_layout_chain() {
        let mut cfg = Cfg::new("main");
        cfg.push(cfg.entry, label("entry"));
        let body = cfg.add_basic("body");
        cfg.push(body, label("body"));
        let exit = cfg.add_basic("exit");
        cfg.push(exit, label("exit"));
        cfg.link(cfg.entry, body);
        cfg.link(body, exit);

        let code = cfg.linearize();
        let labels: Vec<String> = code.iter().map(|i| i.opcode()).collect();
        assert_eq!(labels, vec!["entry:", "body:", "exit:"]);
    }

    #[test]
    fn predecessors_recorded_by_link() {
        let mut cfg = Cfg::new("f");
        let a = cfg.add_basic("a");
        let b = cfg.add_basic("b");
        cfg.link(cfg.entry, a);
        cfg.link(a, b);
        assert_eq!(cfg.block(b).preds, vec![a]);
        assert_eq!(cfg.block(a).preds, vec![cfg.entry]);
    }

    #[test]
    fn condition_block_branches() {
        let mut cfg = Cfg::new("f");
        let cond = cfg.add_condition("while.cond");
        let body = cfg.add_basic("while.body");
        let end = cfg.add_basic("while.end");
        cfg.set_branches(cond, body, end);
        match cfg.block(cond).kind {
            BlockKind::Condition {
                taken,
                fall_through,
            } => {
                assert_eq!(taken, Some(body));
                assert_eq!(fall_through, Some(end));
            }
            BlockKind::Basic => unreachable!("condition block lost its kind"),
        }
    }

    #[test]
    fn try_linearize_rejects_cycles() {
        let mut cfg = Cfg::new("f");
        let a = cfg.add_basic("a");
        cfg.link(cfg.entry, a);
        // Malformed layout: a loops back to the entry block.
        cfg.block_mut(a).next = Some(cfg.entry);
        assert!(matches!(
            cfg.try_linearize(),
            Err(CodegenError::InvalidLayout { .. })
        ));
    }

    #[test]
    fn dot_output_names_blocks() {
        let mut cfg = Cfg::new("main");
        cfg.push(
            cfg.entry,
            Instr::Alloc {
                ty: PrimType::Int,
                dims: Default::default(),
                dst: "%1".to_string(),
            },
        );
        let exit = cfg.add_basic("exit");
        cfg.link(cfg.entry, exit);
        let dot = cfg.to_dot();
        assert!(dot.contains("digraph"));
        assert!(dot.contains("alloc_int %1"));
        assert!(dot.contains("next"));
    }
}
