//! Control-flow graph construction.
//!
//! [`ControlFlowGraph::build`] splits a decoded instruction vector into basic blocks, adds the
//! synthetic entry, exit and handler placeholder nodes, and wires normal and exceptional edges
//! between them. Dominators and dominance frontiers are computed on first access.

use std::{collections::HashSet, fmt::Write, sync::OnceLock};

use crate::{
    analysis::cfg::{BasicBlock, ControlFlowNode, EdgeKind, NodeKind},
    disassembler::{FlowType, Instruction, InstructionId},
    metadata::code::ExceptionTableEntry,
    utils::graph::{
        algorithms::{self, DominatorTree},
        DirectedGraph, GraphBase, NodeId, Predecessors, RootedGraph, Successors,
    },
    Error::{GraphError, HandlerNodeMissing},
    Result,
};

/// Control-flow graph of one method body.
///
/// Nodes are laid out in a fixed order: [`NodeKind::Entry`], [`NodeKind::RegularExit`],
/// [`NodeKind::ExceptionalExit`], then one [`NodeKind::NormalBlock`] per basic block in offset
/// order, then one [`NodeKind::HandlerPlaceholder`] per exception table row in table order.
///
/// # Edges
///
/// - `Entry` to the first block
/// - Fall-through between adjacent blocks, except into a handler's first block
/// - Every branch and switch target; targets past the end of the code go to `RegularExit`
/// - Returns to `RegularExit`; `ret` to every instruction following a `jsr`
/// - A block inside a try range to the placeholder of the first table row covering it
/// - A placeholder to its handler's first block, and to the placeholder of the first later
///   row whose range encloses its own, or to `ExceptionalExit`
/// - An uncaught `athrow` to `ExceptionalExit`
///
/// # Thread Safety
///
/// `ControlFlowGraph` is [`Send`] and [`Sync`]; lazily computed analyses use [`OnceLock`].
#[derive(Debug)]
pub struct ControlFlowGraph {
    graph: DirectedGraph<ControlFlowNode, EdgeKind>,
    entry: NodeId,
    regular_exit: NodeId,
    exceptional_exit: NodeId,
    /// Block nodes in offset order
    blocks: Vec<NodeId>,
    /// Placeholder nodes in exception table order
    placeholders: Vec<NodeId>,
    /// Block index of every instruction
    block_of: Vec<usize>,
    dominators: OnceLock<DominatorTree>,
    dominance_frontiers: OnceLock<Vec<HashSet<NodeId>>>,
}

/// Returns the index of the first instruction at or after `offset`.
fn first_at_or_after(instructions: &[Instruction], offset: u32) -> usize {
    instructions.partition_point(|instruction| instruction.offset < offset)
}

/// Marks every instruction that starts a basic block.
fn find_leaders(instructions: &[Instruction], exception_table: &[ExceptionTableEntry]) -> Vec<bool> {
    let mut leaders = vec![false; instructions.len()];
    let mut mark = |index: usize| {
        if let Some(leader) = leaders.get_mut(index) {
            *leader = true;
        }
    };

    mark(0);
    for (index, instruction) in instructions.iter().enumerate() {
        for target in instruction.targets() {
            if !target.is_sentinel() {
                mark(target.index());
            }
        }
        if instruction.is_terminal() {
            mark(index + 1);
        }
    }

    for entry in exception_table {
        mark(first_at_or_after(instructions, u32::from(entry.start)));
        mark(first_at_or_after(instructions, u32::from(entry.end)));
        mark(first_at_or_after(instructions, u32::from(entry.handler)));
    }

    leaders
}

/// Splits the instructions into basic blocks at the leaders.
fn split_blocks(instructions: &[Instruction], leaders: &[bool]) -> Vec<BasicBlock> {
    let mut blocks = Vec::new();
    let mut first = 0;

    for index in 0..instructions.len() {
        let is_last = index + 1 == instructions.len() || leaders[index + 1];
        if is_last {
            blocks.push(BasicBlock {
                first: InstructionId(first),
                last: InstructionId(index),
                start_offset: instructions[first].offset,
                end_offset: instructions[index].end_offset(),
            });
            first = index + 1;
        }
    }

    blocks
}

impl ControlFlowGraph {
    /// Builds the graph of a decoded method.
    ///
    /// # Arguments
    ///
    /// * `instructions` - The method's instructions in offset order, targets resolved
    /// * `exception_table` - The raw rows of the method's exception table
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::HandlerNodeMissing`] if a handler offset is not the offset of an
    /// instruction.
    pub fn build(
        instructions: &[Instruction],
        exception_table: &[ExceptionTableEntry],
    ) -> Result<Self> {
        let leaders = find_leaders(instructions, exception_table);
        let basic_blocks = split_blocks(instructions, &leaders);

        let mut block_of = vec![0; instructions.len()];
        for (index, block) in basic_blocks.iter().enumerate() {
            for slot in &mut block_of[block.first.index()..=block.last.index()] {
                *slot = index;
            }
        }

        let mut graph = DirectedGraph::with_capacity(
            basic_blocks.len() + exception_table.len() + 3,
            basic_blocks.len() * 2 + exception_table.len() * 2,
        );
        let entry = graph.add_node(ControlFlowNode::Entry);
        let regular_exit = graph.add_node(ControlFlowNode::RegularExit);
        let exceptional_exit = graph.add_node(ControlFlowNode::ExceptionalExit);
        let blocks: Vec<NodeId> = basic_blocks
            .iter()
            .map(|block| graph.add_node(ControlFlowNode::Block(*block)))
            .collect();
        let placeholders: Vec<NodeId> = exception_table
            .iter()
            .enumerate()
            .map(|(index, row)| {
                graph.add_node(ControlFlowNode::HandlerPlaceholder {
                    entry: index,
                    handler_offset: u32::from(row.handler),
                })
            })
            .collect();

        let mut cfg = ControlFlowGraph {
            graph,
            entry,
            regular_exit,
            exceptional_exit,
            blocks,
            placeholders,
            block_of,
            dominators: OnceLock::new(),
            dominance_frontiers: OnceLock::new(),
        };

        let mut handler_blocks = HashSet::new();
        for row in exception_table {
            let handler = cfg
                .block_at(instructions, u32::from(row.handler))
                .ok_or(HandlerNodeMissing(u32::from(row.handler)))?;
            handler_blocks.insert(handler);
        }

        cfg.add_normal_edges(instructions, exception_table, &basic_blocks, &handler_blocks)?;
        cfg.add_exceptional_edges(instructions, exception_table, &basic_blocks)?;

        Ok(cfg)
    }

    fn connect(&mut self, source: NodeId, target: NodeId, kind: EdgeKind) -> Result<()> {
        if !self.graph.has_edge(source, target) {
            self.graph.add_edge(source, target, kind)?;
        }
        Ok(())
    }

    fn target_node(&self, target: InstructionId) -> Result<NodeId> {
        if target.is_sentinel() {
            return Ok(self.regular_exit);
        }

        self.block_of
            .get(target.index())
            .map(|&block| self.blocks[block])
            .ok_or_else(|| GraphError(format!("Branch target {target} is not an instruction")))
    }

    fn add_normal_edges(
        &mut self,
        instructions: &[Instruction],
        exception_table: &[ExceptionTableEntry],
        basic_blocks: &[BasicBlock],
        handler_blocks: &HashSet<NodeId>,
    ) -> Result<()> {
        if let Some(&first) = self.blocks.first() {
            self.connect(self.entry, first, EdgeKind::Normal)?;
        }

        let return_points: Vec<NodeId> = instructions
            .iter()
            .enumerate()
            .filter(|(_, instruction)| instruction.flow_type == FlowType::Subroutine)
            .filter_map(|(index, _)| self.block_of.get(index + 1))
            .map(|&block| self.blocks[block])
            .collect();

        for (index, block) in basic_blocks.iter().enumerate() {
            let node = self.blocks[index];
            let last = &instructions[block.last.index()];

            for target in last.targets() {
                let target = self.target_node(target)?;
                self.connect(node, target, EdgeKind::Normal)?;
            }

            match last.flow_type {
                FlowType::Return => self.connect(node, self.regular_exit, EdgeKind::Normal)?,
                FlowType::Throw => {
                    if !exception_table.iter().any(|row| row.covers(last.offset)) {
                        self.connect(node, self.exceptional_exit, EdgeKind::Exceptional)?;
                    }
                }
                FlowType::SubroutineReturn => {
                    for &point in &return_points {
                        self.connect(node, point, EdgeKind::Normal)?;
                    }
                }
                _ => {}
            }

            if last.falls_through() {
                match self.blocks.get(index + 1) {
                    Some(&next) if handler_blocks.contains(&next) => {}
                    Some(&next) => self.connect(node, next, EdgeKind::Normal)?,
                    None => self.connect(node, self.regular_exit, EdgeKind::Normal)?,
                }
            }
        }

        Ok(())
    }

    fn add_exceptional_edges(
        &mut self,
        instructions: &[Instruction],
        exception_table: &[ExceptionTableEntry],
        basic_blocks: &[BasicBlock],
    ) -> Result<()> {
        for (index, block) in basic_blocks.iter().enumerate() {
            let last = &instructions[block.last.index()];
            if let Some(row) = exception_table.iter().position(|row| row.covers(last.offset)) {
                self.connect(self.blocks[index], self.placeholders[row], EdgeKind::Exceptional)?;
            }
        }

        for (index, row) in exception_table.iter().enumerate() {
            let placeholder = self.placeholders[index];
            if let Some(handler) = self.block_at(instructions, u32::from(row.handler)) {
                self.connect(placeholder, handler, EdgeKind::Normal)?;
            }

            let enclosing = exception_table
                .iter()
                .enumerate()
                .skip(index + 1)
                .find(|(_, outer)| outer.start <= row.start && row.end <= outer.end)
                .map_or(self.exceptional_exit, |(outer, _)| self.placeholders[outer]);
            self.connect(placeholder, enclosing, EdgeKind::Exceptional)?;
        }

        Ok(())
    }

    /// Returns the entry node.
    #[must_use]
    pub fn entry(&self) -> NodeId {
        self.entry
    }

    /// Returns the node returns flow into.
    #[must_use]
    pub fn regular_exit(&self) -> NodeId {
        self.regular_exit
    }

    /// Returns the node uncaught exceptions flow into.
    #[must_use]
    pub fn exceptional_exit(&self) -> NodeId {
        self.exceptional_exit
    }

    /// Returns the node `node`.
    #[must_use]
    pub fn node(&self, node: NodeId) -> Option<&ControlFlowNode> {
        self.graph.node(node)
    }

    /// Returns the kind of `node`.
    #[must_use]
    pub fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.node(node).map(ControlFlowNode::kind)
    }

    /// Returns the basic block of `node`, if it is a block node.
    #[must_use]
    pub fn block(&self, node: NodeId) -> Option<&BasicBlock> {
        self.node(node).and_then(ControlFlowNode::block)
    }

    /// Number of basic blocks.
    #[must_use]
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Block nodes in offset order.
    pub fn blocks(&self) -> impl Iterator<Item = (NodeId, &BasicBlock)> + '_ {
        self.blocks
            .iter()
            .filter_map(|&node| self.block(node).map(|block| (node, block)))
    }

    /// The block node whose first instruction is at `offset`.
    #[must_use]
    pub fn block_at(&self, instructions: &[Instruction], offset: u32) -> Option<NodeId> {
        let index = instructions
            .binary_search_by_key(&offset, |instruction| instruction.offset)
            .ok()?;
        let node = self.blocks[*self.block_of.get(index)?];
        self.block(node)
            .is_some_and(|block| block.first.index() == index)
            .then_some(node)
    }

    /// The block node containing instruction `id`.
    #[must_use]
    pub fn block_of(&self, id: InstructionId) -> Option<NodeId> {
        self.block_of.get(id.index()).map(|&block| self.blocks[block])
    }

    /// The placeholder node of exception table row `entry`.
    #[must_use]
    pub fn placeholder(&self, entry: usize) -> Option<NodeId> {
        self.placeholders.get(entry).copied()
    }

    /// Successors of `node` with their edge kinds.
    pub fn outgoing_edges(&self, node: NodeId) -> impl Iterator<Item = (NodeId, EdgeKind)> + '_ {
        self.graph
            .outgoing_edges(node)
            .map(|(target, kind)| (target, *kind))
    }

    /// Returns the underlying graph.
    #[must_use]
    pub fn graph(&self) -> &DirectedGraph<ControlFlowNode, EdgeKind> {
        &self.graph
    }

    /// Returns the dominator tree, computed on first access.
    #[must_use]
    pub fn dominators(&self) -> &DominatorTree {
        self.dominators
            .get_or_init(|| algorithms::compute_dominators(&self.graph, self.entry))
    }

    /// Returns the dominance frontiers, indexed by node, computed on first access.
    #[must_use]
    pub fn dominance_frontiers(&self) -> &Vec<HashSet<NodeId>> {
        self.dominance_frontiers.get_or_init(|| {
            algorithms::compute_dominance_frontiers(&self.graph, self.dominators())
        })
    }

    /// Returns the dominance frontier of `node`.
    #[must_use]
    pub fn dominance_frontier(&self, node: NodeId) -> Option<&HashSet<NodeId>> {
        self.dominance_frontiers().get(node.index())
    }

    /// Checks if `dominator` dominates `dominated`.
    #[must_use]
    pub fn dominates(&self, dominator: NodeId, dominated: NodeId) -> bool {
        self.dominators().dominates(dominator, dominated)
    }

    /// Returns the immediate dominator of `node`.
    #[must_use]
    pub fn idom(&self, node: NodeId) -> Option<NodeId> {
        self.dominators().immediate_dominator(node)
    }

    /// Nodes in reverse postorder from the entry.
    #[must_use]
    pub fn reverse_postorder(&self) -> Vec<NodeId> {
        algorithms::reverse_postorder(&self.graph, self.entry)
    }

    /// Renders the graph in Graphviz DOT format.
    #[must_use]
    pub fn to_dot(&self, instructions: &[Instruction], title: Option<&str>) -> String {
        let mut dot = String::new();

        dot.push_str("digraph CFG {\n");
        if let Some(name) = title {
            let _ = writeln!(dot, "    label=\"CFG: {}\";", escape_dot(name));
        }
        dot.push_str("    labelloc=t;\n");
        dot.push_str("    node [shape=box, fontname=\"Courier\", fontsize=10];\n\n");

        for (node, data) in self.graph.nodes() {
            let mut label = format!("{data}\\l");
            if let ControlFlowNode::Block(block) = data {
                for instruction in block.instructions(instructions) {
                    let _ = write!(label, "{}\\l", escape_dot(&instruction.to_string()));
                }
            }

            let style = match data.kind() {
                NodeKind::Entry => ", style=filled, fillcolor=lightgreen",
                NodeKind::RegularExit | NodeKind::ExceptionalExit => {
                    ", style=filled, fillcolor=lightcoral"
                }
                NodeKind::HandlerPlaceholder => ", style=dashed",
                NodeKind::NormalBlock => "",
            };
            let _ = writeln!(dot, "    {node} [label=\"{label}\"{style}];");
        }

        dot.push('\n');

        for node in self.graph.node_ids() {
            for (target, kind) in self.outgoing_edges(node) {
                let color = match kind {
                    EdgeKind::Normal => "black",
                    EdgeKind::Exceptional => "purple",
                };
                let _ = writeln!(dot, "    {node} -> {target} [color={color}];");
            }
        }

        dot.push_str("}\n");
        dot
    }
}

impl GraphBase for ControlFlowGraph {
    fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        self.graph.node_ids()
    }
}

impl Successors for ControlFlowGraph {
    fn successors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.successors(node)
    }
}

impl Predecessors for ControlFlowGraph {
    fn predecessors(&self, node: NodeId) -> impl Iterator<Item = NodeId> {
        self.graph.predecessors(node)
    }
}

impl RootedGraph for ControlFlowGraph {
    fn entry(&self) -> NodeId {
        self.entry
    }
}

fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('<', "\\<")
        .replace('>', "\\>")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{disassembler::decode_instructions, metadata::constpool::ConstantPool};

    fn cfg(code: &[u8], table: &[ExceptionTableEntry]) -> (Vec<Instruction>, ControlFlowGraph) {
        let instructions = decode_instructions(code, &ConstantPool::default()).unwrap();
        let cfg = ControlFlowGraph::build(&instructions, table).unwrap();
        (instructions, cfg)
    }

    fn row(start: u16, end: u16, handler: u16) -> ExceptionTableEntry {
        ExceptionTableEntry {
            start,
            end,
            handler,
            catch_type: None,
        }
    }

    #[test]
    fn straight_line_is_one_block() {
        // iconst_0; istore_1; iload_1; ireturn
        let (_, cfg) = cfg(&[0x03, 0x3C, 0x1B, 0xAC], &[]);

        assert_eq!(cfg.block_count(), 1);
        let (block_node, block) = cfg.blocks().next().unwrap();
        assert_eq!(block.len(), 4);
        assert_eq!((block.start_offset, block.end_offset), (0, 4));
        assert_eq!(cfg.idom(block_node), Some(cfg.entry()));
        assert!(cfg.dominates(block_node, cfg.regular_exit()));
        assert_eq!(cfg.idom(cfg.exceptional_exit()), None);
    }

    #[test]
    fn conditional_diamond() {
        // 0: iload_0; 1: ifeq 8; 4: iconst_1; 5: goto 9; 8: iconst_0; 9: ireturn
        let code = [0x1A, 0x99, 0x00, 0x07, 0x04, 0xA7, 0x00, 0x04, 0x03, 0xAC];
        let (instructions, cfg) = cfg(&code, &[]);

        assert_eq!(cfg.block_count(), 4);
        let head = cfg.block_at(&instructions, 0).unwrap();
        let then = cfg.block_at(&instructions, 4).unwrap();
        let other = cfg.block_at(&instructions, 8).unwrap();
        let join = cfg.block_at(&instructions, 9).unwrap();

        assert_eq!(cfg.idom(join), Some(head));
        assert!(!cfg.dominates(then, join));
        assert_eq!(cfg.dominance_frontier(then).unwrap(), &HashSet::from([join]));
        assert_eq!(cfg.dominance_frontier(other).unwrap(), &HashSet::from([join]));
        assert_eq!(cfg.block_at(&instructions, 5), None);
    }

    #[test]
    fn handler_reached_only_through_placeholder() {
        // 0: nop; 1: nop; 2: return; 3: astore_1; 4: aload_1; 5: athrow
        let table = [row(0, 2, 3)];
        let (instructions, cfg) = cfg(&[0x00, 0x00, 0xB1, 0x4C, 0x2B, 0xBF], &table);

        let placeholder = cfg.placeholder(0).unwrap();
        let handler = cfg.block_at(&instructions, 3).unwrap();
        let protected = cfg.block_at(&instructions, 0).unwrap();

        assert_eq!(cfg.kind(placeholder), Some(NodeKind::HandlerPlaceholder));
        assert_eq!(cfg.idom(handler), Some(placeholder));
        assert!(cfg
            .outgoing_edges(protected)
            .any(|(target, kind)| target == placeholder && kind.is_exceptional()));
        assert!(cfg
            .outgoing_edges(placeholder)
            .any(|(target, _)| target == cfg.exceptional_exit()));
        // the uncaught rethrow leaves through the exceptional exit
        assert!(cfg
            .outgoing_edges(handler)
            .any(|(target, _)| target == cfg.exceptional_exit()));
    }

    #[test]
    fn nested_placeholders_chain_outwards() {
        // 0: nop; 1: nop; 2: return; 3: pop; 4: return; 5: pop; 6: return
        let table = [row(1, 2, 3), row(0, 5, 5)];
        let (_, cfg) = cfg(&[0x00, 0x00, 0xB1, 0x57, 0xB1, 0x57, 0xB1], &table);

        let inner = cfg.placeholder(0).unwrap();
        let outer = cfg.placeholder(1).unwrap();
        assert!(cfg.graph().has_edge(inner, outer));
        assert!(cfg.graph().has_edge(outer, cfg.exceptional_exit()));
    }

    #[test]
    fn missing_handler_is_fatal() {
        let instructions = decode_instructions(&[0x00, 0xB1], &ConstantPool::default()).unwrap();
        let result = ControlFlowGraph::build(&instructions, &[row(0, 1, 7)]);
        assert!(matches!(result, Err(HandlerNodeMissing(7))));
    }

    #[test]
    fn dot_output() {
        let (instructions, cfg) = cfg(&[0xB1], &[]);
        let dot = cfg.to_dot(&instructions, Some("Foo.bar()V"));
        assert!(dot.starts_with("digraph CFG {"));
        assert!(dot.contains("return"));
        assert!(dot.contains("n0 -> n3"));
    }
}
