//! CFG construction
//!
//! Recursively lowers each statement to a sub-CFG and splices it into the
//! enclosing graph. Every completed function / toplevel CFG is verified
//! against the structural invariants; a verification failure is a builder
//! bug and aborts construction.
//!
//! Templates:
//! - block: sequential concatenation, merging adjacent Start/End sentinels
//! - if:    `Start -> Branch -> {then, else} -> Join -> End`
//! - while: `Start -> StartJoin -> Branch -> {body -> StartJoin, EndJoin} -> End`
//! - for:   as while, with a LoopIter binding on the body-entry edge
//! - fn:    `FuncStart -> FuncArg* -> body -> FuncJoin -> End`
//!
//! Break/Continue/Return become terminal nodes wired to their target join at
//! creation; a fix-up pass removes the chain-continuation edges splicing adds
//! afterwards.

use crate::errors::{AnalyzerError, Result};
use crate::features::cfg::{cfg_dot, verify_cfg, Cfg, CfgArena, NodeId, NodeKind};
use crate::features::lowering::domain::{FunctionDef, Program, Stmt};
use crate::features::program::domain::{FunctionCfg, ProgramIr};
use crate::shared::models::{AssignTarget, Span};
use std::collections::BTreeSet;
use tracing::debug;

/// Join targets for break / continue / return inside the construct being
/// lowered
#[derive(Debug, Clone, Copy, Default)]
struct JoinCtx {
    break_join: Option<NodeId>,
    continue_join: Option<NodeId>,
    return_join: Option<NodeId>,
}

/// Lowers a [`Program`] into a verified [`ProgramIr`]
#[derive(Debug, Default)]
pub struct CfgBuilder {
    arena: CfgArena,
}

impl CfgBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build every function CFG plus the toplevel CFG and bundle them
    pub fn build(mut self, program: &Program) -> Result<ProgramIr> {
        let mut cfgs = Vec::with_capacity(program.functions.len() + 1);

        let toplevel_span = program
            .body
            .first()
            .map(|s| s.span().merge(&program.body.last().expect("non-empty").span()))
            .unwrap_or_default();
        let toplevel = self.build_block(&program.body, toplevel_span, JoinCtx::default())?;
        self.verify(&toplevel)?;
        cfgs.push(FunctionCfg {
            name: None,
            signature: "<toplevel>".to_string(),
            scope: 0,
            cfg: toplevel,
        });

        for function in &program.functions {
            let cfg = self.build_function(function)?;
            cfgs.push(FunctionCfg {
                name: Some(function.name.clone()),
                signature: function.signature(),
                scope: function.scope,
                cfg,
            });
        }

        let model = Self::resolve_role(&cfgs, program.model.as_deref(), "model")?;
        let guide = Self::resolve_role(&cfgs, program.guide.as_deref(), "guide")?;

        Ok(ProgramIr::new(self.arena, cfgs, model, guide))
    }

    fn resolve_role(
        cfgs: &[FunctionCfg],
        name: Option<&str>,
        role: &str,
    ) -> Result<Option<usize>> {
        match name {
            None => Ok(None),
            Some(name) => cfgs
                .iter()
                .position(|f| f.name.as_deref() == Some(name))
                .map(Some)
                .ok_or_else(|| {
                    AnalyzerError::malformed_cfg(format!(
                        "{} function '{}' is not defined",
                        role, name
                    ))
                }),
        }
    }

    fn verify(&self, cfg: &Cfg) -> Result<()> {
        verify_cfg(&self.arena, cfg).inspect_err(|_| {
            debug!(dot = %cfg_dot(&self.arena, cfg, true), "CFG verification failed");
        })
    }

    /// `FuncStart -> FuncArg_1 -> ... -> FuncArg_n -> body -> FuncJoin -> End`
    /// with every Return rewired to FuncJoin.
    fn build_function(&mut self, function: &FunctionDef) -> Result<Cfg> {
        let func_join = self.arena.alloc(NodeKind::Join, function.span);

        let ctx = JoinCtx {
            break_join: None,
            continue_join: None,
            return_join: Some(func_join),
        };
        let body = self.build_block(&function.body, function.span, ctx)?;

        let mut nodes = body.nodes.clone();
        nodes.insert(func_join);

        let start = self.arena.alloc(
            NodeKind::FuncStart {
                signature: function.signature(),
            },
            function.span,
        );
        let mut current = start;
        for (index, param) in function.params.iter().enumerate() {
            let arg = self.arena.alloc(
                NodeKind::FuncArg {
                    target: AssignTarget::simple(param.name.clone(), function.scope, param.span),
                    default: param.default.clone(),
                    name: param.name.clone(),
                    index,
                },
                param.span,
            );
            self.arena.add_edge(current, arg);
            nodes.insert(arg);
            current = arg;
        }
        let end = self.arena.alloc(NodeKind::End, function.span);

        let n1 = self.arena.only_child(body.start)?;
        let n2 = self.arena.only_parent(body.end)?;
        self.arena.delete_edge(n2, body.end);
        self.arena.delete_edge(body.start, n1);

        self.arena.add_edge(current, n1);
        self.arena.add_edge(n2, func_join);
        self.arena.add_edge(func_join, end);

        self.fix_terminal_nodes(&nodes, |kind| matches!(kind, NodeKind::Return { .. }), func_join);

        let cfg = Cfg::new(start, nodes, end);
        self.verify(&cfg)?;
        Ok(cfg)
    }

    /// Sequential concatenation of the statements' sub-CFGs. A
    /// break/continue/return statement terminates the chain; trailing dead
    /// code is dropped.
    fn build_block(&mut self, stmts: &[Stmt], span: Span, ctx: JoinCtx) -> Result<Cfg> {
        let start = self.arena.alloc(NodeKind::Start, span);
        let end = self.arena.alloc(NodeKind::End, span);
        let mut nodes = BTreeSet::new();

        if stmts.is_empty() {
            let skip = self.arena.alloc(NodeKind::Skip, span);
            nodes.insert(skip);
            self.arena.add_edge(start, skip);
            self.arena.add_edge(skip, end);
            return Ok(Cfg::new(start, nodes, end));
        }

        let mut current = start;
        for stmt in stmts {
            match stmt {
                Stmt::Break { span } | Stmt::Continue { span } | Stmt::Return { span, .. } => {
                    let (kind, goto, what) = match stmt {
                        Stmt::Break { .. } => (NodeKind::Break, ctx.break_join, "break"),
                        Stmt::Continue { .. } => (NodeKind::Continue, ctx.continue_join, "continue"),
                        Stmt::Return { value, .. } => (
                            NodeKind::Return {
                                value: value.clone(),
                            },
                            ctx.return_join,
                            "return",
                        ),
                        _ => unreachable!(),
                    };
                    let goto = goto.ok_or_else(|| {
                        AnalyzerError::unsupported(
                            format!("'{}' outside of its enclosing construct", what),
                            *span,
                        )
                    })?;
                    let special = self.arena.alloc(kind, *span);
                    nodes.insert(special);
                    self.arena.add_edge(current, special);
                    self.arena.add_edge(special, goto);
                    current = special;
                    // anything after an unconditional jump is unreachable
                    break;
                }
                _ => {
                    let sub = self.build_stmt(stmt, ctx)?;
                    nodes.extend(sub.nodes.iter().copied());

                    let n1 = self.arena.only_child(sub.start)?;
                    let n2 = self.arena.only_parent(sub.end)?;
                    self.arena.delete_edge(sub.start, n1);
                    self.arena.add_edge(current, n1);
                    self.arena.delete_edge(n2, sub.end);
                    current = n2;
                }
            }
        }
        self.arena.add_edge(current, end);
        Ok(Cfg::new(start, nodes, end))
    }

    fn build_stmt(&mut self, stmt: &Stmt, ctx: JoinCtx) -> Result<Cfg> {
        match stmt {
            Stmt::Assign { target, value, span } => self.build_simple(
                NodeKind::Assign {
                    target: target.clone(),
                    value: value.clone(),
                },
                *span,
            ),
            Stmt::Sample {
                target,
                name,
                address,
                dist,
                value,
                span,
            } => self.build_simple(
                NodeKind::Sample {
                    target: target.clone(),
                    name: name.clone(),
                    address: address.clone(),
                    dist: dist.clone(),
                    value: value.clone(),
                },
                *span,
            ),
            Stmt::Factor { value, dist, span } => self.build_simple(
                NodeKind::Factor {
                    value: value.clone(),
                    dist: dist.clone(),
                },
                *span,
            ),
            Stmt::Expr { value, span } => self.build_simple(
                NodeKind::Expr {
                    value: value.clone(),
                },
                *span,
            ),
            Stmt::If {
                test,
                then,
                orelse,
                span,
            } => self.build_if(test, then, orelse, *span, ctx),
            Stmt::While { test, body, span } => self.build_while(test, body, *span, ctx),
            Stmt::For {
                target,
                iter,
                body,
                span,
            } => self.build_for(target, iter, body, *span, ctx),
            Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Return { .. } => Err(
                AnalyzerError::internal("terminal statements are lowered by build_block"),
            ),
        }
    }

    /// `Start -> node -> End`
    fn build_simple(&mut self, kind: NodeKind, span: Span) -> Result<Cfg> {
        let start = self.arena.alloc(NodeKind::Start, span);
        let end = self.arena.alloc(NodeKind::End, span);
        let node = self.arena.alloc(kind, span);
        self.arena.add_edge(start, node);
        self.arena.add_edge(node, end);
        Ok(Cfg::new(start, BTreeSet::from([node]), end))
    }

    /// `Start -> Branch -> {then-sub, else-sub} -> Join -> End`; with no else
    /// arm the Branch's orelse edge goes directly to the Join.
    fn build_if(
        &mut self,
        test: &crate::shared::models::Expr,
        then: &[Stmt],
        orelse: &[Stmt],
        span: Span,
        ctx: JoinCtx,
    ) -> Result<Cfg> {
        let start = self.arena.alloc(NodeKind::Start, span);
        let end = self.arena.alloc(NodeKind::End, span);
        let branch = self.arena.alloc(
            NodeKind::Branch {
                test: test.clone(),
                then: None,
                orelse: None,
                join_nodes: BTreeSet::new(),
            },
            test.span,
        );
        let join = self.arena.alloc(NodeKind::Join, span);

        // break, continue and return statements in the arms can flow to
        // joins of enclosing constructs
        self.add_join_node(branch, join);
        for enclosing in [ctx.break_join, ctx.continue_join, ctx.return_join]
            .into_iter()
            .flatten()
        {
            self.add_join_node(branch, enclosing);
        }

        let mut nodes = BTreeSet::from([branch, join]);
        self.arena.add_edge(start, branch);
        self.arena.add_edge(join, end);

        let has_else = !orelse.is_empty();
        let arms: Vec<&[Stmt]> = if has_else { vec![then, orelse] } else { vec![then] };

        let mut entry_nodes = Vec::with_capacity(arms.len());
        for arm in arms {
            let sub = self.build_block(arm, span, ctx)?;
            nodes.extend(sub.nodes.iter().copied());

            let n1 = self.arena.only_child(sub.start)?;
            let n2 = self.arena.only_parent(sub.end)?;
            self.arena.delete_edge(sub.start, n1);
            self.arena.delete_edge(n2, sub.end);

            self.arena.add_edge(branch, n1);
            self.arena.add_edge(n2, join);
            entry_nodes.push(n1);
        }

        let orelse_entry = if has_else {
            entry_nodes[1]
        } else {
            self.arena.add_edge(branch, join);
            join
        };
        self.set_branch_successors(branch, entry_nodes[0], orelse_entry);

        Ok(Cfg::new(start, nodes, end))
    }

    /// `Start -> StartJoin -> Branch -> {body -> StartJoin, EndJoin} -> End`
    fn build_while(
        &mut self,
        test: &crate::shared::models::Expr,
        body: &[Stmt],
        span: Span,
        ctx: JoinCtx,
    ) -> Result<Cfg> {
        let start = self.arena.alloc(NodeKind::Start, span);
        let end = self.arena.alloc(NodeKind::End, span);

        let start_join = self.arena.alloc(NodeKind::Join, span);
        let branch = self.arena.alloc(
            NodeKind::Branch {
                test: test.clone(),
                then: None,
                orelse: None,
                join_nodes: BTreeSet::new(),
            },
            test.span,
        );
        let end_join = self.arena.alloc(NodeKind::Join, span);

        self.add_join_node(branch, start_join);
        self.add_join_node(branch, end_join);
        // return statements in the body flow to the function join
        if let Some(return_join) = ctx.return_join {
            self.add_join_node(branch, return_join);
        }

        let mut nodes = BTreeSet::from([start_join, branch, end_join]);
        self.arena.add_edge(start, start_join);
        self.arena.add_edge(start_join, branch);
        self.arena.add_edge(branch, end_join);
        self.arena.add_edge(end_join, end);

        let body_ctx = JoinCtx {
            break_join: Some(end_join),
            continue_join: Some(start_join),
            return_join: ctx.return_join,
        };
        let sub = self.build_block(body, span, body_ctx)?;
        nodes.extend(sub.nodes.iter().copied());

        let n1 = self.arena.only_child(sub.start)?;
        let n2 = self.arena.only_parent(sub.end)?;
        self.arena.delete_edge(sub.start, n1);
        self.arena.delete_edge(n2, sub.end);

        self.arena.add_edge(branch, n1);
        self.arena.add_edge(n2, start_join);
        self.set_branch_successors(branch, n1, end_join);

        self.fix_break_continue(&nodes, end_join, start_join);

        Ok(Cfg::new(start, nodes, end))
    }

    /// As while, with a LoopIter node on the body-entry edge binding the
    /// induction variable. The Branch tests the iterator expression.
    fn build_for(
        &mut self,
        target: &AssignTarget,
        iter: &crate::shared::models::Expr,
        body: &[Stmt],
        span: Span,
        ctx: JoinCtx,
    ) -> Result<Cfg> {
        let start = self.arena.alloc(NodeKind::Start, span);
        let end = self.arena.alloc(NodeKind::End, span);

        let start_join = self.arena.alloc(NodeKind::Join, span);
        let branch = self.arena.alloc(
            NodeKind::Branch {
                test: iter.clone(),
                then: None,
                orelse: None,
                join_nodes: BTreeSet::new(),
            },
            iter.span,
        );
        let end_join = self.arena.alloc(NodeKind::Join, span);
        let loop_iter = self.arena.alloc(
            NodeKind::LoopIter {
                target: target.clone(),
                iter: iter.clone(),
            },
            target.span,
        );

        self.add_join_node(branch, start_join);
        self.add_join_node(branch, end_join);
        if let Some(return_join) = ctx.return_join {
            self.add_join_node(branch, return_join);
        }

        let mut nodes = BTreeSet::from([start_join, branch, end_join, loop_iter]);
        self.arena.add_edge(start, start_join);
        self.arena.add_edge(start_join, branch);
        self.arena.add_edge(branch, end_join);
        self.arena.add_edge(end_join, end);

        let body_ctx = JoinCtx {
            break_join: Some(end_join),
            continue_join: Some(start_join),
            return_join: ctx.return_join,
        };
        let sub = self.build_block(body, span, body_ctx)?;
        nodes.extend(sub.nodes.iter().copied());

        let n1 = self.arena.only_child(sub.start)?;
        let n2 = self.arena.only_parent(sub.end)?;
        self.arena.delete_edge(sub.start, n1);
        self.arena.delete_edge(n2, sub.end);

        self.arena.add_edge(branch, loop_iter);
        self.arena.add_edge(loop_iter, n1);
        self.arena.add_edge(n2, start_join);
        self.set_branch_successors(branch, loop_iter, end_join);

        self.fix_break_continue(&nodes, end_join, start_join);

        Ok(Cfg::new(start, nodes, end))
    }

    /// Delete the chain-continuation edges out of break/continue nodes that
    /// target this loop's joins. Terminals already rewired by an inner loop
    /// keep their edge untouched.
    fn fix_break_continue(&mut self, nodes: &BTreeSet<NodeId>, break_join: NodeId, continue_join: NodeId) {
        self.fix_terminal_nodes(nodes, |kind| matches!(kind, NodeKind::Break), break_join);
        self.fix_terminal_nodes(nodes, |kind| matches!(kind, NodeKind::Continue), continue_join);
    }

    fn fix_terminal_nodes(
        &mut self,
        nodes: &BTreeSet<NodeId>,
        select: impl Fn(&NodeKind) -> bool,
        target: NodeId,
    ) {
        for &id in nodes {
            let node = self.arena.node(id);
            if !select(&node.kind) || !node.children.contains(&target) {
                continue;
            }
            let discard: Vec<NodeId> = node
                .children
                .iter()
                .copied()
                .filter(|&child| child != target)
                .collect();
            for child in discard {
                self.arena.delete_edge(id, child);
            }
        }
    }

    fn add_join_node(&mut self, branch: NodeId, join: NodeId) {
        if let NodeKind::Branch { join_nodes, .. } = &mut self.arena.node_mut(branch).kind {
            join_nodes.insert(join);
        }
    }

    fn set_branch_successors(&mut self, branch: NodeId, then: NodeId, orelse: NodeId) {
        if let NodeKind::Branch {
            then: then_slot,
            orelse: orelse_slot,
            ..
        } = &mut self.arena.node_mut(branch).kind
        {
            *then_slot = Some(then);
            *orelse_slot = Some(orelse);
        }
    }
}

/// Convenience entry point: lower a program and verify every CFG
pub fn build_program(program: &Program) -> Result<ProgramIr> {
    CfgBuilder::new().build(program)
}
