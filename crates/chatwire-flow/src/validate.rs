// SPDX-FileCopyrightText: 2026 Chatwire Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Structural validation of question flows.

use std::collections::HashSet;

use chatwire_core::ChatwireError;
use chatwire_core::types::QuestionFlow;

/// Check the structural invariants of a flow.
///
/// A valid flow has exactly one initial node, unique node ids, unique option
/// ids within each node, and every option target names an existing node.
/// All violations are reported together in one [`ChatwireError::InvalidFlow`].
pub fn validate(flow: &QuestionFlow) -> Result<(), ChatwireError> {
    let mut problems = Vec::new();

    let initial: Vec<&str> = flow
        .nodes
        .iter()
        .filter(|n| n.is_initial)
        .map(|n| n.id.as_str())
        .collect();
    match initial.len() {
        1 => {}
        0 => problems.push("no initial node".to_string()),
        _ => problems.push(format!("multiple initial nodes: {}", initial.join(", "))),
    }

    let mut node_ids = HashSet::new();
    for node in &flow.nodes {
        if node.id.trim().is_empty() {
            problems.push("node with empty id".to_string());
        }
        if !node_ids.insert(node.id.as_str()) {
            problems.push(format!("duplicate node id `{}`", node.id));
        }
    }

    for node in &flow.nodes {
        let mut option_ids = HashSet::new();
        for option in &node.options {
            if !option_ids.insert(option.id.as_str()) {
                problems.push(format!(
                    "duplicate option id `{}` in node `{}`",
                    option.id, node.id
                ));
            }
            if let Some(target) = &option.target_node_id {
                if !node_ids.contains(target.as_str()) {
                    problems.push(format!(
                        "option `{}` in node `{}` targets unknown node `{target}`",
                        option.id, node.id
                    ));
                }
            }
        }
    }

    if problems.is_empty() {
        Ok(())
    } else {
        Err(ChatwireError::InvalidFlow(problems.join("; ")))
    }
}
