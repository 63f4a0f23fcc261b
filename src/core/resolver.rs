//! Dependency resolution - partitions a step list into execution levels
//!
//! A level is a maximal set of mutually independent steps; every step's
//! dependencies live in strictly earlier levels, so a level can be dispatched
//! as one parallel batch behind a barrier.

use crate::core::plan::PlanError;
use crate::core::step::Step;
use std::collections::HashMap;

/// Partition `steps` into ordered levels.
///
/// Level 0 holds the steps with no dependencies; every other step lands at
/// `1 + max(level of its dependencies)`. Steps keep their input order within
/// a level so execution logs stay reproducible.
///
/// Fails with [`PlanError::CircularDependency`] (naming the cycle) or
/// [`PlanError::DanglingDependency`] before producing any partial result.
pub fn resolve(steps: &[Step]) -> Result<Vec<Vec<String>>, PlanError> {
    let index: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    // Reject references to steps that do not exist
    for step in steps {
        for dep in &step.depends_on {
            if !index.contains_key(dep.as_str()) {
                return Err(PlanError::DanglingDependency {
                    step: step.id.clone(),
                    missing: dep.clone(),
                });
            }
        }
    }

    let mut depths: Vec<Option<usize>> = vec![None; steps.len()];
    let mut on_stack = vec![false; steps.len()];
    let mut stack = Vec::new();

    for i in 0..steps.len() {
        visit(i, steps, &index, &mut depths, &mut on_stack, &mut stack)?;
    }

    let max_depth = depths.iter().map(|d| d.unwrap_or(0)).max().unwrap_or(0);
    let mut levels = vec![Vec::new(); if steps.is_empty() { 0 } else { max_depth + 1 }];
    for (i, step) in steps.iter().enumerate() {
        let depth = depths[i].unwrap_or(0);
        levels[depth].push(step.id.clone());
    }

    Ok(levels)
}

fn visit(
    i: usize,
    steps: &[Step],
    index: &HashMap<&str, usize>,
    depths: &mut Vec<Option<usize>>,
    on_stack: &mut Vec<bool>,
    stack: &mut Vec<String>,
) -> Result<usize, PlanError> {
    if let Some(depth) = depths[i] {
        return Ok(depth);
    }

    if on_stack[i] {
        // Report the cycle members in traversal order
        let pos = stack
            .iter()
            .position(|id| id == &steps[i].id)
            .unwrap_or(0);
        let mut cycle: Vec<String> = stack[pos..].to_vec();
        cycle.push(steps[i].id.clone());
        return Err(PlanError::CircularDependency { cycle });
    }

    on_stack[i] = true;
    stack.push(steps[i].id.clone());

    let mut depth = 0;
    for dep in &steps[i].depends_on {
        let j = index[dep.as_str()];
        depth = depth.max(1 + visit(j, steps, index, depths, on_stack, stack)?);
    }

    stack.pop();
    on_stack[i] = false;
    depths[i] = Some(depth);

    Ok(depth)
}
