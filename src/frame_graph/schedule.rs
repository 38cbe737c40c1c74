//! Frame graph validation and pass scheduling
//!
//! Scheduling walks backwards from the pass that presents to the output window. For every
//! resource that pass uses, the nearest preceding pass that writes the resource has to run
//! first, so it is queued and resolved in turn. Passes that are never reached this way do not
//! contribute to the output and are culled.
//!
//! Dependencies always point to passes declared earlier, so the dependency graph cannot contain
//! cycles and the walk terminates.

use super::pass::{LogicalPass, ResourceAccess};
use super::resource::{GraphId, LogicalResource, ResourceHandle};
use crate::error::{GraphError, TopologyError};
use glam::{UVec2, Vec2};
use std::collections::VecDeque;

fn resource_name(resources: &[LogicalResource], handle: ResourceHandle) -> &str {
    resources
        .get(handle.index())
        .map_or("<unknown>", |resource| resource.name())
}

/// Index of the first pass with an output window.
pub(crate) fn find_output_pass(passes: &[LogicalPass]) -> Option<usize> {
    passes.iter().position(|pass| pass.output_window().is_some())
}

/// Check the structural consistency of a graph.
///
/// Returns the index of the output pass and the current extent of its window.
pub(crate) fn validate(
    graph: GraphId,
    resources: &[LogicalResource],
    passes: &[LogicalPass],
) -> Result<(usize, UVec2), GraphError> {
    log::trace!("Validating frame graph...");

    for pass in passes {
        for (handle, _) in pass.resources() {
            if handle.graph() != graph || handle.index() >= resources.len() {
                return Err(GraphError::Identity {
                    resource: *handle,
                    pass: pass.name().to_string(),
                });
            }
        }
    }

    let mut output = None;
    for (index, pass) in passes.iter().enumerate() {
        if pass.output_window().is_none() {
            continue;
        }
        if let Some(first) = output {
            let first: &LogicalPass = &passes[first];
            return Err(TopologyError::MultipleOutputWindows {
                first: first.name().to_string(),
                second: pass.name().to_string(),
            }
            .into());
        }
        output = Some(index);
    }

    let output = output.ok_or(TopologyError::NoOutputWindow)?;
    let window_extent = passes[output]
        .output_window()
        .map_or(UVec2::ZERO, |window| window.extent());

    for pass in passes {
        let mut pass_extent: Option<Vec2> = None;
        for (handle, binding) in pass.resources() {
            if !binding.usage.is_attachment() {
                continue;
            }
            let extent = resources[handle.index()].resolve_extent(window_extent);
            match pass_extent {
                None => pass_extent = Some(extent),
                Some(expected) if expected != extent => {
                    return Err(GraphError::ExtentMismatch {
                        pass: pass.name().to_string(),
                        expected,
                        found: extent,
                    });
                }
                Some(_) => {}
            }
        }
    }

    log::trace!("  all good.");
    Ok((output, window_extent))
}

/// Compute the execution order of all passes the output pass depends on.
///
/// Returns pass indices, first to run first.
pub(crate) fn schedule(
    resources: &[LogicalResource],
    passes: &[LogicalPass],
    output: usize,
) -> Result<Vec<usize>, GraphError> {
    let mut queue = VecDeque::from([output]);
    let mut order: Vec<usize> = Vec::new();

    while let Some(current) = queue.pop_front() {
        // A pass discovered again has to run before everything that discovered it.
        order.retain(|&index| index != current);
        order.push(current);

        let pass = &passes[current];
        log::trace!("  Resolving dependencies of pass \"{}\"...", pass.name());

        for (handle, binding) in pass.resources() {
            let name = resource_name(resources, *handle);
            log::trace!("    resource \"{name}\"");

            let mut cursor = current;
            loop {
                let preceding = passes[..cursor]
                    .iter()
                    .rposition(|candidate| candidate.binding(*handle).is_some());

                let Some(preceding) = preceding else {
                    if binding.access != ResourceAccess::WriteOnly {
                        return Err(TopologyError::UnsatisfiedInput {
                            resource: name.to_string(),
                            pass: pass.name().to_string(),
                        }
                        .into());
                    }
                    log::trace!("      is created by this pass.");
                    break;
                };

                let preceding_pass = &passes[preceding];
                if binding.access == ResourceAccess::WriteOnly {
                    return Err(TopologyError::ShadowedWrite {
                        resource: name.to_string(),
                        pass: pass.name().to_string(),
                        preceding: preceding_pass.name().to_string(),
                    }
                    .into());
                }

                let writes = preceding_pass
                    .binding(*handle)
                    .is_some_and(|b| b.access.writes());
                if !writes {
                    // Readers do not order against each other; keep looking for the writer.
                    log::trace!("      is read-only in \"{}\".", preceding_pass.name());
                    cursor = preceding;
                    continue;
                }

                queue.retain(|&index| index != preceding);
                queue.push_back(preceding);
                log::trace!("      is written by \"{}\".", preceding_pass.name());
                break;
            }
        }
    }

    order.reverse();

    log::trace!("  Logical pass execution order will be");
    for &index in &order {
        log::trace!("    {}", passes[index].name());
    }

    Ok(order)
}
