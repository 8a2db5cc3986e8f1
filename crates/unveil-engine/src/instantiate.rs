//! Template instantiation printer.
//!
//! Uses discovered while synthesizing a declaration are resolved through an
//! explicit stack rather than recursion. A frame is pushed when a key is
//! claimed and synthesized; its own discoveries become its children. A frame
//! is placed once all its children are, so every instantiation lands after
//! the ones it depends on, and siblings keep first-use order.

use crate::context::Context;
use crate::emit::FragmentBuffer;
use crate::error::Result;
use crate::registry::{InstantiationKey, PendingUse};
use std::vec;
use unveil_common::Diagnostic;

/// A synthesized instantiation and the namespace of its template.
#[derive(Debug)]
pub(crate) struct PlacedInstantiation {
    pub key: InstantiationKey,
    pub namespace: Vec<String>,
    pub body: FragmentBuffer,
}

#[derive(Debug, Default)]
pub(crate) struct ResolvedInstantiations {
    /// Template parameter objects the instantiations name; these go first.
    pub objects: FragmentBuffer,
    pub placed: Vec<PlacedInstantiation>,
}

struct Frame {
    key: InstantiationKey,
    namespace: Vec<String>,
    body: FragmentBuffer,
    failed: bool,
    deps: vec::IntoIter<PendingUse>,
}

impl<'c, 'u> Context<'c, 'u> {
    /// Synthesize every instantiation reachable from `roots` that is not
    /// emitted yet, dependencies first.
    pub(crate) fn resolve_instantiations(&mut self, roots: Vec<PendingUse>) -> Result<ResolvedInstantiations> {
        let mut resolved = ResolvedInstantiations::default();
        let mut roots = roots.into_iter();
        let mut stack: Vec<Frame> = Vec::new();
        loop {
            let next = match stack.last_mut() {
                Some(frame) => frame.deps.next(),
                None => roots.next(),
            };
            match next {
                Some(pending) => {
                    if let Some((frame, objects)) = self.push_instantiation(pending)? {
                        resolved.objects.append(objects);
                        stack.push(frame);
                    }
                }
                None => match stack.pop() {
                    Some(frame) => {
                        if !frame.failed {
                            self.registry.mark_emitted(frame.key.clone());
                        }
                        tracing::debug!(key = %frame.key, depth = stack.len(), "instantiation placed");
                        resolved.placed.push(PlacedInstantiation {
                            key: frame.key,
                            namespace: frame.namespace,
                            body: frame.body,
                        });
                    }
                    None => break,
                },
            }
        }
        Ok(resolved)
    }

    /// Claim and synthesize one use. `None` when the key was already claimed
    /// or the unit has no instantiation for it, which leaves it to the
    /// compiler.
    fn push_instantiation(&mut self, pending: PendingUse) -> Result<Option<(Frame, FragmentBuffer)>> {
        let PendingUse { key, used } = pending;
        if !self.registry.claim(&key) {
            return Ok(None);
        }
        let tree = self.tree();
        let Some(info) = tree.template(&used.template) else {
            return Ok(None);
        };
        let Some(decl) = tree.instantiation(&used.template, &used.args) else {
            tracing::debug!(key = %key, "no instantiation in the unit");
            return Ok(None);
        };
        tracing::debug!(key = %key, "instantiating");

        let name = match &info.owner {
            Some(owner) => format!("{}::{}", owner, info.decl.name),
            None => info.decl.name.clone(),
        };
        let display = self.namer.print_name(&name, Some(&used.args));
        let saved_location = self.location.clone();
        self.begin_unit(info.namespace.clone());
        let mut body = FragmentBuffer::new();
        let result = match self.note_template_args(&used.args) {
            Ok(()) => self.synth_specialized_decl(decl, &info.qualified, &display, &used.args, &mut body),
            Err(err) => Err(err),
        };
        let unit = self.end_unit();
        self.location = saved_location;

        match result {
            Ok(()) => {
                let mut placed = unit.prelude;
                placed.append(body);
                let frame = Frame {
                    key,
                    namespace: unit.namespace,
                    body: placed,
                    failed: false,
                    deps: unit.discoveries.into_iter(),
                };
                Ok(Some((frame, unit.objects)))
            }
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                self.rollback_unit(&unit);
                self.registry.mark_failed(key.clone());
                let mut marker = FragmentBuffer::new();
                marker.line(format!("// unveil: could not instantiate `{}`: {}", key, err));
                self.report(
                    Diagnostic::error(err.to_string())
                        .with_location(decl.location.clone())
                        .with_subject(key.to_string())
                        .with_help("the instantiation is left to the compiler"),
                );
                let frame = Frame {
                    key,
                    namespace: unit.namespace,
                    body: marker,
                    failed: true,
                    deps: Vec::new().into_iter(),
                };
                Ok(Some((frame, FragmentBuffer::new())))
            }
        }
    }
}
