//! Atomic-usage detection: a single forward scan that records which
//! backing-store members are targets of atomic memory instructions, so the
//! declaration translator can give them atomic-qualified types.

use tracing::trace;

use crucible_ir::reflect::{ResourceGroup, ResourceType};
use crucible_ir::{OperandKind, ShaderData};

use crate::context::Ctx;
use crate::names::{atomic_var_key, lookup_structured_var_atomic};

/// Append-only list of member identities that need atomic-qualified
/// declarations. Sized up front to one slot per instruction — a loose but
/// guaranteed-sufficient bound; exceeding it means the caller sized the
/// list wrong.
#[derive(Debug, Default)]
pub struct AtomicUsageList {
    keys: Vec<String>,
    capacity: usize,
}

impl AtomicUsageList {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            keys: Vec::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, key: String) {
        debug_assert!(
            self.keys.len() < self.capacity,
            "atomic-usage list overflow: size the list to the instruction count"
        );
        self.keys.push(key);
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Scan the instruction stream for atomic read-modify-write targets.
///
/// Thread-group shared memory targets need no action here (they are
/// declared atomic-capable structurally); typed-UAV targets are resolved at
/// emission time; structured-UAV targets with a compile-time-constant
/// address resolve to the exact member and are recorded.
pub fn detect_atomic_usage(ctx: &Ctx, shader: &ShaderData) -> AtomicUsageList {
    let mut list = AtomicUsageList::with_capacity(shader.instructions.len());

    for inst in &shader.instructions {
        if !inst.opcode.is_atomic() {
            continue;
        }
        // The previous-value variants carry the result first; the plain
        // variants start with the resource.
        let (dest, dest_addr) = if inst.opcode.returns_previous_value() {
            (&inst.operands[1], &inst.operands[2])
        } else {
            (&inst.operands[0], &inst.operands[1])
        };

        if dest.kind == OperandKind::ThreadGroupSharedMemory {
            continue;
        }

        let Some(binding) = shader.info.binding(ResourceGroup::Uav, dest.register) else {
            debug_assert!(false, "atomic target u{} has no binding", dest.register);
            continue;
        };

        let structured = matches!(
            binding.ty,
            ResourceType::UavRwStructured | ResourceType::UavRwStructuredWithCounter
        );
        if structured && dest_addr.kind == OperandKind::Immediate32 {
            if let Some(found) =
                lookup_structured_var_atomic(&shader.info, ctx, dest, dest_addr, 0)
            {
                trace!(member = %found.ty.name, "atomic target member");
                list.push(atomic_var_key(found.ty));
            }
        }
    }
    list
}
