//! Reflection metadata: constant-buffer member trees, resource bindings and
//! input/output signatures, plus the byte-offset lookups the backends run
//! against them.
//!
//! Populated by the decoder from the reflection chunks; this core reads it
//! and writes back only two annotations (UAV bind areas, bool-to-int member
//! normalization).

use crate::types::DataType;

/// Shape class of a reflected variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VarClass {
    #[default]
    Scalar,
    Vector,
    MatrixRows,
    MatrixColumns,
    Struct,
}

/// A named member inside a constant/structured buffer or TGSM block.
///
/// `offset` is the absolute byte offset from the start of the containing
/// buffer; sibling offsets are monotonically non-decreasing and follow the
/// 16-byte vector alignment rules of the source language.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderVarType {
    pub name: String,
    /// Dotted path from the buffer root, used when the backend addresses
    /// the member directly.
    pub full_name: String,
    pub class: VarClass,
    pub ty: DataType,
    pub rows: u16,
    pub columns: u16,
    /// Array element count; 0 and 1 both mean "not an array".
    pub elements: u32,
    pub offset: u32,
    pub members: Vec<ShaderVarType>,
}

impl ShaderVarType {
    /// Size in bytes under 16-byte register packing.
    pub fn size_bytes(&self) -> u32 {
        let elements = self.elements.max(1);
        match self.class {
            VarClass::Scalar => {
                if elements > 1 {
                    elements * 16
                } else {
                    4
                }
            }
            VarClass::Vector => {
                if elements > 1 {
                    elements * 16
                } else {
                    u32::from(self.columns) * 4
                }
            }
            VarClass::MatrixRows | VarClass::MatrixColumns => {
                u32::from(self.rows) * 16 * elements
            }
            VarClass::Struct => {
                let one: u32 = self
                    .members
                    .iter()
                    .map(|m| m.offset - self.offset + m.size_bytes())
                    .max()
                    .unwrap_or(0);
                one.next_multiple_of(16).max(16) * elements
            }
        }
    }

    pub fn is_array(&self) -> bool {
        self.elements > 1
    }
}

/// A top-level variable of a constant buffer.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ShaderVar {
    pub name: String,
    pub start_offset: u32,
    pub size: u32,
    pub ty: ShaderVarType,
}

/// Register space a binding lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceGroup {
    ConstantBuffer,
    Texture,
    Sampler,
    Uav,
}

/// Reflected resource kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
    CBuffer,
    TBuffer,
    Texture,
    Sampler,
    ByteAddress,
    Structured,
    UavRwTyped,
    UavRwStructured,
    UavRwByteAddress,
    UavAppendStructured,
    UavConsumeStructured,
    UavRwStructuredWithCounter,
}

/// Which target-language construct a UAV ended up bound as. Written back by
/// the declaration translator; later instructions branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BindArea {
    #[default]
    Unresolved,
    Buffer,
    Texture,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResourceBinding {
    pub name: String,
    pub group: ResourceGroup,
    pub ty: ResourceType,
    pub bind_point: u32,
    pub bind_count: u32,
    pub return_type: crate::decl::ResourceReturnType,
    pub dimension: Option<crate::decl::ResourceDimension>,
    pub bind_area: BindArea,
}

/// Reflected constant buffer (also used for the element layout of
/// structured buffers and UAVs, keyed by their register group).
#[derive(Debug, Clone, PartialEq)]
pub struct ConstantBuffer {
    pub name: String,
    pub group: ResourceGroup,
    pub slot: u32,
    pub size: u32,
    pub vars: Vec<ShaderVar>,
    /// Emitted as an opaque float4-array blob instead of a member struct
    /// (set for dynamically indexed buffers during declaration
    /// translation).
    pub blob: bool,
}

/// Per-component register type in an IO signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ComponentType {
    Unknown,
    UInt32,
    SInt32,
    #[default]
    Float32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InOutSignature {
    pub semantic_name: String,
    pub semantic_index: u32,
    pub register: u32,
    pub mask: u8,
    pub read_write_mask: u8,
    pub component_type: ComponentType,
    pub system_value_type: u32,
    pub stream: u32,
}

/// Result of resolving a byte offset inside a constant buffer: the member,
/// an optional array/row index, and the member's byte offset within its
/// 16-byte register ("rebase", drives swizzle remapping for misaligned
/// vectors).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VarLookup<'a> {
    pub ty: &'a ShaderVarType,
    pub index: Option<u32>,
    pub rebase: u32,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ShaderInfo {
    pub inputs: Vec<InOutSignature>,
    pub outputs: Vec<InOutSignature>,
    pub constant_buffers: Vec<ConstantBuffer>,
    pub resource_bindings: Vec<ResourceBinding>,
    pub thread_group_size: [u32; 3],
}

impl ShaderInfo {
    pub fn binding(&self, group: ResourceGroup, slot: u32) -> Option<&ResourceBinding> {
        self.resource_bindings.iter().find(|b| {
            b.group == group && slot >= b.bind_point && slot < b.bind_point + b.bind_count.max(1)
        })
    }

    pub fn binding_mut(&mut self, group: ResourceGroup, slot: u32) -> Option<&mut ResourceBinding> {
        self.resource_bindings.iter_mut().find(|b| {
            b.group == group && slot >= b.bind_point && slot < b.bind_point + b.bind_count.max(1)
        })
    }

    pub fn constant_buffer(&self, group: ResourceGroup, slot: u32) -> Option<&ConstantBuffer> {
        self.constant_buffers
            .iter()
            .find(|cb| cb.group == group && cb.slot == slot)
    }

    pub fn constant_buffer_mut(
        &mut self,
        group: ResourceGroup,
        slot: u32,
    ) -> Option<&mut ConstantBuffer> {
        self.constant_buffers
            .iter_mut()
            .find(|cb| cb.group == group && cb.slot == slot)
    }

    pub fn input_signature(&self, register: u32) -> Option<&InOutSignature> {
        self.inputs.iter().find(|sig| sig.register == register)
    }

    /// Output signatures can share a register across streams and masks;
    /// match on register, then prefer a mask overlap and stream match.
    pub fn output_signature(
        &self,
        register: u32,
        mask: u8,
        stream: u32,
    ) -> Option<&InOutSignature> {
        self.outputs
            .iter()
            .filter(|sig| sig.register == register && sig.stream == stream)
            .find(|sig| mask == 0 || (sig.mask & mask) != 0)
            .or_else(|| self.outputs.iter().find(|sig| sig.register == register))
    }
}

impl ConstantBuffer {
    /// Resolve the member containing `vec4_offset * 16 + first_component * 4`
    /// bytes from the buffer start.
    pub fn var_from_offset(&self, vec4_offset: u32, first_component: u8) -> Option<VarLookup<'_>> {
        let byte_offset = vec4_offset * 16 + u32::from(first_component) * 4;
        for var in &self.vars {
            if let Some(found) = lookup_in_type(&var.ty, byte_offset) {
                return Some(found);
            }
        }
        None
    }
}

fn lookup_in_type(ty: &ShaderVarType, byte_offset: u32) -> Option<VarLookup<'_>> {
    let start = ty.offset;
    let end = start + ty.size_bytes();
    if byte_offset < start || byte_offset >= end {
        return None;
    }

    if ty.class == VarClass::Struct && !ty.is_array() {
        // Prefer the deepest member; embedded structs are resolved
        // recursively so the dotted full name addresses the leaf.
        for member in &ty.members {
            if let Some(found) = lookup_in_type(member, byte_offset) {
                return Some(found);
            }
        }
    }

    let indexed = matches!(ty.class, VarClass::MatrixRows | VarClass::MatrixColumns)
        || ty.is_array();
    let index = indexed.then(|| (byte_offset - start) / 16);
    Some(VarLookup {
        ty,
        index,
        rebase: start % 16,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scalar(name: &str, offset: u32) -> ShaderVarType {
        ShaderVarType {
            name: name.to_owned(),
            full_name: name.to_owned(),
            class: VarClass::Scalar,
            ty: DataType::Float,
            rows: 1,
            columns: 1,
            elements: 0,
            offset,
            members: Vec::new(),
        }
    }

    fn vector(name: &str, columns: u16, offset: u32) -> ShaderVarType {
        ShaderVarType {
            columns,
            class: VarClass::Vector,
            ..scalar(name, offset)
        }
    }

    fn cbuffer(vars: Vec<ShaderVarType>) -> ConstantBuffer {
        ConstantBuffer {
            name: "TestBuf".to_owned(),
            group: ResourceGroup::ConstantBuffer,
            slot: 0,
            size: 0,
            vars: vars
                .into_iter()
                .map(|ty| ShaderVar {
                    name: ty.name.clone(),
                    start_offset: ty.offset,
                    size: ty.size_bytes(),
                    ty,
                })
                .collect(),
            blob: false,
        }
    }

    #[test]
    fn scalar_then_vector_lookup_by_offset() {
        let cb = cbuffer(vec![scalar("a", 0), vector("b", 3, 16)]);
        let a = cb.var_from_offset(0, 0).unwrap();
        assert_eq!(a.ty.name, "a");
        assert_eq!(a.index, None);
        let b = cb.var_from_offset(1, 1).unwrap();
        assert_eq!(b.ty.name, "b");
        assert_eq!(b.rebase, 0);
    }

    #[test]
    fn misaligned_vector_reports_rebase() {
        let cb = cbuffer(vec![scalar("a", 0), vector("b", 2, 4)]);
        let b = cb.var_from_offset(0, 1).unwrap();
        assert_eq!(b.ty.name, "b");
        assert_eq!(b.rebase, 4);
    }

    #[test]
    fn matrix_reports_row_index() {
        let mat = ShaderVarType {
            class: VarClass::MatrixRows,
            rows: 4,
            columns: 4,
            ..scalar("m", 0)
        };
        let cb = cbuffer(vec![mat]);
        let row2 = cb.var_from_offset(2, 0).unwrap();
        assert_eq!(row2.ty.name, "m");
        assert_eq!(row2.index, Some(2));
    }

    #[test]
    fn nested_struct_resolves_leaf() {
        let inner = ShaderVarType {
            name: "Light".to_owned(),
            full_name: "Light".to_owned(),
            class: VarClass::Struct,
            offset: 0,
            members: vec![vector("dir", 3, 0), scalar("intensity", 12)],
            ..Default::default()
        };
        let cb = cbuffer(vec![inner]);
        let hit = cb.var_from_offset(0, 3).unwrap();
        assert_eq!(hit.ty.name, "intensity");
    }
}
