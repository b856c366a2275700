//! Resource and identifier naming: binding-point lookup, sanitized names
//! for arrayed resources, combined texture+sampler names, and the
//! deterministic input/output identifier scheme shared by the declaration
//! translator and the operand engine.

use crucible_ir::decl::{Interpolation, ResourceDimension, ResourceReturnType};
use crucible_ir::reflect::{ResourceGroup, ShaderInfo, ShaderVarType, VarLookup};
use crucible_ir::{ComponentSelect, Operand, OperandKind, ShaderStage, WriteMask};

use crate::context::Ctx;
use crate::CompileFlags;

/// Sanitize a reflection name for use as an identifier: array syntax `[N]`
/// becomes `_N_` so two elements of a resource array get distinct names.
fn sanitize(name: &str) -> String {
    name.chars()
        .map(|c| if c == '[' || c == ']' { '_' } else { c })
        .collect()
}

/// Resolve the declared name of a resource register, with the
/// `UnknownResourceN` fallback when the reflection table has no entry.
/// Sampler names get an `_s` suffix (`_cmp` for the comparison rendition)
/// so the bindable sampler and the constexpr comparison sampler coexist.
pub fn resource_name(
    info: &ShaderInfo,
    group: ResourceGroup,
    register: u32,
    z_compare: bool,
) -> String {
    let Some(binding) = info.binding(group, register) else {
        return format!("UnknownResource{register}");
    };

    let mut name = sanitize(&binding.name);
    let array_offset = register - binding.bind_point;
    if array_offset != 0 {
        name.push_str(&array_offset.to_string());
    }

    if group == ResourceGroup::Sampler {
        name.push_str(if z_compare { "_cmp" } else { "_s" });
    }
    name
}

/// Combined name for a texture sampled through a particular sampler
/// register. The sampler's declared name carries the suffix so depth-compare
/// and plain samplers stay distinct.
pub fn texture_sampler_name(
    info: &ShaderInfo,
    texture_register: u32,
    sampler_register: u32,
    z_compare: bool,
) -> String {
    let texture = info.binding(ResourceGroup::Texture, texture_register);
    let sampler = info.binding(ResourceGroup::Sampler, sampler_register);
    let (Some(_), Some(sampler)) = (texture, sampler) else {
        return format!("UnknownResource{texture_register}_{sampler_register}");
    };

    let mut name = sanitize(&sampler.name);
    let array_offset = sampler_register - sampler.bind_point;
    if array_offset != 0 {
        name.push_str(&array_offset.to_string());
    }
    name.push_str(if z_compare { "_cmp" } else { "_s" });
    name
}

/// Deterministic identifier for a declared input register. Pixel-stage
/// inputs reuse the name the vertex stage declared for the same register so
/// separately compiled stages link up.
pub fn declared_input_name(
    info: &ShaderInfo,
    flags: CompileFlags,
    stage: ShaderStage,
    operand: &Operand,
) -> String {
    let mut name = if stage == ShaderStage::Pixel {
        format!("VtxOutput{}", operand.register)
    } else {
        debug_assert_eq!(stage, ShaderStage::Vertex);
        format!("dcl_Input{}", operand.register)
    };
    if flags.contains(CompileFlags::INOUT_SEMANTIC_NAMES) {
        if let Some(sig) = info.input_signature(operand.register) {
            name.push_str(&format!("_{}{}", sig.semantic_name, sig.semantic_index));
        }
    }
    name
}

/// Deterministic identifier for a declared output register.
pub fn declared_output_name(
    info: &ShaderInfo,
    flags: CompileFlags,
    stage: ShaderStage,
    stream: u32,
    operand: &Operand,
) -> String {
    let mask = match operand.sel {
        ComponentSelect::Mask(mask) => mask.0,
        _ => WriteMask::XYZW.0,
    };
    let sig = info.output_signature(operand.register, mask, stream);
    debug_assert!(sig.is_some(), "output register missing from signature");

    let mut name = match stage {
        ShaderStage::Vertex => format!("VtxOutput{}", operand.register),
        ShaderStage::Pixel => format!("PixOutput{}", operand.register),
        _ => format!("Output{}", operand.register),
    };
    if flags.contains(CompileFlags::INOUT_APPEND_SEMANTIC_NAMES) {
        if let Some(sig) = sig {
            name.push_str(&format!("_{}{}", sig.semantic_name, sig.semantic_index));
        }
    }
    name
}

/// Interpolation qualifier token for pixel-stage inputs.
pub fn interpolation_qualifier(mode: Interpolation) -> &'static str {
    match mode {
        Interpolation::Constant => "flat",
        Interpolation::Linear => "center_perspective",
        Interpolation::LinearCentroid => "centroid_perspective",
        Interpolation::LinearNoPerspective => "center_no_perspective",
        Interpolation::LinearNoPerspectiveCentroid => "centroid_no_perspective",
        Interpolation::LinearSample => "sample_perspective",
        Interpolation::LinearNoPerspectiveSample => "sample_no_perspective",
        Interpolation::Undefined => "",
    }
}

/// Texture type for a declared resource, parameterized by the binding's
/// return type and dimensionality. Shadow variants use the depth texture
/// types so `sample_compare` is available.
pub fn texture_type_name(
    info: &ShaderInfo,
    dimension: ResourceDimension,
    register: u32,
    shadow: bool,
) -> Option<&'static str> {
    let return_type = info
        .binding(ResourceGroup::Texture, register)
        .map(|b| b.return_type)
        .unwrap_or(ResourceReturnType::UNorm);

    use ResourceDimension::*;
    let name = match (dimension, shadow) {
        (Texture1D, _) => match return_type {
            ResourceReturnType::SInt => "texture1d<int>",
            ResourceReturnType::UInt => "texture1d<uint>",
            _ => "texture1d<float>",
        },
        (Texture2D, true) => "depth2d<float>",
        (Texture2D, false) => match return_type {
            ResourceReturnType::SInt => "texture2d<int>",
            ResourceReturnType::UInt => "texture2d<uint>",
            _ => "texture2d<float>",
        },
        (Texture2DMs, true) => "depth2d_ms<float>",
        (Texture2DMs, false) => match return_type {
            ResourceReturnType::SInt => "texture2d_ms<int>",
            ResourceReturnType::UInt => "texture2d_ms<uint>",
            _ => "texture2d_ms<float>",
        },
        (Texture3D, _) => match return_type {
            ResourceReturnType::SInt => "texture3d<int>",
            ResourceReturnType::UInt => "texture3d<uint>",
            _ => "texture3d<float>",
        },
        (TextureCube, true) => "depthcube<float>",
        (TextureCube, false) => match return_type {
            ResourceReturnType::SInt => "texturecube<int>",
            ResourceReturnType::UInt => "texturecube<uint>",
            _ => "texturecube<float>",
        },
        (Texture1DArray, _) => match return_type {
            ResourceReturnType::SInt => "texture1d_array<int>",
            ResourceReturnType::UInt => "texture1d_array<uint>",
            _ => "texture1d_array<float>",
        },
        (Texture2DArray, true) => "depth2d_array<float>",
        (Texture2DArray, false) => match return_type {
            ResourceReturnType::SInt => "texture2d_array<int>",
            ResourceReturnType::UInt => "texture2d_array<uint>",
            _ => "texture2d_array<float>",
        },
        (TextureCubeArray, _) => match return_type {
            ResourceReturnType::SInt => "texturecube_array<int>",
            ResourceReturnType::UInt => "texturecube_array<uint>",
            _ => "texturecube_array<float>",
        },
        // No multisample-array texture type exists in the target language.
        (Texture2DMsArray, _) | (Buffer, _) => return None,
    };
    Some(name)
}

/// Resolve the structured-buffer member a load/store component addresses:
/// element layout from the reflection table (or the TGSM stride table),
/// offset from the instruction's byte-offset operand plus the component's
/// 4-byte stride.
pub fn lookup_structured_var<'a>(
    info: &'a ShaderInfo,
    ctx: &'a Ctx,
    resource: &Operand,
    byte_offset: &Operand,
    component: u32,
) -> Option<VarLookup<'a>> {
    lookup_structured_impl(info, ctx, resource, byte_offset, component, false)
}

/// Variant used by the atomic paths: when the element type is a struct the
/// real member offset travels in the second immediate lane of the address
/// operand.
pub fn lookup_structured_var_atomic<'a>(
    info: &'a ShaderInfo,
    ctx: &'a Ctx,
    resource: &Operand,
    byte_offset: &Operand,
    component: u32,
) -> Option<VarLookup<'a>> {
    lookup_structured_impl(info, ctx, resource, byte_offset, component, true)
}

fn lookup_structured_impl<'a>(
    info: &'a ShaderInfo,
    ctx: &'a Ctx,
    resource: &Operand,
    byte_offset: &Operand,
    component: u32,
    atomic: bool,
) -> Option<VarLookup<'a>> {
    debug_assert_eq!(byte_offset.kind, OperandKind::Immediate32);

    let group = match resource.kind {
        OperandKind::Resource => ResourceGroup::Texture,
        OperandKind::UnorderedAccessView => ResourceGroup::Uav,
        OperandKind::ThreadGroupSharedMemory => {
            let ty = ctx.regs.tgsm_types.get(&resource.register)?;
            return Some(VarLookup {
                ty,
                index: None,
                rebase: 0,
            });
        }
        _ => {
            debug_assert!(false, "structured access through {:?}", resource.kind);
            return None;
        }
    };

    let cb = info.constant_buffer(group, resource.register)?;
    let mut off = byte_offset.imm[0] + 4 * component;
    if atomic && cb.vars.first().is_some_and(|v| v.ty.class == crucible_ir::VarClass::Struct) {
        // Struct-shaped elements carry the member offset in the second lane.
        let member_off = byte_offset.imm[1];
        if member_off > 0 {
            off = member_off + 4 * component;
        }
    }
    cb.var_from_offset(off / 16, ((off % 16) / 4) as u8)
}

/// The member's identity used by the atomic-usage list.
pub fn atomic_var_key(ty: &ShaderVarType) -> String {
    if ty.full_name.is_empty() {
        ty.name.clone()
    } else {
        ty.full_name.clone()
    }
}
