//! Operand & swizzle engine: renders a single IR operand reference into
//! target-language text.
//!
//! Rendering happens in up to three stages: the unary-modifier wrapper, the
//! core identifier (the largest dispatch in the backend — it must reproduce
//! the exact naming scheme the declaration translator used), and the
//! trailing component selector. Between modifier and identifier the engine
//! inserts a numeric cast, bit reinterpret, or broadcasting constructor when
//! the operand's inferred flavor or width does not match what the caller
//! asked for.

use bitflags::bitflags;

use crucible_ir::reflect::{ResourceGroup, ShaderInfo, VarClass};
use crucible_ir::{
    ComponentSelect, DataType, IndexRep, MinPrecision, Operand, OperandKind, OperandModifier,
    ShaderStage, SpecialName, WriteMask,
};

use crate::context::{emitf, Ctx};
use crate::names::resource_name;
use crate::{CompileFlags, TranslateError};

bitflags! {
    /// Rendering request passed alongside an operand.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct OperandFlags: u32 {
        /// Render as a signed-integer value.
        const INT = 1 << 0;
        /// Render as an unsigned-integer value.
        const UINT = 1 << 1;
        /// Render as a half-precision value.
        const HALF = 1 << 2;
        /// The operand is a store destination; never wrap it in casts.
        const DESTINATION = 1 << 3;
        /// Emit the bare identifier with no casts or selectors.
        const NAME_ONLY = 1 << 4;
        /// Emit the name as used in a declaration.
        const DECL_NAME = 1 << 5;
        /// Reinterpret to the given flavor when the inferred type differs.
        const BITCAST_TO_FLOAT = 1 << 6;
        const BITCAST_TO_INT = 1 << 7;
        const BITCAST_TO_UINT = 1 << 8;
        const BITCAST_TO_HALF = 1 << 9;
        /// Broadcast a narrower value up to the given width.
        const EXPAND_TO_VEC2 = 1 << 10;
        const EXPAND_TO_VEC3 = 1 << 11;
        const EXPAND_TO_VEC4 = 1 << 12;
    }
}

impl OperandFlags {
    /// The numeric flavor this flag word asks for.
    pub fn requested_type(self) -> DataType {
        if self.intersects(Self::INT | Self::BITCAST_TO_INT) {
            DataType::Int
        } else if self.intersects(Self::UINT | Self::BITCAST_TO_UINT) {
            DataType::UInt
        } else if self.intersects(Self::HALF | Self::BITCAST_TO_HALF) {
            DataType::Half
        } else {
            DataType::Float
        }
    }

    pub fn for_type(ty: DataType) -> Self {
        match ty {
            DataType::UInt => Self::UINT,
            DataType::Int | DataType::Bool => Self::INT,
            DataType::Half => Self::HALF,
            _ => Self::empty(),
        }
    }

    /// `2 -> EXPAND_TO_VEC2`, etc.
    pub fn expand_to(count: u32) -> Self {
        debug_assert!((2..=4).contains(&count));
        Self::from_bits_retain(Self::EXPAND_TO_VEC2.bits() << (count - 2))
    }

    fn requested_components(self) -> u32 {
        if self.contains(Self::EXPAND_TO_VEC2) {
            2
        } else if self.contains(Self::EXPAND_TO_VEC3) {
            3
        } else if self.contains(Self::EXPAND_TO_VEC4) {
            4
        } else {
            0
        }
    }
}

/// Constructor / type name for an N-wide value of the given flavor.
pub fn constructor_for(ty: DataType, components: u32) -> &'static str {
    const UINT: [&str; 4] = ["uint", "uint2", "uint3", "uint4"];
    const INT: [&str; 4] = ["int", "int2", "int3", "int4"];
    const FLOAT: [&str; 4] = ["float", "float2", "float3", "float4"];
    const HALF: [&str; 4] = ["half", "half2", "half3", "half4"];
    let idx = (components.clamp(1, 4) - 1) as usize;
    match ty {
        DataType::UInt => UINT[idx],
        DataType::Int | DataType::Bool => INT[idx],
        DataType::Half => HALF[idx],
        _ => FLOAT[idx],
    }
}

fn scalar_name(ty: DataType) -> &'static str {
    match ty {
        DataType::Float => "float",
        DataType::Half => "half",
        DataType::Int | DataType::Bool => "int",
        DataType::UInt => "uint",
        _ => {
            debug_assert!(false, "no scalar name for {ty:?}");
            "float"
        }
    }
}

/// A plain constructor converts between these flavors; everything else
/// needs `as_type` bit reinterpretation or a half `static_cast`.
fn can_direct_cast(src: DataType, dst: DataType) -> bool {
    let int_like = |t| matches!(t, DataType::Int | DataType::UInt | DataType::Bool);
    let float_like = |t| matches!(t, DataType::Float | DataType::Double);
    (int_like(src) && int_like(dst)) || (float_like(src) && float_like(dst))
}

fn needs_half_cast(src: DataType, dst: DataType) -> bool {
    (src == DataType::Half) != (dst == DataType::Half)
}

/// Inferred flavor of an operand, with `preferred` standing in for
/// immediates and anything else with no inherent type.
pub fn operand_data_type_ex(info: &ShaderInfo, op: &Operand, preferred: DataType) -> DataType {
    // The minimum-precision qualifier overrides everything else.
    if op.min_precision == MinPrecision::Float16 {
        return DataType::Half;
    }

    match op.kind {
        OperandKind::Temp | OperandKind::IndexableTemp => match op.sel {
            ComponentSelect::Select1(c) => op.data_type[c as usize],
            ComponentSelect::Swizzle(s) => op.data_type[s.0[0] as usize],
            ComponentSelect::Mask(mask) => {
                let mask = if mask.0 == 0 { WriteMask::XYZW } else { mask };
                let mut ty = None;
                for c in 0..4u8 {
                    if mask.contains(c) {
                        match ty {
                            None => ty = Some(op.data_type[c as usize]),
                            Some(t) => {
                                debug_assert_eq!(
                                    t, op.data_type[c as usize],
                                    "mixed flavors under one write mask"
                                );
                            }
                        }
                    }
                }
                ty.unwrap_or(DataType::Float)
            }
        },
        OperandKind::Output => {
            let register = op.indices[op.index_dims.max(1) as usize - 1];
            let mask = op.write_mask().0;
            match info.output_signature(register, mask, 0).map(|s| s.component_type) {
                Some(crucible_ir::ComponentType::UInt32) => DataType::UInt,
                Some(crucible_ir::ComponentType::SInt32) => DataType::Int,
                _ => DataType::Float,
            }
        }
        OperandKind::Input => {
            if op.special_name == SpecialName::PrimitiveId {
                return DataType::Int;
            }
            if op.special_name == SpecialName::IsFrontFace {
                return DataType::Bool;
            }
            let register = op.indices[op.index_dims.max(1) as usize - 1];
            match info.input_signature(register).map(|s| s.component_type) {
                Some(crucible_ir::ComponentType::UInt32) => DataType::UInt,
                Some(crucible_ir::ComponentType::SInt32) => DataType::Int,
                _ => DataType::Float,
            }
        }
        OperandKind::ConstantBuffer => {
            let cb = info.constant_buffer(ResourceGroup::ConstantBuffer, op.indices[0]);
            match cb {
                Some(cb) if !cb.blob => {
                    let lookup = cb.var_from_offset(op.indices[1], first_component(op));
                    match lookup {
                        Some(found) if found.index.is_none() && op.sub_operand[1].is_none() => {
                            found.ty.ty
                        }
                        _ => DataType::Float,
                    }
                }
                _ => DataType::Float,
            }
        }
        OperandKind::Immediate32 => {
            if op.integer_immediate && matches!(preferred, DataType::Float | DataType::Half) {
                DataType::Int
            } else {
                preferred
            }
        }
        OperandKind::InputThreadId
        | OperandKind::InputThreadGroupId
        | OperandKind::InputThreadIdInGroup
        | OperandKind::InputThreadIdInGroupFlattened
        | OperandKind::InputGsInstanceId => DataType::UInt,
        OperandKind::SpecialAddress | OperandKind::SpecialLoopCounter => DataType::Int,
        OperandKind::OutputCoverageMask | OperandKind::OutputControlPointId => DataType::Int,
        _ => DataType::Float,
    }
}

pub fn operand_data_type(info: &ShaderInfo, op: &Operand) -> DataType {
    operand_data_type_ex(info, op, DataType::Int)
}

fn first_component(op: &Operand) -> u8 {
    match op.sel {
        ComponentSelect::Swizzle(s) => s.0[0],
        ComponentSelect::Select1(c) => c,
        ComponentSelect::Mask(_) => 0,
    }
}

/// Render the trailing `.xyz`-style selector, intersected with an extra
/// component mask. Nothing is emitted when the intersection covers the full
/// natural width (implicit identity) or when the operand is inherently
/// scalar.
pub fn translate_swizzle_with_mask(ctx: &mut Ctx, op: &Operand, extra: WriteMask) {
    if op.kind == OperandKind::Input
        && ctx.regs.scalar_input.get(&op.register).copied().unwrap_or(0) != 0
    {
        return;
    }

    if !(op.write_mask_enabled && op.num_components != 1) {
        return;
    }

    const NAMES: [char; 4] = ['x', 'y', 'z', 'w'];
    match op.sel {
        ComponentSelect::Mask(mask) => {
            let mask = if mask.0 != 0 {
                WriteMask(mask.0 & extra.0)
            } else {
                extra
            };
            if mask.0 != 0 && mask != WriteMask::XYZW {
                ctx.push(".");
                for c in 0..4u8 {
                    if mask.contains(c) {
                        emitf!(ctx, "{}", NAMES[c as usize]);
                    }
                }
            }
        }
        ComponentSelect::Swizzle(swizzle) => {
            if extra != WriteMask::XYZW || !swizzle.is_identity() {
                ctx.push(".");
                for i in 0..4u8 {
                    if extra.contains(i) {
                        emitf!(ctx, "{}", NAMES[swizzle.0[i as usize] as usize]);
                    }
                }
            }
        }
        // The extra mask is meaningless for a single-component select.
        ComponentSelect::Select1(c) => {
            ctx.push(".");
            emitf!(ctx, "{}", NAMES[(c & 3) as usize]);
        }
    }
}

pub fn translate_swizzle(ctx: &mut Ctx, op: &Operand) {
    translate_swizzle_with_mask(ctx, op, WriteMask::XYZW);
}

/// Swizzle rendering against a framebuffer-fetch input: components beyond
/// the attachment's element count re-route to `.x`.
pub fn translate_gmem_swizzle_with_mask(
    ctx: &mut Ctx,
    op: &Operand,
    extra: WriteMask,
    gmem_elements: u32,
) {
    if op.kind == OperandKind::Input
        && ctx.regs.scalar_input.get(&op.register).copied().unwrap_or(0) != 0
    {
        return;
    }
    if !(op.write_mask_enabled && op.num_components != 1) {
        return;
    }

    const NAMES: [char; 4] = ['x', 'y', 'z', 'w'];
    let clamp = |c: u8| -> char {
        if u32::from(c) >= gmem_elements {
            'x'
        } else {
            NAMES[c as usize]
        }
    };

    match op.sel {
        ComponentSelect::Mask(mask) => {
            let mask = if mask.0 != 0 {
                WriteMask(mask.0 & extra.0)
            } else {
                extra
            };
            if mask.0 != 0 && mask != WriteMask::XYZW {
                ctx.push(".");
                for c in 0..4u8 {
                    if mask.contains(c) {
                        emitf!(ctx, "{}", clamp(c));
                    }
                }
            }
        }
        ComponentSelect::Swizzle(swizzle) => {
            if extra != WriteMask::XYZW || !swizzle.is_identity() {
                ctx.push(".");
                for i in 0..4u8 {
                    if extra.contains(i) {
                        emitf!(ctx, "{}", clamp(swizzle.0[i as usize]));
                    }
                }
            }
        }
        ComponentSelect::Select1(c) => {
            ctx.push(".");
            emitf!(ctx, "{}", clamp(c & 3));
        }
    }
}

/// Selector rendering for resource operands. The decoder clears the
/// write-mask flag on resources (a register swizzle is meaningless for a
/// binding), but sampling instructions still carry a return-value swizzle
/// on the resource operand that must be applied to the fetched texel.
pub fn resource_swizzle_with_mask(ctx: &mut Ctx, op: &Operand, extra: WriteMask) {
    const NAMES: [char; 4] = ['x', 'y', 'z', 'w'];
    match op.sel {
        ComponentSelect::Mask(mask) => {
            let mask = if mask.0 != 0 {
                WriteMask(mask.0 & extra.0)
            } else {
                extra
            };
            if mask.0 != 0 && mask != WriteMask::XYZW {
                ctx.push(".");
                for c in 0..4u8 {
                    if mask.contains(c) {
                        emitf!(ctx, "{}", NAMES[c as usize]);
                    }
                }
            }
        }
        ComponentSelect::Swizzle(swizzle) => {
            if extra != WriteMask::XYZW || !swizzle.is_identity() {
                ctx.push(".");
                for i in 0..4u8 {
                    if extra.contains(i) {
                        emitf!(ctx, "{}", NAMES[swizzle.0[i as usize] as usize]);
                    }
                }
            }
        }
        ComponentSelect::Select1(c) => {
            ctx.push(".");
            emitf!(ctx, "{}", NAMES[(c & 3) as usize]);
        }
    }
}

/// Emit `.x` / `.xy` / `.xyz` narrowing for an element count; nothing for 4.
pub fn add_swizzle_by_count(ctx: &mut Ctx, count: u32) {
    if count == 0 || count >= 4 {
        return;
    }
    ctx.push(".");
    ctx.push(&"xyzw"[..count as usize]);
}

/// Render one index dimension: a plain immediate, a bracketed dynamic
/// sub-operand, or the immediate-plus-relative combination.
pub fn translate_operand_index(
    ctx: &mut Ctx,
    info: &ShaderInfo,
    op: &Operand,
    dim: usize,
) -> Result<(), TranslateError> {
    debug_assert!(dim < op.index_dims as usize);
    match op.index_rep[dim] {
        IndexRep::Immediate32 => {
            if dim > 0 {
                emitf!(ctx, "[{}]", op.indices[dim]);
            } else {
                emitf!(ctx, "{}", op.indices[dim]);
            }
        }
        IndexRep::Relative => {
            ctx.push("[");
            let sub = op.sub_operand[dim].as_deref().expect("relative index operand");
            translate_operand(ctx, info, sub, OperandFlags::INT)?;
            ctx.push("]");
        }
        IndexRep::Immediate32PlusRelative => {
            // Indexes must be integral.
            ctx.push("[");
            let sub = op.sub_operand[dim].as_deref().expect("relative index operand");
            translate_operand(ctx, info, sub, OperandFlags::INT)?;
            emitf!(ctx, " + {}]", op.indices[dim]);
        }
    }
    Ok(())
}

/// Print a 32-bit immediate in the requested flavor. Float flavors print
/// the bit pattern under a reinterpret so the value survives exactly.
fn print_immediate32(ctx: &mut Ctx, value: u32, ty: DataType) {
    let (wrapped, ty) = match ty {
        DataType::Float => {
            ctx.push("as_type<float>(");
            (true, DataType::Int)
        }
        DataType::Half => {
            ctx.push("static_cast<half>(");
            (true, DataType::Int)
        }
        other => (false, other),
    };

    match ty {
        DataType::UInt => emitf!(ctx, "{}u", value),
        _ => {
            // Anything at or above 0x3fffffff does not fit a positive int
            // literal.
            if value > 0x3ffffffe {
                emitf!(ctx, "int(0x{value:X}u)");
            } else {
                emitf!(ctx, "0x{value:X}");
            }
        }
    }

    if wrapped {
        ctx.push(")");
    }
}

pub fn translate_operand(
    ctx: &mut Ctx,
    info: &ShaderInfo,
    op: &Operand,
    flags: OperandFlags,
) -> Result<(), TranslateError> {
    translate_operand_with_mask(ctx, info, op, flags, WriteMask::XYZW)
}

pub fn translate_operand_with_mask(
    ctx: &mut Ctx,
    info: &ShaderInfo,
    op: &Operand,
    flags: OperandFlags,
    mask: WriteMask,
) -> Result<(), TranslateError> {
    if flags.contains(OperandFlags::NAME_ONLY) {
        translate_variable_name(ctx, info, op, flags, WriteMask::XYZW)?;
        return Ok(());
    }

    match op.modifier {
        OperandModifier::None => {}
        OperandModifier::Neg => ctx.push("(-"),
        OperandModifier::Abs => ctx.push("abs("),
        OperandModifier::AbsNeg => ctx.push("-abs("),
    }

    translate_variable_name(ctx, info, op, flags, mask)?;

    if op.modifier != OperandModifier::None {
        ctx.push(")");
    }
    Ok(())
}

/// The core identifier plus casts, constructors and the selector suffix.
/// Returns with every wrapper closed.
fn translate_variable_name(
    ctx: &mut Ctx,
    info: &ShaderInfo,
    op: &Operand,
    flags: OperandFlags,
    mask: WriteMask,
) -> Result<(), TranslateError> {
    let requested = flags.requested_type();
    let e_type = operand_data_type_ex(info, op, requested);
    let num_components = op.selected_count_with_mask(mask);
    let requested_components = flags.requested_components().max(num_components);

    let mut parens = 0u32;
    let mut has_ctor = false;
    let mut ignore_swizzle = false;

    if !flags
        .intersects(OperandFlags::DESTINATION | OperandFlags::NAME_ONLY | OperandFlags::DECL_NAME)
    {
        if e_type != requested {
            if can_direct_cast(e_type, requested) {
                emitf!(ctx, "{}(", constructor_for(requested, requested_components));
                has_ctor = true;
            } else if needs_half_cast(e_type, requested) {
                if requested_components > 1 {
                    emitf!(ctx, "static_cast<{}{}>(", scalar_name(requested), requested_components);
                } else {
                    emitf!(ctx, "static_cast<{}>(", scalar_name(requested));
                }
            } else {
                // Direct cast not possible; reinterpret the bits.
                if requested_components > 1 {
                    emitf!(ctx, "as_type<{}{}>(", scalar_name(requested), requested_components);
                } else {
                    emitf!(ctx, "as_type<{}>(", scalar_name(requested));
                }
            }
            parens += 1;
        }

        if num_components < requested_components && !has_ctor {
            debug_assert_eq!(num_components, 1);
            emitf!(ctx, "{}(", constructor_for(requested, requested_components));
            parens += 1;
            has_ctor = true;
        }
    }

    match op.kind {
        OperandKind::Immediate32 => {
            let print_ty = operand_data_type_ex(info, op, requested);
            if op.num_components == 1 {
                print_immediate32(ctx, op.imm[0], print_ty);
            } else {
                if !has_ctor {
                    emitf!(ctx, "{}(", constructor_for(print_ty, num_components));
                    parens += 1;
                    has_ctor = true;
                }
                let mut first = true;
                for c in 0..4u8 {
                    if !mask.contains(c) {
                        continue;
                    }
                    if !first {
                        ctx.push(", ");
                    }
                    print_immediate32(ctx, op.imm[c as usize], print_ty);
                    first = false;
                }
                ctx.push(")");
                ignore_swizzle = true;
                parens -= 1;
            }
        }
        OperandKind::Input => match op.index_dims {
            2 => {
                if op.indices[1] == 0 {
                    // Index zero is the position slot.
                    ctx.push("stageIn");
                    translate_operand_index(ctx, info, op, 0)?;
                    ctx.push(".position");
                } else {
                    if flags.contains(OperandFlags::DECL_NAME) {
                        let name = crate::names::declared_input_name(info, ctx.flags, ctx.stage, op);
                        emitf!(ctx, "{}{}", name, op.indices[1]);
                    } else {
                        emitf!(ctx, "Input{}", op.indices[1]);
                    }
                    translate_operand_index(ctx, info, op, 0)?;
                }
            }
            _ => {
                if op.index_rep[0] == IndexRep::Immediate32PlusRelative {
                    emitf!(ctx, "Input{}[", op.register);
                    let sub = op.sub_operand[0].as_deref().expect("relative input index");
                    translate_operand(ctx, info, sub, OperandFlags::INT)?;
                    ctx.push("]");
                } else if ctx.regs.indexed_input.get(&op.register).copied().unwrap_or(0) != 0 {
                    let parent = ctx
                        .regs
                        .indexed_input_parent
                        .get(&op.register)
                        .copied()
                        .unwrap_or(op.register);
                    emitf!(ctx, "Input{}[{}]", parent, op.register - parent);
                } else if flags.contains(OperandFlags::DECL_NAME) {
                    let name = crate::names::declared_input_name(info, ctx.flags, ctx.stage, op);
                    ctx.push(&name);
                } else {
                    emitf!(ctx, "Input{}", op.register);
                }
            }
        },
        OperandKind::Output => {
            emitf!(ctx, "Output{}", op.register);
            if let Some(sub) = op.sub_operand[0].as_deref() {
                ctx.push("[");
                translate_operand(ctx, info, sub, OperandFlags::BITCAST_TO_INT)?;
                ctx.push("]");
            }
        }
        OperandKind::OutputDepth => ctx.push("DepthAny"),
        OperandKind::OutputDepthGreaterEqual => ctx.push("DepthGreater"),
        OperandKind::OutputDepthLessEqual => ctx.push("DepthLess"),
        OperandKind::Temp => {
            // Temps are declared once per numeric flavor as parallel
            // arrays; the inferred component type picks which one.
            let ty = operand_data_type(info, op);
            ctx.push("Temp");
            match ty {
                DataType::Int => ctx.push("_int"),
                DataType::UInt => ctx.push("_uint"),
                DataType::Double => ctx.push("_double"),
                DataType::Half => ctx.push("_half"),
                DataType::Void => {
                    debug_assert!(
                        !flags.contains(OperandFlags::DESTINATION),
                        "unclassified temp used as destination"
                    );
                }
                _ => {}
            }
            emitf!(ctx, "[{}]", op.register);
        }
        OperandKind::IndexableTemp => {
            emitf!(ctx, "TempArray{}", op.indices[0]);
            ctx.push("[");
            if op.indices[1] != 0 || op.sub_operand[1].is_none() {
                emitf!(ctx, "{}", op.indices[1]);
            }
            if let Some(sub) = op.sub_operand[1].as_deref() {
                if op.indices[1] != 0 {
                    ctx.push("+");
                }
                translate_operand(ctx, info, sub, OperandFlags::INT)?;
            }
            ctx.push("]");
        }
        OperandKind::SpecialImmConstInt => {
            emitf!(ctx, "IntImmConst{}", op.register);
        }
        OperandKind::SpecialImmConst => {
            if let Some(sub) = op.sub_operand[0].as_deref() {
                let remap = ctx
                    .regs
                    .dx9_imm_const_remap
                    .get(&op.register)
                    .copied()
                    .unwrap_or(0);
                if remap != 0 {
                    emitf!(ctx, "ImmConstArray[{remap} + ");
                } else {
                    ctx.push("ImmConstArray[");
                }
                translate_operand_with_mask(ctx, info, sub, OperandFlags::INT, WriteMask::X)?;
                ctx.push("]");
            } else {
                emitf!(ctx, "ImmConst{}", op.register);
            }
        }
        OperandKind::SpecialOutBaseColor => ctx.push("BaseColour"),
        OperandKind::SpecialOutOffsetColor => ctx.push("OffsetColour"),
        OperandKind::SpecialPosition => {
            match ctx.stage {
                ShaderStage::Pixel => {
                    if !flags.contains(OperandFlags::DECL_NAME) {
                        ctx.push("stageIn.");
                    }
                }
                ShaderStage::Vertex => {
                    if !flags.contains(OperandFlags::DECL_NAME) {
                        ctx.push("output.");
                    }
                }
                _ => {}
            }
            ctx.push("position");
        }
        OperandKind::SpecialFog => ctx.push("Fog"),
        OperandKind::SpecialPointSize => {
            match ctx.stage {
                ShaderStage::Pixel => {
                    if !flags.contains(OperandFlags::DECL_NAME) {
                        ctx.push("stageIn.");
                    }
                }
                ShaderStage::Vertex => {
                    if !flags.contains(OperandFlags::DECL_NAME) {
                        ctx.push("output.");
                    }
                }
                _ => {}
            }
            ctx.push("pointSize");
        }
        OperandKind::SpecialAddress => ctx.push("Address"),
        OperandKind::SpecialLoopCounter => {
            ctx.push("LoopCounter");
            ignore_swizzle = true;
        }
        OperandKind::SpecialTexCoord => {
            emitf!(ctx, "TexCoord{}", op.register);
        }
        OperandKind::ConstantBuffer => {
            ignore_swizzle = render_constant_buffer(ctx, info, op, flags)?;
        }
        OperandKind::Resource => {
            let name = resource_name(info, ResourceGroup::Texture, op.register, false);
            ctx.push(&name);
            ignore_swizzle = true;
        }
        OperandKind::Sampler => {
            emitf!(ctx, "Sampler{}", op.register);
            ignore_swizzle = true;
        }
        OperandKind::ImmediateConstantBuffer => {
            ctx.push("immediateConstBufferF");
            if let Some(sub) = op.sub_operand[0].as_deref() {
                // Indexes must be integral.
                ctx.push("(");
                translate_operand(ctx, info, sub, OperandFlags::INT)?;
                ctx.push(")");
            }
        }
        OperandKind::Null => {
            // Discards the result of the expression.
            ctx.push("//null");
        }
        OperandKind::OutputCoverageMask => {
            if !flags.contains(OperandFlags::DECL_NAME) {
                ctx.push("output.");
            }
            ctx.push("sampleMask");
            ignore_swizzle = true;
        }
        OperandKind::InputCoverageMask => {
            if !flags.contains(OperandFlags::DECL_NAME) {
                ctx.push("stageIn.");
            }
            ctx.push("sampleMask");
            ignore_swizzle = true;
        }
        OperandKind::InputThreadId => ctx.push("vThreadID"),
        OperandKind::InputThreadGroupId => ctx.push("vThreadGroupID"),
        OperandKind::InputThreadIdInGroup => ctx.push("vThreadIDInGroup"),
        OperandKind::InputThreadIdInGroupFlattened => {
            ctx.push("vThreadIDInGroupFlattened");
            // No swizzle meaningful for a scalar.
            ignore_swizzle = true;
        }
        OperandKind::UnorderedAccessView => {
            let name = resource_name(info, ResourceGroup::Uav, op.register, false);
            ctx.push(&name);
            ignore_swizzle = true;
        }
        OperandKind::ThreadGroupSharedMemory => {
            emitf!(ctx, "TGSM{}", op.register);
            ignore_swizzle = true;
        }
        OperandKind::InputPrimitiveId => {}
        other => {
            return Err(TranslateError::UnsupportedConstruct(format!(
                "operand kind {other:?} has no rendering for this target"
            )));
        }
    }

    if has_ctor && !ignore_swizzle {
        translate_swizzle_with_mask(ctx, op, mask);
        ignore_swizzle = true;
    }
    if !ignore_swizzle {
        translate_swizzle_with_mask(ctx, op, mask);
    }

    for _ in 0..parens {
        ctx.push(")");
    }
    Ok(())
}

/// Constant-buffer member reference: resolve the member by byte offset,
/// apply dynamic indices (with the matrix-array split of one source index
/// into `[i / 4][i % 4]`), and extend misaligned vectors back to four
/// components. Returns true when the reference is inherently scalar and the
/// caller must not append a selector.
fn render_constant_buffer(
    ctx: &mut Ctx,
    info: &ShaderInfo,
    op: &Operand,
    flags: OperandFlags,
) -> Result<bool, TranslateError> {
    let stage_name = ctx.stage.name_suffix();
    let slot = op.indices[0];
    let cb = info.constant_buffer(ResourceGroup::ConstantBuffer, slot);
    let mut ignore_swizzle = flags.contains(OperandFlags::DECL_NAME);

    if !ctx.flags.contains(CompileFlags::UNIFORM_BUFFER_OBJECT)
        && !ctx.flags.contains(CompileFlags::DISABLE_GLOBALS_STRUCT)
    {
        if let Some(cb) = cb {
            if cb.name.starts_with('$') {
                emitf!(ctx, "Globals{stage_name}");
            } else {
                emitf!(ctx, "{}{stage_name}", cb.name);
            }
            if !flags.contains(OperandFlags::DECL_NAME) {
                ctx.push(".");
            }
        }
    }

    if flags.contains(OperandFlags::DECL_NAME) {
        return Ok(ignore_swizzle);
    }

    // Work out the member reference; the selector comes later.
    let lookup = match cb {
        Some(cb) if !cb.blob => cb.var_from_offset(op.indices[1], first_component(op)),
        _ => None,
    };
    let index: Option<u32> = match (cb, &lookup) {
        (Some(_), Some(found)) => {
            ctx.push(&found.ty.full_name);
            found.index
        }
        (Some(cb), None) if cb.blob => {
            emitf!(ctx, "{}{stage_name}_data", cb.name);
            let elem = cb.vars.first().map(|v| v.name.as_str()).unwrap_or("data");
            match ctx.stage {
                // Vertex stages receive the buffer as a pointer; the other
                // stages as a reference.
                ShaderStage::Vertex => emitf!(ctx, "->{elem}"),
                _ => emitf!(ctx, ".{elem}"),
            }
            Some(op.indices[1])
        }
        _ => {
            // No reflection for this buffer; fall back to the raw dump.
            emitf!(ctx, "cb{slot}.data");
            Some(op.indices[1])
        }
    };

    let var_is_matrix_array = lookup
        .as_ref()
        .map(|l| {
            matches!(l.ty.class, VarClass::MatrixRows | VarClass::MatrixColumns)
                && l.ty.elements > 1
        })
        .unwrap_or(false);

    if let Some(sub) = op.sub_operand[0].as_deref() {
        // A matrix array is addressed as a flat vec4 array by the source;
        // split the index into matrix and row.
        if var_is_matrix_array {
            ctx.push("[(");
            translate_operand(ctx, info, sub, OperandFlags::INT)?;
            ctx.push(") / 4]");
            ctx.push("[((");
            translate_operand_with_mask(ctx, info, sub, OperandFlags::INT, WriteMask::X)?;
            ctx.push(") % 4)]");
        } else {
            ctx.push("[");
            translate_operand(ctx, info, sub, OperandFlags::INT)?;
            ctx.push("]");
        }
    } else if let (Some(idx), Some(sub)) = (index, op.sub_operand[1].as_deref()) {
        let sub_ty = operand_data_type(info, sub);
        let sub_flags = if sub_ty.is_integral() {
            OperandFlags::INT
        } else {
            OperandFlags::BITCAST_TO_INT
        };
        if var_is_matrix_array {
            ctx.push("[(");
            translate_operand(ctx, info, sub, sub_flags)?;
            emitf!(ctx, " + {idx}) / 4]");
            ctx.push("[((");
            translate_operand(ctx, info, sub, sub_flags)?;
            emitf!(ctx, " + {idx}) % 4)]");
        } else {
            ctx.push("[");
            translate_operand(ctx, info, sub, sub_flags)?;
            emitf!(ctx, " + {idx}]");
        }
    } else if let Some(idx) = index {
        if var_is_matrix_array {
            // Open matrix arrays up into vec4 rows.
            emitf!(ctx, "[{}][{}]", idx / 4, idx % 4);
        } else {
            emitf!(ctx, "[{idx}]");
        }
    } else if let Some(sub) = op.sub_operand[1].as_deref() {
        ctx.push("[");
        translate_operand(ctx, info, sub, OperandFlags::INT)?;
        ctx.push("]");
    }

    if let Some(found) = &lookup {
        if found.ty.class == VarClass::Vector {
            // A vector that does not start on a 16-byte boundary was packed
            // after a neighbor; remap the selector so component x of the
            // member lines up with the register component the bytecode
            // addressed, extending to four lanes.
            match found.rebase {
                4 => {
                    if found.ty.columns == 2 {
                        ctx.push(".xxyx");
                    } else if found.ty.columns == 3 {
                        ctx.push(".xxyz");
                    }
                }
                8 => {
                    if found.ty.columns == 2 {
                        ctx.push(".xxxy");
                    }
                }
                _ => {
                    if found.ty.columns == 2 {
                        ctx.push(".xyxx");
                    } else if found.ty.columns == 3 {
                        ctx.push(".xyzx");
                    }
                }
            }
        }
        if found.ty.class == VarClass::Scalar {
            ignore_swizzle = true;
        }
    }

    Ok(ignore_swizzle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requested_type_prefers_int_over_float() {
        assert_eq!(OperandFlags::INT.requested_type(), DataType::Int);
        assert_eq!(OperandFlags::empty().requested_type(), DataType::Float);
        assert_eq!(
            OperandFlags::BITCAST_TO_UINT.requested_type(),
            DataType::UInt
        );
    }

    #[test]
    fn expand_flags_map_counts() {
        assert_eq!(OperandFlags::expand_to(2), OperandFlags::EXPAND_TO_VEC2);
        assert_eq!(OperandFlags::expand_to(4), OperandFlags::EXPAND_TO_VEC4);
    }

    #[test]
    fn constructor_names() {
        assert_eq!(constructor_for(DataType::Float, 4), "float4");
        assert_eq!(constructor_for(DataType::UInt, 1), "uint");
        assert_eq!(constructor_for(DataType::Bool, 2), "int2");
    }
}
