//! Instruction translator: consumes one IR instruction and emits the
//! target-language statement(s) for it.
//!
//! Lowering follows the source instruction set's value model: boolean
//! results are all-bits-set/clear integers, registers are 4-wide and
//! untyped, and several source intrinsics (bitfields, half packing) have no
//! target equivalent and expand into explicit sequences.

use tracing::trace;

use crucible_ir::decl::ResourceDimension;
use crucible_ir::reflect::{BindArea, ResourceGroup, ResourceType, VarClass};
use crucible_ir::{
    ComponentSelect, DataType, Instruction, Opcode, Operand, OperandKind, ResInfoReturn,
    ShaderData, SyncFlags, TestBool, WriteMask,
};

use crate::context::{emitf, Ctx, Sink};
use crate::names::{
    lookup_structured_var, lookup_structured_var_atomic, resource_name, texture_sampler_name,
};
use crate::operand::{
    add_swizzle_by_count, constructor_for, operand_data_type, operand_data_type_ex,
    resource_swizzle_with_mask, translate_operand, translate_operand_with_mask,
    translate_swizzle, OperandFlags,
};
use crate::TranslateError;

fn close_assign(ctx: &mut Ctx, parens: u32) {
    for _ in 0..parens {
        ctx.push(")");
    }
    ctx.push(";\n");
}

/// Print the destination, its write mask, the assignment operator, and any
/// conversion needed for a source of the given flavor and width. Returns
/// the number of parentheses the caller must close.
fn add_op_assign_to_dest_with_mask(
    ctx: &mut Ctx,
    shader: &ShaderData,
    dest: &Operand,
    src_type: DataType,
    src_count: u32,
    op: &str,
    mask: WriteMask,
) -> Result<u32, TranslateError> {
    let dest_count = dest.selected_count_with_mask(mask);
    let mut dest_type = operand_data_type(&shader.info, dest);

    let mut flags = OperandFlags::DESTINATION;
    if src_type == DataType::Half {
        flags |= OperandFlags::HALF;
    }
    translate_operand_with_mask(ctx, &shader.info, dest, flags, mask)?;

    // Framebuffer-fetch outputs are full floats regardless of precision.
    if dest_type == DataType::Half
        && dest.kind == OperandKind::Output
        && ctx.regs.gmem_elements.get(&0).copied().unwrap_or(0) > 0
    {
        dest_type = DataType::Float;
    }

    if dest_type == src_type {
        // The source language default-fills missing components, e.g.
        // `mov r0, c0.x` writes all four lanes.
        if dest_count > src_count {
            emitf!(ctx, " {op} {}(", constructor_for(dest_type, dest_count));
            return Ok(1);
        }
        emitf!(ctx, " {op} ");
        return Ok(0);
    }

    let mut parens = 0;
    match dest_type {
        DataType::Int | DataType::UInt => {
            let scalar = if dest_type == DataType::Int { "int" } else { "uint" };
            if dest_count == 1 {
                emitf!(ctx, " {op} as_type<{scalar}>(");
            } else {
                emitf!(ctx, " {op} as_type<{scalar}{dest_count}>(");
            }
        }
        DataType::Float => {
            let cast = if src_type == DataType::Half {
                "static_cast"
            } else {
                "as_type"
            };
            if dest_count == 1 {
                emitf!(ctx, " {op} {cast}<float>(");
            } else {
                emitf!(ctx, " {op} {cast}<float{dest_count}>(");
            }
        }
        DataType::Half => {
            if dest_count == 1 {
                emitf!(ctx, " {op} static_cast<half>(");
            } else {
                emitf!(ctx, " {op} static_cast<half{dest_count}>(");
            }
        }
        _ => {
            emitf!(ctx, " {op} ");
            return Ok(0);
        }
    }
    if dest_count > src_count {
        emitf!(ctx, "{}(", constructor_for(src_type, dest_count));
        parens += 1;
    }
    Ok(parens + 1)
}

fn add_assign_to_dest(
    ctx: &mut Ctx,
    shader: &ShaderData,
    dest: &Operand,
    src_type: DataType,
    src_count: u32,
) -> Result<u32, TranslateError> {
    add_op_assign_to_dest_with_mask(ctx, shader, dest, src_type, src_count, "=", WriteMask::XYZW)
}

fn resource_return_flags(ty: crucible_ir::ResourceReturnType) -> OperandFlags {
    match ty {
        crucible_ir::ResourceReturnType::SInt => OperandFlags::INT,
        crucible_ir::ResourceReturnType::UInt => OperandFlags::UINT,
        _ => OperandFlags::empty(),
    }
}

#[derive(Clone, Copy)]
enum CmpOp {
    Eq,
    Lt,
    Ge,
    Ne,
}

impl CmpOp {
    fn token(self) -> &'static str {
        match self {
            CmpOp::Eq => "==",
            CmpOp::Lt => "<",
            CmpOp::Ge => ">=",
            CmpOp::Ne => "!=",
        }
    }
}

/// Comparisons return all-bits-set / all-bits-clear integers, so they lower
/// to a `select` between 0 and 0xFFFFFFFF rather than a native boolean.
fn add_comparison(
    ctx: &mut Ctx,
    shader: &ShaderData,
    inst: &Instruction,
    cmp: CmpOp,
    type_flags: OperandFlags,
) -> Result<(), TranslateError> {
    let dest = &inst.operands[0];
    let s0 = &inst.operands[1];
    let s1 = &inst.operands[2];

    let dest_count = dest.selected_count();
    let s0_count = s0.selected_count();
    let s1_count = s1.selected_count();
    let min_count = dest_count.min(s0_count);

    debug_assert!(s0_count == s1_count || s1_count == 1 || s0_count == 1);
    let orig_flags = type_flags;
    let mut type_flags = type_flags;
    if s0_count != s1_count {
        // Auto-expand whichever source is scalar.
        type_flags |= OperandFlags::expand_to(s0_count.max(s1_count));
    }

    ctx.add_indentation();
    let parens = add_assign_to_dest(ctx, shader, dest, DataType::Int, dest_count)?;

    ctx.push("select(");
    if dest_count == 1 {
        ctx.push("0, (int)0xFFFFFFFF, (");
    } else {
        emitf!(ctx, "int{dest_count}(0), int{dest_count}(0xFFFFFFFF), (");
    }

    translate_operand(ctx, &shader.info, s0, type_flags)?;
    ctx.push(")");
    if dest_count > 1 {
        translate_swizzle(ctx, dest);
    } else if s0_count > min_count {
        add_swizzle_by_count(ctx, min_count);
    }
    emitf!(ctx, " {} (", cmp.token());
    translate_operand(ctx, &shader.info, s1, type_flags)?;
    ctx.push(")");
    if dest_count > 1 {
        translate_swizzle(ctx, dest);
    } else if s1_count > min_count || orig_flags != type_flags {
        add_swizzle_by_count(ctx, min_count);
    }
    ctx.push(")");
    close_assign(ctx, parens);
    Ok(())
}

fn add_mov(
    ctx: &mut Ctx,
    shader: &ShaderData,
    dest: &Operand,
    src: &Operand,
) -> Result<(), TranslateError> {
    let src_count = src.selected_count();
    let write_mask = dest.write_mask();

    let src_type = operand_data_type_ex(&shader.info, src, operand_data_type(&shader.info, dest));
    let flags = OperandFlags::for_type(src_type);

    let parens = add_assign_to_dest(ctx, shader, dest, src_type, src_count)?;
    translate_operand_with_mask(ctx, &shader.info, src, flags, write_mask)?;
    close_assign(ctx, parens);
    Ok(())
}

/// Conditional move. A scalar (or replicated) predicate becomes a single
/// if/else; a vector predicate selects component by component.
fn add_movc(
    ctx: &mut Ctx,
    shader: &ShaderData,
    dest: &Operand,
    src0: &Operand,
    src1: &Operand,
    src2: &Operand,
) -> Result<(), TranslateError> {
    let dest_count = dest.selected_count();
    let s0_count = src0.selected_count();
    let s1_count = src1.selected_count();
    let s2_count = src2.selected_count();
    let dest_mask = dest.write_mask();
    let dest_type = operand_data_type(&shader.info, dest);
    let type_flags = OperandFlags::for_type(dest_type);

    if s0_count == 1 || src0.is_swizzle_replicated() {
        ctx.add_indentation();
        ctx.push("if (");
        translate_operand(ctx, &shader.info, src0, OperandFlags::BITCAST_TO_INT)?;
        if s0_count > 1 {
            ctx.push(".x");
        }
        ctx.push(" != 0)\n");
        ctx.add_indentation();
        ctx.add_indentation();

        let parens = add_assign_to_dest(ctx, shader, dest, dest_type, dest_count)?;
        debug_assert_eq!(parens, 0);
        if s1_count == 1 && dest_count > 1 {
            translate_operand(
                ctx,
                &shader.info,
                src1,
                type_flags | OperandFlags::expand_to(dest_count),
            )?;
        } else {
            translate_operand_with_mask(ctx, &shader.info, src1, type_flags, dest_mask)?;
        }
        ctx.push(";\n");

        ctx.add_indentation();
        ctx.push("else\n");
        ctx.add_indentation();
        ctx.add_indentation();

        let parens = add_assign_to_dest(ctx, shader, dest, dest_type, dest_count)?;
        if s2_count == 1 && dest_count > 1 {
            translate_operand(
                ctx,
                &shader.info,
                src2,
                type_flags | OperandFlags::expand_to(dest_count),
            )?;
        } else {
            translate_operand_with_mask(ctx, &shader.info, src2, type_flags, dest_mask)?;
        }
        close_assign(ctx, parens);
    } else {
        for component in 0..4u8 {
            if let ComponentSelect::Mask(mask) = dest.sel {
                if mask.0 != 0 && !mask.contains(component) {
                    continue;
                }
            }
            let component_mask = WriteMask(1 << component);

            ctx.add_indentation();
            ctx.push("if (");
            translate_operand_with_mask(
                ctx,
                &shader.info,
                src0,
                OperandFlags::BITCAST_TO_INT,
                component_mask,
            )?;
            ctx.push(" != 0)\n");
            ctx.add_indentation();
            ctx.add_indentation();

            let parens = add_op_assign_to_dest_with_mask(
                ctx, shader, dest, dest_type, 1, "=", component_mask,
            )?;
            debug_assert_eq!(parens, 0);
            translate_operand_with_mask(ctx, &shader.info, src1, type_flags, component_mask)?;
            ctx.push(";\n");

            ctx.add_indentation();
            ctx.push("else\n");
            ctx.add_indentation();
            ctx.add_indentation();

            let parens = add_op_assign_to_dest_with_mask(
                ctx, shader, dest, dest_type, 1, "=", component_mask,
            )?;
            translate_operand_with_mask(ctx, &shader.info, src2, type_flags, component_mask)?;
            close_assign(ctx, parens);
        }
    }
    Ok(())
}

/// Infix binary operator. When the destination aliases one of the sources
/// (same register, modifier and selection) the statement collapses to a
/// compound assignment; aliasing the right source additionally requires a
/// commutative operator.
fn call_binary_op(
    ctx: &mut Ctx,
    shader: &ShaderData,
    name: &str,
    inst: &Instruction,
    dest: usize,
    src0: usize,
    src1: usize,
    data_type: DataType,
) -> Result<(), TranslateError> {
    let dest_op = &inst.operands[dest];
    let src0_op = &inst.operands[src0];
    let src1_op = &inst.operands[src1];

    if dest_op.kind == OperandKind::Null {
        return Ok(());
    }

    let dst_count = dest_op.selected_count();
    let s0_count = src0_op.selected_count();
    let s1_count = src1_op.selected_count();
    let dest_mask = dest_op.write_mask();
    let type_flags = OperandFlags::for_type(data_type);

    ctx.add_indentation();

    if s1_count == s0_count && s0_count == dst_count {
        if dest_op.is_identical_temp(src0_op) {
            let parens = add_op_assign_to_dest_with_mask(
                ctx, shader, dest_op, data_type, dst_count, name, WriteMask::XYZW,
            )?;
            translate_operand(ctx, &shader.info, src1_op, type_flags)?;
            close_assign(ctx, parens);
            return Ok(());
        }
        if dest_op.is_identical_temp(src1_op) && inst.opcode.is_commutative() {
            let parens = add_op_assign_to_dest_with_mask(
                ctx, shader, dest_op, data_type, dst_count, name, WriteMask::XYZW,
            )?;
            translate_operand(ctx, &shader.info, src0_op, type_flags)?;
            close_assign(ctx, parens);
            return Ok(());
        }
    }

    let parens = add_assign_to_dest(ctx, shader, dest_op, data_type, dst_count)?;
    translate_operand_with_mask(ctx, &shader.info, src0_op, type_flags, dest_mask)?;
    emitf!(ctx, " {name} ");
    translate_operand_with_mask(ctx, &shader.info, src1_op, type_flags, dest_mask)?;
    close_assign(ctx, parens);
    Ok(())
}

fn call_ternary_op(
    ctx: &mut Ctx,
    shader: &ShaderData,
    op1: &str,
    op2: &str,
    inst: &Instruction,
    data_flags: OperandFlags,
) -> Result<(), TranslateError> {
    let dest = &inst.operands[0];
    let dst_count = dest.selected_count();
    let dest_mask = dest.write_mask();
    let dest_type = operand_data_type(&shader.info, dest);
    let flags = data_flags | OperandFlags::for_type(dest_type);

    ctx.add_indentation();
    let parens = add_assign_to_dest(ctx, shader, dest, data_flags.requested_type(), dst_count)?;
    translate_operand_with_mask(ctx, &shader.info, &inst.operands[1], flags, dest_mask)?;
    emitf!(ctx, " {op1} ");
    translate_operand_with_mask(ctx, &shader.info, &inst.operands[2], flags, dest_mask)?;
    emitf!(ctx, " {op2} ");
    translate_operand_with_mask(ctx, &shader.info, &inst.operands[3], flags, dest_mask)?;
    close_assign(ctx, parens);
    Ok(())
}

fn call_helper1(
    ctx: &mut Ctx,
    shader: &ShaderData,
    name: &str,
    inst: &Instruction,
    dest: usize,
    src0: usize,
    follow_write_mask: bool,
) -> Result<(), TranslateError> {
    let dest_op = &inst.operands[dest];
    let dst_count = dest_op.selected_count();
    let mask = if follow_write_mask {
        dest_op.write_mask()
    } else {
        WriteMask::XYZW
    };

    ctx.add_indentation();
    let parens = add_assign_to_dest(ctx, shader, dest_op, DataType::Float, dst_count)?;
    emitf!(ctx, "{name}(");
    translate_operand_with_mask(
        ctx,
        &shader.info,
        &inst.operands[src0],
        OperandFlags::BITCAST_TO_FLOAT,
        mask,
    )?;
    close_assign(ctx, parens + 1);
    Ok(())
}

fn call_helper2(
    ctx: &mut Ctx,
    shader: &ShaderData,
    name: &str,
    inst: &Instruction,
    dest: usize,
    src0: usize,
    src1: usize,
    follow_write_mask: bool,
) -> Result<(), TranslateError> {
    let dest_op = &inst.operands[dest];
    let dest_type = operand_data_type(&shader.info, dest_op);
    let flags = OperandFlags::BITCAST_TO_FLOAT | OperandFlags::for_type(dest_type);
    let dst_count = dest_op.selected_count();
    let mask = if follow_write_mask {
        dest_op.write_mask()
    } else {
        WriteMask::XYZW
    };
    // Dot products collapse to a scalar regardless of the write width.
    let is_dot = name.starts_with("dot");

    ctx.add_indentation();
    let parens = add_assign_to_dest(
        ctx,
        shader,
        dest_op,
        DataType::Float,
        if is_dot { 1 } else { dst_count },
    )?;
    emitf!(ctx, "{name}(");
    translate_operand_with_mask(ctx, &shader.info, &inst.operands[src0], flags, mask)?;
    ctx.push(", ");
    translate_operand_with_mask(ctx, &shader.info, &inst.operands[src1], flags, mask)?;
    close_assign(ctx, parens + 1);
    Ok(())
}

fn call_helper2_typed(
    ctx: &mut Ctx,
    shader: &ShaderData,
    name: &str,
    inst: &Instruction,
    dest: usize,
    src0: usize,
    src1: usize,
    follow_write_mask: bool,
    ty: DataType,
) -> Result<(), TranslateError> {
    let dest_op = &inst.operands[dest];
    let flags = if ty == DataType::UInt {
        OperandFlags::BITCAST_TO_UINT
    } else {
        OperandFlags::BITCAST_TO_INT
    };
    let dst_count = dest_op.selected_count();
    let mask = if follow_write_mask {
        dest_op.write_mask()
    } else {
        WriteMask::XYZW
    };

    ctx.add_indentation();
    let parens = add_assign_to_dest(ctx, shader, dest_op, ty, dst_count)?;
    emitf!(ctx, "{name}(");
    translate_operand_with_mask(ctx, &shader.info, &inst.operands[src0], flags, mask)?;
    ctx.push(", ");
    translate_operand_with_mask(ctx, &shader.info, &inst.operands[src1], flags, mask)?;
    close_assign(ctx, parens + 1);
    Ok(())
}

fn call_helper3(
    ctx: &mut Ctx,
    shader: &ShaderData,
    name: &str,
    inst: &Instruction,
    dest: usize,
    src0: usize,
    src1: usize,
    src2: usize,
    follow_write_mask: bool,
) -> Result<(), TranslateError> {
    let dest_op = &inst.operands[dest];
    let dest_type = operand_data_type(&shader.info, dest_op);
    let flags = OperandFlags::BITCAST_TO_FLOAT | OperandFlags::for_type(dest_type);
    let dst_count = dest_op.selected_count();
    let mask = if follow_write_mask {
        dest_op.write_mask()
    } else {
        WriteMask::XYZW
    };

    ctx.add_indentation();
    let parens = add_assign_to_dest(ctx, shader, dest_op, DataType::Float, dst_count)?;
    emitf!(ctx, "{name}(");
    translate_operand_with_mask(ctx, &shader.info, &inst.operands[src0], flags, mask)?;
    ctx.push(", ");
    translate_operand_with_mask(ctx, &shader.info, &inst.operands[src1], flags, mask)?;
    ctx.push(", ");
    translate_operand_with_mask(ctx, &shader.info, &inst.operands[src2], flags, mask)?;
    close_assign(ctx, parens + 1);
    Ok(())
}

/// Number of coordinate components a resource dimensionality consumes.
fn texture_dimension_count(dim: ResourceDimension) -> u32 {
    use ResourceDimension::*;
    match dim {
        Texture1D => 1,
        Texture2D | Texture1DArray | TextureCube => 2,
        Texture3D | Texture2DArray | TextureCubeArray => 3,
        _ => 0,
    }
}

/// Mask/expand a coordinate vector to exactly the component count the
/// resource dimensionality requires, with the array slice appended as a
/// separate argument for array variants.
fn translate_tex_coord(
    ctx: &mut Ctx,
    shader: &ShaderData,
    dim: ResourceDimension,
    coord: &Operand,
) -> Result<(), TranslateError> {
    let mut flags = OperandFlags::BITCAST_TO_FLOAT;
    let mut mask = WriteMask::XYZW;
    let mut is_array = false;

    use ResourceDimension::*;
    match dim {
        Texture1D => mask = WriteMask::X,
        Texture2D | Texture1DArray => {
            mask = WriteMask::XY;
            flags |= OperandFlags::EXPAND_TO_VEC2;
        }
        TextureCube | Texture3D => {
            mask = WriteMask::XYZ;
            flags |= OperandFlags::EXPAND_TO_VEC3;
        }
        Texture2DArray => {
            mask = WriteMask::XY;
            flags |= OperandFlags::EXPAND_TO_VEC2;
            is_array = true;
        }
        TextureCubeArray => {
            flags |= OperandFlags::EXPAND_TO_VEC4;
        }
        other => {
            return Err(TranslateError::UnsupportedConstruct(format!(
                "cannot sample a {other:?} resource"
            )));
        }
    }

    translate_operand_with_mask(ctx, &shader.info, coord, flags, mask)?;
    if is_array {
        ctx.push(",");
        translate_operand_with_mask(ctx, &shader.info, coord, OperandFlags::empty(), WriteMask::Z)?;
    }
    Ok(())
}

const TEX_FLAG_LOD: u32 = 1 << 0;
const TEX_FLAG_COMPARE: u32 = 1 << 1;
const TEX_FLAG_FIRST_LOD: u32 = 1 << 2;
const TEX_FLAG_BIAS: u32 = 1 << 3;
const TEX_FLAG_GRAD: u32 = 1 << 4;

fn translate_texture_sample(
    ctx: &mut Ctx,
    shader: &ShaderData,
    inst: &Instruction,
    inst_index: usize,
    flags: u32,
) -> Result<(), TranslateError> {
    let dest = &inst.operands[0];
    let coord = &inst.operands[1];
    let resource = &inst.operands[2];
    let sampler = &inst.operands[3];

    let Some(&dim) = ctx.regs.resource_dims.get(&resource.register) else {
        return Err(TranslateError::UnsupportedInstruction {
            index: inst_index,
            opcode: inst.opcode,
        });
    };

    let (grad_swizzle, offset_count, compare_coord_type) = {
        use ResourceDimension::*;
        match dim {
            Texture1D | Texture1DArray => (".x", 1, ""),
            Texture2D | Texture2DArray => (".xy", 2, "float2"),
            TextureCube => (".xyz", 3, "float3"),
            Texture3D | TextureCubeArray => (".xyz", 3, ""),
            other => {
                return Err(TranslateError::UnsupportedConstruct(format!(
                    "cannot sample a {other:?} resource"
                )));
            }
        }
    };

    let compare = flags & TEX_FLAG_COMPARE != 0;
    ctx.texture_samplers
        .insert((resource.register, sampler.register, compare));

    ctx.add_indentation();
    let parens = add_assign_to_dest(
        ctx,
        shader,
        dest,
        DataType::Float,
        resource.selected_count(),
    )?;

    if compare {
        // The reference value is always a separate trailing argument in the
        // source language; the comparison sampler is the constexpr one.
        let tex = resource_name(&shader.info, ResourceGroup::Texture, resource.register, false);
        let smp = texture_sampler_name(&shader.info, resource.register, sampler.register, true);
        emitf!(ctx, "(float4({tex}.sample_compare({smp}, {compare_coord_type}(");
        translate_tex_coord(ctx, shader, dim, coord)?;
        ctx.push("), ");
        translate_operand(
            ctx,
            &shader.info,
            &inst.operands[4],
            OperandFlags::BITCAST_TO_FLOAT,
        )?;
        if flags & TEX_FLAG_FIRST_LOD != 0 {
            ctx.push(", level(0)");
        }
        if let Some(offsets) = inst.address_offsets {
            match offset_count {
                2 => emitf!(ctx, ", int2({}, {})", offsets[0], offsets[1]),
                3 => emitf!(ctx, ", int3({}, {}, {})", offsets[0], offsets[1], offsets[2]),
                _ => {}
            }
        }
        ctx.push(")))");
        resource_swizzle_with_mask(ctx, resource, dest.write_mask());
    } else {
        let tex = resource_name(&shader.info, ResourceGroup::Texture, resource.register, false);
        let smp = texture_sampler_name(&shader.info, resource.register, sampler.register, false);
        emitf!(ctx, "({tex}.sample({smp}, ");
        translate_tex_coord(ctx, shader, dim, coord)?;

        if flags & TEX_FLAG_LOD != 0 {
            ctx.push(", level(");
            translate_operand(
                ctx,
                &shader.info,
                &inst.operands[4],
                OperandFlags::BITCAST_TO_FLOAT,
            )?;
            ctx.push(")");
        } else if flags & TEX_FLAG_FIRST_LOD != 0 {
            ctx.push(", level(0)");
        } else if flags & TEX_FLAG_BIAS != 0 {
            ctx.push(", bias(");
            translate_operand(
                ctx,
                &shader.info,
                &inst.operands[4],
                OperandFlags::BITCAST_TO_FLOAT,
            )?;
            ctx.push(")");
        } else if flags & TEX_FLAG_GRAD != 0 {
            if dim == ResourceDimension::TextureCube {
                ctx.push(", gradientcube(float4(");
            } else {
                emitf!(ctx, ", gradient{offset_count}d(float4(");
            }
            translate_operand(
                ctx,
                &shader.info,
                &inst.operands[4],
                OperandFlags::BITCAST_TO_FLOAT,
            )?;
            ctx.push(")");
            ctx.push(grad_swizzle);
            ctx.push(", float4(");
            translate_operand(
                ctx,
                &shader.info,
                &inst.operands[5],
                OperandFlags::BITCAST_TO_FLOAT,
            )?;
            ctx.push(")");
            ctx.push(grad_swizzle);
            ctx.push(")");
        }

        if let Some(offsets) = inst.address_offsets {
            match offset_count {
                1 => emitf!(ctx, ", {}", offsets[0]),
                2 => emitf!(ctx, ", int2({}, {})", offsets[0], offsets[1]),
                3 => emitf!(ctx, ", int3({}, {}, {})", offsets[0], offsets[1], offsets[2]),
                _ => {}
            }
        }
        ctx.push("))");
        resource_swizzle_with_mask(ctx, resource, dest.write_mask());
    }

    close_assign(ctx, parens);
    Ok(())
}

/// Integer texel fetch (`ld` / `ld_ms`): `.read` with per-dimension
/// coordinate and mip/sample arguments. The mip level travels in the
/// coordinate's w lane.
fn translate_texel_fetch(
    ctx: &mut Ctx,
    shader: &ShaderData,
    inst: &Instruction,
    inst_index: usize,
) -> Result<(), TranslateError> {
    let dest = &inst.operands[0];
    let addr = &inst.operands[1];
    let resource = &inst.operands[2];

    let binding = shader.info.binding(ResourceGroup::Texture, resource.register);
    let return_flags = binding
        .map(|b| resource_return_flags(b.return_type))
        .unwrap_or(OperandFlags::empty());

    // Framebuffer fetch: the attachment value is already in a parameter.
    if resource.register >= crate::binding_model::GMEM_FLOAT_START_SLOT {
        let slot = crate::binding_model::gmem_input_slot(resource.register);
        let elements = crate::binding_model::gmem_input_elements(resource.register);
        ctx.add_indentation();
        let parens = add_assign_to_dest(ctx, shader, dest, return_flags.requested_type(), 4)?;
        emitf!(ctx, "(GMEM_Input{slot}");
        crate::operand::translate_gmem_swizzle_with_mask(ctx, resource, WriteMask::XYZW, elements);
        ctx.push(")");
        translate_swizzle(ctx, dest);
        close_assign(ctx, parens);
        return Ok(());
    }

    let dim = binding
        .and_then(|b| b.dimension)
        .or_else(|| ctx.regs.resource_dims.get(&resource.register).copied());
    let Some(dim) = dim else {
        return Err(TranslateError::UnsupportedInstruction {
            index: inst_index,
            opcode: inst.opcode,
        });
    };

    ctx.add_indentation();
    let parens = add_assign_to_dest(ctx, shader, dest, return_flags.requested_type(), 4)?;

    ctx.push("(");
    translate_operand(ctx, &shader.info, resource, OperandFlags::empty())?;
    ctx.push(".read(");

    use ResourceDimension::*;
    match dim {
        Texture1D => {
            ctx.push("(");
            translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
            ctx.push(").x)");
        }
        Texture1DArray => {
            ctx.push("(");
            translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
            ctx.push(").x, (");
            translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
            ctx.push(").y)");
        }
        Texture2D => {
            ctx.push("(");
            translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
            ctx.push(").xy, (");
            translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
            ctx.push(").w)");
        }
        Texture2DArray => {
            ctx.push("(");
            translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
            ctx.push(").xy, (");
            translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
            ctx.push(").z, (");
            translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
            ctx.push(").w)");
        }
        Texture3D => {
            ctx.push("(");
            translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
            ctx.push(").xyz, (");
            translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
            ctx.push(").w)");
        }
        Texture2DMs => {
            debug_assert_eq!(inst.opcode, Opcode::LdMs);
            ctx.push("(");
            translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
            ctx.push(").xy, ");
            translate_operand(ctx, &shader.info, &inst.operands[3], OperandFlags::UINT)?;
            ctx.push(")");
        }
        other => {
            return Err(TranslateError::UnsupportedConstruct(format!(
                "texel fetch from a {other:?} resource"
            )));
        }
    }

    resource_swizzle_with_mask(ctx, resource, WriteMask::XYZW);
    ctx.push(")");
    translate_swizzle(ctx, dest);
    close_assign(ctx, parens);
    Ok(())
}

/// One element of `resinfo`: `[width, height, depth-or-layers, mip count]`,
/// cast per the instruction's return kind.
fn resinfo_element(
    ctx: &mut Ctx,
    shader: &ShaderData,
    inst: &Instruction,
    element: u8,
    dest_component: u8,
) -> Result<(), TranslateError> {
    let dest = &inst.operands[0];
    let mip = &inst.operands[1];
    let resource = &inst.operands[2];
    let return_kind = inst.resinfo_return;
    let dim = ctx
        .regs
        .resource_dims
        .get(&resource.register)
        .copied()
        .ok_or_else(|| {
            TranslateError::UnsupportedConstruct(format!(
                "resinfo on undeclared resource t{}",
                resource.register
            ))
        })?;
    let dims = texture_dimension_count(dim);

    ctx.add_indentation();
    let parens = add_op_assign_to_dest_with_mask(
        ctx,
        shader,
        dest,
        if return_kind == ResInfoReturn::UInt {
            DataType::UInt
        } else {
            DataType::Float
        },
        1,
        "=",
        WriteMask(1 << dest_component),
    )?;

    let tex = resource_name(&shader.info, ResourceGroup::Texture, resource.register, false);

    if element < 3 {
        ctx.push("(");
        if dims < u32::from(element) + 1 {
            ctx.push(if return_kind == ResInfoReturn::UInt {
                "0u"
            } else {
                "0.0"
            });
        } else {
            let query = match element {
                0 => "get_width",
                1 => "get_height",
                _ => {
                    if matches!(
                        dim,
                        ResourceDimension::Texture1DArray
                            | ResourceDimension::Texture2DArray
                            | ResourceDimension::TextureCubeArray
                    ) {
                        "get_array_size"
                    } else {
                        "get_depth"
                    }
                }
            };
            match return_kind {
                ResInfoReturn::UInt => emitf!(ctx, "{tex}.{query}("),
                ResInfoReturn::RcpFloat => emitf!(ctx, "1.0 / float({tex}.{query}("),
                ResInfoReturn::Float => emitf!(ctx, "float({tex}.{query}("),
            }
            // Array-size queries do not take a mip argument.
            if query != "get_array_size" {
                translate_operand(ctx, &shader.info, mip, OperandFlags::INT)?;
            }
            ctx.push(")");
            if return_kind != ResInfoReturn::UInt {
                ctx.push(")");
            }
        }
        ctx.push(")");
    } else {
        match return_kind {
            ResInfoReturn::UInt => emitf!(ctx, "{tex}.get_num_mip_levels()"),
            _ => emitf!(ctx, "float({tex}.get_num_mip_levels())"),
        }
    }
    close_assign(ctx, parens);
    Ok(())
}

/// Raw / structured store: one assignment per component of the destination
/// write mask, resolving the exact backing member (and its sub-component)
/// per component.
fn translate_storage_store(
    ctx: &mut Ctx,
    shader: &ShaderData,
    inst: &Instruction,
) -> Result<(), TranslateError> {
    let structured = inst.opcode == Opcode::StoreStructured;
    let (dest, dest_addr, dest_byte_off, src) = if structured {
        (
            &inst.operands[0],
            Some(&inst.operands[1]),
            &inst.operands[2],
            &inst.operands[3],
        )
    } else {
        (&inst.operands[0], None, &inst.operands[1], &inst.operands[2])
    };

    let mut src_component = 0u8;
    let dest_mask = match dest.sel {
        ComponentSelect::Mask(mask) => mask,
        _ => {
            debug_assert!(false, "storage store destination must use mask mode");
            WriteMask::XYZW
        }
    };

    for component in 0..4u8 {
        if !dest_mask.contains(component) {
            continue;
        }

        let var = if structured && dest.kind != OperandKind::ThreadGroupSharedMemory {
            lookup_structured_var(&shader.info, ctx, dest, dest_byte_off, component.into())
                .map(|l| (l.ty.clone(), l.ty.full_name.clone()))
        } else {
            None
        };

        ctx.add_indentation();

        // Raw TGSM is declared as atomic words; plain stores go through
        // atomic_store.
        let tgsm_atomic = !structured && dest.kind == OperandKind::ThreadGroupSharedMemory;
        if tgsm_atomic {
            ctx.push("atomic_store_explicit( &");
        }

        if structured && dest.kind == OperandKind::Resource {
            let name = resource_name(&shader.info, ResourceGroup::Texture, dest.register, false);
            ctx.push(&name);
        } else {
            translate_operand(
                ctx,
                &shader.info,
                dest,
                OperandFlags::DESTINATION | OperandFlags::NAME_ONLY,
            )?;
        }
        ctx.push("[");
        if structured {
            let addr = dest_addr.expect("structured store address");
            if dest.kind == OperandKind::ThreadGroupSharedMemory {
                translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
                ctx.push("].value[");
                translate_operand(ctx, &shader.info, dest_byte_off, OperandFlags::UINT)?;
                // Bytes to words.
                ctx.push("/4u");
            } else {
                translate_operand(ctx, &shader.info, addr, OperandFlags::UINT)?;
            }
        } else {
            translate_operand(ctx, &shader.info, dest_byte_off, OperandFlags::UINT)?;
        }
        if !structured || dest.kind == OperandKind::ThreadGroupSharedMemory {
            emitf!(ctx, " + {component}");
        }
        ctx.push("]");

        if let Some((var_ty, full_name)) = &var {
            if var_ty.name != "$Element" {
                emitf!(ctx, ".{}", leaf_name(full_name, &var_ty.name));
            }
            if var_ty.columns > 1 || var_ty.rows > 1 {
                const SWIZZLE: [&str; 4] = [".x", ".y", ".z", ".w"];
                let byte = dest_byte_off.imm[0] + 4 * u32::from(component);
                let idx = ((byte - var_ty.offset) % 16 / 4) as usize;
                ctx.push(SWIZZLE[idx]);
            }
        }

        let flags = match var.as_ref().map(|(ty, _)| ty.ty) {
            Some(DataType::Int) => OperandFlags::INT,
            Some(DataType::Float) => OperandFlags::empty(),
            Some(DataType::Half) => OperandFlags::HALF,
            // Raw buffers and TGSM are untyped word arrays.
            _ => OperandFlags::UINT,
        };

        if tgsm_atomic {
            ctx.push(", (");
        } else {
            ctx.push(" = (");
        }
        if src.selected_count() > 1 {
            translate_operand_with_mask(
                ctx,
                &shader.info,
                src,
                flags,
                WriteMask(1 << src_component),
            )?;
            src_component += 1;
        } else {
            translate_operand_with_mask(ctx, &shader.info, src, flags, WriteMask::X)?;
        }
        if tgsm_atomic {
            ctx.push("), memory_order_relaxed);\n");
        } else {
            ctx.push(");\n");
        }
    }
    Ok(())
}

/// The member path of a leaf inside the buffer element; `$Element` roots
/// are addressed directly.
fn leaf_name<'a>(full_name: &'a str, name: &'a str) -> &'a str {
    if full_name.is_empty() {
        name
    } else {
        full_name
    }
}

/// Raw / structured load: gather each masked component, reinterpreting from
/// the resolved member's declared flavor back to the raw uint view.
fn translate_storage_load(
    ctx: &mut Ctx,
    shader: &ShaderData,
    inst: &Instruction,
) -> Result<(), TranslateError> {
    let structured = inst.opcode == Opcode::LdStructured;
    let (dest, src_addr, src_byte_off, src) = if structured {
        (
            &inst.operands[0],
            Some(&inst.operands[1]),
            &inst.operands[2],
            &inst.operands[3],
        )
    } else {
        (&inst.operands[0], None, &inst.operands[1], &inst.operands[2])
    };

    let dest_count = dest.selected_count();
    let dest_mask = dest.write_mask();

    ctx.add_indentation();
    let mut parens = add_assign_to_dest(ctx, shader, dest, DataType::UInt, dest_count)?;
    if dest_count > 1 {
        emitf!(ctx, "{}(", constructor_for(DataType::UInt, dest_count));
        parens += 1;
    }

    let mut first = true;
    for component in 0..4u8 {
        if !dest_mask.contains(component) {
            continue;
        }
        if !first {
            ctx.push(", ");
        }
        first = false;

        let src_component = match src.sel {
            ComponentSelect::Swizzle(s) => s.0[component as usize],
            _ => component,
        };

        if !structured {
            if src.kind == OperandKind::ThreadGroupSharedMemory {
                emitf!(ctx, "atomic_load_explicit( &TGSM{}[((", src.register);
                translate_operand(ctx, &shader.info, src_byte_off, OperandFlags::INT)?;
                ctx.push(") >> 2)");
                if src_component != 0 {
                    emitf!(ctx, " + {src_component}");
                }
                ctx.push("], memory_order_relaxed)");
            } else {
                emitf!(ctx, "RawRes{}[((", src.register);
                translate_operand(ctx, &shader.info, src_byte_off, OperandFlags::INT)?;
                ctx.push(") >> 2)");
                if src_component != 0 {
                    emitf!(ctx, " + {src_component}");
                }
                ctx.push("]");
            }
            continue;
        }

        if src.kind == OperandKind::ThreadGroupSharedMemory {
            // Shared memory words are already uints.
            translate_operand(ctx, &shader.info, src, OperandFlags::NAME_ONLY)?;
            ctx.push("[");
            let addr = src_addr.expect("structured load address");
            translate_operand(ctx, &shader.info, addr, OperandFlags::INT)?;
            ctx.push("].value[(");
            translate_operand(ctx, &shader.info, src_byte_off, OperandFlags::UINT)?;
            emitf!(ctx, " >> 2u) + {src_component}]");
            continue;
        }

        let Some(found) =
            lookup_structured_var(&shader.info, ctx, src, src_byte_off, src_component.into())
        else {
            return Err(TranslateError::UnsupportedConstruct(format!(
                "structured load resolves no member at offset {}",
                src_byte_off.imm[0]
            )));
        };
        let var_ty = found.ty.clone();

        let bitcast = matches!(var_ty.ty, DataType::Float | DataType::Double);
        if bitcast {
            ctx.push("as_type<uint>((");
        }

        // UAVs are addressed by the reflection buffer name; structured SRVs
        // by their declared resource name.
        let elem_name = if src.kind == OperandKind::UnorderedAccessView {
            shader
                .info
                .constant_buffer(ResourceGroup::Uav, src.register)
                .map(|cb| cb.name.clone())
                .unwrap_or_else(|| {
                    resource_name(&shader.info, ResourceGroup::Uav, src.register, false)
                })
        } else {
            resource_name(&shader.info, ResourceGroup::Texture, src.register, false)
        };
        ctx.push(&elem_name);
        ctx.push("[");
        let addr = src_addr.expect("structured load address");
        translate_operand(ctx, &shader.info, addr, OperandFlags::INT)?;
        ctx.push("]");

        let byte = src_byte_off.imm[0] + 4 * u32::from(src_component);
        let bytes = byte - var_ty.offset;
        if var_ty.name != "$Element" {
            emitf!(ctx, ".{}", leaf_name(&var_ty.full_name, &var_ty.name));
            if matches!(var_ty.class, VarClass::MatrixRows | VarClass::MatrixColumns) {
                emitf!(ctx, "[{}]", bytes / 16);
            }
            if var_ty.class != VarClass::Scalar {
                const SWIZZLE: [&str; 4] = [".x", ".y", ".z", ".w"];
                ctx.push(SWIZZLE[(bytes % 16 / 4) as usize]);
            }
        } else if var_ty.columns > 1 {
            const SWIZZLE: [&str; 4] = [".x", ".y", ".z", ".w"];
            ctx.push(SWIZZLE[(bytes % 16 / 4) as usize]);
        }

        if bitcast {
            ctx.push("))");
        }
    }

    close_assign(ctx, parens);
    Ok(())
}

/// Atomic read-modify-write: resolve the target location per backing kind
/// (TGSM array, typed-UAV buffer element, structured-UAV member), then emit
/// the explicit atomic call with relaxed ordering.
fn translate_atomic(
    ctx: &mut Ctx,
    shader: &ShaderData,
    inst: &Instruction,
) -> Result<(), TranslateError> {
    use Opcode::*;
    let func = match inst.opcode {
        AtomicIAdd | ImmAtomicIAdd => "atomic_fetch_add_explicit",
        AtomicAnd | ImmAtomicAnd => "atomic_fetch_and_explicit",
        AtomicOr | ImmAtomicOr => "atomic_fetch_or_explicit",
        AtomicXor | ImmAtomicXor => "atomic_fetch_xor_explicit",
        AtomicIMin | AtomicUMin | ImmAtomicIMin | ImmAtomicUMin => "atomic_fetch_min_explicit",
        AtomicIMax | AtomicUMax | ImmAtomicIMax | ImmAtomicUMax => "atomic_fetch_max_explicit",
        ImmAtomicExch => "atomic_exchange_explicit",
        AtomicCmpStore | ImmAtomicCmpExch => "atomic_compare_exchange_weak_explicit",
        other => {
            debug_assert!(false, "not an atomic opcode: {other:?}");
            return Ok(());
        }
    };

    let has_previous = inst.opcode.returns_previous_value();
    let has_compare = matches!(inst.opcode, AtomicCmpStore | ImmAtomicCmpExch);
    let base = usize::from(has_previous);
    let previous = has_previous.then(|| &inst.operands[0]);
    let dest = &inst.operands[base];
    let dest_addr = &inst.operands[base + 1];
    let (compare, src) = if has_compare {
        (Some(&inst.operands[base + 2]), &inst.operands[base + 3])
    } else {
        (None, &inst.operands[base + 2])
    };

    let mut data_flags = OperandFlags::UINT;

    ctx.add_indentation();
    let mut parens = 0;
    if let Some(previous) = previous {
        // Every atomic returns a 32-bit integer.
        parens = add_assign_to_dest(ctx, shader, previous, DataType::UInt, 1)?;
    }

    emitf!(ctx, "{func}( &");
    translate_operand(
        ctx,
        &shader.info,
        dest,
        OperandFlags::DESTINATION | OperandFlags::NAME_ONLY,
    )?;

    if dest.kind == OperandKind::ThreadGroupSharedMemory {
        ctx.push("[");
        translate_operand(ctx, &shader.info, dest_addr, OperandFlags::UINT)?;
        ctx.push("]");
    } else {
        let Some(binding) = shader.info.binding(ResourceGroup::Uav, dest.register) else {
            return Err(TranslateError::UnsupportedConstruct(format!(
                "atomic target u{} has no binding",
                dest.register
            )));
        };

        match binding.bind_area {
            BindArea::Buffer => {
                if binding.ty == ResourceType::UavRwTyped {
                    ctx.push("[");
                    translate_operand(ctx, &shader.info, dest_addr, OperandFlags::UINT)?;
                    ctx.push("]");
                } else {
                    // Structured UAV: the address must be a compile-time
                    // constant so the member can be resolved.
                    let var = (dest_addr.kind == OperandKind::Immediate32)
                        .then(|| {
                            lookup_structured_var_atomic(&shader.info, ctx, dest, dest_addr, 0)
                                .map(|l| l.ty.clone())
                        })
                        .flatten();
                    let Some(var_ty) = var else {
                        return Err(TranslateError::UnsupportedConstruct(format!(
                            "atomic on structured UAV u{} with a dynamic member offset",
                            dest.register
                        )));
                    };
                    data_flags = if var_ty.ty == DataType::UInt {
                        OperandFlags::UINT | OperandFlags::BITCAST_TO_UINT
                    } else {
                        OperandFlags::INT | OperandFlags::BITCAST_TO_INT
                    };
                    emitf!(ctx, "[{}]", dest_addr.imm[0] as i32);
                    if var_ty.name != "$Element" {
                        emitf!(ctx, ".{}", leaf_name(&var_ty.full_name, &var_ty.name));
                    }
                }
            }
            // The target cannot express atomics on texture storage.
            BindArea::Texture => {
                return Err(TranslateError::AtomicOnTextureUav {
                    slot: dest.register,
                });
            }
            BindArea::Unresolved => {
                return Err(TranslateError::UnresolvedUavBinding {
                    slot: dest.register,
                });
            }
        }
    }

    ctx.push(", ");
    if let Some(compare) = compare {
        // The comparison value is passed by reference, unlike the plain
        // value argument.
        ctx.push("&");
        translate_operand(ctx, &shader.info, compare, data_flags)?;
        ctx.push(", ");
    }
    translate_operand(ctx, &shader.info, src, data_flags)?;
    ctx.push(", ");
    if compare.is_some() {
        ctx.push("memory_order_relaxed, ");
    }
    ctx.push("memory_order_relaxed)");

    if previous.is_some() {
        close_assign(ctx, parens);
    } else {
        ctx.push(";\n");
    }
    Ok(())
}

/// `if` / conditional break/continue/return: test polarity comes from the
/// instruction's boolean-test field.
fn translate_conditional(
    ctx: &mut Ctx,
    shader: &ShaderData,
    inst: &Instruction,
) -> Result<(), TranslateError> {
    let statement = match inst.opcode {
        Opcode::BreakC => "break",
        Opcode::ContinueC => "continue",
        Opcode::RetC => "return",
        _ => "",
    };

    let test = match inst.test {
        TestBool::Zero => "==0u",
        TestBool::NonZero => "!=0u",
    };
    ctx.push("if((");
    translate_operand(ctx, &shader.info, &inst.operands[0], OperandFlags::UINT)?;
    if inst.opcode != Opcode::If {
        emitf!(ctx, "){test}){{{statement};}}\n");
    } else {
        emitf!(ctx, "){test}){{\n");
    }
    Ok(())
}

pub fn translate_instruction(
    ctx: &mut Ctx,
    shader: &ShaderData,
    inst: &Instruction,
    inst_index: usize,
) -> Result<(), TranslateError> {
    trace!(opcode = ?inst.opcode, index = inst_index, "instruction");
    let info = &shader.info;

    match inst.opcode {
        Opcode::Ftoi | Opcode::Ftou => {
            let dest = &inst.operands[0];
            let dst_count = dest.selected_count();
            let src_count = inst.operands[1].selected_count();
            let ty = if inst.opcode == Opcode::Ftou {
                DataType::UInt
            } else {
                DataType::Int
            };

            ctx.add_indentation();
            let parens = add_assign_to_dest(ctx, shader, dest, ty, src_count)?;
            ctx.push(constructor_for(
                ty,
                if src_count == dst_count { dst_count } else { 4 },
            ));
            ctx.push("(");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::BITCAST_TO_FLOAT)?;
            ctx.push(")");
            if src_count != dst_count {
                add_swizzle_by_count(ctx, dst_count);
            }
            close_assign(ctx, parens);
        }

        Opcode::Mov => {
            ctx.add_indentation();
            add_mov(ctx, shader, &inst.operands[0], &inst.operands[1])?;
        }

        Opcode::Itof | Opcode::Utof => {
            let dest = &inst.operands[0];
            let dst_count = dest.selected_count();
            let src_count = inst.operands[1].selected_count();
            let src_flags = if inst.opcode == Opcode::Utof {
                OperandFlags::BITCAST_TO_UINT
            } else {
                OperandFlags::BITCAST_TO_INT
            };

            ctx.add_indentation();
            let parens = add_assign_to_dest(ctx, shader, dest, DataType::Float, src_count)?;
            ctx.push(constructor_for(DataType::Float, dst_count));
            ctx.push("(");
            translate_operand_with_mask(ctx, info, &inst.operands[1], src_flags, dest.write_mask())?;
            ctx.push(")");
            if src_count != dst_count {
                add_swizzle_by_count(ctx, dst_count);
            }
            close_assign(ctx, parens);
        }

        Opcode::Mad => call_ternary_op(ctx, shader, "*", "+", inst, OperandFlags::empty())?,
        Opcode::IMad => {
            let flags = if operand_data_type(info, &inst.operands[0]) == DataType::UInt {
                OperandFlags::UINT
            } else {
                OperandFlags::INT
            };
            call_ternary_op(ctx, shader, "*", "+", inst, flags)?;
        }
        Opcode::UMad => call_ternary_op(ctx, shader, "*", "+", inst, OperandFlags::UINT)?,

        Opcode::IAdd => {
            let ty = if operand_data_type(info, &inst.operands[0]) == DataType::UInt {
                DataType::UInt
            } else {
                DataType::Int
            };
            call_binary_op(ctx, shader, "+", inst, 0, 1, 2, ty)?;
        }
        Opcode::Add => call_binary_op(ctx, shader, "+", inst, 0, 1, 2, DataType::Float)?,
        Opcode::Or => call_binary_op(ctx, shader, "|", inst, 0, 1, 2, DataType::UInt)?,
        Opcode::And => call_binary_op(ctx, shader, "&", inst, 0, 1, 2, DataType::UInt)?,
        Opcode::Xor => call_binary_op(ctx, shader, "^", inst, 0, 1, 2, DataType::UInt)?,
        Opcode::Mul => call_binary_op(ctx, shader, "*", inst, 0, 1, 2, DataType::Float)?,
        Opcode::Div => call_binary_op(ctx, shader, "/", inst, 0, 1, 2, DataType::Float)?,

        Opcode::IMul => {
            let ty = if operand_data_type(info, &inst.operands[1]) == DataType::UInt {
                DataType::UInt
            } else {
                DataType::Int
            };
            // The high-half destination is not expressible; the decoder
            // only produces the null-high form.
            debug_assert_eq!(inst.operands[0].kind, OperandKind::Null);
            call_binary_op(ctx, shader, "*", inst, 1, 2, 3, ty)?;
        }

        Opcode::UDiv => {
            // Quotient and remainder destinations.
            call_binary_op(ctx, shader, "/", inst, 0, 2, 3, DataType::UInt)?;
            call_binary_op(ctx, shader, "%", inst, 1, 2, 3, DataType::UInt)?;
        }

        Opcode::Sincos => {
            let dest_sin = &inst.operands[0];
            let dest_cos = &inst.operands[1];
            // When sin() overwrites its own source, cos() must run first.
            if dest_sin.kind == inst.operands[2].kind
                && dest_sin.register == inst.operands[2].register
            {
                if dest_cos.kind != OperandKind::Null {
                    call_helper1(ctx, shader, "cos", inst, 1, 2, true)?;
                }
                if dest_sin.kind != OperandKind::Null {
                    call_helper1(ctx, shader, "sin", inst, 0, 2, true)?;
                }
            } else {
                if dest_sin.kind != OperandKind::Null {
                    call_helper1(ctx, shader, "sin", inst, 0, 2, true)?;
                }
                if dest_cos.kind != OperandKind::Null {
                    call_helper1(ctx, shader, "cos", inst, 1, 2, true)?;
                }
            }
        }

        Opcode::Dp2 | Opcode::Dp3 => {
            let mask = if inst.opcode == Opcode::Dp2 {
                WriteMask::XY
            } else {
                WriteMask::XYZ
            };
            let dest = &inst.operands[0];
            let dest_type = operand_data_type(info, dest);
            let flags = OperandFlags::BITCAST_TO_FLOAT | OperandFlags::for_type(dest_type);

            ctx.add_indentation();
            let parens = add_assign_to_dest(ctx, shader, dest, DataType::Float, 1)?;
            ctx.push("dot(");
            translate_operand_with_mask(ctx, info, &inst.operands[1], flags, mask)?;
            ctx.push(", ");
            translate_operand_with_mask(ctx, info, &inst.operands[2], flags, mask)?;
            ctx.push(")");
            close_assign(ctx, parens);
        }
        Opcode::Dp4 => call_helper2(ctx, shader, "dot", inst, 0, 1, 2, false)?,

        Opcode::Ne => add_comparison(ctx, shader, inst, CmpOp::Ne, OperandFlags::empty())?,
        Opcode::INe => add_comparison(ctx, shader, inst, CmpOp::Ne, OperandFlags::INT)?,
        Opcode::Eq => add_comparison(ctx, shader, inst, CmpOp::Eq, OperandFlags::empty())?,
        Opcode::IEq => add_comparison(ctx, shader, inst, CmpOp::Eq, OperandFlags::INT)?,
        Opcode::Ge => add_comparison(ctx, shader, inst, CmpOp::Ge, OperandFlags::empty())?,
        Opcode::IGe => add_comparison(ctx, shader, inst, CmpOp::Ge, OperandFlags::INT)?,
        Opcode::UGe => add_comparison(ctx, shader, inst, CmpOp::Ge, OperandFlags::UINT)?,
        Opcode::Lt => add_comparison(ctx, shader, inst, CmpOp::Lt, OperandFlags::empty())?,
        Opcode::ILt => add_comparison(ctx, shader, inst, CmpOp::Lt, OperandFlags::INT)?,
        Opcode::ULt => add_comparison(ctx, shader, inst, CmpOp::Lt, OperandFlags::UINT)?,

        Opcode::Movc => {
            add_movc(
                ctx,
                shader,
                &inst.operands[0],
                &inst.operands[1],
                &inst.operands[2],
                &inst.operands[3],
            )?;
        }
        Opcode::Swapc => {
            add_movc(
                ctx,
                shader,
                &inst.operands[0],
                &inst.operands[2],
                &inst.operands[4],
                &inst.operands[3],
            )?;
            add_movc(
                ctx,
                shader,
                &inst.operands[1],
                &inst.operands[2],
                &inst.operands[3],
                &inst.operands[4],
            )?;
        }

        Opcode::Log => call_helper1(ctx, shader, "log2", inst, 0, 1, true)?,
        Opcode::Rsq => call_helper1(ctx, shader, "rsqrt", inst, 0, 1, true)?,
        Opcode::Exp => call_helper1(ctx, shader, "exp2", inst, 0, 1, true)?,
        Opcode::Sqrt => call_helper1(ctx, shader, "sqrt", inst, 0, 1, true)?,
        Opcode::RoundPi => call_helper1(ctx, shader, "ceil", inst, 0, 1, true)?,
        Opcode::RoundNi => call_helper1(ctx, shader, "floor", inst, 0, 1, true)?,
        Opcode::RoundZ => call_helper1(ctx, shader, "trunc", inst, 0, 1, true)?,
        Opcode::RoundNe => call_helper1(ctx, shader, "rint", inst, 0, 1, true)?,
        Opcode::Frc => call_helper1(ctx, shader, "fract", inst, 0, 1, true)?,
        Opcode::DerivRtx | Opcode::DerivRtxCoarse | Opcode::DerivRtxFine => {
            call_helper1(ctx, shader, "dfdx", inst, 0, 1, true)?;
        }
        Opcode::DerivRty | Opcode::DerivRtyCoarse | Opcode::DerivRtyFine => {
            call_helper1(ctx, shader, "dfdy", inst, 0, 1, true)?;
        }

        Opcode::IMax => call_helper2_typed(ctx, shader, "max", inst, 0, 1, 2, true, DataType::Int)?,
        Opcode::IMin => call_helper2_typed(ctx, shader, "min", inst, 0, 1, 2, true, DataType::Int)?,
        Opcode::Max | Opcode::UMax => call_helper2(ctx, shader, "max", inst, 0, 1, 2, true)?,
        Opcode::Min | Opcode::UMin => call_helper2(ctx, shader, "min", inst, 0, 1, 2, true)?,
        Opcode::Lrp => call_helper3(ctx, shader, "mix", inst, 0, 2, 3, 1, true)?,

        Opcode::Gather4 | Opcode::Gather4C => {
            let resource = &inst.operands[2];
            let sampler = &inst.operands[3];
            let compare = inst.opcode == Opcode::Gather4C;
            let Some(&dim) = ctx.regs.resource_dims.get(&resource.register) else {
                return Err(TranslateError::UnsupportedInstruction {
                    index: inst_index,
                    opcode: inst.opcode,
                });
            };
            ctx.texture_samplers
                .insert((resource.register, sampler.register, compare));

            ctx.add_indentation();
            let parens = add_assign_to_dest(
                ctx,
                shader,
                &inst.operands[0],
                DataType::Float,
                resource.selected_count(),
            )?;
            ctx.push("(");
            let tex = resource_name(info, ResourceGroup::Texture, resource.register, false);
            ctx.push(&tex);
            let smp = texture_sampler_name(info, resource.register, sampler.register, compare);
            if compare {
                emitf!(ctx, ".gather_compare({smp}, ");
            } else {
                emitf!(ctx, ".gather({smp}, ");
            }
            translate_tex_coord(ctx, shader, dim, &inst.operands[1])?;
            if compare {
                ctx.push(", ");
                translate_operand(ctx, info, &inst.operands[4], OperandFlags::empty())?;
            }
            ctx.push(")");
            resource_swizzle_with_mask(ctx, resource, WriteMask::XYZW);
            ctx.push(")");
            add_swizzle_by_count(ctx, inst.operands[0].selected_count());
            close_assign(ctx, parens);
        }

        Opcode::Gather4Po | Opcode::Gather4PoC => {
            // Offset-from-operand gather: dest, coords, offset, tex,
            // sampler, [reference].
            let resource = &inst.operands[3];
            let sampler = &inst.operands[4];
            let compare = inst.opcode == Opcode::Gather4PoC;
            ctx.texture_samplers
                .insert((resource.register, sampler.register, compare));

            ctx.add_indentation();
            let parens = add_assign_to_dest(
                ctx,
                shader,
                &inst.operands[0],
                DataType::Float,
                inst.operands[2].selected_count(),
            )?;
            ctx.push("(");
            let tex = resource_name(info, ResourceGroup::Texture, resource.register, false);
            ctx.push(&tex);
            let smp = texture_sampler_name(info, resource.register, sampler.register, compare);
            if compare {
                emitf!(ctx, ".gather_compare({smp}, ");
            } else {
                emitf!(ctx, ".gather({smp}, ");
            }
            // Texture coordinates take at most two components here.
            translate_operand_with_mask(
                ctx,
                info,
                &inst.operands[1],
                OperandFlags::empty(),
                WriteMask::XY,
            )?;
            if compare {
                ctx.push(", ");
                translate_operand(ctx, info, &inst.operands[5], OperandFlags::empty())?;
            }
            ctx.push(", as_type<int2>(");
            translate_operand_with_mask(
                ctx,
                info,
                &inst.operands[2],
                OperandFlags::empty(),
                WriteMask::XY,
            )?;
            ctx.push("))");
            resource_swizzle_with_mask(ctx, resource, WriteMask::XYZW);
            ctx.push(")");
            add_swizzle_by_count(ctx, inst.operands[0].selected_count());
            close_assign(ctx, parens);
        }

        Opcode::Sample => translate_texture_sample(ctx, shader, inst, inst_index, 0)?,
        Opcode::SampleL => {
            translate_texture_sample(ctx, shader, inst, inst_index, TEX_FLAG_LOD)?;
        }
        Opcode::SampleC => {
            translate_texture_sample(ctx, shader, inst, inst_index, TEX_FLAG_COMPARE)?;
        }
        Opcode::SampleCLz => translate_texture_sample(
            ctx,
            shader,
            inst,
            inst_index,
            TEX_FLAG_COMPARE | TEX_FLAG_FIRST_LOD,
        )?,
        Opcode::SampleD => {
            translate_texture_sample(ctx, shader, inst, inst_index, TEX_FLAG_GRAD)?;
        }
        Opcode::SampleB => {
            translate_texture_sample(ctx, shader, inst, inst_index, TEX_FLAG_BIAS)?;
        }

        Opcode::Ret => {
            if ctx.have_post_shader && !ctx.buf(Sink::PostShader).is_empty() {
                let post = ctx.buf(Sink::PostShader).to_owned();
                ctx.push(&post);
            }
            ctx.add_indentation();
            if ctx.buf(Sink::DeclaredOutputs).is_empty() {
                ctx.push("return;\n");
            } else {
                ctx.push("return output;\n");
            }
        }

        Opcode::CountBits => {
            ctx.add_indentation();
            translate_operand(
                ctx,
                info,
                &inst.operands[0],
                OperandFlags::INT | OperandFlags::DESTINATION,
            )?;
            ctx.push(" = popcount(");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::INT)?;
            ctx.push(");\n");
        }
        Opcode::FirstBitHi => {
            ctx.add_indentation();
            translate_operand(
                ctx,
                info,
                &inst.operands[0],
                OperandFlags::UINT | OperandFlags::DESTINATION,
            )?;
            ctx.push(" = (32 - clz(");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::UINT)?;
            ctx.push("));\n");
        }
        Opcode::FirstBitLo => {
            ctx.add_indentation();
            translate_operand(
                ctx,
                info,
                &inst.operands[0],
                OperandFlags::UINT | OperandFlags::DESTINATION,
            )?;
            ctx.push(" = (1 + ctz(");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::UINT)?;
            ctx.push("));\n");
        }
        Opcode::FirstBitShi => {
            ctx.add_indentation();
            translate_operand(
                ctx,
                info,
                &inst.operands[0],
                OperandFlags::INT | OperandFlags::DESTINATION,
            )?;
            ctx.push(" = (32 - clz(");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::INT)?;
            ctx.push(" > 0 ? ");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::INT)?;
            ctx.push(" : 0xFFFFFFFF ^ ");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::INT)?;
            ctx.push("));\n");
        }

        Opcode::Bfi => {
            // No bitfield-insert intrinsic exists in the target language;
            // expand to mask-and-shift in a nested scope.
            let num_components = u32::from(inst.operands[0].num_components);
            let ctor = constructor_for(DataType::UInt, num_components);

            ctx.add_indentation();
            translate_operand(ctx, info, &inst.operands[0], OperandFlags::DESTINATION)?;
            ctx.push(" = 0;\n");
            ctx.add_indentation();
            ctx.push("{\n");

            ctx.add_indentation();
            emitf!(ctx, "  {ctor} mask = ~({ctor}(0xffffffff) << ");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::UINT)?;
            ctx.push(") << ");
            translate_operand(ctx, info, &inst.operands[2], OperandFlags::UINT)?;
            ctx.push(";\n");

            ctx.add_indentation();
            ctx.push("  mask = ~mask;\n");

            ctx.add_indentation();
            ctx.push("  ");
            translate_operand(ctx, info, &inst.operands[0], OperandFlags::DESTINATION)?;
            let dest_ctor = constructor_for(inst.operands[0].data_type[0], num_components);
            emitf!(ctx, " = ( as_type<{dest_ctor}>( (");
            translate_operand(ctx, info, &inst.operands[4], OperandFlags::UINT)?;
            ctx.push(" & mask) | (");
            translate_operand(ctx, info, &inst.operands[3], OperandFlags::UINT)?;
            ctx.push(" << ");
            translate_operand(ctx, info, &inst.operands[2], OperandFlags::UINT)?;
            ctx.push(")) )");
            crate::operand::translate_swizzle_with_mask(
                ctx,
                &inst.operands[0],
                inst.operands[0].write_mask(),
            );
            ctx.push(";\n");

            ctx.add_indentation();
            ctx.push("}\n");
        }

        Opcode::Ubfe | Opcode::Ibfe => {
            // Same story as BFI: explicit shift-and-mask expansion.
            let num_components = u32::from(inst.operands[0].num_components);
            let ctor = constructor_for(DataType::UInt, num_components);

            ctx.add_indentation();
            translate_operand(ctx, info, &inst.operands[0], OperandFlags::DESTINATION)?;
            ctx.push(" = 0;\n");
            ctx.add_indentation();
            ctx.push("{\n");

            ctx.add_indentation();
            emitf!(ctx, "  {ctor} mask = ~({ctor}(0xffffffff) << ");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::UINT)?;
            ctx.push(");\n");

            ctx.add_indentation();
            ctx.push("  ");
            translate_operand(ctx, info, &inst.operands[0], OperandFlags::DESTINATION)?;
            let dest_ctor = constructor_for(inst.operands[0].data_type[0], num_components);
            emitf!(ctx, " = ( as_type<{dest_ctor}>((");
            translate_operand(ctx, info, &inst.operands[3], OperandFlags::UINT)?;
            ctx.push(" >> (");
            translate_operand(ctx, info, &inst.operands[2], OperandFlags::UINT)?;
            ctx.push(")) & mask) )");
            crate::operand::translate_swizzle_with_mask(
                ctx,
                &inst.operands[0],
                inst.operands[0].write_mask(),
            );
            ctx.push(";\n");

            ctx.add_indentation();
            ctx.push("}\n");
        }

        Opcode::Rcp => {
            let dest_count = inst.operands[0].selected_count();
            ctx.add_indentation();
            translate_operand(ctx, info, &inst.operands[0], OperandFlags::DESTINATION)?;
            ctx.push(" = (float4(1.0) / float4(");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::empty())?;
            ctx.push("))");
            add_swizzle_by_count(ctx, dest_count);
            ctx.push(";\n");
        }

        Opcode::F32ToF16 => {
            // No packing intrinsic: narrow per component and widen the bit
            // pattern back into the low half of the word.
            let dest_count = inst.operands[0].selected_count();
            let src_count = inst.operands[1].selected_count();
            const SWIZZLE: [&str; 4] = [".x", ".y", ".z", ".w"];
            for element in 0..dest_count as usize {
                ctx.add_indentation();
                translate_operand(ctx, info, &inst.operands[0], OperandFlags::DESTINATION)?;
                if dest_count > 1 {
                    ctx.push(SWIZZLE[element]);
                }
                ctx.push(" = ");
                let dest_type = operand_data_type(info, &inst.operands[0]);
                if dest_type == DataType::Float {
                    ctx.push("as_type<float>");
                }
                ctx.push("( (uint( as_type<ushort>( (half)");
                translate_operand(ctx, info, &inst.operands[1], OperandFlags::empty())?;
                if src_count > 1 {
                    ctx.push(SWIZZLE[element]);
                }
                ctx.push(" ) ) ) );\n");
            }
        }

        Opcode::F16ToF32 => {
            let dest_count = inst.operands[0].selected_count();
            let src_count = inst.operands[1].selected_count();
            const SWIZZLE: [&str; 4] = [".x", ".y", ".z", ".w"];
            for element in 0..dest_count as usize {
                ctx.add_indentation();
                translate_operand(
                    ctx,
                    info,
                    &inst.operands[0],
                    OperandFlags::DESTINATION | OperandFlags::UINT,
                )?;
                if dest_count > 1 {
                    ctx.push(SWIZZLE[element]);
                }
                ctx.push(" = as_type<half>((ushort)");
                translate_operand(ctx, info, &inst.operands[1], OperandFlags::UINT)?;
                if src_count > 1 {
                    ctx.push(SWIZZLE[element]);
                }
                ctx.push(");\n");
            }
        }

        Opcode::INeg => {
            let dest = &inst.operands[0];
            let dst_count = dest.selected_count();
            let src_count = inst.operands[1].selected_count();
            ctx.add_indentation();
            let parens = add_assign_to_dest(ctx, shader, dest, DataType::Int, src_count)?;
            ctx.push("-(");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::INT)?;
            if src_count > dst_count {
                add_swizzle_by_count(ctx, dst_count);
            }
            ctx.push(")");
            close_assign(ctx, parens);
        }

        Opcode::Not => {
            ctx.add_indentation();
            let src_count = inst.operands[1].selected_count();
            let parens =
                add_assign_to_dest(ctx, shader, &inst.operands[0], DataType::Int, src_count)?;
            ctx.push("~");
            translate_operand_with_mask(
                ctx,
                info,
                &inst.operands[1],
                OperandFlags::INT,
                inst.operands[0].write_mask(),
            )?;
            close_assign(ctx, parens);
        }

        Opcode::Dp2Add => {
            ctx.add_indentation();
            translate_operand(ctx, info, &inst.operands[0], OperandFlags::DESTINATION)?;
            ctx.push(" = dot(float2(");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::empty())?;
            ctx.push("), float2(");
            translate_operand(ctx, info, &inst.operands[2], OperandFlags::empty())?;
            ctx.push(")) + ");
            translate_operand(ctx, info, &inst.operands[3], OperandFlags::empty())?;
            ctx.push(";\n");
        }

        Opcode::Pow => {
            // The source pow takes |x|.
            ctx.add_indentation();
            translate_operand(ctx, info, &inst.operands[0], OperandFlags::DESTINATION)?;
            ctx.push(" = pow(abs(");
            translate_operand(ctx, info, &inst.operands[1], OperandFlags::empty())?;
            ctx.push("), ");
            translate_operand(ctx, info, &inst.operands[2], OperandFlags::empty())?;
            ctx.push(");\n");
        }

        Opcode::UShr => call_binary_op(ctx, shader, ">>", inst, 0, 1, 2, DataType::UInt)?,
        Opcode::IShl => {
            let ty = if operand_data_type(info, &inst.operands[0]) == DataType::UInt {
                DataType::UInt
            } else {
                DataType::Int
            };
            call_binary_op(ctx, shader, "<<", inst, 0, 1, 2, ty)?;
        }
        Opcode::IShr => {
            let ty = if operand_data_type(info, &inst.operands[0]) == DataType::UInt {
                DataType::UInt
            } else {
                DataType::Int
            };
            call_binary_op(ctx, shader, ">>", inst, 0, 1, 2, ty)?;
        }

        Opcode::Ld | Opcode::LdMs => translate_texel_fetch(ctx, shader, inst, inst_index)?,

        Opcode::Discard => {
            ctx.add_indentation();
            match inst.test {
                TestBool::Zero => {
                    ctx.push("if(all(");
                    translate_operand(ctx, info, &inst.operands[0], OperandFlags::INT)?;
                    ctx.push("==0)){discard_fragment();}\n");
                }
                TestBool::NonZero => {
                    ctx.push("if(any(");
                    translate_operand(ctx, info, &inst.operands[0], OperandFlags::INT)?;
                    ctx.push("!=0)){discard_fragment();}\n");
                }
            }
        }

        Opcode::Lod => {
            // LOD returns (clamped, unclamped, 0, 0).
            let resource = &inst.operands[2];
            let sampler = &inst.operands[3];
            let Some(&dim) = ctx.regs.resource_dims.get(&resource.register) else {
                return Err(TranslateError::UnsupportedInstruction {
                    index: inst_index,
                    opcode: inst.opcode,
                });
            };
            ctx.texture_samplers
                .insert((resource.register, sampler.register, false));
            let tex = resource_name(info, ResourceGroup::Texture, resource.register, false);
            let smp = texture_sampler_name(info, resource.register, sampler.register, false);

            ctx.add_indentation();
            let parens = add_assign_to_dest(ctx, shader, &inst.operands[0], DataType::Float, 4)?;
            emitf!(ctx, "float4({tex}.calculate_clamped_lod({smp}, ");
            translate_tex_coord(ctx, shader, dim, &inst.operands[1])?;
            emitf!(ctx, "), {tex}.calculate_unclamped_lod({smp}, ");
            translate_tex_coord(ctx, shader, dim, &inst.operands[1])?;
            ctx.push("), 0.0, 0.0)");
            resource_swizzle_with_mask(ctx, resource, inst.operands[0].write_mask());
            close_assign(ctx, parens);
        }

        Opcode::ResInfo => {
            let dest_count = inst.operands[0].selected_count();
            for dest_component in 0..dest_count as u8 {
                let element = match inst.operands[2].sel {
                    ComponentSelect::Swizzle(s) => s.0[dest_component as usize],
                    _ => dest_component,
                };
                resinfo_element(ctx, shader, inst, element, dest_component)?;
            }
        }

        Opcode::LdStructured | Opcode::LdRaw => translate_storage_load(ctx, shader, inst)?,
        Opcode::StoreStructured | Opcode::StoreRaw => translate_storage_store(ctx, shader, inst)?,

        Opcode::StoreUavTyped => {
            let dest = &inst.operands[0];
            let Some(binding) = shader.info.binding(ResourceGroup::Uav, dest.register) else {
                return Err(TranslateError::UnsupportedConstruct(format!(
                    "typed store to u{} with no binding",
                    dest.register
                )));
            };
            let value_flags = resource_return_flags(binding.return_type);
            let area = binding.bind_area;
            let dimension = binding.dimension;

            ctx.add_indentation();
            match area {
                BindArea::Buffer => {
                    translate_operand(ctx, info, dest, OperandFlags::NAME_ONLY)?;
                    ctx.push("[");
                    translate_operand_with_mask(
                        ctx,
                        info,
                        &inst.operands[1],
                        OperandFlags::INT,
                        WriteMask::X,
                    )?;
                    ctx.push("]=");
                    translate_operand_with_mask(
                        ctx,
                        info,
                        &inst.operands[2],
                        value_flags,
                        WriteMask::X,
                    )?;
                    ctx.push(";\n");
                }
                BindArea::Texture => {
                    translate_operand(ctx, info, dest, OperandFlags::NAME_ONLY)?;
                    ctx.push(".write(");
                    translate_operand_with_mask(
                        ctx,
                        info,
                        &inst.operands[2],
                        value_flags,
                        WriteMask::XYZW,
                    )?;
                    let addr = &inst.operands[1];
                    use ResourceDimension::*;
                    match dimension {
                        Some(Texture1D) => {
                            ctx.push(", as_type<uint>(");
                            translate_operand(ctx, info, addr, OperandFlags::NAME_ONLY)?;
                            ctx.push(")");
                        }
                        Some(Texture2D) => {
                            ctx.push(", as_type<uint2>(");
                            translate_operand(ctx, info, addr, OperandFlags::NAME_ONLY)?;
                            ctx.push(".xy)");
                        }
                        Some(Texture1DArray) => {
                            ctx.push(", as_type<uint>(");
                            translate_operand(ctx, info, addr, OperandFlags::NAME_ONLY)?;
                            ctx.push(".x), as_type<uint>(");
                            translate_operand(ctx, info, addr, OperandFlags::NAME_ONLY)?;
                            ctx.push(".y)");
                        }
                        Some(Texture2DArray) | Some(TextureCube) => {
                            ctx.push(", as_type<uint2>(");
                            translate_operand(ctx, info, addr, OperandFlags::NAME_ONLY)?;
                            ctx.push(".xy), as_type<uint>(");
                            translate_operand(ctx, info, addr, OperandFlags::NAME_ONLY)?;
                            ctx.push(".z)");
                        }
                        Some(Texture3D) => {
                            ctx.push(", as_type<uint3>(");
                            translate_operand(ctx, info, addr, OperandFlags::NAME_ONLY)?;
                            ctx.push(".xyz)");
                        }
                        Some(TextureCubeArray) => {
                            ctx.push(", as_type<uint2>(");
                            translate_operand(ctx, info, addr, OperandFlags::NAME_ONLY)?;
                            ctx.push(".xy), as_type<uint>(");
                            translate_operand(ctx, info, addr, OperandFlags::NAME_ONLY)?;
                            ctx.push(".z), as_type<uint>(");
                            translate_operand(ctx, info, addr, OperandFlags::NAME_ONLY)?;
                            ctx.push(".w)");
                        }
                        _ => {
                            return Err(TranslateError::UnsupportedConstruct(format!(
                                "typed store to a {dimension:?} UAV"
                            )));
                        }
                    }
                    ctx.push(");\n");
                }
                BindArea::Unresolved => {
                    return Err(TranslateError::UnresolvedUavBinding {
                        slot: dest.register,
                    });
                }
            }
        }

        Opcode::AtomicAnd
        | Opcode::AtomicCmpStore
        | Opcode::AtomicIAdd
        | Opcode::AtomicIMax
        | Opcode::AtomicIMin
        | Opcode::AtomicOr
        | Opcode::AtomicUMax
        | Opcode::AtomicUMin
        | Opcode::AtomicXor
        | Opcode::ImmAtomicAnd
        | Opcode::ImmAtomicCmpExch
        | Opcode::ImmAtomicExch
        | Opcode::ImmAtomicIAdd
        | Opcode::ImmAtomicIMax
        | Opcode::ImmAtomicIMin
        | Opcode::ImmAtomicOr
        | Opcode::ImmAtomicUMax
        | Opcode::ImmAtomicUMin
        | Opcode::ImmAtomicXor => translate_atomic(ctx, shader, inst)?,

        // Control flow.
        Opcode::If => {
            ctx.add_indentation();
            translate_conditional(ctx, shader, inst)?;
            ctx.indent += 1;
        }
        Opcode::Else => {
            ctx.indent -= 1;
            ctx.add_indentation();
            ctx.push("} else {\n");
            ctx.indent += 1;
        }
        Opcode::EndIf => {
            ctx.indent -= 1;
            ctx.add_indentation();
            ctx.push("}\n");
        }
        Opcode::Loop => {
            ctx.add_indentation();
            if inst.operands.len() == 2 {
                // Legacy counted loop: iteration count in .x, initial value
                // in .y, step in .z, plus an explicit zero-based shadow
                // counter.
                debug_assert_eq!(inst.operands[0].kind, OperandKind::SpecialLoopCounter);
                ctx.push("for(LoopCounter = ");
                translate_operand(ctx, info, &inst.operands[1], OperandFlags::empty())?;
                ctx.push(".y, ZeroBasedCounter = 0;ZeroBasedCounter < ");
                translate_operand(ctx, info, &inst.operands[1], OperandFlags::empty())?;
                ctx.push(".x;LoopCounter += ");
                translate_operand(ctx, info, &inst.operands[1], OperandFlags::empty())?;
                ctx.push(".z, ZeroBasedCounter++){\n");
            } else {
                ctx.push("while(true){\n");
            }
            ctx.indent += 1;
        }
        Opcode::EndLoop => {
            ctx.indent -= 1;
            ctx.add_indentation();
            ctx.push("}\n");
        }
        Opcode::Rep => {
            ctx.add_indentation();
            ctx.push("RepCounter = ");
            translate_operand_with_mask(ctx, info, &inst.operands[0], OperandFlags::INT, WriteMask::X)?;
            ctx.push(";\n");
            ctx.add_indentation();
            ctx.push("while(RepCounter!=0){\n");
            ctx.indent += 1;
        }
        Opcode::EndRep => {
            ctx.add_indentation();
            ctx.push("RepCounter--;\n");
            ctx.indent -= 1;
            ctx.add_indentation();
            ctx.push("}\n");
        }
        Opcode::Break => {
            ctx.add_indentation();
            ctx.push("break;\n");
        }
        Opcode::Continue => {
            ctx.add_indentation();
            ctx.push("continue;\n");
        }
        Opcode::BreakC | Opcode::ContinueC | Opcode::RetC => {
            ctx.add_indentation();
            translate_conditional(ctx, shader, inst)?;
        }
        Opcode::Switch => {
            ctx.add_indentation();
            ctx.push("switch(int(");
            translate_operand(ctx, info, &inst.operands[0], OperandFlags::INT)?;
            ctx.push(")){\n");
            ctx.indent += 2;
        }
        Opcode::Case => {
            ctx.indent -= 1;
            ctx.add_indentation();
            ctx.push("case ");
            translate_operand(ctx, info, &inst.operands[0], OperandFlags::INT)?;
            ctx.push(":\n");
            ctx.indent += 1;
        }
        Opcode::Default => {
            ctx.indent -= 1;
            ctx.add_indentation();
            ctx.push("default:\n");
            ctx.indent += 1;
        }
        Opcode::EndSwitch => {
            ctx.indent -= 2;
            ctx.add_indentation();
            ctx.push("}\n");
        }

        Opcode::Sync => {
            // The flag literals cannot be OR-ed in the target language;
            // pick the combined literal.
            let tg = inst.sync_flags.contains(SyncFlags::THREAD_GROUP_SHARED_MEMORY);
            let device = inst
                .sync_flags
                .intersects(SyncFlags::UAV_MEMORY_GROUP | SyncFlags::UAV_MEMORY_GLOBAL);
            let literal = match (tg, device) {
                (false, false) => "mem_flags::mem_none",
                (true, false) => "mem_flags::mem_threadgroup",
                (false, true) => "mem_flags::mem_device",
                (true, true) => "mem_flags::mem_device_and_threadgroup",
            };
            ctx.add_indentation();
            emitf!(ctx, "threadgroup_barrier({literal});\n");
        }

        Opcode::Nop => {}

        // Geometry streams, pull-model evaluation, stream compaction
        // counters and the double-precision family have no target
        // equivalent; a validly-staged input never reaches them.
        Opcode::Cut
        | Opcode::Emit
        | Opcode::EmitThenCut
        | Opcode::CutStream
        | Opcode::EmitStream
        | Opcode::EmitThenCutStream
        | Opcode::EvalCentroid
        | Opcode::EvalSampleIndex
        | Opcode::EvalSnapped
        | Opcode::ImmAtomicAlloc
        | Opcode::ImmAtomicConsume
        | Opcode::LdUavTyped
        | Opcode::Bfrev
        | Opcode::Label
        | Opcode::InterfaceCall
        | Opcode::BufInfo
        | Opcode::SampleInfo
        | Opcode::SamplePos
        | Opcode::UAddc
        | Opcode::USubb
        | Opcode::UMul
        | Opcode::DAdd
        | Opcode::DEq
        | Opcode::DGe
        | Opcode::DLt
        | Opcode::DMax
        | Opcode::DMin
        | Opcode::DMov
        | Opcode::DMovc
        | Opcode::DMul
        | Opcode::DNe
        | Opcode::DtoF
        | Opcode::FtoD => {
            return Err(TranslateError::UnsupportedInstruction {
                index: inst_index,
                opcode: inst.opcode,
            });
        }
    }

    // Saturate re-reads the destination and clamps; the source guarantees
    // this only ever appears on float-producing opcodes or MOV.
    if inst.saturate {
        let dest = &inst.operands[0];
        let dest_count = dest.selected_count();
        ctx.add_indentation();
        let parens = add_assign_to_dest(ctx, shader, dest, DataType::Float, dest_count)?;
        ctx.push("clamp(");
        translate_operand(ctx, info, dest, OperandFlags::BITCAST_TO_FLOAT)?;
        ctx.push(", 0.0, 1.0)");
        close_assign(ctx, parens);
    }

    Ok(())
}
