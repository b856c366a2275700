//! Declaration translator: consumes each IR declaration and emits the
//! corresponding target-language declaration, accumulating entry-point
//! parameters, wrapper-struct fields and prologue statements in the
//! emission context's buffers along the way.

use tracing::trace;

use crucible_ir::decl::{CbAccessPattern, Decl, Interpolation, ResourceDimension};
use crucible_ir::reflect::{BindArea, ConstantBuffer, ResourceGroup, ShaderVarType, VarClass};
use crucible_ir::{
    DataType, GlobalFlags, MinPrecision, Opcode, Operand, OperandKind, ShaderData, ShaderStage,
    SpecialName,
};

use crate::atomics::AtomicUsageList;
use crate::binding_model::{gmem_input_elements, gmem_input_slot, GMEM_FLOAT_START_SLOT};
use crate::context::{emitf, Ctx, Sink};
use crate::names::{
    atomic_var_key, declared_input_name, declared_output_name, interpolation_qualifier,
    resource_name, texture_type_name,
};
use crate::operand::{translate_operand, OperandFlags};
use crate::{CompileFlags, TranslateError};

/// Storage qualifier of a declared stage input.
#[derive(Clone, Copy, PartialEq, Eq)]
enum InputQualifier {
    /// Vertex attribute, fed from the vertex descriptor.
    Attribute,
    /// Inter-stage varying.
    User(Interpolation),
}

pub fn translate_declaration(
    ctx: &mut Ctx,
    shader: &mut ShaderData,
    decl: &Decl,
    atomics: &AtomicUsageList,
) -> Result<(), TranslateError> {
    trace!(?decl, "declaration");
    match decl {
        Decl::GlobalFlags(flags) => {
            if flags.contains(GlobalFlags::FORCE_EARLY_DEPTH_STENCIL) {
                ctx.needs_early_depth_test = true;
            }
        }

        Decl::InputSgv { operand } | Decl::InputPsSgv { operand } => {
            translate_input_sgv(ctx, shader, operand)?;
        }

        Decl::InputPsSiv { operand } => {
            if operand.special_name == SpecialName::Position {
                add_builtin_input(ctx, shader, operand, "position", "float4");
            }
        }

        Decl::InputSiv { .. } => {}

        Decl::Input { operand } => {
            match operand.kind {
                OperandKind::InputDomainPoint
                | OperandKind::OutputControlPointId
                | OperandKind::InputCoverageMask
                | OperandKind::InputForkInstanceId => return Ok(()),
                OperandKind::InputThreadId => {
                    ctx.with_sink(Sink::ParamDecls, |ctx| {
                        ctx.push("\tuint3 vThreadID [[ thread_position_in_grid ]],\n")
                    });
                    return Ok(());
                }
                OperandKind::InputThreadIdInGroup => {
                    ctx.with_sink(Sink::ParamDecls, |ctx| {
                        ctx.push("\tuint3 vThreadIDInGroup [[ thread_position_in_threadgroup ]],\n")
                    });
                    return Ok(());
                }
                OperandKind::InputThreadGroupId => {
                    ctx.with_sink(Sink::ParamDecls, |ctx| {
                        ctx.push("\tuint3 vThreadGroupID [[ threadgroup_position_in_grid ]],\n")
                    });
                    return Ok(());
                }
                OperandKind::InputThreadIdInGroupFlattened => {
                    ctx.with_sink(Sink::ParamDecls, |ctx| {
                        ctx.push("\tuint vThreadIDInGroupFlattened [[ thread_index_in_threadgroup ]],\n")
                    });
                    return Ok(());
                }
                _ => {}
            }
            // Members of an indexed range are declared through their parent.
            if ctx.regs.indexed_input.get(&operand.register).copied().unwrap_or(0) == -1 {
                return Ok(());
            }
            declare_input(
                ctx,
                shader,
                operand,
                InputQualifier::Attribute,
                operand.min_precision,
                4,
            );
        }

        Decl::InputPs {
            operand,
            interpolation,
        } => {
            declare_input(
                ctx,
                shader,
                operand,
                InputQualifier::User(*interpolation),
                operand.min_precision,
                4,
            );
        }

        Decl::OutputSiv { operand } => match operand.special_name {
            SpecialName::Position => {
                add_builtin_output(ctx, shader, operand, 0, "position");
            }
            SpecialName::ClipDistance => {
                add_builtin_output(ctx, shader, operand, 0, "clip_distance");
            }
            SpecialName::VertexId | SpecialName::InstanceId | SpecialName::IsFrontFace => {
                debug_assert!(false, "{:?} is not an output", operand.special_name);
                return Err(TranslateError::UnsupportedConstruct(format!(
                    "system value {:?} declared as an output",
                    operand.special_name
                )));
            }
            other => {
                return Err(TranslateError::UnsupportedConstruct(format!(
                    "output system value {other:?} has no target equivalent"
                )));
            }
        },

        Decl::Output { operand } => add_user_output(ctx, shader, operand),

        Decl::Temps { count } => {
            if *count > 0 {
                ctx.with_sink(Sink::EarlyMain, |ctx| {
                    emitf!(ctx, "    float4 Temp[{count}];\n");
                    emitf!(ctx, "    int4 Temp_int[{count}];\n");
                    emitf!(ctx, "    uint4 Temp_uint[{count}];\n");
                    emitf!(ctx, "    half4 Temp_half[{count}];\n");
                });
            }
        }

        Decl::IndexableTemp {
            register,
            count,
            component_count,
        } => {
            ctx.with_sink(Sink::EarlyMain, |ctx| {
                emitf!(ctx, "    float{component_count} TempArray{register}[{count}];\n");
                emitf!(ctx, "    int{component_count} TempArray{register}_int[{count}];\n");
                emitf!(ctx, "    uint{component_count} TempArray{register}_uint[{count}];\n");
            });
        }

        Decl::ConstantBuffer { operand, access } => {
            translate_constant_buffer(ctx, shader, operand, *access, atomics)?;
        }

        Decl::Sampler {
            operand,
            comparison,
        } => {
            let register = operand.register;
            if *comparison {
                // HLSL has no separate type for comparison samplers, only
                // separate sampling functions; declare a compile-time
                // sampler for the comparison path.
                let name = resource_name(&shader.info, ResourceGroup::Sampler, register, true);
                ctx.with_sink(Sink::Main, |ctx| {
                    emitf!(ctx, "constexpr sampler {name}(compare_func::less);\n");
                });
            }
            // The engine still binds a sampler at this slot either way, so
            // a bindable parameter must exist alongside the constexpr one.
            let name = resource_name(&shader.info, ResourceGroup::Sampler, register, false);
            let explicit = !ctx.flags.contains(CompileFlags::DISABLE_EXPLICIT_BINDINGS);
            ctx.with_sink(Sink::ParamDecls, |ctx| {
                emitf!(ctx, "\tsampler {name}");
                if explicit {
                    emitf!(ctx, " [[ sampler({register}) ]]");
                }
                ctx.push(",\n");
            });
        }

        Decl::Resource { operand, dimension } => {
            translate_resource(ctx, shader, operand, *dimension)?;
        }

        Decl::ResourceStructured { operand, .. } => {
            let register = operand.register;
            let Some(cb) = cbuffer_cloned(shader, ResourceGroup::Texture, register) else {
                return Err(TranslateError::UnsupportedConstruct(format!(
                    "structured resource t{register} has no reflection layout"
                )));
            };
            declare_buffer_variable(ctx, shader, &cb, operand, BufferKind::StructuredSrv, atomics)?;
        }

        Decl::ResourceRaw { operand } => {
            let register = operand.register;
            let explicit = !ctx.flags.contains(CompileFlags::DISABLE_EXPLICIT_BINDINGS);
            ctx.with_sink(Sink::ParamDecls, |ctx| {
                emitf!(ctx, "\tconstant uint* RawRes{register}");
                if explicit {
                    emitf!(ctx, " [[ buffer({register}) ]]");
                }
                ctx.push(",\n");
            });
        }

        Decl::UavTyped {
            operand,
            dimension,
            return_type,
        } => {
            translate_uav_typed(ctx, shader, operand, *dimension, *return_type)?;
        }

        Decl::UavStructured {
            operand,
            has_counter,
            ..
        } => {
            let register = operand.register;
            if *has_counter {
                let name = resource_name(&shader.info, ResourceGroup::Uav, register, false);
                ctx.with_sink(Sink::Main, |ctx| {
                    emitf!(ctx, "atomic_uint {name}_counter;\n");
                });
            }
            let Some(cb) = cbuffer_cloned(shader, ResourceGroup::Uav, register) else {
                return Err(TranslateError::UnsupportedConstruct(format!(
                    "structured UAV u{register} has no reflection layout"
                )));
            };
            declare_buffer_variable(ctx, shader, &cb, operand, BufferKind::StructuredUav, atomics)?;
        }

        Decl::UavRaw {
            operand,
            has_counter,
        } => {
            let register = operand.register;
            if *has_counter {
                let name = resource_name(&shader.info, ResourceGroup::Uav, register, false);
                ctx.with_sink(Sink::Main, |ctx| {
                    emitf!(ctx, "atomic_uint {name}_counter;\n");
                });
            }
            let name = resource_name(&shader.info, ResourceGroup::Uav, register, false);
            let slot = register + crate::binding_model::UAV_BUFFER_BASE_SLOT;
            let explicit = !ctx.flags.contains(CompileFlags::DISABLE_EXPLICIT_BINDINGS);
            ctx.with_sink(Sink::ParamDecls, |ctx| {
                emitf!(ctx, "\tdevice uint* {name}");
                if explicit {
                    emitf!(ctx, " [[ buffer({slot}) ]]");
                }
                ctx.push(",\n");
            });
            annotate_bind_area(shader, register, &name, BindArea::Buffer)?;
        }

        Decl::TgsmStructured {
            operand,
            stride,
            count,
        } => {
            let register = operand.register;
            let words = stride / 4;
            ctx.with_sink(Sink::EarlyMain, |ctx| {
                emitf!(
                    ctx,
                    "    threadgroup struct {{\n        uint value[{words}];\n    }} TGSM{register}[{count}];\n"
                );
            });
            let ty = ShaderVarType {
                name: "$Element".to_owned(),
                columns: words as u16,
                elements: *count,
                ..Default::default()
            };
            ctx.regs.tgsm_types.insert(register, ty);
        }

        Decl::TgsmRaw {
            operand,
            byte_count,
        } => {
            // Byte-addressed shared memory is declared element-wise as
            // atomic-capable scalars so later atomic access is legal.
            let register = operand.register;
            let words = byte_count / 4;
            ctx.with_sink(Sink::EarlyMain, |ctx| {
                emitf!(ctx, "    threadgroup atomic_uint TGSM{register}[{words}];\n");
            });
        }

        Decl::ThreadGroup { size } => {
            // Recorded into the reflection output; not emitted as code.
            shader.info.thread_group_size = *size;
        }

        Decl::ImmediateConstantBuffer { values } => {
            translate_immediate_constant_buffer(ctx, values);
        }

        Decl::Dx9ImmConst { dest, src } => {
            debug_assert_eq!(src.kind, OperandKind::Immediate32);
            let is_int = dest.kind == OperandKind::SpecialImmConstInt;
            ctx.with_sink(Sink::Main, |ctx| -> Result<(), TranslateError> {
                if is_int {
                    emitf!(ctx, "const int4 IntImmConst{} = ", dest.register);
                } else {
                    emitf!(ctx, "const float4 ImmConst{} = ", dest.register);
                }
                Ok(())
            })?;
            if !is_int {
                add_to_dx9_imm_const_array(ctx, shader, dest)?;
            }
            let flags = if is_int {
                OperandFlags::INT
            } else {
                OperandFlags::BITCAST_TO_FLOAT
            };
            ctx.with_sink(Sink::Main, |ctx| -> Result<(), TranslateError> {
                translate_operand(ctx, &shader.info, src, flags)?;
                ctx.push(";\n");
                Ok(())
            })?;
        }

        Decl::IndexRange { operand, count } => {
            let base = operand.register;
            ctx.regs.indexed_input.insert(base, *count as i32);
            ctx.regs.indexed_input_parent.insert(base, base);
            for reg in base + 1..base + count {
                ctx.regs.indexed_input.insert(reg, -1);
                ctx.regs.indexed_input_parent.insert(reg, base);
            }
        }

        Decl::StageMetadata(_) => {}
    }
    Ok(())
}

fn translate_input_sgv(
    ctx: &mut Ctx,
    shader: &mut ShaderData,
    operand: &Operand,
) -> Result<(), TranslateError> {
    match ctx.stage {
        ShaderStage::Pixel => match operand.special_name {
            SpecialName::Position => add_builtin_input(ctx, shader, operand, "position", "float4"),
            SpecialName::ClipDistance => {
                add_builtin_input(ctx, shader, operand, "clip_distance", "float")
            }
            SpecialName::InstanceId => add_builtin_input(ctx, shader, operand, "instance_id", "uint"),
            SpecialName::IsFrontFace => {
                add_builtin_input(ctx, shader, operand, "front_facing", "bool")
            }
            SpecialName::SampleIndex => add_builtin_input(ctx, shader, operand, "sample_id", "uint"),
            _ => declare_input(
                ctx,
                shader,
                operand,
                InputQualifier::User(Interpolation::Undefined),
                MinPrecision::Default,
                4,
            ),
        },
        ShaderStage::Vertex => match operand.special_name {
            SpecialName::VertexId => add_builtin_input(ctx, shader, operand, "vertex_id", "uint"),
            SpecialName::InstanceId => add_builtin_input(ctx, shader, operand, "instance_id", "uint"),
            _ => declare_input(
                ctx,
                shader,
                operand,
                InputQualifier::Attribute,
                MinPrecision::Default,
                4,
            ),
        },
        other => {
            return Err(TranslateError::UnsupportedStage(other));
        }
    }
    Ok(())
}

/// System-value input: either a direct entry-point argument (vertex and
/// instance indices) or a builtin-attributed stage-in field, plus the
/// unpack into a flat `InputN` local when the body references it.
fn add_builtin_input(
    ctx: &mut Ctx,
    shader: &ShaderData,
    operand: &Operand,
    builtin_name: &str,
    type_name: &str,
) {
    let register = operand.register;
    let as_argument = matches!(
        operand.special_name,
        SpecialName::VertexId | SpecialName::InstanceId
    );

    if ctx.regs.input_declared_size.get(&register).copied().unwrap_or(0) == 0 {
        if as_argument {
            // These must be entry-point arguments, not stage-in fields.
            ctx.with_sink(Sink::ParamDecls, |ctx| {
                emitf!(ctx, "\t{type_name} {builtin_name} [[ {builtin_name} ]],\n");
            });
        } else {
            ctx.with_sink(Sink::StagedInputs, |ctx| {
                emitf!(ctx, "\t{type_name} {builtin_name} [[ {builtin_name} ]];\n");
            });
        }
        ctx.regs.input_declared_size.insert(register, 1);
    }

    let referenced = shader
        .input_referenced
        .get(register as usize)
        .copied()
        .unwrap_or(false);
    if referenced {
        ctx.with_sink(Sink::EarlyMain, |ctx| {
            ctx.indent += 1;
            ctx.add_indentation();
            if as_argument {
                emitf!(ctx, "uint4 Input{register}; Input{register}.x = {builtin_name};\n");
            } else {
                match type_name {
                    "bool" | "int" => {
                        emitf!(
                            ctx,
                            "int4 Input{register}; Input{register}.x = stageIn.{builtin_name};\n"
                        );
                    }
                    "uint" => {
                        emitf!(
                            ctx,
                            "uint4 Input{register}; Input{register}.x = stageIn.{builtin_name};\n"
                        );
                    }
                    "float" => {
                        emitf!(
                            ctx,
                            "float4 Input{register}; Input{register}.x = stageIn.{builtin_name};\n"
                        );
                    }
                    _ => {
                        emitf!(
                            ctx,
                            "{type_name} Input{register} = stageIn.{builtin_name};\n"
                        );
                    }
                }
            }

            // The rasterizer hands the fragment stage w already inverted.
            if operand.special_name == SpecialName::Position
                && ctx.stage == ShaderStage::Pixel
                && operand.write_mask().contains(3)
            {
                ctx.add_indentation();
                emitf!(ctx, "Input{register}.w = 1.0 / Input{register}.w;\n");
            }
            ctx.indent -= 1;
        });
    }
}

/// User-defined input: named deterministically from stage and register,
/// declared once, and unpacked into a local scratch variable (or local
/// array for ranged inputs) when referenced.
fn declare_input(
    ctx: &mut Ctx,
    shader: &ShaderData,
    operand: &Operand,
    qualifier: InputQualifier,
    min_precision: MinPrecision,
    num_components: u32,
) {
    let register = operand.register;
    if ctx.regs.indexed_input.get(&register).copied().unwrap_or(0) == -1 {
        return;
    }
    if ctx.regs.input_declared_size.get(&register).copied().unwrap_or(0) != 0 {
        return;
    }

    let mut type_name = if min_precision == MinPrecision::Float16 {
        "half"
    } else {
        "float"
    };
    if let Some(sig) = shader.info.input_signature(register) {
        type_name = match sig.component_type {
            crucible_ir::ComponentType::UInt32 => "uint",
            crucible_ir::ComponentType::SInt32 => "int",
            _ => type_name,
        };
    }

    let input_name = declared_input_name(&shader.info, ctx.flags, ctx.stage, operand);
    let qual = match qualifier {
        InputQualifier::Attribute => format!("attribute({register})"),
        InputQualifier::User(interp) => {
            let mut q = format!("user(varying{register})");
            if !matches!(interp, Interpolation::Undefined | Interpolation::Linear) {
                q.push_str(", ");
                q.push_str(interpolation_qualifier(interp));
            }
            q
        }
    };

    let is_2d_array = operand.index_dims == 2;
    let array_size = if is_2d_array {
        operand.indices[0] as i32
    } else {
        ctx.regs.indexed_input.get(&register).copied().unwrap_or(0)
    };

    let declared_size;
    if is_2d_array {
        if num_components == 1 {
            ctx.regs.scalar_input.insert(register, -1);
        }
        declared_size = array_size;
    } else if num_components == 1 {
        ctx.regs.scalar_input.insert(register, 1);
        declared_size = -1;
    } else if array_size > 0 {
        declared_size = array_size;
    } else {
        declared_size = -1;
    }
    ctx.regs.input_declared_size.insert(register, declared_size);

    ctx.with_sink(Sink::StagedInputs, |ctx| {
        emitf!(ctx, "\t{type_name}");
        if num_components > 1 {
            emitf!(ctx, "{num_components}");
        }
        emitf!(ctx, " {input_name}");
        if declared_size > 0 {
            emitf!(ctx, "[{declared_size}]");
        }
        emitf!(ctx, " [[ {qual} ]];\n");
    });

    let referenced = shader
        .input_referenced
        .get(register as usize)
        .copied()
        .unwrap_or(false);
    if referenced {
        ctx.with_sink(Sink::EarlyMain, |ctx| {
            ctx.indent += 1;
            if declared_size <= 0 {
                ctx.add_indentation();
                emitf!(
                    ctx,
                    "{type_name}{num_components} Input{register} = stageIn.{input_name};\n"
                );
            } else {
                ctx.add_indentation();
                emitf!(
                    ctx,
                    "{type_name}{num_components} Input{register}[{declared_size}];\n"
                );
                for i in (0..declared_size).rev() {
                    ctx.add_indentation();
                    emitf!(
                        ctx,
                        "Input{register}[{i}] = stageIn.{input_name}[{i}];\n"
                    );
                }
            }
            ctx.indent -= 1;
        });
    }
}

/// Dedup marker for output declarations, keyed to (phase, stream).
fn output_needs_declaring(ctx: &mut Ctx, operand: &Operand, count: u32) -> bool {
    if ctx.stage == ShaderStage::Pixel
        && matches!(
            operand.kind,
            OperandKind::OutputDepth
                | OperandKind::OutputDepthGreaterEqual
                | OperandKind::OutputDepthLessEqual
        )
    {
        return true;
    }

    let key = ((ctx.phase + 1) << 3) | ctx.stream;
    let register = operand.register;
    if ctx.regs.output_declared.get(&register).copied() != Some(key) {
        for offset in 0..count.max(1) {
            ctx.regs.output_declared.insert(register + offset, key);
        }
        return true;
    }
    false
}

fn add_builtin_output(
    ctx: &mut Ctx,
    shader: &ShaderData,
    operand: &Operand,
    array_elements: u32,
    builtin_name: &str,
) {
    ctx.have_post_shader = true;
    if !output_needs_declaring(ctx, operand, array_elements.max(1)) {
        return;
    }

    let register = operand.register;
    debug_assert!(
        shader
            .info
            .output_signature(register, operand.write_mask().0, ctx.stream)
            .is_some(),
        "builtin output o{register} missing from signature"
    );
    ctx.with_sink(Sink::DeclaredOutputs, |ctx| {
        if operand.special_name == SpecialName::ClipDistance {
            let max = operand.max_component();
            emitf!(ctx, "\tfloat {builtin_name} [{max}] [[ {builtin_name} ]];\n");
        } else {
            emitf!(ctx, "\tfloat4 {builtin_name} [[ {builtin_name} ]];\n");
        }
        emitf!(ctx, "#define Output{register} output.{builtin_name}\n");
    });
}

fn add_user_output(ctx: &mut Ctx, shader: &ShaderData, operand: &Operand) {
    if !output_needs_declaring(ctx, operand, 1) {
        return;
    }

    let type_name = match crate::operand::operand_data_type(&shader.info, operand) {
        DataType::UInt => "uint",
        DataType::Int => "int",
        DataType::Half => "half",
        _ => "float",
    };
    let register = operand.register;

    match ctx.stage {
        ShaderStage::Pixel => {
            ctx.with_sink(Sink::DeclaredOutputs, |ctx| match operand.kind {
                OperandKind::OutputCoverageMask => {
                    ctx.push("\tuint sampleMask [[ sample_mask ]];\n");
                }
                OperandKind::OutputDepth => {
                    emitf!(ctx, "\t{type_name} PixOutDepthAny [[ depth(any) ]];\n");
                    ctx.push("#define DepthAny output.PixOutDepthAny\n");
                }
                OperandKind::OutputDepthGreaterEqual => {
                    emitf!(ctx, "\t{type_name} PixOutDepthGreater [[ depth(greater) ]];\n");
                    ctx.push("#define DepthGreater output.PixOutDepthGreater\n");
                }
                OperandKind::OutputDepthLessEqual => {
                    emitf!(ctx, "\t{type_name} PixOutDepthLess [[ depth(less) ]];\n");
                    ctx.push("#define DepthLess output.PixOutDepthLess\n");
                }
                _ => {
                    let target = register;
                    match ctx.regs.gmem_elements.get(&target).copied() {
                        // A framebuffer-fetch output's type must match the
                        // attachment it reads back.
                        Some(elements) if elements > 0 => {
                            emitf!(
                                ctx,
                                "\tfloat{elements} PixOutColor{target} [[ color({target}) ]];\n"
                            );
                        }
                        _ => {
                            emitf!(
                                ctx,
                                "\t{type_name}4 PixOutColor{target} [[ color({target}) ]];\n"
                            );
                        }
                    }
                    emitf!(ctx, "#define Output{register} output.PixOutColor{target}\n");
                }
            });
        }
        ShaderStage::Vertex => {
            let output_name =
                declared_output_name(&shader.info, ctx.flags, ctx.stage, ctx.stream, operand);
            ctx.with_sink(Sink::DeclaredOutputs, |ctx| {
                emitf!(
                    ctx,
                    "\t{type_name}4 {output_name} [[ user(varying{register}) ]];\n"
                );
                emitf!(ctx, "#define Output{register} output.{output_name}\n");
            });
        }
        _ => {}
    }
}

fn translate_resource(
    ctx: &mut Ctx,
    shader: &ShaderData,
    operand: &Operand,
    dimension: ResourceDimension,
) -> Result<(), TranslateError> {
    let register = operand.register;

    // High texture slots select a framebuffer-fetch color attachment
    // instead of a sampled texture.
    if register >= GMEM_FLOAT_START_SLOT {
        let slot = gmem_input_slot(register);
        let elements = gmem_input_elements(register);
        ctx.with_sink(Sink::ParamDecls, |ctx| {
            if elements == 1 {
                emitf!(ctx, "\tfloat GMEM_Input{slot} [[ color({slot}) ]],\n");
            } else {
                emitf!(ctx, "\tfloat{elements} GMEM_Input{slot} [[ color({slot}) ]],\n");
            }
        });
        ctx.regs.gmem_elements.insert(slot, elements);
        return Ok(());
    }

    // Comparison sampling is unavailable on multisample and volume
    // textures.
    let shadow_capable = !matches!(
        dimension,
        ResourceDimension::Texture2DMs | ResourceDimension::Texture3D
    );
    let is_shadow = shadow_capable && is_shadow_texture(shader, register);

    let Some(type_name) = texture_type_name(&shader.info, dimension, register, is_shadow) else {
        return Err(TranslateError::UnsupportedConstruct(format!(
            "resource dimension {dimension:?} has no target texture type"
        )));
    };

    let name = resource_name(&shader.info, ResourceGroup::Texture, register, is_shadow);
    let explicit = !ctx.flags.contains(CompileFlags::DISABLE_EXPLICIT_BINDINGS);
    ctx.with_sink(Sink::ParamDecls, |ctx| {
        emitf!(ctx, "\t{type_name} {name}");
        if explicit {
            emitf!(ctx, " [[ texture({register}) ]]");
        }
        ctx.push(",\n");
    });

    ctx.regs.resource_dims.insert(register, dimension);
    Ok(())
}

/// A texture is shadow-sampled when a depth-comparison sampling
/// instruction reads it; that decides between the `depth2d` and
/// `texture2d` family of types.
fn is_shadow_texture(shader: &ShaderData, texture_register: u32) -> bool {
    shader.instructions.iter().any(|inst| {
        matches!(
            inst.opcode,
            Opcode::SampleC | Opcode::SampleCLz | Opcode::Gather4C
        ) && inst
            .operands
            .get(2)
            .is_some_and(|op| op.register == texture_register)
    })
}

fn translate_uav_typed(
    ctx: &mut Ctx,
    shader: &mut ShaderData,
    operand: &Operand,
    dimension: ResourceDimension,
    return_type: crucible_ir::ResourceReturnType,
) -> Result<(), TranslateError> {
    use crucible_ir::ResourceReturnType as Ret;
    let register = operand.register;
    let element = match return_type {
        Ret::Float => "float",
        Ret::UInt => "uint",
        Ret::SInt => "int",
        other => {
            return Err(TranslateError::UnsupportedConstruct(format!(
                "typed UAV return type {other:?} is not supported"
            )));
        }
    };
    let name = resource_name(&shader.info, ResourceGroup::Uav, register, false);
    let slot = register + crate::binding_model::UAV_BUFFER_BASE_SLOT;
    let explicit = !ctx.flags.contains(CompileFlags::DISABLE_EXPLICIT_BINDINGS);

    if dimension == ResourceDimension::Buffer {
        ctx.with_sink(Sink::ParamDecls, |ctx| {
            emitf!(ctx, "\tdevice {element}* {name}");
            if explicit {
                emitf!(ctx, " [[ buffer({slot}) ]]");
            }
            ctx.push(",\n");
        });
        annotate_bind_area(shader, register, &name, BindArea::Buffer)?;
        return Ok(());
    }

    let texture = match dimension {
        ResourceDimension::Texture1D => "texture1d",
        ResourceDimension::Texture2D => "texture2d",
        ResourceDimension::Texture3D => "texture3d",
        ResourceDimension::TextureCube => "texturecube",
        ResourceDimension::Texture1DArray => "texture1d_array",
        ResourceDimension::Texture2DArray => "texture2d_array",
        ResourceDimension::TextureCubeArray => "texturecube_array",
        ResourceDimension::Texture2DMs | ResourceDimension::Texture2DMsArray => {
            return Err(TranslateError::UnsupportedConstruct(
                "multisample UAV textures are not supported by the target".to_owned(),
            ));
        }
        ResourceDimension::Buffer => unreachable!(),
    };
    let access = if ctx.opcodes_used.contains(&Opcode::StoreUavTyped) {
        ", access::write"
    } else {
        ""
    };
    ctx.with_sink(Sink::ParamDecls, |ctx| {
        emitf!(ctx, "\t{texture}<{element}{access}> {name}");
        if explicit {
            emitf!(ctx, " [[ texture({slot}) ]]");
        }
        ctx.push(",\n");
    });
    annotate_bind_area(shader, register, &name, BindArea::Texture)?;
    Ok(())
}

/// Record whether a UAV surfaced as a buffer or a texture; later atomic and
/// typed-store instructions branch on this.
fn annotate_bind_area(
    shader: &mut ShaderData,
    register: u32,
    name: &str,
    area: BindArea,
) -> Result<(), TranslateError> {
    let mut count = 0;
    for binding in shader
        .info
        .resource_bindings
        .iter_mut()
        .filter(|b| b.group == ResourceGroup::Uav && b.name == name)
    {
        binding.bind_area = area;
        count += 1;
    }
    if count == 0 {
        if let Some(binding) = shader.info.binding_mut(ResourceGroup::Uav, register) {
            binding.bind_area = area;
            count = 1;
        }
    }
    if count > 1 {
        return Err(TranslateError::AmbiguousUavBinding { slot: register });
    }
    Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum BufferKind {
    StructuredSrv,
    StructuredUav,
}

fn cbuffer_cloned(
    shader: &mut ShaderData,
    group: ResourceGroup,
    slot: u32,
) -> Option<ConstantBuffer> {
    // Normalize bool members up front so the clone used for emission and
    // the reflection copy agree.
    let cb = shader.info.constant_buffer_mut(group, slot)?;
    for var in &mut cb.vars {
        normalize_bool_members(&mut var.ty);
    }
    Some(cb.clone())
}

/// Booleans become integers everywhere: the target language's bool does not
/// share the source's 4-byte representation, and ints allow the implicit
/// conversions the generated code relies on.
fn normalize_bool_members(ty: &mut ShaderVarType) {
    if ty.class == VarClass::Scalar && ty.ty == DataType::Bool {
        ty.ty = DataType::Int;
    }
    for member in &mut ty.members {
        normalize_bool_members(member);
    }
}

/// Structured buffer / UAV: the element type becomes a named struct bound
/// through a pointer parameter.
fn declare_buffer_variable(
    ctx: &mut Ctx,
    shader: &mut ShaderData,
    cb: &ConstantBuffer,
    operand: &Operand,
    kind: BufferKind,
    atomics: &AtomicUsageList,
) -> Result<(), TranslateError> {
    debug_assert_eq!(cb.vars.len(), 1);
    debug_assert_eq!(cb.vars[0].name, "$Element");

    let register = operand.register;
    let (group, address_space, slot) = match kind {
        BufferKind::StructuredSrv => (ResourceGroup::Texture, "constant", register),
        BufferKind::StructuredUav => (
            ResourceGroup::Uav,
            "device",
            register + crate::binding_model::UAV_BUFFER_BASE_SLOT,
        ),
    };
    let struct_name = resource_name(&shader.info, group, register, false);

    ctx.with_sink(Sink::Main, |ctx| {
        pre_declare_struct_type(ctx, &struct_name, &cb.vars[0].ty, atomics);
    });

    let explicit = !ctx.flags.contains(CompileFlags::DISABLE_EXPLICIT_BINDINGS);
    ctx.with_sink(Sink::ParamDecls, |ctx| {
        ctx.push("\t");
        emitf!(ctx, "{address_space} ");
        declare_cb_var(ctx, &struct_name, &cb.vars[0].ty, true, false, atomics);
        if explicit {
            emitf!(ctx, " [[ buffer({slot}) ]]");
        }
        ctx.push(",\n");
    });

    if kind == BufferKind::StructuredUav {
        annotate_bind_area(shader, register, &struct_name, BindArea::Buffer)?;
    }
    Ok(())
}

fn translate_constant_buffer(
    ctx: &mut Ctx,
    shader: &mut ShaderData,
    operand: &Operand,
    access: CbAccessPattern,
    atomics: &AtomicUsageList,
) -> Result<(), TranslateError> {
    let slot = operand.indices[0];
    let vec4_size = operand.indices[1];
    let stage_name = ctx.stage.name_suffix();
    let explicit = !ctx.flags.contains(CompileFlags::DISABLE_EXPLICIT_BINDINGS);

    // Dynamically indexed buffers are emitted as raw float4-array blobs:
    // there is no general way to recover the member a computed index
    // addresses.
    if let Some(cb) = shader.info.constant_buffer_mut(ResourceGroup::ConstantBuffer, slot) {
        cb.blob = access == CbAccessPattern::DynamicIndexed;
    }

    let Some(cb) = cbuffer_cloned(shader, ResourceGroup::ConstantBuffer, slot) else {
        // No reflection name for this buffer; generate the raw fallback.
        ctx.with_sink(Sink::Main, |ctx| {
            emitf!(
                ctx,
                "struct ConstantBuffer{slot} {{\n\tfloat4 data[{vec4_size}];\n}};\n"
            );
        });
        let pointer = ctx.stage == ShaderStage::Vertex;
        ctx.with_sink(Sink::ParamDecls, |ctx| {
            emitf!(
                ctx,
                "\tconstant ConstantBuffer{slot}{} cb{slot}",
                if pointer { "*" } else { "&" }
            );
            if explicit {
                emitf!(ctx, " [[ buffer({slot}) ]]");
            }
            ctx.push(",\n");
        });
        return Ok(());
    };

    if cb.blob {
        let elem = cb.vars.first().map(|v| v.name.clone()).unwrap_or_default();
        ctx.with_sink(Sink::Main, |ctx| {
            emitf!(
                ctx,
                "struct ConstantBuffer{slot} {{\n\tfloat4 {elem}[{vec4_size}];\n}};\n"
            );
        });
        // Vertex stages take the buffer as a pointer because of how
        // indexing is emitted later; other stages take a reference.
        let pointer = ctx.stage == ShaderStage::Vertex;
        ctx.with_sink(Sink::ParamDecls, |ctx| {
            emitf!(
                ctx,
                "\tconstant ConstantBuffer{slot}{} {}{stage_name}_data",
                if pointer { "*" } else { "&" },
                cb.name
            );
            if explicit {
                emitf!(ctx, " [[ buffer({slot}) ]]");
            }
            ctx.push(",\n");
        });
        return Ok(());
    }

    declare_struct_constants(ctx, &cb, slot, atomics);
    Ok(())
}

/// The common constant-buffer shape: a named struct of members, bound as a
/// constant reference, then unpacked into one local alias per member so the
/// body addresses members directly.
fn declare_struct_constants(
    ctx: &mut Ctx,
    cb: &ConstantBuffer,
    binding_slot: u32,
    atomics: &AtomicUsageList,
) {
    let stage_name = ctx.stage.name_suffix();
    let buffer_name = if cb.name.starts_with('$') {
        "Globals".to_owned()
    } else {
        cb.name.clone()
    };

    ctx.with_sink(Sink::Main, |ctx| {
        for var in &cb.vars {
            pre_declare_struct_type(ctx, &var.ty.name, &var.ty, atomics);
        }

        emitf!(ctx, "struct {buffer_name}{stage_name}_Type {{\n");
        let mut next_register = 0u32;
        let mut num_dummies = 0u32;
        for (i, var) in cb.vars.iter().enumerate() {
            let register = var.start_offset / 16;
            if register > next_register {
                // Fill the register gap so the struct layout matches the
                // declared offsets.
                emitf!(
                    ctx,
                    "\tfloat4 offsetDummy_{num_dummies}[{}];\n",
                    register - next_register
                );
                num_dummies += 1;
            }
            ctx.push("\t");
            declare_cb_var(
                ctx,
                &var.ty.name,
                &var.ty,
                false,
                i + 1 < cb.vars.len(),
                atomics,
            );
            next_register = register + var_size_vec4(&var.ty);
        }
        ctx.push("};\n");
    });

    let explicit = !ctx.flags.contains(CompileFlags::DISABLE_EXPLICIT_BINDINGS);
    ctx.with_sink(Sink::ParamDecls, |ctx| {
        emitf!(
            ctx,
            "\tconstant {buffer_name}{stage_name}_Type & {buffer_name}{stage_name}_In"
        );
        if explicit {
            emitf!(ctx, " [[ buffer({binding_slot}) ]]");
        }
        ctx.push(",\n");
    });

    // One local alias per member; the body refers to members directly
    // rather than through the buffer handle.
    ctx.with_sink(Sink::EarlyMain, |ctx| {
        for var in &cb.vars {
            let ty = &var.ty;
            let name = &ty.name;
            let star = if ty.elements > 1 { "*" } else { "" };
            ctx.push("    constant ");
            match ty.class {
                VarClass::Struct => {
                    emitf!(ctx, "{name}_Type{star} const &{name}");
                }
                VarClass::MatrixRows | VarClass::MatrixColumns => {
                    let scalar = if ty.ty == DataType::Half { "half" } else { "float" };
                    emitf!(ctx, "{scalar}{}* const &{name}", ty.columns);
                }
                VarClass::Vector => {
                    let scalar = cb_scalar_name(ty.ty);
                    emitf!(ctx, "{scalar}{}{star} const &{name}", ty.columns);
                }
                VarClass::Scalar => {
                    let scalar = cb_scalar_name(ty.ty);
                    emitf!(ctx, "{scalar}{star} const &{name}");
                }
            }
            emitf!(ctx, " = {buffer_name}{stage_name}_In.{name};\n");
        }
    });
}

fn cb_scalar_name(ty: DataType) -> &'static str {
    match ty {
        DataType::Half => "half",
        DataType::UInt => "uint",
        DataType::Int | DataType::Bool => "int",
        _ => "float",
    }
}

/// The target language forbids embedded struct definitions, so nested
/// struct member types are declared up front, deepest first.
fn pre_declare_struct_type(
    ctx: &mut Ctx,
    name: &str,
    ty: &ShaderVarType,
    atomics: &AtomicUsageList,
) {
    for member in &ty.members {
        if member.class == VarClass::Struct {
            pre_declare_struct_type(ctx, &member.name, member, atomics);
        }
    }

    if ty.class == VarClass::Struct {
        debug_assert_ne!(name, "$Element", "unnamed element structs are not supported");
        emitf!(ctx, "struct {name}_Type {{\n");
        for member in &ty.members {
            ctx.push("\t");
            declare_cb_var(ctx, &member.name, member, false, false, atomics);
        }
        ctx.push("};\n");
    }
}

/// One member declaration inside a buffer struct (or as a pointer-typed
/// parameter when `pointer` is set).
fn declare_cb_var(
    ctx: &mut Ctx,
    name: &str,
    ty: &ShaderVarType,
    pointer: bool,
    dummy_alignment: bool,
    atomics: &AtomicUsageList,
) {
    let star = if pointer { "*" } else { "" };
    match ty.class {
        VarClass::Struct => {
            emitf!(ctx, "{name}_Type {star}{name}");
            if ty.elements > 1 {
                emitf!(ctx, "[{}]", ty.elements);
            }
        }
        VarClass::MatrixRows | VarClass::MatrixColumns => {
            let scalar = match ty.ty {
                DataType::Float => "float",
                DataType::Half => "half",
                other => {
                    debug_assert!(false, "matrix of {other:?} in constant buffer");
                    "float"
                }
            };
            emitf!(ctx, "{scalar}{} {star}{name}[{}", ty.columns, ty.rows);
            if ty.elements > 1 {
                emitf!(ctx, " * {}", ty.elements);
            }
            ctx.push("]");
        }
        VarClass::Vector => {
            let scalar = match ty.ty {
                DataType::Float | DataType::Double => "float",
                DataType::Half => "half",
                DataType::UInt => "uint",
                DataType::Int | DataType::Bool => "int",
                other => {
                    debug_assert!(false, "vector of {other:?} in constant buffer");
                    "float"
                }
            };
            emitf!(ctx, "{scalar}{} {star}{name}", ty.columns);
            if ty.elements > 1 {
                emitf!(ctx, "[{}]", ty.elements);
            }
        }
        VarClass::Scalar => {
            let atomic = atomics.contains(&atomic_var_key(ty));
            match ty.ty {
                DataType::Float | DataType::Double => emitf!(ctx, "float {star}{name}"),
                DataType::Half => emitf!(ctx, "half {star}{name}"),
                DataType::UInt => {
                    if atomic {
                        emitf!(ctx, "volatile atomic_uint {star}{name}");
                    } else {
                        emitf!(ctx, "uint {star}{name}");
                    }
                }
                DataType::Int | DataType::Bool => {
                    if atomic {
                        emitf!(ctx, "volatile atomic_int {star}{name}");
                    } else {
                        emitf!(ctx, "int {star}{name}");
                    }
                }
                other => {
                    debug_assert!(false, "scalar of {other:?} in constant buffer");
                    emitf!(ctx, "float {star}{name}");
                }
            }
            if ty.elements > 1 {
                emitf!(ctx, "[{}]", ty.elements);
            }
        }
    }
    if !pointer {
        ctx.push(";\n");
    }

    // Members narrower than 16 bytes need trailing dummies to restore the
    // 16-byte vector alignment the source layout assumes.
    if dummy_alignment {
        let size_bytes: u32 = match ty.columns {
            1 => 4,
            2 => 8,
            _ => 16,
        };
        if size_bytes == 4 {
            emitf!(ctx, "\tfloat  offsetDummy_4Bytes_{name};\n");
            emitf!(ctx, "\tfloat2 offsetDummy_8Bytes_{name};\n");
        } else if size_bytes == 8 {
            emitf!(ctx, "\tfloat2 offsetDummy_8Bytes_{name};\n");
        }
    }
}

/// Size of a member in 16-byte registers, for register-gap padding.
fn var_size_vec4(ty: &ShaderVarType) -> u32 {
    match ty.class {
        VarClass::Struct => {
            let size: u32 = ty.members.iter().map(var_size_vec4).sum();
            if ty.elements > 1 {
                size * ty.elements
            } else {
                size
            }
        }
        VarClass::MatrixRows | VarClass::MatrixColumns => {
            u32::from(ty.rows) * ty.elements.max(1)
        }
        VarClass::Vector if ty.elements > 1 => ty.elements,
        _ => 1,
    }
}

fn translate_immediate_constant_buffer(ctx: &mut Ctx, values: &[[u32; 4]]) {
    ctx.with_sink(Sink::Main, |ctx| {
        ctx.push("#define immediateConstBufferI(idx) immediateConstBufferInt[idx]\n");
        ctx.push("#define immediateConstBufferF(idx) as_type<float4>(immediateConstBufferInt[idx])\n");
        emitf!(
            ctx,
            "static constant int4 immediateConstBufferInt[{}] = {{\n",
            values.len()
        );
        for (i, row) in values.iter().enumerate() {
            let [x, y, z, w] = row.map(|v| v as i32);
            emitf!(ctx, "\tint4({x}, {y}, {z}, {w})");
            ctx.push(if i + 1 < values.len() { ",\n" } else { "\n" });
        }
        ctx.push("};\n");
    });
}

fn add_to_dx9_imm_const_array(
    ctx: &mut Ctx,
    shader: &ShaderData,
    operand: &Operand,
) -> Result<(), TranslateError> {
    let index = ctx.regs.num_dx9_imm_consts;
    ctx.regs.dx9_imm_const_remap.insert(operand.register, index);
    ctx.with_sink(Sink::EarlyMain, |ctx| -> Result<(), TranslateError> {
        ctx.indent += 1;
        ctx.add_indentation();
        emitf!(ctx, "ImmConstArray[{index}] = ");
        translate_operand(ctx, &shader.info, operand, OperandFlags::empty())?;
        ctx.push(";\n");
        ctx.indent -= 1;
        Ok(())
    })?;
    ctx.regs.num_dx9_imm_consts += 1;
    Ok(())
}
