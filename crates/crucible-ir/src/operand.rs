//! Operand model: value references with component selection, modifiers and
//! dynamic sub-operand indexing.
//!
//! The 4-wide register model follows the source bytecode: every general
//! purpose register is a vec4 and an operand selects 1..4 of its components
//! through a write mask, a swizzle permutation, or a single-component
//! select.

use crate::types::{DataType, MinPrecision};

/// Unordered subset of the four components, one bit each (x = 1, y = 2,
/// z = 4, w = 8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteMask(pub u8);

impl WriteMask {
    pub const X: Self = Self(0b0001);
    pub const Y: Self = Self(0b0010);
    pub const Z: Self = Self(0b0100);
    pub const W: Self = Self(0b1000);
    pub const XY: Self = Self(0b0011);
    pub const XYZ: Self = Self(0b0111);
    pub const XYZW: Self = Self(0b1111);

    pub fn contains(self, component: u8) -> bool {
        (self.0 & (1 << component)) != 0
    }

    pub fn count(self) -> u32 {
        (self.0 & 0xF).count_ones()
    }

    /// `1 -> .x`, `2 -> .xy`, `3 -> .xyz`, `4 -> .xyzw`.
    pub fn from_component_count(count: u32) -> Self {
        Self(((1u32 << count) - 1) as u8)
    }
}

/// Ordered selection of four source components, each lane 0..=3 for x/y/z/w.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Swizzle(pub [u8; 4]);

impl Swizzle {
    pub const XYZW: Self = Self([0, 1, 2, 3]);
    pub const XXXX: Self = Self([0, 0, 0, 0]);
    pub const YYYY: Self = Self([1, 1, 1, 1]);
    pub const ZZZZ: Self = Self([2, 2, 2, 2]);
    pub const WWWW: Self = Self([3, 3, 3, 3]);

    pub fn is_identity(self) -> bool {
        self == Self::XYZW
    }

    /// Single component repeated, e.g. `.wwww`.
    pub fn is_replicated(self) -> bool {
        matches!(self, Self::XXXX | Self::YYYY | Self::ZZZZ | Self::WWWW)
    }
}

/// How an operand token picks components out of its 4-wide register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComponentSelect {
    /// Write-mask mode. A mask of 0 means "all components" in the source
    /// encoding and must be treated as XYZW.
    Mask(WriteMask),
    Swizzle(Swizzle),
    /// Single-component select; the payload is the component index.
    Select1(u8),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OperandModifier {
    #[default]
    None,
    Neg,
    Abs,
    AbsNeg,
}

/// Representation of one index dimension of an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IndexRep {
    #[default]
    Immediate32,
    Relative,
    Immediate32PlusRelative,
}

/// System-value name attached to SGV/SIV declarations and their operands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpecialName {
    #[default]
    Undefined,
    Position,
    ClipDistance,
    CullDistance,
    RenderTargetArrayIndex,
    ViewportArrayIndex,
    VertexId,
    InstanceId,
    PrimitiveId,
    IsFrontFace,
    SampleIndex,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandKind {
    Temp,
    IndexableTemp,
    Input,
    Output,
    Immediate32,
    Immediate64,
    Sampler,
    Resource,
    ConstantBuffer,
    ImmediateConstantBuffer,
    UnorderedAccessView,
    ThreadGroupSharedMemory,
    Null,
    OutputDepth,
    OutputDepthGreaterEqual,
    OutputDepthLessEqual,
    OutputCoverageMask,
    InputCoverageMask,
    InputThreadId,
    InputThreadGroupId,
    InputThreadIdInGroup,
    InputThreadIdInGroupFlattened,
    InputPrimitiveId,
    InputForkInstanceId,
    InputGsInstanceId,
    InputDomainPoint,
    InputControlPoint,
    OutputControlPointId,
    InputPatchConstant,
    FunctionBody,
    Stream,
    ThisPointer,
    // Legacy DX9-era specials kept by the decoder.
    SpecialImmConst,
    SpecialImmConstInt,
    SpecialPosition,
    SpecialFog,
    SpecialPointSize,
    SpecialOutBaseColor,
    SpecialOutOffsetColor,
    SpecialAddress,
    SpecialLoopCounter,
    SpecialTexCoord,
}

pub const MAX_SUB_OPERANDS: usize = 3;

/// A reference to a value: register, immediate, resource or special name.
///
/// `data_type` is derived metadata written by the type-inference pass; the
/// decoder leaves it `Void`.
#[derive(Debug, Clone, PartialEq)]
pub struct Operand {
    pub kind: OperandKind,
    /// Primary register / slot number. For 2-D addressed kinds this mirrors
    /// the last entry of `indices`.
    pub register: u32,
    /// Immediate index value per dimension. Constant buffers use
    /// `[binding slot, vec4 offset]`; arrayed inputs use
    /// `[array size, register]`; indexable temps use `[array id, element]`.
    pub indices: [u32; 2],
    pub index_dims: u8,
    pub index_rep: [IndexRep; 2],
    /// Dynamic index expressions, one per index dimension that uses a
    /// relative representation. Owned, rendered recursively by the operand
    /// engine.
    pub sub_operand: [Option<Box<Operand>>; MAX_SUB_OPERANDS],
    pub sel: ComponentSelect,
    /// Natural width of the referenced value (1 or 4 for almost everything;
    /// 3 for the thread-id builtins).
    pub num_components: u8,
    /// Cleared by the decoder for resource/sampler operands where a
    /// register swizzle is meaningless.
    pub write_mask_enabled: bool,
    pub modifier: OperandModifier,
    pub min_precision: MinPrecision,
    pub special_name: SpecialName,
    /// Raw 32-bit immediate payload (IEEE bits for float literals).
    pub imm: [u32; 4],
    /// Per-component inferred flavor, filled by the type-inference pass.
    pub data_type: [DataType; 4],
    /// Literal carries an integer bit pattern (set by the inference pass
    /// for operands of integer-immediate opcodes).
    pub integer_immediate: bool,
}

impl Operand {
    pub fn new(kind: OperandKind, register: u32) -> Self {
        Self {
            kind,
            register,
            indices: [register, 0],
            index_dims: 1,
            index_rep: [IndexRep::Immediate32; 2],
            sub_operand: [None, None, None],
            sel: ComponentSelect::Mask(WriteMask(0)),
            num_components: 4,
            write_mask_enabled: true,
            modifier: OperandModifier::None,
            min_precision: MinPrecision::Default,
            special_name: SpecialName::Undefined,
            imm: [0; 4],
            data_type: [DataType::Void; 4],
            integer_immediate: false,
        }
    }

    pub fn temp(register: u32) -> Self {
        Self::new(OperandKind::Temp, register)
    }

    pub fn input(register: u32) -> Self {
        Self::new(OperandKind::Input, register)
    }

    pub fn output(register: u32) -> Self {
        Self::new(OperandKind::Output, register)
    }

    pub fn uav(slot: u32) -> Self {
        let mut op = Self::new(OperandKind::UnorderedAccessView, slot);
        op.write_mask_enabled = false;
        op
    }

    pub fn resource(slot: u32) -> Self {
        let mut op = Self::new(OperandKind::Resource, slot);
        op.write_mask_enabled = false;
        op
    }

    pub fn sampler(slot: u32) -> Self {
        let mut op = Self::new(OperandKind::Sampler, slot);
        op.write_mask_enabled = false;
        op
    }

    pub fn tgsm(register: u32) -> Self {
        Self::new(OperandKind::ThreadGroupSharedMemory, register)
    }

    pub fn null() -> Self {
        Self::new(OperandKind::Null, 0)
    }

    pub fn cbuffer(slot: u32, vec4_offset: u32) -> Self {
        let mut op = Self::new(OperandKind::ConstantBuffer, slot);
        op.indices = [slot, vec4_offset];
        op.index_dims = 2;
        op.sel = ComponentSelect::Swizzle(Swizzle::XYZW);
        op
    }

    pub fn imm32_f32(values: [f32; 4]) -> Self {
        let mut op = Self::new(OperandKind::Immediate32, 0);
        op.imm = values.map(f32::to_bits);
        op.index_dims = 0;
        op
    }

    pub fn imm32_u32(values: [u32; 4]) -> Self {
        let mut op = Self::new(OperandKind::Immediate32, 0);
        op.imm = values;
        op.index_dims = 0;
        op
    }

    pub fn imm32_scalar(value: u32) -> Self {
        let mut op = Self::imm32_u32([value, 0, 0, 0]);
        op.num_components = 1;
        op
    }

    pub fn with_mask(mut self, mask: WriteMask) -> Self {
        self.sel = ComponentSelect::Mask(mask);
        self
    }

    pub fn with_swizzle(mut self, swizzle: Swizzle) -> Self {
        self.sel = ComponentSelect::Swizzle(swizzle);
        self
    }

    pub fn with_select(mut self, component: u8) -> Self {
        self.sel = ComponentSelect::Select1(component);
        self
    }

    pub fn with_modifier(mut self, modifier: OperandModifier) -> Self {
        self.modifier = modifier;
        self
    }

    /// Effective destination write mask. Anything that is not an explicit
    /// non-empty mask selects all four components.
    pub fn write_mask(&self) -> WriteMask {
        match self.sel {
            ComponentSelect::Mask(mask) if mask.0 != 0 => mask,
            _ => WriteMask::XYZW,
        }
    }

    /// Natural component width; the thread-id builtins are three-wide
    /// whatever their token says.
    fn natural_components(&self) -> u8 {
        match self.kind {
            OperandKind::InputThreadId
            | OperandKind::InputThreadGroupId
            | OperandKind::InputThreadIdInGroup => 3,
            _ => self.num_components,
        }
    }

    /// Number of components this operand yields, intersected with an extra
    /// caller-supplied component mask.
    pub fn selected_count_with_mask(&self, extra: WriteMask) -> u32 {
        match self.kind {
            OperandKind::InputThreadIdInGroupFlattened => return 1,
            OperandKind::Immediate32
            | OperandKind::Immediate64
            | OperandKind::OutputDepth
            | OperandKind::OutputDepthGreaterEqual
            | OperandKind::OutputDepthLessEqual => {
                let natural = WriteMask::from_component_count(self.num_components as u32);
                return WriteMask(natural.0 & extra.0).count();
            }
            _ => {}
        }

        let mut count = 0;
        if self.write_mask_enabled && self.natural_components() != 1 {
            match self.sel {
                ComponentSelect::Mask(mask) => {
                    let mask = if mask.0 == 0 { WriteMask::XYZW } else { mask };
                    let mask = WriteMask(mask.0 & extra.0);
                    if mask == WriteMask::XYZW {
                        return 4;
                    }
                    count = mask.count();
                }
                ComponentSelect::Swizzle(swizzle) => {
                    if !swizzle.is_identity() {
                        for i in 0..4u8 {
                            if extra.contains(i) {
                                count += 1;
                            }
                        }
                    }
                }
                ComponentSelect::Select1(_) => return 1,
            }
        }

        if count == 0 {
            let natural = WriteMask::from_component_count(self.natural_components() as u32);
            return WriteMask(natural.0 & extra.0).count();
        }
        count
    }

    pub fn selected_count(&self) -> u32 {
        self.selected_count_with_mask(WriteMask::XYZW)
    }

    /// Index (1-based) of the highest selected component; drives clip
    /// distance array sizing.
    pub fn max_component(&self) -> u32 {
        if self.write_mask_enabled && self.num_components == 4 {
            match self.sel {
                ComponentSelect::Mask(mask) if mask.0 != 0 && mask != WriteMask::XYZW => {
                    for c in (0..4u8).rev() {
                        if mask.contains(c) {
                            return u32::from(c) + 1;
                        }
                    }
                }
                ComponentSelect::Swizzle(_) => return 4,
                ComponentSelect::Select1(_) => return 1,
                _ => {}
            }
        }
        4
    }

    /// Selection collapsed to an unordered component mask.
    pub fn selection_mask(&self) -> WriteMask {
        if !(self.write_mask_enabled && self.num_components == 4) {
            return WriteMask(0);
        }
        match self.sel {
            ComponentSelect::Mask(mask) => mask,
            ComponentSelect::Swizzle(swizzle) => {
                let mut mask = 0u8;
                for lane in swizzle.0 {
                    mask |= 1 << lane;
                }
                WriteMask(mask)
            }
            ComponentSelect::Select1(c) => WriteMask(1 << c),
        }
    }

    /// Non-empty intersection of the components two operands touch.
    pub fn selection_overlaps(&self, other: &Operand) -> bool {
        (self.selection_mask().0 & other.selection_mask().0) != 0
    }

    /// Single replicated source component, e.g. `.wwww`.
    pub fn is_swizzle_replicated(&self) -> bool {
        if self.write_mask_enabled && self.num_components == 4 {
            if let ComponentSelect::Swizzle(swizzle) = self.sel {
                return swizzle.is_replicated();
            }
        }
        false
    }

    /// Identity of a temp-register reference for the in-place-update
    /// rewrite: same register, modifier and component selection.
    pub fn is_identical_temp(&self, other: &Operand) -> bool {
        self.kind == OperandKind::Temp
            && other.kind == OperandKind::Temp
            && self.modifier == other.modifier
            && self.num_components == other.num_components
            && self.register == other.register
            && self.sel == other.sel
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_mask_means_all_components() {
        let op = Operand::temp(0).with_mask(WriteMask(0));
        assert_eq!(op.write_mask(), WriteMask::XYZW);
        assert_eq!(op.selected_count(), 4);
    }

    #[test]
    fn select1_ignores_extra_mask() {
        let op = Operand::temp(0).with_select(2);
        assert_eq!(op.selected_count_with_mask(WriteMask::X), 1);
    }

    #[test]
    fn masked_count_intersects() {
        let op = Operand::temp(0).with_mask(WriteMask(0b0110));
        assert_eq!(op.selected_count(), 2);
        assert_eq!(op.selected_count_with_mask(WriteMask(0b0010)), 1);
    }

    #[test]
    fn identical_temps_require_same_selection() {
        let a = Operand::temp(3).with_mask(WriteMask::XY);
        let b = Operand::temp(3).with_mask(WriteMask::XY);
        let c = Operand::temp(3).with_mask(WriteMask::XYZ);
        assert!(a.is_identical_temp(&b));
        assert!(!a.is_identical_temp(&c));
    }
}
